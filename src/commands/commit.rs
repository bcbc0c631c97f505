// src/commands/commit.rs
use anyhow::{bail, Context, Result};
use dialoguer::{Editor, Input, Select};
use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::client::LlmClient;
use crate::config::{AiSettings, Config, GlobalConfig};
use crate::error::WorkflowError;
use crate::git::filter_diff;
use crate::prompts::PromptStyle;
use crate::providers::GenerationOptions;
use crate::workflow::{check_standard, compile_patterns};

use super::{ignore_patterns, open_repo, Repo};

/// Commit prefix and target branch for the commit being made.
struct Target {
    prefix: String,
    branch: String,
}

fn resolve_target(repo: &Repo, force: bool) -> Result<Target> {
    match repo.store.current()? {
        Some(name) => {
            let wf = repo.store.get(&name)?;
            Ok(Target { prefix: wf.commit, branch: wf.branch })
        }
        None if force => {
            warn!("No current workflow, committing without a prefix");
            Ok(Target { prefix: String::new(), branch: repo.git.current_branch() })
        }
        None => Err(WorkflowError::NoCurrent.into()),
    }
}

const CONVENTIONAL_HEADER: &str = r"^[a-z]+(\([^)]*\))?!?: \S";

fn has_conventional_header(message: &str) -> bool {
    Regex::new(CONVENTIONAL_HEADER)
        .map(|re| re.is_match(message))
        .unwrap_or(false)
}

/// Workflow prefix plus message. A conventional message keeps its own header.
fn compose_subject(prefix: &str, message: &str, style: PromptStyle) -> String {
    if style == PromptStyle::Conventional && has_conventional_header(message) {
        debug!("Message already has a conventional header, not adding '{}'", prefix.trim());
        return message.to_string();
    }
    format!("{}{}", prefix, message)
}

fn finish_commit(
    repo: &Repo,
    global: &GlobalConfig,
    target: &Target,
    message: &str,
    style: PromptStyle,
    no_push: bool,
) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        bail!("Empty commit message");
    }

    let full = compose_subject(&target.prefix, message, style);
    check_standard(&full, &target.branch, global)?;

    println!("Committing...");
    let hash = repo.git.commit(&full, &ignore_patterns(global)?)?;
    println!("[{}] {}", hash, full);

    if !no_push {
        println!("Pushing {}...", target.branch);
        repo.git.push(&target.branch)?;
    }
    Ok(())
}

fn stage_all(repo: &Repo, global: &GlobalConfig) -> Result<()> {
    println!("Staging all...");
    let skipped = repo.git.stage_all(&ignore_patterns(global)?)?;
    for f in skipped {
        println!("  skipped {}", f);
    }
    Ok(())
}

pub fn cmd_commit(config: &Config, message: &str, all: bool, no_push: bool, force: bool) -> Result<()> {
    let repo = open_repo()?;
    let target = resolve_target(&repo, force)?;

    if all {
        stage_all(&repo, &config.global)?;
    }

    finish_commit(&repo, &config.global, &target, message, PromptStyle::Strict, no_push)
}

// =============================================================================
// AI COMMIT
// =============================================================================
pub(crate) fn generation_options(
    settings: &AiSettings,
    global: &GlobalConfig,
    branch: &str,
) -> GenerationOptions {
    GenerationOptions {
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        commit_standard: (global.enforce_standard && !global.commit_expr.is_empty())
            .then(|| global.commit_expr.clone()),
        branch_name: (!branch.is_empty()).then(|| branch.to_string()),
        additional_context: settings.additional_context.clone(),
        prompt_style: settings.prompt_style,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Review {
    Accept,
    Edit,
    Regenerate,
    Cancel,
}

impl Review {
    const ALL: [Review; 4] = [Review::Accept, Review::Edit, Review::Regenerate, Review::Cancel];

    fn label(self) -> &'static str {
        match self {
            Review::Accept => "Accept",
            Review::Edit => "Edit",
            Review::Regenerate => "Regenerate",
            Review::Cancel => "Cancel",
        }
    }
}

fn ask_review() -> Result<Review> {
    let labels: Vec<&str> = Review::ALL.iter().map(|r| r.label()).collect();
    let idx = Select::new()
        .with_prompt("Use this message?")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to read choice")?;
    Ok(Review::ALL.get(idx).copied().unwrap_or(Review::Cancel))
}

fn edit_message(message: &str) -> Result<String> {
    let edited = Editor::new()
        .extension(".txt")
        .edit(message)
        .context("Failed to open editor")?;
    Ok(edited.map(|m| m.trim().to_string()).unwrap_or_else(|| message.to_string()))
}

fn prompt_for_message() -> Result<String> {
    let message: String = Input::new()
        .with_prompt("Enter commit message")
        .interact_text()
        .context("Failed to read commit message")?;
    Ok(message.trim().to_string())
}

async fn generate_or_ask(client: &LlmClient, diff: &str, options: &GenerationOptions) -> Result<String> {
    println!("Generating commit message with {} ({})...", client.name(), client.model());
    match client.generate(diff, options).await {
        Ok(message) => Ok(message),
        Err(e) => {
            if e.is_timeout() {
                println!("{} did not answer in time, raise ai.timeout or pass --timeout.", client.name());
            }
            warn!("AI generation failed: {:#}", anyhow::Error::new(e));
            println!("Falling back to manual message entry.");
            prompt_for_message()
        }
    }
}

pub async fn cmd_ai_commit(
    config: &Config,
    settings: &AiSettings,
    all: bool,
    no_push: bool,
    force: bool,
    no_verify: bool,
) -> Result<()> {
    if !config.ai.enabled {
        bail!("AI commit is disabled, set `enabled = true` in the [ai] section of the config file");
    }

    let repo = open_repo()?;
    let target = resolve_target(&repo, force)?;

    if all {
        stage_all(&repo, &config.global)?;
    }

    let raw = repo.git.staged_diff()?;
    if raw.trim().is_empty() {
        bail!("No staged changes.");
    }

    let excludes = compile_patterns(&settings.exclude_patterns).context("Invalid ai.exclude_patterns")?;
    let diff = filter_diff(&raw, &excludes);
    debug!("Diff size: {} bytes ({} before filtering)", diff.len(), raw.len());

    if !no_verify {
        info!("Running pre-commit hooks");
        repo.git
            .run_pre_commit_hook()
            .context("Commit aborted due to pre-commit hook failure")?;
    }

    let options = generation_options(settings, &config.global, &target.branch);

    let message = if diff.trim().is_empty() {
        warn!("All staged changes match ai.exclude_patterns");
        prompt_for_message()?
    } else {
        let client = LlmClient::new(settings)?;
        client.validate()?;
        let mut message = generate_or_ask(&client, &diff, &options).await?;
        loop {
            println!("\n{}\n{}\n{}", "=".repeat(50), message, "=".repeat(50));
            match ask_review()? {
                Review::Accept => break message,
                Review::Edit => break edit_message(&message)?,
                Review::Regenerate => {
                    message = generate_or_ask(&client, &diff, &options).await?;
                }
                Review::Cancel => bail!("Commit cancelled by user"),
            }
        }
    };

    finish_commit(&repo, &config.global, &target, &message, settings.prompt_style, no_push)
}

// =============================================================================
// MODULE TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::git::Git;
    use crate::workflow::WorkflowStore;
    use tempfile::TempDir;

    fn repo_with_staged_file() -> (TempDir, Repo) {
        let dir = tempfile::tempdir().unwrap();
        let git = Git::new(dir.path());
        git.run_checked(&["init", "-q"]).unwrap();
        git.run_checked(&["checkout", "-q", "-b", "main"]).unwrap();
        git.run_checked(&["config", "user.email", "dev@example.com"]).unwrap();
        git.run_checked(&["config", "user.name", "Dev"]).unwrap();
        git.run_checked(&["config", "commit.gpgsign", "false"]).unwrap();
        std::fs::write(dir.path().join("login.rs"), "fn login() {}\n").unwrap();
        git.run_checked(&["add", "-A"]).unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();
        (dir, Repo { git, store })
    }

    fn target() -> Target {
        Target { prefix: "feat(PROJ-1): ".into(), branch: "main".into() }
    }

    fn last_subject(repo: &Repo) -> String {
        repo.git.run_checked(&["log", "-1", "--format=%s"]).unwrap().trim().to_string()
    }

    fn settings() -> AiSettings {
        let file = AiConfig {
            api_key: Some("sk-test".into()),
            additional_context: Some("monorepo".into()),
            prompt_style: PromptStyle::Conventional,
            ..Default::default()
        };
        AiSettings::resolve(&file, None, None, None).unwrap()
    }

    #[test]
    fn options_carry_standard_only_when_enforced() {
        let mut global = GlobalConfig { commit_expr: r"^feat".into(), ..Default::default() };
        let opts = generation_options(&settings(), &global, "feature/x");
        assert!(opts.commit_standard.is_none());
        assert_eq!(opts.branch_name.as_deref(), Some("feature/x"));
        assert_eq!(opts.additional_context.as_deref(), Some("monorepo"));
        assert_eq!(opts.prompt_style, PromptStyle::Conventional);
        assert_eq!(opts.max_tokens, 1024);

        global.enforce_standard = true;
        let opts = generation_options(&settings(), &global, "");
        assert_eq!(opts.commit_standard.as_deref(), Some("^feat"));
        assert!(opts.branch_name.is_none());
    }

    #[test]
    fn review_labels_are_distinct() {
        let labels: Vec<&str> = Review::ALL.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["Accept", "Edit", "Regenerate", "Cancel"]);
    }

    #[test]
    fn conventional_message_keeps_its_own_header() {
        let (_dir, repo) = repo_with_staged_file();
        let global = GlobalConfig::default();
        finish_commit(&repo, &global, &target(), "feat(auth): add login", PromptStyle::Conventional, true)
            .unwrap();
        assert_eq!(last_subject(&repo), "feat(auth): add login");
    }

    #[test]
    fn strict_message_gets_workflow_prefix() {
        let (_dir, repo) = repo_with_staged_file();
        let global = GlobalConfig::default();
        finish_commit(&repo, &global, &target(), "Add login form", PromptStyle::Strict, true).unwrap();
        assert_eq!(last_subject(&repo), "feat(PROJ-1): Add login form");
    }

    #[test]
    fn compose_subject_per_style() {
        let prefix = "feat(PROJ-1): ";
        assert_eq!(
            compose_subject(prefix, "fix(api)!: drop v1", PromptStyle::Conventional),
            "fix(api)!: drop v1"
        );
        assert_eq!(compose_subject(prefix, "docs: readme", PromptStyle::Conventional), "docs: readme");
        // No header of its own, so the workflow prefix still applies
        assert_eq!(
            compose_subject(prefix, "Add login form", PromptStyle::Conventional),
            "feat(PROJ-1): Add login form"
        );
        assert_eq!(
            compose_subject(prefix, "feat(auth): add login", PromptStyle::Strict),
            "feat(PROJ-1): feat(auth): add login"
        );
    }
}
