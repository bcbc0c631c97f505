// src/tests.rs
use clap::Parser;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::cli::{Cli, Commands};
use crate::client::LlmClient;
use crate::config::{AiConfig, AiSettings, Config, GlobalConfig};
use crate::error::ErrorKind;
use crate::git::{filter_diff, Git};
use crate::providers::GenerationOptions;
use crate::workflow::{check_standard, compile_patterns, derive_workflow, NewWork, WorkflowStore};

const DIFF: &str = "diff --git a/x b/x\n+foo\n";

fn settings_for(provider: &str, base_url: String, timeout: Option<u64>) -> AiSettings {
    let file = AiConfig {
        enabled: true,
        provider: provider.into(),
        api_key: Some("sk-ant-test-key".into()),
        base_url: Some(base_url),
        timeout,
        ..Default::default()
    };
    AiSettings::resolve(&file, None, None, None).unwrap()
}

fn options() -> GenerationOptions {
    GenerationOptions {
        max_tokens: 100,
        temperature: 0.7,
        branch_name: Some("feature/x".into()),
        ..Default::default()
    }
}

// =========================================================================
// CLI TESTS
// =========================================================================

#[test]
fn cli_parses_init_with_flags() {
    let cli = Cli::try_parse_from([
        "workfac", "init", "PROJ-1", "Login form", "feature", "-c", "feat", "-r", "develop",
    ])
    .unwrap();
    if let Commands::Init { issue, title, branch_type, commit_type, ref_branch } = cli.command {
        assert_eq!(issue, "PROJ-1");
        assert_eq!(title, "Login form");
        assert_eq!(branch_type, "feature");
        assert_eq!(commit_type.as_deref(), Some("feat"));
        assert_eq!(ref_branch.as_deref(), Some("develop"));
    } else {
        panic!("Expected Init command");
    }
}

#[test]
fn cli_parses_ai_commit_flags() {
    let cli = Cli::try_parse_from(["workfac", "ai-commit", "-a", "-n", "--no-verify"]).unwrap();
    if let Commands::AiCommit { all, no_push, force, no_verify } = cli.command {
        assert!(all);
        assert!(no_push);
        assert!(!force);
        assert!(no_verify);
    } else {
        panic!("Expected AiCommit command");
    }
}

#[test]
fn cli_parses_commit_message() {
    let cli = Cli::try_parse_from(["workfac", "commit", "fix typo", "-f"]).unwrap();
    if let Commands::Commit { message, all, no_push, force } = cli.command {
        assert_eq!(message, "fix typo");
        assert!(!all && !no_push && force);
    } else {
        panic!("Expected Commit command");
    }
}

#[test]
fn cli_parses_pause_and_end() {
    let cli = Cli::try_parse_from(["workfac", "pause", "-m", "develop"]).unwrap();
    assert!(matches!(cli.command, Commands::Pause { main_branch: Some(ref b), force: false } if b == "develop"));

    let cli = Cli::try_parse_from(["workfac", "end", "-w", "feature/x", "-f"]).unwrap();
    assert!(matches!(cli.command, Commands::End { work: Some(_), force: true }));
}

#[test]
fn cli_parses_global_overrides() {
    let cli = Cli::try_parse_from([
        "workfac", "--provider", "vertexai", "--model", "gemini-2.5-pro", "--timeout", "10", "config",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Config));
    assert_eq!(cli.provider.as_deref(), Some("vertexai"));
    assert_eq!(cli.model.as_deref(), Some("gemini-2.5-pro"));
    assert_eq!(cli.timeout, Some(10));
}

#[test]
fn cli_rejects_unknown_provider() {
    assert!(Cli::try_parse_from(["workfac", "--provider", "cohere", "list"]).is_err());
}

#[test]
fn cli_requires_init_arguments() {
    assert!(Cli::try_parse_from(["workfac", "init", "PROJ-1"]).is_err());
}

// =========================================================================
// GENERATION SCENARIOS
// =========================================================================

#[tokio::test]
async fn openai_generation_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-ant-test-key"))
        .and(body_partial_json(json!({"model": "gpt-4", "max_tokens": 100})))
        .and(body_string_contains("Current branch: feature/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Add foo line\n"}}],
            "usage": {"prompt_tokens": 50, "completion_tokens": 4, "total_tokens": 54}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings_for("openai", server.uri(), None)).unwrap();
    let message = client.generate(DIFF, &options()).await.unwrap();
    assert_eq!(message, "Add foo line");
}

#[tokio::test]
async fn claude_generation_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "sk-ant-test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Add foo line"}],
            "usage": {"input_tokens": 40, "output_tokens": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings_for("claude", server.uri(), None)).unwrap();
    assert_eq!(client.generate(DIFF, &options()).await.unwrap(), "Add foo line");
}

#[tokio::test]
async fn configured_timeout_bounds_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "too late"}}]}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings_for("openai", server.uri(), Some(1))).unwrap();
    let err = client.generate(DIFF, &options()).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn excluded_files_never_reach_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Add foo line"}}]
        })))
        .mount(&server)
        .await;

    let diff = format!("{}diff --git a/Cargo.lock b/Cargo.lock\n+secret-lock-content\n", DIFF);
    let patterns = compile_patterns(&[r"\.lock$".to_string()]).unwrap();
    let filtered = filter_diff(&diff, &patterns);

    let client = LlmClient::new(&settings_for("openai", server.uri(), None)).unwrap();
    client.generate(&filtered, &options()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("+foo"));
    assert!(!body.contains("secret-lock-content"));
}

// =========================================================================
// WORKFLOW SCENARIOS
// =========================================================================

#[test]
fn workflow_lifecycle_in_fresh_repository() {
    let dir = tempfile::tempdir().unwrap();
    let git = Git::new(dir.path());
    git.run_checked(&["init", "-q"]).unwrap();
    git.run_checked(&["checkout", "-q", "-b", "main"]).unwrap();
    git.run_checked(&["config", "user.email", "dev@example.com"]).unwrap();
    git.run_checked(&["config", "user.name", "Dev"]).unwrap();
    git.run_checked(&["config", "commit.gpgsign", "false"]).unwrap();
    std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
    git.run_checked(&["add", "-A"]).unwrap();
    git.run_checked(&["commit", "-q", "-m", "init"]).unwrap();

    let global = GlobalConfig {
        enforce_standard: true,
        commit_expr: r"^(feat|fix)\([A-Z]+-\d+\): .+".into(),
        branch_expr: r"^(feature|fix)/".into(),
        ..Default::default()
    };
    let wf = derive_workflow(
        &NewWork {
            issue: "PROJ-7",
            title: "Add foo",
            branch_type: "feature",
            commit_type: None,
            ref_branch: "main",
        },
        &global,
    )
    .unwrap();
    check_standard(&wf.commit, &wf.branch, &global).unwrap();

    let mut store = WorkflowStore::open(dir.path()).unwrap();
    git.checkout(&wf.branch).unwrap();
    store.define(&wf).unwrap();
    store.set_current(&wf.name).unwrap();

    std::fs::write(dir.path().join("x"), "foo\n").unwrap();
    let ignore = compile_patterns(&Config::default().global.commit_ignore_patterns).unwrap();
    git.stage_all(&ignore).unwrap();
    let full = format!("{}{}", wf.commit, "Add foo line");
    check_standard(&full, &wf.branch, &global).unwrap();
    git.commit(&full, &ignore).unwrap();

    let log = git.run_checked(&["log", "-1", "--format=%s"]).unwrap();
    assert_eq!(log.trim(), "feat(PROJ-7): Add foo line");

    git.checkout("main").unwrap();
    git.delete_branch(&wf.branch).unwrap();
    store.delete(&wf.name).unwrap();
    assert!(store.list().unwrap().is_empty());
    assert_eq!(store.current().unwrap(), None);
}
