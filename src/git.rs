// src/git.rs
use anyhow::{bail, Context, Result};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

pub const REMOTE: &str = "origin";

// =============================================================================
// GIT RUNNER
// =============================================================================
/// Thin wrapper over the `git` executable, rooted at one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn cwd() -> Result<Self> {
        let dir = std::env::current_dir().context("Failed to read current directory")?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.dir);
        cmd
    }

    /// Stdout only; exit status is ignored.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self
            .command(args)
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to execute git: {}", e))?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub fn run_status(&self, args: &[&str]) -> (String, String, bool) {
        match self.command(args).output() {
            Ok(o) => (
                String::from_utf8_lossy(&o.stdout).to_string(),
                String::from_utf8_lossy(&o.stderr).to_string(),
                o.status.success(),
            ),
            Err(e) => (String::new(), e.to_string(), false),
        }
    }

    /// Fails with git's stderr when the command exits non-zero.
    pub fn run_checked(&self, args: &[&str]) -> Result<String> {
        let (out, err, ok) = self.run_status(args);
        if !ok {
            let detail = if err.trim().is_empty() { out.trim() } else { err.trim() };
            bail!("git {} failed: {}", args.join(" "), detail);
        }
        Ok(out)
    }

    // =========================================================================
    // REPOSITORY INFO
    // =========================================================================
    pub fn is_repo(&self) -> bool {
        self.run_status(&["rev-parse", "--git-dir"]).2
    }

    pub fn git_dir(&self) -> Option<PathBuf> {
        let (out, _, ok) = self.run_status(&["rev-parse", "--absolute-git-dir"]);
        if !ok {
            return None;
        }
        Some(PathBuf::from(out.trim()))
    }

    pub fn current_branch(&self) -> String {
        if let Ok(out) = self.run(&["branch", "--show-current"]) {
            let b = out.trim().to_string();
            if !b.is_empty() {
                return b;
            }
        }
        if let Ok(out) = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]) {
            let b = out.trim().to_string();
            if !b.is_empty() {
                return b;
            }
        }
        "HEAD".to_string()
    }

    pub fn branch_exists(&self, branch: &str) -> bool {
        let reference = format!("refs/heads/{}", branch);
        self.run_status(&["show-ref", "--verify", "--quiet", &reference]).2
    }

    /// Default branch advertised by `origin`, if reachable.
    pub fn remote_default_branch(&self) -> Option<String> {
        let (out, _, ok) = self.run_status(&["ls-remote", "--symref", REMOTE, "HEAD"]);
        if !ok {
            return None;
        }
        parse_symref_head(&out)
    }

    pub fn remote_url(&self) -> Option<String> {
        let (out, _, ok) = self.run_status(&["remote", "get-url", REMOTE]);
        let url = out.trim();
        (ok && !url.is_empty()).then(|| url.to_string())
    }

    // =========================================================================
    // BRANCH OPERATIONS
    // =========================================================================
    /// Switches to `branch`, creating it locally or fetching it from origin.
    pub fn checkout(&self, branch: &str) -> Result<()> {
        let local = self.branch_exists(branch);
        let args: Vec<&str> = if local {
            vec!["checkout", "-q", branch]
        } else {
            vec!["checkout", "-q", "-b", branch]
        };

        let (_, err, ok) = self.run_status(&args);
        if ok {
            debug!("Checked out {}", branch);
            return Ok(());
        }

        debug!("Checkout of {} failed ({}), fetching from {}", branch, err.trim(), REMOTE);
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        self.run_checked(&["fetch", "-q", REMOTE, &refspec])?;
        self.run_checked(&["checkout", "-q", branch])?;
        Ok(())
    }

    /// Best effort; an offline or upstream-less branch only logs.
    pub fn pull(&self) -> String {
        let (out, err, ok) = self.run_status(&["pull", "-q", REMOTE]);
        if !ok {
            info!("Pull skipped: {}", err.trim());
        }
        out
    }

    pub fn push(&self, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        self.run_checked(&["push", REMOTE, &refspec])?;
        Ok(())
    }

    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        if !self.branch_exists(branch) {
            debug!("Branch {} does not exist locally", branch);
            return Ok(());
        }
        self.run_checked(&["branch", "-D", branch])?;
        Ok(())
    }

    // =========================================================================
    // STAGING & COMMITS
    // =========================================================================
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let out = self.run_checked(&["diff", "--cached", "--name-only"])?;
        Ok(lines(&out))
    }

    /// Modified, staged or untracked paths.
    pub fn uncommitted_files(&self) -> Result<Vec<String>> {
        let out = self.run_checked(&["status", "--porcelain"])?;
        Ok(out
            .lines()
            .filter(|l| l.len() > 3)
            .map(|l| l[3..].trim().to_string())
            .collect())
    }

    pub fn status_short(&self) -> Result<String> {
        self.run_checked(&["status", "--short", "--branch"])
    }

    /// `git add -A`, then unstage whatever matches an ignore pattern.
    pub fn stage_all(&self, ignore: &[Regex]) -> Result<Vec<String>> {
        self.run_checked(&["add", "-A"])?;
        let ignored = matching(&self.staged_files()?, ignore);
        if !ignored.is_empty() {
            let mut args = vec!["reset", "-q", "--"];
            args.extend(ignored.iter().map(String::as_str));
            self.run_checked(&args)?;
            info!("Left ignored files unstaged: {}", ignored.join(", "));
        }
        Ok(ignored)
    }

    pub fn commit(&self, message: &str, ignore: &[Regex]) -> Result<String> {
        let ignored = matching(&self.staged_files()?, ignore);
        if !ignored.is_empty() {
            bail!(
                "Refusing to commit files matching commit_ignore_patterns: {}",
                ignored.join(", ")
            );
        }
        self.run_checked(&["commit", "-q", "-m", message])?;
        let hash = self.run_checked(&["rev-parse", "--short", "HEAD"])?;
        Ok(hash.trim().to_string())
    }

    pub fn staged_diff(&self) -> Result<String> {
        self.run_checked(&["diff", "--cached", "--no-color"])
    }

    // =========================================================================
    // HOOKS
    // =========================================================================
    /// Runs the pre-commit hook through `git hook run`, or directly on older git.
    pub fn run_pre_commit_hook(&self) -> Result<()> {
        let output = self
            .command(&["hook", "run", "--ignore-missing", "pre-commit"])
            .output()
            .context("Failed to execute git")?;

        if output.status.success() {
            return Ok(());
        }

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let unsupported = combined.contains("is not a git command")
            || combined.contains("fatal: not a git repository");
        if !unsupported {
            bail!("pre-commit hooks failed:\n{}", combined.trim());
        }

        debug!("`git hook run` unavailable, running hook file directly");
        let Some(git_dir) = self.git_dir() else {
            return Ok(());
        };
        let hook = git_dir.join("hooks").join("pre-commit");
        if !hook.exists() {
            debug!("No pre-commit hook found, skipping");
            return Ok(());
        }
        if !is_executable(&hook) {
            warn!("Pre-commit hook {} is not executable, skipping", hook.display());
            return Ok(());
        }

        let output = Command::new(&hook)
            .current_dir(&self.dir)
            .output()
            .with_context(|| format!("Failed to run {}", hook.display()))?;
        if !output.status.success() {
            bail!(
                "pre-commit hooks failed:\n{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// PURE HELPERS
// =============================================================================
pub fn matching(files: &[String], patterns: &[Regex]) -> Vec<String> {
    files
        .iter()
        .filter(|f| patterns.iter().any(|re| re.is_match(f)))
        .cloned()
        .collect()
}

fn parse_symref_head(ls_remote: &str) -> Option<String> {
    ls_remote.lines().find_map(|line| {
        let rest = line.strip_prefix("ref: refs/heads/")?;
        let (branch, target) = rest.split_once('\t')?;
        (target.trim() == "HEAD").then(|| branch.to_string())
    })
}

fn diff_section_path(header: &str) -> Option<&str> {
    let rest = header.strip_prefix("diff --git a/")?;
    rest.rsplit_once(" b/").map(|(_, b)| b)
}

/// Drops whole file sections whose path matches any pattern.
pub fn filter_diff(diff: &str, patterns: &[Regex]) -> String {
    if patterns.is_empty() {
        return diff.to_string();
    }

    let mut out = String::with_capacity(diff.len());
    let mut keep = true;
    for line in diff.split_inclusive('\n') {
        if line.starts_with("diff --git ") {
            let path = diff_section_path(line.trim_end()).unwrap_or_default();
            keep = !patterns.iter().any(|re| re.is_match(path));
            if !keep {
                debug!("Excluding {} from AI diff", path);
            }
        }
        if keep {
            out.push_str(line);
        }
    }
    out
}

/// Browser URL for an ssh or https remote.
pub fn web_url(remote: &str) -> Option<String> {
    let remote = remote.trim();
    let (host, path) = if let Some(rest) = remote.strip_prefix("ssh://") {
        let rest = rest.split_once('@').map_or(rest, |(_, r)| r);
        let (host, path) = rest.split_once('/')?;
        (host.split(':').next()?, path)
    } else if let Some(rest) = remote
        .strip_prefix("https://")
        .or_else(|| remote.strip_prefix("http://"))
    {
        let rest = rest.split_once('@').map_or(rest, |(_, r)| r);
        rest.split_once('/')?
    } else {
        let rest = remote.split_once('@').map_or(remote, |(_, r)| r);
        rest.split_once(':')?
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some(format!("https://{}/{}", host, path))
}

// =============================================================================
// MODULE TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Git) {
        let dir = tempfile::tempdir().unwrap();
        let git = Git::new(dir.path());
        git.run_checked(&["init", "-q"]).unwrap();
        git.run_checked(&["checkout", "-q", "-b", "main"]).unwrap();
        git.run_checked(&["config", "user.email", "dev@example.com"]).unwrap();
        git.run_checked(&["config", "user.name", "Dev"]).unwrap();
        git.run_checked(&["config", "commit.gpgsign", "false"]).unwrap();
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        git.run_checked(&["add", "README.md"]).unwrap();
        git.run_checked(&["commit", "-q", "-m", "init"]).unwrap();
        (dir, git)
    }

    const TWO_FILE_DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n\
index 1..2 100644\n\
--- a/src/lib.rs\n\
+++ b/src/lib.rs\n\
+fn a() {}\n\
diff --git a/Cargo.lock b/Cargo.lock\n\
--- a/Cargo.lock\n\
+++ b/Cargo.lock\n\
+checksum\n";

    #[test]
    fn filter_diff_drops_matching_sections() {
        let patterns = vec![Regex::new(r"\.lock$").unwrap()];
        let filtered = filter_diff(TWO_FILE_DIFF, &patterns);
        assert!(filtered.contains("src/lib.rs"));
        assert!(filtered.contains("+fn a() {}"));
        assert!(!filtered.contains("Cargo.lock"));
        assert!(!filtered.contains("checksum"));
    }

    #[test]
    fn filter_diff_without_patterns_is_identity() {
        assert_eq!(filter_diff(TWO_FILE_DIFF, &[]), TWO_FILE_DIFF);
    }

    #[test]
    fn diff_section_path_uses_b_side() {
        assert_eq!(diff_section_path("diff --git a/old.rs b/new.rs"), Some("new.rs"));
        assert_eq!(diff_section_path("not a header"), None);
    }

    #[test]
    fn symref_head_parsed() {
        let out = "ref: refs/heads/develop\tHEAD\n4f2a\tHEAD\n";
        assert_eq!(parse_symref_head(out), Some("develop".into()));
        assert_eq!(parse_symref_head("4f2a\tHEAD\n"), None);
    }

    #[test]
    fn web_url_handles_common_remotes() {
        assert_eq!(
            web_url("git@gitlab.com:group/sub/proj.git").as_deref(),
            Some("https://gitlab.com/group/sub/proj")
        );
        assert_eq!(
            web_url("https://token@github.com/org/repo.git").as_deref(),
            Some("https://github.com/org/repo")
        );
        assert_eq!(
            web_url("ssh://git@git.example.com:2222/team/app.git").as_deref(),
            Some("https://git.example.com/team/app")
        );
        assert_eq!(web_url("nonsense"), None);
    }

    #[test]
    fn matching_filters_by_pattern() {
        let files = vec![".env".to_string(), "src/.env".to_string(), "env.rs".to_string()];
        let patterns = vec![Regex::new(r"(^|/)\.env$").unwrap()];
        assert_eq!(matching(&files, &patterns), vec![".env".to_string(), "src/.env".to_string()]);
    }

    #[test]
    fn run_status_handles_invalid_command() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, ok) = Git::new(dir.path()).run_status(&["not-a-real-command"]);
        assert!(!ok);
    }

    #[test]
    fn checkout_creates_and_switches_branches() {
        let (_dir, git) = init_repo();
        assert!(git.is_repo());
        assert_eq!(git.current_branch(), "main");

        git.checkout("feature/PROJ-1-login").unwrap();
        assert_eq!(git.current_branch(), "feature/PROJ-1-login");
        assert!(git.branch_exists("feature/PROJ-1-login"));

        git.checkout("main").unwrap();
        assert_eq!(git.current_branch(), "main");

        git.delete_branch("feature/PROJ-1-login").unwrap();
        assert!(!git.branch_exists("feature/PROJ-1-login"));
    }

    #[test]
    fn stage_all_leaves_ignored_files_out() {
        let (dir, git) = init_repo();
        std::fs::write(dir.path().join("app.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET=1\n").unwrap();

        let ignore = vec![Regex::new(r"(^|/)\.env$").unwrap()];
        let skipped = git.stage_all(&ignore).unwrap();
        assert_eq!(skipped, vec![".env".to_string()]);
        assert_eq!(git.staged_files().unwrap(), vec!["app.rs".to_string()]);

        let hash = git.commit("feat(PROJ-1): add app", &ignore).unwrap();
        assert!(!hash.is_empty());
        assert_eq!(git.uncommitted_files().unwrap(), vec![".env".to_string()]);
    }

    #[test]
    fn commit_refuses_staged_ignored_files() {
        let (dir, git) = init_repo();
        std::fs::write(dir.path().join(".env"), "SECRET=1\n").unwrap();
        git.run_checked(&["add", ".env"]).unwrap();

        let ignore = vec![Regex::new(r"(^|/)\.env$").unwrap()];
        let err = git.commit("chore: env", &ignore).unwrap_err();
        assert!(err.to_string().contains("commit_ignore_patterns"));
    }

    #[test]
    fn staged_diff_contains_changes() {
        let (dir, git) = init_repo();
        std::fs::write(dir.path().join("README.md"), "hello\nworld\n").unwrap();
        git.run_checked(&["add", "README.md"]).unwrap();
        let diff = git.staged_diff().unwrap();
        assert!(diff.starts_with("diff --git a/README.md b/README.md"));
        assert!(diff.contains("+world"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_pre_commit_hook_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, git) = init_repo();
        assert!(git.run_pre_commit_hook().is_ok());

        let hook = dir.path().join(".git/hooks/pre-commit");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(&hook, "#!/bin/sh\necho lint failed\nexit 1\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = git.run_pre_commit_hook().unwrap_err();
        assert!(err.to_string().contains("lint failed"));
    }
}
