// src/workflow.rs
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use git2::{Config as GitConfig, ConfigLevel, Repository};
use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::{GlobalConfig, Ticketing};
use crate::error::WorkflowError;

// =============================================================================
// KEYS
// =============================================================================
const WORKFLOW_SECTION: &str = "workflow";
const BRANCH_SECTION: &str = "branch";

const CURRENT_KEY: &str = "workflowsetup.current";
const DEFAULT_BRANCH_KEY: &str = "workflowsetup.default-branch";
const DEFAULT_BRANCH_EXPIRY_KEY: &str = "workflowsetup.default-branch-expiry";

pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_BRANCH_TTL_DAYS: i64 = 30;

pub const PARAM_TYPE_BRANCH: &str = "type-branch";
pub const PARAM_TYPE_COMMIT: &str = "type-commit";
pub const PARAM_MRREF: &str = "mrref";
pub const PARAM_TICKET: &str = "ticket";
pub const PARAM_TITLE: &str = "title";
pub const PARAM_BRANCH: &str = "branch";
pub const PARAM_COMMIT: &str = "commit";
pub const PARAM_REFBRANCH: &str = "refbranch";

const REMOTE_NAME: &str = "origin";

// =============================================================================
// WORKFLOW
// =============================================================================
/// One unit of work: a branch plus the commit prefix used on it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workflow {
    pub name: String,
    pub branch_type: String,
    pub commit_type: String,
    /// GitLab merge request number.
    pub mrref: Option<String>,
    /// Jira ticket key.
    pub ticket: Option<String>,
    pub title: String,
    pub branch: String,
    pub commit: String,
    pub ref_branch: String,
}

impl Workflow {
    fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![
            (PARAM_TYPE_BRANCH, self.branch_type.as_str()),
            (PARAM_TYPE_COMMIT, self.commit_type.as_str()),
            (PARAM_TITLE, self.title.as_str()),
            (PARAM_BRANCH, self.branch.as_str()),
            (PARAM_COMMIT, self.commit.as_str()),
            (PARAM_REFBRANCH, self.ref_branch.as_str()),
        ];
        if let Some(mr) = &self.mrref {
            params.push((PARAM_MRREF, mr.as_str()));
        }
        if let Some(ticket) = &self.ticket {
            params.push((PARAM_TICKET, ticket.as_str()));
        }
        params
    }

    /// Issue reference as shown to the user.
    pub fn issue(&self) -> Option<&str> {
        self.ticket.as_deref().or(self.mrref.as_deref())
    }
}

fn workflow_key(name: &str, param: &str) -> String {
    format!("{}.{}.{}", WORKFLOW_SECTION, name, param)
}

fn branch_key(branch: &str, param: &str) -> String {
    format!("{}.{}.{}", BRANCH_SECTION, branch, param)
}

// =============================================================================
// STORE
// =============================================================================
/// Workflow records kept in the repository's local git config.
pub struct WorkflowStore {
    config: GitConfig,
}

impl WorkflowStore {
    pub fn open(path: &Path) -> Result<Self, WorkflowError> {
        let repo = Repository::discover(path)?;
        let config = repo.config()?.open_level(ConfigLevel::Local)?;
        Ok(Self { config })
    }

    fn get_opt(&self, key: &str) -> Result<Option<String>, WorkflowError> {
        match self.config.get_string(key) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_if_present(&mut self, key: &str) -> Result<(), WorkflowError> {
        match self.config.remove(key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, WorkflowError> {
        let mut entries = self.config.entries(None)?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next() {
            let entry = entry?;
            let Some(name) = entry.name() else { continue };
            if let Some(rest) = name.strip_prefix(prefix) {
                out.push((rest.to_string(), entry.value().unwrap_or_default().to_string()));
            }
        }
        Ok(out)
    }

    // =========================================================================
    // CURRENT WORKFLOW
    // =========================================================================
    pub fn current(&self) -> Result<Option<String>, WorkflowError> {
        Ok(self.get_opt(CURRENT_KEY)?.filter(|c| !c.is_empty()))
    }

    pub fn require_current(&self) -> Result<String, WorkflowError> {
        self.current()?.ok_or(WorkflowError::NoCurrent)
    }

    pub fn set_current(&mut self, name: &str) -> Result<(), WorkflowError> {
        self.config.set_str(CURRENT_KEY, name)?;
        debug!("Current workflow set to {}", name);
        Ok(())
    }

    pub fn clear_current(&mut self) -> Result<(), WorkflowError> {
        self.remove_if_present(CURRENT_KEY)
    }

    // =========================================================================
    // WORKFLOW RECORDS
    // =========================================================================
    pub fn exists(&self, name: &str) -> Result<bool, WorkflowError> {
        Ok(self.get_opt(&workflow_key(name, PARAM_BRANCH))?.is_some())
    }

    /// Names of all recorded workflows, sorted.
    pub fn list(&self) -> Result<Vec<String>, WorkflowError> {
        let prefix = format!("{}.", WORKFLOW_SECTION);
        let names: BTreeSet<String> = self
            .entries_with_prefix(&prefix)?
            .into_iter()
            .filter_map(|(rest, _)| rest.rsplit_once('.').map(|(name, _)| name.to_string()))
            .collect();
        Ok(names.into_iter().collect())
    }

    pub fn param(&self, name: &str, param: &str) -> Result<String, WorkflowError> {
        self.get_opt(&workflow_key(name, param))?
            .ok_or_else(|| WorkflowError::MissingParam {
                workflow: name.to_string(),
                param: param.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<Workflow, WorkflowError> {
        let prefix = format!("{}.{}.", WORKFLOW_SECTION, name);
        let values: HashMap<String, String> = self
            .entries_with_prefix(&prefix)?
            .into_iter()
            .filter(|(key, _)| !key.contains('.'))
            .collect();
        if values.is_empty() {
            return Err(WorkflowError::NotFound(name.to_string()));
        }

        let required = |param: &str| {
            values.get(param).cloned().ok_or_else(|| WorkflowError::MissingParam {
                workflow: name.to_string(),
                param: param.to_string(),
            })
        };

        Ok(Workflow {
            name: name.to_string(),
            branch_type: required(PARAM_TYPE_BRANCH)?,
            commit_type: required(PARAM_TYPE_COMMIT)?,
            mrref: values.get(PARAM_MRREF).cloned(),
            ticket: values.get(PARAM_TICKET).cloned(),
            title: values.get(PARAM_TITLE).cloned().unwrap_or_default(),
            branch: required(PARAM_BRANCH)?,
            commit: required(PARAM_COMMIT)?,
            ref_branch: required(PARAM_REFBRANCH)?,
        })
    }

    /// Records a new workflow and its branch tracking section.
    pub fn define(&mut self, wf: &Workflow) -> Result<(), WorkflowError> {
        if self.exists(&wf.name)? {
            return Err(WorkflowError::AlreadyExists(wf.name.clone()));
        }

        for (param, value) in wf.params() {
            self.config.set_str(&workflow_key(&wf.name, param), value)?;
        }

        self.config.set_str(&branch_key(&wf.branch, "remote"), REMOTE_NAME)?;
        self.config
            .set_str(&branch_key(&wf.branch, "merge"), &format!("refs/heads/{}", wf.branch))?;
        self.config.set_str(
            &branch_key(&wf.branch, "vscode-merge-base"),
            &format!("{}/{}", REMOTE_NAME, wf.ref_branch),
        )?;

        debug!("Workflow {} recorded", wf.name);
        Ok(())
    }

    /// Removes the workflow record and its branch section.
    pub fn delete(&mut self, name: &str) -> Result<(), WorkflowError> {
        let branch = self.get_opt(&workflow_key(name, PARAM_BRANCH))?;

        let prefix = format!("{}.{}.", WORKFLOW_SECTION, name);
        let keys: Vec<String> = self
            .entries_with_prefix(&prefix)?
            .into_iter()
            .filter(|(key, _)| !key.contains('.'))
            .map(|(key, _)| workflow_key(name, &key))
            .collect();
        if keys.is_empty() {
            return Err(WorkflowError::NotFound(name.to_string()));
        }
        for key in keys {
            self.remove_if_present(&key)?;
        }

        if let Some(branch) = branch {
            for param in ["remote", "merge", "vscode-merge-base"] {
                self.remove_if_present(&branch_key(&branch, param))?;
            }
        }

        if self.current()?.as_deref() == Some(name) {
            self.clear_current()?;
        }
        debug!("Workflow {} deleted", name);
        Ok(())
    }

    // =========================================================================
    // DEFAULT BRANCH CACHE
    // =========================================================================
    /// Cached remote default branch, unless the entry has expired.
    pub fn cached_default_branch(&self, now: DateTime<Utc>) -> Result<Option<String>, WorkflowError> {
        let Some(branch) = self.get_opt(DEFAULT_BRANCH_KEY)?.filter(|b| !b.is_empty()) else {
            return Ok(None);
        };
        let Some(raw) = self.get_opt(DEFAULT_BRANCH_EXPIRY_KEY)? else {
            return Ok(None);
        };
        match NaiveDateTime::parse_from_str(&raw, EXPIRY_FORMAT) {
            Ok(expiry) if now < expiry.and_utc() => Ok(Some(branch)),
            Ok(_) => {
                debug!("Cached default branch expired at {}", raw);
                Ok(None)
            }
            Err(e) => {
                warn!("Ignoring unreadable {} '{}': {}", DEFAULT_BRANCH_EXPIRY_KEY, raw, e);
                Ok(None)
            }
        }
    }

    pub fn store_default_branch(&mut self, branch: &str, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        let expiry = now + ChronoDuration::days(DEFAULT_BRANCH_TTL_DAYS);
        self.config.set_str(DEFAULT_BRANCH_KEY, branch)?;
        self.config
            .set_str(DEFAULT_BRANCH_EXPIRY_KEY, &expiry.format(EXPIRY_FORMAT).to_string())?;
        Ok(())
    }
}

// =============================================================================
// NAMING
// =============================================================================
/// ASCII alphanumerics survive; every other run becomes one separator.
pub fn clean_string(input: &str, separator: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push_str(separator);
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }
    out
}

/// Strips the decorations GitLab adds to merge request titles.
pub fn clean_gitlab_title(title: &str) -> String {
    title.replace("Draft: Resolve ", "").replace('"', "")
}

/// Replaces `{{key}}` placeholders; unknown keys render empty.
pub fn render_template(template: &str, vars: &BTreeMap<&str, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                out.push_str(vars.get(key).copied().unwrap_or_default());
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn commit_type_for(
    branch_type: &str,
    mapping: &BTreeMap<String, String>,
) -> Result<String, WorkflowError> {
    mapping
        .get(branch_type)
        .cloned()
        .ok_or_else(|| WorkflowError::UnmappedType(branch_type.to_string()))
}

pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, WorkflowError> {
    patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            Regex::new(p).map_err(|source| WorkflowError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

fn check_one(what: &'static str, value: &str, expr: &str) -> Result<(), WorkflowError> {
    if expr.is_empty() {
        return Ok(());
    }
    let re = Regex::new(expr).map_err(|source| WorkflowError::InvalidPattern {
        pattern: expr.to_string(),
        source,
    })?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(WorkflowError::StandardViolation {
            what,
            value: value.to_string(),
            pattern: expr.to_string(),
        })
    }
}

/// Enforces `commit_expr` and `branch_expr` when `enforce_standard` is on.
pub fn check_standard(commit: &str, branch: &str, global: &GlobalConfig) -> Result<(), WorkflowError> {
    if !global.enforce_standard {
        return Ok(());
    }
    let sample = format!("{}test_message", commit);
    check_one("commit", &sample, &global.commit_expr)?;
    check_one("branch", branch, &global.branch_expr)?;
    Ok(())
}

/// User input for a new workflow.
#[derive(Debug, Clone)]
pub struct NewWork<'a> {
    pub issue: &'a str,
    pub title: &'a str,
    pub branch_type: &'a str,
    pub commit_type: Option<&'a str>,
    pub ref_branch: &'a str,
}

/// Derives branch and commit prefix according to the ticketing flavour.
pub fn derive_workflow(input: &NewWork<'_>, global: &GlobalConfig) -> Result<Workflow, WorkflowError> {
    let commit_type = match input.commit_type.filter(|c| !c.is_empty()) {
        Some(c) => c.to_string(),
        None => commit_type_for(input.branch_type, &global.type_mapping)?,
    };

    let (branch, commit, title, mrref, ticket) = match global.ticketing {
        Ticketing::Gitlab => {
            let issue = input.issue.trim();
            if issue.is_empty() || !issue.chars().all(|c| c.is_ascii_digit()) {
                return Err(WorkflowError::InvalidIssue(issue.to_string()));
            }
            let title = clean_string(&clean_gitlab_title(input.title), &global.branch_separator);
            let commit = format!("{}(!{}): ", commit_type, issue);
            (title.clone(), commit, title, Some(issue.to_string()), None)
        }
        Ticketing::Jira => {
            let issue = input.issue.trim();
            let title = clean_string(input.title, &global.branch_separator);
            let branch_vars = BTreeMap::from([
                ("type", input.branch_type),
                ("issue", issue),
                ("summary", title.as_str()),
            ]);
            let branch = render_template(&global.branch_template, &branch_vars);
            let commit_vars = BTreeMap::from([("type", commit_type.as_str()), ("issue", issue)]);
            let commit = render_template(&global.commit_template, &commit_vars);
            (branch, commit, title, None, Some(issue.to_string()))
        }
    };

    Ok(Workflow {
        name: branch.clone(),
        branch_type: input.branch_type.to_string(),
        commit_type,
        mrref,
        ticket,
        title,
        branch,
        commit,
        ref_branch: input.ref_branch.to_string(),
    })
}
