// src/prompts.rs
use serde::{Deserialize, Serialize};

use crate::providers::GenerationOptions;

pub const COMMIT_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates concise, meaningful git commit messages based on code changes. Follow conventional commit format when specified.";

const STRICT_CONSTRAINTS: &str = r#"Task: Generate a git commit message for the provided diff.

Strict Constraints:
1. Output ONLY the raw message. No markdown, no quotes, no conversational filler.
2. Format: Single line, under 72 characters.
3. Content: Start directly with the action verb (e.g., 'update', 'fix', 'add').
4. FORBIDDEN: Do NOT use prefixes like 'feat:', 'fix:', 'docs:', or 'refactor(scope):'.
5. Character Set: Plain ASCII only. No emojis or Unicode symbols."#;

const CONVENTIONAL_CONSTRAINTS: &str = r#"Task: Generate a conventional commit message for the provided diff.

Constraints:
1. Output ONLY the raw message. No markdown, no quotes, no conversational filler.
2. Format: type(scope): description, on a single line under 72 characters.
3. Types: feat, fix, docs, style, refactor, perf, test, chore.
4. Description: imperative mood, lowercase start, no trailing period.
5. Character Set: Plain ASCII only. No emojis or Unicode symbols."#;

/// Output-format policy for generated commit messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Bare verb-first line; the workflow prefix is added afterwards.
    #[default]
    Strict,
    /// Model writes the `type(scope):` header itself; it replaces the workflow prefix.
    Conventional,
}

impl PromptStyle {
    fn constraints(self) -> &'static str {
        match self {
            PromptStyle::Strict => STRICT_CONSTRAINTS,
            PromptStyle::Conventional => CONVENTIONAL_CONSTRAINTS,
        }
    }
}

pub fn build_prompt(diff: &str, options: &GenerationOptions) -> String {
    let mut prompt = String::with_capacity(diff.len() + 1024);
    prompt.push_str(options.prompt_style.constraints());
    prompt.push('\n');

    if options.prompt_style == PromptStyle::Conventional {
        if let Some(standard) = non_blank(options.commit_standard.as_deref()) {
            prompt.push_str(&format!(
                "6. The message must match this pattern: {}\n",
                standard
            ));
        }
    }

    prompt.push_str("\nInput Diff:\n```diff\n");
    prompt.push_str(diff);
    if !diff.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push_str("```\n\n");

    if let Some(branch) = non_blank(options.branch_name.as_deref()) {
        prompt.push_str(&format!("Current branch: {}\n", branch));
    }
    if let Some(context) = non_blank(options.additional_context.as_deref()) {
        prompt.push_str(&format!("Additional context: {}\n", context));
    }

    prompt
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
