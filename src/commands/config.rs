// src/commands/config.rs
use anyhow::Result;

use crate::config::{AiSettings, Config};

pub(crate) fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".into();
    }
    let visible: String = key.chars().take(6).collect();
    if key.chars().count() <= 10 {
        return "****".into();
    }
    format!("{}...", visible)
}

fn or_default(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("(default)")
}

pub fn cmd_config(config: &Config, settings: Result<AiSettings>) -> Result<()> {
    let path = Config::path()
        .map(|p| {
            let exists = if p.exists() { "" } else { " (not found, using defaults)" };
            format!("{}{}", p.display(), exists)
        })
        .unwrap_or_else(|| "(unknown)".into());
    println!("Config file: {}\n", path);

    let g = &config.global;
    println!("[global]");
    println!("  log_level:            {}", g.log_level);
    println!("  default_branch:       {}", g.default_branch);
    println!("  ticketing:            {:?}", g.ticketing);
    println!("  enforce_standard:     {}", g.enforce_standard);
    println!("  branch_template:      {}", g.branch_template);
    println!("  commit_template:      {}", g.commit_template);
    if !g.branch_expr.is_empty() {
        println!("  branch_expr:          {}", g.branch_expr);
    }
    if !g.commit_expr.is_empty() {
        println!("  commit_expr:          {}", g.commit_expr);
    }
    println!("  uncommitted_files:    {:?}", g.uncommitted_files_detection);
    println!("  commit_ignore:        {}", g.commit_ignore_patterns.join(", "));
    let mapping: Vec<String> = g.type_mapping.iter().map(|(b, c)| format!("{}={}", b, c)).collect();
    println!("  type_mapping:         {}", mapping.join(", "));

    println!("\n[ai]");
    println!("  enabled:              {}", config.ai.enabled);
    match settings {
        Ok(s) => {
            println!("  provider:             {}", s.provider);
            println!("  model:                {}", or_default(s.model.as_deref()));
            println!("  api_key:              {}", mask_key(&s.api_key));
            if let Some(url) = &s.base_url {
                println!("  base_url:             {}", url);
            }
            println!("  max_tokens:           {}", s.max_tokens);
            println!("  temperature:          {}", s.temperature);
            println!(
                "  timeout:              {}",
                s.timeout
                    .map(|t| format!("{}s", t.as_secs()))
                    .unwrap_or_else(|| "(default)".into())
            );
            println!("  prompt_style:         {:?}", s.prompt_style);
            if !s.exclude_patterns.is_empty() {
                println!("  exclude_patterns:     {}", s.exclude_patterns.join(", "));
            }
            if let Some(key) = &s.google_service_account_key {
                println!("  google_project_id:    {}", or_default(s.google_project_id.as_deref()));
                println!("  google_location:      {}", or_default(s.google_location.as_deref()));
                println!("  service_account_key:  {}", key.display());
            }
        }
        Err(e) => println!("  error:                {:#}", e),
    }

    println!("\nPriority: CLI args > config file > env var > defaults");
    Ok(())
}
