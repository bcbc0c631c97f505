// src/cli.rs
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "workfac",
    version,
    about = "Git workflow assistant with AI-generated commit messages",
    after_help = "EXAMPLES:
    workfac init PROJ-12 \"Login form\" feature     # Start a workflow from main
    workfac init 42 \"Crash on start\" fix -r develop
    workfac commit \"validate email field\" -a     # Prefixed commit, then push
    workfac ai-commit -a                          # Let the AI write the message
    workfac pause                                 # Back to the reference branch
    workfac use feature/PROJ-12-Login-form        # Resume a workflow
    workfac end                                   # Drop the local branch and record

CONFIGURATION:
    ~/.workfac.toml (or $WORKFAC_CONFIG), sections [global] and [ai]"
)]
pub struct Cli {
    /// AI provider override (openai, claude, vertexai, llamacpp)
    #[arg(
        long,
        global = true,
        value_parser = [
            "openai", "claude", "anthropic", "vertexai", "vertex", "gemini",
            "llamacpp", "llama.cpp", "local",
        ]
    )]
    pub provider: Option<String>,

    /// Model override for the selected provider
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Generation deadline in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new workflow: create its branch and make it current
    Init {
        /// Jira ticket key, or GitLab merge request number
        issue: String,

        /// Short description, used in the branch name
        title: String,

        /// Branch type (feature, fix, ...), mapped to a commit type
        branch_type: String,

        /// Commit type, instead of the one mapped from the branch type
        #[arg(short = 'c', long)]
        commit_type: Option<String>,

        /// Branch to start from (default: the remote default branch)
        #[arg(short = 'r', long)]
        ref_branch: Option<String>,
    },

    /// Switch to an existing workflow
    Use {
        /// Workflow name (see `workfac list`)
        work: String,
    },

    /// Leave the current workflow and go back to its reference branch
    Pause {
        /// Branch to switch to instead of the reference branch
        #[arg(short = 'm', long)]
        main_branch: Option<String>,

        /// Skip the uncommitted files check
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Finish a workflow: delete its local branch and record
    End {
        /// Workflow to end (default: current)
        #[arg(short = 'w', long)]
        work: Option<String>,

        /// Skip the uncommitted files check
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// List recorded workflows
    List,

    /// Show the current workflow and working tree status
    Status,

    /// Commit with the workflow prefix, then push
    Commit {
        /// Message appended to the workflow commit prefix
        message: String,

        /// Stage all changes first (ignored patterns stay unstaged)
        #[arg(short = 'a', long)]
        all: bool,

        /// Do not push after committing
        #[arg(short = 'n', long)]
        no_push: bool,

        /// Allow committing without a current workflow
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Commit with an AI-generated message
    ///
    /// Generates a message from the staged diff, lets you accept, edit or
    /// regenerate it, then commits with the workflow prefix and pushes.
    AiCommit {
        /// Stage all changes first (ignored patterns stay unstaged)
        #[arg(short = 'a', long)]
        all: bool,

        /// Do not push after committing
        #[arg(short = 'n', long)]
        no_push: bool,

        /// Allow committing without a current workflow
        #[arg(short = 'f', long)]
        force: bool,

        /// Skip the pre-commit hook
        #[arg(long)]
        no_verify: bool,
    },

    /// Show the resolved configuration
    Config,

    /// Open the repository web page
    Open,
}
