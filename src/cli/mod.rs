//! CLI definitions and entry point.

use crate::storage::{IssueFilter, MilestoneState};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Issue tracker with labels, milestones and saved filters (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "issues", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (auto-discover .issues/issues.db if not set)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Act as this user (defaults to the logged-in session)
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize an issue tracker workspace
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Manage users and sessions
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage the label catalog
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },

    /// Manage milestones
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Create a new issue
    Create(CreateArgs),

    /// Show issue details
    Show {
        /// Issue ID
        id: i64,
    },

    /// List open or closed issues, newest first
    List(ListArgs),

    /// Close issues
    Close(StateArgs),

    /// Reopen issues
    Reopen(StateArgs),

    /// Update an issue
    Update(UpdateArgs),

    /// Manage comments
    #[command(alias = "comments")]
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Filter issues, summarize, or manage saved filters
    Filter(FilterArgs),

    /// Show the audit history of an issue
    History(HistoryArgs),

    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version,
}

/// Arguments for the completions command.
#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    Elvish,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a new user
    Register(CredentialsArgs),
    /// Log in and remember the session for this workspace
    Login(CredentialsArgs),
    /// End the remembered session
    Logout,
    /// List registered user ids
    List,
}

#[derive(Args, Debug, Clone)]
pub struct CredentialsArgs {
    /// User id (4-20 letters, digits, `_` or `-`)
    pub user_id: String,

    /// Password
    #[arg(long, short = 'p', env = "ISSUES_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum LabelCommands {
    /// Create a label
    Create(LabelCreateArgs),
    /// List all labels
    List,
    /// Update a label
    Update(LabelUpdateArgs),
    /// Delete a label (removes it from every issue)
    Delete {
        /// Label ID or name
        label: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LabelCreateArgs {
    /// Label name
    pub name: String,

    /// Description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Text color (#RRGGBB)
    #[arg(long, default_value = "#FFFFFF")]
    pub text_color: String,

    /// Background color (#RRGGBB)
    #[arg(long, default_value = "#6A737D")]
    pub bg_color: String,
}

#[derive(Args, Debug, Clone)]
pub struct LabelUpdateArgs {
    /// Label ID or name
    pub label: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New description (empty string clears it)
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub text_color: Option<String>,

    #[arg(long)]
    pub bg_color: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum MilestoneCommands {
    /// Create a milestone
    Create(MilestoneCreateArgs),
    /// List milestones with progress
    List {
        /// Which milestones to show
        #[arg(long, value_enum, default_value_t = MilestoneStateArg::Open)]
        state: MilestoneStateArg,
    },
    /// Update a milestone
    Update(MilestoneUpdateArgs),
    /// Delete a milestone (its issues keep existing without one)
    Delete {
        /// Milestone ID or title
        milestone: String,
    },
    /// Close a milestone
    Close {
        /// Milestone ID or title
        milestone: String,
    },
    /// Reopen a milestone
    Reopen {
        /// Milestone ID or title
        milestone: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum MilestoneStateArg {
    #[default]
    Open,
    Closed,
    All,
}

impl From<MilestoneStateArg> for MilestoneState {
    fn from(arg: MilestoneStateArg) -> Self {
        match arg {
            MilestoneStateArg::Open => Self::Open,
            MilestoneStateArg::Closed => Self::Closed,
            MilestoneStateArg::All => Self::All,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MilestoneCreateArgs {
    /// Milestone title
    pub title: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Deadline (YYYY-MM-DD, +Nd, +Nw, today, tomorrow)
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MilestoneUpdateArgs {
    /// Milestone ID or title
    pub milestone: String,

    #[arg(long)]
    pub title: Option<String>,

    /// New description (empty string clears it)
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// New deadline
    #[arg(long, conflicts_with = "no_deadline")]
    pub deadline: Option<String>,

    /// Remove the deadline
    #[arg(long)]
    pub no_deadline: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// Issue title
    pub title: String,

    /// First comment (a placeholder is used when omitted)
    #[arg(long, short = 'm')]
    pub content: Option<String>,

    /// Labels by name or ID (comma-separated)
    #[arg(long, short = 'l', value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Assignee user ids (comma-separated)
    #[arg(long, short = 'a', value_delimiter = ',')]
    pub assignees: Vec<String>,

    /// Milestone by title or ID
    #[arg(long)]
    pub milestone: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Show open issues (default)
    #[arg(long, conflicts_with = "closed")]
    pub open: bool,

    /// Show closed issues
    #[arg(long)]
    pub closed: bool,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: i64,

    /// Issues per page (defaults to the configured page-size)
    #[arg(long)]
    pub page_size: Option<i64>,
}

/// Arguments for close and reopen.
#[derive(Args, Debug, Clone, Default)]
pub struct StateArgs {
    /// Issue IDs
    #[arg(required = true)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Issue ID
    pub id: i64,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// Replace labels (names or IDs, comma-separated; empty clears)
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub labels: Option<Vec<String>>,

    /// Replace assignees (comma-separated; empty clears)
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub assignees: Option<Vec<String>>,

    /// Move to milestone (title or ID)
    #[arg(long, conflicts_with = "no_milestone")]
    pub milestone: Option<String>,

    /// Detach from its milestone
    #[arg(long)]
    pub no_milestone: bool,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Comment on an issue
    Add(CommentAddArgs),
    /// Edit one of your comments
    Edit(CommentEditArgs),
    /// List comments on an issue
    List {
        /// Issue ID
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommentAddArgs {
    /// Issue ID
    pub id: i64,

    /// Comment text
    pub text: Vec<String>,

    /// Comment text (alternative flag)
    #[arg(long = "message", short = 'm')]
    pub message: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CommentEditArgs {
    /// Comment ID
    pub comment_id: i64,

    /// New text
    pub text: Vec<String>,
}

/// Filter predicates shared by `filter` and `filter save`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Only open issues
    #[arg(long, conflicts_with = "closed")]
    pub open: bool,

    /// Only closed issues
    #[arg(long)]
    pub closed: bool,

    /// Assigned to this user
    #[arg(long)]
    pub assignee: Option<String>,

    /// Carrying every one of these labels (comma-separated)
    #[arg(long = "label", short = 'l', value_delimiter = ',')]
    pub labels: Vec<String>,

    /// In the milestone with this title
    #[arg(long)]
    pub milestone: Option<String>,

    /// Written by this user
    #[arg(long)]
    pub author: Option<String>,
}

impl From<&FilterCriteria> for IssueFilter {
    fn from(criteria: &FilterCriteria) -> Self {
        let is_closed = if criteria.closed {
            Some(true)
        } else if criteria.open {
            Some(false)
        } else {
            None
        };
        Self {
            is_closed,
            assignee: criteria.assignee.clone(),
            labels: criteria.labels.clone(),
            milestone: criteria.milestone.clone(),
            author: criteria.author.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
#[command(args_conflicts_with_subcommands = true)]
pub struct FilterArgs {
    #[command(subcommand)]
    pub command: Option<FilterCommands>,

    #[command(flatten)]
    pub criteria: FilterCriteria,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FilterCommands {
    /// Issue counts, labels, open milestones and authors
    Summary,
    /// Save a named filter
    Save {
        /// Filter name
        name: String,

        #[command(flatten)]
        criteria: FilterCriteria,
    },
    /// List your saved filters
    Saved,
    /// Delete one of your saved filters
    Delete {
        /// Saved filter ID
        id: i64,
    },
    /// Run one of your saved filters
    Apply {
        /// Saved filter ID
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Issue ID
    pub id: i64,

    /// Maximum number of events (0 = all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to listen on (defaults to the configured bind)
    #[arg(long)]
    pub bind: Option<String>,
}
