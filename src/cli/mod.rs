//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// sm - file-first project and issue tracker
#[derive(Parser, Debug)]
#[command(name = "sm", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Index database path (default: index.db beside the data root)
    #[arg(long, global = true, env = "SM_DB")]
    pub db: Option<PathBuf>,

    /// Root of the JSON document tree
    #[arg(long, global = true, env = "SM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Actor email recorded as reporter, comment author and in transitions
    #[arg(long, global = true, env = "SM_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

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
    /// Create the document tree and the index
    Init {
        /// Recreate the index even if it already exists
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Issue management
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },

    /// Project boards
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },

    /// Users known to the index
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Rebuild the index from the document tree
    Repair,

    /// Compare document locations, links and the index
    Check {
        /// Rebuild the index when anything is out of place
        #[arg(long)]
        fix: bool,
    },

    /// Re-sync documents edited outside the tracker until interrupted
    Watch {
        /// Rebuild the index before watching
        #[arg(long)]
        rebuild: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Project Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project and its default board
    Create(ProjectCreateArgs),

    /// List projects
    List {
        /// Include archived projects
        #[arg(short, long)]
        all: bool,
    },

    /// Show a project with issue counts
    Show {
        /// Project key
        key: String,
    },

    /// Update a project
    Update(ProjectUpdateArgs),

    /// Archive a project and every live issue in it
    Archive {
        /// Project key
        key: String,
    },

    /// Delete a project that has no issues
    Delete {
        /// Project key
        key: String,
    },
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project key (2-10 letters or digits, e.g. ENG)
    pub key: String,

    /// Project name
    pub name: String,

    /// Project description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Lead email
    #[arg(long)]
    pub lead: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProjectUpdateArgs {
    /// Project key
    pub key: String,

    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New lead email
    #[arg(long)]
    pub lead: Option<String>,

    /// New status (active, archived)
    #[arg(short, long)]
    pub status: Option<String>,
}

// ============================================================================
// Issue Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// Create a new issue
    Create(IssueCreateArgs),

    /// List issues
    List(IssueListArgs),

    /// Show issue details, links, comments and history
    Show {
        /// Tracking id (e.g. ENG-1)
        id: String,
    },

    /// Update issue fields
    Update(IssueUpdateArgs),

    /// Move an issue to another status
    Transition {
        /// Tracking id
        id: String,

        /// Target status (synonyms such as wip or closed work too)
        status: String,
    },

    /// Archive issue(s)
    Archive {
        /// Tracking ids (one or more)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Soft-delete issue(s), or remove them for good with --purge
    Delete {
        /// Tracking ids (one or more)
        #[arg(required = true)]
        ids: Vec<String>,

        /// Remove documents and rows permanently, stripping references
        #[arg(long)]
        purge: bool,
    },

    /// Bring deleted issue(s) back to the backlog
    Recover {
        /// Tracking ids (one or more)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Add a comment
    Comment {
        /// Tracking id
        id: String,

        /// Comment text
        body: String,
    },
}

#[derive(Args, Debug)]
pub struct IssueCreateArgs {
    /// Project key
    pub project: String,

    /// Issue title
    pub title: String,

    /// Issue description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Issue type (epic, story, task, bug, spike, decision)
    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    /// Priority (critical, high, medium, low, or P0-P3)
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Assignee email
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Labels (comma-separated or repeated)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Story points
    #[arg(long)]
    pub points: Option<i64>,

    /// Sprint name
    #[arg(long)]
    pub sprint: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Link as TYPE:ID, e.g. blocks:ENG-1 (repeatable)
    #[arg(long = "link")]
    pub links: Vec<String>,
}

#[derive(Args, Debug)]
pub struct IssueListArgs {
    /// Project key
    pub project: Option<String>,

    /// Only this status
    #[arg(short, long)]
    pub status: Option<String>,

    /// Only this type
    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    /// Include archived issues
    #[arg(long)]
    pub archived: bool,

    /// Include deleted issues
    #[arg(long)]
    pub deleted: bool,

    /// Maximum issues to return
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Args, Debug)]
pub struct IssueUpdateArgs {
    /// Tracking id
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New type
    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    /// New priority
    #[arg(short, long)]
    pub priority: Option<String>,

    /// New assignee email
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Replace labels (comma-separated or repeated)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Option<Vec<String>>,

    /// Story points
    #[arg(long)]
    pub points: Option<i64>,

    /// Sprint name
    #[arg(long)]
    pub sprint: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Replace links with these TYPE:ID entries (repeatable)
    #[arg(long = "link")]
    pub links: Vec<String>,

    /// Remove every link
    #[arg(long, conflicts_with = "links")]
    pub clear_links: bool,
}

// ============================================================================
// Board Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Show a project's board with issues in columns
    Show {
        /// Project key
        project: String,
    },

    /// Rename a board or replace its columns
    Update {
        /// Project key
        project: String,

        /// New board name
        #[arg(short, long)]
        name: Option<String>,

        /// Columns as a JSON array of {name, status_mapping, wip_limit}
        #[arg(long)]
        columns: Option<String>,
    },
}

// ============================================================================
// User Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Add a user, or rename an existing one
    Add {
        /// Email address
        email: String,

        /// First name
        #[arg(long)]
        first: Option<String>,

        /// Last name
        #[arg(long)]
        last: Option<String>,
    },

    /// List users
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_issue_create_with_links() {
        let cli = Cli::parse_from([
            "sm", "issue", "create", "ENG", "Fix login", "--link", "blocks:ENG-1", "-l", "auth,ui",
        ]);
        match cli.command {
            Commands::Issue {
                command: IssueCommands::Create(args),
            } => {
                assert_eq!(args.project, "ENG");
                assert_eq!(args.links, vec!["blocks:ENG-1"]);
                assert_eq!(args.labels, vec!["auth", "ui"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bulk_delete_requires_ids() {
        assert!(Cli::try_parse_from(["sm", "issue", "delete"]).is_err());
        let cli = Cli::try_parse_from(["sm", "issue", "delete", "ENG-1", "ENG-2", "--purge"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Issue {
                command: IssueCommands::Delete { purge: true, .. }
            }
        ));
    }
}
