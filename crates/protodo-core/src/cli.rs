use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "protodo",
    version,
    about = "Protodo: a single-user todo manager",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "protodorc")]
    pub protodorc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a new todo.
    Add {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// low, medium or high.
        #[arg(long)]
        priority: Option<String>,

        /// pending, in_progress or completed.
        #[arg(long)]
        status: Option<String>,

        /// Category id or name.
        #[arg(long)]
        category: Option<String>,

        /// Tag id or name; repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List todos, optionally narrowed by filter criteria.
    List {
        /// Repeatable; several statuses are OR-ed together.
        #[arg(long = "status")]
        statuses: Vec<String>,

        /// Repeatable; several priorities are OR-ed together.
        #[arg(long = "priority")]
        priorities: Vec<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Substring search over titles, descriptions and tags.
        #[arg(long)]
        search: Option<String>,
    },

    /// Toggle a todo between done and not done.
    Done { id: String },

    /// Set a todo's status directly.
    Status { id: String, status: String },

    /// Edit fields of an existing todo.
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "no_description")]
        description: Option<String>,

        #[arg(long = "no-description")]
        no_description: bool,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long, conflicts_with = "no_category")]
        category: Option<String>,

        #[arg(long = "no-category")]
        no_category: bool,

        /// Replaces the whole tag list; repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show every field of one todo.
    Show { id: String },

    /// Delete a todo.
    Delete { id: String },

    /// Move the todo at one list position to another (0-based).
    Move { from: usize, to: usize },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Manage tags.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Show the available color names.
    Palette,

    /// Show completion statistics.
    Stats,

    /// Import todos from a .json or .csv file.
    Import { file: PathBuf },

    /// Export all todos to a file.
    Export {
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Defaults to protodo-export-<date>.<ext> in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryAction {
    Add {
        name: String,

        #[arg(long, default_value = "blue")]
        color: String,

        #[arg(long, default_value = "Folder")]
        icon: String,
    },
    List,
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagAction {
    Add {
        name: String,

        #[arg(long, default_value = "gray")]
        color: String,
    },
    List,
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
