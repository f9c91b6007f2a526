use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

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
    name = "myfuture",
    version,
    about = "My Future: a small personal task list with due-date reminders",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rcfile", global = true)]
    pub rcfile: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a task at the top of the list.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        /// Due date: RFC 3339, YYYY-MM-DD, "YYYY-MM-DD HH:MM", today, tomorrow,
        /// +N[m|h|d|w] or "in N hours".
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks, newest first.
    List {
        /// all, active or completed. Defaults to `default.filter`.
        #[arg(long, short = 'f')]
        filter: Option<String>,
    },
    /// Show one task in full.
    Info { id: String },
    /// Flip a task between completed and todo.
    Toggle { id: String },
    /// Set the status: todo, in-progress or completed.
    Status { id: String, status: String },
    /// Replace the comments of a task. No text clears them.
    Comment {
        id: String,
        #[arg(num_args = 0..)]
        text: Vec<String>,
    },
    /// Set or clear (`none`) the due date.
    Due { id: String, when: String },
    /// Delete a task.
    #[command(alias = "delete")]
    Rm { id: String },
    /// Delete every completed task.
    ClearCompleted,
    /// Print the per-filter task counts.
    Counts,
    /// Stay running and deliver reminders as tasks fall due.
    Watch,
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
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> PreprocessedArgs {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    }
}
