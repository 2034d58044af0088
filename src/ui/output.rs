//! ui::output
//!
//! User-facing output.
//!
//! # Design
//!
//! Human-readable messages go to stderr so that stdout stays free for the
//! one machine-readable value a run produces. Under GitHub Actions
//! (`GITHUB_ACTIONS=true`) messages become workflow commands
//! (`::notice::`, `::group::`, ...) on stdout, and output values are
//! appended to the file named by `GITHUB_OUTPUT`.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - warnings, errors and output values only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Notice,
    Warning,
    Error,
}

impl Level {
    fn command(&self) -> &'static str {
        match self {
            Level::Notice => "notice",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// Logger for one run.
#[derive(Debug, Clone)]
pub struct Logger {
    verbosity: Verbosity,
    actions: bool,
    output_file: Option<PathBuf>,
}

impl Logger {
    pub fn new(verbosity: Verbosity, actions: bool, output_file: Option<PathBuf>) -> Self {
        Self {
            verbosity,
            actions,
            output_file,
        }
    }

    /// Detect GitHub Actions from the environment.
    pub fn from_env(verbosity: Verbosity) -> Self {
        let actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(verbosity, actions, output_file)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_actions(&self) -> bool {
        self.actions
    }

    /// Plain progress message.
    pub fn info(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            eprintln!("{}", message);
        }
    }

    pub fn notice(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(Level::Notice, &message.to_string());
        }
    }

    pub fn warning(&self, message: impl Display) {
        self.emit(Level::Warning, &message.to_string());
    }

    pub fn error(&self, message: impl Display) {
        self.emit(Level::Error, &message.to_string());
    }

    /// A titled block, collapsible under Actions.
    pub fn group(&self, title: impl Display, body: impl Display) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        if self.actions {
            println!("::group::{}", escape_data(&title.to_string()));
            println!("{}", body);
            println!("::endgroup::");
        } else {
            eprintln!("{}", title);
            eprintln!("{}", body);
        }
    }

    fn emit(&self, level: Level, message: &str) {
        if self.actions {
            println!("{}", format_command(level, message));
        } else {
            match level {
                Level::Notice => eprintln!("{}", message),
                Level::Warning => eprintln!("warning: {}", message),
                Level::Error => eprintln!("error: {}", message),
            }
        }
    }

    /// Publish a named output value.
    ///
    /// Appended to `GITHUB_OUTPUT` when set, otherwise printed to stdout.
    pub fn output(&self, name: &str, value: &str) -> io::Result<()> {
        match &self.output_file {
            Some(path) => append_output(path, name, value),
            None => {
                println!("{}", value);
                Ok(())
            }
        }
    }
}

/// Format an Actions workflow command.
pub fn format_command(level: Level, message: &str) -> String {
    format!("::{}::{}", level.command(), escape_data(message))
}

/// Escape workflow command data.
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Append `name` to an Actions output file using a heredoc block.
pub fn append_output(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(file, "{}", heredoc(name, value, &delimiter))
}

fn heredoc(name: &str, value: &str, delimiter: &str) -> String {
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}
