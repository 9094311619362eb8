use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File contains no section headers (line {line})")]
    MissingSectionHeader { line: usize },

    #[error("Parse error at line {line}: {content:?}")]
    Parse { line: usize, content: String },

    #[error("Cannot store [{section}] {key}: {reason}")]
    Unrepresentable {
        section: String,
        key: String,
        reason: &'static str,
    },

    #[error("Cannot determine home directory to expand {}", .0.display())]
    HomeDirNotFound(PathBuf),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
