//! # error.rs
//!
//! Error type shared by every stage of a report run, and the exit code each
//! error maps to when the CLI terminates.

use std::path::PathBuf;

use thiserror::Error;

/// Process exit codes. Values follow `sysexits.h` where one fits.
pub mod exit_code {
    pub const USAGE: i32 = 64;
    pub const DATA_ERR: i32 = 65;
    pub const NO_INPUT: i32 = 66;
    pub const IO_ERR: i32 = 74;
    pub const CONFIG: i32 = 78;
    /// Shell convention for "command not found".
    pub const NOT_FOUND: i32 = 127;
}

#[derive(Error, Debug)]
pub enum DiffexError {
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No {kind} template found, searched: {}", format_searched(searched))]
    TemplateNotFound { kind: String, searched: Vec<PathBuf> },

    #[error("Renderer '{program}' is not installed or not found in PATH")]
    RendererNotFound { program: String },

    #[error("Renderer exited with code {code}")]
    RendererFailed { code: i32 },

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DiffexResult<T> = Result<T, DiffexError>;

impl DiffexError {
    /// Exit code the CLI terminates with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DiffexError::InputNotFound { .. } | DiffexError::TemplateNotFound { .. } => {
                exit_code::NO_INPUT
            }
            DiffexError::InvalidInput(_) => exit_code::DATA_ERR,
            DiffexError::InvalidParameter(_) => exit_code::USAGE,
            DiffexError::RendererNotFound { .. } => exit_code::NOT_FOUND,
            DiffexError::RendererFailed { code } => *code,
            DiffexError::Settings(_) => exit_code::CONFIG,
            DiffexError::Yaml(_) | DiffexError::Csv(_) | DiffexError::Io(_) => exit_code::IO_ERR,
        }
    }
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "(no candidate locations)".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = DiffexError::InputNotFound {
            path: PathBuf::from("counts.csv"),
        };
        assert_eq!(missing.exit_code(), 66);
        assert_eq!(
            DiffexError::RendererNotFound {
                program: "quarto".to_string()
            }
            .exit_code(),
            127
        );
        assert_eq!(DiffexError::RendererFailed { code: 3 }.exit_code(), 3);
        assert_eq!(
            DiffexError::InvalidParameter("padj".to_string()).exit_code(),
            64
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DiffexError = io_error.into();
        assert!(matches!(err, DiffexError::Io(_)));
        assert_eq!(err.exit_code(), exit_code::IO_ERR);
    }

    #[test]
    fn test_template_not_found_message() {
        let err = DiffexError::TemplateNotFound {
            kind: "deg".to_string(),
            searched: vec![PathBuf::from("/a/deg_report.qmd"), PathBuf::from("/b/deg_report.qmd")],
        };
        let msg = err.to_string();
        assert!(msg.contains("deg"));
        assert!(msg.contains("/a/deg_report.qmd, /b/deg_report.qmd"));
    }
}
