//! Error handling for the LocusView CLI

use locusview_core::ViewportError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for LocusView CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Parsing error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Script error at step {step}: {message}")]
    Script { step: usize, message: String },

    #[error("Engine error: {0}")]
    Engine(#[from] ViewportError),
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn parse<S: Into<String>>(file: S, message: S) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn script<S: Into<String>>(step: usize, message: S) -> Self {
        Self::Script {
            step,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your locusview.toml configuration file\n\
                 • Use 'locusview config --example' to generate a sample configuration\n\
                 • Verify that all [engine] values are positive",
            );
        }

        CliError::Script { .. } | CliError::Parse { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Every step needs an 'action' key, e.g. action = \"zoom\"\n\
                 • Viewports must be declared under [[viewports]] before use\n\
                 • Run with -v to see each step as it is applied",
            );
        }

        CliError::Engine(ViewportError::SurfaceNotMeasured { .. }) => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Add a 'measure' step for the viewport before zooming it",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use locusview_core::ViewportId;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("session.toml"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: CliError = ViewportError::surface_not_measured(ViewportId(2)).into();
        assert!(matches!(err, CliError::Engine(_)));
        assert!(format_error_with_suggestions(&err).contains("'measure' step"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
