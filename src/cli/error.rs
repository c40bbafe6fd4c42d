//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::TreeError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("{0}")]
    Usage(String),

    #[error("{failed} of {total} families failed verification")]
    VerifyFailed { failed: usize, total: usize },
}

impl From<TreeError> for CliError {
    fn from(e: TreeError) -> Self {
        CliError::Application(ApplicationError::Tree(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::VerifyFailed { .. } => crate::exitcode::DATAERR,
            CliError::Application(e) => match e {
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Snapshot { .. } => crate::exitcode::DATAERR,
                ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                ApplicationError::Tree(TreeError::NodeNotFound(_)) => crate::exitcode::NOINPUT,
                ApplicationError::Tree(_) => crate::exitcode::DATAERR,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;

    #[test]
    fn given_errors_when_mapping_exit_codes_then_sysexits_values() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), 64);
        assert_eq!(CliError::from(TreeError::NodeNotFound(NodeId(9))).exit_code(), 66);
        assert_eq!(CliError::from(TreeError::NoRoot).exit_code(), 65);
        assert_eq!(
            CliError::from(ApplicationError::Config {
                message: "bad".into()
            })
            .exit_code(),
            78
        );
    }
}
