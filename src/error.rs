//! Error types.
//!
//! - `FitError` is what the library returns (fitting, result lists, spike data).
//! - `AppError` is what the `bumps` binary reports: a message plus a process exit code.

use thiserror::Error;

/// Errors raised by the fitting library.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Parallel arrays that must stay index-aligned have different lengths.
    #[error("inconsistent lengths in {context}: {lengths:?}")]
    InconsistentLengths {
        context: &'static str,
        lengths: Vec<usize>,
    },

    /// A fit record of the wrong kind was appended to a result list.
    #[error("type mismatch: expected {expected} record, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The nonlinear least-squares solver did not converge.
    #[error("solver did not converge after {evaluations} evaluations: {reason}")]
    SolverNonConvergence { reason: String, evaluations: usize },

    /// A fit was requested on zero samples.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Invalid arguments or data (window parameters, spike senders, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type FitResult<T> = std::result::Result<T, FitError>;

/// Exit code used for fitting failures surfaced by the binary.
const FIT_EXIT_CODE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = match err {
            FitError::InvalidInput(_) => 2,
            _ => FIT_EXIT_CODE,
        };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
