use thiserror::Error;

/// Error taxonomy of the crate.
///
/// Every fallible operation returns `Result<_, GonioError>`. An empty
/// solution list is **not** an error: the solver reports it as a normal
/// outcome, and [`GonioError::SolveFailed`] is reserved for genuine
/// numerical breakdown (NaN or infinite residuals, singular Jacobians on
/// every attempt).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GonioError {
    #[error("bad input for \"{name}\": {reason}")]
    BadInput { name: String, reason: String },

    #[error("value {value} out of range [{min}, {max}] for parameter \"{name}\"")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate configuration: {0}")]
    Degenerate(String),

    #[error("the \"{0}\" engine must be initialized before this operation")]
    NotInitialized(String),

    #[error("numerical breakdown while solving \"{name}\": {reason}")]
    SolveFailed { name: String, reason: String },

    #[error("axis \"{0}\" added twice with an incompatible transformation")]
    IncompatibleTransformation(String),
}

impl GonioError {
    /// Shortcut used all over the crate to build a [`GonioError::BadInput`]
    /// without repeating the struct syntax.
    pub(crate) fn bad_input(name: &str, reason: impl Into<String>) -> Self {
        GonioError::BadInput {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
