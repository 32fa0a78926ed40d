use thiserror::Error;

/// Failures that abort a single invocation.
///
/// An unrecognized event type is not an error: the dispatcher answers it with
/// the apology bundle instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("malformed identity `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn missing(field: impl Into<String>) -> Self {
        Error::MissingField(field.into())
    }

    /// Stable name reported as `errorType` to the invoking runtime.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingField(_) => "MissingFieldError",
            Error::Parse { .. } => "ParseError",
            Error::Configuration(_) => "ConfigurationError",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
