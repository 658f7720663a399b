use bindery::BindError;
use thiserror::Error;

/// Errors surfaced by the demo binary.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("view model wiring failed: {0}")]
    Bind(#[from] BindError),
    #[error("{var} must be `context` or `immediate`, got `{value}`")]
    InvalidDispatch { var: &'static str, value: String },
    #[error("invalid log filter `{directive}`: {source}")]
    LogFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to start GUI context `{name}`: {source}")]
    ContextThread {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("GUI context `{0}` stopped before the session finished")]
    SessionLost(String),
}

pub type Result<T> = std::result::Result<T, DemoError>;
