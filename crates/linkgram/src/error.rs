use std::path::PathBuf;

/// Errors surfaced by sessions, the native loader and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load link-grammar library {}: {source}", path.display())]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("link-grammar library is missing required symbol `{symbol}`")]
    MissingSymbol { symbol: &'static str },

    /// Options or dictionary creation failed. The session is unusable.
    #[error("parser initialization failed: {0}")]
    Initialization(String),

    #[error("no linkage found for sentence")]
    NoLinkageFound,

    #[error("sentence parse failed with status {0}")]
    ParseFailed(i32),

    /// The engine returned something its contract rules out: a null handle
    /// or string, a negative index, or a malformed constituent tree.
    #[error("engine contract violation: {0}")]
    EngineContractViolation(String),

    /// The loaded engine build does not export an optional function.
    #[error("engine does not support `{0}`")]
    Unsupported(&'static str),

    #[error("input text contains an interior NUL byte")]
    InvalidText,

    #[error("parser session is poisoned by an earlier panic")]
    SessionPoisoned,

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Error::EngineContractViolation(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
