use thiserror::Error;

/// Errors emitted while compiling a pattern or generating from it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RexError {
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
    #[error("misplaced anchor '{anchor}': it must sit at the start or end of the pattern")]
    MisplacedAnchor { anchor: String },
    #[error("invalid automaton: {0}")]
    InvalidAutomaton(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot parse '{pattern}': {message}")]
    Parse { pattern: String, message: String },
}

pub type Result<T> = std::result::Result<T, RexError>;
