use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading the document and handing
/// off to the container runtime. There is no recovery path for any of
/// these; the caller reports and exits.
#[derive(Debug, Error)]
pub enum Error {
    /// The document is not syntactically valid, even under the permissive
    /// comment/trailing-comma dialect.
    #[error("malformed configuration in {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The document parsed, but a required field is missing or has the
    /// wrong shape.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A placeholder could not be resolved at build/run time.
    #[error("unresolved variable in {value:?}: {message}")]
    UnresolvedVariable { value: String, message: String },

    /// The container runtime failed. Its output is surfaced verbatim and
    /// never interpreted.
    #[error("{tool} exited with {status}:\n{stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
