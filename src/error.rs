//! Error types for console probing.
//!
//! Every fallible probe returns [`Result<T>`]. The only place errors are
//! swallowed is the speculative version lookup in the host classifier; the
//! binary's entry point turns anything else into a one-line diagnostic.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ConsoleError {
    /// An OS primitive reported failure. Carries the primitive's name.
    #[error("{0} failed")]
    PrimitiveCallFailed(&'static str),

    #[error("Failed to find the console window after {attempts} attempts")]
    WindowNotFound { attempts: u32 },

    #[error("Executable path does not fit in {max} UTF-16 units")]
    BufferGrowthExceededMax { max: usize },

    #[error("Wrong signature value in version info resource: {found:#010X}")]
    InvalidVersionSignature { found: u32 },

    #[error("Malformed version info resource: {0}")]
    MalformedVersionResource(&'static str),

    #[error("Path \"{path}\" has no directory separator")]
    PathWithoutBasename { path: String },

    #[error("This operation requires a console, but none is attached")]
    ConsoleRequiredButAbsent,

    #[error("Encoding assumption violated: {0}")]
    EncodingAssumptionViolated(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Failure modes of the executable path query.
///
/// `BufferTooSmall` is the one signal the resolver reacts to by growing its
/// buffer; everything else ends the walk.
#[derive(Error, Debug)]
pub enum ImagePathError {
    #[error("Buffer too small for the executable path")]
    BufferTooSmall,

    #[error(transparent)]
    Failed(#[from] ConsoleError),
}
