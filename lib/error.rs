//! Error type shared by all configuration, solve, and cache operations.

use thiserror::Error;

/// Convenience alias for results carrying an [`ObError`].
pub type Result<T> = std::result::Result<T, ObError>;

#[derive(Debug, Error)]
pub enum ObError {
    /// The time grid bounds or step count are unusable.
    #[error("invalid time grid: {0}")]
    TimeGrid(String),

    /// The atomic system description is inconsistent.
    #[error("invalid atom: {0}")]
    Atom(String),

    /// A field names a time function that doesn't exist.
    #[error("unknown time function '{0}'")]
    TimeFunc(String),

    /// A time function argument is missing or out of its domain.
    #[error("time function '{func}' requires a valid '{arg}' argument")]
    TimeFuncArg { func: String, arg: String },

    /// An initial state could not be converted into a density matrix for the
    /// atom.
    #[error("initial state is not a valid density matrix for this atom")]
    InitialState,

    /// An observable has the wrong shape; the payload is its position in the
    /// list of observables.
    #[error("observable {0} does not match the dimension of the atom")]
    Observable(usize),

    /// The requested solver method is not supported.
    #[error("unsupported solver method '{0}'")]
    Method(String),

    /// The solver rejected its inputs or failed to integrate.
    #[error("solver error: {0}")]
    Solver(String),

    /// A cached result file has the wrong contents.
    #[error("malformed result cache: {0}")]
    Cache(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    #[error(transparent)]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),
}
