use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the core crate.
///
/// The metric functions themselves are infallible: missing data and
/// degenerate arithmetic degrade to `None` fields instead of erroring.
/// What remains is malformed input at the boundaries, which is fatal to the
/// affected position only, never to the whole reporting cycle.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid position spec '{spec}': {reason}")]
    InvalidPosition { spec: String, reason: String },
}
