/// Recoverable parse-time errors. Programmer-contract violations inside the
/// store (double-add, zero ID, `NON_EXISTING` multi-index, unsupported
/// custom-merge-target) are deliberately *not* represented here: they are
/// bugs in a caller, not data the caller can act on, and stay as panics.
#[derive(Debug, thiserror::Error)]
pub enum OgError {
    #[error("invalid SID string: {0}")]
    InvalidSid(String),

    #[error("invalid GUID string: {0}")]
    InvalidGuid(String),
}
