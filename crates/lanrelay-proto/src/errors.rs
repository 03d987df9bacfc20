//! Protocol error types.
//!
//! Every variant is a protocol violation on the identity that produced the
//! input. The relay responds by dropping that session silently; none of
//! these errors are recoverable for the offending peer.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or validating wire input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// A frame (or unterminated carry) exceeded [`MAX_FRAME_LEN`].
    ///
    /// Bounds memory held per peer: without it a stream peer could grow the
    /// reassembly buffer indefinitely by never sending a newline.
    ///
    /// [`MAX_FRAME_LEN`]: crate::codec::MAX_FRAME_LEN
    #[error("frame too long: {len} bytes exceeds limit of {max}")]
    FrameTooLong {
        /// Observed length in bytes.
        len: usize,
        /// Maximum permitted length in bytes.
        max: usize,
    },

    /// Display name outside the permitted 1–15 character range.
    #[error("invalid display name: {len} characters, expected 1-15")]
    InvalidName {
        /// Observed name length in characters.
        len: usize,
    },
}
