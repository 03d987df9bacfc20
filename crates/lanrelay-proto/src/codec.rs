//! Newline framing for both transports.
//!
//! The stream transport delivers arbitrary byte chunks: a frame may arrive
//! split across chunks, or several frames may arrive in one chunk.
//! [`LineCodec`] reassembles them, retaining unterminated leftover bytes
//! until the next chunk. The datagram transport never splits a frame, so
//! [`split_datagram`] decodes a whole packet statelessly.
//!
//! Frame text is trimmed of surrounding whitespace (this also strips `\r`
//! from peers that send CRLF). Blank frames are returned as empty strings;
//! whether to ignore them is the caller's decision, not the codec's.

use bytes::BytesMut;

use crate::errors::{ProtocolError, Result};

/// Maximum length of a single frame in bytes, excluding the newline.
///
/// Bounds the per-peer reassembly buffer. Exceeding it is a protocol
/// violation on that identity.
pub const MAX_FRAME_LEN: usize = 1024;

/// Incremental newline-frame splitter for the stream transport.
///
/// Feed raw chunks with [`LineCodec::decode`]; complete frames come out,
/// leftover bytes stay in the codec and are prefixed to the next chunk.
///
/// # Invariants
///
/// - Input with no newline yields zero frames and all bytes carried forward.
/// - The carry never exceeds [`MAX_FRAME_LEN`] bytes; overflow is an error.
/// - After an error the codec should be discarded along with its session.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Unterminated bytes carried between chunks.
    carry: BytesMut,
}

impl LineCodec {
    /// Create an empty codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return all frames completed by it.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidUtf8`] if a completed frame is not UTF-8
    /// - [`ProtocolError::FrameTooLong`] if a frame or the unterminated
    ///   carry exceeds [`MAX_FRAME_LEN`]
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.carry.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            if pos > MAX_FRAME_LEN {
                return Err(ProtocolError::FrameTooLong { len: pos, max: MAX_FRAME_LEN });
            }

            let line = self.carry.split_to(pos.saturating_add(1));
            let text = std::str::from_utf8(&line[..pos]).map_err(|_| ProtocolError::InvalidUtf8)?;
            frames.push(text.trim().to_string());
        }

        if self.carry.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLong { len: self.carry.len(), max: MAX_FRAME_LEN });
        }

        Ok(frames)
    }

    /// Number of unterminated bytes currently carried.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

/// Decode one whole datagram into its frames.
///
/// A datagram is never split across packets, but may carry several
/// newline-separated frames (and the final newline may be absent).
///
/// # Errors
///
/// - [`ProtocolError::InvalidUtf8`] if the datagram is not UTF-8
/// - [`ProtocolError::FrameTooLong`] if any contained frame exceeds
///   [`MAX_FRAME_LEN`]
pub fn split_datagram(datagram: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(datagram).map_err(|_| ProtocolError::InvalidUtf8)?;

    let mut frames = Vec::new();
    for line in text.lines() {
        if line.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLong { len: line.len(), max: MAX_FRAME_LEN });
        }
        frames.push(line.trim().to_string());
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn frame_split_across_chunks_is_reassembled() {
        let mut codec = LineCodec::new();

        assert_eq!(codec.decode(b"HEL").unwrap(), Vec::<String>::new());
        assert_eq!(codec.pending(), 3);

        assert_eq!(codec.decode(b"LO\n").unwrap(), vec!["HELLO"]);
        assert_eq!(codec.pending(), 0);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut codec = LineCodec::new();

        let frames = codec.decode(b"one\ntwo\nthr").unwrap();
        assert_eq!(frames, vec!["one", "two"]);
        assert_eq!(codec.pending(), 3);

        let frames = codec.decode(b"ee\n").unwrap();
        assert_eq!(frames, vec!["three"]);
    }

    #[test]
    fn chunk_without_newline_yields_nothing() {
        let mut codec = LineCodec::new();
        assert!(codec.decode(b"no terminator").unwrap().is_empty());
        assert_eq!(codec.pending(), 13);
    }

    #[test]
    fn crlf_and_whitespace_are_trimmed() {
        let mut codec = LineCodec::new();
        assert_eq!(codec.decode(b"  hello \r\n").unwrap(), vec!["hello"]);
    }

    #[test]
    fn blank_line_is_an_empty_frame() {
        let mut codec = LineCodec::new();
        assert_eq!(codec.decode(b"\n").unwrap(), vec![""]);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut codec = LineCodec::new();
        let result = codec.decode(&[0xff, 0xfe, b'\n']);
        assert_eq!(result, Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn oversized_carry_is_rejected() {
        let mut codec = LineCodec::new();
        let chunk = vec![b'a'; MAX_FRAME_LEN + 1];
        assert!(matches!(codec.decode(&chunk), Err(ProtocolError::FrameTooLong { .. })));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = LineCodec::new();
        // Grow the carry just under the limit, then complete the frame over it.
        codec.decode(&vec![b'a'; MAX_FRAME_LEN]).unwrap();
        assert!(matches!(codec.decode(b"aa\n"), Err(ProtocolError::FrameTooLong { .. })));
    }

    #[test]
    fn datagram_with_trailing_newline() {
        assert_eq!(split_datagram(b"hello\n").unwrap(), vec!["hello"]);
    }

    #[test]
    fn datagram_with_multiple_frames() {
        assert_eq!(split_datagram(b"a\nb\nc").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn datagram_invalid_utf8_is_rejected() {
        assert_eq!(split_datagram(&[0x80, 0x81]), Err(ProtocolError::InvalidUtf8));
    }

    proptest! {
        /// Splitting any UTF-8 input at any point never loses or corrupts
        /// frames compared to feeding it whole.
        #[test]
        fn chunking_is_transparent(text in "[ -~]{0,200}\n", split in 0usize..200) {
            let bytes = text.as_bytes();
            let split = split.min(bytes.len());

            let mut whole = LineCodec::new();
            let expected = whole.decode(bytes).unwrap();

            let mut chunked = LineCodec::new();
            let mut frames = chunked.decode(&bytes[..split]).unwrap();
            frames.extend(chunked.decode(&bytes[split..]).unwrap());

            prop_assert_eq!(frames, expected);
        }

        /// The codec never panics on arbitrary bytes.
        #[test]
        fn decode_never_panics(chunks in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..64), 0..8,
        )) {
            let mut codec = LineCodec::new();
            for chunk in &chunks {
                if codec.decode(chunk).is_err() {
                    break;
                }
            }
        }
    }
}
