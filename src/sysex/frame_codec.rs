use std::fmt;

use thiserror::Error;

use crate::utils::format_hex_preview;

/// SysEx start-of-exclusive delimiter.
pub const SYSEX_START: u8 = 0xF0;
/// SysEx end-of-exclusive delimiter.
pub const SYSEX_END: u8 = 0xF7;

const DISPLAY_PREVIEW_BYTES: usize = 16;

/// Errors returned when treating raw bytes as a SysEx frame.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The bytes do not start with `F0` and end with `F7`.
    #[error("{len} byte(s) are not delimited by F0 ... F7")]
    NotFramed { len: usize },
}

/// One complete SysEx message, delimiters included.
///
/// The first byte is always `F0` and the last is always `F7`, so a frame holds
/// at least two bytes. Interior bytes are passed through untouched.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SysexFrame(Vec<u8>);

impl SysexFrame {
    /// Returns the full frame, delimiters included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the bytes between the delimiters.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.0[1..self.0.len() - 1]
    }

    /// Consumes the frame and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for SysexFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<Vec<u8>> for SysexFrame {
    type Error = FrameCodecError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if !FrameCodec::is_framed(&bytes) {
            return Err(FrameCodecError::NotFramed { len: bytes.len() });
        }
        Ok(Self(bytes))
    }
}

impl From<SysexFrame> for Vec<u8> {
    fn from(frame: SysexFrame) -> Self {
        frame.0
    }
}

impl fmt::Debug for SysexFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SysexFrame")
            .field(&format_hex_preview(&self.0, DISPLAY_PREVIEW_BYTES))
            .finish()
    }
}

impl fmt::Display for SysexFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex_preview(&self.0, DISPLAY_PREVIEW_BYTES))
    }
}

/// Stateless SysEx delimiter codec.
pub struct FrameCodec;

impl FrameCodec {
    /// Surrounds `body` with `F0` and `F7`.
    ///
    /// ```
    /// use wsx::FrameCodec;
    ///
    /// let frame = FrameCodec::wrap(&[0x42, 0x30, 0x3E, 0x00]);
    /// assert_eq!(&[0xF0, 0x42, 0x30, 0x3E, 0x00, 0xF7], frame.as_bytes());
    /// ```
    #[must_use]
    pub fn wrap(body: &[u8]) -> SysexFrame {
        let mut bytes = Vec::with_capacity(body.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend_from_slice(body);
        bytes.push(SYSEX_END);
        SysexFrame(bytes)
    }

    /// Returns the body of a frame, the inverse of [`FrameCodec::wrap`].
    #[must_use]
    pub fn unwrap(frame: &SysexFrame) -> &[u8] {
        frame.body()
    }

    /// Returns whether `data` starts with `F0` and ends with `F7`.
    ///
    /// This is a boundary check only. It does not look at lengths or
    /// checksums, so any buffer with the right first and last byte passes.
    ///
    /// ```
    /// use wsx::FrameCodec;
    ///
    /// assert!(FrameCodec::is_framed(&[0xF0, 0x42, 0xF7]));
    /// assert!(!FrameCodec::is_framed(&[0xF0, 0x42]));
    /// assert!(!FrameCodec::is_framed(&[]));
    /// ```
    #[must_use]
    pub fn is_framed(data: &[u8]) -> bool {
        matches!(
            (data.first(), data.last()),
            (Some(&SYSEX_START), Some(&SYSEX_END))
        )
    }
}
