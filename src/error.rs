//! Errors surfaced by `uartboot`.
//!
//! Everything that can abort a boot session funnels into [`Error`]. Problems
//! decoding the text coming back from the device are not errors: they are
//! replaced on display and logged, and the session goes on.

use std::{io, path::PathBuf};

// =============================================================================
// Public Interface
// =============================================================================

/// Errors that can occur while building, pushing or attaching to a boot image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image file could not be opened or read. Nothing was sent yet.
    #[error("cannot read image `{}`: {source}", .path.display())]
    Image { path: PathBuf, source: io::Error },

    /// No image path was given.
    #[error("no image was given")]
    NoImage,

    /// The image does not fit the 32-bit size field of the packet header.
    #[error("image is too large for the packet header ({len} bytes)")]
    ImageTooLarge { len: u64 },

    /// No serial device path was given.
    #[error("no serial device was given")]
    NoDevice,

    /// The serial device could not be opened (wrong path, permissions, busy).
    #[error("cannot open serial device `{path}`: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// The serial device reported an error after it was opened.
    #[error("serial device error: {0}")]
    Device(#[from] serialport::Error),

    /// A read or write on the serial line or the console failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The local console could not be switched to or from raw mode, or its
    /// events could not be read.
    #[error("console error: {0}")]
    Console(#[from] crossterm::ErrorKind),

    /// The destination offset expression could not be evaluated.
    #[error("invalid offset `{0}`")]
    InvalidOffset(String),

    /// Slices must carry at least one byte.
    #[error("slice length must be at least 1")]
    InvalidSliceLength,

    /// The user interrupted the transfer.
    #[error("interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, Error>;
