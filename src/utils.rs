//! Helpers around the console, the serial ports and the command line input.

mod cancel;
mod decode;
mod keyboard;
mod offset;
mod ports;

pub use cancel::CancelToken;
pub use decode::TextDecoder;
pub use keyboard::{key_to_char, INTERRUPT};
pub use offset::parse_offset;
pub use ports::list_ports;
