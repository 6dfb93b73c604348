//! `uartboot` pushes a boot image to a bootloader over a serial line and then
//! stays attached to the line as a simple terminal.
//!
//! The image goes out as a single packet: a 12-byte header (a magic word, the
//! load offset and the image size, all 32-bit little endian) followed by the
//! image itself. The protocol is fire-and-forget: the bootloader acknowledges
//! nothing and nothing is retransmitted. Whatever the device prints while the
//! image is being pushed is shown as it arrives.
//!
//! Once the image is out, the serial line and the console are tied together:
//! the device output is printed and every keystroke is forwarded, with the
//! console in raw mode so that control characters get through. `Ctrl+C` ends
//! the session and the console is restored however the session ends.
//!
//! The building blocks can be used on their own:
//!
//! * [`Packet`] frames an image,
//! * [`Transport`] abstracts the serial line, [`SerialTransport`] being the
//!   real one,
//! * [`send`] pushes a packet, reporting to a [`ProgressSink`],
//! * [`TerminalControl`] and [`RawModeGuard`] own the console mode,
//! * [`Duplex`] is the terminal loop, [`attach`] runs it inside a guard.
//!
//! The [`session`](factory) state machine wires them together the way the
//! `uartboot` binary uses them.

mod duplex;
mod error;
mod packet;
mod session;
mod settings;
mod terminal;
mod transmitter;
mod transport;
mod utils;

#[cfg(test)]
mod doubles;

pub use duplex::{attach, Duplex, DuplexState};
pub use error::{Error, Result};
pub use packet::{Packet, HEADER_LEN, MAGIC};
pub use session::{factory, BootSession};
pub use settings::{Settings, SettingsBuilder, DEFAULT_BAUD_RATE};
pub use terminal::{HostConsole, RawModeGuard, TerminalControl};
pub use transmitter::{send, ConsoleProgress, ProgressSink};
pub use transport::{SerialTransport, Transport, MAX_READ};
pub use utils::{key_to_char, list_ports, parse_offset, CancelToken, TextDecoder, INTERRUPT};
