//! `uartboot` boot session: push the image, then act as a terminal.
//!
//! **Example** - Executing the state machine event loop:
//! ```no_run
//! use uartboot::{self as ub, CancelToken};
//!
//! let settings = ub::SettingsBuilder::new()
//!     .path("/dev/ttyUSB0")
//!     .image("boot.bin")
//!     .finalize();
//! let mut session = ub::factory(settings, CancelToken::new());
//! let status = session.run(); // status code returned after the `Exit` event
//! println!("status: {}", status);
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::{factory, BootSession};
