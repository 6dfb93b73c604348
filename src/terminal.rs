//! Control of the local console for the interactive part of a session.
//!
//! The terminal loop needs to see every keystroke as soon as it is typed,
//! control characters included, and without the console echoing it. That is
//! what raw mode gives. Whatever the console was configured as before must be
//! put back when the session ends, whichever way it ends: [`RawModeGuard`]
//! takes care of that by releasing the console when it goes out of scope.
//!
//! [`TerminalControl`] is the seam between the loop and the platform. The host
//! implementation, [`HostConsole`], relies on `crossterm`, which saves and
//! restores the termios attributes on POSIX systems and the console mode on
//! Windows.

use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use crossterm::{
    event::{poll, read, Event},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use log::{debug, error, trace};

use crate::error::Result;
use crate::utils::key_to_char;

// =============================================================================
// Public Interface
// =============================================================================

/// What the terminal loop needs from the local console.
pub trait TerminalControl {
    /// Saves the current console configuration and switches to raw mode.
    fn acquire(&mut self) -> Result<()>;

    /// Restores the configuration saved by [`acquire`](Self::acquire).
    fn release(&mut self) -> Result<()>;

    /// Waits at most `timeout` for a keystroke, returns whether one is ready.
    fn has_pending_input(&mut self, timeout: Duration) -> Result<bool>;

    /// Consumes the pending keystroke. `None` when it does not translate to a
    /// character (arrows, function keys, mouse or resize events...).
    fn read_one(&mut self) -> Result<Option<char>>;
}

/// Holds a console in raw mode. The console is released exactly once, by
/// [`release`](Self::release) or, failing that, when the guard is dropped.
#[derive(Debug)]
pub struct RawModeGuard<'a, C: TerminalControl + ?Sized> {
    console: &'a mut C,
    released: bool,
}
impl<'a, C: TerminalControl + ?Sized> RawModeGuard<'a, C> {
    pub fn acquire(console: &'a mut C) -> Result<Self> {
        console.acquire()?;
        trace!("console acquired");
        Ok(RawModeGuard {
            console,
            released: false,
        })
    }

    /// Releases the console now, reporting any failure to do so.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        trace!("console released");
        self.console.release()
    }
}
impl<'a, C: TerminalControl + ?Sized> Deref for RawModeGuard<'a, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.console
    }
}
impl<'a, C: TerminalControl + ?Sized> DerefMut for RawModeGuard<'a, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.console
    }
}
impl<'a, C: TerminalControl + ?Sized> Drop for RawModeGuard<'a, C> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            trace!("console released on drop");
            if let Err(e) = self.console.release() {
                error!("failed to restore the console: {}", e);
            }
        }
    }
}

/// The console of the machine `uartboot` runs on.
#[derive(Debug, Default)]
pub struct HostConsole {
    raw: bool,
}
impl HostConsole {
    pub fn new() -> Self {
        Self::default()
    }
}
impl TerminalControl for HostConsole {
    fn acquire(&mut self) -> Result<()> {
        enable_raw_mode()?;
        self.raw = true;
        debug!("console switched to raw mode");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.raw {
            disable_raw_mode()?;
            self.raw = false;
            debug!("console mode restored");
        }
        Ok(())
    }

    fn has_pending_input(&mut self, timeout: Duration) -> Result<bool> {
        Ok(poll(timeout)?)
    }

    fn read_one(&mut self) -> Result<Option<char>> {
        // It's guaranteed that read() wont block if `poll` returned `Ok(true)`
        match read()? {
            Event::Key(key) => Ok(key_to_char(key)),
            _ => Ok(None),
        }
    }
}
impl Drop for HostConsole {
    fn drop(&mut self) {
        if self.raw {
            let _ = disable_raw_mode();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doubles::{ConsoleMode, MockConsole};
    use crate::error::Error;

    #[test]
    fn release_restores_the_prior_mode() {
        let mut console = MockConsole::new();
        for _ in 0..3 {
            let before = console.mode;
            let guard = RawModeGuard::acquire(&mut console).unwrap();
            assert_eq!(guard.mode, ConsoleMode::Raw);
            guard.release().unwrap();
            assert_eq!(console.mode, before);
        }
        assert_eq!(console.acquired, 3);
        assert_eq!(console.released, 3);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let mut console = MockConsole::new();
        {
            let _guard = RawModeGuard::acquire(&mut console).unwrap();
        }
        assert_eq!(console.mode, ConsoleMode::Cooked);
        assert_eq!(console.released, 1);

        let guard = RawModeGuard::acquire(&mut console).unwrap();
        guard.release().unwrap();
        assert_eq!(console.released, 2);
    }

    #[test]
    fn error_path_still_releases() {
        fn session(console: &mut MockConsole) -> Result<()> {
            let mut guard = RawModeGuard::acquire(console)?;
            guard.read_one()?;
            guard.release()
        }

        let mut console = MockConsole::with_keys("x");
        console.fail_read = true;

        assert!(matches!(session(&mut console), Err(Error::Io(_))));
        assert_eq!(console.mode, ConsoleMode::Cooked);
        assert_eq!(console.released, 1);
    }
}
