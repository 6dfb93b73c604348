//! The interactive pass-through between the console and the device.
//!
//! Once the image is out, the serial line becomes a terminal: what the device
//! prints shows up on the console and what the user types goes to the device.
//! A single thread polls both sides in turn and never blocks on either. Each
//! [`step`](Duplex::step):
//!
//!  1. checks the cancellation token,
//!  2. drains every byte the device sent and prints them,
//!  3. waits a short while for a keystroke and, if one came, forwards it.
//!
//! `Ctrl+C` is not forwarded: it ends the session.
//!
//! ```text
//!            .---------.   Ctrl+C / cancelled   .---------.
//!   ---->    | Running |----------------------->| Stopped |
//!            '---------'                        '---------'
//!              |     ^
//!              '-----' any other key, device output, idle
//! ```

use std::{io::Write, time::Duration};

use log::{debug, info, trace};

use crate::error::Result;
use crate::terminal::{RawModeGuard, TerminalControl};
use crate::transport::Transport;
use crate::utils::{CancelToken, TextDecoder, INTERRUPT};

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DuplexState {
    Running,
    Stopped,
}

/// The terminal loop, forwarding between a transport and a console until the
/// user presses `Ctrl+C` or the session is cancelled.
///
/// The console is expected to be in raw mode already; see [`attach`] for the
/// version that takes care of it.
pub struct Duplex<'a, T: ?Sized, C: ?Sized, W> {
    transport: &'a mut T,
    console: &'a mut C,
    output: W,
    cancel: CancelToken,
    idle_delay: Duration,
    decoder: TextDecoder,
    state: DuplexState,
}
impl<'a, T, C, W> Duplex<'a, T, C, W>
where
    T: Transport + ?Sized,
    C: TerminalControl + ?Sized,
    W: Write,
{
    /// `idle_delay` bounds how long each step waits for a keystroke, which is
    /// also how long device output can sit unread.
    pub fn new(
        transport: &'a mut T,
        console: &'a mut C,
        output: W,
        cancel: CancelToken,
        idle_delay: Duration,
    ) -> Self {
        Duplex {
            transport,
            console,
            output,
            cancel,
            idle_delay,
            decoder: TextDecoder::new(),
            state: DuplexState::Running,
        }
    }

    pub fn state(&self) -> DuplexState {
        self.state
    }

    /// One round of polling both sides.
    pub fn step(&mut self) -> Result<DuplexState> {
        if self.state == DuplexState::Stopped {
            return Ok(self.state);
        }

        if self.cancel.is_cancelled() {
            info!("terminal session cancelled");
            return self.stop();
        }

        let inbound = self.transport.drain()?;
        if !inbound.is_empty() {
            let text = self.decoder.decode(&inbound);
            if !text.is_empty() {
                self.output.write_all(text.as_bytes())?;
                self.output.flush()?;
            }
        }

        if !self.console.has_pending_input(self.idle_delay)? {
            return Ok(self.state);
        }

        match self.console.read_one()? {
            Some(INTERRUPT) => {
                info!("Ctrl+C pressed, leaving the terminal");
                self.stop()
            }
            Some(c) => {
                trace!("forwarding {:?}", c);
                let mut buf = [0u8; 4];
                let encoded = c.encode_utf8(&mut buf);
                for byte in encoded.bytes() {
                    self.transport.write_byte(byte)?;
                }
                Ok(self.state)
            }
            None => Ok(self.state),
        }
    }

    /// Steps until the session stops. Errors are returned as they happen.
    pub fn run(&mut self) -> Result<()> {
        debug!("terminal loop started");
        while self.step()? == DuplexState::Running {}
        debug!("terminal loop stopped");
        Ok(())
    }

    fn stop(&mut self) -> Result<DuplexState> {
        self.state = DuplexState::Stopped;
        self.output.write_all(b"\r\n")?;
        self.output.flush()?;
        Ok(self.state)
    }
}

/// Puts `console` in raw mode, runs the terminal loop, then restores the
/// console. The console is restored on every way out, errors included.
pub fn attach<T, C, W>(
    transport: &mut T,
    console: &mut C,
    output: W,
    cancel: CancelToken,
    idle_delay: Duration,
) -> Result<()>
where
    T: Transport + ?Sized,
    C: TerminalControl + ?Sized,
    W: Write,
{
    let mut guard = RawModeGuard::acquire(console)?;
    let result = Duplex::new(transport, &mut *guard, output, cancel, idle_delay).run();
    let released = guard.release();
    result.and(released)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doubles::{ConsoleMode, CountingWriter, MockConsole, MockTransport};
    use crate::error::Error;
    use crate::transport::MAX_READ;

    const IDLE: Duration = Duration::from_millis(0);

    #[test]
    fn forwards_keys_until_ctrl_c() {
        let mut transport = MockTransport::new();
        let mut console = MockConsole::with_keys("ab\u{3}z");
        let mut output = CountingWriter::default();

        Duplex::new(
            &mut transport,
            &mut console,
            &mut output,
            CancelToken::new(),
            IDLE,
        )
        .run()
        .unwrap();

        assert_eq!(transport.written, b"ab".to_vec());
        assert_eq!(console.keys.len(), 1, "keys after Ctrl+C stay unread");
        assert_eq!(output.text(), "\r\n");
    }

    #[test]
    fn no_output_when_nothing_arrives() {
        let mut transport = MockTransport::new();
        let mut console = MockConsole::new();
        let mut output = CountingWriter::default();

        {
            let mut duplex = Duplex::new(
                &mut transport,
                &mut console,
                &mut output,
                CancelToken::new(),
                IDLE,
            );
            for _ in 0..100 {
                assert_eq!(duplex.step().unwrap(), DuplexState::Running);
            }
        }

        assert_eq!(output.writes, 0);
        assert_eq!(output.flushes, 0);
        assert_eq!(transport.reads, 0);
        assert_eq!(transport.writes, 0);
        assert_eq!(console.polls, 100);
    }

    #[test]
    fn device_output_is_displayed_and_flushed() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"U-Boot \xff ready\r\n");
        let mut console = MockConsole::new();
        let mut output = CountingWriter::default();

        {
            let mut duplex = Duplex::new(
                &mut transport,
                &mut console,
                &mut output,
                CancelToken::new(),
                IDLE,
            );
            duplex.step().unwrap();
            duplex.step().unwrap();
        }

        assert_eq!(output.text(), "U-Boot \u{fffd} ready\r\n");
        assert_eq!(output.flushes, 1);
    }

    #[test]
    fn inbound_is_drained_before_keys_are_read() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"> ");
        let mut console = MockConsole::with_keys("\u{3}");
        let mut output = CountingWriter::default();

        Duplex::new(
            &mut transport,
            &mut console,
            &mut output,
            CancelToken::new(),
            IDLE,
        )
        .run()
        .unwrap();

        assert_eq!(output.text(), "> \r\n");
    }

    #[test]
    fn large_backlog_is_shown_before_ctrl_c() {
        let mut transport = MockTransport::new();
        transport.push_inbound(&vec![b'.'; MAX_READ + 904]);
        let mut console = MockConsole::with_keys("\u{3}");
        let mut output = CountingWriter::default();

        Duplex::new(
            &mut transport,
            &mut console,
            &mut output,
            CancelToken::new(),
            IDLE,
        )
        .run()
        .unwrap();

        assert!(transport.inbound.is_empty());
        assert_eq!(output.data.len(), MAX_READ + 904 + 2);
        assert!(output.text().ends_with(".\r\n"));
        assert_eq!(output.flushes, 2);
    }

    #[test]
    fn multibyte_keys_are_sent_as_utf8() {
        let mut transport = MockTransport::new();
        let mut console = MockConsole::with_keys("é\u{3}");
        let mut output = CountingWriter::default();

        Duplex::new(
            &mut transport,
            &mut console,
            &mut output,
            CancelToken::new(),
            IDLE,
        )
        .run()
        .unwrap();

        assert_eq!(transport.written, "é".as_bytes().to_vec());
    }

    #[test]
    fn cancellation_stops_the_loop() {
        let cancel = CancelToken::new();
        let mut transport = MockTransport::new();
        let mut console = MockConsole::with_keys("abc");
        let mut output = CountingWriter::default();

        let mut duplex = Duplex::new(
            &mut transport,
            &mut console,
            &mut output,
            cancel.clone(),
            IDLE,
        );
        assert_eq!(duplex.step().unwrap(), DuplexState::Running);
        cancel.cancel();
        assert_eq!(duplex.step().unwrap(), DuplexState::Stopped);
        assert_eq!(duplex.step().unwrap(), DuplexState::Stopped);
        assert_eq!(duplex.state(), DuplexState::Stopped);
        drop(duplex);

        assert_eq!(transport.written, b"a".to_vec());
    }

    #[test]
    fn attach_restores_the_console() {
        let mut transport = MockTransport::new();
        let mut console = MockConsole::with_keys("x\u{3}");
        let mut output = CountingWriter::default();

        attach(
            &mut transport,
            &mut console,
            &mut output,
            CancelToken::new(),
            IDLE,
        )
        .unwrap();

        assert_eq!(transport.written, b"x".to_vec());
        assert_eq!(console.mode, ConsoleMode::Cooked);
        assert_eq!((console.acquired, console.released), (1, 1));
    }

    #[test]
    fn attach_restores_the_console_on_error() {
        let mut transport = MockTransport::new();
        transport.fail_after = Some(0);
        let mut console = MockConsole::with_keys("x");
        let mut output = CountingWriter::default();

        let result = attach(
            &mut transport,
            &mut console,
            &mut output,
            CancelToken::new(),
            IDLE,
        );

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(console.mode, ConsoleMode::Cooked);
        assert_eq!((console.acquired, console.released), (1, 1));
    }
}
