//! Test doubles for the serial line, the console and the progress display.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::terminal::TerminalControl;
use crate::transmitter::ProgressSink;
use crate::transport::Transport;

/// In-memory serial line. Bytes pushed with `push_inbound` are what the
/// "device" sent; everything written ends up in `written`.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub inbound: VecDeque<u8>,
    pub written: Vec<u8>,
    /// Number of `write_bytes` calls.
    pub writes: usize,
    /// Number of `read_into` calls.
    pub reads: usize,
    /// Inbound data that shows up once the given number of writes happened.
    pub scheduled: VecDeque<(usize, Vec<u8>)>,
    /// Fail every write after this many succeeded.
    pub fail_after: Option<usize>,
}
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    pub fn schedule_inbound(&mut self, after_writes: usize, bytes: &[u8]) {
        self.scheduled.push_back((after_writes, bytes.to_vec()));
    }
}
impl Transport for MockTransport {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(limit) = self.fail_after {
            if self.writes >= limit {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "device unplugged",
                )));
            }
        }
        self.writes += 1;
        self.written.extend_from_slice(bytes);
        while let Some((after, _)) = self.scheduled.front() {
            if *after > self.writes {
                break;
            }
            if let Some((_, bytes)) = self.scheduled.pop_front() {
                self.inbound.extend(bytes);
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.inbound.len())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reads += 1;
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.inbound.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

/// The configuration a console can be in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConsoleMode {
    Cooked,
    Raw,
}

/// Scripted console. Keys are handed out one per poll.
#[derive(Debug)]
pub struct MockConsole {
    pub mode: ConsoleMode,
    /// Modes saved by `acquire`, restored by `release`.
    pub saved: Vec<ConsoleMode>,
    pub keys: VecDeque<Option<char>>,
    pub acquired: usize,
    pub released: usize,
    pub polls: usize,
    /// Make `read_one` fail, like a console that went away.
    pub fail_read: bool,
}
impl MockConsole {
    pub fn new() -> Self {
        MockConsole {
            mode: ConsoleMode::Cooked,
            saved: Vec::new(),
            keys: VecDeque::new(),
            acquired: 0,
            released: 0,
            polls: 0,
            fail_read: false,
        }
    }

    pub fn with_keys(keys: &str) -> Self {
        let mut console = Self::new();
        console.keys.extend(keys.chars().map(Some));
        console
    }
}
impl TerminalControl for MockConsole {
    fn acquire(&mut self) -> Result<()> {
        self.acquired += 1;
        self.saved.push(self.mode);
        self.mode = ConsoleMode::Raw;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.released += 1;
        if let Some(mode) = self.saved.pop() {
            self.mode = mode;
        }
        Ok(())
    }

    fn has_pending_input(&mut self, _timeout: Duration) -> Result<bool> {
        self.polls += 1;
        Ok(!self.keys.is_empty())
    }

    fn read_one(&mut self) -> Result<Option<char>> {
        if self.fail_read {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "console closed",
            )));
        }
        Ok(self.keys.pop_front().flatten())
    }
}

/// Console output that counts how it is used.
#[derive(Debug, Default)]
pub struct CountingWriter {
    pub data: Vec<u8>,
    pub writes: usize,
    pub flushes: usize,
}
impl CountingWriter {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Progress sink keeping everything it is told.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub progress: Vec<(usize, usize)>,
    pub inbound: String,
    pub finished: usize,
}
impl ProgressSink for RecordingSink {
    fn inbound(&mut self, text: &str) {
        self.inbound.push_str(text);
    }

    fn progress(&mut self, done: usize, total: usize) {
        self.progress.push((done, total));
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}
