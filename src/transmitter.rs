//! Pushing a packet down the serial line.
//!
//! The packet is written in slices of a configurable length. After every
//! slice, whatever the device sent in the meantime (boot messages, echo...) is
//! drained and shown, then the progress is updated. Nothing is expected back
//! from the device: once the last slice is out, the transfer is over.

use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, trace};

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::transport::Transport;
use crate::utils::{CancelToken, TextDecoder};

// =============================================================================
// Public Interface
// =============================================================================

/// Receives what happens during a transfer.
pub trait ProgressSink {
    /// Text received from the device while the transfer is going on.
    fn inbound(&mut self, text: &str);

    /// `done` out of `total` slices were written.
    fn progress(&mut self, done: usize, total: usize);

    /// The last slice was written.
    fn finish(&mut self);

    /// The transfer stopped on an error or was interrupted.
    fn abort(&mut self) {}
}

/// Writes `packet` to `transport`, `slice_len` bytes at a time, and returns the
/// number of bytes written.
///
/// A write error aborts the transfer; there is no retry since the bootloader
/// has no way to resume. `cancel` is checked before every slice.
pub fn send<T, S>(
    transport: &mut T,
    packet: &Packet,
    slice_len: usize,
    sink: &mut S,
    cancel: &CancelToken,
) -> Result<usize>
where
    T: Transport + ?Sized,
    S: ProgressSink + ?Sized,
{
    if slice_len == 0 {
        return Err(Error::InvalidSliceLength);
    }

    match push_slices(transport, packet, slice_len, sink, cancel) {
        Ok(written) => {
            sink.finish();
            info!("{} bytes pushed to the device", written);
            Ok(written)
        }
        Err(err) => {
            sink.abort();
            error!("transfer failed: {}", err);
            Err(err)
        }
    }
}

/// A [`ProgressSink`] drawing a progress bar on the console, redrawn in place.
/// Complete lines of device output are printed above the bar, the line still
/// being received is shown next to it.
#[derive(Default)]
pub struct ConsoleProgress {
    pb: Option<ProgressBar>,
    lines: LineBuffer,
}
impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&mut self, total: usize) -> &ProgressBar {
        self.pb.get_or_insert_with(|| {
            let pb = ProgressBar::with_draw_target(total as u64, ProgressDrawTarget::stdout());
            pb.set_style(ProgressStyle::default_bar()
                .template("[UB] ⏩ Pushing [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {wide_msg}")
                .progress_chars("=>-"));
            pb
        })
    }

    fn print_line(&self, line: &str) {
        match &self.pb {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    /// Prints the unterminated line, if any, as a line of its own.
    fn flush_tail(&mut self) {
        let rest = self.lines.take();
        if let Some(pb) = &self.pb {
            pb.set_message("");
        }
        if !rest.is_empty() {
            self.print_line(&rest);
        }
    }
}
impl ProgressSink for ConsoleProgress {
    fn inbound(&mut self, text: &str) {
        let pb = match &self.pb {
            Some(pb) => pb,
            None => {
                // No bar to draw around yet.
                print!("{}", text);
                let _ = io::stdout().flush();
                return;
            }
        };
        for line in self.lines.push(text) {
            pb.println(line);
        }
        pb.set_message(self.lines.tail().trim_end_matches('\r').to_owned());
    }

    fn progress(&mut self, done: usize, total: usize) {
        self.bar(total).set_position(done as u64);
    }

    fn finish(&mut self) {
        self.flush_tail();
        if let Some(pb) = &self.pb {
            pb.finish();
        }
        println!();
        let _ = io::stdout().flush();
    }

    fn abort(&mut self) {
        self.flush_tail();
        if let Some(pb) = &self.pb {
            pb.abandon();
        }
        println!();
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn push_slices<T, S>(
    transport: &mut T,
    packet: &Packet,
    slice_len: usize,
    sink: &mut S,
    cancel: &CancelToken,
) -> Result<usize>
where
    T: Transport + ?Sized,
    S: ProgressSink + ?Sized,
{
    let bytes = packet.to_bytes();
    let slices = bytes.chunks(slice_len);
    let total = slices.len();
    debug!(
        "pushing {} bytes in {} slice(s) of {} byte(s)",
        bytes.len(),
        total,
        slice_len
    );
    sink.progress(0, total);

    let mut decoder = TextDecoder::new();
    let mut written = 0;
    for (index, slice) in slices.enumerate() {
        if cancel.is_cancelled() {
            info!("transfer interrupted after {} bytes", written);
            return Err(Error::Interrupted);
        }

        transport.write_bytes(slice)?;
        written += slice.len();
        trace!("{} bytes written to serial port", slice.len());

        let inbound = transport.drain()?;
        if !inbound.is_empty() {
            let text = decoder.decode(&inbound);
            if !text.is_empty() {
                sink.inbound(&text);
            }
        }

        sink.progress(index + 1, total);
    }

    // The terminal starts with a fresh decoder.
    let rest = decoder.finish();
    if !rest.is_empty() {
        sink.inbound(&rest);
    }
    Ok(written)
}

/// Longest unterminated line kept aside before it is printed anyway.
const MAX_TAIL: usize = 256;

/// Splits device text into complete lines, keeping the unterminated end.
#[derive(Debug, Default)]
struct LineBuffer {
    tail: String,
}
impl LineBuffer {
    /// Appends `text` and returns the lines it completed, without their line
    /// terminators.
    fn push(&mut self, text: &str) -> Vec<String> {
        self.tail.push_str(text);
        let mut lines = Vec::new();
        while let Some(end) = self.tail.find('\n') {
            let line: String = self.tail.drain(..=end).collect();
            lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_owned());
        }
        if self.tail.len() > MAX_TAIL {
            lines.push(std::mem::take(&mut self.tail));
        }
        lines
    }

    fn tail(&self) -> &str {
        &self.tail
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.tail)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
