//! Byte-level access to the serial line.
//!
//! The [`Transport`] trait is what the transmitter and the terminal loop talk
//! to. It only needs three primitives from an implementation: a blocking write,
//! a query of how many bytes are waiting to be read, and a read into a buffer.
//! Everything else is built on top of them so that reads never block: only the
//! number of bytes already buffered by the driver is ever requested.

use std::{
    fmt,
    io::{Read, Write},
};

use log::{debug, info, trace};
use serialport::SerialPort;

use crate::error::{Error, Result};
use crate::settings::Settings;

// =============================================================================
// Public Interface
// =============================================================================

/// Upper bound of a single read from the line.
pub const MAX_READ: usize = 4096;

/// An exclusively owned, single-threaded connection to the target device.
pub trait Transport {
    /// Writes all of `bytes`, blocking until they are handed to the driver.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes received and waiting to be read.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Reads into `buf`, returning how many bytes were read. Only called with
    /// a buffer no larger than what [`bytes_available`](Self::bytes_available)
    /// reported.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    /// Reads whatever is already buffered, at most [`MAX_READ`] bytes. Returns
    /// an empty vector when nothing is waiting.
    fn read_available(&mut self) -> Result<Vec<u8>> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(Vec::new());
        }
        trace!("Bytes available to read: {}", available);

        let mut buf = vec![0; available.min(MAX_READ)];
        let read = self.read_into(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Reads until nothing is left waiting, however many [`MAX_READ`] chunks
    /// that takes.
    fn drain(&mut self) -> Result<Vec<u8>> {
        let mut bytes = self.read_available()?;
        loop {
            let more = self.read_available()?;
            if more.is_empty() {
                return Ok(bytes);
            }
            bytes.extend_from_slice(&more);
        }
    }

    /// Reads a single byte if one is waiting.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.bytes_available()? == 0 {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.read_into(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

/// A [`Transport`] over a serial port device.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}
impl SerialTransport {
    /// Opens the port named in `settings`, retrying `settings.open_retries`
    /// more times after a failure. USB serial adapters often show up a moment
    /// after the device node does.
    pub fn open(settings: &Settings) -> Result<Self> {
        use retry::{delay, retry_with_index};

        let path = settings.path.clone().ok_or(Error::NoDevice)?;

        let result = retry_with_index(
            delay::Fixed::from_millis(250).take(settings.open_retries),
            |index| -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
                debug!("Trying to open {} ({})", path, index);
                serialport::new(&path, settings.baud_rate)
                    .timeout(settings.timeout)
                    .open()
            },
        );

        match result {
            Ok(port) => {
                info!(
                    "Connected to {} at {} baud",
                    port.name().unwrap_or_else(|| path.clone()),
                    port.baud_rate()?
                );
                Ok(SerialTransport { port })
            }
            Err(retry::Error::Operation {
                error,
                total_delay,
                tries,
            }) => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                Err(Error::Open { path, source: error })
            }
            Err(retry::Error::Internal(reason)) => {
                info!("Internal retry error while opening port: {}", reason);
                Err(Error::Open {
                    path,
                    source: serialport::Error::new(serialport::ErrorKind::Unknown, reason),
                })
            }
        }
    }
}
impl Transport for SerialTransport {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.port.read(buf)?)
    }
}
impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SerialTransport")
            .field(&self.port.name())
            .field(&self.port.baud_rate())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doubles::MockTransport;

    #[test]
    fn read_available_is_empty_when_nothing_waits() {
        let mut transport = MockTransport::new();
        assert!(transport.read_available().unwrap().is_empty());
        assert_eq!(transport.reads, 0);
    }

    #[test]
    fn read_available_drains_one_chunk() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"hello");
        assert_eq!(transport.read_available().unwrap(), b"hello".to_vec());
        assert!(transport.read_available().unwrap().is_empty());
    }

    #[test]
    fn read_available_is_capped() {
        let mut transport = MockTransport::new();
        transport.push_inbound(&vec![b'x'; MAX_READ + 10]);
        assert_eq!(transport.read_available().unwrap().len(), MAX_READ);
        assert_eq!(transport.read_available().unwrap().len(), 10);
    }

    #[test]
    fn drain_reads_past_the_chunk_limit() {
        let mut transport = MockTransport::new();
        transport.push_inbound(&vec![b'x'; 2 * MAX_READ + 10]);
        assert_eq!(transport.drain().unwrap().len(), 2 * MAX_READ + 10);
        assert!(transport.inbound.is_empty());
        assert!(transport.drain().unwrap().is_empty());
    }

    #[test]
    fn byte_variants() {
        let mut transport = MockTransport::new();
        assert_eq!(transport.read_byte().unwrap(), None);
        transport.push_inbound(b"ok");
        assert_eq!(transport.read_byte().unwrap(), Some(b'o'));
        assert_eq!(transport.read_byte().unwrap(), Some(b'k'));
        transport.write_byte(b'!').unwrap();
        assert_eq!(transport.written, b"!".to_vec());
    }

    #[test]
    fn open_without_path_fails() {
        let settings = crate::SettingsBuilder::new().open_retries(0).finalize();
        match SerialTransport::open(&settings) {
            Err(Error::NoDevice) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn open_missing_device_fails() {
        let settings = crate::SettingsBuilder::new()
            .path("/dev/uartboot-no-such-device")
            .open_retries(0)
            .finalize();
        match SerialTransport::open(&settings) {
            Err(Error::Open { path, .. }) => assert_eq!(path, "/dev/uartboot-no-such-device"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
