//! End-to-end checks of what goes on the wire, through the public API only.

use std::{collections::VecDeque, io::Write, time::Duration};

use uartboot::{
    attach, send, CancelToken, Packet, ProgressSink, Result, TerminalControl, Transport,
    HEADER_LEN, MAGIC,
};

/// A serial line looped back into memory.
#[derive(Default)]
struct Wire {
    sent: Vec<u8>,
    from_device: VecDeque<u8>,
}
impl Transport for Wire {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.from_device.len())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.from_device.len());
        for (slot, byte) in buf.iter_mut().zip(self.from_device.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[derive(Default)]
struct Quiet {
    last: Option<(usize, usize)>,
}
impl ProgressSink for Quiet {
    fn inbound(&mut self, _text: &str) {}

    fn progress(&mut self, done: usize, total: usize) {
        self.last = Some((done, total));
    }

    fn finish(&mut self) {}
}

struct Keys(VecDeque<char>, bool);
impl TerminalControl for Keys {
    fn acquire(&mut self) -> Result<()> {
        self.1 = true;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.1 = false;
        Ok(())
    }

    fn has_pending_input(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.0.is_empty())
    }

    fn read_one(&mut self) -> Result<Option<char>> {
        Ok(self.0.pop_front())
    }
}

#[test]
fn five_byte_image_at_0x1000() {
    let image = std::env::temp_dir().join(format!("uartboot-wire-{}.bin", std::process::id()));
    std::fs::File::create(&image)
        .unwrap()
        .write_all(&[0x01, 0x02, 0x03, 0x04, 0x05])
        .unwrap();
    let packet = Packet::from_file(&image, 0x1000).unwrap();
    std::fs::remove_file(&image).unwrap();

    let mut wire = Wire::default();
    let mut sink = Quiet::default();
    let written = send(&mut wire, &packet, 4, &mut sink, &CancelToken::new()).unwrap();

    assert_eq!(
        wire.sent,
        vec![
            0x9e, 0x9e, 0x9e, 0x9e, 0x00, 0x10, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x01, 0x02,
            0x03, 0x04, 0x05
        ]
    );
    assert_eq!(written, HEADER_LEN + 5);
    assert_eq!(sink.last, Some((5, 5)));
    assert_eq!(&wire.sent[..4], &MAGIC.to_le_bytes());
}

#[test]
fn push_then_talk_to_the_device() {
    let packet = Packet::new(0x8000_0000, b"kernel".to_vec()).unwrap();
    let mut wire = Wire::default();
    send(&mut wire, &packet, 64, &mut Quiet::default(), &CancelToken::new()).unwrap();

    wire.from_device.extend(b"boot> ".iter().copied());
    let mut keys = Keys("go\r\u{3}".chars().collect(), false);
    let mut console = Vec::new();
    attach(
        &mut wire,
        &mut keys,
        &mut console,
        CancelToken::new(),
        Duration::from_millis(0),
    )
    .unwrap();

    assert_eq!(&wire.sent[..HEADER_LEN + 6], packet.to_bytes().as_slice());
    assert_eq!(&wire.sent[HEADER_LEN + 6..], b"go\r");
    assert_eq!(console, b"boot> \r\n".to_vec());
    assert!(!keys.1, "console left in raw mode");
}
