//! Turns the raw bytes coming from the device into displayable text.

use std::str;

use log::debug;

/// Lossy UTF-8 decoder for a byte stream that arrives in arbitrary pieces.
///
/// A multi-byte character split across two reads is held back until the rest
/// of it arrives. Sequences that can never be valid are replaced with
/// `U+FFFD`; that is not an error, the device output is best effort.
#[derive(Debug, Default)]
pub struct TextDecoder {
    pending: Vec<u8>,
}
impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, prefixed by whatever was held back last time.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let mut text = String::with_capacity(buf.len());
        let mut rest = buf.as_slice();
        let mut replaced = 0;
        loop {
            match str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            replaced += 1;
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end, wait for more.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        if replaced > 0 {
            debug!("replaced {} invalid UTF-8 sequence(s) from the device", replaced);
        }
        text
    }

    /// Gives up on the held back bytes: they are returned replaced, if there
    /// were any, and the decoder starts afresh.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        if !rest.is_empty() {
            debug!("dropping {} byte(s) of an incomplete character", rest.len());
        }
        String::from_utf8_lossy(&rest).into_owned()
    }

    /// Bytes held back waiting for the end of a character.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn plain_ascii() {
    let mut decoder = TextDecoder::new();
    assert_eq!(decoder.decode(b"booting...\r\n"), "booting...\r\n");
    assert!(decoder.pending().is_empty());
}

#[test]
fn invalid_bytes_are_replaced() {
    let mut decoder = TextDecoder::new();
    assert_eq!(decoder.decode(b"a\xffb\xfe"), "a\u{fffd}b\u{fffd}");
    assert!(decoder.pending().is_empty());
}

#[test]
fn split_character_is_carried_over() {
    let mut decoder = TextDecoder::new();
    let snowman = "☃".as_bytes();
    assert_eq!(decoder.decode(&[b'x', snowman[0], snowman[1]]), "x");
    assert_eq!(decoder.pending(), &snowman[..2]);
    assert_eq!(decoder.decode(&[snowman[2], b'y']), "☃y");
    assert!(decoder.pending().is_empty());
}

#[test]
fn finish_flushes_a_truncated_character() {
    let mut decoder = TextDecoder::new();
    assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
    assert_eq!(decoder.finish(), "\u{fffd}");
    assert!(decoder.pending().is_empty());
    assert_eq!(decoder.finish(), "");
}

#[test]
fn empty_input() {
    let mut decoder = TextDecoder::new();
    assert_eq!(decoder.decode(&[]), "");
}
