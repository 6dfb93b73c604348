//! Translation of console key events into the characters a terminal would put
//! on the line.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// The character that ends the terminal session (`Ctrl+C`, ETX).
pub const INTERRUPT: char = '\u{3}';

/// Maps a key event to the character sent to the device, or `None` for keys
/// that have no single character (arrows, function keys...).
///
/// In raw mode `Ctrl+<key>` arrives as a key event with the `CONTROL` modifier;
/// it is turned back into the corresponding ASCII control code so that, for
/// instance, `Ctrl+C` becomes [`INTERRUPT`].
pub fn key_to_char(event: KeyEvent) -> Option<char> {
    match event.code {
        KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => control_code(c),
        KeyCode::Char(c) => Some(c),
        KeyCode::Enter => Some('\r'),
        KeyCode::Tab => Some('\t'),
        KeyCode::Backspace => Some('\u{7f}'),
        KeyCode::Esc => Some('\u{1b}'),
        KeyCode::Null => Some('\0'),
        _ => None,
    }
}

fn control_code(c: char) -> Option<char> {
    match c {
        'a'..='z' | 'A'..='Z' | '@' | '[' | '\\' | ']' | '^' | '_' => {
            Some(((c.to_ascii_uppercase() as u8) & 0x1f) as char)
        }
        ' ' => Some('\0'),
        // Some terminals report Ctrl+\ .. Ctrl+_ as Ctrl+4 .. Ctrl+7.
        '4'..='7' => Some((0x1c + (c as u8 - b'4')) as char),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent { code, modifiers }
}

#[test]
fn ctrl_c_is_interrupt() {
    assert_eq!(
        key_to_char(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        Some(INTERRUPT)
    );
    assert_eq!(
        key_to_char(key(KeyCode::Char('C'), KeyModifiers::CONTROL | KeyModifiers::SHIFT)),
        Some(INTERRUPT)
    );
}

#[test]
fn other_control_codes() {
    assert_eq!(
        key_to_char(key(KeyCode::Char('d'), KeyModifiers::CONTROL)),
        Some('\u{4}')
    );
    assert_eq!(
        key_to_char(key(KeyCode::Char('['), KeyModifiers::CONTROL)),
        Some('\u{1b}')
    );
    assert_eq!(
        key_to_char(key(KeyCode::Char('4'), KeyModifiers::CONTROL)),
        Some('\u{1c}')
    );
    assert_eq!(key_to_char(key(KeyCode::Char('1'), KeyModifiers::CONTROL)), None);
}

#[test]
fn printable_and_editing_keys() {
    assert_eq!(key_to_char(key(KeyCode::Char('a'), KeyModifiers::NONE)), Some('a'));
    assert_eq!(key_to_char(key(KeyCode::Char('A'), KeyModifiers::SHIFT)), Some('A'));
    assert_eq!(key_to_char(key(KeyCode::Enter, KeyModifiers::NONE)), Some('\r'));
    assert_eq!(key_to_char(key(KeyCode::Backspace, KeyModifiers::NONE)), Some('\u{7f}'));
    assert_eq!(key_to_char(key(KeyCode::Up, KeyModifiers::NONE)), None);
    assert_eq!(key_to_char(key(KeyCode::F(1), KeyModifiers::NONE)), None);
}
