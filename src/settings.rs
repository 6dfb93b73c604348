//! Settings for the serial line and the boot session.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

// =============================================================================
// Public Interface
// =============================================================================

/// The baud rate the bootloader listens at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Groups all settings of a boot session and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Read timeout of the serial port.
    pub timeout: Duration,
    /// How many more times opening the port is attempted after a failure.
    pub open_retries: usize,

    /// Path to the boot image to be pushed.
    pub image: Option<String>,
    /// Address in the target's memory where the image is to be loaded.
    pub offset: u32,
    /// Number of bytes handed to the port per write while pushing the image.
    /// Smaller slices give finer progress at the cost of more system calls.
    pub slice_len: usize,
    /// Longest time the terminal loop waits for a keystroke before polling the
    /// serial port again.
    pub idle_delay: Duration,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use uartboot::SettingsBuilder;
///
/// let settings = SettingsBuilder::new()
///     .path("/dev/ttyUSB0")
///     .image("boot.bin")
///     .offset(0x1000)
///     .finalize();
/// assert_eq!(settings.baud_rate, 115_200);
/// ```
#[derive(Debug)]
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: DEFAULT_BAUD_RATE,
                timeout: Duration::from_secs(1),
                open_retries: 3,
                image: None,
                offset: 0,
                slice_len: 1,
                idle_delay: Duration::from_millis(10),
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().into_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout of the serial port
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Set how many more times opening the port is attempted
    pub fn open_retries(mut self, open_retries: usize) -> Self {
        self.settings.open_retries = open_retries;
        self
    }

    /// Set the path to the boot image
    pub fn image<'a>(mut self, image: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.image = Some(image.into().into_owned());
        self
    }

    /// Set the load address of the image on the target
    pub fn offset(mut self, offset: u32) -> Self {
        self.settings.offset = offset;
        self
    }

    /// Set the number of bytes per write while pushing the image
    pub fn slice_len(mut self, slice_len: usize) -> Self {
        self.settings.slice_len = slice_len;
        self
    }

    /// Set the idle wait of the terminal loop
    pub fn idle_delay(mut self, idle_delay: Duration) -> Self {
        self.settings.idle_delay = idle_delay;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
            open_retries: 3,
            image: None,
            offset: 0,
            slice_len: 1,
            idle_delay: Duration::from_millis(10),
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyUSB0");
}

#[test]
fn baud_rate() {
    let baud_rate = 230_400;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn timeout() {
    let timeout = Duration::from_millis(250);
    let settings = SettingsBuilder::new().timeout(timeout).finalize();
    assert_eq!(settings.timeout, timeout);
}

#[test]
fn image_and_offset() {
    let settings = SettingsBuilder::new()
        .image("kernel.bin")
        .offset(0x8000_0000)
        .finalize();
    assert_eq!(settings.image.unwrap(), "kernel.bin");
    assert_eq!(settings.offset, 0x8000_0000);
}

#[test]
fn slice_len() {
    let settings = SettingsBuilder::default().slice_len(64).finalize();
    assert_eq!(settings.slice_len, 64);
}
