//! `uartboot` boot session state machine.
//!
//! A boot session has two phases: the image is pushed to the bootloader as a
//! single packet, then `uartboot` stays attached to the serial line as a
//! terminal until the user leaves with `Ctrl+C`.
//!
//! The following state diagram summarizes the different states and transitions
//! a boot session goes through:
//!
//! ```text
//!                  START
//!                    |
//!                    v
//!                .-------.   image or port error
//!                | Init  |-----------------------------.
//!                '-------'                             |
//!                    |                                 |
//!                    v                                 |
//!              .----------.  write error / interrupt   |
//!              | Transmit |------------------------.   |
//!              '----------'                        |   |
//!                    |                             v   v
//!                    v                           .-------.
//!              .----------.       Ctrl+C / error | Done  |
//!              | Terminal |--------------------->|       |
//!              '----------'                      '-------'
//!                                                    |
//!                                                    v
//!                                                   END
//! ```

use super::events::*;
use super::states::*;
use crate::{settings::Settings, utils::CancelToken};

// =============================================================================
// Public Interface
// =============================================================================

/// Represents the `uartboot` boot session state machine. Use the `factory()`
/// function to get an instance then run it by calling its `run()` method.
pub struct BootSession {
    sm: SessionStates,
}
impl BootSession {
    /// The session event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set. At such point, the event loop terminates and
    /// returns an exit code indicating no errors when equal to **`0`**;
    /// otherwise a termination with error.
    pub fn run(&mut self) -> i32 {
        loop {
            self.sm = self.sm.step();
            if let SessionStates::Done(sm) = &self.sm {
                if sm.state.should_exit {
                    return sm.state.status;
                }
            }
        }
    }
}

/// Factory function for the boot session state machine. Use it to get an
/// instance of the state machine, which you can run by invoking its `run()`
/// method.
///
/// `cancel` is checked by the transfer and by the terminal loop; setting it
/// (from a signal handler, typically) winds the session down.
///
/// **Example**
/// ```no_run
/// use uartboot::{self as ub, CancelToken};
///
/// let settings = ub::SettingsBuilder::new()
///     .path("/dev/ttyUSB0")
///     .image("boot.bin")
///     .offset(0x1000)
///     .finalize();
/// let mut session = ub::factory(settings, CancelToken::new());
/// let status = session.run(); // status code returned after the `Exit` event
/// std::process::exit(status);
/// ```
pub fn factory(settings: Settings, cancel: CancelToken) -> BootSession {
    BootSession {
        // The same machine naturally starts in the `Init` state.
        sm: SessionStates::Init(SessionSM::new(settings, cancel)),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing the boot session.
///
/// Using a generic type that holds the current state allows for data shared by
/// all states (the settings and the cancellation token) that is not really
/// part of any state. It's also nicer when debugging to see the state machine
/// and the current state it is holding at any time.
#[derive(Debug)]
struct SessionSM<S: Runnable> {
    settings: Settings,
    cancel: CancelToken,
    state: S,
}
impl<S: Runnable> SessionSM<S> {
    fn run(&mut self) -> Event {
        self.state.run(&self.settings, &self.cancel)
    }
}

/// The state machine starts in the `InitState`.
impl SessionSM<InitState> {
    fn new(settings: Settings, cancel: CancelToken) -> Self {
        SessionSM {
            settings,
            cancel,
            state: InitState {},
        }
    }
}

/// An enum wrapper around the states of the session state machine. It provides
/// a simpler and more intuitive model for manipulating states and their
/// transitions.
enum SessionStates {
    Init(SessionSM<InitState>),
    Transmit(SessionSM<TransmitState>),
    Terminal(SessionSM<TerminalState>),
    Done(SessionSM<DoneState>),
}
impl SessionStates {
    /// The unit of work in the state machine event loop. It runs the current
    /// state and decides the next transition from the event it returns. State
    /// transitions from events are implemented using the rust `From`/`Into`
    /// pattern, so most state/event mismatches are caught at compile time.
    fn step(&mut self) -> Self {
        match self {
            SessionStates::Init(sm) => {
                let event = sm.run();
                let cancel = sm.cancel.clone();
                match event {
                    Event::Transmit(ev) => SessionStates::Transmit((ev, cancel).into()),
                    Event::Done(ev) => SessionStates::Done((ev, cancel).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            SessionStates::Transmit(sm) => {
                let event = sm.run();
                let cancel = sm.cancel.clone();
                match event {
                    Event::SwitchToTerminal(ev) => SessionStates::Terminal((ev, cancel).into()),
                    Event::Done(ev) => SessionStates::Done((ev, cancel).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            SessionStates::Terminal(sm) => {
                let event = sm.run();
                let cancel = sm.cancel.clone();
                match event {
                    Event::Done(ev) => SessionStates::Done((ev, cancel).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            SessionStates::Done(sm) => {
                let event = sm.run();
                let cancel = sm.cancel.clone();
                match event {
                    Event::Exit(ev) => SessionStates::Done((ev, cancel).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<(TransmitEvent, CancelToken)> for SessionSM<TransmitState> {
    fn from((event, cancel): (TransmitEvent, CancelToken)) -> SessionSM<TransmitState> {
        SessionSM {
            settings: event.settings,
            cancel,
            state: TransmitState {
                transport: Some(event.transport),
                packet: event.packet,
            },
        }
    }
}

impl From<(SwitchToTerminalEvent, CancelToken)> for SessionSM<TerminalState> {
    fn from((event, cancel): (SwitchToTerminalEvent, CancelToken)) -> SessionSM<TerminalState> {
        SessionSM {
            settings: event.settings,
            cancel,
            state: TerminalState {
                transport: Some(event.transport),
            },
        }
    }
}

impl From<(DoneEvent, CancelToken)> for SessionSM<DoneState> {
    fn from((event, cancel): (DoneEvent, CancelToken)) -> SessionSM<DoneState> {
        SessionSM {
            settings: event.settings,
            cancel,
            state: DoneState {
                error: event.error,
                status: 0,
                should_exit: false,
            },
        }
    }
}
impl From<(ExitEvent, CancelToken)> for SessionSM<DoneState> {
    fn from((event, cancel): (ExitEvent, CancelToken)) -> SessionSM<DoneState> {
        SessionSM {
            settings: event.settings,
            cancel,
            state: DoneState {
                error: None,
                status: event.status,
                should_exit: true,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsBuilder;

    #[test]
    fn missing_image_fails_before_opening_the_port() {
        let settings = SettingsBuilder::new()
            .path("/dev/uartboot-no-such-device")
            .image("/nonexistent/uartboot/boot.bin")
            .open_retries(0)
            .finalize();
        let mut session = factory(settings, CancelToken::new());
        assert_eq!(session.run(), 1);
    }

    #[test]
    fn no_image_at_all_is_an_error() {
        let settings = SettingsBuilder::new().open_retries(0).finalize();
        assert_eq!(factory(settings, CancelToken::new()).run(), 1);
    }

    #[test]
    fn missing_device_is_an_error() {
        let image = std::env::temp_dir().join(format!(
            "uartboot-session-{}.bin",
            std::process::id()
        ));
        std::fs::write(&image, [1u8, 2, 3, 4, 5]).unwrap();

        let settings = SettingsBuilder::new()
            .path("/dev/uartboot-no-such-device")
            .image(image.to_string_lossy())
            .open_retries(0)
            .finalize();
        let status = factory(settings, CancelToken::new()).run();
        std::fs::remove_file(&image).unwrap();

        assert_eq!(status, 1);
    }
}
