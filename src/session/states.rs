//! States for the `uartboot` boot session state machine.
//!
//! This modules is private and restricted to the [`session`](crate::session)
//! scope. The public interface of the state machine is provided by
//! [`session`](crate::session).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::io;

use console::style;
use log::info;

use super::events::*;

use crate::{
    duplex,
    error::Error,
    packet::Packet,
    settings::Settings,
    terminal::HostConsole,
    transmitter::{self, ConsoleProgress},
    transport::SerialTransport,
    utils::CancelToken,
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Exit status of a session interrupted by the user during the transfer.
pub(crate) const STATUS_INTERRUPTED: i32 = 130;

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state can do any work that needs to be done and
    /// when finished, requests a transition to a `new state` by returning the
    /// appropriate `event`. The `state` and the `event` are consumed to create
    /// the `new state` using the corresponding [`From`] trait implementation
    /// (provided such implementation exists).
    fn run(&mut self, settings: &Settings, cancel: &CancelToken) -> Event;
}

// Init State ==================================================================

/// The initial state of the session state machine.
///
/// The image is read first so that a bad path is reported before anything is
/// sent to the device. From the `InitState`, the state machine can evolve via
/// the following transitions:
///
///  * **[`TransmitEvent`] => [`TransmitState`]** when the image was read and
///    the serial port opened,
///  * **[`DoneEvent`] => [`DoneState`]** when either of those failed.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    fn run(&mut self, settings: &Settings, _cancel: &CancelToken) -> Event {
        info!("=> Init");

        let packet = match &settings.image {
            Some(image) => Packet::from_file(image, settings.offset),
            None => Err(Error::NoImage),
        };
        let packet = match packet {
            Ok(packet) => packet,
            Err(e) => return done(settings, Some(e)),
        };

        match SerialTransport::open(settings) {
            Ok(transport) => Event::Transmit(TransmitEvent {
                settings: settings.clone(),
                transport,
                packet,
            }),
            Err(e) => done(settings, Some(e)),
        }
    }
}

// Transmit State ==============================================================

/// A `state` of the session state machine where the packet is pushed to the
/// device, showing a progress bar and whatever the device prints meanwhile.
///
///  * **[`SwitchToTerminalEvent`] => [`TerminalState`]** once the last slice
///    was written,
///  * **[`DoneEvent`] => [`DoneState`]** on a write error or when the user
///    interrupts the transfer.
#[derive(Debug)]
pub(crate) struct TransmitState {
    /// Consumed and moved upon the transition to [`TerminalState`].
    pub transport: Option<SerialTransport>,
    pub packet: Packet,
}
impl Runnable for TransmitState {
    fn run(&mut self, settings: &Settings, cancel: &CancelToken) -> Event {
        info!("=> Transmit");

        if let Some(mut transport) = self.transport.take() {
            println!(
                "[UB] 📦 Pushing {} bytes to {:#010x}",
                self.packet.size(),
                self.packet.offset()
            );
            let mut progress = ConsoleProgress::new();
            return match transmitter::send(
                &mut transport,
                &self.packet,
                settings.slice_len,
                &mut progress,
                cancel,
            ) {
                Ok(_) => Event::SwitchToTerminal(SwitchToTerminalEvent {
                    settings: settings.clone(),
                    transport,
                }),
                Err(e) => done(settings, Some(e)),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}

// Terminal State ==============================================================

/// A `state` of the session state machine where `uartboot` acts as a terminal
/// to the device until the user presses `Ctrl+C`.
///
///  * **[`DoneEvent`] => [`DoneState`]** when the terminal session ends,
///    normally or because of an error on the serial port or the console.
#[derive(Debug)]
pub(crate) struct TerminalState {
    pub transport: Option<SerialTransport>,
}
impl Runnable for TerminalState {
    fn run(&mut self, settings: &Settings, cancel: &CancelToken) -> Event {
        info!("=> Terminal");

        if let Some(mut transport) = self.transport.take() {
            println!(
                "[UB] 💻 Terminal mode, press {} to quit",
                style("Ctrl+C").cyan()
            );
            let result = duplex::attach(
                &mut transport,
                &mut HostConsole::new(),
                io::stdout(),
                cancel.clone(),
                settings.idle_delay,
            );
            return done(settings, result.err());
        }

        // We should never reach here!
        unreachable!()
    }
}

// Done State ==================================================================

/// Reached when the session completes its execution and is about to terminate
/// (normally or abnormally).
///
/// This state goes into a 2-phase execution. During the initial phase, it runs
/// like any other state to report how the session ended. It then triggers the
/// [`ExitEvent`] to cause the state machine to terminate and exit.
#[derive(Debug)]
pub(crate) struct DoneState {
    /// The error that ended the session, reported once.
    pub error: Option<Error>,
    pub status: i32,
    /// When `true` instructs the state machine to exit its event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, settings: &Settings, _cancel: &CancelToken) -> Event {
        info!(
            "=> Done with{}errors",
            if self.error.is_some() { " " } else { " no " }
        );

        let status = match self.error.take() {
            None => 0,
            Some(Error::Interrupted) => {
                println!("{}", style("[UB] 🛑 Transfer interrupted").yellow());
                STATUS_INTERRUPTED
            }
            Some(e) => {
                println!("{} {}", style("[UB] 💥").red(), style(&e).red());
                if let Error::Device(_) | Error::Io(_) = e {
                    println!("[UB] 🔌 Check that the device is still connected!");
                }
                1
            }
        };

        Event::Exit(ExitEvent {
            settings: settings.clone(),
            status,
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn done(settings: &Settings, error: Option<Error>) -> Event {
    Event::Done(DoneEvent {
        settings: settings.clone(),
        error,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
