//! Events for the `uartboot` boot session state machine.
//!
//! This modules is private and restricted to the [`session`](crate::session)
//! scope. The public interface of the state machine is provided by
//! [`session`](crate::session).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use crate::{error::Error, packet::Packet, settings::Settings, transport::SerialTransport};

// =============================================================================
// Crate-Public Interface
// =============================================================================

// TransmitEvent ===============================================================

/// Event fired to trigger a transition to [`TransmitState`](super::states::TransmitState).
///
/// This event happens at the [`InitState`](super::states::InitState) once the
/// image was read into a packet and the serial port was opened.
#[derive(Debug)]
pub(crate) struct TransmitEvent {
    pub settings: Settings,
    /// Consumed and moved to the next state.
    pub transport: SerialTransport,
    pub packet: Packet,
}

// SwitchToTerminalEvent =======================================================

/// Event fired to trigger a transition to [`TerminalState`](super::states::TerminalState),
/// after the whole packet went out.
#[derive(Debug)]
pub(crate) struct SwitchToTerminalEvent {
    pub settings: Settings,
    /// Consumed and moved to the next state.
    pub transport: SerialTransport,
}

// DoneEvent ===================================================================

/// Event fired when the session completes and is about to terminate. It
/// triggers a transition to the `Done` state.
///
/// This event can happen at any state due to normal termination, user initiated
/// termination or abnormal termination caused by an unrecoverable error.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub settings: Settings,
    /// The error that ended the session, if any.
    pub error: Option<Error>,
}

// ExitEvent ===================================================================

/// The last event that can be triggered in the session state machine and will
/// result in the event loop terminating with an `exit status`, handing back the
/// control to the original caller that started the event loop.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub settings: Settings,
    pub status: i32,
}

// Events enum ==================================================================

/// Events that can be triggered within the boot session state machine.
///
/// Each possible value holds an `event`, which in turn may hold additional data
/// for the state transition. Such data is passed by the origin state for
/// potential use by the target state.
#[derive(Debug)]
pub(crate) enum Event {
    Transmit(TransmitEvent),
    SwitchToTerminal(SwitchToTerminalEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
