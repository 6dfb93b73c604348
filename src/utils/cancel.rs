//! Cooperative cancellation of a boot session.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A flag shared between the interrupt signal handler and the loops of the
/// session. Setting it never stops anything by itself: the transmitter and the
/// terminal loop check it once per iteration and wind down, which keeps the
/// console restoration on the normal return path.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn clones_share_the_flag() {
    let token = CancelToken::new();
    let handler_side = token.clone();
    assert!(!token.is_cancelled());
    handler_side.cancel();
    assert!(token.is_cancelled());
}
