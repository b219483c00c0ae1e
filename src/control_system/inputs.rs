use crate::shared_data::{Approach, EmergencyRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// External switches the controller consults at each decision point:
/// the pending emergency request and the manual override mode.
#[derive(Debug, Default)]
pub struct ControlInputs {
    emergency: Mutex<Option<EmergencyRequest>>,
    override_mode: AtomicBool,
}

impl ControlInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files an emergency request. A request that is still pending is overwritten.
    pub fn request_emergency(&self, target: Approach) {
        let mut slot = self.emergency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(EmergencyRequest::new(target)) {
            log::debug!(
                "Emergency request for {} replaced by {}",
                previous.target,
                target
            );
        }
    }

    /// Removes and returns the pending request.
    pub fn take_emergency(&self) -> Option<EmergencyRequest> {
        self.emergency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn pending_emergency(&self) -> Option<EmergencyRequest> {
        *self.emergency.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_override_mode(&self, enabled: bool) {
        self.override_mode.store(enabled, Ordering::Release);
    }

    pub fn override_mode(&self) -> bool {
        self.override_mode.load(Ordering::Acquire)
    }
}
