use std::sync::atomic::{AtomicBool, Ordering};

/// Local belief about whether the backend currently holds our registration.
///
/// Only the registrar writes it. It can go stale: the backend may expire the
/// entry on failed health checks while this still reads `true`.
#[derive(Debug, Default)]
pub struct RegistrationState {
    registered: AtomicBool,
}

impl RegistrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub(super) fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::Release);
    }
}
