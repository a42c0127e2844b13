use crate::error::Domain;

/// Default number of consecutive device failures that ends the process.
pub const DEFAULT_MAX_RECONNECTS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

/// Consecutive device failures since the last successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectCounter {
    count: u32,
    ceiling: u32,
}

impl ReconnectCounter {
    pub fn new(ceiling: u32) -> Self {
        Self { count: 0, ceiling }
    }

    pub fn count(self) -> u32 {
        self.count
    }

    pub fn ceiling(self) -> u32 {
        self.ceiling
    }

    pub fn reset(self) -> Self {
        Self { count: 0, ..self }
    }

    pub fn bump(self) -> Self {
        Self {
            count: self.count.saturating_add(1),
            ..self
        }
    }

    pub fn exhausted(self) -> bool {
        self.count >= self.ceiling
    }
}

/// What the loop must do after a link failure has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-accept a client; device untouched.
    Reaccept,
    /// Back off, then re-open the device.
    Reopen,
    /// Too many device failures in a row.
    GiveUp,
}

/// Link states and the device reconnect counter, owned by the bridge loop.
///
/// Transitions take the session by value and hand back the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub client: LinkState,
    pub device: LinkState,
    pub reconnects: ReconnectCounter,
}

impl Session {
    pub fn new(max_reconnects: u32) -> Self {
        Self {
            client: LinkState::Disconnected,
            device: LinkState::Disconnected,
            reconnects: ReconnectCounter::new(max_reconnects),
        }
    }

    pub fn client_connected(self) -> Self {
        Self {
            client: LinkState::Connected,
            ..self
        }
    }

    pub fn device_connected(self) -> Self {
        Self {
            device: LinkState::Connected,
            reconnects: self.reconnects.reset(),
            ..self
        }
    }

    /// Record a failure on one link and decide how to recover.
    pub fn fail(self, domain: Domain) -> (Self, Recovery) {
        match domain {
            Domain::Client => (
                Self {
                    client: LinkState::Disconnected,
                    ..self
                },
                Recovery::Reaccept,
            ),
            Domain::Device => {
                let reconnects = self.reconnects.bump();
                let next = Self {
                    device: LinkState::Disconnected,
                    reconnects,
                    ..self
                };
                if reconnects.exhausted() {
                    (next, Recovery::GiveUp)
                } else {
                    (next, Recovery::Reopen)
                }
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECONNECTS)
    }
}
