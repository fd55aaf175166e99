use std::sync::atomic::{AtomicU8, Ordering};

/// Coarse state of the platform's active network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkState {
    Connecting,
    Connected,
    Suspended,
    Disconnecting,
    Disconnected,
    Unknown,
}

/// Platform hook reporting the currently active network, if any.
pub trait Connectivity: Send + Sync {
    fn active_network(&self) -> Option<NetworkState>;
}

/// A network counts as usable only when the active interface is exactly `Connected`.
pub fn is_connected(connectivity: &dyn Connectivity) -> bool {
    matches!(connectivity.active_network(), Some(NetworkState::Connected))
}

/// Connectivity source whose state is set by the embedder (or a test).
#[derive(Debug)]
pub struct StaticConnectivity {
    state: AtomicU8,
}

const NO_NETWORK: u8 = u8::MAX;

impl StaticConnectivity {
    pub fn new(state: Option<NetworkState>) -> Self {
        Self {
            state: AtomicU8::new(encode(state)),
        }
    }

    pub fn connected() -> Self {
        Self::new(Some(NetworkState::Connected))
    }

    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn set(&self, state: Option<NetworkState>) {
        self.state.store(encode(state), Ordering::SeqCst);
    }
}

impl Connectivity for StaticConnectivity {
    fn active_network(&self) -> Option<NetworkState> {
        decode(self.state.load(Ordering::SeqCst))
    }
}

fn encode(state: Option<NetworkState>) -> u8 {
    match state {
        None => NO_NETWORK,
        Some(NetworkState::Connecting) => 0,
        Some(NetworkState::Connected) => 1,
        Some(NetworkState::Suspended) => 2,
        Some(NetworkState::Disconnecting) => 3,
        Some(NetworkState::Disconnected) => 4,
        Some(NetworkState::Unknown) => 5,
    }
}

fn decode(raw: u8) -> Option<NetworkState> {
    match raw {
        0 => Some(NetworkState::Connecting),
        1 => Some(NetworkState::Connected),
        2 => Some(NetworkState::Suspended),
        3 => Some(NetworkState::Disconnecting),
        4 => Some(NetworkState::Disconnected),
        5 => Some(NetworkState::Unknown),
        _ => None,
    }
}
