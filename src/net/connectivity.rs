//! Connectivity oracle: a fast pre-check before any network call.
//!
//! A positive answer does not guarantee the request will succeed. Transitional
//! (`Connecting`) states count as connected so callers try anyway.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Cellular,
    Wireless,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

impl NetworkState {
    pub fn is_connected_or_connecting(&self) -> bool {
        matches!(self, NetworkState::Connecting | NetworkState::Connected)
    }
}

/// Snapshot of the currently active network as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub state: NetworkState,
    pub transport: TransportKind,
}

impl NetworkInfo {
    pub fn connected(transport: TransportKind) -> Self {
        Self {
            state: NetworkState::Connected,
            transport,
        }
    }
}

/// Platform hook reporting the active network, if any.
pub trait ConnectivityProbe: Send + Sync {
    fn active_network(&self) -> Option<NetworkInfo>;
}

/// Answers connectivity questions on top of a [`ConnectivityProbe`].
#[derive(Clone)]
pub struct Connectivity {
    probe: Arc<dyn ConnectivityProbe>,
}

impl Connectivity {
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self { probe }
    }

    pub fn is_connected(&self) -> bool {
        self.probe
            .active_network()
            .map_or(false, |n| n.state.is_connected_or_connecting())
    }

    pub fn is_connected_over(&self, transport: TransportKind) -> bool {
        self.probe
            .active_network()
            .map_or(false, |n| n.state.is_connected_or_connecting() && n.transport == transport)
    }

    pub fn is_connected_over_cellular(&self) -> bool {
        self.is_connected_over(TransportKind::Cellular)
    }

    pub fn is_connected_over_wireless(&self) -> bool {
        self.is_connected_over(TransportKind::Wireless)
    }
}

impl std::fmt::Debug for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connectivity")
            .field("active_network", &self.probe.active_network())
            .finish()
    }
}

/// Probe for hosts without a platform connectivity API.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConnected;

impl ConnectivityProbe for AlwaysConnected {
    fn active_network(&self) -> Option<NetworkInfo> {
        Some(NetworkInfo::connected(TransportKind::Other))
    }
}

/// Probe whose state is pushed in by the host (e.g. from a platform network
/// callback).
#[derive(Debug, Default)]
pub struct StaticConnectivity {
    network: RwLock<Option<NetworkInfo>>,
}

impl StaticConnectivity {
    pub fn new(network: Option<NetworkInfo>) -> Self {
        Self {
            network: RwLock::new(network),
        }
    }

    pub fn online(transport: TransportKind) -> Self {
        Self::new(Some(NetworkInfo::connected(transport)))
    }

    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn set(&self, network: Option<NetworkInfo>) {
        // A poisoned lock only means a writer panicked mid-assignment of a Copy value.
        match self.network.write() {
            Ok(mut guard) => *guard = network,
            Err(poisoned) => *poisoned.into_inner() = network,
        }
    }
}

impl ConnectivityProbe for StaticConnectivity {
    fn active_network(&self) -> Option<NetworkInfo> {
        match self.network.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_active_network_is_offline() {
        let connectivity = Connectivity::new(Arc::new(StaticConnectivity::offline()));
        assert!(!connectivity.is_connected());
        assert!(!connectivity.is_connected_over_cellular());
        assert!(!connectivity.is_connected_over_wireless());
    }

    #[test]
    fn test_connecting_counts_as_connected() {
        let probe = StaticConnectivity::new(Some(NetworkInfo {
            state: NetworkState::Connecting,
            transport: TransportKind::Cellular,
        }));
        let connectivity = Connectivity::new(Arc::new(probe));
        assert!(connectivity.is_connected());
        assert!(connectivity.is_connected_over_cellular());
        assert!(!connectivity.is_connected_over_wireless());
    }

    #[test]
    fn test_disconnecting_is_not_connected() {
        let probe = StaticConnectivity::new(Some(NetworkInfo {
            state: NetworkState::Disconnecting,
            transport: TransportKind::Wireless,
        }));
        let connectivity = Connectivity::new(Arc::new(probe));
        assert!(!connectivity.is_connected());
        assert!(!connectivity.is_connected_over_wireless());
    }

    #[test]
    fn test_state_updates_are_observed() {
        let probe = Arc::new(StaticConnectivity::offline());
        let connectivity = Connectivity::new(probe.clone());
        assert!(!connectivity.is_connected());

        probe.set(Some(NetworkInfo::connected(TransportKind::Wireless)));
        assert!(connectivity.is_connected_over_wireless());
    }
}
