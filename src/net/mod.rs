//! Network plumbing: connectivity oracle and HTTP transport.

pub mod connectivity;
pub mod transport;

pub use connectivity::{
    AlwaysConnected, Connectivity, ConnectivityProbe, NetworkInfo, NetworkState,
    StaticConnectivity, TransportKind,
};
pub use transport::{HttpTransport, Transport};
