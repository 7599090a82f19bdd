pub mod http_gateway;

pub use http_gateway::{HttpConnectivityProbe, HttpRemoteGateway};
