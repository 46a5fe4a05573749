//! Link protocol: the transport layer (device contract, chunked transmit
//! scheduler, trigger-framed decoder) and the session that ties both paths
//! together behind the command surface.
pub mod session;
pub mod transport;
