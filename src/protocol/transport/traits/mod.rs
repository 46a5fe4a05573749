//! Abstraction traits used by the transport layer (digital I/O device and timer).
pub mod device;
pub mod link_timer;
