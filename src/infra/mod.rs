//! Infrastructure shared by the transmit and receive paths: line-sample codecs
//! and fixed-capacity byte storage.
pub mod codec;
