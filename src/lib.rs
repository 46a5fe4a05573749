//! `daq-bitbang` library: drives an I2C-style clock/data bus (plus an optional
//! packet trigger line) through a sample-clocked digital output device, and
//! rebuilds trigger-framed packets from a sampled digital input stream, in a
//! `no_std` environment. The crate exposes the sample codecs (bit cells, frames,
//! receive ring), the transport layer (device traits, chunked scheduler,
//! decoder) and the session command surface.
#![no_std]
//==================================================================================
/// Core data types shared by the codecs and the protocol layer.
pub mod core;
/// Configuration, framing and link errors.
pub mod error;
/// Line-sample codecs and byte storage.
pub mod infra;
/// Transport layer and link session.
pub mod protocol;
//==================================================================================
