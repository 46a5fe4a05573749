//! Sample-level codecs: bit cells, whole frames and the receive byte ring.
pub mod cell;
pub mod frame;
pub mod ring;
