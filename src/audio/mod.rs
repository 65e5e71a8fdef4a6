//! Host-side audio decoding

pub mod decoder;

pub use decoder::decode;
