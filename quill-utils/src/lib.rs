//! Shared building blocks for the quill crates.
//!
//! - [`codec`] - variable-length integer encoding
//! - [`serial`] - the [`WriteTo`](serial::WriteTo) / [`ReadFrom`](serial::ReadFrom) wire traits
//! - [`BitSet`] - growable bit set with the protocol's byte and word layouts
//! - [`locks`] - lock aliases used by connection state

mod bitset;
pub mod codec;
pub mod locks;
pub mod serial;

pub use bitset::BitSet;
