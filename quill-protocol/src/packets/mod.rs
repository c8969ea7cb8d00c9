//! Packets grouped by connection state.

pub mod game;
