//! Frontend Input - input normalization and player-slot mapping core
//!
//! Turns raw gamepad, keyboard and mouse events into logical button
//! transitions and keeps physical controllers bound to stable player slots
//! across hot-plug events and restarts.

pub mod config;
pub mod input;
pub mod paths;
pub mod storage;
