//! This is a plugin for the Bevy game engine providing chunked flow-field navigation and named region tracking for real-time strategy games
//!

pub mod bundle;
pub mod environment;
pub mod navigation;
pub mod plugin;
pub mod regions;

pub mod prelude;
