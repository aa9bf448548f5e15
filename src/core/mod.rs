//! Core module - configuration, events, and loop control primitives

pub mod config;
pub mod control;
pub mod events;
