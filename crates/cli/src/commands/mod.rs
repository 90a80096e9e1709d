//! Subcommand implementations

pub mod classify;
pub mod config;
pub mod doctor;
pub mod session;
