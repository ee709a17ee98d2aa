//! Command implementations for the LocusView CLI

pub mod config;
pub mod replay;
