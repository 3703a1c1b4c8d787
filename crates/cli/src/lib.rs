//! AutoLab CLI
//!
//! Command-line front end for the automation learning sandbox: browse
//! scenarios, run scripts against the mock runtime, and track progress.

pub mod client;
pub mod commands;
pub mod output;
