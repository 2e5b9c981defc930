//! Personal activity time tracker for the terminal. Define named
//! activities, start and stop a single timer, and keep total and trailing
//! 7 day rollups. Data lives in a plain CSV file and can mirror to an
//! optional sync server.
//!

pub mod cli;
pub mod config;
pub mod remote;
pub mod storage;
pub mod tracker;
pub mod utils;
