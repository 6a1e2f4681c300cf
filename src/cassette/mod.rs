//! Cassette format for recording and replaying port interactions.
//!
//! A cassette is a YAML list of `port::method` calls with their JSON inputs
//! and outputs. Recording wraps the live adapters; replaying serves the
//! outputs back in order, so model-backed workflows run deterministically.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
