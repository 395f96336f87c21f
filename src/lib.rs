//! loadmix - weighted-endpoint HTTP load generator
//!
//! Virtual users repeatedly pick an endpoint from a weighted table, send one
//! `GET`, and pause. The number of running virtual users follows a ramp or
//! constant traffic profile.

pub mod cli;
pub mod config;
pub mod duration;
pub mod endpoints;
pub mod error;
pub mod metrics;
pub mod pacing;
pub mod profile;
pub mod runtime;
pub mod telemetry;
