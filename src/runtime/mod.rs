//! Load generation runtime
//!
//! Turns a validated `Config` into running virtual users:
//! - `client`: the `RequestSender` seam and its `reqwest` implementation
//! - `vu`: the pick, request, pause loop each virtual user runs
//! - `scheduler`: tracks the profile's VU target over time

pub mod client;
pub mod scheduler;
pub mod vu;

pub use client::{ReqwestSender, RequestSender};
pub use scheduler::{DEFAULT_TICK, MIN_TICK, RunSummary, Scheduler};
pub use vu::{VirtualUser, VuContext};
