//! # Wait Module
//!
//! Result Wait Protocol and the polling schedule it falls back to.

pub mod poller;
pub mod protocol;

pub use poller::PollSchedule;
pub use protocol::{wait_for, Resolution, Waitable};
