//! Scheduler layer for the agent
//!
//! This layer repeatedly picks the runs that are due, hands each one to the
//! backend and stores what comes back. It owns the only concurrency in the
//! agent: runs are dispatched in parallel, but never the same run twice at once.

pub mod poller;

pub use poller::RunPoller;
