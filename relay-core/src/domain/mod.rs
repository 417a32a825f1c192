//! Core domain types
//!
//! This module contains the core domain structures used across Relay crates.
//! A run is created by whoever reads the job spec, driven forward by a backend
//! and persisted by the agent's run store.

pub mod job;
pub mod run;
pub mod state;
