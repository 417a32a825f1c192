//! Relay Core
//!
//! Core types and abstractions for the Relay agent.
//!
//! This crate contains:
//! - Domain types: runs, their lifecycle state and the orchestrator's job vocabulary
//! - Scheduling: when an in-progress run should be checked again
//! - DTOs: request bodies sent to the orchestrator's command endpoints

pub mod domain;
pub mod dto;
pub mod schedule;
