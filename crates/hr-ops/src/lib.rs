//! Approval workflow and notification engine for internal HR operations.
//!
//! The heart of this crate is [`workflows::approvals`]: a single state machine
//! driving vacation, expense, and housing-rent applications through a shared
//! two-stage approval chain, with rejection bookkeeping and alarm fan-out
//! applied atomically alongside every status change.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
