//! `Nocturne` — resumable rules engine for moderated social-deduction games
//!
//! This library provides the execution core for a turn-based game run by a
//! human moderator: an event-sourced session kernel, a nested
//! phase/sub-phase/stage state machine, and an ordered hook-dispatch engine
//! whose entire continuation is plain serializable data. A session can be
//! torn down between any two moderator decisions and reconstructed later,
//! resuming at the exact paused point.

pub mod error;
pub mod flow;
pub mod hooks;
pub mod instruction;
pub mod observability;
pub mod session;
pub mod sessions;
