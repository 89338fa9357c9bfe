//! Session kernel: players, the append-only log, and the flow cursor.
//!
//! # Architecture
//!
//! - [`Player`] / [`StatusFlags`] — per-player derived state behind a
//!   capability-gated mutation surface
//! - [`LogEntry`] — immutable records of non-deterministic events, the sole
//!   driver of derived state
//! - [`FlowCursor`] — the serializable program counter
//! - [`Session`] — the kernel tying them together; all mutation flows
//!   through [`Session::append_and_apply`]

pub mod cursor;
pub mod kernel;
pub mod log;
pub mod player;

pub use cursor::{FlowCursor, PausedListener};
pub use kernel::{GateKey, Mutator, Session, SessionId};
pub use log::{DeathCause, LogEntry, LogEvent};
pub use player::{Health, Player, PlayerId, PlayerView, RoleId, StatusEffect, StatusFlags};
