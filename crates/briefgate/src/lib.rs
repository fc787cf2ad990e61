//! `briefgate` - Gated, credit-metered account intelligence briefs
//!
//! Weekly access codes gate a small credit ledger. Each credit buys one run
//! of a research agent that asks a web-search LLM for a cited account brief,
//! which can then be rendered as a one-page PDF. All state lives in a
//! SQLite-backed key-value store.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod access;
pub mod agent;
pub mod brief;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod pdf;
pub mod records;
pub mod session;
pub mod storage;
pub mod webhook;

#[cfg(test)]
mod test_http;

pub use access::AccessGate;
pub use agent::{prune_cache, AgentRunner, RunOutcome};
pub use brief::{AccountInputs, Brief, BriefProvider};
pub use clock::Clock;
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use logging::init_logging;
pub use records::{CodeRecord, HistoryEntry, Session, Tier, UserRecord};
pub use storage::{Storage, StorageStats};
