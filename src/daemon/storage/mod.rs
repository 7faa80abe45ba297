//!  Storage is organized through [store::JsonStateStore].
//!  The basic idea is:
//!   - All persistent data is a single flat [state::StoreState]: today's
//!     per-domain usage, the user-configured limits, and notification
//!     cooldowns as three separate typed mappings.
//!   - The state lives in one JSON file guarded by advisory locks, so the
//!     daemon and the cli can touch it without stepping on each other.
//!   - [ledger::UsageLedger] holds the read-modify-write operations. Every
//!     operation is a full load and save, there is no caching in between.

pub mod ledger;
pub mod state;
pub mod store;
