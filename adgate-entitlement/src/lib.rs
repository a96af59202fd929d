//! Persisted entitlement for the adgate ad engine.
//!
//! The entitlement is two flags, `premium` and `staff_override`. Either one
//! exempts the user from ads. This crate handles:
//! - Loading both flags from a key-value store without ever failing the
//!   caller (storage faults fall back to "not entitled")
//! - Persisting runtime changes in a single batched write
//! - A synchronous cached read for hot paths
//! - A change notification when the effective entitlement flips
//!
//! # Storage format
//!
//! Flags are stored as the strings `"true"` / `"false"` under
//! [`PREMIUM_KEY`] and [`STAFF_OVERRIDE_KEY`]. Missing keys read as `false`.

mod error;
mod kv;
mod store;

pub use error::{EntitlementError, EntitlementResult};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{ChangeListener, EntitlementStore, PREMIUM_KEY, STAFF_OVERRIDE_KEY};
