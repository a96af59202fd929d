//! Ad unit handle identity.

use std::fmt;
use uuid::Uuid;

/// Identity of one SDK ad unit handle.
///
/// Every handle a controller creates gets a fresh id, and every SDK event
/// carries the id of the handle it was raised for. Comparing ids is how a
/// controller recognises callbacks for handles it has already discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Creates a new, time-ordered handle id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
