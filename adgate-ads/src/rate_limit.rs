//! Cooldown and per-session cap for intrusive ad formats.
//!
//! The check and the mutation happen under one lock, so two rapid calls can
//! never both pass before either records its show.

use std::sync::Mutex;
use tracing::debug;

/// Outcome of [`RateLimiter::try_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The show may proceed; it has been recorded.
    Allowed,
    /// The previous show was less than the cooldown ago.
    CooldownActive {
        /// Milliseconds until the cooldown expires.
        remaining_ms: i64,
    },
    /// The session cap has been reached.
    SessionLimitReached,
}

impl RateDecision {
    /// Returns true if the show may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Mutable limiter state. Never persisted; resets with the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// When the last allowed show happened, in epoch milliseconds.
    pub last_show_at_ms: Option<i64>,
    /// Allowed shows in this process. Never decreases.
    pub session_show_count: u32,
}

/// Cooldown window plus session cap.
#[derive(Debug)]
pub struct RateLimiter {
    cooldown_ms: i64,
    max_per_session: u32,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    /// Creates a limiter.
    #[must_use]
    pub fn new(cooldown_ms: u64, max_per_session: u32) -> Self {
        Self {
            cooldown_ms: i64::try_from(cooldown_ms).unwrap_or(i64::MAX),
            max_per_session,
            state: Mutex::new(RateLimitState::default()),
        }
    }

    /// Returns the cooldown in milliseconds.
    #[must_use]
    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    /// Returns the session cap.
    #[must_use]
    pub fn max_per_session(&self) -> u32 {
        self.max_per_session
    }

    /// Checks the policy at `now_ms` and, if allowed, records a show.
    pub fn try_consume(&self, now_ms: i64) -> RateDecision {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.session_show_count >= self.max_per_session {
            debug!(
                count = state.session_show_count,
                max = self.max_per_session,
                "Rate limit: session cap reached"
            );
            return RateDecision::SessionLimitReached;
        }

        if let Some(last) = state.last_show_at_ms {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.cooldown_ms {
                let remaining_ms = self.cooldown_ms - elapsed;
                debug!(remaining_ms, "Rate limit: cooldown active");
                return RateDecision::CooldownActive { remaining_ms };
            }
        }

        state.last_show_at_ms = Some(now_ms);
        state.session_show_count += 1;
        RateDecision::Allowed
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> RateLimitState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allowed shows so far in this process.
    #[must_use]
    pub fn session_show_count(&self) -> u32 {
        self.state().session_show_count
    }
}
