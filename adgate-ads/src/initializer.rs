//! One-shot ad SDK startup.
//!
//! Every caller of [`SdkInitializer::initialize`], concurrent or later,
//! shares a single underlying SDK call. Readiness is published through a
//! watch channel so waiters wake as soon as it settles, with a timeout as
//! the upper bound.

use crate::sdk::AdSdkAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tracing::{info, warn};

/// Initialization progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
    NotStarted,
    InProgress,
    Ready,
    Failed(String),
}

impl InitState {
    /// Whether initialization has finished, successfully or not.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }
}

/// Idempotent SDK initializer.
pub struct SdkInitializer {
    sdk: Arc<dyn AdSdkAdapter>,
    /// Sampled once: an SDK missing at startup stays missing.
    available: bool,
    result: OnceCell<bool>,
    state: watch::Sender<InitState>,
}

impl SdkInitializer {
    /// Creates an initializer. Detects SDK presence immediately.
    pub fn new(sdk: Arc<dyn AdSdkAdapter>) -> Self {
        let available = sdk.is_available();
        if !available {
            warn!(sdk = sdk.name(), "Ad SDK not available in this process");
        }
        let (state, _) = watch::channel(InitState::NotStarted);
        Self {
            sdk,
            available,
            result: OnceCell::new(),
            state,
        }
    }

    /// Initializes the SDK once. Never fails: returns false and records the
    /// reason if the SDK is missing or its startup fails.
    pub async fn initialize(&self) -> bool {
        *self.result.get_or_init(|| self.run()).await
    }

    async fn run(&self) -> bool {
        if !self.available {
            self.state
                .send_replace(InitState::Failed("ad SDK unavailable".into()));
            return false;
        }

        self.state.send_replace(InitState::InProgress);
        info!(sdk = self.sdk.name(), "Initializing ad SDK");
        match self.sdk.initialize().await {
            Ok(()) => {
                info!(sdk = self.sdk.name(), "Ad SDK initialized");
                self.state.send_replace(InitState::Ready);
                true
            }
            Err(e) => {
                warn!(sdk = self.sdk.name(), "Ad SDK initialization failed: {}", e);
                self.state.send_replace(InitState::Failed(e.to_string()));
                false
            }
        }
    }

    /// Waits until initialization settles or `timeout` elapses, whichever
    /// comes first. Returns whether the SDK is initialized at that point.
    pub async fn wait_for_initialization(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(InitState::is_settled)).await {
            Ok(Ok(state)) => *state == InitState::Ready,
            Ok(Err(_)) => self.is_initialized(),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for ad SDK");
                self.is_initialized()
            }
        }
    }

    /// Current progress.
    #[must_use]
    pub fn state(&self) -> InitState {
        self.state.borrow().clone()
    }

    /// SDK initialized successfully.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.state.borrow() == InitState::Ready
    }

    /// Initialization finished either way.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.borrow().is_settled()
    }

    /// Initialization has been attempted.
    #[must_use]
    pub fn is_started(&self) -> bool {
        *self.state.borrow() != InitState::NotStarted
    }

    /// Why initialization failed, if it did.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        match &*self.state.borrow() {
            InitState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Whether the SDK was present at startup.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }
}
