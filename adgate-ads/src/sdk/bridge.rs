//! Adapter for an SDK that lives in the host application.
//!
//! On mobile the ad SDK is native code owned by the app shell. The shell
//! keeps the [`BridgeHost`] end: it drains [`BridgeCommand`]s, calls into
//! the native SDK, and reports callbacks back with [`BridgeHost::deliver`].

use super::{AdEvent, AdEventSink, AdSdkAdapter, AdUnitHandle};
use crate::config::AdVendor;
use crate::error::{AdsError, AdsResult};
use adgate_types::{AdKind, HandleId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// What the host reported about its native SDK at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// The native SDK linked and loaded.
    pub sdk_present: bool,
    /// The host can render banner views.
    pub supports_banners: bool,
}

/// Reply channel for commands the host must acknowledge.
pub type BridgeReply = oneshot::Sender<Result<(), String>>;

/// A request from the engine to the host's native SDK.
#[derive(Debug)]
pub enum BridgeCommand {
    /// Start the native SDK.
    Initialize { reply: BridgeReply },
    /// Create a native ad object for `handle`.
    CreateUnit {
        handle: HandleId,
        kind: AdKind,
        placement_id: String,
    },
    /// Fetch an ad for `handle`. Completion is reported via `deliver`.
    Request { handle: HandleId },
    /// Present the loaded ad for `handle`.
    Show {
        handle: HandleId,
        context: Option<String>,
        reply: BridgeReply,
    },
    /// The engine dropped `handle`; the host may free the native object.
    Release { handle: HandleId },
}

type SinkMap = Arc<Mutex<HashMap<HandleId, AdEventSink>>>;

/// How long the engine waits for the host to answer a command.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine side of the host bridge.
pub struct BridgeSdk {
    vendor: AdVendor,
    capabilities: HostCapabilities,
    commands: mpsc::UnboundedSender<BridgeCommand>,
    sinks: SinkMap,
    reply_timeout: Duration,
}

/// Host side of the bridge.
pub struct BridgeHost {
    commands: mpsc::UnboundedReceiver<BridgeCommand>,
    sinks: SinkMap,
}

impl BridgeSdk {
    /// Creates a connected adapter/host pair.
    pub fn channel(vendor: AdVendor, capabilities: HostCapabilities) -> (Self, BridgeHost) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sinks: SinkMap = Arc::new(Mutex::new(HashMap::new()));
        let sdk = Self {
            vendor,
            capabilities,
            commands: tx,
            sinks: sinks.clone(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        };
        let host = BridgeHost {
            commands: rx,
            sinks,
        };
        (sdk, host)
    }

    /// Bounds how long `initialize` and `show` wait for the host's reply.
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// The vendor this bridge fronts.
    #[must_use]
    pub fn vendor(&self) -> AdVendor {
        self.vendor
    }

    fn send(&self, command: BridgeCommand) -> AdsResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AdsError::SdkUnavailable("host bridge closed".into()))
    }
}

#[async_trait]
impl AdSdkAdapter for BridgeSdk {
    fn name(&self) -> &str {
        self.vendor.as_str()
    }

    fn is_available(&self) -> bool {
        self.capabilities.sdk_present && !self.commands.is_closed()
    }

    fn supports_banners(&self) -> bool {
        self.capabilities.supports_banners
    }

    async fn initialize(&self) -> AdsResult<()> {
        if !self.capabilities.sdk_present {
            return Err(AdsError::SdkUnavailable(format!(
                "{} not linked in host",
                self.vendor.as_str()
            )));
        }
        let (reply, rx) = oneshot::channel();
        self.send(BridgeCommand::Initialize { reply })?;
        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(AdsError::InitializationFailed(reason)),
            Ok(Err(_)) => Err(AdsError::InitializationFailed(
                "host dropped initialize reply".into(),
            )),
            Err(_) => {
                warn!(vendor = self.vendor.as_str(), "Host did not answer initialize");
                Err(AdsError::InitializationFailed(format!(
                    "host did not answer initialize within {} ms",
                    self.reply_timeout.as_millis()
                )))
            }
        }
    }

    fn create_ad_unit(
        &self,
        kind: AdKind,
        placement_id: &str,
        sink: AdEventSink,
    ) -> AdsResult<Arc<dyn AdUnitHandle>> {
        let handle = sink.handle_id();
        self.send(BridgeCommand::CreateUnit {
            handle,
            kind,
            placement_id: placement_id.to_string(),
        })?;
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.insert(handle, sink);
        }
        Ok(Arc::new(BridgeUnit {
            handle,
            commands: self.commands.clone(),
            sinks: self.sinks.clone(),
            reply_timeout: self.reply_timeout,
        }))
    }
}

struct BridgeUnit {
    handle: HandleId,
    commands: mpsc::UnboundedSender<BridgeCommand>,
    sinks: SinkMap,
    reply_timeout: Duration,
}

#[async_trait]
impl AdUnitHandle for BridgeUnit {
    async fn request(&self) -> AdsResult<()> {
        self.commands
            .send(BridgeCommand::Request {
                handle: self.handle,
            })
            .map_err(|_| AdsError::LoadFailed("host bridge closed".into()))
    }

    async fn show(&self, context: Option<&str>) -> AdsResult<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(BridgeCommand::Show {
                handle: self.handle,
                context: context.map(str::to_string),
                reply,
            })
            .map_err(|_| AdsError::ShowFailed("host bridge closed".into()))?;
        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(AdsError::ShowFailed(reason)),
            Ok(Err(_)) => Err(AdsError::ShowFailed("host dropped show reply".into())),
            Err(_) => {
                warn!(handle = %self.handle, "Host did not answer show");
                Err(AdsError::ShowFailed(format!(
                    "host did not answer show within {} ms",
                    self.reply_timeout.as_millis()
                )))
            }
        }
    }
}

impl Drop for BridgeUnit {
    fn drop(&mut self) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.remove(&self.handle);
        }
        // The host may already be gone during shutdown.
        let _ = self.commands.send(BridgeCommand::Release {
            handle: self.handle,
        });
    }
}

impl BridgeHost {
    /// Waits for the next command. Returns `None` once the adapter and all
    /// its units are dropped.
    pub async fn next_command(&mut self) -> Option<BridgeCommand> {
        self.commands.recv().await
    }

    /// Returns the next command if one is queued.
    pub fn try_next_command(&mut self) -> Option<BridgeCommand> {
        self.commands.try_recv().ok()
    }

    /// Reports a native SDK callback for `handle`.
    ///
    /// Returns false if the engine no longer holds that handle.
    pub fn deliver(&self, handle: HandleId, event: AdEvent) -> bool {
        let sink = self
            .sinks
            .lock()
            .ok()
            .and_then(|sinks| sinks.get(&handle).cloned());
        match sink {
            Some(sink) => {
                debug!(%handle, ?event, "Bridge delivering SDK event");
                sink.emit(event)
            }
            None => {
                warn!(%handle, "Bridge event for released handle dropped");
                false
            }
        }
    }
}
