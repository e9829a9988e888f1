pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::error::{Result, TributaryError};
use crate::auth::Session;
use crate::domain::ShareEvent;
use crate::reconciler::ReconcilerHandle;

pub use transport::{PushStream, PushTransport, WebSocketTransport};

const RECONNECT_BASE: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(60);

/// Per-session push topic: `notify/<access-token>`.
pub fn session_topic(session: &Session) -> String {
    format!("notify/{}", session.access_token)
}

/// Decode one raw push payload into a share event.
fn decode_event(payload: &str) -> Result<ShareEvent> {
    serde_json::from_str(payload).map_err(|e| TributaryError::MalformedPayload(e.to_string()))
}

/// Maintains the live push subscription for one session.
///
/// Each inbound payload is decoded and forwarded to the Reconciler as a
/// signal. Malformed payloads are logged and dropped. Disconnects trigger
/// silent reconnection with exponential backoff; the Reconciler is never
/// told about outages. The listener stops on its own once the Reconciler
/// side of the channel is gone.
pub struct NotificationListener {
    transport: Arc<dyn PushTransport>,
    reconciler: ReconcilerHandle,
    topic: String,
    reconnect_base: Duration,
    reconnect_max: Duration,
}

impl NotificationListener {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        reconciler: ReconcilerHandle,
        session: &Session,
    ) -> Self {
        Self::with_backoff(transport, reconciler, session, RECONNECT_BASE, RECONNECT_MAX)
    }

    pub fn with_backoff(
        transport: Arc<dyn PushTransport>,
        reconciler: ReconcilerHandle,
        session: &Session,
        reconnect_base: Duration,
        reconnect_max: Duration,
    ) -> Self {
        Self {
            transport,
            reconciler,
            topic: session_topic(session),
            reconnect_base,
            reconnect_max,
        }
    }

    pub async fn run(self) {
        let mut delay = self.reconnect_base;

        loop {
            match self.run_subscription().await {
                SubscriptionEnd::ReconcilerGone => {
                    info!("reconciler gone, listener stopping");
                    return;
                }
                SubscriptionEnd::Connected => delay = self.reconnect_base,
                SubscriptionEnd::Failed => {}
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.reconnect_max);
        }
    }

    /// One subscribe-and-drain pass. Returns how it ended so `run` can
    /// reset or grow the backoff.
    async fn run_subscription(&self) -> SubscriptionEnd {
        let mut stream = match self.transport.subscribe(&self.topic).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("push subscribe failed: {}", e);
                return SubscriptionEnd::Failed;
            }
        };
        info!("subscribed to {}", self.topic);

        loop {
            match stream.next_message().await {
                Ok(Some(payload)) => match decode_event(&payload) {
                    Ok(event) => {
                        if !self.reconciler.on_push_event(event).await {
                            return SubscriptionEnd::ReconcilerGone;
                        }
                    }
                    Err(e) => warn!("dropping malformed push payload: {}", e),
                },
                Ok(None) => {
                    warn!("push channel closed, reconnecting");
                    return SubscriptionEnd::Connected;
                }
                Err(e) => {
                    warn!("push channel error, reconnecting: {}", e);
                    return SubscriptionEnd::Connected;
                }
            }
        }
    }
}

enum SubscriptionEnd {
    /// The subscription was established and later dropped.
    Connected,
    /// Subscribing itself failed.
    Failed,
    ReconcilerGone,
}
