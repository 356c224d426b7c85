//! Async WebSocket gateway client.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::{PlatformError, Result};

const DEFAULT_GW: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Gateway opcodes.
pub mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intent bits.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
}

/// A raw gateway event.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub event: Option<String>,
    pub data: Value,
}

type Shared<T> = Arc<Mutex<Option<T>>>;

/// Async gateway client with auto-reconnect and heartbeat.
///
/// ```rust,no_run
/// use keystone_sdk::gateway::GatewayClient;
///
/// #[tokio::main]
/// async fn main() -> keystone_sdk::Result<()> {
///     let gw = GatewayClient::new("Bot mytoken", None);
///     let mut events = gw.subscribe();
///     gw.connect().await?;  // spawns background task, returns immediately
///     while let Ok(event) = events.recv().await {
///         if let Some(name) = &event.event {
///             println!("{name}: {:?}", event.data);
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct GatewayClient {
    token: String,
    gateway_url: String,
    intents: u64,
    fallback_heartbeat: Duration,
    max_reconnect: u32,
    sender: broadcast::Sender<GatewayEvent>,
    session_id: Shared<String>,
    seq: Shared<u64>,
}

impl GatewayClient {
    pub fn new(token: impl Into<String>, gateway_url: Option<&str>) -> Self {
        let token = {
            let t = token.into();
            if t.starts_with("Bot ") { t } else { format!("Bot {t}") }
        };
        let (sender, _) = broadcast::channel(256);
        Self {
            token,
            gateway_url: gateway_url.unwrap_or(DEFAULT_GW).to_owned(),
            intents: intents::GUILDS | intents::GUILD_MEMBERS,
            fallback_heartbeat: Duration::from_secs(41),
            max_reconnect: 10,
            sender,
            session_id: Arc::new(Mutex::new(None)),
            seq: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to broadcast gateway events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// Spawns a background task that maintains the gateway connection.
    /// Returns immediately; use [`subscribe`](Self::subscribe) to receive events.
    pub async fn connect(&self) -> Result<()> {
        let session = Session {
            token: self.token.clone(),
            url: self.gateway_url.clone(),
            intents: self.intents,
            fallback_heartbeat: self.fallback_heartbeat,
            tx: self.sender.clone(),
            session_id: Arc::clone(&self.session_id),
            seq: Arc::clone(&self.seq),
        };
        let max_reconnect = self.max_reconnect;

        tokio::spawn(async move {
            let mut attempts = 0u32;
            loop {
                match session.run_once().await {
                    Ok(()) => { attempts = 0; }
                    Err(e) => {
                        attempts += 1;
                        if attempts > max_reconnect {
                            error!("Gateway: max reconnect attempts reached: {e}");
                            break;
                        }
                        let delay = Duration::from_secs(u64::min(2u64.pow(attempts), 30));
                        warn!("Gateway: disconnected ({e}), reconnecting in {delay:?} (attempt {attempts})");
                        let _ = session.tx.send(GatewayEvent {
                            event: Some("RECONNECTING".into()),
                            data: json!({ "attempt": attempts }),
                        });
                        sleep(delay).await;
                    }
                }
            }
        });

        Ok(())
    }
}

struct Session {
    token: String,
    url: String,
    intents: u64,
    fallback_heartbeat: Duration,
    tx: broadcast::Sender<GatewayEvent>,
    session_id: Shared<String>,
    seq: Shared<u64>,
}

impl Session {
    async fn run_once(&self) -> Result<()> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (sink, mut stream) = ws.split();
        let sink = Arc::new(Mutex::new(sink));

        // The server opens with HELLO carrying the heartbeat cadence.
        let hb_interval = match stream.next().await {
            Some(Ok(Message::Text(t))) => {
                let hello: Value = serde_json::from_str(t.as_str())?;
                hello["d"]["heartbeat_interval"]
                    .as_u64()
                    .map(Duration::from_millis)
                    .unwrap_or(self.fallback_heartbeat)
            }
            Some(Ok(_)) => self.fallback_heartbeat,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(PlatformError::NotConnected),
        };

        // Identify or resume
        let sid = self.session_id.lock().await.clone();
        let s = *self.seq.lock().await;
        let identify = if let (Some(sid), Some(s)) = (sid, s) {
            json!({ "op": op::RESUME, "d": { "token": self.token, "session_id": sid, "seq": s } })
        } else {
            json!({
                "op": op::IDENTIFY,
                "d": {
                    "token": self.token,
                    "intents": self.intents,
                    "properties": { "os": std::env::consts::OS, "browser": "keystone", "device": "keystone" }
                }
            })
        };
        sink.lock().await.send(Message::Text(identify.to_string().into())).await?;

        // Heartbeat task
        let sink_hb = Arc::clone(&sink);
        let seq_hb = Arc::clone(&self.seq);
        let hb_task = tokio::spawn(async move {
            loop {
                sleep(hb_interval).await;
                let seq_val = *seq_hb.lock().await;
                let msg = json!({ "op": op::HEARTBEAT, "d": seq_val }).to_string();
                if sink_hb.lock().await.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
        });

        let result = async {
            while let Some(msg) = stream.next().await {
                let msg = msg?;
                let text = match &msg {
                    Message::Text(t) => t.as_str().to_owned(),
                    Message::Close(_) => return Ok(()),
                    _ => continue,
                };
                let payload: Value = serde_json::from_str(&text)?;
                let op_code = payload["op"].as_u64().unwrap_or(255) as u8;
                let data = payload.get("d").cloned().unwrap_or(Value::Null);
                let event_name = payload.get("t").and_then(|v| v.as_str()).map(str::to_owned);
                if let Some(s) = payload.get("s").and_then(|v| v.as_u64()) {
                    *self.seq.lock().await = Some(s);
                }

                match op_code {
                    op::DISPATCH => {
                        if event_name.as_deref() == Some("READY") {
                            if let Some(sid) = data.get("session_id").and_then(|v| v.as_str()) {
                                *self.session_id.lock().await = Some(sid.to_owned());
                            }
                        }
                        let _ = self.tx.send(GatewayEvent { event: event_name, data });
                    }
                    op::HEARTBEAT => {
                        let s = *self.seq.lock().await;
                        let msg = json!({ "op": op::HEARTBEAT, "d": s }).to_string();
                        sink.lock().await.send(Message::Text(msg.into())).await?;
                    }
                    op::RECONNECT => {
                        info!("Gateway: server requested reconnect");
                        return Ok(());
                    }
                    op::INVALID_SESSION => {
                        info!("Gateway: session invalidated, identifying from scratch");
                        *self.session_id.lock().await = None;
                        *self.seq.lock().await = None;
                        return Ok(());
                    }
                    op::HEARTBEAT_ACK => debug!("Gateway: heartbeat ack"),
                    _ => {}
                }
            }
            Ok::<(), PlatformError>(())
        }
        .await;

        hb_task.abort();
        result
    }
}
