//! Single-shot relay publishing: one `EVENT` out, one `OK` back.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::nostr::{self, NostrEvent, RelayMessage};
use crate::util::short_id;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct PublishOptions {
    pub connect_timeout: Duration,
    pub ack_timeout: Duration,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

/// Relay acceptance of one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub event_id: String,
    pub message: String,
}

/// Text-frame transport to one relay.
#[allow(async_fn_in_trait)]
pub trait RelayConnection {
    async fn send_frame(&mut self, frame: String) -> Result<()>;

    /// `None` once the relay has closed the connection.
    async fn recv_frame(&mut self) -> Result<Option<String>>;

    async fn close(&mut self);
}

pub struct WsConnection {
    url: String,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsConnection {
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let (ws, _) = match timeout(connect_timeout, connect_async(url)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(err)) => return Err(Error::Connection(format!("{}: {}", url, err))),
            Err(_) => {
                return Err(Error::Connection(format!(
                    "{}: no connection after {}s",
                    url,
                    connect_timeout.as_secs_f32()
                )))
            }
        };
        tracing::info!(relay = %url, "relay connected");
        Ok(Self {
            url: url.to_string(),
            ws,
        })
    }
}

impl RelayConnection for WsConnection {
    async fn send_frame(&mut self, frame: String) -> Result<()> {
        self.ws
            .send(Message::Text(frame))
            .await
            .map_err(|e| Error::Connection(format!("{}: send failed: {}", self.url, e)))
    }

    async fn recv_frame(&mut self) -> Result<Option<String>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(txt))) => {
                    tracing::debug!(relay = %self.url, frame = %txt, "relay rx");
                    return Ok(Some(txt));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(Error::Protocol(format!("{}: read failed: {}", self.url, err))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.ws.close(None).await {
            tracing::debug!(relay = %self.url, error = %err, "relay close failed");
        }
    }
}

/// Connects to `url`, publishes `event` and waits for the relay's verdict.
pub async fn publish(event: &NostrEvent, url: &str, opts: &PublishOptions) -> Result<Ack> {
    let mut conn = WsConnection::connect(url, opts.connect_timeout).await?;
    let result = publish_over(&mut conn, event, opts.ack_timeout).await;
    conn.close().await;
    result
}

pub async fn publish_over<C: RelayConnection>(conn: &mut C, event: &NostrEvent, ack_timeout: Duration) -> Result<Ack> {
    let deadline = Instant::now().checked_add(ack_timeout).ok_or_else(|| {
        Error::Config(format!("ack timeout out of range: {}s", ack_timeout.as_secs()))
    })?;

    conn.send_frame(nostr::frame_event(event)).await?;
    tracing::debug!(event = %short_id(&event.id), "event sent; awaiting OK");
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let frame = match timeout(remaining, conn.recv_frame()).await {
            Ok(frame) => frame?,
            Err(_) => {
                return Err(Error::Protocol(format!(
                    "no OK for event {} within {}s",
                    short_id(&event.id),
                    ack_timeout.as_secs_f32()
                )))
            }
        };
        let frame = match frame {
            Some(f) => f,
            None => return Err(Error::Protocol("relay closed connection before acknowledging event".to_string())),
        };

        match RelayMessage::parse(&frame)? {
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } if event_id == event.id => {
                if accepted {
                    return Ok(Ack { event_id, message });
                }
                let prefix = nostr::reason_prefix(&message).map(|p| p.to_string());
                tracing::warn!(event = %short_id(&event_id), reason = %message, "relay rejected event");
                return Err(Error::Rejected { prefix, message });
            }
            RelayMessage::Ok { event_id, .. } => {
                tracing::debug!(event = %short_id(&event_id), "OK for unrelated event ignored");
            }
            RelayMessage::Notice(msg) => {
                tracing::warn!(notice = %msg, "relay notice");
            }
            RelayMessage::Auth(_) => {
                tracing::debug!("relay auth challenge ignored");
            }
            other => {
                tracing::debug!(frame = ?other, "unrelated relay frame ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{publish, publish_over, PublishOptions, RelayConnection};
    use crate::error::{Error, Result};
    use crate::nostr::{build_unsigned_event, NostrEvent};
    use std::collections::VecDeque;
    use tokio::time::Duration;

    /// Replays scripted inbound frames; pends forever once the script runs out.
    struct ScriptedConnection {
        inbound: VecDeque<Option<String>>,
        sent: Vec<String>,
        closed: bool,
    }

    impl ScriptedConnection {
        fn new(frames: &[Option<&str>]) -> Self {
            Self {
                inbound: frames.iter().map(|f| f.map(|s| s.to_string())).collect(),
                sent: Vec::new(),
                closed: false,
            }
        }
    }

    impl RelayConnection for ScriptedConnection {
        async fn send_frame(&mut self, frame: String) -> Result<()> {
            self.sent.push(frame);
            Ok(())
        }

        async fn recv_frame(&mut self) -> Result<Option<String>> {
            match self.inbound.pop_front() {
                Some(frame) => Ok(frame),
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    fn event(id: &str) -> NostrEvent {
        let u = build_unsigned_event("pk", 1, vec![], "Hello".to_string(), 1);
        NostrEvent {
            id: id.to_string(),
            pubkey: u.pubkey,
            created_at: u.created_at,
            kind: u.kind,
            tags: u.tags,
            content: u.content,
            sig: "sig".to_string(),
        }
    }

    const WAIT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn accepted_after_noise() {
        let mut conn = ScriptedConnection::new(&[
            Some(r#"["NOTICE","welcome"]"#),
            Some(r#"["OK","other",true,""]"#),
            Some(r#"["EOSE","sub"]"#),
            Some(r#"["OK","abc",true,"duplicate: already have it"]"#),
        ]);
        let ack = publish_over(&mut conn, &event("abc"), WAIT).await.expect("ack");
        assert_eq!(ack.event_id, "abc");
        assert_eq!(ack.message, "duplicate: already have it");
        assert_eq!(conn.sent.len(), 1);
        assert!(conn.sent[0].starts_with(r#"["EVENT",{"#));
    }

    #[tokio::test]
    async fn rejection_keeps_prefix_and_message() {
        let mut conn = ScriptedConnection::new(&[Some(r#"["OK","abc",false,"blocked: you are banned"]"#)]);
        match publish_over(&mut conn, &event("abc"), WAIT).await {
            Err(Error::Rejected { prefix, message }) => {
                assert_eq!(prefix.as_deref(), Some("blocked"));
                assert_eq!(message, "blocked: you are banned");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn close_before_ack_is_protocol_error() {
        let mut conn = ScriptedConnection::new(&[Some(r#"["NOTICE","bye"]"#), None]);
        let err = publish_over(&mut conn, &event("abc"), WAIT).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn garbage_frame_is_protocol_error() {
        let mut conn = ScriptedConnection::new(&[Some("<html>")]);
        let err = publish_over(&mut conn, &event("abc"), WAIT).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn silent_relay_times_out() {
        let mut conn = ScriptedConnection::new(&[]);
        let err = publish_over(&mut conn, &event("abc"), Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {:?}", err);
        assert!(!conn.closed);
    }

    #[tokio::test]
    async fn unrepresentable_ack_timeout_is_error() {
        let mut conn = ScriptedConnection::new(&[]);
        let err = publish_over(&mut conn, &event("abc"), Duration::from_secs(u64::MAX)).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {:?}", err);
        assert!(conn.sent.is_empty());
    }

    #[tokio::test]
    async fn invalid_url_is_connection_error() {
        let err = publish(&event("abc"), "not a url", &PublishOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
    }
}
