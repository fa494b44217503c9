//! WebSocket connector using tokio-tungstenite

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use battlemap_shared::Envelope;

use crate::error::ClientError;
use crate::infrastructure::messaging::connection::{ABNORMAL_CLOSURE_CODE, NO_STATUS_CODE};
use crate::infrastructure::messaging::ChannelHandle;
use crate::ports::outbound::{ChannelEvent, ChannelEventKind, Connector};

/// Check that `url` is a WebSocket endpoint.
pub fn parse_server_url(url: &str) -> Result<Url, ClientError> {
    let parsed = Url::parse(url).map_err(|e| ClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(ClientError::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme must be ws or wss, got '{other}'"),
        }),
    }
}

/// Opens real WebSocket channels. Each channel runs in its own task.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(
        &mut self,
        url: &str,
        generation: u64,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<ChannelHandle, ClientError> {
        let url = parse_server_url(url)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(run_socket(url, generation, events, outbound_rx, shutdown_rx));

        Ok(ChannelHandle::new(outbound_tx, shutdown_tx))
    }
}

async fn run_socket(
    url: Url,
    generation: u64,
    events: mpsc::UnboundedSender<ChannelEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Envelope>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let emit = |kind: ChannelEventKind| {
        // Receiver gone means the session ended; nothing left to tell.
        let _ = events.send(ChannelEvent::new(generation, kind));
    };

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown_rx => {
            tracing::debug!(generation, "Channel closed before handshake finished");
            return;
        }
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Failed to connect to battle server");
            emit(ChannelEventKind::Failed {
                code: ABNORMAL_CLOSURE_CODE,
                detail: e.to_string(),
            });
            return;
        }
    };

    tracing::info!(url = %url, generation, "Connected to battle server");
    emit(ChannelEventKind::Opened);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!(generation, "Closing channel on request");
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                let json = match serde_json::to_string(&frame) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!(event = %frame.event, error = %e, "Failed to serialize frame");
                        continue;
                    }
                };
                tracing::debug!(event = %frame.event, "->");
                if let Err(e) = write.send(Message::Text(json)).await {
                    tracing::error!(error = %e, "Failed to send frame");
                    emit(ChannelEventKind::Failed {
                        code: ABNORMAL_CLOSURE_CODE,
                        detail: e.to_string(),
                    });
                    break;
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Envelope>(&text) {
                    Ok(frame) => {
                        tracing::debug!(event = %frame.event, "<-");
                        emit(ChannelEventKind::Message(frame));
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to parse server frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, detail) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((NO_STATUS_CODE, String::new()));
                    tracing::info!(code, "Server closed connection");
                    emit(ChannelEventKind::Closed { code, detail });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "WebSocket error");
                    emit(ChannelEventKind::Failed {
                        code: ABNORMAL_CLOSURE_CODE,
                        detail: e.to_string(),
                    });
                    break;
                }
                None => {
                    emit(ChannelEventKind::Failed {
                        code: ABNORMAL_CLOSURE_CODE,
                        detail: "stream ended without a close frame".into(),
                    });
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ws_and_wss_urls() {
        assert!(parse_server_url("ws://localhost:8001/ws").is_ok());
        assert!(parse_server_url("wss://battle.example.org/ws").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(matches!(
            parse_server_url("http://localhost:8001"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_server_url("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_server_reports_failure_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::new();
        let _handle = connector
            .open("ws://127.0.0.1:9/ws", 7, tx)
            .expect("valid url");

        let event = rx.recv().await.expect("event");
        assert_eq!(event.generation, 7);
        assert!(matches!(
            event.kind,
            ChannelEventKind::Failed { code: ABNORMAL_CLOSURE_CODE, .. }
        ));
    }
}
