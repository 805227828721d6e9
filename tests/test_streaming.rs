//! Integration tests for the narration transport
//!
//! Tests cover:
//! - Control message wire format
//! - Error conversions
//! - Loopback WebSocket host: auth, subscribe, keepalive, frames
//! - Reconnection and re-subscription
//! - End-to-end narration through a session

#[cfg(feature = "streaming")]
mod streaming_tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use parking_lot::Mutex;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;

    use vt_narrator::accumulator::{AccumulatorConfig, ChannelSink};
    use vt_narrator::buffer::{encode, encode_frame, BufferSnapshot};
    use vt_narrator::cell::BufferCell;
    use vt_narrator::streaming::{
        ClientMessage, ConnectionState, ReconnectPolicy, ServerMessage, StaticToken,
        TransportClient, TransportConfig, TransportError,
    };
    use vt_narrator::NarrationSession;

    const WAIT: Duration = Duration::from_secs(5);

    // =========================================================================
    // Loopback host
    // =========================================================================

    struct Host {
        addr: SocketAddr,
        conns: mpsc::UnboundedReceiver<Conn>,
    }

    struct Conn {
        uri: String,
        authorization: Option<String>,
        ws: WebSocketStream<TcpStream>,
    }

    async fn host() -> Host {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, conns) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen: Arc<Mutex<(String, Option<String>)>> = Arc::default();
                let record = Arc::clone(&seen);
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    let auth = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    *record.lock() = (req.uri().to_string(), auth);
                    Ok(resp)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                let (uri, authorization) = seen.lock().clone();
                if tx.send(Conn { uri, authorization, ws }).is_err() {
                    break;
                }
            }
        });

        Host { addr, conns }
    }

    impl Host {
        fn config(&self) -> TransportConfig {
            TransportConfig {
                reconnect: ReconnectPolicy {
                    base_delay: Duration::from_millis(50),
                    max_delay: Duration::from_millis(200),
                },
                ..TransportConfig::new(format!("ws://{}/ws", self.addr))
            }
        }

        async fn accept(&mut self) -> Conn {
            tokio::time::timeout(WAIT, self.conns.recv())
                .await
                .expect("no connection")
                .expect("host stopped")
        }
    }

    impl Conn {
        /// Next data or ping frame, skipping pongs
        async fn next_message(&mut self) -> Message {
            loop {
                let msg = tokio::time::timeout(WAIT, self.ws.next())
                    .await
                    .expect("no message")
                    .expect("stream ended")
                    .expect("websocket error");
                if !matches!(msg, Message::Pong(_)) {
                    return msg;
                }
            }
        }

        /// Next text frame, skipping control frames
        async fn next_text(&mut self) -> String {
            loop {
                match self.next_message().await {
                    Message::Text(text) => return text.as_str().to_string(),
                    Message::Ping(_) | Message::Frame(_) => continue,
                    other => panic!("expected text, got {:?}", other),
                }
            }
        }

        async fn send_text(&mut self, text: &str) {
            self.ws.send(Message::text(text)).await.unwrap();
        }

        async fn send_snapshot(&mut self, session: &str, snapshot: &BufferSnapshot) {
            let frame = encode_frame(session, &encode(snapshot));
            self.ws.send(Message::binary(frame)).await.unwrap();
        }
    }

    /// Accepts TCP connections but never answers the WebSocket upgrade.
    /// Accepted sockets are handed to the test so they stay open.
    async fn silent_listener() -> (SocketAddr, mpsc::UnboundedReceiver<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if tx.send(stream).is_err() {
                    break;
                }
            }
        });
        (addr, rx)
    }

    fn subscribe_json(session: &str) -> String {
        ClientMessage::subscribe(session).to_json().unwrap()
    }

    fn screen(lines: &[&str]) -> BufferSnapshot {
        let mut snap = BufferSnapshot::blank(20, 5);
        for (row, line) in lines.iter().enumerate() {
            snap.cells[row] = line.chars().map(|c| BufferCell::new(c.to_string())).collect();
        }
        snap
    }

    /// Only size and explicit flushes cut chunks, whatever the machine's speed
    fn narration_config() -> AccumulatorConfig {
        AccumulatorConfig {
            time_threshold: Duration::from_secs(600),
            ..Default::default()
        }
    }

    async fn wait_for_state(client: &TransportClient, state: ConnectionState) {
        let mut rx = client.watch_state();
        tokio::time::timeout(WAIT, rx.wait_for(|s| *s == state))
            .await
            .expect("state not reached")
            .expect("client dropped");
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    mod wire_format {
        use super::*;

        #[test]
        fn test_client_messages() {
            assert_eq!(subscribe_json("s1"), r#"{"type":"subscribe","sessionId":"s1"}"#);
            let unsub = ClientMessage::unsubscribe("s1").to_json().unwrap();
            assert_eq!(unsub, r#"{"type":"unsubscribe","sessionId":"s1"}"#);
            assert_eq!(ClientMessage::pong().to_json().unwrap(), r#"{"type":"pong"}"#);
        }

        #[test]
        fn test_server_messages() {
            let err = ServerMessage::parse(r#"{"type":"error","message":"denied","code":"403"}"#)
                .unwrap();
            match err {
                ServerMessage::Error { message, code } => {
                    assert_eq!(message, "denied");
                    assert_eq!(code.as_deref(), Some("403"));
                }
                _ => panic!("Expected Error variant"),
            }
            assert_eq!(
                ServerMessage::parse(r#"{"type":"cursor","col":1}"#).unwrap(),
                ServerMessage::Unknown
            );
        }

        #[test]
        fn test_error_from_serde_error() {
            let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
            let err: TransportError = json_err.into();
            assert!(matches!(err, TransportError::Serialization(_)));
        }

        #[test]
        fn test_error_from_io_error() {
            let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
            match TransportError::from(io_err) {
                TransportError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionRefused),
                _ => panic!("Expected Io variant"),
            }
        }
    }

    // =========================================================================
    // Connection behavior
    // =========================================================================

    mod connection {
        use super::*;

        #[tokio::test]
        async fn test_token_sent_as_query_and_header() {
            let mut host = host().await;
            let client =
                TransportClient::with_token_provider(host.config(), StaticToken::new("s3cret"));
            client.subscribe("main", |_| {});
            client.connect().unwrap();

            let mut conn = host.accept().await;
            assert!(conn.uri.contains("token=s3cret"), "uri was {}", conn.uri);
            assert_eq!(conn.authorization.as_deref(), Some("Bearer s3cret"));
            assert_eq!(conn.next_text().await, subscribe_json("main"));
            wait_for_state(&client, ConnectionState::Connected).await;
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_no_token_means_no_auth() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();

            let conn = host.accept().await;
            assert!(!conn.uri.contains("token="));
            assert_eq!(conn.authorization, None);
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_subscribe_and_unsubscribe_while_connected() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();
            let mut conn = host.accept().await;
            wait_for_state(&client, ConnectionState::Connected).await;

            client.subscribe("late", |_| {});
            assert_eq!(conn.next_text().await, subscribe_json("late"));
            assert!(client.unsubscribe("late"));
            assert_eq!(
                conn.next_text().await,
                ClientMessage::unsubscribe("late").to_json().unwrap()
            );
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_connect_is_not_duplicated() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();
            client.connect().unwrap();
            let _conn = host.accept().await;
            wait_for_state(&client, ConnectionState::Connected).await;
            client.connect().unwrap();

            let second = tokio::time::timeout(Duration::from_millis(300), host.conns.recv()).await;
            assert!(second.is_err(), "a second connection was opened");
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_app_ping_answered_with_pong() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();
            let mut conn = host.accept().await;

            conn.send_text(r#"{"type":"ping"}"#).await;
            assert_eq!(conn.next_text().await, r#"{"type":"pong"}"#);
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_keepalive_ping() {
            let mut host = host().await;
            let config = TransportConfig {
                ping_interval: Duration::from_millis(100),
                ..host.config()
            };
            let client = TransportClient::new(config);
            client.connect().unwrap();
            let mut conn = host.accept().await;

            assert!(matches!(conn.next_message().await, Message::Ping(_)));
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_bad_input_does_not_drop_connection() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.subscribe("main", |_| {});
            client.connect().unwrap();
            let mut conn = host.accept().await;
            assert_eq!(conn.next_text().await, subscribe_json("main"));

            conn.send_text(r#"{"type":"theme","name":"dark"}"#).await;
            conn.send_text("garbage").await;
            conn.ws.send(Message::binary(vec![0x00, 0x01])).await.unwrap();
            conn.ws
                .send(Message::binary(encode_frame("main", b"not a snapshot")))
                .await
                .unwrap();
            conn.send_text(r#"{"type":"error","message":"oops"}"#).await;

            conn.send_text(r#"{"type":"ping"}"#).await;
            assert_eq!(conn.next_text().await, r#"{"type":"pong"}"#);
            assert!(client.is_connected());
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_reconnect_resubscribes() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.subscribe("b", |_| {});
            client.subscribe("a", |_| {});
            client.connect().unwrap();

            let mut first = host.accept().await;
            let mut subs = vec![first.next_text().await, first.next_text().await];
            subs.sort();
            assert_eq!(subs, vec![subscribe_json("a"), subscribe_json("b")]);

            first.ws.close(None).await.unwrap();
            drop(first);

            let mut second = host.accept().await;
            let mut subs = vec![second.next_text().await, second.next_text().await];
            subs.sort();
            assert_eq!(subs, vec![subscribe_json("a"), subscribe_json("b")]);
            wait_for_state(&client, ConnectionState::Connected).await;
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_retries_while_host_unreachable() {
            // Reserve a port, then free it so connections are refused
            let addr = {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                listener.local_addr().unwrap()
            };
            let client = TransportClient::new(TransportConfig {
                reconnect: ReconnectPolicy {
                    base_delay: Duration::from_millis(20),
                    max_delay: Duration::from_millis(40),
                },
                ..TransportConfig::new(format!("ws://{}/ws", addr))
            });
            let mut states = client.watch_state();
            client.connect().unwrap();

            // Each failed attempt ends in a backoff sleep while disconnected
            let mut failures = 0;
            while failures < 3 {
                tokio::time::timeout(WAIT, states.changed())
                    .await
                    .unwrap()
                    .unwrap();
                if *states.borrow_and_update() == ConnectionState::Disconnected {
                    failures += 1;
                }
            }
            assert!(!client.is_connected());
            client.disconnect().await;
            assert_eq!(client.state(), ConnectionState::Disconnected);
        }

        #[tokio::test]
        async fn test_disconnect_stops_reconnecting() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();
            let mut conn = host.accept().await;
            wait_for_state(&client, ConnectionState::Connected).await;

            client.disconnect().await;
            assert_eq!(client.state(), ConnectionState::Disconnected);
            assert!(matches!(conn.next_message().await, Message::Close(_)));

            let again = tokio::time::timeout(Duration::from_millis(400), host.conns.recv()).await;
            assert!(again.is_err(), "client reconnected after disconnect");
        }

        #[tokio::test]
        async fn test_stalled_handshake_times_out_and_retries() {
            let (addr, mut sockets) = silent_listener().await;
            let client = TransportClient::new(TransportConfig {
                connect_timeout: Duration::from_millis(100),
                reconnect: ReconnectPolicy {
                    base_delay: Duration::from_millis(20),
                    max_delay: Duration::from_millis(40),
                },
                ..TransportConfig::new(format!("ws://{}/ws", addr))
            });
            let mut states = client.watch_state();
            client.connect().unwrap();

            let mut held = Vec::new();
            for _ in 0..3 {
                let socket = tokio::time::timeout(WAIT, sockets.recv())
                    .await
                    .expect("client stopped retrying")
                    .unwrap();
                held.push(socket);
            }
            tokio::time::timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Disconnected))
                .await
                .unwrap()
                .unwrap();

            tokio::time::timeout(WAIT, client.disconnect())
                .await
                .expect("disconnect hung");
            assert_eq!(client.state(), ConnectionState::Disconnected);
        }

        #[tokio::test]
        async fn test_disconnect_cancels_pending_handshake() {
            let (addr, mut sockets) = silent_listener().await;
            let client = TransportClient::new(TransportConfig {
                connect_timeout: Duration::from_secs(600),
                ..TransportConfig::new(format!("ws://{}/ws", addr))
            });
            client.connect().unwrap();
            let _socket = tokio::time::timeout(WAIT, sockets.recv()).await.unwrap();
            wait_for_state(&client, ConnectionState::Connecting).await;

            tokio::time::timeout(WAIT, client.disconnect())
                .await
                .expect("disconnect hung during handshake");
            assert_eq!(client.state(), ConnectionState::Disconnected);

            let again = tokio::time::timeout(Duration::from_millis(300), sockets.recv()).await;
            assert!(again.is_err(), "client retried after disconnect");
        }

        #[tokio::test]
        async fn test_silent_connection_dropped_after_keepalive() {
            let mut host = host().await;
            let client = TransportClient::new(TransportConfig {
                ping_interval: Duration::from_millis(100),
                ..host.config()
            });
            client.subscribe("main", |_| {});
            client.connect().unwrap();

            // Never read, so the host never answers the client's pings
            let first = host.accept().await;
            let mut second = host.accept().await;
            assert_eq!(second.next_text().await, subscribe_json("main"));
            drop(first);
            client.disconnect().await;
        }
    }

    // =========================================================================
    // Frames and narration
    // =========================================================================

    mod narration {
        use super::*;

        #[tokio::test]
        async fn test_snapshot_reaches_handler() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            let (tx, mut rx) = mpsc::unbounded_channel();
            client.subscribe("main", move |snapshot| {
                let _ = tx.send(snapshot);
            });
            client.connect().unwrap();
            let mut conn = host.accept().await;
            conn.next_text().await;

            let sent = screen(&["hello", "world"]);
            conn.send_snapshot("other", &screen(&["nope"])).await;
            conn.send_snapshot("main", &sent).await;

            let got = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            assert_eq!(got, sent);
            assert_eq!(got.to_text(), "hello\nworld");
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_session_narrates_scrolling_snapshots() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();

            let (tx, mut chunks) = mpsc::unbounded_channel();
            let session =
                NarrationSession::attach(&client, "main", narration_config(), ChannelSink(tx));
            let mut conn = host.accept().await;
            assert_eq!(conn.next_text().await, subscribe_json("main"));

            conn.send_snapshot("main", &screen(&["a", "b", "c", "d"])).await;
            conn.send_snapshot("main", &screen(&["b", "c", "d", "e"])).await;
            // A ping round-trip orders the snapshots before the flush
            conn.send_text(r#"{"type":"ping"}"#).await;
            conn.next_text().await;

            assert!(session.force_flush().await);
            let chunk = tokio::time::timeout(WAIT, chunks.recv()).await.unwrap().unwrap();
            assert_eq!(chunk.text, "a\nb\nc\nd\ne\n");
            assert_eq!(chunk.changed_char_count, 10);

            session.detach(&client).await;
            assert_eq!(
                conn.next_text().await,
                ClientMessage::unsubscribe("main").to_json().unwrap()
            );
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_session_narrates_raw_output() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();

            let (tx, mut chunks) = mpsc::unbounded_channel();
            let session =
                NarrationSession::attach(&client, "pty", narration_config(), ChannelSink(tx));
            let mut conn = host.accept().await;
            conn.next_text().await;

            let output = ServerMessage::output("pty", "\x1b[1;32m$\x1b[0m echo hi\r\nhi\r\n");
            conn.send_text(&serde_json::to_string(&output).unwrap()).await;
            conn.send_text(r#"{"type":"ping"}"#).await;
            conn.next_text().await;

            session.detach(&client).await;
            let chunk = tokio::time::timeout(WAIT, chunks.recv()).await.unwrap().unwrap();
            assert_eq!(chunk.text, "$ echo hi\nhi\n");
            client.disconnect().await;
        }

        #[tokio::test]
        async fn test_narration_survives_reconnect() {
            let mut host = host().await;
            let client = TransportClient::new(host.config());
            client.connect().unwrap();

            let (tx, mut chunks) = mpsc::unbounded_channel();
            let session =
                NarrationSession::attach(&client, "main", narration_config(), ChannelSink(tx));
            let mut first = host.accept().await;
            first.next_text().await;
            first.send_snapshot("main", &screen(&["one", "two"])).await;
            first.send_text(r#"{"type":"ping"}"#).await;
            first.next_text().await;
            first.ws.close(None).await.unwrap();
            drop(first);

            // The host resends full state after the client resubscribes
            let mut second = host.accept().await;
            assert_eq!(second.next_text().await, subscribe_json("main"));
            second.send_snapshot("main", &screen(&["one", "two", "three"])).await;
            second.send_text(r#"{"type":"ping"}"#).await;
            second.next_text().await;

            session.detach(&client).await;
            let chunk = tokio::time::timeout(WAIT, chunks.recv()).await.unwrap().unwrap();
            assert_eq!(chunk.text, "one\ntwo\nthree\n");
            client.disconnect().await;
        }
    }
}
