use super::*;
use crate::session::{SessionController, SessionUpdate};
use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use shared::protocol::ChatMessage;
use tokio::{net::TcpListener, time::timeout};

const STUB_PEER: &str = "peer-9";

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
    let text = serde_json::to_string(event).expect("json");
    socket.send(WsMessage::Text(text)).await.is_ok()
}

/// Pairs immediately, echoes messages back as the peer, and answers unpair
/// with other-user-left.
async fn matchmaker_session(mut socket: WebSocket) {
    let hello = ServerEvent::Connected {
        connection_id: ParticipantId::from("me-1"),
    };
    if !send_event(&mut socket, &hello).await {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let WsMessage::Text(text) = msg else {
            continue;
        };
        let reply = match serde_json::from_str::<ClientRequest>(&text) {
            Ok(ClientRequest::StartPairing) => {
                ServerEvent::StartChat(ParticipantId::from(STUB_PEER))
            }
            Ok(ClientRequest::SendMessage(message)) => ServerEvent::ReceiveMessage(ChatMessage::new(
                ParticipantId::from(STUB_PEER),
                format!("echo: {}", message.text),
                message.timestamp,
            )),
            Ok(ClientRequest::Unpair) => ServerEvent::OtherUserLeft,
            Err(_) => continue,
        };
        if !send_event(&mut socket, &reply).await {
            return;
        }
    }
}

/// Speaks hand-written JSON frames, so the client is checked against the
/// literal event shapes rather than its own encoder.
async fn literal_frames_session(mut socket: WebSocket) {
    let hello = r#"{"type":"connected","payload":{"connection_id":"me-2"}}"#;
    if socket.send(WsMessage::Text(hello.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let WsMessage::Text(text) = msg else {
            continue;
        };
        let frame: serde_json::Value = serde_json::from_str(&text).expect("client frame");
        let replies: Vec<&str> = match frame["type"].as_str() {
            Some("start-pairing") if frame.get("payload").is_none() => vec![
                r#"{"type":"start-chat","payload":"peer-7"}"#,
                r#"{"type":"receive-message","payload":{"sender":"peer-7","text":"hey","timestamp":"2024-05-01T12:00:00Z"}}"#,
            ],
            Some("send-message")
                if frame["payload"]["sender"] == "me-2"
                    && frame["payload"]["text"] == "hi back"
                    && frame["payload"]["timestamp"].is_string() =>
            {
                vec![r#"{"type":"other-user-left"}"#]
            }
            _ => vec![r#"{"type":"error","payload":{"code":"not_paired","message":"bad frame"}}"#],
        };
        for reply in replies {
            if socket.send(WsMessage::Text(reply.to_string())).await.is_err() {
                return;
            }
        }
    }
}

async fn garbled_session(mut socket: WebSocket) {
    let _ = socket.send(WsMessage::Text("{not json".to_string())).await;
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn literal_frames(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(literal_frames_session)
}

async fn garbled(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(garbled_session)
}

async fn silent_session(mut socket: WebSocket) {
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn matchmaker(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(matchmaker_session)
}

async fn silent(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(silent_session)
}

async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[test]
fn websocket_url_maps_schemes_and_appends_path() {
    assert_eq!(
        websocket_url("http://localhost:5000").expect("url").as_str(),
        "ws://localhost:5000/ws"
    );
    assert_eq!(
        websocket_url("https://chat.example.com/api/").expect("url").as_str(),
        "wss://chat.example.com/api/ws"
    );
    assert_eq!(
        websocket_url("ws://127.0.0.1:9000").expect("url").as_str(),
        "ws://127.0.0.1:9000/ws"
    );
}

#[test]
fn websocket_url_rejects_other_schemes() {
    assert!(matches!(
        websocket_url("ftp://example.com"),
        Err(ClientError::InvalidServerUrl(_))
    ));
    assert!(matches!(
        websocket_url("not a url"),
        Err(ClientError::InvalidServerUrl(_))
    ));
}

#[tokio::test]
async fn pairs_and_exchanges_messages_over_websocket() {
    let server_url = spawn_stub(Router::new().route("/ws", get(matchmaker))).await;
    let channel = WsChannel::connect(&server_url, Duration::from_secs(5))
        .await
        .expect("connect");
    assert_eq!(channel.local_id().as_str(), "me-1");

    let mut controller = SessionController::new(channel.clone());
    assert_eq!(controller.start_pairing(), SessionUpdate::PairingStarted);
    let update = timeout(Duration::from_secs(5), controller.next_update())
        .await
        .expect("paired");
    assert_eq!(
        update,
        SessionUpdate::Paired {
            peer: ParticipantId::from(STUB_PEER)
        }
    );

    assert_eq!(
        controller.send_message("hello"),
        SessionUpdate::MessageAppended
    );
    let update = timeout(Duration::from_secs(5), controller.next_update())
        .await
        .expect("echo");
    assert_eq!(update, SessionUpdate::MessageAppended);

    let texts: Vec<_> = controller
        .log()
        .messages()
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(texts, vec!["hello", "echo: hello"]);
    assert_eq!(controller.log().messages()[0].sender.as_str(), "me-1");
}

#[tokio::test]
async fn handshake_times_out_without_connected_event() {
    let server_url = spawn_stub(Router::new().route("/ws", get(silent))).await;
    let result = WsChannel::connect(&server_url, Duration::from_millis(100)).await;
    assert!(matches!(result, Err(ClientError::HandshakeTimeout(_))));
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let result = WsChannel::connect(&format!("http://{addr}"), Duration::from_secs(1)).await;
    assert!(matches!(result, Err(ClientError::Connect { .. })));
}

#[tokio::test]
async fn follows_flat_event_payloads_on_the_wire() {
    let server_url = spawn_stub(Router::new().route("/ws", get(literal_frames))).await;
    let channel = WsChannel::connect(&server_url, Duration::from_secs(5))
        .await
        .expect("connect");
    assert_eq!(channel.local_id().as_str(), "me-2");

    let mut controller = SessionController::new(channel.clone());
    controller.start_pairing();

    let mut updates = Vec::new();
    while updates.len() < 2 {
        let update = timeout(Duration::from_secs(5), controller.next_update())
            .await
            .expect("update");
        if update.is_change() {
            updates.push(update);
        }
    }
    assert_eq!(
        updates,
        vec![
            SessionUpdate::Paired {
                peer: ParticipantId::from("peer-7")
            },
            SessionUpdate::MessageAppended,
        ]
    );

    controller.send_message("hi back");
    let update = timeout(Duration::from_secs(5), controller.next_update())
        .await
        .expect("reply");
    assert_eq!(update, SessionUpdate::PeerLeft);
}

#[tokio::test]
async fn undecodable_handshake_frame_is_a_serialization_error() {
    let server_url = spawn_stub(Router::new().route("/ws", get(garbled))).await;
    let result = WsChannel::connect(&server_url, Duration::from_secs(5)).await;
    assert!(matches!(result, Err(ClientError::Serialization(_))));
}

#[test]
fn encodes_and_decodes_frames() {
    assert_eq!(
        encode_request(&ClientRequest::Unpair).expect("encode"),
        r#"{"type":"unpair"}"#
    );
    assert_eq!(
        decode_event(r#"{"type":"other-user-left"}"#).expect("decode"),
        ServerEvent::OtherUserLeft
    );
    assert!(matches!(
        decode_event(r#"{"type":"start-chat","payload":{"peer_id":"x"}}"#),
        Err(ClientError::Serialization(_))
    ));
}
