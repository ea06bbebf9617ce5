//! Integration tests for the ledger VFS client
//!
//! Queries run against an in-process HTTP responder and subscriptions against
//! an in-process websocket server, both bound to ephemeral ports.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use ledger_vfs_client::config::Commitment;
use ledger_vfs_client::error::{QueryError, SubscriptionError, TransportError};
use ledger_vfs_client::query::{EntryType, Existence, Listing, OperationResult, QueryClient};
use ledger_vfs_client::submission::TransactionId;
use ledger_vfs_client::subscription::{
    ResultSubscriber, SessionState, SubscriptionEvent, SubscriptionHandle,
};

const WAIT: Duration = Duration::from_secs(5);

// --- HTTP responder ---

/// Serve one JSON-RPC reply per connection, reporting each request body
async fn http_responder<F>(respond: F) -> (String, mpsc::UnboundedReceiver<Value>)
where
    F: Fn(&Value) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                let request = read_request_body(&mut socket).await;
                let (status, body) = respond(&request);
                let _ = seen_tx.send(request);

                let reason = if status == 200 { "OK" } else { "Internal Server Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), seen_rx)
}

async fn read_request_body(socket: &mut TcpStream) -> Value {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return Value::Null;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        while buf.len() < body_start + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        return serde_json::from_slice(&buf[body_start..body_start + content_length]).unwrap();
    }
}

fn rpc_result(request: &Value, result: Value) -> (u16, String) {
    (
        200,
        json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }).to_string(),
    )
}

// --- Websocket server ---

type ServerSocket = WebSocketStream<TcpStream>;

/// Accept websocket connections, running `script` on each
async fn ws_server<F, Fut>(script: F) -> String
where
    F: Fn(ServerSocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let script = Arc::new(script);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let script = script.clone();
            tokio::spawn(async move {
                if let Ok(ws) = accept_async(stream).await {
                    script(ws).await;
                }
            });
        }
    });

    format!("ws://{}", addr)
}

async fn next_request(ws: &mut ServerSocket) -> Option<Value> {
    while let Some(Ok(message)) = ws.next().await {
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).ok();
        }
    }
    None
}

async fn send_json(ws: &mut ServerSocket, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

fn notification(handle: Value, value: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "resultNotification",
        "params": {
            "subscription": handle,
            "result": { "context": { "slot": 12 }, "value": value }
        }
    })
}

/// Keep the channel open until the client goes away
async fn drain(ws: &mut ServerSocket) {
    while let Some(Ok(_)) = ws.next().await {}
}

// --- Queries ---

#[tokio::test]
async fn test_exists_sends_method_and_path() {
    let (url, mut seen) = http_responder(|req| rpc_result(req, json!(true))).await;
    let client = QueryClient::with_endpoint(&url).unwrap();

    let existence = client.exists("/docs/readme.md").await.unwrap();
    assert_eq!(existence, Existence::Known(true));

    let request = seen.recv().await.unwrap();
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["method"], "isExist");
    assert_eq!(request["params"], json!(["/docs/readme.md"]));
}

#[tokio::test]
async fn test_request_ids_increase_per_client() {
    let (url, mut seen) = http_responder(|req| rpc_result(req, json!(false))).await;
    let client = QueryClient::with_endpoint(&url).unwrap();

    client.exists("/a").await.unwrap();
    client.exists("/b").await.unwrap();

    let first = seen.recv().await.unwrap()["id"].as_u64().unwrap();
    let second = seen.recv().await.unwrap()["id"].as_u64().unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn test_list_directory_parses_entries() {
    let (url, _seen) = http_responder(|req| {
        rpc_result(
            req,
            json!([
                { "name": "notes", "type": "directory" },
                { "name": "a.txt", "type": "file" }
            ]),
        )
    })
    .await;
    let client = QueryClient::with_endpoint(&url).unwrap();

    match client.list_directory("/").await.unwrap() {
        Listing::Entries(entries) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name, "notes");
            assert_eq!(entries[0].entry_type, EntryType::Directory);
            assert_eq!(entries[1].entry_type, EntryType::File);
        }
        other => panic!("expected entries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_remote_error_is_reported_with_code() {
    let (url, _seen) = http_responder(|req| {
        (
            200,
            json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": -32602, "message": "Invalid params" }
            })
            .to_string(),
        )
    })
    .await;
    let client = QueryClient::with_endpoint(&url).unwrap();

    match client.metadata("/missing").await {
        Err(QueryError::Remote(e)) => {
            assert_eq!(e.code, -32602);
            assert_eq!(e.message, "Invalid params");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    let (url, _seen) = http_responder(|_| (500, "upstream unavailable".to_string())).await;
    let client = QueryClient::with_endpoint(&url).unwrap();

    match client.info("/docs").await {
        Err(QueryError::Transport(TransportError::Status { status, body })) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_result_lookup_pending_then_completed() {
    let (url, _seen) = http_responder(|req| {
        if req["params"][0] == "pending-tx" {
            rpc_result(req, Value::Null)
        } else {
            rpc_result(
                req,
                json!({ "fsid": 12345678901234567u64, "status": "success", "message": "created" }),
            )
        }
    })
    .await;
    let client = QueryClient::with_endpoint(&url)
        .unwrap()
        .with_settle_delay(Duration::ZERO);

    let pending = client
        .operation_result(&TransactionId::from("pending-tx"))
        .await
        .unwrap();
    assert!(pending.is_pending());

    match client
        .operation_result(&TransactionId::from("done-tx"))
        .await
        .unwrap()
    {
        OperationResult::Completed(outcome) => {
            assert_eq!(outcome.status.as_deref(), Some("success"));
            assert_eq!(outcome.operation_id.as_deref(), Some("12345678901234567"));
            assert_eq!(outcome.data, Some(json!("created")));
        }
        other => panic!("expected completed result, got {:?}", other),
    }
}

// --- Subscriptions ---

#[tokio::test]
async fn test_subscribe_ack_then_notification_is_delivered() {
    let url = ws_server(|mut ws| async move {
        let request = next_request(&mut ws).await.unwrap();
        assert_eq!(request["id"], 1);
        assert_eq!(request["method"], "resultSubscribe");
        assert_eq!(request["params"][0], "tx-1");
        assert_eq!(request["params"][1]["commitment"], "confirmed");

        send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 1, "result": 7 })).await;
        send_json(
            &mut ws,
            notification(json!(7), json!({ "fsid": "3", "status": "success", "message": "ok" })),
        )
        .await;
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Confirmed);
    let mut subscription = subscriber.subscribe(&TransactionId::from("tx-1")).await.unwrap();

    let delivered = timeout(WAIT, subscription.next_result()).await.unwrap().unwrap();
    assert_eq!(delivered.subscription, SubscriptionHandle::new("7"));
    assert_eq!(delivered.outcome.status.as_deref(), Some("success"));
    assert_eq!(delivered.outcome.data, Some(json!("ok")));
    assert_eq!(subscription.handle(), Some(SubscriptionHandle::new("7")));

    subscription.close().await;
    assert!(!subscriber.is_watching(&TransactionId::from("tx-1")));
}

#[tokio::test]
async fn test_foreign_handle_is_ignored() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 1, "result": 7 })).await;
        send_json(&mut ws, notification(json!(8), json!({ "status": "foreign" }))).await;
        send_json(&mut ws, notification(json!(7), json!({ "status": "ours" }))).await;
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let mut subscription = subscriber.subscribe(&TransactionId::from("tx-2")).await.unwrap();

    let delivered = timeout(WAIT, subscription.next_result()).await.unwrap().unwrap();
    assert_eq!(delivered.outcome.status.as_deref(), Some("ours"));
}

#[tokio::test]
async fn test_wide_integers_survive_delivery() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        // Raw text so the 20-digit literal reaches the client unrounded
        let raw = r#"{"jsonrpc":"2.0","method":"resultNotification","params":{"subscription":18446744073709551615,"result":{"value":{"fsid":12345678901234567890,"status":"success"}}}}"#;
        ws.send(Message::Text(raw.to_string())).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let mut subscription = subscriber.subscribe(&TransactionId::from("tx-3")).await.unwrap();

    let delivered = timeout(WAIT, subscription.next_result()).await.unwrap().unwrap();
    assert_eq!(delivered.subscription.as_str(), "18446744073709551615");
    assert_eq!(
        delivered.outcome.operation_id.as_deref(),
        Some("12345678901234567890")
    );
}

#[tokio::test]
async fn test_server_close_ends_session() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 1, "result": 7 })).await;
        let _ = ws.close(None).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let tx = TransactionId::from("tx-4");
    let mut subscription = subscriber.subscribe(&tx).await.unwrap();

    let result = timeout(WAIT, subscription.next_result()).await.unwrap();
    assert!(matches!(result, Err(SubscriptionError::Closed)));
    assert_eq!(subscription.state(), SessionState::Closed);

    subscription.close().await;
    assert!(!subscriber.is_watching(&tx));
}

#[tokio::test]
async fn test_rejected_subscribe_surfaces_remote_error() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        send_json(
            &mut ws,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "Invalid transaction" }
            }),
        )
        .await;
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let mut subscription = subscriber.subscribe(&TransactionId::from("tx-5")).await.unwrap();

    match timeout(WAIT, subscription.next_event()).await.unwrap() {
        Some(SubscriptionEvent::Error(SubscriptionError::Remote(e))) => assert_eq!(e.code, -32602),
        other => panic!("expected remote error, got {:?}", other),
    }
    assert!(matches!(
        timeout(WAIT, subscription.next_event()).await.unwrap(),
        Some(SubscriptionEvent::Closed)
    ));
}

#[tokio::test]
async fn test_second_session_for_same_transaction_is_refused() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let tx = TransactionId::from("tx-6");
    let first = subscriber.subscribe(&tx).await.unwrap();

    match subscriber.subscribe(&tx).await {
        Err(SubscriptionError::AlreadyWatching(id)) => assert_eq!(id, "tx-6"),
        other => panic!("expected refusal, got {:?}", other.map(|s| s.state())),
    }

    first.close().await;
    let again = subscriber.subscribe(&tx).await.unwrap();
    again.close().await;
}

#[tokio::test]
async fn test_unsubscribe_by_handle() {
    let url = ws_server(|mut ws| async move {
        let request = next_request(&mut ws).await.unwrap();
        assert_eq!(request["id"], 2);
        assert_eq!(request["method"], "resultUnsubscribe");
        let removed = request["params"] == json!([7]);
        send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 2, "result": removed })).await;
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let removed = subscriber
        .unsubscribe(&SubscriptionHandle::new("7"))
        .await
        .unwrap();
    assert!(removed);
}

#[tokio::test]
async fn test_session_unsubscribe_uses_cached_handle() {
    let url = ws_server(|mut ws| async move {
        let Some(request) = next_request(&mut ws).await else {
            return;
        };
        match request["method"].as_str() {
            Some("resultSubscribe") => {
                send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 1, "result": 21 })).await;
            }
            Some("resultUnsubscribe") => {
                let removed = request["params"] == json!([21]);
                send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 2, "result": removed }))
                    .await;
            }
            _ => {}
        }
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let tx = TransactionId::from("tx-7");
    let mut subscription = subscriber.subscribe(&tx).await.unwrap();

    let handle = timeout(WAIT, subscription.active_handle()).await.unwrap().unwrap();
    assert_eq!(handle, SubscriptionHandle::new("21"));

    assert!(subscription.unsubscribe().await.unwrap());
    assert!(!subscriber.is_watching(&tx));
}

#[tokio::test]
async fn test_unsubscribe_without_handle_is_refused() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let mut subscription = subscriber.subscribe(&TransactionId::from("tx-8")).await.unwrap();

    assert!(matches!(
        subscription.unsubscribe().await,
        Err(SubscriptionError::NoHandle)
    ));
    assert_eq!(subscription.state(), SessionState::Subscribed);
}

#[tokio::test]
async fn test_connect_failure_releases_claim() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let subscriber = ResultSubscriber::with_url(format!("ws://{}", addr), Commitment::Finalized);
    let tx = TransactionId::from("tx-9");

    assert!(matches!(
        subscriber.subscribe(&tx).await,
        Err(SubscriptionError::Transport(_))
    ));
    assert!(!subscriber.is_watching(&tx));
}

/// Ack handle 7, then push more results than the session queue holds
async fn flood_results(mut ws: ServerSocket) {
    let Some(request) = next_request(&mut ws).await else {
        return;
    };
    match request["method"].as_str() {
        Some("resultSubscribe") => {
            send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 1, "result": 7 })).await;
            for i in 0..40 {
                send_json(&mut ws, notification(json!(7), json!({ "status": format!("s{}", i) })))
                    .await;
            }
        }
        Some("resultUnsubscribe") => {
            send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 2, "result": true })).await;
        }
        _ => {}
    }
    drain(&mut ws).await;
}

#[tokio::test]
async fn test_close_with_unread_results_completes() {
    let url = ws_server(flood_results).await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let tx = TransactionId::from("tx-10");
    let subscription = subscriber.subscribe(&tx).await.unwrap();

    // Let the queue fill while nothing reads it
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(timeout(WAIT, subscription.close()).await.is_ok());
    assert!(!subscriber.is_watching(&tx));
}

#[tokio::test]
async fn test_unsubscribe_with_unread_results_completes() {
    let url = ws_server(flood_results).await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let tx = TransactionId::from("tx-11");
    let mut subscription = subscriber.subscribe(&tx).await.unwrap();

    timeout(WAIT, subscription.active_handle()).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let removed = timeout(WAIT, subscription.unsubscribe()).await.unwrap();
    assert!(removed.unwrap());
    assert!(!subscriber.is_watching(&tx));

    // Results queued before the close are still readable
    assert!(matches!(
        subscription.next_event().await,
        Some(SubscriptionEvent::Result(_))
    ));
}

#[tokio::test]
async fn test_dropped_connection_reports_error_then_closed() {
    let url = ws_server(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        send_json(&mut ws, json!({ "jsonrpc": "2.0", "id": 1, "result": 7 })).await;
        // Hang up without a close frame
        drop(ws);
    })
    .await;

    let subscriber = ResultSubscriber::with_url(url, Commitment::Finalized);
    let tx = TransactionId::from("tx-12");
    let mut subscription = subscriber.subscribe(&tx).await.unwrap();

    match timeout(WAIT, subscription.next_event()).await.unwrap() {
        Some(SubscriptionEvent::Error(SubscriptionError::Transport(_))) => {}
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(matches!(
        timeout(WAIT, subscription.next_event()).await.unwrap(),
        Some(SubscriptionEvent::Closed)
    ));
    assert_eq!(subscription.state(), SessionState::Closed);

    subscription.close().await;
    assert!(!subscriber.is_watching(&tx));
}
