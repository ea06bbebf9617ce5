//! Result subscription sessions
//!
//! Each session owns one push channel. A background task reads frames, feeds
//! them through the state machine and forwards deliverable results to the
//! caller's event stream.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::{ClientConfig, Commitment};
use crate::error::{SubscriptionError, TransportError};
use crate::query::rpc::{RpcRequest, methods};
use crate::submission::TransactionId;
use crate::subscription::message::{
    InboundMessage, ResultNotification, SubscriptionHandle, decode,
};
use crate::subscription::registry::{RegistrationGuard, SessionRegistry};
use crate::subscription::state::{SessionMachine, SessionState};

/// Request id of the subscribe request on a session channel
pub const SUBSCRIBE_REQUEST_ID: u64 = 1;
/// Request id of the unsubscribe request on its own channel
pub const UNSUBSCRIBE_REQUEST_ID: u64 = 2;

const EVENT_BUFFER: usize = 32;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What a session reports to its owner
#[derive(Debug)]
pub enum SubscriptionEvent {
    Result(ResultNotification),
    Error(SubscriptionError),
    /// The channel is gone; nothing follows
    Closed,
}

/// Opens result subscriptions against one push endpoint
#[derive(Debug, Clone)]
pub struct ResultSubscriber {
    ws_url: String,
    commitment: Commitment,
    registry: SessionRegistry,
}

impl ResultSubscriber {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::with_url(config.ws_endpoint()?, config.commitment))
    }

    pub fn with_url(ws_url: impl Into<String>, commitment: Commitment) -> Self {
        Self {
            ws_url: ws_url.into(),
            commitment,
            registry: SessionRegistry::new(),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Whether a session for `tx` is currently open through this subscriber
    pub fn is_watching(&self, tx: &TransactionId) -> bool {
        self.registry.is_watching(tx)
    }

    /// Open a channel and ask to be notified of `tx`'s result.
    ///
    /// Returns once the subscribe request is sent; the handle arrives later
    /// with the acknowledgment or the first notification.
    pub async fn subscribe(&self, tx: &TransactionId) -> Result<ResultSubscription, SubscriptionError> {
        let guard = self
            .registry
            .try_register(tx)
            .ok_or_else(|| SubscriptionError::AlreadyWatching(tx.to_string()))?;

        debug!("Connecting to {} for {}", self.ws_url, tx);
        let (ws, _) = connect_async(self.ws_url.as_str()).await?;
        let (mut sink, stream) = ws.split();

        let mut machine = SessionMachine::new(SUBSCRIBE_REQUEST_ID);
        let request = RpcRequest::new(
            SUBSCRIBE_REQUEST_ID,
            methods::RESULT_SUBSCRIBE,
            vec![
                json!(tx.as_str()),
                json!({ "commitment": self.commitment.to_string() }),
            ],
        );
        sink.send(Message::Text(request.to_text())).await?;
        machine.on_subscribe_sent();
        info!("Subscribed to result of {}", tx);

        let (state_tx, state_rx) = watch::channel(machine.state().clone());
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (close_tx, close_rx) = oneshot::channel();

        let task = tokio::spawn(run_session(SessionTask {
            machine,
            sink,
            stream,
            state: state_tx,
            events: event_tx,
            close: close_rx,
            closing: false,
            _guard: guard,
        }));

        Ok(ResultSubscription {
            tx: tx.clone(),
            ws_url: self.ws_url.clone(),
            state: state_rx,
            events: event_rx,
            close: Some(close_tx),
            task: Some(task),
        })
    }

    /// Cancel a server-side subscription by handle
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<bool, SubscriptionError> {
        unsubscribe_at(&self.ws_url, handle).await
    }
}

/// Caller's side of an open session. Dropping it closes the channel.
#[derive(Debug)]
pub struct ResultSubscription {
    tx: TransactionId,
    ws_url: String,
    state: watch::Receiver<SessionState>,
    events: mpsc::Receiver<SubscriptionEvent>,
    close: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ResultSubscription {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.tx
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Handle cached from the server, if one has arrived
    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.state.borrow().handle().cloned()
    }

    /// Next event, or `None` once the stream is drained after `Closed`
    pub async fn next_event(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Next delivered result. Fails with `Closed` once the channel is gone.
    pub async fn next_result(&mut self) -> Result<ResultNotification, SubscriptionError> {
        match self.events.recv().await {
            Some(SubscriptionEvent::Result(notification)) => Ok(notification),
            Some(SubscriptionEvent::Error(e)) => Err(e),
            Some(SubscriptionEvent::Closed) | None => Err(SubscriptionError::Closed),
        }
    }

    /// Wait until the session holds a handle
    pub async fn active_handle(&mut self) -> Result<SubscriptionHandle, SubscriptionError> {
        let state = self
            .state
            .wait_for(|state| matches!(state, SessionState::Active(_) | SessionState::Closed))
            .await
            .map_err(|_| SubscriptionError::Closed)?;

        state.handle().cloned().ok_or(SubscriptionError::Closed)
    }

    /// Cancel the subscription server-side, then close this session
    pub async fn unsubscribe(&mut self) -> Result<bool, SubscriptionError> {
        let handle = self.handle().ok_or(SubscriptionError::NoHandle)?;
        let result = unsubscribe_at(&self.ws_url, &handle).await;
        self.shutdown().await;
        result
    }

    /// Close the channel and wait for the session to wind down
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Result session for {} ended abnormally: {}", self.tx, e);
            }
        }
    }
}

struct SessionTask {
    machine: SessionMachine,
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    state: watch::Sender<SessionState>,
    events: mpsc::Sender<SubscriptionEvent>,
    close: oneshot::Receiver<()>,
    closing: bool,
    _guard: RegistrationGuard,
}

/// What became of an event handed to the owner
#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// The owner asked to close while the queue was full
    Closing,
    /// The owner is gone
    Dropped,
}

impl SessionTask {
    fn publish_state(&self) {
        let current = self.machine.state();
        self.state.send_if_modified(|published| {
            if published == current {
                return false;
            }
            *published = current.clone();
            true
        });
    }

    /// Queue an event for the owner.
    ///
    /// Waits for queue space, but gives up as soon as the owner closes the
    /// session; once closing, only free slots are used.
    async fn deliver(&mut self, event: SubscriptionEvent) -> Delivery {
        if self.closing {
            return match self.events.try_send(event) {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Dropped,
            };
        }

        tokio::select! {
            _ = &mut self.close => {
                self.closing = true;
                Delivery::Closing
            }
            sent = self.events.send(event) => match sent {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Dropped,
            },
        }
    }

    async fn send_close_frame(&mut self) {
        debug!("Closing result session");
        if let Err(e) = self.sink.send(Message::Close(None)).await {
            debug!("Close frame not sent: {}", e);
        }
    }
}

async fn run_session(mut task: SessionTask) {
    loop {
        tokio::select! {
            // Fires on an explicit close and when the owner is dropped
            _ = &mut task.close => {
                task.closing = true;
                task.send_close_frame().await;
                break;
            }
            frame = task.stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let message = match decode(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            debug!("Ignoring undecodable frame: {}", e);
                            continue;
                        }
                    };

                    let outcome = task.machine.on_message(message);
                    task.publish_state();

                    match outcome {
                        Ok(Some(notification)) => {
                            match task.deliver(SubscriptionEvent::Result(notification)).await {
                                Delivery::Sent => {}
                                Delivery::Closing => {
                                    task.send_close_frame().await;
                                    break;
                                }
                                Delivery::Dropped => break,
                            }
                        }
                        Ok(None) => {}
                        Err(remote) => {
                            warn!("Subscribe request rejected: {}", remote);
                            let error = SubscriptionError::Remote(remote);
                            if task.deliver(SubscriptionEvent::Error(error)).await == Delivery::Closing {
                                task.send_close_frame().await;
                            }
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("Server closed result session: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Result session transport error: {}", e);
                    task.deliver(SubscriptionEvent::Error(e.into())).await;
                    break;
                }
                None => break,
            }
        }
    }

    task.machine.on_close();
    task.publish_state();
    task.deliver(SubscriptionEvent::Closed).await;
}

async fn unsubscribe_at(ws_url: &str, handle: &SubscriptionHandle) -> Result<bool, SubscriptionError> {
    let (ws, _) = connect_async(ws_url).await?;
    let (mut sink, mut stream) = ws.split();

    let request = RpcRequest::new(
        UNSUBSCRIBE_REQUEST_ID,
        methods::RESULT_UNSUBSCRIBE,
        vec![handle.to_param()],
    );
    sink.send(Message::Text(request.to_text())).await?;
    info!("Sent result unsubscribe for handle {}", handle);

    let outcome = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match decode(&text) {
                Ok(InboundMessage::Ack { id, result }) if id == UNSUBSCRIBE_REQUEST_ID => {
                    break match result {
                        Ok(Value::Bool(removed)) => Ok(removed),
                        Ok(other) => Err(SubscriptionError::Transport(
                            TransportError::MalformedResponse(format!(
                                "unsubscribe result is not a boolean: {}",
                                other
                            )),
                        )),
                        Err(remote) => Err(SubscriptionError::Remote(remote)),
                    };
                }
                _ => continue,
            },
            Some(Ok(Message::Close(_))) | None => break Err(SubscriptionError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Err(e.into()),
        }
    };

    if let Err(e) = sink.close().await {
        debug!("Unsubscribe channel close failed: {}", e);
    }
    outcome
}
