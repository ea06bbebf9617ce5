//! Session state machine
//!
//! `Connecting -> Subscribed -> Active(handle) -> Closed`, with `Closed`
//! reachable from every state. The machine is pure: the session task feeds it
//! decoded messages and acts on what it returns.

use log::{debug, info};

use crate::error::RemoteError;
use crate::subscription::message::{InboundMessage, ResultNotification, SubscriptionHandle};

/// Lifecycle of one result subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    /// Subscribe request sent, no handle received yet
    Subscribed,
    Active(SubscriptionHandle),
    Closed,
}

impl SessionState {
    pub fn handle(&self) -> Option<&SubscriptionHandle> {
        match self {
            SessionState::Active(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// Applies inbound messages to a session's state
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    subscribe_request_id: u64,
}

impl SessionMachine {
    pub fn new(subscribe_request_id: u64) -> Self {
        Self {
            state: SessionState::Connecting,
            subscribe_request_id,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The channel opened and the subscribe request went out
    pub fn on_subscribe_sent(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Subscribed;
        }
    }

    /// Apply one message.
    ///
    /// Returns the notification to deliver, if any. A rejected subscribe
    /// request comes back as the remote error; the caller closes the session.
    pub fn on_message(
        &mut self,
        message: InboundMessage,
    ) -> Result<Option<ResultNotification>, RemoteError> {
        match message {
            InboundMessage::Ack { id, result } if id == self.subscribe_request_id => {
                let value = result?;
                match SubscriptionHandle::from_value(&value) {
                    Some(handle) => self.adopt(handle),
                    None => debug!("Subscribe acknowledgment without a handle: {}", value),
                }
                Ok(None)
            }
            InboundMessage::Ack { id, .. } => {
                debug!("Ignoring response to unknown request id {}", id);
                Ok(None)
            }
            InboundMessage::Notification {
                subscription: Some(handle),
                outcome,
            } => {
                if self.state == SessionState::Subscribed {
                    self.adopt(handle.clone());
                }

                match &self.state {
                    SessionState::Active(current) if *current == handle => {
                        if outcome.has_content() {
                            Ok(Some(ResultNotification {
                                subscription: handle,
                                outcome,
                            }))
                        } else {
                            debug!("Ignoring empty notification for {}", handle);
                            Ok(None)
                        }
                    }
                    _ => {
                        debug!("Ignoring notification for foreign subscription {}", handle);
                        Ok(None)
                    }
                }
            }
            InboundMessage::Notification {
                subscription: None, ..
            } => {
                debug!("Ignoring notification without a subscription handle");
                Ok(None)
            }
            InboundMessage::Unrecognized => Ok(None),
        }
    }

    pub fn on_close(&mut self) {
        self.state = SessionState::Closed;
    }

    fn adopt(&mut self, handle: SubscriptionHandle) {
        if self.state == SessionState::Subscribed {
            info!("Subscription active with handle {}", handle);
            self.state = SessionState::Active(handle);
        }
    }
}
