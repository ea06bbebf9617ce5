//! Push subscriptions for operation results

pub mod message;
pub mod registry;
pub mod session;
pub mod state;

pub use message::{
    InboundMessage, LARGE_INTEGER_DIGITS, ResultNotification, SubscriptionHandle, decode,
    quote_large_integers,
};
pub use registry::{RegistrationGuard, SessionRegistry};
pub use session::{
    ResultSubscriber, ResultSubscription, SUBSCRIBE_REQUEST_ID, SubscriptionEvent,
    UNSUBSCRIBE_REQUEST_ID,
};
pub use state::{SessionMachine, SessionState};
