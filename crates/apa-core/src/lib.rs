//! apa-core – conversation state and relay plumbing for APA Agent.
//!
//! The crate is shared by the HTTP server (`apa-server`) and by chat front
//! ends such as the bundled `apa-chat` terminal client:
//!
//! - [`types`]: wire types for `POST /api/chat` and the message model.
//! - [`store`]: the ordered, edit-in-place message store.
//! - [`session`]: the single-flight chat state machine (busy flag, edit and
//!   copy workflows, suggestion visibility).
//! - [`relay`]: the client side of the relay contract.
//! - [`render`]: escaping renderer for provider-authored text.

pub mod cancel;
pub mod error;
pub mod relay;
pub mod render;
pub mod replies;
pub mod session;
pub mod store;
pub mod suggestions;
pub mod types;

pub use cancel::CancellationSignal;
pub use error::RelayError;
pub use relay::{HttpRelayClient, RelayClient};
pub use session::{ChatSession, Clipboard, SendRejected};
pub use store::MessageStore;
pub use types::{HistoryEntry, Message, MessageId, RelayRequest, RelayResponse, Role};
