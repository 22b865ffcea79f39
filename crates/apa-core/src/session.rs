//! Single-flight chat session.
//!
//! [`ChatSession`] owns the [`MessageStore`] and drives one relay request at
//! a time. A send is split into three steps so event-driven front ends can
//! render between them:
//!
//! 1. [`begin_send`](ChatSession::begin_send) validates the input, takes the
//!    busy flag, snapshots the history window and appends the user message.
//! 2. The returned [`PendingSend`] is dispatched through a [`RelayClient`].
//! 3. [`finish_send`](ChatSession::finish_send) appends the assistant reply.
//!
//! The busy flag is held by a guard inside [`PendingSend`]; dropping it on
//! any path (completion, cancellation, an abandoned future) frees the
//! session for the next send.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancel::CancellationSignal;
use crate::error::RelayError;
use crate::relay::RelayClient;
use crate::replies;
use crate::store::MessageStore;
use crate::suggestions::{self, Suggestion};
use crate::types::{HISTORY_WINDOW, Message, MessageId, RelayRequest, Role};

/// How long a copied message shows its "copied" mark.
pub const COPIED_MARK_DURATION: Duration = Duration::from_secs(2);

/// Why a send was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("message is empty")]
    Empty,
    #[error("a request is already in flight")]
    Busy,
    #[error("no suggestion at index {0}")]
    UnknownSuggestion(usize),
}

/// Destination for copied message text.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> io::Result<()>;
}

/// Shared "request in flight" flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }
}

/// Clears the busy flag when dropped.
#[derive(Debug)]
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A send that has been accepted and is waiting for its reply.
#[derive(Debug)]
pub struct PendingSend {
    request: RelayRequest,
    user_message: MessageId,
    _busy: BusyGuard,
}

impl PendingSend {
    pub fn request(&self) -> &RelayRequest {
        &self.request
    }

    pub fn user_message(&self) -> &MessageId {
        &self.user_message
    }

    /// Issue the relay call for this send.
    pub async fn dispatch<C: RelayClient + ?Sized>(
        &self,
        relay: &C,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, RelayError> {
        relay.relay(&self.request, cancellation).await
    }
}

/// In-progress edit of a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: MessageId,
    pub content: String,
}

#[derive(Debug, Clone)]
struct CopiedMark {
    id: MessageId,
    at: Instant,
}

pub struct ChatSession<C> {
    store: MessageStore,
    relay: C,
    busy: BusyFlag,
    suggestions_dismissed: bool,
    editing: Option<EditDraft>,
    copied: Option<CopiedMark>,
}

impl<C: RelayClient> ChatSession<C> {
    /// New conversation opened with the APA Agent greeting.
    pub fn new(relay: C) -> Self {
        let mut store = MessageStore::new();
        store.append(Message::assistant(replies::GREETING));
        Self {
            store,
            relay,
            busy: BusyFlag::default(),
            suggestions_dismissed: false,
            editing: None,
            copied: None,
        }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn relay(&self) -> &C {
        &self.relay
    }

    pub fn busy_flag(&self) -> &BusyFlag {
        &self.busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Text for the typing indicator, if one should be shown.
    pub fn busy_indicator(&self) -> Option<&'static str> {
        self.is_busy().then_some(replies::BUSY_INDICATOR)
    }

    /// Suggestions are offered only while the greeting is the sole message.
    pub fn suggestions_visible(&self) -> bool {
        !self.suggestions_dismissed && self.store.len() == 1
    }

    pub fn visible_suggestions(&self) -> &'static [Suggestion] {
        if self.suggestions_visible() {
            &suggestions::SUGGESTIONS
        } else {
            &[]
        }
    }

    // ── Sending ──────────────────────────────────────────────────────────────

    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::Empty);
        }
        let busy = self.busy.try_acquire().ok_or(SendRejected::Busy)?;

        let history = self
            .store
            .trailing_window(HISTORY_WINDOW)
            .iter()
            .map(Message::to_history_entry)
            .collect();
        let user_message = self.store.append(Message::user(text));
        self.suggestions_dismissed = true;

        debug!(message_id = %user_message, "send accepted");
        Ok(PendingSend {
            request: RelayRequest::new(text, history),
            user_message,
            _busy: busy,
        })
    }

    /// Append the reply for `pending` and release the busy flag.
    ///
    /// Failures become the fixed fallback reply. A cancelled send appends
    /// nothing and returns `None`.
    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        outcome: Result<String, RelayError>,
    ) -> Option<MessageId> {
        let reply = match outcome {
            Ok(text) => text,
            Err(RelayError::Cancelled) => {
                info!(message_id = %pending.user_message, "send cancelled");
                return None;
            }
            Err(e) => {
                warn!(error = %e, message_id = %pending.user_message, "relay failed");
                replies::CLIENT_FALLBACK.to_owned()
            }
        };
        let id = self.store.append(Message::assistant(reply));
        drop(pending);
        Some(id)
    }

    /// Send `text` and wait for the reply. Returns the id of the appended
    /// assistant message (`None` if cancelled).
    pub async fn send(
        &mut self,
        text: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Option<MessageId>, SendRejected> {
        let pending = self.begin_send(text)?;
        let outcome = pending.dispatch(&self.relay, cancellation).await;
        Ok(self.finish_send(pending, outcome))
    }

    /// Same as typing the suggestion's prompt and sending it.
    pub async fn send_suggestion(
        &mut self,
        index: usize,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Option<MessageId>, SendRejected> {
        let suggestion = suggestions::get(index).ok_or(SendRejected::UnknownSuggestion(index))?;
        self.send(suggestion.prompt, cancellation).await
    }

    // ── Editing ──────────────────────────────────────────────────────────────

    /// Open an edit draft for a user message. Assistant messages are not
    /// editable.
    pub fn start_edit(&mut self, id: &MessageId) -> bool {
        match self.store.get(id) {
            Some(message) if message.role == Role::User => {
                self.editing = Some(EditDraft {
                    id: id.clone(),
                    content: message.content.clone(),
                });
                true
            }
            _ => false,
        }
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    pub fn update_edit(&mut self, content: impl Into<String>) {
        if let Some(draft) = self.editing.as_mut() {
            draft.content = content.into();
        }
    }

    /// Apply the draft. A blank draft is not saved and stays open.
    pub fn save_edit(&mut self) -> bool {
        let Some(draft) = self.editing.as_ref() else {
            return false;
        };
        if !self.store.edit(&draft.id, &draft.content) {
            return false;
        }
        self.editing = None;
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    // ── Copying ──────────────────────────────────────────────────────────────

    pub fn copy_message(&mut self, id: &MessageId, clipboard: &mut impl Clipboard) -> bool {
        self.copy_message_at(id, clipboard, Instant::now())
    }

    pub(crate) fn copy_message_at(
        &mut self,
        id: &MessageId,
        clipboard: &mut impl Clipboard,
        now: Instant,
    ) -> bool {
        let Some(message) = self.store.get(id) else {
            return false;
        };
        if let Err(e) = clipboard.write_text(&message.content) {
            warn!(error = %e, message_id = %id, "failed to copy message");
            return false;
        }
        self.copied = Some(CopiedMark {
            id: id.clone(),
            at: now,
        });
        true
    }

    /// `true` for [`COPIED_MARK_DURATION`] after `id` was copied.
    pub fn is_copied(&self, id: &MessageId) -> bool {
        self.is_copied_at(id, Instant::now())
    }

    pub(crate) fn is_copied_at(&self, id: &MessageId, now: Instant) -> bool {
        self.copied.as_ref().is_some_and(|mark| {
            &mark.id == id && now.saturating_duration_since(mark.at) < COPIED_MARK_DURATION
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::HistoryEntry;

    /// Relay that records every request and answers from a script.
    #[derive(Default)]
    struct ScriptedRelay {
        calls: Mutex<Vec<RelayRequest>>,
        fail_with_status: Option<u16>,
    }

    impl ScriptedRelay {
        fn failing(status: u16) -> Self {
            Self {
                fail_with_status: Some(status),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> RelayRequest {
            self.calls.lock().unwrap().last().cloned().expect("at least one call")
        }
    }

    #[async_trait]
    impl RelayClient for ScriptedRelay {
        async fn relay(
            &self,
            request: &RelayRequest,
            cancellation: Option<&CancellationSignal>,
        ) -> Result<String, RelayError> {
            self.calls.lock().unwrap().push(request.clone());
            if crate::cancel::is_cancelled(cancellation) {
                return Err(RelayError::Cancelled);
            }
            match self.fail_with_status {
                Some(status) => Err(RelayError::Status {
                    status,
                    detail: String::new(),
                }),
                None => Ok(format!("jawaban untuk: {}", request.message)),
            }
        }
    }

    #[derive(Default)]
    struct MemoryClipboard(Option<String>);

    impl Clipboard for MemoryClipboard {
        fn write_text(&mut self, text: &str) -> io::Result<()> {
            self.0 = Some(text.to_owned());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl Clipboard for BrokenClipboard {
        fn write_text(&mut self, _text: &str) -> io::Result<()> {
            Err(io::Error::other("clipboard unavailable"))
        }
    }

    #[test]
    fn starts_with_greeting_and_suggestions() {
        let session = ChatSession::new(ScriptedRelay::default());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert_eq!(session.messages()[0].content, replies::GREETING);
        assert!(session.suggestions_visible());
        assert_eq!(session.visible_suggestions().len(), 4);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn blank_input_is_not_sent() {
        let mut session = ChatSession::new(ScriptedRelay::default());

        assert_eq!(session.send("   ", None).await, Err(SendRejected::Empty));
        assert_eq!(session.send("", None).await, Err(SendRejected::Empty));

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.relay().call_count(), 0);
        assert!(session.suggestions_visible());
    }

    #[tokio::test]
    async fn successful_send_appends_user_then_assistant() {
        let mut session = ChatSession::new(ScriptedRelay::default());

        let reply_id = session
            .send("Apa itu WBS?", None)
            .await
            .unwrap()
            .expect("reply appended");

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Apa itu WBS?");
        assert_eq!(messages[2].id, reply_id);
        assert_eq!(messages[2].content, "jawaban untuk: Apa itu WBS?");
        assert!(!session.is_busy());
        assert!(!session.suggestions_visible());
    }

    #[tokio::test]
    async fn history_is_window_preceding_new_message() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        for i in 0..6 {
            session.send(&format!("q{i}"), None).await.unwrap();
        }
        // greeting + 6 * (user + assistant) = 13 messages before the next send.
        session.send("terakhir", None).await.unwrap();

        let call = session.relay().last_call();
        assert_eq!(call.message, "terakhir");
        assert_eq!(call.history.len(), HISTORY_WINDOW);
        assert_eq!(
            call.history.first(),
            Some(&HistoryEntry {
                role: Role::User,
                content: "q1".into()
            })
        );
        assert_eq!(
            call.history.last(),
            Some(&HistoryEntry {
                role: Role::Assistant,
                content: "jawaban untuk: q5".into()
            })
        );
    }

    #[tokio::test]
    async fn second_send_while_busy_is_rejected() {
        let mut session = ChatSession::new(ScriptedRelay::default());

        let pending = session.begin_send("pertama").unwrap();
        assert!(session.is_busy());
        assert_eq!(session.busy_indicator(), Some(replies::BUSY_INDICATOR));

        assert_eq!(session.begin_send("kedua").unwrap_err(), SendRejected::Busy);
        assert_eq!(session.relay().call_count(), 0);

        let outcome = pending.dispatch(session.relay(), None).await;
        assert_eq!(session.relay().call_count(), 1);
        session.finish_send(pending, outcome);

        assert!(!session.is_busy());
        // The rejected send left no trace.
        assert_eq!(session.messages().len(), 3);
        assert!(session.begin_send("kedua").is_ok());
    }

    #[test]
    fn dropping_pending_send_releases_busy_flag() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        let pending = session.begin_send("x").unwrap();
        assert!(session.is_busy());
        drop(pending);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn relay_failure_becomes_fallback_reply() {
        let mut session = ChatSession::new(ScriptedRelay::failing(500));

        session.send("halo", None).await.unwrap();

        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, replies::CLIENT_FALLBACK);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn cancelled_send_appends_no_reply() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        let signal = crate::cancel::new_signal();
        crate::cancel::cancel(&signal);

        let reply = session.send("halo", Some(&signal)).await.unwrap();

        assert_eq!(reply, None);
        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn suggestion_sends_its_prompt() {
        let mut session = ChatSession::new(ScriptedRelay::default());

        session.send_suggestion(1, None).await.unwrap();

        assert_eq!(session.relay().last_call().message, suggestions::SUGGESTIONS[1].prompt);
        assert_eq!(session.messages()[1].content, suggestions::SUGGESTIONS[1].prompt);
        assert!(session.visible_suggestions().is_empty());
        assert_eq!(
            session.send_suggestion(9, None).await,
            Err(SendRejected::UnknownSuggestion(9))
        );
    }

    #[tokio::test]
    async fn edit_round_trip_keeps_identity() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        session.send("Apa itu RACI?", None).await.unwrap();
        let original = session.messages()[1].clone();

        assert!(session.start_edit(&original.id));
        assert_eq!(session.editing().unwrap().content, "Apa itu RACI?");
        session.update_edit("Apa itu matriks RACI?");
        assert!(session.save_edit());

        let edited = session.store().get(&original.id).unwrap();
        assert_eq!(edited.content, "Apa itu matriks RACI?");
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.role, original.role);
        assert_eq!(edited.timestamp, original.timestamp);
        assert!(session.editing().is_none());
    }

    #[tokio::test]
    async fn blank_edit_keeps_draft_and_content() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        session.send("asli", None).await.unwrap();
        let id = session.messages()[1].id.clone();

        session.start_edit(&id);
        session.update_edit("   ");
        assert!(!session.save_edit());
        assert!(session.editing().is_some());
        assert_eq!(session.store().get(&id).unwrap().content, "asli");

        session.cancel_edit();
        assert!(session.editing().is_none());
    }

    #[test]
    fn assistant_messages_are_not_editable() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        let greeting = session.messages()[0].id.clone();
        assert!(!session.start_edit(&greeting));
        assert!(session.editing().is_none());
    }

    #[test]
    fn copy_marks_message_for_two_seconds() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        let id = session.messages()[0].id.clone();
        let mut clipboard = MemoryClipboard::default();
        let t0 = Instant::now();

        assert!(session.copy_message_at(&id, &mut clipboard, t0));
        assert_eq!(clipboard.0.as_deref(), Some(replies::GREETING));
        assert!(session.is_copied_at(&id, t0 + Duration::from_millis(1500)));
        assert!(!session.is_copied_at(&id, t0 + COPIED_MARK_DURATION));
    }

    #[test]
    fn failed_copy_leaves_no_mark() {
        let mut session = ChatSession::new(ScriptedRelay::default());
        let id = session.messages()[0].id.clone();

        assert!(!session.copy_message(&id, &mut BrokenClipboard));
        assert!(!session.is_copied(&id));
        assert!(!session.copy_message(&MessageId::new(), &mut MemoryClipboard::default()));
    }
}
