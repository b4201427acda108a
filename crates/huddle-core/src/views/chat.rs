//! Chat window state

use super::{Completion, IdRow, LiveView, Outgoing, ViewEffect, ViewUpdate};
use crate::error::Result;
use crate::models::{ConversationId, Message, MessageId, ProfileSummary, TempId, UserId};
use crate::realtime::{ChangeEvent, ChangeFilter, ChangeKind};
use crate::reconcile::{ListOrder, OptimisticList};
use crate::util::normalize_content;

/// One open conversation: messages newest first, the draft input, and any
/// sends still in flight.
#[derive(Debug, Clone)]
pub struct ChatView {
    conversation_id: ConversationId,
    viewer: UserId,
    viewer_profile: Option<ProfileSummary>,
    messages: OptimisticList<Message>,
    draft: String,
    closed: bool,
}

impl ChatView {
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        viewer: UserId,
        viewer_profile: Option<ProfileSummary>,
    ) -> Self {
        Self {
            conversation_id,
            viewer,
            viewer_profile,
            messages: OptimisticList::new(ListOrder::NewestFirst),
            draft: String::new(),
            closed: false,
        }
    }

    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    #[must_use]
    pub const fn messages(&self) -> &OptimisticList<Message> {
        &self.messages
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Replace rendered messages with a fetch (newest first).
    pub fn load(&mut self, messages: Vec<Message>) {
        self.messages.reload(messages);
    }

    /// Take the draft and render it as a pending message. `None` when the
    /// draft is blank or the view is closed.
    pub fn begin_send(&mut self) -> Option<Outgoing> {
        if self.closed {
            return None;
        }
        let content = normalize_content(&self.draft)?;
        self.draft.clear();
        let temp_id = self.messages.push_pending(
            self.viewer.clone(),
            content.clone(),
            self.viewer_profile.clone(),
        );
        Some(Outgoing { temp_id, content })
    }

    /// Apply the answer to a send. A failed message stays in the list,
    /// flagged, and its text goes back into the draft unless the user has
    /// typed something new.
    pub fn complete_send(&mut self, temp_id: TempId, result: Result<Message>) -> Completion {
        if self.closed {
            tracing::debug!(%temp_id, "send completed after chat was closed");
            return Completion::Closed;
        }
        match result {
            Ok(message) => {
                self.messages.resolve(temp_id, message);
                Completion::Applied
            }
            Err(error) => {
                tracing::warn!(
                    %temp_id,
                    conversation_id = %self.conversation_id,
                    "Message send failed: {}",
                    error
                );
                let Some(failed) = self.messages.fail(temp_id) else {
                    return Completion::Failed {
                        draft_restored: false,
                    };
                };
                let draft_restored = self.draft.trim().is_empty();
                if draft_restored {
                    self.draft = failed.content;
                }
                Completion::Failed { draft_restored }
            }
        }
    }

    /// Resend a failed message as a fresh pending entry.
    pub fn retry(&mut self, temp_id: TempId) -> Option<Outgoing> {
        if self.closed {
            return None;
        }
        let fresh = self.messages.resubmit(temp_id)?;
        let content = self.messages.placeholder(fresh)?.content.clone();
        Some(Outgoing {
            temp_id: fresh,
            content,
        })
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl LiveView for ChatView {
    fn filters(&self) -> Vec<ChangeFilter> {
        vec![ChangeFilter::table("messages").eq("conversation_id", &self.conversation_id)]
    }

    fn apply_change(&mut self, event: &ChangeEvent) -> Result<ViewUpdate> {
        if self.closed || event.table != "messages" {
            return Ok(ViewUpdate::unchanged());
        }
        match event.kind {
            ChangeKind::Insert => {
                let message: Message = event.record_as()?;
                if message.conversation_id != self.conversation_id {
                    return Ok(ViewUpdate::unchanged());
                }
                let incoming = message.sender_id != self.viewer;
                let outcome = self.messages.apply_insert(message, Some(&self.viewer));
                let update = ViewUpdate::changed(outcome.changed());
                if incoming && outcome.changed() {
                    return Ok(update.with(ViewEffect::MarkRead(self.conversation_id.clone())));
                }
                Ok(update)
            }
            ChangeKind::Update => {
                let message: Message = event.record_as()?;
                Ok(ViewUpdate::changed(
                    self.messages.apply_update(message).changed(),
                ))
            }
            ChangeKind::Delete => {
                let row: IdRow<MessageId> = event.old_record_as()?;
                Ok(ViewUpdate::changed(
                    self.messages.apply_delete(&row.id).changed(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::DeliveryStatus;
    use crate::reconcile::EntryStatus;
    use crate::views::tests::change;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn view() -> ChatView {
        ChatView::new(ConversationId::new("c-1"), UserId::new("me"), None)
    }

    fn message(id: &str, sender: &str, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            conversation_id: ConversationId::new("c-1"),
            sender_id: UserId::new(sender),
            content: content.to_string(),
            status: DeliveryStatus::Sent,
            created_at: Utc::now(),
            client_ref: None,
            profile: None,
        }
    }

    fn statuses(view: &ChatView) -> Vec<(String, EntryStatus)> {
        view.messages()
            .rows()
            .iter()
            .map(|row| (row.content().to_string(), row.status()))
            .collect()
    }

    #[test]
    fn hello_is_replaced_in_place_by_the_confirmed_row() {
        let mut chat = view();
        chat.load(vec![message("m-0", "you", "hey")]);
        chat.set_draft("hello");

        let outgoing = chat.begin_send().unwrap();
        assert_eq!(chat.draft(), "");
        assert_eq!(
            statuses(&chat),
            vec![
                ("hello".to_string(), EntryStatus::Pending),
                ("hey".to_string(), EntryStatus::Confirmed),
            ]
        );

        let completion = chat.complete_send(outgoing.temp_id, Ok(message("m-1", "me", "hello")));
        assert_eq!(completion, Completion::Applied);
        let first = chat.messages().rows()[0].confirmed().unwrap();
        assert_eq!(first.id.as_str(), "m-1");
        assert_eq!(first.status, DeliveryStatus::Sent);
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn realtime_echo_before_response_yields_one_row() {
        let mut chat = view();
        chat.set_draft("hello");
        let outgoing = chat.begin_send().unwrap();

        let echo = change(
            "messages",
            ChangeKind::Insert,
            json!({
                "id": "m-1",
                "conversation_id": "c-1",
                "sender_id": "me",
                "content": "hello",
                "status": "sent",
                "created_at": "2025-03-01 10:15:30+00",
                "client_ref": outgoing.temp_id,
            }),
        );
        let update = chat.apply_change(&echo).unwrap();
        assert!(update.changed);
        assert!(update.effects.is_empty());

        chat.complete_send(outgoing.temp_id, Ok(message("m-1", "me", "hello")));
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages().pending_count(), 0);
    }

    #[test]
    fn failed_send_is_flagged_and_draft_restored() {
        let mut chat = view();
        chat.set_draft("hello");
        let outgoing = chat.begin_send().unwrap();

        let completion = chat.complete_send(
            outgoing.temp_id,
            Err(Error::Backend("boom (500)".to_string())),
        );
        assert_eq!(
            completion,
            Completion::Failed {
                draft_restored: true
            }
        );
        assert_eq!(chat.draft(), "hello");
        assert_eq!(
            statuses(&chat),
            vec![("hello".to_string(), EntryStatus::Failed)]
        );
    }

    #[test]
    fn failed_send_keeps_newer_draft() {
        let mut chat = view();
        chat.set_draft("first");
        let outgoing = chat.begin_send().unwrap();
        chat.set_draft("second thought");

        let completion = chat.complete_send(outgoing.temp_id, Err(Error::Unauthorized));
        assert_eq!(
            completion,
            Completion::Failed {
                draft_restored: false
            }
        );
        assert_eq!(chat.draft(), "second thought");
    }

    #[test]
    fn retry_creates_a_fresh_pending_entry() {
        let mut chat = view();
        chat.set_draft("again");
        let first = chat.begin_send().unwrap();
        chat.complete_send(first.temp_id, Err(Error::Unauthorized));

        let retry = chat.retry(first.temp_id).unwrap();
        assert_ne!(retry.temp_id, first.temp_id);
        assert_eq!(retry.content, "again");
        assert_eq!(
            statuses(&chat),
            vec![("again".to_string(), EntryStatus::Pending)]
        );
        assert!(chat.retry(retry.temp_id).is_none());
    }

    #[test]
    fn incoming_message_asks_to_mark_read_once() {
        let mut chat = view();
        let incoming = change(
            "messages",
            ChangeKind::Insert,
            json!({
                "id": 5,
                "conversation_id": "c-1",
                "sender_id": "you",
                "content": "ping",
                "created_at": "2025-03-01T10:15:30Z",
            }),
        );

        let update = chat.apply_change(&incoming).unwrap();
        assert_eq!(
            update.effects,
            vec![ViewEffect::MarkRead(ConversationId::new("c-1"))]
        );
        let repeat = chat.apply_change(&incoming).unwrap();
        assert_eq!(repeat, ViewUpdate::unchanged());
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn status_update_and_delete_apply_in_place() {
        let mut chat = view();
        chat.load(vec![message("m-2", "me", "b"), message("m-1", "me", "a")]);

        let read = change(
            "messages",
            ChangeKind::Update,
            json!({
                "id": "m-1",
                "conversation_id": "c-1",
                "sender_id": "me",
                "content": "a",
                "status": "read",
                "created_at": "2025-03-01T10:15:30Z",
            }),
        );
        assert!(chat.apply_change(&read).unwrap().changed);
        assert_eq!(
            chat.messages().rows()[1].confirmed().unwrap().status,
            DeliveryStatus::Read
        );

        let deleted = change("messages", ChangeKind::Delete, json!({ "id": "m-2" }));
        assert!(chat.apply_change(&deleted).unwrap().changed);
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn late_response_after_close_is_ignored() {
        let mut chat = view();
        chat.set_draft("bye");
        let outgoing = chat.begin_send().unwrap();
        chat.close();

        assert_eq!(
            chat.complete_send(outgoing.temp_id, Ok(message("m-9", "me", "bye"))),
            Completion::Closed
        );
        assert_eq!(chat.messages().pending_count(), 1);
        assert!(chat.begin_send().is_none());
    }

    #[test]
    fn filter_targets_the_conversation() {
        assert_eq!(
            view().filters()[0].topic(),
            "realtime:public:messages:*:conversation_id=eq.c-1"
        );
    }
}
