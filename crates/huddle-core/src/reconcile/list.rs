//! Ordered list of confirmed rows and optimistic placeholders.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Outcome, Reconcilable};
use crate::models::{ProfileSummary, TempId, UserId};

/// Lifecycle of a rendered entry.
///
/// `Pending` moves to `Confirmed` or `Failed`. `Failed` is terminal; a
/// resubmit creates a fresh `Pending` entry with a new temp id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Confirmed,
    Failed,
}

impl EntryStatus {
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Failed)
        )
    }
}

/// Where new rows land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Reverse-chronological: new rows are prepended
    #[default]
    NewestFirst,
    /// Chronological: new rows are appended
    OldestFirst,
}

/// A locally created, not yet confirmed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub temp_id: TempId,
    pub author: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_profile: Option<ProfileSummary>,
    status: EntryStatus,
    seq: u64,
}

impl Placeholder {
    #[must_use]
    pub const fn status(&self) -> EntryStatus {
        self.status
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, EntryStatus::Pending)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, EntryStatus::Failed)
    }
}

/// One rendered entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<T> {
    Optimistic(Placeholder),
    Confirmed(T),
}

impl<T: Reconcilable> Row<T> {
    #[must_use]
    pub const fn status(&self) -> EntryStatus {
        match self {
            Self::Optimistic(placeholder) => placeholder.status,
            Self::Confirmed(_) => EntryStatus::Confirmed,
        }
    }

    #[must_use]
    pub const fn confirmed(&self) -> Option<&T> {
        match self {
            Self::Confirmed(record) => Some(record),
            Self::Optimistic(_) => None,
        }
    }

    #[must_use]
    pub const fn placeholder(&self) -> Option<&Placeholder> {
        match self {
            Self::Optimistic(placeholder) => Some(placeholder),
            Self::Confirmed(_) => None,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Optimistic(placeholder) => &placeholder.content,
            Self::Confirmed(record) => record.content(),
        }
    }

    #[must_use]
    pub fn author(&self) -> &UserId {
        match self {
            Self::Optimistic(placeholder) => &placeholder.author,
            Self::Confirmed(record) => record.author(),
        }
    }

    fn is_temp(&self, temp_id: TempId) -> bool {
        matches!(self, Self::Optimistic(placeholder) if placeholder.temp_id == temp_id)
    }

    fn has_id(&self, id: &T::Id) -> bool {
        matches!(self, Self::Confirmed(record) if record.id() == id)
    }
}

/// Rendered list for one resource (a conversation, a comment thread).
///
/// Every confirmed id ever applied is remembered, deletions included, so
/// repeat deliveries and late replays are discarded.
#[derive(Debug, Clone)]
pub struct OptimisticList<T: Reconcilable> {
    rows: Vec<Row<T>>,
    seen: HashSet<T::Id>,
    order: ListOrder,
    next_seq: u64,
}

impl<T: Reconcilable> OptimisticList<T> {
    #[must_use]
    pub fn new(order: ListOrder) -> Self {
        Self {
            rows: Vec::new(),
            seen: HashSet::new(),
            order,
            next_seq: 0,
        }
    }

    /// Build from fetched records, already in display order.
    #[must_use]
    pub fn with_records(order: ListOrder, records: Vec<T>) -> Self {
        let mut list = Self::new(order);
        list.reload(records);
        list
    }

    #[must_use]
    pub const fn order(&self) -> ListOrder {
        self.order
    }

    #[must_use]
    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().filter_map(Row::confirmed)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.status() == EntryStatus::Pending)
            .count()
    }

    /// Whether a confirmed row with `id` is currently rendered.
    #[must_use]
    pub fn contains(&self, id: &T::Id) -> bool {
        self.rows.iter().any(|row| row.has_id(id))
    }

    #[must_use]
    pub fn placeholder(&self, temp_id: TempId) -> Option<&Placeholder> {
        self.rows
            .iter()
            .filter_map(Row::placeholder)
            .find(|placeholder| placeholder.temp_id == temp_id)
    }

    /// Insert a pending placeholder at the list edge and return its temp id.
    pub fn push_pending(
        &mut self,
        author: UserId,
        content: impl Into<String>,
        author_profile: Option<ProfileSummary>,
    ) -> TempId {
        let temp_id = TempId::new();
        let placeholder = Placeholder {
            temp_id,
            author,
            content: content.into(),
            created_at: Utc::now(),
            author_profile,
            status: EntryStatus::Pending,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.insert_at_edge(Row::Optimistic(placeholder));
        tracing::debug!(%temp_id, "optimistic entry added");
        temp_id
    }

    /// Apply the direct response to the mutation that created `temp_id`.
    pub fn resolve(&mut self, temp_id: TempId, mut record: T) -> Outcome {
        let id = record.id().clone();
        let Some(index) = self.position_of_temp(temp_id) else {
            if self.seen.contains(&id) {
                return Outcome::Duplicate;
            }
            self.seen.insert(id);
            let index = self.insert_at_edge(Row::Confirmed(record));
            return Outcome::Inserted { index };
        };

        if self.seen.contains(&id) {
            // The change feed rendered this row first (or it was deleted
            // since); the placeholder has nothing left to represent.
            self.rows.remove(index);
            tracing::debug!(%temp_id, "placeholder collapsed into existing row");
            return Outcome::Collapsed { temp_id };
        }

        self.adopt_placeholder_profile(index, &mut record);
        self.seen.insert(id);
        self.rows[index] = Row::Confirmed(record);
        tracing::debug!(%temp_id, index, "placeholder confirmed by response");
        Outcome::Replaced { temp_id, index }
    }

    /// Flag a pending placeholder as failed. Returns the placeholder so the
    /// caller can restore its content.
    pub fn fail(&mut self, temp_id: TempId) -> Option<Placeholder> {
        let placeholder = self.rows.iter_mut().find_map(|row| match row {
            Row::Optimistic(placeholder) if placeholder.temp_id == temp_id => Some(placeholder),
            _ => None,
        })?;
        if !placeholder.status.can_become(EntryStatus::Failed) {
            return None;
        }
        placeholder.status = EntryStatus::Failed;
        tracing::debug!(%temp_id, "optimistic entry failed");
        Some(placeholder.clone())
    }

    /// Remove a placeholder entirely (rollback).
    pub fn discard(&mut self, temp_id: TempId) -> Option<Placeholder> {
        let index = self.position_of_temp(temp_id)?;
        match self.rows.remove(index) {
            Row::Optimistic(placeholder) => Some(placeholder),
            Row::Confirmed(_) => None,
        }
    }

    /// Replace a failed placeholder with a fresh pending one carrying the
    /// same content. Returns the new temp id.
    pub fn resubmit(&mut self, temp_id: TempId) -> Option<TempId> {
        let index = self.position_of_temp(temp_id)?;
        if !matches!(&self.rows[index], Row::Optimistic(placeholder) if placeholder.is_failed()) {
            return None;
        }
        let Row::Optimistic(failed) = self.rows.remove(index) else {
            return None;
        };
        Some(self.push_pending(failed.author, failed.content, failed.author_profile))
    }

    /// Apply an authoritative insert from the change feed.
    ///
    /// `local_actor` is the signed-in user; only their rows may consume a
    /// placeholder by content.
    pub fn apply_insert(&mut self, mut record: T, local_actor: Option<&UserId>) -> Outcome {
        let id = record.id().clone();

        if self.seen.contains(&id) {
            if let Some(temp_id) = record.client_ref() {
                if let Some(index) = self.position_of_temp(temp_id) {
                    self.rows.remove(index);
                    return Outcome::Collapsed { temp_id };
                }
            }
            tracing::debug!(?id, "duplicate insert discarded");
            return Outcome::Duplicate;
        }

        self.seen.insert(id);
        if let Some((index, temp_id)) = self.correlate(&record, local_actor) {
            self.adopt_placeholder_profile(index, &mut record);
            self.rows[index] = Row::Confirmed(record);
            tracing::debug!(%temp_id, index, "placeholder confirmed by change feed");
            return Outcome::Replaced { temp_id, index };
        }

        let index = self.insert_at_edge(Row::Confirmed(record));
        Outcome::Inserted { index }
    }

    /// Apply an authoritative update; the row keeps its position.
    pub fn apply_update(&mut self, mut record: T) -> Outcome {
        let Some(index) = self.rows.iter().position(|row| row.has_id(record.id())) else {
            return Outcome::Ignored;
        };
        if let Row::Confirmed(existing) = &self.rows[index] {
            if let Some(profile) = existing.profile() {
                record.adopt_profile(profile);
            }
        }
        self.rows[index] = Row::Confirmed(record);
        Outcome::Updated { index }
    }

    /// Apply an authoritative delete. The id stays remembered so a replayed
    /// insert cannot bring the row back.
    pub fn apply_delete(&mut self, id: &T::Id) -> Outcome {
        self.seen.insert(id.clone());
        match self.rows.iter().position(|row| row.has_id(id)) {
            Some(index) => {
                self.rows.remove(index);
                Outcome::Removed
            }
            None => Outcome::Ignored,
        }
    }

    /// Replace confirmed rows with a fresh fetch (recovery after missed
    /// events). Placeholders the fetch already confirms are dropped; the
    /// rest stay at the list edge.
    pub fn reload(&mut self, records: Vec<T>) {
        let placeholders: Vec<Placeholder> = self
            .rows
            .drain(..)
            .filter_map(|row| match row {
                Row::Optimistic(placeholder) => Some(placeholder),
                Row::Confirmed(_) => None,
            })
            .collect();

        let mut fetched_ids = HashSet::new();
        let mut confirmed = Vec::with_capacity(records.len());
        for record in records {
            if fetched_ids.insert(record.id().clone()) {
                confirmed.push(record);
            }
        }

        let mut absorbed = vec![false; confirmed.len()];
        let mut kept = Vec::new();
        for placeholder in placeholders {
            let matched = confirmed.iter().enumerate().position(|(index, record)| {
                !absorbed[index]
                    && match record.client_ref() {
                        Some(temp_id) => temp_id == placeholder.temp_id,
                        // A row confirmed before the fetch already stands
                        // for an earlier send.
                        None => {
                            placeholder.is_pending()
                                && !self.seen.contains(record.id())
                                && record.author() == &placeholder.author
                                && record.content() == placeholder.content
                        }
                    }
            });
            match matched {
                Some(index) => absorbed[index] = true,
                None => kept.push(Row::Optimistic(placeholder)),
            }
        }

        self.seen.extend(fetched_ids);
        self.rows = confirmed.into_iter().map(Row::Confirmed).collect();
        match self.order {
            ListOrder::NewestFirst => {
                self.rows.splice(0..0, kept);
            }
            ListOrder::OldestFirst => self.rows.extend(kept),
        }
    }

    /// Fill in author details on confirmed rows by `author` that arrived
    /// without them. Returns how many rows were touched.
    pub fn attach_profile(&mut self, author: &UserId, profile: &ProfileSummary) -> usize {
        let mut touched = 0;
        for row in &mut self.rows {
            if let Row::Confirmed(record) = row {
                if record.author() == author && record.profile().is_none() {
                    record.adopt_profile(profile);
                    touched += 1;
                }
            }
        }
        touched
    }

    fn correlate(&self, record: &T, local_actor: Option<&UserId>) -> Option<(usize, TempId)> {
        if let Some(temp_id) = record.client_ref() {
            // An echoed temp id is authoritative; a miss means the row came
            // from another session of the same account.
            return self.position_of_temp(temp_id).map(|index| (index, temp_id));
        }

        let actor = local_actor?;
        if record.author() != actor {
            return None;
        }

        // Identical pending content is ambiguous; the most recently created
        // placeholder wins.
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| match row {
                Row::Optimistic(placeholder)
                    if placeholder.is_pending()
                        && &placeholder.author == actor
                        && placeholder.content == record.content() =>
                {
                    Some((index, placeholder.temp_id, placeholder.seq))
                }
                _ => None,
            })
            .max_by_key(|(_, _, seq)| *seq)
            .map(|(index, temp_id, _)| (index, temp_id))
    }

    fn adopt_placeholder_profile(&self, index: usize, record: &mut T) {
        if let Row::Optimistic(Placeholder {
            author_profile: Some(profile),
            ..
        }) = &self.rows[index]
        {
            record.adopt_profile(profile);
        }
    }

    fn position_of_temp(&self, temp_id: TempId) -> Option<usize> {
        self.rows.iter().position(|row| row.is_temp(temp_id))
    }

    fn insert_at_edge(&mut self, row: Row<T>) -> usize {
        match self.order {
            ListOrder::NewestFirst => {
                self.rows.insert(0, row);
                0
            }
            ListOrder::OldestFirst => {
                self.rows.push(row);
                self.rows.len() - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item {
        id: String,
        author: UserId,
        content: String,
        client_ref: Option<TempId>,
        profile: Option<ProfileSummary>,
    }

    impl Reconcilable for Item {
        type Id = String;

        fn id(&self) -> &String {
            &self.id
        }

        fn author(&self) -> &UserId {
            &self.author
        }

        fn content(&self) -> &str {
            &self.content
        }

        fn client_ref(&self) -> Option<TempId> {
            self.client_ref
        }

        fn profile(&self) -> Option<&ProfileSummary> {
            self.profile.as_ref()
        }

        fn adopt_profile(&mut self, profile: &ProfileSummary) {
            if self.profile.is_none() {
                self.profile = Some(profile.clone());
            }
        }
    }

    fn me() -> UserId {
        UserId::new("me")
    }

    fn item(id: &str, author: &str, content: &str) -> Item {
        Item {
            id: id.to_string(),
            author: UserId::new(author),
            content: content.to_string(),
            client_ref: None,
            profile: None,
        }
    }

    fn contents(list: &OptimisticList<Item>) -> Vec<(String, EntryStatus)> {
        list.rows()
            .iter()
            .map(|row| (row.content().to_string(), row.status()))
            .collect()
    }

    #[test]
    fn optimistic_insert_then_feed_confirmation_adds_exactly_one_row() {
        let mut list = OptimisticList::with_records(
            ListOrder::NewestFirst,
            vec![item("1", "other", "older")],
        );
        list.push_pending(me(), "hello", None);
        let outcome = list.apply_insert(item("2", "me", "hello"), Some(&me()));

        assert!(matches!(outcome, Outcome::Replaced { index: 0, .. }));
        assert_eq!(list.len(), 2);
        assert_eq!(
            contents(&list),
            vec![
                ("hello".to_string(), EntryStatus::Confirmed),
                ("older".to_string(), EntryStatus::Confirmed),
            ]
        );
    }

    #[test]
    fn repeat_delivery_is_idempotent() {
        let mut list = OptimisticList::<Item>::new(ListOrder::OldestFirst);
        assert_eq!(
            list.apply_insert(item("7", "other", "hi"), Some(&me())),
            Outcome::Inserted { index: 0 }
        );
        let before = contents(&list);
        assert_eq!(
            list.apply_insert(item("7", "other", "hi"), Some(&me())),
            Outcome::Duplicate
        );
        assert_eq!(contents(&list), before);
    }

    #[test]
    fn response_then_feed_echo_renders_once() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        let temp_id = list.push_pending(me(), "hey", None);

        let outcome = list.resolve(temp_id, item("9", "me", "hey"));
        assert_eq!(outcome, Outcome::Replaced { temp_id, index: 0 });
        assert_eq!(
            list.apply_insert(item("9", "me", "hey"), Some(&me())),
            Outcome::Duplicate
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn feed_echo_then_response_renders_once() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        let temp_id = list.push_pending(me(), "hey", None);

        assert!(matches!(
            list.apply_insert(item("9", "me", "hey"), Some(&me())),
            Outcome::Replaced { .. }
        ));
        assert_eq!(list.resolve(temp_id, item("9", "me", "hey")), Outcome::Duplicate);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicate_own_delivery_does_not_consume_another_placeholder() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        let first = list.push_pending(me(), "same", None);
        list.resolve(first, item("1", "me", "same"));
        list.push_pending(me(), "same", None);

        // Late echo of the first message must not eat the second placeholder.
        assert_eq!(
            list.apply_insert(item("1", "me", "same"), Some(&me())),
            Outcome::Duplicate
        );
        assert_eq!(list.pending_count(), 1);
    }

    #[test]
    fn ambiguous_content_matches_most_recent_placeholder() {
        let mut list = OptimisticList::<Item>::new(ListOrder::OldestFirst);
        let older = list.push_pending(me(), "ok", None);
        let newer = list.push_pending(me(), "ok", None);

        let outcome = list.apply_insert(item("5", "me", "ok"), Some(&me()));
        assert_eq!(outcome, Outcome::Replaced { temp_id: newer, index: 1 });
        assert!(list.placeholder(older).is_some());

        // The older placeholder's own response collapses cleanly.
        assert_eq!(list.resolve(older, item("5", "me", "ok")), Outcome::Collapsed { temp_id: older });
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn echoed_client_ref_wins_over_content() {
        let mut list = OptimisticList::<Item>::new(ListOrder::OldestFirst);
        let first = list.push_pending(me(), "ok", None);
        list.push_pending(me(), "ok", None);

        let mut echoed = item("5", "me", "ok");
        echoed.client_ref = Some(first);
        assert_eq!(
            list.apply_insert(echoed, Some(&me())),
            Outcome::Replaced { temp_id: first, index: 0 }
        );
    }

    #[test]
    fn foreign_client_ref_is_not_matched_by_content() {
        let mut list = OptimisticList::<Item>::new(ListOrder::OldestFirst);
        list.push_pending(me(), "ok", None);

        let mut from_other_device = item("5", "me", "ok");
        from_other_device.client_ref = Some(TempId::new());
        assert_eq!(
            list.apply_insert(from_other_device, Some(&me())),
            Outcome::Inserted { index: 1 }
        );
        assert_eq!(list.pending_count(), 1);
    }

    #[test]
    fn foreign_rows_never_consume_placeholders() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        list.push_pending(me(), "hi", None);
        let outcome = list.apply_insert(item("3", "other", "hi"), Some(&me()));
        assert_eq!(outcome, Outcome::Inserted { index: 0 });
        assert_eq!(list.pending_count(), 1);
    }

    #[test]
    fn failure_flags_placeholder_and_resubmit_creates_fresh_entry() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        let temp_id = list.push_pending(me(), "retry me", None);

        let failed = list.fail(temp_id).unwrap();
        assert_eq!(failed.content, "retry me");
        assert_eq!(list.rows()[0].status(), EntryStatus::Failed);
        assert!(list.fail(temp_id).is_none());

        let fresh = list.resubmit(temp_id).unwrap();
        assert_ne!(fresh, temp_id);
        assert_eq!(list.len(), 1);
        assert_eq!(list.rows()[0].status(), EntryStatus::Pending);
    }

    #[test]
    fn failed_placeholder_is_not_matched_by_content() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        let temp_id = list.push_pending(me(), "hi", None);
        list.fail(temp_id);
        assert_eq!(
            list.apply_insert(item("1", "me", "hi"), Some(&me())),
            Outcome::Inserted { index: 0 }
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn discard_removes_placeholder() {
        let mut list = OptimisticList::<Item>::new(ListOrder::OldestFirst);
        let temp_id = list.push_pending(me(), "oops", None);
        assert_eq!(list.discard(temp_id).unwrap().content, "oops");
        assert!(list.is_empty());
    }

    #[test]
    fn delete_is_remembered_against_replays() {
        let mut list =
            OptimisticList::with_records(ListOrder::OldestFirst, vec![item("1", "other", "x")]);
        assert_eq!(list.apply_delete(&"1".to_string()), Outcome::Removed);
        assert_eq!(list.apply_delete(&"1".to_string()), Outcome::Ignored);
        assert_eq!(
            list.apply_insert(item("1", "other", "x"), Some(&me())),
            Outcome::Duplicate
        );
        assert!(list.is_empty());
    }

    #[test]
    fn update_keeps_position_and_joined_profile() {
        let mut original = item("2", "other", "draft");
        original.profile = Some(ProfileSummary {
            username: "ana".to_string(),
            image: None,
        });
        let mut list = OptimisticList::with_records(
            ListOrder::OldestFirst,
            vec![item("1", "other", "a"), original],
        );

        assert_eq!(
            list.apply_update(item("2", "other", "edited")),
            Outcome::Updated { index: 1 }
        );
        let updated = list.rows()[1].confirmed().unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.profile.as_ref().unwrap().username, "ana");
        assert_eq!(list.apply_update(item("99", "other", "?")), Outcome::Ignored);
    }

    #[test]
    fn placeholder_profile_carries_into_confirmed_row() {
        let mut list = OptimisticList::<Item>::new(ListOrder::OldestFirst);
        let profile = ProfileSummary {
            username: "me".to_string(),
            image: Some("https://img/me.png".to_string()),
        };
        list.push_pending(me(), "with face", Some(profile.clone()));
        list.apply_insert(item("4", "me", "with face"), Some(&me()));
        assert_eq!(list.rows()[0].confirmed().unwrap().profile, Some(profile));
    }

    #[test]
    fn reload_keeps_only_unconfirmed_placeholders() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        list.push_pending(me(), "made it", None);
        list.push_pending(me(), "still going", None);

        list.reload(vec![item("1", "me", "made it"), item("0", "other", "old")]);

        assert_eq!(
            contents(&list),
            vec![
                ("still going".to_string(), EntryStatus::Pending),
                ("made it".to_string(), EntryStatus::Confirmed),
                ("old".to_string(), EntryStatus::Confirmed),
            ]
        );
        assert_eq!(
            list.apply_insert(item("1", "me", "made it"), Some(&me())),
            Outcome::Duplicate
        );
    }

    #[test]
    fn reload_keeps_repeat_text_placeholder_behind_confirmed_row() {
        let mut list = OptimisticList::<Item>::new(ListOrder::NewestFirst);
        let first = list.push_pending(me(), "ok", None);
        list.resolve(first, item("1", "me", "ok"));
        let second = list.push_pending(me(), "ok", None);

        list.reload(vec![item("1", "me", "ok")]);

        assert_eq!(
            contents(&list),
            vec![
                ("ok".to_string(), EntryStatus::Pending),
                ("ok".to_string(), EntryStatus::Confirmed),
            ]
        );
        assert!(list.placeholder(second).is_some());
        assert!(list.fail(second).is_some());
    }

    #[test]
    fn entry_status_transitions() {
        assert!(EntryStatus::Pending.can_become(EntryStatus::Confirmed));
        assert!(EntryStatus::Pending.can_become(EntryStatus::Failed));
        assert!(!EntryStatus::Failed.can_become(EntryStatus::Pending));
        assert!(!EntryStatus::Confirmed.can_become(EntryStatus::Failed));
    }

    #[test]
    fn attach_profile_fills_only_missing_author_details() {
        let mut list = OptimisticList::with_records(
            ListOrder::OldestFirst,
            vec![item("1", "ana", "hi"), item("2", "ben", "yo")],
        );
        let ana = ProfileSummary {
            username: "ana".to_string(),
            image: None,
        };

        assert_eq!(list.attach_profile(&UserId::new("ana"), &ana), 1);
        assert_eq!(list.attach_profile(&UserId::new("ana"), &ana), 0);
        let profiles: Vec<Option<&str>> = list
            .confirmed()
            .map(|item| item.profile.as_ref().map(|p| p.username.as_str()))
            .collect();
        assert_eq!(profiles, vec![Some("ana"), None]);
    }
}
