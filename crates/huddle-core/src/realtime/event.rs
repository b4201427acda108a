//! Row-level change events and the filters that select them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::util::de_timestamp_option;

const DEFAULT_SCHEMA: &str = "public";

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which row changes a channel listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeFilter {
    pub schema: String,
    pub table: String,
    /// `None` listens to every kind
    pub event: Option<ChangeKind>,
    /// Row filter in `column=eq.value` form
    pub filter: Option<String>,
}

impl ChangeFilter {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            event: None,
            filter: None,
        }
    }

    #[must_use]
    pub const fn on(mut self, kind: ChangeKind) -> Self {
        self.event = Some(kind);
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filter = Some(format!("{column}=eq.{value}"));
        self
    }

    #[must_use]
    pub fn event_name(&self) -> &'static str {
        self.event.map_or("*", ChangeKind::as_str)
    }

    /// Channel topic; also the key subscriptions are shared under.
    #[must_use]
    pub fn topic(&self) -> String {
        let mut topic = format!(
            "realtime:{}:{}:{}",
            self.schema,
            self.table,
            self.event_name()
        );
        if let Some(filter) = &self.filter {
            topic.push(':');
            topic.push_str(filter);
        }
        topic
    }

    /// Whether `event` falls inside this filter. Only `eq` filters are
    /// evaluated; anything else is left to the server.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.schema != self.schema || event.table != self.table {
            return false;
        }
        if self.event.is_some_and(|kind| kind != event.kind) {
            return false;
        }
        let Some((column, expected)) = self
            .filter
            .as_deref()
            .and_then(|filter| filter.split_once("=eq."))
        else {
            return true;
        };
        let row = match event.kind {
            ChangeKind::Delete => &event.old_record,
            ChangeKind::Insert | ChangeKind::Update => &event.record,
        };
        match row.get(column) {
            Some(Value::String(value)) => value == expected,
            Some(Value::Number(value)) => value.to_string() == expected,
            // Deletes only carry the primary key unless the table has full
            // replica identity.
            None | Some(Value::Null) => event.kind == ChangeKind::Delete,
            Some(other) => other.to_string() == expected,
        }
    }
}

/// One authoritative row change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
    #[serde(default, deserialize_with = "de_timestamp_option")]
    pub commit_timestamp: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    /// Decode the new row.
    pub fn record_as<T: DeserializeOwned>(&self) -> Result<T> {
        decode_row(&self.record, self)
    }

    /// Decode the previous row (only the primary key for most tables).
    pub fn old_record_as<T: DeserializeOwned>(&self) -> Result<T> {
        decode_row(&self.old_record, self)
    }
}

fn decode_row<T: DeserializeOwned>(row: &Value, event: &ChangeEvent) -> Result<T> {
    if row.is_null() {
        return Err(Error::Realtime(format!(
            "{} event on {} carries no row",
            event.kind, event.table
        )));
    }
    Ok(T::deserialize(row)?)
}
