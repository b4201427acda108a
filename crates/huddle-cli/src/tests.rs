use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use huddle_core::models::{
    ConversationId, DeliveryStatus, FriendRequestId, FriendshipStatus, Message, MessageId,
    ProfileSummary, UserId,
};
use huddle_core::realtime::{ChangeEvent, ChangeKind, SubscriptionEvent};
use huddle_core::reconcile::{ListOrder, OptimisticList};
use huddle_core::views::{ChatView, ViewEffect, ViewUpdate};
use huddle_core::ConnectionState;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{ChatCommands, Cli, CommentSort, Commands, CompletionShell};
use crate::commands::badges::{format_counts, BadgeCounts};
use crate::commands::common::{
    format_relative_time, format_rows, normalize_content, normalize_identifier,
    normalize_search_query, preview, short_id,
};
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::config::{
    missing_fields, normalize_bootstrap_url, redact_key, resolve_bootstrap_url,
};
use crate::commands::friends::describe_status;
use crate::commands::live::{handle_event, ReloadRetry};
use crate::config_profiles::CliProfile;
use crate::error::CliError;

fn message(id: &str, sender: &str, content: &str, minutes_ago: i64) -> Message {
    Message {
        id: MessageId::new(id),
        conversation_id: ConversationId::new("c-1"),
        sender_id: UserId::new(sender),
        content: content.to_string(),
        status: DeliveryStatus::Sent,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
        client_ref: None,
        profile: Some(ProfileSummary {
            username: sender.to_string(),
            image: None,
        }),
    }
}

fn temp_path(name: &str) -> std::path::PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    std::env::temp_dir().join(format!("huddle-{name}-{}-{now}", std::process::id()))
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_search_query_rejects_blank() {
    assert!(matches!(
        normalize_search_query("   "),
        Err(CliError::EmptySearchQuery)
    ));
    assert_eq!(normalize_search_query(" ana ").unwrap(), "ana");
}

#[test]
fn normalize_identifier_names_the_missing_field() {
    let error = normalize_identifier(" ", "Post ID").unwrap_err();
    assert_eq!(error.to_string(), "Post ID cannot be empty");
    assert_eq!(normalize_identifier(" 42 ", "Post ID").unwrap(), "42");
}

#[test]
fn format_relative_time_units() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(format_relative_time(now - Duration::seconds(30), now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(2), now), "2m ago");
    assert_eq!(format_relative_time(now - Duration::hours(2), now), "2h ago");
    assert_eq!(format_relative_time(now - Duration::days(3), now), "3d ago");
    assert_eq!(format_relative_time(now + Duration::minutes(5), now), "just now");
}

#[test]
fn preview_collapses_whitespace_and_truncates() {
    assert_eq!(preview("hello   world\nsecond line", 40), "hello world");
    assert_eq!(preview("abcdefghij", 8), "abcde...");
    assert_eq!(short_id("0198c3a2-aaaa"), "0198c3a2");
}

#[test]
fn format_rows_marks_pending_and_failed_entries() {
    let mut list = OptimisticList::with_records(
        ListOrder::NewestFirst,
        vec![message("m-1", "bob", "hi there", 5)],
    );
    let pending = list.push_pending(UserId::new("me"), "on my way".to_string(), None);
    let failed = list.push_pending(UserId::new("me"), "lost".to_string(), None);
    list.fail(failed);

    let lines = format_rows(list.rows(), |message: &Message| message.created_at, Utc::now());
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("you: lost  (failed)"));
    assert!(lines[1].ends_with("you: on my way  (sending)"));
    assert!(lines[2].ends_with("bob: hi there"));
    assert!(lines[2].starts_with("5m ago"));
    assert!(list.placeholder(pending).is_some());
}

#[test]
fn normalize_bootstrap_url_requires_http_scheme() {
    assert!(normalize_bootstrap_url("https://api.example.com/v1/bootstrap".to_string()).is_ok());
    assert!(normalize_bootstrap_url("api.example.com/v1/bootstrap".to_string()).is_err());
}

#[test]
fn resolve_bootstrap_url_prefers_explicit_manifest_url() {
    let resolved = resolve_bootstrap_url(
        Some("https://api.example.com/v1/bootstrap/".to_string()),
        Some("https://ignored.example.com/bootstrap".to_string()),
    )
    .unwrap();
    assert_eq!(
        resolved.as_deref(),
        Some("https://api.example.com/v1/bootstrap")
    );
}

#[test]
fn missing_fields_lists_unset_connection_values() {
    let profile = CliProfile {
        supabase_url: Some("https://project.supabase.co".to_string()),
        ..CliProfile::default()
    };
    assert_eq!(missing_fields(&profile), vec!["supabase_anon_key"]);
    assert_eq!(redact_key("eyJhbGciOiJIUzI1NiJ9"), "eyJhbG...");
}

#[test]
fn describe_status_points_at_accept_command() {
    let status = FriendshipStatus::RequestReceived(FriendRequestId::new("7"));
    assert_eq!(
        describe_status(&status),
        "Request received (7); accept with `huddle friends accept 7`"
    );
    assert_eq!(describe_status(&FriendshipStatus::Friends), "Friends");
}

#[test]
fn format_counts_is_one_line() {
    let counts = BadgeCounts {
        unread_notifications: 3,
        unread_conversations: 1,
        pending_friend_requests: 0,
    };
    assert_eq!(
        format_counts(&counts),
        "notifications: 3  conversations: 1  friend requests: 0"
    );
}

#[test]
fn cli_parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "huddle", "comments", "42", "--sort", "oldest", "--json", "--profile", "work",
    ])
    .unwrap();
    assert!(cli.json);
    assert_eq!(cli.profile.as_deref(), Some("work"));
    match cli.command {
        Commands::Comments { post_id, sort } => {
            assert_eq!(post_id, "42");
            assert_eq!(sort, CommentSort::Oldest);
        }
        _ => panic!("expected comments command"),
    }
}

#[test]
fn cli_parses_chat_send_text() {
    let cli = Cli::try_parse_from(["huddle", "chat", "send", "c-1", "see", "you", "soon"]).unwrap();
    match cli.command {
        Commands::Chat {
            command:
                ChatCommands::Send {
                    conversation_id,
                    text,
                },
        } => {
            assert_eq!(conversation_id, "c-1");
            assert_eq!(text.join(" "), "see you soon");
        }
        _ => panic!("expected chat send"),
    }
}

#[test]
fn cli_parses_chat_read_all() {
    let cli = Cli::try_parse_from(["huddle", "chat", "read-all"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Chat {
            command: ChatCommands::ReadAll
        }
    ));
}

#[test]
fn cli_rejects_unknown_sort() {
    assert!(Cli::try_parse_from(["huddle", "comments", "42", "--sort", "random"]).is_err());
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("huddle"));
}

#[test]
fn completions_write_to_file() {
    let path = temp_path("completions.zsh");
    run_completions(CompletionShell::Zsh, Some(&path)).unwrap();
    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("#compdef huddle"));
    let _ = std::fs::remove_file(path);
}

fn message_insert(record: serde_json::Value) -> SubscriptionEvent {
    SubscriptionEvent::Change(ChangeEvent {
        schema: "public".to_string(),
        table: "messages".to_string(),
        kind: ChangeKind::Insert,
        record,
        old_record: serde_json::Value::Null,
        commit_timestamp: None,
    })
}

#[test]
fn undecodable_event_is_skipped_and_later_events_apply() {
    let mut view = ChatView::new(ConversationId::new("c-1"), UserId::new("me"), None);

    let broken = message_insert(json!({ "id": "m-1", "conversation_id": "c-1" }));
    assert_eq!(handle_event(&mut view, broken), ViewUpdate::unchanged());

    let valid = message_insert(json!({
        "id": "m-2",
        "conversation_id": "c-1",
        "sender_id": "bob",
        "content": "still here",
        "status": "sent",
        "created_at": "2025-03-01T10:15:30+00:00",
    }));
    let update = handle_event(&mut view, valid);
    assert!(update.changed);
    assert_eq!(view.messages().len(), 1);
}

#[test]
fn failed_refetch_is_retried_on_next_connect() {
    let mut retry = ReloadRetry::default();
    assert_eq!(
        retry.on_connection(ViewUpdate::unchanged(), ConnectionState::Connected),
        ViewUpdate::unchanged()
    );

    retry.failed(&CliError::NotSignedIn("default".to_string()));
    assert_eq!(
        retry.on_connection(ViewUpdate::unchanged(), ConnectionState::Reconnecting),
        ViewUpdate::unchanged()
    );
    assert_eq!(
        retry.on_connection(ViewUpdate::unchanged(), ConnectionState::Connected),
        ViewUpdate::effect(ViewEffect::Reload)
    );
    assert_eq!(
        retry.on_connection(
            ViewUpdate::effect(ViewEffect::Reload),
            ConnectionState::Connected
        ),
        ViewUpdate::effect(ViewEffect::Reload)
    );

    retry.succeeded();
    assert_eq!(
        retry.on_connection(ViewUpdate::unchanged(), ConnectionState::Connected),
        ViewUpdate::unchanged()
    );
}
