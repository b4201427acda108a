use chrono::Utc;
use huddle_core::models::{Conversation, ConversationId, Message, TempId, UserId};
use huddle_core::reconcile::Row;
use huddle_core::services::ChatService;
use huddle_core::views::{ChatView, Completion, LiveView, ViewEffect, ViewUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::ChatCommands;
use crate::commands::common::{
    format_relative_time, format_rows, normalize_identifier, open_session, preview, print_json,
    resolve_text, Session,
};
use crate::commands::live::{describe_state, handle_event, LiveChannels, ReloadRetry};
use crate::error::CliError;

const WATCH_SCROLLBACK: usize = 20;

type SendResult = (TempId, huddle_core::Result<Message>);

pub async fn run_chat(
    command: ChatCommands,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let session = open_session(global_profile, true).await?;
    match command {
        ChatCommands::List => {
            let conversations = session.services.chat.conversations().await?;
            mark_delivered(&session, &conversations).await;
            if as_json {
                return print_json(&conversations);
            }
            if conversations.is_empty() {
                println!("No conversations yet.");
            }
            for line in format_conversation_lines(&conversations) {
                println!("{line}");
            }
            Ok(())
        }
        ChatCommands::Open { user_id } => {
            let other = UserId::new(normalize_identifier(&user_id, "User ID")?);
            let conversation_id = session.services.chat.open_conversation(&other).await?;
            println!("{conversation_id}");
            Ok(())
        }
        ChatCommands::History { conversation_id } => {
            let conversation_id = conversation_id_arg(&conversation_id)?;
            let messages = session.services.chat.messages(&conversation_id).await?;
            if let Err(error) = session.services.chat.mark_read(&conversation_id).await {
                tracing::warn!(%conversation_id, "Failed to mark messages read: {}", error);
            }
            if as_json {
                return print_json(&messages);
            }

            let mut view = open_view(&session, conversation_id).await?;
            view.load(messages);
            print_messages(&view, usize::MAX);
            Ok(())
        }
        ChatCommands::Send {
            conversation_id,
            text,
        } => {
            let conversation_id = conversation_id_arg(&conversation_id)?;
            let text = resolve_text(&text)?;
            run_send(&session, conversation_id, text).await
        }
        ChatCommands::Watch { conversation_id } => {
            let conversation_id = conversation_id_arg(&conversation_id)?;
            run_watch(&session, conversation_id).await
        }
        ChatCommands::ReadAll => {
            let updated = session.services.chat.mark_all_read().await?;
            println!("Marked {updated} message(s) as read");
            Ok(())
        }
    }
}

/// Conversations whose newest message came from the other side have
/// messages waiting in `sent`; listing them counts as delivery.
async fn mark_delivered(session: &Session, conversations: &[Conversation]) {
    for conversation in conversations {
        let incoming = conversation
            .last_message
            .as_ref()
            .is_some_and(|last| last.sender_id == conversation.other_participant.id);
        if !incoming {
            continue;
        }
        if let Err(error) = session.services.chat.mark_delivered(&conversation.id).await {
            tracing::warn!(conversation_id = %conversation.id, "Failed to mark messages delivered: {}", error);
        }
    }
}

fn conversation_id_arg(raw: &str) -> Result<ConversationId, CliError> {
    normalize_identifier(raw, "Conversation ID").map(ConversationId::new)
}

async fn open_view(session: &Session, conversation_id: ConversationId) -> Result<ChatView, CliError> {
    let viewer = session.viewer()?.clone();
    let viewer_profile = session.services.profiles.summary(&viewer).await?;
    Ok(ChatView::new(conversation_id, viewer, viewer_profile))
}

async fn run_send(
    session: &Session,
    conversation_id: ConversationId,
    text: String,
) -> Result<(), CliError> {
    let mut view = open_view(session, conversation_id.clone()).await?;
    view.set_draft(text);
    let outgoing = view.begin_send().ok_or(CliError::EmptyContent)?;

    let result = session
        .services
        .chat
        .send_message(&conversation_id, &outgoing.content, Some(outgoing.temp_id))
        .await;
    match result {
        Ok(message) => {
            let message_id = message.id.clone();
            view.complete_send(outgoing.temp_id, Ok(message));
            println!("Sent {message_id}");
            Ok(())
        }
        Err(error) => {
            view.complete_send(
                outgoing.temp_id,
                Err(huddle_core::Error::Backend(error.to_string())),
            );
            Err(error.into())
        }
    }
}

/// Interactive chat. Each stdin line is sent; `/retry` resends the newest
/// failed message and `/quit` (or EOF) leaves.
async fn run_watch(session: &Session, conversation_id: ConversationId) -> Result<(), CliError> {
    let mut live = LiveChannels::connect(session)?;
    let mut view = open_view(session, conversation_id.clone()).await?;
    view.load(session.services.chat.messages(&conversation_id).await?);
    mark_read_in_background(session.services.chat.clone(), conversation_id.clone());

    let (event_sink, mut events) = mpsc::unbounded_channel();
    live.forward(&view.filters(), (), &event_sink)?;
    let mut state = live.state();
    let mut previous = *state.borrow();
    let (sent_sink, mut sent) = mpsc::unbounded_channel::<SendResult>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut retry = ReloadRetry::default();

    print_messages(&view, WATCH_SCROLLBACK);
    loop {
        tokio::select! {
            Some(((), event)) = events.recv() => {
                let update = handle_event(&mut view, event);
                apply_update(session, &mut view, update, &mut retry).await;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                eprintln!("[{}]", describe_state(current));
                let update =
                    retry.on_connection(view.connection_changed(previous, current), current);
                previous = current;
                apply_update(session, &mut view, update, &mut retry).await;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = line.trim();
                if command == "/quit" {
                    break;
                }
                let outgoing = if command == "/retry" {
                    let retried = newest_failed(&view).and_then(|temp_id| view.retry(temp_id));
                    if retried.is_none() {
                        eprintln!("Nothing to retry.");
                    }
                    retried
                } else {
                    view.set_draft(line);
                    view.begin_send()
                };
                if let Some(outgoing) = outgoing {
                    spawn_send(
                        session.services.chat.clone(),
                        conversation_id.clone(),
                        outgoing.temp_id,
                        outgoing.content,
                        sent_sink.clone(),
                    );
                }
                print_messages(&view, WATCH_SCROLLBACK);
            }
            Some((temp_id, result)) = sent.recv() => {
                if let Completion::Failed { .. } = view.complete_send(temp_id, result) {
                    eprintln!("Message failed to send. Type /retry to resend it.");
                }
                print_messages(&view, WATCH_SCROLLBACK);
            }
            else => break,
        }
    }

    view.close();
    live.shutdown().await;
    Ok(())
}

/// Run the effects of one update. Failures are logged; a failed refetch is
/// left to `retry`.
async fn apply_update(
    session: &Session,
    view: &mut ChatView,
    update: ViewUpdate,
    retry: &mut ReloadRetry,
) {
    let mut changed = update.changed;
    for effect in update.effects {
        match effect {
            ViewEffect::MarkRead(conversation_id) => {
                mark_read_in_background(session.services.chat.clone(), conversation_id);
            }
            ViewEffect::Reload => {
                let fetched = session.services.chat.messages(view.conversation_id()).await;
                match fetched {
                    Ok(messages) => {
                        view.load(messages);
                        retry.succeeded();
                        changed = true;
                    }
                    Err(error) => retry.failed(&CliError::from(error)),
                }
            }
            ViewEffect::FetchProfile(_) | ViewEffect::RefreshCount => {}
        }
    }
    if changed {
        print_messages(view, WATCH_SCROLLBACK);
    }
}

fn spawn_send(
    chat: ChatService,
    conversation_id: ConversationId,
    temp_id: TempId,
    content: String,
    sink: mpsc::UnboundedSender<SendResult>,
) {
    tokio::spawn(async move {
        let result = chat
            .send_message(&conversation_id, &content, Some(temp_id))
            .await;
        let _ = sink.send((temp_id, result));
    });
}

fn mark_read_in_background(chat: ChatService, conversation_id: ConversationId) {
    tokio::spawn(async move {
        if let Err(error) = chat.mark_read(&conversation_id).await {
            tracing::warn!(%conversation_id, "Failed to mark messages read: {}", error);
        }
    });
}

fn newest_failed(view: &ChatView) -> Option<TempId> {
    view.messages()
        .rows()
        .iter()
        .filter_map(Row::placeholder)
        .find(|placeholder| placeholder.is_failed())
        .map(|placeholder| placeholder.temp_id)
}

/// Print up to `limit` messages, oldest first so the newest ends up at the
/// bottom of the terminal.
fn print_messages(view: &ChatView, limit: usize) {
    let rows = view.messages().rows();
    let shown = &rows[..rows.len().min(limit)];
    let mut lines = format_rows(shown, |message: &Message| message.created_at, Utc::now());
    lines.reverse();
    println!("-- {} --", view.conversation_id());
    for line in lines {
        println!("{line}");
    }
}

pub fn format_conversation_lines(conversations: &[Conversation]) -> Vec<String> {
    let now = Utc::now();
    conversations
        .iter()
        .map(|conversation| {
            let last = conversation
                .last_message
                .as_ref()
                .map_or_else(String::new, |message| preview(&message.content, 40));
            format!(
                "{}  {:<16}  {:<40}  {}",
                conversation.id,
                conversation.other_participant.username,
                last,
                format_relative_time(conversation.last_message_at, now)
            )
        })
        .collect()
}
