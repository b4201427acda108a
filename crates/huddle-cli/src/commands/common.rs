use std::io::{self, IsTerminal, Read};

use chrono::{DateTime, Utc};
use huddle_core::auth::AuthSession;
use huddle_core::backend::RestClient;
use huddle_core::config::{resolve_client_config, ClientConfig};
use huddle_core::models::UserId;
use huddle_core::reconcile::{EntryStatus, Reconcilable, Row};
use huddle_core::services::{ServiceContext, Services};
use serde::Serialize;

use crate::auth::SupabaseAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Resolved profile, stored session and the services bound to them.
pub struct Session {
    pub profile_name: String,
    pub config: ClientConfig,
    pub auth: Option<AuthSession>,
    pub services: Services,
}

impl Session {
    pub fn viewer(&self) -> Result<&UserId, CliError> {
        self.auth
            .as_ref()
            .map(AuthSession::user_id)
            .ok_or_else(|| CliError::NotSignedIn(self.profile_name.clone()))
    }

    pub fn access_token(&self) -> Option<String> {
        self.auth
            .as_ref()
            .map(|session| session.access_token.clone())
    }
}

pub async fn open_session(
    global_profile: Option<&str>,
    require_auth: bool,
) -> Result<Session, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = profiles.resolve_profile_name(global_profile);
    let local = profiles
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .client_config();

    let config = resolve_client_config(local).await?;
    if config.validate().is_err() {
        return Err(CliError::Config(format!(
            "Profile '{profile_name}' is not configured. Run `huddle config init --supabase-url <url> --supabase-anon-key <key>` first."
        )));
    }

    let auth = match SupabaseAuthService::for_config(&profile_name, &config)? {
        Some(service) => service.restore_session().await?,
        None => None,
    };
    if require_auth && auth.is_none() {
        return Err(CliError::NotSignedIn(profile_name));
    }

    let mut rest = RestClient::new(&config)?;
    if let Some(session) = auth.as_ref() {
        rest = rest.with_access_token(session.access_token.clone());
    }
    let context = ServiceContext::new(
        rest,
        auth.as_ref().map(|session| session.user_id().clone()),
        &config,
    );
    tracing::debug!(profile = %profile_name, signed_in = auth.is_some(), "Session opened");

    Ok(Session {
        profile_name,
        config,
        auth,
        services: Services::new(&context),
    })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per list row. `created_at` reads the timestamp of a confirmed
/// record.
pub fn format_rows<T, F>(rows: &[Row<T>], created_at: F, now: DateTime<Utc>) -> Vec<String>
where
    T: Reconcilable,
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.iter()
        .map(|row| {
            let (author, timestamp) = match row {
                Row::Optimistic(placeholder) => (
                    placeholder
                        .author_profile
                        .as_ref()
                        .map_or("you", |profile| profile.username.as_str()),
                    placeholder.created_at,
                ),
                Row::Confirmed(record) => (
                    record
                        .profile()
                        .map_or("Unknown", |profile| profile.username.as_str()),
                    created_at(record),
                ),
            };
            let marker = match row.status() {
                EntryStatus::Pending => "  (sending)",
                EntryStatus::Failed => "  (failed)",
                EntryStatus::Confirmed => "",
            };
            format!(
                "{:<8}  {}: {}{}",
                format_relative_time(timestamp, now),
                author,
                row.content(),
                marker
            )
        })
        .collect()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Text from the arguments, else from piped stdin.
pub fn resolve_text(parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    huddle_core::util::normalize_content(content)
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_identifier(value: &str, label: &'static str) -> Result<String, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyIdentifier(label))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}
