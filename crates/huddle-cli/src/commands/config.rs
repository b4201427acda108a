use std::env;

use huddle_core::config::{resolve_client_config, ClientConfig};

use crate::cli::ConfigCommands;
use crate::commands::common::print_json;
use crate::config_profiles::{is_http_url, normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub async fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            bootstrap_url,
            no_activate,
        } => {
            run_config_init(
                global_profile,
                supabase_url,
                supabase_anon_key,
                bootstrap_url,
                no_activate,
            )
            .await
        }
        ConfigCommands::Show => run_config_show(global_profile, as_json),
        ConfigCommands::Use { name } => run_config_use(&name),
    }
}

#[allow(clippy::needless_pass_by_value)]
pub async fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    bootstrap_url: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let explicit_supabase_url = normalize_text_option(supabase_url);
    let explicit_supabase_anon_key = normalize_text_option(supabase_anon_key);
    let bootstrap_url = resolve_bootstrap_url(
        normalize_text_option(bootstrap_url),
        existing_profile.bootstrap_url(),
    )?;

    let manifest = match bootstrap_url.clone() {
        Some(url) => {
            let fallback = ClientConfig {
                bootstrap_manifest_url: Some(url.clone()),
                ..ClientConfig::default()
            };
            let resolved = resolve_client_config(fallback).await.map_err(|error| {
                CliError::Config(format!(
                    "Failed to load bootstrap manifest from {url}: {error}"
                ))
            })?;
            println!("Loaded bootstrap manifest from {url}");
            Some(resolved)
        }
        None => None,
    };

    let merged_supabase_url = explicit_supabase_url
        .or_else(|| {
            manifest
                .as_ref()
                .and_then(|resolved| resolved.supabase_url.clone())
        })
        .or_else(|| normalize_text_option(env::var("SUPABASE_URL").ok()))
        .or_else(|| existing_profile.supabase_url());
    let merged_supabase_anon_key = explicit_supabase_anon_key
        .or_else(|| {
            manifest
                .as_ref()
                .and_then(|resolved| resolved.supabase_anon_key.clone())
        })
        .or_else(|| normalize_text_option(env::var("SUPABASE_ANON_KEY").ok()))
        .or_else(|| existing_profile.supabase_anon_key());

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(value) = merged_supabase_url {
        profile.supabase_url = Some(value);
    }
    if let Some(value) = merged_supabase_anon_key {
        profile.supabase_anon_key = Some(value);
    }
    profile.bootstrap_url = bootstrap_url;

    validate_profile_urls(profile)?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `huddle auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

fn run_config_show(profile_name: Option<&str>, as_json: bool) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    if as_json {
        return print_json(profile);
    }

    let active = config.active_profile.as_deref() == Some(profile_name.as_str());
    println!(
        "Profile '{}'{}",
        profile_name,
        if active { " (active)" } else { "" }
    );
    println!(
        "  supabase_url:      {}",
        profile.supabase_url().as_deref().unwrap_or("-")
    );
    println!(
        "  supabase_anon_key: {}",
        profile
            .supabase_anon_key()
            .map_or_else(|| "-".to_string(), |key| redact_key(&key))
    );
    println!(
        "  bootstrap_url:     {}",
        profile.bootstrap_url().as_deref().unwrap_or("-")
    );
    println!(
        "  echo_client_ref:   {}",
        profile.client_config().echo_client_ref
    );
    Ok(())
}

fn run_config_use(name: &str) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = name.trim();
    if !config.profiles.contains_key(name) {
        return Err(CliError::Config(format!(
            "Profile '{name}' is not configured. Run `huddle --profile {name} config init` first."
        )));
    }
    config.active_profile = Some(name.to_string());
    config.save().map_err(CliError::Config)?;
    println!("Active profile is now '{name}'");
    Ok(())
}

/// Explicit URL, then `HUDDLE_BOOTSTRAP_URL`, then the stored one.
pub fn resolve_bootstrap_url(
    explicit_bootstrap_url: Option<String>,
    existing_bootstrap_url: Option<String>,
) -> Result<Option<String>, CliError> {
    explicit_bootstrap_url
        .or_else(|| normalize_text_option(env::var("HUDDLE_BOOTSTRAP_URL").ok()))
        .or(existing_bootstrap_url)
        .map(normalize_bootstrap_url)
        .transpose()
}

pub fn normalize_bootstrap_url(url: String) -> Result<String, CliError> {
    let normalized = normalize_text_option(Some(url))
        .ok_or_else(|| CliError::Config("bootstrap_url must not be empty".to_string()))?;
    if !is_http_url(&normalized) {
        return Err(CliError::Config(
            "bootstrap_url must include http:// or https://".to_string(),
        ));
    }
    Ok(normalized.trim_end_matches('/').to_string())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}

pub fn redact_key(key: &str) -> String {
    let visible = key.chars().take(6).collect::<String>();
    format!("{visible}...")
}

fn validate_profile_urls(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}
