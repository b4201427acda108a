use huddle_core::models::{Profile, ProfileUpdate, UserId};

use crate::cli::UserCommands;
use crate::commands::common::{
    normalize_identifier, normalize_search_query, open_session, preview, print_json,
};
use crate::config_profiles::normalize_text_option;
use crate::error::CliError;

pub async fn run_users(
    command: UserCommands,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    match command {
        UserCommands::Search { query } => {
            let query = normalize_search_query(&query)?;
            let session = open_session(global_profile, false).await?;
            let profiles = session.services.profiles.search(&query).await?;
            if as_json {
                return print_json(&profiles);
            }
            if profiles.is_empty() {
                println!("No users match '{query}'.");
            }
            for line in format_profile_lines(&profiles) {
                println!("{line}");
            }
        }
        UserCommands::Show { user_id } => {
            let user_id = UserId::new(normalize_identifier(&user_id, "User ID")?);
            let session = open_session(global_profile, false).await?;
            let profile = session
                .services
                .profiles
                .profile(&user_id)
                .await?
                .ok_or_else(|| CliError::NotFound(format!("user {user_id}")))?;
            if as_json {
                return print_json(&profile);
            }
            print_profile(&profile);
        }
        UserCommands::Update {
            username,
            full_name,
            bio,
            image,
        } => {
            let update = ProfileUpdate {
                username: normalize_text_option(username),
                full_name: normalize_text_option(full_name),
                bio: normalize_text_option(bio),
                image: normalize_text_option(image),
            };
            let session = open_session(global_profile, true).await?;
            let profile = session.services.profiles.update(&update).await?;
            if as_json {
                return print_json(&profile);
            }
            println!("Profile updated");
            print_profile(&profile);
        }
    }
    Ok(())
}

pub fn format_profile_lines(profiles: &[Profile]) -> Vec<String> {
    profiles
        .iter()
        .map(|profile| {
            format!(
                "{}  {:<20}  {}",
                profile.id,
                profile.username,
                profile.full_name.as_deref().unwrap_or("")
            )
        })
        .collect()
}

fn print_profile(profile: &Profile) {
    println!("{} ({})", profile.username, profile.id);
    if let Some(full_name) = profile.full_name.as_deref() {
        println!("  name:  {full_name}");
    }
    if let Some(bio) = profile.bio.as_deref() {
        println!("  bio:   {}", preview(bio, 72));
    }
    if let Some(image) = profile.image.as_deref() {
        println!("  image: {image}");
    }
}
