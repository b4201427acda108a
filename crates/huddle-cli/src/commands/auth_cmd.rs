use crate::auth::{clear_stored_session, load_stored_session, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let client_config = config
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .client_config();
    let auth_service = SupabaseAuthService::for_config(&profile_name, &client_config)?;

    match command {
        AuthCommands::Login { email, password } => {
            let auth_service = auth_service.ok_or_else(|| {
                CliError::Config(format!(
                    "Profile '{profile_name}' missing Supabase auth config. Set SUPABASE_URL and SUPABASE_ANON_KEY via `huddle config init`."
                ))
            })?;
            let session = auth_service.sign_in(&email, &password).await?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in profile '{profile_name}' as {email_label}");
            Ok(())
        }
        AuthCommands::Status => {
            let session = if let Some(service) = auth_service {
                service.restore_session().await?
            } else {
                load_stored_session(&profile_name)?
            };

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} (user_id={}, expires_at={})",
                    profile_name,
                    email_label,
                    session.user.id,
                    session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let stored_session = load_stored_session(&profile_name)?;
            match (auth_service, stored_session) {
                (Some(service), Some(session)) => {
                    if let Err(error) = service.sign_out(&session.access_token).await {
                        tracing::warn!("Remote sign-out failed, clearing local session: {}", error);
                        clear_stored_session(&profile_name)?;
                    }
                }
                _ => clear_stored_session(&profile_name)?,
            }

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
