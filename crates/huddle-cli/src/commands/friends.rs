use huddle_core::models::{FriendRequest, FriendRequestId, FriendshipStatus, UserId};
use serde::Serialize;

use crate::cli::FriendCommands;
use crate::commands::common::{normalize_identifier, open_session, print_json};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct RequestLists<'a> {
    incoming: &'a [FriendRequest],
    outgoing: &'a [FriendRequest],
}

pub async fn run_friends(
    command: FriendCommands,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let session = open_session(global_profile, true).await?;
    let friends = &session.services.friends;

    match command {
        FriendCommands::List => {
            let profiles = friends.friends().await?;
            if as_json {
                return print_json(&profiles);
            }
            if profiles.is_empty() {
                println!("No friends yet.");
            }
            for profile in profiles {
                println!("{}  {}", profile.id, profile.username);
            }
        }
        FriendCommands::Requests => {
            let incoming = friends.incoming_requests().await?;
            let outgoing = friends.outgoing_requests().await?;
            if as_json {
                return print_json(&RequestLists {
                    incoming: &incoming,
                    outgoing: &outgoing,
                });
            }
            println!("Incoming ({}):", incoming.len());
            for request in &incoming {
                println!("  {}  from {}", request.id, request.requester_id);
            }
            println!("Outgoing ({}):", outgoing.len());
            for request in &outgoing {
                println!("  {}  to {}", request.id, request.addressee_id);
            }
        }
        FriendCommands::Status { user_id } => {
            let target = user_id_arg(&user_id)?;
            let status = friends.status(&target).await?;
            if as_json {
                return print_json(&status);
            }
            println!("{}", describe_status(&status));
        }
        FriendCommands::Add { user_id } => {
            let target = user_id_arg(&user_id)?;
            let request = friends.send_request(&target).await?;
            println!("Friend request {} sent to {}", request.id, target);
        }
        FriendCommands::Accept { request_id } => {
            let request_id = request_id_arg(&request_id)?;
            friends.accept(&request_id).await?;
            println!("Accepted friend request {request_id}");
        }
        FriendCommands::Reject { request_id } => {
            let request_id = request_id_arg(&request_id)?;
            friends.reject(&request_id).await?;
            println!("Rejected friend request {request_id}");
        }
        FriendCommands::Remove { user_id } => {
            let target = user_id_arg(&user_id)?;
            if friends.remove(&target).await? {
                println!("Removed {target} from friends");
            } else {
                println!("{target} was not a friend");
            }
        }
    }
    Ok(())
}

fn user_id_arg(raw: &str) -> Result<UserId, CliError> {
    normalize_identifier(raw, "User ID").map(UserId::new)
}

fn request_id_arg(raw: &str) -> Result<FriendRequestId, CliError> {
    normalize_identifier(raw, "Request ID").map(FriendRequestId::new)
}

pub fn describe_status(status: &FriendshipStatus) -> String {
    match status {
        FriendshipStatus::None => "Not friends".to_string(),
        FriendshipStatus::Friends => "Friends".to_string(),
        FriendshipStatus::RequestSent(id) => format!("Request sent ({id})"),
        FriendshipStatus::RequestReceived(id) => {
            format!("Request received ({id}); accept with `huddle friends accept {id}`")
        }
    }
}
