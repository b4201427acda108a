//! Friend requests and friendships

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ServiceContext;
use crate::backend::TableQuery;
use crate::error::{Error, Result};
use crate::models::{
    FriendRequest, FriendRequestId, FriendRequestStatus, Friendship, FriendshipStatus, Profile,
    UserId,
};
use crate::util::now;

#[derive(Debug, Serialize)]
struct NewFriendRequest<'a> {
    requester_id: &'a UserId,
    addressee_id: &'a UserId,
    status: FriendRequestStatus,
}

#[derive(Debug, Deserialize)]
struct RequestIdRow {
    id: FriendRequestId,
}

/// Envelope returned by `accept_friend_request_v2`
#[derive(Debug, Deserialize)]
struct RpcOutcome {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// `or` filter matching a pair of columns in either direction.
fn either_direction(left: &str, right: &str, a: &UserId, b: &UserId) -> String {
    format!("and({left}.eq.{a},{right}.eq.{b}),and({left}.eq.{b},{right}.eq.{a})")
}

#[derive(Debug, Clone)]
pub struct FriendService {
    context: ServiceContext,
}

impl FriendService {
    pub const fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Relationship between the signed-in user and `target`.
    pub async fn status(&self, target: &UserId) -> Result<FriendshipStatus> {
        let Some(viewer) = self.context.viewer() else {
            return Ok(FriendshipStatus::None);
        };
        let rest = self.context.rest();

        let friendship = TableQuery::new("friendships")
            .select("*")
            .or(either_direction("user_id_a", "user_id_b", viewer, target))
            .limit(1);
        let friendships: Vec<Friendship> = rest.fetch(&friendship).await?;
        if !friendships.is_empty() {
            return Ok(FriendshipStatus::Friends);
        }

        if let Some(sent) = self.pending_between(viewer, target).await? {
            return Ok(FriendshipStatus::RequestSent(sent.id));
        }
        if let Some(received) = self.pending_between(target, viewer).await? {
            return Ok(FriendshipStatus::RequestReceived(received.id));
        }
        Ok(FriendshipStatus::None)
    }

    pub async fn send_request(&self, addressee: &UserId) -> Result<FriendRequest> {
        let requester = self.context.require_viewer()?;
        if requester == addressee {
            return Err(Error::InvalidInput(
                "cannot send a friend request to yourself".to_string(),
            ));
        }

        let existing = TableQuery::new("friend_requests")
            .select("id")
            .or(either_direction(
                "requester_id",
                "addressee_id",
                requester,
                addressee,
            ))
            .is_in("status", ["pending", "accepted"]);
        let existing: Vec<RequestIdRow> = self.context.rest().fetch(&existing).await?;
        if !existing.is_empty() {
            return Err(Error::InvalidInput(
                "Request already exists or you are already friends.".to_string(),
            ));
        }

        let row = NewFriendRequest {
            requester_id: requester,
            addressee_id: addressee,
            status: FriendRequestStatus::Pending,
        };
        let target = TableQuery::new("friend_requests").select("*");
        self.context.rest().insert_one(&target, &row).await
    }

    /// Accept atomically: the request is updated and the friendship created
    /// in one database call.
    pub async fn accept(&self, request_id: &FriendRequestId) -> Result<Option<Value>> {
        let outcome: RpcOutcome = self
            .context
            .rest()
            .rpc(
                "accept_friend_request_v2",
                &serde_json::json!({ "p_request_id": request_id }),
            )
            .await?;
        if !outcome.success {
            return Err(Error::Backend(outcome.error.unwrap_or_else(|| {
                "Failed to accept friend request".to_string()
            })));
        }
        Ok(outcome.data)
    }

    pub async fn reject(&self, request_id: &FriendRequestId) -> Result<FriendRequest> {
        let query = TableQuery::new("friend_requests")
            .select("*")
            .eq("id", request_id);
        let body = serde_json::json!({
            "status": FriendRequestStatus::Rejected,
            "updated_at": now(),
        });
        let updated: Vec<FriendRequest> = self.context.rest().update(&query, &body).await?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("friend request {request_id}")))
    }

    /// Returns `false` when there was no friendship to remove.
    pub async fn remove(&self, other: &UserId) -> Result<bool> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("friendships")
            .or(either_direction("user_id_a", "user_id_b", viewer, other));
        let removed: Vec<Friendship> = self.context.rest().delete(&query).await?;
        Ok(!removed.is_empty())
    }

    /// Ids of the signed-in user's friends.
    pub async fn friend_ids(&self) -> Result<Vec<UserId>> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("friendships")
            .select("*")
            .or(format!("user_id_a.eq.{viewer},user_id_b.eq.{viewer}"));
        let rows: Vec<Friendship> = self.context.rest().fetch(&query).await?;
        Ok(rows.iter().map(|row| row.other(viewer).clone()).collect())
    }

    pub async fn friends(&self) -> Result<Vec<Profile>> {
        let ids = self.friend_ids().await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = TableQuery::new("profiles")
            .select("*")
            .is_in("id", &ids)
            .order("username", true);
        self.context.rest().fetch(&query).await
    }

    pub async fn incoming_requests(&self) -> Result<Vec<FriendRequest>> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("friend_requests")
            .select("*")
            .eq("addressee_id", viewer)
            .eq("status", "pending");
        self.context.rest().fetch(&query).await
    }

    pub async fn outgoing_requests(&self) -> Result<Vec<FriendRequest>> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("friend_requests")
            .select("*")
            .eq("requester_id", viewer)
            .eq("status", "pending");
        self.context.rest().fetch(&query).await
    }

    pub async fn pending_request_count(&self) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("friend_requests")
            .select("id")
            .eq("addressee_id", viewer)
            .eq("status", "pending");
        self.context.rest().count_exact(&query).await
    }

    async fn pending_between(
        &self,
        requester: &UserId,
        addressee: &UserId,
    ) -> Result<Option<RequestIdRow>> {
        let query = TableQuery::new("friend_requests")
            .select("id")
            .eq("requester_id", requester)
            .eq("addressee_id", addressee)
            .eq("status", "pending")
            .limit(1);
        let rows: Vec<RequestIdRow> = self.context.rest().fetch(&query).await?;
        Ok(rows.into_iter().next())
    }
}
