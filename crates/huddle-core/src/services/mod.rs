//! Typed backend operations per feature.
//!
//! Every service shares one [`ServiceContext`]: the REST client, the signed-in
//! user and the client-ref echo setting.

mod chat;
mod friends;
mod notifications;
mod posts;
mod profiles;

use crate::backend::RestClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::UserId;

pub use chat::{ChatService, MESSAGE_SELECT};
pub use friends::FriendService;
pub use notifications::NotificationService;
pub use posts::{PostService, COMMENT_SELECT, LIKE_SELECT};
pub use profiles::ProfileService;

/// Shared state for the backend services.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    rest: RestClient,
    viewer: Option<UserId>,
    echo_client_ref: bool,
}

impl ServiceContext {
    pub fn new(rest: RestClient, viewer: Option<UserId>, config: &ClientConfig) -> Self {
        Self {
            rest,
            viewer,
            echo_client_ref: config.echo_client_ref,
        }
    }

    #[must_use]
    pub const fn rest(&self) -> &RestClient {
        &self.rest
    }

    #[must_use]
    pub const fn viewer(&self) -> Option<&UserId> {
        self.viewer.as_ref()
    }

    /// The signed-in user, for operations that need one.
    pub fn require_viewer(&self) -> Result<&UserId> {
        self.viewer.as_ref().ok_or(Error::Unauthorized)
    }

    #[must_use]
    pub const fn echo_client_ref(&self) -> bool {
        self.echo_client_ref
    }
}

/// All feature services over one context.
#[derive(Debug, Clone)]
pub struct Services {
    pub chat: ChatService,
    pub posts: PostService,
    pub notifications: NotificationService,
    pub friends: FriendService,
    pub profiles: ProfileService,
}

impl Services {
    #[must_use]
    pub fn new(context: &ServiceContext) -> Self {
        Self {
            chat: ChatService::new(context.clone()),
            posts: PostService::new(context.clone()),
            notifications: NotificationService::new(context.clone()),
            friends: FriendService::new(context.clone()),
            profiles: ProfileService::new(context.clone()),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context(viewer: Option<&str>) -> ServiceContext {
    let config = ClientConfig::new("http://127.0.0.1:9", "anon");
    let rest = RestClient::new(&config).unwrap_or_else(|error| panic!("{error}"));
    ServiceContext::new(rest, viewer.map(UserId::new), &config)
}
