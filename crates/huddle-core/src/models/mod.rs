//! Data models for Huddle

mod comment;
mod friend;
mod ids;
mod message;
mod notification;
mod post;
mod profile;

pub use comment::{Comment, CommentOrder};
pub use friend::{FriendRequest, FriendRequestStatus, Friendship, FriendshipStatus};
pub use ids::{
    CommentId, ConversationId, FriendRequestId, LikeId, MessageId, NotificationId, PostId,
    TempId, UserId,
};
pub use message::{Conversation, DeliveryStatus, LastMessage, Message, Participant};
pub use notification::{Notification, NotificationKind, PostExcerpt, NOTIFICATION_SELECT};
pub use post::{Post, PostLike, POST_SELECT};
pub use profile::{Profile, ProfileSummary, ProfileUpdate};

pub(crate) use post::{NewPost, PostRow};
