pub mod auth_cmd;
pub mod badges;
pub mod chat;
pub mod common;
pub mod completions;
pub mod config;
pub mod feed;
pub mod friends;
pub mod live;
pub mod notifications;
pub mod posts;
pub mod users;
