use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Feed, chat and notifications from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name (backend project + stored session)
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Output listings as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in and out of the backend
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Show the global feed or a user's posts
    Feed {
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: usize,
        /// Posts per page
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only posts by this user
        #[arg(long, value_name = "ID")]
        user: Option<String>,
    },
    /// Publish a post
    Post {
        /// Post body
        body: Vec<String>,
    },
    /// Like a post
    Like {
        post_id: String,
    },
    /// Remove your like from a post
    Unlike {
        post_id: String,
    },
    /// Show comments on a post
    Comments {
        post_id: String,
        /// Sort order
        #[arg(long, value_enum, default_value_t = CommentSort::Newest)]
        sort: CommentSort,
    },
    /// Comment on a post
    Comment {
        post_id: String,
        /// Comment text
        text: Vec<String>,
    },
    /// Conversations and messages
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Notification inbox
    Notifications {
        #[command(subcommand)]
        command: Option<NotificationCommands>,
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },
    /// Friends and friend requests
    Friends {
        #[command(subcommand)]
        command: FriendCommands,
    },
    /// Find, show and edit profiles
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Unread and pending counts
    Badges {
        /// Keep running and print counts as they change
        #[arg(long)]
        watch: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CommentSort {
    Newest,
    Oldest,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Optional bootstrap manifest URL (e.g. <https://api.example.com/v1/bootstrap>)
        #[arg(long, value_name = "URL")]
        bootstrap_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show,
    /// Make a profile the active one
    Use {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with email/password and store session in keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Logout profile and clear stored session
    Logout,
}

#[derive(Subcommand)]
pub enum ChatCommands {
    /// List conversations
    List,
    /// Open (or create) the conversation with a user
    Open {
        user_id: String,
    },
    /// Print the messages of a conversation
    History {
        conversation_id: String,
    },
    /// Send a message
    Send {
        conversation_id: String,
        /// Message text
        text: Vec<String>,
    },
    /// Live chat: type lines to send, incoming messages appear as they arrive
    Watch {
        conversation_id: String,
    },
    /// Mark every incoming message as read
    ReadAll,
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Mark one notification as read
    Read {
        id: String,
    },
    /// Mark every notification as read
    ReadAll,
}

#[derive(Subcommand)]
pub enum FriendCommands {
    /// List friends
    List,
    /// Pending incoming and outgoing requests
    Requests,
    /// Relationship with a user
    Status {
        user_id: String,
    },
    /// Send a friend request
    Add {
        user_id: String,
    },
    /// Accept a friend request
    Accept {
        request_id: String,
    },
    /// Reject a friend request
    Reject {
        request_id: String,
    },
    /// Remove a friend
    Remove {
        user_id: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Search users by username
    Search {
        query: String,
    },
    /// Show a profile
    Show {
        user_id: String,
    },
    /// Update your profile
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// Avatar URL (http or https)
        #[arg(long, value_name = "URL")]
        image: Option<String>,
    },
}
