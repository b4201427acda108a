use chrono::Utc;
use huddle_core::models::{Comment, CommentOrder, PostId};
use huddle_core::reconcile::{LikeAction, LikeRequest, LikeResult};
use huddle_core::views::{CommentThread, Completion, PostCard};

use crate::cli::CommentSort;
use crate::commands::common::{
    format_rows, normalize_identifier, open_session, print_json, resolve_text, Session,
};
use crate::error::CliError;

impl From<CommentSort> for CommentOrder {
    fn from(sort: CommentSort) -> Self {
        match sort {
            CommentSort::Newest => Self::Newest,
            CommentSort::Oldest => Self::Oldest,
        }
    }
}

/// Like (`want_liked = true`) or unlike a post. Already in the requested
/// state is not an error.
pub async fn run_like(
    post_id: &str,
    want_liked: bool,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let post_id = PostId::new(normalize_identifier(post_id, "Post ID")?);
    let session = open_session(global_profile, true).await?;
    let post = session
        .services
        .posts
        .post(&post_id)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("post {post_id}")))?;

    let mut card = PostCard::new(post, Some(session.viewer()?.clone()));
    if card.is_liked() == want_liked {
        println!(
            "Post {post_id} is already {} ({} likes)",
            if want_liked { "liked" } else { "not liked" },
            card.like_count()
        );
        return Ok(());
    }

    let request = card.toggle_like()?;
    match send_like(&session, &request).await {
        Ok(result) => {
            let completion = card.complete_like(request.token, Ok(result));
            tracing::debug!(?completion, "Like mutation completed");
        }
        Err(error) => {
            card.complete_like(
                request.token,
                Err(huddle_core::Error::Backend(error.to_string())),
            );
            return Err(error);
        }
    }

    println!(
        "{} post {} ({} likes)",
        if card.is_liked() { "Liked" } else { "Unliked" },
        post_id,
        card.like_count()
    );
    Ok(())
}

async fn send_like(session: &Session, request: &LikeRequest) -> Result<LikeResult, CliError> {
    let posts = &session.services.posts;
    let result = match request.action {
        LikeAction::Like => LikeResult::Liked(posts.like(&request.post_id).await?),
        LikeAction::Unlike => LikeResult::Unliked(posts.unlike(&request.post_id).await?),
    };
    Ok(result)
}

pub async fn run_comments(
    post_id: &str,
    sort: CommentSort,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let post_id = PostId::new(normalize_identifier(post_id, "Post ID")?);
    let session = open_session(global_profile, false).await?;
    let order = CommentOrder::from(sort);
    let comments = session.services.posts.comments(&post_id, order).await?;

    if as_json {
        return print_json(&comments);
    }

    let mut thread = CommentThread::new(
        post_id,
        session.auth.as_ref().map(|auth| auth.user_id().clone()),
        None,
        order,
    );
    thread.load(comments);
    if thread.comments().is_empty() {
        println!("No comments yet.");
        return Ok(());
    }
    for line in format_rows(
        thread.comments().rows(),
        |comment: &Comment| comment.created_at,
        Utc::now(),
    ) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_comment(
    post_id: &str,
    text: &[String],
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let post_id = PostId::new(normalize_identifier(post_id, "Post ID")?);
    let text = resolve_text(text)?;
    let session = open_session(global_profile, true).await?;
    let viewer = session.viewer()?.clone();
    let viewer_profile = session.services.profiles.summary(&viewer).await?;

    let mut thread = CommentThread::new(
        post_id.clone(),
        Some(viewer),
        viewer_profile,
        CommentOrder::Newest,
    );
    thread.set_draft(text);
    let outgoing = thread.begin_comment()?.ok_or(CliError::EmptyContent)?;

    let result = session
        .services
        .posts
        .add_comment(&post_id, &outgoing.content, Some(outgoing.temp_id))
        .await;
    match result {
        Ok(comment) => {
            let comment_id = comment.id.clone();
            if thread.complete_comment(outgoing.temp_id, Ok(comment)) == Completion::Applied {
                println!("Commented on post {post_id} ({comment_id})");
            }
            Ok(())
        }
        Err(error) => {
            thread.complete_comment(
                outgoing.temp_id,
                Err(huddle_core::Error::Backend(error.to_string())),
            );
            Err(error.into())
        }
    }
}
