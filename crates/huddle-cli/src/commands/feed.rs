use chrono::Utc;
use huddle_core::models::{Post, UserId};
use huddle_core::views::FeedPager;
use serde::Serialize;

use crate::commands::common::{
    format_relative_time, normalize_identifier, open_session, preview, print_json, resolve_text,
    Session,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PostListItem {
    pub id: String,
    pub author: String,
    pub preview: String,
    pub body: String,
    pub created_at: String,
    pub relative_time: String,
    pub like_count: usize,
    pub comment_count: usize,
    pub liked: bool,
}

pub async fn run_feed(
    pages: usize,
    limit: usize,
    user: Option<&str>,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let session = open_session(global_profile, false).await?;
    let user = user
        .map(|id| normalize_identifier(id, "User ID").map(UserId::new))
        .transpose()?;

    let mut pager = FeedPager::new(limit);
    while pager.next_page() < pages.max(1) && pager.has_more() {
        let page = load_page(&session, user.as_ref(), pager.next_page(), pager.page_size()).await?;
        pager.append(page);
    }

    let viewer = session.auth.as_ref().map(|auth| auth.user_id().clone());
    if as_json {
        let items = pager
            .posts()
            .iter()
            .map(|post| post_to_list_item(post, viewer.as_ref()))
            .collect::<Vec<_>>();
        return print_json(&items);
    }

    if pager.posts().is_empty() {
        println!("No posts yet.");
        return Ok(());
    }
    for line in format_post_lines(pager.posts(), viewer.as_ref()) {
        println!("{line}");
    }
    if pager.has_more() {
        println!("More posts available: rerun with --pages {}", pager.next_page() + 1);
    }
    Ok(())
}

pub async fn run_post(body: &[String], global_profile: Option<&str>) -> Result<(), CliError> {
    let body = resolve_text(body)?;
    let session = open_session(global_profile, true).await?;
    let post = session.services.posts.create_post(&body).await?;
    println!("Posted {}", post.id);
    Ok(())
}

async fn load_page(
    session: &Session,
    user: Option<&UserId>,
    page: usize,
    limit: usize,
) -> Result<Vec<Post>, CliError> {
    let posts = match user {
        Some(user_id) => session.services.posts.user_posts(user_id, page, limit).await?,
        None => session.services.posts.feed(page, limit).await?,
    };
    Ok(posts)
}

pub fn format_post_lines(posts: &[Post], viewer: Option<&UserId>) -> Vec<String> {
    let now = Utc::now();
    posts
        .iter()
        .map(|post| {
            let liked = viewer.is_some_and(|viewer| post.is_liked_by(viewer));
            format!(
                "{}  {:<16}  {:<48}  {:<8}  {}{} {}c",
                post.id,
                post.author.username,
                preview(&post.body, 48),
                format_relative_time(post.created_at, now),
                post.like_count(),
                if liked { "*" } else { "" },
                post.comment_count()
            )
        })
        .collect()
}

pub fn post_to_list_item(post: &Post, viewer: Option<&UserId>) -> PostListItem {
    PostListItem {
        id: post.id.to_string(),
        author: post.author.username.clone(),
        preview: preview(&post.body, 80),
        body: post.body.clone(),
        created_at: post.created_at.to_rfc3339(),
        relative_time: format_relative_time(post.created_at, Utc::now()),
        like_count: post.like_count(),
        comment_count: post.comment_count(),
        liked: viewer.is_some_and(|viewer| post.is_liked_by(viewer)),
    }
}
