//! Feed, posts, likes and comments

use serde::Serialize;

use super::ServiceContext;
use crate::backend::TableQuery;
use crate::error::{Error, Result};
use crate::models::{
    Comment, CommentOrder, LikeId, NewPost, Post, PostId, PostLike, PostRow, TempId, UserId,
    POST_SELECT,
};
use crate::util::normalize_content;

/// Comment columns with the author's profile joined
pub const COMMENT_SELECT: &str =
    "id,post_id,content,created_at,user_id,profiles!user_id(username,image)";

pub const LIKE_SELECT: &str = "id,post_id,user_id,created_at";

#[derive(Debug, Serialize)]
struct NewLike<'a> {
    post_id: &'a PostId,
    user_id: &'a UserId,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    post_id: &'a PostId,
    user_id: &'a UserId,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ref: Option<TempId>,
}

#[derive(Debug, Clone)]
pub struct PostService {
    context: ServiceContext,
}

impl PostService {
    pub const fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// One page of the global feed, newest first.
    pub async fn feed(&self, page: usize, limit: usize) -> Result<Vec<Post>> {
        self.fetch_page(TableQuery::new("posts"), page, limit).await
    }

    /// One page of a user's posts, newest first.
    pub async fn user_posts(&self, user_id: &UserId, page: usize, limit: usize) -> Result<Vec<Post>> {
        self.fetch_page(TableQuery::new("posts").eq("user_id", user_id), page, limit)
            .await
    }

    pub async fn post(&self, post_id: &PostId) -> Result<Option<Post>> {
        let query = TableQuery::new("posts")
            .select(POST_SELECT)
            .eq("id", post_id);
        let row: Option<PostRow> = self.context.rest().fetch_one(&query).await?;
        Ok(row.map(Post::from))
    }

    pub async fn create_post(&self, body: &str) -> Result<Post> {
        let user_id = self.context.require_viewer()?;
        let body = normalize_content(body)
            .ok_or_else(|| Error::InvalidInput("post body must not be empty".to_string()))?;

        let target = TableQuery::new("posts").select(POST_SELECT);
        let row: PostRow = self
            .context
            .rest()
            .insert_one(&target, &NewPost { body: &body, user_id })
            .await?;
        let post = Post::from(row);
        tracing::info!(post_id = %post.id, "Post created");
        Ok(post)
    }

    pub async fn like(&self, post_id: &PostId) -> Result<PostLike> {
        let user_id = self.context.require_viewer()?;
        let target = TableQuery::new("post_likes").select(LIKE_SELECT);
        self.context
            .rest()
            .insert_one(&target, &NewLike { post_id, user_id })
            .await
    }

    /// Remove the viewer's like. Returns the ids of the deleted rows.
    pub async fn unlike(&self, post_id: &PostId) -> Result<Vec<LikeId>> {
        let user_id = self.context.require_viewer()?;
        let query = TableQuery::new("post_likes")
            .select(LIKE_SELECT)
            .eq("post_id", post_id)
            .eq("user_id", user_id);
        let removed: Vec<PostLike> = self.context.rest().delete(&query).await?;
        Ok(removed.into_iter().map(|like| like.id).collect())
    }

    pub async fn comments(&self, post_id: &PostId, order: CommentOrder) -> Result<Vec<Comment>> {
        let query = TableQuery::new("comments")
            .select(COMMENT_SELECT)
            .eq("post_id", post_id)
            .order("created_at", order.ascending());
        self.context.rest().fetch(&query).await
    }

    pub async fn add_comment(
        &self,
        post_id: &PostId,
        content: &str,
        client_ref: Option<TempId>,
    ) -> Result<Comment> {
        let user_id = self.context.require_viewer()?;
        let content = normalize_content(content)
            .ok_or_else(|| Error::InvalidInput("comment must not be empty".to_string()))?;

        let row = NewComment {
            post_id,
            user_id,
            content: &content,
            client_ref: client_ref.filter(|_| self.context.echo_client_ref()),
        };
        let target = TableQuery::new("comments").select(COMMENT_SELECT);
        let mut comment: Comment = self.context.rest().insert_one(&target, &row).await?;
        comment.client_ref = comment.client_ref.or(row.client_ref);
        Ok(comment)
    }

    async fn fetch_page(&self, query: TableQuery, page: usize, limit: usize) -> Result<Vec<Post>> {
        let limit = limit.max(1);
        let from = page.saturating_mul(limit);
        let query = query
            .select(POST_SELECT)
            .order("created_at", false)
            .range(from, from + limit - 1);
        let rows: Vec<PostRow> = self.context.rest().fetch(&query).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_context;

    #[test]
    fn new_comment_carries_client_ref_when_present() {
        let post = PostId::new("p-1");
        let user = UserId::new("u-1");
        let temp = TempId::new();
        let row = NewComment {
            post_id: &post,
            user_id: &user,
            content: "nice",
            client_ref: Some(temp),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["client_ref"], temp.as_string());
        assert_eq!(value["post_id"], "p-1");
    }

    #[tokio::test]
    async fn likes_and_comments_require_a_viewer() {
        let posts = PostService::new(test_context(None));
        let post = PostId::new("p-1");
        assert!(matches!(posts.like(&post).await, Err(Error::Unauthorized)));
        assert!(matches!(posts.unlike(&post).await, Err(Error::Unauthorized)));
        assert!(matches!(
            posts.add_comment(&post, "hi", None).await,
            Err(Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn blank_post_is_rejected() {
        let posts = PostService::new(test_context(Some("u-1")));
        assert!(matches!(
            posts.create_post(" \n ").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
