//! Paged feed

use std::collections::HashSet;

use crate::models::{Post, PostId};

/// Offset-paged feed, newest first.
///
/// Posts inserted between page loads shift later pages, so an appended page
/// may repeat posts already shown; those are dropped by id.
#[derive(Debug, Clone)]
pub struct FeedPager {
    page_size: usize,
    next_page: usize,
    posts: Vec<Post>,
    shown: HashSet<PostId>,
    has_more: bool,
}

impl FeedPager {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            next_page: 0,
            posts: Vec::new(),
            shown: HashSet::new(),
            has_more: true,
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index of the page to request next.
    #[must_use]
    pub const fn next_page(&self) -> usize {
        self.next_page
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Append the page fetched for [`Self::next_page`]. Returns how many
    /// posts were new.
    pub fn append(&mut self, page: Vec<Post>) -> usize {
        if page.len() < self.page_size {
            self.has_more = false;
        }
        self.next_page += 1;

        let before = self.posts.len();
        for post in page {
            if self.shown.insert(post.id.clone()) {
                self.posts.push(post);
            }
        }
        let added = self.posts.len() - before;
        tracing::debug!(page = self.next_page - 1, added, "feed page appended");
        added
    }

    /// Replace everything with a fresh first page.
    pub fn refresh(&mut self, first_page: Vec<Post>) {
        self.next_page = 0;
        self.posts.clear();
        self.shown.clear();
        self.has_more = true;
        self.append(first_page);
    }

    /// Swap in a refetched row for a post already shown.
    pub fn replace(&mut self, post: Post) -> bool {
        match self.posts.iter_mut().find(|shown| shown.id == post.id) {
            Some(slot) => {
                *slot = post;
                true
            }
            None => false,
        }
    }
}
