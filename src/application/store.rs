//! Shared post state and the reducer that advances it.
//!
//! [`PostState::reduce`] is the only way the state changes. Each event carries
//! the outcome of one remote operation; failures never touch the collection.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::trace;

use crate::domain::posts::{Post, PostId};

use super::lock::{rw_read, rw_write};
use super::pagination::Pagination;

const SOURCE: &str = "application::store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Detail,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Detail => "detail",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Message stored when a failure carries no usable text of its own.
    pub fn default_failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch blogs",
            Operation::Detail => "Failed to fetch blog",
            Operation::Create => "Failed to create blog",
            Operation::Update => "Failed to update blog",
            Operation::Delete => "Failed to delete blog",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of posts as returned by a list request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Started(Operation),
    Listed(PostPage),
    Loaded(Post),
    Created(Post),
    Updated(Post),
    Deleted(PostId),
    Failed {
        operation: Operation,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostState {
    pub posts: Vec<Post>,
    pub current_post: Option<Post>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub pagination: Option<Pagination>,
}

impl PostState {
    pub fn reduce(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Started(operation) => {
                self.is_loading = true;
                self.error = None;
                if operation == Operation::Detail {
                    self.current_post = None;
                }
            }
            StoreEvent::Listed(page) => {
                self.posts = page.posts;
                self.pagination = Some(page.pagination);
                self.is_loading = false;
            }
            StoreEvent::Loaded(post) => {
                self.current_post = Some(post);
                self.is_loading = false;
            }
            StoreEvent::Created(post) => {
                self.posts.push(post);
                self.is_loading = false;
            }
            StoreEvent::Updated(post) => {
                if let Some(current) = self.current_post.as_mut()
                    && current.id == post.id
                {
                    *current = post.clone();
                }
                if let Some(existing) = self.posts.iter_mut().find(|item| item.id == post.id) {
                    *existing = post;
                }
                self.is_loading = false;
            }
            StoreEvent::Deleted(id) => {
                self.posts.retain(|post| post.id != id);
                if self
                    .current_post
                    .as_ref()
                    .is_some_and(|current| current.id == id)
                {
                    self.current_post = None;
                }
                self.is_loading = false;
            }
            StoreEvent::Failed { operation, message } => {
                self.is_loading = false;
                self.error = Some(
                    message
                        .map(|text| text.trim().to_string())
                        .filter(|text| !text.is_empty())
                        .unwrap_or_else(|| operation.default_failure_message().to_string()),
                );
            }
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination.map_or(0, |pagination| pagination.total_pages)
    }
}

/// Cloneable handle to the shared [`PostState`].
#[derive(Debug, Clone, Default)]
pub struct PostStore {
    inner: Arc<RwLock<PostState>>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: StoreEvent) {
        trace!(source = SOURCE, ?event, "applying store event");
        rw_write(&self.inner, SOURCE, "apply").reduce(event);
    }

    pub fn snapshot(&self) -> PostState {
        rw_read(&self.inner, SOURCE, "snapshot").clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&PostState) -> R) -> R {
        f(&rw_read(&self.inner, SOURCE, "read"))
    }

    pub fn total_pages(&self) -> u32 {
        self.read(PostState::total_pages)
    }
}
