//! Async actions: each runs one remote call and folds its outcome into the store.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::posts::{Post, PostId};

use super::api::{BlogApi, ClientError, PostForm};
use super::query::ListQuery;
use super::store::{Operation, PostPage, PostStore, StoreEvent};

const SOURCE: &str = "application::actions";

pub struct PostActions<A: ?Sized> {
    api: Arc<A>,
    store: PostStore,
}

impl<A: ?Sized> Clone for PostActions<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: self.store.clone(),
        }
    }
}

impl<A> PostActions<A>
where
    A: BlogApi + ?Sized,
{
    pub fn new(api: Arc<A>, store: PostStore) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub async fn list(&self, query: &ListQuery) -> Result<PostPage, ClientError> {
        self.run(Operation::List, self.api.list(query), |page| {
            StoreEvent::Listed(page.clone())
        })
        .await
    }

    pub async fn fetch_by_slug(&self, slug: &str) -> Result<Post, ClientError> {
        self.run(Operation::Detail, self.api.get_by_slug(slug), |post| {
            StoreEvent::Loaded(post.clone())
        })
        .await
    }

    pub async fn create(&self, form: &PostForm) -> Result<Post, ClientError> {
        self.run(Operation::Create, self.api.create(form), |post| {
            StoreEvent::Created(post.clone())
        })
        .await
    }

    pub async fn update(&self, id: &PostId, form: &PostForm) -> Result<Post, ClientError> {
        self.run(Operation::Update, self.api.update(id, form), |post| {
            StoreEvent::Updated(post.clone())
        })
        .await
    }

    /// Removes the post from the local page; no re-fetch is issued.
    pub async fn delete(&self, id: &PostId) -> Result<(), ClientError> {
        self.run(Operation::Delete, self.api.delete(id), |_| {
            StoreEvent::Deleted(id.clone())
        })
        .await
    }

    async fn run<T, F>(
        &self,
        operation: Operation,
        call: F,
        on_success: impl FnOnce(&T) -> StoreEvent,
    ) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        self.store.apply(StoreEvent::Started(operation));
        match call.await {
            Ok(value) => {
                debug!(source = SOURCE, %operation, "remote operation succeeded");
                self.store.apply(on_success(&value));
                Ok(value)
            }
            Err(err) => {
                warn!(source = SOURCE, %operation, error = %err, "remote operation failed");
                self.store.apply(StoreEvent::Failed {
                    operation,
                    message: err.payload_message(),
                });
                Err(err)
            }
        }
    }
}
