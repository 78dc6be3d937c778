//! reqwest-backed [`BlogApi`] talking to the blog collection REST endpoint.

use std::time::Instant;

use async_trait::async_trait;
use blogdesk_api_types::{BlogData, BlogListData, Envelope, ErrorBody, form};
use metrics::{counter, histogram};
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode, Url,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::api::{BlogApi, ClientError, PostForm};
use crate::application::pagination::Pagination;
use crate::application::query::ListQuery;
use crate::application::store::{Operation, PostPage};
use crate::config::ApiSettings;
use crate::domain::posts::{Post, PostId};

use super::error::InfraError;

const SOURCE: &str = "infra::http";
pub(crate) const METRIC_API_REQUESTS: &str = "blogdesk_api_requests_total";
pub(crate) const METRIC_API_REQUEST_MS: &str = "blogdesk_api_request_ms";

#[derive(Debug, Clone)]
pub struct HttpBlogClient {
    client: Client,
    collection: Url,
    token: Option<String>,
}

impl HttpBlogClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(InfraError::ClientBuild)?;
        let collection = collection_url(&settings.base_url, &settings.collection_path)?;
        Ok(Self {
            client,
            collection,
            token: settings.token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("blogdesk/", env!("CARGO_PKG_VERSION"))
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    fn member_url(&self, segment: &str) -> Result<Url, ClientError> {
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest("collection URL cannot be a base".into()))?
            .push(segment);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, authorized: bool) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match (authorized, self.token.as_deref()) {
            (true, Some(token)) => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn send(
        &self,
        operation: Operation,
        builder: RequestBuilder,
    ) -> Result<Response, ClientError> {
        let started = Instant::now();
        let result = builder.send().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_API_REQUEST_MS, "operation" => operation.as_str()).record(elapsed_ms);

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                record_outcome(operation, "transport_error");
                warn!(source = SOURCE, %operation, error = %err, "request failed to complete");
                return Err(ClientError::transport(err));
            }
        };

        let status = response.status();
        debug!(
            source = SOURCE,
            %operation,
            url = %response.url(),
            status = status.as_u16(),
            elapsed_ms,
            "request completed"
        );

        if status.is_success() {
            record_outcome(operation, "success");
            return Ok(response);
        }

        record_outcome(operation, "http_error");
        Err(failure(status, response).await)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: Operation,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(operation, builder).await?;
        let bytes = response.bytes().await.map_err(ClientError::transport)?;
        serde_json::from_slice(&bytes).map_err(|err| {
            warn!(source = SOURCE, %operation, error = %err, "response body did not decode");
            ClientError::decode(err)
        })
    }

    async fn fetch_post(
        &self,
        operation: Operation,
        builder: RequestBuilder,
    ) -> Result<Post, ClientError> {
        let envelope: Envelope<BlogData> = self.fetch(operation, builder).await?;
        Post::try_from(envelope.data.blog).map_err(ClientError::decode)
    }
}

#[async_trait]
impl BlogApi for HttpBlogClient {
    async fn list(&self, query: &ListQuery) -> Result<PostPage, ClientError> {
        let mut url = self.collection.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.query_pairs() {
                pairs.append_pair(key, &value);
            }
        }

        let builder = self.request(Method::GET, url, false);
        let envelope: Envelope<BlogListData> = self.fetch(Operation::List, builder).await?;
        let BlogListData { blogs, pagination } = envelope.data;

        let posts = blogs
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ClientError::decode)?;

        Ok(PostPage {
            posts,
            pagination: Pagination::from(pagination),
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Post, ClientError> {
        let url = self.member_url(slug)?;
        let builder = self.request(Method::GET, url, false);
        self.fetch_post(Operation::Detail, builder).await
    }

    async fn create(&self, post: &PostForm) -> Result<Post, ClientError> {
        let builder = self
            .request(Method::POST, self.collection.clone(), true)
            .multipart(multipart(post)?);
        self.fetch_post(Operation::Create, builder).await
    }

    async fn update(&self, id: &PostId, post: &PostForm) -> Result<Post, ClientError> {
        let url = self.member_url(id.as_str())?;
        let builder = self
            .request(Method::PUT, url, true)
            .multipart(multipart(post)?);
        self.fetch_post(Operation::Update, builder).await
    }

    async fn delete(&self, id: &PostId) -> Result<(), ClientError> {
        let url = self.member_url(id.as_str())?;
        let builder = self.request(Method::DELETE, url, true);
        self.send(Operation::Delete, builder).await.map(|_| ())
    }
}

fn collection_url(base: &Url, path: &str) -> Result<Url, InfraError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| InfraError::BaseUrl { base: base.clone() })?;
        segments.pop_if_empty();
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
    }
    Ok(url)
}

fn multipart(post: &PostForm) -> Result<Form, ClientError> {
    let mut body = Form::new()
        .text(form::TITLE, post.title.clone())
        .text(form::CONTENT, post.content.clone())
        .text(form::META_DESCRIPTION, post.meta_description.clone())
        .text(form::IMAGE_ALT_TEXT, post.image_alt_text.clone())
        .text(form::CATEGORY, post.category.as_str())
        .text(form::FEATURED, post.featured.to_string())
        .text(form::KEYWORDS, post.keywords_json()?);

    if let Some(image) = post.image.as_ref() {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(image.kind.mime())
            .map_err(|err| ClientError::InvalidRequest(format!("image part: {err}")))?;
        body = body.part(form::IMAGE, part);
    }

    Ok(body)
}

async fn failure(status: StatusCode, response: Response) -> ClientError {
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message);
    warn!(
        source = SOURCE,
        status = status.as_u16(),
        body = %text,
        "server rejected request"
    );

    if status == StatusCode::NOT_FOUND {
        ClientError::NotFound { message }
    } else {
        ClientError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

fn record_outcome(operation: Operation, outcome: &'static str) {
    counter!(
        METRIC_API_REQUESTS,
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
