use std::{num::NonZeroU32, sync::Arc, time::Duration};

use blogdesk::{
    application::{
        actions::PostActions,
        api::{BlogApi, ClientError, PostForm},
        pagination::PageLink,
        query::{CategoryFilter, ListQuery, SortOrder},
        store::PostStore,
    },
    config::ApiSettings,
    domain::{
        posts::{Category, Keywords, PostId},
        uploads::{ImageFile, validate_image},
    },
    infra::http::HttpBlogClient,
};
use httpmock::MockServer;
use serde_json::json;
use url::Url;

fn client(server: &MockServer, token: Option<&str>) -> HttpBlogClient {
    let settings = ApiSettings {
        base_url: Url::parse(&server.base_url()).expect("mock url"),
        collection_path: "api/blogs".into(),
        token: token.map(str::to_string),
        page_limit: NonZeroU32::new(9).expect("non-zero"),
        timeout: Duration::from_secs(5),
    };
    HttpBlogClient::new(&settings).expect("client")
}

fn blog(id: &str, title: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "title": title,
        "content": "<p>body</p>",
        "metaDescription": "meta",
        "imageAltText": "alt",
        "image": {"url": "https://cdn.example.com/a.png", "altText": "alt"},
        "category": "guides",
        "keywords": ["rust"],
        "featured": false,
        "author": {"firstName": "Ada", "lastName": "Lovelace"},
        "publishedAt": "2024-05-01T09:30:00Z",
        "slug": title.to_lowercase().replace(' ', "-")
    })
}

fn form() -> PostForm {
    let mut keywords = Keywords::new();
    keywords.insert("rust").expect("keyword");
    keywords.insert("async").expect("keyword");
    PostForm {
        title: "Hello world".into(),
        content: "<p>hi</p>".into(),
        meta_description: "greeting".into(),
        image_alt_text: "wave".into(),
        category: Category::News,
        featured: true,
        keywords,
        image: None,
    }
}

#[tokio::test]
async fn list_sends_filters_and_parses_envelope() -> Result<(), ClientError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/blogs")
            .query_param("page", "2")
            .query_param("limit", "9")
            .query_param("searchTerm", "rust")
            .query_param("category", "tips")
            .query_param("sortBy", "oldest");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": {
                    "blogs": [blog("1", "First"), blog("2", "Second")],
                    "pagination": {"totalItems": 40, "totalPages": 5, "currentPage": 2}
                }
            }));
    });

    let query = ListQuery {
        page: 2,
        limit: 9,
        search_term: "rust".into(),
        category: CategoryFilter::Only(Category::Tips),
        sort: SortOrder::Oldest,
    };
    let page = client(&server, None).list(&query).await?;
    mock.assert();

    assert_eq!(page.posts.len(), 2);
    assert_eq!(page.posts[0].id, PostId::new("1"));
    assert_eq!(
        page.posts[0].author.as_ref().map(|author| author.full_name()),
        Some("Ada Lovelace".to_string())
    );
    assert_eq!(page.pagination.total_pages, 5);
    assert_eq!(
        page.pagination.window(),
        (1..=5).map(PageLink::Page).collect::<Vec<_>>()
    );
    Ok(())
}

#[tokio::test]
async fn get_by_slug_maps_404_to_not_found() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/blogs/missing-post");
        then.status(404)
            .header("content-type", "application/json")
            .json_body(json!({"message": "Blog not found"}));
    });

    let err = client(&server, None)
        .get_by_slug("missing-post")
        .await
        .expect_err("404");
    mock.assert();
    assert_eq!(
        err,
        ClientError::NotFound {
            message: Some("Blog not found".into())
        }
    );
}

#[tokio::test]
async fn create_posts_multipart_with_bearer_token() -> Result<(), ClientError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/blogs")
            .header("authorization", "Bearer secret")
            .body_includes("name=\"title\"")
            .body_includes("Hello world")
            .body_includes("name=\"metaDescription\"")
            .body_includes("[\"rust\",\"async\"]")
            .body_includes("name=\"image\"; filename=\"cover.png\"");
        then.status(201)
            .header("content-type", "application/json")
            .json_body(json!({"data": {"blog": blog("99", "Hello world")}}));
    });

    let mut form = form();
    let file = ImageFile::new("cover.png", Some("image/png".into()), vec![0x89, b'P', b'N', b'G']);
    form.image = Some(validate_image(file, 1024).expect("valid image"));

    let created = client(&server, Some("secret")).create(&form).await?;
    mock.assert();
    assert_eq!(created.id.as_str(), "99");
    assert_eq!(created.slug, "hello-world");
    Ok(())
}

#[tokio::test]
async fn update_puts_to_member_url() -> Result<(), ClientError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("PUT")
            .path("/api/blogs/42")
            .body_includes("name=\"featured\"");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"data": {"blog": blog("42", "Renamed")}}));
    });

    let updated = client(&server, Some("secret"))
        .update(&PostId::new("42"), &form())
        .await?;
    mock.assert();
    assert_eq!(updated.title, "Renamed");
    Ok(())
}

#[tokio::test]
async fn delete_accepts_empty_body() -> Result<(), ClientError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("DELETE")
            .path("/api/blogs/42")
            .header("authorization", "Bearer secret");
        then.status(204);
    });

    client(&server, Some("secret"))
        .delete(&PostId::new("42"))
        .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/blogs/broken");
        then.status(200)
            .header("content-type", "application/json")
            .body("{\"data\": {}}");
    });

    let err = client(&server, None)
        .get_by_slug("broken")
        .await
        .expect_err("decode");
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn store_records_server_message_on_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/blogs");
        then.status(500)
            .header("content-type", "application/json")
            .json_body(json!({"error": "database offline"}));
    });

    let actions = PostActions::new(Arc::new(client(&server, None)), PostStore::new());
    let query = ListQuery {
        page: 1,
        limit: 9,
        search_term: String::new(),
        category: CategoryFilter::All,
        sort: SortOrder::Newest,
    };
    let err = actions.list(&query).await.expect_err("500");
    assert!(matches!(err, ClientError::Server { status: 500, .. }));

    let state = actions.store().snapshot();
    assert_eq!(state.error.as_deref(), Some("database offline"));
    assert!(!state.is_loading);
    assert!(state.posts.is_empty());
}

#[tokio::test]
async fn store_falls_back_to_default_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("DELETE").path("/api/blogs/7");
        then.status(502).body("<html>bad gateway</html>");
    });

    let actions = PostActions::new(Arc::new(client(&server, None)), PostStore::new());
    actions
        .delete(&PostId::new("7"))
        .await
        .expect_err("502");

    let state = actions.store().snapshot();
    assert_eq!(state.error.as_deref(), Some("Failed to delete blog"));
}

#[tokio::test]
async fn detail_with_mirrored_id_decodes() -> Result<(), ClientError> {
    let server = MockServer::start();
    let mut body = blog("65f0c1", "Mirrored");
    body["id"] = json!("65f0c1");
    server.mock(|when, then| {
        when.method("GET").path("/api/blogs/mirrored");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"data": {"blog": body}}));
    });

    let post = client(&server, None).get_by_slug("mirrored").await?;
    assert_eq!(post.id, PostId::new("65f0c1"));
    Ok(())
}
