use std::sync::Arc;
use std::time::Duration;

use feedline_api::app::{build_app_with, services::AppServices};
use feedline_api::middleware::IDENTITY_HEADER;
use feedline_core::{ContainerId, IdentityId};
use feedline_events::{Topic, TopicBus};
use feedline_infra::FeedConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let services = Arc::new(AppServices::in_memory(&FeedConfig::default()));
        let app = build_app_with(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_record(
    client: &reqwest::Client,
    server: &TestServer,
    container: ContainerId,
    author: IdentityId,
    n: u32,
) -> Value {
    let res = client
        .post(server.url(&format!("/containers/{container}/records")))
        .header(IDENTITY_HEADER, author.to_string())
        .json(&json!({ "payload": { "n": n } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

/// Read SSE chunks until a frame of the given event type shows up.
async fn read_until_event(res: &mut reqwest::Response, event: &str) -> String {
    let marker = format!("event: {event}");
    let mut buf = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !buf.contains(&marker) {
        let chunk = tokio::time::timeout_at(deadline, res.chunk())
            .await
            .expect("timed out waiting for sse frame")
            .unwrap()
            .expect("stream ended before frame arrived");
        buf.push_str(&String::from_utf8_lossy(&chunk));
    }
    buf
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn listing_requires_identity_and_membership() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let container = ContainerId::new();
    let path = format!("/containers/{container}/records");

    let res = client.get(server.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = client
        .get(server.url(&path))
        .header(IDENTITY_HEADER, IdentityId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_cursor_is_a_bad_request() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (container, member) = (ContainerId::new(), IdentityId::new());
    server.services.grant_membership(container, member);

    let res = client
        .get(server.url(&format!("/containers/{container}/records?first=3&after=abc")))
        .header(IDENTITY_HEADER, member.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_cursor");
}

#[tokio::test]
async fn pages_through_a_container_newest_first() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (container, member) = (ContainerId::new(), IdentityId::new());
    server.services.grant_membership(container, member);

    let mut ids = vec![];
    for n in 0..5 {
        let record = post_record(&client, &server, container, member, n).await;
        ids.push(record["id"].as_u64().unwrap());
    }
    ids.reverse();

    let page = |after: Option<String>| {
        let mut url = server.url(&format!("/containers/{container}/records?first=2"));
        if let Some(after) = after {
            url.push_str(&format!("&after={after}"));
        }
        client
            .get(url)
            .header(IDENTITY_HEADER, member.to_string())
            .send()
    };

    let mut seen = vec![];
    let mut after = None;
    let mut pages = 0;
    loop {
        let res = page(after.clone()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        pages += 1;

        for edge in body["edges"].as_array().unwrap() {
            assert_eq!(edge["cursor"], edge["node"]["id"].to_string());
            seen.push(edge["node"]["id"].as_u64().unwrap());
        }
        assert_eq!(body["pageInfo"]["hasPreviousPage"], false);
        if body["pageInfo"]["hasNextPage"] == false {
            break;
        }
        after = body["pageInfo"]["endCursor"].as_str().map(str::to_string);
    }

    assert_eq!(pages, 3);
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn subscription_streams_new_records_to_members() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let container = ContainerId::new();
    let (viewer, author) = (IdentityId::new(), IdentityId::new());
    server.services.grant_membership(container, viewer);
    server.services.grant_membership(container, author);

    let mut res = client
        .get(server.url(&format!("/subscriptions/recordCreated?containerIds={container}")))
        .header(IDENTITY_HEADER, viewer.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Records published before the subscriber is on the bus would be missed.
    for _ in 0..50 {
        if server.services.bus().subscriber_count(&Topic::record_created()) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let posted = post_record(&client, &server, container, author, 7).await;
    let frames = read_until_event(&mut res, "record").await;
    assert!(frames.contains(&format!("\"id\":{}", posted["id"])));
}

#[tokio::test]
async fn subscription_denied_for_non_member_yields_error_frame() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let container = ContainerId::new();

    let mut res = client
        .get(server.url(&format!("/subscriptions/recordCreated?containerIds={container}")))
        .header(IDENTITY_HEADER, IdentityId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let frames = read_until_event(&mut res, "error").await;
    assert!(frames.contains("unauthorized"));
}

#[tokio::test]
async fn unknown_subscription_is_not_found() {
    let server = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(server.url(&format!("/subscriptions/nope?containerIds={}", ContainerId::new())))
        .header(IDENTITY_HEADER, IdentityId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
