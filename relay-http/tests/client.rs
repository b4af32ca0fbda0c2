use bytes::Bytes;
use relay_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::borrow::Cow;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn basic_auth_and_json_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts"))
        // base64("user:pass")
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/wp-json/wp/v2", server.uri())).unwrap();
    let raw = client
        .post_json_raw(
            "posts",
            &json!({"title": "t"}),
            RequestOpts {
                auth: Some(Auth::Basic {
                    username: "user",
                    password: "pass",
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(raw.status, StatusCode::CREATED);
    let body: Value = raw.json().unwrap();
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn query_auth_is_sent_as_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("token", "secret-token"))
        .and(query_param("user", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let text = client
        .get_text(
            "items",
            RequestOpts {
                auth: Some(Auth::Query {
                    name: "token",
                    value: Cow::Borrowed("secret-token"),
                }),
                query: Some(vec![("user", Cow::Borrowed("alice"))]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn server_errors_are_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "maintenance"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<Value>("flaky", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn opted_in_retries_recover_from_5xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
    let body: Value = client
        .get_json("flaky", RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn raw_bytes_upload_carries_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/media"))
        .and(header("content-type", "image/png"))
        .and(body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 42, "source_url": "https://cdn/x.png"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let body: Value = client
        .post_bytes(
            "media",
            Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
            "image/png",
            RequestOpts::default(),
        )
        .await
        .unwrap();
    assert_eq!(body["id"], 42);
}

#[tokio::test]
async fn decode_errors_keep_a_body_snippet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<Value>("html", RequestOpts::default())
        .await
        .unwrap_err();
    match err {
        HttpError::Decode(_, snippet) => assert!(snippet.contains("<html>")),
        other => panic!("expected Decode error, got {other:?}"),
    }
}

#[derive(Clone, Default)]
struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

async fn fetch_logged(filter: &str) -> String {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw-body-marker"))
        .mount(&server)
        .await;

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = HttpClient::new(&server.uri()).unwrap();
    client
        .get_text("feed", RequestOpts::default())
        .await
        .unwrap();
    captured.text()
}

#[tokio::test]
async fn raw_bodies_follow_the_log_filter() {
    let quiet = fetch_logged("info").await;
    assert!(!quiet.contains("raw-body-marker"));

    let raw = fetch_logged("info,http.raw=trace").await;
    assert!(raw.contains("raw-body-marker"));
}
