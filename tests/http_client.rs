use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adoreview::client::{ApiClient, HttpApiClient};
use adoreview::config::Config;
use adoreview::error::Error;

const THREADS_PATH: &str = "/org1/proj1/_apis/git/repositories/repoA/pullRequests/42/threads";

/// Mock server plus the runtime serving it. The client under test blocks,
/// so calls are made from the test thread while the runtime's workers answer.
struct ServerFixture {
    server: MockServer,
    runtime: Runtime,
}

impl ServerFixture {
    fn start() -> Self {
        let runtime = Runtime::new().expect("runtime should start");
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}?api-version=7.1", self.server.uri())
    }
}

fn client() -> HttpApiClient {
    HttpApiClient::with_token(&Config::default(), "test-token".to_string())
}

#[test]
fn get_sends_bearer_token_and_parses_json() {
    let fixture = ServerFixture::start();
    fixture.mount(
        Mock::given(method("GET"))
            .and(path(THREADS_PATH))
            .and(query_param("api-version", "7.1"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "value": [], "count": 0 })),
            )
            .expect(1),
    );

    let value = client().get_json(&fixture.url(THREADS_PATH)).unwrap();

    assert_eq!(value["count"], 0);
}

#[test]
fn post_sends_json_body() {
    let fixture = ServerFixture::start();
    let body = json!({
        "comments": [{ "parentCommentId": 0, "content": "hi", "commentType": 1 }],
        "status": 1,
    });
    fixture.mount(
        Mock::given(method("POST"))
            .and(path(THREADS_PATH))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 77 })))
            .expect(1),
    );

    let value = client()
        .post_json(&fixture.url(THREADS_PATH), &body)
        .unwrap();

    assert_eq!(value["id"], 77);
}

#[test]
fn unauthorized_maps_to_auth_error() {
    let fixture = ServerFixture::start();
    fixture.mount(
        Mock::given(method("GET"))
            .and(path(THREADS_PATH))
            .respond_with(ResponseTemplate::new(401)),
    );

    let err = client().get_json(&fixture.url(THREADS_PATH)).unwrap_err();

    assert!(matches!(err, Error::Auth(_)), "{err}");
    assert!(err.to_string().contains("az login"));
}

#[test]
fn server_error_maps_to_transport_error() {
    let fixture = ServerFixture::start();
    fixture.mount(
        Mock::given(method("GET"))
            .and(path(THREADS_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "kaput" }))),
    );

    let err = client().get_json(&fixture.url(THREADS_PATH)).unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "{err}");
    assert!(err.to_string().contains("kaput"));
}

#[test]
fn empty_body_maps_to_transport_error() {
    let fixture = ServerFixture::start();
    fixture.mount(
        Mock::given(method("GET"))
            .and(path(THREADS_PATH))
            .respond_with(ResponseTemplate::new(200)),
    );

    let err = client().get_json(&fixture.url(THREADS_PATH)).unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "{err}");
    assert!(err.to_string().contains("empty body"));
}

#[test]
fn sign_in_page_maps_to_auth_error() {
    let fixture = ServerFixture::start();
    fixture.mount(
        Mock::given(method("GET"))
            .and(path(THREADS_PATH))
            .respond_with(ResponseTemplate::new(203).set_body_string("<html>Sign in</html>")),
    );

    let err = client().get_json(&fixture.url(THREADS_PATH)).unwrap_err();

    assert!(matches!(err, Error::Auth(_)), "{err}");
}

#[test]
fn connection_refused_maps_to_transport_error() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client()
        .get_json(&format!("http://{addr}{THREADS_PATH}"))
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "{err}");
}
