use assert_matches::assert_matches;
use tokio::runtime::Runtime;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nexus_migrator::client::{RepositoryClient, RepositoryHttpClient};
use nexus_migrator::domain::{BasicAuth, ContentType, Credentials, TransferJob};
use nexus_migrator::error::MigratorError;

const ARTIFACT: &[u8] = b"PK\x03\x04 pretend this is a jar";

struct Harness {
    runtime: Runtime,
    server: MockServer,
    client: RepositoryHttpClient,
}

impl Harness {
    fn new() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        let client = RepositoryHttpClient::new(Credentials {
            source: BasicAuth {
                user: "reader".to_string(),
                password: "r-pass".to_string(),
            },
            target: BasicAuth {
                user: "writer".to_string(),
                password: "w-pass".to_string(),
            },
        })
        .unwrap();
        Self {
            runtime,
            server,
            client,
        }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }

    fn job(&self, name: &str, content_type: ContentType) -> TransferJob {
        TransferJob {
            source_url: self.url(&format!("/source/{name}")),
            target_url: self.url(&format!("/target/{name}")),
            content_type,
        }
    }

    fn requests(&self, verb: &str) -> Vec<wiremock::Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.method.as_str() == verb)
            .collect()
    }
}

#[test]
fn listing_sends_source_auth_and_json_accept() {
    let harness = Harness::new();
    let body = r#"{"data":{"type":"G","path":"/","children":[]}}"#;
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/list/"))
            .and(basic_auth("reader", "r-pass"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body)),
    );

    let bytes = harness.client.fetch_listing(&harness.url("/list/")).unwrap();
    assert_eq!(bytes, body.as_bytes());
}

#[test]
fn listing_non_200_is_transport_error() {
    let harness = Harness::new();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/list/secret/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized")),
    );

    let url = harness.url("/list/secret/");
    let err = harness.client.fetch_listing(&url).unwrap_err();
    assert_matches!(
        err,
        MigratorError::Transport { url: failed, status: 401, body } if failed == url && body == "Unauthorized"
    );
}

#[test]
fn transfer_streams_source_body_to_target() {
    let harness = Harness::new();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/source/lib-1.0.jar"))
            .and(basic_auth("reader", "r-pass"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(ARTIFACT)),
    );
    harness.mount(
        Mock::given(method("PUT"))
            .and(path("/target/lib-1.0.jar"))
            .and(basic_auth("writer", "w-pass"))
            .and(header("content-type", "application/java-archive"))
            .respond_with(ResponseTemplate::new(201)),
    );

    let job = harness.job("lib-1.0.jar", ContentType::JavaArchive);
    harness.client.transfer(&job).unwrap();

    let puts = harness.requests("PUT");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].body, ARTIFACT);
}

#[test]
fn descriptor_is_uploaded_as_xml() {
    let harness = Harness::new();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/source/lib-1.0.pom"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<project/>")),
    );
    harness.mount(
        Mock::given(method("PUT"))
            .and(path("/target/lib-1.0.pom"))
            .and(header("content-type", "application/xml"))
            .respond_with(ResponseTemplate::new(201)),
    );

    let job = harness.job("lib-1.0.pom", ContentType::Xml);
    harness.client.transfer(&job).unwrap();
}

#[test]
fn missing_source_never_contacts_target() {
    let harness = Harness::new();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/source/gone-1.0.jar"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such artifact")),
    );

    let job = harness.job("gone-1.0.jar", ContentType::JavaArchive);
    let err = harness.client.transfer(&job).unwrap_err();

    assert_matches!(
        err,
        MigratorError::Transport { url, status: 404, .. } if url == job.source_url
    );
    assert!(harness.requests("PUT").is_empty());
}

#[test]
fn rejected_upload_reports_target_status_after_full_read() {
    let harness = Harness::new();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/source/lib-1.0.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(ARTIFACT)),
    );
    harness.mount(
        Mock::given(method("PUT"))
            .and(path("/target/lib-1.0.jar"))
            .respond_with(ResponseTemplate::new(403).set_body_string("read-only repository")),
    );

    let job = harness.job("lib-1.0.jar", ContentType::JavaArchive);
    let err = harness.client.transfer(&job).unwrap_err();

    assert_matches!(
        err,
        MigratorError::Transport { url, status: 403, body }
            if url == job.target_url && body == "read-only repository"
    );
    let puts = harness.requests("PUT");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].body, ARTIFACT);
}

#[test]
fn upload_must_be_created_not_just_ok() {
    let harness = Harness::new();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/source/lib-1.0.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(ARTIFACT)),
    );
    harness.mount(
        Mock::given(method("PUT"))
            .and(path("/target/lib-1.0.jar"))
            .respond_with(ResponseTemplate::new(200)),
    );

    let job = harness.job("lib-1.0.jar", ContentType::JavaArchive);
    let err = harness.client.transfer(&job).unwrap_err();
    assert_matches!(err, MigratorError::Transport { status: 200, .. });
}

#[test]
fn unreachable_server_is_http_error() {
    let harness = Harness::new();
    let err = harness
        .client
        .fetch_listing("http://127.0.0.1:1/list/")
        .unwrap_err();
    assert_matches!(err, MigratorError::Http { .. });
}
