use std::io;

use reqwest::StatusCode;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info};

use crate::domain::{BasicAuth, Credentials, TransferJob};
use crate::error::MigratorError;

const JSON: &str = "application/json";

/// Network side of the pipeline: listing fetches and artifact transfers.
pub trait RepositoryClient: Send + Sync {
    /// GETs a tree listing from the source server and returns the raw body.
    fn fetch_listing(&self, url: &str) -> Result<Vec<u8>, MigratorError>;

    /// Streams one artifact from the source server into the target server.
    fn transfer(&self, job: &TransferJob) -> Result<(), MigratorError>;
}

#[derive(Clone)]
pub struct RepositoryHttpClient {
    client: Client,
    credentials: Credentials,
}

impl RepositoryHttpClient {
    pub fn new(credentials: Credentials) -> Result<Self, MigratorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("nexus-migrator/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MigratorError::ClientBuild(err.to_string()))?,
        );
        // Artifacts can be arbitrarily large, so requests carry no deadline.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None)
            .build()
            .map_err(|err| MigratorError::ClientBuild(err.to_string()))?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn source_get(&self, url: &str) -> Result<Response, MigratorError> {
        let request = with_auth(self.client.get(url), &self.credentials.source).header(ACCEPT, JSON);
        let response = request.send().map_err(|err| MigratorError::http(url, err))?;
        expect_status(url, response, StatusCode::OK)
    }
}

impl RepositoryClient for RepositoryHttpClient {
    fn fetch_listing(&self, url: &str) -> Result<Vec<u8>, MigratorError> {
        info!(url, "fetching listing");
        let response = self.source_get(url)?;
        let body = response
            .bytes()
            .map_err(|err| MigratorError::http(url, err))?;
        Ok(body.to_vec())
    }

    fn transfer(&self, job: &TransferJob) -> Result<(), MigratorError> {
        let download = self.source_get(&job.source_url)?;
        let length = download.content_length();
        debug!(source = %job.source_url, ?length, "download opened");

        // The download is moved into the upload body and released with it.
        let body = match length {
            Some(len) => Body::sized(download, len),
            None => Body::new(download),
        };

        info!(target_url = %job.target_url, content_type = %job.content_type, "streaming to target");
        let request = with_auth(self.client.put(&job.target_url), &self.credentials.target)
            .header(CONTENT_TYPE, job.content_type.as_str())
            .body(body);
        let response = request
            .send()
            .map_err(|err| MigratorError::http(&job.target_url, err))?;
        let mut response = expect_status(&job.target_url, response, StatusCode::CREATED)?;
        io::copy(&mut response, &mut io::sink())
            .map_err(|err| MigratorError::http(&job.target_url, err))?;
        Ok(())
    }
}

fn with_auth(request: RequestBuilder, auth: &BasicAuth) -> RequestBuilder {
    request.basic_auth(&auth.user, Some(&auth.password))
}

/// Passes `response` through when it has the `expected` status; otherwise
/// drains the body into a transport error.
fn expect_status(
    url: &str,
    response: Response,
    expected: StatusCode,
) -> Result<Response, MigratorError> {
    if response.status() == expected {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Err(MigratorError::Transport {
        url: url.to_string(),
        status,
        body,
    })
}
