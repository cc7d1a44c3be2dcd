use reqwest::Method;
use reqwest::Url;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::credentials::Credential;
use crate::error::Operation;
use crate::error::RemoteFailure;
use crate::error::Result;
use crate::error::WorkflowError;

const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("repo-editor/", env!("CARGO_PKG_VERSION"));

/// HTTP transport for making GitHub API requests.
///
/// No request timeout is configured; calls wait as long as the remote does.
#[derive(Clone, Default)]
pub struct GithubHttpClient {
    http: reqwest::Client,
}

/// A successful response body together with its status.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

impl GithubHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a GET request
    pub async fn get(
        &self,
        operation: Operation,
        credential: &Credential,
        url: Url,
    ) -> Result<Response> {
        let request = self.request(Method::GET, credential, url);
        self.send(operation, request).await
    }

    /// Make a request with a JSON body
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        method: Method,
        credential: &Credential,
        url: Url,
        body: &B,
    ) -> Result<Response> {
        let request = self.request(method, credential, url).json(body);
        self.send(operation, request).await
    }

    fn request(&self, method: Method, credential: &Credential, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(credential.expose())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    async fn send(
        &self,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| unreachable_error(operation, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| unreachable_error(operation, e))?;
        parse_response(operation, status, body)
    }
}

/// Map a non-success status to a typed error, keeping the remote message.
pub fn parse_response(operation: Operation, status: u16, body: String) -> Result<Response> {
    if (200..300).contains(&status) {
        return Ok(Response { status, body });
    }

    let message = match serde_json::from_str::<GitHubError>(&body) {
        Ok(error) => error.message,
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => body,
    };
    Err(WorkflowError::from_status(RemoteFailure::new(
        operation, status, message,
    )))
}

impl Response {
    /// Deserialize the body, treating an unexpected shape as a remote error.
    pub fn json<T: DeserializeOwned>(&self, operation: Operation) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            WorkflowError::Remote(RemoteFailure::new(
                operation,
                self.status,
                format!("unexpected response: {}", e),
            ))
        })
    }
}

fn unreachable_error(operation: Operation, error: reqwest::Error) -> WorkflowError {
    WorkflowError::Unreachable {
        operation,
        message: error.to_string(),
        timed_out: error.is_timeout(),
    }
}
