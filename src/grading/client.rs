//! HTTP client for the grading API, usually reached through the relay.
//!
//! Redirects are never followed: the backend only redirects to its login
//! flow, which a programmatic caller reads as "authentication required".

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

use crate::grading::submission::Submission;

/// Header carrying the last seen event ID on reconnect.
pub const LAST_EVENT_ID: &str = "last-event-id";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

impl ClientError {
    /// Whether a later attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Rejected { status, .. } => status.is_server_error(),
            ClientError::AuthenticationRequired | ClientError::Header(_) => false,
        }
    }
}

/// Grading API client bound to one base address and session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    /// `base` is the API root (e.g. `http://localhost:3000/api/backend`).
    /// `cookie` is sent verbatim on every call to carry the session.
    pub fn new(base: &str, cookie: Option<&str>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        }

        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Upload a solution archive. Returns the freshly created submission.
    pub async fn submit_solution(
        &self,
        challenge_id: &str,
        file_name: &str,
        archive: Vec<u8>,
    ) -> Result<Submission, ClientError> {
        let part = Part::bytes(archive)
            .file_name(file_name.to_string())
            .mime_str("application/zip")?;
        let form = Form::new()
            .text("challengeId", challenge_id.to_string())
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/submissions", self.base))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "Submission failed")?;

        let submission: Submission = response.json().await?;
        tracing::info!(submission_id = %submission.id, status = %submission.status, "Submission accepted");
        Ok(submission)
    }

    /// Fetch the current record of a submission.
    pub async fn fetch_submission(&self, id: &str) -> Result<Submission, ClientError> {
        let response = self
            .http
            .get(format!("{}/submissions/{}", self.base, id))
            .send()
            .await?;
        let response = check_status(response, "Could not fetch submission")?;
        Ok(response.json().await?)
    }

    /// Open the grading event stream for a submission.
    pub async fn open_stream(
        &self,
        id: &str,
        last_event_id: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self
            .http
            .get(format!("{}/submissions/{}/stream", self.base, id))
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(last) = last_event_id {
            request = request.header(LAST_EVENT_ID, last);
        }

        let response = request.send().await?;
        check_status(response, "Could not open grading stream")
    }
}

fn check_status(response: Response, context: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status.is_redirection() {
        return Err(ClientError::AuthenticationRequired);
    }
    if !status.is_success() {
        return Err(ClientError::Rejected {
            status,
            message: format!("{context} ({status})"),
        });
    }
    Ok(response)
}
