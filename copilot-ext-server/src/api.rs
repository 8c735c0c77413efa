// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP handlers for the agent and webhook endpoints.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use copilot_ext_core::verify::{KEY_IDENTIFIER_HEADER, SIGNATURE_HEADER, TOKEN_HEADER};
use copilot_ext_core::{
    write_streaming_headers, AgentError, ChatRequest, ErrorType, PayloadVerifier, SessionError, SseWriter,
    VerifyError,
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, AgentRequest, ChannelSink};

/// Largest request body the handlers will buffer.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn PayloadVerifier>,
    pub agent: Arc<dyn Agent>,
}

/// Rejections of an agent request, before any response bytes are sent.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("malformed payload signature: {0}")]
    SignatureEncoding(#[from] VerifyError),

    #[error("invalid payload signature")]
    InvalidSignature,

    #[error("failed to decode request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("inconsistent session context: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SignatureEncoding(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Session(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "rejecting agent request");
        } else {
            warn!(error = %self, "rejecting agent request");
        }
        (status, self.to_string()).into_response()
    }
}

fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingHeader(name))
}

async fn read_body(body: Body) -> Result<Bytes, ApiError> {
    to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BodyRead(e.to_string()))
}

/// `POST /agent`
///
/// Verifies the payload signature, decodes the chat request, resolves the
/// session and then streams the agent's reply. The agent runs on its own task
/// and writes into the response body through a [`ChannelSink`].
pub async fn agent_handler(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let key_identifier = required_header(&parts.headers, KEY_IDENTIFIER_HEADER)?;
    let signature = required_header(&parts.headers, SIGNATURE_HEADER)?;
    let token = required_header(&parts.headers, TOKEN_HEADER)?.to_string();

    let body = read_body(body).await?;

    if !state.verifier.verify(&body, signature)? {
        return Err(ApiError::InvalidSignature);
    }
    debug!(key_identifier, "payload signature verified");

    let chat: ChatRequest = serde_json::from_slice(&body)?;
    let session = chat.session_info()?;

    info!(
        thread_id = %chat.thread_id,
        agent = %chat.agent,
        messages = chat.messages.len(),
        "executing agent"
    );

    let (sink, rx) = ChannelSink::channel();
    let agent = Arc::clone(&state.agent);
    let agent_request = AgentRequest {
        token,
        request: chat,
        session,
    };

    tokio::spawn(async move {
        let mut writer = SseWriter::new(sink);
        if let Err(e) = agent.execute(agent_request, &mut writer).await {
            error!(error = %e, "failed to execute agent");
            let report = AgentError::new(ErrorType::Agent, "agent_failure", e.to_string());
            if let Err(write_err) = writer.write_error(&report) {
                debug!(error = %write_err, "could not report agent failure to client");
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    let mut response = Response::new(Body::from_stream(stream));
    write_streaming_headers(response.headers_mut());
    Ok(response)
}

/// `POST /webhook`
///
/// Platform webhook deliveries are only logged.
pub async fn webhook_handler(request: Request) -> StatusCode {
    match read_body(request.into_body()).await {
        Ok(body) => {
            info!(body = %String::from_utf8_lossy(&body), "webhook delivered");
            StatusCode::OK
        }
        Err(e) => {
            error!(error = %e, "failed to read webhook body");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `GET /_ping`
pub async fn ping() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_required_header() {
        let mut headers = HeaderMap::new();
        headers.insert("github-public-key-signature", HeaderValue::from_static("  abc "));
        headers.insert("x-github-token", HeaderValue::from_static(""));

        assert_eq!(required_header(&headers, SIGNATURE_HEADER).unwrap(), "abc");
        assert!(matches!(
            required_header(&headers, TOKEN_HEADER),
            Err(ApiError::MissingHeader(TOKEN_HEADER))
        ));
        assert!(required_header(&headers, KEY_IDENTIFIER_HEADER).is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MissingHeader(TOKEN_HEADER).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::BodyRead("eof".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::InvalidSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(VerifyError::NoCurrentKey).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
