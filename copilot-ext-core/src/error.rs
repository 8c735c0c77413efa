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

//! Error types for copilot-ext-core

use thiserror::Error;

/// Top-level error for the crate. Each concern keeps its own enum so callers
/// can match on the one they care about.
#[derive(Error, Debug)]
pub enum CopilotError {
    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidValue(#[from] ParseValueError),
}

/// Result type for copilot-ext-core operations
pub type Result<T> = std::result::Result<T, CopilotError>;

/// A string outside one of the closed wire sets (confirmation type,
/// confirmation state, error type, repo item kind).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseValueError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Payload signature verification errors.
///
/// A signature that decodes but does not match is not an error; see
/// [`crate::verify::PayloadVerifier::verify`].
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("failed to fetch public key: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to fetch public key: unexpected status {0}")]
    FetchStatus(reqwest::StatusCode),

    #[error("could not find current public key")]
    NoCurrentKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("signature is not valid base64: {0}")]
    SignatureEncoding(#[from] base64::DecodeError),

    #[error("signature is not a valid ASN.1 ECDSA signature")]
    SignatureFormat(#[from] p256::ecdsa::Error),
}

/// Cross-validation failures between independently supplied session facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("agent login {found} does not match declared agent {declared}")]
    AgentMismatch { declared: String, found: String },

    #[error("session url {field} {url} does not match item ref {field} {item}")]
    UrlItemMismatch {
        field: &'static str,
        url: String,
        item: String,
    },

    #[error("session url {field} {url} does not match repository {field} {repo}")]
    UrlRepoMismatch {
        field: &'static str,
        url: String,
        repo: String,
    },
}

/// Event-stream decoding errors, tagged with the frame category that failed.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to read from stream: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to process confirmation: {0}")]
    Confirmation(#[source] serde_json::Error),

    #[error("failed to process references: {0}")]
    References(#[source] serde_json::Error),

    #[error("failed to process errors: {0}")]
    Errors(#[source] serde_json::Error),

    #[error("failed to process data: {0}")]
    Chunk(#[source] serde_json::Error),
}
