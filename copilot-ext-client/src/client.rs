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

use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use copilot_ext_core::sse::{decode_event, EventParser, StreamEvent};
use copilot_ext_core::StreamError;
use futures::{Stream, TryStreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::types::CompletionsRequest;

/// Default chat-completions endpoint.
pub const COMPLETIONS_URL: &str = "https://api.githubcopilot.com/chat/completions";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Stream(#[from] StreamError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Decoded events of a streaming completion.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chat-completions endpoint URL.
    pub completions_url: String,
    /// Connection timeout (default: 10 seconds). Streams themselves have no
    /// overall deadline.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(COMPLETIONS_URL)
    }
}

impl ClientConfig {
    pub fn new(completions_url: impl Into<String>) -> Self {
        Self {
            completions_url: completions_url.into(),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("copilot-ext/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Client for the chat-completions endpoint, authenticated per call with the
/// requesting user's token.
#[derive(Debug, Clone)]
pub struct CompletionsClient {
    config: ClientConfig,
    http_client: HttpClient,
}

impl CompletionsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `request` and return the raw response once it answered 200.
    pub async fn chat_completions(&self, token: &str, request: &CompletionsRequest) -> Result<reqwest::Response> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending chat completions request"
        );

        let mut builder = self
            .http_client
            .post(&self.config.completions_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json");
        if request.stream {
            builder = builder.header(ACCEPT, "text/event-stream");
        }

        let response = builder.json(request).send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Send `request` with streaming enabled and decode the response
    /// incrementally.
    pub async fn chat_completions_stream(&self, token: &str, mut request: CompletionsRequest) -> Result<EventStream> {
        request.stream = true;
        let response = self.chat_completions(token, &request).await?;
        Ok(decode_response(response))
    }
}

fn decode_response(response: reqwest::Response) -> EventStream {
    let body = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    Box::pin(decode_lines(StreamReader::new(Box::pin(body))))
}

/// Feed an async line source through the event-stream parser.
fn decode_lines<R>(reader: R) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    R: AsyncBufRead + Unpin + Send,
{
    try_stream! {
        let mut lines = reader.lines();
        let mut parser = EventParser::new();

        while let Some(line) = lines.next_line().await.map_err(StreamError::Read)? {
            if let Some(raw) = parser.push_line(&line) {
                for event in decode_event(raw)? {
                    yield event;
                }
            }
        }

        if let Some(raw) = parser.finish() {
            for event in decode_event(raw)? {
                yield event;
            }
        }
    }
}
