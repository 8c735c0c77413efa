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

//! Copilot Chat Completions Client
//!
//! Async client for the chat-completions endpoint agents call with the
//! user's token. Streaming responses are decoded with the same event-stream
//! parser agents use for their own output.
//!
//! ```no_run
//! use copilot_ext_client::{ClientConfig, CompletionsClient, CompletionsRequest};
//! use copilot_ext_core::{ChatMessage, StreamEvent};
//! use futures::StreamExt;
//!
//! # async fn run(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let client = CompletionsClient::new(ClientConfig::default())?;
//! let request = CompletionsRequest::new("gpt-4o", vec![ChatMessage::user("Hello!")]);
//!
//! let mut events = client.chat_completions_stream(token, request).await?;
//! while let Some(event) = events.next().await {
//!     if let StreamEvent::Chunk(chunk) = event? {
//!         print!("{}", chunk.content());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod types;

pub use client::{ClientConfig, ClientError, CompletionsClient, EventStream, Result, COMPLETIONS_URL};
pub use types::*;
