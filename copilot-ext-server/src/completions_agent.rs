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

//! Built-in agent that relays the conversation to the chat-completions
//! endpoint on behalf of the user.

use async_trait::async_trait;
use copilot_ext_client::{ClientConfig, CompletionsClient, CompletionsRequest};
use copilot_ext_core::{ChatMessage, SessionInfo, SseWriter, StreamEvent};
use futures::StreamExt;
use tracing::debug;

use crate::agent::{Agent, AgentRequest, ChannelSink};
use crate::config::ChatConfig;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. You are here to help the user with their questions.
You are not a human, so you don't have to worry about being polite or making small talk.
You can be direct and to the point. You can also be funny and clever, but you don't have to be.
You can be as creative as you like, but you must be helpful.";

pub struct CompletionsAgent {
    client: CompletionsClient,
    model: String,
    system_prompt: String,
}

impl CompletionsAgent {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let client = CompletionsClient::new(ClientConfig::new(config.completions_url.clone()))?;
        Ok(Self {
            client,
            model: config.model.clone(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn build_request(&self, request: &AgentRequest) -> CompletionsRequest {
        let mut messages = vec![ChatMessage::system(self.system_prompt.as_str())];
        if let Some(context) = session_context(&request.session) {
            messages.push(ChatMessage::system(context));
        }
        messages.extend(request.request.conversation().cloned());
        CompletionsRequest::new(self.model.as_str(), messages)
    }
}

/// A short system note describing what the user is looking at.
fn session_context(session: &SessionInfo) -> Option<String> {
    if let Some(issue) = &session.issue {
        return Some(format!("The user is viewing issue #{} in {}/{}: {}", issue.number, issue.owner, issue.repo, issue.url));
    }
    if let Some(pull) = &session.pull_request {
        return Some(format!(
            "The user is viewing pull request #{} in {}/{}: {}",
            pull.number, pull.owner, pull.repo, pull.url
        ));
    }
    if let Some(repo) = &session.repo {
        if !repo.owner_login.is_empty() && !repo.name.is_empty() {
            return Some(format!("The user is working in the repository {}/{}", repo.owner_login, repo.name));
        }
    }
    session
        .url
        .as_ref()
        .map(|url| format!("The user is viewing {}", url.url))
}

#[async_trait]
impl Agent for CompletionsAgent {
    async fn execute(&self, request: AgentRequest, writer: &mut SseWriter<ChannelSink>) -> anyhow::Result<()> {
        let completions = self.build_request(&request);
        let mut events = self
            .client
            .chat_completions_stream(&request.token, completions)
            .await?;

        let mut response_id = String::new();
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Chunk(chunk) => {
                    if response_id.is_empty() {
                        response_id = chunk.id.clone();
                    }
                    let content = chunk.content();
                    if !content.is_empty() {
                        writer.write_delta(&chunk.id, &content)?;
                    }
                }
                StreamEvent::References(references) => writer.write_references(&references)?,
                StreamEvent::Errors(errors) => writer.write_errors(&errors)?,
                StreamEvent::Confirmation(confirmation) => writer.write_confirmation(&confirmation)?,
            }
        }

        debug!(response_id = %response_id, "completion stream finished");
        writer.write_stop(&response_id)?;
        Ok(())
    }
}
