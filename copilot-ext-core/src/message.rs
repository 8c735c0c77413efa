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

//! Chat request and message types received from the platform.

use serde::{Deserialize, Serialize};

use crate::confirmation::ClientConfirmation;
use crate::error::SessionError;
use crate::reference::Reference;
use crate::session::{resolve_session, SessionInfo, SESSION_CARRIER_ROLE, SESSION_MESSAGE_NAME};
use crate::wire::null_as_default;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Function,
    Tool,
    /// Any role string not listed above.
    #[serde(other)]
    Other,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Function => "function",
            ChatRole::Tool => "tool",
            ChatRole::Other => "other",
        }
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "copilot_references",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub references: Vec<Reference>,
    #[serde(
        rename = "copilot_confirmations",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub confirmations: Vec<ClientConfirmation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ToolFunctionCall>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            references: Vec::new(),
            confirmations: Vec::new(),
            function_call: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_confirmation(mut self, confirmation: ClientConfirmation) -> Self {
        self.confirmations.push(confirmation);
        self
    }

    /// True for the synthetic message that carries the current-URL context.
    /// Its content is never meant for display.
    pub fn is_session_message(&self) -> bool {
        self.role == SESSION_CARRIER_ROLE && self.name.as_deref() == Some(SESSION_MESSAGE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    #[serde(default)]
    pub function: Option<ToolFunctionCall>,
}

fn default_tool_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolFunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

/// The request body posted to an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    #[serde(rename = "copilot_thread_id")]
    pub thread_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub messages: Vec<ChatMessage>,
    #[serde(deserialize_with = "null_as_default")]
    pub stop: Vec<String>,
    pub top_p: f32,
    pub temperature: f32,
    pub max_tokens: i32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    #[serde(rename = "copilot_skills", deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    /// Login of the agent the request is addressed to.
    pub agent: String,
}

impl ChatRequest {
    /// Resolve the session context carried by this request's messages.
    pub fn session_info(&self) -> Result<SessionInfo, SessionError> {
        resolve_session(&self.messages, &self.agent)
    }

    /// The most recent session-carrier message, if any.
    pub fn session_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_session_message())
    }

    /// Messages that carry conversation content, with session carriers removed.
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| !m.is_session_message())
    }
}
