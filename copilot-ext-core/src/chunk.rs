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

//! Chat completion chunks, the payload of every untagged data frame.

use serde::{Deserialize, Serialize};

use crate::agent_error::AgentError;
use crate::confirmation::Confirmation;
use crate::reference::Reference;
use crate::wire::null_as_default;

pub const FINISH_REASON_STOP: &str = "stop";
pub const FINISH_REASON_TOOL_CALLS: &str = "tool_calls";
pub const FINISH_REASON_FUNCTION_CALL: &str = "function_call";

pub const ROLE_ASSISTANT: &str = "assistant";

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// One chunk of a streamed chat completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunk {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Unix timestamp in seconds.
    #[serde(skip_serializing_if = "is_zero")]
    pub created: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub object: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system_fingerprint: String,
    #[serde(deserialize_with = "null_as_default")]
    pub choices: Vec<ChatChoice>,
    #[serde(
        rename = "copilot_references",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub references: Vec<Reference>,
    #[serde(rename = "copilot_confirmation", skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
    #[serde(
        rename = "copilot_errors",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub errors: Vec<AgentError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatChoice {
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub delta: ChatChoiceDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatChoiceDelta {
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ChatChoiceDeltaFunctionCall>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatChoiceDeltaFunctionCall {
    pub name: String,
    pub arguments: String,
}

impl ChatCompletionChunk {
    /// A single assistant content delta stamped with the current time.
    pub fn delta(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created: chrono::Utc::now().timestamp(),
            choices: vec![ChatChoice {
                index: 0,
                finish_reason: None,
                delta: ChatChoiceDelta {
                    content: content.into(),
                    role: Some(ROLE_ASSISTANT.to_string()),
                    ..Default::default()
                },
            }],
            ..Default::default()
        }
    }

    /// The terminal chunk carrying `finish_reason: "stop"`.
    pub fn stop(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            choices: vec![ChatChoice {
                index: 0,
                finish_reason: Some(FINISH_REASON_STOP.to_string()),
                delta: ChatChoiceDelta::default(),
            }],
            ..Default::default()
        }
    }

    /// Concatenated delta content of every choice.
    pub fn content(&self) -> String {
        self.choices.iter().map(|c| c.delta.content.as_str()).collect()
    }

    pub fn is_stop(&self) -> bool {
        self.choices
            .iter()
            .any(|c| c.finish_reason.as_deref() == Some(FINISH_REASON_STOP))
    }
}
