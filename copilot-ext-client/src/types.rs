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

//! Request types for the chat-completions endpoint.

use copilot_ext_core::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MODEL_GPT_35: &str = "gpt-3.5-turbo";
pub const MODEL_GPT_4: &str = "gpt-4";
pub const MODEL_GPT_4O: &str = "gpt-4o";
pub const MODEL_EMBEDDINGS: &str = "text-embedding-ada-002";

pub const DEFAULT_MODEL: &str = MODEL_GPT_4O;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_tool_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionsRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<CompletionsTool>,
    #[serde(default)]
    pub stream: bool,
}

impl CompletionsRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            stream: false,
        }
    }

    pub fn with_tool(mut self, tool: CompletionsTool) -> Self {
        self.tools.push(tool);
        self
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionsTool {
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: ToolFunctionDefinition,
}

impl CompletionsTool {
    pub fn function(function: ToolFunctionDefinition) -> Self {
        Self {
            kind: default_tool_type(),
            function,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// JSON Schema of the arguments, passed through untouched.
    #[serde(default)]
    pub parameters: Value,
}
