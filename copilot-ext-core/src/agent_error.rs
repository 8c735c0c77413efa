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

//! Errors an agent reports to the user through the event stream.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wire::closed_string_enum;

closed_string_enum! {
    /// What an [`AgentError`] is about.
    pub enum ErrorType as "agent error type" {
        Reference => "reference",
        Function => "function",
        Agent => "agent",
    }
}

/// An error shown to the user.
///
/// `identifier` links the error to the reference or function call it concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct AgentError {
    #[serde(rename = "type")]
    pub kind: ErrorType,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub identifier: String,
}

impl AgentError {
    pub fn new(kind: ErrorType, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            identifier: String::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}
