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

//! Confirmation prompts sent to the user and the user's answers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::closed_string_enum;

closed_string_enum! {
    /// Kind of confirmation an agent can request.
    pub enum ConfirmationType as "confirmation type" {
        Action => "action",
    }
}

closed_string_enum! {
    /// The user's answer to a confirmation.
    pub enum ConfirmationState as "client confirmation state" {
        Accepted => "accepted",
        Dismissed => "dismissed",
    }
}

/// A confirmation prompt the agent sends to the user.
///
/// `confirmation` is opaque to the platform and comes back verbatim inside the
/// matching [`ClientConfirmation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(rename = "type")]
    pub kind: ConfirmationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub confirmation: Value,
}

impl Confirmation {
    pub fn action(title: impl Into<String>, message: impl Into<String>, confirmation: Value) -> Self {
        Self {
            kind: ConfirmationType::Action,
            title: title.into(),
            message: message.into(),
            confirmation,
        }
    }
}

/// The user's response to an earlier [`Confirmation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfirmation {
    pub state: ConfirmationState,
    #[serde(default)]
    pub confirmation: Value,
}

impl ClientConfirmation {
    pub fn is_accepted(&self) -> bool {
        self.state == ConfirmationState::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_serializes_type() {
        let confirmation = Confirmation::action("Delete?", "This removes the branch", json!({"id": 7}));
        let value = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "action",
                "title": "Delete?",
                "message": "This removes the branch",
                "confirmation": {"id": 7}
            })
        );
    }

    #[test]
    fn test_unknown_confirmation_type_rejected() {
        let err = serde_json::from_value::<Confirmation>(json!({
            "type": "modal", "title": "", "message": ""
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid confirmation type"));
    }

    #[test]
    fn test_client_state_is_closed() {
        let accepted: ClientConfirmation =
            serde_json::from_value(json!({"state": "accepted", "confirmation": {"id": 7}})).unwrap();
        assert!(accepted.is_accepted());
        assert_eq!(accepted.confirmation["id"], 7);

        let dismissed: ClientConfirmation = serde_json::from_value(json!({"state": "dismissed"})).unwrap();
        assert!(!dismissed.is_accepted());
        assert!(dismissed.confirmation.is_null());

        assert!(serde_json::from_value::<ClientConfirmation>(json!({"state": "maybe"})).is_err());
        assert!("Accepted".parse::<ConfirmationState>().is_err());
    }
}
