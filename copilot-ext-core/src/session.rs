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

//! Session context resolution.
//!
//! The platform does not send session context as first-class fields. It
//! spreads it over references attached to earlier messages: the page the user
//! is looking at rides on a synthetic `_session` message, the repository on
//! user messages, and the agent identity on the agent's own earlier replies.
//! [`resolve_session`] walks the conversation newest-first and latches the
//! first value it finds for each fact, then cross-checks the facts against
//! each other.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::message::{ChatMessage, ChatRole};
use crate::reference::{AgentRef, CurrentUrlRef, ReferenceData, ReferenceType, RepositoryRef};
use crate::repo_item::{RepoItemKind, RepoItemRef};

/// `name` of the synthetic message carrying the current-URL reference.
pub const SESSION_MESSAGE_NAME: &str = "_session";

/// Role the platform gives the session-carrier message.
pub const SESSION_CARRIER_ROLE: ChatRole = ChatRole::User;

/// An issue the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issue(pub RepoItemRef);

/// A pull request the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequest(pub RepoItemRef);

impl Deref for Issue {
    type Target = RepoItemRef;

    fn deref(&self) -> &RepoItemRef {
        &self.0
    }
}

impl Deref for PullRequest {
    type Target = RepoItemRef;

    fn deref(&self) -> &RepoItemRef {
        &self.0
    }
}

/// Context of a chat session, computed once per request.
///
/// At most one of `issue` and `pull_request` is set, and only when `url` is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<CurrentUrlRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepositoryRef>,
    pub agent: AgentRef,
}

impl SessionInfo {
    /// The issue or pull request in view, whichever is set.
    pub fn item(&self) -> Option<&RepoItemRef> {
        self.issue
            .as_deref()
            .or(self.pull_request.as_deref())
    }
}

/// What a session-carrier message says about the current URL.
enum UrlFact<'a> {
    Present(&'a CurrentUrlRef),
    Redacted,
}

fn current_url_fact(message: &ChatMessage) -> Option<UrlFact<'_>> {
    message.references.iter().find_map(|r| match &r.data {
        ReferenceData::CurrentUrl(url) => Some(UrlFact::Present(url)),
        ReferenceData::Redacted(redacted) if redacted.redacts(ReferenceType::CurrentUrl) => {
            Some(UrlFact::Redacted)
        }
        _ => None,
    })
}

fn first_repository(message: &ChatMessage) -> Option<&RepositoryRef> {
    message.references.iter().find_map(|r| match &r.data {
        ReferenceData::Repository(repo) => Some(repo),
        _ => None,
    })
}

fn first_agent(message: &ChatMessage) -> Option<&AgentRef> {
    message.references.iter().find_map(|r| match &r.data {
        ReferenceData::Agent(agent) => Some(agent),
        _ => None,
    })
}

/// Both sides non-empty and different, ignoring ASCII case.
fn conflicts(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && !a.eq_ignore_ascii_case(b)
}

/// Compute the session context for a conversation.
///
/// `declared_agent` is the login of the agent the request is addressed to.
/// Messages are only borrowed; the result owns copies of the facts it used.
pub fn resolve_session(
    messages: &[ChatMessage],
    declared_agent: &str,
) -> Result<SessionInfo, SessionError> {
    let mut url: Option<&CurrentUrlRef> = None;
    let mut repo: Option<&RepositoryRef> = None;
    let mut agent: Option<&AgentRef> = None;

    for message in messages.iter().rev() {
        match message.role {
            ChatRole::User => {
                if url.is_none() && message.is_session_message() {
                    match current_url_fact(message) {
                        Some(UrlFact::Present(current)) => url = Some(current),
                        Some(UrlFact::Redacted) => warn!("current URL reference is redacted"),
                        None => {}
                    }
                }
                if repo.is_none() {
                    repo = first_repository(message);
                }
            }
            ChatRole::Assistant => {
                if agent.is_none() {
                    agent = first_agent(message);
                }
            }
            _ => continue,
        }

        if url.is_some() && repo.is_some() && agent.is_some() {
            break;
        }
    }

    let item = url.and_then(|u| u.item.as_ref());

    if url.is_none() {
        debug!("no session url context found");
    }
    if item.is_none() {
        debug!("no session issue or pull request context found");
    }
    if repo.is_none() {
        debug!("no session repo context found");
    }

    let agent = match agent {
        Some(agent) => agent.clone(),
        None => {
            debug!(agent = declared_agent, "no agent reference found, using declared agent");
            AgentRef::for_app(declared_agent)
        }
    };

    if !agent.login.eq_ignore_ascii_case(declared_agent) {
        return Err(SessionError::AgentMismatch {
            declared: declared_agent.to_string(),
            found: agent.login,
        });
    }

    if let Some(url) = url {
        if let Some(item) = item {
            for (field, ours, theirs) in [("owner", &url.owner, &item.owner), ("repo", &url.repo, &item.repo)] {
                if conflicts(ours, theirs) {
                    return Err(SessionError::UrlItemMismatch {
                        field,
                        url: ours.clone(),
                        item: theirs.clone(),
                    });
                }
            }
        }
        if let Some(repo) = repo {
            for (field, ours, theirs) in [("owner", &url.owner, &repo.owner_login), ("repo", &url.repo, &repo.name)] {
                if conflicts(ours, theirs) {
                    return Err(SessionError::UrlRepoMismatch {
                        field,
                        url: ours.clone(),
                        repo: theirs.clone(),
                    });
                }
            }
        }
    }

    let (issue, pull_request) = match item {
        Some(item) if item.kind == RepoItemKind::Issue => (Some(Issue(item.clone())), None),
        Some(item) => (None, Some(PullRequest(item.clone()))),
        None => (None, None),
    };

    Ok(SessionInfo {
        url: url.cloned(),
        issue,
        pull_request,
        repo: repo.cloned(),
        agent,
    })
}
