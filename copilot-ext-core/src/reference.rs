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

//! Copilot references attached to chat messages.
//!
//! A reference is a `{type, id, is_implicit, metadata, data}` envelope whose
//! `data` shape depends on `type`. Decoding dispatches on the type string
//! into [`ReferenceData`]; unknown types are kept as
//! [`ReferenceData::Other`] so new platform reference kinds never break
//! request decoding.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::repo_item::{RepoItemRef, RepoUrl};
use crate::wire::null_as_default;

/// Known reference type discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Redacted,
    Agent,
    CurrentUrl,
    File,
    Repository,
    Snippet,
    ClientFile,
    ClientSelection,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Redacted => "github.redacted",
            ReferenceType::Agent => "github.agent",
            ReferenceType::CurrentUrl => "github.current-url",
            ReferenceType::File => "github.file",
            ReferenceType::Repository => "github.repository",
            ReferenceType::Snippet => "github.snippet",
            ReferenceType::ClientFile => "client.file",
            ReferenceType::ClientSelection => "client.selection",
        }
    }

    /// Look up a discriminator; `None` for types this crate does not model.
    pub fn from_wire(value: &str) -> Option<Self> {
        Some(match value {
            "github.redacted" => ReferenceType::Redacted,
            "github.agent" => ReferenceType::Agent,
            "github.current-url" => ReferenceType::CurrentUrl,
            "github.file" => ReferenceType::File,
            "github.repository" => ReferenceType::Repository,
            "github.snippet" => ReferenceType::Snippet,
            "client.file" => ReferenceType::ClientFile,
            "client.selection" => ReferenceType::ClientSelection,
            _ => return None,
        })
    }
}

/// Display hints for rendering a reference in the chat UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceMetadata {
    pub display_name: String,
    pub display_icon: String,
    pub display_url: String,
}

/// A reference attached to a message, or emitted by an agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawReference")]
pub struct Reference {
    pub id: String,
    pub is_implicit: bool,
    pub metadata: ReferenceMetadata,
    pub data: ReferenceData,
}

impl Reference {
    pub fn new(id: impl Into<String>, data: ReferenceData) -> Self {
        Self {
            id: id.into(),
            is_implicit: false,
            metadata: ReferenceMetadata::default(),
            data,
        }
    }

    pub fn with_metadata(mut self, metadata: ReferenceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }

    /// The `type` discriminator this reference serializes with.
    pub fn type_name(&self) -> &str {
        self.data.type_name()
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Reference", 5)?;
        state.serialize_field("type", self.data.type_name())?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("is_implicit", &self.is_implicit)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.serialize_field("data", &self.data)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct RawReference {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    is_implicit: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    metadata: ReferenceMetadata,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawReference> for Reference {
    type Error = serde_json::Error;

    fn try_from(raw: RawReference) -> Result<Self, Self::Error> {
        Ok(Self {
            data: ReferenceData::decode(&raw.kind, raw.data)?,
            id: raw.id,
            is_implicit: raw.is_implicit,
            metadata: raw.metadata,
        })
    }
}

/// Typed payload of a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceData {
    Redacted(RedactedRef),
    Agent(AgentRef),
    CurrentUrl(CurrentUrlRef),
    File(FileRef),
    Repository(RepositoryRef),
    Snippet(SnippetRef),
    ClientFile(ClientFileRef),
    ClientSelection(ClientSelectionRef),
    /// A reference type this crate does not model, kept verbatim.
    Other { kind: String, data: Value },
}

impl ReferenceData {
    /// Decode `raw` into the variant selected by `kind`.
    ///
    /// Unknown kinds decode to [`ReferenceData::Other`]. A known kind whose
    /// payload does not fit its shape is an error. `null` is treated as an
    /// empty payload.
    pub fn decode(kind: &str, raw: Value) -> Result<Self, serde_json::Error> {
        let Some(known) = ReferenceType::from_wire(kind) else {
            return Ok(ReferenceData::Other {
                kind: kind.to_string(),
                data: raw,
            });
        };

        Ok(match known {
            ReferenceType::Redacted => ReferenceData::Redacted(typed(kind, raw)?),
            ReferenceType::Agent => ReferenceData::Agent(typed(kind, raw)?),
            ReferenceType::CurrentUrl => ReferenceData::CurrentUrl(typed(kind, raw)?),
            ReferenceType::File => ReferenceData::File(typed(kind, raw)?),
            ReferenceType::Repository => ReferenceData::Repository(typed(kind, raw)?),
            ReferenceType::Snippet => ReferenceData::Snippet(typed(kind, raw)?),
            ReferenceType::ClientFile => ReferenceData::ClientFile(typed(kind, raw)?),
            ReferenceType::ClientSelection => ReferenceData::ClientSelection(typed(kind, raw)?),
        })
    }

    pub fn reference_type(&self) -> Option<ReferenceType> {
        Some(match self {
            ReferenceData::Redacted(_) => ReferenceType::Redacted,
            ReferenceData::Agent(_) => ReferenceType::Agent,
            ReferenceData::CurrentUrl(_) => ReferenceType::CurrentUrl,
            ReferenceData::File(_) => ReferenceType::File,
            ReferenceData::Repository(_) => ReferenceType::Repository,
            ReferenceData::Snippet(_) => ReferenceType::Snippet,
            ReferenceData::ClientFile(_) => ReferenceType::ClientFile,
            ReferenceData::ClientSelection(_) => ReferenceType::ClientSelection,
            ReferenceData::Other { .. } => return None,
        })
    }

    pub fn type_name(&self) -> &str {
        match self {
            ReferenceData::Other { kind, .. } => kind,
            known => known
                .reference_type()
                .map(|t| t.as_str())
                .unwrap_or_default(),
        }
    }
}

impl Serialize for ReferenceData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReferenceData::Redacted(d) => d.serialize(serializer),
            ReferenceData::Agent(d) => d.serialize(serializer),
            ReferenceData::CurrentUrl(d) => d.serialize(serializer),
            ReferenceData::File(d) => d.serialize(serializer),
            ReferenceData::Repository(d) => d.serialize(serializer),
            ReferenceData::Snippet(d) => d.serialize(serializer),
            ReferenceData::ClientFile(d) => d.serialize(serializer),
            ReferenceData::ClientSelection(d) => d.serialize(serializer),
            ReferenceData::Other { data, .. } => data.serialize(serializer),
        }
    }
}

fn typed<T: DeserializeOwned>(kind: &str, raw: Value) -> Result<T, serde_json::Error> {
    let raw = if raw.is_null() {
        Value::Object(Default::default())
    } else {
        raw
    };
    serde_json::from_value(raw)
        .map_err(|e| serde_json::Error::custom(format!("invalid {kind} reference data: {e}")))
}

/// Placeholder for a reference the platform withheld.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactedRef {
    /// Type of the reference that was redacted.
    #[serde(rename = "type")]
    pub redacted_type: String,
}

impl RedactedRef {
    pub fn redacts(&self, kind: ReferenceType) -> bool {
        self.redacted_type == kind.as_str()
    }
}

/// The agent (GitHub App) that produced an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentRef {
    /// The payload's own `type` tag, kept as sent.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    pub id: i64,
    pub login: String,
    pub url: String,
}

impl AgentRef {
    /// Agent reference for an app known only by its slug.
    pub fn for_app(login: &str) -> Self {
        Self {
            data_type: Some(ReferenceType::Agent.as_str().to_string()),
            login: login.to_string(),
            url: format!("https://github.com/apps/{}", login),
            ..Default::default()
        }
    }
}

/// The page the user was looking at on github.com.
///
/// Only `url` and the `type` tag are read from the wire; the remaining fields
/// are derived from the URL when the reference is decoded or built with
/// [`CurrentUrlRef::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CurrentUrlWire")]
pub struct CurrentUrlRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub url: String,
    pub owner: String,
    pub repo: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Issue or pull request the URL points at, if any.
    #[serde(skip)]
    pub item: Option<RepoItemRef>,
}

impl CurrentUrlRef {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let parts = RepoUrl::parse(&url).unwrap_or_default();
        let item = RepoItemRef::parse(&url);

        Self {
            data_type: Some(ReferenceType::CurrentUrl.as_str().to_string()),
            url,
            owner: parts.owner,
            repo: parts.repo,
            path: parts.path,
            hash: parts.hash,
            item,
        }
    }
}

#[derive(Deserialize)]
struct CurrentUrlWire {
    #[serde(default, rename = "type")]
    data_type: Option<String>,
    #[serde(default)]
    url: String,
}

impl From<CurrentUrlWire> for CurrentUrlRef {
    fn from(wire: CurrentUrlWire) -> Self {
        CurrentUrlRef {
            data_type: wire.data_type,
            ..CurrentUrlRef::new(wire.url)
        }
    }
}

/// A file in a repository on github.com.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(rename = "commitOID")]
    pub commit_oid: String,
    #[serde(rename = "languageID")]
    pub language_id: i64,
    pub language_name: String,
    pub path: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(rename = "repoID")]
    pub repo_id: i64,
    pub repo_name: String,
    pub repo_owner: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub id: i64,
    pub name: String,
    pub owner_login: String,
    pub owner_type: String,
    pub visibility: String,
    /// Default ref, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(rename = "commitOID")]
    pub commit_oid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub languages: Vec<RepositoryLanguage>,
    pub readme_path: String,
    pub description: String,
    pub ref_info: RepositoryRefInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryLanguage {
    pub name: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryRefInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A line range within a file on github.com.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnippetRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(rename = "commitOID")]
    pub commit_oid: String,
    #[serde(rename = "languageID")]
    pub language_id: i64,
    pub language_name: String,
    pub path: String,
    pub range: SnippetRange,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(rename = "repoID")]
    pub repo_id: i64,
    pub repo_name: String,
    pub repo_owner: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetRange {
    pub start: i32,
    pub end: i32,
}

/// A file open in the client editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientFileRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub content: String,
    pub language: String,
}

/// A text selection in the client editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSelectionRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub content: String,
    pub start: SelectionLocation,
    pub end: SelectionLocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionLocation {
    pub line: i32,
    pub col: i32,
}
