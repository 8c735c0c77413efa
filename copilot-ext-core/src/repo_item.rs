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

//! GitHub URL grammars for repositories, issues and pull requests.
//!
//! The patterns are unanchored: a match anywhere in the input counts, and the
//! first (leftmost) match wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::wire::closed_string_enum;

static REPO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://github\.com/(?:orgs/)?(?P<owner>[^/#?]+)/(?P<repo>[^/#?]+)(?:/(?P<path>[^#]*))?(?:#(?P<hash>.*))?",
    )
    .expect("repository url pattern")
});

static ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://github.com/(?P<owner>[^/]+)/(?P<repo>[^/]+)/issues/(?P<number>\d+)(?:#(?P<hash>.+))?",
    )
    .expect("issue url pattern")
});

static PULL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://github.com/(?P<owner>[^/]+)/(?P<repo>[^/]+)/pull/(?P<number>\d+)(?:/(?P<page>commits|checks|files))?(?:#(?P<hash>.+))?",
    )
    .expect("pull request url pattern")
});

closed_string_enum! {
    /// Kind of repository item addressed by a URL.
    pub enum RepoItemKind as "repo item kind" {
        Issue => "issue",
        Pull => "pull",
    }
}

impl RepoItemKind {
    /// Plural resource segment used when building canonical URLs.
    pub fn plural(&self) -> &'static str {
        match self {
            RepoItemKind::Issue => "issues",
            RepoItemKind::Pull => "pulls",
        }
    }
}

/// Reference to an issue or pull request, derived from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoItemRef {
    #[serde(rename = "type")]
    pub kind: RepoItemKind,
    pub owner: String,
    pub repo: String,
    pub number: u64,
    /// Pull request sub-page (`commits`, `checks` or `files`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Fragment after `#`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Canonical web URL.
    pub url: String,
    /// Canonical REST API URL.
    pub api: String,
}

impl RepoItemRef {
    /// Build a reference with canonical URLs and no page or hash.
    pub fn new(kind: RepoItemKind, owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        let url = format!(
            "https://github.com/{}/{}/{}/{}",
            owner,
            repo,
            kind.plural(),
            number
        );
        let api = format!(
            "https://api.github.com/repos/{}/{}/{}/{}",
            owner,
            repo,
            kind.plural(),
            number
        );

        Self {
            kind,
            owner,
            repo,
            number,
            page: None,
            hash: None,
            url,
            api,
        }
    }

    /// Match `url` against the issue grammar, then the pull request grammar.
    ///
    /// Returns `None` when neither matches or the number does not fit in a
    /// `u64`.
    pub fn parse(url: &str) -> Option<Self> {
        let (kind, caps) = if let Some(caps) = ISSUE_RE.captures(url) {
            (RepoItemKind::Issue, caps)
        } else if let Some(caps) = PULL_RE.captures(url) {
            (RepoItemKind::Pull, caps)
        } else {
            return None;
        };

        let number = caps.name("number")?.as_str().parse::<u64>().ok()?;
        let mut item = Self::new(kind, &caps["owner"], &caps["repo"], number);
        item.page = caps.name("page").map(|m| m.as_str().to_string());
        item.hash = caps.name("hash").map(|m| m.as_str().to_string());
        Some(item)
    }
}

/// Owner, repository, path and fragment extracted from a repository URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoUrl {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub hash: String,
}

impl RepoUrl {
    /// Match `url` against the repository grammar.
    pub fn parse(url: &str) -> Option<Self> {
        let caps = REPO_RE.captures(url)?;
        let group = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Some(Self {
            owner: group("owner"),
            repo: group("repo"),
            path: group("path"),
            hash: group("hash"),
        })
    }
}
