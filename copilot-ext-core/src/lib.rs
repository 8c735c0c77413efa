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

//! Core building blocks for Copilot agent backends.
//!
//! - [`message`] and [`reference`]: the chat request model, including the
//!   polymorphic `copilot_references` payloads.
//! - [`session`]: derives the user's current page, issue or pull request,
//!   repository and agent from those references.
//! - [`verify`]: checks the platform's ECDSA signature on request bodies.
//! - [`sse`]: writes and reads the `text/event-stream` response protocol.

mod wire;

pub mod agent_error;
pub mod chunk;
pub mod confirmation;
pub mod error;
pub mod message;
pub mod reference;
pub mod repo_item;
pub mod session;
pub mod sse;
pub mod verify;

pub use agent_error::{AgentError, ErrorType};
pub use chunk::{ChatChoice, ChatChoiceDelta, ChatChoiceDeltaFunctionCall, ChatCompletionChunk};
pub use confirmation::{ClientConfirmation, Confirmation, ConfirmationState, ConfirmationType};
pub use error::{CopilotError, ParseValueError, Result, SessionError, StreamError, VerifyError};
pub use message::{ChatMessage, ChatRequest, ChatRole, ToolCall, ToolFunctionCall};
pub use reference::{
    AgentRef, ClientFileRef, ClientSelectionRef, CurrentUrlRef, FileRef, RedactedRef, Reference,
    ReferenceData, ReferenceMetadata, ReferenceType, RepositoryRef, SnippetRef,
};
pub use repo_item::{RepoItemKind, RepoItemRef};
pub use session::{resolve_session, Issue, PullRequest, SessionInfo};
pub use sse::{parse_and_emit, write_streaming_headers, SseWriter, StreamDecoder, StreamEvent};
pub use verify::{EcdsaPayloadVerifier, PayloadVerifier};
