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

//! Text event-stream framing for agent responses.
//!
//! Agents answer with `text/event-stream`: untagged `data:` frames carry
//! [`ChatCompletionChunk`](crate::chunk::ChatCompletionChunk)s, and frames
//! tagged with one of the `copilot_*` event names carry confirmations,
//! references or errors. The stream ends with a `data: [DONE]` frame.

mod parser;
mod writer;

pub use parser::{decode_event, parse_and_emit, EventParser, RawEvent, StreamDecoder, StreamEvent};
pub use writer::SseWriter;

use http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue};

pub const EVENT_CONFIRMATION: &str = "copilot_confirmation";
pub const EVENT_REFERENCES: &str = "copilot_references";
pub const EVENT_ERRORS: &str = "copilot_errors";

/// Payload of the terminating data frame.
pub const DONE: &str = "[DONE]";

pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// Set the response headers of a streaming agent response.
pub fn write_streaming_headers(headers: &mut HeaderMap) {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_EVENT_STREAM));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
}
