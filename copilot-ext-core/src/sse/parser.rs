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

//! Incremental decoder for the agent response stream.

use std::collections::VecDeque;
use std::io::BufRead;

use super::{DONE, EVENT_CONFIRMATION, EVENT_ERRORS, EVENT_REFERENCES};
use crate::agent_error::AgentError;
use crate::chunk::ChatCompletionChunk;
use crate::confirmation::Confirmation;
use crate::error::StreamError;
use crate::reference::Reference;

/// A decoded event-stream payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chunk(ChatCompletionChunk),
    Confirmation(Confirmation),
    References(Vec<Reference>),
    Errors(Vec<AgentError>),
}

/// One frame as read off the wire, before payload decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub event: Option<String>,
    pub data: Vec<String>,
}

/// Incremental, line-fed event-stream frame parser.
///
/// Lines are fed without their terminator. A blank line completes the current
/// frame. Comment lines (leading `:`) and fields other than `event` and `data`
/// are ignored.
#[derive(Debug, Default)]
pub struct EventParser {
    pending: RawEvent,
    has_fields: bool,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns the frame it completes, if any.
    pub fn push_line(&mut self, line: &str) -> Option<RawEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                self.pending.event = Some(value.to_string());
                self.has_fields = true;
            }
            "data" => {
                self.pending.data.push(value.to_string());
                self.has_fields = true;
            }
            _ => {}
        }
        None
    }

    /// Flush a frame left unterminated at end of stream.
    pub fn finish(&mut self) -> Option<RawEvent> {
        self.take()
    }

    fn take(&mut self) -> Option<RawEvent> {
        if !self.has_fields {
            return None;
        }
        self.has_fields = false;
        Some(std::mem::take(&mut self.pending))
    }
}

/// Decode the payloads of a completed frame.
///
/// Each data field of a frame is decoded on its own. Untagged frames skip
/// empty data and the `[DONE]` marker, so the terminator yields nothing.
pub fn decode_event(raw: RawEvent) -> Result<Vec<StreamEvent>, StreamError> {
    let RawEvent { event, data } = raw;

    match event.as_deref() {
        Some(EVENT_CONFIRMATION) => data
            .iter()
            .map(|d| {
                serde_json::from_str(d)
                    .map(StreamEvent::Confirmation)
                    .map_err(StreamError::Confirmation)
            })
            .collect(),
        Some(EVENT_REFERENCES) => data
            .iter()
            .map(|d| {
                serde_json::from_str(d)
                    .map(StreamEvent::References)
                    .map_err(StreamError::References)
            })
            .collect(),
        Some(EVENT_ERRORS) => data
            .iter()
            .map(|d| {
                serde_json::from_str(d)
                    .map(StreamEvent::Errors)
                    .map_err(StreamError::Errors)
            })
            .collect(),
        _ => data
            .iter()
            .filter(|d| !d.is_empty() && d.as_str() != DONE)
            .map(|d| {
                serde_json::from_str(d)
                    .map(StreamEvent::Chunk)
                    .map_err(StreamError::Chunk)
            })
            .collect(),
    }
}

/// Iterator over the events of a blocking event stream.
///
/// Yields at most one error, after which it is exhausted. Reaching end of
/// input ends iteration without an error.
pub struct StreamDecoder<R> {
    reader: R,
    parser: EventParser,
    ready: VecDeque<StreamEvent>,
    line: String,
    done: bool,
}

impl<R: BufRead> StreamDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: EventParser::new(),
            ready: VecDeque::new(),
            line: String::new(),
            done: false,
        }
    }

    fn read_frame(&mut self) -> Result<Option<RawEvent>, StreamError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.done = true;
                return Ok(self.parser.finish());
            }
            let line = self.line.strip_suffix('\n').unwrap_or(&self.line);
            if let Some(raw) = self.parser.push_line(line) {
                return Ok(Some(raw));
            }
        }
    }
}

impl<R: BufRead> Iterator for StreamDecoder<R> {
    type Item = Result<StreamEvent, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            let decoded = self
                .read_frame()
                .and_then(|raw| raw.map(decode_event).transpose());
            match decoded {
                Ok(Some(events)) => self.ready.extend(events),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Decode `reader` to the end, handing every event to `emit`.
pub fn parse_and_emit<R, F>(reader: R, mut emit: F) -> Result<(), StreamError>
where
    R: BufRead,
    F: FnMut(StreamEvent),
{
    for event in StreamDecoder::new(reader) {
        emit(event?);
    }
    Ok(())
}
