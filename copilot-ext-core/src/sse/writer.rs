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

//! Encoder for the agent response stream.

use serde::Serialize;
use std::io::{self, Write};

use super::{DONE, EVENT_CONFIRMATION, EVENT_ERRORS, EVENT_REFERENCES};
use crate::agent_error::AgentError;
use crate::chunk::ChatCompletionChunk;
use crate::confirmation::Confirmation;
use crate::reference::Reference;

/// Event-stream encoder over any [`Write`] sink.
///
/// Every method writes whole frames with a single `write_all` and then
/// flushes, so a reader on the other side never sees half a frame.
#[derive(Debug)]
pub struct SseWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> SseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// `data: <json>\n\n`
    pub fn write_data<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        self.buf.clear();
        push_data(&mut self.buf, value)?;
        self.send()
    }

    /// `data: [DONE]\n\n`
    pub fn write_done(&mut self) -> io::Result<()> {
        self.buf.clear();
        push_done(&mut self.buf);
        self.send()
    }

    /// `event: <name>\n`, tagging the data frame that follows.
    pub fn write_event(&mut self, name: &str) -> io::Result<()> {
        self.buf.clear();
        push_event(&mut self.buf, name);
        self.send()
    }

    pub fn write_confirmation(&mut self, confirmation: &Confirmation) -> io::Result<()> {
        self.write_tagged(EVENT_CONFIRMATION, confirmation)
    }

    /// Writes nothing for an empty slice.
    pub fn write_references(&mut self, references: &[Reference]) -> io::Result<()> {
        if references.is_empty() {
            return Ok(());
        }
        self.write_tagged(EVENT_REFERENCES, references)
    }

    pub fn write_reference(&mut self, reference: &Reference) -> io::Result<()> {
        self.write_references(std::slice::from_ref(reference))
    }

    /// Writes nothing for an empty slice.
    pub fn write_errors(&mut self, errors: &[AgentError]) -> io::Result<()> {
        if errors.is_empty() {
            return Ok(());
        }
        self.write_tagged(EVENT_ERRORS, errors)
    }

    pub fn write_error(&mut self, error: &AgentError) -> io::Result<()> {
        self.write_errors(std::slice::from_ref(error))
    }

    /// One assistant content delta.
    pub fn write_delta(&mut self, id: &str, content: &str) -> io::Result<()> {
        self.write_data(&ChatCompletionChunk::delta(id, content))
    }

    /// The stop chunk followed by the done frame. Call once, after the last
    /// delta.
    pub fn write_stop(&mut self, id: &str) -> io::Result<()> {
        self.buf.clear();
        push_data(&mut self.buf, &ChatCompletionChunk::stop(id))?;
        push_done(&mut self.buf);
        self.send()
    }

    fn write_tagged<T: Serialize + ?Sized>(&mut self, event: &str, value: &T) -> io::Result<()> {
        self.buf.clear();
        push_event(&mut self.buf, event);
        push_data(&mut self.buf, value)?;
        self.send()
    }

    fn send(&mut self) -> io::Result<()> {
        self.inner.write_all(&self.buf)?;
        self.inner.flush()
    }
}

fn push_event(buf: &mut Vec<u8>, name: &str) {
    buf.extend_from_slice(b"event: ");
    buf.extend_from_slice(name.as_bytes());
    buf.push(b'\n');
}

fn push_data<T: Serialize + ?Sized>(buf: &mut Vec<u8>, value: &T) -> io::Result<()> {
    buf.extend_from_slice(b"data: ");
    serde_json::to_writer(&mut *buf, value)?;
    buf.extend_from_slice(b"\n\n");
    Ok(())
}

fn push_done(buf: &mut Vec<u8>) {
    buf.extend_from_slice(b"data: ");
    buf.extend_from_slice(DONE.as_bytes());
    buf.extend_from_slice(b"\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_error::ErrorType;
    use crate::reference::{ClientFileRef, ReferenceData};
    use serde_json::json;

    /// Records how often the sink was flushed.
    #[derive(Default)]
    struct CountingSink {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for CountingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn output(writer: SseWriter<CountingSink>) -> String {
        String::from_utf8(writer.into_inner().bytes).unwrap()
    }

    #[test]
    fn test_data_and_done_frames() {
        let mut writer = SseWriter::new(CountingSink::default());
        writer.write_data(&json!({"a": 1})).unwrap();
        writer.write_done().unwrap();
        assert_eq!(writer.get_ref().flushes, 2);
        assert_eq!(output(writer), "data: {\"a\":1}\n\ndata: [DONE]\n\n");
    }

    #[test]
    fn test_event_frame() {
        let mut writer = SseWriter::new(CountingSink::default());
        writer.write_event("custom").unwrap();
        assert_eq!(output(writer), "event: custom\n");
    }

    #[test]
    fn test_empty_lists_write_nothing() {
        let mut writer = SseWriter::new(CountingSink::default());
        writer.write_errors(&[]).unwrap();
        writer.write_references(&[]).unwrap();
        assert_eq!(writer.get_ref().flushes, 0);
        assert!(writer.into_inner().bytes.is_empty());
    }

    #[test]
    fn test_tagged_frames() {
        let mut writer = SseWriter::new(CountingSink::default());
        writer
            .write_error(&AgentError::new(ErrorType::Agent, "boom", "it broke"))
            .unwrap();
        writer
            .write_reference(&Reference::new(
                "f1",
                ReferenceData::ClientFile(ClientFileRef {
                    content: "x".into(),
                    language: "rust".into(),
                    ..Default::default()
                }),
            ))
            .unwrap();
        writer
            .write_confirmation(&Confirmation::action("Sure?", "Really", json!(null)))
            .unwrap();

        let text = output(writer);
        let frames: Vec<&str> = text.split_terminator("\n\n").collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames[0],
            r#"event: copilot_errors
data: [{"type":"agent","code":"boom","message":"it broke","identifier":""}]"#
        );
        assert!(frames[1].starts_with("event: copilot_references\ndata: [{\"type\":\"client.file\""));
        assert!(frames[2].starts_with("event: copilot_confirmation\ndata: {\"type\":\"action\""));
    }

    #[test]
    fn test_stop_ends_with_done() {
        let mut writer = SseWriter::new(CountingSink::default());
        writer.write_stop("resp-1").unwrap();
        assert_eq!(
            output(writer),
            "data: {\"id\":\"resp-1\",\"choices\":[{\"index\":0,\"finish_reason\":\"stop\",\"delta\":{\"content\":\"\"}}]}\n\ndata: [DONE]\n\n"
        );
    }

    #[test]
    fn test_write_error_propagates() {
        let mut writer = SseWriter::new(BrokenSink);
        let err = writer.write_delta("id", "hi").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
