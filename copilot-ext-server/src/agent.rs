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

//! The agent seam: what a backend implements, and the sink it writes to.

use async_trait::async_trait;
use bytes::Bytes;
use copilot_ext_core::{ChatRequest, SessionInfo, SseWriter};
use std::io::{self, Write};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Everything an agent gets for one verified request.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// The user's GitHub token, from `X-Github-Token`.
    pub token: String,
    pub request: ChatRequest,
    pub session: SessionInfo,
}

/// Agent logic plugged into the `/agent` endpoint.
///
/// `execute` runs on its own task after the response headers have been sent.
/// Returning an error is logged and reported to the user as an agent error
/// frame; it cannot change the response status any more.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn execute(&self, request: AgentRequest, writer: &mut SseWriter<ChannelSink>) -> anyhow::Result<()>;
}

/// Frames a response may hold before the agent's writes start to wait.
pub const RESPONSE_BUFFER_FRAMES: usize = 16;

/// [`Write`] sink feeding a streaming response body.
///
/// Each `write` becomes one body chunk on a bounded channel. When the channel
/// is full, a write waits for the client to drain it: through
/// [`tokio::task::block_in_place`] on a multi-threaded runtime, or directly
/// outside any runtime. A current-thread runtime cannot park the writer, so
/// there a full channel fails the write with [`io::ErrorKind::WouldBlock`].
/// Once the receiving side is gone (the client hung up), writes fail with
/// [`io::ErrorKind::BrokenPipe`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Bytes>,
}

impl ChannelSink {
    pub fn channel() -> (Self, Receiver<Bytes>) {
        Self::with_capacity(RESPONSE_BUFFER_FRAMES)
    }

    pub fn with_capacity(frames: usize) -> (Self, Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(frames.max(1));
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, frame: Bytes) -> io::Result<()> {
        let flavor = Handle::try_current().ok().map(|h| h.runtime_flavor());

        match flavor {
            Some(RuntimeFlavor::CurrentThread) => self.tx.try_send(frame).map_err(|e| match e {
                TrySendError::Full(_) => io::Error::new(io::ErrorKind::WouldBlock, "response buffer full"),
                TrySendError::Closed(_) => broken_pipe(),
            }),
            Some(_) => tokio::task::block_in_place(|| self.tx.blocking_send(frame)).map_err(|_| broken_pipe()),
            None => self.tx.blocking_send(frame).map_err(|_| broken_pipe()),
        }
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "response stream closed")
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(Bytes::copy_from_slice(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.tx.is_closed() {
            return Err(broken_pipe());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_forwards_frames() {
        let (sink, mut rx) = ChannelSink::channel();
        let mut writer = SseWriter::new(sink);
        writer.write_delta("id", "hi").unwrap();
        writer.write_done().unwrap();

        let first = rx.try_recv().unwrap();
        assert!(first.starts_with(b"data: {"));
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"data: [DONE]\n\n"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_broken_pipe() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        assert!(sink.is_closed());

        let mut writer = SseWriter::new(sink);
        let err = writer.write_done().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_full_buffer_on_current_thread() {
        let (sink, mut rx) = ChannelSink::with_capacity(1);
        let mut writer = SseWriter::new(sink);
        writer.write_done().unwrap();

        let err = writer.write_done().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        rx.recv().await.unwrap();
        writer.write_done().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_writer_waits_for_reader() {
        let (sink, mut rx) = ChannelSink::with_capacity(1);
        let writer = tokio::spawn(async move {
            let mut writer = SseWriter::new(sink);
            for i in 0..3 {
                writer.write_delta("id", &i.to_string())?;
            }
            writer.write_done()
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!writer.is_finished());

        let mut frames = 0;
        while rx.recv().await.is_some() {
            frames += 1;
        }
        assert_eq!(frames, 4);
        writer.await.unwrap().unwrap();
    }
}
