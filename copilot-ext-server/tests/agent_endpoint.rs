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

//! End-to-end requests through the router with a locally generated key.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use copilot_ext_core::reference::{AgentRef, ReferenceData};
use copilot_ext_core::sse::StreamDecoder;
use copilot_ext_core::{EcdsaPayloadVerifier, Reference, SseWriter, StreamEvent};
use copilot_ext_server::config::ServerConfig;
use copilot_ext_server::{build_verifier, router, Agent, AgentRequest, ChannelSink};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Replies with one reference and a description of the resolved session.
#[derive(Default)]
struct EchoAgent {
    calls: AtomicUsize,
}

#[async_trait]
impl Agent for EchoAgent {
    async fn execute(&self, request: AgentRequest, writer: &mut SseWriter<ChannelSink>) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        writer.write_reference(&Reference::new(
            "agent",
            ReferenceData::Agent(request.session.agent.clone()),
        ))?;
        let text = match &request.session.issue {
            Some(issue) => format!("issue {} for {}", issue.number, request.token),
            None => format!("no issue for {}", request.token),
        };
        writer.write_delta("resp-1", &text)?;
        writer.write_stop("resp-1")?;
        Ok(())
    }
}

struct FailingAgent;

#[async_trait]
impl Agent for FailingAgent {
    async fn execute(&self, _request: AgentRequest, writer: &mut SseWriter<ChannelSink>) -> anyhow::Result<()> {
        writer.write_delta("resp-1", "partial")?;
        anyhow::bail!("upstream unavailable")
    }
}

fn signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x42; 32]).unwrap()
}

fn public_pem() -> String {
    signing_key()
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}

fn sign(key: &SigningKey, body: &[u8]) -> String {
    let signature: Signature = key.sign(body);
    base64::engine::general_purpose::STANDARD.encode(signature.to_der().as_bytes())
}

fn app(agent: Arc<dyn Agent>) -> Router {
    let verifier = EcdsaPayloadVerifier::from_pem(&public_pem()).unwrap();
    router(Arc::new(verifier), agent)
}

fn issue_body() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "agent": "myagent",
        "messages": [
            {"role": "user", "name": "_session", "content": "", "copilot_references": [{
                "type": "github.current-url", "id": "u",
                "data": {"url": "https://github.com/acme/widgets/issues/42"}
            }]},
            {"role": "user", "content": "what is this about?"}
        ]
    }))
    .unwrap()
}

fn agent_request(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/agent")
        .header("Github-Public-Key-Identifier", "key-1")
        .header("X-Github-Token", "user-token");
    if let Some(signature) = signature {
        builder = builder.header("Github-Public-Key-Signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

fn signed(body: Vec<u8>) -> Request<Body> {
    let signature = sign(&signing_key(), &body);
    agent_request(body, Some(signature))
}

async fn events(response: Response) -> Vec<StreamEvent> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    StreamDecoder::new(Cursor::new(bytes.to_vec()))
        .collect::<Result<_, _>>()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_signed_request_streams_reply() {
    let agent = Arc::new(EchoAgent::default());
    let response = app(agent.clone()).oneshot(signed(issue_body())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");

    let events = events(response).await;
    assert_eq!(events.len(), 3);
    match &events[0] {
        StreamEvent::References(refs) => {
            assert_eq!(refs[0].data, ReferenceData::Agent(AgentRef::for_app("myagent")));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(&events[1], StreamEvent::Chunk(c) if c.content() == "issue 42 for user-token"));
    assert!(matches!(&events[2], StreamEvent::Chunk(c) if c.is_stop()));
    assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_signature_header() {
    let agent = Arc::new(EchoAgent::default());
    let response = app(agent.clone())
        .oneshot(agent_request(issue_body(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_undecodable_signature() {
    let response = app(Arc::new(EchoAgent::default()))
        .oneshot(agent_request(issue_body(), Some("%%%".into())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_foreign_signature_is_unauthorized() {
    let body = issue_body();
    let foreign = sign(&SigningKey::from_slice(&[0x07; 32]).unwrap(), &body);
    let agent = Arc::new(EchoAgent::default());
    let response = app(agent.clone())
        .oneshot(agent_request(body, Some(foreign)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_json() {
    let response = app(Arc::new(EchoAgent::default()))
        .oneshot(signed(b"{\"messages\": [".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_mismatch_skips_agent() {
    let body = serde_json::to_vec(&json!({
        "agent": "myagent",
        "messages": [
            {"role": "user", "content": "hi", "copilot_references": [{
                "type": "github.repository", "id": "r", "data": {"name": "widgets", "ownerLogin": "acme"}
            }]},
            {"role": "assistant", "content": "hello", "copilot_references": [{
                "type": "github.agent", "id": "a", "data": {"login": "someone-else"}
            }]}
        ]
    }))
    .unwrap();

    let agent = Arc::new(EchoAgent::default());
    let response = app(agent.clone()).oneshot(signed(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_agent_failure_reported_in_stream() {
    let response = app(Arc::new(FailingAgent)).oneshot(signed(issue_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = events(response).await;
    assert_eq!(events.len(), 2);
    match &events[1] {
        StreamEvent::Errors(errors) => {
            assert_eq!(errors[0].code, "agent_failure");
            assert_eq!(errors[0].message, "upstream unavailable");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_webhook_and_ping() {
    let app = app(Arc::new(EchoAgent::default()));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .body(Body::from("{\"action\":\"created\"}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/_ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(to_bytes(response.into_body(), 16).await.unwrap(), "OK");
}

async fn spawn_keys_endpoint(status: StatusCode, keys: Value) -> String {
    let app = Router::new().route("/keys", get(move || async move { (status, Json(keys)) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/keys", addr)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verifier_fetches_current_key() {
    let url = spawn_keys_endpoint(
        StatusCode::OK,
        json!({"public_keys": [
            {"key_identifier": "old", "key": "garbage", "is_current": false},
            {"key_identifier": "key-1", "key": public_pem().replace('\n', "\\n"), "is_current": true}
        ]}),
    )
    .await;

    let mut config = ServerConfig::default();
    config.verifier.public_keys_url = url;
    let verifier = build_verifier(&config).await.unwrap();
    assert_eq!(verifier.key_identifier(), Some("key-1"));

    let response = router(Arc::new(verifier), Arc::new(EchoAgent::default()))
        .oneshot(signed(issue_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verifier_fetch_failures() {
    let mut config = ServerConfig::default();

    config.verifier.public_keys_url =
        spawn_keys_endpoint(StatusCode::OK, json!({"public_keys": [{"key_identifier": "x", "key": "y"}]})).await;
    let err = build_verifier(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("could not find current public key"));

    config.verifier.public_keys_url = spawn_keys_endpoint(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
    let err = build_verifier(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("unexpected status"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pinned_key_skips_fetch() {
    let mut config = ServerConfig::default();
    config.verifier.public_keys_url = "http://127.0.0.1:1/keys".into();
    config.verifier.public_key = Some(public_pem());

    let verifier = build_verifier(&config).await.unwrap();
    assert_eq!(verifier.key_identifier(), None);
}
