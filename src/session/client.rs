//! Session client for the remote agent protocol
//!
//! Thin RPC client: every failure, network or non-2xx, propagates unmodified.
//! There is no retry and no timeout beyond what the `reqwest::Client` was
//! built with.

use super::identity::IdentityProvider;
use super::stream::{fragment_from_frame, AnswerStream, FrameDecoder};
use super::types::{
    AgentSession, CreateSessionRequest, InteractionSummaryResponse, QuestionRequest,
    TranscriptionRequest, TranscriptionResponse,
};
use crate::error::{Error, Result};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Client for one agent's session endpoints
#[derive(Clone)]
pub struct SessionClient {
    base_url: String,
    http: Client,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl SessionClient {
    /// Create a client for the agent served at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        http: Client,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            identity,
        }
    }

    /// `{baseUrl}/sessions/{id}`
    pub fn session_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}", self.base_url, session_id)
    }

    /// Open a conversation, signing in first when an identity is configured
    pub async fn create_session(&self, locales: &[String]) -> Result<AgentSession> {
        if let Some(identity) = &self.identity {
            identity.login().await?;
        }
        let url = format!("{}/sessions", self.base_url);
        let session: AgentSession = self
            .post_json(&url, &CreateSessionRequest { locales })
            .await?;
        tracing::info!("Created session {} on {}", session.id, self.base_url);
        Ok(session)
    }

    /// Ask a question and stream the answer back fragment by fragment.
    ///
    /// The request is only sent when the returned stream is first polled.
    pub fn ask(&self, message: &str, session_id: &str) -> AnswerStream {
        let client = self.clone();
        let url = format!("{}/questions", self.session_url(session_id));
        let question = message.to_string();

        AnswerStream::new(async_stream::try_stream! {
            tracing::debug!("POST {}", url);
            let request = client
                .build_http_post(&url, &QuestionRequest { question: &question })
                .await?;
            let response = request.send().await?.error_for_status()?;

            let mut body = response.bytes_stream();
            let mut decoder = FrameDecoder::new();
            while let Some(chunk) = body.next().await {
                decoder.extend(&chunk?);
                while let Some(frame) = decoder.next_frame()? {
                    yield fragment_from_frame(frame)?;
                }
            }
            decoder.finish()?;
        })
    }

    /// Transcribe base64-encoded audio
    pub async fn transcript_audio(&self, base64_audio: &str, session_id: &str) -> Result<String> {
        let url = format!("{}/transcriptions", self.session_url(session_id));
        let response: TranscriptionResponse = self
            .post_json(&url, &TranscriptionRequest { file: base64_audio })
            .await?;
        Ok(response.text)
    }

    /// Submit a recorded interaction and get back its summary
    pub async fn solve_interaction_summary(
        &self,
        detail: &serde_json::Value,
        session_id: &str,
    ) -> Result<String> {
        let url = format!("{}/interactions", self.session_url(session_id));
        let response: InteractionSummaryResponse = self.post_json(&url, detail).await?;
        Ok(response.summary)
    }

    /// Build a JSON POST, adding a bearer token when a user is signed in
    pub async fn build_http_post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<RequestBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(identity) = &self.identity {
            if let Some(user) = identity.get_user().await? {
                let value = HeaderValue::from_str(&format!("Bearer {}", user.access_token))
                    .map_err(|_| {
                        Error::Auth("access token is not a valid header value".to_string())
                    })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(self
            .http
            .post(url)
            .headers(headers)
            .body(serde_json::to_vec(body)?))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!("POST {}", url);
        let response = self
            .build_http_post(url, body)
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.identity.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::identity::{AuthUser, StaticTokenIdentity};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    struct CountingIdentity {
        logins: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for CountingIdentity {
        async fn login(&self) -> Result<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_user(&self) -> Result<Option<AuthUser>> {
            Ok(Some(AuthUser {
                access_token: "secret".to_string(),
            }))
        }
    }

    struct FailingIdentity;

    #[async_trait]
    impl IdentityProvider for FailingIdentity {
        async fn login(&self) -> Result<()> {
            Err(Error::Auth("login cancelled".to_string()))
        }

        async fn get_user(&self) -> Result<Option<AuthUser>> {
            Ok(None)
        }
    }

    fn client(server: &MockServer, identity: Option<Arc<dyn IdentityProvider>>) -> SessionClient {
        SessionClient::new(server.uri(), Client::new(), identity)
    }

    #[tokio::test]
    async fn test_create_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"locales": ["en", "es"]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "s-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server, None)
            .create_session(&["en".to_string(), "es".to_string()])
            .await
            .unwrap();
        assert_eq!(session.id, "s-1");
    }

    #[tokio::test]
    async fn test_create_session_logs_in_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "s-2"})))
            .expect(1)
            .mount(&server)
            .await;

        let identity = Arc::new(CountingIdentity {
            logins: AtomicUsize::new(0),
        });
        let session = client(&server, Some(identity.clone()))
            .create_session(&["en".to_string()])
            .await
            .unwrap();

        assert_eq!(session.id, "s-2");
        assert_eq!(identity.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "s"})))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, Some(Arc::new(FailingIdentity)))
            .create_session(&[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_unauthenticated_without_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(|req: &Request| {
                if req.headers.contains_key("authorization") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"id": "anon"}))
                }
            })
            .mount(&server)
            .await;

        let session = client(&server, None).create_session(&[]).await.unwrap();
        assert_eq!(session.id, "anon");
    }

    #[tokio::test]
    async fn test_identity_without_user_sends_no_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(|req: &Request| {
                if req.headers.contains_key("authorization") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"id": "anon"}))
                }
            })
            .mount(&server)
            .await;

        let identity: Arc<dyn IdentityProvider> = Arc::new(StaticTokenIdentity::default());
        let session = client(&server, Some(identity))
            .create_session(&[])
            .await
            .unwrap();
        assert_eq!(session.id, "anon");
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).create_session(&[]).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_ask_streams_string_frames() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s-1/questions"))
            .and(body_json(json!({"question": "what time is it?"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("\"It is \"\n\"ten \"\n\"o'clock\"\n"),
            )
            .mount(&server)
            .await;

        let mut stream = client(&server, None).ask("what time is it?", "s-1");
        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next_fragment().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["It is ", "ten ", "o'clock"]);
    }

    #[tokio::test]
    async fn test_ask_streams_object_frames() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s-1/questions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"answer\":\"Hello\"}\n{\"answer\":\", world\"}\n"),
            )
            .mount(&server)
            .await;

        let answer = client(&server, None)
            .ask("hi", "s-1")
            .collect_answer()
            .await
            .unwrap();
        assert_eq!(answer, "Hello, world");
    }

    #[tokio::test]
    async fn test_ask_streams_mixed_frames() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s-1/questions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("\"a\"{\"answer\":\"b\"}\n\"c\""),
            )
            .mount(&server)
            .await;

        let fragments: Vec<String> = client(&server, None)
            .ask("hi", "s-1")
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_ask_is_lazy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"x\""))
            .expect(0)
            .mount(&server)
            .await;

        let stream = client(&server, None).ask("hi", "s-1");
        drop(stream);
    }

    #[tokio::test]
    async fn test_ask_http_error_is_first_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut stream = client(&server, None).ask("hi", "missing");
        let first = stream.next_fragment().await.unwrap();
        assert!(matches!(first, Err(Error::Http(_))));
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn test_ask_truncated_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"ok\"\n{\"answer\":\"cut"))
            .mount(&server)
            .await;

        let mut stream = client(&server, None).ask("hi", "s-1");
        assert_eq!(stream.next_fragment().await.unwrap().unwrap(), "ok");
        assert!(matches!(
            stream.next_fragment().await,
            Some(Err(Error::Protocol(_)))
        ));
    }

    /// Read one HTTP request (head and Content-Length body) off the socket
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    async fn write_chunk(socket: &mut TcpStream, data: &str) {
        let chunk = format!("{:x}\r\n{}\r\n", data.len(), data);
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_ask_yields_before_body_completes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            assert!(request.starts_with("POST /sessions/s-1/questions "));

            let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: application/x-ndjson\r\n\
                        Transfer-Encoding: chunked\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            write_chunk(&mut socket, "\"Hel\"\n").await;

            // Hold the rest of the body until the client saw the first fragment
            release_rx.await.unwrap();
            write_chunk(&mut socket, "{\"answer\":\"lo\"}\n").await;
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });

        let client = SessionClient::new(format!("http://{}", addr), Client::new(), None);
        let mut stream = client.ask("hi", "s-1");

        let first = timeout(Duration::from_secs(5), stream.next_fragment())
            .await
            .expect("first fragment arrived while the body was still open");
        assert_eq!(first.unwrap().unwrap(), "Hel");

        release_tx.send(()).unwrap();
        assert_eq!(stream.next_fragment().await.unwrap().unwrap(), "lo");
        assert!(stream.next_fragment().await.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_transcript_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s-1/transcriptions"))
            .and(body_json(json!({"file": "UklGRg=="})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello there"})))
            .mount(&server)
            .await;

        let text = client(&server, None)
            .transcript_audio("UklGRg==", "s-1")
            .await
            .unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn test_solve_interaction_summary() {
        let server = MockServer::start().await;
        let detail = json!({"url": "https://x.com/api/orders", "status": 500});
        Mock::given(method("POST"))
            .and(path("/sessions/s-1/interactions"))
            .and(body_json(detail.clone()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"summary": "Order failed"})),
            )
            .mount(&server)
            .await;

        let summary = client(&server, None)
            .solve_interaction_summary(&detail, "s-1")
            .await
            .unwrap();
        assert_eq!(summary, "Order failed");
    }

    #[test]
    fn test_session_url() {
        let client = SessionClient::new("https://agent.example", Client::new(), None);
        assert_eq!(client.session_url("abc"), "https://agent.example/sessions/abc");
    }
}
