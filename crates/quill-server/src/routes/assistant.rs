//! Assistant session and turn endpoints.
//!
//! The turn endpoint always answers 200 with a well-formed
//! [`TurnReply`]; failure detail travels in the body's `error` field so
//! clients have one shape to parse. HTTP status codes only distinguish
//! transport-level problems (malformed JSON, unknown route).

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use quill_flow::{TurnReply, TurnRequest};
use quill_types::DraftDocument;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::{AppState, client_context};

/// Header carrying the session token for read-only status checks.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Response body for token issuance.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The newly issued bearer token.
    pub token: String,
}

/// Response body for the read-only session status check.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    /// Whether the presented token is currently valid.
    pub valid: bool,

    /// Draft after the most recent turn, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftDocument>,

    /// The most recent assistant response, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response: Option<String>,
}

/// Response body for the administrative cleanup operation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    /// Registry entries evicted.
    pub removed: usize,

    /// Conversations dropped from the store.
    pub conversations_removed: usize,
}

/// `POST /api/v1/assistant/session` — issue a token for this client.
pub async fn issue_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<TokenResponse> {
    let ctx = client_context(&headers);
    let token = state.handler.issue_session(&ctx).await;
    Json(TokenResponse { token })
}

/// `POST /api/v1/assistant/message` — process one turn.
pub async fn message_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TurnRequest>,
) -> Json<TurnReply> {
    let ctx = client_context(&headers);
    Json(state.handler.handle(&ctx, request).await)
}

/// `GET /api/v1/assistant/session` — read-only status for resume.
///
/// Invalid, missing, or expired tokens report `valid: false` rather
/// than an HTTP error; the check is a probe, not a gate.
pub async fn session_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionStatusResponse> {
    let ctx = client_context(&headers);
    let token = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match state.handler.session_status(token, &ctx).await {
        Ok(resume) => Json(SessionStatusResponse {
            valid: true,
            draft: resume.draft,
            last_response: resume.response,
        }),
        Err(err) => {
            debug!(error = %err, "Session status check failed");
            Json(SessionStatusResponse {
                valid: false,
                draft: None,
                last_response: None,
            })
        }
    }
}

/// `POST /api/v1/assistant/cleanup` — evict expired sessions. Idempotent.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let report = state.handler.cleanup().await;
    Json(CleanupResponse {
        removed: report.sessions_removed,
        conversations_removed: report.conversations_removed,
    })
}

/// Create the assistant routes, nested under `/api/v1/assistant`.
pub fn assistant_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/session",
            post(issue_session_handler).get(session_status_handler),
        )
        .route("/message", post(message_handler))
        .route("/cleanup", post(cleanup_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use quill_flow::{FlowOrchestrator, TurnHandler};
    use quill_llm::MockGenerator;
    use quill_session::{ConversationStore, SessionConfig, StoreConfig, TokenService};
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    const CLEAN_VERDICT: &str =
        "```json\n{\"isClean\": true, \"message\": \"fine\", \"violatedPolicy\": null}\n```";
    const ENGLISH: &str = "```json\n{\"primary\": \"English\", \"secondary\": null}\n```";
    const ANALYSIS: &str = "```json\n{\"reply\": \"All set.\", \"taskOrder\": {}}\n```";

    fn app(responses: Vec<&str>) -> Router {
        let tokens = TokenService::new(SessionConfig::new(b"test-secret".to_vec()));
        let store = ConversationStore::new(StoreConfig::new());
        let generator = Arc::new(MockGenerator::new(
            responses.into_iter().map(String::from).collect(),
        ));
        let handler = TurnHandler::new(tokens, store, FlowOrchestrator::new(generator));
        let state = AppState::new(handler, ServerConfig::new());
        assistant_routes().with_state(state)
    }

    fn with_client_headers(builder: axum::http::request::Builder) -> axum::http::request::Builder {
        builder
            .header("x-forwarded-for", "203.0.113.7")
            .header(header::USER_AGENT, "Mozilla/5.0")
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn issue_token(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                with_client_headers(Request::builder().method("POST").uri("/session"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token: TokenResponse = body_json(response).await;
        token.token
    }

    #[tokio::test]
    async fn test_issue_then_message_roundtrip() {
        let app = app(vec![CLEAN_VERDICT, ENGLISH, ANALYSIS, "All set."]);
        let token = issue_token(&app).await;

        let body = serde_json::json!({
            "sessionToken": token,
            "message": "hello there",
        });
        let response = app
            .oneshot(
                with_client_headers(Request::builder().method("POST").uri("/message"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let reply: TurnReply = body_json(response).await;
        assert!(reply.error.is_none());
        assert_eq!(reply.answer, "All set.");
    }

    #[tokio::test]
    async fn test_message_with_bad_token_is_well_formed_failure() {
        let app = app(vec![]);

        let body = serde_json::json!({
            "sessionToken": "bogus",
            "message": "hello",
        });
        let response = app
            .oneshot(
                with_client_headers(Request::builder().method("POST").uri("/message"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Failure detail is in the body; the transport still says 200.
        assert_eq!(response.status(), StatusCode::OK);
        let reply: TurnReply = body_json(response).await;
        let err = reply.error.unwrap();
        assert_eq!(err.kind, "session");
        assert!(err.should_reset);
    }

    #[tokio::test]
    async fn test_status_reports_valid_and_invalid() {
        let app = app(vec![CLEAN_VERDICT, ENGLISH, ANALYSIS, "All set."]);
        let token = issue_token(&app).await;

        let response = app
            .clone()
            .oneshot(
                with_client_headers(Request::builder().uri("/session"))
                    .header(SESSION_TOKEN_HEADER, &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status: SessionStatusResponse = body_json(response).await;
        assert!(status.valid);
        assert!(status.last_response.is_none());

        let response = app
            .oneshot(
                with_client_headers(Request::builder().uri("/session"))
                    .header(SESSION_TOKEN_HEADER, "bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status: SessionStatusResponse = body_json(response).await;
        assert!(!status.valid);
    }

    #[tokio::test]
    async fn test_status_after_turn_returns_resume_state() {
        let app = app(vec![CLEAN_VERDICT, ENGLISH, ANALYSIS, "All set."]);
        let token = issue_token(&app).await;

        let body = serde_json::json!({ "sessionToken": token, "message": "hi" });
        app.clone()
            .oneshot(
                with_client_headers(Request::builder().method("POST").uri("/message"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                with_client_headers(Request::builder().uri("/session"))
                    .header(SESSION_TOKEN_HEADER, &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status: SessionStatusResponse = body_json(response).await;
        assert!(status.valid);
        assert_eq!(status.last_response.as_deref(), Some("All set."));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let app = app(vec![]);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/cleanup")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let report: CleanupResponse = body_json(response).await;
            assert_eq!(report.removed, 0);
        }
    }
}
