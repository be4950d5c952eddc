//! In-process fake backend shared by the view-model tests.

use std::{collections::HashMap, collections::VecDeque, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    domain::{Article, ArticleId, Comment, CommentId, UserId, UserRecord},
    error::ApiErrorBody,
    protocol::{
        ArticleListResponse, ArticleRef, CommentBody, CommentListResponse, VerifyRequest,
        VerifyResponse, ViewResponse,
    },
};
use tokio::{
    net::TcpListener,
    sync::{Mutex, Notify},
};

use crate::{
    comments::CommentStore,
    engagement::EngagementClient,
    http::{ApiClient, ApiConfig},
    registry::ArticleRegistry,
    session::{InMemorySession, Session},
};

pub(crate) const TEST_TOKEN: &str = "test-token";
pub(crate) const TEST_ARTICLE_ID: &str = "art-1";
pub(crate) const TEST_OTP: &str = "123456";

pub(crate) struct BackendState {
    pub view_calls: u32,
    pub view_bodies: Vec<Article>,
    pub view_status: StatusCode,
    pub view_delay: Duration,
    pub view_hints: ViewResponse,
    pub bookmark_calls: u32,
    pub bookmark_status: StatusCode,
    pub like_calls: u32,
    pub like_status: StatusCode,
    /// Per-call statuses in arrival order; `like_status` once drained.
    pub like_statuses: VecDeque<StatusCode>,
    /// Per-call gates in arrival order; a gated call waits for `notify_one`.
    pub like_gates: VecDeque<Arc<Notify>>,
    pub toggled_article_ids: Vec<ArticleId>,
    pub comments: Vec<Comment>,
    pub next_comment: u32,
    pub comment_list_calls: u32,
    pub comment_list_status: StatusCode,
    pub comment_mutation_status: StatusCode,
    pub comment_article_ids: Vec<String>,
    pub created: Vec<String>,
    pub updated: Vec<(String, String)>,
    pub deleted: Vec<String>,
    pub upvoted: Vec<String>,
    pub saved: HashMap<String, Vec<Article>>,
    pub saved_calls: Vec<String>,
    pub saved_status: StatusCode,
    pub verify_send_calls: u32,
    pub verify_send_status: StatusCode,
    pub verify_calls: Vec<String>,
    pub user: UserRecord,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            view_calls: 0,
            view_bodies: Vec::new(),
            view_status: StatusCode::OK,
            view_delay: Duration::ZERO,
            view_hints: ViewResponse {
                article_id: ArticleId::from(TEST_ARTICLE_ID),
                is_bookmarked: None,
                is_liked: None,
                like_count: None,
            },
            bookmark_calls: 0,
            bookmark_status: StatusCode::OK,
            like_calls: 0,
            like_status: StatusCode::OK,
            like_statuses: VecDeque::new(),
            like_gates: VecDeque::new(),
            toggled_article_ids: Vec::new(),
            comments: Vec::new(),
            next_comment: 1,
            comment_list_calls: 0,
            comment_list_status: StatusCode::OK,
            comment_mutation_status: StatusCode::OK,
            comment_article_ids: Vec::new(),
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            upvoted: Vec::new(),
            saved: HashMap::new(),
            saved_calls: Vec::new(),
            saved_status: StatusCode::OK,
            verify_send_calls: 0,
            verify_send_status: StatusCode::OK,
            verify_calls: Vec::new(),
            user: test_user(false),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct Backend {
    pub state: Arc<Mutex<BackendState>>,
}

pub(crate) struct Harness {
    pub backend: Backend,
    pub session: Arc<InMemorySession>,
    pub api: Arc<ApiClient>,
    pub engagement: Arc<EngagementClient>,
    pub registry: Arc<ArticleRegistry>,
    pub store: Arc<CommentStore>,
}

pub(crate) fn test_user(is_verified: bool) -> UserRecord {
    UserRecord {
        id: UserId::from("u-1"),
        display_name: "Reader".to_string(),
        email: "reader@example.com".to_string(),
        phone: None,
        is_verified,
    }
}

pub(crate) fn test_article() -> Article {
    Article {
        title: Some("Storm over the bay".to_string()),
        source_name: Some("Example Times".to_string()),
        ..Article::from_link("https://news.example/storm")
    }
}

pub(crate) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn comment(id: &str, minute: u32, upvotes: u64) -> Comment {
    Comment {
        id: CommentId::from(id),
        author_display_name: "ada".to_string(),
        body_text: format!("comment {id}"),
        created_at: at(minute),
        upvote_count: upvotes,
    }
}

pub(crate) async fn harness() -> Harness {
    harness_with_session(Some(Session::new(TEST_TOKEN).with_user(test_user(false)))).await
}

pub(crate) async fn harness_with_session(session: Option<Session>) -> Harness {
    let backend = Backend::default();
    let base_url = spawn_backend(backend.clone()).await;
    let session = Arc::new(match session {
        Some(session) => InMemorySession::signed_in(session),
        None => InMemorySession::signed_out(),
    });
    let api = ApiClient::new(ApiConfig::new(base_url), session.clone()).expect("api client");
    let engagement = Arc::new(EngagementClient::new(api.clone()));
    let registry = ArticleRegistry::new(engagement.clone());
    let store = Arc::new(CommentStore::new(api.clone()));
    Harness {
        backend,
        session,
        api,
        engagement,
        registry,
        store,
    }
}

/// Polls the backend state until `check` holds.
pub(crate) async fn wait_for(backend: &Backend, check: impl Fn(&BackendState) -> bool) {
    for _ in 0..200 {
        if check(&*backend.state.lock().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("backend never reached expected state");
}

async fn spawn_backend(backend: Backend) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new()
        .route("/api/article/view", post(register_view))
        .route("/api/article/bookmark", patch(toggle_bookmark))
        .route("/api/article/like", patch(toggle_like))
        .route("/api/article/:list", get(saved_list))
        .route(
            "/api/comments/:article_id",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/comments/:article_id/:comment_id",
            patch(update_comment).delete(delete_comment),
        )
        .route(
            "/api/comments/:article_id/:comment_id/upvote",
            patch(upvote_comment),
        )
        .route("/api/user/verify/send", post(send_code))
        .route("/api/user/verify", patch(verify_code))
        .with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api/")
}

type Reply<T> = Result<Json<T>, (StatusCode, Json<ApiErrorBody>)>;

fn reject(status: StatusCode) -> (StatusCode, Json<ApiErrorBody>) {
    (status, Json(ApiErrorBody::new(format!("scripted {status}"))))
}

fn check_auth(headers: &HeaderMap) -> Result<(), (StatusCode, Json<ApiErrorBody>)> {
    let expected = format!("Bearer {TEST_TOKEN}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(reject(StatusCode::UNAUTHORIZED)),
    }
}

fn status_reply(status: StatusCode) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    if status.is_success() {
        Ok(status)
    } else {
        Err(reject(status))
    }
}

async fn register_view(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(article): Json<Article>,
) -> Reply<ViewResponse> {
    check_auth(&headers)?;
    let (status, delay, hints) = {
        let mut state = backend.state.lock().await;
        state.view_calls += 1;
        state.view_bodies.push(article);
        (state.view_status, state.view_delay, state.view_hints.clone())
    };
    tokio::time::sleep(delay).await;
    status_reply(status)?;
    Ok(Json(hints))
}

async fn toggle_bookmark(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<ArticleRef>,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.bookmark_calls += 1;
    state.toggled_article_ids.push(body.article_id);
    status_reply(state.bookmark_status)
}

async fn toggle_like(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<ArticleRef>,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let (status, gate) = {
        let mut state = backend.state.lock().await;
        state.like_calls += 1;
        state.toggled_article_ids.push(body.article_id);
        let status = state.like_statuses.pop_front().unwrap_or(state.like_status);
        (status, state.like_gates.pop_front())
    };
    if let Some(gate) = gate {
        gate.notified().await;
    }
    status_reply(status)
}

async fn saved_list(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(list): Path<String>,
) -> Reply<ArticleListResponse> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.saved_calls.push(list.clone());
    status_reply(state.saved_status)?;
    Ok(Json(ArticleListResponse {
        articles: state.saved.get(&list).cloned().unwrap_or_default(),
    }))
}

async fn list_comments(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(article_id): Path<String>,
) -> Reply<CommentListResponse> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.comment_list_calls += 1;
    state.comment_article_ids.push(article_id);
    status_reply(state.comment_list_status)?;
    Ok(Json(CommentListResponse {
        comments: state.comments.clone(),
    }))
}

async fn create_comment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(article_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.comment_article_ids.push(article_id);
    status_reply(state.comment_mutation_status)?;
    let id = format!("srv-{}", state.next_comment);
    state.next_comment += 1;
    let minute = 30 + state.next_comment;
    state.created.push(body.comment_text.clone());
    state.comments.push(Comment {
        id: CommentId(id),
        author_display_name: "Reader".to_string(),
        body_text: body.comment_text,
        created_at: at(minute),
        upvote_count: 0,
    });
    Ok(StatusCode::CREATED)
}

async fn update_comment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path((article_id, comment_id)): Path<(String, String)>,
    Json(body): Json<CommentBody>,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.comment_article_ids.push(article_id);
    status_reply(state.comment_mutation_status)?;
    state
        .updated
        .push((comment_id.clone(), body.comment_text.clone()));
    if let Some(existing) = state.comments.iter_mut().find(|c| c.id.0 == comment_id) {
        existing.body_text = body.comment_text;
    }
    Ok(StatusCode::OK)
}

async fn delete_comment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path((article_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.comment_article_ids.push(article_id);
    status_reply(state.comment_mutation_status)?;
    state.comments.retain(|c| c.id.0 != comment_id);
    state.deleted.push(comment_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn upvote_comment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path((article_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.comment_article_ids.push(article_id);
    status_reply(state.comment_mutation_status)?;
    if let Some(existing) = state.comments.iter_mut().find(|c| c.id.0 == comment_id) {
        existing.upvote_count += 1;
    }
    state.upvoted.push(comment_id);
    Ok(StatusCode::OK)
}

async fn send_code(
    State(backend): State<Backend>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, Json<ApiErrorBody>)> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.verify_send_calls += 1;
    status_reply(state.verify_send_status)
}

async fn verify_code(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Reply<VerifyResponse> {
    check_auth(&headers)?;
    let mut state = backend.state.lock().await;
    state.verify_calls.push(body.otp.clone());
    if body.otp != TEST_OTP {
        return Err(reject(StatusCode::BAD_REQUEST));
    }
    state.user.is_verified = true;
    Ok(Json(VerifyResponse {
        user: state.user.clone(),
    }))
}
