//! Common test utilities for the portal's HTTP tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::put;
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use uuid::Uuid;

use chapter_portal::config::{BlobConfig, Config, DEFAULT_MAX_UPLOAD_BYTES};
use chapter_portal::models::profile::{NewProfile, Profile, Role};
use chapter_portal::routes;
use chapter_portal::state::AppState;
use chapter_portal::store::{InMemoryStore, PortalStore};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Objects received by the stub blob store: (key, size).
pub type BlobLog = Arc<Mutex<Vec<(String, usize)>>>;

/// A portal instance served on an ephemeral port, backed by the in-memory store.
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<InMemoryStore>,
    pub blobs: BlobLog,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let blobs: BlobLog = Arc::default();
        let blob_addr = spawn_blob_stub(blobs.clone()).await;

        let config = Config {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            database_url: None,
            database_max_connections: 1,
            jwt_secret: JWT_SECRET.to_string(),
            jwt_audience: None,
            blob: BlobConfig {
                base_url: Some(format!("http://{blob_addr}")),
                token: Some("blob-token".to_string()),
                bucket: "documents".to_string(),
            },
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_allowed_origin: None,
        };

        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config, store.clone());
        state.content.seed_defaults().await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes::router(state)).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            store,
            blobs,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Insert a profile directly and return a token for it.
    pub async fn user(&self, role: Role) -> (Profile, String) {
        let id = Uuid::new_v4();
        let email = format!("{role}-{id}@example.com");
        let profile = self
            .store
            .insert_profile(NewProfile {
                id,
                email: email.clone(),
                full_name: format!("Test {role}"),
                school_year: None,
                role,
            })
            .await
            .unwrap();
        (profile, token(id, &email))
    }
}

pub fn token(user_id: Uuid, email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": user_id,
        "email": email,
        "iat": now,
        "exp": now + 3600,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn spawn_blob_stub(log: BlobLog) -> SocketAddr {
    async fn store_object(
        State(log): State<BlobLog>,
        Path(key): Path<String>,
        body: Bytes,
    ) -> StatusCode {
        log.lock().unwrap().push((key, body.len()));
        StatusCode::OK
    }

    let app = Router::new()
        .route("/{*key}", put(store_object))
        .with_state(log);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
