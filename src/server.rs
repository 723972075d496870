use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use log::{info, warn};
use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::catalog::CatalogService;
use crate::clients::ClientService;
use crate::config::{BlobBackend, ServerConfig};
use crate::data::DataLoader;
use crate::db::init_database;
use crate::orders::OrderService;
use crate::pages::{create_pages_router, not_found_page};
use crate::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::storage::{BlobStore, FsBlobStore, S3BlobStore};

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub catalog: CatalogService,
    pub orders: OrderService,
    pub clients: ClientService,
    pub config: Arc<ServerConfig>,
}

impl ServerState {
    /// 저장소 핸들로 상태 구성
    pub fn new(
        pool: SqlitePool,
        sessions: Arc<dyn SessionStore>,
        blobs: Arc<dyn BlobStore>,
        config: ServerConfig,
    ) -> Self {
        let session_ttl = Duration::from_secs(config.session_ttl_secs);
        Self {
            catalog: CatalogService::new(pool.clone(), blobs),
            orders: OrderService::new(pool.clone()),
            clients: ClientService::new(pool, sessions, session_ttl),
            config: Arc::new(config),
        }
    }
}

/// API + 페이지 라우터 (정적 이미지 제외)
pub fn build_router(state: ServerState) -> Router {
    create_api_router()
        .merge(create_pages_router())
        .fallback(not_found_page)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn connect_sessions(config: &ServerConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisSessionStore::connect(url).await?)),
        None => {
            warn!("⚠️ REDIS_URL 미설정, 메모리 세션 저장소 사용");
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

async fn build_blob_store(config: &ServerConfig) -> Arc<dyn BlobStore> {
    match config.blob_backend {
        BlobBackend::Fs => {
            info!("🖼️ 파일 시스템 이미지 저장소: {} → {}", config.blob_dir, config.blob_public_path);
            Arc::new(FsBlobStore::new(&config.blob_dir, &config.blob_public_path))
        }
        BlobBackend::S3 => {
            info!("🖼️ S3 오브젝트 스토리지: {}/{}", config.blob_endpoint, config.blob_bucket);
            Arc::new(S3BlobStore::connect(&config.s3_settings()).await)
        }
    }
}

/// 서버 시작
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    info!("🚀 스마트 디바이스 서버 시작 중...");

    let pool = init_database(&config.database_url, config.db_max_connections).await?;
    let sessions = connect_sessions(&config).await?;
    let blobs = build_blob_store(&config).await;

    if config.seed_catalog {
        DataLoader::seed_catalog(&pool, &config.catalog_seed_path).await?;
    }

    let state = ServerState::new(pool, sessions, blobs, config.clone());

    if let (Some(username), Some(password)) = (&config.moderator_username, &config.moderator_password) {
        state.clients.seed_moderator(username, password).await?;
    }

    let mut app = build_router(state);
    if config.blob_backend == BlobBackend::Fs {
        let mount = config.blob_public_path.trim_end_matches('/');
        if mount.starts_with('/') && mount.len() > 1 {
            tokio::fs::create_dir_all(&config.blob_dir).await?;
            app = app.nest_service(mount, ServeDir::new(&config.blob_dir));
        } else {
            warn!("⚠️ BLOB_PUBLIC_PATH '{}'는 정적 파일 경로로 사용할 수 없습니다", config.blob_public_path);
        }
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.rest_port)).await?;

    info!("✅ 서버가 성공적으로 시작되었습니다!");
    info!("🌐 REST API: http://localhost:{}", config.rest_port);
    info!("🛒 카탈로그: http://localhost:{}/smart-devices", config.rest_port);

    axum::serve(listener, app).await?;

    Ok(())
}
