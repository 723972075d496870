//! 환경 변수 기반 서버 설정

use std::env;
use std::str::FromStr;

use log::warn;

use crate::storage::S3Settings;

/// 이미지 저장소 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    /// 로컬 디렉터리 + 정적 파일 제공
    Fs,
    /// MinIO 같은 S3 호환 오브젝트 스토리지
    S3,
}

/// 서버 설정
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rest_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// 없으면 메모리 세션 저장소 사용
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub blob_backend: BlobBackend,
    pub blob_dir: String,
    pub blob_public_path: String,
    pub blob_endpoint: String,
    pub blob_bucket: String,
    pub blob_region: String,
    pub blob_access_key: Option<String>,
    pub blob_secret_key: Option<String>,
    /// 이미지 URL 기준 주소, 없으면 `{endpoint}/{bucket}`
    pub blob_public_url: Option<String>,
    pub catalog_seed_path: String,
    pub seed_catalog: bool,
    pub moderator_username: Option<String>,
    pub moderator_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_port: 7000,
            database_url: "sqlite://smart_devices.db?mode=rwc".to_string(),
            db_max_connections: 5,
            redis_url: None,
            session_ttl_secs: 86_400,
            blob_backend: BlobBackend::Fs,
            blob_dir: "uploads/images".to_string(),
            blob_public_path: "/images".to_string(),
            blob_endpoint: "http://localhost:9000".to_string(),
            blob_bucket: "image".to_string(),
            blob_region: "us-east-1".to_string(),
            blob_access_key: None,
            blob_secret_key: None,
            blob_public_url: None,
            catalog_seed_path: "data/catalog.json".to_string(),
            seed_catalog: true,
            moderator_username: None,
            moderator_password: None,
        }
    }
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드 (없거나 잘못된 값은 기본값)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// S3 백엔드 접속 설정
    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            endpoint: self.blob_endpoint.clone(),
            bucket: self.blob_bucket.clone(),
            region: self.blob_region.clone(),
            access_key: self.blob_access_key.clone(),
            secret_key: self.blob_secret_key.clone(),
            public_url: self.blob_public_url.clone(),
        }
    }

    /// 키 조회 함수로 설정 생성
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let blob_backend = match text("BLOB_BACKEND").as_deref() {
            None | Some("fs") => BlobBackend::Fs,
            Some("s3") | Some("minio") => BlobBackend::S3,
            Some(other) => {
                warn!("알 수 없는 BLOB_BACKEND '{}', fs 사용", other);
                BlobBackend::Fs
            }
        };

        Self {
            rest_port: parsed(&text, "REST_PORT", defaults.rest_port),
            database_url: text("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parsed(&text, "DB_MAX_CONNECTIONS", defaults.db_max_connections),
            redis_url: text("REDIS_URL"),
            session_ttl_secs: parsed(&text, "SESSION_TTL_SECS", defaults.session_ttl_secs),
            blob_backend,
            blob_dir: text("BLOB_DIR").unwrap_or(defaults.blob_dir),
            blob_public_path: text("BLOB_PUBLIC_PATH").unwrap_or(defaults.blob_public_path),
            blob_endpoint: text("BLOB_ENDPOINT").unwrap_or(defaults.blob_endpoint),
            blob_bucket: text("BLOB_BUCKET").unwrap_or(defaults.blob_bucket),
            blob_region: text("BLOB_REGION").unwrap_or(defaults.blob_region),
            blob_access_key: text("BLOB_ACCESS_KEY"),
            blob_secret_key: text("BLOB_SECRET_KEY"),
            blob_public_url: text("BLOB_PUBLIC_URL"),
            catalog_seed_path: text("CATALOG_SEED_PATH").unwrap_or(defaults.catalog_seed_path),
            seed_catalog: parsed(&text, "SEED_CATALOG", defaults.seed_catalog),
            moderator_username: text("MODERATOR_USERNAME"),
            moderator_password: text("MODERATOR_PASSWORD"),
        }
    }
}

fn parsed<T: FromStr>(text: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match text(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} 값이 잘못되었습니다: '{}', 기본값 사용", key, raw);
            default
        }),
        None => default,
    }
}
