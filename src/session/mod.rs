//! 세션 저장소
//!
//! 불투명한 세션 ID를 `{client_id, username, is_moderator}`에 TTL과 함께 매핑합니다.
//! 운영 환경은 Redis, 로컬 실행과 테스트는 메모리 구현을 사용합니다.

pub mod memory;
pub mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;

/// 세션 키 접두사
pub const SESSION_KEY_PREFIX: &str = "session:";

/// 세션 쿠키 이름
pub const SESSION_COOKIE: &str = "session_id";

/// 세션 데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub client_id: i64,
    pub username: String,
    pub is_moderator: bool,
}

impl Session {
    /// 모더레이터 전용 작업 권한 확인
    pub fn ensure_moderator(&self) -> Result<(), AppError> {
        if self.is_moderator {
            Ok(())
        } else {
            Err(AppError::forbidden("모더레이터 권한이 필요합니다"))
        }
    }
}

/// 세션 저장소 오류
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Redis 오류: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("세션 직렬화 오류: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 세션 저장소 인터페이스
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 세션 저장
    async fn create(&self, session_id: &str, session: &Session, ttl: Duration) -> Result<(), SessionError>;

    /// 세션 조회, 없거나 만료되었으면 None
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    /// 세션 삭제
    async fn delete(&self, session_id: &str) -> Result<(), SessionError>;
}

/// 저장소 키
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, session_id)
}
