//! Redis 세션 저장소
//!
//! 세션은 `session:{id}` 키에 JSON으로 저장되고 Redis TTL로 만료됩니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use redis::aio::Connection;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::Mutex;

use super::{session_key, Session, SessionError, SessionStore};

/// Redis 기반 세션 저장소
pub struct RedisSessionStore {
    connection: Arc<Mutex<Connection>>,
}

impl RedisSessionStore {
    /// 새 저장소 생성 및 연결 확인
    pub async fn connect(redis_url: &str) -> RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let mut connection = client.get_async_connection().await?;

        redis::cmd("PING").query_async::<_, String>(&mut connection).await?;
        info!("✅ Redis 세션 저장소 연결 완료: {}", redis_url);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, session_id: &str, session: &Session, ttl: Duration) -> Result<(), SessionError> {
        let payload = serde_json::to_string(session)?;
        let ttl_secs = ttl.as_secs().max(1);

        let mut conn = self.connection.lock().await;
        redis::cmd("SET")
            .arg(session_key(session_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut *conn)
            .await?;

        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let mut conn = self.connection.lock().await;
        let payload: Option<String> = conn.get(session_key(session_id)).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionError> {
        let mut conn = self.connection.lock().await;
        conn.del::<_, ()>(session_key(session_id)).await?;
        Ok(())
    }
}
