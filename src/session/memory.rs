use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{session_key, Session, SessionError, SessionStore};

/// 프로세스 내 세션 저장소
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (Session, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료되지 않은 세션 수
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let guard = self.sessions.lock().await;
        guard.values().filter(|(_, expires_at)| *expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session_id: &str, session: &Session, ttl: Duration) -> Result<(), SessionError> {
        let now = Instant::now();
        let mut guard = self.sessions.lock().await;
        // 다시 조회되지 않는 만료 세션 정리
        guard.retain(|_, (_, expires_at)| *expires_at > now);
        guard.insert(session_key(session_id), (session.clone(), now + ttl));
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let key = session_key(session_id);
        let mut guard = self.sessions.lock().await;

        match guard.get(&key) {
            Some((session, expires_at)) if *expires_at > Instant::now() => Ok(Some(session.clone())),
            Some(_) => {
                guard.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionError> {
        let mut guard = self.sessions.lock().await;
        guard.remove(&session_key(session_id));
        Ok(())
    }
}
