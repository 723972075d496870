//! 클라이언트 계정과 세션 발급

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use log::{info, warn};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::db::models::ClientRecord;
use crate::db::repository::is_unique_violation;
use crate::db::ClientRepository;
use crate::error::{AppError, AppResult};
use crate::session::{Session, SessionStore};

/// Argon2 해시 생성
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::BackingStore(format!("비밀번호 해시 실패: {}", e)))
}

/// 저장된 해시와 비교, 해시 형식이 잘못되었으면 false
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!("잘못된 비밀번호 해시 형식: {}", e);
            false
        }
    }
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{}은(는) 필수입니다", field)));
    }
    Ok(trimmed.to_string())
}

/// 로그인 결과
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: String,
    pub session: Session,
}

/// 클라이언트 서비스
#[derive(Clone)]
pub struct ClientService {
    clients: ClientRepository,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl ClientService {
    pub fn new(pool: SqlitePool, sessions: Arc<dyn SessionStore>, session_ttl: Duration) -> Self {
        Self {
            clients: ClientRepository::new(pool),
            sessions,
            session_ttl,
        }
    }

    /// 회원가입
    pub async fn register(&self, username: &str, password: &str) -> AppResult<ClientRecord> {
        let username = required(username, "username")?;
        if password.is_empty() {
            return Err(AppError::invalid_input("password은(는) 필수입니다"));
        }

        let hash = hash_password(password)?;
        let client = self.clients.create(&username, &hash, false).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("이미 사용 중인 사용자명입니다: {}", username))
            } else {
                e.into()
            }
        })?;

        info!("👤 클라이언트 등록: {} ({})", client.id, client.username);
        Ok(client)
    }

    /// 로그인 후 세션 발급
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginOutcome> {
        let client = self
            .clients
            .find_by_username(username.trim())
            .await?
            .filter(|c| c.is_active)
            .ok_or(AppError::Unauthenticated)?;

        if !verify_password(password, &client.password_hash) {
            warn!("로그인 실패: {}", client.username);
            return Err(AppError::Unauthenticated);
        }

        self.clients.touch_last_login(client.id, Utc::now()).await?;

        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            client_id: client.id,
            username: client.username.clone(),
            is_moderator: client.is_moderator,
        };
        self.sessions.create(&session_id, &session, self.session_ttl).await?;

        info!("🔑 로그인: {} (모더레이터: {})", client.username, client.is_moderator);
        Ok(LoginOutcome { session_id, session })
    }

    pub async fn logout(&self, session_id: &str) -> AppResult<()> {
        self.sessions.delete(session_id).await?;
        Ok(())
    }

    /// 세션 ID로 세션 조회
    pub async fn resolve_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(session_id).await?)
    }

    /// 현재 클라이언트 프로필
    pub async fn me(&self, caller: &Session) -> AppResult<ClientRecord> {
        self.clients
            .find_by_id(caller.client_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(AppError::Unauthenticated)
    }

    /// 사용자명/비밀번호 변경
    ///
    /// 사용자명이 바뀌면 현재 세션도 새 이름으로 다시 저장합니다.
    /// 같은 클라이언트의 다른 세션은 다음 로그인까지 이전 이름을 유지합니다.
    pub async fn update_me(
        &self,
        session_id: &str,
        caller: &Session,
        username: Option<&str>,
        password: Option<&str>,
    ) -> AppResult<ClientRecord> {
        let username = username.map(|u| required(u, "username")).transpose()?;
        let password_hash = match password {
            Some("") => return Err(AppError::invalid_input("password은(는) 비어 있을 수 없습니다")),
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let updated = self
            .clients
            .update_profile(caller.client_id, username.as_deref(), password_hash.as_deref())
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("이미 사용 중인 사용자명입니다".to_string())
                } else {
                    e.into()
                }
            })?
            .ok_or(AppError::Unauthenticated)?;

        if updated.username != caller.username {
            let refreshed = Session {
                username: updated.username.clone(),
                ..caller.clone()
            };
            self.sessions.create(session_id, &refreshed, self.session_ttl).await?;
        }

        info!("✏️ 프로필 수정: {}", updated.id);
        Ok(updated)
    }

    /// 설정된 모더레이터 계정 보장
    pub async fn seed_moderator(&self, username: &str, password: &str) -> AppResult<()> {
        let username = required(username, "username")?;
        let hash = hash_password(password)?;
        self.clients.upsert_moderator(&username, &hash).await?;
        info!("🛡️ 모더레이터 계정 준비 완료: {}", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;
    use crate::session::MemorySessionStore;

    async fn service() -> (ClientService, Arc<MemorySessionStore>) {
        let pool = init_in_memory().await.unwrap();
        let sessions = Arc::new(MemorySessionStore::new());
        (
            ClientService::new(pool, sessions.clone(), Duration::from_secs(60)),
            sessions,
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("secret", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let (clients, _) = service().await;
        clients.register("alice", "pw").await.unwrap();

        let err = clients.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = clients.register(" ", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_login_issues_session() {
        let (clients, sessions) = service().await;
        let alice = clients.register("alice", "pw").await.unwrap();

        assert!(matches!(clients.login("alice", "nope").await, Err(AppError::Unauthenticated)));
        assert!(matches!(clients.login("bob", "pw").await, Err(AppError::Unauthenticated)));

        let outcome = clients.login("alice", "pw").await.unwrap();
        assert_eq!(outcome.session.client_id, alice.id);
        assert!(!outcome.session.is_moderator);
        assert_eq!(sessions.len().await, 1);

        let me = clients.me(&outcome.session).await.unwrap();
        assert!(me.last_login.is_some());

        clients.logout(&outcome.session_id).await.unwrap();
        assert!(clients.resolve_session(&outcome.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_me() {
        let (clients, _) = service().await;
        clients.register("alice", "pw").await.unwrap();
        clients.register("bob", "pw").await.unwrap();
        let LoginOutcome { session_id, session } = clients.login("alice", "pw").await.unwrap();

        let err = clients.update_me(&session_id, &session, Some("bob"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = clients.update_me(&session_id, &session, None, Some("")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let updated = clients
            .update_me(&session_id, &session, Some("alice2"), Some("pw2"))
            .await
            .unwrap();
        assert_eq!(updated.username, "alice2");
        assert!(clients.login("alice2", "pw2").await.is_ok());

        let live = clients.resolve_session(&session_id).await.unwrap().unwrap();
        assert_eq!(live.username, "alice2");
        assert_eq!(live.client_id, session.client_id);
    }

    #[tokio::test]
    async fn test_seed_moderator_is_idempotent() {
        let (clients, _) = service().await;
        clients.seed_moderator("admin", "pw1").await.unwrap();
        clients.seed_moderator("admin", "pw2").await.unwrap();

        let outcome = clients.login("admin", "pw2").await.unwrap();
        assert!(outcome.session.is_moderator);
    }
}
