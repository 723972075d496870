//! 세션 인증 추출기
//!
//! `Authorization: Bearer <id>` 헤더 또는 `session_id` 쿠키에서 세션을 찾습니다.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use log::debug;

use crate::error::AppError;
use crate::server::ServerState;
use crate::session::{Session, SESSION_COOKIE};

/// 인증된 호출자
#[derive(Debug, Clone)]
pub struct CurrentClient {
    pub session_id: String,
    pub session: Session,
}

/// 인증이 선택적인 호출자 (페이지용)
#[derive(Debug, Clone)]
pub struct MaybeClient(pub Option<CurrentClient>);

/// 요청 헤더에서 세션 ID 추출 (Bearer 우선)
pub fn session_id_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

async fn resolve(parts: &mut Parts, state: &ServerState) -> Result<Option<CurrentClient>, AppError> {
    if let Some(client) = parts.extensions.get::<CurrentClient>() {
        return Ok(Some(client.clone()));
    }

    let session_id = match session_id_from_parts(parts) {
        Some(id) => id,
        None => return Ok(None),
    };

    match state.clients.resolve_session(&session_id).await? {
        Some(session) => {
            let client = CurrentClient { session_id, session };
            parts.extensions.insert(client.clone());
            Ok(Some(client))
        }
        None => {
            debug!("만료되었거나 없는 세션: {}", session_id);
            Ok(None)
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerState> for CurrentClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?.ok_or(AppError::Unauthenticated)
    }
}

#[async_trait]
impl FromRequestParts<ServerState> for MaybeClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        Ok(MaybeClient(resolve(parts, state).await?))
    }
}
