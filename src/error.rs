//! 애플리케이션 공통 오류 타입
//!
//! 모든 핸들러는 `AppError`를 반환하며, HTTP 상태 코드와
//! `{error, message}` 형태의 JSON 본문으로 변환됩니다.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;

use crate::api::models::ErrorResponse;
use crate::orders::status::TransitionError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// 애플리케이션 오류
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 잘못된 ID, 본문, 필수 필드 누락 등
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 현재 상태에서 허용되지 않는 상태 전이
    #[error("잘못된 상태: {0}")]
    InvalidState(String),

    #[error("인증이 필요합니다")]
    Unauthenticated,

    #[error("권한이 없습니다: {0}")]
    Forbidden(String),

    /// 존재하지 않거나 소프트 삭제된 엔티티
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    #[error("이미 존재함: {0}")]
    Conflict(String),

    /// 관계형 DB, 세션 저장소, 오브젝트 스토리지 오류
    #[error("저장소 오류: {0}")]
    BackingStore(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::InvalidState(_) => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::BackingStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BACKING_STORE_FAILURE"),
        }
    }

    /// HTTP 상태 코드
    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        // 내부 오류 상세는 로그에만 남기고 응답 본문에는 노출하지 않음
        let message = match &self {
            AppError::BackingStore(detail) => {
                error!("저장소 오류 발생: {}", detail);
                "내부 저장소 오류가 발생했습니다".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("레코드가 없습니다".to_string()),
            other => AppError::BackingStore(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::BackingStore(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::BackingStore(e.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::InvalidState(e.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::InvalidInput(format!("multipart 오류: {}", e))
    }
}

/// 요청 추출 실패는 모두 400으로 통일
macro_rules! rejection_as_invalid_input {
    ($($rejection:ty),* $(,)?) => {
        $(
            impl From<$rejection> for AppError {
                fn from(e: $rejection) -> Self {
                    AppError::InvalidInput(e.body_text())
                }
            }
        )*
    };
}

rejection_as_invalid_input!(JsonRejection, QueryRejection, PathRejection, FormRejection, MultipartRejection);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::invalid_input("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidState("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::BackingStore("db down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
