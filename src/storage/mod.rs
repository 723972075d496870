//! 디바이스 이미지 오브젝트 스토리지
//!
//! 업로드된 객체의 공개 URL을 돌려주고, 저장된 URL에서 객체 이름을 역으로 찾습니다.

pub mod fs;
pub mod s3;

use async_trait::async_trait;

pub use fs::FsBlobStore;
pub use s3::{S3BlobStore, S3Settings};

/// 스토리지 오류
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("파일 입출력 오류: {0}")]
    Io(#[from] std::io::Error),

    #[error("오브젝트 스토리지 오류 ({object}): {message}")]
    Remote { object: String, message: String },

    #[error("잘못된 객체 이름: {0}")]
    InvalidName(String),
}

/// 이미지 저장소 인터페이스
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 객체 업로드 후 공개 URL 반환
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    /// 객체 삭제
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// 이 저장소가 발급한 URL이면 객체 이름 반환
    fn object_name(&self, url: &str) -> Option<String>;
}

/// 경로 구분자나 상위 경로가 없는 단일 이름만 허용
pub fn validate_object_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `{base}/{name}` 형태의 URL에서 이름 추출
pub(crate) fn strip_base_url(base: &str, url: &str) -> Option<String> {
    let base = base.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    if validate_object_name(rest).is_ok() {
        Some(rest.to_string())
    } else {
        None
    }
}

/// 확장자별 Content-Type
pub fn content_type_for(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
}
