use std::path::PathBuf;

use async_trait::async_trait;
use log::info;

use super::{strip_base_url, validate_object_name, BlobStore, StorageError};

/// 로컬 디렉터리에 이미지를 저장하고 HTTP 서버가 `public_path` 아래로 제공
pub struct FsBlobStore {
    root: PathBuf,
    public_path: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_path: &str) -> Self {
        Self {
            root: root.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, name: &str, data: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        validate_object_name(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let size = data.len();
        tokio::fs::write(self.root.join(name), data).await?;
        info!("✅ 이미지 저장 완료: {} ({} bytes)", name, size);

        Ok(format!("{}/{}", self.public_path, name))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_object_name(name)?;
        tokio::fs::remove_file(self.root.join(name)).await?;
        info!("🗑️ 이미지 삭제 완료: {}", name);
        Ok(())
    }

    fn object_name(&self, url: &str) -> Option<String> {
        strip_base_url(&self.public_path, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/images/");

        let url = store.put("device_1_1.png", vec![1, 2, 3], "image/png").await.unwrap();
        assert_eq!(url, "/images/device_1_1.png");
        assert_eq!(std::fs::read(dir.path().join("device_1_1.png")).unwrap(), vec![1, 2, 3]);

        let name = store.object_name(&url).unwrap();
        store.delete(&name).await.unwrap();
        assert!(!dir.path().join("device_1_1.png").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_object_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/images");

        let err = store.delete("nope.png").await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/images");

        let err = store.put("../escape.png", vec![0], "image/png").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
    }
}
