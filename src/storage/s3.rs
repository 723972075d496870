use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use log::{info, warn};

use super::{strip_base_url, validate_object_name, BlobStore, StorageError};

/// S3 접속 설정
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// MinIO 같은 S3 호환 엔드포인트
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    /// 없으면 표준 AWS 자격 증명 체인 사용
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// 저장된 URL의 기준 주소, 없으면 `{endpoint}/{bucket}`
    pub public_url: Option<String>,
}

/// S3 호환 오브젝트 스토리지 (path-style 주소)
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3BlobStore {
    /// 클라이언트 생성 후 버킷 준비
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(&settings.endpoint)
            .region(Region::new(settings.region.clone()));

        if let (Some(access), Some(secret)) = (&settings.access_key, &settings.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "smart-devices-static",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        let public_base = settings
            .public_url
            .clone()
            .unwrap_or_else(|| default_public_base(&settings.endpoint, &settings.bucket));
        let store = Self::with_client(Client::from_conf(s3_config), &settings.bucket, &public_base);

        // 연결 실패 시에도 서버는 뜨고, 업로드가 오류를 반환
        match store.ensure_bucket().await {
            Ok(()) => info!("✅ 오브젝트 스토리지 준비 완료: {}", store.bucket),
            Err(e) => warn!("⚠️ 오브젝트 스토리지 연결 실패: {}", e),
        }

        store
    }

    pub fn with_client(client: Client, bucket: &str, public_base: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// 버킷이 없으면 생성
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| remote(&self.bucket, e))?;

        info!("🪣 버킷 생성: {}", self.bucket);
        Ok(())
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.public_base, name)
    }
}

fn default_public_base(endpoint: &str, bucket: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), bucket.trim_matches('/'))
}

fn remote<E: std::error::Error>(object: &str, err: E) -> StorageError {
    StorageError::Remote {
        object: object.to_string(),
        message: DisplayErrorContext(err).to_string(),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        validate_object_name(name)?;
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| remote(name, e))?;

        info!("✅ 오브젝트 업로드 완료: {} ({} bytes)", name, size);
        Ok(self.object_url(name))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_object_name(name)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| remote(name, e))?;

        info!("🗑️ 오브젝트 삭제 완료: {}", name);
        Ok(())
    }

    fn object_name(&self, url: &str) -> Option<String> {
        strip_base_url(&self.public_base, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> Client {
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url("http://localhost:9000")
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("access", "secret", None, None, "test"))
            .force_path_style(true)
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn test_object_name_round_trip() {
        let base = default_public_base("http://localhost:9000/", "image");
        let store = S3BlobStore::with_client(offline_client(), "image", &base);
        let url = store.object_url("device_3_42.jpg");

        assert_eq!(url, "http://localhost:9000/image/device_3_42.jpg");
        assert_eq!(store.object_name(&url), Some("device_3_42.jpg".to_string()));
        assert_eq!(store.object_name("http://other:9000/image/device_3_42.jpg"), None);
    }

    #[test]
    fn test_public_url_override() {
        let store = S3BlobStore::with_client(offline_client(), "image", "https://cdn.example.com/img/");

        assert_eq!(store.object_url("a.png"), "https://cdn.example.com/img/a.png");
        assert_eq!(store.object_name("https://cdn.example.com/img/a.png"), Some("a.png".to_string()));
    }
}
