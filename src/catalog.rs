//! 디바이스 카탈로그 서비스
//!
//! 활성 디바이스 조회/검색, 모더레이터 전용 CRUD와 이미지 첨부를 담당합니다.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use crate::db::models::{DeviceDraft, DeviceRecord};
use crate::db::DeviceRepository;
use crate::error::{AppError, AppResult};
use crate::orders::traffic::DeviceCategory;
use crate::session::Session;
use crate::storage::{content_type_for, BlobStore};

/// 업로드 허용 확장자
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// 디바이스 생성/수정 요청
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceInput {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub avg_data_rate: f64,
    #[serde(default)]
    pub data_per_hour: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_all: String,
    #[serde(default)]
    pub protocol: String,
    /// 생략하면 생성 시 이름에서 추론, 수정 시 기존 값 유지
    #[serde(default)]
    pub category: Option<DeviceCategory>,
}

impl DeviceInput {
    pub(crate) fn into_draft(self, fallback_category: impl FnOnce(&str) -> DeviceCategory) -> AppResult<DeviceDraft> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::invalid_input("디바이스 이름은 필수입니다"));
        }

        for (field, value) in [("avg_data_rate", self.avg_data_rate), ("data_per_hour", self.data_per_hour)] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::invalid_input(format!("{}은(는) 0 이상의 숫자여야 합니다", field)));
            }
        }

        let category = match self.category {
            Some(category) => category,
            None => fallback_category(&name),
        };

        Ok(DeviceDraft {
            name,
            model: self.model,
            avg_data_rate: self.avg_data_rate,
            data_per_hour: self.data_per_hour,
            description: self.description,
            description_all: self.description_all,
            protocol: self.protocol,
            category,
        })
    }
}

/// 이미지 업로드 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUpload {
    pub image_url: String,
    pub file_name: String,
    pub file_size: usize,
}

/// 업로드 파일명에서 확장자 결정 (없으면 `.png`)
pub fn image_extension(file_name: Option<&str>) -> AppResult<String> {
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match ext {
        None => Ok(".png".to_string()),
        Some(ext) if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(format!(".{}", ext)),
        Some(ext) => Err(AppError::invalid_input(format!(
            "지원하지 않는 이미지 형식입니다: .{} (허용: {})",
            ext,
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        ))),
    }
}

/// 카탈로그 서비스
#[derive(Clone)]
pub struct CatalogService {
    devices: DeviceRepository,
    blobs: Arc<dyn BlobStore>,
}

impl CatalogService {
    pub fn new(pool: SqlitePool, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            devices: DeviceRepository::new(pool),
            blobs,
        }
    }

    /// 활성 디바이스 목록
    ///
    /// `search`는 이름과 설명에 대한 대소문자 무시 부분 일치, `protocol`은 정확히 일치해야 합니다.
    pub async fn list(&self, search: Option<&str>, protocol: Option<&str>) -> AppResult<Vec<DeviceRecord>> {
        let protocol = protocol.map(str::trim).filter(|p| !p.is_empty());
        let devices = self.devices.list_active(protocol).await?;

        let needle = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => needle.to_lowercase(),
            None => return Ok(devices),
        };

        Ok(devices
            .into_iter()
            .filter(|d| d.name.to_lowercase().contains(&needle) || d.description.to_lowercase().contains(&needle))
            .collect())
    }

    /// 활성 디바이스 단건 조회
    pub async fn get(&self, id: i64) -> AppResult<DeviceRecord> {
        self.devices
            .find_by_id(id)
            .await?
            .filter(|d| d.is_active)
            .ok_or_else(|| AppError::not_found(format!("디바이스 {}을(를) 찾을 수 없습니다", id)))
    }

    pub async fn create(&self, caller: &Session, input: DeviceInput) -> AppResult<DeviceRecord> {
        caller.ensure_moderator()?;
        let draft = input.into_draft(DeviceCategory::infer_from_name)?;

        let device = self.devices.create(&draft).await?;
        info!("📦 디바이스 생성: {} ({}, {})", device.id, device.name, device.category);
        Ok(device)
    }

    /// 편집 가능한 필드 전체 교체
    pub async fn update(&self, caller: &Session, id: i64, input: DeviceInput) -> AppResult<DeviceRecord> {
        caller.ensure_moderator()?;
        let current = self.get(id).await?;
        let draft = input.into_draft(|_| current.category())?;

        let device = self
            .devices
            .update(id, &draft)
            .await?
            .ok_or_else(|| AppError::not_found(format!("디바이스 {}을(를) 찾을 수 없습니다", id)))?;

        info!("✏️ 디바이스 수정: {} ({})", device.id, device.name);
        Ok(device)
    }

    /// 소프트 삭제
    pub async fn deactivate(&self, caller: &Session, id: i64) -> AppResult<()> {
        caller.ensure_moderator()?;

        if !self.devices.deactivate(id).await? {
            return Err(AppError::not_found(format!("디바이스 {}을(를) 찾을 수 없습니다", id)));
        }

        info!("🗑️ 디바이스 비활성화: {}", id);
        Ok(())
    }

    /// 이미지 업로드 후 URL 저장
    ///
    /// 스토리지 업로드가 실패하면 DB는 변경하지 않습니다.
    pub async fn attach_image(
        &self,
        caller: &Session,
        id: i64,
        file_name: Option<&str>,
        data: Vec<u8>,
    ) -> AppResult<ImageUpload> {
        caller.ensure_moderator()?;
        let device = self.get(id).await?;

        if data.is_empty() {
            return Err(AppError::invalid_input("이미지 파일이 비어 있습니다"));
        }
        let ext = image_extension(file_name)?;

        let object_name = format!("device_{}_{}{}", device.id, Utc::now().timestamp_millis(), ext);
        let file_size = data.len();
        let image_url = self.blobs.put(&object_name, data, content_type_for(&ext)).await?;

        self.devices.set_image_url(device.id, Some(&image_url)).await?;
        info!("🖼️ 디바이스 {} 이미지 업로드: {} ({} bytes)", device.id, object_name, file_size);

        Ok(ImageUpload {
            image_url,
            file_name: object_name,
            file_size,
        })
    }

    /// 이미지 삭제
    ///
    /// 스토리지 객체를 먼저 지우고, 실패하면 URL을 그대로 둡니다.
    pub async fn detach_image(&self, caller: &Session, id: i64) -> AppResult<()> {
        caller.ensure_moderator()?;
        let device = self.get(id).await?;

        let image_url = match device.image_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => return Ok(()),
        };

        match self.blobs.object_name(image_url) {
            Some(object_name) => self.blobs.delete(&object_name).await?,
            None => warn!("외부 이미지 URL은 스토리지에서 삭제하지 않습니다: {}", image_url),
        }

        self.devices.set_image_url(device.id, None).await?;
        info!("🗑️ 디바이스 {} 이미지 삭제", device.id);
        Ok(())
    }
}
