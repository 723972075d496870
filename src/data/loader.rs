use std::fs;
use std::path::Path;

use log::{error, info, warn};
use sqlx::sqlite::SqlitePool;

use crate::data::CatalogDataset;
use crate::db::DeviceRepository;
use crate::orders::traffic::DeviceCategory;

/// 데이터 로더
pub struct DataLoader;

impl DataLoader {
    /// 카탈로그 데이터셋 로드 (파일이 없으면 기본값 생성)
    pub fn load_dataset(data_path: &str) -> anyhow::Result<CatalogDataset> {
        if Path::new(data_path).exists() {
            info!("📂 데이터셋 파일 발견: {}", data_path);
            Self::load_from_json(data_path)
        } else {
            warn!("📂 데이터셋 파일이 없음: {}, 기본값 생성", data_path);
            Self::create_default_dataset(data_path)
        }
    }

    /// JSON 파일에서 데이터셋 로드
    fn load_from_json(data_path: &str) -> anyhow::Result<CatalogDataset> {
        let content = fs::read_to_string(data_path)?;
        let dataset: CatalogDataset = serde_json::from_str(&content)?;

        info!("✅ JSON 데이터 파싱 완료: 디바이스 {}개", dataset.devices.len());
        Ok(dataset)
    }

    /// 기본 데이터셋 생성 및 저장
    fn create_default_dataset(data_path: &str) -> anyhow::Result<CatalogDataset> {
        let dataset = CatalogDataset::default();

        if let Some(parent) = Path::new(data_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    error!("📁 디렉토리 생성 실패: {}", e);
                    e
                })?;
            }
        }

        match dataset.save_to_file(data_path) {
            Ok(_) => info!("✅ 기본 데이터셋 생성 완료: {}", data_path),
            Err(e) => warn!("⚠️ 데이터셋 저장 실패: {}", e),
        }

        Ok(dataset)
    }

    /// 카탈로그가 비어 있으면 데이터셋으로 채움, 추가한 개수 반환
    pub async fn seed_catalog(pool: &SqlitePool, data_path: &str) -> anyhow::Result<usize> {
        let devices = DeviceRepository::new(pool.clone());
        if devices.count().await? > 0 {
            info!("📦 카탈로그가 이미 존재하여 시드를 건너뜁니다");
            return Ok(0);
        }

        let dataset = Self::load_dataset(data_path)?;
        let mut inserted = 0;
        for input in dataset.devices {
            let draft = match input.into_draft(DeviceCategory::infer_from_name) {
                Ok(draft) => draft,
                Err(e) => {
                    warn!("⚠️ 잘못된 시드 디바이스 건너뜀: {}", e);
                    continue;
                }
            };
            devices.create(&draft).await?;
            inserted += 1;
        }

        info!("🌱 카탈로그 시드 완료: 디바이스 {}개", inserted);
        Ok(inserted)
    }
}
