use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::orders::status::{OrderStatus, UnknownStatus};
use crate::orders::traffic::{DeviceCategory, TrafficLine};

/// 클라이언트 DB 모델
#[derive(Debug, Clone, FromRow)]
pub struct ClientRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_moderator: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

/// 디바이스 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceRecord {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub avg_data_rate: f64,
    pub data_per_hour: f64,
    pub image_url: Option<String>,
    pub description: String,
    pub description_all: String,
    pub protocol: String,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// 저장된 카테고리, 알 수 없는 값이면 `Other`
    pub fn category(&self) -> DeviceCategory {
        self.category.parse().unwrap_or(DeviceCategory::Other)
    }
}

/// 디바이스 생성/수정 입력
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDraft {
    pub name: String,
    pub model: String,
    pub avg_data_rate: f64,
    pub data_per_hour: f64,
    pub description: String,
    pub description_all: String,
    pub protocol: String,
    pub category: DeviceCategory,
}

/// 주문 DB 모델 (클라이언트/모더레이터 이름 포함)
#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub status: String,
    pub client_id: i64,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub formed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub moderator_id: Option<i64>,
    pub moderator_name: Option<String>,
    pub address: String,
    pub total_traffic: Option<f64>,
}

impl OrderRecord {
    pub fn status(&self) -> Result<OrderStatus, UnknownStatus> {
        self.status.parse()
    }
}

/// 주문 품목 DB 모델 (디바이스 정보 포함)
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRecord {
    pub order_id: i64,
    pub device_id: i64,
    pub quantity: i64,
    pub device_name: String,
    pub data_per_hour: f64,
    pub image_url: Option<String>,
    pub category: String,
}

impl OrderItemRecord {
    pub fn traffic_line(&self) -> TrafficLine {
        TrafficLine {
            data_per_hour: self.data_per_hour,
            quantity: self.quantity,
            category: self.category.parse().unwrap_or(DeviceCategory::Other),
        }
    }
}

/// 주문 목록 필터
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// 특정 클라이언트의 주문만 (모더레이터가 아닌 경우)
    pub client_id: Option<i64>,
    /// true면 draft 주문 제외 (모더레이터 목록)
    pub exclude_drafts: bool,
    pub status: Option<OrderStatus>,
    /// formed_at >= formed_from
    pub formed_from: Option<DateTime<Utc>>,
    /// formed_at < formed_before
    pub formed_before: Option<DateTime<Utc>>,
}
