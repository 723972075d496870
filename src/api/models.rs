use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{ClientRecord, DeviceRecord, OrderItemRecord};
use crate::orders::{CartSummary, DeviceCategory, OrderDetails, OrderStatus};

/// 에러 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// 카탈로그 검색 조건
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub protocol: Option<String>,
}

/// 디바이스 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub avg_data_rate: f64,
    pub data_per_hour: f64,
    pub image_url: Option<String>,
    pub description: String,
    pub description_all: String,
    pub protocol: String,
    pub category: DeviceCategory,
}

impl From<DeviceRecord> for DeviceResponse {
    fn from(device: DeviceRecord) -> Self {
        Self {
            category: device.category(),
            id: device.id,
            name: device.name,
            model: device.model,
            avg_data_rate: device.avg_data_rate,
            data_per_hour: device.data_per_hour,
            image_url: device.image_url,
            description: device.description,
            description_all: device.description_all,
            protocol: device.protocol,
        }
    }
}

/// 장바구니 요약 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct CartResponse {
    pub order_id: i64,
    pub count: i64,
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        Self {
            order_id: summary.order_id,
            count: summary.count,
        }
    }
}

/// 주문 목록 조회 파라미터
#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// 배송지 변경 요청
#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

/// 품목 수량 변경 요청
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

/// 품목 수량 변경 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct QuantityResponse {
    pub order_id: i64,
    pub device_id: i64,
    pub quantity: i64,
}

/// 주문 품목 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub device_id: i64,
    pub device_name: String,
    pub quantity: i64,
    pub data_per_hour: f64,
    pub image_url: Option<String>,
    pub category: DeviceCategory,
}

impl From<OrderItemRecord> for OrderItemResponse {
    fn from(item: OrderItemRecord) -> Self {
        Self {
            category: item.traffic_line().category,
            device_id: item.device_id,
            device_name: item.device_name,
            quantity: item.quantity,
            data_per_hour: item.data_per_hour,
            image_url: item.image_url,
        }
    }
}

/// 주문 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: i64,
    pub status: OrderStatus,
    pub client_id: i64,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub formed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub moderator_id: Option<i64>,
    pub moderator_name: Option<String>,
    pub address: String,
    /// 완료 시 계산된 최종 트래픽
    pub total_traffic: Option<f64>,
    /// 카테고리 계수를 적용하지 않은 표시용 추정치
    pub estimated_traffic: f64,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let estimated_traffic = details.estimated_traffic();
        let order = details.order;

        Self {
            id: order.id,
            status: details.status,
            client_id: order.client_id,
            client_name: order.client_name,
            created_at: order.created_at,
            formed_at: order.formed_at,
            completed_at: order.completed_at,
            moderator_id: order.moderator_id,
            moderator_name: order.moderator_name,
            address: order.address,
            total_traffic: order.total_traffic,
            estimated_traffic,
            items: details.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// 회원가입/로그인 요청
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// 프로필 수정 요청
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// 클라이언트 응답 (비밀번호 해시 제외)
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientResponse {
    pub id: i64,
    pub username: String,
    pub is_moderator: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl From<ClientRecord> for ClientResponse {
    fn from(client: ClientRecord) -> Self {
        Self {
            id: client.id,
            username: client.username,
            is_moderator: client.is_moderator,
            last_login: client.last_login,
            date_joined: client.date_joined,
        }
    }
}

/// 로그인 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub client_id: i64,
    pub username: String,
    pub is_moderator: bool,
}
