//! 장바구니/주문 서비스
//!
//! 클라이언트당 하나의 draft 주문을 관리하고, 상태 전이와 트래픽 계산을 수행합니다.
//! 모든 주문 작업은 소유자 또는 모더레이터만 수행할 수 있습니다.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, info};
use sqlx::sqlite::SqlitePool;

use crate::db::models::{OrderFilter, OrderItemRecord, OrderRecord};
use crate::db::{DeviceRepository, OrderItemRepository, OrderRepository};
use crate::error::{AppError, AppResult};
use crate::orders::status::{OrderAction, OrderStatus};
use crate::orders::traffic::{completion_traffic, estimate_traffic, TrafficLine};
use crate::session::Session;

/// 장바구니 아이콘용 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub order_id: i64,
    pub count: i64,
}

/// 품목까지 포함한 주문
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: OrderRecord,
    pub status: OrderStatus,
    pub items: Vec<OrderItemRecord>,
}

impl OrderDetails {
    /// 표시용 추정 트래픽 (계수 미적용)
    pub fn estimated_traffic(&self) -> f64 {
        let lines: Vec<TrafficLine> = self.items.iter().map(OrderItemRecord::traffic_line).collect();
        estimate_traffic(&lines)
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// 주문 목록 조회 조건
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl OrderListQuery {
    /// 쿼리 문자열 파라미터 파싱 (빈 문자열은 미지정으로 취급)
    pub fn parse(status: Option<&str>, date_from: Option<&str>, date_to: Option<&str>) -> AppResult<Self> {
        let status = non_empty(status)
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(|e| AppError::invalid_input(e.to_string()))?;

        let parse_date = |value: &str| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| AppError::invalid_input(format!("날짜 형식이 잘못되었습니다 (YYYY-MM-DD): {}", value)))
        };

        Ok(Self {
            status,
            date_from: non_empty(date_from).map(parse_date).transpose()?,
            date_to: non_empty(date_to).map(parse_date).transpose()?,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn start_of_day(date: NaiveDate) -> AppResult<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::invalid_input(format!("잘못된 날짜: {}", date)))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// 주문 서비스
#[derive(Clone)]
pub struct OrderService {
    orders: OrderRepository,
    items: OrderItemRepository,
    devices: DeviceRepository,
}

impl OrderService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            orders: OrderRepository::new(pool.clone()),
            items: OrderItemRepository::new(pool.clone()),
            devices: DeviceRepository::new(pool),
        }
    }

    fn parse_status(order: &OrderRecord) -> AppResult<OrderStatus> {
        order.status().map_err(|e| AppError::BackingStore(e.to_string()))
    }

    /// 소유자 또는 모더레이터만 허용
    fn authorize(caller: &Session, order: &OrderRecord) -> AppResult<()> {
        if caller.is_moderator || order.client_id == caller.client_id {
            Ok(())
        } else {
            Err(AppError::forbidden("주문에 대한 접근 권한이 없습니다"))
        }
    }

    /// 삭제되지 않은 주문 조회 후 권한 확인
    async fn load_authorized(&self, caller: &Session, order_id: i64) -> AppResult<(OrderRecord, OrderStatus)> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("주문 {}을(를) 찾을 수 없습니다", order_id)))?;

        let status = Self::parse_status(&order)?;
        if status.is_deleted() {
            return Err(AppError::not_found(format!("주문 {}을(를) 찾을 수 없습니다", order_id)));
        }

        Self::authorize(caller, &order)?;
        Ok((order, status))
    }

    async fn details(&self, order: OrderRecord) -> AppResult<OrderDetails> {
        let status = Self::parse_status(&order)?;
        let items = self.items.list_for_order(order.id).await?;
        Ok(OrderDetails { order, status, items })
    }

    async fn reload(&self, order_id: i64) -> AppResult<OrderDetails> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("주문 {}을(를) 찾을 수 없습니다", order_id)))?;
        self.details(order).await
    }

    /// 장바구니 요약, draft가 없으면 `{0, 0}`
    pub async fn cart_summary(&self, caller: &Session) -> AppResult<CartSummary> {
        match self.orders.find_draft(caller.client_id).await? {
            Some(order) => Ok(CartSummary {
                order_id: order.id,
                count: self.items.total_quantity(order.id).await?,
            }),
            None => Ok(CartSummary { order_id: 0, count: 0 }),
        }
    }

    /// 호출자의 draft 주문
    pub async fn draft_for(&self, caller: &Session) -> AppResult<OrderRecord> {
        self.orders
            .find_draft(caller.client_id)
            .await?
            .ok_or_else(|| AppError::not_found("장바구니가 없습니다"))
    }

    /// 호출자의 장바구니 상세, 없으면 None
    pub async fn current_cart(&self, caller: &Session) -> AppResult<Option<OrderDetails>> {
        match self.orders.find_draft(caller.client_id).await? {
            Some(order) => Ok(Some(self.details(order).await?)),
            None => Ok(None),
        }
    }

    /// 장바구니에 디바이스 추가 (draft 자동 생성, 중복 추가 시 수량 증가)
    pub async fn add_item(&self, caller: &Session, device_id: i64) -> AppResult<CartSummary> {
        let device = self
            .devices
            .find_by_id(device_id)
            .await?
            .filter(|d| d.is_active)
            .ok_or_else(|| AppError::not_found(format!("디바이스 {}을(를) 찾을 수 없습니다", device_id)))?;

        let order = self.orders.find_or_create_draft(caller.client_id).await?;
        self.items.add_or_increment(order.id, device.id).await?;

        let count = self.items.total_quantity(order.id).await?;
        info!(
            "➕ 장바구니 {}에 디바이스 {} 추가 (클라이언트 {}, 총 {}개)",
            order.id, device.id, caller.client_id, count
        );

        Ok(CartSummary { order_id: order.id, count })
    }

    /// 품목 수량 변경
    pub async fn update_item_quantity(
        &self,
        caller: &Session,
        order_id: i64,
        device_id: i64,
        quantity: i64,
    ) -> AppResult<i64> {
        if quantity <= 0 {
            return Err(AppError::invalid_input("수량은 0보다 커야 합니다"));
        }

        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.ensure_editable(OrderAction::EditItems)?;

        if !self.items.set_quantity(order.id, device_id, quantity).await? {
            return Err(AppError::not_found(format!(
                "주문 {}에 디바이스 {}이(가) 없습니다",
                order.id, device_id
            )));
        }

        debug!("주문 {} 디바이스 {} 수량 변경: {}", order.id, device_id, quantity);
        Ok(quantity)
    }

    /// 품목 삭제
    pub async fn remove_item(&self, caller: &Session, order_id: i64, device_id: i64) -> AppResult<()> {
        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.ensure_editable(OrderAction::EditItems)?;

        if !self.items.remove(order.id, device_id).await? {
            return Err(AppError::not_found(format!(
                "주문 {}에 디바이스 {}이(가) 없습니다",
                order.id, device_id
            )));
        }

        info!("🗑️ 주문 {}에서 디바이스 {} 삭제", order.id, device_id);
        Ok(())
    }

    /// 주문 단건 조회
    pub async fn get(&self, caller: &Session, order_id: i64) -> AppResult<OrderDetails> {
        let (order, _) = self.load_authorized(caller, order_id).await?;
        self.details(order).await
    }

    /// 주문 목록 조회
    ///
    /// 모더레이터는 draft/삭제 주문을 제외한 전체, 일반 클라이언트는 자신의 주문만 봅니다.
    pub async fn list(&self, caller: &Session, query: &OrderListQuery) -> AppResult<Vec<OrderDetails>> {
        let mut filter = OrderFilter {
            status: query.status,
            ..OrderFilter::default()
        };

        if caller.is_moderator {
            filter.exclude_drafts = true;
        } else {
            filter.client_id = Some(caller.client_id);
        }

        if let Some(from) = query.date_from {
            filter.formed_from = Some(start_of_day(from)?);
        }
        if let Some(to) = query.date_to {
            let next_day = to
                .succ_opt()
                .ok_or_else(|| AppError::invalid_input(format!("잘못된 날짜: {}", to)))?;
            filter.formed_before = Some(start_of_day(next_day)?);
        }

        let orders = self.orders.list(&filter).await?;
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            result.push(self.details(order).await?);
        }

        Ok(result)
    }

    /// draft 주문의 배송지 변경
    pub async fn update_address(&self, caller: &Session, order_id: i64, address: &str) -> AppResult<OrderDetails> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AppError::invalid_input("주소는 비어 있을 수 없습니다"));
        }

        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.ensure_editable(OrderAction::EditAddress)?;

        if !self.orders.update_address(order.id, address).await? {
            return Err(AppError::InvalidState("주문 상태가 변경되었습니다".to_string()));
        }

        self.reload(order.id).await
    }

    /// draft → formed
    pub async fn form(&self, caller: &Session, order_id: i64) -> AppResult<OrderDetails> {
        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.form()?;

        if order.address.trim().is_empty() {
            return Err(AppError::invalid_input("주문을 확정하려면 주소가 필요합니다"));
        }

        if !self.orders.mark_formed(order.id, Utc::now()).await? {
            return Err(AppError::InvalidState("주문 상태가 변경되었습니다".to_string()));
        }

        info!("📝 주문 {} 확정 (클라이언트 {})", order.id, order.client_id);
        self.reload(order.id).await
    }

    /// formed → completed, 최종 트래픽 계산
    pub async fn complete(&self, caller: &Session, order_id: i64) -> AppResult<OrderDetails> {
        caller.ensure_moderator()?;
        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.complete()?;

        let items = self.items.list_for_order(order.id).await?;
        let lines: Vec<TrafficLine> = items.iter().map(OrderItemRecord::traffic_line).collect();
        let total = completion_traffic(&lines);

        if !self
            .orders
            .mark_completed(order.id, caller.client_id, Utc::now(), total)
            .await?
        {
            return Err(AppError::InvalidState("주문 상태가 변경되었습니다".to_string()));
        }

        info!(
            "✅ 주문 {} 완료 (모더레이터 {}, 트래픽 {:.2})",
            order.id, caller.client_id, total
        );
        self.reload(order.id).await
    }

    /// formed → rejected
    pub async fn reject(&self, caller: &Session, order_id: i64) -> AppResult<OrderDetails> {
        caller.ensure_moderator()?;
        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.reject()?;

        if !self.orders.mark_rejected(order.id, caller.client_id, Utc::now()).await? {
            return Err(AppError::InvalidState("주문 상태가 변경되었습니다".to_string()));
        }

        info!("⛔ 주문 {} 반려 (모더레이터 {})", order.id, caller.client_id);
        self.reload(order.id).await
    }

    /// 소프트 삭제 (품목과 이미지는 유지)
    pub async fn delete(&self, caller: &Session, order_id: i64) -> AppResult<()> {
        let (order, status) = self.load_authorized(caller, order_id).await?;
        status.delete()?;

        if !self.orders.mark_deleted(order.id).await? {
            return Err(AppError::not_found(format!("주문 {}을(를) 찾을 수 없습니다", order.id)));
        }

        info!("🗑️ 주문 {} 삭제", order.id);
        Ok(())
    }
}
