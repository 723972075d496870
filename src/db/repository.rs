use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::{Error as SqlxError, QueryBuilder};

use super::models::{ClientRecord, DeviceDraft, DeviceRecord, OrderFilter, OrderItemRecord, OrderRecord};

const CLIENT_COLUMNS: &str =
    "id, username, password_hash, is_moderator, is_active, last_login, date_joined";

const DEVICE_COLUMNS: &str = "id, name, model, avg_data_rate, data_per_hour, image_url, description,
     description_all, protocol, category, is_active, created_at";

const ORDER_SELECT: &str = "SELECT o.id, o.status, o.client_id, c.username AS client_name,
            o.created_at, o.formed_at, o.completed_at, o.moderator_id,
            m.username AS moderator_name, o.address, o.total_traffic
     FROM orders o
     JOIN clients c ON c.id = o.client_id
     LEFT JOIN clients m ON m.id = o.moderator_id";

/// 고유 제약 위반 여부
pub fn is_unique_violation(err: &SqlxError) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

/// 클라이언트 저장소
#[derive(Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 클라이언트 생성
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        is_moderator: bool,
    ) -> Result<ClientRecord, SqlxError> {
        let sql = format!(
            "INSERT INTO clients (username, password_hash, is_moderator, is_active, date_joined)
             VALUES (?, ?, ?, 1, ?)
             RETURNING {}",
            CLIENT_COLUMNS
        );
        sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(is_moderator)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
    }

    /// 모더레이터 계정 보장 (없으면 생성, 있으면 권한과 비밀번호 갱신)
    pub async fn upsert_moderator(&self, username: &str, password_hash: &str) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO clients (username, password_hash, is_moderator, is_active, date_joined)
             VALUES (?, ?, 1, 1, ?)
             ON CONFLICT(username) DO UPDATE SET
                password_hash = excluded.password_hash,
                is_moderator = 1"
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ClientRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM clients WHERE id = ?", CLIENT_COLUMNS);
        sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<ClientRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM clients WHERE username = ?", CLIENT_COLUMNS);
        sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// 마지막 로그인 시각 기록
    pub async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), SqlxError> {
        sqlx::query("UPDATE clients SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// 사용자명/비밀번호 변경 (None인 필드는 유지)
    pub async fn update_profile(
        &self,
        id: i64,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<ClientRecord>, SqlxError> {
        let sql = format!(
            "UPDATE clients
             SET username = COALESCE(?, username),
                 password_hash = COALESCE(?, password_hash)
             WHERE id = ?
             RETURNING {}",
            CLIENT_COLUMNS
        );
        sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// 디바이스 카탈로그 저장소
#[derive(Clone)]
pub struct DeviceRepository {
    pool: SqlitePool,
}

impl DeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 활성 디바이스 조회 (프로토콜 정확 일치 필터 선택)
    pub async fn list_active(&self, protocol: Option<&str>) -> Result<Vec<DeviceRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM devices
             WHERE is_active = 1 AND (? IS NULL OR protocol = ?)
             ORDER BY id ASC",
            DEVICE_COLUMNS
        );
        sqlx::query_as::<_, DeviceRecord>(&sql)
            .bind(protocol)
            .bind(protocol)
            .fetch_all(&self.pool)
            .await
    }

    /// ID로 조회 (비활성 포함)
    pub async fn find_by_id(&self, id: i64) -> Result<Option<DeviceRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM devices WHERE id = ?", DEVICE_COLUMNS);
        sqlx::query_as::<_, DeviceRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn count(&self) -> Result<i64, SqlxError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM devices")
            .fetch_one(&self.pool)
            .await
    }

    /// 디바이스 생성
    pub async fn create(&self, device: &DeviceDraft) -> Result<DeviceRecord, SqlxError> {
        let sql = format!(
            "INSERT INTO devices
             (name, model, avg_data_rate, data_per_hour, description, description_all,
              protocol, category, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
             RETURNING {}",
            DEVICE_COLUMNS
        );
        sqlx::query_as::<_, DeviceRecord>(&sql)
            .bind(&device.name)
            .bind(&device.model)
            .bind(device.avg_data_rate)
            .bind(device.data_per_hour)
            .bind(&device.description)
            .bind(&device.description_all)
            .bind(&device.protocol)
            .bind(device.category.as_str())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
    }

    /// 활성 디바이스 수정
    pub async fn update(&self, id: i64, device: &DeviceDraft) -> Result<Option<DeviceRecord>, SqlxError> {
        let sql = format!(
            "UPDATE devices
             SET name = ?, model = ?, avg_data_rate = ?, data_per_hour = ?,
                 description = ?, description_all = ?, protocol = ?, category = ?
             WHERE id = ? AND is_active = 1
             RETURNING {}",
            DEVICE_COLUMNS
        );
        sqlx::query_as::<_, DeviceRecord>(&sql)
            .bind(&device.name)
            .bind(&device.model)
            .bind(device.avg_data_rate)
            .bind(device.data_per_hour)
            .bind(&device.description)
            .bind(&device.description_all)
            .bind(&device.protocol)
            .bind(device.category.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// 소프트 삭제, 변경된 행이 있으면 true
    pub async fn deactivate(&self, id: i64) -> Result<bool, SqlxError> {
        let result = sqlx::query("UPDATE devices SET is_active = 0 WHERE id = ? AND is_active = 1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_image_url(&self, id: i64, image_url: Option<&str>) -> Result<(), SqlxError> {
        sqlx::query("UPDATE devices SET image_url = ? WHERE id = ?")
            .bind(image_url)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// 주문 저장소
#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<OrderRecord>, SqlxError> {
        let sql = format!("{} WHERE o.id = ?", ORDER_SELECT);
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// 클라이언트의 draft 주문
    pub async fn find_draft(&self, client_id: i64) -> Result<Option<OrderRecord>, SqlxError> {
        let sql = format!("{} WHERE o.client_id = ? AND o.status = 'draft'", ORDER_SELECT);
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// draft 주문 조회, 없으면 생성
    ///
    /// 부분 고유 인덱스가 중복 draft를 막으므로 동시 요청이 와도 하나만 남습니다.
    pub async fn find_or_create_draft(&self, client_id: i64) -> Result<OrderRecord, SqlxError> {
        sqlx::query(
            "INSERT OR IGNORE INTO orders (status, client_id, created_at, address)
             VALUES ('draft', ?, ?, '')"
        )
        .bind(client_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let sql = format!("{} WHERE o.client_id = ? AND o.status = 'draft'", ORDER_SELECT);
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(client_id)
            .fetch_one(&self.pool)
            .await
    }

    /// 필터 조건으로 주문 목록 조회 (삭제된 주문은 항상 제외)
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, SqlxError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(ORDER_SELECT);
        builder.push(" WHERE o.status != 'deleted'");

        if let Some(client_id) = filter.client_id {
            builder.push(" AND o.client_id = ").push_bind(client_id);
        }
        if filter.exclude_drafts {
            builder.push(" AND o.status != 'draft'");
        }
        if let Some(status) = filter.status {
            builder.push(" AND o.status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.formed_from {
            builder
                .push(" AND julianday(o.formed_at) >= julianday(")
                .push_bind(from)
                .push(")");
        }
        if let Some(before) = filter.formed_before {
            builder
                .push(" AND julianday(o.formed_at) < julianday(")
                .push_bind(before)
                .push(")");
        }
        builder.push(" ORDER BY o.id DESC");

        builder
            .build_query_as::<OrderRecord>()
            .fetch_all(&self.pool)
            .await
    }

    /// draft 주문의 배송지 변경
    pub async fn update_address(&self, id: i64, address: &str) -> Result<bool, SqlxError> {
        let result = sqlx::query("UPDATE orders SET address = ? WHERE id = ? AND status = 'draft'")
            .bind(address)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// draft → formed
    pub async fn mark_formed(&self, id: i64, formed_at: DateTime<Utc>) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'formed', formed_at = ?
             WHERE id = ? AND status = 'draft'"
        )
        .bind(formed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// formed → completed
    pub async fn mark_completed(
        &self,
        id: i64,
        moderator_id: i64,
        completed_at: DateTime<Utc>,
        total_traffic: f64,
    ) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE orders
             SET status = 'completed', completed_at = ?, moderator_id = ?, total_traffic = ?
             WHERE id = ? AND status = 'formed'"
        )
        .bind(completed_at)
        .bind(moderator_id)
        .bind(total_traffic)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// formed → rejected
    pub async fn mark_rejected(
        &self,
        id: i64,
        moderator_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE orders
             SET status = 'rejected', completed_at = ?, moderator_id = ?
             WHERE id = ? AND status = 'formed'"
        )
        .bind(completed_at)
        .bind(moderator_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 소프트 삭제
    pub async fn mark_deleted(&self, id: i64) -> Result<bool, SqlxError> {
        let result = sqlx::query("UPDATE orders SET status = 'deleted' WHERE id = ? AND status != 'deleted'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// 주문 품목 저장소
#[derive(Clone)]
pub struct OrderItemRepository {
    pool: SqlitePool,
}

impl OrderItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 주문의 품목 목록 (디바이스 정보 포함)
    pub async fn list_for_order(&self, order_id: i64) -> Result<Vec<OrderItemRecord>, SqlxError> {
        sqlx::query_as::<_, OrderItemRecord>(
            "SELECT oi.order_id, oi.device_id, oi.quantity,
                    d.name AS device_name, d.data_per_hour, d.image_url, d.category
             FROM order_items oi
             JOIN devices d ON d.id = oi.device_id
             WHERE oi.order_id = ?
             ORDER BY oi.created_at ASC, oi.device_id ASC"
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }

    /// 품목 추가, 이미 있으면 수량 1 증가
    pub async fn add_or_increment(&self, order_id: i64, device_id: i64) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO order_items (order_id, device_id, quantity, created_at)
             VALUES (?, ?, 1, ?)
             ON CONFLICT(order_id, device_id) DO UPDATE SET
                quantity = order_items.quantity + 1"
        )
        .bind(order_id)
        .bind(device_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 수량 변경, 해당 주문에 품목이 있으면 true
    pub async fn set_quantity(&self, order_id: i64, device_id: i64, quantity: i64) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE order_items SET quantity = ? WHERE order_id = ? AND device_id = ?"
        )
        .bind(quantity)
        .bind(order_id)
        .bind(device_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 품목 삭제, 해당 주문에 품목이 있으면 true
    pub async fn remove(&self, order_id: i64, device_id: i64) -> Result<bool, SqlxError> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = ? AND device_id = ?")
            .bind(order_id)
            .bind(device_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 주문의 총 수량
    pub async fn total_quantity(&self, order_id: i64) -> Result<i64, SqlxError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0) FROM order_items WHERE order_id = ?"
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await
    }
}
