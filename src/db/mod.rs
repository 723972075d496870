pub mod models;
pub mod repository;

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;
use std::str::FromStr;

pub use repository::{ClientRepository, DeviceRepository, OrderItemRepository, OrderRepository};

/// SQLite 데이터베이스 초기화 및 연결
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    info!("🗄️  SQLite 데이터베이스 초기화 중: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // 연결 풀 생성
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    // 테이블 생성
    create_tables(&pool).await?;

    info!("✅ 데이터베이스 초기화 완료");

    Ok(pool)
}

/// 테스트용 인메모리 데이터베이스
///
/// `sqlite::memory:`는 연결마다 별도 DB가 생기므로 연결을 하나로 고정합니다.
pub async fn init_in_memory() -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// 필요한 테이블 생성
async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    // 클라이언트 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_moderator INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login TEXT,
            date_joined TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 디바이스 카탈로그 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            model TEXT NOT NULL DEFAULT '',
            avg_data_rate REAL NOT NULL DEFAULT 0,
            data_per_hour REAL NOT NULL DEFAULT 0,
            image_url TEXT,
            description TEXT NOT NULL DEFAULT '',
            description_all TEXT NOT NULL DEFAULT '',
            protocol TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'other',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 주문 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'formed', 'completed', 'rejected', 'deleted')),
            client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL,
            formed_at TEXT,
            completed_at TEXT,
            moderator_id INTEGER REFERENCES clients(id) ON DELETE RESTRICT,
            address TEXT NOT NULL DEFAULT '',
            total_traffic REAL
        )"
    )
    .execute(pool)
    .await?;

    // 주문 품목 테이블 (주문-디바이스 복합 키)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS order_items (
            order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE RESTRICT,
            device_id INTEGER NOT NULL REFERENCES devices(id) ON DELETE RESTRICT,
            quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1),
            created_at TEXT NOT NULL,
            PRIMARY KEY (order_id, device_id)
        )"
    )
    .execute(pool)
    .await?;

    // 클라이언트당 draft 주문은 하나만 허용
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_one_draft_per_client
         ON orders(client_id) WHERE status = 'draft'"
    )
    .execute(pool)
    .await?;

    // 인덱스 생성
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_client ON orders(client_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_formed_at ON orders(formed_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_active ON devices(is_active)")
        .execute(pool)
        .await?;

    info!("📋 테이블 생성 완료");

    Ok(())
}
