//! 스마트 디바이스 카탈로그 및 주문 백엔드
//!
//! 클라이언트는 디바이스 카탈로그를 조회하고 장바구니(draft 주문)를 구성해 제출하며,
//! 모더레이터는 제출된 주문을 트래픽 계산과 함께 완료하거나 반려합니다.

pub mod api;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod data;
pub mod db;
pub mod error;
pub mod orders;
pub mod pages;
pub mod server;
pub mod session;
pub mod storage;

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use server::{build_router, start_server, ServerState};
