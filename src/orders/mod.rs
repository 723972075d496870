//! 주문 도메인: 상태 머신, 트래픽 계산, 장바구니/주문 서비스

pub mod service;
pub mod status;
pub mod traffic;

pub use service::{CartSummary, OrderDetails, OrderListQuery, OrderService};
pub use status::{OrderAction, OrderStatus, TransitionError};
pub use traffic::{DeviceCategory, TrafficLine};
