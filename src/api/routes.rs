use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::api::handlers::*;
use crate::server::ServerState;

/// 이미지 업로드 최대 크기
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// API 라우터 생성
pub fn create_api_router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))

        // 카탈로그 API
        .route("/catalog", get(list_devices).post(create_device))
        .route(
            "/catalog/:id",
            get(get_device).put(update_device).delete(delete_device),
        )
        .route(
            "/catalog/:id/image",
            post(upload_device_image)
                .delete(delete_device_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )

        // 주문 API
        .route("/orders/cart", get(get_cart))
        .route("/orders", get(list_orders))
        .route(
            "/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/orders/:id/form", put(form_order))
        .route("/orders/:id/complete", put(complete_order))
        .route("/orders/:id/reject", put(reject_order))

        // 주문 품목 API
        .route(
            "/order-items/:device_id",
            post(add_order_item).put(update_order_item).delete(remove_order_item),
        )

        // 인증/사용자 API
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/users/me", get(get_me).put(update_me))
}
