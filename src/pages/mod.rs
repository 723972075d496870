//! 서버 렌더링 페이지
//!
//! JSON API와 같은 서비스를 사용하고, 오류는 HTML 페이지로 응답합니다.

pub mod views;

use axum::{
    extract::{rejection::FormRejection, Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::api::auth::{CurrentClient, MaybeClient};
use crate::error::AppError;
use crate::server::ServerState;
use crate::session::Session;

/// HTML 오류 응답
pub struct PageError(AppError);

impl From<AppError> for PageError {
    fn from(e: AppError) -> Self {
        PageError(e)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = match &self.0 {
            AppError::BackingStore(detail) => {
                error!("저장소 오류 발생: {}", detail);
                "Внутренняя ошибка сервера".to_string()
            }
            AppError::Unauthenticated => "Необходимо войти в систему".to_string(),
            AppError::NotFound(_) => "Страница не найдена".to_string(),
            other => other.to_string(),
        };

        (status, Html(views::error(status.as_u16(), &message))).into_response()
    }
}

type PageResult<T> = Result<T, PageError>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub device_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCartForm {
    pub order_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CartCountResponse {
    pub count: i64,
}

async fn cart_count(state: &ServerState, session: Option<&Session>) -> Result<i64, AppError> {
    match session {
        Some(session) => Ok(state.orders.cart_summary(session).await?.count),
        None => Ok(0),
    }
}

fn session_of(client: &MaybeClient) -> Option<&Session> {
    client.0.as_ref().map(|c| &c.session)
}

/// 로그인이 필요한 페이지는 HTML 401로 응답
fn require_session(client: MaybeClient) -> Result<CurrentClient, PageError> {
    client.0.ok_or(PageError(AppError::Unauthenticated))
}

/// `/` → 카탈로그
pub async fn index() -> Redirect {
    Redirect::to("/smart-devices")
}

/// 카탈로그 목록 페이지
pub async fn smart_devices(
    State(state): State<ServerState>,
    client: MaybeClient,
    Query(params): Query<SearchParams>,
) -> PageResult<Html<String>> {
    let search = params.search.unwrap_or_default();
    let devices = state.catalog.list(Some(&search), None).await?;
    let count = cart_count(&state, session_of(&client)).await?;

    Ok(Html(views::device_list(&devices, &search, count)))
}

/// 디바이스 상세 페이지
pub async fn smart_device_detail(
    State(state): State<ServerState>,
    client: MaybeClient,
    Path(id): Path<String>,
) -> PageResult<Html<String>> {
    let id: i64 = id.parse().map_err(|_| AppError::not_found("잘못된 디바이스 ID"))?;
    let device = state.catalog.get(id).await?;
    let count = cart_count(&state, session_of(&client)).await?;

    Ok(Html(views::device_detail(&device, count)))
}

/// 장바구니 페이지
pub async fn smart_cart(State(state): State<ServerState>, client: MaybeClient) -> PageResult<Html<String>> {
    let cart = match session_of(&client) {
        Some(session) => state.orders.current_cart(session).await?,
        None => None,
    };

    Ok(Html(views::cart(cart.as_ref())))
}

/// 장바구니에 추가 후 장바구니로 이동
pub async fn add_to_smart_cart(
    State(state): State<ServerState>,
    client: MaybeClient,
    form: Result<Form<AddToCartForm>, FormRejection>,
) -> PageResult<Redirect> {
    let client = require_session(client)?;
    let Form(form) = form.map_err(AppError::from)?;
    state.orders.add_item(&client.session, form.device_id).await?;
    Ok(Redirect::to("/smart-cart"))
}

/// 장바구니 주문 삭제 후 카탈로그로 이동
pub async fn delete_smart_cart(
    State(state): State<ServerState>,
    client: MaybeClient,
    form: Result<Form<DeleteCartForm>, FormRejection>,
) -> PageResult<Redirect> {
    let client = require_session(client)?;
    let Form(form) = form.map_err(AppError::from)?;
    state.orders.delete(&client.session, form.order_id).await?;
    Ok(Redirect::to("/smart-devices"))
}

/// 장바구니 품목 수
pub async fn smart_cart_count(
    State(state): State<ServerState>,
    client: MaybeClient,
) -> Result<Json<CartCountResponse>, AppError> {
    let count = cart_count(&state, session_of(&client)).await?;
    Ok(Json(CartCountResponse { count }))
}

/// 주문 조회 페이지
pub async fn request_page(
    State(state): State<ServerState>,
    client: MaybeClient,
    Path(id): Path<String>,
) -> PageResult<Html<String>> {
    let client = require_session(client)?;
    let id: i64 = id.parse().map_err(|_| AppError::not_found("잘못된 주문 ID"))?;
    let details = state.orders.get(&client.session, id).await?;
    let count = cart_count(&state, Some(&client.session)).await?;

    Ok(Html(views::order(&details, count)))
}

/// 페이지 없음
pub async fn not_found_page() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(views::error(404, "Страница не найдена")),
    )
}

/// 페이지 라우터 생성
pub fn create_pages_router() -> Router<ServerState> {
    Router::new()
        .route("/", get(index))
        .route("/smart-devices", get(smart_devices))
        .route("/smart-devices/:id", get(smart_device_detail))
        .route("/smart-cart", get(smart_cart))
        .route("/smart-cart/add", post(add_to_smart_cart))
        .route("/smart-cart/delete", post(delete_smart_cart))
        .route("/smart-cart/count", get(smart_cart_count))
        .route("/request/:id", get(request_page))
}
