use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;

use crate::api::auth::CurrentClient;
use crate::api::models::*;
use crate::catalog::{DeviceInput, ImageUpload};
use crate::error::{AppError, AppResult};
use crate::orders::OrderListQuery;
use crate::server::ServerState;
use crate::session::SESSION_COOKIE;

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type IdPath = Result<Path<i64>, PathRejection>;

fn id_from(path: IdPath) -> AppResult<i64> {
    let Path(id) = path?;
    Ok(id)
}

/// 헬스 체크
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

// ===== 카탈로그 =====

/// 활성 디바이스 목록
pub async fn list_devices(
    State(state): State<ServerState>,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> AppResult<Json<Vec<DeviceResponse>>> {
    let Query(query) = query?;
    let devices = state
        .catalog
        .list(query.search.as_deref(), query.protocol.as_deref())
        .await?;

    Ok(Json(devices.into_iter().map(DeviceResponse::from).collect()))
}

/// 디바이스 상세
pub async fn get_device(State(state): State<ServerState>, path: IdPath) -> AppResult<Json<DeviceResponse>> {
    let device = state.catalog.get(id_from(path)?).await?;
    Ok(Json(device.into()))
}

/// 디바이스 생성 (모더레이터)
pub async fn create_device(
    State(state): State<ServerState>,
    client: CurrentClient,
    body: JsonBody<DeviceInput>,
) -> AppResult<(StatusCode, Json<DeviceResponse>)> {
    let Json(input) = body?;
    let device = state.catalog.create(&client.session, input).await?;
    Ok((StatusCode::CREATED, Json(device.into())))
}

/// 디바이스 수정 (모더레이터)
pub async fn update_device(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
    body: JsonBody<DeviceInput>,
) -> AppResult<Json<DeviceResponse>> {
    let id = id_from(path)?;
    let Json(input) = body?;
    let device = state.catalog.update(&client.session, id, input).await?;
    Ok(Json(device.into()))
}

/// 디바이스 소프트 삭제 (모더레이터)
pub async fn delete_device(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<StatusCode> {
    state.catalog.deactivate(&client.session, id_from(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 디바이스 이미지 업로드 (multipart `image` 필드)
pub async fn upload_device_image(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> AppResult<Json<ImageUpload>> {
    let id = id_from(path)?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        let upload = state
            .catalog
            .attach_image(&client.session, id, file_name.as_deref(), data.to_vec())
            .await?;
        return Ok(Json(upload));
    }

    Err(AppError::invalid_input("multipart 'image' 필드가 필요합니다"))
}

/// 디바이스 이미지 삭제
pub async fn delete_device_image(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<StatusCode> {
    state.catalog.detach_image(&client.session, id_from(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== 주문 =====

/// 장바구니 요약
pub async fn get_cart(State(state): State<ServerState>, client: CurrentClient) -> AppResult<Json<CartResponse>> {
    let summary = state.orders.cart_summary(&client.session).await?;
    Ok(Json(summary.into()))
}

/// 주문 목록
pub async fn list_orders(
    State(state): State<ServerState>,
    client: CurrentClient,
    params: Result<Query<OrderListParams>, QueryRejection>,
) -> AppResult<Json<Vec<OrderResponse>>> {
    let Query(params) = params?;
    let query = OrderListQuery::parse(
        params.status.as_deref(),
        params.date_from.as_deref(),
        params.date_to.as_deref(),
    )?;

    let orders = state.orders.list(&client.session, &query).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// 주문 상세
pub async fn get_order(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.get(&client.session, id_from(path)?).await?;
    Ok(Json(order.into()))
}

/// 배송지 변경 (draft만)
pub async fn update_order(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
    body: JsonBody<AddressRequest>,
) -> AppResult<Json<OrderResponse>> {
    let id = id_from(path)?;
    let Json(request) = body?;
    let order = state.orders.update_address(&client.session, id, &request.address).await?;
    Ok(Json(order.into()))
}

/// 주문 확정
pub async fn form_order(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.form(&client.session, id_from(path)?).await?;
    Ok(Json(order.into()))
}

/// 주문 완료 (모더레이터)
pub async fn complete_order(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.complete(&client.session, id_from(path)?).await?;
    Ok(Json(order.into()))
}

/// 주문 반려 (모더레이터)
pub async fn reject_order(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.reject(&client.session, id_from(path)?).await?;
    Ok(Json(order.into()))
}

/// 주문 소프트 삭제
pub async fn delete_order(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<StatusCode> {
    state.orders.delete(&client.session, id_from(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== 주문 품목 (호출자의 draft 주문) =====

/// 장바구니에 디바이스 추가
pub async fn add_order_item(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<Json<CartResponse>> {
    let summary = state.orders.add_item(&client.session, id_from(path)?).await?;
    Ok(Json(summary.into()))
}

/// 품목 수량 변경
pub async fn update_order_item(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
    body: JsonBody<QuantityRequest>,
) -> AppResult<Json<QuantityResponse>> {
    let device_id = id_from(path)?;
    let Json(request) = body?;

    let draft = state.orders.draft_for(&client.session).await?;
    let quantity = state
        .orders
        .update_item_quantity(&client.session, draft.id, device_id, request.quantity)
        .await?;

    Ok(Json(QuantityResponse {
        order_id: draft.id,
        device_id,
        quantity,
    }))
}

/// 품목 삭제
pub async fn remove_order_item(
    State(state): State<ServerState>,
    client: CurrentClient,
    path: IdPath,
) -> AppResult<StatusCode> {
    let device_id = id_from(path)?;
    let draft = state.orders.draft_for(&client.session).await?;
    state.orders.remove_item(&client.session, draft.id, device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== 인증/사용자 =====

fn session_cookie(session_id: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session_id, max_age_secs
    )
}

/// 회원가입
pub async fn register(
    State(state): State<ServerState>,
    body: JsonBody<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<ClientResponse>)> {
    let Json(request) = body?;
    let client = state.clients.register(&request.username, &request.password).await?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

/// 로그인 (JSON 본문과 HttpOnly 쿠키로 세션 ID 전달)
pub async fn login(
    State(state): State<ServerState>,
    body: JsonBody<CredentialsRequest>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body?;
    let outcome = state.clients.login(&request.username, &request.password).await?;

    let cookie = session_cookie(&outcome.session_id, state.config.session_ttl_secs);
    let response = LoginResponse {
        session_id: outcome.session_id,
        client_id: outcome.session.client_id,
        username: outcome.session.username,
        is_moderator: outcome.session.is_moderator,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

/// 로그아웃
pub async fn logout(State(state): State<ServerState>, client: CurrentClient) -> AppResult<impl IntoResponse> {
    state.clients.logout(&client.session_id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    ))
}

/// 내 프로필
pub async fn get_me(State(state): State<ServerState>, client: CurrentClient) -> AppResult<Json<ClientResponse>> {
    let me = state.clients.me(&client.session).await?;
    Ok(Json(me.into()))
}

/// 내 프로필 수정
pub async fn update_me(
    State(state): State<ServerState>,
    client: CurrentClient,
    body: JsonBody<UpdateMeRequest>,
) -> AppResult<Json<ClientResponse>> {
    let Json(request) = body?;
    let me = state
        .clients
        .update_me(
            &client.session_id,
            &client.session,
            request.username.as_deref(),
            request.password.as_deref(),
        )
        .await?;
    Ok(Json(me.into()))
}
