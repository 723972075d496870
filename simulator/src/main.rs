use std::time::Duration;

use log::{info, warn};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
struct Device {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Cart {
    order_id: i64,
    count: i64,
}

#[derive(Debug, Clone)]
struct ClientProfile {
    username: String,
    password: String,
    /// 장바구니에 담을 디바이스 수 범위
    items_range: (usize, usize),
    /// 디바이스당 추가 횟수 범위
    quantity_range: (u32, u32),
    pause_ms: u64,
}

impl ClientProfile {
    fn new(prefix: &str, items_range: (usize, usize), quantity_range: (u32, u32), pause_ms: u64) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            username: format!("{}_{}", prefix, &suffix[..8]),
            password: format!("pw_{}", suffix),
            items_range,
            quantity_range,
            pause_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let api_base_url =
        std::env::var("SIMULATOR_API_URL").unwrap_or_else(|_| "http://localhost:7000".to_string());
    info!("스마트 디바이스 시뮬레이션 시작: {}", api_base_url);

    let client = Client::new();

    let profiles = vec![
        // 한두 개만 담는 가벼운 사용자
        ClientProfile::new("light", (1, 2), (1, 1), 300),
        ClientProfile::new("light", (1, 2), (1, 2), 500),
        // 여러 디바이스를 여러 개씩 담는 사용자
        ClientProfile::new("home", (2, 4), (1, 3), 200),
        ClientProfile::new("office", (3, 5), (2, 6), 100),
    ];

    let mut handles = Vec::new();
    for profile in profiles {
        let client = client.clone();
        let base = api_base_url.clone();
        handles.push(tokio::spawn(async move {
            let username = profile.username.clone();
            match simulate_client(&client, &base, profile).await {
                Ok(order_id) => info!("✅ {} 주문 {} 제출 완료", username, order_id),
                Err(e) => warn!("❌ {} 시뮬레이션 실패: {}", username, e),
            }
        }));
    }

    for handle in handles {
        handle.await.map_err(|e| e.to_string())?;
    }

    info!("시뮬레이션 종료");
    Ok(())
}

/// 가입 → 로그인 → 카탈로그 조회 → 장바구니 구성 → 주소 입력 → 확정
async fn simulate_client(client: &Client, base: &str, profile: ClientProfile) -> Result<i64, String> {
    let credentials = json!({ "username": profile.username, "password": profile.password });

    call(client, Method::POST, &format!("{}/auth/register", base), None, Some(&credentials)).await?;
    let login = call(client, Method::POST, &format!("{}/auth/login", base), None, Some(&credentials)).await?;
    let session_id = login["session_id"]
        .as_str()
        .ok_or("로그인 응답에 session_id가 없습니다")?
        .to_string();

    let catalog = call(client, Method::GET, &format!("{}/catalog", base), Some(&session_id), None).await?;
    let devices: Vec<Device> = serde_json::from_value(catalog).map_err(|e| e.to_string())?;
    if devices.is_empty() {
        return Err("카탈로그가 비어 있습니다".to_string());
    }

    let picked: Vec<Device> = {
        let mut rng = thread_rng();
        let wanted = rng.gen_range(profile.items_range.0..=profile.items_range.1).min(devices.len());
        devices.choose_multiple(&mut rng, wanted).cloned().collect()
    };

    for device in &picked {
        let times = thread_rng().gen_range(profile.quantity_range.0..=profile.quantity_range.1);
        for _ in 0..times {
            call(
                client,
                Method::POST,
                &format!("{}/order-items/{}", base, device.id),
                Some(&session_id),
                None,
            )
            .await?;
            time::sleep(Duration::from_millis(profile.pause_ms)).await;
        }
        info!("🛒 {}: {} x{}", profile.username, device.name, times);
    }

    let cart = call(client, Method::GET, &format!("{}/orders/cart", base), Some(&session_id), None).await?;
    let cart: Cart = serde_json::from_value(cart).map_err(|e| e.to_string())?;
    info!("{} 장바구니 {}: {}개", profile.username, cart.order_id, cart.count);

    let address = json!({ "address": format!("ул. Тестовая, д. {}", thread_rng().gen_range(1..=200)) });
    call(
        client,
        Method::PUT,
        &format!("{}/orders/{}", base, cart.order_id),
        Some(&session_id),
        Some(&address),
    )
    .await?;

    let formed = call(
        client,
        Method::PUT,
        &format!("{}/orders/{}/form", base, cart.order_id),
        Some(&session_id),
        None,
    )
    .await?;
    info!(
        "📝 {} 주문 확정: 추정 트래픽 {} Кб/ч",
        profile.username, formed["estimated_traffic"]
    );

    Ok(cart.order_id)
}

async fn call(
    client: &Client,
    method: Method,
    url: &str,
    session_id: Option<&str>,
    body: Option<&Value>,
) -> Result<Value, String> {
    let mut request = client.request(method, url);
    if let Some(session_id) = session_id {
        request = request.bearer_auth(session_id);
    }
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    let text = response.text().await.map_err(|e| e.to_string())?;

    if !status.is_success() {
        return Err(format!("HTTP {} {}: {}", status, url, text));
    }
    if text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
