//! 서버 렌더링 HTML 뷰

use std::fmt::Write;

use crate::db::models::DeviceRecord;
use crate::orders::OrderDetails;

/// HTML 특수문자 이스케이프
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, cart_count: i64, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<header>
  <a href="/smart-devices">Умные устройства</a>
  <a href="/smart-cart">Корзина (<span id="cart-count">{cart_count}</span>)</a>
</header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        cart_count = cart_count,
        body = body,
    )
}

fn image_tag(url: Option<&str>, alt: &str) -> String {
    match url.filter(|u| !u.is_empty()) {
        Some(url) => format!(r#"<img src="{}" alt="{}">"#, escape(url), escape(alt)),
        None => String::new(),
    }
}

/// 카탈로그 목록 페이지
pub fn device_list(devices: &[DeviceRecord], search: &str, cart_count: i64) -> String {
    let mut body = format!(
        r#"<form method="get" action="/smart-devices">
  <input type="text" name="search" value="{}">
  <button type="submit">Найти</button>
</form>
<ul class="devices">
"#,
        escape(search)
    );

    if devices.is_empty() {
        body.push_str("<li>Устройства не найдены</li>\n");
    }

    for device in devices {
        let _ = write!(
            body,
            r#"<li>
  {image}
  <a href="/smart-devices/{id}">{name}</a>
  <span>{protocol}, {rate} Кб/ч</span>
  <form method="post" action="/smart-cart/add">
    <input type="hidden" name="device_id" value="{id}">
    <button type="submit">В корзину</button>
  </form>
</li>
"#,
            image = image_tag(device.image_url.as_deref(), &device.name),
            id = device.id,
            name = escape(&device.name),
            protocol = escape(&device.protocol),
            rate = device.data_per_hour,
        );
    }
    body.push_str("</ul>");

    layout("Умные устройства", cart_count, &body)
}

/// 디바이스 상세 페이지
pub fn device_detail(device: &DeviceRecord, cart_count: i64) -> String {
    let body = format!(
        r#"<article>
  <h1>{name}</h1>
  {image}
  <p>Модель: {model}</p>
  <p>Протокол: {protocol}</p>
  <p>Средняя скорость: {avg} Кб/с, трафик: {rate} Кб/ч</p>
  <p>{description}</p>
  <p>{description_all}</p>
  <form method="post" action="/smart-cart/add">
    <input type="hidden" name="device_id" value="{id}">
    <button type="submit">В корзину</button>
  </form>
</article>"#,
        name = escape(&device.name),
        image = image_tag(device.image_url.as_deref(), &device.name),
        model = escape(&device.model),
        protocol = escape(&device.protocol),
        avg = device.avg_data_rate,
        rate = device.data_per_hour,
        description = escape(&device.description),
        description_all = escape(&device.description_all),
        id = device.id,
    );

    layout(&device.name, cart_count, &body)
}

fn order_table(details: &OrderDetails) -> String {
    let mut body = String::from("<table>\n<tr><th>Устройство</th><th>Кол-во</th><th>Кб/ч</th></tr>\n");
    for item in &details.items {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&item.device_name),
            item.quantity,
            item.data_per_hour
        );
    }
    body.push_str("</table>\n");
    let _ = write!(
        body,
        "<p>Суммарный трафик: {:.2} Кб/ч</p>",
        details.estimated_traffic()
    );
    body
}

/// 장바구니 페이지
pub fn cart(details: Option<&OrderDetails>) -> String {
    let (count, body) = match details {
        Some(details) if !details.items.is_empty() => {
            let body = format!(
                r#"<h1>Заявка №{id}</h1>
{table}
<form method="post" action="/smart-cart/delete">
  <input type="hidden" name="order_id" value="{id}">
  <button type="submit">Удалить заявку</button>
</form>"#,
                id = details.order.id,
                table = order_table(details),
            );
            (details.item_count(), body)
        }
        _ => (0, "<p>Корзина пуста</p>".to_string()),
    };

    layout("Корзина", count, &body)
}

/// 주문 조회 페이지
pub fn order(details: &OrderDetails, cart_count: i64) -> String {
    let mut body = format!(
        "<h1>Заявка №{}</h1>\n<p>Статус: {}</p>\n<p>Клиент: {}</p>\n<p>Адрес: {}</p>\n",
        details.order.id,
        details.status,
        escape(&details.order.client_name),
        escape(&details.order.address),
    );
    body.push_str(&order_table(details));
    if let Some(total) = details.order.total_traffic {
        let _ = write!(body, "<p>Итоговый трафик: {:.2} Кб/ч</p>", total);
    }

    layout(&format!("Заявка №{}", details.order.id), cart_count, &body)
}

/// 오류 페이지
pub fn error(status: u16, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head><meta charset="utf-8"><title>{status}</title></head>
<body>
<h1>{status}</h1>
<p>{message}</p>
<a href="/smart-devices">К каталогу</a>
</body>
</html>"#,
        status = status,
        message = escape(message),
    )
}
