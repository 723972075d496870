use log::info;

use smart_devices::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    info!("⚙️ 설정 로드 완료: 포트 {}, DB {}", config.rest_port, config.database_url);

    start_server(config).await
}
