use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use homestead::config::{load_config, Config};
use homestead::infrastructure::{logger::Logger, Store};
use homestead::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("加载配置失败")?;
    let _guard = Logger::init(&config.logging)?;

    info!("启动 {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    info!("存储后端: {}", store.backend());

    let addr = config.socket_addr();
    let state = AppState::new(config, store);
    if state.auth.enabled() {
        info!("已启用登录，/api 需要 Bearer 令牌");
    }
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法绑定到 {}", addr))?;
    info!("服务运行在 http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务器运行失败")?;

    info!("服务已停止");
    Ok(())
}

#[cfg(feature = "database")]
async fn open_store(config: &Config) -> anyhow::Result<Store> {
    use homestead::infrastructure::database::PgStore;

    match &config.database.url {
        Some(url) => {
            let pg = PgStore::connect(&config.database, url)
                .await
                .context("连接数据库失败")?;
            Ok(Store::Postgres(pg))
        }
        None => {
            warn!("未配置数据库，数据仅保存在内存中");
            Ok(Store::memory())
        }
    }
}

#[cfg(not(feature = "database"))]
async fn open_store(config: &Config) -> anyhow::Result<Store> {
    if config.database.url.is_some() {
        warn!("未启用 database 特性，忽略数据库配置");
    }
    Ok(Store::memory())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("监听退出信号失败: {}", e);
    }
    info!("收到退出信号");
}
