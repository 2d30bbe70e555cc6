use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cadparse_server::{router, AppConfig, ParseService};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// 命令行只接受 `--config <路径>` 或 `--config=<路径>`
fn config_argument(args: impl IntoIterator<Item = String>) -> Result<Option<PathBuf>> {
    let mut args = args.into_iter();
    let mut path = None;
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--config=") {
            path = Some(PathBuf::from(value));
        } else if arg == "--config" {
            let value = args.next().context("`--config` 需要提供配置文件路径")?;
            path = Some(PathBuf::from(value));
        } else {
            bail!("未知参数：{arg}");
        }
    }
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let argument = config_argument(std::env::args().skip(1))?;
    let (config, loaded) = AppConfig::load_or_default(argument);

    // 初始化日志，RUST_LOG 优先于配置文件
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_env_filter(filter).finish(),
    )?;

    match loaded {
        Ok(source) => info!(source = %source, "配置已加载"),
        Err(err) => warn!(error = %err, "配置加载失败，使用内建默认值"),
    }
    info!("Starting CADParse...");

    let service = ParseService::from_config(&config).context("创建 HTTP 客户端失败")?;
    service
        .storage()
        .ensure_dirs()
        .await
        .context("创建临时目录失败")?;

    let app = router(Arc::new(service), config.server.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("绑定地址 {} 失败", config.server.bind))?;
    info!(addr = %config.server.bind, "开始监听");

    axum::serve(listener, app).await.context("服务异常退出")?;
    Ok(())
}
