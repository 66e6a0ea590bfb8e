use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use xpub::{CdpSessionFactory, FileStore, LoginConfig, PublishService, ServiceConfig, clamp_login_deadline};

mod cli;
mod logging;
mod routes;

use cli::Cli;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let data_dir = cli.data_dir.clone().unwrap_or_else(FileStore::default_root);
	let log_file = data_dir.join(cli.platform.as_str()).join("xpubd.log");
	logging::init(cli.verbose, &log_file).context("failed to initialize logging")?;

	let store = FileStore::new(&data_dir);
	let config = ServiceConfig {
		headless: !cli.headful,
		login: LoginConfig {
			deadline: clamp_login_deadline(Duration::from_secs(cli.login_timeout)),
			..LoginConfig::default()
		},
	};
	let service = Arc::new(PublishService::new(Arc::new(store), CdpSessionFactory::new(), config));

	let app = routes::router(AppState { service, platform: cli.platform });

	let addr = format!("127.0.0.1:{}", cli.port);
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	info!(target = "xpub.http", platform = %cli.platform, %addr, "listening");

	axum::serve(listener, app).await.context("server error")?;
	Ok(())
}
