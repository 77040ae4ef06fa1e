pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod gateway;
mod http_errors;
pub mod history;
pub mod lint;
pub mod logging;
pub mod model;
pub mod progress;
pub mod query;
pub mod render;
pub mod terminal;

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::info;

use config::Config;
use dispatch::{App, Command};

pub async fn run() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    logging::init();

    let cfg = Config::from_env();
    info!(
        home_dir = %cfg.home_dir.display(),
        api_base_url = %cfg.api_base_url,
        model = %cfg.model,
        "loaded runtime configuration"
    );

    let command = Command::from_args(env::args().skip(1));
    let mut app = App::from_config(cfg)?;
    let outcome = app.dispatch(command).await?;
    Ok(outcome.exit_code())
}
