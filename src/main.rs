use bulwark::{AppConfig, AppError};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    // Flushes buffered log lines on drop
    let _guard = config.log.clone().init()?;

    bulwark::run(config).await
}
