use std::sync::Arc;

use h2j_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), h2j_core::Error> {
    h2j_core::logging::init("h2j")?;

    let cfg = Arc::new(Config::load()?);

    h2j_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| h2j_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
