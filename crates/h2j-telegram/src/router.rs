use std::sync::Arc;

use teloxide::prelude::*;

use h2j_core::{
    config::{Config, DEFAULT_API_URL},
    convert::{default_decoder, heif_supported, JpegConverter},
    dispatch::Dispatcher,
    ports::{Converter, PlatformPort},
};

use crate::{
    files::FileFetcher,
    poller::{self, PollConfig, POLL_ERROR_BACKOFF},
    TelegramPlatform,
};

/// Build the bot. The client timeout covers one long-poll wait plus one
/// regular round trip.
fn build_bot(cfg: &Config) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(cfg.poll_timeout + cfg.http_timeout)
        .build()?;
    let mut bot = Bot::with_client(cfg.bot_api_key.clone(), client);
    if cfg.api_url != DEFAULT_API_URL {
        bot = bot.set_api_url(reqwest::Url::parse(&cfg.api_url)?);
    }
    Ok(bot)
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = build_bot(&cfg)?;

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "h2j started"),
        Err(e) => tracing::warn!(error = %e, "getMe failed; polling anyway"),
    }
    if !heif_supported() {
        tracing::warn!("built without the `heif` feature: every conversion will fail");
    }

    let files = FileFetcher::new(&bot, cfg.http_timeout)?;
    let platform: Arc<dyn PlatformPort> = Arc::new(TelegramPlatform::new(
        bot.clone(),
        files,
        cfg.http_timeout,
    ));
    let converter: Arc<dyn Converter> =
        Arc::new(JpegConverter::new(default_decoder(), cfg.jpeg_quality));
    let dispatcher = Dispatcher::new(platform, converter);

    let (updates, poller) = poller::spawn(
        bot,
        PollConfig {
            timeout: cfg.poll_timeout,
            buffer: cfg.update_buffer,
            error_backoff: POLL_ERROR_BACKOFF,
        },
    );

    tokio::select! {
        _ = dispatcher.run(updates) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        }
    }

    poller.abort();
    Ok(())
}
