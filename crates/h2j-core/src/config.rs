use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Every HTTP round trip (file lookup, download, upload) is bounded by this.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_api_key: String,
    pub api_url: String,
    pub jpeg_quality: u8,
    pub http_timeout: Duration,
    pub poll_timeout: Duration,
    pub update_buffer: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_api_key = lookup("BOT_API_KEY").unwrap_or_default();
        let bot_api_key = bot_api_key.trim().to_string();
        if bot_api_key.is_empty() {
            return Err(Error::Config(
                "BOT_API_KEY environment variable is required".to_string(),
            ));
        }
        if !is_well_formed_token(&bot_api_key) {
            return Err(Error::Config(
                "BOT_API_KEY is malformed (expected <bot id>:<secret>)".to_string(),
            ));
        }

        let api_url = match lookup("TELEGRAM_API_URL").and_then(non_empty) {
            None => DEFAULT_API_URL.to_string(),
            Some(raw) => parse_api_url(&raw)?,
        };

        let jpeg_quality = match lookup("JPEG_QUALITY").and_then(non_empty) {
            None => 75,
            Some(raw) => match raw.trim().parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => q,
                _ => {
                    return Err(Error::Config(format!(
                        "JPEG_QUALITY must be between 1 and 100, got {raw:?}"
                    )))
                }
            },
        };

        let poll_timeout =
            Duration::from_secs(parse_num(&lookup, "POLL_TIMEOUT_SECS")?.unwrap_or(10));
        let update_buffer = parse_num(&lookup, "UPDATE_BUFFER")?.unwrap_or(16).max(1) as usize;

        Ok(Self {
            bot_api_key,
            api_url,
            jpeg_quality,
            http_timeout: HTTP_TIMEOUT,
            poll_timeout,
            update_buffer,
        })
    }
}

/// Telegram tokens look like `123456:AA...`: numeric bot id, colon, secret.
fn is_well_formed_token(token: &str) -> bool {
    let Some((id, secret)) = token.split_once(':') else {
        return false;
    };
    !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && !secret.is_empty()
        && !secret.chars().any(char::is_whitespace)
}

/// Bot API calls are joined onto the bare origin, so a path prefix would be
/// dropped for some calls and kept for others. Only `scheme://host[:port]`
/// is accepted.
fn parse_api_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match host {
        Some(host) if !host.is_empty() && !host.contains(['/', '?', '#']) => Ok(url.to_string()),
        _ => Err(Error::Config(format!(
            "TELEGRAM_API_URL must be http(s)://host[:port] without a path, got {raw:?}"
        ))),
    }
}

fn parse_num(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

/// `.env` values never override variables already set in the process.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, val);
        }
    }
}

/// `KEY=value` lines; blank lines, `#` comments and lines without a key are
/// skipped. One pair of matching surrounding quotes is stripped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, v)| (k.trim().to_string(), unquote(v.trim()).to_string()))
        .collect()
}

fn unquote(val: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| {
            val.strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(val)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
