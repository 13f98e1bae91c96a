//! Two-step Bot API file retrieval: `getFile` resolves an id to a server
//! path, then `download_file` streams the bytes.

use std::time::Duration;

use teloxide::{net::Download, prelude::*, DownloadError, RequestError};

use h2j_core::{errors::Error, Result};

/// File calls get their own client so the short timeout does not cut into
/// the poller's long-poll waits.
#[derive(Clone)]
pub struct FileFetcher {
    bot: Bot,
}

impl FileFetcher {
    /// Reuses `bot`'s token and API URL with a client bounded by `timeout`.
    pub fn new(bot: &Bot, timeout: Duration) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("http client build: {}", e.without_url())))?;
        let bot = Bot::with_client(bot.token(), client).set_api_url(bot.api_url());
        Ok(Self { bot })
    }

    /// Resolve `file_id` and download the file.
    pub async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(file_id)
            .await
            .map_err(|e| request_err("getFile", e))?;

        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(download_err)?;
        Ok(buf)
    }
}

fn request_err(method: &str, e: RequestError) -> Error {
    match e {
        RequestError::Api(api) => Error::External(format!("{method} failed: {api}")),
        RequestError::InvalidJson { source, .. } => {
            Error::External(format!("{method} returned invalid json: {source}"))
        }
        RequestError::Network(e) => Error::Network(format!("{method}: {}", e.without_url())),
        other => Error::Network(format!("{method}: {other}")),
    }
}

/// reqwest errors carry the request URL, which contains the bot token.
fn download_err(e: DownloadError) -> Error {
    match e {
        DownloadError::Network(e) => Error::Network(format!("file download: {}", e.without_url())),
        DownloadError::Io(e) => Error::External(format!("file download: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    const TOKEN: &str = "123:abc";

    fn fetcher(url: &str) -> FileFetcher {
        let bot = Bot::new(TOKEN).set_api_url(url.parse().unwrap());
        FileFetcher::new(&bot, Duration::from_secs(10)).unwrap()
    }

    async fn mock_get_file(server: &mut mockito::ServerGuard, body: &str) -> mockito::Mock {
        server
            .mock("POST", "/bot123:abc/getFile")
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn resolves_path_then_downloads_bytes() {
        let mut server = mockito::Server::new_async().await;
        let get_file = server
            .mock("POST", "/bot123:abc/getFile")
            .match_body(Matcher::PartialJson(json!({ "file_id": "F1" })))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ok":true,"result":{"file_id":"F1","file_unique_id":"U1","file_size":4,"file_path":"documents/file_7.heic"}}"#,
            )
            .create_async()
            .await;
        let download = server
            .mock("GET", "/file/bot123:abc/documents/file_7.heic")
            .with_body([1u8, 2, 3, 4])
            .create_async()
            .await;

        let bytes = fetcher(&server.url()).fetch("F1").await.unwrap();

        assert_eq!(bytes, vec![1, 2, 3, 4]);
        get_file.assert_async().await;
        download.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_reported_and_nothing_downloaded() {
        let mut server = mockito::Server::new_async().await;
        let _get_file = server
            .mock("POST", "/bot123:abc/getFile")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: invalid file_id"}"#)
            .create_async()
            .await;
        let download = server
            .mock("GET", Matcher::Regex("^/file/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let err = fetcher(&server.url()).fetch("nope").await.unwrap_err();

        match err {
            Error::External(msg) => assert!(msg.contains("getFile failed"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        download.assert_async().await;
    }

    #[tokio::test]
    async fn garbage_reply_is_an_external_error() {
        let mut server = mockito::Server::new_async().await;
        let _get_file = mock_get_file(&mut server, "<html>not json</html>").await;

        let err = fetcher(&server.url()).fetch("F1").await.unwrap_err();
        assert!(matches!(err, Error::External(_)), "{err:?}");
    }

    #[tokio::test]
    async fn missing_file_path_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _get_file = mock_get_file(
            &mut server,
            r#"{"ok":true,"result":{"file_id":"F1","file_unique_id":"U1"}}"#,
        )
        .await;

        let err = fetcher(&server.url()).fetch("F1").await.unwrap_err();
        assert!(matches!(err, Error::External(_)), "{err:?}");
    }

    #[tokio::test]
    async fn failed_download_is_a_network_error_without_token() {
        let mut server = mockito::Server::new_async().await;
        let _get_file = mock_get_file(
            &mut server,
            r#"{"ok":true,"result":{"file_id":"F1","file_unique_id":"U1","file_size":4,"file_path":"a.heic"}}"#,
        )
        .await;
        let _download = server
            .mock("GET", "/file/bot123:abc/a.heic")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher(&server.url()).fetch("F1").await.unwrap_err();
        match err {
            Error::Network(msg) => assert!(!msg.contains(TOKEN), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Nothing listens on port 9 (discard) in the test environment.
        let err = fetcher("http://127.0.0.1:9").fetch("F1").await.unwrap_err();
        match err {
            Error::Network(msg) => assert!(!msg.contains(TOKEN), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
