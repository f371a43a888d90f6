use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT,
};

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. The stats site drops requests that do not look
/// like they came from its own web front end, so those headers ride on every
/// request. The timeout of the first caller sticks for the process.
pub fn http_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .default_headers(stats_headers())
            .build()
            .context("failed to build http client")
    })
}

fn stats_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert(
        HeaderName::from_static("x-nba-stats-origin"),
        HeaderValue::from_static("stats"),
    );
    headers.insert(
        HeaderName::from_static("x-nba-stats-token"),
        HeaderValue::from_static("true"),
    );
    headers
}
