// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::{Client, Proxy, Response};

use crate::error::{AppError, Result};
use crate::models::FetchConfig;

/// A fetched response body with the bits the downloader needs.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    /// URL after redirects
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Create a configured asynchronous HTTP client.
///
/// Configured headers and the cookie become default headers on every request.
/// Cookies set by responses are kept and replayed, so media CDNs see the
/// session the page fetch opened. A configured cookie takes precedence.
pub fn create_async_client(config: &FetchConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(default_headers(config)?);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}

fn default_headers(config: &FetchConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::config(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AppError::config(format!("Invalid value for header '{name}': {e}")))?;
        headers.insert(name, value);
    }

    if let Some(cookie) = &config.cookie {
        let mut value = HeaderValue::from_str(cookie)
            .map_err(|e| AppError::config(format!("Invalid cookie: {e}")))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    Ok(headers)
}

/// GET a URL and fail on non-success status.
async fn get_checked(client: &Client, url: &str, referer: Option<&str>) -> Result<Response> {
    let mut request = client.get(url);
    if let Some(referer) = referer {
        request = request.header(REFERER, referer);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Fetch a page asynchronously and return its body text.
pub async fn fetch_text(client: &Client, url: &str, referer: Option<&str>) -> Result<String> {
    let response = get_checked(client, url, referer).await?;
    let text = response.text().await?;
    log::debug!("Fetched {} ({} bytes)", url, text.len());
    Ok(text)
}

/// Fetch raw bytes, keeping the content type.
pub async fn fetch_bytes(client: &Client, url: &str, referer: Option<&str>) -> Result<FetchedBytes> {
    let response = get_checked(client, url, referer).await?;
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let bytes = response.bytes().await?.to_vec();
    Ok(FetchedBytes {
        final_url,
        content_type,
        bytes,
    })
}

/// Follow redirects of a share link and return where it lands.
pub async fn resolve_redirect(client: &Client, url: &str) -> Result<String> {
    let response = get_checked(client, url, None).await?;
    let final_url = response.url().to_string();
    if final_url != url {
        log::debug!("Resolved {} -> {}", url, final_url);
    }
    Ok(final_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_cookie_and_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("cookie", "a1=xyz"))
            .and(header("x-custom", "1"))
            .and(header("referer", "https://ref.example/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let mut config = FetchConfig::default().with_cookie("a1=xyz");
        config.headers.insert("X-Custom".into(), "1".into());
        let client = create_async_client(&config).unwrap();

        let text = fetch_text(
            &client,
            &format!("{}/page", server.uri()),
            Some("https://ref.example/"),
        )
        .await
        .unwrap();
        assert_eq!(text, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = create_async_client(&FetchConfig::default()).unwrap();
        let err = fetch_text(&client, &format!("{}/gone", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_resolve_redirect_follows_location() {
        let server = MockServer::start().await;
        let target = format!("{}/explore/abc", server.uri());
        Mock::given(method("GET"))
            .and(path("/s/short"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/explore/abc"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = create_async_client(&FetchConfig::default()).unwrap();
        let resolved = resolve_redirect(&client, &format!("{}/s/short", server.uri()))
            .await
            .unwrap();
        assert_eq!(resolved, target);
    }

    #[tokio::test]
    async fn test_response_cookies_are_replayed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "tt_chain_token=abc; Path=/")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/play.mp4"))
            .and(header("cookie", "tt_chain_token=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;

        let client = create_async_client(&FetchConfig::default()).unwrap();
        let media = format!("{}/play.mp4", server.uri());
        assert!(fetch_bytes(&client, &media, None).await.is_err());

        fetch_text(&client, &format!("{}/video/1", server.uri()), None)
            .await
            .unwrap();
        let fetched = fetch_bytes(&client, &media, None).await.unwrap();
        assert_eq!(fetched.bytes, b"mp4");
    }

    #[test]
    fn test_proxy_is_applied() {
        let config = Config {
            fetch: FetchConfig::default().with_proxy("http://127.0.0.1:8080"),
            ..Default::default()
        };
        config.validate().unwrap();
        assert!(create_async_client(&config.fetch).is_ok());

        let bad = Config {
            fetch: FetchConfig::default().with_proxy("not a proxy"),
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut config = FetchConfig::default();
        config.headers.insert("bad header".into(), "x".into());
        assert!(matches!(
            create_async_client(&config),
            Err(AppError::Config(_))
        ));
    }
}
