use std::time::Duration;

use futures::future::BoxFuture;

/// Errors from raw byte fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
    /// Transport failure; `url` is redacted and `source` carries no URL.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("fetch unavailable: {0}")]
    Unavailable(String),
}

/// Source of remote bytes (imagery, avatar models).
///
/// Object-safe so the runtime can hold an `Arc<dyn Fetcher>` and tests can
/// substitute deterministic stubs.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// HTTP fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geoworld/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            tracing::debug!(url = %redact_secrets(url), "fetching");
            let http = |source: reqwest::Error| FetchError::Http {
                url: redact_secrets(url),
                source: source.without_url(),
            };
            let response = self.client.get(url).send().await.map_err(http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: redact_secrets(url),
                });
            }
            Ok(response.bytes().await.map_err(http)?.to_vec())
        })
    }
}

/// Fetcher for offline runs: every request fails, so callers take their fallback paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl Fetcher for OfflineFetcher {
    fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async { Err(FetchError::Unavailable("offline".into())) })
    }
}

const SECRET_PARAMS: [&str; 3] = ["key=", "access_token=", "token="];

/// Mask API keys in a URL before it reaches a log line or error message.
pub fn redact_secrets(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let masked: Vec<String> = query
        .split('&')
        .map(|pair| match SECRET_PARAMS.iter().find(|p| pair.starts_with(*p)) {
            Some(p) => format!("{p}***"),
            None => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", masked.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_known_secret_params() {
        let url = "https://maps.example/static?center=1,2&key=SECRET&zoom=3";
        assert_eq!(
            redact_secrets(url),
            "https://maps.example/static?center=1,2&key=***&zoom=3"
        );
        assert_eq!(
            redact_secrets("https://a.example/x?access_token=abc"),
            "https://a.example/x?access_token=***"
        );
        assert_eq!(redact_secrets("https://a.example/x"), "https://a.example/x");
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_keys() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/static?center=1,2&key=SUPERSECRET")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { .. }));
        let mut chain = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(s) = source {
            chain.push_str(&s.to_string());
            source = s.source();
        }
        assert!(!chain.contains("SUPERSECRET"), "{chain}");
        assert!(chain.contains("key=***"), "{chain}");
    }

    #[tokio::test]
    async fn offline_fetcher_always_fails() {
        let err = OfflineFetcher.fetch("https://a.example").await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable(_)));
    }
}
