// 🌐 Remote Calls - Blocking HTTP client and call throttle
// One outstanding request at a time, spaced by a configurable interval

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// HTTP CLIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Request timeout in milliseconds. A hung server fails the call instead of the run.
    pub timeout_ms: u64,
    /// Extra attempts after a failed request (0 = fail fast)
    pub max_retries: u32,
    /// First retry delay in milliseconds, doubled per attempt
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            timeout_ms: 30_000,
            max_retries: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

/// GET-only JSON client over reqwest's blocking API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    settings: HttpSettings,
}

impl HttpClient {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .gzip(true)
            .user_agent(concat!("hiring-trends/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpClient { client, settings })
    }

    /// GET `url` with query parameters and decode the JSON body.
    ///
    /// Client errors (4xx) are not retried.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut backoff = Duration::from_millis(self.settings.initial_backoff_ms);
        let max_backoff = Duration::from_millis(self.settings.max_backoff_ms);
        let mut last_err = anyhow!("no request sent");

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                debug!(
                    "retry attempt {}/{} for {} after {:?}",
                    attempt, self.settings.max_retries, url, backoff
                );
                thread::sleep(backoff);
                backoff = (backoff * 2).min(max_backoff);
            }

            match self.client.get(url).query(query).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .with_context(|| format!("Failed to decode JSON from {}", url));
                    }
                    if status.is_client_error() {
                        bail!("HTTP {} from {}", status, url);
                    }
                    last_err = anyhow!("HTTP {} from {}", status, url);
                }
                Err(e) => {
                    last_err = anyhow::Error::new(e).context(format!("GET {} failed", url));
                }
            }
        }

        Err(last_err)
    }
}

// ============================================================================
// THROTTLE
// ============================================================================

/// Minimum spacing between consecutive remote calls
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// No spacing at all (tests, local sources)
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before the next call may start
    pub fn remaining(&self) -> Duration {
        match self.last {
            Some(last) => self.interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Block until the interval since the previous call has passed,
    /// then mark a new call as started. The first call never waits.
    pub fn wait(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        self.last = Some(Instant::now());
    }
}

// ============================================================================
// TEST SERVER
// ============================================================================

/// Minimal local HTTP server for exercising remote sources in tests.
/// One request per connection; the handler sees the path without query.
#[cfg(test)]
pub(crate) mod stub {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    pub(crate) struct StubServer {
        pub base: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        pub(crate) fn start<F>(handler: F) -> Self
        where
            F: Fn(&str) -> (u16, String) + Send + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());

                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    loop {
                        let mut header = String::new();
                        match reader.read_line(&mut header) {
                            Ok(0) | Err(_) => break,
                            Ok(_) if header == "\r\n" => break,
                            Ok(_) => {}
                        }
                    }

                    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let path = target.split('?').next().unwrap_or("/").to_string();
                    seen.lock().unwrap().push(target);

                    let (status, body) = handler(&path);
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes());
                }
            });

            StubServer { base, requests }
        }

        /// Request targets (path and query) in arrival order
        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn hits(&self, path: &str) -> usize {
            self.requests()
                .iter()
                .filter(|t| t.split('?').next() == Some(path))
                .count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubServer;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn quick(max_retries: u32) -> HttpSettings {
        HttpSettings {
            timeout_ms: 5_000,
            max_retries,
            initial_backoff_ms: 20,
            max_backoff_ms: 1_000,
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct Pong {
        ok: bool,
    }

    #[test]
    fn test_get_json_sends_query_and_decodes() {
        let server = StubServer::start(|path| match path {
            "/ping" => (200, r#"{"ok": true}"#.to_string()),
            _ => (404, "null".to_string()),
        });
        let client = HttpClient::new(quick(0)).unwrap();

        let pong: Pong = client
            .get_json(&format!("{}/ping", server.base), &[("input", "New York")])
            .unwrap();

        assert!(pong.ok);
        assert_eq!(server.requests(), vec!["/ping?input=New+York".to_string()]);
    }

    #[test]
    fn test_client_error_is_not_retried() {
        let server = StubServer::start(|_| (404, "{}".to_string()));
        let client = HttpClient::new(quick(3)).unwrap();

        let err = client.get_json::<Pong>(&format!("{}/missing", server.base), &[]).unwrap_err();

        assert!(format!("{:#}", err).contains("404"));
        assert_eq!(server.hits("/missing"), 1);
    }

    #[test]
    fn test_server_error_retried_with_doubling_backoff() {
        let server = StubServer::start(|_| (503, "{}".to_string()));
        let client = HttpClient::new(quick(2)).unwrap();
        let start = Instant::now();

        let err = client.get_json::<Pong>(&format!("{}/busy", server.base), &[]).unwrap_err();

        assert!(format!("{:#}", err).contains("503"));
        assert_eq!(server.hits("/busy"), 3);
        // 20ms then 40ms between the three attempts
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_retry_recovers_after_server_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let server = StubServer::start(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                (500, "{}".to_string())
            } else {
                (200, r#"{"ok": true}"#.to_string())
            }
        });
        let client = HttpClient::new(quick(1)).unwrap();

        let pong: Pong = client.get_json(&format!("{}/flaky", server.base), &[]).unwrap();

        assert!(pong.ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bad_json_names_the_url() {
        let server = StubServer::start(|_| (200, "not json".to_string()));
        let client = HttpClient::new(quick(0)).unwrap();

        let err = client.get_json::<Pong>(&format!("{}/garbled", server.base), &[]).unwrap_err();

        assert!(format!("{:#}", err).contains("/garbled"));
    }

    #[test]
    fn test_first_call_never_waits() {
        let throttle = Throttle::from_millis(10_000);
        assert_eq!(throttle.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_wait_spaces_calls() {
        let mut throttle = Throttle::from_millis(30);
        let start = Instant::now();

        throttle.wait();
        throttle.wait();
        throttle.wait();

        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_unlimited_throttle() {
        let mut throttle = Throttle::unlimited();
        throttle.wait();
        assert_eq!(throttle.remaining(), Duration::ZERO);
        assert_eq!(throttle.interval(), Duration::ZERO);
    }

    #[test]
    fn test_http_settings_defaults_from_partial_json() {
        let settings: HttpSettings = serde_json::from_str(r#"{"max_retries": 2}"#).unwrap();
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.timeout_ms, 30_000);
    }
}
