use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use serde::Serialize;

// The publisher blocks non-browser user agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36";

/// Linear backoff: attempt `k` sleeps `backoff_step * k` after failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Shared blocking HTTP client. Fetch helpers return `None` once retries are
/// exhausted or the server answers with anything but 200; callers skip the
/// item in that case.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn get(&self, url: &str) -> Option<Response> {
        self.send_with_retry(url, || self.client.get(url))
    }

    /// Returns the final URL after redirects with the response body.
    pub fn get_text(&self, url: &str) -> Option<(String, String)> {
        let response = self.get(url)?;
        let final_url = response.url().to_string();
        match response.text() {
            Ok(text) => {
                tracing::debug!(url, "downloaded page");
                Some((final_url, text))
            }
            Err(err) => {
                tracing::error!(url, %err, "read response body");
                None
            }
        }
    }

    /// Streams `url` into `dest`. `Ok(false)` means the fetch failed and the
    /// item should be skipped; an existing `dest` is never re-fetched.
    pub fn download(&self, url: &str, dest: &Path) -> anyhow::Result<bool> {
        if dest.exists() {
            tracing::debug!(dest = %dest.display(), "already downloaded");
            return Ok(true);
        }
        let Some(mut response) = self.get(url) else {
            return Ok(false);
        };

        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create download dir: {}", parent.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in: {}", parent.display()))?;
        response
            .copy_to(&mut tmp)
            .with_context(|| format!("GET {url}"))?;
        tmp.persist(dest)
            .with_context(|| format!("persist download: {}", dest.display()))?;

        tracing::info!(url, dest = %dest.display(), "downloaded");
        Ok(true)
    }

    pub fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &T,
    ) -> Option<Response> {
        self.send_with_retry(url, || {
            self.client
                .post(url)
                .bearer_auth(token)
                .header(ACCEPT, "application/json")
                .json(body)
        })
    }

    fn send_with_retry(&self, url: &str, build: impl Fn() -> RequestBuilder) -> Option<Response> {
        let mut attempt = 0_u32;
        let response = loop {
            match build().send() {
                Ok(response) => break response,
                Err(err) if err.is_connect() || err.is_timeout() => {
                    attempt += 1;
                    tracing::warn!(
                        url,
                        %err,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "connection error; retrying"
                    );
                    std::thread::sleep(self.policy.delay_for(attempt));
                    if attempt >= self.policy.max_attempts {
                        tracing::error!(url, "failed to retrieve");
                        return None;
                    }
                }
                Err(err) => {
                    tracing::error!(url, %err, "request failed");
                    return None;
                }
            }
        };

        if response.status() != StatusCode::OK {
            tracing::error!(url, status = %response.status(), "unexpected status");
            return None;
        }
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
    }

    #[test]
    fn unreachable_host_gives_up_after_max_attempts() -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let policy = RetryPolicy {
            max_attempts: 2,
            backoff_step: Duration::from_millis(1),
        };
        let client = HttpClient::new(policy, Duration::from_secs(2))?;
        assert!(client.get(&format!("http://{addr}/")).is_none());
        Ok(())
    }

    #[test]
    fn download_skips_existing_file() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dest = temp.path().join("lesson.zip");
        std::fs::write(&dest, b"cached")?;

        let client = HttpClient::new(RetryPolicy::default(), Duration::from_secs(1))?;
        assert!(client.download("http://127.0.0.1:9/never", &dest)?);
        assert_eq!(std::fs::read(&dest)?, b"cached");
        Ok(())
    }
}
