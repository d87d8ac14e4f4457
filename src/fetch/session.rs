//! Subsidy API session

use crate::error::{Error, Result};
use reqwest::header::SET_COOKIE;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cookie session for the subsidy database API
///
/// Owned by the caller and passed to every subsidy request. The cookie is
/// re-acquired when the TTL runs out or after [`SubsidySession::invalidate`]
/// (the client calls it on a 401/403).
#[derive(Debug)]
pub struct SubsidySession {
    endpoint: String,
    ttl: Duration,
    cookie: Option<String>,
    acquired_at: Option<Instant>,
    acquisitions: u32,
}

impl SubsidySession {
    pub fn new(base_url: &str, ttl: Duration) -> Self {
        Self {
            endpoint: format!("{}/sesion", base_url.trim_end_matches('/')),
            ttl,
            cookie: None,
            acquired_at: None,
            acquisitions: 0,
        }
    }

    /// Whether a cookie is held and still within its lifetime
    pub fn is_valid(&self) -> bool {
        match (&self.cookie, self.acquired_at) {
            (Some(_), Some(at)) => at.elapsed() < self.ttl,
            _ => false,
        }
    }

    pub fn invalidate(&mut self) {
        debug!("Invalidating subsidy session");
        self.cookie = None;
        self.acquired_at = None;
    }

    /// Number of times a cookie has been obtained
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions
    }

    /// Current cookie header value, acquiring a new session when needed
    pub async fn cookie(&mut self, client: &Client) -> Result<String> {
        if self.is_valid() {
            if let Some(cookie) = &self.cookie {
                return Ok(cookie.clone());
            }
        }
        self.acquire(client).await
    }

    async fn acquire(&mut self, client: &Client) -> Result<String> {
        info!("Opening subsidy API session");
        let response = client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Session(format!(
                "HTTP {} from {}",
                status, self.endpoint
            )));
        }

        let pairs: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(|pair| pair.trim().to_string())
            .filter(|pair| pair.contains('='))
            .collect();

        if pairs.is_empty() {
            return Err(Error::Session("no session cookie returned".to_string()));
        }

        let cookie = pairs.join("; ");
        self.cookie = Some(cookie.clone());
        self.acquired_at = Some(Instant::now());
        self.acquisitions += 1;
        Ok(cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_cookie_is_reused_until_invalidated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sesion"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "SESSION=abc; Path=/; HttpOnly")
                    .append_header("set-cookie", "ROUTE=r1; Path=/"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = Client::new();
        let mut session = SubsidySession::new(&format!("{}/api/", server.uri()), Duration::from_secs(60));
        assert!(!session.is_valid());

        let cookie = session.cookie(&client).await.unwrap();
        assert_eq!(cookie, "SESSION=abc; ROUTE=r1");
        session.cookie(&client).await.unwrap();
        assert_eq!(session.acquisitions(), 1);

        session.invalidate();
        session.cookie(&client).await.unwrap();
        assert_eq!(session.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_reacquired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sesion"))
            .respond_with(ResponseTemplate::new(200).append_header("set-cookie", "SESSION=x"))
            .mount(&server)
            .await;

        let client = Client::new();
        let mut session = SubsidySession::new(&server.uri(), Duration::from_millis(0));
        session.cookie(&client).await.unwrap();
        assert!(!session.is_valid());
        session.cookie(&client).await.unwrap();
        assert_eq!(session.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_missing_cookie_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sesion"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut session = SubsidySession::new(&server.uri(), Duration::from_secs(60));
        let err = session.cookie(&Client::new()).await.unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }
}
