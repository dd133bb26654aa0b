//! Built-in probes.
//!
//! This module provides probes for:
//! - **TCP**: a connection to an address can be opened
//! - **HTTP**: a GET request answers 200
//! - **DNS**: a host name resolves to at least one address
//! - **Database**: PostgreSQL answers `SELECT 1`
//! - **Tasks**: the tokio runtime is not running too many tasks
//! - **Memory**: peak resident memory stays under a threshold

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use super::probe::{Probe, ProbeContext, ProbeError};

// ═══════════════════════════════════════════════════════════════════════════════
// TCP Dial
// ═══════════════════════════════════════════════════════════════════════════════

/// Succeeds when a TCP connection to `addr` can be opened.
#[derive(Debug, Clone)]
pub struct TcpDialProbe {
    addr: String,
}

impl TcpDialProbe {
    /// `addr` is a `host:port` pair.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Probe for TcpDialProbe {
    async fn check(&self, _ctx: &ProbeContext) -> Result<(), ProbeError> {
        let stream = TcpStream::connect(&self.addr).await?;
        drop(stream);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP GET
// ═══════════════════════════════════════════════════════════════════════════════

/// Succeeds when a GET on `url` returns exactly 200. Redirects are not
/// followed.
#[derive(Debug, Clone)]
pub struct HttpGetProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpGetProbe {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built (TLS backend unavailable).
    pub fn new(url: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Use a custom HTTP client. Its redirect policy is used as is.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Probe for HttpGetProbe {
    async fn check(&self, ctx: &ProbeContext) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(ctx.remaining())
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ProbeError::new(format!("returned status {}", status.as_u16())));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DNS Resolve
// ═══════════════════════════════════════════════════════════════════════════════

/// Succeeds when `host` resolves to at least one address.
#[derive(Debug, Clone)]
pub struct DnsResolveProbe {
    host: String,
}

impl DnsResolveProbe {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

#[async_trait]
impl Probe for DnsResolveProbe {
    async fn check(&self, _ctx: &ProbeContext) -> Result<(), ProbeError> {
        // Port is irrelevant, lookup_host only needs one.
        let mut addrs = lookup_host((self.host.as_str(), 0)).await?;
        match addrs.next() {
            Some(addr) => {
                debug!(host = %self.host, addr = %addr.ip(), "Host resolved");
                Ok(())
            }
            None => Err(ProbeError::new("could not resolve host")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Database Ping
// ═══════════════════════════════════════════════════════════════════════════════

/// Succeeds when PostgreSQL answers `SELECT 1`.
#[derive(Debug, Clone)]
pub struct DatabasePingProbe {
    pool: Option<PgPool>,
}

impl DatabasePingProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// A probe with no pool. Always fails.
    pub fn unconfigured() -> Self {
        Self { pool: None }
    }
}

#[async_trait]
impl Probe for DatabasePingProbe {
    async fn check(&self, _ctx: &ProbeContext) -> Result<(), ProbeError> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| ProbeError::new("database is not configured"))?;

        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(pool)
            .await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runtime Task Count
// ═══════════════════════════════════════════════════════════════════════════════

/// Fails when the tokio runtime has more alive tasks than `threshold`, which
/// usually points at a task leak.
#[derive(Debug, Clone, Copy)]
pub struct TaskCountProbe {
    threshold: usize,
}

impl TaskCountProbe {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

#[async_trait]
impl Probe for TaskCountProbe {
    async fn check(&self, _ctx: &ProbeContext) -> Result<(), ProbeError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ProbeError::new(format!("no tokio runtime: {}", e)))?;
        let count = handle.metrics().num_alive_tasks();

        if count > self.threshold {
            return Err(ProbeError::new(format!(
                "too many tasks ({} > {})",
                count, self.threshold
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Peak Resident Memory
// ═══════════════════════════════════════════════════════════════════════════════

/// Fails when the process's peak resident set size exceeds `threshold_bytes`.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct MaxRssProbe {
    threshold_bytes: u64,
}

#[cfg(unix)]
impl MaxRssProbe {
    pub fn new(threshold_bytes: u64) -> Self {
        Self { threshold_bytes }
    }
}

#[cfg(unix)]
#[async_trait]
impl Probe for MaxRssProbe {
    async fn check(&self, _ctx: &ProbeContext) -> Result<(), ProbeError> {
        let peak = peak_rss_bytes()?;
        if peak > self.threshold_bytes {
            return Err(ProbeError::new(format!(
                "peak resident memory {} bytes > {} bytes",
                peak, self.threshold_bytes
            )));
        }
        Ok(())
    }
}

/// Peak resident set size of this process in bytes.
#[cfg(unix)]
pub fn peak_rss_bytes() -> std::io::Result<u64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage writes into the struct we own and reports failure via
    // its return value.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: initialized by the successful call above.
    let usage = unsafe { usage.assume_init() };
    let max_rss = u64::try_from(usage.ru_maxrss).unwrap_or(0);

    // macOS reports bytes, other unixes report kilobytes.
    if cfg!(target_os = "macos") {
        Ok(max_rss)
    } else {
        Ok(max_rss * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ProbeContext {
        ProbeContext::new(Instant::now() + Duration::from_secs(5), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_tcp_dial_succeeds_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpDialProbe::new(addr.to_string());
        assert!(probe.check(&ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_dial_fails_when_closed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpDialProbe::new(addr.to_string());
        assert!(probe.check(&ctx()).await.is_err());
    }

    #[tokio::test]
    async fn test_dns_resolves_localhost() {
        let probe = DnsResolveProbe::new("localhost");
        assert!(probe.check(&ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_database_fails() {
        let err = DatabasePingProbe::unconfigured()
            .check(&ctx())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "database is not configured");
    }

    #[tokio::test]
    async fn test_task_count_threshold() {
        assert!(TaskCountProbe::new(10_000).check(&ctx()).await.is_ok());

        let _parked: Vec<_> = (0..4)
            .map(|_| tokio::spawn(std::future::pending::<()>()))
            .collect();
        let err = TaskCountProbe::new(1).check(&ctx()).await.unwrap_err();
        assert!(err.reason().starts_with("too many tasks"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_max_rss() {
        assert!(peak_rss_bytes().unwrap() > 0);
        assert!(MaxRssProbe::new(u64::MAX).check(&ctx()).await.is_ok());
        assert!(MaxRssProbe::new(1).check(&ctx()).await.is_err());
    }
}
