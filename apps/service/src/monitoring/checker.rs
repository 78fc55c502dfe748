use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rand::random;
use serde::{Deserialize, Serialize};
use serde_json::json;
use surge_ping::{Config as PingConfig, ICMP, PingIdentifier, PingSequence};

use super::types::ProbeOutcome;

/// User agent sent with every HTTP probe.
const USER_AGENT: &str = "ServiceMonitor/1.0";

/// Redirects followed before an HTTP probe gives up.
const MAX_REDIRECTS: usize = 10;

/// Payload carried by ICMP echo requests.
const ECHO_PAYLOAD: [u8; 32] = [0u8; 32];

/// Kind of probe a service is checked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Ping,
    Http,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "ping",
            ProbeKind::Http => "http",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProbeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ping" => Ok(ProbeKind::Ping),
            "http" => Ok(ProbeKind::Http),
            other => Err(anyhow!("unknown probe kind: {other}")),
        }
    }
}

/// Probe strategy: test one target and report what happened.
///
/// Implementations must not error out. Timeouts, refused connections,
/// resolution failures and bad responses all collapse into a down
/// [`ProbeOutcome`] carrying the cause in its detail.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn probe(&self, target: &str) -> ProbeOutcome;
}

/// ICMP echo checker.
pub struct PingChecker {
    timeout: Duration,
}

impl PingChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn echo(&self, target: &str) -> Result<Duration> {
        let addr = resolve(target).await?;
        let config = match addr {
            IpAddr::V4(_) => PingConfig::default(),
            IpAddr::V6(_) => PingConfig::builder().kind(ICMP::V6).build(),
        };

        let client = surge_ping::Client::new(&config).context("failed to open ICMP socket")?;
        let mut pinger = client.pinger(addr, PingIdentifier(random())).await;
        pinger.timeout(self.timeout);

        let (_reply, rtt) = pinger
            .ping(PingSequence(0), &ECHO_PAYLOAD)
            .await
            .map_err(|e| anyhow!("no echo reply from {target}: {e}"))?;

        Ok(rtt)
    }
}

#[async_trait]
impl Checker for PingChecker {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        match self.echo(target).await {
            Ok(rtt) => ProbeOutcome::up(rtt.as_millis() as u64, json!({ "method": "ping" })),
            Err(e) => {
                ProbeOutcome::down(json!({ "method": "ping", "error": format!("{e:#}") }))
            }
        }
    }
}

/// Resolve a hostname or address literal to the first address it maps to.
async fn resolve(target: &str) -> Result<IpAddr> {
    if let Ok(addr) = target.parse::<IpAddr>() {
        return Ok(addr);
    }

    tokio::net::lookup_host((target, 0))
        .await
        .with_context(|| format!("failed to resolve {target}"))?
        .next()
        .map(|sock| sock.ip())
        .ok_or_else(|| anyhow!("no addresses for {target}"))
}

/// HTTP GET checker.
///
/// Follows redirects (counted in the outcome detail) and treats any final
/// status in [200, 400) as reachable. With `accept_invalid_certs` the peer
/// certificate is not validated; this mirrors the monitor's historical
/// behavior and is a deliberate security trade-off, configurable in
/// `[monitor]` settings.
pub struct HttpChecker {
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl HttpChecker {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Self {
        Self { timeout, accept_invalid_certs }
    }

    async fn request(&self, target: &str) -> Result<ProbeOutcome> {
        // The redirect policy is the only hook that sees intermediate hops,
        // so the client is built per probe around a shared counter.
        let redirects = Arc::new(AtomicUsize::new(0));
        let seen = redirects.clone();

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::custom(move |attempt| {
                let followed = attempt.previous().len();
                seen.store(followed, Ordering::Relaxed);
                if followed > MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else {
                    attempt.follow()
                }
            }))
            .build()?;

        let start = Instant::now();
        let response = client.get(target).send().await?;
        let elapsed = start.elapsed().as_millis() as u64;

        let status = response.status();
        let detail = json!({
            "status_code": status.as_u16(),
            "redirect_count": redirects.load(Ordering::Relaxed),
            "final_url": response.url().as_str(),
            "response_time_ms": elapsed,
        });

        if status.is_success() || status.is_redirection() {
            Ok(ProbeOutcome::up(elapsed, detail))
        } else {
            Ok(ProbeOutcome::down_with_latency(elapsed, detail))
        }
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        match self.request(target).await {
            Ok(outcome) => outcome,
            Err(e) => ProbeOutcome::down(json!({ "error": format!("{e:#}") })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::ServiceStatus;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_request(sock: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if n == 0 || buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Minimal HTTP fixture answering by request path.
    async fn spawn_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let request = read_request(&mut sock).await;
                    let response = if request.starts_with("GET /redirect") {
                        "HTTP/1.1 302 Found\r\nlocation: /ok\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    } else if request.starts_with("GET /broken") {
                        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    } else {
                        "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
                    };
                    let _ = sock.write_all(response.as_bytes()).await;
                    let _ = sock.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn http_probe_reports_success() {
        let addr = spawn_server().await;
        let checker = HttpChecker::new(Duration::from_secs(5), false);

        let outcome = checker.probe(&format!("http://{addr}/ok")).await;

        assert_eq!(outcome.status, ServiceStatus::Up);
        assert!(outcome.latency_ms.is_some());
        assert_eq!(outcome.detail["status_code"], 200);
        assert_eq!(outcome.detail["redirect_count"], 0);
    }

    #[tokio::test]
    async fn http_probe_counts_redirects() {
        let addr = spawn_server().await;
        let checker = HttpChecker::new(Duration::from_secs(5), false);

        let outcome = checker.probe(&format!("http://{addr}/redirect")).await;

        assert_eq!(outcome.status, ServiceStatus::Up);
        assert_eq!(outcome.detail["status_code"], 200);
        assert_eq!(outcome.detail["redirect_count"], 1);
        assert!(outcome.detail["final_url"].as_str().unwrap().ends_with("/ok"));
    }

    #[tokio::test]
    async fn http_probe_marks_server_errors_down_with_latency() {
        let addr = spawn_server().await;
        let checker = HttpChecker::new(Duration::from_secs(5), false);

        let outcome = checker.probe(&format!("http://{addr}/broken")).await;

        assert_eq!(outcome.status, ServiceStatus::Down);
        assert!(outcome.latency_ms.is_some());
        assert_eq!(outcome.detail["status_code"], 500);
    }

    #[tokio::test]
    async fn http_probe_absorbs_connection_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let checker = HttpChecker::new(Duration::from_secs(2), false);
        let outcome = checker.probe(&format!("http://{addr}/")).await;

        assert_eq!(outcome.status, ServiceStatus::Down);
        assert!(outcome.latency_ms.is_none());
        assert!(outcome.detail["error"].is_string());
    }

    #[tokio::test]
    async fn ping_probe_absorbs_unreachable_targets() {
        let checker = PingChecker::new(Duration::from_millis(300));

        let outcome = checker.probe("203.0.113.1").await;

        assert_eq!(outcome.status, ServiceStatus::Down);
        assert!(outcome.latency_ms.is_none());
        assert_eq!(outcome.detail["method"], "ping");
    }

    #[test]
    fn probe_kind_round_trips() {
        assert_eq!("ping".parse::<ProbeKind>().unwrap(), ProbeKind::Ping);
        assert_eq!("http".parse::<ProbeKind>().unwrap(), ProbeKind::Http);
        assert!("tcp".parse::<ProbeKind>().is_err());
        assert_eq!(ProbeKind::Ping.as_str(), "ping");
    }
}
