use anyhow::{Result, anyhow};
use url::Url;

use crate::monitoring::checker::ProbeKind;

/// Validate a probe target for the given kind.
///
/// Runs on the administration path before a service is persisted; the
/// probes themselves absorb bad targets at check time.
pub fn validate_target(kind: ProbeKind, target: &str) -> Result<()> {
    match kind {
        ProbeKind::Http => validate_http_target(target),
        ProbeKind::Ping => validate_ping_target(target),
    }
}

fn validate_http_target(target: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(anyhow!("target cannot be empty"));
    }

    let url = Url::parse(target).map_err(|e| {
        if target.contains("://") {
            anyhow!("invalid URL: {e}")
        } else {
            anyhow!("URL must include scheme (http:// or https://)")
        }
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("invalid scheme '{other}': must be http or https")),
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host"));
    }

    Ok(())
}

fn validate_ping_target(target: &str) -> Result<()> {
    let target = target.trim();

    if target.is_empty() {
        return Err(anyhow!("target cannot be empty"));
    }
    if target.contains("://") || target.contains('/') {
        return Err(anyhow!("ping target must be a hostname or IP address, not a URL"));
    }
    if target.contains(char::is_whitespace) {
        return Err(anyhow!("ping target cannot contain whitespace"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_urls() {
        assert!(validate_target(ProbeKind::Http, "http://example.com/health").is_ok());
        assert!(validate_target(ProbeKind::Http, "https://example.com").is_ok());
    }

    #[test]
    fn rejects_http_targets_without_scheme_or_with_wrong_scheme() {
        assert!(validate_target(ProbeKind::Http, "example.com").is_err());
        assert!(validate_target(ProbeKind::Http, "ftp://example.com").is_err());
        assert!(validate_target(ProbeKind::Http, "").is_err());
    }

    #[test]
    fn accepts_ping_hosts_and_addresses() {
        assert!(validate_target(ProbeKind::Ping, "example.com").is_ok());
        assert!(validate_target(ProbeKind::Ping, "192.0.2.1").is_ok());
    }

    #[test]
    fn rejects_ping_urls_and_blanks() {
        assert!(validate_target(ProbeKind::Ping, "http://example.com").is_err());
        assert!(validate_target(ProbeKind::Ping, "host name").is_err());
        assert!(validate_target(ProbeKind::Ping, "  ").is_err());
    }
}
