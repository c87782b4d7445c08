use std::net::IpAddr;
use std::time::Instant;

use elemizer_core::error::AppError;
use elemizer_core::models::FetchResult;
use elemizer_core::traits::Fetcher;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use url::Url;

use crate::config::FetchConfig;

/// Hop limit when redirect following is enabled.
pub const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; Elemizer/0.1; +https://github.com/elemizer)";

/// HTTP fetcher using reqwest.
///
/// Performs one GET per call and measures the full request/response cycle.
/// Redirects are refused by default and surface as [`AppError::Redirected`].
/// When following is enabled, hops are followed here rather than by reqwest so
/// that every hop passes the same SSRF check as the first request.
/// SSRF protection is **enabled** by default: requests to private/reserved
/// IP ranges are blocked. Use [`allow_private_urls`](Self::allow_private_urls)
/// to disable this (e.g., for CLI usage where the user controls the machine).
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    follow_redirects: bool,
    ssrf_protection: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(&FetchConfig::default())
    }

    pub fn with_config(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
            follow_redirects: config.follow_redirects,
            ssrf_protection: !config.allow_private_urls,
        })
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    ///
    /// Only use this for CLI usage where the user controls the machine.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }

    fn map_send_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }

    /// Resolve a redirect target and run it through the SSRF guard.
    async fn next_hop(&self, from: &Url, location: &str) -> Result<Url, AppError> {
        let next = from
            .join(location)
            .map_err(|e| AppError::HttpError(format!("Invalid redirect target '{location}': {e}")))?;
        if self.ssrf_protection {
            validate_target(&next).await?;
        }
        Ok(next)
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, AppError> {
        let mut target =
            Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;
        if self.ssrf_protection {
            validate_target(&target).await?;
        }

        let started = Instant::now();
        let mut hops = 0;
        let response = loop {
            let response = self
                .client
                .get(target.clone())
                .header(ACCEPT, "text/html,application/xhtml+xml")
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            let status = response.status();
            tracing::debug!(url = %target, status = status.as_u16(), "Received response");
            if !status.is_redirection() {
                break response;
            }

            let domain = response.url().host_str().unwrap_or_default().to_string();
            let raw_location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let location = match raw_location {
                Some(location) if self.follow_redirects => location,
                _ => {
                    return Err(AppError::Redirected {
                        domain,
                        location: location_of(&response),
                    });
                }
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(AppError::NetworkError(format!(
                    "Too many redirects (more than {MAX_REDIRECTS})"
                )));
            }
            target = self.next_hop(response.url(), &location).await?;
            tracing::debug!(hop = hops, next = %target, "Following redirect");
        };

        let status = response.status();
        let domain_name = response.url().host_str().unwrap_or_default().to_string();
        if !status.is_success() {
            return Err(AppError::RemoteStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
                domain: domain_name,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })?;
        let total_duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        Ok(FetchResult {
            status_code: status.as_u16(),
            body,
            domain_name,
            total_duration_ms,
        })
    }
}

/// The redirect target, resolved against the response URL when relative.
fn location_of(response: &Response) -> Option<String> {
    let raw = response.headers().get(LOCATION)?.to_str().ok()?;
    match response.url().join(raw) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check a request target to prevent server-side request forgery (SSRF).
///
/// 1. Only allow `http` and `https` schemes.
/// 2. Resolve the hostname via DNS.
/// 3. Reject if any resolved IP is private/reserved.
async fn validate_target(parsed: &Url) -> Result<(), AppError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::HttpError(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    // IP literals are checked directly
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP"
            )));
        }
        return Ok(());
    }

    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for socket_addr in &addrs {
        if is_private_ip(socket_addr.ip()) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP {}",
                socket_addr.ip()
            )));
        }
    }

    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // includes cloud metadata 169.254.169.254
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || match v6.to_ipv4_mapped() {
                    Some(v4) => is_private_ip(IpAddr::V4(v4)),
                    None => false,
                }
        }
    }
}
