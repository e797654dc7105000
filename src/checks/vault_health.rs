//! Vault health endpoint probe.
//!
//! Vault behind the load balancer serves a self-signed certificate, so the
//! probe accepts any certificate and instead records the peer certificate's
//! subject alternative names for the caller to assert on.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use x509_parser::prelude::*;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("health request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {url} carried no peer certificate")]
    NoPeerCertificate { url: String },

    #[error("invalid peer certificate: {0}")]
    Certificate(String),
}

/// One answer of `/v1/sys/health`.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultHealth {
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string when it is not JSON.
    pub body: Value,
    pub subject_alt_names: Vec<String>,
}

impl VaultHealth {
    pub fn initialized(&self) -> Option<bool> {
        self.body.get("initialized").and_then(Value::as_bool)
    }

    pub fn has_subject_alt_name(&self, name: &str) -> bool {
        self.subject_alt_names.iter().any(|san| san == name)
    }
}

/// Fetches Vault health from a host.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> Result<VaultHealth, HealthError>;
}

/// HTTPS health probe.
#[derive(Debug, Clone)]
pub struct VaultHealthClient {
    client: reqwest::Client,
}

impl VaultHealthClient {
    pub fn new(timeout: Duration) -> Result<Self, HealthError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .tls_info(true)
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(HealthError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for VaultHealthClient {
    async fn probe(&self, host: &str, port: u16) -> Result<VaultHealth, HealthError> {
        let url = format!("https://{host}:{port}/v1/sys/health");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| HealthError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let peer_certificate = response
            .extensions()
            .get::<reqwest::tls::TlsInfo>()
            .and_then(|info| info.peer_certificate())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| HealthError::NoPeerCertificate { url: url.clone() })?;
        let subject_alt_names = subject_alt_names(&peer_certificate)?;

        let text = response
            .text()
            .await
            .map_err(|source| HealthError::Request {
                url: url.clone(),
                source,
            })?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        tracing::debug!(
            url = %url,
            status = status,
            sans = ?subject_alt_names,
            "Vault health response"
        );

        Ok(VaultHealth {
            status,
            body,
            subject_alt_names,
        })
    }
}

/// Subject alternative names of a DER certificate, rendered as text.
///
/// DNS names, URIs and e-mail addresses are returned as-is, IP addresses in
/// their canonical textual form. Other name types are skipped.
pub fn subject_alt_names(der: &[u8]) -> Result<Vec<String>, HealthError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| HealthError::Certificate(e.to_string()))?;
    let san = cert
        .subject_alternative_name()
        .map_err(|e| HealthError::Certificate(e.to_string()))?;

    Ok(san
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(general_name_text)
                .collect()
        })
        .unwrap_or_default())
}

fn general_name_text(name: &GeneralName<'_>) -> Option<String> {
    match name {
        GeneralName::DNSName(dns) => Some(dns.to_string()),
        GeneralName::URI(uri) => Some(uri.to_string()),
        GeneralName::RFC822Name(email) => Some(email.to_string()),
        GeneralName::IPAddress(bytes) => ip_from_bytes(bytes).map(|ip| ip.to_string()),
        _ => None,
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}
