//! Thin REST client for the PowerDNS Authoritative API.
//!
//! Wraps a base URL, server id, and `reqwest::Client` carrying a sensitive
//! `X-API-Key` header, and covers the zone/rrset operations this operator
//! needs plus defensive name+type re-filtering for known backend quirks.

use reqwest::{header, StatusCode};

use super::error::{ApiErrorBody, PowerDnsError};
use super::types::{ChangeType, CreateZone, PatchRRsets, PatchZoneAttributes, RRSet, Server, Zone};

#[derive(Clone)]
pub struct Client {
    base_url: String,
    server_id: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: impl Into<String>, server_id: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            server_id: server_id.into(),
            http,
        }
    }

    /// Build the shared `reqwest::Client`, including the sensitive API-key
    /// header, from pieces already resolved by `crate::resolver`.
    pub fn build_http_client(
        api_key: &str,
        timeout: std::time::Duration,
        builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::Client, PowerDnsError> {
        let mut headers = header::HeaderMap::new();
        let mut key_value = header::HeaderValue::from_str(api_key)
            .map_err(|_| PowerDnsError::Api { status: 0, body: "invalid API key header value".into() })?;
        key_value.set_sensitive(true);
        headers.insert("X-API-Key", key_value);
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        builder
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(PowerDnsError::Transport)
    }

    fn zone_url(&self, zone_name: &str) -> String {
        format!("{}/api/v1/servers/{}/zones/{zone_name}", self.base_url, self.server_id)
    }

    pub async fn describe_server(&self) -> Result<Server, PowerDnsError> {
        let resp = self
            .http
            .get(format!("{}/api/v1/servers/{}", self.base_url, self.server_id))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Returns `Ok(None)` when the backend reports the zone does not exist.
    pub async fn get_zone(&self, zone_name: &str) -> Result<Option<Zone>, PowerDnsError> {
        let resp = self.http.get(self.zone_url(zone_name)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(resp).await.map(Some)
    }

    pub async fn create_zone(&self, zone: &CreateZone) -> Result<Zone, PowerDnsError> {
        let resp = self
            .http
            .post(format!("{}/api/v1/servers/{}/zones", self.base_url, self.server_id))
            .json(zone)
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn patch_zone_attributes(
        &self,
        zone_name: &str,
        patch: &PatchZoneAttributes,
    ) -> Result<(), PowerDnsError> {
        let resp = self.http.patch(self.zone_url(zone_name)).json(patch).send().await?;
        Self::expect_no_content(resp).await
    }

    pub async fn delete_zone(&self, zone_name: &str) -> Result<(), PowerDnsError> {
        let resp = self.http.delete(self.zone_url(zone_name)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_no_content(resp).await
    }

    /// Fetches every rrset of `zone_name` and defensively filters to the
    /// `(name, type)` pair requested, since the backend is known to leak
    /// unrelated records into this response on some versions.
    pub async fn get_rrset(
        &self,
        zone_name: &str,
        record_name: &str,
        record_type: &str,
    ) -> Result<Option<RRSet>, PowerDnsError> {
        let zone = match self.get_zone(zone_name).await? {
            Some(z) => z,
            None => return Ok(None),
        };
        Ok(zone
            .rrsets
            .unwrap_or_default()
            .into_iter()
            .find(|r| r.name == record_name && r.type_field == record_type))
    }

    /// Upserts a single rrset via a zone PATCH with `changetype=REPLACE`.
    pub async fn upsert_rrset(&self, zone_name: &str, mut rrset: RRSet) -> Result<(), PowerDnsError> {
        rrset.changetype = Some(ChangeType::Replace);
        let patch = PatchRRsets { rrsets: vec![rrset] };
        let resp = self.http.patch(self.zone_url(zone_name)).json(&patch).send().await?;
        Self::expect_no_content(resp).await
    }

    async fn expect_no_content(resp: reqwest::Response) -> Result<(), PowerDnsError> {
        match resp.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            status => Err(Self::error_body(status, resp).await),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, PowerDnsError> {
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await?;
            serde_json::from_slice(&bytes).map_err(PowerDnsError::Decode)
        } else {
            Err(Self::error_body(status, resp).await)
        }
    }

    async fn error_body(status: StatusCode, resp: reqwest::Response) -> PowerDnsError {
        let body = resp
            .json::<ApiErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| "<unreadable body>".into());
        PowerDnsError::Api { status: status.as_u16(), body }
    }
}

/// Canonicalizes a domain name the way the backend expects: lowercase,
/// public-suffix-validated, exactly one trailing dot. Built on the `addr`
/// crate's public-suffix-aware domain parser.
pub fn canonicalize_domain(domain: &str) -> Result<String, PowerDnsError> {
    let trimmed = domain.trim_end_matches('.');
    let parsed = addr::parse_domain_name(trimmed).map_err(|e| PowerDnsError::InvalidDomain {
        name: domain.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.root().is_none() {
        return Err(PowerDnsError::InvalidDomain {
            name: domain.to_string(),
            reason: "not a registrable domain".into(),
        });
    }
    Ok(format!("{}.", parsed.as_str().to_ascii_lowercase()))
}

