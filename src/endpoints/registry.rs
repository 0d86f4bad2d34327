//! Ordered backend candidate list.
//!
//! # Responsibilities
//! - Compute candidate base URLs from the execution context
//! - Classify each candidate by where it lives
//! - Join operation paths onto a base URL
//!
//! # Design Decisions
//! - Pure function of context and settings, never fails
//! - Order encodes probe priority; duplicates keep their first position
//! - Relative candidates resolve against the origin when one is known

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::EndpointsConfig;
use crate::endpoints::context::ExecutionContext;

/// Same-origin relative API path, always present.
pub const RELATIVE_API: &str = "/api";

/// Where a candidate lives relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OriginKind {
    Local,
    NetworkIp,
    Production,
}

/// One base URL the client may reach the backend through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointCandidate {
    pub url: String,
    pub origin_kind: OriginKind,
}

impl EndpointCandidate {
    pub fn new(url: impl Into<String>, origin_kind: OriginKind) -> Self {
        Self {
            url: url.into(),
            origin_kind,
        }
    }

    /// Full URL for an API path on this candidate.
    pub fn api_url(&self, path: &str) -> String {
        api_url(&self.url, path)
    }
}

impl fmt::Display for EndpointCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Append an API path to a base URL, inserting `/api` unless the base already ends in it.
pub fn api_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = if path.starts_with('/') || path.is_empty() {
        path.to_string()
    } else {
        format!("/{path}")
    };

    if base.ends_with(RELATIVE_API) {
        format!("{base}{path}")
    } else {
        format!("{base}{RELATIVE_API}{path}")
    }
}

/// Builds the candidate list for a context.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    settings: EndpointsConfig,
}

impl EndpointRegistry {
    pub fn new(settings: EndpointsConfig) -> Self {
        Self { settings }
    }

    /// Ordered candidates for the given context.
    pub fn candidates(&self, context: &ExecutionContext) -> Vec<EndpointCandidate> {
        let raw: Vec<(String, OriginKind)> = if !self.settings.candidates.is_empty() {
            self.settings
                .candidates
                .iter()
                .map(|url| (url.clone(), classify(url, context)))
                .collect()
        } else if context.is_local() {
            self.local_candidates(context)
        } else {
            self.production_candidates(context)
        };

        let mut out: Vec<EndpointCandidate> = Vec::with_capacity(raw.len());
        for (url, kind) in raw {
            let url = resolve(&url, context);
            if out.iter().any(|c| c.url == url) {
                continue;
            }
            out.push(EndpointCandidate::new(url, kind));
        }

        if out.is_empty() {
            out.push(EndpointCandidate::new(
                resolve(RELATIVE_API, context),
                OriginKind::Production,
            ));
        }
        out
    }

    fn local_candidates(&self, context: &ExecutionContext) -> Vec<(String, OriginKind)> {
        let s = &self.settings;
        let mut urls = vec![
            (format!("http://localhost:{}", s.local_port), OriginKind::Local),
            (format!("http://127.0.0.1:{}", s.local_port), OriginKind::Local),
        ];
        if !s.network_ip.is_empty() {
            urls.push((
                format!("http://{}:{}", s.network_ip, s.local_port),
                OriginKind::NetworkIp,
            ));
        }
        urls.extend([
            (format!("https://localhost:{}", s.local_port), OriginKind::Local),
            (format!("http://localhost:{}", s.alternate_port), OriginKind::Local),
            (format!("http://localhost:{}/api", s.dev_server_port), OriginKind::Local),
            (RELATIVE_API.to_string(), OriginKind::Local),
        ]);
        if let Some(origin) = &context.origin {
            urls.push((format!("{origin}{RELATIVE_API}"), OriginKind::Local));
        }
        urls
    }

    fn production_candidates(&self, context: &ExecutionContext) -> Vec<(String, OriginKind)> {
        let mut urls = Vec::new();
        if let Some(origin) = &context.origin {
            urls.push((format!("{origin}{RELATIVE_API}"), OriginKind::Production));
        }
        urls.push((RELATIVE_API.to_string(), OriginKind::Production));
        if !self.settings.production_api_url.is_empty() {
            urls.push((self.settings.production_api_url.clone(), OriginKind::Production));
        }
        urls
    }
}

fn resolve(url: &str, context: &ExecutionContext) -> String {
    match (&context.origin, url.starts_with('/')) {
        (Some(origin), true) => format!("{origin}{url}"),
        _ => url.trim_end_matches('/').to_string(),
    }
}

fn classify(url: &str, context: &ExecutionContext) -> OriginKind {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_matches(['[', ']']).to_string()));

    let Some(host) = host else {
        return if context.is_local() {
            OriginKind::Local
        } else {
            OriginKind::Production
        };
    };

    if host == "localhost" {
        return OriginKind::Local;
    }
    match host.parse::<IpAddr>() {
        Ok(ip) if ip.is_loopback() => OriginKind::Local,
        Ok(IpAddr::V4(v4)) if v4.is_private() || v4.is_link_local() => OriginKind::NetworkIp,
        _ => OriginKind::Production,
    }
}
