//! Best-effort caller diagnostics attached to every resolution request.
//!
//! Everything here is advisory metadata for the metadata service's audit
//! and routing logs. Detection failures fall back to the `"unknown"`
//! sentinel; nothing in this module is allowed to fail an operation.

use std::collections::HashMap;
use std::net::UdpSocket;

use tracing::debug;

/// Sentinel for diagnostics that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Best-effort classification of the engine the client runs inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEngine {
    Notebook,
    Spark,
    ManagedPlatform,
    Unknown,
}

/// Caller identity and environment metadata, detected once per facade
/// instance rather than held in process-wide globals so that multiple
/// instances in one process stay independent.
#[derive(Debug, Clone)]
pub struct ClientDiagnostics {
    pub source_engine: SourceEngine,
    pub client_address: String,
    pub app_id: String,
    pub extra: HashMap<String, String>,
}

impl ClientDiagnostics {
    /// Detect diagnostics from the process environment.
    pub fn detect() -> Self {
        let source_engine = detect_source_engine();
        let client_address = local_address();
        let app_id = detect_app_id();
        let mut extra = platform_attributes();
        extra.insert(
            "CLIENT_VERSION".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        ClientDiagnostics {
            source_engine,
            client_address,
            app_id,
            extra,
        }
    }
}

fn detect_source_engine() -> SourceEngine {
    if std::env::var("NOTEBOOK_TASK").is_ok_and(|v| v == "true") {
        return SourceEngine::Notebook;
    }
    if std::env::var("SPARK_DIST_CLASSPATH").is_ok() {
        return SourceEngine::Spark;
    }
    if std::env::var("PLATFORM_JOB_ID").is_ok() {
        return SourceEngine::ManagedPlatform;
    }
    SourceEngine::Unknown
}

fn detect_app_id() -> String {
    std::env::var("APP_ID")
        .or_else(|_| std::env::var("PLATFORM_JOB_ID"))
        .unwrap_or_else(|_| UNKNOWN.to_string())
}

/// The address the host would use for outbound traffic. The socket is never
/// actually written to; connecting a UDP socket only selects a route.
fn local_address() -> String {
    let result = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string());
    match result {
        Ok(ip) => ip,
        Err(e) => {
            debug!("cannot determine local address: {e}");
            UNKNOWN.to_string()
        }
    }
}

fn platform_attributes() -> HashMap<String, String> {
    let mut extra = HashMap::new();
    for key in ["PLATFORM_JOB_ID", "PLATFORM_JOB_NAME", "PLATFORM_USER", "CLUSTER_NAME"] {
        if let Ok(value) = std::env::var(key) {
            extra.insert(key.to_string(), value);
        }
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_never_fails() {
        let diagnostics = ClientDiagnostics::detect();
        assert!(!diagnostics.client_address.is_empty());
        assert!(!diagnostics.app_id.is_empty());
        assert!(diagnostics.extra.contains_key("CLIENT_VERSION"));
    }
}
