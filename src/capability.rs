//! Static RPC capability registry.
//!
//! Which vendors serve the txpool and debug namespaces is operational
//! knowledge, not something worth re-deriving with failed calls. The
//! orchestrator consults this table before attempting the privileged
//! path; unknown endpoints are probed optimistically at runtime.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderCapabilities {
    pub supports_status: bool,
    pub supports_content: bool,
    pub supports_inspect: bool,
    pub supports_trace: bool,
    pub guidance: &'static str,
}

const UNKNOWN_PROVIDER: ProviderCapabilities = ProviderCapabilities {
    supports_status: true,
    supports_content: true,
    supports_inspect: true,
    supports_trace: true,
    guidance: "Unknown endpoint; txpool support is probed at runtime and \
               unsupported methods fall back to recent-block scanning",
};

static REGISTRY: Lazy<HashMap<&'static str, ProviderCapabilities>> = Lazy::new(|| {
    HashMap::from([
        (
            "gcp",
            ProviderCapabilities {
                supports_status: true,
                supports_content: true,
                supports_inspect: true,
                supports_trace: true,
                guidance: "GCP Blockchain RPC serves the full txpool and debug \
                           namespaces on archive endpoints",
            },
        ),
        (
            "geth",
            ProviderCapabilities {
                supports_status: true,
                supports_content: true,
                supports_inspect: true,
                supports_trace: true,
                guidance: "Local geth nodes expose txpool_* when the txpool \
                           namespace is enabled (--http.api txpool,debug)",
            },
        ),
        (
            "erigon",
            ProviderCapabilities {
                supports_status: true,
                supports_content: true,
                supports_inspect: true,
                supports_trace: true,
                guidance: "Erigon serves txpool_* and debug_traceTransaction by default",
            },
        ),
        (
            "alchemy",
            ProviderCapabilities {
                supports_status: false,
                supports_content: false,
                supports_inspect: false,
                supports_trace: true,
                guidance: "Alchemy does not serve txpool_*; pool analysis falls \
                           back to recent-block scanning",
            },
        ),
        (
            "infura",
            ProviderCapabilities {
                supports_status: false,
                supports_content: false,
                supports_inspect: false,
                supports_trace: false,
                guidance: "Infura rejects txpool_* and debug_*; only the \
                           block-based fallback is available",
            },
        ),
        (
            "quicknode",
            ProviderCapabilities {
                supports_status: true,
                supports_content: true,
                supports_inspect: true,
                supports_trace: true,
                guidance: "QuickNode enables txpool_* on dedicated endpoints; \
                           shared endpoints may rate-limit heavy txpool_content calls",
            },
        ),
    ])
});

pub fn capabilities_for(provider: &str) -> ProviderCapabilities {
    REGISTRY.get(provider).copied().unwrap_or(UNKNOWN_PROVIDER)
}
