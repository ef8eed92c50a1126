//! Extra trust roots for TLS.

use reqwest::Certificate;
use std::path::Path;
use tracing::{debug, warn};

/// Load the certificates of a PEM bundle.
///
/// A bundle that is missing, unreadable, malformed or empty yields no
/// certificates and a warning; the client then relies on the system roots.
pub fn load_trust_store(path: &Path) -> Vec<Certificate> {
    let pem = match std::fs::read(path) {
        Ok(pem) => pem,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "CA bundle not readable, using system trust roots"
            );
            return Vec::new();
        }
    };

    match Certificate::from_pem_bundle(&pem) {
        Ok(certs) if certs.is_empty() => {
            warn!(
                path = %path.display(),
                "CA bundle contains no certificates, using system trust roots"
            );
            Vec::new()
        }
        Ok(certs) => {
            debug!(path = %path.display(), count = certs.len(), "Loaded CA bundle");
            certs
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "CA bundle could not be parsed, using system trust roots"
            );
            Vec::new()
        }
    }
}
