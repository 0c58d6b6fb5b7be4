//! Spot records and the provider that loads them once per session.

pub mod category;
pub mod geojson;
pub mod manifest;
pub mod provider;
pub mod spot;

pub use category::*;
pub use manifest::*;
pub use provider::*;
pub use spot::*;

#[derive(Debug)]
pub enum CatalogError {
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Format(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            CatalogError::Json(e) => write!(f, "invalid JSON: {e}"),
            CatalogError::Format(msg) => write!(f, "unexpected spot data: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            CatalogError::Json(e) => Some(e),
            CatalogError::Format(_) => None,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e)
    }
}

/// Content fingerprint of a loaded dataset (hex blake3 over the raw inputs).
pub fn fingerprint<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::fingerprint;

    #[test]
    fn fingerprint_depends_on_every_part() {
        let a = fingerprint([b"virac".as_slice(), b"bato".as_slice()]);
        let b = fingerprint([b"virac".as_slice(), b"baras".as_slice()]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint([b"virac".as_slice(), b"bato".as_slice()]));
    }
}
