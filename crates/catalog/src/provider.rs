//! The Spot Data Provider contract and its two implementations.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::{info, warn};

use crate::CatalogError;
use crate::geojson::parse_feature_collection;
use crate::manifest::ImageManifest;
use crate::spot::Spot;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything one session load delivers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotCollection {
    pub spots: Vec<Spot>,
    /// Content hash of the inputs, when the provider read any.
    pub fingerprint: Option<String>,
}

/// Supplies the immutable spot list once per session.
pub trait SpotProvider: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<SpotCollection, CatalogError>>;
}

/// Provider over records already in memory (tests, embedded datasets).
#[derive(Debug, Clone, Default)]
pub struct InMemorySpotProvider {
    spots: Vec<Spot>,
}

impl InMemorySpotProvider {
    pub fn new(spots: Vec<Spot>) -> Self {
        Self { spots }
    }
}

impl SpotProvider for InMemorySpotProvider {
    fn load(&self) -> BoxFuture<'_, Result<SpotCollection, CatalogError>> {
        Box::pin(async move {
            Ok(SpotCollection {
                spots: dedup_by_identity(self.spots.clone()),
                fingerprint: None,
            })
        })
    }
}

/// Reads one GeoJSON FeatureCollection per municipality from a directory,
/// plus an optional image manifest.
#[derive(Debug, Clone)]
pub struct GeoJsonSpotProvider {
    data_dir: PathBuf,
    manifest_path: Option<PathBuf>,
    image_base_url: String,
}

impl GeoJsonSpotProvider {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            manifest_path: None,
            image_base_url: String::new(),
        }
    }

    pub fn with_manifest(mut self, path: impl AsRef<Path>) -> Self {
        self.manifest_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_image_base_url(mut self, base: impl Into<String>) -> Self {
        self.image_base_url = base.into();
        self
    }

    async fn load_inner(&self) -> Result<SpotCollection, CatalogError> {
        let files = list_geojson_files(&self.data_dir).await?;
        let mut raw_inputs: Vec<Vec<u8>> = Vec::with_capacity(files.len() + 1);

        let manifest = match &self.manifest_path {
            Some(path) => {
                let bytes = read(path).await?;
                let manifest: ImageManifest = serde_json::from_slice(&bytes)?;
                raw_inputs.push(bytes);
                Some(manifest)
            }
            None => None,
        };

        let mut spots = Vec::new();
        for path in &files {
            let bytes = read(path).await?;
            let municipality = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_ascii_uppercase);
            let payload = std::str::from_utf8(&bytes).map_err(|e| {
                CatalogError::Format(format!("{} is not valid UTF-8: {e}", path.display()))
            })?;
            let parsed = parse_feature_collection(payload, municipality.as_deref())?;
            for (index, reason) in &parsed.rejected {
                warn!(file = %path.display(), index, "skipping feature: {reason}");
            }
            for mut spot in parsed.spots {
                if spot.images.is_empty()
                    && let (Some(manifest), Some(m)) = (&manifest, &municipality)
                {
                    spot.images = manifest.image_urls(m, spot.name(), &self.image_base_url);
                }
                spots.push(spot);
            }
            raw_inputs.push(bytes);
        }

        let spots = dedup_by_identity(spots);
        info!(
            dir = %self.data_dir.display(),
            files = files.len(),
            spots = spots.len(),
            "loaded spot data"
        );
        Ok(SpotCollection {
            spots,
            fingerprint: Some(crate::fingerprint(raw_inputs.iter().map(Vec::as_slice))),
        })
    }
}

impl SpotProvider for GeoJsonSpotProvider {
    fn load(&self) -> BoxFuture<'_, Result<SpotCollection, CatalogError>> {
        Box::pin(self.load_inner())
    }
}

async fn read(path: &Path) -> Result<Vec<u8>, CatalogError> {
    tokio::fs::read(path).await.map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn list_geojson_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("geojson") {
            files.push(path);
        }
    }
    // Directory order is platform-dependent; identity conflicts resolve by file name.
    files.sort();
    Ok(files)
}

/// Spot names are identities; the first record for a name wins.
fn dedup_by_identity(spots: Vec<Spot>) -> Vec<Spot> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(spots.len());
    for spot in spots {
        if seen.insert(spot.id.clone()) {
            out.push(spot);
        } else {
            warn!(spot = %spot.id, "duplicate spot name, keeping the first record");
        }
    }
    out
}
