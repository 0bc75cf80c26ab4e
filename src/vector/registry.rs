use std::{ops::Deref, path::{Path, PathBuf}, sync::Arc};

use ahash::AHashMap;
use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use crate::{common, io};
use super::FeatureLayer;

/// All layers read from one file on disk.
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    layers: Vec<Arc<FeatureLayer>>,
}

impl Dataset {
    /// Wrap layers that were loaded elsewhere (e.g. by a host application).
    pub fn from_layers(path: &Path, layers: Vec<FeatureLayer>) -> Self {
        Self { path: path.to_path_buf(), layers: layers.into_iter().map(Arc::new).collect() }
    }

    /// Read every layer of a supported vector file (`.shp`, `.geojson`, `.json`).
    pub fn open(path: &Path) -> Result<Self> {
        common::require_file_exists(path)?;
        let extension = path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let layer = match extension.as_deref() {
            Some("shp") => common::read_shapefile_layer(path)?,
            Some("geojson") | Some("json") => io::read_geojson_layer(path)?,
            _ => bail!("Unsupported vector format: {}", path.display()),
        };
        Ok(Self::from_layers(path, vec![layer]))
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    #[inline] pub fn layer_count(&self) -> usize { self.layers.len() }

    /// Find a layer by name, or the first layer when no name is given.
    pub fn layer(&self, name: Option<&str>) -> Option<Arc<FeatureLayer>> {
        match name {
            Some(name) => self.layers.iter().find(|layer| layer.name() == name).cloned(),
            None => self.layers.first().cloned(),
        }
    }
}

/// An open layer, tied back to the dataset it came from.
/// Must be returned through [`DatasetRegistry::close_layer`].
#[derive(Debug)]
pub struct LayerHandle {
    path: PathBuf,
    layer: Arc<FeatureLayer>,
}

impl LayerHandle {
    #[inline] pub fn path(&self) -> &Path { &self.path }

    /// Shared reference to the layer that outlives the handle.
    #[inline] pub fn shared(&self) -> Arc<FeatureLayer> { Arc::clone(&self.layer) }
}

impl Deref for LayerHandle {
    type Target = FeatureLayer;

    fn deref(&self) -> &Self::Target { &self.layer }
}

#[derive(Debug)]
struct RegistryEntry {
    dataset: Dataset,
    open_layers: usize,
}

/// Tracks open datasets by path with a count of layers handed out per file.
///
/// Several layers of one file share a single loaded dataset; the dataset is
/// dropped as soon as its last layer is closed.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    entries: AHashMap<PathBuf, RegistryEntry>,
}

impl DatasetRegistry {
    pub fn new() -> Self { Self::default() }

    /// Number of datasets currently held.
    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Whether the dataset at `path` is held by the registry.
    #[inline] pub fn is_open(&self, path: &Path) -> bool { self.entries.contains_key(path) }

    /// Number of layers currently handed out for `path`.
    pub fn open_count(&self, path: &Path) -> usize {
        self.entries.get(path).map_or(0, |entry| entry.open_layers)
    }

    /// Hand the registry a dataset that was loaded elsewhere.
    /// An existing entry for the same path is kept.
    pub fn register(&mut self, dataset: Dataset) {
        let path = dataset.path().to_path_buf();
        self.entries.entry(path).or_insert(RegistryEntry { dataset, open_layers: 0 });
    }

    /// Open a layer, loading its dataset on first use.
    pub fn open_layer(&mut self, path: &Path, layer: Option<&str>) -> Result<LayerHandle> {
        if !self.entries.contains_key(path) {
            let dataset = Dataset::open(path)
                .with_context(|| format!("Failed to open dataset {}", path.display()))?;
            debug!(path = %path.display(), layers = dataset.layer_count(), "opened dataset");
            self.entries.insert(path.to_path_buf(), RegistryEntry { dataset, open_layers: 0 });
        }

        let entry = self.entries.get_mut(path)
            .ok_or_else(|| anyhow!("Dataset vanished from registry: {}", path.display()))?;
        let found = entry.dataset.layer(layer)
            .ok_or_else(|| anyhow!("Layer {:?} not found in {}", layer.unwrap_or("<first>"), path.display()))?;

        entry.open_layers += 1;
        Ok(LayerHandle { path: path.to_path_buf(), layer: found })
    }

    /// Close a layer handle, dropping the dataset once no layers remain open.
    pub fn close_layer(&mut self, handle: LayerHandle) -> Result<()> {
        let entry = self.entries.get_mut(&handle.path)
            .ok_or_else(|| anyhow!("Closing layer of unknown dataset: {}", handle.path.display()))?;
        if entry.open_layers == 0 {
            bail!("Closing layer of dataset with no open layers: {}", handle.path.display());
        }

        entry.open_layers -= 1;
        if entry.open_layers == 0 {
            self.entries.remove(&handle.path);
            debug!(path = %handle.path.display(), "closed dataset");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{Geometry, Point};

    use super::*;
    use crate::vector::Feature;

    fn gpkg_like() -> Dataset {
        Dataset::from_layers(Path::new("outputs/riverscapes.gpkg"), vec![
            FeatureLayer::new("igos", None, vec![Feature::new(1, Some(Geometry::Point(Point::new(0.0, 0.0))))]),
            FeatureLayer::new("dgos", None, vec![]),
        ])
    }

    #[test]
    fn layers_share_one_dataset() {
        let mut registry = DatasetRegistry::new();
        registry.register(gpkg_like());
        let path = Path::new("outputs/riverscapes.gpkg");

        let igos = registry.open_layer(path, Some("igos")).unwrap();
        let dgos = registry.open_layer(path, Some("dgos")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.open_count(path), 2);
        assert_eq!(igos.len(), 1);
        assert!(dgos.is_empty());

        registry.close_layer(igos).unwrap();
        assert!(registry.is_open(path));
        registry.close_layer(dgos).unwrap();
        assert!(!registry.is_open(path));
    }

    #[test]
    fn shared_layer_outlives_handle() {
        let mut registry = DatasetRegistry::new();
        registry.register(gpkg_like());
        let path = Path::new("outputs/riverscapes.gpkg");

        let handle = registry.open_layer(path, None).unwrap();
        let shared = handle.shared();
        registry.close_layer(handle).unwrap();
        assert_eq!(shared.name(), "igos");
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_layer_is_an_error() {
        let mut registry = DatasetRegistry::new();
        registry.register(gpkg_like());
        assert!(registry.open_layer(Path::new("outputs/riverscapes.gpkg"), Some("roads")).is_err());
        assert_eq!(registry.open_count(Path::new("outputs/riverscapes.gpkg")), 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut registry = DatasetRegistry::new();
        assert!(registry.open_layer(Path::new("does/not/exist.shp"), None).is_err());
        assert!(registry.is_empty());
    }
}
