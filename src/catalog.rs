//! Catalog IO: loading the layer catalog the pipeline consumes and
//! scanning a layers directory tree into one.
//!
//! Scanner conventions, per directory level under the layers root:
//! network dirs, then `NN-Name` layer dirs (NN = composite order, a
//! leading `_` on Name hides the layer), then `Value#Weight.png`
//! attribute files (weight falls back to the configured default, a
//! leading `_` hides the attribute from metadata). Entries are walked
//! in lexicographic filename order so the emitted catalog is identical
//! across platforms. Exclusion lists are hand-maintained in the
//! emitted JSON; scanning never writes them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    error::{EngineError, EngineResult},
    model::{Attribute, Catalog, Layer},
};

/// Read and validate a catalog file.
pub fn load_catalog(path: impl AsRef<Path>) -> EngineResult<Catalog> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| EngineError::catalog(format!("reading catalog {}: {e}", path.display())))?;
    let catalog: Catalog = serde_json::from_slice(&bytes)
        .map_err(|e| EngineError::catalog(format!("parsing catalog {}: {e}", path.display())))?;
    crate::model::validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Serialize a catalog as pretty JSON.
pub fn write_catalog(catalog: &Catalog, path: impl AsRef<Path>) -> EngineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            EngineError::persist(format!("creating {}: {e}", parent.display()))
        })?;
    }
    let json = serde_json::to_string_pretty(catalog).context("serializing catalog")?;
    fs::write(path, json)
        .map_err(|e| EngineError::persist(format!("writing catalog {}: {e}", path.display())))?;
    Ok(())
}

/// Walk a layers directory tree into a catalog. Attribute ids are
/// assigned 1..N in scan order across the whole tree.
pub fn scan_layers(layers_root: impl AsRef<Path>, default_weight: u32) -> EngineResult<Catalog> {
    let layers_root = layers_root.as_ref();
    if !layers_root.is_dir() {
        return Err(EngineError::catalog(format!(
            "layers directory {} is missing",
            layers_root.display()
        )));
    }

    let mut catalog = Catalog::new();
    let mut next_id = 0u32;
    for network_path in sorted_entries(layers_root)? {
        if !network_path.is_dir() {
            continue;
        }
        let Some(network) = network_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let mut layers: Vec<Layer> = Vec::new();
        for trait_path in sorted_entries(&network_path)? {
            if !trait_path.is_dir() {
                continue;
            }
            let Some(dir_name) = trait_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((order, raw_name)) = dir_name.split_once('-') else {
                continue;
            };
            let Ok(order) = order.parse::<u32>() else {
                continue;
            };
            let visible = !raw_name.starts_with('_');
            let name = raw_name.strip_prefix('_').unwrap_or(raw_name).to_string();

            let mut attributes: Vec<Attribute> = Vec::new();
            for file_path in sorted_entries(&trait_path)? {
                if !file_path.is_file()
                    || file_path.extension().and_then(|e| e.to_str()) != Some("png")
                {
                    continue;
                }
                let (Some(file_name), Some(stem)) = (
                    file_path.file_name().and_then(|n| n.to_str()),
                    file_path.file_stem().and_then(|s| s.to_str()),
                ) else {
                    continue;
                };

                let (raw_value, weight) = match stem.split_once('#') {
                    Some((value, suffix)) => {
                        let weight = suffix.parse::<u32>().map_err(|_| {
                            EngineError::catalog(format!(
                                "attribute file {} has a malformed weight suffix",
                                file_path.display()
                            ))
                        })?;
                        (value, weight)
                    }
                    None => (stem, default_weight),
                };
                let visible = !raw_value.starts_with('_');
                let value = raw_value.strip_prefix('_').unwrap_or(raw_value).to_string();

                next_id += 1;
                attributes.push(Attribute {
                    id: next_id,
                    value,
                    visible,
                    weight,
                    path: format!("{dir_name}/{file_name}"),
                    blend: None,
                    opacity: None,
                    excludes: vec![],
                });
            }

            if attributes.is_empty() {
                tracing::warn!(layer = dir_name, "layer directory has no attribute files, skipping");
                continue;
            }
            layers.push(Layer {
                name,
                order,
                visible,
                blend: None,
                opacity: None,
                attributes,
            });
        }

        if layers.is_empty() {
            tracing::warn!(network, "network directory has no layer directories, skipping");
            continue;
        }
        layers.sort_by_key(|l| l.order);
        catalog.insert(network.to_string(), layers);
    }
    Ok(catalog)
}

fn sorted_entries(dir: &Path) -> EngineResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)
        .map_err(|e| EngineError::catalog(format!("reading directory {}: {e}", dir.display())))?
    {
        let entry = entry
            .map_err(|e| EngineError::catalog(format!("reading directory {}: {e}", dir.display())))?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}
