//! Batch orchestration: select until every series quota is met, then
//! shuffle, number, render and persist one item at a time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;

use crate::{
    assets::SourceImageCache,
    catalog,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    metadata::MetadataAssembler,
    model::Selection,
    render::render_selection,
    rng::Rng64,
    select::{ExistsSet, Selector},
};

/// Totals reported by a finished build.
#[derive(Clone, Debug)]
pub struct BuildSummary {
    pub items: u64,
    pub series: u64,
    pub out_dir: PathBuf,
}

struct PendingItem {
    series: String,
    selection: Selection,
}

/// Run the whole batch under `root`.
///
/// Selection runs first across all series so the duplicate registry
/// spans the entire batch; nothing is written until every quota is met.
/// Items render strictly one after another. Any error aborts the build;
/// output already written stays on disk.
#[tracing::instrument(skip_all)]
pub fn run_build(config: &EngineConfig, root: impl AsRef<Path>) -> EngineResult<BuildSummary> {
    config.validate()?;
    let root = root.as_ref();

    let selector = Selector::new(config);
    let mut rng = Rng64::new(config.seed);
    let mut exists = ExistsSet::new();
    let mut items: Vec<PendingItem> = Vec::new();
    for spec in &config.series {
        let catalog_path = root
            .join(&config.paths.config)
            .join(format!("{}.json", spec.catalog));
        let catalog = catalog::load_catalog(&catalog_path)?;
        let layers = catalog.get(&config.network).ok_or_else(|| {
            EngineError::catalog(format!(
                "catalog {} has no network '{}'",
                catalog_path.display(),
                config.network
            ))
        })?;
        let mut layers = layers.clone();
        layers.sort_by_key(|l| l.order);

        tracing::info!(series = %spec.series, quota = spec.quota, "selecting series");
        for _ in 0..spec.quota {
            let selection = selector.select_unique(&spec.catalog, &layers, &mut rng, &mut exists)?;
            items.push(PendingItem {
                series: spec.series.clone(),
                selection,
            });
            tracing::info!(added = items.len(), "accepted selection");
        }
    }

    if config.shuffle {
        rng.shuffle(&mut items);
    }

    let out_dir = root.join(&config.paths.build).join(&config.network);
    purge(&out_dir)?;

    let layers_root = root.join(&config.paths.layers).join(&config.network);
    let mut cache = SourceImageCache::new(layers_root, config.smoothing);
    let assembler = MetadataAssembler::new(&config.metadata_template)?;

    let mut aggregate = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let edition = config.start_edition + i as u32;
        let preview =
            render_selection(&item.selection, config.preview, &mut cache, config.cid_version)?;
        let full =
            render_selection(&item.selection, config.image, &mut cache, config.cid_version)?;
        let metadata = assembler.assemble(
            &item.series,
            edition,
            &preview.content_id,
            &full.content_id,
            &item.selection,
            epoch_millis(),
        );

        tracing::info!(edition, series = %item.series, dna = %full.content_id, "saving item");
        write_bytes(&out_dir.join(format!("preview/{edition}.png")), &preview.png)?;
        write_bytes(&out_dir.join(format!("image/{edition}.png")), &full.png)?;
        write_json(&out_dir.join(format!("json/{edition}.json")), &metadata)?;
        aggregate.push(metadata);
    }
    write_json(&out_dir.join("metadata.json"), &serde_json::Value::Array(aggregate))?;

    Ok(BuildSummary {
        items: items.len() as u64,
        series: config.series.len() as u64,
        out_dir,
    })
}

/// Recreate `build/<network>` with empty json/image/preview dirs,
/// dropping whatever a previous run left behind.
fn purge(out_dir: &Path) -> EngineResult<()> {
    if out_dir.exists() {
        fs::remove_dir_all(out_dir)
            .map_err(|e| EngineError::persist(format!("clearing {}: {e}", out_dir.display())))?;
    }
    for sub in ["json", "image", "preview"] {
        let dir = out_dir.join(sub);
        fs::create_dir_all(&dir)
            .map_err(|e| EngineError::persist(format!("creating {}: {e}", dir.display())))?;
    }
    Ok(())
}

fn write_json(path: &Path, value: &serde_json::Value) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(value).context("serializing metadata")?;
    write_bytes(path, json.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    fs::write(path, bytes)
        .map_err(|e| EngineError::persist(format!("writing {}: {e}", path.display())))
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
