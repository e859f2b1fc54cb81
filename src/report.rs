//! Rarity report: aggregate trait statistics over a finished batch,
//! rendered as a standalone HTML page next to the batch output.
//!
//! Chance values follow the batch convention floor((occ / total) x
//! 10000) / 10000, computed here in integer basis points so the floor
//! is exact.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    catalog,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    model::Layer,
};

/// Load the configured catalogs and the batch's `metadata.json`, build
/// the report, and write `rarity.html` into the batch output directory.
pub fn run_report(config: &EngineConfig, root: impl AsRef<Path>) -> EngineResult<PathBuf> {
    config.validate()?;
    let root = root.as_ref();

    // union of the network's layer stacks across all configured
    // catalogs; same-named layers pool their attribute values, with the
    // first definition fixing order and visibility
    let mut layers: Vec<Layer> = Vec::new();
    let mut seen_catalogs: BTreeSet<&str> = BTreeSet::new();
    for spec in &config.series {
        if !seen_catalogs.insert(&spec.catalog) {
            continue;
        }
        let catalog_path = root
            .join(&config.paths.config)
            .join(format!("{}.json", spec.catalog));
        let catalog = catalog::load_catalog(&catalog_path)?;
        let stack = catalog.get(&config.network).ok_or_else(|| {
            EngineError::catalog(format!(
                "catalog {} has no network '{}'",
                catalog_path.display(),
                config.network
            ))
        })?;
        for layer in stack {
            match layers.iter_mut().find(|l| l.name == layer.name) {
                Some(merged) => {
                    for attribute in &layer.attributes {
                        if !merged.attributes.iter().any(|a| a.value == attribute.value) {
                            merged.attributes.push(attribute.clone());
                        }
                    }
                }
                None => layers.push(layer.clone()),
            }
        }
    }
    layers.sort_by_key(|l| l.order);

    let out_dir = root.join(&config.paths.build).join(&config.network);
    let metadata_path = out_dir.join("metadata.json");
    let bytes = fs::read(&metadata_path)
        .with_context(|| format!("reading batch metadata {}", metadata_path.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing batch metadata {}", metadata_path.display()))?;

    let html = build_report(&layers, &records)?;
    let out_path = out_dir.join("rarity.html");
    fs::write(&out_path, html)
        .map_err(|e| EngineError::persist(format!("writing {}: {e}", out_path.display())))?;
    tracing::info!(path = %out_path.display(), "wrote rarity report");
    Ok(out_path)
}

/// Render the report HTML for a batch.
pub fn build_report(layers: &[Layer], records: &[serde_json::Value]) -> EngineResult<String> {
    if records.is_empty() {
        return Err(EngineError::validation(
            "cannot report on an empty metadata list",
        ));
    }
    let occurrences = count_occurrences(layers, records)?;
    let total = records.len() as u64;

    let mut out = Vec::new();
    out.push("<div style=\"display:flex\">".to_string());
    out.push("<div style=\"margin-right: 20px\">".to_string());
    for layer in layers {
        if !layer.visible {
            continue;
        }
        out.push(format!("<h3>Feature: {}</h3>", layer.name));
        out.push(rarity_table(layer, &occurrences, total));
    }
    out.push("</div><div>".to_string());
    out.push("<h3>Items</h3>".to_string());
    out.push(items_table(layers, records, &occurrences, total)?);
    out.push("</div>".to_string());
    Ok(out.join("\n"))
}

type Occurrences = HashMap<(String, String), u64>;

fn count_occurrences(layers: &[Layer], records: &[serde_json::Value]) -> EngineResult<Occurrences> {
    let mut occurrences = Occurrences::new();
    for layer in layers {
        for attribute in &layer.attributes {
            occurrences.insert((layer.name.clone(), attribute.value.clone()), 0);
        }
    }
    for record in records {
        for (trait_type, value) in record_traits(record)? {
            let slot = occurrences
                .get_mut(&(trait_type.to_string(), value.to_string()))
                .ok_or_else(|| {
                    EngineError::validation(format!(
                        "metadata names unknown trait {trait_type}/{value}"
                    ))
                })?;
            *slot += 1;
        }
    }
    Ok(occurrences)
}

fn record_traits(record: &serde_json::Value) -> EngineResult<Vec<(&str, &str)>> {
    let entries = record["attributes"]
        .as_array()
        .ok_or_else(|| EngineError::validation("metadata record has no attributes array"))?;
    let mut traits = Vec::with_capacity(entries.len());
    for entry in entries {
        let (Some(trait_type), Some(value)) =
            (entry["trait_type"].as_str(), entry["value"].as_str())
        else {
            return Err(EngineError::validation(
                "metadata attribute entry is malformed",
            ));
        };
        traits.push((trait_type, value));
    }
    Ok(traits)
}

/// floor((occ / total) x 10000), i.e. the chance in basis points.
fn chance_bp(occurrence: u64, total: u64) -> u64 {
    occurrence * 10_000 / total
}

fn percent(bp: u64) -> String {
    format!("{}.{:02}", bp / 100, bp % 100)
}

fn rarity_table(layer: &Layer, occurrences: &Occurrences, total: u64) -> String {
    let head = [
        "<th align=\"left\" nowrap>Trait</th>".to_string(),
        "<th align=\"right\" nowrap>Occurrence</th>".to_string(),
        "<th align=\"right\" nowrap>Chance</th>".to_string(),
    ];
    let mut rows: Vec<(&str, u64)> = layer
        .attributes
        .iter()
        .filter(|a| a.visible)
        .map(|a| {
            let occurrence = occurrences
                .get(&(layer.name.clone(), a.value.clone()))
                .copied()
                .unwrap_or(0);
            (a.value.as_str(), occurrence)
        })
        .collect();
    rows.sort_by_key(|row| row.1);

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|(value, occurrence)| {
            vec![
                format!("<td width=\"220\" nowrap>{value}</td>"),
                format!("<td nowrap align=\"right\">{occurrence}</td>"),
                format!(
                    "<td nowrap align=\"right\">{}%</td>",
                    percent(chance_bp(*occurrence, total))
                ),
            ]
        })
        .collect();
    make_table(&head, &body)
}

fn items_table(
    layers: &[Layer],
    records: &[serde_json::Value],
    occurrences: &Occurrences,
    total: u64,
) -> EngineResult<String> {
    let mut head = vec![
        "<th align=\"right\">Rarity</th>".to_string(),
        "<th align=\"right\">Edition</th>".to_string(),
        "<th>Image</th>".to_string(),
        "<th align=\"right\">Score</th>".to_string(),
    ];
    for layer in layers.iter().filter(|l| l.visible) {
        head.push(format!("<th>{}</th>", layer.name));
    }

    struct ItemRow {
        edition: u64,
        score: u64,
        traits: Vec<(String, u64)>, // value, chance bp
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let edition = record["edition"].as_u64().ok_or_else(|| {
            EngineError::validation("metadata record has no numeric edition")
        })?;
        let mut score = 0;
        let mut traits = Vec::new();
        for (trait_type, value) in record_traits(record)? {
            let occurrence = occurrences
                .get(&(trait_type.to_string(), value.to_string()))
                .copied()
                .unwrap_or(0);
            score += occurrence;
            traits.push((value.to_string(), chance_bp(occurrence, total)));
        }
        rows.push(ItemRow {
            edition,
            score,
            traits,
        });
    }
    rows.sort_by_key(|row| row.score);

    let body: Vec<Vec<String>> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![
                format!("<td align=\"right\">{}</td>", i + 1),
                format!("<td align=\"right\">{}</td>", row.edition),
                format!(
                    "<td><img width=\"100\" src=\"./image/{}.png\" /></td>",
                    row.edition
                ),
                format!("<td align=\"right\">{}</td>", row.score),
            ];
            for (value, bp) in &row.traits {
                cells.push(format!(
                    "<td nowrap>{value}<br /><small><em>{}%</em></small></td>",
                    percent(*bp)
                ));
            }
            cells
        })
        .collect();
    Ok(make_table(&head, &body))
}

fn make_table(head: &[String], body: &[Vec<String>]) -> String {
    let body_rows: Vec<String> = body
        .iter()
        .map(|row| format!("<tr>{}</tr>", row.concat()))
        .collect();
    format!(
        "<table border=\"1\" cellpadding=\"5\" cellspacing=\"0\">\n  <thead>\n    <tr>{}</tr>\n  </thead>\n  <tbody>\n    {}\n  </tbody>\n</table>",
        head.concat(),
        body_rows.join("\n    ")
    )
}
