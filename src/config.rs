use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;

use crate::{
    cid::CidVersion,
    error::{EngineError, EngineResult},
    model::BlendMode,
};

/// Engine configuration. Every field has a default so a config file only
/// needs to name what it changes; the whole build is a pure function of
/// this struct plus the catalogs it points at.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Network key selected from each catalog file, also the build
    /// output subdirectory.
    pub network: String,
    /// Seed for every random draw. Same seed, same catalogs, same batch.
    pub seed: u64,
    /// Bound on selection restarts and consecutive duplicate rejections.
    pub max_retries: u32,
    /// Scanner weight for attribute files without a `#W` suffix.
    pub default_weight: u32,
    pub default_blend: BlendMode,
    pub default_opacity: f64,
    pub preview: Dimensions,
    pub image: Dimensions,
    pub start_edition: u32,
    pub cid_version: CidVersion,
    /// Interpolate when stretching source images (nearest-neighbor when off).
    pub smoothing: bool,
    /// Shuffle the combined batch before editions are assigned.
    pub shuffle: bool,
    pub paths: EnginePaths,
    /// Template object cloned into every item's metadata.
    pub metadata_template: serde_json::Value,
    pub series: Vec<SeriesSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Root-relative directory names.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnginePaths {
    pub config: String,
    pub build: String,
    pub layers: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SeriesSpec {
    /// Catalog file stem under the config dir (`config/<catalog>.json`).
    pub catalog: String,
    /// Display name stamped into metadata.
    pub series: String,
    /// Number of unique items this series contributes.
    pub quota: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: "main".to_string(),
            seed: 0,
            max_retries: 1000,
            default_weight: 100,
            default_blend: BlendMode::SourceOver,
            default_opacity: 1.0,
            preview: Dimensions {
                width: 300,
                height: 300,
            },
            image: Dimensions {
                width: 2000,
                height: 2000,
            },
            start_edition: 1,
            cid_version: CidVersion::V0,
            smoothing: true,
            shuffle: true,
            paths: EnginePaths::default(),
            metadata_template: serde_json::json!({}),
            series: Vec::new(),
        }
    }
}

impl Default for EnginePaths {
    fn default() -> Self {
        Self {
            config: "config".to_string(),
            build: "build".to_string(),
            layers: "layers".to_string(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. Validation happens at the build and
    /// report entry points so a bootstrap config without series entries
    /// can still drive the catalog scanner.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening engine config {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (label, dims) in [("preview", self.preview), ("image", self.image)] {
            if dims.width == 0 || dims.height == 0 {
                return Err(EngineError::validation(format!(
                    "{label} dimensions must be > 0"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.default_opacity) {
            return Err(EngineError::validation(
                "default_opacity must be within 0..=1",
            ));
        }
        if self.max_retries == 0 {
            return Err(EngineError::validation("max_retries must be > 0"));
        }
        if !self.metadata_template.is_object() {
            return Err(EngineError::validation(
                "metadata_template must be a JSON object",
            ));
        }
        if self.series.is_empty() {
            return Err(EngineError::validation("series list must not be empty"));
        }
        for spec in &self.series {
            if spec.catalog.trim().is_empty() || spec.series.trim().is_empty() {
                return Err(EngineError::validation(
                    "series entries need a catalog and a series name",
                ));
            }
            if spec.quota == 0 {
                return Err(EngineError::validation(format!(
                    "series '{}' has a zero quota",
                    spec.series
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> EngineConfig {
        EngineConfig {
            series: vec![SeriesSpec {
                catalog: "layers".to_string(),
                series: "Origin".to_string(),
                quota: 10,
            }],
            ..EngineConfig::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.network, "main");
        assert_eq!(config.max_retries, 1000);
        assert_eq!(config.default_weight, 100);
        assert_eq!(config.preview.width, 300);
        assert_eq!(config.image.height, 2000);
        assert_eq!(config.start_edition, 1);
        assert!(config.smoothing);
        assert!(config.shuffle);
        assert_eq!(config.paths.layers, "layers");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "network": "testnet",
                "seed": 7,
                "series": [ { "catalog": "layers", "series": "One", "quota": 3 } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.network, "testnet");
        assert_eq!(config.seed, 7);
        assert_eq!(config.image.width, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_series() {
        assert!(EngineConfig::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_quota() {
        let mut config = configured();
        config.series[0].quota = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        let mut config = configured();
        config.preview.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_object_template() {
        let mut config = configured();
        config.metadata_template = serde_json::json!("just a string");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_opacity() {
        let mut config = configured();
        config.default_opacity = 2.0;
        assert!(config.validate().is_err());
    }
}
