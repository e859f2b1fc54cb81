//! Weighted trait selection with mutual exclusion and batch-wide
//! duplicate rejection.

use std::collections::{BTreeSet, HashSet};

use crate::{
    config::EngineConfig,
    error::{EngineError, EngineResult},
    model::{Attribute, ChosenAttribute, Layer, Selection},
    rng::Rng64,
};

pub struct Selector {
    default_blend: crate::model::BlendMode,
    default_opacity: f64,
    max_retries: u32,
}

impl Selector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            default_blend: config.default_blend,
            default_opacity: config.default_opacity,
            max_retries: config.max_retries,
        }
    }

    /// One weighted draw per layer, walking layers in slice order.
    ///
    /// Choosing an attribute bars every id on its `excludes` list for
    /// the remaining layers of the pass. When exclusions leave a layer
    /// with no eligible attribute the whole pass restarts with a clean
    /// slate; passes are bounded by `max_retries`.
    pub fn select_one(&self, layers: &[Layer], rng: &mut Rng64) -> EngineResult<Selection> {
        let mut starved = None;
        'pass: for _ in 0..self.max_retries {
            let mut excluded: BTreeSet<u32> = BTreeSet::new();
            let mut selection: Selection = Vec::with_capacity(layers.len());
            for layer in layers {
                let total: u64 = layer
                    .attributes
                    .iter()
                    .filter(|a| a.weight > 0 && !excluded.contains(&a.id))
                    .map(|a| u64::from(a.weight))
                    .sum();
                if total == 0 {
                    tracing::debug!(layer = %layer.name, "layer fully excluded, restarting pass");
                    starved = Some(layer.name.as_str());
                    continue 'pass;
                }

                // subtract eligible weights from the draw until it lands
                let mut draw = rng.below(total);
                for attribute in &layer.attributes {
                    if attribute.weight == 0 || excluded.contains(&attribute.id) {
                        continue;
                    }
                    if draw < u64::from(attribute.weight) {
                        excluded.extend(attribute.excludes.iter().copied());
                        selection.push(self.resolve(layer, attribute));
                        break;
                    }
                    draw -= u64::from(attribute.weight);
                }
            }
            return Ok(selection);
        }
        Err(EngineError::selection_exhausted(match starved {
            Some(name) => format!(
                "no complete pass after {} attempts; exclusions leave layer '{name}' empty",
                self.max_retries
            ),
            None => format!("no complete pass after {} attempts", self.max_retries),
        }))
    }

    /// Draw selections until one is new to `exists`, registering the
    /// accepted one under `catalog`. Consecutive duplicates are bounded
    /// by `max_retries`; a quota larger than the distinct combination
    /// space fails here instead of looping forever.
    pub fn select_unique(
        &self,
        catalog: &str,
        layers: &[Layer],
        rng: &mut Rng64,
        exists: &mut ExistsSet,
    ) -> EngineResult<Selection> {
        for _ in 0..self.max_retries {
            let selection = self.select_one(layers, rng)?;
            if exists.insert(catalog, &selection) {
                return Ok(selection);
            }
            tracing::debug!("chosen attributes exist, trying again");
        }
        Err(EngineError::selection_exhausted(format!(
            "catalog '{catalog}' has no unused combination after {} attempts",
            self.max_retries
        )))
    }

    fn resolve(&self, layer: &Layer, attribute: &Attribute) -> ChosenAttribute {
        ChosenAttribute {
            id: attribute.id,
            name: layer.name.clone(),
            value: attribute.value.clone(),
            path: attribute.path.clone(),
            blend: attribute.blend.or(layer.blend).unwrap_or(self.default_blend),
            opacity: attribute
                .opacity
                .or(layer.opacity)
                .unwrap_or(self.default_opacity),
            visible: layer.visible && attribute.visible,
        }
    }
}

/// Canonical key for a selection: the ordered tuple of chosen ids.
pub fn selection_key(selection: &Selection) -> Vec<u32> {
    selection.iter().map(|a| a.id).collect()
}

/// Batch-wide registry of accepted combinations.
///
/// Keys pair the owning catalog's name with the ordered id tuple;
/// attribute ids are only unique within one catalog file, so the bare
/// tuple would conflate picks from different catalogs in the same
/// batch.
#[derive(Default)]
pub struct ExistsSet {
    keys: HashSet<(String, Vec<u32>)>,
}

impl ExistsSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the selection was new; false marks a duplicate.
    pub fn insert(&mut self, catalog: &str, selection: &Selection) -> bool {
        self.keys
            .insert((catalog.to_string(), selection_key(selection)))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
