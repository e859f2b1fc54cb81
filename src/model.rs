use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// Catalog file contents: one layer stack per network, keyed by network
/// name. Attribute ids are unique across the whole file.
pub type Catalog = BTreeMap<String, Vec<Layer>>;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub name: String,
    pub order: u32, // stacks composite in ascending order
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<BlendMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    pub attributes: Vec<Attribute>, // catalog order, never re-sorted
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    pub id: u32,
    pub value: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub weight: u32,  // weight 0 is never selectable
    pub path: String, // image file relative to the network's layers dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<BlendMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<u32>, // attribute ids barred once this one is chosen
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}

/// One resolved pick: the owning layer's name plus the attribute's
/// effective paint parameters (defaults and visibility applied).
#[derive(Clone, Debug, PartialEq)]
pub struct ChosenAttribute {
    pub id: u32,
    pub name: String, // owning layer
    pub value: String,
    pub path: String,
    pub blend: BlendMode,
    pub opacity: f64,
    pub visible: bool,
}

/// One entry per layer, in composite order.
pub type Selection = Vec<ChosenAttribute>;

fn default_true() -> bool {
    true
}

pub fn validate_catalog(catalog: &Catalog) -> EngineResult<()> {
    let mut seen_ids = std::collections::BTreeSet::new();
    for (network, layers) in catalog {
        validate_stack(network, layers)?;
        for layer in layers {
            for attribute in &layer.attributes {
                if !seen_ids.insert(attribute.id) {
                    return Err(EngineError::validation(format!(
                        "attribute id {} appears more than once in the catalog",
                        attribute.id
                    )));
                }
            }
        }
    }
    Ok(())
}

pub fn validate_stack(network: &str, layers: &[Layer]) -> EngineResult<()> {
    if layers.is_empty() {
        return Err(EngineError::validation(format!(
            "network '{network}' has no layers"
        )));
    }
    let mut seen_orders = std::collections::BTreeSet::new();
    for layer in layers {
        if !seen_orders.insert(layer.order) {
            return Err(EngineError::validation(format!(
                "network '{network}' repeats layer order {}",
                layer.order
            )));
        }
        if !layer.attributes.iter().any(|a| a.weight > 0) {
            return Err(EngineError::validation(format!(
                "layer '{}' has no selectable attribute (all weights zero)",
                layer.name
            )));
        }
        for opacity in layer
            .opacity
            .iter()
            .chain(layer.attributes.iter().filter_map(|a| a.opacity.as_ref()))
        {
            if !(0.0..=1.0).contains(opacity) {
                return Err(EngineError::validation(format!(
                    "layer '{}' has opacity {opacity} outside 0..=1",
                    layer.name
                )));
            }
        }
    }
    Ok(())
}
