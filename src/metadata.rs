use serde_json::{Map, Value};

use crate::{
    error::{EngineError, EngineResult},
    model::Selection,
};

/// Template keys that take placeholder substitution.
pub const METADATA_STANDARDS: [&str; 6] = [
    "name",
    "description",
    "image",
    "preview",
    "external_url",
    "animation_url",
];

/// Builds one metadata record per item from the configured template.
///
/// Placeholders `{SERIES}`, `{EDITION}`, `{LORES_CID}` and `{HIRES_CID}`
/// are substituted at their first occurrence only, and only inside the
/// string values of the standard keys above.
pub struct MetadataAssembler {
    template: Map<String, Value>,
}

impl MetadataAssembler {
    pub fn new(template: &Value) -> EngineResult<Self> {
        let template = template
            .as_object()
            .cloned()
            .ok_or_else(|| EngineError::validation("metadata_template must be a JSON object"))?;
        Ok(Self { template })
    }

    pub fn assemble(
        &self,
        series: &str,
        edition: u32,
        lores_cid: &str,
        hires_cid: &str,
        selection: &Selection,
        date_ms: u64,
    ) -> Value {
        let mut metadata = self.template.clone();
        for key in METADATA_STANDARDS {
            if let Some(Value::String(text)) = metadata.get(key) {
                let replaced = text
                    .replacen("{SERIES}", series, 1)
                    .replacen("{EDITION}", &edition.to_string(), 1)
                    .replacen("{LORES_CID}", lores_cid, 1)
                    .replacen("{HIRES_CID}", hires_cid, 1);
                metadata.insert(key.to_string(), Value::String(replaced));
            }
        }

        metadata.insert("series".to_string(), Value::from(series));
        metadata.insert("edition".to_string(), Value::from(edition));
        // the item's dna is the content id of the full-size render
        metadata.insert("dna".to_string(), Value::from(hires_cid));
        metadata.insert("date".to_string(), Value::from(date_ms));

        let attributes: Vec<Value> = selection
            .iter()
            .filter(|a| a.visible)
            .map(|a| serde_json::json!({ "trait_type": a.name, "value": a.value }))
            .collect();
        metadata.insert("attributes".to_string(), Value::Array(attributes));

        Value::Object(metadata)
    }
}
