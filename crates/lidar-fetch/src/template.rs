//! Pipeline stage template.
//!
//! A template is a JSON object holding one skeleton per stage kind:
//!
//! ```json
//! {
//!   "reader": { "type": "readers.ept", "tag": "readdata" },
//!   "cropping_filter": { "type": "filters.crop" },
//!   "range_filter": { "type": "filters.range", "limits": "Classification![7:7]" },
//!   "assign_filter": { "type": "filters.assign", "assignment": "Classification[:]=0" },
//!   "reprojection_filter": { "type": "filters.reprojection" }
//! }
//! ```
//!
//! Skeletons carry engine defaults; query-specific parameters are filled in by
//! [`crate::build_pipeline`].

use crate::pipeline::StageKind;
use crate::{FetchError, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// Engine parameters of one stage, without its `type`.
pub type StageOptions = Map<String, Value>;

/// Skeleton of a single stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTemplate {
    /// Engine driver name, e.g. `readers.ept`.
    pub driver: String,
    /// Remaining parameters.
    pub options: StageOptions,
}

/// Skeletons for every stage kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTemplate {
    /// Point reader.
    pub reader: StageTemplate,
    /// Polygon crop.
    pub crop: StageTemplate,
    /// Attribute range filter.
    pub range: StageTemplate,
    /// Attribute assignment filter.
    pub assign: StageTemplate,
    /// Output reprojection.
    pub reprojection: StageTemplate,
}

impl PipelineTemplate {
    /// Parse a template document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FetchError::TemplateLoad(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Read a template document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| FetchError::TemplateLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Build a template from an already parsed document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut document) = value else {
            return Err(FetchError::TemplateLoad("template must be a JSON object".to_string()));
        };

        let mut take = |kind: StageKind| -> Result<StageTemplate> {
            let key = kind.template_key();
            match document.remove(key) {
                Some(Value::Object(options)) => stage_template(kind, options),
                Some(_) => Err(FetchError::TemplateLoad(format!("stage '{}' must be an object", key))),
                None => Err(FetchError::TemplateLoad(format!("missing stage '{}'", key))),
            }
        };

        Ok(Self {
            reader: take(StageKind::Reader)?,
            crop: take(StageKind::Crop)?,
            range: take(StageKind::Range)?,
            assign: take(StageKind::Assign)?,
            reprojection: take(StageKind::Reprojection)?,
        })
    }
}

impl Default for PipelineTemplate {
    fn default() -> Self {
        Self {
            reader: StageTemplate {
                driver: StageKind::Reader.default_driver().to_string(),
                options: options(json!({ "tag": "readdata" })),
            },
            crop: StageTemplate {
                driver: StageKind::Crop.default_driver().to_string(),
                options: options(json!({ "tag": "crop" })),
            },
            range: StageTemplate {
                driver: StageKind::Range.default_driver().to_string(),
                options: options(json!({ "limits": "Classification![7:7]", "tag": "nonoise" })),
            },
            assign: StageTemplate {
                driver: StageKind::Assign.default_driver().to_string(),
                options: options(json!({ "assignment": "Classification[:]=0", "tag": "wipeclasses" })),
            },
            reprojection: StageTemplate {
                driver: StageKind::Reprojection.default_driver().to_string(),
                options: options(json!({ "tag": "reproject" })),
            },
        }
    }
}

fn options(value: Value) -> StageOptions {
    match value {
        Value::Object(map) => map,
        _ => StageOptions::new(),
    }
}

fn stage_template(kind: StageKind, mut options: StageOptions) -> Result<StageTemplate> {
    let driver = match options.remove("type") {
        None => kind.default_driver().to_string(),
        Some(Value::String(driver)) if kind.accepts_driver(&driver) => driver,
        Some(other) => {
            return Err(FetchError::TemplateLoad(format!(
                "stage '{}' has type {} but must be {}",
                kind.template_key(),
                other,
                kind.default_driver()
            )))
        }
    };
    Ok(StageTemplate { driver, options })
}
