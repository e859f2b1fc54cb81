#![forbid(unsafe_code)]

pub mod assets;
pub mod catalog;
pub mod cid;
pub mod composite;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod rng;
pub mod select;

pub use assets::SourceImageCache;
pub use catalog::{load_catalog, scan_layers, write_catalog};
pub use cid::{CidVersion, content_id};
pub use composite::Surface;
pub use config::{Dimensions, EngineConfig, EnginePaths, SeriesSpec};
pub use error::{EngineError, EngineResult};
pub use metadata::MetadataAssembler;
pub use model::{Attribute, BlendMode, Catalog, ChosenAttribute, Layer, Selection};
pub use pipeline::{BuildSummary, run_build};
pub use render::{RenderedSurface, render_selection};
pub use report::{build_report, run_report};
pub use rng::Rng64;
pub use select::{ExistsSet, Selector, selection_key};
