//! Seeds a six-item demo project under `target/demo_tiny_collection/`,
//! scans it into a catalog and builds the collection. The tree it leaves
//! behind also works with the CLI:
//!
//! ```sh
//! artengine report --root target/demo_tiny_collection
//! ```

use std::fs;
use std::path::Path;

use artengine::{Dimensions, EngineConfig, SeriesSpec, run_build, scan_layers, write_catalog};

fn paint_square(path: &Path, rgba: [u8; 4]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

fn seed_layers(root: &Path) -> anyhow::Result<()> {
    let main = root.join("layers/main");
    paint_square(&main.join("1-Background/Midnight#60.png"), [16, 16, 48, 255])?;
    paint_square(&main.join("1-Background/Dawn#40.png"), [240, 160, 96, 255])?;
    paint_square(&main.join("2-Body/Round#75.png"), [96, 200, 120, 255])?;
    paint_square(&main.join("2-Body/Square#25.png"), [200, 96, 120, 255])?;
    paint_square(&main.join("3-Eyes/Open#75.png"), [255, 255, 255, 200])?;
    paint_square(&main.join("3-Eyes/Shut#25.png"), [0, 0, 0, 200])?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let root = Path::new("target").join("demo_tiny_collection");
    if root.exists() {
        fs::remove_dir_all(&root)?;
    }
    seed_layers(&root)?;

    let config = EngineConfig {
        seed: 7,
        preview: Dimensions {
            width: 32,
            height: 32,
        },
        image: Dimensions {
            width: 64,
            height: 64,
        },
        metadata_template: serde_json::json!({
            "name": "Tiny #{EDITION}",
            "description": "Item {EDITION} of the {SERIES} demo run.",
            "image": "ipfs://{HIRES_CID}",
            "preview": "ipfs://{LORES_CID}",
        }),
        series: vec![SeriesSpec {
            catalog: "layers".to_string(),
            series: "Tiny".to_string(),
            quota: 6,
        }],
        ..EngineConfig::default()
    };

    let catalog = scan_layers(root.join("layers"), config.default_weight)?;
    write_catalog(&catalog, root.join("config/layers.json"))?;
    fs::write(
        root.join("config/engine.json"),
        serde_json::to_string_pretty(&config)?,
    )?;

    let summary = run_build(&config, &root)?;
    eprintln!(
        "wrote {} items to {}",
        summary.items,
        summary.out_dir.display()
    );
    Ok(())
}
