use std::path::{Path, PathBuf};
use std::process::Command;

use artengine::{Dimensions, EngineConfig, SeriesSpec};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_artengine")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "artengine.exe"
            } else {
                "artengine"
            });
            p
        })
}

fn write_solid(path: &Path, rgba: [u8; 4]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

#[test]
fn cli_catalog_build_report_chain() {
    let root = PathBuf::from("target").join("cli_smoke");
    if root.exists() {
        std::fs::remove_dir_all(&root).unwrap();
    }

    let main = root.join("layers/main");
    write_solid(&main.join("1-Body/Red#60.png"), [255, 0, 0, 255]);
    write_solid(&main.join("1-Body/Blue#40.png"), [0, 0, 255, 255]);
    write_solid(&main.join("2-Eyes/Open.png"), [255, 255, 255, 150]);
    write_solid(&main.join("2-Eyes/Shut.png"), [0, 0, 0, 150]);

    let config = EngineConfig {
        seed: 11,
        preview: Dimensions {
            width: 2,
            height: 2,
        },
        image: Dimensions {
            width: 4,
            height: 4,
        },
        metadata_template: serde_json::json!({ "name": "{SERIES} #{EDITION}" }),
        series: vec![SeriesSpec {
            catalog: "layers".to_string(),
            series: "Smoke".to_string(),
            quota: 3,
        }],
        ..EngineConfig::default()
    };
    std::fs::create_dir_all(root.join("config")).unwrap();
    let f = std::fs::File::create(root.join("config/engine.json")).unwrap();
    serde_json::to_writer_pretty(f, &config).unwrap();

    let root_arg = root.to_string_lossy().to_string();

    let status = Command::new(exe())
        .args(["catalog", "--root", root_arg.as_str()])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(root.join("config/layers.json").is_file());

    let status = Command::new(exe())
        .args(["build", "--root", root_arg.as_str()])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(root.join("build/main/metadata.json").is_file());
    for edition in 1..=3 {
        assert!(root.join(format!("build/main/image/{edition}.png")).is_file());
        assert!(root.join(format!("build/main/preview/{edition}.png")).is_file());
        assert!(root.join(format!("build/main/json/{edition}.json")).is_file());
    }

    let status = Command::new(exe())
        .args(["report", "--root", root_arg.as_str()])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(root.join("build/main/rarity.html").is_file());
}

#[test]
fn cli_build_fails_without_a_config() {
    let root = PathBuf::from("target").join("cli_smoke_missing");
    if root.exists() {
        std::fs::remove_dir_all(&root).unwrap();
    }
    std::fs::create_dir_all(&root).unwrap();

    let out = Command::new(exe())
        .args(["build", "--root", root.to_string_lossy().as_ref()])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("engine config"));
}
