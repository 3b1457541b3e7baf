use anyhow::{Context, bail};
use image::{Rgba, RgbaImage};
use lumen_sync::core_modules::frame::Frame;
use lumen_sync::core_modules::geometry::{point_from_unit_square, rect_from_unit_square};
use lumen_sync::core_modules::utils::image_helper::image_helper;
use lumen_sync::{DetectionReport, ScanConfig, ScreenDetector};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const CENTER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- 1. Argument Parsing & Setup ---
    let mut args: Vec<String> = env::args().skip(1).collect();
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a path");
            }
            let path = args.remove(i + 1);
            args.remove(i);
            ScanConfig::load(Path::new(&path))?
        }
        None => ScanConfig::default(),
    };
    if args.len() < 2 {
        println!("Usage: scan_tester <reference.png> <probe.png> [overlay.png] [--config scan.toml]");
        return Ok(());
    }
    let overlay_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("overlay.png"));

    // --- 2. Frame Loading ---
    let reference = load_frame(&args[0])?;
    let probe = load_frame(&args[1])?;
    info!(width = probe.width(), height = probe.height(), "frames loaded");

    // --- 3. Detection ---
    let detector = ScreenDetector::new(config);
    let trace = detector.detect_traced(&reference, &probe)?;
    println!("threshold: {:.2}", trace.threshold);
    println!("lit pixels after closing: {}", trace.mask.lit_count());

    // --- 4. Visualization ---
    let mut overlay = probe.to_rgba_image();
    match &trace.report {
        DetectionReport::Detected(detection) => {
            println!(
                "detected: center ({:.4}, {:.4}), area {:.4}x{:.4} at ({:.4}, {:.4}), {} px",
                detection.center.x,
                detection.center.y,
                detection.area.width,
                detection.area.height,
                detection.area.x,
                detection.area.y,
                detection.pixel_count
            );
            let (w, h) = (probe.width(), probe.height());
            let rect = rect_from_unit_square(detection.area, w, h);
            draw_outline(
                &mut overlay,
                rect.x as i64,
                rect.y as i64,
                (rect.x + rect.width) as i64 - 1,
                (rect.y + rect.height) as i64 - 1,
            );
            let center = point_from_unit_square(detection.center, w, h);
            draw_cross(&mut overlay, center.x as i64, center.y as i64, 6);
        }
        DetectionReport::NotDetected(reason) => println!("not detected: {reason:?}"),
    }

    // --- 5. Dumps ---
    overlay
        .save(&overlay_path)
        .with_context(|| format!("writing {}", overlay_path.display()))?;
    let mask_path = overlay_path.with_extension("mask.png");
    image_helper::save_mask(&mask_path, &trace.mask)?;
    let diff_path = overlay_path.with_extension("diff.png");
    image_helper::save_difference(&diff_path, &trace.blurred)?;

    println!(
        "Processing complete. Output saved to {}, {}, {}",
        overlay_path.display(),
        mask_path.display(),
        diff_path.display()
    );
    Ok(())
}

fn load_frame(path: &str) -> anyhow::Result<Frame> {
    let image = image::open(path).with_context(|| format!("reading {path}"))?;
    Ok(Frame::from(image.to_rgba8()))
}

fn put(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_outline(image: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64) {
    for x in x0..=x1 {
        put(image, x, y0, BOX_COLOR);
        put(image, x, y1, BOX_COLOR);
    }
    for y in y0..=y1 {
        put(image, x0, y, BOX_COLOR);
        put(image, x1, y, BOX_COLOR);
    }
}

fn draw_cross(image: &mut RgbaImage, cx: i64, cy: i64, arm: i64) {
    for d in -arm..=arm {
        put(image, cx + d, cy, CENTER_COLOR);
        put(image, cx, cy + d, CENTER_COLOR);
    }
}
