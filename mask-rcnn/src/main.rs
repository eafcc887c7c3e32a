use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mask_rcnn::{Args, ClassNames, DemoConfig, Predictor, list_images, run_over_images};

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    // merge the base file with the demo's explicit overrides
    let config = DemoConfig::load(Path::new(&args.config))?.with_overrides(true, args.device);
    info!(
        "model: {} ({:?}, mask head {})",
        config.model.weights.display(),
        config.model.device,
        if config.model.mask_on { "on" } else { "off" }
    );
    info!("output dir: {}", config.output_dir.display());

    let class_names = ClassNames::load(Path::new(&args.labels)).unwrap_or_default();
    let predictor = Predictor::new(
        &config,
        args.min_image_size,
        args.confidence,
        args.heatmap,
        class_names,
    )?;

    let paths = list_images(Path::new(&args.source))
        .with_context(|| format!("listing images under {}", args.source))?;
    info!("{} images under {}", paths.len(), args.source);

    let stats = run_over_images(&paths, args.limit, |path| predictor.predict(path));

    match stats.average() {
        Some(avg) => info!(
            "image avg time: {:?} ({} processed, {} skipped)",
            avg, stats.processed, stats.skipped
        ),
        None => info!("no image processed ({} skipped)", stats.skipped),
    }

    Ok(())
}
