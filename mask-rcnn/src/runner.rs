use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

/// Aggregate outcome of a driving loop. Only successful images count
/// toward the latency total.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub processed: usize,
    pub skipped: usize,
    pub total_time: Duration,
}

impl RunStats {
    pub fn average(&self) -> Option<Duration> {
        (self.processed > 0).then(|| self.total_time / self.processed as u32)
    }
}

/// Run `f` over the paths, stopping after `limit` successes. A failing
/// image is logged and skipped; it never aborts the loop.
pub fn run_over_images<F>(paths: &[PathBuf], limit: usize, mut f: F) -> RunStats
where
    F: FnMut(&Path) -> anyhow::Result<Duration>,
{
    let mut stats = RunStats::default();
    for path in paths {
        match f(path) {
            Ok(elapsed) => {
                stats.processed += 1;
                stats.total_time += elapsed;
                if stats.processed >= limit {
                    break;
                }
            }
            Err(error) => {
                warn!("skipping {}: {error:#}", path.display());
                stats.skipped += 1;
            }
        }
    }
    stats
}

/// Image files directly under `dir`, in name order.
pub fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png" | "bmp")
    )
}
