use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use photoedit::catalog::{FilterId, chain_for};
use photoedit::picker::{is_supported_image, open_image};
use photoedit::processing::{CpuEngine, RenderEngine};

const PREVIEW_MAX: u32 = 1920;

fn list_image_files(dir: &Path, limit: usize) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read_dir failed for {}", dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_supported_image(p))
        .collect();
    files.sort();
    files.truncate(limit);
    Ok(files)
}

fn median_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

fn ensure_preview_size(img: image::DynamicImage) -> image::DynamicImage {
    if img.width() > PREVIEW_MAX || img.height() > PREVIEW_MAX {
        img.thumbnail(PREVIEW_MAX, PREVIEW_MAX)
    } else {
        img
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args();
    let _bin = args.next();
    let dir = args
        .next()
        .map(PathBuf::from)
        .context("usage: perf_probe <image-dir> [count]")?;
    let count = args
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(20);

    let files = list_image_files(&dir, count)?;
    if files.is_empty() {
        anyhow::bail!("No images found in {}", dir.display());
    }
    eprintln!("Using {} images from {}", files.len(), dir.display());

    let mut open_samples = Vec::with_capacity(files.len());
    let mut previews = Vec::with_capacity(files.len());
    for path in &files {
        let t0 = Instant::now();
        let img = open_image(path).with_context(|| format!("open failed for {}", path.display()))?;
        previews.push(ensure_preview_size(img));
        open_samples.push(t0.elapsed().as_secs_f64() * 1000.0);
    }

    let engine = CpuEngine;
    let wall = Instant::now();
    let per_filter: Vec<(FilterId, Vec<f64>)> = FilterId::ALL
        .par_iter()
        .map(|&id| -> Result<(FilterId, Vec<f64>)> {
            let chain = chain_for(id);
            let mut samples = Vec::with_capacity(previews.len());
            for preview in &previews {
                let t0 = Instant::now();
                engine
                    .render(preview, &chain)
                    .with_context(|| format!("{} render failed", id.key()))?;
                samples.push(t0.elapsed().as_secs_f64() * 1000.0);
            }
            Ok((id, samples))
        })
        .collect::<Result<_>>()?;
    let wall_s = wall.elapsed().as_secs_f64();

    println!("METRIC file_count={}", files.len());
    println!("METRIC open_ms_median={:.2}", median_ms(&open_samples));
    for (id, samples) in &per_filter {
        println!("METRIC filter_ms_median.{}={:.2}", id.key(), median_ms(samples));
    }
    let renders = (files.len() * per_filter.len()) as f64;
    println!("METRIC render_wall_s={:.2}", wall_s);
    println!("METRIC renders_per_sec={:.3}", renders / wall_s.max(1e-9));

    Ok(())
}
