use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::Thresholds;

/// Overall theme classification by palette luminance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Median palette luminance below 0.5.
    Dark,
    /// Median palette luminance at or above 0.5.
    Light,
}

/// Dominant colors plus the dark/light theme classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteResult {
    /// Hex-encoded cluster centers, most populous first.
    pub dominant: Vec<String>,
    /// Theme classification.
    pub mode: ThemeMode,
}

/// BT.709 luma weights over non-linear sRGB, matching the classification the
/// rest of the toolchain expects.
fn luma(r: f64, g: f64, b: f64) -> f64 {
    0.2126 * (r / 255.0) + 0.7152 * (g / 255.0) + 0.0722 * (b / 255.0)
}

/// Cluster the image's colors into `k` dominant entries and classify the
/// theme. Deterministic: k-means runs from a fixed seed with a bounded
/// restart count, and the output ordering is population-major with a hex
/// tie-break.
pub fn extract_palette(image: &RgbImage, k: usize, thresholds: &Thresholds) -> PaletteResult {
    let pixels = working_pixels(image, thresholds.palette_working_width);
    let k = k.max(1);

    let centers = best_kmeans(
        &pixels,
        k,
        thresholds.palette_seed,
        thresholds.palette_restarts.max(1),
        thresholds.palette_max_iterations.max(1),
    );

    // Population-major ordering with hex tie-break keeps IDs stable.
    let mut ordered: Vec<(usize, String, [f64; 3])> = centers
        .iter()
        .map(|(center, count)| (*count, to_hex(center), *center))
        .collect();
    ordered.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut lumas: Vec<f64> = ordered
        .iter()
        .map(|(_, _, c)| luma(c[0], c[1], c[2]))
        .collect();
    lumas.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if lumas.is_empty() {
        0.0
    } else if lumas.len() % 2 == 1 {
        lumas[lumas.len() / 2]
    } else {
        (lumas[lumas.len() / 2 - 1] + lumas[lumas.len() / 2]) / 2.0
    };

    PaletteResult {
        dominant: ordered.into_iter().map(|(_, hex, _)| hex).collect(),
        mode: if median < 0.5 {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        },
    }
}

/// Downsample wide images to the working width before clustering.
fn working_pixels(image: &RgbImage, working_width: u32) -> Vec<[f64; 3]> {
    let (w, h) = image.dimensions();
    let resized;
    let source = if w > working_width && working_width > 0 {
        let new_h = ((h as f64 * working_width as f64 / w as f64).round() as u32).max(1);
        resized = image::imageops::resize(
            image,
            working_width,
            new_h,
            image::imageops::FilterType::Triangle,
        );
        &resized
    } else {
        image
    };
    source
        .pixels()
        .map(|p| [p.0[0] as f64, p.0[1] as f64, p.0[2] as f64])
        .collect()
}

/// Run `restarts` seeded k-means rounds and keep the lowest-inertia result.
/// Returns each center with its assigned population.
fn best_kmeans(
    pixels: &[[f64; 3]],
    k: usize,
    seed: u64,
    restarts: u32,
    max_iterations: u32,
) -> Vec<([f64; 3], usize)> {
    let mut best: Option<(f64, Vec<([f64; 3], usize)>)> = None;
    for restart in 0..restarts as u64 {
        let (inertia, centers) = kmeans_once(pixels, k, seed.wrapping_add(restart), max_iterations);
        let better = match &best {
            Some((best_inertia, _)) => inertia < *best_inertia,
            None => true,
        };
        if better {
            best = Some((inertia, centers));
        }
    }
    best.map(|(_, centers)| centers).unwrap_or_default()
}

fn kmeans_once(
    pixels: &[[f64; 3]],
    k: usize,
    seed: u64,
    max_iterations: u32,
) -> (f64, Vec<([f64; 3], usize)>) {
    let n = pixels.len();
    if n == 0 {
        return (0.0, Vec::new());
    }
    let k = k.min(n);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centers: Vec<[f64; 3]> = rand::seq::index::sample(&mut rng, n, k)
        .into_iter()
        .map(|i| pixels[i])
        .collect();

    let mut assignment = vec![0usize; n];
    for _ in 0..max_iterations {
        let mut changed = false;
        for (i, px) in pixels.iter().enumerate() {
            let nearest = nearest_center(px, &centers);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (i, px) in pixels.iter().enumerate() {
            let c = assignment[i];
            sums[c][0] += px[0];
            sums[c][1] += px[1];
            sums[c][2] += px[2];
            counts[c] += 1;
        }
        for c in 0..k {
            // An empty cluster keeps its previous center.
            if counts[c] > 0 {
                centers[c] = [
                    sums[c][0] / counts[c] as f64,
                    sums[c][1] / counts[c] as f64,
                    sums[c][2] / counts[c] as f64,
                ];
            }
        }
        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    let mut inertia = 0.0f64;
    for (i, px) in pixels.iter().enumerate() {
        counts[assignment[i]] += 1;
        inertia += sq_dist(px, &centers[assignment[i]]);
    }
    (inertia, centers.into_iter().zip(counts).collect())
}

fn nearest_center(px: &[f64; 3], centers: &[[f64; 3]]) -> usize {
    let mut best = 0usize;
    let mut best_d = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = sq_dist(px, c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn sq_dist(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn to_hex(center: &[f64; 3]) -> String {
    let clamp = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02X}{:02X}{:02X}",
        clamp(center[0]),
        clamp(center[1]),
        clamp(center[2])
    )
}
