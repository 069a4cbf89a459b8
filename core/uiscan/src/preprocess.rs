use image::{GrayImage, RgbImage};

use crate::config::Thresholds;

/// Shared preprocessing consumed by every geometric detector.
///
/// Computed once per analysis so all detectors see identical inputs.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Plain grayscale conversion of the input.
    pub gray: GrayImage,
    /// Grayscale with gamma + tiled equalization applied on dark themes,
    /// identical to `gray` otherwise.
    pub enhanced: GrayImage,
    /// Binary edge map (0 or 255): blur, gradient threshold, dilation.
    pub edges: GrayImage,
    /// Whether the dark-theme enhancement path was taken.
    pub dark_theme: bool,
}

/// Run the full preprocessing pass over a decoded image.
pub fn preprocess(image: &RgbImage, thresholds: &Thresholds) -> Preprocessed {
    let gray = image::imageops::grayscale(image);

    let dark_theme = median_luma(&gray) < thresholds.dark_theme_median_luma;
    let enhanced = if dark_theme {
        let lifted = gamma_correct(&gray, thresholds.gamma);
        equalize_tiles(&lifted, thresholds.equalize_tile_px)
    } else {
        gray.clone()
    };

    let blurred = box_blur3(&enhanced);
    let edges = edge_map(&blurred, thresholds.edge_magnitude_threshold);

    Preprocessed {
        gray,
        enhanced,
        edges,
        dark_theme,
    }
}

/// Median grayscale value via histogram.
pub(crate) fn median_luma(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    let total: u64 = gray.width() as u64 * gray.height() as u64;
    let half = total / 2;
    let mut seen = 0u64;
    for (v, count) in hist.iter().enumerate() {
        seen += count;
        if seen > half {
            return v as u8;
        }
    }
    255
}

/// Power-law correction; exponents below 1.0 lift shadows.
fn gamma_correct(gray: &GrayImage, gamma: f64) -> GrayImage {
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        *out = ((v as f64 / 255.0).powf(gamma) * 255.0).round() as u8;
    }
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = lut[p.0[0] as usize];
    }
    out
}

/// Localized histogram equalization in fixed-size tiles, blending each
/// pixel's mapping bilinearly between the four nearest tile histograms so
/// tile seams stay invisible. Uniform tiles map through unchanged.
fn equalize_tiles(gray: &GrayImage, tile: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let tile = tile.max(8);
    let tiles_x = w.div_ceil(tile).max(1);
    let tiles_y = h.div_ceil(tile).max(1);

    let mut luts: Vec<[u8; 256]> = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile;
            let x1 = (x0 + tile).min(w);
            let y0 = ty * tile;
            let y1 = (y0 + tile).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let n = (x1 - x0) * (y1 - y0);
            let mut cdf = [0u32; 256];
            let mut acc = 0u32;
            for (v, count) in hist.iter().enumerate() {
                acc += count;
                cdf[v] = acc;
            }
            let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);

            let mut lut = [0u8; 256];
            for (v, slot) in lut.iter_mut().enumerate() {
                *slot = if n > cdf_min {
                    (((cdf[v].saturating_sub(cdf_min)) as f64 / (n - cdf_min) as f64) * 255.0)
                        .round() as u8
                } else {
                    v as u8
                };
            }
            luts.push(lut);
        }
    }
    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        // Position in tile-center coordinates; clamp at the image border.
        let gy = (y as f64 + 0.5) / tile as f64 - 0.5;
        let ty0 = gy.floor().max(0.0) as u32;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let fy = (gy - gy.floor()).clamp(0.0, 1.0);
        let fy = if gy < 0.0 { 0.0 } else { fy };

        for x in 0..w {
            let gx = (x as f64 + 0.5) / tile as f64 - 0.5;
            let tx0 = gx.floor().max(0.0) as u32;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let fx = (gx - gx.floor()).clamp(0.0, 1.0);
            let fx = if gx < 0.0 { 0.0 } else { fx };

            let v = gray.get_pixel(x, y).0[0] as usize;
            let top = (1.0 - fx) * lut_at(tx0.min(tiles_x - 1), ty0.min(tiles_y - 1))[v] as f64
                + fx * lut_at(tx1, ty0.min(tiles_y - 1))[v] as f64;
            let bottom = (1.0 - fx) * lut_at(tx0.min(tiles_x - 1), ty1)[v] as f64
                + fx * lut_at(tx1, ty1)[v] as f64;
            let blended = (1.0 - fy) * top + fy * bottom;
            out.put_pixel(x, y, image::Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// 3×3 box blur, clamping at the borders.
fn box_blur3(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && ny >= 0 && (nx as u32) < w && (ny as u32) < h {
                        sum += gray.get_pixel(nx as u32, ny as u32).0[0] as u32;
                        count += 1;
                    }
                }
            }
            out.put_pixel(x, y, image::Luma([(sum / count) as u8]));
        }
    }
    out
}

/// Sobel gradient magnitude threshold followed by one 3×3 dilation to close
/// small gaps in the edge map.
fn edge_map(gray: &GrayImage, magnitude_threshold: u16) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut edges = GrayImage::new(w, h);
    if w < 3 || h < 3 {
        return edges;
    }

    let at = |x: u32, y: u32| gray.get_pixel(x, y).0[0] as i32;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = -at(x - 1, y - 1) - 2 * at(x - 1, y) - at(x - 1, y + 1)
                + at(x + 1, y - 1)
                + 2 * at(x + 1, y)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2 * at(x, y + 1)
                + at(x + 1, y + 1);
            let mag = (gx.abs() + gy.abs()) as u16 / 4;
            if mag >= magnitude_threshold {
                edges.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    dilate3(&edges)
}

/// 3×3 binary dilation.
pub(crate) fn dilate3(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if mask.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && ny >= 0 && (nx as u32) < w && (ny as u32) < h {
                        out.put_pixel(nx as u32, ny as u32, image::Luma([255]));
                    }
                }
            }
        }
    }
    out
}
