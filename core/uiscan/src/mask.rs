//! Binary mask operations shared by the block and button detectors:
//! thresholding, morphology, and connected-component extraction.

use image::GrayImage;

use crate::geometry::Rect;

/// Window for the local adaptive threshold.
pub(crate) const ADAPTIVE_WINDOW: u32 = 33;

/// Deviation-from-local-mean floor for the adaptive threshold.
pub(crate) const ADAPTIVE_C: i32 = 7;

/// Row-major binary mask.
#[derive(Debug, Clone)]
pub(crate) struct Mask {
    pub w: u32,
    pub h: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            data: vec![false; (w * h) as usize],
        }
    }

    pub fn from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut m = Mask::new(w, h);
        for y in 0..h {
            for x in 0..w {
                if f(x, y) {
                    m.set(x, y);
                }
            }
        }
        m
    }

    /// Treat non-zero pixels of a grayscale map as set.
    pub fn from_gray(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        Mask::from_fn(w, h, |x, y| gray.get_pixel(x, y).0[0] > 0)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.w + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32) {
        self.data[(y * self.w + x) as usize] = true;
    }

    /// Pixel-wise union with a mask of identical dimensions.
    pub fn union(mut self, other: &Mask) -> Mask {
        debug_assert_eq!((self.w, self.h), (other.w, other.h));
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a |= *b;
        }
        self
    }

    /// Morphological closing with a square structuring element of the given
    /// radius: dilation followed by erosion.
    pub fn close(&self, radius: u32) -> Mask {
        if radius == 0 {
            return self.clone();
        }
        self.dilate(radius).erode(radius)
    }

    // Square-kernel dilation/erosion run separably: horizontal pass, then
    // vertical, each spreading by `radius`.
    fn dilate(&self, radius: u32) -> Mask {
        let horiz = self.spread_rows(radius, true);
        horiz.spread_cols(radius, true)
    }

    fn erode(&self, radius: u32) -> Mask {
        let horiz = self.spread_rows(radius, false);
        horiz.spread_cols(radius, false)
    }

    fn spread_rows(&self, radius: u32, dilating: bool) -> Mask {
        let mut out = Mask::new(self.w, self.h);
        let r = radius as i64;
        for y in 0..self.h {
            for x in 0..self.w {
                let lo = (x as i64 - r).max(0) as u32;
                let hi = (x as i64 + r).min(self.w as i64 - 1) as u32;
                let hit = if dilating {
                    (lo..=hi).any(|nx| self.get(nx, y))
                } else {
                    (lo..=hi).all(|nx| self.get(nx, y))
                };
                if hit {
                    out.set(x, y);
                }
            }
        }
        out
    }

    fn spread_cols(&self, radius: u32, dilating: bool) -> Mask {
        let mut out = Mask::new(self.w, self.h);
        let r = radius as i64;
        for y in 0..self.h {
            let lo = (y as i64 - r).max(0) as u32;
            let hi = (y as i64 + r).min(self.h as i64 - 1) as u32;
            for x in 0..self.w {
                let hit = if dilating {
                    (lo..=hi).any(|ny| self.get(x, ny))
                } else {
                    (lo..=hi).all(|ny| self.get(x, ny))
                };
                if hit {
                    out.set(x, y);
                }
            }
        }
        out
    }
}

/// Otsu's threshold: maximize between-class variance over the histogram.
pub(crate) fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    let total: u64 = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();

    let mut best_t = 0u8;
    let mut best_var = -1.0f64;
    let mut weight_bg = 0f64;
    let mut sum_bg = 0f64;
    for t in 0..256usize {
        weight_bg += hist[t] as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total as f64 - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let var = weight_bg * weight_fg * (mean_bg - mean_fg) * (mean_bg - mean_fg);
        if var > best_var {
            best_var = var;
            best_t = t as u8;
        }
    }
    best_t
}

/// Whether UI content is darker than the background. UI content occupies the
/// minority of pixels; this decides the inversion applied so content ends up
/// as mask foreground.
pub(crate) fn content_is_dark(gray: &GrayImage, otsu: u8) -> bool {
    let below = gray.pixels().filter(|p| p.0[0] <= otsu).count() as u64;
    let total = (gray.width() as u64 * gray.height() as u64).max(1);
    below * 2 <= total
}

/// Global Otsu binarization with content-as-foreground polarity.
pub(crate) fn global_binarize(gray: &GrayImage) -> Mask {
    let t = otsu_threshold(gray);
    let dark_content = content_is_dark(gray, t);
    Mask::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        if dark_content {
            v <= t
        } else {
            v > t
        }
    })
}

/// Local adaptive binarization: a pixel is foreground when it deviates from
/// the mean of its `window`-sized neighborhood by more than `c`, in the
/// direction of content.
pub(crate) fn adaptive_binarize(gray: &GrayImage, window: u32, c: i32) -> Mask {
    let (w, h) = gray.dimensions();
    let dark_content = content_is_dark(gray, otsu_threshold(gray));
    let half = (window / 2).max(1) as i64;

    // Integral image for O(1) window means.
    let iw = w as usize + 1;
    let mut integral = vec![0u64; iw * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row = 0u64;
        for x in 0..w as usize {
            row += gray.get_pixel(x as u32, y as u32).0[0] as u64;
            integral[(y + 1) * iw + x + 1] = integral[y * iw + x + 1] + row;
        }
    }

    Mask::from_fn(w, h, |x, y| {
        let x0 = (x as i64 - half).max(0) as usize;
        let y0 = (y as i64 - half).max(0) as usize;
        let x1 = (x as i64 + half + 1).min(w as i64) as usize;
        let y1 = (y as i64 + half + 1).min(h as i64) as usize;
        let area = ((x1 - x0) * (y1 - y0)) as i64;
        let sum = (integral[y1 * iw + x1] + integral[y0 * iw + x0]
            - integral[y0 * iw + x1]
            - integral[y1 * iw + x0]) as i64;
        let mean = sum / area.max(1);
        let v = gray.get_pixel(x, y).0[0] as i64;
        if dark_content {
            v + (c as i64) < mean
        } else {
            v > mean + c as i64
        }
    })
}

/// A connected foreground region: bounding box plus filled pixel count.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Region {
    pub bbox: Rect,
    pub pixels: u32,
}

/// Count the pixels a component encloses within its bounding box: its own
/// pixels plus any holes unreachable from the box frame. This mirrors the
/// area an external contour trace would report, so a border-only card counts
/// its full face.
pub(crate) fn enclosed_pixels(mask: &Mask, bbox: &Rect) -> u32 {
    let (bw, bh) = (bbox.w, bbox.h);
    let total = (bw as usize) * (bh as usize);
    let mut outside = vec![false; total];
    let mut queue = std::collections::VecDeque::new();

    let local = |x: u32, y: u32| (y * bw + x) as usize;
    let is_fg = |x: u32, y: u32| mask.get(bbox.x + x, bbox.y + y);

    // Seed the background flood from every frame cell.
    for x in 0..bw {
        for y in [0, bh - 1] {
            if !is_fg(x, y) && !outside[local(x, y)] {
                outside[local(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }
    for y in 0..bh {
        for x in [0, bw - 1] {
            if !is_fg(x, y) && !outside[local(x, y)] {
                outside[local(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }

    let mut outside_count = queue.len() as u32;
    while let Some((x, y)) = queue.pop_front() {
        let mut neighbors = [None; 4];
        if x > 0 {
            neighbors[0] = Some((x - 1, y));
        }
        if x + 1 < bw {
            neighbors[1] = Some((x + 1, y));
        }
        if y > 0 {
            neighbors[2] = Some((x, y - 1));
        }
        if y + 1 < bh {
            neighbors[3] = Some((x, y + 1));
        }
        for (nx, ny) in neighbors.into_iter().flatten() {
            if !is_fg(nx, ny) && !outside[local(nx, ny)] {
                outside[local(nx, ny)] = true;
                outside_count += 1;
                queue.push_back((nx, ny));
            }
        }
    }

    (total as u32).saturating_sub(outside_count)
}

/// Extract 4-connected foreground components via BFS over the flat buffer,
/// dropping components below `min_pixels`. Output is in reading order.
pub(crate) fn connected_components(mask: &Mask, min_pixels: u32) -> Vec<Region> {
    let (w, h) = (mask.w, mask.h);
    let total = (w * h) as usize;
    let mut visited = vec![false; total];
    let mut regions = Vec::new();
    let mut queue = std::collections::VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            let start = (y * w + x) as usize;
            if visited[start] || !mask.get(x, y) {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);

            let (mut minx, mut maxx, mut miny, mut maxy) = (x, x, y, y);
            let mut count = 0u32;

            while let Some(node) = queue.pop_front() {
                let cx = node as u32 % w;
                let cy = node as u32 / w;
                count += 1;
                minx = minx.min(cx);
                maxx = maxx.max(cx);
                miny = miny.min(cy);
                maxy = maxy.max(cy);

                if cx > 0 && mask.get(cx - 1, cy) && !visited[node - 1] {
                    visited[node - 1] = true;
                    queue.push_back(node - 1);
                }
                if cx + 1 < w && mask.get(cx + 1, cy) && !visited[node + 1] {
                    visited[node + 1] = true;
                    queue.push_back(node + 1);
                }
                if cy > 0 && mask.get(cx, cy - 1) && !visited[node - w as usize] {
                    visited[node - w as usize] = true;
                    queue.push_back(node - w as usize);
                }
                if cy + 1 < h && mask.get(cx, cy + 1) && !visited[node + w as usize] {
                    visited[node + w as usize] = true;
                    queue.push_back(node + w as usize);
                }
            }

            if count < min_pixels.max(1) {
                continue;
            }
            regions.push(Region {
                bbox: Rect::new(minx, miny, maxx - minx + 1, maxy - miny + 1),
                pixels: count,
            });
        }
    }

    regions.sort_by_key(|r| r.bbox.reading_order_key());
    regions
}
