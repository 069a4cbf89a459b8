/// Tuned constants for every detector, grouped in one immutable structure.
///
/// Defaults carry the empirically-tuned values; override individual fields
/// for reproducible testing. The block and button overlap thresholds are
/// deliberately asymmetric — unifying them changes observable behavior on
/// real screenshots.
#[derive(Debug, Clone)]
pub struct Thresholds {
    // Preprocessing
    /// Median grayscale value below which an image counts as dark-themed.
    pub dark_theme_median_luma: u8,
    /// Power-law exponent applied to dark-theme images before equalization.
    pub gamma: f64,
    /// Tile size for localized histogram equalization.
    pub equalize_tile_px: u32,
    /// Sobel gradient magnitude floor for the binary edge map.
    pub edge_magnitude_threshold: u16,

    // Blocks
    /// Minimum bounding-box area relative to image area.
    pub min_block_area_ratio: f64,
    /// Minimum block width in pixels.
    pub min_block_width_px: u32,
    /// Minimum block height in pixels.
    pub min_block_height_px: u32,
    /// Minimum filled-area / bounding-box-area ratio to keep a contour.
    pub min_rectangularity: f64,
    /// Rectangularity at or above which a non-section box counts as a card.
    pub card_rectangularity: f64,
    /// Width fraction of the image a section must span.
    pub section_width_frac: f64,
    /// Height fraction of the image a section must span.
    pub section_height_frac: f64,
    /// IoU ceiling for block deduplication.
    pub block_dedup_iou: f64,
    /// Modal pass: minimum quadrilateral area relative to image area.
    pub modal_min_area_ratio: f64,
    /// Modal pass: maximum quadrilateral area relative to image area.
    pub modal_max_area_ratio: f64,
    /// Modal pass: minimum width/height aspect.
    pub modal_min_aspect: f64,
    /// Modal pass: maximum width/height aspect.
    pub modal_max_aspect: f64,
    /// Modal pass: centroid must sit this fraction in from every image edge.
    pub modal_center_frac: f64,
    /// Modal pass: fraction of each bounding-box side that must be edge pixels.
    pub modal_side_coverage: f64,

    // Buttons
    /// Minimum proposal height in pixels.
    pub button_min_height_px: u32,
    /// Maximum proposal height in pixels.
    pub button_max_height_px: u32,
    /// Minimum width/height aspect.
    pub button_min_aspect: f64,
    /// Maximum width/height aspect; wider shapes are progress-bar suspects.
    pub button_max_aspect: f64,
    /// Relaxed aspect ceiling used by the contour fallback pass.
    pub button_relaxed_max_aspect: f64,
    /// Corner radius relative to height above which a proposal counts as rounded.
    pub button_corner_radius_ratio: f64,
    /// Half-width of the centered-text band, as a fraction of proposal width.
    pub button_text_band_x_frac: f64,
    /// Half-height of the centered-text band, as a fraction of proposal height.
    pub button_text_band_y_frac: f64,
    /// Text centered left of this width fraction counts as left-aligned.
    pub button_left_text_frac: f64,
    /// Mean interior saturation floor for the uniform-CTA-fill signal.
    pub cta_saturation_floor: f64,
    /// Saturation standard-deviation ceiling for the fill signal.
    pub cta_saturation_stddev_ceiling: f64,
    /// Value standard-deviation ceiling for the fill signal.
    pub cta_value_stddev_ceiling: f64,
    /// Interior-minus-ring mean brightness delta (luma levels) for the
    /// pop-against-background signal.
    pub button_pop_delta: f64,
    /// Width of the sampled ring around a proposal.
    pub button_ring_margin_px: u32,
    /// IoU ceiling within the region-proposal pass.
    pub button_proposal_iou: f64,
    /// IoU ceiling within the contour fallback pass.
    pub button_fallback_iou: f64,
    /// IoU ceiling for the final cross-pass merge.
    pub button_merge_iou: f64,
    /// The color-mask fallback engages below this candidate count.
    pub button_min_candidates: usize,
    /// Saturation floor for the CTA color mask.
    pub cta_mask_saturation_floor: f64,
    /// Value floor for the CTA color mask.
    pub cta_mask_value_floor: f64,
    /// Horizontal margin fraction excluded from the CTA central band.
    pub cta_band_x_frac: f64,
    /// Vertical margin fraction excluded from the CTA central band.
    pub cta_band_y_frac: f64,

    // Grid
    /// Smallest column count hypothesis.
    pub grid_min_cols: u32,
    /// Largest column count hypothesis.
    pub grid_max_cols: u32,
    /// Smallest gutter width hypothesis in pixels.
    pub grid_gutter_min_px: u32,
    /// Largest gutter width hypothesis in pixels.
    pub grid_gutter_max_px: u32,
    /// Gutter discretization step in pixels.
    pub grid_gutter_step_px: u32,
    /// Usability floor on implied column width.
    pub grid_min_column_px: u32,
    /// Minimum gutter edge density for a hypothesis to surface.
    pub grid_score_floor: f64,
    /// How many ranked candidates to retain alongside the best.
    pub grid_top_candidates: usize,

    // Palette
    /// Images wider than this are downsampled before clustering.
    pub palette_working_width: u32,
    /// Seed for deterministic k-means initialization.
    pub palette_seed: u64,
    /// Number of k-means restarts; the lowest-inertia run wins.
    pub palette_restarts: u32,
    /// Iteration cap per k-means run.
    pub palette_max_iterations: u32,

    // Contrast
    /// Minimum sampled pixels inside a text box after shrinking.
    pub min_contrast_sample_px: u32,
    /// Pixels shaved from each text-box edge before sampling.
    pub contrast_shrink_margin_px: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            dark_theme_median_luma: 90,
            gamma: 0.7,
            equalize_tile_px: 64,
            edge_magnitude_threshold: 40,

            min_block_area_ratio: 0.002,
            min_block_width_px: 24,
            min_block_height_px: 24,
            min_rectangularity: 0.55,
            card_rectangularity: 0.60,
            section_width_frac: 0.70,
            section_height_frac: 0.35,
            block_dedup_iou: 0.40,
            modal_min_area_ratio: 0.05,
            modal_max_area_ratio: 0.70,
            modal_min_aspect: 0.6,
            modal_max_aspect: 2.8,
            modal_center_frac: 0.25,
            modal_side_coverage: 0.5,

            button_min_height_px: 28,
            button_max_height_px: 80,
            button_min_aspect: 1.8,
            button_max_aspect: 6.0,
            button_relaxed_max_aspect: 8.0,
            button_corner_radius_ratio: 0.07,
            button_text_band_x_frac: 0.30,
            button_text_band_y_frac: 0.35,
            button_left_text_frac: 0.35,
            cta_saturation_floor: 0.35,
            cta_saturation_stddev_ceiling: 0.12,
            cta_value_stddev_ceiling: 0.14,
            button_pop_delta: 12.0,
            button_ring_margin_px: 6,
            button_proposal_iou: 0.35,
            button_fallback_iou: 0.30,
            button_merge_iou: 0.25,
            button_min_candidates: 1,
            cta_mask_saturation_floor: 0.45,
            cta_mask_value_floor: 0.35,
            cta_band_x_frac: 0.15,
            cta_band_y_frac: 0.20,

            grid_min_cols: 2,
            grid_max_cols: 6,
            grid_gutter_min_px: 8,
            grid_gutter_max_px: 48,
            grid_gutter_step_px: 4,
            grid_min_column_px: 80,
            grid_score_floor: 0.10,
            grid_top_candidates: 3,

            palette_working_width: 320,
            palette_seed: 0,
            palette_restarts: 3,
            palette_max_iterations: 20,

            min_contrast_sample_px: 1600,
            contrast_shrink_margin_px: 2,
        }
    }
}
