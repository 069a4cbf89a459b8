use image::RgbImage;
use uiscan::{
    AnalysisModes, BlockKind, OcrBackend, OcrError, Rect, ScreenAnalyzer, TextLine, ThemeMode,
    UiScanError,
};

fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, image::Rgb(color))
}

fn fill(img: &mut RgbImage, r: Rect, color: [u8; 3]) {
    for y in r.y..r.bottom() {
        for x in r.x..r.right() {
            img.put_pixel(x, y, image::Rgb(color));
        }
    }
}

/// Paint a rounded rectangle; pixels outside the corner arcs keep the
/// background.
fn fill_rounded(img: &mut RgbImage, r: Rect, radius: u32, color: [u8; 3]) {
    let rad = radius as f64;
    for y in r.y..r.bottom() {
        for x in r.x..r.right() {
            let lx = (x - r.x) as f64;
            let ly = (y - r.y) as f64;
            let rx = (r.right() - 1 - x) as f64;
            let ry = (r.bottom() - 1 - y) as f64;
            let corner = |cx: f64, cy: f64| {
                cx < rad && cy < rad && {
                    let dx = rad - cx;
                    let dy = rad - cy;
                    dx * dx + dy * dy > rad * rad
                }
            };
            if corner(lx, ly) || corner(rx, ly) || corner(lx, ry) || corner(rx, ry) {
                continue;
            }
            img.put_pixel(x, y, image::Rgb(color));
        }
    }
}

struct StubOcr {
    lines: Vec<TextLine>,
}

impl OcrBackend for StubOcr {
    fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextLine>, OcrError> {
        Ok(self.lines.clone())
    }
}

fn analyze(img: RgbImage, lines: Vec<TextLine>) -> uiscan::AnalysisReport {
    ScreenAnalyzer::from_image(img)
        .unwrap()
        .ocr_backend(Box::new(StubOcr { lines }))
        .analyze()
        .unwrap()
}

#[test]
fn light_card_scenario_yields_exactly_one_card_block() {
    let mut img = solid(800, 600, [245, 245, 245]);
    fill(&mut img, Rect::new(250, 200, 300, 200), [60, 90, 200]);

    let report = analyze(img, Vec::new());
    assert_eq!(report.blocks.len(), 1, "blocks: {:?}", report.blocks);
    assert_eq!(report.blocks[0].kind, BlockKind::Card);
    assert_eq!(report.blocks[0].id, "blocks.b0");
}

#[test]
fn rounded_cta_scenario_matches_text_line() {
    let mut img = solid(400, 200, [245, 245, 245]);
    fill_rounded(&mut img, Rect::new(125, 80, 150, 44), 10, [30, 110, 225]);
    let lines = vec![TextLine {
        text: "Sign up".into(),
        bbox: Rect::new(165, 94, 70, 16),
        confidence: 0.95,
    }];

    let report = analyze(img, lines);
    assert_eq!(report.buttons.len(), 1, "buttons: {:?}", report.buttons);
    let button = &report.buttons[0];
    assert!(button.corner_radius > 0, "expected rounded corners");
    assert!(button.has_center_text);
    assert_eq!(button.text_id.as_deref(), Some("texts.t0"));
    assert_eq!(button.id, "buttons.btn0");
}

#[test]
fn blank_image_yields_empty_sections() {
    let report = analyze(solid(640, 480, [250, 250, 250]), Vec::new());
    assert!(report.blocks.is_empty());
    assert!(report.buttons.is_empty());
    assert!(report.grid.is_none());
    assert!(report.texts.is_empty());
    assert!(report.contrast.is_empty());
    assert!(report.metrics.is_none());
    // Palette still runs on a blank image.
    let palette = report.palette.expect("palette should be present");
    assert_eq!(palette.mode, ThemeMode::Light);
}

#[test]
fn dark_theme_card_is_recovered_by_enhancement() {
    let mut img = solid(800, 600, [16, 16, 20]);
    fill(&mut img, Rect::new(250, 200, 300, 200), [60, 60, 75]);

    let report = analyze(img, Vec::new());
    assert_eq!(report.blocks.len(), 1, "blocks: {:?}", report.blocks);
    assert_eq!(report.blocks[0].kind, BlockKind::Card);
    let palette = report.palette.expect("palette should be present");
    assert_eq!(palette.mode, ThemeMode::Dark);
}

#[test]
fn modal_on_gradient_backdrop_is_recovered() {
    // A vertical luminance gradient defeats any single global threshold; the
    // modal must survive via local signals (adaptive pass or the central
    // quadrilateral pass).
    let mut img = RgbImage::new(800, 600);
    for (_, y, p) in img.enumerate_pixels_mut() {
        let v = (60 + y * 160 / 600) as u8;
        *p = image::Rgb([v, v, v]);
    }
    let modal = Rect::new(250, 200, 300, 200);
    fill(&mut img, modal, [240, 240, 240]);

    let report = analyze(img, Vec::new());
    assert!(
        report
            .blocks
            .iter()
            .any(|b| b.bbox.iou(&modal) > 0.5),
        "modal lost: {:?}",
        report.blocks
    );
}

#[test]
fn three_column_layout_produces_a_grid_hypothesis() {
    let mut img = solid(588, 400, [250, 250, 250]);
    for col in 0..3u32 {
        let x0 = col * (180 + 24);
        fill(&mut img, Rect::new(x0, 0, 180, 400), [80, 80, 90]);
    }

    let report = analyze(img, Vec::new());
    let grid = report.grid.expect("expected a grid hypothesis");
    assert_eq!(grid.cols, 3);
    assert!(grid.confidence > 0.0 && grid.confidence <= 1.0);
}

#[test]
fn all_rects_lie_within_image_bounds() {
    let mut img = solid(800, 600, [245, 245, 245]);
    fill(&mut img, Rect::new(0, 0, 800, 240), [30, 30, 40]);
    fill(&mut img, Rect::new(60, 300, 250, 160), [60, 90, 200]);
    fill_rounded(&mut img, Rect::new(400, 320, 160, 44), 8, [225, 60, 40]);
    let lines = vec![
        TextLine {
            text: "Heading".into(),
            bbox: Rect::new(80, 40, 300, 40),
            confidence: 0.98,
        },
        TextLine {
            text: "Body copy".into(),
            bbox: Rect::new(80, 110, 420, 60),
            confidence: 0.92,
        },
    ];

    let report = analyze(img, lines);
    let (w, h) = (report.image.w, report.image.h);
    let check = |r: &Rect| {
        assert!(r.w > 0 && r.h > 0, "degenerate rect {r:?}");
        assert!(r.right() <= w && r.bottom() <= h, "out of bounds {r:?}");
    };
    report.blocks.iter().for_each(|b| check(&b.bbox));
    report.buttons.iter().for_each(|b| check(&b.bbox));
    report.texts.iter().for_each(|t| check(&t.bbox));
}

#[test]
fn entity_sequences_are_in_reading_order() {
    let mut img = solid(800, 600, [245, 245, 245]);
    fill(&mut img, Rect::new(420, 330, 220, 150), [40, 40, 60]);
    fill(&mut img, Rect::new(60, 60, 220, 150), [40, 40, 60]);
    fill(&mut img, Rect::new(60, 330, 220, 150), [40, 40, 60]);

    let report = analyze(img, Vec::new());
    assert!(report.blocks.len() >= 2);
    for pair in report.blocks.windows(2) {
        let a = (pair[0].bbox.y, pair[0].bbox.x);
        let b = (pair[1].bbox.y, pair[1].bbox.x);
        assert!(a <= b, "blocks out of reading order: {pair:?}");
    }
}

#[test]
fn repeated_analysis_is_byte_identical() {
    let mut img = solid(800, 600, [248, 248, 250]);
    fill(&mut img, Rect::new(100, 120, 280, 180), [70, 100, 210]);
    fill_rounded(&mut img, Rect::new(480, 400, 180, 48), 9, [220, 70, 50]);
    let lines = vec![
        TextLine {
            text: "Welcome back".into(),
            bbox: Rect::new(120, 140, 200, 28),
            confidence: 0.97,
        },
        TextLine {
            text: "Continue".into(),
            bbox: Rect::new(520, 414, 100, 20),
            confidence: 0.94,
        },
    ];

    let run = || {
        let report = analyze(img.clone(), lines.clone());
        serde_json::to_string(&report).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn contrast_and_spacing_follow_text_lines() {
    let mut img = solid(600, 400, [255, 255, 255]);
    // Dark glyph strokes inside each line's box.
    for (y0, x0) in [(60u32, 40u32), (140, 40), (220, 40)] {
        for y in y0 + 10..y0 + 26 {
            for x in (x0 + 10..x0 + 290).step_by(3) {
                img.put_pixel(x, y, image::Rgb([10, 10, 10]));
            }
        }
    }
    let lines = vec![
        TextLine {
            text: "First line".into(),
            bbox: Rect::new(40, 60, 300, 36),
            confidence: 0.99,
        },
        TextLine {
            text: "Second line".into(),
            bbox: Rect::new(40, 140, 300, 36),
            confidence: 0.99,
        },
        TextLine {
            text: "Third line".into(),
            bbox: Rect::new(40, 220, 300, 36),
            confidence: 0.99,
        },
    ];

    let report = analyze(img, lines);
    assert_eq!(report.contrast.len(), 3);
    for item in &report.contrast {
        assert!(item.ratio >= 1.0);
    }
    assert_eq!(report.contrast[0].text_id, "texts.t0");

    let metrics = report.metrics.expect("metrics should be present");
    // Lines at y 60/140/220 with height 36: gaps of 44px.
    assert_eq!(metrics.median_v_space, 44);
    assert_eq!(metrics.left_edge_variance_px, 0.0);
}

#[test]
fn ocr_failure_does_not_masquerade_as_empty_text() {
    struct DownBackend;
    impl OcrBackend for DownBackend {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextLine>, OcrError> {
            Err(OcrError::Unavailable("backend offline".into()))
        }
    }

    let result = ScreenAnalyzer::from_image(solid(100, 100, [200, 200, 200]))
        .unwrap()
        .ocr_backend(Box::new(DownBackend))
        .analyze();
    assert!(matches!(result, Err(UiScanError::Ocr(_))));
}

#[test]
fn modes_restrict_the_report_sections() {
    let mut img = solid(400, 300, [245, 245, 245]);
    fill(&mut img, Rect::new(80, 80, 200, 120), [60, 90, 200]);

    let report = ScreenAnalyzer::from_image(img)
        .unwrap()
        .modes(AnalysisModes {
            ocr: false,
            geometry: true,
            contrast: true,
            palette: false,
        })
        .analyze()
        .unwrap();
    assert!(report.palette.is_none());
    assert!(!report.blocks.is_empty());
    assert!(report.texts.is_empty());
}
