use pdf_panels::*;

fn spec(height_ft: u32, bleed: Bleed) -> PanelSpec {
    PanelConfig::default().panel_spec("Ivy", Substrate::Traditional, height_ft, bleed)
}

#[test]
fn test_page_width_includes_bleed_on_both_sides() {
    let table = BleedTable::default();
    for bleed in [Bleed::Mm2, Bleed::Mm3] {
        let layout = TileLayout::compute(&spec(13, bleed), table.points(bleed), 3000, 2000).unwrap();
        let expected = 2.0 * 864.0 + 2.0 * table.points(bleed);
        assert!((layout.page_width - expected).abs() < 1e-9);
        assert_eq!(layout.page_height, 13.0 * 864.0);
    }
}

#[test]
fn test_tile_spans_full_page_width() {
    let layout = TileLayout::compute(&spec(13, Bleed::Mm2), 5.6693, 3000, 2000).unwrap();
    assert_eq!(layout.tile_px_width, 1740);
    assert!(layout.tile_px_width as f64 >= layout.page_width);
    // 2000 * 1740 / 3000
    assert_eq!(layout.tile_px_height, 1160);
}

#[test]
fn test_stack_always_covers_panel() {
    let sizes = [(64, 48), (1000, 3000), (4000, 500), (1740, 1404), (7, 11232)];
    for height_ft in [1, 9, 13, 27] {
        for bleed in [Bleed::Mm2, Bleed::Mm3] {
            for &(w, h) in &sizes {
                let points = BleedTable::default().points(bleed);
                let layout = TileLayout::compute(&spec(height_ft, bleed), points, w, h).unwrap();
                let tile_h = layout.tile_px_height as f64;

                assert!(layout.stack_height >= layout.page_height);
                assert!(layout.overshoot > 0.0);
                assert!(layout.overshoot <= tile_h + 1e-9);
                assert_eq!(
                    layout.stack_height,
                    layout.tile_count as f64 * tile_h
                );
                assert_eq!(
                    layout.tile_origin(layout.tile_count - 1),
                    layout.stack_height - tile_h
                );
            }
        }
    }
}

#[test]
fn test_exact_division_overshoots_by_one_tile() {
    // 11232 / 1404 = 8 tiles exactly, plus the extra one
    let layout = TileLayout::compute(&spec(13, Bleed::Mm2), 5.6693, 1740, 1404).unwrap();
    assert_eq!(layout.tile_px_height, 1404);
    assert_eq!(layout.tile_count, 9);
    assert_eq!(layout.overshoot, 1404.0);
}

#[test]
fn test_very_wide_image_keeps_one_pixel_tile() {
    let layout = TileLayout::compute(&spec(1, Bleed::Mm2), 5.6693, 100_000, 1).unwrap();
    assert_eq!(layout.tile_px_height, 1);
    assert_eq!(layout.tile_count, 865);
}

#[test]
fn test_invalid_inputs_rejected() {
    assert!(TileLayout::compute(&spec(13, Bleed::Mm2), 5.6693, 0, 100).is_err());
    assert!(TileLayout::compute(&spec(13, Bleed::Mm2), -1.0, 100, 100).is_err());

    let mut zero = spec(13, Bleed::Mm2);
    zero.height_ft = 0;
    assert!(matches!(
        TileLayout::compute(&zero, 5.6693, 100, 100),
        Err(PanelError::Config(_))
    ));
}

#[test]
fn test_design_name_with_path_separator_rejected() {
    for name in ["Ivy/Leaf", "Ivy\\Leaf", "../Ivy"] {
        let mut panel = spec(13, Bleed::Mm2);
        panel.design_name = name.to_string();
        assert!(matches!(panel.validate(), Err(PanelError::Config(_))), "{}", name);
        assert!(plan_batch((3000, 2000), name, &PanelConfig::default()).is_err());
    }
    assert!(validate_design_name("Ivy Leaf").is_ok());
    assert!(validate_design_name("   ").is_err());
}

#[test]
fn test_resolution_check() {
    let panel = spec(13, Bleed::Mm2);
    let check = check_resolution(3000, 2000, &panel);
    assert_eq!(check.required_width, 2 * 12 * 1200);
    assert_eq!(check.required_height, 13 * 12 * 1200);
    assert!(check.is_undersized());

    let check = check_resolution(28_800, 187_200, &panel);
    assert!(!check.is_undersized());
}

#[test]
fn test_output_file_name() {
    assert_eq!(
        output_file_name("Ivy", Substrate::PeelAndStick, 27, Bleed::Mm3),
        "Ivy_P&S_27ft_3mm.pdf"
    );
    assert_eq!(spec(13, Bleed::Mm2).output_file_name(), "Ivy_TRAD_13ft_2mm.pdf");
    assert_eq!(spec(13, Bleed::Mm2).height_label(), "13ft\"");
}

#[test]
fn test_plan_matches_combinations() {
    let config = PanelConfig::default();
    let plans = plan_batch((3000, 2000), "Ivy", &config).unwrap();
    assert_eq!(plans.len(), 12);

    let tall = plans.iter().find(|p| p.spec.height_ft == 27).unwrap();
    assert_eq!(tall.tier, HeightTier::Tall);
    assert_eq!(tall.strategy, FooterStrategy::VectorMerge);

    let standard = plans.iter().find(|p| p.spec.height_ft == 13).unwrap();
    assert_eq!(standard.tier, HeightTier::Standard);
    assert_eq!(standard.strategy, FooterStrategy::VectorOverlay);
    assert_eq!(
        standard.output_path,
        config.output_dir.join("Ivy_TRAD_13ft_2mm.pdf")
    );
}

#[test]
fn test_bleed_table_matches_millimeters() {
    use pdf_panels::constants::{BLEED_2MM_POINTS, BLEED_3MM_POINTS, mm_to_pt};
    assert!((mm_to_pt(2.0) - BLEED_2MM_POINTS).abs() < 1e-4);
    assert!((mm_to_pt(3.0) - BLEED_3MM_POINTS).abs() < 1e-4);
}

#[test]
fn test_layout_is_deterministic() {
    let panel = spec(27, Bleed::Mm3);
    let a = TileLayout::compute(&panel, 8.5039, 4000, 6000).unwrap();
    let b = TileLayout::compute(&panel, 8.5039, 4000, 6000).unwrap();
    assert_eq!(a, b);
}
