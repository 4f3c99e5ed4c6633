mod common;

use common::*;
use image::{DynamicImage, GrayImage, Luma};
use micromet::analysis::inclusion::{
    InclusionAnalyzer, InclusionMethod, InclusionParams, InclusionType, Thickness,
};
use micromet::AnalysisError;

#[test]
fn method_c_separates_oxides_from_silicates() {
    // Bright features on a dark matrix so the Otsu split lands between.
    let mut img = GrayImage::from_pixel(200, 200, Luma([0]));
    draw_circle(&mut img, 60, 60, 10, 255);
    draw_rect(&mut img, 120, 140, 40, 4, 255);
    let image = DynamicImage::ImageLuma8(img);

    let params = InclusionParams {
        method: InclusionMethod::MethodC,
        ..Default::default()
    };
    let report = InclusionAnalyzer::new().analyze(&image, &params).unwrap();

    assert_eq!(report.measurements.len(), 2);
    let oxide = report
        .measurements
        .iter()
        .find(|m| m.inclusion_type == InclusionType::D)
        .expect("round inclusion rated D");
    assert!(oxide.measurement.circularity >= 0.7);
    assert_eq!(oxide.thickness, Thickness::Thick);

    let silicate = report
        .measurements
        .iter()
        .find(|m| m.inclusion_type == InclusionType::C)
        .expect("elongated inclusion rated C");
    assert!(silicate.measurement.circularity < 0.7);

    assert_eq!(report.counts.d.thick, 1);
    assert_eq!(report.counts.c.thin + report.counts.c.thick, 1);
    assert_eq!(report.counts.a.thin + report.counts.a.thick, 0);
    assert_eq!(report.counts.b.thin + report.counts.b.thick, 0);
}

#[test]
fn default_method_picks_out_locally_dark_inclusions() {
    let mut img = GrayImage::from_pixel(120, 120, Luma([200]));
    draw_circle(&mut img, 60, 60, 5, 20);
    let image = DynamicImage::ImageLuma8(img);

    let report = InclusionAnalyzer::new()
        .analyze(&image, &InclusionParams::default())
        .unwrap();
    assert_eq!(report.measurements.len(), 1);
    let m = &report.measurements[0];
    assert_eq!(m.inclusion_type, InclusionType::D);
    assert_eq!(m.thickness, Thickness::Thin);
}

#[test]
fn thickness_splits_on_calibrated_area() {
    let mut img = GrayImage::from_pixel(200, 200, Luma([0]));
    draw_circle(&mut img, 100, 100, 10, 255);
    let image = DynamicImage::ImageLuma8(img);

    let params = InclusionParams {
        method: InclusionMethod::MethodC,
        ..Default::default()
    };

    // ~314 px^2 at unity calibration: thick.
    let report = InclusionAnalyzer::new().analyze(&image, &params).unwrap();
    assert_eq!(report.measurements[0].thickness, Thickness::Thick);

    // Shrink the calibration until the same feature rates thin.
    let mut analyzer = InclusionAnalyzer::new();
    analyzer.set_calibration(0.5).unwrap();
    let report = analyzer.analyze(&image, &params).unwrap();
    assert_eq!(report.measurements[0].thickness, Thickness::Thin);
}

#[test]
fn report_echoes_specimen_metadata() {
    let mut img = GrayImage::from_pixel(100, 100, Luma([0]));
    draw_circle(&mut img, 50, 50, 8, 255);
    let image = DynamicImage::ImageLuma8(img);

    let params = InclusionParams {
        method: InclusionMethod::MethodC,
        specimen_number: 7,
        field_area: 0.25,
        ..Default::default()
    };
    let report = InclusionAnalyzer::new().analyze(&image, &params).unwrap();
    assert_eq!(report.specimen_number, 7);
    assert_eq!(report.field_area, 0.25);
}

#[test]
fn rated_inclusions_carry_dense_one_based_ids() {
    let mut img = GrayImage::from_pixel(200, 200, Luma([0]));
    draw_circle(&mut img, 60, 60, 10, 255);
    draw_rect(&mut img, 120, 140, 40, 4, 255);
    let image = DynamicImage::ImageLuma8(img);

    let params = InclusionParams {
        method: InclusionMethod::MethodC,
        ..Default::default()
    };
    let report = InclusionAnalyzer::new().analyze(&image, &params).unwrap();

    let mut ids: Vec<u32> = report.measurements.iter().map(|m| m.measurement.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn uniform_field_reports_no_results() {
    let image = blank(100, 100, 128);
    let err = InclusionAnalyzer::new()
        .analyze(&image, &InclusionParams::default())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::NoResults { .. }));
}
