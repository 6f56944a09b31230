//! Integration tests for the end-to-end pipeline.
//!
//! Records are written to text files, loaded back and analysed; with the
//! `plotting` feature the four figures are rendered and inspected.

use mooring_rs::analysis::EdgePolicy;
use mooring_rs::io::{CtdRecord, VelocityRecord, write_ctd_file, write_velocity_file};
use mooring_rs::pipeline::{
    MooringAnalysis, PipelineConfig, PipelineError, load_ctd, load_velocity,
};
use mooring_rs::plot::FigureNaming;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::path::Path;
use tempfile::TempDir;

const M2_OMEGA: f64 = 2.0 * PI * 24.0 / 12.4206;

/// 15 days at 20-minute sampling, seconds since the epoch.
fn seconds() -> Vec<f64> {
    (0..15 * 72).map(|i| i as f64 * 1200.0).collect()
}

fn days(seconds: &[f64]) -> Vec<f64> {
    seconds.iter().map(|s| s / 86_400.0).collect()
}

fn write_records(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let time = seconds();
    let t = days(&time);
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.005).unwrap();

    let psal: Vec<f64> = t
        .iter()
        .map(|d| 34.8 + 0.2 * (M2_OMEGA * d - 0.7).cos() + noise.sample(&mut rng))
        .collect();
    let temp: Vec<f64> = t.iter().map(|d| 7.5 + 0.4 * (M2_OMEGA * d - 2.5).cos()).collect();
    let pres = vec![80.0; time.len()];
    let mut ctd = CtdRecord::new("Utsira", time.clone(), psal, temp, pres).with_position(4.8, 59.3);
    // A dropout and a spike, both removed by QC
    ctd.practical_salinity[100] = f64::NAN;
    ctd.temperature[200] = 99.0;

    let u: Vec<f64> = t
        .iter()
        .map(|d| 0.05 + 0.35 * (M2_OMEGA * d - 1.2).cos())
        .collect();
    let v: Vec<f64> = t
        .iter()
        .map(|d| -0.02 + 0.15 * (M2_OMEGA * d - 2.8).cos())
        .collect();
    let velocity = VelocityRecord::new("Utsira", time, u, v);

    let ctd_path = dir.join("ctd.txt");
    let vel_path = dir.join("vel.txt");
    write_ctd_file(&ctd_path, &ctd).unwrap();
    write_velocity_file(&vel_path, &velocity).unwrap();
    (ctd_path, vel_path)
}

#[test]
fn test_text_records_through_pipeline() {
    let dir = TempDir::new().unwrap();
    let (ctd_path, vel_path) = write_records(dir.path());

    let ctd = load_ctd(&ctd_path).unwrap();
    let velocity = load_velocity(&vel_path).unwrap();
    assert_eq!(ctd.station, "Utsira");
    assert_eq!(ctd.position, Some((4.8, 59.3)));

    let report = MooringAnalysis::new(PipelineConfig::new())
        .run(&ctd, &velocity)
        .unwrap();

    assert_eq!(report.ctd_qc.dropped(), 2);
    assert_eq!(report.velocity_qc.dropped(), 0);

    // SA scales PSAL by SSO/35, so the tidal phase is unchanged
    let sa = &report.salinity_fit.parameters;
    assert!((sa.phase - 0.7).abs() < 0.02, "SA phase {:.4}", sa.phase);
    assert!((sa.amplitude - 0.2 * 35.16504 / 35.0).abs() < 0.01);

    let u = &report.u_fit.parameters;
    assert!((u.amplitude - 0.35).abs() < 1e-4, "U amplitude {:.5}", u.amplitude);
    assert!((u.phase - 1.2).abs() < 1e-4, "U phase {:.5}", u.phase);
    let (mean_u, mean_v) = report.mean_flow();
    assert!((mean_u - 0.05).abs() < 1e-4);
    assert!((mean_v + 0.02).abs() < 1e-4);

    assert!(report.ellipse.semi_major >= report.ellipse.semi_minor.abs());
    assert!(report.ellipse.semi_major > 0.349);
}

#[test]
fn test_filter_longer_than_record_fails() {
    let dir = TempDir::new().unwrap();
    let (ctd_path, vel_path) = write_records(dir.path());
    let ctd = load_ctd(&ctd_path).unwrap();
    let velocity = load_velocity(&vel_path).unwrap();

    // 30 days of boxcar on 15 days of data
    let config = PipelineConfig::new()
        .with_filter_hours(720.0)
        .with_edge_policy(EdgePolicy::PadNearest);
    let err = MooringAnalysis::new(config)
        .run(&ctd, &velocity)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Filter(_)), "got {:?}", err);
}

/// Width and height from a PNG IHDR chunk.
#[cfg(feature = "plotting")]
fn png_size(bytes: &[u8]) -> (u32, u32) {
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n", "not a PNG file");
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    (width, height)
}

#[cfg(feature = "plotting")]
#[test]
fn test_figures_rendered() {
    let dir = TempDir::new().unwrap();
    let (ctd_path, vel_path) = write_records(dir.path());
    let ctd = load_ctd(&ctd_path).unwrap();
    let velocity = load_velocity(&vel_path).unwrap();

    let out = dir.path().join("figures");
    let config = PipelineConfig::new()
        .with_output_dir(&out)
        .with_naming(FigureNaming::new("Hansen", "Messfern").unwrap());
    let analysis = MooringAnalysis::new(config);
    let report = analysis.run(&ctd, &velocity).unwrap();
    let paths = analysis.render_figures(&report).unwrap();

    assert_eq!(paths.len(), 4);
    for (n, path) in paths.iter().enumerate() {
        let expected = format!("ex3fig{}-Hansen-Messfern.png", n + 1);
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);

        let bytes = std::fs::read(path).unwrap();
        let (width, height) = png_size(&bytes);
        assert!(width > 100 && height > 100, "{}: {}x{}", expected, width, height);
    }
}

#[cfg(feature = "plotting")]
#[test]
fn test_render_without_naming_fails() {
    let dir = TempDir::new().unwrap();
    let (ctd_path, vel_path) = write_records(dir.path());
    let ctd = load_ctd(&ctd_path).unwrap();
    let velocity = load_velocity(&vel_path).unwrap();

    let analysis = MooringAnalysis::new(PipelineConfig::new().with_output_dir(dir.path()));
    let report = analysis.run(&ctd, &velocity).unwrap();
    let err = analysis.render_figures(&report).unwrap_err();
    assert!(matches!(err, PipelineError::MissingNaming));
}
