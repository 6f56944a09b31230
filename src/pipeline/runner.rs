//! Mooring analysis runner.

use std::fmt;
#[cfg(feature = "plotting")]
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::{PipelineConfig, PipelineError};
use crate::analysis::{
    BoxcarFilter, CurrentPoint, CurrentTimeSeries, FitError, HarmonicFit, HarmonicFitter, QcReport,
    QualityControl, TidalEllipse, TimeSeries, combine_masks, normalize_to_days,
    sampling_interval_seconds,
};
use crate::equations::{ConstantAnomaly, SalinityAnomaly, Teos10};
use crate::io::{CtdRecord, VelocityRecord};

/// Row-wise quality control outcome for one record.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordQc {
    /// Rows in the record
    pub total: usize,
    /// Rows where every variable passed
    pub kept: usize,
    /// Per-variable reports, in column order
    pub variables: Vec<(&'static str, QcReport)>,
}

impl RecordQc {
    /// Rows dropped because at least one variable failed.
    pub fn dropped(&self) -> usize {
        self.total - self.kept
    }
}

/// Everything computed by [`MooringAnalysis::run`].
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    /// Station name of the CTD record
    pub station: String,
    /// Mooring position (longitude, latitude)
    pub position: (f64, f64),
    /// Timestamp of the first CTD sample
    pub start: Option<NaiveDateTime>,
    /// CTD row QC
    pub ctd_qc: RecordQc,
    /// Velocity row QC
    pub velocity_qc: RecordQc,
    /// Absolute salinity (g/kg), time in days
    pub absolute_salinity: TimeSeries,
    /// Conservative temperature (°C), time in days
    pub conservative_temperature: TimeSeries,
    /// M2 fit of absolute salinity
    pub salinity_fit: HarmonicFit,
    /// M2 fit of conservative temperature
    pub temperature_fit: HarmonicFit,
    /// Boxcar-filtered absolute salinity
    pub filtered_salinity: TimeSeries,
    /// Boxcar window in samples
    pub filter_window: usize,
    /// Boxcar window in hours
    pub filter_hours: f64,
    /// Quality-controlled currents, time in days
    pub currents: CurrentTimeSeries,
    /// M2 fit of the eastward component
    pub u_fit: HarmonicFit,
    /// M2 fit of the northward component
    pub v_fit: HarmonicFit,
    /// Tidal current ellipse
    pub ellipse: TidalEllipse,
}

impl AnalysisReport {
    /// Residual mean flow (U, V) from the fit offsets.
    pub fn mean_flow(&self) -> (f64, f64) {
        (
            self.u_fit.parameters.offset,
            self.v_fit.parameters.offset,
        )
    }

    /// Direction the residual mean flow heads towards, degrees clockwise
    /// from North.
    pub fn mean_flow_direction(&self) -> f64 {
        let (u, v) = self.mean_flow();
        CurrentPoint::new(0.0, u, v).direction_oceanographic()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lon, lat) = self.position;
        writeln!(f, "Station {} ({:.4}°E, {:.4}°N)", self.station, lon, lat)?;
        if let Some(start) = self.start {
            writeln!(f, "  start:            {}", start)?;
        }
        writeln!(
            f,
            "  CTD rows:         {} kept of {}",
            self.ctd_qc.kept, self.ctd_qc.total
        )?;
        writeln!(
            f,
            "  velocity rows:    {} kept of {}",
            self.velocity_qc.kept, self.velocity_qc.total
        )?;

        let rows = [
            ("SA (g/kg)", &self.salinity_fit),
            ("CT (°C)", &self.temperature_fit),
            ("U (m/s)", &self.u_fit),
            ("V (m/s)", &self.v_fit),
        ];
        writeln!(
            f,
            "  {:<10} {:>10} {:>10} {:>10} {:>8}",
            "M2 fit", "amplitude", "phase(°)", "offset", "R²"
        )?;
        for (label, fit) in rows {
            let p = &fit.parameters;
            writeln!(
                f,
                "  {:<10} {:>10.4} {:>10.2} {:>10.4} {:>8.3}",
                label,
                p.amplitude,
                p.phase_degrees(),
                p.offset,
                fit.r_squared
            )?;
        }

        let (mean_u, mean_v) = self.mean_flow();
        writeln!(
            f,
            "  currents:         {:.2} days, mean speed {:.4} m/s, mean flow {:.4} m/s towards {:.0}°",
            self.currents.duration(),
            self.currents.mean_speed(),
            mean_u.hypot(mean_v),
            self.mean_flow_direction()
        )?;

        let e = &self.ellipse;
        writeln!(
            f,
            "  ellipse:          major {:.4} m/s, minor {:.4} m/s, inclination {:.1}°, phase {:.1}°, {:?}",
            e.semi_major,
            e.semi_minor,
            e.inclination_degrees(),
            e.phase_degrees(),
            e.rotation()
        )?;
        write!(
            f,
            "  boxcar:           {} samples ({:.1} h), {} points out",
            self.filter_window,
            self.filter_hours,
            self.filtered_salinity.len()
        )
    }
}

/// Analysis of one mooring: a CTD record and a current meter record.
///
/// # Example
///
/// ```ignore
/// use mooring_rs::pipeline::{MooringAnalysis, PipelineConfig};
///
/// let analysis = MooringAnalysis::new(PipelineConfig::new());
/// let report = analysis.run(&ctd, &velocity)?;
/// println!("{}", report);
/// ```
#[derive(Clone, Debug)]
pub struct MooringAnalysis<A: SalinityAnomaly = ConstantAnomaly> {
    config: PipelineConfig,
    teos: Teos10<A>,
}

impl MooringAnalysis {
    /// Analysis with the constant salinity anomaly from `config.saar`.
    pub fn new(config: PipelineConfig) -> Self {
        let anomaly = ConstantAnomaly(config.saar);
        Self::with_anomaly(config, anomaly)
    }
}

impl<A: SalinityAnomaly> MooringAnalysis<A> {
    /// Analysis with a custom salinity anomaly source.
    pub fn with_anomaly(config: PipelineConfig, anomaly: A) -> Self {
        Self {
            config,
            teos: Teos10::with_anomaly(anomaly),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn fitter(&self) -> HarmonicFitter {
        HarmonicFitter::with_period_hours(self.config.period_hours)
            .with_max_iterations(self.config.max_iterations)
            .with_initial_guess(self.config.initial_guess)
    }

    /// Run every analysis step on a pair of records.
    ///
    /// # Errors
    ///
    /// Any failing step aborts the run: an unusable time coordinate, a
    /// missing position, a fit that does not converge, or a filter longer
    /// than the quality-controlled record.
    pub fn run(
        &self,
        ctd: &CtdRecord,
        velocity: &VelocityRecord,
    ) -> Result<AnalysisReport, PipelineError> {
        let (longitude, latitude) = ctd
            .position
            .or(velocity.position)
            .ok_or_else(|| PipelineError::MissingPosition(ctd.station.clone()))?;
        info!(
            station = %ctd.station,
            longitude,
            latitude,
            ctd_samples = ctd.len(),
            velocity_samples = velocity.len(),
            "Starting mooring analysis"
        );

        let qc = &self.config.qc;

        // CTD: time, QC, TEOS-10
        let ctd_days = normalize_to_days(&ctd.time)?;
        let (ctd_keep, ctd_qc) = row_mask(&[
            ("PSAL", &qc.salinity, ctd.practical_salinity.as_slice()),
            ("TEMP", &qc.temperature, ctd.temperature.as_slice()),
            ("PRES", &qc.pressure, ctd.pressure.as_slice()),
        ]);
        log_row_qc("CTD", &ctd_qc);

        let days = select(&ctd_days, &ctd_keep);
        let seconds = select(&ctd.time, &ctd_keep);
        let sp = select(&ctd.practical_salinity, &ctd_keep);
        let t = select(&ctd.temperature, &ctd_keep);
        let p = select(&ctd.pressure, &ctd_keep);

        let sa = self.teos.absolute_salinity(&sp, &p, longitude, latitude)?;
        let ct = self.teos.conservative_temperature(&sa, &t, &p)?;
        let absolute_salinity = TimeSeries::new(&days, &sa)
            .with_location(longitude, latitude)
            .with_name(format!("{} SA", ctd.station));
        let conservative_temperature = TimeSeries::new(&days, &ct)
            .with_location(longitude, latitude)
            .with_name(format!("{} CT", ctd.station));
        info!(
            mean_sa = absolute_salinity.mean(),
            mean_ct = conservative_temperature.mean(),
            "Converted to TEOS-10"
        );

        let fitter = self.fitter();
        let salinity_fit = fit_named(&fitter, &absolute_salinity, "absolute salinity")?;
        let temperature_fit =
            fit_named(&fitter, &conservative_temperature, "conservative temperature")?;

        // Boxcar on the QC'd sample sequence
        let interval_hours = sampling_interval_seconds(&seconds)? / 3600.0;
        let filter = BoxcarFilter::from_hours(self.config.filter_hours, interval_hours)?
            .with_edge_policy(self.config.edge_policy);
        let filtered_salinity = filter.apply(&absolute_salinity)?;
        let filter_hours = filter.window() as f64 * interval_hours;
        info!(
            window = filter.window(),
            interval_hours,
            edge_policy = ?filter.edge_policy(),
            "Filtered absolute salinity"
        );

        // Currents
        let velocity_days = normalize_to_days(&velocity.time)?;
        let (vel_keep, velocity_qc) = row_mask(&[
            ("UVEL", &qc.velocity, velocity.u.as_slice()),
            ("VVEL", &qc.velocity, velocity.v.as_slice()),
        ]);
        log_row_qc("velocity", &velocity_qc);

        let currents = CurrentTimeSeries::new(
            &select(&velocity_days, &vel_keep),
            &select(&velocity.u, &vel_keep),
            &select(&velocity.v, &vel_keep),
        )
        .with_location(longitude, latitude)
        .with_name(velocity.station.clone());

        let (u_fit, v_fit) = self.fit_components(&fitter, &currents)?;
        let ellipse = TidalEllipse::from_fits(&u_fit.parameters, &v_fit.parameters)?;
        info!(
            semi_major = ellipse.semi_major,
            semi_minor = ellipse.semi_minor,
            inclination_deg = ellipse.inclination_degrees(),
            "Derived tidal ellipse"
        );

        Ok(AnalysisReport {
            station: ctd.station.clone(),
            position: (longitude, latitude),
            start: ctd.start(),
            ctd_qc,
            velocity_qc,
            absolute_salinity,
            conservative_temperature,
            salinity_fit,
            temperature_fit,
            filtered_salinity,
            filter_window: filter.window(),
            filter_hours,
            currents,
            u_fit,
            v_fit,
            ellipse,
        })
    }

    /// Fit U and V.
    #[cfg(not(feature = "parallel"))]
    fn fit_components(
        &self,
        fitter: &HarmonicFitter,
        currents: &CurrentTimeSeries,
    ) -> Result<(HarmonicFit, HarmonicFit), PipelineError> {
        let u_fit = fit_named(fitter, &currents.u_series(), "U velocity")?;
        let v_fit = fit_named(fitter, &currents.v_series(), "V velocity")?;
        Ok((u_fit, v_fit))
    }

    /// Fit U and V concurrently.
    #[cfg(feature = "parallel")]
    fn fit_components(
        &self,
        fitter: &HarmonicFitter,
        currents: &CurrentTimeSeries,
    ) -> Result<(HarmonicFit, HarmonicFit), PipelineError> {
        let (u, v) = (currents.u_series(), currents.v_series());
        let (u_fit, v_fit) = rayon::join(|| fitter.fit(&u), || fitter.fit(&v));
        Ok((
            checked_fit(u_fit, "U velocity")?,
            checked_fit(v_fit, "V velocity")?,
        ))
    }

    /// Write the four figures for a finished analysis.
    ///
    /// Returns the written paths in figure order.
    #[cfg(feature = "plotting")]
    pub fn render_figures(&self, report: &AnalysisReport) -> Result<Vec<PathBuf>, PipelineError> {
        use crate::plot::{
            Figure, PlotError, plot_ctd_fit, plot_filtering, plot_tidal_ellipse, plot_velocity_fit,
        };

        let naming = self
            .config
            .naming
            .as_ref()
            .ok_or(PipelineError::MissingNaming)?;
        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(PlotError::from)?;

        let paths: Vec<PathBuf> = Figure::ALL
            .iter()
            .map(|&figure| naming.path_in(dir, figure))
            .collect();

        plot_ctd_fit(&paths[0], &report.absolute_salinity, &report.salinity_fit)?;
        plot_velocity_fit(
            &paths[1],
            &report.currents.u_series(),
            &report.u_fit,
            &report.currents.v_series(),
            &report.v_fit,
        )?;
        plot_tidal_ellipse(
            &paths[2],
            &report.currents,
            &report.ellipse,
            report.mean_flow(),
        )?;
        plot_filtering(
            &paths[3],
            &report.absolute_salinity,
            &report.filtered_salinity,
            report.filter_hours,
        )?;

        for path in &paths {
            info!(path = %path.display(), "Wrote figure");
        }
        Ok(paths)
    }
}

fn fit_named(
    fitter: &HarmonicFitter,
    series: &TimeSeries,
    label: &'static str,
) -> Result<HarmonicFit, PipelineError> {
    checked_fit(fitter.fit(series), label)
}

fn checked_fit(
    result: Result<HarmonicFit, FitError>,
    label: &'static str,
) -> Result<HarmonicFit, PipelineError> {
    let fit = result.map_err(|source| PipelineError::Fit {
        series: label,
        source,
    })?;
    let p = &fit.parameters;
    info!(
        series = label,
        amplitude = p.amplitude,
        phase_deg = p.phase_degrees(),
        offset = p.offset,
        r_squared = fit.r_squared,
        iterations = fit.iterations,
        "Fitted M2 harmonic"
    );
    Ok(fit)
}

/// Keep a row only if every variable passes its QC.
fn row_mask(columns: &[(&'static str, &QualityControl, &[f64])]) -> (Vec<bool>, RecordQc) {
    let mut masks = Vec::with_capacity(columns.len());
    let mut variables = Vec::with_capacity(columns.len());
    for &(name, qc, values) in columns {
        let (mask, report) = qc.mask(values);
        debug!(variable = name, removed = report.removed(), "QC mask");
        masks.push(mask);
        variables.push((name, report));
    }

    let refs: Vec<&[bool]> = masks.iter().map(Vec::as_slice).collect();
    let keep = combine_masks(&refs);
    let kept = keep.iter().filter(|&&k| k).count();
    let qc = RecordQc {
        total: keep.len(),
        kept,
        variables,
    };
    (keep, qc)
}

fn log_row_qc(record: &str, qc: &RecordQc) {
    if qc.dropped() > 0 {
        warn!(
            record,
            dropped = qc.dropped(),
            total = qc.total,
            "Dropped rows failing quality control"
        );
    }
}

fn select(values: &[f64], keep: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(keep)
        .filter(|&(_, &k)| k)
        .map(|(&v, _)| v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{EdgePolicy, Rotation};
    use crate::pipeline::QcConfig;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-6;

    /// 20 days at 30-minute sampling.
    fn times() -> Vec<f64> {
        (0..960).map(|i| 1.5e9 + i as f64 * 1800.0).collect()
    }

    fn omega() -> f64 {
        2.0 * PI * 24.0 / 12.4206
    }

    fn ctd() -> CtdRecord {
        let time = times();
        let t0 = time[0];
        let days: Vec<f64> = time.iter().map(|t| (t - t0) / 86_400.0).collect();
        let psal = days.iter().map(|d| 34.0 + 0.3 * (omega() * d - 1.0).cos()).collect();
        let temp = days.iter().map(|d| 8.0 + 0.5 * (omega() * d - 2.0).cos()).collect();
        let pres = vec![50.0; days.len()];
        CtdRecord::new("M1", time, psal, temp, pres).with_position(8.5, 63.7)
    }

    fn velocity() -> VelocityRecord {
        let time = times();
        let t0 = time[0];
        let days: Vec<f64> = time.iter().map(|t| (t - t0) / 86_400.0).collect();
        // Counter-clockwise circle of radius 0.2 m/s
        let u = days.iter().map(|d| 0.2 * (omega() * d).cos()).collect();
        let v = days.iter().map(|d| 0.2 * (omega() * d - PI / 2.0).cos()).collect();
        VelocityRecord::new("M1", time, u, v)
    }

    #[test]
    fn test_run_recovers_signals() {
        let analysis = MooringAnalysis::new(PipelineConfig::new());
        let report = analysis.run(&ctd(), &velocity()).unwrap();

        assert_eq!(report.position, (8.5, 63.7));
        assert_eq!(report.ctd_qc.kept, 960);

        let ct = &report.temperature_fit.parameters;
        assert!((ct.phase - 2.0).abs() < 0.02, "CT phase {}", ct.phase);

        let u = &report.u_fit.parameters;
        assert!((u.amplitude - 0.2).abs() < TOL, "U amplitude {}", u.amplitude);

        assert!((report.ellipse.semi_major - 0.2).abs() < 1e-6);
        assert!((report.ellipse.semi_minor - 0.2).abs() < 1e-6);
        assert_eq!(report.ellipse.rotation(), Rotation::CounterClockwise);
    }

    #[test]
    fn test_filter_window_from_hours() {
        let config = PipelineConfig::new().with_filter_hours(25.0);
        let report = MooringAnalysis::new(config)
            .run(&ctd(), &velocity())
            .unwrap();

        // 25 h at 0.5 h is 50 samples, rounded up to odd
        assert_eq!(report.filter_window, 51);
        assert_eq!(report.filtered_salinity.len(), 960 - 50);
    }

    #[test]
    fn test_pad_edges_keeps_length() {
        let config = PipelineConfig::new().with_edge_policy(EdgePolicy::PadNearest);
        let report = MooringAnalysis::new(config)
            .run(&ctd(), &velocity())
            .unwrap();
        assert_eq!(report.filtered_salinity.len(), 960);
    }

    #[test]
    fn test_bad_rows_dropped() {
        let mut ctd = ctd();
        ctd.practical_salinity[10] = f64::NAN;
        ctd.temperature[20] = 1.0e37;
        let mut vel = velocity();
        vel.v[5] = f64::INFINITY;

        let config = PipelineConfig::new().with_qc(QcConfig::minimal());
        let report = MooringAnalysis::new(config).run(&ctd, &vel).unwrap();

        assert_eq!(report.ctd_qc.kept, 958);
        assert_eq!(report.ctd_qc.dropped(), 2);
        assert_eq!(report.velocity_qc.kept, 959);
        assert_eq!(report.absolute_salinity.len(), 958);
    }

    #[test]
    fn test_position_from_velocity_record() {
        let mut ctd = ctd();
        ctd.position = None;
        let vel = velocity().with_position(-5.0, 50.0);

        let report = MooringAnalysis::new(PipelineConfig::new())
            .run(&ctd, &vel)
            .unwrap();
        assert_eq!(report.position, (-5.0, 50.0));
    }

    #[test]
    fn test_missing_position_fails() {
        let mut ctd = ctd();
        ctd.position = None;
        let err = MooringAnalysis::new(PipelineConfig::new())
            .run(&ctd, &velocity())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingPosition(_)));
    }

    #[test]
    fn test_constant_salinity_fails_fit() {
        let mut ctd = ctd();
        ctd.practical_salinity = vec![34.0; ctd.len()];
        let err = MooringAnalysis::new(PipelineConfig::new())
            .run(&ctd, &velocity())
            .unwrap_err();
        assert!(
            matches!(err, PipelineError::Fit { series: "absolute salinity", .. }),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_saar_scales_salinity() {
        let plain = MooringAnalysis::new(PipelineConfig::new())
            .run(&ctd(), &velocity())
            .unwrap();
        let anomalous = MooringAnalysis::new(PipelineConfig::new().with_saar(1e-3))
            .run(&ctd(), &velocity())
            .unwrap();

        let ratio = anomalous.absolute_salinity.mean() / plain.absolute_salinity.mean();
        assert!((ratio - 1.001).abs() < 1e-9, "ratio {}", ratio);
    }

    #[test]
    fn test_report_display() {
        let report = MooringAnalysis::new(PipelineConfig::new())
            .run(&ctd(), &velocity())
            .unwrap();
        let text = report.to_string();
        assert!(text.contains("Station M1"));
        assert!(text.contains("ellipse"));
        assert!(text.contains("CounterClockwise"));
        assert!(text.contains("mean speed 0.2000 m/s"), "{}", text);
    }

    #[test]
    fn test_mean_flow_direction() {
        // Add a south-eastward drift under the tidal circle
        let mut velocity = velocity();
        velocity.u.iter_mut().for_each(|u| *u += 0.05);
        velocity.v.iter_mut().for_each(|v| *v -= 0.05);

        let report = MooringAnalysis::new(PipelineConfig::new())
            .run(&ctd(), &velocity)
            .unwrap();
        let (mean_u, mean_v) = report.mean_flow();
        assert!((mean_u - 0.05).abs() < 1e-6, "mean u {}", mean_u);
        assert!((mean_v + 0.05).abs() < 1e-6, "mean v {}", mean_v);
        assert!(
            (report.mean_flow_direction() - 135.0).abs() < 1e-3,
            "direction {}",
            report.mean_flow_direction()
        );
        assert!(report.to_string().contains("towards 135°"));
    }
}
