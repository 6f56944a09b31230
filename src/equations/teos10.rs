//! TEOS-10 conversions for CTD records.
//!
//! Converts practical salinity to Absolute Salinity and in-situ temperature
//! to Conservative Temperature using the TEOS-10 Gibbs function polynomials.
//!
//! # References
//!
//! - IOC, SCOR and IAPSO (2010): The international thermodynamic equation of
//!   seawater 2010. Intergovernmental Oceanographic Commission, Manuals and
//!   Guides No. 56.
//! - McDougall et al. (2003): Accurate and computationally efficient
//!   algorithms for potential temperature and density of seawater.
//!
//! # Units
//!
//! - Practical salinity SP: PSS-78 (unitless)
//! - Absolute Salinity SA: g/kg
//! - Temperature t, CT: °C (ITS-90)
//! - Sea pressure p: dbar (absolute pressure minus 10.1325 dbar)
//!
//! # Absolute Salinity Anomaly
//!
//! `SA = (SSO/35) · SP · (1 + SAAR)`. The anomaly ratio SAAR normally comes
//! from the global TEOS-10 atlas, which is not bundled. [`SalinityAnomaly`]
//! is the seam for supplying it; [`ReferenceComposition`] assumes
//! standard-composition seawater (SAAR = 0), which is accurate to about
//! 0.01 g/kg in the open ocean. Inside the Baltic Sea the dedicated TEOS-10
//! Baltic relation is used instead.

use thiserror::Error;

/// Standard Ocean Reference Salinity (g/kg).
pub const SSO: f64 = 35.16504;

/// Reference heat capacity for Conservative Temperature (J/(kg K)).
pub const CP0: f64 = 3991.867_957_119_63;

/// Celsius zero point (K).
const T0: f64 = 273.15;

/// √(SA/SSO) scale, 1/(40 · 35.16504/35).
const SFAC: f64 = 0.024_882_667_558_461_5;

/// Ratio SSO/35 (g/kg).
const UPS: f64 = SSO / 35.0;

/// Baltic polygon, western boundary (longitude, latitude).
const BALTIC_LEFT_LON: [f64; 3] = [12.6, 7.0, 26.0];
const BALTIC_LEFT_LAT: [f64; 3] = [50.0, 59.0, 69.0];
/// Baltic polygon, eastern boundary.
const BALTIC_RIGHT_LON: [f64; 2] = [45.0, 26.0];
const BALTIC_RIGHT_LAT: [f64; 2] = [50.0, 69.0];

/// Error type for TEOS-10 series conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Teos10Error {
    #[error("input length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("non-finite input at index {index}")]
    NonFinite { index: usize },

    #[error("invalid position: longitude {longitude}, latitude {latitude}")]
    InvalidPosition { longitude: f64, latitude: f64 },
}

/// Source of the Absolute Salinity Anomaly Ratio δSA/SA.
pub trait SalinityAnomaly: Send + Sync {
    /// SAAR at sea pressure `p` (dbar) and position (degrees).
    fn saar(&self, p: f64, longitude: f64, latitude: f64) -> f64;
}

/// Standard-composition seawater: SAAR = 0 everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReferenceComposition;

impl SalinityAnomaly for ReferenceComposition {
    fn saar(&self, _p: f64, _longitude: f64, _latitude: f64) -> f64 {
        0.0
    }
}

/// A fixed, caller-supplied SAAR (e.g. a regional value from the atlas).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantAnomaly(pub f64);

impl SalinityAnomaly for ConstantAnomaly {
    fn saar(&self, _p: f64, _longitude: f64, _latitude: f64) -> f64 {
        self.0
    }
}

/// TEOS-10 converter parameterized by its salinity anomaly source.
///
/// # Example
///
/// ```ignore
/// use mooring_rs::equations::Teos10;
///
/// let teos = Teos10::new();
/// let sa = teos.absolute_salinity(&psal, &pres, 8.5, 63.7)?;
/// let ct = teos.conservative_temperature(&sa, &temp, &pres)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct Teos10<A: SalinityAnomaly = ReferenceComposition> {
    anomaly: A,
}

impl Teos10 {
    /// Converter for standard-composition seawater.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: SalinityAnomaly> Teos10<A> {
    /// Converter with a custom anomaly source.
    pub fn with_anomaly(anomaly: A) -> Self {
        Self { anomaly }
    }

    /// The anomaly source in use.
    pub fn anomaly(&self) -> &A {
        &self.anomaly
    }

    /// Absolute Salinity from practical salinity at one point.
    pub fn sa_from_sp(&self, sp: f64, p: f64, longitude: f64, latitude: f64) -> f64 {
        let saar = self.anomaly.saar(p, longitude, latitude);
        sa_from_sp(sp, longitude, latitude, saar)
    }

    /// Absolute Salinity series from practical salinity and pressure series
    /// at a fixed mooring position.
    pub fn absolute_salinity(
        &self,
        sp: &[f64],
        p: &[f64],
        longitude: f64,
        latitude: f64,
    ) -> Result<Vec<f64>, Teos10Error> {
        check_lengths(sp.len(), &[p.len()])?;
        check_finite(&[sp, p])?;
        if !(longitude.is_finite() && latitude.is_finite() && (-90.0..=90.0).contains(&latitude))
        {
            return Err(Teos10Error::InvalidPosition {
                longitude,
                latitude,
            });
        }

        Ok(sp
            .iter()
            .zip(p)
            .map(|(&sp, &p)| self.sa_from_sp(sp, p, longitude, latitude))
            .collect())
    }

    /// Conservative Temperature series from Absolute Salinity, in-situ
    /// temperature and pressure series.
    pub fn conservative_temperature(
        &self,
        sa: &[f64],
        t: &[f64],
        p: &[f64],
    ) -> Result<Vec<f64>, Teos10Error> {
        check_lengths(sa.len(), &[t.len(), p.len()])?;
        check_finite(&[sa, t, p])?;

        Ok(sa
            .iter()
            .zip(t)
            .zip(p)
            .map(|((&sa, &t), &p)| ct_from_t(sa, t, p))
            .collect())
    }
}

fn check_lengths(expected: usize, others: &[usize]) -> Result<(), Teos10Error> {
    match others.iter().find(|&&n| n != expected) {
        Some(&got) => Err(Teos10Error::LengthMismatch { expected, got }),
        None => Ok(()),
    }
}

fn check_finite(inputs: &[&[f64]]) -> Result<(), Teos10Error> {
    let first_bad = inputs
        .iter()
        .filter_map(|s| s.iter().position(|v| !v.is_finite()))
        .min();
    match first_bad {
        Some(index) => Err(Teos10Error::NonFinite { index }),
        None => Ok(()),
    }
}

/// Absolute Salinity from practical salinity with a known anomaly ratio.
///
/// Negative SP is clamped to zero. Longitude may be in −180..180 or 0..360.
pub fn sa_from_sp(sp: f64, longitude: f64, latitude: f64, saar: f64) -> f64 {
    let sp = sp.max(0.0);
    sa_from_sp_baltic(sp, longitude, latitude).unwrap_or(UPS * sp * (1.0 + saar))
}

/// Baltic Sea Absolute Salinity, `None` outside the Baltic polygon.
pub fn sa_from_sp_baltic(sp: f64, longitude: f64, latitude: f64) -> Option<f64> {
    let lon = longitude.rem_euclid(360.0);

    let in_bounding_box = BALTIC_LEFT_LON[1] < lon
        && lon < BALTIC_RIGHT_LON[0]
        && BALTIC_LEFT_LAT[0] < latitude
        && latitude < BALTIC_LEFT_LAT[2];
    if !in_bounding_box {
        return None;
    }

    let west = interp(latitude, &BALTIC_LEFT_LAT, &BALTIC_LEFT_LON);
    let east = interp(latitude, &BALTIC_RIGHT_LAT, &BALTIC_RIGHT_LON);

    (west <= lon && lon <= east).then(|| ((SSO - 0.087) / 35.0) * sp.max(0.0) + 0.087)
}

/// Piecewise linear interpolation on increasing `xs`.
fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let i = xs
        .windows(2)
        .position(|w| x <= w[1])
        .unwrap_or(xs.len() - 2);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let (y0, y1) = (ys[i], ys[i + 1]);
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Conservative Temperature from in-situ temperature.
pub fn ct_from_t(sa: f64, t: f64, p: f64) -> f64 {
    ct_from_pt(sa, pt0_from_t(sa, t, p))
}

/// Potential temperature referenced to zero sea pressure.
///
/// Starts from a polynomial estimate and refines it with two modified
/// Newton-Raphson iterations on entropy equality.
pub fn pt0_from_t(sa: f64, t: f64, p: f64) -> f64 {
    let s1 = sa * 35.0 / SSO;

    let mut pt0 = t + p
        * (8.654_839_133_954_42e-6 - s1 * 1.416_362_997_448_81e-6 - p * 7.382_864_671_357_37e-9
            + t * (-8.382_413_570_396_98e-6
                + s1 * 2.839_333_685_855_34e-8
                + t * 1.778_039_652_186_56e-8
                + p * 1.711_556_192_082_33e-10));

    let mut dentropy_dt = CP0 / ((T0 + pt0) * (1.0 - 0.05 * (1.0 - sa / SSO)));
    let true_entropy_part = entropy_part(sa, t, p);

    for _ in 0..2 {
        let pt0_old = pt0;
        let dentropy = entropy_part_zerop(sa, pt0_old) - true_entropy_part;
        pt0 = pt0_old - dentropy / dentropy_dt;
        let ptm = 0.5 * (pt0 + pt0_old);
        dentropy_dt = -gibbs_pt0_pt0(sa, ptm);
        pt0 = pt0_old - dentropy / dentropy_dt;
    }

    pt0
}

/// Conservative Temperature from potential temperature (p_ref = 0).
pub fn ct_from_pt(sa: f64, pt: f64) -> f64 {
    let x2 = SFAC * sa;
    let x = x2.max(0.0).sqrt();
    let y = pt * 0.025;

    let pot_enthalpy = 61.013_624_206_810_71
        + y * (168_776.461_380_480_15
            + y * (-2_735.278_560_511_962_5
                + y * (2_574.216_445_382_143_3
                    + y * (-1_536.664_443_497_754_3
                        + y * (545.734_049_793_162_9
                            + (-50.910_917_283_743_31 - 18.304_898_789_278_02 * y) * y)))))
        + x2 * (268.552_026_584_507_1
            + y * (-12_019.028_203_559_312
                + y * (3_734.858_026_725_145
                    + y * (-2_046.767_114_505_761_8
                        + y * (465.286_556_238_262_34
                            + (-0.637_082_030_237_635_9 - 10.650_848_542_359_153 * y) * y))))
            + x * (937.209_911_062_070_7
                + y * (588.180_281_217_010_8
                    + y * (248.394_765_229_712_85
                        + (-3.871_557_904_936_333 - 2.626_801_985_426_835_6 * y) * y))
                + x * (-1_687.914_374_187_449
                    + x * (246.959_888_878_137_7
                        + x * (123.595_765_824_579_64 - 48.589_106_902_540_9 * x))
                    + y * (936.320_654_446_033_6
                        + y * (-942.782_730_454_443_9
                            + y * (369.438_943_750_900_2
                                + (-33.836_649_478_952_48 - 9.987_880_382_780_322 * y) * y))))));

    pot_enthalpy / CP0
}

/// Part of −∂g/∂T that depends on temperature (entropy up to an SA term).
fn entropy_part(sa: f64, t: f64, p: f64) -> f64 {
    let x2 = SFAC * sa;
    let x = x2.max(0.0).sqrt();
    let y = t * 0.025;
    let z = p * 1e-4;

    let g03 = z
        * (-270.983_805_184_062
            + z * (776.153_611_613_101
                + z * (-196.512_550_881_22 + (28.979_652_629_417_5 - 2.132_900_835_183_27 * z) * z)))
        + y * (-24_715.571_866_078
            + z * (2_910.072_908_093_6
                + z * (-1_513.116_771_538_718
                    + z * (546.959_324_647_056
                        + z * (-111.120_812_763_443_6 + 8.688_413_438_343_94 * z))))
            + y * (2_210.223_612_454_836_3
                + z * (-2_017.523_349_435_21
                    + z * (1_498.081_172_457_456
                        + z * (-718.635_991_963_235_9
                            + (146.403_755_578_161_6 - 4.989_213_186_267_150_5 * z) * z)))
                + y * (-592.743_745_734_632
                    + z * (1_591.873_781_627_888
                        + z * (-1_207.261_522_487_504
                            + (608.785_486_935_364 - 105.499_350_893_120_8 * z) * z))
                    + y * (290.129_562_921_285_47
                        + z * (-973.091_553_087_975
                            + z * (602.603_274_510_125
                                + z * (-276.361_526_170_076 + 32.409_533_403_861_05 * z)))
                        + y * (-113.906_307_908_503_21
                            + y * (21.355_715_254_157_69 - 67.417_568_357_514_34 * z)
                            + z * (381.068_361_985_070_96
                                + z * (-133.738_390_284_275_4 + 49.023_632_509_086_724 * z)))))));

    let g08 = x2
        * (z * (729.116_529_735_046
            + z * (-343.956_902_961_561
                + z * (124.687_671_116_248
                    + z * (-31.656_964_386_073 + 7.046_588_033_154_49 * z))))
            + x * (x
                * (y * (-137.114_501_840_898_2
                    + y * (148.100_308_456_876_18
                        + y * (-68.559_030_967_915_2 + 12.484_850_478_475_4 * y)))
                    - 22.668_355_851_282_9 * z)
                + z * (-175.292_041_186_547 + (83.192_392_780_181_9 - 29.483_064_349_429 * z) * z)
                + y * (-86.132_935_195_608_4
                    + z * (766.116_132_004_952
                        + z * (-108.383_452_503_422_4 + 51.279_697_477_982_8 * z))
                    + y * (-30.068_211_258_562_5
                        - 1_380.959_795_403_770_8 * z
                        + y * (3.502_402_647_235_78 + 938.260_750_445_42 * z))))
            + y * (1_760.062_705_994_408
                + y * (-675.802_947_790_203
                    + y * (365.704_179_100_503_6
                        + y * (-108.301_620_437_655_52 + 12.781_018_250_830_98 * y)
                        + z * (-1_190.914_967_948_748
                            + (298.904_564_555_024 - 145.949_167_600_635_2 * z) * z))
                    + z * (2_082.734_442_399_804_3
                        + z * (-614.668_925_894_709
                            + (340.685_093_521_782 - 33.384_820_297_923_9 * z) * z)))
                + z * (-1_721.528_607_567_954
                    + z * (674.819_060_538_734
                        + z * (-356.629_112_415_276
                            + (88.408_071_661_6 - 15.840_030_944_233_64 * z) * z)))));

    -(g03 + g08) * 0.025
}

/// [`entropy_part`] at zero sea pressure.
fn entropy_part_zerop(sa: f64, pt0: f64) -> f64 {
    let x2 = SFAC * sa;
    let x = x2.max(0.0).sqrt();
    let y = pt0 * 0.025;

    let g03 = y
        * (-24_715.571_866_078
            + y * (2_210.223_612_454_836_3
                + y * (-592.743_745_734_632
                    + y * (290.129_562_921_285_47
                        + y * (-113.906_307_908_503_21 + y * 21.355_715_254_157_69)))));

    let g08 = x2
        * (x * (x
            * (y * (-137.114_501_840_898_2
                + y * (148.100_308_456_876_18
                    + y * (-68.559_030_967_915_2 + 12.484_850_478_475_4 * y))))
            + y * (-86.132_935_195_608_4
                + y * (-30.068_211_258_562_5 + y * 3.502_402_647_235_78)))
            + y * (1_760.062_705_994_408
                + y * (-675.802_947_790_203
                    + y * (365.704_179_100_503_6
                        + y * (-108.301_620_437_655_52 + 12.781_018_250_830_98 * y)))));

    -(g03 + g08) * 0.025
}

/// Second temperature derivative of the Gibbs function at zero pressure.
fn gibbs_pt0_pt0(sa: f64, pt0: f64) -> f64 {
    let x2 = SFAC * sa;
    let x = x2.max(0.0).sqrt();
    let y = pt0 * 0.025;

    let g03 = -24_715.571_866_078
        + y * (4_420.447_224_909_672_5
            + y * (-1_778.231_237_203_896
                + y * (1_160.518_251_685_141_9
                    + y * (-569.531_539_542_516 + y * 128.134_291_524_946_15))));

    let g08 = x2
        * (1_760.062_705_994_408
            + x * (-86.132_935_195_608_4
                + x * (-137.114_501_840_898_2
                    + y * (296.200_616_913_752_36
                        + y * (-205.677_092_903_745_63 + 49.939_401_913_901_6 * y)))
                + y * (-60.136_422_517_125 + y * 10.507_207_941_707_34))
            + y * (-1_351.605_895_580_406
                + y * (1_097.112_537_301_510_9
                    + y * (-433.206_481_750_622_06 + 63.905_091_254_154_904 * y))));

    (g03 + g08) * 0.000_625
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    // Check values from the TEOS-10 Gibbs-SeaWater documentation
    const SA: [f64; 6] = [34.7118, 34.8915, 35.0256, 34.8472, 34.7366, 34.7324];
    const T: [f64; 6] = [28.7856, 28.4329, 22.8103, 10.2600, 6.8863, 4.4036];
    const P: [f64; 6] = [10.0, 50.0, 125.0, 250.0, 600.0, 1000.0];

    #[test]
    fn test_pt0_from_t_check_values() {
        let expected = [
            28.783_196_819_670_632,
            28.420_983_342_398_962,
            22.784_930_399_117_108,
            10.230_523_661_095_731,
            6.829_230_224_409_661,
            4.324_510_571_845_226,
        ];
        for i in 0..6 {
            let pt0 = pt0_from_t(SA[i], T[i], P[i]);
            assert!(
                (pt0 - expected[i]).abs() < TOL,
                "pt0[{}]: expected {}, got {}",
                i,
                expected[i],
                pt0
            );
        }
    }

    #[test]
    fn test_ct_from_pt_check_values() {
        let pt = [28.7832, 28.4210, 22.7850, 10.2305, 6.8292, 4.3245];
        let expected = [
            28.809_923_015_982_083,
            28.439_244_516_249_495,
            22.786_246_608_464_264,
            10.226_165_605_435_785,
            6.827_183_417_643_142,
            4.323_565_182_322_069,
        ];
        for i in 0..6 {
            let ct = ct_from_pt(SA[i], pt[i]);
            assert!(
                (ct - expected[i]).abs() < TOL,
                "CT[{}]: expected {}, got {}",
                i,
                expected[i],
                ct
            );
        }
    }

    #[test]
    fn test_ct_from_t() {
        let expected = [
            28.809_919_826_700_28,
            28.439_227_816_091_14,
            22.786_176_893_078_498,
            10.226_189_266_620_782,
            6.827_213_633_479_988,
            4.323_575_748_610_454_5,
        ];
        for i in 0..6 {
            let ct = ct_from_t(SA[i], T[i], P[i]);
            assert!(
                (ct - expected[i]).abs() < 1e-8,
                "CT[{}]: expected {}, got {}",
                i,
                expected[i],
                ct
            );
        }
    }

    #[test]
    fn test_surface_pt0_equals_t() {
        // At zero pressure potential and in-situ temperature coincide
        for &t in &[-1.0, 5.0, 15.0, 25.0] {
            assert!((pt0_from_t(35.0, t, 0.0) - t).abs() < 1e-10);
        }
    }

    #[test]
    fn test_ct_zero_at_reference_state() {
        // CT is defined so that it vanishes at SA = SSO, pt = 0
        assert!(ct_from_pt(SSO, 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_sa_from_sp_open_ocean() {
        let sa = sa_from_sp(35.0, -30.0, 20.0, 0.0);
        assert!((sa - SSO).abs() < 1e-12);

        // Longitude convention does not matter outside the Baltic
        let east = sa_from_sp(34.5487, 188.0, 4.0, 0.0);
        let west = sa_from_sp(34.5487, -172.0, 4.0, 0.0);
        assert!((east - west).abs() < 1e-12);
        // The atlas anomaly at this point is small
        assert!((east - 34.7118).abs() < 1e-3);
    }

    #[test]
    fn test_sa_from_sp_anomaly() {
        let base = sa_from_sp(35.0, -30.0, 20.0, 0.0);
        let with_anomaly = sa_from_sp(35.0, -30.0, 20.0, 1e-4);
        assert!((with_anomaly - base * (1.0 + 1e-4)).abs() < 1e-12);
    }

    #[test]
    fn test_sa_from_sp_baltic() {
        // Central Baltic
        let sa = sa_from_sp(7.0, 20.0, 57.0, 0.0);
        let expected = (SSO - 0.087) / 35.0 * 7.0 + 0.087;
        assert!((sa - expected).abs() < 1e-12);
        assert!(sa_from_sp_baltic(7.0, 20.0, 57.0).is_some());

        // North Sea and Norwegian coast are outside the polygon
        assert!(sa_from_sp_baltic(34.0, 3.0, 57.0).is_none());
        assert!(sa_from_sp_baltic(34.0, 8.5, 63.7).is_none());
    }

    #[test]
    fn test_negative_sp_clamped() {
        assert_eq!(sa_from_sp(-0.5, -30.0, 20.0, 0.0), 0.0);
    }

    #[test]
    fn test_series_conversion() {
        let teos = Teos10::new();
        let sp = [34.0, 34.5, 35.0];
        let p = [5.0, 5.0, 5.0];
        let sa = teos.absolute_salinity(&sp, &p, 8.5, 63.7).unwrap();
        assert_eq!(sa.len(), 3);
        assert!((sa[2] - SSO).abs() < 1e-12);

        let t = [8.0, 8.5, 9.0];
        let ct = teos.conservative_temperature(&sa, &t, &p).unwrap();
        assert_eq!(ct.len(), 3);
        // Near-surface CT differs from t by a few hundredths of a degree
        for (c, t) in ct.iter().zip(&t) {
            assert!((c - t).abs() < 0.1);
        }
    }

    #[test]
    fn test_series_errors() {
        let teos = Teos10::new();
        assert_eq!(
            teos.absolute_salinity(&[34.0, 35.0], &[1.0], 0.0, 0.0),
            Err(Teos10Error::LengthMismatch { expected: 2, got: 1 })
        );
        assert_eq!(
            teos.conservative_temperature(&[35.0, 35.0], &[10.0, f64::NAN], &[1.0, 1.0]),
            Err(Teos10Error::NonFinite { index: 1 })
        );
        assert!(matches!(
            teos.absolute_salinity(&[34.0], &[1.0], 0.0, 95.0),
            Err(Teos10Error::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_constant_anomaly() {
        let teos = Teos10::with_anomaly(ConstantAnomaly(2e-4));
        let sa = teos.sa_from_sp(35.0, 10.0, -30.0, 20.0);
        assert!((sa - SSO * 1.0002).abs() < 1e-12);
    }
}
