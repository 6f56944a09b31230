//! Seawater thermodynamics.
//!
//! Provides the TEOS-10 conversions needed to turn raw CTD measurements
//! (practical salinity, in-situ temperature, sea pressure) into Absolute
//! Salinity and Conservative Temperature:
//!
//! SA = (SSO/35) · SP · (1 + SAAR)
//! CT = h₀(SA, θ(SA, t, p)) / c_p⁰
//!
//! where θ is potential temperature at zero sea pressure and h₀ the potential
//! enthalpy.

mod teos10;

pub use teos10::{
    CP0, ConstantAnomaly, ReferenceComposition, SSO, SalinityAnomaly, Teos10, Teos10Error,
    ct_from_pt, ct_from_t, pt0_from_t, sa_from_sp, sa_from_sp_baltic,
};
