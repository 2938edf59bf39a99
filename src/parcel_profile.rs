//! Create and analyze a profile from lifting a parcel.
use crate::{
    error::{AnalysisError, Result},
    interpolation::linear_interpolate_sounding,
    parcel::Parcel,
    sounding::{DataRow, Sounding},
};
use metfor::{self, Celsius, HectoPascal, JpKg, Kelvin, Meters, Quantity};
use optional::Optioned;

/// Hold profiles for a parcel and it's environment.
#[derive(Debug, Clone)]
pub struct ParcelProfile {
    /// Pressure profile
    pub pressure: Vec<HectoPascal>,
    /// Height profile
    pub height: Vec<Meters>,
    /// Parcel virtual temperature profile
    pub parcel_t: Vec<Celsius>,
    /// Environment virtual temperature profile
    pub environment_t: Vec<Celsius>,
}

pub(crate) mod lift;

/// Parcel analysis, this is a way to package the analysis of a parcel.
///
/// These are done by converting the profiles to virtual temperature. It is assumed the reason for
/// lifting the parcel and doing the analysis is related to bouyancy and some kind of convection
/// or stability analysis.
#[derive(Debug, Clone)]
pub struct ParcelAscentAnalysis {
    // The orginal parcel and profile
    parcel: Parcel,
    profile: ParcelProfile,

    // Indicies from analysis
    cape: Optioned<JpKg>,
    cin: Optioned<JpKg>,
    lcl_height_agl: Optioned<Meters>,
    lcl_pressure: Optioned<HectoPascal>, // plotting on skew-t
    lcl_temperature: Optioned<Celsius>,
    el_pressure: Optioned<HectoPascal>,
    el_height_asl: Optioned<Meters>,
    lfc_pressure: Optioned<HectoPascal>,
    lfc_virt_temperature: Optioned<Celsius>,
}

impl ParcelAscentAnalysis {
    /// Get the CAPE.
    pub fn cape(&self) -> Optioned<JpKg> {
        self.cape
    }

    /// Get the CIN.
    pub fn cin(&self) -> Optioned<JpKg> {
        self.cin
    }

    /// Get the LCL height AGL.
    pub fn lcl_height_agl(&self) -> Optioned<Meters> {
        self.lcl_height_agl
    }

    /// Get the LCL pressrue level.
    pub fn lcl_pressure(&self) -> Optioned<HectoPascal> {
        self.lcl_pressure
    }

    /// Get the temperature at the LCL.
    pub fn lcl_temperature(&self) -> Optioned<Celsius> {
        self.lcl_temperature
    }

    /// Get the pressure at the equilibrium level.
    pub fn el_pressure(&self) -> Optioned<HectoPascal> {
        self.el_pressure
    }

    /// Get the height ASL of the equilibrium level.
    pub fn el_height_asl(&self) -> Optioned<Meters> {
        self.el_height_asl
    }

    /// Get the pressure at the LFC.
    pub fn lfc_pressure(&self) -> Optioned<HectoPascal> {
        self.lfc_pressure
    }

    /// Get the virtual temperature at the LFC.
    pub fn lfc_virt_temperature(&self) -> Optioned<Celsius> {
        self.lfc_virt_temperature
    }

    /// Retrieve the parcel's profile
    #[inline]
    pub fn profile(&self) -> &ParcelProfile {
        &self.profile
    }

    /// Retrieve the original parcel.
    #[inline]
    pub fn parcel(&self) -> &Parcel {
        &self.parcel
    }
}

/// Lift a parcel for a convective parcel analysis.
///
/// The resulting `ParcelProfile` and analysis are based off of virtual temperatures and the idea
/// that if there is no *moist* convection, or convective cloud, then there is no CAPE or CIN.
///
/// # Examples
///
/// ```rust
/// # use tornado_figures::doctest::make_test_sounding;
/// use metfor::JpKg;
/// use tornado_figures::{lift_parcel, surface_parcel};
///
/// let snd = make_test_sounding();
/// let pcl = surface_parcel(&snd).unwrap();
/// let anal = lift_parcel(pcl, &snd).unwrap();
///
/// assert!(anal.cape().unwrap() > JpKg(0.0));
/// assert!(anal.el_pressure().unwrap() < anal.lcl_pressure().unwrap());
/// ```
pub fn lift_parcel(parcel: Parcel, snd: &Sounding) -> Result<ParcelAscentAnalysis> {
    lift::lift_parcel(parcel, snd)
}

/// In order for parcel lifting to work and create a parallel environmental profile, we need to
/// start at a level in the sounding with pressure, height, temperature, and dew point. Otherwise
/// we end up with too much missing data in the sounding.
pub(crate) fn find_parcel_start_data(snd: &Sounding, parcel: &Parcel) -> Result<(DataRow, Parcel)> {
    let good_row = |row: &DataRow| -> bool {
        row.temperature.is_some()
            && row.dew_point.is_some()
            && row.pressure.is_some()
            && row.height.is_some()
    };

    let first_guess = linear_interpolate_sounding(snd, parcel.pressure)?;
    if good_row(&first_guess) {
        return Ok((first_guess, *parcel));
    }

    let second_guess = snd
        .bottom_up()
        .find(good_row)
        .ok_or(AnalysisError::NotEnoughData)?;

    let pressure = second_guess.pressure.ok_or(AnalysisError::MissingValue)?;
    let theta = parcel.theta();
    let temperature = Celsius::from(metfor::temperature_from_pot_temp(theta, pressure));
    let mw = parcel.mixing_ratio()?;
    let dew_point =
        metfor::dew_point_from_p_and_mw(pressure, mw).ok_or(AnalysisError::MetForError)?;
    let new_parcel = Parcel {
        pressure,
        temperature,
        dew_point,
    };

    Ok((second_guess, new_parcel))
}

/// The temperature of a lifted parcel along a set of pressure levels.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelPath {
    /// Pressure levels, identical to the sounding levels the path was evaluated on.
    pub pressure: Vec<HectoPascal>,
    /// Parcel temperature (not virtual temperature) at each level.
    pub temperature: Vec<Celsius>,
}

/// Latent heat of vaporization, J/kg.
const LV: f64 = 2.501e6;

/// Largest pressure step used when integrating along a moist adiabat.
const MAX_MOIST_STEP: f64 = 5.0;

/// The temperature of a parcel lifted from the lowest level, dry adiabatically to the LCL and
/// along the moist adiabat above it.
///
/// The path is evaluated at exactly the pressure levels of the sounding, in the same order, so
/// the pressure domain of the result always equals the input's. The moist adiabat is integrated
/// from the LCL with a fourth order Runge-Kutta scheme.
///
/// # Examples
///
/// ```rust
/// # use tornado_figures::doctest::make_test_sounding;
/// use tornado_figures::parcel_temperature_profile;
///
/// let snd = make_test_sounding();
/// let path = parcel_temperature_profile(&snd).unwrap();
/// let pressure: Vec<_> = snd.pressure_profile().iter().map(|p| p.unwrap()).collect();
///
/// assert_eq!(path.pressure, pressure);
/// assert_eq!(path.temperature.len(), pressure.len());
/// ```
pub fn parcel_temperature_profile(snd: &Sounding) -> Result<ParcelPath> {
    let pressure: Vec<HectoPascal> = snd
        .pressure_profile()
        .iter()
        .map(|p| p.into_option().ok_or(AnalysisError::MissingValue))
        .collect::<Result<_>>()?;

    if pressure.is_empty() {
        return Err(AnalysisError::NotEnoughData);
    }

    let sfc = snd.surface_as_data_row().ok_or(AnalysisError::NotEnoughData)?;
    let parcel = Parcel::from_datarow(sfc).ok_or(AnalysisError::MissingValue)?;

    let (lcl_p, lcl_t) = metfor::pressure_and_temperature_at_lcl(
        parcel.temperature,
        parcel.dew_point,
        parcel.pressure,
    )
    .ok_or(AnalysisError::MetForError)?;
    let theta = parcel.theta();

    let mut temperature = Vec::with_capacity(pressure.len());
    let mut moist_state = (lcl_p, lcl_t);
    for &p in &pressure {
        let t = if p >= lcl_p {
            Celsius::from(metfor::temperature_from_pot_temp(theta, p))
        } else {
            let (p0, t0) = moist_state;
            let t1 = moist_adiabat(p0, t0, p);
            moist_state = (p, t1);
            Celsius::from(t1)
        };
        temperature.push(t);
    }

    Ok(ParcelPath {
        pressure,
        temperature,
    })
}

/// Integrate the moist adiabatic lapse rate from (`p0`, `t0`) to `p1`.
pub(crate) fn moist_adiabat(p0: HectoPascal, t0: Kelvin, p1: HectoPascal) -> Kelvin {
    let span = (p1 - p0).unpack();
    let steps = (span.abs() / MAX_MOIST_STEP).ceil().max(1.0) as usize;
    let dp = span / steps as f64;

    let mut p = p0.unpack();
    let mut t = t0.unpack();
    for _ in 0..steps {
        let k1 = moist_lapse_rate(p, t);
        let k2 = moist_lapse_rate(p + dp / 2.0, t + k1 * dp / 2.0);
        let k3 = moist_lapse_rate(p + dp / 2.0, t + k2 * dp / 2.0);
        let k4 = moist_lapse_rate(p + dp, t + k3 * dp);

        t += dp / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        p += dp;
    }

    Kelvin(t)
}

/// dT/dp along a saturated adiabat in K/hPa.
///
/// Below -80 C the saturation mixing ratio is undefined, the parcel is taken as dry there and
/// follows the dry adiabat.
fn moist_lapse_rate(p: f64, t: f64) -> f64 {
    let rs = metfor::mixing_ratio(Kelvin(t), HectoPascal(p)).unwrap_or(0.0);
    let rd = metfor::Rd.unpack();

    let numerator = rd * t + LV * rs;
    let denominator = metfor::cpd.unpack() + LV * LV * rs * metfor::epsilon / (rd * t * t);

    numerator / denominator / p
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use optional::some;

    #[test]
    fn test_parcel_path_matches_input_pressure() {
        let snd = make_test_sounding();
        let path = parcel_temperature_profile(&snd).unwrap();

        assert_eq!(path.pressure.len(), snd.pressure_profile().len());
        for (p, snd_p) in path.pressure.iter().zip(snd.pressure_profile()) {
            assert_eq!(*p, snd_p.unwrap());
        }
        // Starts at the surface temperature.
        assert!((path.temperature[0] - Celsius(28.0)).unpack().abs() < 1.0e-6);
    }

    #[test]
    fn test_parcel_path_cools_with_height() {
        let snd = make_test_sounding();
        let path = parcel_temperature_profile(&snd).unwrap();

        for pair in path.temperature.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn test_moist_adiabat_slower_than_dry() {
        // Above the LCL the saturated parcel cools less than a dry one would.
        let p0 = HectoPascal(900.0);
        let t0 = Kelvin(293.15);
        let moist = moist_adiabat(p0, t0, HectoPascal(700.0));
        let dry = metfor::temperature_from_pot_temp(metfor::potential_temperature(p0, t0), HectoPascal(700.0));

        assert!(moist > dry);
        assert!(moist < t0);
    }

    /// A cool, moist profile every 50 hPa from 1000 to 100 hPa. A parcel lifted from the surface
    /// is colder than -80 C well below the top.
    fn make_cool_sounding() -> Sounding {
        let p: Vec<f64> = (0..19).map(|i| 1000.0 - 50.0 * i as f64).collect();
        let t: Vec<f64> = p.iter().map(|&p| 5.0 - 0.1 * (1000.0 - p)).collect();

        Sounding::new()
            .with_pressure_profile(p.iter().map(|&p| some(HectoPascal(p))).collect())
            .with_temperature_profile(t.iter().map(|&t| some(Celsius(t))).collect())
            .with_dew_point_profile(t.iter().map(|&t| some(Celsius(t - 5.0))).collect())
    }

    #[test]
    fn test_parcel_path_lifted_to_100_hpa() {
        let snd = make_cool_sounding();
        let path = parcel_temperature_profile(&snd).unwrap();

        assert_eq!(path.pressure.len(), 19);
        assert_eq!(path.pressure[0], HectoPascal(1000.0));
        assert_eq!(path.pressure[18], HectoPascal(100.0));
        assert!((path.temperature[0] - Celsius(5.0)).unpack().abs() < 1.0e-6);

        // The top of the path is far below the range of the vapour pressure formula.
        assert!(path.temperature[18] < Celsius(-80.0));
        for pair in path.temperature.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn test_moist_adiabat_becomes_dry_when_too_cold() {
        let p0 = HectoPascal(300.0);
        let t0 = Kelvin::from(Celsius(-85.0));
        let p1 = HectoPascal(100.0);

        let moist = moist_adiabat(p0, t0, p1);
        let dry = metfor::temperature_from_pot_temp(metfor::potential_temperature(p0, t0), p1);
        assert!((moist - dry).unpack().abs() < 1.0e-3);

        // Lifting through -80 C from a warm, saturated start.
        let warm = moist_adiabat(HectoPascal(900.0), Kelvin(293.15), p1);
        assert!(warm.unpack().is_finite());
        assert!(warm < Kelvin::from(Celsius(-80.0)));
    }

    #[test]
    fn test_parcel_path_rejects_missing_pressure() {
        let snd = make_test_sounding().with_pressure_profile(vec![some(HectoPascal(1000.0))]);
        // Only the pressure profile was replaced, a single level path is still valid.
        assert_eq!(parcel_temperature_profile(&snd).unwrap().pressure.len(), 1);

        let snd = Sounding::new().with_pressure_profile(vec![optional::none()]);
        assert!(parcel_temperature_profile(&snd).is_err());
    }
}
