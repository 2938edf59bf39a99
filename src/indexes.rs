//! Indexes that are specific to a sounding, plus the composite severe weather parameters that
//! combine a parcel analysis with the kinematics of the profile.

use crate::{
    error::{AnalysisError, Result},
    interpolation::linear_interpolate_sounding,
    sounding::Sounding,
};
use itertools::{izip, Itertools};
use metfor::{Celsius, HectoPascal, IntHelicityM2pS2, JpKg, Kelvin, Meters, MetersPSec, Quantity};

/// The K-index, `(T850 - T500) + Td850 - (T700 - Td700)`.
///
/// # Examples
///
/// ```rust
/// # use tornado_figures::doctest::make_test_sounding;
/// use tornado_figures::k_index;
///
/// let snd = make_test_sounding();
/// let k = k_index(&snd).unwrap();
/// // (19 - -3.7) + 17 - (11 - 4)
/// assert!((k - 32.7).abs() < 1.0e-9);
/// ```
pub fn k_index(snd: &Sounding) -> Result<f64> {
    let (t850, td850) = t_and_td_at(snd, HectoPascal(850.0))?;
    let (t700, td700) = t_and_td_at(snd, HectoPascal(700.0))?;
    let (t500, _) = t_and_td_at(snd, HectoPascal(500.0))?;

    Ok((t850 - t500) + td850 - (t700 - td700))
}

/// The total totals index, `T850 + Td850 - 2 T500`.
pub fn total_totals(snd: &Sounding) -> Result<f64> {
    let (t850, td850) = t_and_td_at(snd, HectoPascal(850.0))?;
    let (t500, _) = t_and_td_at(snd, HectoPascal(500.0))?;

    Ok(t850 + td850 - 2.0 * t500)
}

fn t_and_td_at(snd: &Sounding, p: HectoPascal) -> Result<(f64, f64)> {
    let level = linear_interpolate_sounding(snd, p).map_err(|_| AnalysisError::MissingValue)?;

    let Celsius(t) = level.temperature.ok_or(AnalysisError::MissingValue)?;
    let Celsius(td) = level.dew_point.ok_or(AnalysisError::MissingValue)?;

    Ok((t, td))
}

/// Height of the LCL above the surface from the hydrostatic thickness of the layer between the
/// surface and the LCL.
///
/// The layer is made of every level below the LCL plus the LCL itself, and the thickness is
/// `-Rd/g * integral(T d ln p)`. An LCL at or below the surface pressure level is at 0 m.
pub fn lcl_height(snd: &Sounding, lcl_pressure: HectoPascal, lcl_temperature: Celsius) -> Result<Meters> {
    let p_profile = snd.pressure_profile();
    let t_profile = snd.temperature_profile();

    let sfc_pressure = p_profile
        .iter()
        .filter_map(|p| p.into_option())
        .next()
        .ok_or(AnalysisError::NotEnoughData)?;
    if lcl_pressure >= sfc_pressure {
        return Ok(Meters(0.0));
    }

    let below_lcl = izip!(p_profile, t_profile)
        .filter(|(p, t)| p.is_some() && t.is_some())
        .map(|(p, t)| (p.unpack(), t.unpack()))
        .take_while(|&(p, _)| p > lcl_pressure);

    let (integral, count) = below_lcl
        .chain(std::iter::once((lcl_pressure, lcl_temperature)))
        .map(|(p, t)| (p.unpack().ln(), Kelvin::from(t).unpack()))
        .tuple_windows::<(_, _)>()
        .fold((0.0, 0), |(acc, count), ((lnp0, t0), (lnp1, t1))| {
            (acc + (t0 + t1) * (lnp1 - lnp0), count + 1)
        });

    if count == 0 {
        return Err(AnalysisError::NotEnoughData);
    }

    // metfor::g is negative, the 2.0 is for the trapezoid rule.
    Ok(Meters(metfor::Rd.unpack() / metfor::g * integral / 2.0))
}

/// The fixed layer significant tornado parameter.
///
/// `(cape / 1500) * lcl_term * (srh / 150) * shear_term` where the LCL term is 1 below 1000 m,
/// 0 above 2000 m and linear in between, and the shear term is 0 below 12.5 m/s, capped at 1.5
/// above 30 m/s and `shear / 20` in between.
///
/// # Examples
///
/// ```rust
/// use metfor::{IntHelicityM2pS2, JpKg, Meters, MetersPSec};
/// use tornado_figures::significant_tornado;
///
/// let stp = significant_tornado(
///     JpKg(1500.0),
///     Meters(800.0),
///     IntHelicityM2pS2(150.0),
///     MetersPSec(20.0),
/// );
/// assert!((stp - 1.0).abs() < 1.0e-9);
/// ```
pub fn significant_tornado(
    sbcape: JpKg,
    lcl_height: Meters,
    srh: IntHelicityM2pS2,
    shear: MetersPSec,
) -> f64 {
    let lcl = lcl_height.unpack();
    let lcl_term = if lcl < 1000.0 {
        1.0
    } else if lcl > 2000.0 {
        0.0
    } else {
        (2000.0 - lcl) / 1000.0
    };

    let shear = shear.unpack();
    let shear_term = if shear < 12.5 {
        0.0
    } else if shear > 30.0 {
        1.5
    } else {
        shear / 20.0
    };

    sbcape.unpack() / 1500.0 * lcl_term * srh.unpack() / 150.0 * shear_term
}

/// The supercell composite parameter.
///
/// `(mucape / 1000) * (srh / 50) * shear_term` with the shear term 0 below 10 m/s, 1 above
/// 20 m/s and `shear / 20` in between.
pub fn supercell_composite(mucape: JpKg, srh: IntHelicityM2pS2, shear: MetersPSec) -> f64 {
    let shear = shear.unpack();
    let shear_term = if shear > 20.0 {
        1.0
    } else if shear < 10.0 {
        0.0
    } else {
        shear / 20.0
    };

    mucape.unpack() / 1000.0 * srh.unpack() / 50.0 * shear_term
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        analysis::SoundingAnalysis, keys::PanelValue, parcel::surface_parcel,
        sounding::doctest::make_test_sounding,
    };
    use optional::some;

    #[test]
    fn test_total_totals() {
        let snd = make_test_sounding();
        // 19 + 17 - 2 * -3.7
        assert!((total_totals(&snd).unwrap() - 43.4).abs() < 1.0e-9);
    }

    #[test]
    fn test_indexes_need_mandatory_levels() {
        let snd = make_test_sounding().with_dew_point_profile(vec![]);
        assert!(k_index(&snd).is_err());
        assert!(total_totals(&snd).is_err());
    }

    #[test]
    fn test_lcl_height_matches_sounding_heights() {
        let snd = make_test_sounding();
        // The LCL placed exactly at 900 hPa, the thickness should be close to the difference
        // between the 1000 and 900 hPa heights of the test sounding, 930 m.
        let hgt = lcl_height(&snd, HectoPascal(900.0), Celsius(21.5)).unwrap();
        assert!((hgt.unpack() - 930.0).abs() < 30.0);
    }

    #[test]
    fn test_lcl_height_at_surface_is_zero() {
        let snd = make_test_sounding();
        let hgt = lcl_height(&snd, HectoPascal(1000.0), Celsius(28.0)).unwrap();
        assert!(hgt.unpack().abs() < 1.0e-9);
    }

    #[test]
    fn test_saturated_surface_lcl_feeds_significant_tornado() {
        let snd = make_test_sounding();
        let mut td = snd.dew_point_profile().to_vec();
        td[0] = some(Celsius(28.0));
        let snd = snd.with_dew_point_profile(td);

        let pcl = surface_parcel(&snd).unwrap();
        let (lcl_p, lcl_t) =
            metfor::pressure_and_temperature_at_lcl(pcl.temperature, pcl.dew_point, pcl.pressure)
                .unwrap();
        assert_eq!(lcl_p, HectoPascal(1000.0));

        let hgt = lcl_height(&snd, lcl_p, Celsius::from(lcl_t)).unwrap();
        assert_eq!(hgt, Meters(0.0));

        let stp = significant_tornado(JpKg(1500.0), hgt, IntHelicityM2pS2(150.0), MetersPSec(20.0));
        assert!((stp - 1.0).abs() < 1.0e-9);

        let anal = SoundingAnalysis::analyze(&snd);
        assert!(anal.value(PanelValue::SignificantTornado).is_some());
    }

    #[test]
    fn test_significant_tornado_terms() {
        let cape = JpKg(3000.0);
        let srh = IntHelicityM2pS2(300.0);

        // Weak shear kills the parameter
        assert_eq!(
            significant_tornado(cape, Meters(500.0), srh, MetersPSec(12.0)),
            0.0
        );
        // High LCL kills the parameter
        assert_eq!(
            significant_tornado(cape, Meters(2500.0), srh, MetersPSec(25.0)),
            0.0
        );
        // Shear term is capped at 1.5: 2 * 1 * 2 * 1.5
        assert!((significant_tornado(cape, Meters(500.0), srh, MetersPSec(40.0)) - 6.0).abs() < 1.0e-9);
        // LCL term is linear between 1000 and 2000 m: 2 * 0.5 * 2 * 1
        assert!((significant_tornado(cape, Meters(1500.0), srh, MetersPSec(20.0)) - 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn test_supercell_composite_terms() {
        let cape = JpKg(2000.0);
        let srh = IntHelicityM2pS2(100.0);

        assert_eq!(supercell_composite(cape, srh, MetersPSec(9.0)), 0.0);
        assert!((supercell_composite(cape, srh, MetersPSec(30.0)) - 4.0).abs() < 1.0e-9);
        assert!((supercell_composite(cape, srh, MetersPSec(15.0)) - 3.0).abs() < 1.0e-9);
    }
}
