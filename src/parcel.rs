//! Functions for selecting the parcel to lift in a parcel analysis.
use crate::{
    error::{AnalysisError, Result},
    interpolation::linear_interpolate_sounding,
    sounding::{DataRow, Sounding},
};
use itertools::{izip, Itertools};
use metfor::{Celsius, HectoPascal, Kelvin, Quantity};

/// Variables defining a parcel as used in parcel analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parcel {
    /// Temperature in C
    pub temperature: Celsius,
    /// Pressure in hPa
    pub pressure: HectoPascal,
    /// Dew point in C
    pub dew_point: Celsius,
}

impl Parcel {
    /// Get the potential temperature of the parcel
    pub fn theta(&self) -> Kelvin {
        metfor::potential_temperature(self.pressure, self.temperature)
    }

    /// Get the equivalent potential temperature of the parcel
    pub fn theta_e(&self) -> Result<Kelvin> {
        metfor::equiv_pot_temperature(self.temperature, self.dew_point, self.pressure)
            .ok_or(AnalysisError::MetForError)
    }

    /// Get the mixing ratio of the parcel.
    pub fn mixing_ratio(&self) -> Result<f64> {
        metfor::mixing_ratio(self.dew_point, self.pressure).ok_or(AnalysisError::MetForError)
    }

    /// Get the virtual temperature of the parcel
    pub fn virtual_temperature(&self) -> Result<Kelvin> {
        metfor::virtual_temperature(self.temperature, self.dew_point, self.pressure)
            .ok_or(AnalysisError::MetForError)
    }

    /// Try to convert a `DataRow` to a `Parcel`.
    pub fn from_datarow(dr: DataRow) -> Option<Self> {
        let temperature = dr.temperature.into_option()?;
        let pressure = dr.pressure.into_option()?;
        let dew_point = dr.dew_point.into_option()?;

        Some(Parcel {
            temperature,
            pressure,
            dew_point,
        })
    }
}

/// Get a surface parcel, the lowest row of the sounding.
pub fn surface_parcel(snd: &Sounding) -> Result<Parcel> {
    let sfc = snd.surface_as_data_row().ok_or(AnalysisError::NotEnoughData)?;
    Parcel::from_datarow(sfc).ok_or(AnalysisError::MissingValue)
}

/// Create a mixed layer parcel.
///
/// Potential temperature and mixing ratio are averaged over the lowest `depth` of the sounding,
/// weighted by pressure, and the parcel is then placed at the surface pressure. The top of the
/// layer is interpolated, so one level inside it is enough.
///
/// # Examples
///
/// ```rust
/// # use tornado_figures::doctest::make_test_sounding;
/// use metfor::HectoPascal;
/// use tornado_figures::{mixed_layer_parcel, surface_parcel};
///
/// let snd = make_test_sounding();
/// let ml = mixed_layer_parcel(&snd, HectoPascal(50.0)).unwrap();
/// let sfc = surface_parcel(&snd).unwrap();
///
/// assert_eq!(ml.pressure, sfc.pressure);
/// assert!(ml.dew_point < sfc.dew_point);
/// ```
pub fn mixed_layer_parcel(snd: &Sounding, depth: HectoPascal) -> Result<Parcel> {
    let press = snd.pressure_profile();
    let t = snd.temperature_profile();
    let dp = snd.dew_point_profile();

    if press.is_empty() || t.is_empty() || dp.is_empty() {
        return Err(AnalysisError::MissingProfile);
    }

    let bottom_p = press
        .iter()
        .filter_map(|p| p.into_option())
        .next()
        .ok_or(AnalysisError::NoDataProfile)?;
    let top_p = bottom_p - depth;

    // The top of the layer, if the sounding reaches it.
    let top = linear_interpolate_sounding(snd, top_p)
        .ok()
        .and_then(|row| {
            Some((
                top_p,
                row.temperature.into_option()?,
                row.dew_point.into_option()?,
            ))
        });

    let (sum_p, sum_theta, sum_mw) = izip!(press, t, dp)
        .filter(|(p, t, dp)| p.is_some() && t.is_some() && dp.is_some())
        .map(|(p, t, dp)| (p.unpack(), t.unpack(), dp.unpack()))
        .take_while(|&(p, _, _)| p > top_p)
        .chain(top)
        .filter_map(|(p, t, dp)| {
            let theta = metfor::potential_temperature(p, t);
            let mw = metfor::mixing_ratio(dp, p)?;
            Some((p, theta, mw))
        })
        .tuple_windows::<(_, _)>()
        .fold(
            (HectoPascal(0.0), 0.0, 0.0),
            |acc, ((p0, theta0, mw0), (p1, theta1, mw1))| {
                let (sum_p, sum_theta, sum_mw) = acc;
                let dp = p0 - p1;

                (
                    sum_p + dp,
                    sum_theta + (theta0.unpack() + theta1.unpack()) * dp.unpack(),
                    sum_mw + (mw0 + mw1) * dp.unpack(),
                )
            },
        );

    if sum_p == HectoPascal(0.0) {
        return Err(AnalysisError::NotEnoughData);
    }

    // Factor of 2.0 for the trapezoid rule.
    let theta = Kelvin(sum_theta / sum_p.unpack() / 2.0);
    let mw = sum_mw / sum_p.unpack() / 2.0;

    let temperature = Celsius::from(metfor::temperature_from_pot_temp(theta, bottom_p));
    let dew_point =
        metfor::dew_point_from_p_and_mw(bottom_p, mw).ok_or(AnalysisError::MetForError)?;

    Ok(Parcel {
        temperature,
        pressure: bottom_p,
        dew_point,
    })
}

/// Get the most unstable parcel.
///
/// This is defined as the parcel in the lowest `depth` of the sounding with the highest
/// equivalent potential temperature.
pub fn most_unstable_parcel(snd: &Sounding, depth: HectoPascal) -> Result<Parcel> {
    let press = snd.pressure_profile();
    let t = snd.temperature_profile();
    let dp = snd.dew_point_profile();

    if press.is_empty() || t.is_empty() || dp.is_empty() {
        return Err(AnalysisError::MissingProfile);
    }

    let bottom_p = press
        .iter()
        .filter_map(|p| p.into_option())
        .next()
        .ok_or(AnalysisError::NoDataProfile)?;
    let top_p = bottom_p - depth;

    izip!(press, t, dp)
        .filter(|(p, t, dp)| p.is_some() && t.is_some() && dp.is_some())
        .map(|(p, t, dp)| Parcel {
            pressure: p.unpack(),
            temperature: t.unpack(),
            dew_point: dp.unpack(),
        })
        .take_while(|pcl| pcl.pressure >= top_p)
        .filter_map(|pcl| pcl.theta_e().ok().map(|theta_e| (pcl, theta_e)))
        .fold(None, |max: Option<(Parcel, Kelvin)>, (pcl, theta_e)| match max {
            Some((_, max_theta_e)) if max_theta_e >= theta_e => max,
            _ => Some((pcl, theta_e)),
        })
        .map(|(pcl, _)| pcl)
        .ok_or(AnalysisError::NotEnoughData)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use optional::some;

    #[test]
    fn test_surface_parcel() {
        let snd = make_test_sounding();
        let pcl = surface_parcel(&snd).unwrap();
        assert_eq!(pcl.pressure, HectoPascal(1000.0));
        assert_eq!(pcl.temperature, Celsius(28.0));
        assert_eq!(pcl.dew_point, Celsius(24.0));
    }

    #[test]
    fn test_mixed_layer_parcel_is_between_layer_extremes() {
        let snd = make_test_sounding();
        let pcl = mixed_layer_parcel(&snd, HectoPascal(50.0)).unwrap();

        assert_eq!(pcl.pressure, HectoPascal(1000.0));
        // Potential temperature increases slowly through the layer.
        assert!(pcl.temperature > Celsius(28.0));
        assert!(pcl.temperature < Celsius(29.0));
        assert!(pcl.dew_point < Celsius(24.0));
        assert!(pcl.dew_point > Celsius(22.0));
    }

    #[test]
    fn test_mixed_layer_parcel_needs_two_levels() {
        let snd = Sounding::new()
            .with_pressure_profile(vec![some(HectoPascal(1000.0))])
            .with_temperature_profile(vec![some(Celsius(20.0))])
            .with_dew_point_profile(vec![some(Celsius(15.0))]);

        assert_eq!(
            mixed_layer_parcel(&snd, HectoPascal(50.0)),
            Err(AnalysisError::NotEnoughData)
        );
    }

    #[test]
    fn test_mixed_layer_parcel_interpolates_layer_top() {
        // Only the surface is inside the lowest 50 hPa.
        let snd = Sounding::new()
            .with_pressure_profile(vec![some(HectoPascal(1000.0)), some(HectoPascal(900.0))])
            .with_temperature_profile(vec![some(Celsius(20.0)), some(Celsius(10.0))])
            .with_dew_point_profile(vec![some(Celsius(15.0)), some(Celsius(5.0))]);

        let pcl = mixed_layer_parcel(&snd, HectoPascal(50.0)).unwrap();
        assert_eq!(pcl.pressure, HectoPascal(1000.0));

        // Half way between the surface and the 950 hPa values of 15 C and 10 C, brought down to
        // 1000 hPa.
        let theta_950 = metfor::potential_temperature(HectoPascal(950.0), Celsius(15.0));
        let theta_sfc = metfor::potential_temperature(HectoPascal(1000.0), Celsius(20.0));
        let theta = Kelvin((theta_950.unpack() + theta_sfc.unpack()) / 2.0);
        let expected =
            Celsius::from(metfor::temperature_from_pot_temp(theta, HectoPascal(1000.0)));
        assert!((pcl.temperature - expected).unpack().abs() < 1.0e-9);

        assert!(pcl.dew_point < Celsius(15.0));
        assert!(pcl.dew_point > Celsius(10.0));
    }

    #[test]
    fn test_most_unstable_parcel() {
        let snd = make_test_sounding();
        let pcl = most_unstable_parcel(&snd, HectoPascal(50.0)).unwrap();
        // The surface parcel is the warmest and moistest in the lowest 50 hPa.
        assert_eq!(pcl.pressure, HectoPascal(1000.0));

        let pcl = most_unstable_parcel(&snd, HectoPascal(300.0)).unwrap();
        assert!(pcl.pressure >= HectoPascal(700.0));
    }

    #[test]
    fn test_missing_profile() {
        let snd = Sounding::new();
        assert_eq!(
            most_unstable_parcel(&snd, HectoPascal(50.0)),
            Err(AnalysisError::MissingProfile)
        );
    }
}
