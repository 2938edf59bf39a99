//! Interpolation between the levels of a sounding, linear in pressure.
use crate::{
    error::{AnalysisError, Result},
    sounding::{DataRow, Sounding},
};
use itertools::Itertools;
use metfor::{HectoPascal, Knots, MetersPSec, Quantity, WindSpdDir, WindUV};
use optional::Optioned;

/// Two sounding rows around a target pressure and how far the target is from the lower one.
///
/// `weight` is 0 at `lower` and 1 at `upper`. An exact match has `lower == upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    lower: usize,
    upper: usize,
    weight: f64,
}

/// Find the rows on either side of `target`. Rows without a pressure are skipped, and pressure
/// must decrease up the profile.
fn bracket(pressure: &[Optioned<HectoPascal>], target: HectoPascal) -> Option<Bracket> {
    let target = target.unpack();
    let levels: Vec<(usize, f64)> = pressure
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.into_option().map(|p| (i, p.unpack())))
        .collect();

    if let Some(&(i, _)) = levels
        .iter()
        .find(|(_, p)| (p - target).abs() < std::f64::EPSILON)
    {
        return Some(Bracket {
            lower: i,
            upper: i,
            weight: 0.0,
        });
    }

    levels
        .iter()
        .tuple_windows()
        .find(|((_, p0), (_, p1))| *p0 > target && target > *p1)
        .map(|(&(lower, p0), &(upper, p1))| Bracket {
            lower,
            upper,
            weight: (target - p0) / (p1 - p0),
        })
}

/// Interpolate the whole sounding to `target_p`.
///
/// Temperature, dew point and height are linear in pressure, the wind is linear in its u and v
/// components. A value missing at either bracketing level is missing in the result. There is no
/// extrapolation above or below the profile.
pub fn linear_interpolate_sounding(snd: &Sounding, target_p: HectoPascal) -> Result<DataRow> {
    let Bracket {
        lower,
        upper,
        weight,
    } = bracket(snd.pressure_profile(), target_p).ok_or(AnalysisError::InterpolationError)?;

    let below = snd.data_row(lower).ok_or(AnalysisError::InterpolationError)?;
    if lower == upper {
        return Ok(below);
    }
    let above = snd.data_row(upper).ok_or(AnalysisError::InterpolationError)?;

    Ok(DataRow {
        pressure: Optioned::from(target_p),
        temperature: blend(below.temperature, above.temperature, weight),
        dew_point: blend(below.dew_point, above.dew_point, weight),
        wind: blend_wind(below.wind, above.wind, weight),
        height: blend(below.height, above.height, weight),
    })
}

fn blend<Y>(below: Optioned<Y>, above: Optioned<Y>, weight: f64) -> Optioned<Y>
where
    Y: Quantity + optional::Noned,
{
    match (below.into_option(), above.into_option()) {
        (Some(y0), Some(y1)) => Optioned::from(Y::pack(
            y0.unpack() + weight * (y1.unpack() - y0.unpack()),
        )),
        _ => Optioned::default(),
    }
}

fn blend_wind(
    below: Optioned<WindSpdDir<Knots>>,
    above: Optioned<WindSpdDir<Knots>>,
    weight: f64,
) -> Optioned<WindSpdDir<Knots>> {
    match (below.into_option(), above.into_option()) {
        (Some(w0), Some(w1)) => {
            let WindUV::<MetersPSec> { u: u0, v: v0 } = WindUV::from(w0);
            let WindUV::<MetersPSec> { u: u1, v: v1 } = WindUV::from(w1);

            let uv = WindUV {
                u: MetersPSec(u0.unpack() + weight * (u1 - u0).unpack()),
                v: MetersPSec(v0.unpack() + weight * (v1 - v0).unpack()),
            };
            Optioned::from(WindSpdDir::<Knots>::from(uv))
        }
        _ => Optioned::default(),
    }
}

/// The value at `x` on the line through (`x0`, `y0`) and (`x1`, `y1`), for metfor quantities.
#[inline]
pub(crate) fn linear_interp<X, Y>(x: X, x0: X, x1: X, y0: Y, y1: Y) -> Y
where
    X: Quantity,
    Y: Quantity,
{
    Y::pack(interp_f64(
        x.unpack(),
        x0.unpack(),
        x1.unpack(),
        y0.unpack(),
        y1.unpack(),
    ))
}

/// Linear interpolation for plain numbers, used by the gridded fields.
///
/// Returns `y0` when the two x values coincide.
#[inline]
pub fn interp_f64(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if (x1 - x0).abs() < std::f64::EPSILON {
        y0
    } else {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use metfor::{Celsius, Meters};
    use optional::{none, some};

    #[test]
    fn test_bracket() {
        let p = vec![
            some(HectoPascal(1000.0)),
            none(),
            some(HectoPascal(900.0)),
            some(HectoPascal(800.0)),
        ];

        assert_eq!(
            bracket(&p, HectoPascal(950.0)),
            Some(Bracket {
                lower: 0,
                upper: 2,
                weight: 0.5
            })
        );
        assert_eq!(
            bracket(&p, HectoPascal(800.0)),
            Some(Bracket {
                lower: 3,
                upper: 3,
                weight: 0.0
            })
        );
        assert_eq!(bracket(&p, HectoPascal(1010.0)), None);
        assert_eq!(
            bracket(&p[..1], HectoPascal(1000.0)),
            Some(Bracket {
                lower: 0,
                upper: 0,
                weight: 0.0
            })
        );
    }

    #[test]
    fn test_linear_interpolate_sounding_between_levels() {
        let snd = make_test_sounding();
        let row = linear_interpolate_sounding(&snd, HectoPascal(875.0)).unwrap();

        assert_eq!(row.pressure.unwrap(), HectoPascal(875.0));
        let t = row.temperature.unwrap();
        assert!((t - Celsius(20.25)).unpack().abs() < 1.0e-9);
        let h = row.height.unwrap();
        assert!((h - Meters(1285.0)).unpack().abs() < 1.0e-9);
        assert!(row.wind.is_some());
    }

    #[test]
    fn test_linear_interpolate_sounding_at_level() {
        let snd = make_test_sounding();
        let row = linear_interpolate_sounding(&snd, HectoPascal(500.0)).unwrap();
        assert_eq!(row, snd.data_row(12).unwrap());
    }

    #[test]
    fn test_no_extrapolation() {
        let snd = make_test_sounding();
        assert!(linear_interpolate_sounding(&snd, HectoPascal(1013.0)).is_err());
        assert!(linear_interpolate_sounding(&snd, HectoPascal(50.0)).is_err());
    }

    #[test]
    fn test_wind_interpolated_by_components() {
        // From the west at 10 m/s below, from the south at 10 m/s above.
        let snd = Sounding::new()
            .with_pressure_profile(vec![some(HectoPascal(900.0)), some(HectoPascal(800.0))])
            .with_temperature_profile(vec![some(Celsius(20.0)), none()])
            .with_wind_components(&[10.0, 0.0], &[0.0, 10.0]);

        let row = linear_interpolate_sounding(&snd, HectoPascal(850.0)).unwrap();
        let WindUV::<MetersPSec> { u, v } = WindUV::from(row.wind.unwrap());
        assert!((u.unpack() - 5.0).abs() < 1.0e-6);
        assert!((v.unpack() - 5.0).abs() < 1.0e-6);

        // Missing above, missing in the result.
        assert!(row.temperature.is_none());
    }

    #[test]
    fn test_interp_f64() {
        assert!((interp_f64(1.5, 1.0, 2.0, 10.0, 20.0) - 15.0).abs() < 1.0e-12);
        assert!((interp_f64(1.0, 1.0, 1.0, 3.0, 5.0) - 3.0).abs() < 1.0e-12);
    }
}
