//! Finds levels in a profile defined by a height rather than by pressure.
use crate::{
    error::{
        AnalysisError::{MissingProfile, NotEnoughData},
        Result,
    },
    interpolation::{linear_interp, linear_interpolate_sounding},
    sounding::{DataRow, Sounding},
};
use itertools::{izip, Itertools};
use metfor::Meters;

/// A level in the atmosphere is described by a `DataRow` from a sounding.
pub type Level = DataRow;

/// Find a level at a specific geopotential height (meters above mean sea level).
///
/// The pressure at `tgt_height` is found between the two levels around it, linear in height, and
/// the rest of the sounding is interpolated to that pressure.
pub fn height_level(tgt_height: Meters, snd: &Sounding) -> Result<Level> {
    let h_profile = snd.height_profile();
    let p_profile = snd.pressure_profile();

    if h_profile.is_empty() || p_profile.is_empty() {
        return Err(MissingProfile);
    }

    let target_p = izip!(p_profile, h_profile)
        .filter_map(|(p, h)| Some((p.into_option()?, h.into_option()?)))
        .tuple_windows::<(_, _)>()
        .find_map(|((p0, h0), (p1, h1))| {
            if h0 == tgt_height {
                Some(p0)
            } else if h1 == tgt_height {
                Some(p1)
            } else if h0 < tgt_height && tgt_height < h1 {
                Some(linear_interp(tgt_height, h0, h1, p0, p1))
            } else {
                None
            }
        })
        .ok_or(NotEnoughData)?;

    linear_interpolate_sounding(snd, target_p)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use metfor::{HectoPascal, Quantity};

    #[test]
    fn test_height_level_interpolates_pressure() {
        let snd = make_test_sounding();
        let lvl = height_level(Meters(1285.0), &snd).unwrap();
        assert!((lvl.pressure.unwrap() - HectoPascal(875.0)).unpack().abs() < 1.0e-9);
    }

    #[test]
    fn test_height_level_exact() {
        let snd = make_test_sounding();
        let lvl = height_level(Meters(5860.0), &snd).unwrap();
        assert_eq!(lvl.pressure.unwrap(), HectoPascal(500.0));
    }

    #[test]
    fn test_height_level_above_top_fails() {
        let snd = make_test_sounding();
        assert!(height_level(Meters(20_000.0), &snd).is_err());
    }

    #[test]
    fn test_height_level_below_ground_fails() {
        let snd = make_test_sounding();
        assert!(height_level(Meters(50.0), &snd).is_err());
    }
}
