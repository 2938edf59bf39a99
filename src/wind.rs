//! Layer mean winds, storm motion, and storm relative helicity.
use crate::{
    error::{AnalysisError, Result},
    layers::{self, Layer},
    levels::height_level,
    sounding::Sounding,
};
use itertools::{izip, Itertools};
use metfor::{IntHelicityM2pS2, Knots, Meters, MetersPSec, Quantity, WindSpdDir, WindUV};
use std::iter::once;

/// Pressure weighted mean wind in a layer.
///
/// The u and v components are integrated over pressure with the trapezoid rule from the bottom of
/// the layer, through the sounding levels inside it, to the top of the layer.
pub fn mean_wind(layer: &Layer, snd: &Sounding) -> Result<WindUV<MetersPSec>> {
    let pressure = snd.pressure_profile();
    let wind = snd.wind_profile();

    let bottom_p = layer
        .bottom
        .pressure
        .into_option()
        .ok_or(AnalysisError::MissingValue)?;
    let top_p = layer
        .top
        .pressure
        .into_option()
        .ok_or(AnalysisError::MissingValue)?;

    let inside = izip!(pressure, wind)
        .filter_map(|(p, w)| p.into_option().map(|p| (p, *w)))
        .skip_while(|&(p, _)| p >= bottom_p)
        .take_while(|&(p, _)| p > top_p);

    let (iu, iv, total_dp) = once((bottom_p, layer.bottom.wind))
        .chain(inside)
        .chain(once((top_p, layer.top.wind)))
        .filter_map(|(p, w)| w.into_option().map(|w| (p, w)))
        .map(|(p, w)| {
            let WindUV { u, v } = WindUV::<MetersPSec>::from(w);
            (p.unpack(), u.unpack(), v.unpack())
        })
        .tuple_windows::<(_, _)>()
        .fold((0.0, 0.0, 0.0), |(iu, iv, total_dp), ((p0, u0, v0), (p1, u1, v1))| {
            let dp = p0 - p1;
            (iu + (u0 + u1) * dp, iv + (v0 + v1) * dp, total_dp + dp)
        });

    if total_dp <= 0.0 {
        return Err(AnalysisError::NotEnoughData);
    }

    // 2.0 for the trapezoid rule
    Ok(WindUV {
        u: MetersPSec(iu / total_dp / 2.0),
        v: MetersPSec(iv / total_dp / 2.0),
    })
}

/// Storm relative helicity of a layer, split into its positive and negative parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helicity {
    /// Sum of the layers with positive (cyclonic for a right mover) helicity.
    pub positive: IntHelicityM2pS2,
    /// Sum of the layers with negative helicity.
    pub negative: IntHelicityM2pS2,
    /// The net helicity.
    pub total: IntHelicityM2pS2,
}

/// Storm relative helicity.
///
/// Uses the discrete form of the integral over the levels of the layer, with the top and bottom
/// of the layer included as levels:
/// `sum[(u[k+1] - cu) * (v[k] - cv) - (u[k] - cu) * (v[k+1] - cv)]`
pub fn sr_helicity<W>(layer: &Layer, storm_motion_uv_ms: W, snd: &Sounding) -> Result<Helicity>
where
    WindUV<MetersPSec>: From<W>,
{
    let height = snd.height_profile();
    let wind = snd.wind_profile();
    let storm_motion_uv_ms = WindUV::<MetersPSec>::from(storm_motion_uv_ms);

    let bottom = layer.bottom.height.ok_or(AnalysisError::MissingValue)?;
    let top = layer.top.height.ok_or(AnalysisError::MissingValue)?;

    let intermediate_layers = izip!(height, wind)
        .filter_map(|(hgt, wind)| hgt.into_option().map(|h| (h, *wind)))
        .skip_while(|&(hgt, _)| hgt <= bottom)
        .take_while(|&(hgt, _)| hgt < top);

    let (positive, negative, count) = once((bottom, layer.bottom.wind))
        .chain(intermediate_layers)
        .chain(once((top, layer.top.wind)))
        // Filter out levels with missing values
        .filter_map(|(_, w)| w.into_option())
        // Convert the wind and unpack it, subtract the storm motion.
        .map(|w| {
            let WindUV { u, v }: WindUV<MetersPSec> = From::<WindSpdDir<Knots>>::from(w);
            (
                (u - storm_motion_uv_ms.u).unpack(),
                (v - storm_motion_uv_ms.v).unpack(),
            )
        })
        .tuple_windows::<(_, _)>()
        .map(|((u0, v0), (u1, v1))| u1 * v0 - u0 * v1)
        .fold((0.0, 0.0, 0usize), |(pos, neg, count), h| {
            if h > 0.0 {
                (pos + h, neg, count + 1)
            } else {
                (pos, neg + h, count + 1)
            }
        });

    if count == 0 {
        return Err(AnalysisError::NotEnoughData);
    }

    Ok(Helicity {
        positive: IntHelicityM2pS2(positive),
        negative: IntHelicityM2pS2(negative),
        total: IntHelicityM2pS2(positive + negative),
    })
}

/// Supercell storm motions from the Bunkers "id" method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StormMotion {
    /// Right mover
    pub right_mover: WindUV<MetersPSec>,
    /// Left mover
    pub left_mover: WindUV<MetersPSec>,
    /// 0-6 km mean wind
    pub mean_wind: WindUV<MetersPSec>,
}

/// Calculate the super cell storm motion using the "id" method.
///
/// # Examples
///
/// ```rust
/// # use tornado_figures::doctest::make_test_sounding;
/// use metfor::Quantity;
/// use tornado_figures::bunkers_storm_motion;
///
/// let snd = make_test_sounding();
/// let motion = bunkers_storm_motion(&snd).unwrap();
///
/// // Right and left movers are symmetric about the mean wind.
/// let du = (motion.right_mover.u - motion.mean_wind.u) + (motion.left_mover.u - motion.mean_wind.u);
/// assert!(du.unpack().abs() < 1.0e-9);
/// ```
pub fn bunkers_storm_motion(snd: &Sounding) -> Result<StormMotion> {
    let layer = &layers::layer_agl(snd, Meters(6000.0))?;

    let WindUV {
        u: mean_u,
        v: mean_v,
    } = mean_wind(layer, snd)?;

    let WindUV {
        u: shear_u,
        v: shear_v,
    } = bulk_shear_half_km(layer, snd)?;

    const D: f64 = 7.5; // m/s

    let shear_mag = shear_u.unpack().hypot(shear_v.unpack());
    if shear_mag == 0.0 {
        return Err(AnalysisError::InvalidInput("no shear for storm motion"));
    }

    let scale = D / shear_mag;
    let (delta_u, delta_v) = (shear_v * scale, -shear_u * scale);

    Ok(StormMotion {
        right_mover: WindUV {
            u: mean_u + delta_u,
            v: mean_v + delta_v,
        },
        left_mover: WindUV {
            u: mean_u - delta_u,
            v: mean_v - delta_v,
        },
        mean_wind: WindUV {
            u: mean_u,
            v: mean_v,
        },
    })
}

/// Calculate the bulk shear of a layer using winds averaged over the bottom and top half km.
///
/// When using the id method for storm motion vectors, the bulk shear was calculated with top and
/// bottom wind vectors that were averaged over top/bottom half km of the layer.
///
/// Returns `(shear_u_ms, shear_v_ms)`
pub(crate) fn bulk_shear_half_km(layer: &Layer, snd: &Sounding) -> Result<WindUV<MetersPSec>> {
    let bottom = layer
        .bottom
        .height
        .into_option()
        .ok_or(AnalysisError::MissingValue)?;
    let top = layer
        .top
        .height
        .into_option()
        .ok_or(AnalysisError::MissingValue)?;

    // abort if not at least 250 meters of non-overlapping area.
    if top - bottom < Meters(750.0) {
        return Err(AnalysisError::NotEnoughData);
    }

    let top_bottom_layer = height_level(bottom + Meters(500.0), snd)?;
    let bottom_layer = &Layer {
        top: top_bottom_layer,
        bottom: layer.bottom,
    };

    let WindUV {
        u: bottom_u,
        v: bottom_v,
    } = mean_wind(bottom_layer, snd)?;

    let bottom_top_layer = height_level(top - Meters(500.0), snd)?;
    let top_layer = &Layer {
        top: layer.top,
        bottom: bottom_top_layer,
    };

    let WindUV { u: top_u, v: top_v } = mean_wind(top_layer, snd)?;

    Ok(WindUV {
        u: top_u - bottom_u,
        v: top_v - bottom_v,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use metfor::HectoPascal;
    use optional::some;

    fn make_veering_sounding() -> Sounding {
        Sounding::new()
            .with_pressure_profile(
                vec![1000.0, 950.0, 900.0]
                    .into_iter()
                    .map(HectoPascal)
                    .map(some)
                    .collect(),
            )
            .with_height_profile(
                vec![0.0, 500.0, 1000.0]
                    .into_iter()
                    .map(Meters)
                    .map(some)
                    .collect(),
            )
            .with_wind_components(&[0.0, 5.0, 0.0], &[5.0, 0.0, -5.0])
    }

    #[test]
    fn test_mean_wind_constant() {
        let snd = make_veering_sounding().with_wind_components(&[3.0; 3], &[4.0; 3]);
        let layer = layers::layer_agl(&snd, Meters(1000.0)).unwrap();
        let WindUV { u, v } = mean_wind(&layer, &snd).unwrap();

        assert!((u.unpack() - 3.0).abs() < 1.0e-6);
        assert!((v.unpack() - 4.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_mean_wind_is_pressure_weighted() {
        // Equal height steps, but the lower step is twice as thick in pressure.
        let snd = Sounding::new()
            .with_pressure_profile(
                vec![1000.0, 900.0, 850.0]
                    .into_iter()
                    .map(HectoPascal)
                    .map(some)
                    .collect(),
            )
            .with_height_profile(
                vec![0.0, 500.0, 1000.0]
                    .into_iter()
                    .map(Meters)
                    .map(some)
                    .collect(),
            )
            .with_wind_components(&[0.0, 6.0, 12.0], &[0.0; 3]);

        let layer = layers::layer_agl(&snd, Meters(1000.0)).unwrap();
        let WindUV { u, v } = mean_wind(&layer, &snd).unwrap();

        // (3 * 100 + 9 * 50) / 150, a height weighted mean would be 6.
        assert!((u.unpack() - 5.0).abs() < 1.0e-6);
        assert!(v.unpack().abs() < 1.0e-6);
    }

    #[test]
    fn test_sr_helicity_veering() {
        let snd = make_veering_sounding();
        let layer = layers::layer_agl(&snd, Meters(1000.0)).unwrap();
        let calm = WindUV {
            u: MetersPSec(0.0),
            v: MetersPSec(0.0),
        };

        let srh = sr_helicity(&layer, calm, &snd).unwrap();
        assert!((srh.positive.unpack() - 50.0).abs() < 1.0e-6);
        assert!(srh.negative.unpack().abs() < 1.0e-9);
        assert!((srh.total.unpack() - 50.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_sr_helicity_unidirectional_is_zero() {
        let snd = make_veering_sounding().with_wind_components(&[2.0, 6.0, 10.0], &[0.0; 3]);
        let layer = layers::layer_agl(&snd, Meters(1000.0)).unwrap();
        let calm = WindUV {
            u: MetersPSec(0.0),
            v: MetersPSec(0.0),
        };

        let srh = sr_helicity(&layer, calm, &snd).unwrap();
        assert!(srh.total.unpack().abs() < 1.0e-9);
    }

    #[test]
    fn test_bunkers_right_mover_is_right_of_shear() {
        let snd = make_test_sounding();
        let motion = bunkers_storm_motion(&snd).unwrap();
        let shear = bulk_shear_half_km(&layers::layer_agl(&snd, Meters(6000.0)).unwrap(), &snd)
            .unwrap();

        let du = (motion.right_mover.u - motion.mean_wind.u).unpack();
        let dv = (motion.right_mover.v - motion.mean_wind.v).unpack();

        // 7.5 m/s deviation
        assert!((du.hypot(dv) - 7.5).abs() < 1.0e-6);
        // Cross product of shear and deviation is negative for a deviation to the right.
        assert!(shear.u.unpack() * dv - shear.v.unpack() * du < 0.0);
    }

    #[test]
    fn test_veering_profile_has_positive_srh_for_right_mover() {
        let snd = make_test_sounding();
        let motion = bunkers_storm_motion(&snd).unwrap();
        let layer = layers::layer_agl(&snd, Meters(3000.0)).unwrap();
        let srh = sr_helicity(&layer, motion.right_mover, &snd).unwrap();
        assert!(srh.total > IntHelicityM2pS2(0.0));
    }
}
