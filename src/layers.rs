//! Layers of the atmosphere defined by height above ground, and the bulk shear across them.
use crate::{
    error::{AnalysisError::MissingValue, Result},
    levels::height_level,
    sounding::{DataRow, Sounding},
};
use metfor::{Knots, Meters, MetersPSec, WindSpdDir, WindUV};

/// A layer in the atmosphere described by the values at the top and bottom.
#[derive(Debug, Clone, Copy)]
pub struct Layer {
    /// Sounding values at the bottom of the layer.
    pub bottom: DataRow,
    /// Sounding values at the top of the layer.
    pub top: DataRow,
}

impl Layer {
    /// Get the bulk wind shear, the wind at the top minus the wind at the bottom.
    pub fn wind_shear(&self) -> Result<WindUV<MetersPSec>> {
        let top = self.top.wind.ok_or(MissingValue)?;
        let bottom = self.bottom.wind.ok_or(MissingValue)?;

        let WindUV { u: top_u, v: top_v } = WindUV::<MetersPSec>::from(top);
        let WindUV {
            u: bottom_u,
            v: bottom_v,
        } = WindUV::<MetersPSec>::from(bottom);

        Ok(WindUV {
            u: top_u - bottom_u,
            v: top_v - bottom_v,
        })
    }

    /// Get the magnitude of the bulk wind shear in m/s.
    pub fn wind_shear_speed(&self) -> Result<MetersPSec> {
        let shear = self.wind_shear()?;
        let WindSpdDir::<Knots> { speed, .. } = WindSpdDir::from(shear);
        Ok(MetersPSec::from(speed))
    }
}

/// Get a layer that has a certain thickness above ground level, like 3km or 6km.
///
/// The bottom of the layer is the lowest row of the sounding.
#[inline]
pub fn layer_agl(snd: &Sounding, meters_agl: Meters) -> Result<Layer> {
    let sfc = snd.surface_height().ok_or(MissingValue)?;
    let bottom = snd
        .bottom_up()
        .find(|row| row.pressure.is_some() && row.height.is_some())
        .ok_or(MissingValue)?;

    let top = height_level(sfc + meters_agl, snd)?;
    Ok(Layer { bottom, top })
}

/// Bulk shear over the layer from the surface up to `meters_agl`.
///
/// # Examples
///
/// ```rust
/// # use tornado_figures::doctest::make_test_sounding;
/// use metfor::{Meters, MetersPSec};
/// use tornado_figures::bulk_shear;
///
/// let snd = make_test_sounding();
/// let shear = bulk_shear(&snd, Meters(6000.0)).unwrap();
/// assert!(shear.u > MetersPSec(0.0));
/// ```
#[inline]
pub fn bulk_shear(snd: &Sounding, meters_agl: Meters) -> Result<WindUV<MetersPSec>> {
    layer_agl(snd, meters_agl)?.wind_shear()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use metfor::{Celsius, HectoPascal, Quantity};
    use optional::some;

    fn make_test_layer() -> Layer {
        let mut bottom = DataRow::default();
        bottom.pressure = some(HectoPascal(1000.0));
        bottom.temperature = some(Celsius(20.0));
        bottom.height = some(Meters(5.0));
        bottom.wind = some(WindSpdDir {
            speed: Knots::from(MetersPSec(1.0)),
            direction: 180.0,
        });

        let mut top = DataRow::default();
        top.pressure = some(HectoPascal(700.0));
        top.temperature = some(Celsius(-2.0));
        top.height = some(Meters(3012.0));
        top.wind = some(WindSpdDir {
            speed: Knots::from(MetersPSec(1.0)),
            direction: 90.0,
        });

        Layer { bottom, top }
    }

    #[test]
    fn test_wind_shear() {
        let lyr = make_test_layer();
        // From the south at 1 m/s to from the east at 1 m/s
        let WindUV { u, v } = lyr.wind_shear().unwrap();
        assert!((u.unpack() - -1.0).abs() < 1.0e-6);
        assert!((v.unpack() - -1.0).abs() < 1.0e-6);
        let speed = lyr.wind_shear_speed().unwrap();
        assert!((speed.unpack() - std::f64::consts::SQRT_2).abs() < 1.0e-6);
    }

    #[test]
    fn test_layer_agl() {
        let snd = make_test_sounding();
        let lyr = layer_agl(&snd, Meters(1000.0)).unwrap();
        assert_eq!(lyr.bottom.pressure.unwrap(), HectoPascal(1000.0));
        assert!((lyr.top.height.unwrap() - Meters(1110.0)).unpack().abs() < 1.0e-6);
    }
}
