//! Data type and methods for building and describing the analysis shown with a skew-T.
//!
//! Values that cannot be computed from a sounding are left missing instead of failing the whole
//! analysis.
use crate::{
    error::Result,
    indexes::{k_index, lcl_height, significant_tornado, supercell_composite, total_totals},
    keys::PanelValue,
    layers::layer_agl,
    parcel::{mixed_layer_parcel, most_unstable_parcel, surface_parcel},
    parcel_profile::{lift_parcel, parcel_temperature_profile, ParcelAscentAnalysis, ParcelPath},
    sounding::Sounding,
    wind::{bunkers_storm_motion, sr_helicity, StormMotion},
};
use log::warn;
use metfor::{HectoPascal, IntHelicityM2pS2, JpKg, Meters, MetersPSec, Quantity};
use optional::{none, some, Optioned};

/// Depth of the layer used to find the mixed layer and most unstable parcels.
pub const PARCEL_LAYER_DEPTH: HectoPascal = HectoPascal(50.0);

/// Shear and helicity for one layer above ground level.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LayerKinematics {
    srh: Optioned<IntHelicityM2pS2>,
    shear: Optioned<MetersPSec>,
}

impl Default for LayerKinematics {
    fn default() -> Self {
        LayerKinematics {
            srh: none(),
            shear: none(),
        }
    }
}

/// Convenient package for the values plotted with a sounding.
#[derive(Debug, Clone)]
pub struct SoundingAnalysis {
    // Parcel lifted from the surface, evaluated at the sounding levels.
    parcel_path: Option<ParcelPath>,

    // Parcel analysis
    surface: Option<ParcelAscentAnalysis>,
    mixed_layer: Option<ParcelAscentAnalysis>,
    most_unstable: Option<ParcelAscentAnalysis>,

    // Profile specific indicies
    k_index: Optioned<f64>,
    total_totals: Optioned<f64>,
    lcl_height: Optioned<Meters>,

    // Kinematics
    storm_motion: Option<StormMotion>,
    layer_1km: LayerKinematics,
    layer_3km: LayerKinematics,
    layer_6km: LayerKinematics,

    // Composites
    significant_tornado: Optioned<f64>,
    supercell_composite: Optioned<f64>,
}

impl SoundingAnalysis {
    /// Analyze the sounding to get as much information as you can.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use tornado_figures::doctest::make_test_sounding;
    /// use tornado_figures::{PanelValue, SoundingAnalysis};
    ///
    /// let snd = make_test_sounding();
    /// let anal = SoundingAnalysis::analyze(&snd);
    ///
    /// assert!(anal.value(PanelValue::SBCAPE).is_some());
    /// assert!(anal.value(PanelValue::K).is_some());
    /// ```
    pub fn analyze(snd: &Sounding) -> Self {
        let parcel_path = keep("parcel path", parcel_temperature_profile(snd));

        let surface = keep(
            "surface parcel",
            surface_parcel(snd).and_then(|pcl| lift_parcel(pcl, snd)),
        );
        let mixed_layer = keep(
            "mixed layer parcel",
            mixed_layer_parcel(snd, PARCEL_LAYER_DEPTH).and_then(|pcl| lift_parcel(pcl, snd)),
        );
        let most_unstable = keep(
            "most unstable parcel",
            most_unstable_parcel(snd, PARCEL_LAYER_DEPTH).and_then(|pcl| lift_parcel(pcl, snd)),
        );

        let k_index = Optioned::from(keep("k-index", k_index(snd)));
        let total_totals = Optioned::from(keep("total totals", total_totals(snd)));

        let lcl_height: Optioned<Meters> = surface
            .as_ref()
            .and_then(|anal| {
                let lcl_p = anal.lcl_pressure().into_option()?;
                let lcl_t = anal.lcl_temperature().into_option()?;
                keep("lcl height", lcl_height(snd, lcl_p, lcl_t))
            })
            .into();

        let storm_motion = keep("storm motion", bunkers_storm_motion(snd));

        let layer_kinematics = |depth: Meters| -> LayerKinematics {
            let layer = match keep("layer", layer_agl(snd, depth)) {
                Some(layer) => layer,
                None => return LayerKinematics::default(),
            };

            let shear = keep("bulk shear", layer.wind_shear_speed()).into();
            let srh = storm_motion
                .and_then(|motion| keep("helicity", sr_helicity(&layer, motion.right_mover, snd)))
                .map(|helicity| helicity.total)
                .into();

            LayerKinematics { srh, shear }
        };

        let layer_1km = layer_kinematics(Meters(1000.0));
        let layer_3km = layer_kinematics(Meters(3000.0));
        let layer_6km = layer_kinematics(Meters(6000.0));

        let sbcape = surface.as_ref().and_then(|anal| anal.cape().into_option());
        let mucape = most_unstable
            .as_ref()
            .and_then(|anal| anal.cape().into_option());

        // Both composites use the 0-3 km shear.
        let significant_tornado = match (
            sbcape,
            lcl_height.into_option(),
            layer_3km.srh.into_option(),
            layer_3km.shear.into_option(),
        ) {
            (Some(cape), Some(lcl), Some(srh), Some(shear)) => {
                some(significant_tornado(cape, lcl, srh, shear))
            }
            _ => none(),
        };

        let supercell_composite = match (
            mucape,
            layer_3km.srh.into_option(),
            layer_3km.shear.into_option(),
        ) {
            (Some(cape), Some(srh), Some(shear)) => some(supercell_composite(cape, srh, shear)),
            _ => none(),
        };

        SoundingAnalysis {
            parcel_path,
            surface,
            mixed_layer,
            most_unstable,
            k_index,
            total_totals,
            lcl_height,
            storm_motion,
            layer_1km,
            layer_3km,
            layer_6km,
            significant_tornado,
            supercell_composite,
        }
    }

    /// Get a value for the parameter panel.
    pub fn value(&self, key: PanelValue) -> Optioned<f64> {
        use PanelValue::*;

        let cape = |anal: &Option<ParcelAscentAnalysis>| -> Optioned<f64> {
            anal.as_ref()
                .and_then(|anal| anal.cape().into_option())
                .map(JpKg::unpack)
                .into()
        };
        let cin = |anal: &Option<ParcelAscentAnalysis>| -> Optioned<f64> {
            anal.as_ref()
                .and_then(|anal| anal.cin().into_option())
                .map(JpKg::unpack)
                .into()
        };
        let srh = |lyr: &LayerKinematics| lyr.srh.map_t(IntHelicityM2pS2::unpack);
        let shear = |lyr: &LayerKinematics| lyr.shear.map_t(MetersPSec::unpack);

        match key {
            SBCAPE => cape(&self.surface),
            SBCIN => cin(&self.surface),
            MLCAPE => cape(&self.mixed_layer),
            MLCIN => cin(&self.mixed_layer),
            MUCAPE => cape(&self.most_unstable),
            MUCIN => cin(&self.most_unstable),
            TotalTotals => self.total_totals,
            K => self.k_index,
            SRH0to1km => srh(&self.layer_1km),
            Shear0to1km => shear(&self.layer_1km),
            SRH0to3km => srh(&self.layer_3km),
            Shear0to3km => shear(&self.layer_3km),
            SRH0to6km => srh(&self.layer_6km),
            Shear0to6km => shear(&self.layer_6km),
            SignificantTornado => self.significant_tornado,
            SupercellComposite => self.supercell_composite,
        }
    }

    /// The surface parcel temperature along the sounding levels.
    pub fn parcel_path(&self) -> Option<&ParcelPath> {
        self.parcel_path.as_ref()
    }

    /// Surface based parcel analysis.
    pub fn surface_parcel_analysis(&self) -> Option<&ParcelAscentAnalysis> {
        self.surface.as_ref()
    }

    /// Mixed layer parcel analysis.
    pub fn mixed_layer_parcel_analysis(&self) -> Option<&ParcelAscentAnalysis> {
        self.mixed_layer.as_ref()
    }

    /// Most unstable parcel analysis.
    pub fn most_unstable_parcel_analysis(&self) -> Option<&ParcelAscentAnalysis> {
        self.most_unstable.as_ref()
    }

    /// Bunkers storm motion.
    pub fn storm_motion(&self) -> Option<StormMotion> {
        self.storm_motion
    }

    /// LCL height of the surface parcel from the hydrostatic thickness.
    pub fn lcl_height(&self) -> Optioned<Meters> {
        self.lcl_height
    }
}

fn keep<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(val) => Some(val),
        Err(err) => {
            warn!("skipping {}: {}", what, err);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sounding::doctest::make_test_sounding;
    use strum::IntoEnumIterator;

    #[test]
    fn test_analyze_test_sounding() {
        let snd = make_test_sounding();
        let anal = SoundingAnalysis::analyze(&snd);

        for key in PanelValue::iter() {
            assert!(anal.value(key).is_some(), "missing {}", key);
        }

        assert!(anal.value(PanelValue::SBCIN).unwrap() <= 0.0);
        assert!(anal.value(PanelValue::Shear0to6km).unwrap() > anal.value(PanelValue::Shear0to1km).unwrap());
    }

    #[test]
    fn test_analyze_without_wind() {
        let snd = make_test_sounding().with_wind_profile(vec![]);
        let anal = SoundingAnalysis::analyze(&snd);

        assert!(anal.value(PanelValue::SBCAPE).is_some());
        assert!(anal.value(PanelValue::SRH0to3km).is_none());
        assert!(anal.value(PanelValue::Shear0to1km).is_none());
        assert!(anal.value(PanelValue::SignificantTornado).is_none());
        assert!(anal.storm_motion().is_none());
    }
}
