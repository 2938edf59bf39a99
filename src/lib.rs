#![warn(missing_docs)]
//! Derived fields and figures for the 2024-04-27 Guangzhou tornado case study.
//!
//! The crate reads ERA5 reanalysis, MICAPS radiosonde and WRF model output, computes the derived
//! quantities the case study needs (sounding parameters, smoothed synoptic fields, moisture flux
//! divergence, vorticity, vertical cross sections) and renders the figures as SVG.

//
// API
//
pub use crate::{
    analysis::SoundingAnalysis,
    cross_section::{interpolate_to_height, vertical_cross_section, CrossSection},
    error::{AnalysisError, FigureError, FigureResult, Result},
    grid::{BoundingBox, Field2D, GridKind, GriddedDataset, MeshField},
    indexes::{k_index, significant_tornado, supercell_composite, total_totals},
    interpolation::linear_interpolate_sounding,
    keys::PanelValue,
    kinematics::{absolute_vorticity, divergence},
    layers::{bulk_shear, Layer},
    parcel::{mixed_layer_parcel, most_unstable_parcel, surface_parcel, Parcel},
    parcel_profile::{
        lift_parcel, parcel_temperature_profile, ParcelAscentAnalysis, ParcelPath, ParcelProfile,
    },
    projection::utm_zone_from_lon,
    smoothing::gaussian_filter,
    sounding::{DataRow, Sounding, StationInfo},
    wind::{bunkers_storm_motion, mean_wind, sr_helicity, Helicity, StormMotion},
};

pub mod boundaries;
pub mod config;
pub mod cross_section;
pub mod figures;
pub mod fonts;
pub mod grid;
pub mod indexes;
pub mod kinematics;
pub mod layers;
pub mod levels;
pub mod loaders;
pub mod map;
pub mod parcel;
pub mod projection;
pub mod render;
pub mod skewt;
pub mod smoothing;
pub mod wind;

#[doc(hidden)]
pub mod doctest {
    pub use crate::sounding::doctest::make_test_sounding;
}

//
// Internal use only
//

// Modules
mod analysis;
mod error;
mod interpolation;
mod keys;
mod parcel_profile;
mod sounding;
