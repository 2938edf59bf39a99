//! Synoptic charts and diagnostics from ERA5.
use super::{Inputs, TITLE_SIZE};
use crate::{
    error::{FigureError, FigureResult},
    grid::{Field2D, GriddedDataset},
    kinematics::{dew_point_depression, dew_point_from_specific_humidity, divergence, wind_speed},
    map::{ContourLabels, ContourStyle, ContourTicks, Map, MapData, MapOptions},
    projection::Projection,
    render::{arange, named, nice_levels, ContinuousMap, DiscreteColormap, LineStyle},
    smoothing::gaussian_filter,
};
use chrono::NaiveDateTime;
use metfor::HectoPascal;
use plotters::style::RGBColor;
use std::path::PathBuf;

/// Smoothing of the heights and temperatures of the synoptic charts, grid lengths.
const SYNOPTIC_SIGMA: f64 = 5.0;

/// Smoothing of the mesoscale analysis fields, grid lengths.
const ANALYSIS_SIGMA: f64 = 2.0;

/// Line color of the streamlines.
const STREAMLINE_BLUE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);

fn colormap(cmap: Option<DiscreteColormap>) -> FigureResult<DiscreteColormap> {
    cmap.ok_or_else(|| FigureError::Render("too few levels for a color map".to_owned()))
}

fn pressure_level_chart(inputs: &Inputs, level: f64) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let ds = inputs.geopotential()?;
    let title = format!("{} {}hPa", config.title_time(config.synoptic_time), level);

    let mut map = Map::new(
        MapData::from_dataset(ds),
        inputs.map_options().location_color(named::BLUE),
    );
    map.common(inputs.boundaries())
        .plot(config.synoptic_time, Some(level), SYNOPTIC_SIGMA, SYNOPTIC_SIGMA)?
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

/// 500 hPa heights, temperature and winds.
pub fn p4_1(inputs: &Inputs) -> FigureResult<PathBuf> {
    pressure_level_chart(inputs, 500.0)
}

/// 700 hPa heights, temperature and winds.
pub fn p4_2(inputs: &Inputs) -> FigureResult<PathBuf> {
    pressure_level_chart(inputs, 700.0)
}

/// 850 hPa heights, temperature and winds.
pub fn p4_3(inputs: &Inputs) -> FigureResult<PathBuf> {
    pressure_level_chart(inputs, 850.0)
}

/// Sea level pressure and 10 m winds.
pub fn p4_4(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let ds = inputs.surface()?;
    let title = format!("{} 海平面", config.title_time(config.synoptic_time));

    let mut map = Map::new(
        MapData::from_dataset(ds),
        inputs.map_options().location_color(named::RED),
    );
    map.common(inputs.boundaries())
        .plot(config.synoptic_time, None, SYNOPTIC_SIGMA, SYNOPTIC_SIGMA)?
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

/// Eastward and northward vertically integrated water vapour flux.
fn water_vapour_flux(inputs: &Inputs) -> FigureResult<(Field2D, Field2D)> {
    let config = inputs.config();
    let ds = inputs.surface()?;
    let east = ds.select("viwve", config.synoptic_time, None)?;
    let north = ds.select("viwvn", config.synoptic_time, None)?;
    Ok((east, north))
}

/// Magnitude and arrows of the vertically integrated water vapour flux.
pub fn p4_5a(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let (east, north) = water_vapour_flux(inputs)?;
    let flux = east.with_values(wind_speed(&east.values, &north.values))?;
    let title = format!("{} 整层水汽通量", config.title_time(config.synoptic_time));

    let cmap = colormap(ContinuousMap::Greens.discretize(&arange(0.0, 800.0, 100.0)))?;
    let scale = 5000.0;

    let mut map = Map::new(
        MapData::Raw,
        inputs.map_options().projection(Projection::PlateCarree),
    );
    map.common(inputs.boundaries())
        .contourf(&flux.to_mesh(), &cmap)
        .colorbar(&cmap, "水汽通量 [kg·m⁻¹·s⁻¹]")
        .quiver(
            &east.stride(15).to_mesh(),
            &north.stride(15).to_mesh(),
            scale,
            &named::BLACK,
        )
        .quiver_key((0.8, -0.1), 100.0, scale, "100 kg·m⁻¹·s⁻¹", &named::RED)
        .gridlines()
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

/// Divergence of the vertically integrated water vapour flux.
pub fn p4_5b(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let (east, north) = water_vapour_flux(inputs)?;
    let div = divergence(&east.values, &north.values, &east.latitude, &east.longitude)?;
    let div = east.with_values(div)?;
    let title = format!("{} 整层水汽通量散度", config.title_time(config.synoptic_time));

    let (lo, hi) = div
        .values
        .iter()
        .filter(|v| v.is_finite())
        .fold((std::f64::INFINITY, std::f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(lo < hi) {
        return Err(FigureError::Render(
            "water vapour flux divergence has no range".to_owned(),
        ));
    }
    let cmap = colormap(ContinuousMap::PiYG.discretize(&nice_levels(lo, hi, 12)))?;

    let mut map = Map::new(
        MapData::Raw,
        inputs.map_options().projection(Projection::PlateCarree),
    );
    map.common(inputs.boundaries())
        .contourf(&div.to_mesh(), &cmap)
        .colorbar(&cmap, "水汽通量散度 [kg·m⁻²·s⁻¹]")
        .gridlines()
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

/// CAPE over South China.
pub fn p4_6(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let ds = inputs.surface()?;
    let cape = ds
        .select("cape", config.synoptic_time, None)?
        .subset(&config.south_china_box())?;
    let title = format!("{} CAPE", config.title_time(config.synoptic_time));

    let cmap = colormap(ContinuousMap::YlOrBr.discretize(&arange(1000.0, 5100.0, 250.0)))?
        .with_over(ContinuousMap::YlOrBr.sample(1.0));

    let mut map = Map::new(MapData::Raw, inputs.map_options());
    map.common(inputs.boundaries())
        .contourf(&cape.to_mesh(), &cmap)
        .colorbar(&cmap, "CAPE")
        .draw_tornado_location(true)
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

fn analysis_options(inputs: &Inputs) -> MapOptions {
    inputs
        .map_options()
        .projection(Projection::lambert(112.0, 35.0))
        .location_color(named::RED)
}

/// Smoothed dew point depression on a level, K.
fn dew_point_depression_at(
    ds: &GriddedDataset,
    time: NaiveDateTime,
    level: f64,
) -> FigureResult<Field2D> {
    let t = ds.select("t", time, Some(level))?;
    let q = ds.select("q", time, Some(level))?;
    let td = dew_point_from_specific_humidity(HectoPascal(level), &q.values);
    let depression = dew_point_depression(&t.values, &td);
    Ok(t.with_values(gaussian_filter(&depression, ANALYSIS_SIGMA))?)
}

/// The 925 hPa moist zone (T−Td ≤ 5 K) and the 500 hPa dry zone (T−Td ≥ 15 K).
pub fn p4_7_layer1(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let ds = inputs.geopotential()?.subset(&config.south_china_box())?;
    let title = format!("{} 中分析图", config.title_time(config.synoptic_time));

    let moist = dew_point_depression_at(&ds, config.synoptic_time, 925.0)?;
    let dry = dew_point_depression_at(&ds, config.synoptic_time, 500.0)?;

    let ticked = |color: &RGBColor, angle: f64| {
        ContourStyle::new(LineStyle::new(color, 1.5))
            .labels(ContourLabels::shortest())
            .ticks(ContourTicks {
                angle,
                length: 0.5,
                spacing: 20.0,
            })
    };

    let mut map = Map::new(MapData::from_dataset(&ds), analysis_options(inputs));
    map.common(inputs.boundaries())
        .contour(&moist.to_mesh(), &[5.0], ticked(&named::GREEN, -90.0))
        .contour(&dry.to_mesh(), &[15.0], ticked(&named::GOLD, 90.0))
        .draw_tornado_location(true)
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

/// Smoothed heights and streamlines on one pressure level of the mesoscale analysis.
pub fn p4_7_layer2(inputs: &Inputs, level: f64) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let ds = inputs.geopotential()?.subset(&config.south_china_box())?;
    let time = config.synoptic_time;
    let title = format!("{}", level);

    let z = ds.select("z", time, Some(level))?;
    let z = z.with_values(gaussian_filter(&z.values, ANALYSIS_SIGMA))?;
    let u = ds.select("u", time, Some(level))?.to_mesh();
    let v = ds.select("v", time, Some(level))?.to_mesh();

    let mut map = Map::new(MapData::from_dataset(&ds), analysis_options(inputs));
    map.common(inputs.boundaries())
        .set_extent(config.south_china)
        .contour(
            &z.to_mesh(),
            &arange(0.0, 999.0, 4.0),
            ContourStyle::new(LineStyle::new(&named::BLACK, 1.5)).labels(ContourLabels::fixed(0)),
        )
        .streamlines(&u, &v, LineStyle::new(&STREAMLINE_BLUE, 1.0), 1.0)
        .draw_tornado_location(true)
        .title(title.as_str(), TITLE_SIZE);

    let path = config
        .output_dir
        .join("levels")
        .join(format!("{}.svg", super::file_name(&title)));
    inputs.save_map(map, path)
}
