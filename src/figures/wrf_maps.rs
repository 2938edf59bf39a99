//! Reflectivity, vorticity and cross sections from the WRF simulation.
use super::{Inputs, TITLE_SIZE};
use crate::{
    cross_section::{interpolate_to_height, vertical_cross_section, CrossSection},
    error::{FigureError, FigureResult},
    grid::MeshField,
    loaders::WrfOutput,
    map::{Gridlines, Map, MapData, MarkerStyle},
    render::{
        arange, filled_bands, format_tick, named, radar, z_order, ContinuousMap,
        DiscreteColormap, Dash, Figure, HAlign, LegendLocation, LineStyle, LinearAxes,
        MarkerKind, Orientation, Rect, TextSpec, VAlign,
    },
    smoothing::gaussian_filter,
};
use log::info;
use ndarray::Array2;
use std::path::PathBuf;

/// Height of the reflectivity map of the outer domain, meters above ground.
const REFLECTIVITY_AGL: f64 = 300.0;

/// Height of the vorticity and reflectivity maps of the inner domain, meters above sea level.
const INNER_MAP_HEIGHT: f64 = 1000.0;

/// Smoothing of the vorticity, grid lengths.
const VORTICITY_SIGMA: f64 = 5.0;

/// Size of the cross section figure, pixels.
const SECTION_FIGURE: (u32, u32) = (1200, 1200);

fn mesh(wrf: &WrfOutput, values: Array2<f64>) -> MeshField {
    MeshField {
        latitude: wrf.latitude().clone(),
        longitude: wrf.longitude().clone(),
        values,
    }
}

fn wrf_title_time(inputs: &Inputs) -> String {
    inputs
        .config()
        .wrf_time
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Simulated reflectivity 300 m above ground in the outer domain.
pub fn p2_2(inputs: &Inputs) -> FigureResult<PathBuf> {
    let wrf = inputs.wrf_outer()?;
    let dbz = interpolate_to_height(wrf.reflectivity()?, &wrf.height_agl(), REFLECTIVITY_AGL)?;
    let title = format!(
        "WRF {} 离地 {}m 反射率 (dBZ)",
        wrf_title_time(inputs),
        REFLECTIVITY_AGL
    );

    let cmap = radar();
    let mut map = Map::new(
        MapData::Raw,
        inputs
            .map_options()
            .projection(wrf.projection())
            .location_color(named::RED),
    );
    map.common(inputs.boundaries())
        .contourf(&mesh(wrf, dbz), &cmap)
        .colorbar(&cmap, "Reflectivity [dBZ]")
        .draw_tornado_location(true)
        .title(title.as_str(), TITLE_SIZE);

    inputs.save_map(map, inputs.output_path(&title))
}

/// Absolute vorticity 1 km above sea level in the inner domain with the cross section path.
pub fn p4_11(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let path = &config.cross_section;
    let wrf = inputs.wrf_inner()?;

    let avo = interpolate_to_height(&wrf.absolute_vorticity()?, wrf.height(), INNER_MAP_HEIGHT)?;
    let avo = gaussian_filter(&avo, VORTICITY_SIGMA);
    let title = format!("WRF {} 海拔 1km 绝对涡度", wrf_title_time(inputs));

    let cmap = ContinuousMap::Viridis
        .discretize(&arange(800.0, 1100.0, 100.0))
        .ok_or_else(|| FigureError::Render("too few vorticity levels".to_owned()))?
        .with_over(ContinuousMap::Viridis.sample(1.0));

    let mut map = Map::new(
        MapData::Raw,
        inputs
            .map_options()
            .projection(wrf.projection())
            .location_color(named::RED),
    );
    map.common(inputs.boundaries())
        .contourf(&mesh(wrf, avo), &cmap)
        .colorbar(&cmap, "绝对涡度 [10⁻⁵ s⁻¹]")
        .draw_tornado_location(false)
        .title(title.as_str(), TITLE_SIZE);
    map.scale_bar(5.0, (0.1, 0.95), "km", 1000.0)?;
    map.scatter(
        path.center.pair(),
        MarkerStyle::new(MarkerKind::Star, 100.0, &named::ORANGE_RED).alpha(0.75),
        Some("垂直剖面路径中点"),
    )
    .line(
        &[path.start(), path.end()],
        LineStyle::new(&named::GREEN, 1.5),
        Some(MarkerKind::Circle),
        Some("垂直剖面路径"),
    )
    .legend(LegendLocation::LowerRight);

    inputs.save_map(map, inputs.output_path(&title))
}

/// Reflectivity 1 km above sea level in the inner domain beside cross sections of wind speed and
/// reflectivity along the path.
pub fn p4_12(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let path = &config.cross_section;
    let wrf = inputs.wrf_inner()?;
    let dbz = wrf.reflectivity()?;
    let locator = wrf.locator();
    let cmap = radar();

    let dbz_1km = interpolate_to_height(dbz, wrf.height(), INNER_MAP_HEIGHT)?;

    let speed = vertical_cross_section(
        &wrf.wind_speed(),
        wrf.height(),
        &locator,
        path.start(),
        path.end(),
        None,
    )?;
    // Reflectivity is averaged as linear Z.
    let linear = dbz.mapv(|dbz| 10f64.powf(dbz / 10.0));
    let reflectivity = vertical_cross_section(
        &linear,
        wrf.height(),
        &locator,
        path.start(),
        path.end(),
        None,
    )?
    .map(|z| 10.0 * z.log10());

    let (width, height) = SECTION_FIGURE;
    let mut map = Map::new(
        MapData::Raw,
        inputs
            .map_options()
            .projection(wrf.projection())
            .size(width, height)
            .panel([0.02, 0.1, 0.5, 0.8]),
    );
    map.contourf(&mesh(wrf, dbz_1km), &cmap)
        .colorbar(&cmap, "Reflectivity (dBZ)")
        .line(
            &[path.start(), path.end()],
            LineStyle::new(&named::YELLOW, 1.5),
            Some(MarkerKind::Circle),
            None,
        )
        .scatter(
            path.center.pair(),
            MarkerStyle::new(MarkerKind::Circle, 50.0, &named::RED),
            None,
        )
        .gridlines_with(Gridlines::plain(
            LineStyle::new(&named::WHITE, 1.0).dash(Dash::Dotted),
        ))
        .title("海拔1km反射率 (dBZ)", 16.0);
    let mut fig = map.into_figure()?;

    let top = Rect::from_fractions(width, height, [0.6, 0.56, 0.3, 0.36]);
    let bottom = Rect::from_fractions(width, height, [0.6, 0.12, 0.3, 0.36]);
    draw_section(&mut fig, &speed, top, "垂直剖面风速 (m/s)", &cmap, false);
    draw_section(&mut fig, &reflectivity, bottom, "垂直剖面反射率 (dBZ)", &cmap, true);

    let title = format!("WRF {} 海拔1km反射率与垂直剖面", wrf_title_time(inputs));
    let out = inputs.output_path(&title);
    fig.save(&out)?;
    info!("wrote {}", out.display());
    Ok(out)
}

/// Height of a fractional row of a cross section.
fn level_at(levels: &[f64], row: f64) -> f64 {
    if levels.len() < 2 {
        return levels.first().copied().unwrap_or(std::f64::NAN);
    }
    let k = (row.floor().max(0.0) as usize).min(levels.len() - 2);
    levels[k] + (row - k as f64) * (levels[k + 1] - levels[k])
}

/// `(23.21, 113.45)`
fn lat_lon_label((lat, lon): (f64, f64)) -> String {
    format!("({:.2}, {:.2})", lat, lon)
}

/// Filled contours of a cross section in a panel, with axes, a color bar and a title.
fn draw_section(
    fig: &mut Figure,
    section: &CrossSection,
    rect: Rect,
    title: &str,
    cmap: &DiscreteColormap,
    label_points: bool,
) {
    let n_points = section.points.len();
    if section.levels.is_empty() || n_points == 0 {
        return;
    }
    let y_range = (section.levels[0], section.levels[section.levels.len() - 1]);
    let axes = LinearAxes::new(rect, (0.0, (n_points.max(2) - 1) as f64), y_range);
    let to_page = |(c, r): (f64, f64)| axes.to_page(c, level_at(&section.levels, r));

    let bands = cmap.bands();
    let limits: Vec<(f64, f64)> = bands.iter().map(|&(lo, hi, _)| (lo, hi)).collect();
    for polygon in filled_bands(&section.values, &limits) {
        let pts = polygon.points.iter().cloned().map(to_page).collect();
        fig.polygon(z_order::FILL, Some(rect), pts, bands[polygon.band].2);
    }
    fig.frame(rect, LineStyle::new(&named::BLACK, 1.0));

    let tick_font = 10.0;
    let tick = LineStyle::new(&named::BLACK, 0.8);
    for (row, &level) in section.levels.iter().enumerate().step_by(20) {
        let (x, y) = to_page((0.0, row as f64));
        fig.polyline(z_order::FRAME, None, vec![(x - 4.0, y), (x, y)], tick);
        fig.text(
            z_order::FRAME,
            (x - 6.0, y),
            format_tick(level.round()),
            TextSpec::new(tick_font).align(HAlign::Right, VAlign::Center),
        );
    }

    let step = if label_points { 40 } else { 20 };
    for (col, &point) in section.points.iter().enumerate().step_by(step) {
        let (x, y) = to_page((col as f64, 0.0));
        fig.polyline(z_order::FRAME, None, vec![(x, y), (x, y + 4.0)], tick);
        if label_points {
            fig.text(
                z_order::FRAME,
                (x, y + 6.0),
                lat_lon_label(point),
                TextSpec::new(tick_font)
                    .align(HAlign::Right, VAlign::Center)
                    .vertical(),
            );
        }
    }

    let axis_font = TextSpec::new(12.0).align(HAlign::Center, VAlign::Bottom);
    fig.text(
        z_order::FRAME,
        (rect.left - 60.0, (rect.top + rect.bottom) / 2.0),
        "海拔高度 (m)",
        axis_font.vertical(),
    );
    if label_points {
        fig.text(
            z_order::FRAME,
            ((rect.left + rect.right) / 2.0, rect.bottom + 130.0),
            "纬度, 经度",
            TextSpec::new(12.0).align(HAlign::Center, VAlign::Top),
        );
    }

    fig.text(
        z_order::LEGEND,
        ((rect.left + rect.right) / 2.0, rect.top - 8.0),
        title,
        TextSpec::new(16.0).align(HAlign::Center, VAlign::Bottom),
    );

    let bar = Rect::new(rect.right + 12.0, rect.top, rect.right + 30.0, rect.bottom);
    fig.colorbar(bar, cmap, "", tick_font, Orientation::Vertical);
}
