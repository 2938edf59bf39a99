//! Skew-T log-p diagrams with a hodograph inset and a severe weather parameter panel.
//!
//! Temperatures are plotted on log-pressure axes skewed so isotherms lean 45 degrees to the right.
//! The hodograph is colored by height and the panel lists the values of [`PanelValue`].
use crate::{
    analysis::SoundingAnalysis,
    error::{AnalysisError, FigureResult},
    keys::PanelValue,
    parcel_profile::moist_adiabat,
    render::{
        barb_shape, decompose_barb, format_tick, named, points, z_order, BarbIncrements,
        ContinuousMap, Dash, Figure, HAlign, LegendEntry, LegendGlyph, LegendLocation, LineStyle,
        LinearAxes, MarkerKind, Rect, TextSpec, VAlign,
    },
    sounding::Sounding,
};
use log::debug;
use metfor::{Celsius, HectoPascal, Kelvin, MetersPSec, Quantity, WindUV};
use plotters::style::{Color, RGBAColor, RGBColor};
use std::path::Path;
use strum::IntoEnumIterator;

/// Size of a sounding figure in pixels.
pub const FIGURE_SIZE: (u32, u32) = (1800, 1200);

const SKEW_PANEL: [f64; 4] = [0.08, 0.08, 0.47, 0.87];
const HODOGRAPH_PANEL: [f64; 4] = [0.48, 0.45, 0.5, 0.5];
const PARAMETER_PANEL: [f64; 4] = [0.563, 0.08, 0.334, 0.34];

const ROTATION_DEG: f64 = 45.0;
const T_RANGE: (f64, f64) = (-20.0, 30.0);
const P_RANGE: (f64, f64) = (1000.0, 100.0);

// Background lines are drawn over a slightly larger pressure range than the axes.
const BACKGROUND_P: (f64, f64) = (1100.0, 50.0);

const COMPONENT_RANGE: f64 = 80.0;
const HODOGRAPH_TOP: f64 = 12_000.0;

const AXIS_FONT: f64 = 20.0;
const PANEL_FONT: f64 = 15.0;
const TITLE_FONT: f64 = 30.0;

// Rows of the parameter panel, figure fractions from the bottom.
const PANEL_ROWS: [f64; 8] = [0.37, 0.34, 0.29, 0.26, 0.21, 0.18, 0.13, 0.10];

const MIXING_RATIOS: [f64; 9] = [
    0.0004, 0.001, 0.002, 0.004, 0.007, 0.01, 0.016, 0.024, 0.032,
];

/// Skewed log-pressure axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewAxes {
    /// The panel.
    pub rect: Rect,
    /// Temperature range along the bottom edge, `(left, right)` in °C.
    pub temperature: (f64, f64),
    /// Pressure range, `(bottom, top)` in hPa.
    pub pressure: (f64, f64),
    skew: f64,
}

impl SkewAxes {
    /// Axes with the default 45 degree skew.
    pub fn new(rect: Rect, temperature: (f64, f64), pressure: (f64, f64)) -> Self {
        SkewAxes {
            rect,
            temperature,
            pressure,
            skew: ROTATION_DEG.to_radians().tan(),
        }
    }

    /// Page position of a temperature (°C) at a pressure (hPa).
    pub fn to_page(&self, t: f64, p: f64) -> (f64, f64) {
        let (p0, p1) = (self.pressure.0.ln(), self.pressure.1.ln());
        let fy = (p0 - p.ln()) / (p0 - p1);
        let fx = (t - self.temperature.0) / (self.temperature.1 - self.temperature.0);

        self.rect.at_fraction(fx + self.skew * fy, fy)
    }

    fn line(&self, pts: &[(f64, f64)]) -> Vec<(f64, f64)> {
        pts.iter().map(|&(t, p)| self.to_page(t, p)).collect()
    }
}

/// Profiles pulled out of a sounding, bottom up.
#[derive(Debug, Default)]
struct Profiles {
    // (pressure hPa, temperature °C)
    temperature: Vec<(f64, f64)>,
    dew_point: Vec<(f64, f64)>,
    // (pressure hPa, u m/s, v m/s)
    wind: Vec<(f64, f64, f64)>,
    // (height m, u m/s, v m/s)
    hodograph: Vec<(f64, f64, f64)>,
}

impl Profiles {
    fn new(snd: &Sounding) -> Self {
        let mut profiles = Profiles::default();

        for row in snd.bottom_up() {
            let p = match row.pressure.into_option() {
                Some(p) => p.unpack(),
                None => continue,
            };

            if let Some(t) = row.temperature.into_option() {
                profiles.temperature.push((p, t.unpack()));
            }
            if let Some(td) = row.dew_point.into_option() {
                profiles.dew_point.push((p, td.unpack()));
            }
            if let Some(wind) = row.wind.into_option() {
                let WindUV { u, v } = WindUV::<MetersPSec>::from(wind);
                profiles.wind.push((p, u.unpack(), v.unpack()));

                if let Some(z) = row.height.into_option() {
                    profiles.hodograph.push((z.unpack(), u.unpack(), v.unpack()));
                }
            }
        }

        profiles
    }
}

/// Draw the skew-T figure for a sounding.
pub fn skew_t(
    snd: &Sounding,
    anal: &SoundingAnalysis,
    title: &str,
    font_family: &str,
) -> FigureResult<Figure> {
    let profiles = Profiles::new(snd);
    if profiles.temperature.len() < 2 {
        return Err(AnalysisError::NotEnoughData.into());
    }

    let (width, height) = FIGURE_SIZE;
    let mut fig = Figure::new(width, height, font_family);
    let axes = SkewAxes::new(Rect::from_fractions(width, height, SKEW_PANEL), T_RANGE, P_RANGE);

    draw_background(&mut fig, &axes);
    let mut legend = draw_profiles(&mut fig, &axes, &profiles, anal);
    legend.extend(draw_parcel(&mut fig, &axes, &profiles, anal));
    draw_barbs(&mut fig, &axes, &profiles);
    draw_skew_frame(&mut fig, &axes);
    fig.legend(axes.rect, LegendLocation::UpperLeft, &legend, AXIS_FONT);

    draw_hodograph(&mut fig, &profiles, anal);
    draw_parameters(&mut fig, anal);

    let at = fig.bounds().at_fraction(0.45, 0.97);
    fig.text(
        z_order::LEGEND,
        at,
        title,
        TextSpec::new(TITLE_FONT)
            .bold()
            .align(HAlign::Center, VAlign::Bottom),
    );

    Ok(fig)
}

/// Draw the skew-T figure and save it as SVG.
pub fn save_skew_t(
    snd: &Sounding,
    anal: &SoundingAnalysis,
    title: &str,
    font_family: &str,
    path: &Path,
) -> FigureResult<()> {
    debug!("drawing skew-T {}", path.display());
    skew_t(snd, anal, title, font_family)?.save(path)
}

fn draw_background(fig: &mut Figure, axes: &SkewAxes) {
    let clip = Some(axes.rect);
    let (p_bottom, p_top) = BACKGROUND_P;

    // Every other 10 degree band is shaded.
    let band = named::GRAY.mix(0.02);
    for i in 0..8 {
        let t0 = -100.0 + 20.0 * i as f64;
        let t1 = t0 + 10.0;
        let pts = axes.line(&[(t0, p_bottom), (t1, p_bottom), (t1, p_top), (t0, p_top)]);
        fig.polygon(z_order::FEATURES, clip, pts, band);
    }

    let zero = LineStyle::new(&named::BLUE, 1.5).dash(Dash::Dashed).alpha(0.3);
    fig.polyline(
        z_order::GRID,
        clip,
        axes.line(&[(0.0, p_bottom), (0.0, p_top)]),
        zero,
    );

    let pressures: Vec<f64> = (0..50)
        .map(|i| P_RANGE.0 + (P_RANGE.1 - P_RANGE.0) * i as f64 / 49.0)
        .collect();

    let dry = LineStyle::new(&named::RED, 1.0).alpha(0.3);
    let mut t0 = T_RANGE.0;
    while t0 <= T_RANGE.1 + 200.0 {
        let theta = t0 + 273.15;
        let pts: Vec<(f64, f64)> = pressures
            .iter()
            .map(|&p| (theta * (p / 1000.0).powf(metfor::Rd / metfor::cpd) - 273.15, p))
            .collect();
        fig.polyline(z_order::LINES, clip, axes.line(&pts), dry);
        t0 += 10.0;
    }

    let moist = LineStyle::new(&named::BLUE, 1.0).alpha(0.3);
    let starts = [-50.0, -40.0, -30.0, -20.0]
        .iter()
        .copied()
        .chain((0..11).map(|i| -10.0 + 5.0 * i as f64));
    for t0 in starts {
        let pts = moist_adiabat_line(t0, &pressures);
        if pts.len() > 1 {
            fig.polyline(z_order::LINES, clip, axes.line(&pts), moist);
        }
    }

    let mixing = LineStyle::new(&named::GREEN, 1.0)
        .dash(Dash::Dashed)
        .alpha(0.3);
    for &mw in MIXING_RATIOS.iter() {
        let pts: Vec<(f64, f64)> = (0..=8)
            .map(|i| 1000.0 - 50.0 * i as f64)
            .filter_map(|p| {
                metfor::dew_point_from_p_and_mw(HectoPascal(p), mw).map(|td| (td.unpack(), p))
            })
            .collect();
        fig.polyline(z_order::LINES, clip, axes.line(&pts), mixing);
    }
}

/// A saturated adiabat through `t0` °C at the first pressure.
fn moist_adiabat_line(t0: f64, pressures: &[f64]) -> Vec<(f64, f64)> {
    let mut pts = Vec::with_capacity(pressures.len());
    let (mut p_prev, mut t_prev) = match pressures.first() {
        Some(&p) => (p, Kelvin::from(Celsius(t0))),
        None => return pts,
    };
    pts.push((t0, p_prev));

    for &p in &pressures[1..] {
        let t = moist_adiabat(HectoPascal(p_prev), t_prev, HectoPascal(p));
        pts.push((Celsius::from(t).unpack(), p));
        p_prev = p;
        t_prev = t;
    }

    pts
}

fn draw_profiles(
    fig: &mut Figure,
    axes: &SkewAxes,
    profiles: &Profiles,
    anal: &SoundingAnalysis,
) -> Vec<LegendEntry> {
    let clip = Some(axes.rect);
    let mut legend = vec![];

    let style = LineStyle::new(&named::RED, 4.0);
    fig.polyline(z_order::VECTORS, clip, axes.line(&profiles.temperature), style);
    legend.push(LegendEntry::new(LegendGlyph::Line(style), "气温"));

    if profiles.dew_point.len() > 1 {
        let style = LineStyle::new(&named::GREEN, 4.0);
        fig.polyline(z_order::VECTORS, clip, axes.line(&profiles.dew_point), style);
        legend.push(LegendEntry::new(LegendGlyph::Line(style), "露点温度"));
    }

    let lcl = anal.surface_parcel_analysis().and_then(|pa| {
        let p = pa.lcl_pressure().into_option()?;
        let t = pa.lcl_temperature().into_option()?;
        Some((t.unpack(), p.unpack()))
    });
    if let Some((t, p)) = lcl {
        let black = named::BLACK.to_rgba();
        fig.marker(
            z_order::MARKERS,
            clip,
            axes.to_page(t, p),
            MarkerKind::Circle,
            points(6.0),
            black,
        );
        legend.push(LegendEntry::new(
            LegendGlyph::Marker(MarkerKind::Circle, black),
            "LCL",
        ));
    }

    legend
}

fn draw_parcel(
    fig: &mut Figure,
    axes: &SkewAxes,
    profiles: &Profiles,
    anal: &SoundingAnalysis,
) -> Vec<LegendEntry> {
    let path = match anal.parcel_path() {
        Some(path) if path.pressure.len() > 1 => path,
        _ => return vec![],
    };
    let clip = Some(axes.rect);

    let parcel: Vec<(f64, f64)> = path
        .temperature
        .iter()
        .zip(&path.pressure)
        .map(|(t, p)| (t.unpack(), p.unpack()))
        .collect();

    let style = LineStyle::new(&named::BLACK, 2.0);
    fig.polyline(z_order::VECTORS, clip, axes.line(&parcel), style);
    let mut legend = vec![LegendEntry::new(LegendGlyph::Line(style), "状态曲线")];

    // Parcel and environment on the same levels.
    let (p, parcel_t, env_t): (Vec<f64>, Vec<f64>, Vec<f64>) = {
        let mut p = vec![];
        let mut tp = vec![];
        let mut te = vec![];
        for &(t, pres) in &parcel {
            if let Some(env) = interpolate_log_p(&profiles.temperature, pres) {
                p.push(pres);
                tp.push(t);
                te.push(env);
            }
        }
        (p, tp, te)
    };

    let lfc = anal
        .surface_parcel_analysis()
        .and_then(|pa| pa.lfc_pressure().into_option())
        .map(|p| p.unpack());

    let cin_color = named::BLUE.mix(0.2);
    if let Some(lfc) = lfc {
        let below: usize = p.iter().take_while(|&&pres| pres >= lfc).count();
        let regions = shade_regions(&p[..below], &env_t[..below], &parcel_t[..below]);
        for region in regions {
            fig.polygon(z_order::FILL, clip, axes.line(&region), cin_color);
        }
    }
    legend.push(LegendEntry::new(LegendGlyph::Patch(cin_color), "CIN"));

    let cape_color = named::RED.mix(0.2);
    for region in shade_regions(&p, &parcel_t, &env_t) {
        fig.polygon(z_order::FILL, clip, axes.line(&region), cape_color);
    }
    legend.push(LegendEntry::new(LegendGlyph::Patch(cape_color), "CAPE"));

    legend
}

/// Linear interpolation in log pressure of a bottom up `(pressure, value)` profile.
fn interpolate_log_p(profile: &[(f64, f64)], p: f64) -> Option<f64> {
    profile.windows(2).find_map(|pair| {
        let ((p0, v0), (p1, v1)) = (pair[0], pair[1]);
        if (p <= p0 && p >= p1) || (p >= p0 && p <= p1) {
            if p0 == p1 {
                return Some(v0);
            }
            let f = (p.ln() - p0.ln()) / (p1.ln() - p0.ln());
            Some(v0 + f * (v1 - v0))
        } else {
            None
        }
    })
}

/// Closed `(temperature, pressure)` outlines of the regions where `upper` is warmer than `lower`.
///
/// Crossings are interpolated linearly in log pressure so region edges meet both curves.
fn shade_regions(p: &[f64], upper: &[f64], lower: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let n = p.len().min(upper.len()).min(lower.len());
    let mut regions = vec![];
    let mut top_side: Vec<(f64, f64)> = vec![];
    let mut bottom_side: Vec<(f64, f64)> = vec![];

    let mut close = |top: &mut Vec<(f64, f64)>, bottom: &mut Vec<(f64, f64)>| {
        let mut outline = std::mem::take(top);
        outline.extend(bottom.drain(..).rev());
        if outline.len() > 2 {
            regions.push(outline);
        }
    };

    for i in 0..n {
        let d = upper[i] - lower[i];
        if d > 0.0 {
            top_side.push((upper[i], p[i]));
            bottom_side.push((lower[i], p[i]));
        }

        if i + 1 == n {
            break;
        }

        let d_next = upper[i + 1] - lower[i + 1];
        if (d > 0.0) != (d_next > 0.0) {
            let f = d / (d - d_next);
            let lnp = p[i].ln() + f * (p[i + 1].ln() - p[i].ln());
            let t = upper[i] + f * (upper[i + 1] - upper[i]);
            top_side.push((t, lnp.exp()));
            bottom_side.push((t, lnp.exp()));

            if d > 0.0 {
                close(&mut top_side, &mut bottom_side);
            }
        }
    }
    close(&mut top_side, &mut bottom_side);

    regions
}

fn draw_barbs(fig: &mut Figure, axes: &SkewAxes, profiles: &Profiles) {
    if profiles.wind.is_empty() {
        return;
    }

    // Nearest levels to 40 log spaced pressures between 100 and 1000 hPa, each used once.
    let mut picked: Vec<usize> = vec![];
    for i in 0..40 {
        let target = 10f64.powf(2.0 + i as f64 / 39.0);
        let nearest = profiles
            .wind
            .iter()
            .enumerate()
            .min_by(|a, b| {
                let da = (a.1 .0 - target).abs();
                let db = (b.1 .0 - target).abs();
                da.total_cmp(&db)
            })
            .map(|(idx, _)| idx);

        if let Some(idx) = nearest {
            if !picked.contains(&idx) {
                picked.push(idx);
            }
        }
    }

    let style = LineStyle::new(&named::BLACK, 1.0);
    let inc = BarbIncrements::default();
    for idx in picked {
        let (p, u, v) = profiles.wind[idx];
        if p > axes.pressure.0 || p < axes.pressure.1 {
            continue;
        }

        let y = axes.to_page(0.0, p).1;
        let parts = decompose_barb(u.hypot(v), inc);
        let shape = barb_shape((axes.rect.right, y), (u, -v), parts, points(7.0));
        for line in shape.lines {
            fig.polyline(z_order::VECTORS, None, line, style);
        }
        for flag in shape.flags {
            fig.polygon(z_order::VECTORS, None, flag, style.color);
        }
    }
}

fn draw_skew_frame(fig: &mut Figure, axes: &SkewAxes) {
    let rect = axes.rect;
    let black = LineStyle::new(&named::BLACK, 1.0);
    fig.frame(rect, black);

    let tick = points(3.5);
    let labels = TextSpec::new(AXIS_FONT);

    for i in 0..10 {
        let p = 1000.0 - 100.0 * i as f64;
        let y = axes.to_page(0.0, p).1;
        fig.polyline(
            z_order::FRAME,
            None,
            vec![(rect.left - tick, y), (rect.left, y)],
            black,
        );
        fig.text(
            z_order::FRAME,
            (rect.left - 1.5 * tick, y),
            format_tick(p),
            labels.align(HAlign::Right, VAlign::Center),
        );
    }

    let mut t = T_RANGE.0;
    while t <= T_RANGE.1 {
        let x = axes.to_page(t, axes.pressure.0).0;
        fig.polyline(
            z_order::FRAME,
            None,
            vec![(x, rect.bottom), (x, rect.bottom + tick)],
            black,
        );
        fig.text(
            z_order::FRAME,
            (x, rect.bottom + 1.5 * tick),
            format_tick(t),
            labels.align(HAlign::Center, VAlign::Top),
        );
        t += 10.0;
    }

    let bold = TextSpec::new(AXIS_FONT).bold();
    fig.text(
        z_order::FRAME,
        (
            (rect.left + rect.right) / 2.0,
            rect.bottom + 1.5 * tick + 1.6 * points(AXIS_FONT),
        ),
        "温度 (°C)",
        bold.align(HAlign::Center, VAlign::Top),
    );
    fig.text(
        z_order::FRAME,
        (
            rect.left - 1.5 * tick - 3.2 * points(AXIS_FONT),
            (rect.top + rect.bottom) / 2.0,
        ),
        "气压 (hPa)",
        bold.vertical().align(HAlign::Center, VAlign::Bottom),
    );
}

fn draw_hodograph(fig: &mut Figure, profiles: &Profiles, anal: &SoundingAnalysis) {
    let (width, height) = (fig.width(), fig.height());
    let rect = Rect::from_fractions(width, height, HODOGRAPH_PANEL).fit_aspect(1.0);
    let range = (-COMPONENT_RANGE, COMPONENT_RANGE);
    let axes = LinearAxes::new(rect, range, range);
    let clip = Some(rect);

    // Background of the inset so skew-T lines do not show through.
    fig.polygon(
        z_order::MARKERS + 1,
        None,
        vec![
            (rect.left, rect.top),
            (rect.right, rect.top),
            (rect.right, rect.bottom),
            (rect.left, rect.bottom),
        ],
        named::WHITE.to_rgba(),
    );
    let z = z_order::MARKERS + 2;

    let rings = [
        (10.0, LineStyle::new(&named::GRAY, 1.0).dash(Dash::Dashed).alpha(0.2)),
        (20.0, LineStyle::new(&named::GRAY, 1.5).alpha(0.5)),
    ];
    for (increment, style) in rings.iter() {
        let mut r = *increment;
        while r <= COMPONENT_RANGE {
            let ring: Vec<(f64, f64)> = (0..=180)
                .map(|i| {
                    let a = i as f64 * std::f64::consts::PI / 90.0;
                    axes.to_page(r * a.cos(), r * a.sin())
                })
                .collect();
            fig.polyline(z, clip, ring, *style);
            r += increment;
        }
        fig.polyline(
            z,
            clip,
            vec![axes.to_page(-COMPONENT_RANGE, 0.0), axes.to_page(COMPONENT_RANGE, 0.0)],
            *style,
        );
        fig.polyline(
            z,
            clip,
            vec![axes.to_page(0.0, -COMPONENT_RANGE), axes.to_page(0.0, COMPONENT_RANGE)],
            *style,
        );
    }

    let annotation = TextSpec::new(AXIS_FONT)
        .bold()
        .alpha(0.3)
        .align(HAlign::Left, VAlign::Bottom);
    let mut value = 10.0;
    while value < COMPONENT_RANGE {
        for &(x, y) in &[(value, 0.0), (0.0, value)] {
            let (px, py) = axes.to_page(x, y);
            fig.text(z, (px + 2.0, py - 2.0), format_tick(value), annotation);
        }
        value += 10.0;
    }

    let mut legend = vec![];

    let trace: Vec<(f64, f64, f64)> = profiles
        .hodograph
        .iter()
        .copied()
        .filter(|&(h, _, _)| h < HODOGRAPH_TOP)
        .collect();
    if trace.len() > 1 {
        let (z_min, z_max) = trace
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(h, _, _)| {
                (lo.min(h), hi.max(h))
            });
        let span = if z_max > z_min { z_max - z_min } else { 1.0 };

        for pair in trace.windows(2) {
            let (h0, u0, v0) = pair[0];
            let (_, u1, v1) = pair[1];
            let color = ContinuousMap::Viridis.sample((h0 - z_min) / span);
            fig.polyline(
                z,
                clip,
                vec![axes.to_page(u0, v0), axes.to_page(u1, v1)],
                LineStyle::new(&color, 2.0),
            );
        }

        let sample = LineStyle::new(&ContinuousMap::Viridis.sample(0.5), 2.0);
        legend.push(LegendEntry::new(LegendGlyph::Line(sample), "0-12km 风矢连线"));
    }

    if let Some(motion) = anal.storm_motion() {
        let label = TextSpec::new(13.0)
            .bold()
            .alpha(0.6)
            .align(HAlign::Left, VAlign::Bottom);
        let movers = [
            ("RM", motion.right_mover),
            ("LM", motion.left_mover),
            ("MW", motion.mean_wind),
        ];
        for (name, WindUV { u, v }) in movers.iter() {
            let at = axes.to_page(u.unpack() + 0.5, v.unpack() - 0.5);
            if rect.contains(at) {
                fig.text(z, at, *name, label);
            }
        }

        let tip = (
            motion.right_mover.u.unpack() - 0.3,
            motion.right_mover.v.unpack() - 0.3,
        );
        let color = named::BLACK.mix(0.2);
        draw_arrow(fig, &axes, tip, color, z);
        legend.push(LegendEntry::new(LegendGlyph::Patch(color), "Bunkers 右偏向量"));
    }

    fig.frame(rect, LineStyle::new(&named::BLACK, 1.0));
    fig.legend(rect, LegendLocation::UpperLeft, &legend, AXIS_FONT);
}

/// An arrow from the origin to `tip` in hodograph coordinates, the head included in its length.
fn draw_arrow(
    fig: &mut Figure,
    axes: &LinearAxes,
    tip: (f64, f64),
    color: RGBAColor,
    z: i32,
) {
    const HEAD_WIDTH: f64 = 2.0;
    const HEAD_LENGTH: f64 = 1.5 * HEAD_WIDTH;

    let len = tip.0.hypot(tip.1);
    if !(len > 0.0) {
        return;
    }
    let (dx, dy) = (tip.0 / len, tip.1 / len);
    let head = HEAD_LENGTH.min(len);
    let base = (tip.0 - head * dx, tip.1 - head * dy);

    fig.polyline(
        z,
        Some(axes.rect),
        vec![axes.to_page(0.0, 0.0), axes.to_page(base.0, base.1)],
        LineStyle {
            color,
            ..LineStyle::new(&named::BLACK, 2.0)
        },
    );

    let half = HEAD_WIDTH / 2.0;
    let head_pts = vec![
        axes.to_page(tip.0, tip.1),
        axes.to_page(base.0 - half * dy, base.1 + half * dx),
        axes.to_page(base.0 + half * dy, base.1 - half * dx),
    ];
    fig.polygon(z, Some(axes.rect), head_pts, color);
}

/// Color of a value in the parameter panel.
fn panel_color(key: PanelValue) -> RGBColor {
    use PanelValue::*;

    match key {
        SBCAPE | MLCAPE | MUCAPE => named::ORANGE_RED,
        SBCIN | MLCIN | MUCIN => named::LIGHT_BLUE,
        SRH0to1km | SRH0to3km | SRH0to6km => named::NAVY,
        Shear0to1km | Shear0to3km | Shear0to6km => named::BLUE,
        TotalTotals | K | SignificantTornado | SupercellComposite => named::ORANGE_RED,
    }
}

/// The value as printed in the panel.
fn panel_text(key: PanelValue, anal: &SoundingAnalysis) -> String {
    match anal.value(key).into_option() {
        Some(val) if key.units().is_empty() => format!("{:.0}", val),
        Some(val) => format!("{:.0} {}", val, key.units()),
        None => "-".to_owned(),
    }
}

fn draw_parameters(fig: &mut Figure, anal: &SoundingAnalysis) {
    let (width, height) = (fig.width(), fig.height());
    let page = fig.bounds();
    let rect = Rect::from_fractions(width, height, PARAMETER_PANEL);

    fig.polygon(
        z_order::LEGEND - 1,
        None,
        vec![
            (rect.left, rect.top),
            (rect.right, rect.top),
            (rect.right, rect.bottom),
            (rect.left, rect.bottom),
        ],
        named::WHITE.to_rgba(),
    );
    fig.polyline(
        z_order::LEGEND - 1,
        None,
        vec![
            (rect.left, rect.top),
            (rect.right, rect.top),
            (rect.right, rect.bottom),
            (rect.left, rect.bottom),
            (rect.left, rect.top),
        ],
        LineStyle::new(&named::BLACK, 1.0),
    );

    let spec = TextSpec::new(PANEL_FONT).bold();
    let (thermo, kinematic): (Vec<PanelValue>, Vec<PanelValue>) =
        PanelValue::iter().partition(|k| k.is_thermodynamic());
    let columns = [(thermo, 0.58, 0.71), (kinematic, 0.73, 0.88)];

    for (column, label_x, value_x) in columns.iter() {
        let (label_x, value_x) = (*label_x, *value_x);
        for (&key, &row) in column.iter().zip(PANEL_ROWS.iter()) {
            let color = panel_color(key);
            fig.text(
                z_order::LEGEND,
                page.at_fraction(label_x, row),
                format!("{}: ", key),
                spec.color(&color).align(HAlign::Left, VAlign::Bottom),
            );
            fig.text(
                z_order::LEGEND,
                page.at_fraction(value_x, row),
                panel_text(key, anal),
                spec.color(&color).align(HAlign::Right, VAlign::Bottom),
            );
        }
    }
}
