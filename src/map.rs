//! Maps of gridded data.
//!
//! A [`Map`] owns the figure it draws on and the dataset it plots. Layers are collected in the
//! coordinates of the map projection and placed on the page when the map is finished, once the
//! extent and the space needed by the title, labels and color bar are known.
use crate::{
    boundaries::{Boundaries, Ring},
    error::{FigureError, FigureResult},
    grid::{BoundingBox, GridKind, GriddedDataset, MeshField},
    kinematics::wind_speed,
    projection::{utm_zone_from_lon, Projection},
    render::{
        arange, barb_shape, clip_polygon, clip_polyline, decompose_barb, filled_bands,
        format_tick, isolines, named, nice_levels, points, split_for_label, streamlines,
        text_width, tick_marks, z_order, BarbIncrements, BarbParts, ContinuousMap, Dash, DiscreteColormap, Figure, GridPoint, HAlign, LegendEntry,
        LegendGlyph, LegendLocation, LineStyle, MarkerKind, Orientation, Primitive, Rect,
        TextSpec, VAlign,
    },
    smoothing::gaussian_filter,
};
use chrono::NaiveDateTime;
use log::{debug, warn};
use ndarray::Array2;
use plotters::style::{Color, RGBAColor, RGBColor};
use std::path::Path;

/// Where the tornado touched down, `(latitude, longitude)`.
pub const TORNADO_LOCATION: (f64, f64) = (23.336291695619014, 113.4180102524545);

/// Label of the tornado marker.
pub const TORNADO_LABEL: &str = "龙卷发生地";

/// Font size of the grid line labels, points.
const GRID_LABEL_SIZE: f64 = 15.0;

/// Default font size of legends, contour labels and color bars, points.
const SMALL_FONT: f64 = 10.0;

/// The data a map plots.
#[derive(Debug, Clone, Copy)]
pub enum MapData<'a> {
    /// Single level fields.
    Surface(&'a GriddedDataset),
    /// Fields on pressure levels.
    PressureLevels(&'a GriddedDataset),
    /// No bound dataset, layers are added through the generic drawing methods only.
    Raw,
}

impl<'a> MapData<'a> {
    /// Bind a dataset according to its kind.
    pub fn from_dataset(dataset: &'a GriddedDataset) -> Self {
        match dataset.kind() {
            GridKind::Surface => MapData::Surface(dataset),
            GridKind::PressureLevels => MapData::PressureLevels(dataset),
        }
    }
}

/// Options for creating a map.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Figure size in pixels.
    pub size: (u32, u32),
    /// Part of the figure used by the map, `[left, bottom, width, height]` fractions.
    pub panel: [f64; 4],
    /// The map projection.
    pub projection: Projection,
    /// Color of the tornado marker.
    pub location_color: RGBColor,
    /// Font family for all text.
    pub font_family: String,
    /// Tornado location, `(latitude, longitude)`.
    pub tornado: (f64, f64),
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            size: (1000, 1000),
            panel: [0.0, 0.0, 1.0, 1.0],
            projection: Projection::lambert(105.0, 35.0),
            location_color: named::YELLOW,
            font_family: crate::fonts::DEFAULT_FONT_FAMILY.to_owned(),
            tornado: TORNADO_LOCATION,
        }
    }
}

impl MapOptions {
    /// Builder method for the projection.
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Builder method for the color of the tornado marker.
    pub fn location_color(mut self, color: RGBColor) -> Self {
        self.location_color = color;
        self
    }

    /// Builder method for the font family.
    pub fn font_family<S: Into<String>>(mut self, family: S) -> Self {
        self.font_family = family.into();
        self
    }

    /// Builder method for the tornado location.
    pub fn tornado(mut self, lat_lon: (f64, f64)) -> Self {
        self.tornado = lat_lon;
        self
    }

    /// Builder method for the figure size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Builder method for the part of the figure the map uses.
    pub fn panel(mut self, fractions: [f64; 4]) -> Self {
        self.panel = fractions;
        self
    }
}

/// How contour lines are labelled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourLabels {
    /// Font size in points.
    pub size: f64,
    /// Number of decimals, or the shortest representation when `None`.
    pub decimals: Option<usize>,
}

impl ContourLabels {
    /// Labels with a fixed number of decimals.
    pub fn fixed(decimals: usize) -> Self {
        ContourLabels {
            size: SMALL_FONT,
            decimals: Some(decimals),
        }
    }

    /// Labels in their shortest form.
    pub fn shortest() -> Self {
        ContourLabels {
            size: SMALL_FONT,
            decimals: None,
        }
    }

    /// The label of a level.
    pub fn format(&self, level: f64) -> String {
        match self.decimals {
            Some(d) => format!("{:.*}", d, level),
            None => format_tick(level),
        }
    }
}

/// Tick marks along a contour line, as used to hatch the side of a boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourTicks {
    /// Angle between the line and the ticks in degrees, positive values tick the left side.
    pub angle: f64,
    /// Tick length relative to the spacing.
    pub length: f64,
    /// Distance between ticks in points.
    pub spacing: f64,
}

/// Style of a set of contour lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourStyle {
    /// The line.
    pub line: LineStyle,
    /// Inline labels.
    pub labels: Option<ContourLabels>,
    /// Tick marks.
    pub ticks: Option<ContourTicks>,
}

impl ContourStyle {
    /// Unlabelled lines.
    pub fn new(line: LineStyle) -> Self {
        ContourStyle {
            line,
            labels: None,
            ticks: None,
        }
    }

    /// Builder method for labels.
    pub fn labels(mut self, labels: ContourLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Builder method for tick marks.
    pub fn ticks(mut self, ticks: ContourTicks) -> Self {
        self.ticks = Some(ticks);
        self
    }
}

/// A scatter marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    /// Shape.
    pub kind: MarkerKind,
    /// Area in square points.
    pub area: f64,
    /// Fill color.
    pub color: RGBAColor,
}

impl MarkerStyle {
    /// Create a marker style.
    pub fn new<C: Color>(kind: MarkerKind, area: f64, color: &C) -> Self {
        MarkerStyle {
            kind,
            area,
            color: color.to_rgba(),
        }
    }

    /// Builder method to set the opacity.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.color.3 = alpha;
        self
    }

    fn diameter(&self) -> f64 {
        points(self.area.max(0.0).sqrt())
    }
}

/// Latitude and longitude lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Gridlines {
    /// Meridians to draw, chosen from the extent when `None`.
    pub longitudes: Option<Vec<f64>>,
    /// Parallels to draw, chosen from the extent when `None`.
    pub latitudes: Option<Vec<f64>>,
    /// Line style.
    pub style: LineStyle,
    /// Font size of the labels on the left and bottom edges, no labels when `None`.
    pub label_size: Option<f64>,
}

impl Gridlines {
    /// Dashed, labelled lines every 10° over East Asia.
    pub fn east_asia() -> Self {
        Gridlines {
            longitudes: Some(arange(30.0, 150.0, 10.0)),
            latitudes: Some(arange(0.0, 90.0, 10.0)),
            style: LineStyle::new(&named::GRAY, 1.0).alpha(0.5).dash(Dash::Dashed),
            label_size: Some(GRID_LABEL_SIZE),
        }
    }

    /// Unlabelled lines at round numbers.
    pub fn plain(style: LineStyle) -> Self {
        Gridlines {
            longitudes: None,
            latitudes: None,
            style,
            label_size: None,
        }
    }
}

/// A drawn scale bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBar {
    /// UTM zone the bar was measured in.
    pub zone: u8,
    /// Ends of the bar, UTM easting and northing in meters.
    pub ends: [(f64, f64); 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl Extent {
    fn of_points<I: IntoIterator<Item = (f64, f64)>>(pts: I) -> Option<Self> {
        pts.into_iter()
            .filter(|p| p.0.is_finite() && p.1.is_finite())
            .fold(None, |acc: Option<Extent>, (x, y)| match acc {
                None => Some(Extent {
                    x0: x,
                    x1: x,
                    y0: y,
                    y1: y,
                }),
                Some(e) => Some(Extent {
                    x0: e.x0.min(x),
                    x1: e.x1.max(x),
                    y0: e.y0.min(y),
                    y1: e.y1.max(y),
                }),
            })
    }

    fn union(self, other: Extent) -> Extent {
        Extent {
            x0: self.x0.min(other.x0),
            x1: self.x1.max(other.x1),
            y0: self.y0.min(other.y0),
            y1: self.y1.max(other.y1),
        }
    }

    fn is_usable(&self) -> bool {
        self.x1 > self.x0 && self.y1 > self.y0
    }

    /// Points along the edges.
    fn perimeter(&self, per_edge: usize) -> Vec<(f64, f64)> {
        let n = per_edge.max(2);
        let lerp = |a: f64, b: f64, k: usize| a + (b - a) * k as f64 / (n - 1) as f64;

        let mut pts = Vec::with_capacity(4 * n);
        pts.extend((0..n).map(|k| (lerp(self.x0, self.x1, k), self.y0)));
        pts.extend((0..n).map(|k| (self.x1, lerp(self.y0, self.y1, k))));
        pts.extend((0..n).map(|k| (lerp(self.x1, self.x0, k), self.y1)));
        pts.extend((0..n).map(|k| (self.x0, lerp(self.y1, self.y0, k))));
        pts
    }
}

#[derive(Debug, Clone, Copy)]
enum LegendSpec {
    /// Every labelled layer.
    Labelled(LegendLocation),
    /// The wind barb entry and the tornado marker.
    Barbs(LegendLocation),
}

#[derive(Debug, Clone)]
enum Layer<'a> {
    /// A primitive in projected coordinates.
    Projected { z: i32, primitive: Primitive },
    /// A primitive in fractions of the axes, measured from the bottom left.
    Axes { z: i32, primitive: Primitive },
    /// Geodetic rings, clipped to the view before projecting.
    Rings {
        z: i32,
        rings: &'a [Ring],
        fill: Option<RGBAColor>,
        stroke: Option<LineStyle>,
    },
    Contour {
        points: Vec<(f64, f64)>,
        style: ContourStyle,
        label: Option<String>,
    },
    Barb {
        at: (f64, f64),
        toward: (f64, f64),
        parts: BarbParts,
        style: LineStyle,
    },
    Arrow {
        at: (f64, f64),
        toward: (f64, f64),
        /// Length as a fraction of the axes width.
        length: f64,
        color: RGBAColor,
    },
    Arrowhead {
        at: (f64, f64),
        toward: (f64, f64),
        color: RGBAColor,
    },
}

/// A map.
#[derive(Debug)]
pub struct Map<'a> {
    data: MapData<'a>,
    options: MapOptions,
    boundaries: Option<&'a Boundaries>,
    layers: Vec<Layer<'a>>,
    extent: Option<Extent>,
    data_limits: Option<Extent>,
    labelled: Vec<LegendEntry>,
    legend: Option<LegendSpec>,
    gridlines: Vec<Gridlines>,
    title: Option<(String, f64)>,
    colorbar: Option<(DiscreteColormap, String)>,
}

impl<'a> Map<'a> {
    /// Create an empty map.
    pub fn new(data: MapData<'a>, options: MapOptions) -> Self {
        Map {
            data,
            options,
            boundaries: None,
            layers: vec![],
            extent: None,
            data_limits: None,
            labelled: vec![],
            legend: None,
            gridlines: vec![],
            title: None,
            colorbar: None,
        }
    }

    /// The projection of the map.
    pub fn projection(&self) -> Projection {
        self.options.projection
    }

    /// The bound data.
    pub fn data(&self) -> MapData<'a> {
        self.data
    }

    /// Use these boundaries for the boundary and land/ocean layers.
    pub fn boundaries(&mut self, boundaries: &'a Boundaries) -> &mut Self {
        self.boundaries = Some(boundaries);
        self
    }

    /// Coastlines, the provinces around the Pearl River Delta, Guangzhou and Baiyun district.
    pub fn common(&mut self, boundaries: &'a Boundaries) -> &mut Self {
        self.boundaries(boundaries)
            .draw_coastlines()
            .draw_province()
            .draw_city()
            .draw_district()
    }

    /// Draw the coastlines.
    pub fn draw_coastlines(&mut self) -> &mut Self {
        self.boundary_layer(|b| &b.coastline, "coastline")
    }

    /// Draw the province borders.
    pub fn draw_province(&mut self) -> &mut Self {
        self.boundary_layer(|b| &b.province, "province")
    }

    /// Draw the border of Guangzhou.
    pub fn draw_city(&mut self) -> &mut Self {
        self.boundary_layer(|b| &b.city, "city")
    }

    /// Draw the border of Baiyun district.
    pub fn draw_district(&mut self) -> &mut Self {
        self.boundary_layer(|b| &b.district, "district")
    }

    fn boundary_layer<F>(&mut self, pick: F, what: &str) -> &mut Self
    where
        F: Fn(&'a Boundaries) -> &'a Vec<Ring>,
    {
        match self.boundaries {
            Some(b) => {
                let rings = pick(b);
                if !rings.is_empty() {
                    self.layers.push(Layer::Rings {
                        z: z_order::BOUNDARIES,
                        rings,
                        fill: None,
                        stroke: Some(LineStyle::new(&named::BLACK, 1.0)),
                    });
                }
            }
            None => warn!("no boundaries set, {} layer omitted", what),
        }
        self
    }

    fn fill_features(&mut self) -> &mut Self {
        if let Some(b) = self.boundaries {
            self.layers.push(Layer::Rings {
                z: z_order::FEATURES,
                rings: &b.ocean,
                fill: Some(named::LIGHT_BLUE.to_rgba()),
                stroke: None,
            });
            self.layers.push(Layer::Rings {
                z: z_order::FEATURES + 1,
                rings: &b.land,
                fill: Some(named::LAND.to_rgba()),
                stroke: None,
            });
        }
        self
    }

    /// Dashed grid lines every 10° with labels.
    pub fn gridlines(&mut self) -> &mut Self {
        self.gridlines_with(Gridlines::east_asia())
    }

    /// Custom grid lines.
    pub fn gridlines_with(&mut self, gridlines: Gridlines) -> &mut Self {
        self.gridlines.push(gridlines);
        self
    }

    /// The legend for the wind barbs, a black bar for 2 m/s and the tornado marker.
    pub fn barb_legend(&mut self) -> &mut Self {
        self.draw_tornado_location(false);
        self.legend = Some(LegendSpec::Barbs(LegendLocation::LowerRight));
        self
    }

    /// Set the title, font size in points.
    pub fn title<S: Into<String>>(&mut self, title: S, size: f64) -> &mut Self {
        self.title = Some((title.into(), size));
        self
    }

    /// Set the geodetic extent `[west, east, south, north]` of the view.
    pub fn set_extent(&mut self, extent: [f64; 4]) -> &mut Self {
        let bbox = BoundingBox::from_extent(extent);
        let geodetic = Extent {
            x0: bbox.west,
            x1: bbox.east,
            y0: bbox.south,
            y1: bbox.north,
        };
        let proj = self.options.projection;
        self.extent = Extent::of_points(
            geodetic
                .perimeter(50)
                .into_iter()
                .map(|(lon, lat)| proj.forward(lon, lat)),
        );
        self
    }

    /// Plot the standard chart of the bound dataset at a time.
    ///
    /// Surface data is plotted as sea level pressure and 10 m winds, `level` must be `None`.
    /// Pressure level data needs a level in hPa. Both mistakes are reported before anything is
    /// drawn.
    pub fn plot(
        &mut self,
        time: NaiveDateTime,
        level: Option<f64>,
        sigma: f64,
        sigma_t: f64,
    ) -> FigureResult<&mut Self> {
        match (self.data, level) {
            (MapData::Surface(_), Some(level)) => Err(FigureError::Usage(format!(
                "surface data has no pressure levels, got {} hPa",
                level
            ))),
            (MapData::Surface(_), None) => self.plot_surface(time, sigma),
            (MapData::PressureLevels(_), None) => Err(FigureError::Usage(
                "pressure level data requires a level".to_owned(),
            )),
            (MapData::PressureLevels(_), Some(level)) => {
                self.plot_pressure_level(time, level, sigma, sigma_t)
            }
            (MapData::Raw, _) => Err(FigureError::Usage(
                "map has no dataset to plot".to_owned(),
            )),
        }
    }

    /// Sea level pressure contours, 10 m wind barbs and land/ocean fill.
    pub fn plot_surface(&mut self, time: NaiveDateTime, sigma: f64) -> FigureResult<&mut Self> {
        let ds = match self.data {
            MapData::Surface(ds) => ds,
            _ => {
                return Err(FigureError::Usage(
                    "sea level charts need surface data".to_owned(),
                ))
            }
        };
        debug!("surface chart at {}", time);

        let mslp = ds.select("msl", time, None)?;
        let mslp = mslp.with_values(gaussian_filter(&mslp.values, sigma))?;
        self.contour(
            &mslp.to_mesh(),
            &arange(960.0, 1040.0, 2.5),
            ContourStyle::new(LineStyle::new(&named::BLACK, 1.5)).labels(ContourLabels::fixed(1)),
        );

        let u = ds.select("u10", time, None)?.stride(20).to_mesh();
        let v = ds.select("v10", time, None)?.stride(20).to_mesh();
        self.barbs(&u, &v, BarbIncrements::default());

        self.gridlines().barb_legend().fill_features();
        Ok(self)
    }

    /// Wind speed, wind barbs, height and temperature on a pressure level.
    pub fn plot_pressure_level(
        &mut self,
        time: NaiveDateTime,
        level: f64,
        sigma: f64,
        sigma_t: f64,
    ) -> FigureResult<&mut Self> {
        let ds = match self.data {
            MapData::PressureLevels(ds) => ds,
            _ => {
                return Err(FigureError::Usage(
                    "pressure level charts need pressure level data".to_owned(),
                ))
            }
        };
        debug!("{} hPa chart at {}", level, time);

        let u = ds.select("u", time, Some(level))?;
        let v = ds.select("v", time, Some(level))?;
        let speed = u.with_values(wind_speed(&u.values, &v.values))?;

        let levels = if (level - 500.0).abs() < 1.0e-6 {
            arange(15.0, 30.0, 3.0)
        } else {
            arange(6.0, 21.0, 3.0)
        };
        let cmap = ContinuousMap::YlOrBr
            .discretize(&levels)
            .map(|cmap| {
                let over = ContinuousMap::YlOrBr.sample(1.0);
                cmap.with_over(over)
            })
            .ok_or_else(|| FigureError::Usage("too few wind speed levels".to_owned()))?;
        self.contourf(&speed.to_mesh(), &cmap)
            .colorbar(&cmap, "风速 [m/s]");

        self.barbs(
            &u.stride(15).to_mesh(),
            &v.stride(15).to_mesh(),
            BarbIncrements::default(),
        );

        let z = ds.select("z", time, Some(level))?;
        let z = z.with_values(gaussian_filter(&z.values, sigma))?;
        self.contour(
            &z.to_mesh(),
            &arange(0.0, 999.0, 4.0),
            ContourStyle::new(LineStyle::new(&named::BLACK, 1.5)).labels(ContourLabels::fixed(0)),
        );

        let t = ds.select("t", time, Some(level))?.map(|t| t - 273.0);
        let t = t.with_values(gaussian_filter(&t.values, sigma_t))?;
        self.contour(
            &t.to_mesh(),
            &arange(-40.0, 40.0, 4.0),
            ContourStyle::new(LineStyle::new(&named::RED, 1.5)).labels(ContourLabels::shortest()),
        );

        self.gridlines().barb_legend();
        Ok(self)
    }

    /// Mark where the tornado touched down, optionally adding a legend of all labelled layers.
    pub fn draw_tornado_location(&mut self, add_legend: bool) -> &mut Self {
        let style = MarkerStyle::new(MarkerKind::Star, 100.0, &self.options.location_color)
            .alpha(0.75);
        let at = self.options.tornado;
        self.scatter(at, style, Some(TORNADO_LABEL));
        if add_legend {
            self.legend(LegendLocation::LowerRight);
        }
        self
    }

    /// Draw a scale bar `length` units long with a north arrow.
    ///
    /// The bar is measured in the UTM zone of the middle of the view, centered at `location`
    /// (fractions of the view, from the bottom left).
    pub fn scale_bar(
        &mut self,
        length: f64,
        location: (f64, f64),
        units: &str,
        m_per_unit: f64,
    ) -> FigureResult<ScaleBar> {
        let proj = self.options.projection;
        let view = self
            .current_extent()
            .ok_or_else(|| FigureError::Usage("scale bar needs a map extent".to_owned()))?;

        let geodetic: Vec<(f64, f64)> = view
            .perimeter(50)
            .into_iter()
            .map(|(x, y)| proj.inverse(x, y))
            .collect();
        let geo = Extent::of_points(geodetic.iter().cloned())
            .ok_or_else(|| FigureError::Usage("map extent is not on the globe".to_owned()))?;

        let zone = utm_zone_from_lon((geo.x0 + geo.x1) / 2.0);
        let utm = Projection::utm(zone);
        let metric = Extent::of_points(geodetic.iter().map(|&(lon, lat)| utm.forward(lon, lat)))
            .ok_or_else(|| FigureError::Usage("map extent is not on the globe".to_owned()))?;

        let cx = metric.x0 + (metric.x1 - metric.x0) * location.0;
        let cy = metric.y0 + (metric.y1 - metric.y0) * location.1;
        let half = length * m_per_unit / 2.0;
        let ends = [(cx - half, cy), (cx + half, cy)];

        // The bar is straight in UTM, sample it to follow it in the map projection.
        let to_map = |x: f64, y: f64| {
            let (lon, lat) = utm.inverse(x, y);
            proj.forward(lon, lat)
        };
        let bar: Vec<(f64, f64)> = (0..=20)
            .map(|k| to_map(ends[0].0 + 2.0 * half * k as f64 / 20.0, cy))
            .collect();

        for &(color, width, z) in [
            (named::WHITE, 5.0, z_order::MARKERS),
            (named::BLACK, 3.0, z_order::MARKERS + 1),
        ]
        .iter()
        {
            self.layers.push(Layer::Projected {
                z,
                primitive: Primitive::Polyline {
                    points: bar.clone(),
                    style: LineStyle::new(&color, width),
                },
            });
        }

        let spec = TextSpec::new(SMALL_FONT).align(HAlign::Center, VAlign::Bottom);
        self.layers.push(Layer::Projected {
            z: z_order::MARKERS + 1,
            primitive: Primitive::Text {
                at: to_map(cx, cy),
                text: format!("{} {}", format_tick(length), units),
                spec,
            },
        });
        self.layers.push(Layer::Projected {
            z: z_order::MARKERS + 1,
            primitive: Primitive::Text {
                at: to_map(metric.x0 + (metric.x1 - metric.x0) * 0.05, cy),
                text: "\u{25b2}\nN".to_owned(),
                spec,
            },
        });

        Ok(ScaleBar { zone, ends })
    }

    /// Contour lines of a field.
    pub fn contour(&mut self, field: &MeshField, levels: &[f64], style: ContourStyle) -> &mut Self {
        let grid = match self.project_mesh(field) {
            Some(grid) => grid,
            None => return self,
        };

        for &level in levels {
            let label = style.labels.map(|l| l.format(level));
            for line in isolines(&field.values, level) {
                self.layers.push(Layer::Contour {
                    points: line.iter().map(|&p| grid.at(p)).collect(),
                    style,
                    label: label.clone(),
                });
            }
        }
        self
    }

    /// Filled contours of a field with the bands of a color map.
    pub fn contourf(&mut self, field: &MeshField, cmap: &DiscreteColormap) -> &mut Self {
        let grid = match self.project_mesh(field) {
            Some(grid) => grid,
            None => return self,
        };

        let bands = cmap.bands();
        let limits: Vec<(f64, f64)> = bands.iter().map(|&(lo, hi, _)| (lo, hi)).collect();
        for polygon in filled_bands(&field.values, &limits) {
            self.layers.push(Layer::Projected {
                z: z_order::FILL,
                primitive: Primitive::Polygon {
                    points: polygon.points.iter().map(|&p| grid.at(p)).collect(),
                    fill: bands[polygon.band].2,
                },
            });
        }
        self
    }

    /// A color bar below the map.
    pub fn colorbar(&mut self, cmap: &DiscreteColormap, label: &str) -> &mut Self {
        self.colorbar = Some((cmap.clone(), label.to_owned()));
        self
    }

    /// Wind barbs of earth relative wind components at every point of the fields.
    pub fn barbs(&mut self, u: &MeshField, v: &MeshField, increments: BarbIncrements) -> &mut Self {
        if u.values.dim() != v.values.dim() {
            warn!("wind components differ in shape, barbs omitted");
            return self;
        }
        self.include_limits(u);

        let style = LineStyle::new(&named::BLACK, 1.0);
        for ((j, i), &uu) in u.values.indexed_iter() {
            let vv = v.values[(j, i)];
            let (lat, lon) = (u.latitude[(j, i)], u.longitude[(j, i)]);
            let parts = decompose_barb(uu.hypot(vv), increments);
            if parts.is_empty() {
                continue;
            }
            if let Some(toward) = self.projected_direction(lon, lat, uu, vv) {
                self.layers.push(Layer::Barb {
                    at: self.options.projection.forward(lon, lat),
                    toward,
                    parts,
                    style,
                });
            }
        }
        self
    }

    /// Arrows of a vector field, an arrow of magnitude `scale` spans the width of the map.
    pub fn quiver<C: Color>(&mut self, u: &MeshField, v: &MeshField, scale: f64, color: &C) -> &mut Self {
        if u.values.dim() != v.values.dim() || !(scale > 0.0) {
            warn!("invalid vector field, arrows omitted");
            return self;
        }
        self.include_limits(u);

        let color = color.to_rgba();
        for ((j, i), &uu) in u.values.indexed_iter() {
            let vv = v.values[(j, i)];
            let (lat, lon) = (u.latitude[(j, i)], u.longitude[(j, i)]);
            if let Some(toward) = self.projected_direction(lon, lat, uu, vv) {
                self.layers.push(Layer::Arrow {
                    at: self.options.projection.forward(lon, lat),
                    toward,
                    length: uu.hypot(vv) / scale,
                    color,
                });
            }
        }
        self
    }

    /// A reference arrow for [`Map::quiver`] at a position in fractions of the map, with its
    /// label to the right.
    pub fn quiver_key<C: Color>(
        &mut self,
        at: (f64, f64),
        magnitude: f64,
        scale: f64,
        label: &str,
        color: &C,
    ) -> &mut Self {
        let color = color.to_rgba();
        self.layers.push(Layer::Axes {
            z: z_order::LEGEND,
            primitive: Primitive::Polyline {
                points: vec![at, (at.0 + magnitude / scale, at.1)],
                style: LineStyle {
                    color,
                    width: 2.0,
                    dash: Dash::Solid,
                },
            },
        });
        self.layers.push(Layer::Axes {
            z: z_order::LEGEND,
            primitive: Primitive::Text {
                at: (at.0 + magnitude / scale + 0.01, at.1),
                text: label.to_owned(),
                spec: TextSpec::new(12.0).align(HAlign::Left, VAlign::Center),
            },
        });
        self
    }

    /// Streamlines of earth relative wind components.
    pub fn streamlines(&mut self, u: &MeshField, v: &MeshField, style: LineStyle, density: f64) -> &mut Self {
        if u.values.dim() != v.values.dim() {
            warn!("wind components differ in shape, streamlines omitted");
            return self;
        }
        let grid = match self.project_mesh(u) {
            Some(grid) => grid,
            None => return self,
        };

        // Velocities in grid index units through the inverse Jacobian of the grid mapping.
        let (ny, nx) = u.values.dim();
        let mut gu = Array2::zeros((ny, nx));
        let mut gv = Array2::zeros((ny, nx));
        for j in 0..ny {
            for i in 0..nx {
                let (lat, lon) = (u.latitude[(j, i)], u.longitude[(j, i)]);
                let (uu, vv) = (u.values[(j, i)], v.values[(j, i)]);
                let speed = uu.hypot(vv);
                let dir = match self.projected_direction(lon, lat, uu, vv) {
                    Some(d) => d,
                    None => continue,
                };
                let (dx, dy) = (speed * dir.0, speed * dir.1);
                if let Some((a, b)) = grid.to_index_velocity(j, i, dx, dy) {
                    gu[(j, i)] = a;
                    gv[(j, i)] = b;
                }
            }
        }

        for line in streamlines(&gu, &gv, density) {
            let pts: Vec<(f64, f64)> = line.points.iter().map(|&p| grid.at(p)).collect();
            self.layers.push(Layer::Projected {
                z: z_order::VECTORS,
                primitive: Primitive::Polyline { points: pts, style },
            });

            if let Some((p, d)) = line.arrow {
                let a = grid.at(p);
                let b = grid.at((p.0 + 0.1 * d.0, p.1 + 0.1 * d.1));
                let n = (b.0 - a.0).hypot(b.1 - a.1);
                if n > 0.0 {
                    self.layers.push(Layer::Arrowhead {
                        at: a,
                        toward: ((b.0 - a.0) / n, (b.1 - a.1) / n),
                        color: style.color,
                    });
                }
            }
        }
        self
    }

    /// A marker at `(latitude, longitude)`.
    pub fn scatter(&mut self, at: (f64, f64), style: MarkerStyle, label: Option<&str>) -> &mut Self {
        let (lat, lon) = at;
        self.layers.push(Layer::Projected {
            z: z_order::MARKERS,
            primitive: Primitive::Marker {
                at: self.options.projection.forward(lon, lat),
                kind: style.kind,
                size: style.diameter(),
                color: style.color,
            },
        });
        if let Some(label) = label {
            self.labelled.push(LegendEntry::new(
                LegendGlyph::Marker(style.kind, style.color),
                label,
            ));
        }
        self
    }

    /// A line through `(latitude, longitude)` points, straight in latitude and longitude.
    pub fn line(
        &mut self,
        path: &[(f64, f64)],
        style: LineStyle,
        marker: Option<MarkerKind>,
        label: Option<&str>,
    ) -> &mut Self {
        let proj = self.options.projection;
        let mut pts = Vec::new();
        for seg in path.windows(2) {
            let ((lat0, lon0), (lat1, lon1)) = (seg[0], seg[1]);
            for k in 0..20 {
                let t = k as f64 / 20.0;
                pts.push(proj.forward(lon0 + t * (lon1 - lon0), lat0 + t * (lat1 - lat0)));
            }
        }
        if let Some(&(lat, lon)) = path.last() {
            pts.push(proj.forward(lon, lat));
        }

        self.layers.push(Layer::Projected {
            z: z_order::MARKERS - 1,
            primitive: Primitive::Polyline { points: pts, style },
        });

        if let Some(kind) = marker {
            for &(lat, lon) in path {
                self.layers.push(Layer::Projected {
                    z: z_order::MARKERS - 1,
                    primitive: Primitive::Marker {
                        at: proj.forward(lon, lat),
                        kind,
                        size: points(6.0),
                        color: style.color,
                    },
                });
            }
        }

        if let Some(label) = label {
            let glyph = match marker {
                Some(kind) => LegendGlyph::LineMarker(style, kind),
                None => LegendGlyph::Line(style),
            };
            self.labelled.push(LegendEntry::new(glyph, label));
        }
        self
    }

    /// A legend of every labelled layer added so far and later.
    pub fn legend(&mut self, location: LegendLocation) -> &mut Self {
        self.legend = Some(LegendSpec::Labelled(location));
        self
    }

    /// Lay out the map and return the figure, ready for more panels.
    pub fn into_figure(self) -> FigureResult<Figure> {
        let (width, height) = self.options.size;
        let mut fig = Figure::new(width, height, self.options.font_family.clone());
        self.draw_on(&mut fig)?;
        Ok(fig)
    }

    /// Write the map as an SVG file.
    pub fn save(self, path: &Path) -> FigureResult<()> {
        self.into_figure()?.save(path)
    }

    /// The view extent in projected coordinates.
    fn current_extent(&self) -> Option<Extent> {
        self.extent
            .or(self.data_limits)
            .filter(|extent| extent.is_usable())
    }

    fn include_limits(&mut self, mesh: &MeshField) {
        let proj = self.options.projection;
        let limits = Extent::of_points(
            mesh.latitude
                .iter()
                .zip(mesh.longitude.iter())
                .map(|(&lat, &lon)| proj.forward(lon, lat)),
        );
        if let Some(limits) = limits {
            self.data_limits = Some(match self.data_limits {
                Some(current) => current.union(limits),
                None => limits,
            });
        }
    }

    fn project_mesh(&mut self, mesh: &MeshField) -> Option<ProjectedGrid> {
        let (ny, nx) = mesh.values.dim();
        if ny < 2 || nx < 2 {
            warn!("field is too small to contour");
            return None;
        }
        self.include_limits(mesh);

        let proj = self.options.projection;
        let mut x = Array2::zeros((ny, nx));
        let mut y = Array2::zeros((ny, nx));
        for ((j, i), &lat) in mesh.latitude.indexed_iter() {
            let (px, py) = proj.forward(mesh.longitude[(j, i)], lat);
            x[(j, i)] = px;
            y[(j, i)] = py;
        }
        Some(ProjectedGrid { x, y })
    }

    /// Unit vector in projected coordinates of an earth relative vector at a point.
    fn projected_direction(&self, lon: f64, lat: f64, u: f64, v: f64) -> Option<(f64, f64)> {
        let speed = u.hypot(v);
        let coslat = lat.to_radians().cos();
        if !(speed > 0.0) || !speed.is_finite() || coslat < 1.0e-6 {
            return None;
        }

        let step = 0.01 / speed;
        let proj = self.options.projection;
        let a = proj.forward(lon, lat);
        let b = proj.forward(lon + u * step / coslat, lat + v * step);
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let n = dx.hypot(dy);
        if n > 0.0 && n.is_finite() {
            Some((dx / n, dy / n))
        } else {
            None
        }
    }

    /// Draw the map into its panel of an existing figure.
    pub fn draw_on(&self, fig: &mut Figure) -> FigureResult<()> {
        let extent = self
            .current_extent()
            .ok_or_else(|| FigureError::Usage("nothing sets the map extent".to_owned()))?;
        let layout = self.layout(fig, &extent);
        let axes = layout.axes;
        let proj = self.options.projection;

        let to_page = |(x, y): (f64, f64)| -> (f64, f64) {
            (
                axes.left + (x - extent.x0) / (extent.x1 - extent.x0) * axes.width(),
                axes.bottom - (y - extent.y0) / (extent.y1 - extent.y0) * axes.height(),
            )
        };

        let view = geodetic_view(&proj, &extent);

        for layer in &self.layers {
            match layer {
                Layer::Projected { z, primitive } => {
                    fig.add(*z, Some(axes), map_primitive(primitive, &to_page));
                }
                Layer::Axes { z, primitive } => {
                    let at_fraction = |(fx, fy): (f64, f64)| axes.at_fraction(fx, fy);
                    fig.add(*z, None, map_primitive(primitive, &at_fraction));
                }
                Layer::Rings {
                    z,
                    rings,
                    fill,
                    stroke,
                } => {
                    for ring in rings.iter() {
                        if let Some(fill) = fill {
                            let clipped = clip_polygon(ring, &view);
                            let pts: Vec<(f64, f64)> = clipped
                                .into_iter()
                                .map(|(lon, lat)| to_page(proj.forward(lon, lat)))
                                .collect();
                            fig.polygon(*z, Some(axes), pts, *fill);
                        }
                        if let Some(stroke) = stroke {
                            for piece in clip_polyline(ring, &view) {
                                let pts: Vec<(f64, f64)> = piece
                                    .into_iter()
                                    .map(|(lon, lat)| to_page(proj.forward(lon, lat)))
                                    .collect();
                                fig.polyline(*z, Some(axes), pts, *stroke);
                            }
                        }
                    }
                }
                Layer::Contour {
                    points: line,
                    style,
                    label,
                } => {
                    let page: Vec<(f64, f64)> = line.iter().cloned().map(to_page).collect();
                    draw_contour_line(fig, axes, &page, style, label.as_deref());
                }
                Layer::Barb {
                    at,
                    toward,
                    parts,
                    style,
                } => {
                    let origin = to_page(*at);
                    if !axes.contains(origin) {
                        continue;
                    }
                    let shape = barb_shape(origin, (toward.0, -toward.1), *parts, points(7.0));
                    for line in shape.lines {
                        fig.polyline(z_order::VECTORS, Some(axes), line, *style);
                    }
                    for flag in shape.flags {
                        fig.polygon(z_order::VECTORS, Some(axes), flag, style.color);
                    }
                }
                Layer::Arrow {
                    at,
                    toward,
                    length,
                    color,
                } => {
                    let origin = to_page(*at);
                    if !axes.contains(origin) {
                        continue;
                    }
                    let len = length * axes.width();
                    let dir = (toward.0, -toward.1);
                    let tip = (origin.0 + len * dir.0, origin.1 + len * dir.1);
                    let style = LineStyle {
                        color: *color,
                        width: (0.002 * axes.width()).max(1.0),
                        dash: Dash::Solid,
                    };
                    fig.polyline(z_order::VECTORS, Some(axes), vec![origin, tip], style);
                    fig.polygon(
                        z_order::VECTORS,
                        Some(axes),
                        arrowhead(tip, dir, 4.0 * style.width),
                        *color,
                    );
                }
                Layer::Arrowhead { at, toward, color } => {
                    let tip = to_page(*at);
                    fig.polygon(
                        z_order::VECTORS,
                        Some(axes),
                        arrowhead(tip, (toward.0, -toward.1), 8.0),
                        *color,
                    );
                }
            }
        }

        for grid in &self.gridlines {
            draw_gridlines(fig, axes, &proj, &view, grid, &to_page);
        }

        fig.frame(axes, LineStyle::new(&named::BLACK, 1.0));

        if let Some((title, size)) = &self.title {
            fig.text(
                z_order::FRAME,
                ((axes.left + axes.right) / 2.0, axes.top - 0.4 * points(*size)),
                title.clone(),
                TextSpec::new(*size).align(HAlign::Center, VAlign::Bottom),
            );
        }

        if let Some(spec) = self.legend {
            let (location, entries) = match spec {
                LegendSpec::Labelled(loc) => (loc, self.labelled.clone()),
                LegendSpec::Barbs(loc) => {
                    let marker = LegendGlyph::Marker(
                        MarkerKind::Star,
                        self.options.location_color.mix(0.75),
                    );
                    (
                        loc,
                        vec![
                            LegendEntry::new(
                                LegendGlyph::Marker(MarkerKind::VerticalBar, named::BLACK.to_rgba()),
                                "风速 2m/s",
                            ),
                            LegendEntry::new(marker, TORNADO_LABEL),
                        ],
                    )
                }
            };
            fig.legend(axes, location, &entries, SMALL_FONT);
        }

        if let (Some((cmap, label)), Some(rect)) = (&self.colorbar, layout.colorbar) {
            fig.colorbar(rect, cmap, label, SMALL_FONT, Orientation::Horizontal);
        }

        Ok(())
    }

    fn layout(&self, fig: &Figure, extent: &Extent) -> Layout {
        let panel = Rect::from_fractions(fig.width(), fig.height(), self.options.panel);
        let pad = 10.0;

        let label_size = self
            .gridlines
            .iter()
            .filter_map(|g| g.label_size)
            .fold(0.0, f64::max);
        let label_px = points(label_size);
        let left_margin = if label_size > 0.0 { 4.5 * label_px } else { pad };
        let right_margin = if label_size > 0.0 { 2.0 * label_px } else { pad };
        let bottom_labels = if label_size > 0.0 { 1.6 * label_px } else { 0.0 };

        let title_h = self
            .title
            .as_ref()
            .map(|(_, size)| 1.8 * points(*size))
            .unwrap_or(0.0);

        let small = points(SMALL_FONT);
        let cbar_thickness = 0.9 * panel.width() / 20.0;
        let cbar_h = if self.colorbar.is_some() {
            pad + cbar_thickness + 3.4 * small
        } else {
            0.0
        };

        let available = Rect::new(
            panel.left + left_margin,
            panel.top + pad + title_h,
            panel.right - right_margin,
            panel.bottom - pad - bottom_labels - cbar_h,
        );
        let aspect = (extent.x1 - extent.x0) / (extent.y1 - extent.y0);
        let axes = available.fit_aspect(aspect);

        let colorbar = self.colorbar.as_ref().map(|_| {
            let top = axes.bottom + bottom_labels + pad;
            Rect::new(axes.left, top, axes.right, top + cbar_thickness)
        });

        Layout { axes, colorbar }
    }
}

struct Layout {
    axes: Rect,
    colorbar: Option<Rect>,
}

/// Projected coordinates of the points of a grid.
struct ProjectedGrid {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl ProjectedGrid {
    /// Bilinear position of a fractional `(column, row)` grid point.
    fn at(&self, (c, r): GridPoint) -> (f64, f64) {
        let (ny, nx) = self.x.dim();
        let i = (c.floor().max(0.0) as usize).min(nx - 2);
        let j = (r.floor().max(0.0) as usize).min(ny - 2);
        let (fx, fy) = (c - i as f64, r - j as f64);

        let lerp = |a: &Array2<f64>| {
            let bottom = a[(j, i)] * (1.0 - fx) + a[(j, i + 1)] * fx;
            let top = a[(j + 1, i)] * (1.0 - fx) + a[(j + 1, i + 1)] * fx;
            bottom * (1.0 - fy) + top * fy
        };
        (lerp(&self.x), lerp(&self.y))
    }

    /// Convert a projected vector at a grid point to grid index units.
    fn to_index_velocity(&self, j: usize, i: usize, dx: f64, dy: f64) -> Option<(f64, f64)> {
        let (ny, nx) = self.x.dim();
        let (i0, i1) = (i.saturating_sub(1), (i + 1).min(nx - 1));
        let (j0, j1) = (j.saturating_sub(1), (j + 1).min(ny - 1));

        let di = (i1 - i0) as f64;
        let dj = (j1 - j0) as f64;
        let xc = (self.x[(j, i1)] - self.x[(j, i0)]) / di;
        let yc = (self.y[(j, i1)] - self.y[(j, i0)]) / di;
        let xr = (self.x[(j1, i)] - self.x[(j0, i)]) / dj;
        let yr = (self.y[(j1, i)] - self.y[(j0, i)]) / dj;

        let det = xc * yr - xr * yc;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(((dx * yr - dy * xr) / det, (dy * xc - dx * yc) / det))
    }
}

fn map_primitive<F: Fn((f64, f64)) -> (f64, f64)>(primitive: &Primitive, f: &F) -> Primitive {
    match primitive {
        Primitive::Polyline { points, style } => Primitive::Polyline {
            points: points.iter().cloned().map(f).collect(),
            style: *style,
        },
        Primitive::Polygon { points, fill } => Primitive::Polygon {
            points: points.iter().cloned().map(f).collect(),
            fill: *fill,
        },
        Primitive::Marker {
            at,
            kind,
            size,
            color,
        } => Primitive::Marker {
            at: f(*at),
            kind: *kind,
            size: *size,
            color: *color,
        },
        Primitive::Text { at, text, spec } => Primitive::Text {
            at: f(*at),
            text: text.clone(),
            spec: *spec,
        },
    }
}

fn arrowhead(tip: (f64, f64), dir: (f64, f64), size: f64) -> Vec<(f64, f64)> {
    let back = (tip.0 - size * dir.0, tip.1 - size * dir.1);
    let side = (-dir.1 * size * 0.4, dir.0 * size * 0.4);
    vec![
        tip,
        (back.0 + side.0, back.1 + side.1),
        (back.0 - side.0, back.1 - side.1),
    ]
}

fn draw_contour_line(
    fig: &mut Figure,
    axes: Rect,
    page: &[(f64, f64)],
    style: &ContourStyle,
    label: Option<&str>,
) {
    let mut pieces = vec![page.to_vec()];

    if let (Some(text), Some(labels)) = (label, style.labels) {
        let size = points(labels.size);
        let gap = text_width(text, size) + 0.6 * size;
        let (split, pos) = split_for_label(page, gap);
        if let Some(pos) = pos.filter(|&p| axes.contains(p)) {
            pieces = split;
            fig.text(
                z_order::LINES,
                pos,
                text,
                TextSpec::new(labels.size).color(&style.line.color),
            );
        }
    }

    if let Some(ticks) = style.ticks {
        let spacing = points(ticks.spacing);
        let length = ticks.length * spacing * ticks.angle.to_radians().sin();
        for tick in tick_marks(page, spacing, length) {
            fig.polyline(z_order::LINES, Some(axes), tick.to_vec(), style.line);
        }
    }

    for piece in pieces {
        fig.polyline(z_order::LINES, Some(axes), piece, style.line);
    }
}

/// Geodetic box around the view, as a rectangle with `top` at the south edge.
fn geodetic_view(proj: &Projection, extent: &Extent) -> Rect {
    let geo = Extent::of_points(
        extent
            .perimeter(50)
            .into_iter()
            .map(|(x, y)| proj.inverse(x, y)),
    );

    match geo {
        Some(g) => Rect::new(
            (g.x0 - 2.0).max(-180.0),
            (g.y0 - 2.0).max(-90.0),
            (g.x1 + 2.0).min(180.0),
            (g.y1 + 2.0).min(90.0),
        ),
        None => Rect::new(-180.0, -90.0, 180.0, 90.0),
    }
}

fn draw_gridlines<F>(
    fig: &mut Figure,
    axes: Rect,
    proj: &Projection,
    view: &Rect,
    grid: &Gridlines,
    to_page: &F,
) where
    F: Fn((f64, f64)) -> (f64, f64),
{
    let auto = |lo: f64, hi: f64| nice_levels(lo, hi, 5);
    let lons = grid
        .longitudes
        .clone()
        .unwrap_or_else(|| auto(view.left + 2.0, view.right - 2.0));
    let lats = grid
        .latitudes
        .clone()
        .unwrap_or_else(|| auto(view.top + 2.0, view.bottom - 2.0));

    let label_spec = grid.label_size.map(TextSpec::new);
    let n = 100;

    for &lon in &lons {
        if lon < view.left || lon > view.right {
            continue;
        }
        let pts: Vec<(f64, f64)> = (0..=n)
            .map(|k| {
                let lat = view.top + (view.bottom - view.top) * k as f64 / n as f64;
                to_page(proj.forward(lon, lat))
            })
            .collect();
        fig.polyline(z_order::GRID, Some(axes), pts.clone(), grid.style);

        if let Some(spec) = label_spec {
            if let Some(x) = crossing(&pts, |p| p.1 - axes.bottom, |a, b, t| a.0 + t * (b.0 - a.0)) {
                if x >= axes.left && x <= axes.right {
                    fig.text(
                        z_order::FRAME,
                        (x, axes.bottom + 0.3 * spec.size),
                        lon_label(lon),
                        spec.align(HAlign::Center, VAlign::Top),
                    );
                }
            }
        }
    }

    for &lat in &lats {
        if lat < view.top || lat > view.bottom {
            continue;
        }
        let pts: Vec<(f64, f64)> = (0..=n)
            .map(|k| {
                let lon = view.left + (view.right - view.left) * k as f64 / n as f64;
                to_page(proj.forward(lon, lat))
            })
            .collect();
        fig.polyline(z_order::GRID, Some(axes), pts.clone(), grid.style);

        if let Some(spec) = label_spec {
            if let Some(y) = crossing(&pts, |p| p.0 - axes.left, |a, b, t| a.1 + t * (b.1 - a.1)) {
                if y >= axes.top && y <= axes.bottom {
                    fig.text(
                        z_order::FRAME,
                        (axes.left - 0.3 * spec.size, y),
                        lat_label(lat),
                        spec.align(HAlign::Right, VAlign::Center),
                    );
                }
            }
        }
    }
}

/// Where a line first crosses the zero of `signed`, interpolated with `at`.
fn crossing<S, A>(pts: &[(f64, f64)], signed: S, at: A) -> Option<f64>
where
    S: Fn((f64, f64)) -> f64,
    A: Fn((f64, f64), (f64, f64), f64) -> f64,
{
    pts.windows(2).find_map(|w| {
        let (da, db) = (signed(w[0]), signed(w[1]));
        if da == 0.0 {
            Some(at(w[0], w[1], 0.0))
        } else if da * db < 0.0 {
            Some(at(w[0], w[1], da / (da - db)))
        } else {
            None
        }
    })
}

/// Label of a meridian.
pub fn lon_label(lon: f64) -> String {
    let lon = ((lon + 180.0).rem_euclid(360.0)) - 180.0;
    if lon.abs() < 1.0e-9 || (lon.abs() - 180.0).abs() < 1.0e-9 {
        format!("{}°", format_tick(lon.abs()))
    } else if lon > 0.0 {
        format!("{}°E", format_tick(lon))
    } else {
        format!("{}°W", format_tick(-lon))
    }
}

/// Label of a parallel.
pub fn lat_label(lat: f64) -> String {
    if lat.abs() < 1.0e-9 {
        "0°".to_owned()
    } else if lat > 0.0 {
        format!("{}°N", format_tick(lat))
    } else {
        format!("{}°S", format_tick(-lat))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::GriddedDataset;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use ndarray::{Array, IxDyn};

    fn time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 27)
            .and_then(|d| d.and_hms_opt(5, 0, 0))
            .unwrap()
    }

    fn lat_lon() -> (Vec<f64>, Vec<f64>) {
        (
            (0..9).map(|k| 30.0 - 2.5 * k as f64).collect(),
            (0..13).map(|k| 100.0 + 2.5 * k as f64).collect(),
        )
    }

    fn surface() -> GriddedDataset {
        let (lat, lon) = lat_lon();
        let shape = IxDyn(&[1, lat.len(), lon.len()]);
        let msl = Array::from_shape_fn(shape.clone(), |ix| 1000.0 + ix[1] as f64 + 0.5 * ix[2] as f64);
        let wind = Array::from_elem(shape, 8.0);

        GriddedDataset::new(GridKind::Surface, vec![time()], vec![], lat, lon)
            .with_variable("msl", msl)
            .and_then(|ds| ds.with_variable("u10", wind.clone()))
            .and_then(|ds| ds.with_variable("v10", wind))
            .unwrap()
    }

    fn pressure_levels() -> GriddedDataset {
        let (lat, lon) = lat_lon();
        let shape = IxDyn(&[1, 2, lat.len(), lon.len()]);
        let z = Array::from_shape_fn(shape.clone(), |ix| 570.0 + ix[2] as f64);
        let t = Array::from_shape_fn(shape.clone(), |ix| 263.0 + ix[3] as f64);
        let wind = Array::from_shape_fn(shape, |ix| 10.0 + ix[3] as f64);

        GriddedDataset::new(
            GridKind::PressureLevels,
            vec![time()],
            vec![500.0, 850.0],
            lat,
            lon,
        )
        .with_variable("z", z)
        .and_then(|ds| ds.with_variable("t", t))
        .and_then(|ds| ds.with_variable("u", wind.clone()))
        .and_then(|ds| ds.with_variable("v", wind))
        .unwrap()
    }

    #[test]
    fn test_surface_rejects_level_before_drawing() {
        let ds = surface();
        let mut map = Map::new(MapData::from_dataset(&ds), MapOptions::default());

        let err = map.plot(time(), Some(500.0), 1.0, 1.0).unwrap_err();
        assert!(matches!(err, FigureError::Usage(_)));
        assert!(map.layers.is_empty());
    }

    #[test]
    fn test_pressure_levels_require_level() {
        let ds = pressure_levels();
        let mut map = Map::new(MapData::from_dataset(&ds), MapOptions::default());

        let err = map.plot(time(), None, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, FigureError::Usage(_)));
        assert!(map.layers.is_empty());
    }

    #[test]
    fn test_plot_modes_draw() {
        let ds = surface();
        let mut map = Map::new(MapData::from_dataset(&ds), MapOptions::default());
        map.plot(time(), None, 1.0, 1.0).unwrap();
        assert!(map.layers.iter().any(|l| matches!(l, Layer::Contour { .. })));
        assert!(map.layers.iter().any(|l| matches!(l, Layer::Barb { .. })));

        let ds = pressure_levels();
        let mut map = Map::new(MapData::from_dataset(&ds), MapOptions::default());
        map.plot(time(), Some(850.0), 1.0, 1.0).unwrap();
        assert!(map.colorbar.is_some());
        assert!(map
            .layers
            .iter()
            .any(|l| matches!(l, Layer::Projected { z, .. } if *z == z_order::FILL)));

        let fig = map.into_figure().unwrap();
        assert!(!fig.primitives().is_empty());
    }

    #[test]
    fn test_unknown_level_is_selection_error() {
        let ds = pressure_levels();
        let mut map = Map::new(MapData::from_dataset(&ds), MapOptions::default());
        let err = map.plot(time(), Some(700.0), 1.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            FigureError::Analysis(crate::error::AnalysisError::Selection(_))
        ));
    }

    #[test]
    fn test_scale_bar_zone_and_length() {
        let mut map = Map::new(MapData::Raw, MapOptions::default().projection(Projection::PlateCarree));
        map.set_extent([113.0, 114.0, 23.0, 24.0]);

        let bar = map.scale_bar(5.0, (0.1, 0.95), "km", 1000.0).unwrap();
        assert_eq!(bar.zone, 49);
        assert_abs_diff_eq!(bar.ends[1].0 - bar.ends[0].0, 5000.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(bar.ends[0].1, bar.ends[1].1);
    }

    #[test]
    fn test_scale_bar_needs_extent() {
        let mut map = Map::new(MapData::Raw, MapOptions::default());
        assert!(map.scale_bar(5.0, (0.5, 0.05), "km", 1000.0).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(lon_label(110.0), "110°E");
        assert_eq!(lon_label(-30.0), "30°W");
        assert_eq!(lon_label(180.0), "180°");
        assert_eq!(lat_label(20.0), "20°N");
        assert_eq!(lat_label(0.0), "0°");
        assert_eq!(ContourLabels::fixed(1).format(962.5), "962.5");
        assert_eq!(ContourLabels::fixed(0).format(584.0), "584");
    }

    #[test]
    fn test_tornado_marker_in_legend() {
        let mut map = Map::new(MapData::Raw, MapOptions::default());
        map.set_extent([105.0, 121.0, 20.0, 28.0])
            .draw_tornado_location(true);

        assert_eq!(map.labelled.len(), 1);
        assert_eq!(map.labelled[0].label, TORNADO_LABEL);

        let svg = map.into_figure().unwrap().to_svg_string().unwrap();
        assert!(svg.contains(TORNADO_LABEL));
    }
}
