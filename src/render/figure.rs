//! A retained figure of drawing primitives, rendered to SVG with plotters.
//!
//! Coordinates are figure pixels with the origin at the top left. Figures are laid out at
//! 100 pixels per inch, sizes given in points are converted with [`points`].
use super::colormap::DiscreteColormap;
use crate::error::{FigureError, FigureResult};
use plotters::{
    prelude::*,
    style::{
        text_anchor::{HPos, Pos, VPos},
        FontDesc, FontFamily, FontStyle, FontTransform, RGBAColor,
    },
};
use std::path::Path;

/// Pixels per inch.
pub const DPI: f64 = 100.0;

/// Convert a size in points to pixels.
#[inline]
pub fn points(pt: f64) -> f64 {
    pt * DPI / 72.0
}

/// A rectangle on the figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
}

impl Rect {
    /// Create a rectangle from its edges.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    /// A rectangle given as `[left, bottom, width, height]` fractions of the figure, measured
    /// from the bottom left corner.
    pub fn from_fractions(fig_width: u32, fig_height: u32, fractions: [f64; 4]) -> Self {
        let (w, h) = (f64::from(fig_width), f64::from(fig_height));
        let [left, bottom, width, height] = fractions;
        Rect {
            left: left * w,
            top: (1.0 - bottom - height) * h,
            right: (left + width) * w,
            bottom: (1.0 - bottom) * h,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height in pixels.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// The point at fractions `(fx, fy)` of the rectangle, `fy` measured from the bottom.
    pub fn at_fraction(&self, fx: f64, fy: f64) -> (f64, f64) {
        (
            self.left + fx * self.width(),
            self.bottom - fy * self.height(),
        )
    }

    /// Whether a point is inside, edges included.
    pub fn contains(&self, p: (f64, f64)) -> bool {
        p.0 >= self.left && p.0 <= self.right && p.1 >= self.top && p.1 <= self.bottom
    }

    /// The largest rectangle with the given width to height ratio centered in this one.
    pub fn fit_aspect(&self, aspect: f64) -> Rect {
        if !(aspect > 0.0) || !aspect.is_finite() {
            return *self;
        }

        let (cx, cy) = (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        );
        let (mut w, mut h) = (self.width(), self.height());
        if w / h > aspect {
            w = h * aspect;
        } else {
            h = w / aspect;
        }

        Rect::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }
}

/// Dash pattern of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dash {
    /// Unbroken.
    Solid,
    /// Long dashes.
    Dashed,
    /// Dots.
    Dotted,
}

/// How a line is stroked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    /// Stroke color.
    pub color: RGBAColor,
    /// Width in pixels.
    pub width: f64,
    /// Dash pattern.
    pub dash: Dash,
}

impl LineStyle {
    /// A solid line with a width in points.
    pub fn new<C: Color>(color: &C, width_pt: f64) -> Self {
        LineStyle {
            color: color.to_rgba(),
            width: points(width_pt),
            dash: Dash::Solid,
        }
    }

    /// Builder method for the dash pattern.
    pub fn dash(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }

    /// Builder method to set the opacity.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.color.3 = alpha;
        self
    }
}

/// Marker shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Five pointed star.
    Star,
    /// Filled circle.
    Circle,
    /// Short vertical bar.
    VerticalBar,
}

/// Horizontal placement of text relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    /// Anchor at the left.
    Left,
    /// Anchor at the center.
    Center,
    /// Anchor at the right.
    Right,
}

/// Vertical placement of text relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    /// Anchor at the top.
    Top,
    /// Anchor at the center.
    Center,
    /// Anchor at the bottom.
    Bottom,
}

/// How text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSpec {
    /// Font size in pixels.
    pub size: f64,
    /// Text color.
    pub color: RGBAColor,
    /// Bold font.
    pub bold: bool,
    /// Horizontal alignment.
    pub h: HAlign,
    /// Vertical alignment.
    pub v: VAlign,
    /// Read from bottom to top.
    pub vertical: bool,
}

impl TextSpec {
    /// Black, centered text with a size in points.
    pub fn new(size_pt: f64) -> Self {
        TextSpec {
            size: points(size_pt),
            color: BLACK.to_rgba(),
            bold: false,
            h: HAlign::Center,
            v: VAlign::Center,
            vertical: false,
        }
    }

    /// Builder method for the color.
    pub fn color<C: Color>(mut self, color: &C) -> Self {
        self.color = color.to_rgba();
        self
    }

    /// Builder method for a bold font.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Builder method for the alignment.
    pub fn align(mut self, h: HAlign, v: VAlign) -> Self {
        self.h = h;
        self.v = v;
        self
    }

    /// Builder method for text reading from bottom to top.
    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }

    /// Builder method to set the opacity.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.color.3 = alpha;
        self
    }
}

/// Something drawn on a figure.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// An open line.
    Polyline {
        /// Vertices.
        points: Vec<(f64, f64)>,
        /// Stroke.
        style: LineStyle,
    },
    /// A closed, filled shape.
    Polygon {
        /// Vertices.
        points: Vec<(f64, f64)>,
        /// Fill color.
        fill: RGBAColor,
    },
    /// A marker centered on a point, `size` is the diameter in pixels.
    Marker {
        /// Anchor point.
        at: (f64, f64),
        /// Marker shape.
        kind: MarkerKind,
        /// Diameter in pixels.
        size: f64,
        /// Fill color.
        color: RGBAColor,
    },
    /// A text label; lines are separated by `\n`.
    Text {
        /// Anchor point.
        at: (f64, f64),
        /// The text.
        text: String,
        /// Font and placement.
        spec: TextSpec,
    },
}

#[derive(Debug, Clone)]
struct Item {
    z: i32,
    clip: Option<Rect>,
    primitive: Primitive,
}

/// Drawing order of the common layers.
pub mod z_order {
    /// Land and ocean fills.
    pub const FEATURES: i32 = -10;
    /// Filled contours and images.
    pub const FILL: i32 = 0;
    /// Contour lines.
    pub const LINES: i32 = 2;
    /// Boundaries and coastlines.
    pub const BOUNDARIES: i32 = 3;
    /// Barbs, vectors and streamlines.
    pub const VECTORS: i32 = 4;
    /// Grid lines.
    pub const GRID: i32 = 5;
    /// Markers.
    pub const MARKERS: i32 = 10;
    /// Axes frames and labels.
    pub const FRAME: i32 = 20;
    /// Legends.
    pub const LEGEND: i32 = 50;
}

/// What a legend entry shows next to its label.
#[derive(Debug, Clone, PartialEq)]
pub enum LegendGlyph {
    /// A line.
    Line(LineStyle),
    /// A line with markers.
    LineMarker(LineStyle, MarkerKind),
    /// A marker.
    Marker(MarkerKind, RGBAColor),
    /// A filled patch.
    Patch(RGBAColor),
}

/// One legend entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    /// What is drawn.
    pub glyph: LegendGlyph,
    /// Label text.
    pub label: String,
}

impl LegendEntry {
    /// Create an entry.
    pub fn new<S: Into<String>>(glyph: LegendGlyph, label: S) -> Self {
        LegendEntry {
            glyph,
            label: label.into(),
        }
    }
}

/// Where a legend goes inside its panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendLocation {
    /// Upper left corner.
    UpperLeft,
    /// Lower right corner.
    LowerRight,
}

/// Orientation of a color bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Along the bottom of a panel.
    Horizontal,
    /// Along the side of a panel.
    Vertical,
}

/// Rough width of a string in pixels.
pub fn text_width(text: &str, size: f64) -> f64 {
    text.lines()
        .map(|line| {
            line.chars()
                .map(|c| if c.is_ascii() { 0.55 * size } else { size })
                .sum::<f64>()
        })
        .fold(0.0, f64::max)
}

/// Format a tick or level value without trailing zeros.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::render::format_tick;
///
/// assert_eq!(format_tick(1000.0), "1000");
/// assert_eq!(format_tick(962.5), "962.5");
/// assert_eq!(format_tick(-0.0), "0");
/// assert_eq!(format_tick(2.0e-6), "2e-6");
/// ```
pub fn format_tick(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    if value.abs() < 1.0e-3 {
        let s = format!("{:e}", value);
        return s;
    }

    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_owned()
    } else {
        s.to_owned()
    }
}

/// A figure.
#[derive(Debug, Clone)]
pub struct Figure {
    width: u32,
    height: u32,
    font_family: String,
    items: Vec<Item>,
}

impl Figure {
    /// An empty figure, size in pixels.
    pub fn new<S: Into<String>>(width: u32, height: u32, font_family: S) -> Self {
        Figure {
            width,
            height,
            font_family: font_family.into(),
            items: vec![],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole figure as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Add a primitive, optionally clipped to a rectangle.
    pub fn add(&mut self, z: i32, clip: Option<Rect>, primitive: Primitive) {
        self.items.push(Item { z, clip, primitive });
    }

    /// Add a line.
    pub fn polyline(&mut self, z: i32, clip: Option<Rect>, points: Vec<(f64, f64)>, style: LineStyle) {
        if points.len() > 1 {
            self.add(z, clip, Primitive::Polyline { points, style });
        }
    }

    /// Add a filled polygon.
    pub fn polygon(&mut self, z: i32, clip: Option<Rect>, points: Vec<(f64, f64)>, fill: RGBAColor) {
        if points.len() > 2 {
            self.add(z, clip, Primitive::Polygon { points, fill });
        }
    }

    /// Add a marker.
    pub fn marker(
        &mut self,
        z: i32,
        clip: Option<Rect>,
        at: (f64, f64),
        kind: MarkerKind,
        size: f64,
        color: RGBAColor,
    ) {
        self.add(
            z,
            clip,
            Primitive::Marker {
                at,
                kind,
                size,
                color,
            },
        );
    }

    /// Add text.
    pub fn text<S: Into<String>>(&mut self, z: i32, at: (f64, f64), text: S, spec: TextSpec) {
        self.add(
            z,
            None,
            Primitive::Text {
                at,
                text: text.into(),
                spec,
            },
        );
    }

    /// Draw the outline of a rectangle.
    pub fn frame(&mut self, rect: Rect, style: LineStyle) {
        let pts = vec![
            (rect.left, rect.top),
            (rect.right, rect.top),
            (rect.right, rect.bottom),
            (rect.left, rect.bottom),
            (rect.left, rect.top),
        ];
        self.polyline(z_order::FRAME, None, pts, style);
    }

    /// The primitives in drawing order.
    pub fn primitives(&self) -> Vec<&Primitive> {
        let mut items: Vec<&Item> = self.items.iter().collect();
        items.sort_by_key(|item| item.z);
        items.into_iter().map(|item| &item.primitive).collect()
    }

    /// Add a legend in a corner of a panel.
    pub fn legend(
        &mut self,
        panel: Rect,
        location: LegendLocation,
        entries: &[LegendEntry],
        font_size_pt: f64,
    ) {
        if entries.is_empty() {
            return;
        }

        let size = points(font_size_pt);
        let pad = 0.5 * size;
        let glyph_w = 2.0 * size;
        let row_h = 1.4 * size;
        let label_w = entries
            .iter()
            .map(|e| text_width(&e.label, size))
            .fold(0.0, f64::max);

        let w = pad + glyph_w + pad + label_w + pad;
        let h = pad + row_h * entries.len() as f64 + pad;
        let (left, top) = match location {
            LegendLocation::UpperLeft => (panel.left + pad, panel.top + pad),
            LegendLocation::LowerRight => (panel.right - w - pad, panel.bottom - h - pad),
        };
        let frame = Rect::new(left, top, left + w, top + h);

        self.polygon(
            z_order::LEGEND,
            None,
            rect_points(&frame),
            WHITE.mix(0.8),
        );
        let mut outline = rect_points(&frame);
        outline.push((frame.left, frame.top));
        self.polyline(
            z_order::LEGEND,
            None,
            outline,
            LineStyle::new(&RGBColor(204, 204, 204), 0.8),
        );

        for (k, entry) in entries.iter().enumerate() {
            let cy = top + pad + row_h * (k as f64 + 0.5);
            let (gx0, gx1) = (left + pad, left + pad + glyph_w);
            let gc = ((gx0 + gx1) / 2.0, cy);

            match &entry.glyph {
                LegendGlyph::Line(style) => {
                    self.polyline(z_order::LEGEND + 1, None, vec![(gx0, cy), (gx1, cy)], *style)
                }
                LegendGlyph::LineMarker(style, kind) => {
                    self.polyline(z_order::LEGEND + 1, None, vec![(gx0, cy), (gx1, cy)], *style);
                    self.marker(z_order::LEGEND + 1, None, gc, *kind, 0.6 * size, style.color);
                }
                LegendGlyph::Marker(kind, color) => {
                    self.marker(z_order::LEGEND + 1, None, gc, *kind, 0.9 * size, *color)
                }
                LegendGlyph::Patch(color) => {
                    let patch = Rect::new(gx0, cy - 0.35 * size, gx1, cy + 0.35 * size);
                    self.polygon(z_order::LEGEND + 1, None, rect_points(&patch), *color);
                }
            }

            self.text(
                z_order::LEGEND + 1,
                (gx1 + pad, cy),
                entry.label.clone(),
                TextSpec::new(font_size_pt).align(HAlign::Left, VAlign::Center),
            );
        }
    }

    /// Add a color bar for the bands of a color map.
    ///
    /// Every band gets the same length, extensions for the under and over colors are drawn as
    /// triangles at the ends.
    pub fn colorbar(
        &mut self,
        rect: Rect,
        cmap: &DiscreteColormap,
        label: &str,
        font_size_pt: f64,
        orientation: Orientation,
    ) {
        let colors = cmap.colors();
        let levels = cmap.levels();
        let n = colors.len() as f64;
        let size = points(font_size_pt);
        let tick_spec = TextSpec::new(font_size_pt);

        let (length, thickness) = match orientation {
            Orientation::Horizontal => (rect.width(), rect.height()),
            Orientation::Vertical => (rect.height(), rect.width()),
        };
        let ext = if cmap.under().is_some() || cmap.over().is_some() {
            0.05 * length
        } else {
            0.0
        };
        let inner = length - 2.0 * ext;

        // Map a position along the bar and across it to the page.
        let place = |along: f64, across: f64| -> (f64, f64) {
            match orientation {
                Orientation::Horizontal => (rect.left + along, rect.top + across),
                Orientation::Vertical => (rect.left + across, rect.bottom - along),
            }
        };

        for (k, &color) in colors.iter().enumerate() {
            let a0 = ext + inner * k as f64 / n;
            let a1 = ext + inner * (k + 1) as f64 / n;
            let pts = vec![
                place(a0, 0.0),
                place(a1, 0.0),
                place(a1, thickness),
                place(a0, thickness),
            ];
            self.polygon(z_order::FRAME, None, pts, color);
        }

        if let Some(under) = cmap.under() {
            let pts = vec![place(ext, 0.0), place(ext, thickness), place(0.0, thickness / 2.0)];
            self.polygon(z_order::FRAME, None, pts, under);
        }
        if let Some(over) = cmap.over() {
            let pts = vec![
                place(length - ext, 0.0),
                place(length - ext, thickness),
                place(length, thickness / 2.0),
            ];
            self.polygon(z_order::FRAME, None, pts, over);
        }

        let outline = vec![
            place(ext, 0.0),
            place(length - ext, 0.0),
            place(length - ext, thickness),
            place(ext, thickness),
            place(ext, 0.0),
        ];
        self.polyline(z_order::FRAME, None, outline, LineStyle::new(&BLACK, 0.8));

        let tick_len = 0.25 * thickness;
        for (k, &level) in levels.iter().enumerate() {
            let a = ext + inner * k as f64 / n;
            self.polyline(
                z_order::FRAME,
                None,
                vec![place(a, thickness), place(a, thickness - tick_len)],
                LineStyle::new(&BLACK, 0.8),
            );

            let (at, spec) = match orientation {
                Orientation::Horizontal => (
                    place(a, thickness + 0.3 * size),
                    tick_spec.align(HAlign::Center, VAlign::Top),
                ),
                Orientation::Vertical => (
                    place(a, thickness + 0.3 * size),
                    tick_spec.align(HAlign::Left, VAlign::Center),
                ),
            };
            self.text(z_order::FRAME, at, format_tick(level), spec);
        }

        if !label.is_empty() {
            match orientation {
                Orientation::Horizontal => self.text(
                    z_order::FRAME,
                    place(length / 2.0, thickness + 1.8 * size),
                    label,
                    tick_spec.align(HAlign::Center, VAlign::Top),
                ),
                Orientation::Vertical => {
                    let width = levels
                        .iter()
                        .map(|&l| text_width(&format_tick(l), size))
                        .fold(0.0, f64::max);
                    self.text(
                        z_order::FRAME,
                        place(length / 2.0, thickness + 0.6 * size + width + 0.4 * size),
                        label,
                        tick_spec.align(HAlign::Center, VAlign::Top).vertical(),
                    )
                }
            }
        }
    }

    /// Write the figure as an SVG file, creating the directory if needed.
    pub fn save(&self, path: &Path) -> FigureResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        self.render(&root)?;
        root.present().map_err(render_error)
    }

    /// Render the figure to an SVG document in memory.
    pub fn to_svg_string(&self) -> FigureResult<String> {
        let mut buf = String::new();
        {
            let root = SVGBackend::with_string(&mut buf, (self.width, self.height))
                .into_drawing_area();
            self.render(&root)?;
            root.present().map_err(render_error)?;
        }
        Ok(buf)
    }

    fn render<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
    ) -> FigureResult<()> {
        root.fill(&WHITE).map_err(render_error)?;

        let mut items: Vec<&Item> = self.items.iter().collect();
        items.sort_by_key(|item| item.z);

        for item in items {
            match &item.primitive {
                Primitive::Polyline { points, style } => {
                    let pieces = match item.clip {
                        Some(clip) => clip_polyline(points, &clip),
                        None => vec![points.clone()],
                    };
                    for piece in pieces {
                        for dash in dash_pieces(&piece, style) {
                            let shape = ShapeStyle {
                                color: style.color,
                                filled: false,
                                stroke_width: stroke(style.width),
                            };
                            root.draw(&PathElement::new(to_pixels(&dash), shape))
                                .map_err(render_error)?;
                        }
                    }
                }
                Primitive::Polygon { points, fill } => {
                    let points = match item.clip {
                        Some(clip) => clip_polygon(points, &clip),
                        None => points.clone(),
                    };
                    if points.len() > 2 {
                        root.draw(&Polygon::new(to_pixels(&points), fill.filled()))
                            .map_err(render_error)?;
                    }
                }
                Primitive::Marker {
                    at,
                    kind,
                    size,
                    color,
                } => {
                    if item.clip.map(|c| !c.contains(*at)).unwrap_or(false) {
                        continue;
                    }
                    draw_marker(root, *at, *kind, *size, *color)?;
                }
                Primitive::Text { at, text, spec } => {
                    if item.clip.map(|c| !c.contains(*at)).unwrap_or(false) {
                        continue;
                    }
                    self.draw_text(root, *at, text, spec)?;
                }
            }
        }

        Ok(())
    }

    fn draw_text<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        at: (f64, f64),
        text: &str,
        spec: &TextSpec,
    ) -> FigureResult<()> {
        let style = if spec.bold {
            FontStyle::Bold
        } else {
            FontStyle::Normal
        };
        let mut font = FontDesc::new(FontFamily::Name(&self.font_family), spec.size, style);
        if spec.vertical {
            font = font.transform(FontTransform::Rotate270);
        }

        let h = match spec.h {
            HAlign::Left => HPos::Left,
            HAlign::Center => HPos::Center,
            HAlign::Right => HPos::Right,
        };
        let v = match spec.v {
            VAlign::Top => VPos::Top,
            VAlign::Center => VPos::Center,
            VAlign::Bottom => VPos::Bottom,
        };
        let text_style = TextStyle::from(font)
            .color(&spec.color)
            .pos(Pos::new(h, v));

        // Multi-line text is stacked around the anchor.
        let lines: Vec<&str> = text.lines().collect();
        let line_h = 1.2 * spec.size;
        let block = line_h * (lines.len() as f64 - 1.0);
        let first = match spec.v {
            VAlign::Top => 0.0,
            VAlign::Center => -block / 2.0,
            VAlign::Bottom => -block,
        };

        for (k, line) in lines.iter().enumerate() {
            let offset = first + line_h * k as f64;
            let pos = if spec.vertical {
                (at.0 + offset, at.1)
            } else {
                (at.0, at.1 + offset)
            };
            root.draw(&Text::new(line.to_string(), to_pixel(pos), text_style.clone()))
                .map_err(render_error)?;
        }

        Ok(())
    }
}

fn render_error<E: std::fmt::Display>(err: E) -> FigureError {
    FigureError::Render(err.to_string())
}

fn stroke(width: f64) -> u32 {
    width.round().max(1.0) as u32
}

fn to_pixel(p: (f64, f64)) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

fn to_pixels(points: &[(f64, f64)]) -> Vec<(i32, i32)> {
    points.iter().cloned().map(to_pixel).collect()
}

fn rect_points(rect: &Rect) -> Vec<(f64, f64)> {
    vec![
        (rect.left, rect.top),
        (rect.right, rect.top),
        (rect.right, rect.bottom),
        (rect.left, rect.bottom),
    ]
}

fn draw_marker<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    at: (f64, f64),
    kind: MarkerKind,
    size: f64,
    color: RGBAColor,
) -> FigureResult<()> {
    let r = size / 2.0;
    match kind {
        MarkerKind::Circle => root
            .draw(&Circle::new(to_pixel(at), r.round().max(1.0) as i32, color.filled()))
            .map_err(render_error),
        MarkerKind::Star => {
            let pts: Vec<(f64, f64)> = (0..10)
                .map(|k| {
                    let radius = if k % 2 == 0 { r } else { 0.382 * r };
                    let angle = std::f64::consts::PI * (k as f64 / 5.0 - 0.5);
                    (at.0 + radius * angle.cos(), at.1 + radius * angle.sin())
                })
                .collect();
            root.draw(&Polygon::new(to_pixels(&pts), color.filled()))
                .map_err(render_error)
        }
        MarkerKind::VerticalBar => {
            let shape = ShapeStyle {
                color,
                filled: false,
                stroke_width: stroke(size / 8.0),
            };
            root.draw(&PathElement::new(
                to_pixels(&[(at.0, at.1 - r), (at.0, at.1 + r)]),
                shape,
            ))
            .map_err(render_error)
        }
    }
}

/// Split a line into its dashes.
fn dash_pieces(points: &[(f64, f64)], style: &LineStyle) -> Vec<Vec<(f64, f64)>> {
    let w = style.width.max(1.0);
    let (on, off) = match style.dash {
        Dash::Solid => return vec![points.to_vec()],
        Dash::Dashed => (3.7 * w, 1.6 * w),
        Dash::Dotted => (w, 1.65 * w),
    };

    let mut pieces = Vec::new();
    let mut current = vec![];
    let mut drawing = true;
    let mut left = on;

    for seg in points.windows(2) {
        let (mut p, q) = (seg[0], seg[1]);
        let mut len = (q.0 - p.0).hypot(q.1 - p.1);
        if drawing && current.is_empty() {
            current.push(p);
        }

        while len > left {
            let t = left / len;
            let cut = (p.0 + t * (q.0 - p.0), p.1 + t * (q.1 - p.1));
            if drawing {
                current.push(cut);
                pieces.push(std::mem::take(&mut current));
            } else {
                current = vec![cut];
            }
            drawing = !drawing;
            len -= left;
            left = if drawing { on } else { off };
            p = cut;
        }

        left -= len;
        if drawing {
            current.push(q);
        }
    }

    if drawing && current.len() > 1 {
        pieces.push(current);
    }
    pieces
}

/// Clip a line to a rectangle with the Liang-Barsky algorithm, giving the visible pieces.
pub fn clip_polyline(points: &[(f64, f64)], rect: &Rect) -> Vec<Vec<(f64, f64)>> {
    let mut pieces = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for seg in points.windows(2) {
        match clip_segment(seg[0], seg[1], rect) {
            Some((a, b)) => {
                let continues = current.last().map(|&last| last == a).unwrap_or(false);
                if !continues {
                    if current.len() > 1 {
                        pieces.push(std::mem::take(&mut current));
                    }
                    current = vec![a];
                }
                current.push(b);
                // The segment left the rectangle.
                if b != seg[1] {
                    pieces.push(std::mem::take(&mut current));
                }
            }
            None => {
                if current.len() > 1 {
                    pieces.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }

    if current.len() > 1 {
        pieces.push(current);
    }
    pieces
}

fn clip_segment(a: (f64, f64), b: (f64, f64), rect: &Rect) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    let checks = [
        (-dx, a.0 - rect.left),
        (dx, rect.right - a.0),
        (-dy, a.1 - rect.top),
        (dy, rect.bottom - a.1),
    ];
    for &(p, q) in checks.iter() {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    let at = |t: f64| {
        if t == 0.0 {
            a
        } else if t == 1.0 {
            b
        } else {
            (a.0 + t * dx, a.1 + t * dy)
        }
    };
    Some((at(t0), at(t1)))
}

/// Clip a polygon to a rectangle with the Sutherland-Hodgman algorithm.
pub fn clip_polygon(points: &[(f64, f64)], rect: &Rect) -> Vec<(f64, f64)> {
    type Inside = fn(&Rect, (f64, f64)) -> bool;
    type Cross = fn(&Rect, (f64, f64), (f64, f64)) -> (f64, f64);

    fn lerp_x(x: f64, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        let t = (x - a.0) / (b.0 - a.0);
        (x, a.1 + t * (b.1 - a.1))
    }
    fn lerp_y(y: f64, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        let t = (y - a.1) / (b.1 - a.1);
        (a.0 + t * (b.0 - a.0), y)
    }

    let edges: [(Inside, Cross); 4] = [
        (|r, p| p.0 >= r.left, |r, a, b| lerp_x(r.left, a, b)),
        (|r, p| p.0 <= r.right, |r, a, b| lerp_x(r.right, a, b)),
        (|r, p| p.1 >= r.top, |r, a, b| lerp_y(r.top, a, b)),
        (|r, p| p.1 <= r.bottom, |r, a, b| lerp_y(r.bottom, a, b)),
    ];

    let mut poly = points.to_vec();
    for (inside, cross) in edges.iter() {
        if poly.is_empty() {
            break;
        }

        let input = std::mem::take(&mut poly);
        for (k, &cur) in input.iter().enumerate() {
            let prev = input[(k + input.len() - 1) % input.len()];
            let (cur_in, prev_in) = (inside(rect, cur), inside(rect, prev));
            if cur_in != prev_in {
                poly.push(cross(rect, prev, cur));
            }
            if cur_in {
                poly.push(cur);
            }
        }
    }

    poly
}

/// Maps a rectangle of data coordinates onto a panel, y increasing upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAxes {
    /// The panel.
    pub rect: Rect,
    /// Data range along x, `(left, right)`.
    pub x: (f64, f64),
    /// Data range along y, `(bottom, top)`.
    pub y: (f64, f64),
}

impl LinearAxes {
    /// Create axes.
    pub fn new(rect: Rect, x: (f64, f64), y: (f64, f64)) -> Self {
        LinearAxes { rect, x, y }
    }

    /// Page position of a data point.
    pub fn to_page(&self, x: f64, y: f64) -> (f64, f64) {
        let fx = (x - self.x.0) / (self.x.1 - self.x.0);
        let fy = (y - self.y.0) / (self.y.1 - self.y.0);
        self.rect.at_fraction(fx, fy)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rect_from_fractions() {
        let r = Rect::from_fractions(1800, 1200, [0.08, 0.08, 0.47, 0.87]);
        assert_abs_diff_eq!(r.left, 144.0, epsilon = 1.0e-9);
        assert_abs_diff_eq!(r.bottom, 1104.0, epsilon = 1.0e-9);
        assert_abs_diff_eq!(r.top, 60.0, epsilon = 1.0e-9);
        assert_abs_diff_eq!(r.right, 990.0, epsilon = 1.0e-9);
    }

    #[test]
    fn test_fit_aspect() {
        let r = Rect::new(0.0, 0.0, 200.0, 100.0).fit_aspect(1.0);
        assert_eq!(r, Rect::new(50.0, 0.0, 150.0, 100.0));
    }

    #[test]
    fn test_clip_polyline() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let line = vec![(-5.0, 5.0), (5.0, 5.0), (15.0, 5.0), (15.0, 8.0), (5.0, 8.0)];
        let pieces = clip_polyline(&line, &rect);

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], vec![(0.0, 5.0), (5.0, 5.0), (10.0, 5.0)]);
        assert_eq!(pieces[1], vec![(10.0, 8.0), (5.0, 8.0)]);

        assert!(clip_polyline(&[(20.0, 20.0), (30.0, 30.0)], &rect).is_empty());
    }

    #[test]
    fn test_clip_polygon() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let square = vec![(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)];
        let clipped = clip_polygon(&square, &rect);

        let (xmin, xmax) = clipped
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
        assert_eq!(clipped.len(), 4);
        assert_abs_diff_eq!(xmin, 5.0);
        assert_abs_diff_eq!(xmax, 10.0);

        let outside = vec![(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)];
        assert!(clip_polygon(&outside, &rect).is_empty());
    }

    #[test]
    fn test_dash_pieces() {
        let style = LineStyle {
            color: BLACK.to_rgba(),
            width: 1.0,
            dash: Dash::Dashed,
        };
        let pieces = dash_pieces(&[(0.0, 0.0), (10.6, 0.0)], &style);
        assert_eq!(pieces.len(), 2);
        assert_abs_diff_eq!(pieces[0][1].0, 3.7, epsilon = 1.0e-9);
        assert_abs_diff_eq!(pieces[1][0].0, 5.3, epsilon = 1.0e-9);
    }

    #[test]
    fn test_svg_output() {
        let mut fig = Figure::new(200, 100, "sans-serif");
        fig.polyline(
            z_order::LINES,
            None,
            vec![(10.0, 10.0), (190.0, 90.0)],
            LineStyle::new(&RED, 1.5),
        );
        fig.marker(
            z_order::MARKERS,
            None,
            (100.0, 50.0),
            MarkerKind::Star,
            14.0,
            BLUE.to_rgba(),
        );
        fig.text(z_order::FRAME, (100.0, 5.0), "龙卷发生地", TextSpec::new(12.0));

        let svg = fig.to_svg_string().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("龙卷发生地"));
        assert!(svg.contains("<polyline") || svg.contains("<path"));
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figures").join("test.svg");

        let fig = Figure::new(50, 50, "sans-serif");
        fig.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(15.0), "15");
        assert_eq!(format_tick(-40.0), "-40");
        assert_eq!(format_tick(0.25), "0.25");
    }
}
