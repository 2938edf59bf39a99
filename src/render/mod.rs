//! Drawing primitives, contouring, barbs and color maps shared by all figures.
mod barbs;
mod colormap;
mod contour;
mod figure;
mod streamlines;

pub use self::{
    barbs::{barb_shape, decompose_barb, BarbIncrements, BarbParts, BarbShape},
    colormap::{arange, named, radar, radar_levels, ContinuousMap, DiscreteColormap},
    contour::{
        filled_bands, isolines, nice_levels, path_length, split_for_label, tick_marks,
        BandPolygon, GridPoint,
    },
    figure::{
        clip_polygon, clip_polyline, format_tick, points, text_width, z_order, Dash, Figure,
        HAlign, LegendEntry, LegendGlyph, LegendLocation, LineStyle, LinearAxes, MarkerKind,
        Orientation, Primitive, Rect, TextSpec, VAlign, DPI,
    },
    streamlines::{streamlines, Streamline},
};
