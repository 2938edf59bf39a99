//! Color maps and named colors.
use plotters::style::{Color, RGBAColor, RGBColor};

/// Named colors used by the figures.
#[allow(missing_docs)]
pub mod named {
    use plotters::style::RGBColor;

    pub const BLACK: RGBColor = RGBColor(0, 0, 0);
    pub const WHITE: RGBColor = RGBColor(255, 255, 255);
    pub const GRAY: RGBColor = RGBColor(128, 128, 128);
    pub const RED: RGBColor = RGBColor(255, 0, 0);
    pub const GREEN: RGBColor = RGBColor(0, 128, 0);
    pub const BLUE: RGBColor = RGBColor(0, 0, 255);
    pub const NAVY: RGBColor = RGBColor(0, 0, 128);
    pub const GOLD: RGBColor = RGBColor(255, 215, 0);
    pub const YELLOW: RGBColor = RGBColor(255, 255, 0);
    pub const ORANGE_RED: RGBColor = RGBColor(255, 69, 0);
    pub const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
    /// Fill for land polygons.
    pub const LAND: RGBColor = RGBColor(240, 240, 220);
}

/// Colors for contour bands, with optional colors below the lowest and above the highest level.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteColormap {
    levels: Vec<f64>,
    colors: Vec<RGBAColor>,
    under: Option<RGBAColor>,
    over: Option<RGBAColor>,
}

impl DiscreteColormap {
    /// A map with one color per interval between consecutive levels.
    ///
    /// Returns `None` unless there is exactly one more level than colors.
    pub fn new(levels: Vec<f64>, colors: Vec<RGBAColor>) -> Option<Self> {
        if levels.len() < 2 || levels.len() != colors.len() + 1 {
            return None;
        }

        Some(DiscreteColormap {
            levels,
            colors,
            under: None,
            over: None,
        })
    }

    /// Builder method to color values below the lowest level.
    pub fn with_under(mut self, color: RGBAColor) -> Self {
        self.under = Some(color);
        self
    }

    /// Builder method to color values above the highest level.
    pub fn with_over(mut self, color: RGBAColor) -> Self {
        self.over = Some(color);
        self
    }

    /// Drop the under and over colors.
    pub fn without_extensions(mut self) -> Self {
        self.under = None;
        self.over = None;
        self
    }

    /// The level boundaries.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// The band colors.
    pub fn colors(&self) -> &[RGBAColor] {
        &self.colors
    }

    /// Color below the lowest level, if those values are filled.
    pub fn under(&self) -> Option<RGBAColor> {
        self.under
    }

    /// Color above the highest level, if those values are filled.
    pub fn over(&self) -> Option<RGBAColor> {
        self.over
    }

    /// All bands to fill as `(lower, upper, color)`, the extensions use infinite bounds.
    pub fn bands(&self) -> Vec<(f64, f64, RGBAColor)> {
        let mut bands = Vec::with_capacity(self.colors.len() + 2);
        if let Some(under) = self.under {
            bands.push((std::f64::NEG_INFINITY, self.levels[0], under));
        }
        for (pair, &color) in self.levels.windows(2).zip(&self.colors) {
            bands.push((pair[0], pair[1], color));
        }
        if let Some(over) = self.over {
            bands.push((self.levels[self.levels.len() - 1], std::f64::INFINITY, over));
        }
        bands
    }

    /// Color of a single value, `None` if it is not filled.
    pub fn color_of(&self, value: f64) -> Option<RGBAColor> {
        if !value.is_finite() {
            return None;
        }

        let last = self.levels.len() - 1;
        if value < self.levels[0] {
            return self.under;
        }
        if value > self.levels[last] {
            return self.over;
        }

        let idx = self
            .levels
            .windows(2)
            .position(|pair| value < pair[1])
            .unwrap_or(last - 1);
        Some(self.colors[idx])
    }
}

/// The radar reflectivity colors, 0 to 65 dBZ in 5 dBZ steps.
pub fn radar() -> DiscreteColormap {
    const COLORS: [(u8, u8, u8); 13] = [
        (0x04, 0xe9, 0xe7),
        (0x01, 0x9f, 0xf4),
        (0x03, 0x00, 0xf4),
        (0x02, 0xfd, 0x02),
        (0x01, 0xc5, 0x01),
        (0x00, 0x8e, 0x00),
        (0xfd, 0xf8, 0x02),
        (0xe5, 0xbc, 0x00),
        (0xfd, 0x95, 0x00),
        (0xfd, 0x00, 0x00),
        (0xd4, 0x00, 0x00),
        (0xbc, 0x00, 0x00),
        (0xf8, 0x00, 0xfd),
    ];

    DiscreteColormap {
        levels: radar_levels(),
        colors: COLORS
            .iter()
            .map(|&(r, g, b)| RGBColor(r, g, b).to_rgba())
            .collect(),
        under: Some(RGBColor(0xff, 0xff, 0xff).to_rgba()),
        over: Some(RGBColor(0x98, 0x54, 0xc6).to_rgba()),
    }
}

/// Levels of the radar color map.
pub fn radar_levels() -> Vec<f64> {
    (0..=13).map(|i| f64::from(i) * 5.0).collect()
}

/// Continuous color maps sampled into bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuousMap {
    /// Yellow, orange, brown.
    YlOrBr,
    /// White to dark green.
    Greens,
    /// Pink to yellow-green, diverging.
    PiYG,
    /// Perceptually uniform purple to yellow.
    Viridis,
}

impl ContinuousMap {
    fn anchors(self) -> &'static [(u8, u8, u8)] {
        match self {
            ContinuousMap::YlOrBr => &[
                (0xff, 0xff, 0xe5),
                (0xff, 0xf7, 0xbc),
                (0xfe, 0xe3, 0x91),
                (0xfe, 0xc4, 0x4f),
                (0xfe, 0x99, 0x29),
                (0xec, 0x70, 0x14),
                (0xcc, 0x4c, 0x02),
                (0x99, 0x34, 0x04),
                (0x66, 0x25, 0x06),
            ],
            ContinuousMap::Greens => &[
                (0xf7, 0xfc, 0xf5),
                (0xe5, 0xf5, 0xe0),
                (0xc7, 0xe9, 0xc0),
                (0xa1, 0xd9, 0x9b),
                (0x74, 0xc4, 0x76),
                (0x41, 0xab, 0x5d),
                (0x23, 0x8b, 0x45),
                (0x00, 0x6d, 0x2c),
                (0x00, 0x44, 0x1b),
            ],
            ContinuousMap::PiYG => &[
                (0x8e, 0x01, 0x52),
                (0xc5, 0x1b, 0x7d),
                (0xde, 0x77, 0xae),
                (0xf1, 0xb6, 0xda),
                (0xfd, 0xe0, 0xef),
                (0xf7, 0xf7, 0xf7),
                (0xe6, 0xf5, 0xd0),
                (0xb8, 0xe1, 0x86),
                (0x7f, 0xbc, 0x41),
                (0x4d, 0x92, 0x21),
                (0x27, 0x64, 0x19),
            ],
            ContinuousMap::Viridis => &[
                (0x44, 0x01, 0x54),
                (0x47, 0x2d, 0x7b),
                (0x3b, 0x52, 0x8b),
                (0x2c, 0x72, 0x8e),
                (0x21, 0x91, 0x8c),
                (0x28, 0xae, 0x80),
                (0x5e, 0xc9, 0x62),
                (0xad, 0xdc, 0x30),
                (0xfd, 0xe7, 0x25),
            ],
        }
    }

    /// The color at a fraction `t` of the way through the map, clamped to `[0, 1]`.
    pub fn sample(self, t: f64) -> RGBAColor {
        let anchors = self.anchors();
        let t = if t.is_finite() { t.max(0.0).min(1.0) } else { 0.0 };

        let pos = t * (anchors.len() - 1) as f64;
        let lo = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - lo as f64;

        let (r0, g0, b0) = anchors[lo];
        let (r1, g1, b1) = anchors[lo + 1];
        let mix = |a: u8, b: u8| (f64::from(a) + frac * (f64::from(b) - f64::from(a))).round() as u8;

        RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1)).to_rgba()
    }

    /// One color per band between the levels, sampled at the band centers.
    ///
    /// Returns `None` for fewer than two levels.
    pub fn discretize(self, levels: &[f64]) -> Option<DiscreteColormap> {
        let n = levels.len().checked_sub(1).filter(|&n| n > 0)?;
        let colors = (0..n)
            .map(|k| self.sample((k as f64 + 0.5) / n as f64))
            .collect();

        DiscreteColormap::new(levels.to_vec(), colors)
    }

    /// Like `discretize` with the ends of the map used for values outside the levels.
    pub fn discretize_extended(self, levels: &[f64]) -> Option<DiscreteColormap> {
        Some(
            self.discretize(levels)?
                .with_under(self.sample(0.0))
                .with_over(self.sample(1.0)),
        )
    }
}

/// Evenly spaced levels from `start` up to and including `stop`.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::render::arange;
///
/// assert_eq!(arange(6.0, 21.0, 3.0), vec![6.0, 9.0, 12.0, 15.0, 18.0, 21.0]);
/// assert_eq!(arange(960.0, 965.0, 2.5), vec![960.0, 962.5, 965.0]);
/// ```
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || stop < start {
        return vec![];
    }

    let n = ((stop - start) / step + 1.0e-9).floor() as usize;
    (0..=n).map(|k| start + step * k as f64).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_radar() {
        let cmap = radar();
        assert_eq!(cmap.levels().len(), 14);
        assert_eq!(cmap.colors().len(), 13);
        assert_eq!(cmap.color_of(-5.0), Some(RGBColor(255, 255, 255).to_rgba()));
        assert_eq!(cmap.color_of(70.0), Some(RGBColor(0x98, 0x54, 0xc6).to_rgba()));
        assert_eq!(cmap.color_of(0.0), Some(RGBColor(0x04, 0xe9, 0xe7).to_rgba()));
        assert_eq!(cmap.color_of(47.0), Some(RGBColor(0xfd, 0x00, 0x00).to_rgba()));
        assert_eq!(cmap.color_of(65.0), Some(RGBColor(0xf8, 0x00, 0xfd).to_rgba()));
        assert_eq!(cmap.color_of(std::f64::NAN), None);
        assert_eq!(cmap.bands().len(), 15);
    }

    #[test]
    fn test_discretize() {
        let levels = arange(15.0, 30.0, 3.0);
        let cmap = ContinuousMap::YlOrBr.discretize(&levels).unwrap();
        assert_eq!(cmap.colors().len(), 5);
        assert_eq!(cmap.color_of(10.0), None);
        assert_eq!(cmap.bands().len(), 5);

        assert!(ContinuousMap::Greens.discretize(&[1.0]).is_none());
    }

    #[test]
    fn test_sample_ends() {
        assert_eq!(ContinuousMap::Viridis.sample(0.0), RGBColor(0x44, 0x01, 0x54).to_rgba());
        assert_eq!(ContinuousMap::Viridis.sample(1.0), RGBColor(0xfd, 0xe7, 0x25).to_rgba());
        assert_eq!(ContinuousMap::PiYG.sample(0.5), RGBColor(0xf7, 0xf7, 0xf7).to_rgba());
        assert_eq!(ContinuousMap::Greens.sample(7.0), ContinuousMap::Greens.sample(1.0));
    }

    #[test]
    fn test_arange() {
        assert_eq!(arange(0.0, 65.0, 5.0).len(), 14);
        assert_eq!(arange(1000.0, 5100.0, 250.0).last(), Some(&5000.0));
        assert_eq!(arange(-40.0, 40.0, 4.0).len(), 21);
        assert!(arange(1.0, 0.0, 1.0).is_empty());
    }
}
