//! Wind barbs.
//!
//! Speeds are rounded to the nearest half barb increment and split into flags, full barbs and a
//! half barb. A calm wind draws nothing.

/// Speeds represented by each feature of a barb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarbIncrements {
    /// Speed of a half barb.
    pub half: f64,
    /// Speed of a full barb.
    pub full: f64,
    /// Speed of a flag.
    pub flag: f64,
}

impl Default for BarbIncrements {
    fn default() -> Self {
        BarbIncrements {
            half: 2.0,
            full: 4.0,
            flag: 20.0,
        }
    }
}

/// The features making up one barb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BarbParts {
    /// Number of flags.
    pub flags: usize,
    /// Number of full barbs.
    pub full: usize,
    /// Whether there is a half barb.
    pub half: bool,
}

impl BarbParts {
    /// `true` for a calm wind.
    pub fn is_empty(&self) -> bool {
        self.flags == 0 && self.full == 0 && !self.half
    }
}

/// Split a speed into barb features.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::render::{decompose_barb, BarbIncrements};
///
/// let inc = BarbIncrements::default();
///
/// let parts = decompose_barb(27.0, inc);
/// assert_eq!((parts.flags, parts.full, parts.half), (1, 2, false));
///
/// assert!(decompose_barb(1.0, inc).is_empty());
/// ```
pub fn decompose_barb(speed: f64, inc: BarbIncrements) -> BarbParts {
    if !speed.is_finite() || !(inc.half > 0.0) {
        return BarbParts::default();
    }

    let mut remaining = inc.half * round_half_even(speed.abs() / inc.half);

    let flags = (remaining / inc.flag + 1.0e-9).floor();
    remaining -= flags * inc.flag;
    let full = (remaining / inc.full + 1.0e-9).floor();
    remaining -= full * inc.full;
    let half = remaining >= inc.half - 1.0e-9;

    BarbParts {
        flags: flags as usize,
        full: full as usize,
        half,
    }
}

fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

/// Lines and filled triangles of a barb on the page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarbShape {
    /// The shaft, full barbs and half barbs.
    pub lines: Vec<Vec<(f64, f64)>>,
    /// Flags.
    pub flags: Vec<Vec<(f64, f64)>>,
}

// Sizes relative to the shaft length.
const SPACING: f64 = 0.125;
const HEIGHT: f64 = 0.4;
const WIDTH: f64 = 0.25;

/// Page geometry of a barb at `origin`.
///
/// `toward` is the direction the wind blows toward on the page, y pointing down. The shaft points
/// the other way, into the wind, with the features at its far end on the clockwise side as on
/// northern hemisphere charts.
pub fn barb_shape(origin: (f64, f64), toward: (f64, f64), parts: BarbParts, length: f64) -> BarbShape {
    let norm = toward.0.hypot(toward.1);
    if parts.is_empty() || !(norm > 0.0) || !(length > 0.0) {
        return BarbShape::default();
    }

    // Unit vector along the shaft from the origin to the tip.
    let d = (-toward.0 / norm, -toward.1 / norm);
    // Side the features are drawn on.
    let side = (-d.1, d.0);

    let at = |along: f64, across: f64| {
        (
            origin.0 + length * (along * d.0 + across * side.0),
            origin.1 + length * (along * d.1 + across * side.1),
        )
    };

    let mut shape = BarbShape {
        lines: vec![vec![at(0.0, 0.0), at(1.0, 0.0)]],
        flags: vec![],
    };

    let mut pos = 1.0;
    for _ in 0..parts.flags {
        shape
            .flags
            .push(vec![at(pos, 0.0), at(pos - WIDTH / 2.0, HEIGHT), at(pos - WIDTH, 0.0)]);
        pos -= WIDTH + SPACING;
    }

    for _ in 0..parts.full {
        shape
            .lines
            .push(vec![at(pos, 0.0), at(pos + WIDTH / 2.0, HEIGHT)]);
        pos -= SPACING;
    }

    if parts.half {
        // A lone half barb is set in from the tip to tell it from a full barb.
        if parts.flags == 0 && parts.full == 0 {
            pos -= 1.5 * SPACING;
        }
        shape
            .lines
            .push(vec![at(pos, 0.0), at(pos + WIDTH / 4.0, HEIGHT / 2.0)]);
    }

    shape
}
