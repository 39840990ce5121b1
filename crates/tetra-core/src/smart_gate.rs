//! Multi-bar gate patterns with a density contour
//!
//! Each bar gets its own hit count from the contour, then its hits are
//! scattered with a Fisher-Yates shuffle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TetraError;
use crate::rng::Rng;
use crate::scale::normalize;

/// How hit density moves across the bars of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SmartDensity {
    /// Sparse to busy
    #[default]
    Build,
    /// Busy to sparse
    Decay,
    /// Build up, then drop to the minimum on the last bar
    BuildDrop,
    /// Small random wobble around the middle
    Variation,
}

impl SmartDensity {
    pub const ALL: [SmartDensity; 4] = [
        SmartDensity::Build,
        SmartDensity::Decay,
        SmartDensity::BuildDrop,
        SmartDensity::Variation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Decay => "Decay",
            Self::BuildDrop => "Build-Drop",
            Self::Variation => "Variation",
        }
    }
}

impl fmt::Display for SmartDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SmartDensity {
    type Err = TetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|d| normalize(d.name()) == wanted)
            .ok_or_else(|| TetraError::unknown("density", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmartGateParams {
    pub fill_min: f32,
    pub fill_max: f32,
    pub steps_per_bar: usize,
    pub bars: usize,
    pub density: SmartDensity,
    pub seed: u32,
}

/// Half-width of the variation band, as a fraction of the min–max span
const VARIATION_BAND: f64 = 0.2;

/// Hit-count range for one bar from the fill fractions
pub(crate) fn hit_range(fill_min: f32, fill_max: f32, steps: usize) -> (usize, usize) {
    let lo = fill_min.clamp(0.0, 1.0).min(fill_max.clamp(0.0, 1.0));
    let hi = fill_max.clamp(0.0, 1.0).max(fill_min.clamp(0.0, 1.0));
    let min_hits = ((lo as f64 * steps as f64).round() as usize).min(steps);
    let max_hits = ((hi as f64 * steps as f64).round() as usize).min(steps);
    (min_hits, max_hits)
}

/// `hits` true steps shuffled across `steps`
pub(crate) fn scatter_hits(hits: usize, steps: usize, rng: &mut Rng) -> Vec<bool> {
    let mut bar: Vec<bool> = (0..steps).map(|i| i < hits).collect();
    rng.shuffle(&mut bar);
    bar
}

fn lerp_hits(min_hits: usize, max_hits: usize, t: f64) -> usize {
    (min_hits as f64 + (max_hits as f64 - min_hits as f64) * t).round() as usize
}

/// Position of each bar between its minimum (0.0) and maximum (1.0) hit count
fn bar_levels(density: SmartDensity, bars: usize, rng: &mut Rng) -> Vec<f64> {
    let ramp = |bar: usize, span: usize| if span <= 1 { 1.0 } else { bar as f64 / (span - 1) as f64 };

    match density {
        SmartDensity::Build => (0..bars).map(|b| ramp(b, bars)).collect(),
        SmartDensity::Decay => (0..bars).map(|b| 1.0 - ramp(b, bars)).collect(),
        SmartDensity::BuildDrop => {
            let build_bars = bars - 1;
            (0..bars)
                .map(|b| if b == build_bars { 0.0 } else { ramp(b, build_bars) })
                .collect()
        }
        SmartDensity::Variation => (0..bars)
            .map(|_| (0.5 + (rng.next_f64() * 2.0 - 1.0) * VARIATION_BAND).clamp(0.0, 1.0))
            .collect(),
    }
}

/// Bar sizes for a lane of `length` steps split into at most `bars` bars.
///
/// Every bar gets `length / bars` steps and the last one also takes the
/// remainder, so the sizes always sum to `length`.
pub fn bar_sizes(length: usize, bars: usize) -> Vec<usize> {
    let bars = bars.clamp(1, length.max(1));
    if length == 0 {
        return vec![];
    }
    let steps_per_bar = length / bars;
    let mut sizes = vec![steps_per_bar; bars];
    sizes[bars - 1] = length - steps_per_bar * (bars - 1);
    sizes
}

/// Hit count per bar, each within its own bar's fill range
fn bar_targets(fill_min: f32, fill_max: f32, sizes: &[usize], density: SmartDensity, rng: &mut Rng) -> Vec<usize> {
    bar_levels(density, sizes.len(), rng)
        .into_iter()
        .zip(sizes)
        .map(|(level, &size)| {
            let (min_hits, max_hits) = hit_range(fill_min, fill_max, size);
            lerp_hits(min_hits, max_hits, level).clamp(min_hits, max_hits)
        })
        .collect()
}

/// Move per-bar rounding error back inside the lane-wide fill range.
/// Missing hits go to the latest bars with room, extra hits leave the earliest.
fn fit_total(targets: &mut [usize], sizes: &[usize], min_total: usize, max_total: usize) {
    let mut total: usize = targets.iter().sum();
    while total < min_total {
        let Some(bar) = (0..targets.len()).rev().find(|&b| targets[b] < sizes[b]) else {
            break;
        };
        targets[bar] += 1;
        total += 1;
    }
    while total > max_total {
        let Some(bar) = (0..targets.len()).find(|&b| targets[b] > 0) else {
            break;
        };
        targets[bar] -= 1;
        total -= 1;
    }
}

fn shaped_pattern(targets: Vec<usize>, sizes: &[usize], rng: &mut Rng) -> Vec<bool> {
    targets
        .into_iter()
        .zip(sizes)
        .flat_map(|(hits, &size)| scatter_hits(hits, size, rng))
        .collect()
}

/// Gate pattern of `bars × steps_per_bar` steps shaped by `density`.
///
/// With a single bar the density is irrelevant and the hit count is a
/// uniform draw between the fill bounds.
pub fn generate_smart_gate_pattern(params: &SmartGateParams) -> Vec<bool> {
    let steps_per_bar = params.steps_per_bar;
    let bars = params.bars.max(1);
    if steps_per_bar == 0 {
        return vec![];
    }

    let mut rng = Rng::new(params.seed);
    if bars == 1 {
        let (min_hits, max_hits) = hit_range(params.fill_min, params.fill_max, steps_per_bar);
        let hits = rng.range_inclusive(min_hits as i64, max_hits as i64) as usize;
        return scatter_hits(hits, steps_per_bar, &mut rng);
    }

    let sizes = vec![steps_per_bar; bars];
    let targets = bar_targets(params.fill_min, params.fill_max, &sizes, params.density, &mut rng);
    shaped_pattern(targets, &sizes, &mut rng)
}

/// Smart gate pattern for a lane of exactly `length` steps.
///
/// `params.steps_per_bar` is ignored: the lane is split by [`bar_sizes`],
/// and the total hit count stays within the fill range of `length`.
pub fn generate_smart_gate_lane(params: &SmartGateParams, length: usize) -> Vec<bool> {
    let sizes = bar_sizes(length, params.bars);
    if sizes.len() <= 1 {
        return generate_smart_gate_pattern(&SmartGateParams { steps_per_bar: length, bars: 1, ..*params });
    }

    let mut rng = Rng::new(params.seed);
    let mut targets = bar_targets(params.fill_min, params.fill_max, &sizes, params.density, &mut rng);
    let (min_total, max_total) = hit_range(params.fill_min, params.fill_max, length);
    fit_total(&mut targets, &sizes, min_total, max_total);
    shaped_pattern(targets, &sizes, &mut rng)
}
