//! Efficiency models and their evaluation at an operating point.
//!
//! Three model shapes are supported:
//!
//! - [`EfficiencyModel::Fixed`]: a constant.
//! - [`EfficiencyModel::Curve1D`]: piecewise-linear in output current.
//! - [`EfficiencyModel::Curve2D`]: a table over (output voltage, output
//!   current), interpolated along current within each voltage row and then
//!   across rows at the converter's output voltage.
//!
//! Curves never extrapolate: outside the tabulated range the boundary value
//! is held. Per-phase curves are indexed by the current of one phase
//! (`I_out / phase_count`).
//!
//! ```
//! use pdn_core::efficiency::{resolve_efficiency, CurvePoint, EfficiencyModel, OperatingPoint};
//!
//! let model = EfficiencyModel::Curve1D {
//!     points: vec![CurvePoint::new(0.5, 0.80), CurvePoint::new(2.0, 0.92)],
//!     per_phase: false,
//! };
//! let eta = resolve_efficiency(&model, &OperatingPoint::new(5.0, 1.25, 5.0));
//! assert!((eta - 0.86).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EfficiencyError;

/// Efficiency used when a model cannot be evaluated.
pub const DEFAULT_EFFICIENCY: f64 = 0.9;

/// The point at which a converter (or one converter output) operates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// Output power (W)
    pub p_out: f64,
    /// Total output current (A) across all phases
    pub i_out: f64,
    /// Output voltage (V)
    pub v_out: f64,
    /// Number of interleaved phases sharing `i_out`
    pub phase_count: u32,
}

impl OperatingPoint {
    pub fn new(p_out: f64, i_out: f64, v_out: f64) -> Self {
        Self {
            p_out,
            i_out,
            v_out,
            phase_count: 1,
        }
    }

    pub fn with_phases(mut self, phase_count: u32) -> Self {
        self.phase_count = phase_count;
        self
    }

    /// Current on the axis the curve models are indexed by
    fn axis_current(&self, per_phase: bool) -> f64 {
        if per_phase && self.phase_count > 1 {
            self.i_out / self.phase_count as f64
        } else {
            self.i_out
        }
    }
}

/// One (current, efficiency) sample of a 1-D curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub current: f64,
    pub eta: f64,
}

impl CurvePoint {
    pub fn new(current: f64, eta: f64) -> Self {
        Self { current, eta }
    }
}

/// Efficiency table indexed by output voltage (rows) and output current
/// (columns). Missing measurements are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyTable {
    pub output_voltages: Vec<f64>,
    pub output_currents: Vec<f64>,
    /// `values[voltage_index][current_index]`
    pub values: Vec<Vec<Option<f64>>>,
}

/// How a converter's efficiency depends on its operating point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EfficiencyModel {
    Fixed {
        value: f64,
        /// Only changes the current axis of curve models; a fixed value is
        /// the same for every phase.
        #[serde(default)]
        per_phase: bool,
    },
    Curve1D {
        #[serde(default)]
        points: Vec<CurvePoint>,
        #[serde(default)]
        per_phase: bool,
    },
    Curve2D {
        #[serde(default)]
        table: Option<EfficiencyTable>,
        #[serde(default)]
        per_phase: bool,
    },
}

impl Default for EfficiencyModel {
    fn default() -> Self {
        EfficiencyModel::Fixed {
            value: DEFAULT_EFFICIENCY,
            per_phase: false,
        }
    }
}

impl EfficiencyModel {
    /// Fixed efficiency shorthand
    pub fn fixed(value: f64) -> Self {
        EfficiencyModel::Fixed {
            value,
            per_phase: false,
        }
    }

    /// Evaluate the model, clamped to `[0, 1]`.
    pub fn evaluate(&self, op: &OperatingPoint) -> Result<f64, EfficiencyError> {
        let eta = match self {
            EfficiencyModel::Fixed { value, .. } => *value,
            EfficiencyModel::Curve1D { points, per_phase } => {
                let mut samples: Vec<(f64, f64)> = points
                    .iter()
                    .filter(|p| p.current.is_finite() && p.eta.is_finite())
                    .map(|p| (p.current, p.eta))
                    .collect();
                if samples.is_empty() {
                    return Err(EfficiencyError::EmptyCurve);
                }
                samples.sort_by(|a, b| a.0.total_cmp(&b.0));
                interpolate_clamped(&samples, op.axis_current(*per_phase))
            }
            EfficiencyModel::Curve2D { table, per_phase } => table
                .as_ref()
                .ok_or(EfficiencyError::MissingTable)?
                .evaluate(op.axis_current(*per_phase), op.v_out)?,
        };

        if !eta.is_finite() {
            return Err(EfficiencyError::NonFinite);
        }
        Ok(eta.clamp(0.0, 1.0))
    }
}

impl EfficiencyTable {
    /// Interpolate along current within every voltage row, then across the
    /// surviving rows at `voltage`.
    ///
    /// A row is skipped when a cell it needs (the bracketing columns, or the
    /// boundary column when clamped) is undefined.
    pub fn evaluate(&self, current: f64, voltage: f64) -> Result<f64, EfficiencyError> {
        if self.output_voltages.is_empty() {
            return Err(EfficiencyError::EmptyAxis("voltage"));
        }

        let mut columns: Vec<(f64, usize)> = self
            .output_currents
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_finite())
            .map(|(j, c)| (*c, j))
            .collect();
        if columns.is_empty() {
            return Err(EfficiencyError::EmptyAxis("current"));
        }
        columns.sort_by(|a, b| a.0.total_cmp(&b.0));
        let bracket = Bracket::locate(&columns, current);

        let mut rows: Vec<(f64, f64)> = Vec::with_capacity(self.output_voltages.len());
        for (i, &v) in self.output_voltages.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            let cell = |j: usize| -> Option<f64> {
                self.values
                    .get(i)
                    .and_then(|row| row.get(j))
                    .copied()
                    .flatten()
                    .filter(|x| x.is_finite())
            };
            let eta = match bracket {
                Bracket::At(j) => cell(j),
                Bracket::Between { lo, hi, t } => match (cell(lo), cell(hi)) {
                    (Some(a), Some(b)) => Some(a + t * (b - a)),
                    _ => None,
                },
            };
            if let Some(eta) = eta {
                rows.push((v, eta));
            }
        }

        if rows.is_empty() {
            return Err(EfficiencyError::NoDefinedValues);
        }
        // A single row (degenerate table) is held for every voltage.
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(interpolate_clamped(&rows, voltage))
    }
}

/// Resolve a model to a number, falling back to [`DEFAULT_EFFICIENCY`].
///
/// This is the editor preview entry point: it never fails.
pub fn resolve_efficiency(model: &EfficiencyModel, op: &OperatingPoint) -> f64 {
    resolve_or(model, op, DEFAULT_EFFICIENCY).eta
}

/// Outcome of resolving a model with a fallback value
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub eta: f64,
    /// Why the fallback was used, if it was
    pub fallback: Option<EfficiencyError>,
}

/// Resolve a model against the configured default efficiency.
///
/// Besides malformed models, a model that resolves to zero while the output
/// carries power falls back too, since no input power could supply it.
pub fn resolve_efficiency_with(
    model: &EfficiencyModel,
    op: &OperatingPoint,
    config: &EngineConfig,
) -> Resolution {
    resolve_or(model, op, config.fallback_efficiency())
}

pub(crate) fn resolve_or(model: &EfficiencyModel, op: &OperatingPoint, default: f64) -> Resolution {
    match model.evaluate(op) {
        Ok(eta) if eta <= 0.0 && op.p_out > 0.0 => Resolution {
            eta: default,
            fallback: Some(EfficiencyError::NonPositive(eta)),
        },
        Ok(eta) => Resolution {
            eta,
            fallback: None,
        },
        Err(err) => Resolution {
            eta: default,
            fallback: Some(err),
        },
    }
}

/// Position of a query value on a sorted axis
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bracket {
    /// Exactly on (or clamped to) the column at this position in `output_currents`
    At(usize),
    /// Strictly between two columns, `t` in (0, 1)
    Between { lo: usize, hi: usize, t: f64 },
}

impl Bracket {
    fn locate(axis: &[(f64, usize)], x: f64) -> Self {
        let first = axis[0];
        let last = axis[axis.len() - 1];
        if !(x > first.0) {
            return Bracket::At(first.1);
        }
        if x >= last.0 {
            return Bracket::At(last.1);
        }
        for pair in axis.windows(2) {
            let (x0, j0) = pair[0];
            let (x1, j1) = pair[1];
            if x == x1 {
                return Bracket::At(j1);
            }
            if x > x0 && x < x1 {
                return Bracket::Between {
                    lo: j0,
                    hi: j1,
                    t: (x - x0) / (x1 - x0),
                };
            }
        }
        Bracket::At(last.1)
    }
}

/// Piecewise-linear interpolation over points sorted by x, holding the
/// boundary values outside the range. Tabulated x values map exactly to
/// their y.
fn interpolate_clamped(points: &[(f64, f64)], x: f64) -> f64 {
    let first = points[0];
    let last = points[points.len() - 1];
    if !(x > first.0) {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x == x1 {
            return y1;
        }
        if x > x0 && x < x1 {
            let t = (x - x0) / (x1 - x0);
            return y0 + t * (y1 - y0);
        }
    }
    last.1
}
