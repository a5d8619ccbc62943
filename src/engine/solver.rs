//! # Multi-root solver
//!
//! The numerical heart of the crate: given the residual system of a mode
//! (F: ℝⁿ → ℝⁿ over the write axes), find axis vectors with F = 0 within
//! tolerance and package them as deep-copied geometries.
//!
//! ## Algorithm
//!
//! 1. Seed from the current write-axis vector of the reference geometry.
//! 2. Damped-Newton iteration (Powell-hybrid style): forward-difference
//!    Jacobian, LU solve, backtracking on the Σ|fᵢ| merit.
//! 3. On stall, numerical breakdown, or every `restart_period` iterations
//!    without progress, restart from a uniform-random point inside the
//!    write-axis ranges (shared crate RNG; seed it for reproducibility).
//! 4. On convergence, wrap each rotation write axis into [−π, π) and emit
//!    the candidate; the de-duplication of the solution list keeps only
//!    candidates farther than ε (orthodromic) from the ones already found.
//! 5. Repeat from fresh random seeds (`attempts` times in total) to
//!    surface distinct roots.
//!
//! An empty outcome is normal; [`GonioError::SolveFailed`] is raised by
//! the engine only when every attempt broke down numerically.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::algebra::{angle_restrict_symm, any_nan};
use crate::constants::EPSILON;
use crate::detector::Detector;
use crate::geometry::list::GeometryList;
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::parameter::Transformation;
use crate::rng;
use crate::sample::Sample;
use crate::unit::UnitKind;

use super::{Mode, ResidualFunction, Workspace};

/// Tunable parameters of the multi-root solver.
///
/// The defaults reproduce the historical behavior: residual tolerance ε,
/// a 1000-iteration cap, a random restart every 100 stalled iterations
/// and four independent root searches.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveParams {
    /// Convergence test: Σ|fᵢ| < `epsilon`.
    pub epsilon: f64,
    /// Iteration cap per attempt.
    pub max_iterations: usize,
    /// Restart from a random point after this many iterations without
    /// convergence.
    pub restart_period: usize,
    /// Independent root searches; the first is seeded from the current
    /// axes, the others from random points.
    pub attempts: usize,
}

impl Default for SolveParams {
    fn default() -> Self {
        SolveParams {
            epsilon: EPSILON,
            max_iterations: 1000,
            restart_period: 100,
            attempts: 4,
        }
    }
}

impl SolveParams {
    pub fn builder() -> SolveParamsBuilder {
        SolveParamsBuilder::default()
    }
}

/// Builder with validation for [`SolveParams`].
#[derive(Debug, Clone, Default)]
pub struct SolveParamsBuilder {
    epsilon: Option<f64>,
    max_iterations: Option<usize>,
    restart_period: Option<usize>,
    attempts: Option<usize>,
}

impl SolveParamsBuilder {
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn restart_period(mut self, restart_period: usize) -> Self {
        self.restart_period = Some(restart_period);
        self
    }

    pub fn attempts(mut self, attempts: usize) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn build(self) -> Result<SolveParams, GonioError> {
        let params = SolveParams {
            epsilon: self.epsilon.unwrap_or(EPSILON),
            max_iterations: self.max_iterations.unwrap_or(1000),
            restart_period: self.restart_period.unwrap_or(100),
            attempts: self.attempts.unwrap_or(4),
        };
        if !(params.epsilon > 0.0) {
            return Err(GonioError::bad_input("epsilon", "must be positive"));
        }
        if params.max_iterations == 0 || params.restart_period == 0 || params.attempts == 0 {
            return Err(GonioError::bad_input(
                "solve params",
                "iteration counts must be at least 1",
            ));
        }
        Ok(params)
    }
}

/// What one residual branch produced.
pub(crate) struct SolveOutcome {
    /// Candidates inserted into the list by this branch.
    pub added: usize,
    /// A NaN/∞ residual or a singular Jacobian was met and no recovery
    /// converged.
    pub breakdown: bool,
}

/// Merit function of the damped iteration, the residual 1-norm.
fn merit(f: &DVector<f64>) -> f64 {
    f.iter().map(|v| v.abs()).sum()
}

/// Solve one residual branch of `mode` and push the converged axis
/// configurations into `list`.
pub(crate) fn solve_function(
    function: &ResidualFunction,
    mode: &Mode,
    targets: &[f64],
    reference: &Geometry,
    detector: &Detector,
    sample: &Sample,
    params: &SolveParams,
    list: &mut GeometryList,
) -> Result<SolveOutcome, GonioError> {
    let axes_w: Vec<usize> = mode
        .axes_write()
        .iter()
        .map(|name| reference.axis_index(name))
        .collect::<Result<_, _>>()?;
    if function.size != axes_w.len() {
        return Err(GonioError::bad_input(
            mode.name(),
            format!(
                "the residual system has {} rows for {} write axes",
                function.size,
                axes_w.len()
            ),
        ));
    }
    let n = axes_w.len();

    // random restarts draw inside the write-axis ranges; unbounded axes
    // fall back to one turn around zero
    let ranges: Vec<(f64, f64)> = axes_w
        .iter()
        .map(|&idx| {
            let (min, max) = reference.axes()[idx].min_max(UnitKind::Default);
            if min.is_finite() && max.is_finite() {
                (min, max)
            } else {
                (-std::f64::consts::PI, std::f64::consts::PI)
            }
        })
        .collect();
    let seed: Vec<f64> = axes_w
        .iter()
        .map(|&idx| reference.axes()[idx].value(UnitKind::Default))
        .collect();

    let mut working = reference.clone();
    let mut added = 0;
    let mut breakdown = false;

    for attempt in 0..params.attempts {
        let converged = {
            let mut ws = Workspace {
                geometry: &mut working,
                detector,
                sample,
                targets,
                parameters: mode.parameters(),
                axes_w: &axes_w,
                data: &mode.data,
            };

            let mut x: DVector<f64> = if attempt == 0 {
                DVector::from_vec(seed.clone())
            } else {
                DVector::from_fn(n, |i, _| rng::uniform(ranges[i].0, ranges[i].1))
            };

            // draw fresh points until the residual evaluates cleanly
            let reseed = |ws: &mut Workspace, x: &mut DVector<f64>| -> Option<DVector<f64>> {
                for _ in 0..8 {
                    *x = DVector::from_fn(n, |i, _| rng::uniform(ranges[i].0, ranges[i].1));
                    if let Ok(f) = (function.f)(x.as_slice(), ws) {
                        if !any_nan(f.as_slice()) && merit(&f).is_finite() {
                            return Some(f);
                        }
                    }
                }
                None
            };

            let mut solution = None;
            let mut since_restart = 0usize;
            let mut fx = match (function.f)(x.as_slice(), &mut ws) {
                Ok(f) if !any_nan(f.as_slice()) && merit(&f).is_finite() => f,
                _ => {
                    breakdown = true;
                    match reseed(&mut ws, &mut x) {
                        Some(f) => f,
                        None => continue,
                    }
                }
            };

            for iteration in 0..params.max_iterations {
                if merit(&fx) < params.epsilon {
                    solution = Some(x.clone());
                    trace!(
                        mode = mode.name(),
                        attempt,
                        iteration,
                        "residual system converged"
                    );
                    break;
                }

                since_restart += 1;
                let mut restart = since_restart >= params.restart_period;

                if !restart {
                    // forward-difference Jacobian
                    let mut jacobian = DMatrix::zeros(n, n);
                    let mut broken = false;
                    for j in 0..n {
                        let h = f64::EPSILON.sqrt() * x[j].abs().max(1.0);
                        let mut xh = x.clone();
                        xh[j] += h;
                        match (function.f)(xh.as_slice(), &mut ws) {
                            Ok(fh) if !any_nan(fh.as_slice()) => {
                                jacobian.set_column(j, &((fh - &fx) / h));
                            }
                            _ => {
                                broken = true;
                                break;
                            }
                        }
                    }

                    let step = if broken {
                        None
                    } else {
                        jacobian.lu().solve(&(-&fx))
                    };

                    match step {
                        Some(dx) if !any_nan(dx.as_slice()) => {
                            // backtracking on the residual 1-norm
                            let mut accepted = false;
                            let mut alpha = 1.0;
                            for _ in 0..8 {
                                let x_next = &x + &dx * alpha;
                                if let Ok(f_next) = (function.f)(x_next.as_slice(), &mut ws) {
                                    if !any_nan(f_next.as_slice())
                                        && merit(&f_next) < merit(&fx)
                                    {
                                        x = x_next;
                                        fx = f_next;
                                        accepted = true;
                                        break;
                                    }
                                }
                                alpha *= 0.5;
                            }
                            restart = !accepted;
                        }
                        _ => {
                            breakdown = true;
                            restart = true;
                        }
                    }
                }

                if restart {
                    since_restart = 0;
                    match reseed(&mut ws, &mut x) {
                        Some(f) => fx = f,
                        None => {
                            breakdown = true;
                            break;
                        }
                    }
                }
            }

            if let Some(x) = &solution {
                // leave the workspace on the converged point
                let _ = (function.f)(x.as_slice(), &mut ws);
            }
            solution
        };

        if let Some(x) = converged {
            // wrap rotation write axes into [-π, π) before emitting
            for (k, &idx) in axes_w.iter().enumerate() {
                let value = match working.axes()[idx].transformation() {
                    Transformation::Rotation { .. } => angle_restrict_symm(x[k]),
                    _ => x[k],
                };
                working.axis_value_set_raw(idx, value);
            }
            working.update();
            list.add(&working);
            added += 1;
        }
    }

    debug!(
        mode = mode.name(),
        candidates = added,
        breakdown,
        "solve branch finished"
    );
    Ok(SolveOutcome {
        added,
        breakdown: breakdown && added == 0,
    })
}
