// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model-agnostic RANSAC and the 2D line estimator used on wall edges.
//!
//! Implement [`Estimator`] for a model and call [`ransac`]. The loop never
//! panics: without consensus it returns a result with `model == None`.

use crate::types::Point2D;
use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// RANSAC parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RansacOptions {
    pub max_iters: usize,
    /// Inlier residual threshold (pixels for line fits)
    pub thresh: f64,
    /// Minimum consensus size to accept a model
    pub min_inliers: usize,
    /// Target probability of drawing one all-inlier sample
    pub confidence: f64,
    pub seed: u64,
    pub refit_on_inliers: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 500,
            thresh: 2.0,
            min_inliers: 12,
            confidence: 0.99,
            seed: 42,
            refit_on_inliers: true,
        }
    }
}

/// Output of a RANSAC run
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<usize>,
    /// Root-mean-square residual over inliers
    pub inlier_rms: f64,
    pub iters: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            iters: 0,
        }
    }
}

/// Geometric model that RANSAC can hypothesize and score
pub trait Estimator {
    type Datum;
    type Model;

    /// Minimal sample size
    const MIN_SAMPLES: usize;

    /// Fit from a minimal sample; `None` when degenerate
    fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual in the units of [`RansacOptions::thresh`]
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    fn is_degenerate(_data: &[Self::Datum], _sample_indices: &[usize]) -> bool {
        false
    }

    /// Least-squares refit on a consensus set
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

fn rms(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::INFINITY;
    }
    let ss: f64 = vals.iter().map(|&v| v * v).sum();
    (ss / vals.len() as f64).sqrt()
}

/// Adaptive iteration bound from the current inlier ratio
fn calculate_iterations(
    confidence: f64,
    inlier_ratio: f64,
    min_samples: usize,
    iters_so_far: usize,
    max_iters: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iters;
    }
    let denom = (1.0 - inlier_ratio.powi(min_samples as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return max_iters;
    }
    let n_iter = ((1.0 - confidence).ln() / denom).ceil() as usize;
    n_iter.clamp(iters_so_far, max_iters)
}

fn collect_inliers<E: Estimator>(
    data: &[E::Datum],
    model: &E::Model,
    thresh: f64,
    inliers: &mut Vec<usize>,
    residuals: &mut Vec<f64>,
) {
    inliers.clear();
    residuals.clear();
    for (i, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r <= thresh {
            inliers.push(i);
            residuals.push(r);
        }
    }
}

/// Run RANSAC for estimator `E`
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let mut best: RansacResult<E::Model> = RansacResult::default();
    if data.len() < E::MIN_SAMPLES || data.len() < opts.min_inliers {
        return best;
    }

    let all_indices: Vec<usize> = (0..data.len()).collect();
    let mut sample = vec![0usize; E::MIN_SAMPLES];
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut max_iters = opts.max_iters;

    let mut inliers = Vec::with_capacity(data.len());
    let mut residuals = Vec::with_capacity(data.len());

    let mut iters = 0;
    while iters < max_iters {
        iters += 1;
        all_indices
            .as_slice()
            .choose_multiple(&mut rng, E::MIN_SAMPLES)
            .enumerate()
            .for_each(|(k, &idx)| sample[k] = idx);

        if E::is_degenerate(data, &sample) {
            continue;
        }
        let Some(mut model) = E::fit(data, &sample) else {
            continue;
        };

        collect_inliers::<E>(data, &model, opts.thresh, &mut inliers, &mut residuals);
        if inliers.len() < opts.min_inliers {
            continue;
        }

        if opts.refit_on_inliers {
            if let Some(refit) = E::refit(data, &inliers) {
                model = refit;
                collect_inliers::<E>(data, &model, opts.thresh, &mut inliers, &mut residuals);
                if inliers.len() < opts.min_inliers {
                    continue;
                }
            }
        }

        let score = rms(&residuals);
        let better = best.model.is_none()
            || inliers.len() > best.inliers.len()
            || (inliers.len() == best.inliers.len() && score < best.inlier_rms);
        if better {
            best.model = Some(model);
            best.inliers = inliers.clone();
            best.inlier_rms = score;
            best.iters = iters;
        }

        max_iters = calculate_iterations(
            opts.confidence,
            inliers.len() as f64 / data.len() as f64,
            E::MIN_SAMPLES,
            iters,
            opts.max_iters,
        );
    }

    best
}

/// Image line `a x + b y + c = 0` with `a² + b² = 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Line2D {
    /// Line through two points; `None` if they coincide
    pub fn through(p: &Point2D, q: &Point2D) -> Option<Self> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-9 {
            return None;
        }
        let a = -dy / len;
        let b = dx / len;
        Some(Self {
            a,
            b,
            c: -(a * p.x + b * p.y),
        })
    }

    #[inline]
    pub fn distance(&self, p: &Point2D) -> f64 {
        (self.a * p.x + self.b * p.y + self.c).abs()
    }

    /// Homogeneous coefficients, for intersections via cross product
    #[inline]
    pub fn homogeneous(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.a, self.b, self.c)
    }

    /// Closer to horizontal than vertical
    #[inline]
    pub fn is_horizontal_ish(&self) -> bool {
        self.b.abs() > self.a.abs()
    }
}

/// Total-least-squares line estimator over image points
pub struct LineEstimator;

impl Estimator for LineEstimator {
    type Datum = Point2D;
    type Model = Line2D;

    const MIN_SAMPLES: usize = 2;

    fn fit(data: &[Point2D], sample_indices: &[usize]) -> Option<Line2D> {
        Line2D::through(&data[sample_indices[0]], &data[sample_indices[1]])
    }

    fn residual(model: &Line2D, datum: &Point2D) -> f64 {
        model.distance(datum)
    }

    fn is_degenerate(_data: &[Point2D], sample_indices: &[usize]) -> bool {
        sample_indices[0] == sample_indices[1]
    }

    fn refit(data: &[Point2D], inliers: &[usize]) -> Option<Line2D> {
        if inliers.len() < 2 {
            return None;
        }
        let n = inliers.len() as f64;
        let (mx, my) = inliers
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &i| (sx + data[i].x, sy + data[i].y));
        let (mx, my) = (mx / n, my / n);

        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for &i in inliers {
            let dx = data[i].x - mx;
            let dy = data[i].y - my;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        // Principal direction of the 2x2 scatter matrix
        let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        let dir = Point2D::new(mx + theta.cos(), my + theta.sin());
        Line2D::through(&Point2D::new(mx, my), &dir)
    }
}
