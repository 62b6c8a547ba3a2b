use rand::Rng;
use rand_distr::{Beta, Distribution};
use statrs::distribution::{Beta as BetaCdf, ContinuousCDF};

use crate::domain::distribution::{DistributionKind, DurationDistribution};

/// PERT weight of the most-likely value relative to the endpoints.
const PERT_LAMBDA: f64 = 4.0;

pub trait ThreePointSampler {
    /// A standard uniform draw in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Draws from `distribution`; `None` distributions return their
    /// most-likely value. Results are never negative.
    fn sample(&mut self, distribution: &DurationDistribution) -> f64;
}

/// Samples every distribution kind from one seedable generator.
pub struct RngSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ThreePointSampler for RngSampler<R> {
    fn uniform(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    fn sample(&mut self, distribution: &DurationDistribution) -> f64 {
        let distribution = distribution.normalized();
        let value = match distribution.kind {
            DistributionKind::BetaPert => beta_pert_sample(&distribution, &mut self.rng),
            _ => {
                let u = self.uniform();
                quantile(&distribution, u)
            }
        };
        value.max(0.0)
    }
}

/// Maps a uniform draw through the distribution's inverse CDF.
///
/// Used where several quantities must move together from one draw.
pub fn quantile(distribution: &DurationDistribution, u: f64) -> f64 {
    let DurationDistribution {
        kind,
        min,
        most_likely,
        max,
    } = distribution.normalized();
    let u = u.clamp(0.0, 1.0);
    let range = max - min;
    if kind == DistributionKind::None {
        return most_likely.max(0.0);
    }
    if range < f64::EPSILON {
        return min.max(0.0);
    }

    let value = match kind {
        DistributionKind::None => most_likely,
        DistributionKind::Uniform => min + u * range,
        DistributionKind::Triangular => {
            let breakpoint = (most_likely - min) / range;
            if u < breakpoint {
                min + (u * range * (most_likely - min)).sqrt()
            } else {
                max - ((1.0 - u) * range * (max - most_likely)).sqrt()
            }
        }
        DistributionKind::BetaPert => {
            let (alpha, beta) = pert_shape(min, most_likely, max);
            match BetaCdf::new(alpha, beta) {
                Ok(beta_dist) => min + beta_dist.inverse_cdf(u) * range,
                Err(_) => most_likely,
            }
        }
    };
    value.max(0.0)
}

fn pert_shape(min: f64, most_likely: f64, max: f64) -> (f64, f64) {
    let range = max - min;
    let alpha = 1.0 + PERT_LAMBDA * ((most_likely - min) / range);
    let beta = 1.0 + PERT_LAMBDA * ((max - most_likely) / range);
    (alpha, beta)
}

fn beta_pert_sample<R: Rng + ?Sized>(distribution: &DurationDistribution, rng: &mut R) -> f64 {
    let DurationDistribution {
        min,
        most_likely,
        max,
        ..
    } = *distribution;
    let range = max - min;
    if range < f64::EPSILON {
        return min;
    }

    let (alpha, beta) = pert_shape(min, most_likely, max);
    match Beta::new(alpha, beta) {
        Ok(beta_dist) => min + beta_dist.sample(rng) * range,
        Err(_) => most_likely,
    }
}
