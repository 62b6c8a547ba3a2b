use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    #[default]
    None,
    Triangular,
    BetaPert,
    Uniform,
}

/// Three-point duration (or cost) estimate.
///
/// `kind == None` means the deterministic value is used and the three
/// points are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DurationDistribution {
    #[serde(rename = "type")]
    pub kind: DistributionKind,
    pub min: f64,
    pub most_likely: f64,
    pub max: f64,
}

impl DurationDistribution {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn triangular(min: f64, most_likely: f64, max: f64) -> Self {
        Self {
            kind: DistributionKind::Triangular,
            min,
            most_likely,
            max,
        }
    }

    pub fn beta_pert(min: f64, most_likely: f64, max: f64) -> Self {
        Self {
            kind: DistributionKind::BetaPert,
            min,
            most_likely,
            max,
        }
    }

    pub fn uniform(min: f64, max: f64) -> Self {
        Self {
            kind: DistributionKind::Uniform,
            min,
            most_likely: (min + max) / 2.0,
            max,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == DistributionKind::None
    }

    /// Repairs user-entered bounds: swaps inverted min/max, pulls the mode
    /// into range and replaces non-finite values with zero.
    pub fn normalized(&self) -> Self {
        let finite = |value: f64| if value.is_finite() { value } else { 0.0 };
        let (mut min, mut max) = (finite(self.min), finite(self.max));
        if max < min {
            std::mem::swap(&mut min, &mut max);
        }
        Self {
            kind: self.kind,
            min,
            most_likely: finite(self.most_likely).clamp(min, max),
            max,
        }
    }
}
