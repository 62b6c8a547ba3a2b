use std::cmp::Ordering;

use crate::services::percentiles::{nearest_rank_index, value_f64_sorted};
use crate::services::simulation_types::{
    ActivityStatistics, CostSummary, HistogramBin, IterationRecord, PercentileRow,
};

/// Percentile rows over iteration records; each row takes duration and
/// finish date from the same record.
pub fn percentile_table(records: &[IterationRecord], percentiles: &[f64]) -> Vec<PercentileRow> {
    let mut sorted: Vec<&IterationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.duration_days
            .cmp(&b.duration_days)
            .then(a.finish.cmp(&b.finish))
            .then(a.index.cmp(&b.index))
    });

    percentiles
        .iter()
        .filter_map(|&percentile| {
            let record = sorted[nearest_rank_index(sorted.len(), percentile)?];
            Some(PercentileRow {
                percentile,
                duration_days: record.duration_days,
                finish_date: record.finish,
            })
        })
        .collect()
}

/// Fixed-width bins over the observed range of project durations.
pub fn histogram(durations: &[i64], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (durations.iter().min(), durations.iter().max()) else {
        return Vec::new();
    };
    let total = durations.len() as f64;
    if min == max || bins <= 1 {
        return vec![HistogramBin {
            lower: min as f64,
            upper: max as f64,
            count: durations.len(),
            cumulative_percent: 100.0,
        }];
    }

    let width = (max - min) as f64 / bins as f64;
    let mut counts = vec![0_usize; bins];
    for &duration in durations {
        let slot = (((duration - min) as f64) / width).floor() as usize;
        counts[slot.min(bins - 1)] += 1;
    }

    let mut cumulative = 0;
    counts
        .into_iter()
        .enumerate()
        .map(|(slot, count)| {
            cumulative += count;
            HistogramBin {
                lower: min as f64 + slot as f64 * width,
                upper: min as f64 + (slot + 1) as f64 * width,
                count,
                cumulative_percent: cumulative as f64 / total * 100.0,
            }
        })
        .collect()
}

/// Mean and sample standard deviation; the deviation is 0 below two values.
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// 1-based ranks with ties sharing the average of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].partial_cmp(&values[*b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation; 0 when either side has no variance.
pub fn spearman(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    pearson(&average_ranks(xs), &average_ranks(ys))
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return 0.0;
    }
    let correlation = covariance / (var_x.sqrt() * var_y.sqrt());
    if correlation.is_finite() {
        correlation.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Criticality and sensitivity per network node, in node order.
pub fn activity_statistics(records: &[IterationRecord], ids: &[String]) -> Vec<ActivityStatistics> {
    let n = records.len();
    let project: Vec<f64> = records.iter().map(|record| record.duration_days as f64).collect();

    ids.iter()
        .enumerate()
        .map(|(node, id)| {
            let critical = records.iter().filter(|record| record.critical[node]).count();
            let sampled: Vec<f64> = records.iter().map(|record| record.durations[node]).collect();
            let (mean_duration, _) = mean_and_std_dev(&sampled);
            ActivityStatistics {
                id: id.clone(),
                criticality_percent: if n == 0 {
                    0.0
                } else {
                    critical as f64 / n as f64 * 100.0
                },
                sensitivity: spearman(&sampled, &project),
                mean_duration,
            }
        })
        .collect()
}

pub fn cost_summary(costs: &[f64]) -> CostSummary {
    let mut sorted = costs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let (mean, _) = mean_and_std_dev(&sorted);
    CostSummary {
        mean,
        p50: value_f64_sorted(&sorted, 50.0),
        p80: value_f64_sorted(&sorted, 80.0),
        p90: value_f64_sorted(&sorted, 90.0),
    }
}
