use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;

use crate::services::simulation_types::{HistogramBin, PercentileRow};

#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("failed to render histogram: {0}")]
    Render(String),
}

/// Draws the duration histogram with a marker line per percentile.
pub fn write_histogram_png<P: AsRef<Path>>(
    output_path: P,
    bins: &[HistogramBin],
    percentiles: &[PercentileRow],
) -> Result<(), HistogramError> {
    if bins.is_empty() {
        return Ok(());
    }

    let min_value = bins.iter().map(|bin| bin.lower).fold(f64::INFINITY, f64::min);
    let mut max_value = bins.iter().map(|bin| bin.upper).fold(f64::NEG_INFINITY, f64::max);
    if max_value - min_value < f64::EPSILON {
        max_value = min_value + 1.0;
    }
    let max_count = bins.iter().map(|bin| bin.count).max().unwrap_or(1);

    let root = BitMapBackend::new(output_path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let x_range = (min_value - 0.5)..(max_value + 0.5);
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Project Duration Distribution", ("sans-serif", 30))
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range, 0..(max_count + 1))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Project duration in workdays")
        .y_desc("Iterations")
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 22))
        .x_label_formatter(&|value| format!("{value:.0}"))
        .draw()
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let bar_color = RGBColor(30, 122, 204);
    let bar_style = ShapeStyle::from(&bar_color).filled();
    let single_bin = bins.len() == 1;
    chart
        .draw_series(bins.iter().map(|bin| {
            let (lower, upper) = if single_bin {
                (bin.lower - 0.5, bin.upper + 0.5)
            } else {
                (bin.lower, bin.upper)
            };
            Rectangle::new([(lower, 0), (upper, bin.count)], bar_style)
        }))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let marker_color = RGBColor(204, 60, 30);
    chart
        .draw_series(percentiles.iter().map(|row| {
            let x = row.duration_days as f64;
            PathElement::new(vec![(x, 0), (x, max_count + 1)], marker_color.stroke_width(2))
        }))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    root.present()
        .map_err(|e| HistogramError::Render(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    #[test]
    fn empty_histogram_writes_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("empty.png");
        write_histogram_png(&path, &[], &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn renders_png_with_percentile_markers() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("histogram.png");
        let bins = vec![
            HistogramBin {
                lower: 10.0,
                upper: 12.0,
                count: 4,
                cumulative_percent: 40.0,
            },
            HistogramBin {
                lower: 12.0,
                upper: 14.0,
                count: 6,
                cumulative_percent: 100.0,
            },
        ];
        let percentiles = vec![PercentileRow {
            percentile: 50.0,
            duration_days: 12,
            finish_date: on_date(2026, 3, 18),
        }];

        write_histogram_png(&path, &bins, &percentiles).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
