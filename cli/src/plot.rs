//! Line charts of a variable over time.

use std::path::Path;

use color_eyre::eyre::{bail, eyre, Result};
use plotters::prelude::*;
use simlog_toolbox_core::{common::range::Range, CoordValue, Dataset, Reduction};

/// One line of a chart: a label and its `(time, value)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// The seed mean of `variable` over time, one line per value of `series`.
///
/// Every other coordinate must have been fixed beforehand. Missing cells
/// leave gaps out of the line.
pub fn series_lines(
    dataset: &Dataset,
    variable: &str,
    series: &str,
    time_column: &str,
    seeds: &[String],
) -> Result<Vec<Line>> {
    let seeds: Vec<&str> = seeds
        .iter()
        .map(String::as_str)
        .filter(|name| *name != series && dataset.axis(name).is_some())
        .collect();
    let mean = dataset.reduce(&seeds, Reduction::Mean)?;

    let series_axis = mean
        .axis(series)
        .ok_or_else(|| eyre!("No coordinate named {series}"))?;
    let time_axis = mean
        .axis(time_column)
        .ok_or_else(|| eyre!("No time axis named {time_column}"))?;
    if mean.coords().len() != 2 {
        let free: Vec<&str> = mean
            .coords()
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| *name != series && *name != time_column)
            .collect();
        bail!("Coordinates {free:?} need a fixed value, pass them with --select");
    }
    let values = mean
        .variable(variable)
        .ok_or_else(|| eyre!("No variable named {variable}"))?;

    let times: Vec<f64> = mean.coords()[time_axis]
        .values
        .iter()
        .map(|t| t.as_f64().unwrap_or(f64::NAN))
        .collect();

    let lines = mean.coords()[series_axis]
        .values
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let points = times
                .iter()
                .enumerate()
                .filter_map(|(j, &t)| {
                    let mut index = [0; 2];
                    index[series_axis] = i;
                    index[time_axis] = j;
                    let value = values.get(&index)?;
                    (t.is_finite() && value.is_finite()).then_some((t, value))
                })
                .collect();
            Line {
                label: format!("{series} = {label}"),
                points,
            }
        })
        .collect();
    Ok(lines)
}

pub fn render(lines: &[Line], title: &str, y_label: &str, out: &Path) -> Result<()> {
    let points = || lines.iter().flat_map(|l| l.points.iter());
    let (Some(x), Some(y)) = (
        Range::from_iter_val(points().map(|p| p.0)),
        Range::from_iter_val(points().map(|p| p.1)),
    ) else {
        bail!("Nothing to plot, every value is missing");
    };
    let x = padded(x);
    let y = padded(y);

    let root = BitMapBackend::new(out, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x.min..x.max, y.min..y.max)?;

    chart
        .configure_mesh()
        .x_desc("time")
        .y_desc(y_label)
        .draw()?;

    for (i, line) in lines.iter().enumerate() {
        let color = Palette99::pick(i);
        chart
            .draw_series(LineSeries::new(line.points.iter().copied(), &color))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

fn padded(range: Range<f64>) -> Range<f64> {
    if range.width() > 0.0 {
        range
    } else {
        Range::new(range.min - 1.0, range.max + 1.0)
    }
}

/// Parses `NAME=VALUE` into a coordinate selection.
pub fn parse_selection(s: &str) -> Result<(String, CoordValue), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), CoordValue::coerce(value.trim())))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}
