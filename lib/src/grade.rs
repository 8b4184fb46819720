use crate::{error::Error, Result};
use polars::prelude::*;

pub const GRADE_MEAN: f64 = 75.0;
pub const GRADE_SCALE: f64 = 12.5;
pub const GRADE_MIN: f64 = 0.0;
pub const GRADE_MAX: f64 = 100.0;

/// Standard deviations below this are treated as zero variance.
const STD_EPSILON: f64 = 1e-12;

/// Converts one raw statistic per team into grades.
///
/// With `inverted` set, lower raw values map to higher grades. A series without
/// variance grades every team at [`GRADE_MEAN`].
pub fn grade_series(values: &[f64], inverted: bool) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(Error::EmptySeries);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std < STD_EPSILON {
        log::debug!("zero variance over {} values", values.len());
        return Ok(vec![GRADE_MEAN; values.len()]);
    }

    let grades = values
        .iter()
        .map(|v| {
            let z = (v - mean) / std;
            let z = if inverted { -z } else { z };
            to_grade(z)
        })
        .collect();
    Ok(grades)
}

fn to_grade(z: f64) -> f64 {
    let grade = (GRADE_MEAN + GRADE_SCALE * z).clamp(GRADE_MIN, GRADE_MAX);
    // ties go to the even digit
    (grade * 10.0).round_ties_even() / 10.0
}

/// Grades `stat_col` of `df` and appends the result as `grade_col`.
///
/// The statistic column must not contain nulls.
pub fn with_grades(
    mut df: DataFrame,
    stat_col: &str,
    grade_col: &str,
    inverted: bool,
) -> Result<DataFrame> {
    let stats = df.column(stat_col)?.cast(&DataType::Float64)?;
    let values: Vec<f64> = stats.f64()?.into_no_null_iter().collect();
    let grades = grade_series(&values, inverted)?;

    df.with_column(Series::new(grade_col, grades))?;
    Ok(df)
}
