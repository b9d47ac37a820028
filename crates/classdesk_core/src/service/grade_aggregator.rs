//! Weighted grade average with exemption handling.
//!
//! # Contract
//! - Exempted records are ignored.
//! - Each remaining record contributes `value / maxValue * 100` weighted by
//!   its weight (default `1`).
//! - Records with `maxValue <= 0`, a non-positive weight, or non-finite
//!   numbers are skipped rather than poisoning the result.
//! - When nothing contributes the average is undefined: `None` from
//!   `try_weighted_average`, `0.0` from `weighted_average`.

use crate::model::GradeRecord;
use crate::repo::Repository;

/// Breakdown of one average computation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradeSummary {
    pub average: Option<f64>,
    pub counted: usize,
    pub exempted: usize,
    pub skipped: usize,
}

/// Computes the weighted average and how each record was treated.
pub fn summarize<'a, I>(records: I) -> GradeSummary
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let mut summary = GradeSummary::default();
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;

    for record in records {
        if record.exempted {
            summary.exempted += 1;
            continue;
        }

        let weight = record.effective_weight();
        let percentage = record.percentage();
        let usable = record.max_value > 0.0
            && weight > 0.0
            && percentage.is_finite()
            && weight.is_finite();
        if !usable {
            summary.skipped += 1;
            continue;
        }

        weighted_sum += percentage * weight;
        weight_sum += weight;
        summary.counted += 1;
    }

    if weight_sum > 0.0 {
        summary.average = Some(weighted_sum / weight_sum);
    }
    summary
}

pub fn try_weighted_average<'a, I>(records: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    summarize(records).average
}

pub fn weighted_average<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    try_weighted_average(records).unwrap_or(0.0)
}

/// Grade records owned by `subject_owner_ref`, optionally within one classroom.
pub fn subject_records<'a>(
    repo: &'a Repository,
    subject_owner_ref: &'a str,
    classroom_ref: Option<&'a str>,
) -> impl Iterator<Item = &'a GradeRecord> + 'a {
    repo.all::<GradeRecord>().iter().filter(move |record| {
        record.subject_owner_ref == subject_owner_ref
            && classroom_ref.map_or(true, |classroom| {
                record.classroom_ref.as_deref() == Some(classroom)
            })
    })
}

/// Weighted average for one subject owner, in collection order.
pub fn subject_average(
    repo: &Repository,
    subject_owner_ref: &str,
    classroom_ref: Option<&str>,
) -> f64 {
    weighted_average(subject_records(repo, subject_owner_ref, classroom_ref))
}

#[cfg(test)]
mod tests {
    use super::{summarize, try_weighted_average, weighted_average};
    use crate::model::GradeRecord;

    fn record(value: f64, max_value: f64, weight: Option<f64>) -> GradeRecord {
        let mut record = GradeRecord::new("s1", value, max_value);
        record.weight = weight;
        record
    }

    #[test]
    fn empty_input_is_zero() {
        let records: Vec<GradeRecord> = Vec::new();
        assert_eq!(weighted_average(&records), 0.0);
        assert_eq!(try_weighted_average(&records), None);
    }

    #[test]
    fn zero_max_value_is_skipped_not_nan() {
        let records = vec![record(5.0, 0.0, None), record(10.0, 20.0, None)];
        let summary = summarize(&records);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.counted, 1);
        assert_eq!(summary.average, Some(50.0));
    }

    #[test]
    fn zero_weights_only_yield_undefined_average() {
        let records = vec![record(10.0, 20.0, Some(0.0))];
        assert_eq!(try_weighted_average(&records), None);
        assert_eq!(weighted_average(&records), 0.0);
    }
}
