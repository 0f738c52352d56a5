use arrow::array::{ArrayRef, Float64Array};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::stats::{mean, present, quantile, std_dev};
use crate::table::WorkingTable;

/// How outliers are detected. Names match case-insensitively; anything else
/// is kept as [`OutlierMethod::Unrecognized`] and disables outlier removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutlierMethod {
    ZScore,
    Iqr,
    Unrecognized(String),
}

impl From<String> for OutlierMethod {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zscore" => OutlierMethod::ZScore,
            "iqr" => OutlierMethod::Iqr,
            _ => OutlierMethod::Unrecognized(s),
        }
    }
}

impl From<&str> for OutlierMethod {
    fn from(s: &str) -> Self {
        OutlierMethod::from(s.to_string())
    }
}

impl From<OutlierMethod> for String {
    fn from(m: OutlierMethod) -> Self {
        m.to_string()
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::ZScore => f.write_str("zscore"),
            OutlierMethod::Iqr => f.write_str("iqr"),
            OutlierMethod::Unrecognized(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanOptions {
    pub replace_zero: bool,
    pub remove_outliers: bool,
    pub method: OutlierMethod,
    pub threshold: f64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            replace_zero: true,
            remove_outliers: false,
            method: OutlierMethod::ZScore,
            threshold: 3.0,
        }
    }
}

/// Clean `columns` of `table` in place.
///
/// Each column becomes `Float64` (unparseable cells missing). Zeros are then
/// blanked when `replace_zero` is set, and outliers are blanked afterwards,
/// scored against whatever survived the zero pass.
pub fn clean(table: &mut WorkingTable, columns: &[String], opts: &CleanOptions) -> Result<()> {
    if opts.remove_outliers {
        if let OutlierMethod::Unrecognized(name) = &opts.method {
            warn!(method = %name, "unknown outlier method, skipping outlier removal");
        }
    }

    for name in columns {
        let mut values = table.values(name)?;

        if opts.replace_zero {
            replace_zeros(&mut values);
        }

        if opts.remove_outliers && values.iter().any(Option::is_some) {
            let removed = match opts.method {
                OutlierMethod::ZScore => remove_zscore_outliers(&mut values, opts.threshold),
                OutlierMethod::Iqr => remove_iqr_outliers(&mut values, opts.threshold),
                OutlierMethod::Unrecognized(_) => 0,
            };
            debug!(column = %name, removed, method = %opts.method, "outliers removed");
        }

        table.replace_column(name, Arc::new(Float64Array::from(values)) as ArrayRef)?;
    }
    Ok(())
}

/// Blank every exact zero. Returns how many were blanked.
pub fn replace_zeros(values: &mut [Option<f64>]) -> usize {
    let mut n = 0;
    for v in values.iter_mut() {
        if *v == Some(0.0) {
            *v = None;
            n += 1;
        }
    }
    n
}

/// Blank values whose |z| exceeds `threshold`, with mean and population
/// standard deviation taken over the present values only. A flat column is
/// left alone.
pub fn remove_zscore_outliers(values: &mut [Option<f64>], threshold: f64) -> usize {
    let sample = present(values);
    let (Some(m), Some(sd)) = (mean(&sample), std_dev(&sample, 0)) else {
        return 0;
    };
    if sd == 0.0 || !sd.is_finite() {
        return 0;
    }

    blank_where(values, |x| ((x - m) / sd).abs() > threshold)
}

/// Blank values strictly outside `[Q1 - t·IQR, Q3 + t·IQR]`.
pub fn remove_iqr_outliers(values: &mut [Option<f64>], threshold: f64) -> usize {
    let sample = present(values);
    let (Some(q1), Some(q3)) = (quantile(&sample, 0.25), quantile(&sample, 0.75)) else {
        return 0;
    };
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - threshold * iqr, q3 + threshold * iqr);

    blank_where(values, |x| x < lo || x > hi)
}

fn blank_where(values: &mut [Option<f64>], pred: impl Fn(f64) -> bool) -> usize {
    let mut n = 0;
    for v in values.iter_mut() {
        if matches!(v, Some(x) if pred(*x)) {
            *v = None;
            n += 1;
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::dated_batch;
    use arrow::array::{Array, StringArray};
    use arrow::datatypes::DataType;

    fn some(xs: &[f64]) -> Vec<Option<f64>> {
        xs.iter().copied().map(Some).collect()
    }

    #[test]
    fn method_names_are_case_insensitive() {
        assert_eq!(OutlierMethod::from("ZScore"), OutlierMethod::ZScore);
        assert_eq!(OutlierMethod::from("IQR"), OutlierMethod::Iqr);
        assert_eq!(
            OutlierMethod::from("mad"),
            OutlierMethod::Unrecognized("mad".into())
        );
        assert_eq!(String::from(OutlierMethod::Iqr), "iqr");
    }

    #[test]
    fn zscore_drops_the_spike() {
        let mut v = some(&[1.0, 2.0, 3.0, 100.0]);
        assert_eq!(remove_zscore_outliers(&mut v, 1.0), 1);
        assert_eq!(v, vec![Some(1.0), Some(2.0), Some(3.0), None]);
    }

    #[test]
    fn zscore_ignores_missing_and_flat() {
        let mut v = vec![Some(1.0), None, Some(2.0), Some(3.0), None, Some(100.0)];
        remove_zscore_outliers(&mut v, 1.0);
        assert_eq!(v, vec![Some(1.0), None, Some(2.0), Some(3.0), None, None]);

        let mut flat = some(&[5.0, 5.0, 5.0]);
        assert_eq!(remove_zscore_outliers(&mut flat, 0.0), 0);
    }

    #[test]
    fn iqr_bounds_are_strict() {
        // q1 = 2, q3 = 4, iqr = 2, bounds with t = 1.5 are [-1, 7]
        let mut on_edge = some(&[1.0, 2.0, 3.0, 4.0, 7.0]);
        assert_eq!(remove_iqr_outliers(&mut on_edge, 1.5), 0);

        let mut spike = some(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert_eq!(remove_iqr_outliers(&mut spike, 1.5), 1);
        assert_eq!(spike, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), None]);

        let mut low = vec![Some(-50.0), None, Some(2.0), Some(3.0), Some(4.0), Some(5.0)];
        assert_eq!(remove_iqr_outliers(&mut low, 1.5), 1);
        assert_eq!(low[0], None);
    }

    #[test]
    fn clean_replaces_zeros_and_coerces() {
        let batch = dated_batch(
            &["2023-01-01", "2023-01-02", "2023-01-03"],
            vec![("Flow", vec![Some(0.0), Some(2.0), None])],
        );
        let mut table = WorkingTable::new(batch);
        clean(&mut table, &["Flow".to_string()], &CleanOptions::default()).unwrap();
        assert_eq!(table.values("Flow").unwrap(), vec![None, Some(2.0), None]);
        assert!(table.values("Flow").unwrap().iter().all(|v| *v != Some(0.0)));
    }

    #[test]
    fn clean_keeps_zeros_when_asked() {
        let batch = dated_batch(&["2023-01-01"], vec![("Flow", vec![Some(0.0)])]);
        let mut table = WorkingTable::new(batch);
        let opts = CleanOptions {
            replace_zero: false,
            ..CleanOptions::default()
        };
        clean(&mut table, &["Flow".to_string()], &opts).unwrap();
        assert_eq!(table.values("Flow").unwrap(), vec![Some(0.0)]);
    }

    #[test]
    fn clean_text_column_becomes_numeric() {
        let batch = dated_batch(&["2023-01-01", "2023-01-02"], vec![]);
        let mut table = WorkingTable::new(batch);
        table
            .replace_column(
                "Date",
                Arc::new(StringArray::from(vec!["12", "oops"])) as ArrayRef,
            )
            .unwrap();
        clean(&mut table, &["Date".to_string()], &CleanOptions::default()).unwrap();
        let col = table.column("Date").unwrap();
        assert_eq!(col.data_type(), &DataType::Float64);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn unknown_method_removes_nothing() {
        let batch = dated_batch(
            &["2023-01-01", "2023-01-02", "2023-01-03", "2023-01-04"],
            vec![("Flow", some(&[1.0, 2.0, 3.0, 100.0]))],
        );
        let mut table = WorkingTable::new(batch);
        let opts = CleanOptions {
            remove_outliers: true,
            method: OutlierMethod::from("median"),
            threshold: 1.0,
            ..CleanOptions::default()
        };
        clean(&mut table, &["Flow".to_string()], &opts).unwrap();
        assert_eq!(table.values("Flow").unwrap(), some(&[1.0, 2.0, 3.0, 100.0]));
    }

    #[test]
    fn zero_pass_runs_before_outlier_scoring() {
        // with the zero blanked, 100 is the only outlier against [1, 2, 3]
        let batch = dated_batch(
            &["2023-01-01", "2023-01-02", "2023-01-03", "2023-01-04", "2023-01-05"],
            vec![("Flow", some(&[0.0, 1.0, 2.0, 3.0, 100.0]))],
        );
        let mut table = WorkingTable::new(batch);
        let opts = CleanOptions {
            remove_outliers: true,
            threshold: 1.0,
            ..CleanOptions::default()
        };
        clean(&mut table, &["Flow".to_string()], &opts).unwrap();
        assert_eq!(
            table.values("Flow").unwrap(),
            vec![None, Some(1.0), Some(2.0), Some(3.0), None]
        );
    }
}
