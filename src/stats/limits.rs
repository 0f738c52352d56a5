use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{MettoolError, Result};
use crate::stats::{mean, present, std_dev};
use crate::table::utils::finite;
use crate::table::WorkingTable;

/// Confidence interval around a column mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlLimits {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

impl ControlLimits {
    pub const MISSING: ControlLimits = ControlLimits {
        upper: None,
        lower: None,
    };

    pub fn is_missing(&self) -> bool {
        self.upper.is_none() || self.lower.is_none()
    }
}

/// Mean ± t·s/√n for `column` at `confidence_pct` percent (two-sided).
pub fn control_limits(
    table: &WorkingTable,
    column: &str,
    confidence_pct: f64,
) -> Result<ControlLimits> {
    let values = table.values(column)?;
    limits_for(&present(&values), confidence_pct)
}

/// Limits over already-filtered samples. Fewer than two samples gives
/// [`ControlLimits::MISSING`].
pub fn limits_for(samples: &[f64], confidence_pct: f64) -> Result<ControlLimits> {
    if !(confidence_pct > 0.0 && confidence_pct < 100.0) {
        return Err(MettoolError::InvalidParameter {
            reason: format!("confidence must be within (0, 100), got {confidence_pct}"),
        });
    }

    let n = samples.len();
    if n < 2 {
        return Ok(ControlLimits::MISSING);
    }

    let (Some(m), Some(s)) = (mean(samples), std_dev(samples, 1)) else {
        return Ok(ControlLimits::MISSING);
    };
    let se = s / (n as f64).sqrt();

    let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64).map_err(|e| {
        MettoolError::InvalidParameter {
            reason: format!("t distribution with {} degrees of freedom: {e}", n - 1),
        }
    })?;
    let t = dist.inverse_cdf(1.0 - (1.0 - confidence_pct / 100.0) / 2.0);

    Ok(ControlLimits {
        upper: finite(m + t * se),
        lower: finite(m - t * se),
    })
}
