use serde::Serialize;

use crate::stats::CorrelationMatrix;

/// Heatmap payload: `z[i][j]` is the correlation of `y[i]` with `x[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPlot {
    pub z: Vec<Vec<Option<f64>>>,
    pub x: Vec<String>,
    pub y: Vec<String>,
}

impl From<CorrelationMatrix> for CorrelationPlot {
    fn from(m: CorrelationMatrix) -> Self {
        Self {
            z: m.values,
            x: m.labels.clone(),
            y: m.labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CusumPlot {
    pub date_col: Vec<Option<String>>,
    pub date_col_name: String,
    pub traces: Vec<CusumTrace>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CusumTrace {
    pub name: String,
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Points,
    UpperLimit,
    LowerLimit,
    Average,
}

/// One control-chart series. Empty `x`/`y` marks a series that exists only
/// to keep trace positions stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub kind: TraceKind,
    pub name: String,
    pub label: String,
    pub color: String,
    pub x: Vec<Option<String>>,
    pub y: Vec<Option<f64>>,
}

impl Trace {
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }
}

/// Plot data plus the re-exported working table (empty when export failed).
#[derive(Debug, Clone)]
pub struct Output<P> {
    pub plot: P,
    pub export: Vec<u8>,
}

pub type CorrelationOutput = Output<CorrelationPlot>;
pub type CusumOutput = Output<CusumPlot>;
pub type ControlOutput = Output<Vec<Trace>>;
