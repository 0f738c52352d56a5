use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::config::PeriodSpec;
use crate::error::Result;
use crate::pipeline::clean::{clean, CleanOptions};
use crate::pipeline::select::{select, DateRange};
use crate::results::{Trace, TraceKind};
use crate::stats::{column_mean, control_limits};
use crate::table::{RawTable, WorkingTable};

/// Display colours, assigned to periods by index modulo 10.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f0f",
    "#bcbd22", "#17becf",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// A labelled inclusive date interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub range: DateRange,
    pub label: String,
}

impl Period {
    pub fn parse(spec: &PeriodSpec) -> Result<Self> {
        let range = DateRange::parse(&spec.start, &spec.end)?;
        let label = spec
            .label
            .clone()
            .unwrap_or_else(|| format!("{} - {}", spec.start, spec.end));
        Ok(Self { range, label })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.range.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.range.end
    }

    fn span(&self) -> Vec<Option<String>> {
        [self.start(), self.end()]
            .iter()
            .map(|d| Some(d.format("%Y-%m-%d").to_string()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub date_column: String,
    pub target_column: String,
    pub confidence_pct: f64,
    pub clean: CleanOptions,
    pub show_limits: bool,
    pub show_average: bool,
}

/// Control chart traces plus every period's cleaned rows, stacked in period order.
#[derive(Debug, Clone)]
pub struct ControlChart {
    pub traces: Vec<Trace>,
    pub combined: WorkingTable,
}

/// Select and clean each period independently from `raw`, then emit its
/// point series and optional limit and average lines.
///
/// Every period gets a fresh working table, so cleaning one period never
/// touches another's rows.
pub fn compare_periods(raw: &RawTable, periods: &[Period], opts: &ChartOptions) -> Result<ControlChart> {
    let wanted = vec![opts.target_column.clone(), opts.date_column.clone()];
    let numeric = vec![opts.target_column.clone()];

    let mut traces = Vec::new();
    let mut tables = Vec::with_capacity(periods.len());

    for (i, period) in periods.iter().enumerate() {
        let color = palette_color(i);

        let mut table = select(raw, &opts.date_column, &period.range, &wanted)?;
        clean(&mut table, &numeric, &opts.clean)?;
        table.sort_by_date(&opts.date_column)?;

        traces.push(Trace {
            kind: TraceKind::Points,
            name: period.label.clone(),
            label: period.label.clone(),
            color: color.to_string(),
            x: table.day_strings(&opts.date_column)?,
            y: table.values(&opts.target_column)?,
        });

        if opts.show_limits {
            let limits = control_limits(&table, &opts.target_column, opts.confidence_pct)?;
            traces.push(line(period, color, TraceKind::UpperLimit, limits.upper));
            traces.push(line(period, color, TraceKind::LowerLimit, limits.lower));
        }

        if opts.show_average {
            let avg = column_mean(&table, &opts.target_column)?;
            traces.push(line(period, color, TraceKind::Average, avg));
        }

        debug!(period = %period.label, rows = table.num_rows(), color, "period charted");
        tables.push(table);
    }

    let combined = WorkingTable::concat(&tables)?;
    info!(periods = periods.len(), traces = traces.len(), rows = combined.num_rows(), "control chart built");
    Ok(ControlChart { traces, combined })
}

/// A flat line across the period, or an empty series when there is no value.
fn line(period: &Period, color: &str, kind: TraceKind, value: Option<f64>) -> Trace {
    let prefix = match kind {
        TraceKind::UpperLimit => "UCL",
        TraceKind::LowerLimit => "LCL",
        TraceKind::Average => "Avg",
        TraceKind::Points => "",
    };
    let (x, y) = match value {
        Some(v) => (period.span(), vec![Some(v), Some(v)]),
        None => (Vec::new(), Vec::new()),
    };
    Trace {
        kind,
        name: format!("{prefix} ({})", period.label),
        label: period.label.clone(),
        color: color.to_string(),
        x,
        y,
    }
}
