pub mod clean;
pub mod periods;
pub mod prune;
pub mod select;

use tracing::{error, info};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::io::{self, Source};
use crate::results::{
    ControlOutput, CorrelationOutput, CorrelationPlot, CusumOutput, CusumPlot, CusumTrace,
};
use crate::stats::{correlation, cusum};
use crate::table::{RawTable, WorkingTable};

use self::clean::{clean, CleanOptions};
use self::periods::{compare_periods, ChartOptions, Period};
use self::prune::prune_columns;
use self::select::select_range;

/// Junk score at which a loaded column is hidden from the column listing.
pub const PRUNE_THRESHOLD: f64 = 0.8;

pub const DEFAULT_DATE_COLUMN: &str = "Date";

/// One loaded dataset and the state of the analysis running over it.
///
/// Requests take `&mut self`; callers own the pipeline and pass it to each
/// request explicitly.
#[derive(Debug, Clone)]
pub struct Pipeline {
    raw: RawTable,
    working: WorkingTable,
    selected: Vec<String>,
    date_column: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// An empty pipeline with nothing loaded.
    pub fn new() -> Self {
        Self {
            raw: RawTable::empty(),
            working: WorkingTable::empty(),
            selected: Vec::new(),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
        }
    }

    /// Wrap an already loaded table. The working table starts as the pruned raw table.
    pub fn from_raw(raw: RawTable) -> Result<Self> {
        let pruned = prune_columns(raw.batch(), DEFAULT_DATE_COLUMN, PRUNE_THRESHOLD)?;
        info!(
            rows = pruned.num_rows(),
            columns = pruned.num_columns(),
            "Loaded {} rows × {} cols",
            pruned.num_rows(),
            pruned.num_columns()
        );
        Ok(Self {
            raw,
            working: WorkingTable::new(pruned),
            ..Self::new()
        })
    }

    /// Load `sheet` of `source` into a fresh pipeline.
    #[tracing::instrument(level = "info", skip(source))]
    pub fn load(source: &Source, sheet: &str) -> Result<Self> {
        let raw = io::load_table(source, sheet)?;
        Self::from_raw(raw)
    }

    /// Replace the loaded dataset. On failure the pipeline is left empty.
    pub fn reload(&mut self, source: &Source, sheet: &str) -> Result<()> {
        match Self::load(source, sheet) {
            Ok(p) => {
                *self = p;
                Ok(())
            }
            Err(e) => {
                error!(sheet, error = %e, "reload failed, pipeline cleared");
                self.clear();
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Column names of the current working table.
    pub fn columns(&self) -> Vec<String> {
        self.working.column_names()
    }

    pub fn raw(&self) -> &RawTable {
        &self.raw
    }

    pub fn working(&self) -> &WorkingTable {
        &self.working
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn set_date_column(&mut self, name: impl Into<String>) {
        self.date_column = name.into();
    }

    /// Select `columns` between `start` and `end` from the raw table; the
    /// result replaces the working table.
    pub fn select(&mut self, start: &str, end: &str, columns: &[String]) -> Result<()> {
        self.working = select_range(&self.raw, &self.date_column, start, end, columns)?;
        self.selected = columns.to_vec();
        Ok(())
    }

    /// Clean every selected column except the date column.
    pub fn clean(&mut self, opts: &CleanOptions) -> Result<()> {
        let numeric: Vec<String> = self
            .selected
            .iter()
            .filter(|c| **c != self.date_column)
            .cloned()
            .collect();
        clean(&mut self.working, &numeric, opts)
    }

    /// The working table as a single-sheet workbook; empty on failure.
    pub fn export(&self, sheet: &str) -> Vec<u8> {
        io::export_table(self.working.batch(), sheet)
    }

    fn prepare(&mut self, cfg: &AnalysisConfig) -> Result<()> {
        self.set_date_column(cfg.date_column.clone());
        self.select(&cfg.range_start, &cfg.range_end, &cfg.columns)?;
        self.clean(&cfg.clean_options())
    }

    /// Correlation heatmap over the cleaned selection.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn run_correlation(&mut self, cfg: &AnalysisConfig) -> Result<CorrelationOutput> {
        self.prepare(cfg)?;
        let matrix = correlation(&self.working)?;
        info!(columns = matrix.len(), "correlation computed");
        Ok(CorrelationOutput {
            plot: CorrelationPlot::from(matrix),
            export: self.export("Correlation"),
        })
    }

    /// CUSUM per selected column, over rows in date order.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn run_cusum(&mut self, cfg: &AnalysisConfig) -> Result<CusumOutput> {
        self.prepare(cfg)?;
        self.working.sort_by_date(&self.date_column)?;

        let traces = cfg
            .columns
            .iter()
            .filter(|c| **c != self.date_column)
            .map(|c| -> Result<CusumTrace> {
                Ok(CusumTrace {
                    name: format!("CUSUM {c}"),
                    data: cusum(&self.working, c)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!(traces = traces.len(), rows = self.working.num_rows(), "cusum computed");

        Ok(CusumOutput {
            plot: CusumPlot {
                date_col: self.working.day_strings(&self.date_column)?,
                date_col_name: self.date_column.clone(),
                traces,
            },
            export: self.export("CUSUM"),
        })
    }

    /// Multi-period control chart of `cfg.target_column`.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn run_control_graph(&mut self, cfg: &AnalysisConfig) -> Result<ControlOutput> {
        self.set_date_column(cfg.date_column.clone());
        let periods = cfg
            .periods
            .iter()
            .map(Period::parse)
            .collect::<Result<Vec<_>>>()?;
        let opts = ChartOptions {
            date_column: self.date_column.clone(),
            target_column: cfg.target_column.clone(),
            confidence_pct: cfg.confidence_pct,
            clean: cfg.clean_options(),
            show_limits: cfg.show_limits,
            show_average: cfg.show_average,
        };

        let chart = compare_periods(&self.raw, &periods, &opts)?;
        self.working = chart.combined;
        self.selected = vec![cfg.target_column.clone(), self.date_column.clone()];
        Ok(ControlOutput {
            plot: chart.traces,
            export: self.export("Control"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeriodSpec;
    use crate::error::MettoolError;
    use crate::io::BUFFER_SHEET;
    use crate::pipeline::clean::OutlierMethod;
    use crate::results::TraceKind;
    use anyhow::Result;

    // Junk is 90% empty so it is pruned; Flow and Temp move together.
    const SHEET: &str = "Date,Flow,Temp,Junk,Site\n\
2023-01-03,3,30,,north\n\
2023-01-01,1,10,,north\n\
2023-01-02,2,20,,south\n\
2023-01-04,0,40,,south\n\
2023-01-05,5,50,,south\n\
2023-02-01,10,5,,north\n\
2023-02-02,11,6,,north\n\
2023-02-03,12,7,,north\n\
2023-02-04,13,8,,north\n\
2023-02-05,200,9,1,north\n";

    fn loaded() -> Result<Pipeline> {
        crate::logging::init_test_tracing();
        let source = Source::from(SHEET.as_bytes().to_vec());
        Ok(Pipeline::load(&source, BUFFER_SHEET)?)
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn january(columns: &[&str]) -> AnalysisConfig {
        AnalysisConfig {
            range_start: "2023-01-01".into(),
            range_end: "2023-01-31".into(),
            columns: cols(columns),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn load_prunes_listing_but_keeps_raw() -> Result<()> {
        let p = loaded()?;
        assert_eq!(p.columns(), cols(&["Date", "Flow", "Temp", "Site"]));
        assert_eq!(p.raw().num_columns(), 5);
        assert_eq!(p.raw().num_rows(), 10);
        Ok(())
    }

    #[test]
    fn reload_failure_leaves_empty_pipeline() -> Result<()> {
        let mut p = loaded()?;
        let err = p.reload(&Source::from(SHEET.as_bytes().to_vec()), "Missing");
        assert!(matches!(err, Err(MettoolError::LoadFailure { .. })));
        assert!(p.columns().is_empty());
        assert_eq!(p.raw().num_rows(), 0);
        Ok(())
    }

    #[test]
    fn clear_resets_everything() -> Result<()> {
        let mut p = loaded()?;
        p.set_date_column("Other");
        p.clear();
        assert!(p.columns().is_empty());
        assert_eq!(p.date_column(), DEFAULT_DATE_COLUMN);
        Ok(())
    }

    #[test]
    fn correlation_over_cleaned_selection() -> Result<()> {
        let mut p = loaded()?;
        let out = p.run_correlation(&january(&["Flow", "Temp"]))?;
        assert_eq!(out.plot.x, cols(&["Flow", "Temp"]));
        assert_eq!(out.plot.y, out.plot.x);
        // the zero Flow on Jan 4 is blanked, leaving a perfect line
        let r = out.plot.z[0][1].unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        assert_eq!(out.plot.z[0][1], out.plot.z[1][0]);
        assert!(!out.export.is_empty());
        assert_eq!(p.working().num_rows(), 5);
        Ok(())
    }

    #[test]
    fn cusum_sorts_by_date_first() -> Result<()> {
        let mut p = loaded()?;
        let mut cfg = january(&["Temp", "Date"]);
        cfg.replace_zero = false;
        let out = p.run_cusum(&cfg)?;

        assert_eq!(out.plot.date_col_name, "Date");
        assert_eq!(
            out.plot.date_col,
            vec![
                Some("2023-01-01".to_string()),
                Some("2023-01-02".to_string()),
                Some("2023-01-03".to_string()),
                Some("2023-01-04".to_string()),
                Some("2023-01-05".to_string()),
            ]
        );
        assert_eq!(out.plot.traces.len(), 1);
        assert_eq!(out.plot.traces[0].name, "CUSUM Temp");
        // mean 30: -20, -30, -30, -20, 0
        assert_eq!(
            out.plot.traces[0].data,
            vec![Some(-20.0), Some(-30.0), Some(-30.0), Some(-20.0), Some(0.0)]
        );
        assert!(!out.export.is_empty());
        Ok(())
    }

    #[test]
    fn day_first_sheet_selects_every_day() -> Result<()> {
        let mut sheet = String::from("Date,Flow\n");
        for day in 1..=28 {
            sheet.push_str(&format!("{day:02}/02/2023,{day}\n"));
        }
        let mut p = Pipeline::load(&Source::from(sheet.into_bytes()), BUFFER_SHEET)?;

        let cfg = AnalysisConfig {
            range_start: "01/02/2023".into(),
            range_end: "28/02/2023".into(),
            columns: cols(&["Flow"]),
            ..AnalysisConfig::default()
        };
        let out = p.run_cusum(&cfg)?;
        assert_eq!(p.working().num_rows(), 28);
        let expected: Vec<Option<String>> = (1..=28)
            .map(|day| Some(format!("2023-02-{day:02}")))
            .collect();
        assert_eq!(out.plot.date_col, expected);
        assert!(out.plot.traces[0].data[27].unwrap().abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn selection_errors_propagate() -> Result<()> {
        let mut p = loaded()?;
        let mut backwards = january(&["Flow"]);
        backwards.range_start = "2023-02-01".into();
        assert!(matches!(
            p.run_correlation(&backwards),
            Err(MettoolError::Range { .. })
        ));

        assert!(matches!(
            p.run_cusum(&january(&["Pressure"])),
            Err(MettoolError::MissingColumn { name }) if name == "Pressure"
        ));

        let mut wrong_date = january(&["Flow"]);
        wrong_date.date_column = "When".into();
        assert!(matches!(
            p.run_correlation(&wrong_date),
            Err(MettoolError::MissingColumn { name }) if name == "When"
        ));
        Ok(())
    }

    #[test]
    fn pruned_columns_are_still_selectable() -> Result<()> {
        let mut p = loaded()?;
        let mut cfg = january(&["Junk"]);
        cfg.range_end = "2023-12-31".into();
        p.run_correlation(&cfg)?;
        assert_eq!(p.working().column_names(), cols(&["Junk", "Date"]));
        Ok(())
    }

    #[test]
    fn control_graph_isolates_periods_and_exports() -> Result<()> {
        let mut p = loaded()?;
        let cfg = AnalysisConfig {
            target_column: "Flow".into(),
            remove_outliers: true,
            outlier_method: OutlierMethod::Iqr,
            outlier_threshold: 1.5,
            periods: vec![
                PeriodSpec {
                    start: "01/01/2023".into(),
                    end: "31/01/2023".into(),
                    label: Some("Jan".into()),
                },
                PeriodSpec {
                    start: "2023-02-01".into(),
                    end: "2023-02-28".into(),
                    label: None,
                },
            ],
            ..AnalysisConfig::default()
        };
        let out = p.run_control_graph(&cfg)?;
        assert_eq!(out.plot.len(), 8);
        assert_eq!(out.plot[0].kind, TraceKind::Points);
        assert_eq!(out.plot[0].y, vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)]);
        assert_eq!(out.plot[4].label, "2023-02-01 - 2023-02-28");
        // the February spike goes, January is untouched by it
        assert_eq!(
            out.plot[4].y,
            vec![Some(10.0), Some(11.0), Some(12.0), Some(13.0), None]
        );
        assert_eq!(p.working().num_rows(), 10);
        assert_eq!(p.columns(), cols(&["Flow", "Date"]));
        assert!(!out.export.is_empty());
        Ok(())
    }
}
