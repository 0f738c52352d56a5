use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::table::WorkingTable;

/// Square Pearson matrix over a table's numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }
}

/// Pairwise Pearson correlation between every numeric column of `table`.
///
/// Each pair uses only the rows where both values are present. Pairs with
/// fewer than two such rows, or where either side has zero variance, are
/// `None`.
pub fn correlation(table: &WorkingTable) -> Result<CorrelationMatrix> {
    let labels = table.numeric_column_names();
    let columns = labels
        .iter()
        .map(|name| table.values(name))
        .collect::<Result<Vec<_>>>()?;

    let n = labels.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                // a column against itself is exactly 1 when it varies at all
                pearson(&columns[i], &columns[j]).map(|_| 1.0)
            } else {
                pearson(&columns[i], &columns[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    debug!(columns = n, "computed correlation matrix");
    Ok(CorrelationMatrix { labels, values })
}

/// Pearson r over pairwise-complete observations, clamped to [-1, 1].
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
