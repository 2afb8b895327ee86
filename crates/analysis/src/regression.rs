//! Ordinary least squares with optional dummy-variable fixed effects.
//!
//! Fixed effects are estimated by least-squares dummy variables (LSDV): one
//! indicator column per level of each fixed-effect group, minus the first
//! (sorted) level which acts as the base. Columns that are exact linear
//! combinations of columns already in the design are omitted and reported
//! as such, so the fit never fails on the collinearity that overlapping
//! dummy sets produce.
//!
//! Standard errors are either classical, `s²(X'X)⁻¹`, or HC1 robust,
//! `n/(n-k) · (X'X)⁻¹ X' diag(e²) X (X'X)⁻¹`.

use crate::error::{AnalysisError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeSet;
use tracing::{debug, info};
use tradeflow_core::{Field, KeyValue, Record};

/// Name of the intercept term.
pub const CONSTANT: &str = "_cons";

/// Gravity regressors shared by both specifications.
pub const GRAVITY_REGRESSORS: [&str; 3] = ["ln_gdp", "ln_distance", "common_language"];

/// Residual variance left after projecting a column on the kept columns,
/// relative to the column's own sum of squares, below which the column is
/// treated as collinear.
const COLLINEARITY_TOLERANCE: f64 = 1e-9;

/// A model to estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Specification label, e.g. `baseline`
    pub name: String,
    pub dependent: String,
    pub regressors: Vec<String>,
    /// Groups entering as dummy indicators
    pub fixed_effects: Vec<Field>,
    /// HC1 standard errors when true, classical otherwise
    pub robust: bool,
}

impl ModelSpec {
    /// Gravity regressors only.
    #[must_use]
    pub fn baseline(dependent: impl Into<String>, robust: bool) -> Self {
        Self {
            name: "baseline".to_string(),
            dependent: dependent.into(),
            regressors: GRAVITY_REGRESSORS.iter().map(ToString::to_string).collect(),
            fixed_effects: Vec::new(),
            robust,
        }
    }

    /// Gravity regressors plus dummies for each of `groups`.
    #[must_use]
    pub fn fixed_effects(dependent: impl Into<String>, groups: &[Field], robust: bool) -> Self {
        Self {
            name: "fixed_effects".to_string(),
            fixed_effects: groups.to_vec(),
            ..Self::baseline(dependent, robust)
        }
    }
}

/// One estimated (or omitted) coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_stat: f64,
    /// Two-sided, Student's t with the residual degrees of freedom
    pub p_value: f64,
    /// Dropped for collinearity; estimate is 0 and the rest NaN
    pub omitted: bool,
}

impl Coefficient {
    fn omitted(name: String) -> Self {
        Self {
            name,
            estimate: 0.0,
            std_error: f64::NAN,
            t_stat: f64::NAN,
            p_value: f64::NAN,
            omitted: true,
        }
    }

    #[must_use]
    pub fn stars(&self) -> &'static str {
        significance_stars(self.p_value)
    }
}

/// Significance marker: `***` p<0.01, `**` p<0.05, `*` p<0.1.
#[must_use]
pub fn significance_stars(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "***"
    } else if p_value < 0.05 {
        "**"
    } else if p_value < 0.1 {
        "*"
    } else {
        ""
    }
}

/// A fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub model: String,
    pub dependent: String,
    pub robust: bool,
    pub fixed_effects: Vec<Field>,
    /// Regressors, then fixed-effect dummies, then the constant
    pub coefficients: Vec<Coefficient>,
    pub n_obs: usize,
    /// Rows skipped because a model variable was missing
    pub n_dropped: usize,
    /// Estimated (non-omitted) parameters
    pub parameters: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Root mean squared error, `sqrt(RSS / df_resid)`
    pub rmse: f64,
}

impl RegressionResult {
    #[must_use]
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Number of columns dropped for collinearity.
    #[must_use]
    pub fn omitted_count(&self) -> usize {
        self.coefficients.iter().filter(|c| c.omitted).count()
    }
}

/// Design matrix columns in estimation order: constant first, then
/// regressors, then dummies.
struct Design {
    names: Vec<String>,
    x: DMatrix<f64>,
    y: DVector<f64>,
    n_dropped: usize,
}

fn build_design<R: Record>(rows: &[R], spec: &ModelSpec) -> Result<Design> {
    if let Some(first) = rows.first() {
        for metric in std::iter::once(&spec.dependent).chain(&spec.regressors) {
            if !first.has_metric(metric) {
                return Err(AnalysisError::UnknownMetric(metric.clone()));
            }
        }
    }

    let mut y = Vec::with_capacity(rows.len());
    let mut regressors: Vec<Vec<f64>> = Vec::with_capacity(rows.len());
    let mut groups: Vec<Vec<KeyValue>> = Vec::with_capacity(rows.len());
    let mut n_dropped = 0;

    'rows: for row in rows {
        let Some(dep) = row.metric(&spec.dependent) else {
            n_dropped += 1;
            continue;
        };
        let mut xs = Vec::with_capacity(spec.regressors.len());
        for name in &spec.regressors {
            match row.metric(name) {
                Some(v) => xs.push(v),
                None => {
                    n_dropped += 1;
                    continue 'rows;
                }
            }
        }
        let mut levels = Vec::with_capacity(spec.fixed_effects.len());
        for field in &spec.fixed_effects {
            levels.push(row.key(*field).ok_or(AnalysisError::UnknownField(*field))?);
        }
        y.push(dep);
        regressors.push(xs);
        groups.push(levels);
    }

    let n = y.len();
    let mut names = vec![CONSTANT.to_string()];
    names.extend(spec.regressors.iter().cloned());

    // (group index, level) for every dummy column
    let mut dummies: Vec<(usize, KeyValue)> = Vec::new();
    for (g, field) in spec.fixed_effects.iter().enumerate() {
        let levels: BTreeSet<&KeyValue> = groups.iter().map(|l| &l[g]).collect();
        for level in levels.into_iter().skip(1) {
            names.push(format!("{field}={level}"));
            dummies.push((g, level.clone()));
        }
    }

    let n_regressors = spec.regressors.len();
    let x = DMatrix::from_fn(n, names.len(), |i, j| {
        if j == 0 {
            1.0
        } else if j <= n_regressors {
            regressors[i][j - 1]
        } else {
            let (g, level) = &dummies[j - 1 - n_regressors];
            if groups[i][*g] == *level {
                1.0
            } else {
                0.0
            }
        }
    });

    Ok(Design {
        names,
        x,
        y: DVector::from_vec(y),
        n_dropped,
    })
}

/// Greedy column selection on the cross-product matrix.
///
/// Walks the columns in order, growing a Cholesky factor of the kept block;
/// a column whose residual after projection on the kept columns is
/// negligible is omitted.
fn independent_columns(xtx: &DMatrix<f64>) -> Vec<usize> {
    let p = xtx.ncols();
    let mut kept: Vec<usize> = Vec::with_capacity(p);
    // rows of the lower-triangular factor of xtx[kept, kept]
    let mut factor: Vec<Vec<f64>> = Vec::with_capacity(p);

    for j in 0..p {
        let diag = xtx[(j, j)];
        if diag <= 0.0 {
            continue;
        }
        let mut z = Vec::with_capacity(kept.len());
        for (r, row) in factor.iter().enumerate() {
            let dot: f64 = row[..r].iter().zip(&z).map(|(l, zi)| l * zi).sum();
            z.push((xtx[(kept[r], j)] - dot) / row[r]);
        }
        let residual = diag - z.iter().map(|v| v * v).sum::<f64>();
        if residual > COLLINEARITY_TOLERANCE * diag {
            z.push(residual.sqrt());
            factor.push(z);
            kept.push(j);
        }
    }
    kept
}

/// Fits `spec` by least squares over `rows`.
///
/// Rows missing the dependent variable or a regressor are skipped and
/// counted in `n_dropped`. The same rows and spec always give bit-identical
/// results.
///
/// # Errors
///
/// Returns `UnknownMetric`/`UnknownField` if a model variable is not a column
/// of the rows, `InsufficientObservations` if there are no residual degrees
/// of freedom, and `Singular` if the kept cross-product matrix cannot be
/// inverted.
pub fn fit_ols<R: Record>(rows: &[R], spec: &ModelSpec) -> Result<RegressionResult> {
    let design = build_design(rows, spec)?;
    let n = design.y.len();

    let xtx_full = design.x.transpose() * &design.x;
    let kept = if n == 0 {
        Vec::new()
    } else {
        independent_columns(&xtx_full)
    };
    let k = kept.len();
    if n <= k || k == 0 {
        return Err(AnalysisError::InsufficientObservations {
            model: spec.name.clone(),
            observations: n,
            parameters: k.max(1),
        });
    }

    let x = design.x.select_columns(kept.iter());
    let xtx = x.transpose() * &x;
    let xtx_inv = xtx
        .clone()
        .cholesky()
        .map(|c| c.inverse())
        .or_else(|| xtx.try_inverse())
        .ok_or_else(|| AnalysisError::Singular {
            model: spec.name.clone(),
        })?;

    let beta = &xtx_inv * (x.transpose() * &design.y);
    let resid = &design.y - &x * &beta;
    let rss: f64 = resid.iter().map(|e| e * e).sum();
    let mean_y = design.y.mean();
    let tss: f64 = design.y.iter().map(|v| (v - mean_y).powi(2)).sum();

    let df = n - k;
    let (n_f, k_f, df_f) = (n as f64, k as f64, df as f64);

    let covariance = if spec.robust {
        let mut scaled = x.clone();
        for (i, mut row) in scaled.row_iter_mut().enumerate() {
            row *= resid[i];
        }
        let meat = scaled.transpose() * &scaled;
        &xtx_inv * meat * &xtx_inv * (n_f / df_f)
    } else {
        &xtx_inv * (rss / df_f)
    };

    let t_dist = StudentsT::new(0.0, 1.0, df_f).ok();
    let mut estimated = vec![None; design.names.len()];
    for (pos, &col) in kept.iter().enumerate() {
        let estimate = beta[pos];
        let std_error = covariance[(pos, pos)].max(0.0).sqrt();
        let t_stat = if std_error > 0.0 {
            estimate / std_error
        } else {
            f64::NAN
        };
        let p_value = match &t_dist {
            Some(t) if t_stat.is_finite() => 2.0 * (1.0 - t.cdf(t_stat.abs())),
            _ => f64::NAN,
        };
        estimated[col] = Some(Coefficient {
            name: design.names[col].clone(),
            estimate,
            std_error,
            t_stat,
            p_value,
            omitted: false,
        });
    }

    // report order: regressors and dummies, constant last
    let mut coefficients: Vec<Coefficient> = estimated
        .iter()
        .enumerate()
        .skip(1)
        .map(|(col, c)| {
            c.clone()
                .unwrap_or_else(|| Coefficient::omitted(design.names[col].clone()))
        })
        .collect();
    coefficients.push(
        estimated[0]
            .clone()
            .unwrap_or_else(|| Coefficient::omitted(CONSTANT.to_string())),
    );

    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n_f - 1.0) / df_f;
    let omitted = design.names.len() - k;
    if omitted > 0 {
        debug!(model = %spec.name, omitted, "collinear columns omitted");
    }

    info!(
        model = %spec.name,
        dependent = %spec.dependent,
        n_obs = n,
        parameters = k,
        r_squared,
        "regression fitted"
    );

    Ok(RegressionResult {
        model: spec.name.clone(),
        dependent: spec.dependent.clone(),
        robust: spec.robust,
        fixed_effects: spec.fixed_effects.clone(),
        coefficients,
        n_obs: n,
        n_dropped: design.n_dropped,
        parameters: k,
        df_resid: df,
        r_squared,
        adj_r_squared,
        rmse: (rss / df_f).sqrt(),
    })
}
