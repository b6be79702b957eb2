//! Linear regression over materialized tables.
//!
//! Fits `response = intercept + b1 * p1 + ... + bk * pk` by ordinary least
//! squares and applies the fitted coefficients to new covariate tables to
//! produce point forecasts.

use crate::model::error::ModelError;
use crate::table::TimeSeriesTable;
use bon::bon;
use log::warn;
use serde::{Deserialize, Serialize};

/// What to do with rows that have a null in the response or any predictor at
/// fit time.
///
/// With [`NullPolicy::DropRows`] those rows are excluded from the fit. That
/// changes which rows influence the coefficients, so the exclusion is logged
/// at `warn` rather than happening silently; pick [`NullPolicy::Fail`] to
/// treat nulls in the fitting window as an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    #[default]
    DropRows,
    Fail,
}

/// Coefficients fitted against exactly one table.
///
/// Records the exact predictor column set and order used at fit time;
/// [`FittedModel::forecast`] validates a new table against that set before
/// touching any numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    response: String,
    predictors: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    n_observations: usize,
    r_squared: f64,
}

#[bon]
impl FittedModel {
    /// Fits a linear model on `table`.
    ///
    /// # Arguments
    ///
    /// * `.table(..)`: **Required.** The fitting table.
    /// * `.response(..)`: **Required.** Response column name.
    /// * `.predictors(..)`: **Required.** Predictor column names, in order.
    /// * `.null_policy(..)`: Optional. Defaults to [`NullPolicy::DropRows`].
    ///
    /// # Errors
    ///
    /// [`ModelError::Table`] if a referenced column is absent or non-numeric,
    /// [`ModelError::NullsInFit`] under [`NullPolicy::Fail`],
    /// [`ModelError::InsufficientData`] if fewer rows remain than
    /// `predictors + 1`, and [`ModelError::Numerical`] if the normal matrix
    /// is singular (e.g. collinear predictors).
    ///
    /// # Example
    ///
    /// ```
    /// use ecocast::{FittedModel, TimeSeriesTable};
    /// use polars::prelude::*;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let table = TimeSeriesTable::new(df!(
    ///     "air_temp" => [10.0, 12.0, 14.0, 16.0],
    ///     "water_temp" => [8.0, 9.0, 10.0, 11.0],
    /// )?);
    ///
    /// let model = FittedModel::fit()
    ///     .table(&table)
    ///     .response("water_temp")
    ///     .predictors(&["air_temp"])
    ///     .call()?;
    /// assert!((model.coefficients()[0] - 0.5).abs() < 1e-10);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub fn fit(
        table: &TimeSeriesTable,
        #[builder(into)] response: String,
        predictors: &[&str],
        null_policy: Option<NullPolicy>,
    ) -> Result<FittedModel, ModelError> {
        let null_policy = null_policy.unwrap_or_default();

        let response_values = table.column_f64(&response)?;
        let mut predictor_values: Vec<Vec<Option<f64>>> = Vec::with_capacity(predictors.len());
        for name in predictors {
            predictor_values.push(table.column_f64(name)?);
        }

        if null_policy == NullPolicy::Fail {
            for (name, values) in std::iter::once((response.as_str(), &response_values))
                .chain(predictors.iter().copied().zip(predictor_values.iter()))
            {
                let nulls = values.iter().filter(|v| v.is_none()).count();
                if nulls > 0 {
                    return Err(ModelError::NullsInFit {
                        column: name.to_string(),
                        nulls,
                    });
                }
            }
        }

        // Keep rows with a complete (response, predictors...) tuple.
        let total = table.height();
        let mut y = Vec::with_capacity(total);
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(total);
        'rows: for i in 0..total {
            let Some(response_value) = response_values[i] else {
                continue;
            };
            let mut row = Vec::with_capacity(predictors.len());
            for values in &predictor_values {
                match values[i] {
                    Some(v) => row.push(v),
                    None => continue 'rows,
                }
            }
            y.push(response_value);
            rows.push(row);
        }

        let dropped = total - y.len();
        if dropped > 0 {
            warn!(
                "Excluded {dropped} of {total} rows containing nulls from the fit of '{response}'"
            );
        }

        let k = predictors.len();
        let required = k + 1;
        if y.len() < required {
            return Err(ModelError::InsufficientData {
                predictors: k,
                required,
                actual: y.len(),
            });
        }

        let solution = solve_normal_equations(&rows, &y, k)?;
        let intercept = solution[0];
        let coefficients = solution[1..].to_vec();

        // R² against the retained rows.
        let n = y.len() as f64;
        let mean_y = y.iter().sum::<f64>() / n;
        let ss_tot: f64 = y.iter().map(|&v| (v - mean_y).powi(2)).sum();
        let ss_res: f64 = rows
            .iter()
            .zip(&y)
            .map(|(row, &observed)| {
                let predicted = intercept
                    + row
                        .iter()
                        .zip(&coefficients)
                        .map(|(x, b)| x * b)
                        .sum::<f64>();
                (observed - predicted).powi(2)
            })
            .sum();
        let r_squared = if ss_tot > 1e-10 {
            1.0 - ss_res / ss_tot
        } else {
            1.0
        };

        Ok(FittedModel {
            response,
            predictors: predictors.iter().map(|p| p.to_string()).collect(),
            coefficients,
            intercept,
            n_observations: y.len(),
            r_squared,
        })
    }
}

impl FittedModel {
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Predictor columns in fit order.
    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    /// One coefficient per predictor, in fit order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    /// Point predictions for each row of `table`, positionally aligned.
    ///
    /// Every predictor the model was fit with must be present; a missing
    /// column is [`ModelError::SchemaMismatch`], checked up front so it never
    /// propagates as a cryptic numeric failure. Rows with a null in any
    /// predictor predict null.
    pub fn predict_rows(&self, table: &TimeSeriesTable) -> Result<Vec<Option<f64>>, ModelError> {
        for name in &self.predictors {
            if !table.has_column(name) {
                return Err(ModelError::SchemaMismatch {
                    column: name.clone(),
                });
            }
        }

        let mut predictor_values: Vec<Vec<Option<f64>>> =
            Vec::with_capacity(self.predictors.len());
        for name in &self.predictors {
            predictor_values.push(table.column_f64(name)?);
        }

        let predictions = (0..table.height())
            .map(|i| {
                let mut acc = self.intercept;
                for (values, coefficient) in predictor_values.iter().zip(&self.coefficients) {
                    acc += values[i]? * coefficient;
                }
                Some(acc)
            })
            .collect();
        Ok(predictions)
    }

    /// Returns `table` with a `forecast` column of point predictions appended.
    pub fn forecast(&self, table: &TimeSeriesTable) -> Result<TimeSeriesTable, ModelError> {
        use polars::prelude::*;

        let predictions = self.predict_rows(table)?;
        let mut frame = table.frame.clone();
        frame
            .with_column(Series::new("forecast".into(), predictions))
            .map_err(ModelError::Output)?;
        Ok(TimeSeriesTable::new(frame))
    }
}

/// Solves `XᵀX b = Xᵀy` for `b = [intercept, coefficients...]` by Gaussian
/// elimination with partial pivoting. `rows` holds the predictor values only;
/// the intercept column is implicit.
fn solve_normal_equations(
    rows: &[Vec<f64>],
    y: &[f64],
    k: usize,
) -> Result<Vec<f64>, ModelError> {
    let dim = k + 1;
    let mut a = vec![vec![0.0f64; dim]; dim];
    let mut b = vec![0.0f64; dim];

    let x = |row: &Vec<f64>, j: usize| if j == 0 { 1.0 } else { row[j - 1] };
    for (row, &observed) in rows.iter().zip(y) {
        for i in 0..dim {
            b[i] += x(row, i) * observed;
            for j in i..dim {
                a[i][j] += x(row, i) * x(row, j);
            }
        }
    }
    // XᵀX is symmetric.
    for i in 0..dim {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
    }

    for pivot in 0..dim {
        let (best_row, best_value) = (pivot..dim)
            .map(|r| (r, a[r][pivot].abs()))
            .max_by(|x, y| x.1.total_cmp(&y.1))
            .unwrap_or((pivot, 0.0));
        if best_value < 1e-12 {
            return Err(ModelError::Numerical(
                "singular normal matrix (collinear or constant predictors)".to_string(),
            ));
        }
        a.swap(pivot, best_row);
        b.swap(pivot, best_row);

        for r in pivot + 1..dim {
            let factor = a[r][pivot] / a[pivot][pivot];
            for c in pivot..dim {
                a[r][c] -= factor * a[pivot][c];
            }
            b[r] -= factor * b[pivot];
        }
    }

    let mut solution = vec![0.0f64; dim];
    for i in (0..dim).rev() {
        let mut acc = b[i];
        for j in i + 1..dim {
            acc -= a[i][j] * solution[j];
        }
        solution[i] = acc / a[i][i];
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn fit_table() -> TimeSeriesTable {
        // water = 2 + 0.5 * air - 0.1 * rh, exactly
        let air = [10.0f64, 12.0, 14.0, 16.0, 18.0, 20.0];
        let rh = [50.0f64, 40.0, 60.0, 55.0, 45.0, 65.0];
        let water: Vec<f64> = air
            .iter()
            .zip(&rh)
            .map(|(a, r)| 2.0 + 0.5 * a - 0.1 * r)
            .collect();
        TimeSeriesTable::new(
            df!(
                "air_temp" => air.as_slice(),
                "rh" => rh.as_slice(),
                "water_temp" => water,
            )
            .unwrap(),
        )
    }

    #[test]
    fn fit_recovers_known_coefficients() -> Result<(), ModelError> {
        let model = FittedModel::fit()
            .table(&fit_table())
            .response("water_temp")
            .predictors(&["air_temp", "rh"])
            .call()?;

        assert!((model.intercept() - 2.0).abs() < 1e-8);
        assert!((model.coefficients()[0] - 0.5).abs() < 1e-8);
        assert!((model.coefficients()[1] + 0.1).abs() < 1e-8);
        assert!(model.r_squared() > 0.999);
        assert_eq!(model.n_observations(), 6);
        assert_eq!(model.predictors(), ["air_temp", "rh"]);
        Ok(())
    }

    #[test]
    fn null_rows_are_dropped_from_fit() -> Result<(), ModelError> {
        let table = TimeSeriesTable::new(
            df!(
                "air_temp" => [Some(10.0f64), None, Some(14.0), Some(16.0)],
                "water_temp" => [Some(7.0f64), Some(8.0), Some(9.0), Some(10.0)],
            )
            .unwrap(),
        );

        let model = FittedModel::fit()
            .table(&table)
            .response("water_temp")
            .predictors(&["air_temp"])
            .call()?;

        assert_eq!(model.n_observations(), 3);
        Ok(())
    }

    #[test]
    fn fail_policy_rejects_nulls() {
        let table = TimeSeriesTable::new(
            df!(
                "air_temp" => [Some(10.0f64), None, Some(14.0)],
                "water_temp" => [7.0f64, 8.0, 9.0],
            )
            .unwrap(),
        );

        let result = FittedModel::fit()
            .table(&table)
            .response("water_temp")
            .predictors(&["air_temp"])
            .null_policy(NullPolicy::Fail)
            .call();

        assert!(matches!(
            result,
            Err(ModelError::NullsInFit { nulls: 1, .. })
        ));
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let table = TimeSeriesTable::new(
            df!(
                "air_temp" => [10.0f64, 12.0],
                "rh" => [50.0f64, 40.0],
                "water_temp" => [7.0f64, 8.0],
            )
            .unwrap(),
        );

        let result = FittedModel::fit()
            .table(&table)
            .response("water_temp")
            .predictors(&["air_temp", "rh"])
            .call();

        assert!(matches!(
            result,
            Err(ModelError::InsufficientData {
                required: 3,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn collinear_predictors_are_a_numerical_error() {
        let table = TimeSeriesTable::new(
            df!(
                "a" => [1.0f64, 2.0, 3.0, 4.0],
                "b" => [2.0f64, 4.0, 6.0, 8.0],
                "y" => [1.0f64, 2.0, 3.0, 4.0],
            )
            .unwrap(),
        );

        let result = FittedModel::fit()
            .table(&table)
            .response("y")
            .predictors(&["a", "b"])
            .call();

        assert!(matches!(result, Err(ModelError::Numerical(_))));
    }

    #[test]
    fn missing_fit_column_is_a_table_error() {
        let result = FittedModel::fit()
            .table(&fit_table())
            .response("water_temp")
            .predictors(&["nope"])
            .call();

        assert!(matches!(result, Err(ModelError::Table(_))));
    }

    #[test]
    fn forecast_on_matching_predictors_succeeds() -> Result<(), ModelError> {
        let model = FittedModel::fit()
            .table(&fit_table())
            .response("water_temp")
            .predictors(&["air_temp", "rh"])
            .call()?;

        let future = TimeSeriesTable::new(
            df!(
                "air_temp" => [22.0f64, 24.0],
                "rh" => [50.0f64, 50.0],
            )
            .unwrap(),
        );

        let forecast = model.forecast(&future)?;
        assert_eq!(forecast.height(), 2);
        let values = forecast.column_f64("forecast")?;
        assert!((values[0].unwrap() - (2.0 + 0.5 * 22.0 - 0.1 * 50.0)).abs() < 1e-8);
        assert!((values[1].unwrap() - (2.0 + 0.5 * 24.0 - 0.1 * 50.0)).abs() < 1e-8);
        Ok(())
    }

    #[test]
    fn missing_predictor_at_forecast_is_schema_mismatch() {
        let model = FittedModel::fit()
            .table(&fit_table())
            .response("water_temp")
            .predictors(&["air_temp", "rh"])
            .call()
            .unwrap();

        let future = TimeSeriesTable::new(df!("air_temp" => [22.0f64]).unwrap());

        let result = model.forecast(&future);
        assert!(matches!(
            result,
            Err(ModelError::SchemaMismatch { column }) if column == "rh"
        ));
    }

    #[test]
    fn null_predictor_rows_forecast_null() -> Result<(), ModelError> {
        let model = FittedModel::fit()
            .table(&fit_table())
            .response("water_temp")
            .predictors(&["air_temp"])
            .call()?;

        let future = TimeSeriesTable::new(
            df!("air_temp" => [Some(22.0f64), None]).unwrap(),
        );

        let predictions = model.predict_rows(&future)?;
        assert!(predictions[0].is_some());
        assert!(predictions[1].is_none());
        Ok(())
    }

    #[test]
    fn model_round_trips_through_serde() {
        let model = FittedModel::fit()
            .table(&fit_table())
            .response("water_temp")
            .predictors(&["air_temp", "rh"])
            .call()
            .unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.predictors(), model.predictors());
        // JSON text can lose the last ulp of an f64.
        for (a, b) in restored.coefficients().iter().zip(model.coefficients()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((restored.intercept() - model.intercept()).abs() < 1e-12);
    }
}
