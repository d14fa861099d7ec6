//! Movie quality category derived from `avg_vote`
//!
//! The movie extraction query computes this column server side with a
//! `CASE` expression generated by [`movie_category_case_sql`]. The same
//! thresholds back [`movie_category`] and [`VoteCategorizer`], which fills
//! the column in after the fetch when a source did not provide it.

use crate::etl::Transformer;
use crate::table::{Table, Value};
use eyre::Result;

pub const AVG_VOTE_COLUMN: &str = "avg_vote";
pub const MOVIE_CATEGORY_COLUMN: &str = "movie_category";

/// Votes at or below this are `Poor`
pub const POOR_MAX: f64 = 3.0;
/// Votes at or above this are `Excellent`
pub const EXCELLENT_MIN: f64 = 7.0;

pub const POOR: &str = "Poor";
pub const AVERAGE: &str = "Average";
pub const EXCELLENT: &str = "Excellent";

/// Category for an average vote; `None` for a missing vote
pub fn movie_category(avg_vote: Option<f64>) -> Option<&'static str> {
    let v = avg_vote?;
    if v <= POOR_MAX {
        Some(POOR)
    } else if v < EXCELLENT_MIN {
        Some(AVERAGE)
    } else {
        Some(EXCELLENT)
    }
}

/// SQL `CASE` expression equivalent to [`movie_category`]
pub fn movie_category_case_sql() -> String {
    format!(
        "CASE \
            WHEN {col} <= {poor} THEN '{POOR}' \
            WHEN {col} > {poor} AND {col} < {excellent} THEN '{AVERAGE}' \
            WHEN {col} >= {excellent} THEN '{EXCELLENT}' \
        END AS {MOVIE_CATEGORY_COLUMN}",
        col = AVG_VOTE_COLUMN,
        poor = POOR_MAX,
        excellent = EXCELLENT_MIN,
    )
}

/// Transformer adding `movie_category` when the table lacks it
///
/// Tables that already carry the column (from the query) pass through
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteCategorizer;

impl Transformer for VoteCategorizer {
    fn transform(&self, mut input: Table) -> Result<Table> {
        if input.column_index(MOVIE_CATEGORY_COLUMN).is_some() {
            return Ok(input);
        }

        log::debug!("Deriving {} from {}", MOVIE_CATEGORY_COLUMN, AVG_VOTE_COLUMN);
        let vote = input.require_column(AVG_VOTE_COLUMN)?;
        input.push_column(MOVIE_CATEGORY_COLUMN, |row| {
            Value::from(movie_category(row[vote].as_f64()))
        });
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_thresholds() {
        let categories: Vec<Option<&str>> = [1.0, 3.0, 5.0, 7.0, 9.0]
            .into_iter()
            .map(|v| movie_category(Some(v)))
            .collect();
        assert_eq!(
            categories,
            vec![Some(POOR), Some(POOR), Some(AVERAGE), Some(EXCELLENT), Some(EXCELLENT)]
        );
        assert_eq!(movie_category(Some(3.1)), Some(AVERAGE));
        assert_eq!(movie_category(Some(6.9)), Some(AVERAGE));
        assert_eq!(movie_category(None), None);
    }

    #[test]
    fn test_case_sql() {
        let sql = movie_category_case_sql();
        assert!(sql.contains("WHEN avg_vote <= 3 THEN 'Poor'"));
        assert!(sql.contains("WHEN avg_vote > 3 AND avg_vote < 7 THEN 'Average'"));
        assert!(sql.contains("WHEN avg_vote >= 7 THEN 'Excellent'"));
        assert!(sql.ends_with("END AS movie_category"));
    }

    #[test]
    fn test_derives_when_absent() {
        let table = Table::from_rows(
            vec!["title".into(), "avg_vote".into()],
            vec![
                vec!["A".into(), Value::Float(2.5)],
                vec!["B".into(), Value::Null],
            ],
        )
        .unwrap();

        let out = VoteCategorizer.transform(table).unwrap();
        assert_eq!(out.rows()[0][2], Value::from(POOR));
        assert!(out.rows()[1][2].is_null());
    }

    #[test]
    fn test_keeps_query_column() {
        let table = Table::from_rows(
            vec!["avg_vote".into(), "movie_category".into()],
            vec![vec![Value::Float(9.0), "Excellent".into()]],
        )
        .unwrap();

        let out = VoteCategorizer.transform(table.clone()).unwrap();
        assert_eq!(out, table);
    }
}
