//! Film length category derived from `duration` (minutes)

use crate::etl::Transformer;
use crate::table::{Table, Value};
use eyre::Result;

pub const DURATION_COLUMN: &str = "duration";
pub const LENGTH_CATEGORY_COLUMN: &str = "length_category";

pub const SHORT_FILM: &str = "Short Film";
pub const AVG_LENGTH_FILM: &str = "Avg. Length Film";
pub const LONG_FILM: &str = "Long Film";
pub const NO_DATA: &str = "No Data";

/// Which threshold ladder to apply
///
/// The historical ladder repeats the `< 120` test for `Long Film`, so that
/// branch can never match and everything from 120 minutes up is `No Data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthBranches {
    /// `< 60`, `< 120`, `< 120` (unreachable), else `No Data`
    #[default]
    AsWritten,
    /// `< 60`, `< 120`, `< 180`, else `No Data`
    LongFilmBelow180,
}

impl LengthBranches {
    fn long_film_below(self) -> f64 {
        match self {
            Self::AsWritten => 120.0,
            Self::LongFilmBelow180 => 180.0,
        }
    }
}

/// Label a duration in minutes
///
/// A missing duration compares false against every threshold and falls
/// through to `No Data`.
pub fn length_category(duration: Option<f64>, branches: LengthBranches) -> &'static str {
    let Some(d) = duration else {
        return NO_DATA;
    };

    if d < 60.0 {
        SHORT_FILM
    } else if d < 120.0 {
        AVG_LENGTH_FILM
    } else if d < branches.long_film_below() {
        LONG_FILM
    } else {
        NO_DATA
    }
}

/// Transformer appending `length_category` to a movie table
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthCategorizer {
    branches: LengthBranches,
}

impl LengthCategorizer {
    pub fn new(branches: LengthBranches) -> Self {
        Self { branches }
    }
}

impl Transformer for LengthCategorizer {
    fn transform(&self, mut input: Table) -> Result<Table> {
        let duration = input.require_column(DURATION_COLUMN)?;
        let branches = self.branches;
        input.push_column(LENGTH_CATEGORY_COLUMN, |row| {
            Value::from(length_category(row[duration].as_f64(), branches))
        });
        Ok(input)
    }
}
