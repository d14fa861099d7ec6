//! Transform implementations for the housing and movie tables

mod coerce;
mod length_category;
mod unpivot;
mod vote_category;

pub use coerce::{CoerceTo, Coercion, DATE_FORMATS, DATETIME_FORMATS, OnInvalid};
pub use length_category::{
    AVG_LENGTH_FILM, DURATION_COLUMN, LENGTH_CATEGORY_COLUMN, LONG_FILM, LengthBranches,
    LengthCategorizer, NO_DATA, SHORT_FILM, length_category,
};
pub use unpivot::{DATE_COLUMN, LABEL_SEPARATOR, LONG_COLUMNS, Unpivot, split_label};
pub use vote_category::{
    AVERAGE, AVG_VOTE_COLUMN, EXCELLENT, MOVIE_CATEGORY_COLUMN, POOR, VoteCategorizer,
    movie_category, movie_category_case_sql,
};
