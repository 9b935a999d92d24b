//! Imputation module for handling missing values.
//!
//! Numeric columns are filled with their median (0 when a column has no
//! values at all). Text columns never reach this stage with gaps because
//! normalization already wrote `Unknown` into them; date columns keep theirs.

mod statistical;

pub use statistical::StatisticalImputer;
