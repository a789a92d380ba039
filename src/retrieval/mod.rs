pub mod aot;
pub mod cell;
pub mod correction;
pub mod field;
pub mod gap_fill;
pub mod merit;
pub mod reference;
pub mod smoothing;
pub mod visibility;

pub use aot::{AotReferenceGrid, VisibilityToAot};
pub use cell::{Cell, CellGrid, CellRect, CellStatistics};
pub use correction::{CellCorrection, CorrectionSettings, correct_cell};
pub use field::{VisibilityField, is_valid_visibility};
pub use gap_fill::gap_fill;
pub use smoothing::smooth_visibility;
pub use visibility::{CellEstimate, VisibilityEstimator, VisibilitySettings};
