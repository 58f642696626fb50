//! Domain types for FutLab

pub mod bar;
pub mod feature;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use feature::FeatureBar;
pub use portfolio::Portfolio;
pub use position::{Position, Side};
pub use trade::{ExitKind, ExitRecord};
