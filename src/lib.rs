pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod figure;
pub mod figure_builder;
pub mod projection;
pub mod server;
pub mod types;

pub use dashboard::{Dashboard, FigurePair, NO_DATA_SENTINEL};
pub use data::Dataset;
pub use error::{FigureError, FigureResult};
pub use figure::FigureDescription;
pub use figure_builder::{build_figure, build_figure_with};
pub use types::{ChangeClass, Record, ViewMode};
