//! # Row Normalization
//!
//! Stored tables keep progress as a fraction in [0, 1] and dates as
//! `YYYY-MM-DD` text. [`normalize_for_ingest`] brings a decoded table into
//! that form once, at the upload boundary. Rendering goes through
//! [`normalize_for_display`], which produces a separate [`TaskView`] with
//! whole percentages and never touches the stored table.

mod display;
mod ingest;
mod progress;

pub use display::filter_for_display;
pub use display::normalize_for_display;
pub use display::ProgressColor;
pub use display::TaskRow;
pub use display::TaskView;
pub use ingest::normalize_for_ingest;
pub(crate) use progress::fraction_from_text;
pub use progress::parse_percentage;
pub use progress::update_progress;
