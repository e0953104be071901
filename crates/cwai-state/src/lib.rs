//! Client-side state for the analysis screen.
//!
//! - [`form`]: field values, validation, selection rules
//! - [`resolve`]: mapping a selection to the backend's numeric target id
//! - [`controller`]: the submit → trigger → fetch-report lifecycle
//! - [`session`]: async drivers that feed API results back as events
//! - [`view`]: read-only projection of a report for rendering

pub mod controller;
pub mod form;
pub mod resolve;
pub mod session;
pub mod view;

pub use controller::*;
pub use form::*;
pub use resolve::RemoteCatalog;
pub use session::{drive_submission, fetch_report, load_catalogs, load_recent_reports, AnalysisEvent};
pub use view::*;
