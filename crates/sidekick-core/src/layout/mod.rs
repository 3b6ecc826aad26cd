//! Panel layout domain module.

mod width;

pub use width::{ResizeStep, WidthCandidates, WidthReconciler};
