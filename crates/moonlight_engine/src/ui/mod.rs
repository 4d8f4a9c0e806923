//! Debug inspection
//!
//! The engine hands an [`InspectorView`] to the active [`Inspector`] once per
//! frame, after the application update. Inspectors may read and change
//! anything in the view.

mod inspector;

pub use inspector::{Inspector, InspectorConfig, InspectorView, LogInspector};
