//! Read-only view models handed to the presentation layer.

pub mod providers;

pub use providers::{ProviderRow, ProvidersView, StatusIndicator, SubmitAction};
