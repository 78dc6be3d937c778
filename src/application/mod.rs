//! Application layer: remote seam, shared post store, list queries and the editor.

pub mod actions;
pub mod api;
pub mod editor;
pub mod error;
pub(crate) mod lock;
pub mod notify;
pub mod pagination;
pub mod query;
pub mod store;
