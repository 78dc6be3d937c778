//! Headless client for an admin-managed blog.
//!
//! The crate is layered the usual way: `domain` holds post and upload types,
//! `application` holds the store, list query coordination, pagination and the
//! editor, and `infra` talks to the remote collection over HTTP.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
