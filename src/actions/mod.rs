//! Supported apps: parameter schemas and deep link handlers

pub mod catalog;
pub mod deeplink;

pub use catalog::{spec_for, AppSpec, ParamSpec};
pub use deeplink::{handler_for, Handler};
