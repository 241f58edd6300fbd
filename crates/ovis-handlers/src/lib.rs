//! Ovis Handler Library
//!
//! The contract between the workflow engine and the units of work it runs.
//!
//! This crate provides:
//! - The `Handler` trait and a string-keyed `HandlerRegistry`
//! - Typed accessors over resolved parameters
//! - Built-in handlers: echo, shell, http, prompt
//! - Jinja2-compatible prompt rendering

pub mod error;
pub mod handlers;
pub mod params;
pub mod registry;
pub mod template;

pub use error::HandlerError;
pub use handlers::{create_default_registry, HandlerSettings};
pub use params::{ParamsExt, Parameters};
pub use registry::{handler_fn, FnHandler, Handler, HandlerRegistry};
pub use template::TemplateEngine;
