#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod admission;
pub mod catalog;
pub mod config;
pub mod daemon;
#[doc(hidden)]
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod generator;
pub mod inspector;
pub mod schedule;

pub use admission::{AdmissionController, CheckState};
pub use config::Config;
pub use error::{AdmissionError, Result};
