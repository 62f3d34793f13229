#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod channels;
pub mod cipher;
pub mod cli;
pub mod config;
pub mod daemon;
#[doc(hidden)]
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod keywords;
pub mod llm;
pub mod persona;
pub mod prompt;
pub mod router;
pub mod scheduler;
pub mod secret;

pub use config::Config;
pub use error::RecError;
