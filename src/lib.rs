#![forbid(unsafe_code)]

pub mod api;
pub mod autosave;
pub mod cli;
pub mod library;
pub mod logging;
pub mod paginator;
pub mod progress;
pub mod reader;
pub mod tokenizer;
