#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod archive;
pub mod backup;
pub mod cli;
pub mod error;
pub mod hash;
pub mod paths;
pub mod present;
pub mod schedule;
pub mod storage;
pub mod stores;

mod format;
mod logger;
