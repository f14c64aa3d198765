pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod storage;

pub use application::{AppError, FacilityAdmin};
pub use domain::*;
