pub mod batch;
pub mod config_file;
pub mod ctx;
pub mod samples;
pub mod serde;
pub mod service;
pub mod stats;
pub mod utillib;
