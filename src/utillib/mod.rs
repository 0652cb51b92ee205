//! Various utilities

pub mod get_terminal_width;
pub mod home;
pub mod logging;
