//! Database access shared by several handlers.

pub mod attendance;
pub mod employee;
pub mod leave;
