//! Data Transfer Objects for the script service API.

pub mod response;

pub use response::*;
