//! Application services layer.

pub mod feed;
pub mod merge;
pub mod profile;
pub mod repos;
