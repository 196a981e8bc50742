//! Infrastructure adapters: Postgres stores and telemetry bootstrap.

pub mod db;
pub mod error;
pub mod telemetry;
