//! HTTP API

pub mod health;
pub mod review;
pub mod route;
