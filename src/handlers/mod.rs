// src/handlers/mod.rs

pub mod params;
pub mod policy;
pub mod sanitize;
