// src/middleware/mod.rs

pub mod params;

pub use params::sanitize_params;
