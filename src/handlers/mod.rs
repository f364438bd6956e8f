// src/handlers/mod.rs

pub mod render;
pub mod sanitize;
