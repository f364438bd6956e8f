// src/utils/mod.rs

pub mod cache;
pub mod html;
pub mod policy;
