// src/models/mod.rs

pub mod declaration;
pub mod field;
pub mod record;
pub mod source;
pub mod visibility;
