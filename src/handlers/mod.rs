// src/handlers/mod.rs

pub mod content;
pub mod favicon;
