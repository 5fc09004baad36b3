// src/models/mod.rs

pub mod grade;
pub mod quiz;
pub mod score;
pub mod user;
