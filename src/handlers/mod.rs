// src/handlers/mod.rs

pub mod attendance;
pub mod auth;
pub mod exam;
pub mod material;
pub mod quiz;
