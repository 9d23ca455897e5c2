// src/models/mod.rs

pub mod attendance;
pub mod exam;
pub mod material;
pub mod notification;
pub mod result;
pub mod user;
