// src/error/mod.rs
//
// Error types shared by every layer

pub mod types;

pub use types::{AppError, AppResult, GenerationError, GenerationResult};
