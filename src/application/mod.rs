// src/application/mod.rs
//
// Application Layer
//
// ARCHITECTURE:
// - This layer sits ABOVE the services
// - It provides the boundary between callers (CLI, UIs) and the services
// - It translates between DTOs and domain entities
// - It maps internal errors to caller-facing responses

pub mod dto;
pub mod engine;
pub mod error_handling;

pub use dto::*;
pub use engine::{DeckEngine, UnlockedTier};
pub use error_handling::{ErrorResponse, ErrorType, ToErrorResponse};
