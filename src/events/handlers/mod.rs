// src/events/handlers/mod.rs
//
// Event Handlers - INTERNAL MODULE
//
// Handlers use closure-based subscription via EventBus::subscribe.
// Only the registration functions are exported.

pub mod tier_tracking_handler;

pub use tier_tracking_handler::register_tier_tracking_handlers;
