// src/integrations/generator/mod.rs

pub mod client;

pub use client::HttpGenerationGateway;
