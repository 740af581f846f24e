// src/integrations/mod.rs
//
// External Integrations Module
//
// - gateway: the generation service contract and its streaming types
// - generator: HTTP implementation of the gateway
// - topics: candidate child-topic names from an outside source
// - hierarchy: pre-built deck hierarchy

pub mod gateway;
pub mod generator;
pub mod hierarchy;
pub mod topics;

pub use gateway::{
    card_stream, collect_stream, stream_from_cards, CardBodyRequest, CardSender, CardStream,
    GenerationEvent, GenerationGateway, SubDeckListing, SubDeckRequest, TierRequest,
};
pub use generator::HttpGenerationGateway;
pub use hierarchy::{HierarchyEntry, HierarchySource, JsonHierarchy};
pub use topics::{NoTopicProvider, TopicProvider};
