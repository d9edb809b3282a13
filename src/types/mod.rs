//! Core data types: input regions, graph nodes and track records

pub mod node;
pub mod region;
pub mod track;
