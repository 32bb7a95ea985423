//! Core domain logic for imchef.
//!
//! This crate walks the content API hierarchy, classifies lesson resources
//! into documents and assembles the resulting channel tree on disk
//! (e.g., `run_chef`).

pub mod assembler;
pub mod capability;
pub mod classify;
pub mod pipeline;
pub mod records;
pub mod resources;
pub mod walker;

#[cfg(test)]
mod fixture;
