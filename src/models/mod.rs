//! Core data models for the conversion pipeline.
//!
//! These types describe the inbound trigger payload, the identifiers derived
//! from it, the wire shapes of the remote conversion API and the structured
//! report produced for each invocation. They serialize naturally as JSON via
//! `serde`.

pub mod conversion;
pub mod event;
pub mod image;
pub mod report;
