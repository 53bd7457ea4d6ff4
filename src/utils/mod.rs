//! Shared helpers: input limits, normalization and content hashing.

pub mod validation;
