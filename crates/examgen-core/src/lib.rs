//! # examgen-core
//!
//! Core types for the examgen question bank.
//!
//! This crate provides the foundational types shared by the storage and
//! configuration crates:
//! - Entity structs for the Subject → Topic → Question → Answer-Option
//!   hierarchy and the generated `Test` aggregate
//! - The [`entities::Entity`] capability (identity, in-place update, validation)
//! - Grade level enum with its storage encoding
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;

pub use errors::CoreError;

/// Identity value carried by entities that have not been stored yet.
///
/// The store assigns positive row ids on insert.
pub const UNASSIGNED_ID: i64 = 0;
