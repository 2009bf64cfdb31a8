//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, cache, and tree builder into application-facing
//!   family operations.
//! - Keep presentation-layer callers decoupled from storage details.

pub mod family_service;
