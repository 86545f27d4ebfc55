//! Domain model for containers, resources and remote sites.
//!
//! # Responsibility
//! - Define the records exchanged between stores and core services.
//! - Hold the fixed container catalog and persisted record shapes.
//!
//! # Invariants
//! - Containers and sites are both categories, told apart by taxonomy.
//! - The container slug set is fixed at build time.

pub mod category;
pub mod container;
pub mod resource;
pub mod site;
