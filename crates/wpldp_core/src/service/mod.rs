//! Core entry points invoked by the host platform.
//!
//! # Responsibility
//! - Orchestrate store calls into the bootstrap, upgrade, save and site
//!   registration use-cases.
//! - Stay storage-agnostic: every service is generic over store contracts.

pub mod container_registry;
pub mod migration;
pub mod permalink;
pub mod resource_meta;
pub mod site_registry;
