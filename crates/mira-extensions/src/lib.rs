//! Runtime extension routing for Mira.
//!
//! Extensions are route + UI descriptors served by a remote registry. This crate
//! turns them into host route records without any build-time link to the
//! extension code.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   descriptors   ┌──────────────────┐
//! │ DescriptorFetcher│ ──────────────▶ │ RouteSynthesizer │──┐
//! └──────────────────┘                 └──────────────────┘  │ uses
//!                                               │            ▼
//!                                               │     ┌──────────────┐
//!                                               │     │ UnitResolver │
//!                                               ▼     └──────────────┘
//!                                      ┌──────────────┐
//!                                      │ order_routes │
//!                                      └──────────────┘
//!                                               │
//!                                               ▼
//!                                     ┌─────────────────┐
//!                                     │ MountIntegrator │ ─▶ host route tree
//!                                     └─────────────────┘
//! ```
//!
//! Every stage is fail-soft: a broken extension degrades into a diagnostic
//! panel on its own tab, and a broken registry means "no extensions", never a
//! failed host boot.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mira_extensions::prelude::*;
//!
//! let config = ExtensionConfig::from_env();
//! let pipeline = ExtensionPipeline::from_config(&config)?;
//! let mut routes = mira_extensions::mount::default_host_routes();
//! let report = pipeline.generate(&mut routes).await;
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod fetcher;
pub mod mount;
pub mod order;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod synth;

pub use descriptor::{Builder, ExtensionDescriptor, Presentation, RenderSpec};
pub use error::{ExtensionError, Result};
pub use fetcher::{CollectionSummary, DescriptorFetcher, DescriptorSource, HttpDescriptorSource};
pub use mount::{IntegrationOutcome, MountIntegrator, RouteMeta, RouteRecord, RouteTarget};
pub use order::order_routes;
pub use pipeline::{ExtensionPipeline, PipelineReport};
pub use render::{RenderInstruction, RenderNode};
pub use resolver::{
    Component, ComponentRegistry, DynComponent, HttpModuleLoader, InMemoryComponentRegistry,
    LazyUnit, ModuleLoader, RecordingModuleLoader, RenderUnit, ScriptRegistry, UnitResolver,
};
pub use synth::{AliasCollision, CollisionKind, ResolvedRoute, RouteSynthesizer, SynthesisBatch};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::ExtensionConfig;
    pub use crate::descriptor::{ExtensionDescriptor, Presentation, RenderSpec};
    pub use crate::error::{ExtensionError, Result};
    pub use crate::fetcher::{DescriptorFetcher, DescriptorSource};
    pub use crate::mount::{MountIntegrator, RouteRecord};
    pub use crate::order::order_routes;
    pub use crate::pipeline::ExtensionPipeline;
    pub use crate::render::RenderInstruction;
    pub use crate::resolver::{ComponentRegistry, ModuleLoader, UnitResolver};
    pub use crate::synth::{ResolvedRoute, RouteSynthesizer};
}
