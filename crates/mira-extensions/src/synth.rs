//! Route synthesis.
//!
//! Each descriptor yields a primary route and, when it carries both an owner
//! and an original path, two redirecting aliases:
//!
//! | route                    | path                                   |
//! |--------------------------|----------------------------------------|
//! | `<name>`                 | `<path>`                               |
//! | `<name>_alias`           | `<alias prefix>/<owner><originalPath>` |
//! | `<name>_simple_alias`    | `<originalPath>`                       |

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{defaults, ExtensionConfig};
use crate::descriptor::ExtensionDescriptor;
use crate::mount::{RouteMeta, RouteRecord, RouteTarget};
use crate::resolver::UnitResolver;

/// Suffix of the namespaced alias route name.
pub const ALIAS_SUFFIX: &str = "_alias";
/// Suffix of the bare alias route name.
pub const SIMPLE_ALIAS_SUFFIX: &str = "_simple_alias";

/// A route synthesized from an extension descriptor.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub name: String,
    pub path: String,
    pub target: RouteTarget,
    pub meta: RouteMeta,
}

impl ResolvedRoute {
    pub fn is_alias(&self) -> bool {
        self.meta.is_alias
    }

    pub fn group_tag(&self) -> &str {
        self.meta.extension_group.as_deref().unwrap_or("")
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    /// Redirect target for aliases.
    pub fn redirect(&self) -> Option<&str> {
        match &self.target {
            RouteTarget::Redirect(path) => Some(path),
            _ => None,
        }
    }
}

impl From<ResolvedRoute> for RouteRecord {
    fn from(route: ResolvedRoute) -> Self {
        RouteRecord {
            name: route.name,
            path: route.path,
            target: Some(route.target),
            meta: route.meta,
            children: Vec::new(),
        }
    }
}

/// What an alias collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionKind {
    /// Another route already uses the alias's name.
    Name,
    /// Another route already serves the alias's path.
    Path,
}

/// An alias dropped because its name or path was already taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasCollision {
    pub alias_name: String,
    pub path: String,
    pub existing_route: String,
    pub kind: CollisionKind,
}

/// Output of [`RouteSynthesizer::synthesize_batch`].
#[derive(Debug, Default)]
pub struct SynthesisBatch {
    pub routes: Vec<ResolvedRoute>,
    pub collisions: Vec<AliasCollision>,
}

/// Builds route entries from descriptors.
#[derive(Clone)]
pub struct RouteSynthesizer {
    resolver: UnitResolver,
    alias_prefix: String,
}

impl RouteSynthesizer {
    pub fn new(resolver: UnitResolver) -> Self {
        Self {
            resolver,
            alias_prefix: defaults::ALIAS_PREFIX.to_string(),
        }
    }

    pub fn from_config(resolver: UnitResolver, config: &ExtensionConfig) -> Self {
        Self::new(resolver).with_alias_prefix(config.alias_prefix.clone())
    }

    pub fn with_alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.alias_prefix = crate::config::normalize_base_url(&prefix.into());
        self
    }

    pub fn resolver(&self) -> &UnitResolver {
        &self.resolver
    }

    /// Routes for one descriptor: the primary entry plus any aliases.
    pub fn synthesize(&self, descriptor: &ExtensionDescriptor) -> Vec<ResolvedRoute> {
        let base_meta = base_meta(descriptor);

        let mut routes = vec![ResolvedRoute {
            name: descriptor.name.clone(),
            path: descriptor.path.clone(),
            target: RouteTarget::Extension(self.resolver.resolve(descriptor)),
            meta: RouteMeta {
                hide_in_menu: true,
                hide_in_tab: false,
                ..base_meta.clone()
            },
        }];

        if let Some((owner, original)) = descriptor.alias_source() {
            let original = absolute_path(original);
            let alias_meta = RouteMeta {
                hide_in_menu: true,
                hide_in_tab: true,
                is_alias: true,
                ..base_meta
            };

            routes.push(ResolvedRoute {
                name: format!("{}{}", descriptor.name, ALIAS_SUFFIX),
                path: format!("{}/{}{}", self.alias_prefix, owner, original),
                target: RouteTarget::Redirect(descriptor.path.clone()),
                meta: alias_meta.clone(),
            });
            routes.push(ResolvedRoute {
                name: format!("{}{}", descriptor.name, SIMPLE_ALIAS_SUFFIX),
                path: original,
                target: RouteTarget::Redirect(descriptor.path.clone()),
                meta: RouteMeta {
                    is_simple_alias: true,
                    ..alias_meta
                },
            });
        }

        routes
    }

    /// Synthesize a fetched batch.
    ///
    /// Descriptors sharing a name collapse to the last one, keeping the first
    /// one's position. Primary routes are always kept; an alias whose name or
    /// path is already claimed by an earlier route is dropped and reported.
    pub fn synthesize_batch(&self, descriptors: Vec<ExtensionDescriptor>) -> SynthesisBatch {
        self.synthesize_batch_for_host(descriptors, &[])
    }

    /// Like [`synthesize_batch`](Self::synthesize_batch), with every name and
    /// path in `host_routes` claimed up front so aliases cannot shadow them.
    pub fn synthesize_batch_for_host(
        &self,
        descriptors: Vec<ExtensionDescriptor>,
        host_routes: &[RouteRecord],
    ) -> SynthesisBatch {
        let mut by_name: IndexMap<String, ExtensionDescriptor> = IndexMap::new();
        for descriptor in descriptors {
            if let Some(previous) = by_name.insert(descriptor.name.clone(), descriptor) {
                tracing::warn!(
                    "Duplicate extension route name {}, keeping the last definition",
                    previous.name
                );
            }
        }

        let mut claims = Claims::default();
        for route in host_routes {
            claims.claim_host(route);
        }

        for descriptor in by_name.values() {
            if let Some(owner) = claims.paths.get(&descriptor.path) {
                tracing::warn!(
                    "Extension routes {} and {} share path {}",
                    owner,
                    descriptor.name,
                    descriptor.path
                );
            } else {
                claims
                    .paths
                    .insert(descriptor.path.clone(), descriptor.name.clone());
            }
            if !claims.names.insert(descriptor.name.clone()) {
                tracing::warn!(
                    "Extension route {} shares its name with a host route",
                    descriptor.name
                );
            }
        }

        let mut batch = SynthesisBatch::default();
        for descriptor in by_name.values() {
            for route in self.synthesize(descriptor) {
                if route.is_alias() {
                    if let Some(collision) = claims.conflict(&route) {
                        tracing::warn!(
                            "Alias {} collides with {} ({:?} at {}), skipping",
                            route.name,
                            collision.existing_route,
                            collision.kind,
                            route.path
                        );
                        batch.collisions.push(collision);
                        continue;
                    }
                    claims.paths.insert(route.path.clone(), route.name.clone());
                    claims.names.insert(route.name.clone());
                }
                batch.routes.push(route);
            }
        }

        tracing::debug!(
            "Synthesized {} routes from {} descriptors ({} alias collisions)",
            batch.routes.len(),
            by_name.len(),
            batch.collisions.len()
        );
        batch
    }
}

/// Names and paths already taken while synthesizing a batch.
#[derive(Default)]
struct Claims {
    paths: HashMap<String, String>,
    names: HashSet<String>,
}

impl Claims {
    fn claim_host(&mut self, route: &RouteRecord) {
        self.names.insert(route.name.clone());
        self.paths
            .entry(route.path.clone())
            .or_insert_with(|| route.name.clone());
        for child in &route.children {
            self.claim_host(child);
        }
    }

    fn conflict(&self, route: &ResolvedRoute) -> Option<AliasCollision> {
        if self.names.contains(&route.name) {
            return Some(AliasCollision {
                alias_name: route.name.clone(),
                path: route.path.clone(),
                existing_route: route.name.clone(),
                kind: CollisionKind::Name,
            });
        }
        self.paths.get(&route.path).map(|existing| AliasCollision {
            alias_name: route.name.clone(),
            path: route.path.clone(),
            existing_route: existing.clone(),
            kind: CollisionKind::Path,
        })
    }
}

fn base_meta(descriptor: &ExtensionDescriptor) -> RouteMeta {
    let presentation = &descriptor.presentation;
    RouteMeta {
        title: presentation.title.clone(),
        icon: presentation.icon.clone(),
        order: presentation.order,
        affix_tab: presentation.affix_tab,
        roles: presentation.required_roles.clone(),
        is_extension: true,
        extension_group: Some(descriptor.group.clone()),
        ..RouteMeta::default()
    }
}

fn absolute_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
