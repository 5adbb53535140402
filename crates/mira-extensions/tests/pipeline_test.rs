//! Extension Pipeline Tests
//!
//! End-to-end generation against a stub descriptor source:
//! - the Gallery route set (primary plus two redirecting aliases)
//! - registry failure leaves the host tree untouched
//! - static children keep their identity and position
//! - ordering across a mixed batch
//! - alias collisions with host routes and with other route names

use std::sync::Arc;

use async_trait::async_trait;
use mira_extensions::descriptor::ExtensionDescriptor;
use mira_extensions::fetcher::{DescriptorFetcher, DescriptorSource};
use mira_extensions::mount::{default_host_routes, find_route, IntegrationOutcome, MountIntegrator, RouteTarget};
use mira_extensions::resolver::{InMemoryComponentRegistry, RecordingModuleLoader, ScriptRegistry, UnitResolver};
use mira_extensions::synth::RouteSynthesizer;
use mira_extensions::{CollisionKind, ExtensionError, ExtensionPipeline, Result};
use serde_json::json;

struct StubSource {
    routes: Result<Vec<ExtensionDescriptor>>,
}

#[async_trait]
impl DescriptorSource for StubSource {
    async fn list_routes(&self) -> Result<Vec<ExtensionDescriptor>> {
        self.routes.clone()
    }

    async fn list_routes_by_collection(&self, collection_id: &str) -> Result<Vec<ExtensionDescriptor>> {
        self.routes.clone().map(|routes| {
            routes
                .into_iter()
                .filter(|d| d.collection_id.as_deref() == Some(collection_id))
                .collect()
        })
    }
}

fn pipeline(routes: Result<Vec<ExtensionDescriptor>>) -> (ExtensionPipeline, Arc<RecordingModuleLoader>) {
    let loader = Arc::new(RecordingModuleLoader::new());
    let resolver = UnitResolver::new(
        "http://assets.local/plugins",
        loader.clone(),
        Arc::new(InMemoryComponentRegistry::new()),
        Arc::new(ScriptRegistry::new()),
    );
    let pipeline = ExtensionPipeline::new(
        DescriptorFetcher::new(Arc::new(StubSource { routes })),
        RouteSynthesizer::new(resolver),
        MountIntegrator::default(),
    );
    (pipeline, loader)
}

fn gallery() -> ExtensionDescriptor {
    serde_json::from_value(json!({
        "name": "Gallery",
        "group": "media",
        "path": "/ext/lib42/gallery",
        "originalPath": "/gallery",
        "ownerName": "photoPlugin",
        "collectionId": "lib42",
        "component": "view.js",
        "presentation": {"title": "Gallery", "order": 5}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_gallery_routes_are_mounted() {
    let (pipeline, loader) = pipeline(Ok(vec![gallery()]));
    let mut routes = default_host_routes();

    let report = pipeline.generate(&mut routes).await;
    assert_eq!(report.descriptors, 1);
    assert_eq!(report.routes, 3);
    assert!(report.collisions.is_empty());
    assert_eq!(report.outcome, IntegrationOutcome::Mounted { count: 3 });

    let primary = find_route(&routes, "Gallery").unwrap();
    assert_eq!(primary.path, "/ext/lib42/gallery");
    assert!(primary.meta.hide_in_menu);
    assert!(!primary.meta.hide_in_tab);
    assert!(primary.meta.is_extension);
    assert_eq!(primary.meta.extension_group.as_deref(), Some("media"));

    let alias = find_route(&routes, "Gallery_alias").unwrap();
    assert_eq!(alias.path, "/ext/plugin/photoPlugin/gallery");
    assert!(matches!(&alias.target, Some(RouteTarget::Redirect(p)) if p == "/ext/lib42/gallery"));
    assert!(alias.meta.is_alias && alias.meta.hide_in_tab && alias.meta.hide_in_menu);
    assert!(!alias.meta.is_simple_alias);

    let simple = find_route(&routes, "Gallery_simple_alias").unwrap();
    assert_eq!(simple.path, "/gallery");
    assert!(matches!(&simple.target, Some(RouteTarget::Redirect(p)) if p == "/ext/lib42/gallery"));
    assert!(simple.meta.is_simple_alias);

    // Nothing is loaded until the route is visited.
    assert!(loader.injected().is_empty());
    let unit = primary.extension_unit().unwrap().load().await;
    assert_eq!(unit.kind(), "bridge");
    assert_eq!(
        loader.injected(),
        vec!["http://assets.local/plugins/lib42/photoPlugin/view.js"]
    );
}

#[tokio::test]
async fn test_registry_failure_leaves_host_untouched() {
    let (pipeline, _) = pipeline(Err(ExtensionError::HttpStatus {
        status: 500,
        url: "http://registry/api/extension-routes".to_string(),
    }));
    let mut routes = default_host_routes();
    let before: Vec<String> = routes[0].children.iter().map(|c| c.name.clone()).collect();

    let report = pipeline.generate(&mut routes).await;
    assert_eq!(report.descriptors, 0);
    assert_eq!(report.outcome, IntegrationOutcome::Empty);

    let after: Vec<String> = routes[0].children.iter().map(|c| c.name.clone()).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_static_children_keep_identity() {
    let descriptors = (0..5)
        .map(|i| ExtensionDescriptor::new(format!("Ext{}", i), format!("/ext/e{}", i)).with_title(format!("E{}", i)))
        .collect();
    let (pipeline, _) = pipeline(Ok(descriptors));
    let mut routes = default_host_routes();
    let before: Vec<(String, String)> = routes[0]
        .children
        .iter()
        .map(|c| (c.name.clone(), c.path.clone()))
        .collect();

    pipeline.generate(&mut routes).await;

    let mira = &routes[0];
    assert_eq!(mira.children.len(), before.len() + 5);
    let prefix: Vec<(String, String)> = mira.children[..before.len()]
        .iter()
        .map(|c| (c.name.clone(), c.path.clone()))
        .collect();
    assert_eq!(prefix, before);
    assert!(mira.children[before.len()..].iter().all(|c| c.meta.is_extension));
}

#[tokio::test]
async fn test_missing_mount_point_keeps_static_routes() {
    let (pipeline, _) = pipeline(Ok(vec![gallery()]));
    let mut routes = vec![mira_extensions::RouteRecord::view("Home", "/", "views/home")];

    let report = pipeline.generate(&mut routes).await;
    assert_eq!(report.outcome, IntegrationOutcome::MountPointMissing("Mira".to_string()));
    assert_eq!(routes.len(), 1);
    assert!(routes[0].children.is_empty());
}

#[tokio::test]
async fn test_loaded_routes_are_ordered() {
    let (pipeline, _) = pipeline(Ok(vec![
        ExtensionDescriptor::new("Late", "/ext/late").with_title("Late"),
        ExtensionDescriptor::new("Zed", "/ext/zed").with_group("b").with_title("Zed").with_order(1.0),
        ExtensionDescriptor::new("Alpha", "/ext/alpha").with_group("b").with_title("alpha").with_order(1.0),
        ExtensionDescriptor::new("First", "/ext/first").with_group("a").with_title("First").with_order(1.0),
    ]));

    let (routes, _, _) = pipeline.load_routes().await;
    let names: Vec<&str> = routes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Alpha", "Zed", "Late"]);
}

#[tokio::test]
async fn test_fetch_by_collection_through_pipeline() {
    let (pipeline, _) = pipeline(Ok(vec![gallery(), ExtensionDescriptor::new("Other", "/ext/other")]));
    let scoped = pipeline.fetcher().fetch_by_collection("lib42").await;
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].name, "Gallery");
}

#[tokio::test]
async fn test_simple_alias_cannot_shadow_host_route() {
    let shadow: ExtensionDescriptor = serde_json::from_value(json!({
        "name": "Shadow",
        "path": "/ext/lib9/shadow",
        "originalPath": "/mira/admin",
        "ownerName": "shadowPlugin",
        "meta": {"title": null}
    }))
    .unwrap();
    let (pipeline, _) = pipeline(Ok(vec![shadow]));
    let mut routes = default_host_routes();

    let report = pipeline.generate(&mut routes).await;
    assert_eq!(report.outcome, IntegrationOutcome::Mounted { count: 2 });
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].existing_route, "MiraAdmin");
    assert_eq!(report.collisions[0].kind, CollisionKind::Path);

    let admin = find_route(&routes, "MiraAdmin").unwrap();
    assert!(matches!(&admin.target, Some(RouteTarget::View(_))));
    assert!(find_route(&routes, "Shadow_simple_alias").is_none());
    assert!(find_route(&routes, "Shadow_alias").is_some());
}

#[tokio::test]
async fn test_mounted_route_names_are_unique() {
    let (pipeline, _) = pipeline(Ok(vec![
        gallery(),
        ExtensionDescriptor::new("Gallery_alias", "/ext/lib42/other").with_title("Other"),
    ]));
    let mut routes = default_host_routes();

    let report = pipeline.generate(&mut routes).await;
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].kind, CollisionKind::Name);

    let names: Vec<&str> = routes[0].children.iter().map(|c| c.name.as_str()).collect();
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
    assert_eq!(find_route(&routes, "Gallery_alias").unwrap().path, "/ext/lib42/other");
}
