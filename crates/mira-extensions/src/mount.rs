//! Host route tree and the extension mount point.

use serde::{Serialize, Serializer};

use crate::config::{defaults, ExtensionConfig};
use crate::error::ExtensionError;
use crate::resolver::LazyUnit;
use crate::synth::ResolvedRoute;

/// Route metadata shared by host and extension routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affix_tab: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_extension: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_group: Option<String>,
    pub hide_in_menu: bool,
    pub hide_in_tab: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_alias: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_simple_alias: bool,
}

fn is_false(value: &bool) -> bool {
    !value
}

/// What a route shows when navigated to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// A host view, by identifier.
    View(String),
    /// Redirect to another path.
    Redirect(String),
    /// Lazily resolved extension unit.
    #[serde(serialize_with = "serialize_unit")]
    Extension(LazyUnit),
}

fn serialize_unit<S: Serializer>(unit: &LazyUnit, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(unit.strategy())
}

/// Node of the host route tree.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRecord {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<RouteTarget>,
    pub meta: RouteMeta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    /// Static host route rendering `view`.
    pub fn view(name: impl Into<String>, path: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target: Some(RouteTarget::View(view.into())),
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    /// Route with no target of its own, only children.
    pub fn layout(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }

    /// Depth-first search by route name.
    pub fn find(&self, name: &str) -> Option<&RouteRecord> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Mutable depth-first search by route name.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut RouteRecord> {
        if self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(name))
    }

    /// Lazily resolved extension unit, if this is an extension route.
    pub fn extension_unit(&self) -> Option<&LazyUnit> {
        match &self.target {
            Some(RouteTarget::Extension(unit)) => Some(unit),
            _ => None,
        }
    }
}

/// Find a route anywhere in a forest.
pub fn find_route<'a>(routes: &'a [RouteRecord], name: &str) -> Option<&'a RouteRecord> {
    routes.iter().find_map(|route| route.find(name))
}

/// Result of [`MountIntegrator::integrate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
    /// Routes appended under the mount point.
    Mounted { count: usize },
    /// No extension routes to mount.
    Empty,
    /// Mount point absent; host routes left untouched.
    MountPointMissing(String),
}

impl IntegrationOutcome {
    /// Error describing a skipped integration, if any.
    pub fn error(&self) -> Option<ExtensionError> {
        match self {
            IntegrationOutcome::MountPointMissing(name) => {
                Some(ExtensionError::MountPointMissing(name.clone()))
            }
            _ => None,
        }
    }

    /// Number of routes mounted.
    pub fn mounted(&self) -> usize {
        match self {
            IntegrationOutcome::Mounted { count } => *count,
            _ => 0,
        }
    }
}

/// Appends extension routes under the host's mount point.
#[derive(Debug, Clone)]
pub struct MountIntegrator {
    mount_name: String,
}

impl Default for MountIntegrator {
    fn default() -> Self {
        Self::new(defaults::MOUNT_ROUTE_NAME)
    }
}

impl MountIntegrator {
    pub fn new(mount_name: impl Into<String>) -> Self {
        Self {
            mount_name: mount_name.into(),
        }
    }

    pub fn from_config(config: &ExtensionConfig) -> Self {
        Self::new(config.mount_route_name.clone())
    }

    pub fn mount_name(&self) -> &str {
        &self.mount_name
    }

    /// Append `routes` after the mount point's existing children.
    pub fn integrate(
        &self,
        host_routes: &mut [RouteRecord],
        routes: Vec<ResolvedRoute>,
    ) -> IntegrationOutcome {
        if routes.is_empty() {
            tracing::debug!("No extension routes to integrate");
            return IntegrationOutcome::Empty;
        }

        let Some(mount) = host_routes
            .iter_mut()
            .find_map(|route| route.find_mut(&self.mount_name))
        else {
            let outcome = IntegrationOutcome::MountPointMissing(self.mount_name.clone());
            if let Some(e) = outcome.error() {
                tracing::warn!("{}, skipping {} extension routes", e, routes.len());
            }
            return outcome;
        };

        let count = routes.len();
        mount.children.extend(routes.into_iter().map(RouteRecord::from));
        tracing::info!("Mounted {} extension routes under {}", count, self.mount_name);
        IntegrationOutcome::Mounted { count }
    }
}

/// Static Mira routes the extension routes mount into.
pub fn default_host_routes() -> Vec<RouteRecord> {
    fn page(name: &str, path: &str, icon: &str, title: &str, roles: &[&str]) -> RouteRecord {
        RouteRecord::view(name, path, format!("views{}", path)).with_meta(RouteMeta {
            title: title.to_string(),
            icon: Some(icon.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..RouteMeta::default()
        })
    }

    let mut overview = page("MiraOverview", "/mira/overview", "lucide:home", "Overview", &[]);
    overview.meta.affix_tab = Some(true);

    let mira = RouteRecord::layout(defaults::MOUNT_ROUTE_NAME, "/mira")
        .with_meta(RouteMeta {
            title: "Mira".to_string(),
            icon: Some("lucide:monitor".to_string()),
            order: Some(1.0),
            ..RouteMeta::default()
        })
        .with_children(vec![
            overview,
            page("MiraLibrary", "/mira/library", "lucide:folder", "Libraries", &["super", "admin"]),
            page("MiraPlugin", "/mira/plugin", "lucide:puzzle", "Plugins", &["super", "admin"]),
            page("MiraAdmin", "/mira/admin", "lucide:user", "Administrators", &["super"]),
            page("MiraDatabase", "/mira/database", "lucide:database", "Database", &["super", "admin"]),
            page("MiraDevice", "/mira/device", "lucide:smartphone", "Devices", &["super", "admin"]),
            page("MiraFileUpload", "/mira/file-upload", "lucide:upload", "File Upload", &["super", "admin"]),
        ]);

    vec![mira]
}
