//! Extension descriptors.
//!
//! A descriptor is the registry's record of one extension route. The wire form
//! is permissive: every field except the render source is optional and
//! defaults to an empty value, so a sparse record still produces a route.
//! How the route renders is decided once, at ingestion, as a [`RenderSpec`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::render::RenderInstruction;

/// Error type a builder may fail with.
pub type BuilderError = Box<dyn std::error::Error + Send + Sync>;

type BuilderFn = dyn Fn() -> Result<RenderInstruction, BuilderError> + Send + Sync;

/// Inline generator producing an extension's render instruction.
#[derive(Clone)]
pub struct Builder(Arc<BuilderFn>);

impl Builder {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<RenderInstruction, BuilderError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the generator. Panics are not caught here.
    pub fn build(&self) -> Result<RenderInstruction, BuilderError> {
        (self.0)()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Builder(..)")
    }
}

/// How a descriptor's route renders.
#[derive(Debug, Clone)]
pub enum RenderSpec {
    /// Host-side generator; wins over any `component`.
    InlineGenerated(Builder),
    /// Compiled unit, either an absolute URL or a path relative to the
    /// extension asset root.
    RemoteCompiled { component: String },
    /// Nothing to render.
    Placeholder,
}

impl RenderSpec {
    fn from_component(component: Option<String>) -> Self {
        match component {
            Some(c) if !c.trim().is_empty() => RenderSpec::RemoteCompiled {
                component: c.trim().to_string(),
            },
            _ => RenderSpec::Placeholder,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RenderSpec::InlineGenerated(_) => "inline",
            RenderSpec::RemoteCompiled { .. } => "remote",
            RenderSpec::Placeholder => "placeholder",
        }
    }
}

/// Menu/tab presentation metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affix_tab: Option<bool>,
    #[serde(
        default,
        alias = "roles",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_roles: Vec<String>,
}

/// One extension route as served by the registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "WireDescriptor")]
pub struct ExtensionDescriptor {
    pub name: String,
    pub group: String,
    pub path: String,
    pub original_path: Option<String>,
    pub render: RenderSpec,
    pub owner_name: Option<String>,
    pub collection_id: Option<String>,
    pub collection_name: Option<String>,
    pub presentation: Presentation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDescriptor {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    path: String,
    #[serde(default)]
    original_path: Option<String>,
    #[serde(default)]
    component: Option<String>,
    #[serde(default, alias = "pluginName")]
    owner_name: Option<String>,
    #[serde(default, alias = "libraryId")]
    collection_id: Option<String>,
    #[serde(default, alias = "libraryName")]
    collection_name: Option<String>,
    #[serde(default, alias = "meta", deserialize_with = "null_as_default")]
    presentation: Presentation,
}

impl From<WireDescriptor> for ExtensionDescriptor {
    fn from(wire: WireDescriptor) -> Self {
        Self {
            name: wire.name,
            group: wire.group,
            path: wire.path,
            original_path: non_empty(wire.original_path),
            render: RenderSpec::from_component(wire.component),
            owner_name: non_empty(wire.owner_name),
            collection_id: non_empty(wire.collection_id),
            collection_name: non_empty(wire.collection_name),
            presentation: wire.presentation,
        }
    }
}

/// Registries send `null` for absent fields; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ExtensionDescriptor {
    /// Create a placeholder descriptor with only a name and path.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            path: path.into(),
            original_path: None,
            render: RenderSpec::Placeholder,
            owner_name: None,
            collection_id: None,
            collection_name: None,
            presentation: Presentation::default(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_original_path(mut self, path: impl Into<String>) -> Self {
        self.original_path = non_empty(Some(path.into()));
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_name = non_empty(Some(owner.into()));
        self
    }

    pub fn with_collection(mut self, id: impl Into<String>, name: Option<String>) -> Self {
        self.collection_id = non_empty(Some(id.into()));
        self.collection_name = non_empty(name);
        self
    }

    /// Set a remote component. Ignored when a builder is already attached.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        if !matches!(self.render, RenderSpec::InlineGenerated(_)) {
            self.render = RenderSpec::from_component(Some(component.into()));
        }
        self
    }

    /// Attach an inline builder. Takes precedence over any component.
    pub fn with_builder(mut self, builder: Builder) -> Self {
        self.render = RenderSpec::InlineGenerated(builder);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.presentation.title = title.into();
        self
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.presentation.order = Some(order);
        self
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }

    /// Title for display, falling back to the route name.
    pub fn display_title(&self) -> &str {
        if self.presentation.title.is_empty() {
            &self.name
        } else {
            &self.presentation.title
        }
    }

    /// Component path when the descriptor renders remotely.
    pub fn component(&self) -> Option<&str> {
        match &self.render {
            RenderSpec::RemoteCompiled { component } => Some(component),
            _ => None,
        }
    }

    /// Owner and original path, when both are present.
    pub fn alias_source(&self) -> Option<(&str, &str)> {
        match (&self.owner_name, &self.original_path) {
            (Some(owner), Some(original)) => Some((owner, original)),
            _ => None,
        }
    }
}
