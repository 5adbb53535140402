//! Renderable units.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::registry::ComponentRegistry;
use crate::render::{RenderInstruction, RenderNode};

/// A compiled extension component.
pub trait Component: Send + Sync {
    /// Component name.
    fn name(&self) -> &str;

    /// Render the component.
    fn render(&self) -> RenderInstruction;
}

/// Shared component handle.
pub type DynComponent = Arc<dyn Component>;

/// Component with a fixed render instruction.
#[derive(Debug, Clone)]
pub struct StaticComponent {
    name: String,
    instruction: RenderInstruction,
}

impl StaticComponent {
    pub fn new(name: impl Into<String>, instruction: impl Into<RenderInstruction>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
        }
    }

    /// Boxed as a [`DynComponent`].
    pub fn shared(name: impl Into<String>, instruction: impl Into<RenderInstruction>) -> DynComponent {
        Arc::new(Self::new(name, instruction))
    }
}

impl Component for StaticComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> RenderInstruction {
        self.instruction.clone()
    }
}

/// Where a remote unit came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub owner_name: String,
    pub collection_id: String,
    pub component_path: String,
}

impl Provenance {
    /// `collection/owner/component`, as shown in panels.
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.collection_id, self.owner_name, self.component_path
        )
    }
}

/// DOM element handed to an initialization hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub id: String,
}

/// Host hook bridging units that do not register themselves by key.
pub type InitHook = Arc<dyn Fn(&MountPoint, &Provenance) + Send + Sync>;

/// Wrapper for a loaded script that registered no component under its key.
#[derive(Clone)]
pub struct BridgeUnit {
    pub name: String,
    pub title: String,
    pub provenance: Provenance,
    pub mount_id: String,
    registry: Arc<dyn ComponentRegistry>,
}

impl BridgeUnit {
    pub(crate) fn new(
        name: String,
        title: String,
        provenance: Provenance,
        registry: Arc<dyn ComponentRegistry>,
    ) -> Self {
        let mount_id = mount_id_for(&provenance.owner_name);
        Self {
            name,
            title,
            provenance,
            mount_id,
            registry,
        }
    }

    fn render(&self) -> RenderNode {
        RenderNode::element("div")
            .attr("class", "ext-component-wrapper")
            .text_child("h3", self.title.clone())
            .text_child("p", format!("Extension component: {}", self.provenance.label()))
            .child(
                RenderNode::element("div")
                    .attr("id", self.mount_id.clone())
                    .attr("class", "ext-mount-point"),
            )
    }

    /// Hand the mount point to the host's initialization hook.
    ///
    /// Returns `false` when the host has no hook installed.
    pub fn mount(&self) -> bool {
        let Some(hook) = self.registry.initialization_hook() else {
            tracing::debug!("No initialization hook for extension {}", self.name);
            return false;
        };
        let mount = MountPoint {
            id: self.mount_id.clone(),
        };
        hook(&mount, &self.provenance);
        true
    }
}

/// Mount element id for an owner: non-alphanumerics become `_`.
pub fn mount_id_for(owner_name: &str) -> String {
    let sanitized: String = owner_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("ext-mount-{}", sanitized)
}

/// Details of a failed remote load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDiagnostic {
    pub name: String,
    pub url: String,
    pub provenance: Provenance,
    pub error: String,
}

impl LoadDiagnostic {
    fn render(&self) -> RenderNode {
        let debug = RenderNode::element("details")
            .text_child("summary", "Debug info")
            .text_child("p", format!("Collection ID: {}", self.provenance.collection_id))
            .text_child("p", format!("Owner: {}", self.provenance.owner_name))
            .text_child("p", format!("Component path: {}", self.provenance.component_path));

        RenderNode::element("div")
            .attr("class", "ext-component-error")
            .text_child("h3", "Failed to load extension script")
            .text_child(
                "p",
                format!("Could not load extension script: {}", self.provenance.component_path),
            )
            .text_child("p", format!("Error: {}", self.error))
            .text_child("p", format!("Attempted URL: {}", self.url))
            .child(debug)
    }
}

/// The resolved, displayable content of an extension route.
#[derive(Clone)]
pub enum RenderUnit {
    /// Builder output.
    Inline {
        name: String,
        instruction: RenderInstruction,
    },
    /// Builder failed or panicked.
    InlineError { name: String, message: String },
    /// Component from the registry or a module import.
    Compiled(DynComponent),
    /// Loaded script without a keyed registration.
    Bridge(BridgeUnit),
    /// Script or module failed to load.
    LoadError(LoadDiagnostic),
    /// Descriptor with nothing to render.
    Placeholder { name: String, title: String, path: String },
}

impl RenderUnit {
    /// Unit name, suffixed for diagnostic units.
    pub fn name(&self) -> String {
        match self {
            RenderUnit::Inline { name, .. } => name.clone(),
            RenderUnit::InlineError { name, .. } => format!("{}Error", name),
            RenderUnit::Compiled(component) => component.name().to_string(),
            RenderUnit::Bridge(bridge) => bridge.name.clone(),
            RenderUnit::LoadError(diagnostic) => format!("{}_error", diagnostic.name),
            RenderUnit::Placeholder { name, .. } => name.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RenderUnit::Inline { .. } => "inline",
            RenderUnit::InlineError { .. } => "inline_error",
            RenderUnit::Compiled(_) => "compiled",
            RenderUnit::Bridge(_) => "bridge",
            RenderUnit::LoadError(_) => "load_error",
            RenderUnit::Placeholder { .. } => "placeholder",
        }
    }

    /// True for units standing in for a failure.
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, RenderUnit::InlineError { .. } | RenderUnit::LoadError(_))
    }

    pub fn render(&self) -> RenderInstruction {
        match self {
            RenderUnit::Inline { instruction, .. } => instruction.clone(),
            RenderUnit::InlineError { name, message } => RenderNode::element("div")
                .attr("class", "ext-error")
                .text_child("h3", "Extension failed to load")
                .text_child("p", format!("Unable to load extension: {}", name))
                .text_child("p", format!("Error: {}", message))
                .into(),
            RenderUnit::Compiled(component) => component.render(),
            RenderUnit::Bridge(bridge) => bridge.render().into(),
            RenderUnit::LoadError(diagnostic) => diagnostic.render().into(),
            RenderUnit::Placeholder { title, path, .. } => RenderNode::element("div")
                .attr("class", "ext-placeholder")
                .text_child("h3", title.clone())
                .text_child("p", "Extension component: none")
                .text_child("p", format!("Extension path: {}", path))
                .into(),
        }
    }

    /// Render straight to HTML.
    pub fn to_html(&self) -> String {
        self.render().to_html()
    }

    /// Run mount-time behaviour. Only bridge units have any.
    pub fn mount(&self) -> bool {
        match self {
            RenderUnit::Bridge(bridge) => bridge.mount(),
            _ => false,
        }
    }
}

impl fmt::Debug for RenderUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderUnit")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
