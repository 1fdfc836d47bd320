//! Workflow template loading and per-item field substitution.
//!
//! A ComfyUI API-format workflow is an object keyed by node ID, each node
//! carrying a `class_type` and an `inputs` object. The image-to-mesh
//! template needs exactly two fields set per item: the image the loader
//! node reads, and the string primitive the export nodes use as their
//! filename prefix.

use std::path::Path;

use meshgen_core::error::CoreError;

/// Trellis2 image loader node class type.
pub const IMAGE_LOADER_CLASS: &str = "Trellis2LoadImageWithTransparency";

/// String primitive feeding the export filename prefix.
pub const PREFIX_CLASS: &str = "PrimitiveString";

/// Which node inputs receive the per-item values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBindings {
    pub image_class: String,
    pub image_input: String,
    pub prefix_class: String,
    pub prefix_input: String,
}

impl Default for TemplateBindings {
    fn default() -> Self {
        Self {
            image_class: IMAGE_LOADER_CLASS.to_string(),
            image_input: "image".to_string(),
            prefix_class: PREFIX_CLASS.to_string(),
            prefix_input: "value".to_string(),
        }
    }
}

/// A validated workflow template.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    workflow: serde_json::Value,
    bindings: TemplateBindings,
}

impl WorkflowTemplate {
    /// Load and validate a template from a JSON file.
    pub fn load(path: &Path, bindings: TemplateBindings) -> Result<Self, CoreError> {
        let raw = std::fs::read(path).map_err(|e| CoreError::io(path, e))?;
        let workflow = serde_json::from_slice(&raw).map_err(|e| CoreError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_value(workflow, bindings)
    }

    /// Validate an in-memory template.
    ///
    /// The workflow must be a JSON object containing at least one node of
    /// each bound class type.
    pub fn from_value(
        workflow: serde_json::Value,
        bindings: TemplateBindings,
    ) -> Result<Self, CoreError> {
        if !workflow.is_object() {
            return Err(CoreError::Validation(
                "Workflow JSON must be an object".to_string(),
            ));
        }
        for class in [&bindings.image_class, &bindings.prefix_class] {
            if find_node_id(&workflow, class).is_none() {
                return Err(CoreError::Validation(format!(
                    "Workflow has no '{class}' node"
                )));
            }
        }
        Ok(Self { workflow, bindings })
    }

    /// The unmodified template.
    pub fn workflow(&self) -> &serde_json::Value {
        &self.workflow
    }

    /// Produce a job for one item.
    ///
    /// Works on a copy: the image input of the first loader node is set to
    /// `image_name` and the first prefix primitive to `prefix`. "First" is
    /// the order nodes appear in the template file.
    pub fn render(&self, image_name: &str, prefix: &str) -> serde_json::Value {
        let mut job = self.workflow.clone();
        set_input(
            &mut job,
            &self.bindings.image_class,
            &self.bindings.image_input,
            image_name,
        );
        set_input(
            &mut job,
            &self.bindings.prefix_class,
            &self.bindings.prefix_input,
            prefix,
        );
        job
    }
}

/// ID of the first node whose `class_type` equals `class`.
fn find_node_id(workflow: &serde_json::Value, class: &str) -> Option<String> {
    workflow.as_object()?.iter().find_map(|(id, node)| {
        (node.get("class_type").and_then(|c| c.as_str()) == Some(class)).then(|| id.clone())
    })
}

/// Set `inputs.{input}` of the first `class` node, creating `inputs` if
/// needed.
fn set_input(workflow: &mut serde_json::Value, class: &str, input: &str, value: &str) {
    let Some(id) = find_node_id(workflow, class) else {
        return;
    };
    let Some(node) = workflow.get_mut(&id).and_then(|n| n.as_object_mut()) else {
        return;
    };
    let inputs = node
        .entry("inputs")
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    if let Some(inputs) = inputs.as_object_mut() {
        inputs.insert(input.to_string(), serde_json::Value::String(value.to_string()));
    }
}
