//! Tool trait and registry for model-invoked retrieval.
//!
//! The generation model is offered every registered tool's schema and asks
//! for tools by name. The assistant dispatches those requests through the
//! [`ToolRegistry`], which validates arguments against the tool's declared
//! schema before calling it.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌──────────────────┐ ┌───────────────┐  │
//! │  │search_course_    │ │get_course_    │  │
//! │  │content           │ │outline        │  │
//! │  └──────────────────┘ └───────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!      dispatch(name, args, ctx) → text
//!                │
//!                ▼
//!   CourseStore (search)  +  SourceTracker (citations)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use coursemate::traits::ToolRegistry;
//!
//! let tools = ToolRegistry::with_builtins();
//! assert_eq!(tools.len(), 2);
//! assert!(tools.find("get_course_outline").is_some());
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::sources::SourceTracker;
use crate::store::CourseStore;
use crate::tools::{CourseOutlineTool, SearchContentTool};

// ═══════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{tool} failed: {message}")]
    Execution { tool: String, message: String },

    /// The course index or the embedding backend behind it failed. Not a
    /// problem the model can work around, so the query fails.
    #[error("{tool} could not reach the course index: {message}")]
    Transport { tool: String, message: String },
}

impl ToolError {
    /// Wrap a store failure raised inside `tool`.
    pub fn transport(tool: &str, err: anyhow::Error) -> Self {
        ToolError::Transport {
            tool: tool.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// True for failures the query cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::UnknownTool(_) | ToolError::Transport { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// Schema handed to the generation model, one per tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A retrieval capability the model can call by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to request this tool.
    fn name(&self) -> &str;

    /// Tells the model when to use the tool.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments: `type: "object"`, `properties`, and
    /// optionally `required`.
    fn input_schema(&self) -> Value;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Run the tool with arguments that already passed [`validate_params`].
    ///
    /// Returns the text the model sees as the tool result. Citations go to
    /// `ctx.sources`. Store failures should be returned as
    /// [`ToolError::Transport`] so they fail the query instead of being
    /// shown to the model.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// What a tool can reach while it runs: the course store and the
/// citation tracker of the query being answered.
///
/// Built fresh for every query, so its [`SourceTracker`] is never shared
/// between concurrent queries.
pub struct ToolContext {
    pub store: Arc<CourseStore>,
    pub sources: SourceTracker,
}

impl ToolContext {
    pub fn new(store: Arc<CourseStore>) -> Self {
        Self {
            store,
            sources: SourceTracker::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Tool Registry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered set of tools, unique by name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with the content search and course outline tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.tools.push(Box::new(SearchContentTool));
        registry.tools.push(Box::new(CourseOutlineTool));
        registry
    }

    /// Register a tool. A second tool with the same name is rejected.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        if self.find(tool.name()).is_some() {
            return Err(ToolError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Schemas of every tool, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Validate `args` against the named tool's schema and run it.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .find(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = validate_params(&tool.input_schema(), &args).map_err(|reason| {
            ToolError::InvalidArguments {
                tool: name.to_string(),
                reason,
            }
        })?;

        tool.execute(args, ctx)
            .await
            .map_err(|e| match e.downcast::<ToolError>() {
                Ok(err) => err,
                Err(e) => ToolError::Execution {
                    tool: name.to_string(),
                    message: format!("{:#}", e),
                },
            })
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter validation
// ═══════════════════════════════════════════════════════════════════════

/// Check `params` against a JSON Schema object.
///
/// Required properties must be present and non-null. Present properties
/// must match their declared `type`; an explicit `null` for an optional
/// property is dropped. Properties the schema does not declare are dropped
/// too. Returns the cleaned argument object.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value, String> {
    let empty = Map::new();
    let params_obj = match params {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(format!("arguments must be an object, got {}", json_type_name(other))),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for req_field in &required {
        if params_obj.get(*req_field).map_or(true, Value::is_null) {
            return Err(format!("missing required parameter: {}", req_field));
        }
    }

    let mut result = Map::new();

    for (prop_name, prop_schema) in &properties {
        let value = match params_obj.get(prop_name) {
            Some(Value::Null) | None => continue,
            Some(v) => v,
        };
        if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
            let type_ok = match expected_type {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !type_ok {
                return Err(format!(
                    "parameter '{}' must be of type '{}', got {}",
                    prop_name,
                    expected_type,
                    json_type_name(value)
                ));
            }
        }
        result.insert(prop_name.clone(), value.clone());
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
