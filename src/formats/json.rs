/*!
 * JSON fragment extraction.
 *
 * Translatable values are selected by a set of path patterns in the familiar
 * `$.items[*].name` shape. With no patterns configured every string value in
 * the document is translatable. Matched non-string values become
 * non-translatable fragments; everything unmatched passes through untouched.
 * Reassembly rewrites the matched values in place, so the output JSON keeps
 * the input's shape and key order.
 */

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::document::{Document, FragmentContext};
use crate::errors::AppError;

use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

/// One matched location: fragment id paired with a JSON Pointer
#[derive(Debug, Clone)]
pub struct JsonTarget {
    /// Fragment occupying the location
    pub fragment: crate::document::FragmentId,
    /// JSON Pointer ("/items/0/name") to the matched value
    pub pointer: String,
}

/// One step of a compiled path pattern
#[derive(Debug, Clone, PartialEq)]
enum PathStep {
    /// `.name` — a specific object key
    Key(String),
    /// `.*` — any object key
    AnyKey,
    /// `[3]` — a specific array index
    Index(usize),
    /// `[*]` — any array index
    AnyIndex,
}

/// Compiled form of one `$.a.b[*].c` pattern
#[derive(Debug, Clone)]
struct PathPattern {
    steps: Vec<PathStep>,
}

impl PathPattern {
    /// Parse a pattern string. Supported steps: `.key`, `.*`, `[n]`, `[*]`.
    fn parse(pattern: &str) -> Result<Self> {
        let mut rest = pattern.trim();
        rest = rest.strip_prefix('$').unwrap_or(rest);

        let mut steps = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| anyhow!("Unclosed bracket in path pattern: {}", pattern))?;
                let token = &after[..end];
                if token == "*" {
                    steps.push(PathStep::AnyIndex);
                } else {
                    let index: usize = token
                        .parse()
                        .map_err(|_| anyhow!("Invalid array index '{}' in pattern: {}", token, pattern))?;
                    steps.push(PathStep::Index(index));
                }
                rest = &after[end + 1..];
            } else if let Some(after) = rest.strip_prefix('.') {
                let end = after
                    .find(['.', '['])
                    .unwrap_or(after.len());
                let token = &after[..end];
                if token.is_empty() {
                    return Err(anyhow!("Empty key in path pattern: {}", pattern));
                }
                if token == "*" {
                    steps.push(PathStep::AnyKey);
                } else {
                    steps.push(PathStep::Key(token.to_string()));
                }
                rest = &after[end..];
            } else {
                return Err(anyhow!("Unexpected character in path pattern: {}", pattern));
            }
        }
        Ok(PathPattern { steps })
    }

    /// Collect JSON Pointers of all values this pattern selects
    fn matches(&self, root: &Value) -> Vec<String> {
        let mut found = Vec::new();
        Self::walk(&self.steps, root, String::new(), &mut found);
        found
    }

    fn walk(steps: &[PathStep], value: &Value, pointer: String, found: &mut Vec<String>) {
        let Some(step) = steps.first() else {
            found.push(pointer);
            return;
        };
        let rest = &steps[1..];
        match step {
            PathStep::Key(key) => {
                if let Some(child) = value.get(key) {
                    Self::walk(rest, child, format!("{}/{}", pointer, escape_pointer(key)), found);
                }
            }
            PathStep::AnyKey => {
                if let Value::Object(map) = value {
                    for (key, child) in map {
                        Self::walk(rest, child, format!("{}/{}", pointer, escape_pointer(key)), found);
                    }
                }
            }
            PathStep::Index(index) => {
                if let Some(child) = value.get(index) {
                    Self::walk(rest, child, format!("{}/{}", pointer, index), found);
                }
            }
            PathStep::AnyIndex => {
                if let Value::Array(items) = value {
                    for (index, child) in items.iter().enumerate() {
                        Self::walk(rest, child, format!("{}/{}", pointer, index), found);
                    }
                }
            }
        }
    }
}

/// Escape a key for use in a JSON Pointer (RFC 6901)
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Collect pointers to every string value in the tree, in document order
fn all_string_pointers(value: &Value, pointer: String, found: &mut Vec<String>) {
    match value {
        Value::String(_) => found.push(pointer),
        Value::Object(map) => {
            for (key, child) in map {
                all_string_pointers(child, format!("{}/{}", pointer, escape_pointer(key)), found);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                all_string_pointers(child, format!("{}/{}", pointer, index), found);
            }
        }
        _ => {}
    }
}

/// Adapter for JSON documents
pub struct JsonAdapter {
    patterns: Vec<String>,
}

impl JsonAdapter {
    /// Create an adapter with the configured path patterns; an empty list
    /// means "match every string value"
    pub fn new(patterns: Vec<String>) -> Self {
        JsonAdapter { patterns }
    }
}

impl FormatAdapter for JsonAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let text = document
            .text()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let root: Value = serde_json::from_str(text)
            .map_err(|e| AppError::InvalidInput(format!("Invalid JSON document: {}", e)))?;

        let mut pointers: Vec<String> = Vec::new();
        if self.patterns.is_empty() {
            all_string_pointers(&root, String::new(), &mut pointers);
        } else {
            for pattern in &self.patterns {
                let compiled = PathPattern::parse(pattern)
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                for pointer in compiled.matches(&root) {
                    if !pointers.contains(&pointer) {
                        pointers.push(pointer);
                    }
                }
            }
        }

        let mut builder = FragmentBuilder::new();
        let mut targets = Vec::new();
        for pointer in pointers {
            let Some(value) = root.pointer(&pointer) else {
                continue;
            };
            match value {
                Value::String(s) => {
                    let id = builder.push(
                        s.clone(),
                        true,
                        FragmentContext::JsonValue { pointer: pointer.clone() },
                    );
                    targets.push(JsonTarget { fragment: id, pointer });
                }
                // Matched numbers, booleans and nulls are surfaced as
                // fragments but never sent to the model
                Value::Number(_) | Value::Bool(_) | Value::Null => {
                    builder.push(
                        value.to_string(),
                        false,
                        FragmentContext::JsonValue { pointer },
                    );
                }
                // Containers selected by a pattern are left untouched
                Value::Object(_) | Value::Array(_) => {}
            }
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Json { root, targets },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        _policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Json { root, targets } = plan else {
            return Err(plan_mismatch("json"));
        };

        let mut output = root.clone();
        for target in targets {
            if let Some(text) = translated.get(&target.fragment) {
                if let Some(slot) = output.pointer_mut(&target.pointer) {
                    *slot = Value::String(text.clone());
                }
            }
        }

        let serialized = serde_json::to_string(&output)
            .map_err(|e| AppError::Unknown(format!("Failed to serialize JSON output: {}", e)))?;
        let mut result = document.clone();
        result.content = serialized.into_bytes().into();
        Ok(result)
    }
}
