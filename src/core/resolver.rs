//! Input expression evaluation and module ordering.
//!
//! Evaluates `{{ dependency.<name>.outputs.<key> }}` references in input
//! expressions against resolved dependency outputs. Orders modules from
//! their dependency edges with Kahn's algorithm, breaking ties by discovery
//! order so the result is deterministic.

use super::error::{Error, Result};
use super::types::*;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// Outputs of every resolved dependency, keyed by dependency name.
pub type DependencyOutputs = IndexMap<String, OutputValues>;

/// Look up one reference such as `dependency.rg.outputs.name`.
fn lookup(
    module: &str,
    key: &str,
    outputs: &DependencyOutputs,
) -> Result<TypedValue> {
    let unknown = || Error::UnknownReference {
        module: module.to_string(),
        reference: key.to_string(),
    };

    let parts: Vec<&str> = key.split('.').map(str::trim).collect();
    if parts.len() < 3 || parts[0] != "dependency" || parts[2] != "outputs" {
        return Err(unknown());
    }
    let values = outputs.get(parts[1]).ok_or_else(unknown)?;

    if parts.len() == 3 {
        return Ok(TypedValue::Object(
            values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        ));
    }

    let mut current = values.get(parts[3]).ok_or_else(unknown)?;
    for segment in &parts[4..] {
        current = match current {
            TypedValue::Object(map) => map.get(*segment).ok_or_else(unknown)?,
            TypedValue::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(unknown)?,
            _ => return Err(unknown()),
        };
    }
    Ok(current.clone())
}

/// Resolve all references in a string.
///
/// A string that is exactly one reference yields the referenced typed value;
/// otherwise references are interpolated as text.
pub fn resolve_template(
    module: &str,
    template: &str,
    outputs: &DependencyOutputs,
) -> Result<TypedValue> {
    let trimmed = template.trim();
    if let Some(inner) = trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
    {
        if !inner.contains("{{") && !inner.contains("}}") {
            return lookup(module, inner.trim(), outputs);
        }
    }

    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..].find("}}").ok_or_else(|| Error::UnknownReference {
            module: module.to_string(),
            reference: format!("unclosed template at position {}", open),
        })?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim().to_string();

        let value = typed_to_string(&lookup(module, &key, outputs)?);
        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(TypedValue::String(result))
}

/// Recursively resolve references inside a typed value.
fn resolve_value(module: &str, value: TypedValue, outputs: &DependencyOutputs) -> Result<TypedValue> {
    match value {
        TypedValue::String(s) if s.contains("{{") => resolve_template(module, &s, outputs),
        TypedValue::Array(items) => items
            .into_iter()
            .map(|v| resolve_value(module, v, outputs))
            .collect::<Result<Vec<_>>>()
            .map(TypedValue::Array),
        TypedValue::Object(map) => {
            let mut resolved = serde_json::Map::new();
            for (k, v) in map {
                resolved.insert(k, resolve_value(module, v, outputs)?);
            }
            Ok(TypedValue::Object(resolved))
        }
        other => Ok(other),
    }
}

/// Evaluate a module's input expressions into typed values.
pub fn resolve_inputs(
    module: &Module,
    outputs: &DependencyOutputs,
) -> Result<IndexMap<String, TypedValue>> {
    let mut resolved = IndexMap::new();
    for (name, expr) in &module.inputs {
        let value = resolve_value(&module.name, yaml_to_typed(expr), outputs)?;
        resolved.insert(name.clone(), value);
    }
    Ok(resolved)
}

/// Order modules so that every module follows the loaded modules it depends on.
/// Dependencies on documents outside the loaded set do not constrain order.
pub fn build_execution_order(modules: &[Module]) -> Result<Vec<usize>> {
    let mut owner: HashMap<&std::path::Path, usize> = HashMap::new();
    for (idx, module) in modules.iter().enumerate() {
        for file in &module.files {
            owner.insert(file.as_path(), idx);
        }
    }

    let mut in_degree = vec![0usize; modules.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); modules.len()];

    for (idx, module) in modules.iter().enumerate() {
        for dep in module.dependencies.values() {
            if let Some(&upstream) = owner.get(dep.document.as_path()) {
                if upstream != idx && !adjacency[upstream].contains(&idx) {
                    adjacency[upstream].push(idx);
                    in_degree[idx] += 1;
                }
            }
        }
    }

    // Kahn's algorithm, ready set kept sorted by discovery index
    let mut queue: VecDeque<usize> = (0..modules.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(modules.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);

        let mut next_ready = Vec::new();
        for &neighbor in &adjacency[current] {
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                next_ready.push(neighbor);
            }
        }
        queue.extend(next_ready);
        queue.make_contiguous().sort_unstable();
    }

    if order.len() != modules.len() {
        let cycle_members: Vec<&str> = (0..modules.len())
            .filter(|i| !order.contains(i))
            .map(|i| modules[i].name.as_str())
            .collect();
        return Err(Error::Validation(vec![format!(
            "dependency cycle detected involving: {}",
            cycle_members.join(", ")
        )]));
    }

    Ok(order)
}
