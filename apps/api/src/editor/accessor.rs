//! Structural get/set over a [`Node`] tree.
//!
//! `set` never touches its input. It clones the root handle and walks the
//! path with `Arc::make_mut`, which shallow-copies each container on the
//! path (the old document still holds a reference to it) and leaves every
//! sibling shared.

use std::sync::Arc;

use crate::editor::error::EditError;
use crate::editor::node::Node;
use crate::editor::path::{DocPath, PathStep};

/// Resolves `path` against `doc`. `None` if any step is missing or lands on
/// the wrong kind of container.
pub fn get<'a>(doc: &'a Node, path: &DocPath) -> Option<&'a Node> {
    path.steps()
        .iter()
        .try_fold(doc, |node, step| match (step, node) {
            (PathStep::Field(name), Node::Object(fields)) => fields.get(name),
            (PathStep::Index(i), Node::Array(items)) => items.get(*i),
            _ => None,
        })
}

/// Returns a new document with the value at `path` replaced by `value`.
///
/// A final `Field` step may create a field that does not exist yet. Every
/// other step must already resolve: missing intermediate fields fail with
/// `PathNotFound`, and indexes at or past the array length fail with
/// `IndexOutOfRange`. Arrays never grow through `set`.
pub fn set(doc: &Node, path: &DocPath, value: Node) -> Result<Node, EditError> {
    let mut root = doc.clone();
    set_at(&mut root, path.steps(), value, path)?;
    Ok(root)
}

fn set_at(
    node: &mut Node,
    steps: &[PathStep],
    value: Node,
    path: &DocPath,
) -> Result<(), EditError> {
    let Some((step, rest)) = steps.split_first() else {
        *node = value;
        return Ok(());
    };

    match (step, node) {
        (PathStep::Field(name), Node::Object(fields)) => {
            if rest.is_empty() {
                Arc::make_mut(fields).insert(name.clone(), value);
                return Ok(());
            }
            if !fields.contains_key(name) {
                return Err(EditError::PathNotFound(path.to_string()));
            }
            match Arc::make_mut(fields).get_mut(name) {
                Some(child) => set_at(child, rest, value, path),
                None => Err(EditError::PathNotFound(path.to_string())),
            }
        }
        (PathStep::Index(i), Node::Array(items)) => {
            let len = items.len();
            if *i >= len {
                return Err(EditError::IndexOutOfRange {
                    path: path.to_string(),
                    index: *i,
                    len,
                });
            }
            set_at(&mut Arc::make_mut(items)[*i], rest, value, path)
        }
        _ => Err(EditError::PathNotFound(path.to_string())),
    }
}
