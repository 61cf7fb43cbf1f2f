//! The closed set of document mutations exposed to editable UI elements.
//!
//! Each variant names its target unambiguously: a path, or an array path
//! plus an index or identifier. Nothing here knows which template or
//! element issued the request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::editor::accessor;
use crate::editor::collections;
use crate::editor::error::EditError;
use crate::editor::node::Node;
use crate::editor::path::parse_path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    SetValue {
        path: String,
        value: Value,
    },
    AppendEntry {
        #[serde(rename = "arrayPath")]
        array_path: String,
        template: Value,
    },
    RemoveEntryAt {
        #[serde(rename = "arrayPath")]
        array_path: String,
        index: usize,
    },
    RemoveEntryById {
        #[serde(rename = "arrayPath")]
        array_path: String,
        id: String,
    },
    AddBulletPoint {
        #[serde(rename = "experienceId")]
        experience_id: String,
    },
    RemoveBulletPoint {
        #[serde(rename = "experienceId")]
        experience_id: String,
        index: usize,
    },
}

impl Mutation {
    /// Computes the document that results from applying this mutation to
    /// `doc`. `doc` itself is left as it was.
    pub fn apply(&self, doc: &Node) -> Result<Node, EditError> {
        match self {
            Mutation::SetValue { path, value } => {
                accessor::set(doc, &parse_path(path)?, Node::from(value.clone()))
            }
            Mutation::AppendEntry {
                array_path,
                template,
            } => collections::append_entry(
                doc,
                &parse_path(array_path)?,
                Node::from(template.clone()),
            ),
            Mutation::RemoveEntryAt { array_path, index } => {
                collections::remove_entry_at(doc, &parse_path(array_path)?, *index)
            }
            Mutation::RemoveEntryById { array_path, id } => {
                collections::remove_entry_by_id(doc, &parse_path(array_path)?, id)
            }
            Mutation::AddBulletPoint { experience_id } => {
                collections::add_bullet_point(doc, experience_id)
            }
            Mutation::RemoveBulletPoint {
                experience_id,
                index,
            } => collections::remove_bullet_point(doc, experience_id, *index),
        }
    }

    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetValue { .. } => "set_value",
            Mutation::AppendEntry { .. } => "append_entry",
            Mutation::RemoveEntryAt { .. } => "remove_entry_at",
            Mutation::RemoveEntryById { .. } => "remove_entry_by_id",
            Mutation::AddBulletPoint { .. } => "add_bullet_point",
            Mutation::RemoveBulletPoint { .. } => "remove_bullet_point",
        }
    }
}
