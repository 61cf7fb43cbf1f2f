//! Array-level operations layered on the accessor: append with a generated
//! identifier, removal by index or identifier, and the experience
//! bullet-point helpers.
//!
//! Every operation takes the path of the array field itself, never of an
//! element, and returns a new document. The input is never modified.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::editor::accessor::{get, set};
use crate::editor::document::{legacy_bullet_lines, EntryKind};
use crate::editor::error::EditError;
use crate::editor::node::Node;
use crate::editor::path::DocPath;

/// Generates a fresh entry identifier: millisecond timestamp plus a random
/// suffix, so identifiers never repeat within a session and never collide
/// with entries removed earlier.
pub fn new_entry_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..12])
}

/// Appends `template` to the array at `array_path`.
///
/// On an entry collection the template must be an object; a freshly
/// generated `id` is merged into it, replacing any id it carried. On a plain
/// list (e.g. `bulletPoints`) the value is appended as is. An array field
/// that does not exist yet is created, subject to the same rules as `set`.
pub fn append_entry(doc: &Node, array_path: &DocPath, template: Node) -> Result<Node, EditError> {
    let mut items = match get(doc, array_path) {
        Some(Node::Array(items)) => items.as_ref().clone(),
        None | Some(Node::Null) => Vec::new(),
        Some(_) => return Err(not_an_array(array_path)),
    };

    let element = match (EntryKind::for_array_path(array_path), template) {
        (Some(_), Node::Object(mut fields)) => {
            Arc::make_mut(&mut fields).insert("id".to_string(), Node::string(new_entry_id()));
            Node::Object(fields)
        }
        (Some(kind), _) => {
            return Err(EditError::InvalidValue(format!(
                "{kind:?} entries appended to '{array_path}' must be objects"
            )))
        }
        (None, value) => value,
    };

    items.push(element);
    set(doc, array_path, Node::array(items))
}

/// Removes the element at `index`, preserving the order of the rest.
/// Identifiers are never renumbered.
pub fn remove_entry_at(doc: &Node, array_path: &DocPath, index: usize) -> Result<Node, EditError> {
    let mut items = match get(doc, array_path) {
        Some(Node::Array(items)) => items.as_ref().clone(),
        _ => return Err(not_an_array(array_path)),
    };

    if index >= items.len() {
        return Err(EditError::IndexOutOfRange {
            path: array_path.to_string(),
            index,
            len: items.len(),
        });
    }

    items.remove(index);
    set(doc, array_path, Node::array(items))
}

/// Removes the element whose `id` equals `id`.
pub fn remove_entry_by_id(doc: &Node, array_path: &DocPath, id: &str) -> Result<Node, EditError> {
    let index = find_entry_index(doc, array_path, id)?;
    remove_entry_at(doc, array_path, index)
}

/// Current position of the entry carrying `id`. Linear scan; entry arrays
/// hold tens of elements at most.
pub fn find_entry_index(doc: &Node, array_path: &DocPath, id: &str) -> Result<usize, EditError> {
    let items = get(doc, array_path)
        .and_then(Node::as_array)
        .ok_or_else(|| not_an_array(array_path))?;

    items
        .iter()
        .position(|item| item.entry_id() == Some(id))
        .ok_or_else(|| EditError::EntryNotFound {
            path: array_path.to_string(),
            id: id.to_string(),
        })
}

/// Adds an empty bullet slot to the experience entry `experience_id`.
///
/// If the entry has no `bulletPoints` yet, they are first seeded from the
/// legacy `description`. This is the only place the engine migrates the
/// free-text shape into the structured list; `description` itself is left
/// alone and is no longer consulted once `bulletPoints` exists.
pub fn add_bullet_point(doc: &Node, experience_id: &str) -> Result<Node, EditError> {
    let (entry_path, entry) = experience_entry(doc, experience_id)?;
    let bullets_path = entry_path.field("bulletPoints");

    let mut bullets = match entry.field("bulletPoints") {
        Some(Node::Array(items)) => items.as_ref().clone(),
        _ => legacy_bullet_lines(entry.field("description").and_then(Node::as_str).unwrap_or(""))
            .into_iter()
            .map(Node::from)
            .collect(),
    };
    bullets.push(Node::string(""));

    set(doc, &bullets_path, Node::array(bullets))
}

/// Removes one bullet slot. An emptied list stays an empty list; it does not
/// fall back to `description`.
pub fn remove_bullet_point(
    doc: &Node,
    experience_id: &str,
    index: usize,
) -> Result<Node, EditError> {
    let (entry_path, _) = experience_entry(doc, experience_id)?;
    remove_entry_at(doc, &entry_path.field("bulletPoints"), index)
}

fn experience_entry<'a>(doc: &'a Node, experience_id: &str) -> Result<(DocPath, &'a Node), EditError> {
    let experience = DocPath::root().field("experience");
    let index = find_entry_index(doc, &experience, experience_id)?;
    let entry_path = experience.index(index);
    let entry = get(doc, &entry_path).ok_or_else(|| EditError::PathNotFound(entry_path.to_string()))?;
    Ok((entry_path, entry))
}

fn not_an_array(path: &DocPath) -> EditError {
    EditError::PathNotFound(format!("{path} (not an array)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::document::blank_document;
    use crate::editor::path::parse_path;
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn path(s: &str) -> DocPath {
        parse_path(s).unwrap()
    }

    fn value_at(doc: &Node, p: &str) -> Option<Value> {
        get(doc, &path(p)).map(Node::to_value)
    }

    fn without_ids(value: Value) -> Value {
        match value {
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .filter(|(k, _)| k != "id")
                    .map(|(k, v)| (k, without_ids(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.into_iter().map(without_ids).collect()),
            other => other,
        }
    }

    #[test]
    fn test_append_generates_id_and_keeps_template_fields() {
        let doc = blank_document();
        let next = append_entry(
            &doc,
            &path("experience"),
            Node::from(json!({ "school": "", "position": "Intern" })),
        )
        .unwrap();

        let items = get(&next, &path("experience")).and_then(Node::as_array).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].field("position").and_then(Node::as_str), Some("Intern"));
        assert!(items[0].entry_id().is_some_and(|id| !id.is_empty()));
    }

    #[test]
    fn test_append_replaces_template_id() {
        let doc = blank_document();
        let next = append_entry(
            &doc,
            &path("skills"),
            Node::from(json!({ "id": "stale", "name": "Rust" })),
        )
        .unwrap();
        let id = get(&next, &path("skills[0]")).and_then(Node::entry_id).unwrap();
        assert_ne!(id, "stale");
    }

    #[test]
    fn test_append_ids_are_pairwise_distinct() {
        let mut doc = blank_document();
        for _ in 0..200 {
            doc = append_entry(&doc, &path("skills"), Node::from(json!({ "name": "" }))).unwrap();
        }
        let ids: HashSet<String> = get(&doc, &path("skills"))
            .and_then(Node::as_array)
            .unwrap()
            .iter()
            .filter_map(|item| item.entry_id().map(str::to_string))
            .collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_append_then_remove_is_content_noop() {
        let doc = Node::from(json!({
            "personalInfo": {},
            "experience": [],
            "education": [{ "id": "d1", "school": "MIT" }],
            "skills": [],
            "sections": []
        }));
        let appended = append_entry(
            &doc,
            &path("education"),
            Node::from(json!({ "school": "Stanford" })),
        )
        .unwrap();
        let removed = remove_entry_at(&appended, &path("education"), 1).unwrap();
        assert_eq!(without_ids(removed.to_value()), without_ids(doc.to_value()));
    }

    #[test]
    fn test_append_rejects_non_object_entry() {
        let err = append_entry(&blank_document(), &path("experience"), Node::string("x")).unwrap_err();
        assert!(matches!(err, EditError::InvalidValue(_)));
    }

    #[test]
    fn test_append_plain_value_to_plain_list() {
        let doc = Node::from(json!({ "experience": [{ "id": "e1", "bulletPoints": ["A"] }] }));
        let next = append_entry(&doc, &path("experience[0].bulletPoints"), Node::string("B")).unwrap();
        assert_eq!(value_at(&next, "experience[0].bulletPoints"), Some(json!(["A", "B"])));
    }

    #[test]
    fn test_append_creates_missing_nested_array() {
        let doc = Node::from(json!({ "sections": [{ "id": "s1", "title": "Talks" }] }));
        let next = append_entry(
            &doc,
            &path("sections[0].items"),
            Node::from(json!({ "title": "RustConf", "subtitle": "2024" })),
        )
        .unwrap();
        let items = get(&next, &path("sections[0].items")).and_then(Node::as_array).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].entry_id().is_some());
    }

    #[test]
    fn test_append_to_scalar_fails() {
        let err = append_entry(
            &blank_document(),
            &path("personalInfo.email"),
            Node::string("x"),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::PathNotFound(_)));
    }

    #[test]
    fn test_remove_at_out_of_range_leaves_document() {
        let doc = Node::from(json!({
            "skills": [{ "id": "a" }, { "id": "b" }, { "id": "c" }]
        }));
        let before = doc.to_value();
        let err = remove_entry_at(&doc, &path("skills"), 5).unwrap_err();
        assert_eq!(
            err,
            EditError::IndexOutOfRange {
                path: "skills".into(),
                index: 5,
                len: 3
            }
        );
        assert_eq!(doc.to_value(), before);
    }

    #[test]
    fn test_remove_at_preserves_order_and_ids() {
        let doc = Node::from(json!({
            "skills": [{ "id": "a" }, { "id": "b" }, { "id": "c" }]
        }));
        let next = remove_entry_at(&doc, &path("skills"), 1).unwrap();
        assert_eq!(value_at(&next, "skills"), Some(json!([{ "id": "a" }, { "id": "c" }])));
    }

    #[test]
    fn test_remove_by_id() {
        let doc = Node::from(json!({
            "education": [{ "id": "d1" }, { "id": "d2" }]
        }));
        let next = remove_entry_by_id(&doc, &path("education"), "d1").unwrap();
        assert_eq!(value_at(&next, "education"), Some(json!([{ "id": "d2" }])));
    }

    #[test]
    fn test_remove_by_id_twice_reports_entry_not_found() {
        let doc = Node::from(json!({ "education": [{ "id": "d1" }] }));
        let once = remove_entry_by_id(&doc, &path("education"), "d1").unwrap();
        let err = remove_entry_by_id(&once, &path("education"), "d1").unwrap_err();
        assert_eq!(
            err,
            EditError::EntryNotFound {
                path: "education".into(),
                id: "d1".into()
            }
        );
    }

    #[test]
    fn test_add_bullet_point_seeds_from_description() {
        let doc = Node::from(json!({
            "experience": [{ "id": "e1", "description": "Built X\n- Shipped Y\n\n" }]
        }));
        let next = add_bullet_point(&doc, "e1").unwrap();
        assert_eq!(
            value_at(&next, "experience[0].bulletPoints"),
            Some(json!(["Built X", "Shipped Y", ""]))
        );
        assert_eq!(
            value_at(&next, "experience[0].description"),
            Some(json!("Built X\n- Shipped Y\n\n"))
        );
    }

    #[test]
    fn test_add_bullet_point_twice_does_not_resplit() {
        let doc = Node::from(json!({
            "experience": [{ "id": "e1", "description": "One\n• Two\nThree" }]
        }));
        let once = add_bullet_point(&doc, "e1").unwrap();
        let twice = add_bullet_point(&once, "e1").unwrap();
        assert_eq!(
            value_at(&twice, "experience[0].bulletPoints"),
            Some(json!(["One", "Two", "Three", "", ""]))
        );
    }

    #[test]
    fn test_add_bullet_point_appends_to_existing_list() {
        let doc = Node::from(json!({
            "experience": [{ "id": "e1", "description": "Ignored", "bulletPoints": ["Kept"] }]
        }));
        let next = add_bullet_point(&doc, "e1").unwrap();
        assert_eq!(
            value_at(&next, "experience[0].bulletPoints"),
            Some(json!(["Kept", ""]))
        );
    }

    #[test]
    fn test_add_bullet_point_without_description() {
        let doc = Node::from(json!({ "experience": [{ "id": "e1" }] }));
        let next = add_bullet_point(&doc, "e1").unwrap();
        assert_eq!(value_at(&next, "experience[0].bulletPoints"), Some(json!([""])));
    }

    #[test]
    fn test_add_bullet_point_unknown_entry() {
        let doc = Node::from(json!({ "experience": [{ "id": "e1" }] }));
        assert!(matches!(
            add_bullet_point(&doc, "nope"),
            Err(EditError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_last_bullet_leaves_empty_list() {
        let doc = Node::from(json!({
            "experience": [{ "id": "e1", "description": "Old", "bulletPoints": ["Only"] }]
        }));
        let next = remove_bullet_point(&doc, "e1", 0).unwrap();
        assert_eq!(value_at(&next, "experience[0].bulletPoints"), Some(json!([])));

        let again = add_bullet_point(&next, "e1").unwrap();
        assert_eq!(value_at(&again, "experience[0].bulletPoints"), Some(json!([""])));
    }

    #[test]
    fn test_remove_bullet_out_of_range() {
        let doc = Node::from(json!({
            "experience": [{ "id": "e1", "bulletPoints": ["A"] }]
        }));
        assert!(matches!(
            remove_bullet_point(&doc, "e1", 3),
            Err(EditError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
    }

    #[test]
    fn test_remove_bullet_without_list() {
        let doc = Node::from(json!({ "experience": [{ "id": "e1", "description": "A" }] }));
        assert!(matches!(
            remove_bullet_point(&doc, "e1", 0),
            Err(EditError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_collection_ops_share_other_entries() {
        let doc = Node::from(json!({
            "experience": [{ "id": "e1", "bulletPoints": [] }, { "id": "e2", "company": "Globex" }],
            "skills": [{ "id": "s1" }]
        }));
        let next = add_bullet_point(&doc, "e1").unwrap();
        let shared = |p: &str| match (get(&doc, &path(p)), get(&next, &path(p))) {
            (Some(Node::Object(a)), Some(Node::Object(b))) => Arc::ptr_eq(a, b),
            (Some(Node::Array(a)), Some(Node::Array(b))) => Arc::ptr_eq(a, b),
            _ => false,
        };
        assert!(shared("experience[1]"));
        assert!(shared("skills"));
        assert!(!shared("experience[0]"));
    }
}
