//! Request and response payloads of a resolution.

use crate::ancestors::CommonAncestor;
use crate::classify::RelationshipKind;
use crate::edge::EdgeDirection;
use chrono::NaiveDate;
use kinship_core::{ParentChildKind, Person, PersonId, Sex, TreeScope};
use serde::{Deserialize, Serialize};

/// A relationship question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub person1_id: PersonId,
    pub person2_id: PersonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_scope: Option<TreeScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_search_depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ResolveRequest {
    pub fn new(person1: impl Into<PersonId>, person2: impl Into<PersonId>) -> Self {
        Self {
            person1_id: person1.into(),
            person2_id: person2.into(),
            tree_scope: None,
            max_search_depth: None,
            language: None,
        }
    }

    pub fn with_scope(mut self, scope: TreeScope) -> Self {
        self.tree_scope = Some(scope);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_search_depth = Some(depth);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// What the next node on the path is relative to this one. `None` marks
/// the last node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeToNext {
    None,
    Parent,
    Child,
    Spouse,
}

impl From<EdgeDirection> for EdgeToNext {
    fn from(direction: EdgeDirection) -> Self {
        match direction {
            EdgeDirection::Parent => Self::Parent,
            EdgeDirection::Child => Self::Child,
            EdgeDirection::Spouse => Self::Spouse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub name: String,
    pub sex: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death: Option<NaiveDate>,
    pub living: bool,
}

impl From<&Person> for DisplayFields {
    fn from(person: &Person) -> Self {
        Self {
            name: person.display_name().to_string(),
            sex: person.sex,
            birth: person.birth,
            death: person.death,
            living: person.living,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathNode {
    pub person_id: PersonId,
    pub display_fields: DisplayFields,
    pub edge_to_next: EdgeToNext,
    /// Rendered `edge_to_next`, e.g. "mother".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_to_next: Option<String>,
}

/// Answer to a [`ResolveRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResponse {
    pub path_found: bool,
    pub path: Vec<PathNode>,
    pub common_ancestors: Vec<CommonAncestor>,
    pub relationship_kind: Option<RelationshipKind>,
    pub relationship_label_key: Option<String>,
    pub relationship_label: Option<String>,
    pub lineage: Option<ParentChildKind>,
    pub path_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResolutionResponse {
    /// A "no path" answer.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            path_found: false,
            path: Vec::new(),
            common_ancestors: Vec::new(),
            relationship_kind: None,
            relationship_label_key: None,
            relationship_label: None,
            lineage: None,
            path_length: 0,
            error_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request: ResolveRequest = serde_json::from_value(json!({
            "person1Id": "cora",
            "person2Id": "dev",
            "treeScope": ["smiths", "jones"],
            "maxSearchDepth": 6
        }))
        .unwrap();
        assert_eq!(request.person1_id.as_str(), "cora");
        assert_eq!(request.max_search_depth, Some(6));
        assert!(matches!(request.tree_scope, Some(TreeScope::Merged(ref ids)) if ids.len() == 2));
        assert!(request.language.is_none());
    }

    #[test]
    fn test_not_found_omits_nothing_but_message() {
        let value = serde_json::to_value(ResolutionResponse::not_found("no path")).unwrap();
        assert_eq!(value["pathFound"], json!(false));
        assert_eq!(value["pathLength"], json!(0));
        assert_eq!(value["errorMessage"], json!("no path"));
        assert!(value["relationshipKind"].is_null());
    }

    #[test]
    fn test_edge_to_next_names() {
        assert_eq!(serde_json::to_value(EdgeToNext::None).unwrap(), json!("none"));
        assert_eq!(
            serde_json::to_value(EdgeToNext::from(EdgeDirection::Spouse)).unwrap(),
            json!("spouse")
        );
    }
}
