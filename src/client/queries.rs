//! Query and mutation builders for the workspace API.
//!
//! The hosted schema exposes fact sheets and tag groups through relay-style
//! connections (`edges { node { … } }`); this module owns the documents,
//! flattens the connection shapes into the crate's models, and never lets a
//! malformed payload panic.

use crate::client::graphql::GraphQlExecutor;
use crate::models::{BusinessCapability, LifecyclePhase, Project, Tag, TagGroup};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const TAG_GROUPS_QUERY: &str = r#"
  fragment Tag on Tag { id name }

  fragment TagGroup on TagGroup {
    id name restrictToFactSheetTypes
    tags { edges { node { ...Tag } } }
  }

  { op: allTagGroups { edges { node { ...TagGroup } } } }
"#;

const CAPABILITY_MATRIX_QUERY: &str = r#"
  fragment Project on Project {
    id name
    lifecycle { asString phases { phase startDate } }
    budgetOpEx budgetCapEx
    tags { id name tagGroup { id } }
  }

  query ($filter: FilterInput) {
    op: allFactSheets(filter: $filter) {
      edges { node { ... on BusinessCapability {
        id name
        relBusinessCapabilityToProject {
          edges { node { factSheet { ...Project } } }
        }
      } } }
    }
  }
"#;

const FACT_SHEET_INDEX_QUERY: &str = r#"
  { op: allFactSheets { edges { node { id name type } } } }
"#;

const CREATE_TAG_GROUP_MUTATION: &str = r#"
  mutation(
    $name: String!,
    $description: String,
    $mode: TagGroupModeEnum!,
    $restrictToFactSheetTypes: [FactSheetType!]
  ) {
    op: createTagGroup(
      name: $name,
      description: $description,
      mode: $mode,
      restrictToFactSheetTypes: $restrictToFactSheetTypes
    ) { id name restrictToFactSheetTypes }
  }
"#;

const CREATE_TAG_MUTATION: &str = r#"
  mutation($name: String!, $color: String, $tagGroupId: ID) {
    op: createTag(name: $name, color: $color, tagGroupId: $tagGroupId) { id name }
  }
"#;

const CREATE_FACT_SHEET_MUTATION: &str = r#"
  mutation($input: BaseFactSheetInput!, $patches: [Patch]) {
    op: createFactSheet(input: $input, patches: $patches) {
      factSheet { id name type }
    }
  }
"#;

const UPDATE_FACT_SHEET_MUTATION: &str = r#"
  mutation($id: ID!, $patches: [Patch]!) {
    op: updateFactSheet(id: $id, patches: $patches) { factSheet { id } }
  }
"#;

const DELETE_TAG_MUTATION: &str = r#"mutation($id: ID!) { op: deleteTag(id: $id) { id } }"#;

const DELETE_TAG_GROUP_MUTATION: &str =
    r#"mutation($id: ID!) { op: deleteTagGroup(id: $id) { id } }"#;

/// A JSON-patch entry as the mutation API expects it: the value is a
/// JSON-encoded string, not an inline object.
#[derive(Debug, Clone, Serialize)]
pub struct Patch {
    pub op: String,
    pub path: String,
    pub value: String,
}

impl Patch {
    pub fn add(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: "add".to_string(),
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Minimal handle on a created or listed fact sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct FactSheetRef {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub fact_sheet_type: Option<String>,
}

// --- connection shapes ---------------------------------------------------

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

impl<T> Connection<T> {
    fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

#[derive(Debug, Deserialize)]
struct OpEnvelope<T> {
    op: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagGroupNode {
    id: String,
    name: String,
    #[serde(default)]
    restrict_to_fact_sheet_types: Vec<String>,
    tags: Option<Connection<TagNode>>,
}

#[derive(Debug, Deserialize)]
struct TagNode {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapabilityNode {
    id: String,
    name: String,
    rel_business_capability_to_project: Option<Connection<RelationNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationNode {
    fact_sheet: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectNode {
    id: String,
    name: String,
    lifecycle: Option<LifecycleNode>,
    #[serde(default)]
    budget_op_ex: f64,
    #[serde(default)]
    budget_cap_ex: f64,
    #[serde(default)]
    tags: Vec<ProjectTagNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleNode {
    as_string: Option<String>,
    #[serde(default)]
    phases: Vec<PhaseNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseNode {
    phase: String,
    start_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectTagNode {
    id: String,
    name: String,
    tag_group: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

fn decode<T: DeserializeOwned>(data: Value, what: &str) -> Result<T> {
    serde_json::from_value(data).with_context(|| format!("Unexpected shape in {} response", what))
}

// --- queries -------------------------------------------------------------

/// Fetch every tag group in the workspace with its nested tags.
pub async fn fetch_tag_groups(client: &dyn GraphQlExecutor) -> Result<Vec<TagGroup>> {
    let data = client.execute(TAG_GROUPS_QUERY, json!({})).await?;
    let envelope: OpEnvelope<Connection<TagGroupNode>> = decode(data, "tag groups")?;

    let groups: Vec<TagGroup> = envelope
        .op
        .into_nodes()
        .into_iter()
        .map(|node| {
            let tags = node
                .tags
                .map(Connection::into_nodes)
                .unwrap_or_default()
                .into_iter()
                .map(|tag| Tag {
                    id: tag.id,
                    name: tag.name,
                    tag_group_id: node.id.clone(),
                })
                .collect();
            TagGroup {
                id: node.id,
                name: node.name,
                restrict_to_fact_sheet_types: node.restrict_to_fact_sheet_types,
                tags,
            }
        })
        .collect();

    debug!("fetched {} tag groups", groups.len());
    Ok(groups)
}

/// Fetch business capabilities with their related projects.
pub async fn fetch_capability_matrix(
    client: &dyn GraphQlExecutor,
) -> Result<Vec<BusinessCapability>> {
    let variables = json!({
        "filter": {
            "facetFilters": [
                { "facetKey": "FactSheetTypes", "operator": "OR", "keys": ["BusinessCapability"] }
            ]
        }
    });
    let data = client.execute(CAPABILITY_MATRIX_QUERY, variables).await?;
    let envelope: OpEnvelope<Connection<CapabilityNode>> = decode(data, "capability matrix")?;

    let capabilities: Vec<BusinessCapability> = envelope
        .op
        .into_nodes()
        .into_iter()
        .map(|node| {
            let projects = node
                .rel_business_capability_to_project
                .map(Connection::into_nodes)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|rel| rel.fact_sheet)
                .map(flatten_project)
                .collect();
            BusinessCapability {
                id: node.id,
                name: node.name,
                projects,
            }
        })
        .collect();

    debug!("fetched {} business capabilities", capabilities.len());
    Ok(capabilities)
}

fn flatten_project(node: ProjectNode) -> Project {
    let (lifecycle_phase, phases) = match node.lifecycle {
        Some(lifecycle) => (
            lifecycle.as_string.unwrap_or_default(),
            lifecycle
                .phases
                .into_iter()
                .map(|p| LifecyclePhase {
                    phase: p.phase,
                    start_date: p.start_date,
                })
                .collect(),
        ),
        None => (String::new(), Vec::new()),
    };

    Project {
        id: node.id,
        name: node.name,
        lifecycle_phase,
        phases,
        budget_op_ex: node.budget_op_ex,
        budget_cap_ex: node.budget_cap_ex,
        tags: node
            .tags
            .into_iter()
            .filter_map(|tag| {
                // A tag without a group cannot count toward eligibility.
                tag.tag_group.map(|group| Tag {
                    id: tag.id,
                    name: tag.name,
                    tag_group_id: group.id,
                })
            })
            .collect(),
    }
}

/// List id and name of every fact sheet in the workspace.
pub async fn fetch_fact_sheet_index(client: &dyn GraphQlExecutor) -> Result<Vec<FactSheetRef>> {
    let data = client.execute(FACT_SHEET_INDEX_QUERY, json!({})).await?;
    let envelope: OpEnvelope<Connection<FactSheetRef>> = decode(data, "fact sheet index")?;
    Ok(envelope.op.into_nodes())
}

// --- mutations -----------------------------------------------------------

/// Create a tag group restricted to the given fact-sheet types.
pub async fn create_tag_group(
    client: &dyn GraphQlExecutor,
    name: &str,
    description: &str,
    restrict_to_fact_sheet_types: &[&str],
) -> Result<TagGroup> {
    let variables = json!({
        "name": name,
        "description": description,
        "mode": "MULTIPLE",
        "restrictToFactSheetTypes": restrict_to_fact_sheet_types,
    });
    let data = client.execute(CREATE_TAG_GROUP_MUTATION, variables).await?;
    let envelope: OpEnvelope<TagGroupNode> = decode(data, "createTagGroup")?;

    Ok(TagGroup {
        id: envelope.op.id,
        name: envelope.op.name,
        restrict_to_fact_sheet_types: envelope.op.restrict_to_fact_sheet_types,
        tags: vec![],
    })
}

/// Create one tag inside a group.
pub async fn create_tag(
    client: &dyn GraphQlExecutor,
    tag_group_id: &str,
    name: &str,
    color: &str,
) -> Result<Tag> {
    let variables = json!({ "name": name, "color": color, "tagGroupId": tag_group_id });
    let data = client.execute(CREATE_TAG_MUTATION, variables).await?;
    let envelope: OpEnvelope<TagNode> = decode(data, "createTag")?;

    Ok(Tag {
        id: envelope.op.id,
        name: envelope.op.name,
        tag_group_id: tag_group_id.to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FactSheetEnvelope {
    fact_sheet: FactSheetRef,
}

/// Create a fact sheet of the given type, optionally with initial patches.
pub async fn create_fact_sheet(
    client: &dyn GraphQlExecutor,
    name: &str,
    fact_sheet_type: &str,
    patches: &[Patch],
) -> Result<FactSheetRef> {
    let variables = json!({
        "input": { "name": name, "type": fact_sheet_type },
        "patches": patches,
    });
    let data = client.execute(CREATE_FACT_SHEET_MUTATION, variables).await?;
    let envelope: OpEnvelope<FactSheetEnvelope> = decode(data, "createFactSheet")?;
    Ok(envelope.op.fact_sheet)
}

/// Apply patches to an existing fact sheet.
pub async fn update_fact_sheet(
    client: &dyn GraphQlExecutor,
    id: &str,
    patches: &[Patch],
) -> Result<()> {
    let variables = json!({ "id": id, "patches": patches });
    client.execute(UPDATE_FACT_SHEET_MUTATION, variables).await?;
    Ok(())
}

/// Archive a fact sheet via a status patch.
pub async fn archive_fact_sheet(client: &dyn GraphQlExecutor, id: &str) -> Result<()> {
    update_fact_sheet(client, id, &[Patch::add("/status", "ARCHIVED")]).await
}

/// Delete a single tag.
pub async fn delete_tag(client: &dyn GraphQlExecutor, id: &str) -> Result<()> {
    client
        .execute(DELETE_TAG_MUTATION, json!({ "id": id }))
        .await?;
    Ok(())
}

/// Delete a tag group. Its tags must be deleted first.
pub async fn delete_tag_group(client: &dyn GraphQlExecutor, id: &str) -> Result<()> {
    client
        .execute(DELETE_TAG_GROUP_MUTATION, json!({ "id": id }))
        .await?;
    Ok(())
}
