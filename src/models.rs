//! Data models for the opportunity-cost matrix.
//!
//! This module contains all the core data structures used throughout
//! the application: workspace snapshot entities (tags, tag groups,
//! projects, business capabilities) and the aggregated matrix output.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase label that makes a project eligible for aggregation.
pub const PLAN_PHASE: &str = "plan";

/// Qualitative opportunity-cost level.
///
/// The ordinal rank is the declaration order; higher rank = higher severity.
/// The rank doubles as the y-axis bucket index of the output matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrdinalLevel {
    /// Little cost in deferring the linked projects.
    #[serde(rename = "low")]
    Low,
    /// Noticeable cost of deferral.
    #[serde(rename = "medium")]
    Medium,
    /// Deferral is expensive.
    #[serde(rename = "high")]
    High,
    /// Deferral is prohibitively expensive.
    #[serde(rename = "very high")]
    VeryHigh,
}

impl OrdinalLevel {
    /// The fixed scale, lowest severity first.
    pub const SCALE: [OrdinalLevel; 4] = [
        OrdinalLevel::Low,
        OrdinalLevel::Medium,
        OrdinalLevel::High,
        OrdinalLevel::VeryHigh,
    ];

    /// Ordinal rank within the scale (0-based).
    pub fn rank(&self) -> u32 {
        *self as u32
    }

    /// Parse a tag name into a level. Case-insensitive; surrounding
    /// whitespace is ignored. Unknown names do not parse.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "low" => Some(OrdinalLevel::Low),
            "medium" => Some(OrdinalLevel::Medium),
            "high" => Some(OrdinalLevel::High),
            "very high" => Some(OrdinalLevel::VeryHigh),
            _ => None,
        }
    }

    /// Canonical names of the full scale, lowest first.
    pub fn bucket_names() -> Vec<String> {
        Self::SCALE.iter().map(|l| l.to_string()).collect()
    }
}

impl fmt::Display for OrdinalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrdinalLevel::Low => write!(f, "low"),
            OrdinalLevel::Medium => write!(f, "medium"),
            OrdinalLevel::High => write!(f, "high"),
            OrdinalLevel::VeryHigh => write!(f, "very high"),
        }
    }
}

/// A classification tag attached to a fact sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    /// Id of the owning tag group.
    pub tag_group_id: String,
}

/// A workspace-scoped collection of tags, optionally restricted to
/// certain fact-sheet types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    pub id: String,
    pub name: String,
    /// Empty means the group applies to every fact-sheet type.
    #[serde(default)]
    pub restrict_to_fact_sheet_types: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TagGroup {
    /// Whether the group may be attached to the given fact-sheet type.
    pub fn applies_to(&self, fact_sheet_type: &str) -> bool {
        self.restrict_to_fact_sheet_types.is_empty()
            || self
                .restrict_to_fact_sheet_types
                .iter()
                .any(|t| t == fact_sheet_type)
    }
}

/// One entry of a project's lifecycle, carrying the phase label and the
/// date the phase started (if set in the workspace).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecyclePhase {
    pub phase: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// A project fact sheet as fetched from the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Current lifecycle phase label.
    pub lifecycle_phase: String,
    /// All lifecycle entries, in workspace order.
    #[serde(default)]
    pub phases: Vec<LifecyclePhase>,
    #[serde(default)]
    pub budget_op_ex: f64,
    #[serde(default)]
    pub budget_cap_ex: f64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Project {
    /// Combined capital and operating budget.
    pub fn total_budget(&self) -> f64 {
        self.budget_cap_ex + self.budget_op_ex
    }
}

/// A business capability with its linked projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCapability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// One bucketed point of the output matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityPoint {
    pub id: String,
    pub name: String,
    /// Dominant opportunity-cost level across the capability's projects.
    pub opportunity_cost: OrdinalLevel,
    /// Normalized velocity bucket in `[0, x_kpi_buckets - 1]`.
    #[serde(rename = "xKPI")]
    pub x_kpi: u32,
    /// Raw cost velocity before normalization, kept for display.
    #[serde(rename = "xKPIValue")]
    pub x_kpi_value: f64,
    /// Ordinal rank of `opportunity_cost` within the scale.
    #[serde(rename = "yKPI")]
    pub y_kpi: u32,
    /// Sum of budgets over the capability's eligible projects.
    pub sum_budgets: f64,
    /// Number of eligible projects behind this point.
    pub project_count: usize,
}

/// Summary metadata attached to an aggregation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSummary {
    /// Highest raw velocity across all plotted capabilities.
    #[serde(rename = "maxXKPI")]
    pub max_x_kpi: f64,
    #[serde(rename = "xKPIBuckets")]
    pub x_kpi_buckets: u32,
    #[serde(rename = "yKPIBuckets")]
    pub y_kpi_buckets: u32,
    #[serde(rename = "yKPIBucketNames")]
    pub y_kpi_bucket_names: Vec<String>,
}

/// Output of the opportunity-cost aggregation: one point per plotted
/// capability plus the bucket metadata a renderer needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub points: Vec<CapabilityPoint>,
    pub summary: MatrixSummary,
}

impl AggregationResult {
    /// Points that landed in the given matrix cell.
    pub fn points_in_cell(&self, x_kpi: u32, y_kpi: u32) -> Vec<&CapabilityPoint> {
        self.points
            .iter()
            .filter(|p| p.x_kpi == x_kpi && p.y_kpi == y_kpi)
            .collect()
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// GraphQL endpoint the snapshot was fetched from.
    pub api_url: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Resolved name of the opportunity-cost tag group.
    pub tag_group_name: String,
    /// Capabilities present in the snapshot.
    pub capabilities_total: usize,
    /// Capabilities that survived eligibility filtering.
    pub capabilities_plotted: usize,
    /// Eligible projects across all plotted capabilities.
    pub projects_considered: usize,
    /// Duration of fetch plus aggregation in seconds.
    pub duration_seconds: f64,
}

/// The complete matrix report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixReport {
    pub metadata: ReportMetadata,
    pub result: AggregationResult,
}
