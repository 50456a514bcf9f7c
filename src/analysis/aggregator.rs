//! Opportunity-cost aggregation and bucketing.
//!
//! Turns a snapshot of business capabilities with planning-phase projects
//! into one bucketed point per capability: cost velocity on the x-axis,
//! ordinal opportunity cost on the y-axis. Pure computation over the
//! snapshot; no I/O.

use crate::models::{
    AggregationResult, BusinessCapability, CapabilityPoint, MatrixSummary, OrdinalLevel, Project,
    PLAN_PHASE,
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

const SECONDS_PER_DAY: i64 = 86_400;

struct RawPoint {
    id: String,
    name: String,
    level: OrdinalLevel,
    velocity: f64,
    sum_budgets: f64,
    project_count: usize,
}

/// Aggregate capabilities into bucketed matrix points.
///
/// A project is eligible when its current lifecycle phase is `plan` and it
/// carries at least one tag from the opportunity-cost tag group.
/// Capabilities without eligible projects are dropped; so are capabilities
/// whose group tags carry no recognizable level name (logged as a warning,
/// which keeps `y_kpi` a valid scale index on every emitted point).
///
/// `now` is injected so velocity is a deterministic function of the input.
pub fn aggregate(
    capabilities: &[BusinessCapability],
    opportunity_cost_tag_group_id: &str,
    x_kpi_buckets: u32,
    now: DateTime<Utc>,
) -> AggregationResult {
    let x_kpi_buckets = x_kpi_buckets.max(1);
    let mut raw_points: Vec<RawPoint> = Vec::new();

    for capability in capabilities {
        let eligible: Vec<&Project> = capability
            .projects
            .iter()
            .filter(|p| {
                p.lifecycle_phase == PLAN_PHASE
                    && p.tags
                        .iter()
                        .any(|t| t.tag_group_id == opportunity_cost_tag_group_id)
            })
            .collect();

        if eligible.is_empty() {
            debug!("capability {} has no eligible projects", capability.name);
            continue;
        }

        let level = eligible
            .iter()
            .filter_map(|p| dominant_level(p, opportunity_cost_tag_group_id))
            .max();
        let Some(level) = level else {
            warn!(
                "capability {} carries no recognizable opportunity-cost level, skipping",
                capability.name
            );
            continue;
        };

        let velocity: f64 = eligible
            .iter()
            .map(|p| p.total_budget() / plan_delta_days(p, now) as f64)
            .sum();
        let sum_budgets: f64 = eligible.iter().map(|p| p.total_budget()).sum();

        raw_points.push(RawPoint {
            id: capability.id.clone(),
            name: capability.name.clone(),
            level,
            velocity,
            sum_budgets,
            project_count: eligible.len(),
        });
    }

    let max_x_kpi = raw_points.iter().map(|p| p.velocity).fold(0.0, f64::max);
    debug!(
        "plotting {} of {} capabilities, max velocity {:.3}",
        raw_points.len(),
        capabilities.len(),
        max_x_kpi
    );

    let points = raw_points
        .into_iter()
        .map(|raw| CapabilityPoint {
            id: raw.id,
            name: raw.name,
            opportunity_cost: raw.level,
            x_kpi: normalize_bucket(raw.velocity, max_x_kpi, x_kpi_buckets),
            x_kpi_value: raw.velocity,
            y_kpi: raw.level.rank(),
            sum_budgets: raw.sum_budgets,
            project_count: raw.project_count,
        })
        .collect();

    AggregationResult {
        points,
        summary: MatrixSummary {
            max_x_kpi,
            x_kpi_buckets,
            y_kpi_buckets: OrdinalLevel::SCALE.len() as u32,
            y_kpi_bucket_names: OrdinalLevel::bucket_names(),
        },
    }
}

/// Highest-ranked level among the project's tags from the resolved group.
/// Group tags whose names are not on the scale are ignored. Two tags of
/// equal rank name the same level, so the choice between them is moot.
fn dominant_level(project: &Project, tag_group_id: &str) -> Option<OrdinalLevel> {
    project
        .tags
        .iter()
        .filter(|t| t.tag_group_id == tag_group_id)
        .filter_map(|t| OrdinalLevel::from_name(&t.name))
        .max()
}

/// Days the project has spent in planning: whole days since the start of
/// every `plan` lifecycle entry, summed across entries. Floored at 1 so a
/// zero-duration or date-less plan phase cannot divide by zero downstream.
fn plan_delta_days(project: &Project, now: DateTime<Utc>) -> i64 {
    let days: i64 = project
        .phases
        .iter()
        .filter(|entry| entry.phase == PLAN_PHASE)
        .filter_map(|entry| entry.start_date)
        .map(|start| ceil_days_between(now, start))
        .sum();
    days.max(1)
}

/// Whole days between a phase start (midnight UTC) and `now`, rounded up.
fn ceil_days_between(now: DateTime<Utc>, start: NaiveDate) -> i64 {
    let start = match start.and_hms_opt(0, 0, 0) {
        Some(dt) => dt.and_utc(),
        None => return 0,
    };
    let seconds = (now - start).num_seconds().abs();
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Map a raw velocity onto `[0, buckets - 1]` relative to the maximum.
/// With no velocity anywhere, every capability lands in bucket 0.
fn normalize_bucket(raw: f64, max: f64, buckets: u32) -> u32 {
    if max <= 0.0 {
        return 0;
    }
    ((raw / max) * f64::from(buckets - 1)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LifecyclePhase, Tag};
    use chrono::TimeZone;

    const GROUP: &str = "tg-oc";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()
    }

    fn level_tag(name: &str) -> Tag {
        Tag {
            id: format!("tag-{name}"),
            name: name.to_string(),
            tag_group_id: GROUP.to_string(),
        }
    }

    fn foreign_tag(name: &str) -> Tag {
        Tag {
            id: format!("tag-{name}"),
            name: name.to_string(),
            tag_group_id: "tg-other".to_string(),
        }
    }

    fn plan_project(name: &str, cap_ex: f64, op_ex: f64, plan_days: i64, tags: Vec<Tag>) -> Project {
        Project {
            id: format!("p-{name}"),
            name: name.to_string(),
            lifecycle_phase: PLAN_PHASE.to_string(),
            phases: vec![LifecyclePhase {
                phase: PLAN_PHASE.to_string(),
                start_date: Some(now().date_naive() - chrono::Duration::days(plan_days)),
            }],
            budget_op_ex: op_ex,
            budget_cap_ex: cap_ex,
            tags,
        }
    }

    fn capability(name: &str, projects: Vec<Project>) -> BusinessCapability {
        BusinessCapability {
            id: format!("bc-{name}"),
            name: name.to_string(),
            projects,
        }
    }

    #[test]
    fn test_reference_scenario_single_capability() {
        // 150 over 30 plan days -> raw velocity 5; alone it is the maximum,
        // so the normalized bucket is the top one.
        let caps = vec![capability(
            "BC A",
            vec![plan_project("a", 100.0, 50.0, 30, vec![level_tag("high")])],
        )];

        let result = aggregate(&caps, GROUP, 4, now());

        assert_eq!(result.points.len(), 1);
        let point = &result.points[0];
        assert_eq!(point.x_kpi_value, 5.0);
        assert_eq!(result.summary.max_x_kpi, 5.0);
        assert_eq!(point.x_kpi, 3);
        assert_eq!(point.opportunity_cost, OrdinalLevel::High);
        assert_eq!(point.y_kpi, 2);
        assert_eq!(point.sum_budgets, 150.0);
    }

    #[test]
    fn test_two_capability_normalization() {
        // Raw velocities 2 and 8 with 4 buckets: round(0.25 * 3) = 1 and 3.
        let caps = vec![
            capability(
                "A",
                vec![plan_project("a", 60.0, 0.0, 30, vec![level_tag("low")])],
            ),
            capability(
                "B",
                vec![plan_project("b", 240.0, 0.0, 30, vec![level_tag("low")])],
            ),
        ];

        let result = aggregate(&caps, GROUP, 4, now());

        assert_eq!(result.summary.max_x_kpi, 8.0);
        assert_eq!(result.points[0].x_kpi, 1);
        assert_eq!(result.points[1].x_kpi, 3);
    }

    #[test]
    fn test_excludes_capabilities_without_eligible_projects() {
        let live_project = Project {
            lifecycle_phase: "active".to_string(),
            ..plan_project("live", 10.0, 0.0, 10, vec![level_tag("high")])
        };
        let untagged = plan_project("untagged", 10.0, 0.0, 10, vec![foreign_tag("high")]);
        let caps = vec![
            capability("no projects", vec![]),
            capability("wrong phase", vec![live_project]),
            capability("wrong group", vec![untagged]),
            capability("kept", vec![plan_project("p", 10.0, 0.0, 10, vec![level_tag("low")])]),
        ];

        let result = aggregate(&caps, GROUP, 4, now());

        assert_eq!(result.points.len(), 1);
        assert_eq!(result.points[0].name, "kept");
    }

    #[test]
    fn test_dominant_tag_across_projects() {
        // Project-level dominance first, then across the capability.
        let caps = vec![capability(
            "BC",
            vec![
                plan_project("a", 10.0, 0.0, 10, vec![level_tag("low"), level_tag("medium")]),
                plan_project("b", 10.0, 0.0, 10, vec![level_tag("very high"), level_tag("high")]),
            ],
        )];

        let result = aggregate(&caps, GROUP, 4, now());

        assert_eq!(result.points[0].opportunity_cost, OrdinalLevel::VeryHigh);
        assert_eq!(result.points[0].y_kpi, 3);
    }

    #[test]
    fn test_unrecognized_level_names_are_ignored_for_ranking() {
        let caps = vec![capability(
            "BC",
            vec![plan_project(
                "a",
                10.0,
                0.0,
                10,
                vec![level_tag("not-a-level"), level_tag("medium")],
            )],
        )];

        let result = aggregate(&caps, GROUP, 4, now());
        assert_eq!(result.points[0].opportunity_cost, OrdinalLevel::Medium);
    }

    #[test]
    fn test_capability_with_only_unrecognized_levels_is_dropped() {
        let caps = vec![capability(
            "BC",
            vec![plan_project("a", 10.0, 0.0, 10, vec![level_tag("urgent")])],
        )];

        let result = aggregate(&caps, GROUP, 4, now());
        assert!(result.points.is_empty());
    }

    #[test]
    fn test_sum_budgets_counts_eligible_projects_only() {
        let ineligible = Project {
            lifecycle_phase: "active".to_string(),
            ..plan_project("x", 999.0, 999.0, 10, vec![level_tag("high")])
        };
        let caps = vec![capability(
            "BC",
            vec![
                plan_project("a", 100.0, 50.0, 10, vec![level_tag("low")]),
                plan_project("b", 25.0, 25.0, 10, vec![level_tag("low")]),
                ineligible,
            ],
        )];

        let result = aggregate(&caps, GROUP, 4, now());

        assert_eq!(result.points[0].sum_budgets, 200.0);
        assert_eq!(result.points[0].project_count, 2);
    }

    #[test]
    fn test_zero_delta_days_does_not_divide_by_zero() {
        // Plan phase started today: the day delta floors at 1, so the
        // velocity equals the full budget.
        let caps = vec![capability(
            "BC",
            vec![plan_project("a", 100.0, 0.0, 0, vec![level_tag("low")])],
        )];

        let result = aggregate(&caps, GROUP, 4, now());

        let point = &result.points[0];
        assert!(point.x_kpi_value.is_finite());
        assert_eq!(point.x_kpi_value, 100.0);
    }

    #[test]
    fn test_missing_plan_start_date_floors_at_one_day() {
        let mut project = plan_project("a", 80.0, 0.0, 0, vec![level_tag("low")]);
        project.phases = vec![LifecyclePhase {
            phase: PLAN_PHASE.to_string(),
            start_date: None,
        }];
        let caps = vec![capability("BC", vec![project])];

        let result = aggregate(&caps, GROUP, 4, now());
        assert_eq!(result.points[0].x_kpi_value, 80.0);
    }

    #[test]
    fn test_multiple_plan_phases_sum_their_deltas() {
        let mut project = plan_project("a", 300.0, 0.0, 10, vec![level_tag("low")]);
        project.phases.push(LifecyclePhase {
            phase: PLAN_PHASE.to_string(),
            start_date: Some(now().date_naive() - chrono::Duration::days(20)),
        });
        let caps = vec![capability("BC", vec![project])];

        let result = aggregate(&caps, GROUP, 4, now());
        assert_eq!(result.points[0].x_kpi_value, 10.0);
    }

    #[test]
    fn test_x_kpi_stays_within_bucket_range() {
        let caps: Vec<BusinessCapability> = (1..=7)
            .map(|i| {
                capability(
                    &format!("BC {i}"),
                    vec![plan_project(
                        &format!("p{i}"),
                        (i * 37) as f64,
                        0.0,
                        30,
                        vec![level_tag("medium")],
                    )],
                )
            })
            .collect();

        for buckets in 1..=6 {
            let result = aggregate(&caps, GROUP, buckets, now());
            for point in &result.points {
                assert!(point.x_kpi < buckets, "bucket {} with {} buckets", point.x_kpi, buckets);
            }
        }
    }

    #[test]
    fn test_zero_max_velocity_puts_everything_in_bucket_zero() {
        let caps = vec![
            capability("A", vec![plan_project("a", 0.0, 0.0, 10, vec![level_tag("low")])]),
            capability("B", vec![plan_project("b", 0.0, 0.0, 20, vec![level_tag("high")])]),
        ];

        let result = aggregate(&caps, GROUP, 4, now());

        assert_eq!(result.summary.max_x_kpi, 0.0);
        assert!(result.points.iter().all(|p| p.x_kpi == 0));
    }

    #[test]
    fn test_empty_input_yields_empty_result() {
        let result = aggregate(&[], GROUP, 4, now());
        assert!(result.points.is_empty());
        assert_eq!(result.summary.max_x_kpi, 0.0);
        assert_eq!(result.summary.y_kpi_buckets, 4);
        assert_eq!(
            result.summary.y_kpi_bucket_names,
            vec!["low", "medium", "high", "very high"]
        );
    }

    #[test]
    fn test_summary_metadata() {
        let caps = vec![capability(
            "BC",
            vec![plan_project("a", 10.0, 0.0, 10, vec![level_tag("low")])],
        )];
        let result = aggregate(&caps, GROUP, 6, now());
        assert_eq!(result.summary.x_kpi_buckets, 6);
        assert_eq!(result.summary.y_kpi_buckets, 4);
    }
}
