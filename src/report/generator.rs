//! Markdown and JSON rendering of the matrix report.
//!
//! The Markdown output is the human-facing prioritization matrix; the JSON
//! output is the raw aggregation payload a rendering layer would consume.

use crate::models::{CapabilityPoint, MatrixReport, OrdinalLevel, ReportMetadata};
use anyhow::Result;

/// Generate the complete Markdown report.
pub fn generate_markdown_report(report: &MatrixReport) -> String {
    let mut output = String::new();

    output.push_str("# Opportunity-Cost Matrix\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    if report.result.points.is_empty() {
        output.push_str("No business capability has planning projects with an opportunity-cost tag; nothing to plot.\n");
        return output;
    }

    output.push_str(&generate_matrix_section(report));
    output.push_str(&generate_capability_section(&report.result.points));
    output.push_str(&generate_footer());

    output
}

/// Serialize the report as pretty JSON.
pub fn generate_json_report(report: &MatrixReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Workspace API:** {}\n", metadata.api_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Tag Group:** {}\n", metadata.tag_group_name));
    section.push_str(&format!(
        "- **Capabilities Plotted:** {} of {}\n",
        metadata.capabilities_plotted, metadata.capabilities_total
    ));
    section.push_str(&format!(
        "- **Projects Considered:** {}\n",
        metadata.projects_considered
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// The matrix grid: opportunity cost top-down on the y-axis, cost-velocity
/// buckets left-to-right (slowest first) on the x-axis.
fn generate_matrix_section(report: &MatrixReport) -> String {
    let summary = &report.result.summary;
    let mut section = String::new();

    section.push_str("## Matrix\n\n");

    section.push_str("| Opportunity Cost |");
    for bucket in 0..summary.x_kpi_buckets {
        section.push_str(&format!(" Velocity {} |", bucket));
    }
    section.push('\n');

    section.push_str("|:---|");
    for _ in 0..summary.x_kpi_buckets {
        section.push_str(":---:|");
    }
    section.push('\n');

    for level in OrdinalLevel::SCALE.iter().rev() {
        section.push_str(&format!("| **{}** |", level));
        for bucket in 0..summary.x_kpi_buckets {
            let cell = report.result.points_in_cell(bucket, level.rank());
            if cell.is_empty() {
                section.push_str(" – |");
            } else {
                let names: Vec<&str> = cell.iter().map(|p| p.name.as_str()).collect();
                section.push_str(&format!(" {} |", names.join("<br>")));
            }
        }
        section.push('\n');
    }

    section.push_str(&format!(
        "\nMaximum raw velocity: {:.2} budget units per planning day.\n\n",
        summary.max_x_kpi
    ));

    section
}

fn generate_capability_section(points: &[CapabilityPoint]) -> String {
    let mut section = String::new();

    section.push_str("## Capabilities\n\n");
    section.push_str("| Capability | Opportunity Cost | Velocity | xKPI | yKPI | Budgets | Projects |\n");
    section.push_str("|:---|:---|---:|:---:|:---:|---:|:---:|\n");

    let mut ordered: Vec<&CapabilityPoint> = points.iter().collect();
    ordered.sort_by(|a, b| {
        b.y_kpi
            .cmp(&a.y_kpi)
            .then(b.x_kpi.cmp(&a.x_kpi))
            .then(a.name.cmp(&b.name))
    });

    for point in ordered {
        section.push_str(&format!(
            "| {} | {} | {:.2} | {} | {} | {:.2} | {} |\n",
            point.name,
            point.opportunity_cost,
            point.x_kpi_value,
            point.x_kpi,
            point.y_kpi,
            point.sum_budgets,
            point.project_count
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by oppcost v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregationResult, MatrixSummary};
    use chrono::TimeZone;

    fn sample_report(points: Vec<CapabilityPoint>) -> MatrixReport {
        let plotted = points.len();
        MatrixReport {
            metadata: ReportMetadata {
                api_url: "https://eu.example.test/graphql".to_string(),
                generated_at: chrono::Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap(),
                tag_group_name: "Opportunity Cost".to_string(),
                capabilities_total: 4,
                capabilities_plotted: plotted,
                projects_considered: plotted,
                duration_seconds: 1.5,
            },
            result: AggregationResult {
                points,
                summary: MatrixSummary {
                    max_x_kpi: 5.0,
                    x_kpi_buckets: 4,
                    y_kpi_buckets: 4,
                    y_kpi_bucket_names: OrdinalLevel::bucket_names(),
                },
            },
        }
    }

    fn point(name: &str, level: OrdinalLevel, x_kpi: u32) -> CapabilityPoint {
        CapabilityPoint {
            id: format!("bc-{name}"),
            name: name.to_string(),
            opportunity_cost: level,
            x_kpi,
            x_kpi_value: 5.0,
            y_kpi: level.rank(),
            sum_budgets: 150.0,
            project_count: 1,
        }
    }

    #[test]
    fn test_markdown_places_capability_in_cell() {
        let report = sample_report(vec![point("BC A", OrdinalLevel::High, 3)]);
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Opportunity-Cost Matrix"));
        assert!(markdown.contains("| **high** | – | – | – | BC A |"));
        assert!(markdown.contains("Velocity 3"));
    }

    #[test]
    fn test_markdown_metadata_section() {
        let report = sample_report(vec![point("BC A", OrdinalLevel::Low, 0)]);
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("**Workspace API:** https://eu.example.test/graphql"));
        assert!(markdown.contains("**Tag Group:** Opportunity Cost"));
        assert!(markdown.contains("**Capabilities Plotted:** 1 of 4"));
    }

    #[test]
    fn test_markdown_empty_result() {
        let markdown = generate_markdown_report(&sample_report(vec![]));
        assert!(markdown.contains("nothing to plot"));
        assert!(!markdown.contains("## Capabilities"));
    }

    #[test]
    fn test_capability_table_sorted_by_severity() {
        let report = sample_report(vec![
            point("Low Cap", OrdinalLevel::Low, 1),
            point("Top Cap", OrdinalLevel::VeryHigh, 2),
        ]);
        let markdown = generate_markdown_report(&report);

        let top = markdown.find("Top Cap").unwrap();
        let low = markdown.rfind("| Low Cap").unwrap();
        assert!(top < low);
    }

    #[test]
    fn test_json_report_carries_kpi_keys() {
        let report = sample_report(vec![point("BC A", OrdinalLevel::High, 3)]);
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["result"]["summary"]["maxXKPI"], 5.0);
        assert_eq!(value["result"]["points"][0]["xKPI"], 3);
        assert_eq!(value["result"]["points"][0]["opportunityCost"], "high");
    }

    #[test]
    fn test_cell_with_two_capabilities_lists_both() {
        let report = sample_report(vec![
            point("BC A", OrdinalLevel::Medium, 2),
            point("BC B", OrdinalLevel::Medium, 2),
        ]);
        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("BC A<br>BC B"));
    }
}
