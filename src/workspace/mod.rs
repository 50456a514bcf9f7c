//! Demo workspace provisioning.
//!
//! Stands up (and tears down) a small demo workspace so the report can be
//! exercised against a fresh tenant: the opportunity-cost tag group with
//! its four level tags, a handful of business capabilities, and planning
//! projects with budgets linked to them.

use crate::analysis::matcher;
use crate::client::graphql::GraphQlExecutor;
use crate::client::queries::{self, Patch};
use crate::models::{Tag, PLAN_PHASE};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

/// Fact-sheet type carrying opportunity-cost tags.
pub const PROJECT_FACT_SHEET_TYPE: &str = "Project";

const TAG_GROUP_DESCRIPTION: &str = "Created by oppcost demo seeding";

/// A tag to provision, with its display color.
#[derive(Debug, Clone)]
pub struct DemoTag {
    pub name: &'static str,
    pub color: &'static str,
}

/// A planning project to provision.
#[derive(Debug, Clone)]
pub struct DemoProject {
    pub name: &'static str,
    pub capability: &'static str,
    pub level: &'static str,
    pub budget_cap_ex: f64,
    pub budget_op_ex: f64,
    /// How many days ago the plan phase started.
    pub plan_days_ago: i64,
}

/// The full demo dataset.
#[derive(Debug, Clone)]
pub struct DemoDataset {
    pub tag_group_name: &'static str,
    pub tags: Vec<DemoTag>,
    pub capabilities: Vec<&'static str>,
    pub projects: Vec<DemoProject>,
}

impl DemoDataset {
    /// Names of every fact sheet the dataset provisions.
    pub fn fact_sheet_names(&self) -> Vec<&'static str> {
        self.capabilities
            .iter()
            .copied()
            .chain(self.projects.iter().map(|p| p.name))
            .collect()
    }
}

/// The built-in demo dataset.
pub fn demo_dataset() -> DemoDataset {
    DemoDataset {
        tag_group_name: "Opportunity Cost",
        tags: vec![
            DemoTag { name: "low", color: "#4caf50" },
            DemoTag { name: "medium", color: "#ffa726" },
            DemoTag { name: "high", color: "#f44336" },
            DemoTag { name: "very high", color: "#ba68c8" },
        ],
        capabilities: vec!["BC A", "BC B", "BC C", "BC D"],
        projects: vec![
            DemoProject {
                name: "Payment Gateway Replacement",
                capability: "BC A",
                level: "high",
                budget_cap_ex: 100.0,
                budget_op_ex: 50.0,
                plan_days_ago: 30,
            },
            DemoProject {
                name: "CRM Consolidation",
                capability: "BC B",
                level: "medium",
                budget_cap_ex: 60.0,
                budget_op_ex: 0.0,
                plan_days_ago: 30,
            },
            DemoProject {
                name: "Data Lake Onboarding",
                capability: "BC B",
                level: "low",
                budget_cap_ex: 200.0,
                budget_op_ex: 40.0,
                plan_days_ago: 30,
            },
            DemoProject {
                name: "Core Ledger Rewrite",
                capability: "BC C",
                level: "very high",
                budget_cap_ex: 800.0,
                budget_op_ex: 120.0,
                plan_days_ago: 90,
            },
            DemoProject {
                name: "Intranet Refresh",
                capability: "BC D",
                level: "low",
                budget_cap_ex: 30.0,
                budget_op_ex: 10.0,
                plan_days_ago: 14,
            },
        ],
    }
}

fn progress_bar(len: u64, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

/// Provision the demo workspace.
///
/// Mutation fan-out per step runs concurrently; steps are sequential
/// because later ones need the ids of earlier ones.
pub async fn seed_demo(
    client: &dyn GraphQlExecutor,
    dataset: &DemoDataset,
    now: DateTime<Utc>,
    show_progress: bool,
) -> Result<()> {
    info!("seeding demo workspace");

    let group = queries::create_tag_group(
        client,
        dataset.tag_group_name,
        TAG_GROUP_DESCRIPTION,
        &[PROJECT_FACT_SHEET_TYPE],
    )
    .await
    .context("Failed to create the opportunity-cost tag group")?;

    let created_tags = join_all(
        dataset
            .tags
            .iter()
            .map(|tag| queries::create_tag(client, &group.id, tag.name, tag.color)),
    )
    .await;
    let tag_index: HashMap<String, Tag> = created_tags
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .context("Failed to create level tags")?
        .into_iter()
        .map(|tag| (tag.name.clone(), tag))
        .collect();

    let created_capabilities = join_all(dataset.capabilities.iter().map(|name| {
        queries::create_fact_sheet(client, name, "BusinessCapability", &[])
    }))
    .await;
    let capability_index: HashMap<String, String> = created_capabilities
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .context("Failed to create business capabilities")?
        .into_iter()
        .map(|fs| (fs.name.clone(), fs.id))
        .collect();

    let pb = progress_bar(dataset.projects.len() as u64, show_progress);
    pb.set_message("creating projects");

    for project in &dataset.projects {
        let tag = tag_index
            .get(project.level)
            .with_context(|| format!("Demo level tag \"{}\" was not created", project.level))?;
        let capability_id = capability_index
            .get(project.capability)
            .with_context(|| format!("Demo capability \"{}\" was not created", project.capability))?;

        let created = queries::create_fact_sheet(client, project.name, PROJECT_FACT_SHEET_TYPE, &[])
            .await
            .with_context(|| format!("Failed to create project \"{}\"", project.name))?;

        let start_date = (now - Duration::days(project.plan_days_ago)).date_naive();
        let patches = vec![
            Patch::replace("/tags", json!([{ "tagId": tag.id }]).to_string()),
            Patch::replace(
                "/lifecycle",
                json!({
                    "phases": [
                        { "phase": PLAN_PHASE, "startDate": start_date.to_string() }
                    ]
                })
                .to_string(),
            ),
            Patch::replace("/budgetCapEx", project.budget_cap_ex.to_string()),
            Patch::replace("/budgetOpEx", project.budget_op_ex.to_string()),
            Patch::add(
                format!("/relProjectToBusinessCapability/new_{capability_id}"),
                json!({ "factSheetId": capability_id }).to_string(),
            ),
        ];

        queries::update_fact_sheet(client, &created.id, &patches)
            .await
            .with_context(|| format!("Failed to patch project \"{}\"", project.name))?;
        pb.inc(1);
    }
    pb.finish_with_message("projects created");

    info!(
        "seeded tag group {} with {} tags, {} capabilities, {} projects",
        group.id,
        tag_index.len(),
        capability_index.len(),
        dataset.projects.len()
    );
    Ok(())
}

/// Tear the demo workspace down: delete the opportunity-cost tag group
/// (tags first, then the group) and archive the demo fact sheets.
pub async fn reset_demo(
    client: &dyn GraphQlExecutor,
    dataset: &DemoDataset,
    threshold: f64,
    show_progress: bool,
) -> Result<()> {
    info!("resetting demo workspace");

    let groups = queries::fetch_tag_groups(client).await?;
    match matcher::resolve_tag_group(
        &groups,
        dataset.tag_group_name,
        PROJECT_FACT_SHEET_TYPE,
        threshold,
    ) {
        Ok(group) => {
            let deletions = join_all(
                group
                    .tags
                    .iter()
                    .map(|tag| queries::delete_tag(client, &tag.id)),
            )
            .await;
            deletions
                .into_iter()
                .collect::<Result<Vec<_>>>()
                .context("Failed to delete level tags")?;
            queries::delete_tag_group(client, &group.id)
                .await
                .context("Failed to delete the tag group")?;
            info!("deleted tag group {} and {} tags", group.id, group.tags.len());
        }
        Err(_) => {
            warn!(
                "no tag group matching \"{}\", nothing to delete",
                dataset.tag_group_name
            );
        }
    }

    let demo_names = dataset.fact_sheet_names();
    let fact_sheets = queries::fetch_fact_sheet_index(client).await?;
    let to_archive: Vec<_> = fact_sheets
        .iter()
        .filter(|fs| {
            let demo_type = matches!(
                fs.fact_sheet_type.as_deref(),
                None | Some("BusinessCapability") | Some(PROJECT_FACT_SHEET_TYPE)
            );
            demo_type && demo_names.iter().any(|name| *name == fs.name)
        })
        .collect();

    let pb = progress_bar(to_archive.len() as u64, show_progress);
    pb.set_message("archiving fact sheets");
    let mut errors = 0usize;
    for fact_sheet in &to_archive {
        if let Err(e) = queries::archive_fact_sheet(client, &fact_sheet.id).await {
            warn!("failed to archive {}: {}", fact_sheet.name, e);
            errors += 1;
        }
        pb.inc(1);
    }
    pb.finish_with_message("fact sheets archived");

    if errors > 0 {
        anyhow::bail!("{} of {} fact sheets could not be archived", errors, to_archive.len());
    }
    info!("archived {} demo fact sheets", to_archive.len());
    Ok(())
}
