//! Task templates: the briefs and checks handed out each round

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Brief and checks for a revision round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionTemplate {
    pub brief: String,
    pub checks: Vec<String>,
}

/// A predefined (brief, checks) pair used for round 1, with its revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub name: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub revision: RevisionTemplate,
}

impl TaskTemplate {
    /// Whether `task_id` was generated from this template
    pub fn owns_task(&self, task_id: &str) -> bool {
        task_id
            .strip_prefix(self.name.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// Template for roster row `index`: round-robin over the list
pub fn assign(templates: &[TaskTemplate], index: usize) -> Option<&TaskTemplate> {
    if templates.is_empty() {
        return None;
    }
    templates.get(index % templates.len())
}

/// Template a previously issued task id came from
pub fn template_for_task<'a>(
    templates: &'a [TaskTemplate],
    task_id: &str,
) -> Option<&'a TaskTemplate> {
    // Longest name first so "a-b" wins over "a" for "a-b-12345".
    templates
        .iter()
        .filter(|t| t.owns_task(task_id))
        .max_by_key(|t| t.name.len())
}

/// Load templates from a JSON array
pub fn load_templates(path: &Path) -> Result<Vec<TaskTemplate>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read templates from {}", path.display()))?;
    let templates: Vec<TaskTemplate> =
        serde_json::from_str(&json).context("Failed to parse templates")?;

    if templates.is_empty() {
        anyhow::bail!("Template file {} contains no templates", path.display());
    }

    Ok(templates)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The built-in template set
pub fn builtin_templates() -> Vec<TaskTemplate> {
    vec![
        TaskTemplate {
            name: "sum-of-sales".to_string(),
            brief: "Publish a single-page site that displays 'Sales Summary Dashboard'. \
                    Create a mock sales table with at least 3 products and show total sales."
                .to_string(),
            checks: strings(&[
                "Repo has MIT license",
                "README.md is professional",
                "Page displays sales data in a table",
                "Page shows total sales amount",
                "Page is responsive and styled",
            ]),
            revision: RevisionTemplate {
                brief: "Add a bar chart of sales per product above the table and a currency \
                        selector that converts every amount, including the total."
                    .to_string(),
                checks: strings(&[
                    "Repo has MIT license",
                    "README.md is updated for the revision",
                    "Page renders a chart of sales per product",
                    "Currency selector converts the total",
                ]),
            },
        },
        TaskTemplate {
            name: "markdown-to-html".to_string(),
            brief: "Create a page that converts markdown text to HTML. Include a text area \
                    where users can paste markdown and see live HTML preview below."
                .to_string(),
            checks: strings(&[
                "Repo has MIT license",
                "README.md is professional",
                "Page has textarea for markdown input",
                "Page renders markdown to HTML",
                "Code blocks are syntax highlighted",
            ]),
            revision: RevisionTemplate {
                brief: "Add a tab that shows the generated HTML source next to the preview \
                        and keep the last markdown input in localStorage across reloads."
                    .to_string(),
                checks: strings(&[
                    "Repo has MIT license",
                    "README.md is updated for the revision",
                    "Page offers a tab with the raw HTML source",
                    "Markdown input survives a reload",
                ]),
            },
        },
        TaskTemplate {
            name: "github-user-profile".to_string(),
            brief: "Create a page with a form to search GitHub users. Display user info \
                    including name, profile picture, followers, and account creation date."
                .to_string(),
            checks: strings(&[
                "Repo has MIT license",
                "README.md is professional",
                "Form accepts GitHub username",
                "Page fetches from GitHub API",
                "User info is displayed correctly",
            ]),
            revision: RevisionTemplate {
                brief: "Show the account age in whole years next to the creation date and \
                        display a clear error message when the user does not exist."
                    .to_string(),
                checks: strings(&[
                    "Repo has MIT license",
                    "README.md is updated for the revision",
                    "Page shows account age in years",
                    "Unknown users produce an error message",
                ]),
            },
        },
    ]
}
