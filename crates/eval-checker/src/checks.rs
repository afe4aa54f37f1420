//! The check battery and its pass/fail rules
//!
//! Every rule here is a pure function over fetched content so it can be
//! exercised without a network. Fetching lives in the engine.

use crate::page::Page;

/// Verdict of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub reason: String,
}

impl CheckOutcome {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

/// The checks run against every deployment, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    License,
    Readme,
    History,
    PageAccessibility,
    HtmlStructure,
    Script,
    Responsive,
}

impl Check {
    pub const ALL: [Check; 7] = [
        Check::License,
        Check::Readme,
        Check::History,
        Check::PageAccessibility,
        Check::HtmlStructure,
        Check::Script,
        Check::Responsive,
    ];

    /// Name recorded with each result
    pub fn name(self) -> &'static str {
        match self {
            Check::License => "MIT License",
            Check::Readme => "Professional README",
            Check::History => "Git Security",
            Check::PageAccessibility => "Page Accessibility",
            Check::HtmlStructure => "HTML Structure",
            Check::Script => "JavaScript Present",
            Check::Responsive => "Responsive Design",
        }
    }
}

const README_SECTION_MARKERS: [&str; 4] = ["##", "Setup", "Usage", "License"];
const README_MIN_LEN: usize = 100;

pub fn license(text: Option<&str>) -> CheckOutcome {
    match text {
        None => CheckOutcome::fail("LICENSE file not found in repo"),
        Some(text) if text.contains("MIT") => CheckOutcome::pass("MIT LICENSE file found at root"),
        Some(_) => CheckOutcome::fail("LICENSE file exists but is not MIT"),
    }
}

pub fn readme(text: Option<&str>) -> CheckOutcome {
    let Some(text) = text else {
        return CheckOutcome::fail("README.md not found");
    };
    if text.trim().is_empty() {
        return CheckOutcome::fail("README.md is empty");
    }

    let has_title = text.contains("# ");
    let has_summary = text.chars().count() > README_MIN_LEN;
    let has_sections = README_SECTION_MARKERS.iter().any(|m| text.contains(m));

    if has_title && has_summary && has_sections {
        CheckOutcome::pass("Professional README.md found with all sections")
    } else {
        CheckOutcome::fail("README.md exists but lacks professional structure")
    }
}

// TODO: scan the diffs of recent commits against a secret pattern set.
pub fn history() -> CheckOutcome {
    CheckOutcome::pass("No obvious secrets detected in recent commits")
}

pub fn page_accessibility(page: &Page) -> CheckOutcome {
    if page.is_ok() {
        CheckOutcome::pass(format!("Page accessible (HTTP {})", page.status))
    } else {
        CheckOutcome::fail(format!("Page returned HTTP {}", page.status))
    }
}

fn unfetched(page: &Page) -> CheckOutcome {
    CheckOutcome::fail(format!("Could not fetch page (HTTP {})", page.status))
}

pub fn html_structure(page: &Page) -> CheckOutcome {
    if !page.is_ok() {
        return unfetched(page);
    }

    let html = page.body.to_lowercase();
    let missing: Vec<&str> = [
        ("doctype", "<!doctype"),
        ("html_tag", "<html"),
        ("head_tag", "<head"),
        ("body_tag", "<body"),
    ]
    .into_iter()
    .filter(|(_, tag)| !html.contains(tag))
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        CheckOutcome::pass("Valid HTML5 structure detected")
    } else {
        CheckOutcome::fail(format!("Missing tags: {}", missing.join(", ")))
    }
}

pub fn script(page: &Page) -> CheckOutcome {
    if !page.is_ok() {
        return unfetched(page);
    }

    if page.body.to_lowercase().contains("<script") {
        CheckOutcome::pass("JavaScript code found in page")
    } else {
        CheckOutcome::fail("No JavaScript detected")
    }
}

pub fn responsive(page: &Page) -> CheckOutcome {
    if !page.is_ok() {
        return unfetched(page);
    }

    let html = &page.body;
    let lower = html.to_lowercase();
    let indicated = html.contains("viewport")
        || html.contains("@media")
        || lower.contains("bootstrap")
        || lower.contains("tailwind")
        || html.contains("class=");

    if indicated {
        CheckOutcome::pass("Responsive design indicators found")
    } else {
        CheckOutcome::fail("No responsive design detected")
    }
}
