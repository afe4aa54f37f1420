//! Round controller: plans each round's tasks and drives the dispatcher

use grader_common::{Submission, TaskRecord, TaskRequest};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::task_log::TaskLogClient;
use crate::templates::{self, TaskTemplate};

/// A task ready to send to one roster entry
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    /// Row of the roster this task belongs to
    pub index: usize,
    pub endpoint: String,
    pub template: String,
    pub request: TaskRequest,
}

/// A roster row that produced no task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub index: usize,
    pub email: String,
    pub reason: String,
}

/// Delivery result for one planned task
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub index: usize,
    pub email: String,
    pub task: String,
    pub outcome: DispatchOutcome,
}

/// Everything that happened in one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub round: u32,
    pub dispatched: Vec<DispatchRecord>,
    pub skipped: Vec<Skipped>,
}

impl BatchReport {
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Delivered { .. }))
    }

    pub fn unauthorized(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Unauthorized { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.dispatched.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Fresh task id: template name plus a short random suffix
pub fn new_task_id(template: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", template, &suffix[..5])
}

fn new_nonce() -> String {
    Uuid::new_v4().to_string()
}

/// Round 1: roster row `i` gets template `i mod n`
pub fn plan_round_one(
    roster: &[Submission],
    templates: &[TaskTemplate],
    evaluation_url: &str,
) -> (Vec<PlannedTask>, Vec<Skipped>) {
    let mut planned = Vec::new();
    let mut skipped = Vec::new();

    for (index, submission) in roster.iter().enumerate() {
        if let Err(e) = submission.validate() {
            warn!("Skipping submission {}: {}", index + 1, e);
            skipped.push(Skipped {
                index,
                email: submission.email.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        let Some(template) = templates::assign(templates, index) else {
            skipped.push(Skipped {
                index,
                email: submission.email.clone(),
                reason: "no task templates configured".to_string(),
            });
            continue;
        };

        planned.push(PlannedTask {
            index,
            endpoint: submission.endpoint.clone(),
            template: template.name.clone(),
            request: TaskRequest {
                email: submission.email.clone(),
                secret: submission.secret.clone(),
                task: new_task_id(&template.name),
                round: 1,
                nonce: new_nonce(),
                brief: template.brief.clone(),
                checks: template.checks.clone(),
                evaluation_url: evaluation_url.to_string(),
                attachments: Vec::new(),
            },
        });
    }

    (planned, skipped)
}

/// Round 2 and later: same task identity, the template's revision brief
///
/// Each student's most recent task from the previous round is reused. The
/// student service regenerates its artifact from the new brief.
pub fn plan_revision(
    roster: &[Submission],
    prior_tasks: &[TaskRecord],
    templates: &[TaskTemplate],
    round: u32,
    evaluation_url: &str,
) -> (Vec<PlannedTask>, Vec<Skipped>) {
    let mut planned = Vec::new();
    let mut skipped = Vec::new();

    for (index, submission) in roster.iter().enumerate() {
        let skip = |reason: String| Skipped {
            index,
            email: submission.email.clone(),
            reason,
        };

        if let Err(e) = submission.validate() {
            warn!("Skipping submission {}: {}", index + 1, e);
            skipped.push(skip(e.to_string()));
            continue;
        }

        let previous = prior_tasks
            .iter()
            .filter(|t| t.email == submission.email && t.round + 1 == round)
            .max_by_key(|t| t.id);

        let Some(previous) = previous else {
            warn!(
                "Skipping {}: no round {} task on record",
                submission.email,
                round - 1
            );
            skipped.push(skip(format!("no round {} task on record", round - 1)));
            continue;
        };

        let Some(template) = templates::template_for_task(templates, &previous.task) else {
            warn!("Skipping {}: task {} matches no template", submission.email, previous.task);
            skipped.push(skip(format!("task {} matches no template", previous.task)));
            continue;
        };

        planned.push(PlannedTask {
            index,
            endpoint: submission.endpoint.clone(),
            template: template.name.clone(),
            request: TaskRequest {
                email: submission.email.clone(),
                secret: submission.secret.clone(),
                task: previous.task.clone(),
                round,
                nonce: new_nonce(),
                brief: template.revision.brief.clone(),
                checks: template.revision.checks.clone(),
                evaluation_url: evaluation_url.to_string(),
                attachments: Vec::new(),
            },
        });
    }

    (planned, skipped)
}

/// Drives one round end to end
pub struct RoundController {
    dispatcher: Dispatcher,
    task_log: TaskLogClient,
    templates: Vec<TaskTemplate>,
    evaluation_url: String,
    pause: Duration,
}

impl RoundController {
    pub fn new(
        dispatcher: Dispatcher,
        task_log: TaskLogClient,
        templates: Vec<TaskTemplate>,
        evaluation_url: String,
        pause: Duration,
    ) -> Self {
        Self {
            dispatcher,
            task_log,
            templates,
            evaluation_url,
            pause,
        }
    }

    /// Plan and send every task for `round`
    ///
    /// Only reading the task log for a revision round can fail; individual
    /// deliveries never abort the batch.
    pub async fn run_round(
        &self,
        roster: &[Submission],
        round: u32,
    ) -> grader_common::Result<BatchReport> {
        info!("Processing round {} for {} submissions", round, roster.len());

        let (planned, skipped) = if round <= 1 {
            plan_round_one(roster, &self.templates, &self.evaluation_url)
        } else {
            let prior = self.task_log.tasks().await?;
            plan_revision(roster, &prior, &self.templates, round, &self.evaluation_url)
        };

        let mut report = BatchReport {
            round,
            dispatched: Vec::with_capacity(planned.len()),
            skipped,
        };

        let total = planned.len();
        for (position, task) in planned.into_iter().enumerate() {
            info!(
                "Submission {}/{}: {} ({} via template {})",
                position + 1,
                total,
                task.request.email,
                task.request.task,
                task.template
            );

            let outcome = self.dispatcher.send_task(&task.endpoint, &task.request).await;

            if outcome.is_delivered() {
                if let Err(e) = self.task_log.record(&task.request).await {
                    warn!("Task {} delivered but not logged: {}", task.request.task, e);
                }
            } else {
                warn!("Failed to send task to {}: {:?}", task.request.email, outcome);
            }

            report.dispatched.push(DispatchRecord {
                index: task.index,
                email: task.request.email,
                task: task.request.task,
                outcome,
            });

            if position + 1 < total {
                sleep(self.pause).await;
            }
        }

        info!(
            "Round {} finished: {} delivered, {} unauthorized, {} failed, {} skipped",
            round,
            report.delivered(),
            report.unauthorized(),
            report.failed(),
            report.skipped.len()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::builtin_templates;
    use chrono::Utc;
    use grader_common::TaskStatus;

    fn submission(email: &str) -> Submission {
        Submission {
            email: email.to_string(),
            endpoint: format!("http://{}.example.com", email.split('@').next().unwrap()),
            secret: "secret".to_string(),
        }
    }

    fn prior(id: usize, email: &str, task: &str, round: u32) -> TaskRecord {
        TaskRecord {
            id,
            timestamp: Utc::now(),
            email: email.to_string(),
            task: task.to_string(),
            round,
            nonce: format!("nonce-{id}"),
            brief: "brief".to_string(),
            checks: vec![],
            evaluation_url: "http://localhost:8001/notify".to_string(),
            status: TaskStatus::Created,
        }
    }

    #[test]
    fn test_new_task_id_shape() {
        let id = new_task_id("sum-of-sales");
        let suffix = id.strip_prefix("sum-of-sales-").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_round_one_is_deterministic_round_robin() {
        let roster: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| submission(&format!("{n}@example.com")))
            .collect();
        let templates = builtin_templates();

        let (first, _) = plan_round_one(&roster, &templates, "http://eval/notify");
        let (second, _) = plan_round_one(&roster, &templates, "http://eval/notify");

        let names = |plan: &[PlannedTask]| {
            plan.iter()
                .map(|p| p.template.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(
            names(&first),
            vec!["sum-of-sales", "markdown-to-html", "github-user-profile", "sum-of-sales"]
        );

        let request = &first[1].request;
        assert_eq!(request.round, 1);
        assert!(request.task.starts_with("markdown-to-html-"));
        assert_eq!(request.brief, templates[1].brief);
        assert_eq!(request.evaluation_url, "http://eval/notify");
        assert!(request.attachments.is_empty());
        assert_ne!(first[0].request.nonce, second[0].request.nonce);
    }

    #[test]
    fn test_invalid_rows_are_skipped_without_shifting_assignment() {
        let mut roster = vec![submission("a@example.com"), submission("b@example.com")];
        roster.push(submission("c@example.com"));
        roster[1].secret = String::new();

        let (planned, skipped) =
            plan_round_one(&roster, &builtin_templates(), "http://eval/notify");

        assert_eq!(planned.len(), 2);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 1);
        assert_eq!(planned[1].index, 2);
        assert_eq!(planned[1].template, "github-user-profile");
    }

    #[test]
    fn test_revision_reuses_latest_prior_task() {
        let roster = vec![submission("a@example.com"), submission("b@example.com")];
        let prior_tasks = vec![
            prior(0, "a@example.com", "sum-of-sales-aaaaa", 1),
            prior(1, "a@example.com", "markdown-to-html-bbbbb", 1),
            prior(2, "a@example.com", "github-user-profile-ccccc", 2),
        ];
        let templates = builtin_templates();

        let (planned, skipped) =
            plan_revision(&roster, &prior_tasks, &templates, 2, "http://eval/notify");

        assert_eq!(planned.len(), 1);
        let request = &planned[0].request;
        assert_eq!(request.task, "markdown-to-html-bbbbb");
        assert_eq!(request.round, 2);
        assert_eq!(request.brief, templates[1].revision.brief);
        assert_eq!(request.checks, templates[1].revision.checks);
        assert_ne!(request.nonce, "nonce-1");

        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].email, "b@example.com");
    }

    #[test]
    fn test_revision_skips_unknown_template() {
        let roster = vec![submission("a@example.com")];
        let prior_tasks = vec![prior(0, "a@example.com", "retired-template-12345", 1)];

        let (planned, skipped) =
            plan_revision(&roster, &prior_tasks, &builtin_templates(), 2, "http://eval/notify");

        assert!(planned.is_empty());
        assert!(skipped[0].reason.contains("matches no template"));
    }

    #[test]
    fn test_report_counts() {
        let record = |outcome| DispatchRecord {
            index: 0,
            email: "a@example.com".to_string(),
            task: "t".to_string(),
            outcome,
        };
        let report = BatchReport {
            round: 1,
            dispatched: vec![
                record(DispatchOutcome::Delivered { attempts: 1 }),
                record(DispatchOutcome::Unauthorized { attempts: 1 }),
                record(DispatchOutcome::Failed {
                    attempts: 3,
                    last_error: "HTTP 500".to_string(),
                }),
                record(DispatchOutcome::Delivered { attempts: 2 }),
            ],
            skipped: vec![],
        };

        assert_eq!(report.delivered(), 2);
        assert_eq!(report.unauthorized(), 1);
        assert_eq!(report.failed(), 1);
    }
}
