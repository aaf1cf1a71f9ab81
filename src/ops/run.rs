//! One full sync → process → commit cycle, optionally repeated on an interval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, debug_span, error, info, warn};

use crate::io::config_io::ConfigError;
use crate::io::store::{StoreError, TaskStore};
use crate::model::config::{Config, Markers};
use crate::model::task::{LabelId, Project, Snapshot, Task};
use crate::ops::activation::{Engine, PlanNode, plan_project};
use crate::ops::last_run;
use crate::parse::{DueError, ModifierParser, is_due, parse_timezone};

/// Error type for a single run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("task store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Due(#[from] DueError),
}

/// Everything one run reads besides the task data. Built fresh per run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Captured once at the start of the run
    pub now: DateTime<Tz>,
    /// Zone for due dates without an explicit one
    pub timezone: Tz,
    pub blocking_label: LabelId,
    /// Labels that suppress automatic due dates on activation
    pub next_labels: Vec<LabelId>,
    pub parser: ModifierParser,
    pub last_run_marker: String,
    pub hostname: String,
}

impl RunContext {
    /// Recurring and due at or before `now`
    pub fn is_active_recurring(&self, task: &Task) -> Result<bool, DueError> {
        match &task.due {
            Some(due) if due.is_recurring => is_due(due, self.timezone, &self.now),
            _ => Ok(false),
        }
    }
}

/// Run-level knobs
#[derive(Debug, Clone)]
pub struct Settings {
    pub markers: Markers,
    /// Commit staged changes; otherwise only log them
    pub execute: bool,
    pub interval: Option<Duration>,
    pub timezone: Option<Tz>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let timezone = match config.run.timezone.as_deref() {
            Some(name) => Some(
                parse_timezone(name).map_err(|_| ConfigError::InvalidTimezone(name.to_string()))?,
            ),
            None => None,
        };
        Ok(Settings {
            markers: config.markers.clone(),
            execute: config.run.execute,
            interval: config
                .run
                .interval_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
            timezone,
        })
    }
}

/// Label identifiers resolved from configured names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabels {
    pub blocking: LabelId,
    pub next: Vec<LabelId>,
}

/// Find the blocking label by exact name (required) and the next-eligible
/// set by name prefix (optional).
pub fn resolve_labels(store: &dyn TaskStore, markers: &Markers) -> Result<ResolvedLabels, ConfigError> {
    let blocking = store
        .list_labels(&|l| l.name == markers.blocking_label)
        .into_iter()
        .next()
        .ok_or_else(|| ConfigError::MissingLabel(markers.blocking_label.clone()))?;
    let next = match markers.next_label_prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => store
            .list_labels(&|l| l.name.starts_with(prefix))
            .into_iter()
            .map(|l| l.id)
            .collect(),
        _ => Vec::new(),
    };
    Ok(ResolvedLabels {
        blocking: blocking.id,
        next,
    })
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub projects: usize,
    pub archived_skipped: usize,
    pub changes: usize,
    pub committed: bool,
    /// Why the run was abandoned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Walk every non-archived project of `snapshot`, staging mutations on `store`.
pub fn process_snapshot(
    ctx: &RunContext,
    snapshot: &Snapshot,
    store: &mut dyn TaskStore,
) -> Result<RunReport, DueError> {
    let mut report = RunReport::default();
    for project in &snapshot.projects {
        if project.is_archived {
            debug!(project = %project.name, "project is archived, skipping");
            report.archived_skipped += 1;
            continue;
        }
        let span = debug_span!("project", name = %project.name.trim_end());
        let _enter = span.enter();

        let mut tasks = snapshot.project_tasks(&project.id);
        Engine::new(ctx, store).process_project(project, &mut tasks)?;
        report.projects += 1;
    }
    report.changes = store.pending_count();
    Ok(report)
}

/// Drives runs against one store
pub struct Updater<S: TaskStore> {
    store: S,
    settings: Settings,
    labels: ResolvedLabels,
    hostname: String,
}

impl<S: TaskStore> Updater<S> {
    /// Initial sync and label resolution. Failures here are fatal.
    pub fn connect(mut store: S, settings: Settings) -> Result<Self, RunError> {
        debug!("syncing the current state from the store");
        store.fetch_all()?;
        let labels = resolve_labels(&store, &settings.markers)?;
        debug!(
            label = %settings.markers.blocking_label,
            id = %labels.blocking,
            next = labels.next.len(),
            "labels resolved"
        );
        Ok(Updater {
            store,
            settings,
            labels,
            hostname: last_run::hostname(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Build the per-run context for `snapshot` at instant `now`
    pub fn context(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Result<RunContext, RunError> {
        let timezone = match (self.settings.timezone, snapshot.timezone.as_deref()) {
            (Some(tz), _) => tz,
            (None, Some(name)) => parse_timezone(name)?,
            (None, None) => {
                warn!("store reports no time zone, using UTC");
                Tz::UTC
            }
        };
        let now = now.with_timezone(&timezone);
        debug!(%timezone, %now, "run context");
        Ok(RunContext {
            now,
            timezone,
            blocking_label: self.labels.blocking.clone(),
            next_labels: self.labels.next.clone(),
            parser: ModifierParser::from_markers(&self.settings.markers),
            last_run_marker: self.settings.markers.last_run_marker.clone(),
            hostname: self.hostname.clone(),
        })
    }

    pub fn run_once(&mut self) -> Result<RunReport, RunError> {
        self.run_at(Utc::now())
    }

    /// One fetch → process → commit cycle with the clock fixed at `now`.
    /// A failed run leaves nothing staged.
    pub fn run_at(&mut self, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        let result = self.try_run_at(now);
        if result.is_err() {
            self.store.discard();
        }
        result
    }

    fn try_run_at(&mut self, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        let snapshot = self.store.fetch_all()?;
        let ctx = self.context(&snapshot, now)?;
        let mut report = process_snapshot(&ctx, &snapshot, &mut self.store)?;

        if report.changes == 0 {
            info!("no changes queued, skipping sync");
            return Ok(report);
        }
        for change in self.store.pending() {
            debug!(?change, "queued");
        }
        info!(changes = report.changes, "changes queued for sync");

        if self.settings.execute {
            debug!("committing to the task store");
            self.store.commit()?;
            report.committed = true;
        } else {
            info!("not executing; pass --execute to commit");
            self.store.discard();
        }
        Ok(report)
    }

    /// Run once, or forever with a sleep between runs when an interval is set.
    /// A failed run is logged and skipped; the next one starts from a fresh
    /// fetch.
    pub fn run(&mut self) -> RunReport {
        let Some(interval) = self.settings.interval else {
            return self.run_logged();
        };
        loop {
            let report = self.run_logged();
            if report.error.is_none() {
                info!(
                    projects = report.projects,
                    changes = report.changes,
                    committed = report.committed,
                    "run finished"
                );
            }
            info!(secs = interval.as_secs(), "sleeping");
            std::thread::sleep(interval);
        }
    }

    fn run_logged(&mut self) -> RunReport {
        match self.run_once() {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "error trying to sync with the task store");
                RunReport {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    /// Verdict trees for every non-archived project; nothing is staged.
    pub fn plan_at(&mut self, now: DateTime<Utc>) -> Result<Vec<(Project, Vec<PlanNode>)>, RunError> {
        let snapshot = self.store.fetch_all()?;
        let ctx = self.context(&snapshot, now)?;
        let mut plans = Vec::new();
        for project in snapshot.projects.iter().filter(|p| !p.is_archived) {
            let tasks = snapshot.project_tasks(&project.id);
            plans.push((project.clone(), plan_project(&ctx, project, &tasks)?));
        }
        Ok(plans)
    }
}

/// Context with a fixed clock (2025-03-10 12:00 UTC) and default markers
#[cfg(test)]
pub(crate) fn test_context() -> RunContext {
    use chrono::TimeZone;
    RunContext {
        now: Tz::UTC.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        timezone: Tz::UTC,
        blocking_label: LabelId::from("NoDate"),
        next_labels: vec![LabelId::from("Next")],
        parser: ModifierParser::default(),
        last_run_marker: Markers::default().last_run_marker,
        hostname: "testhost".to_string(),
    }
}
