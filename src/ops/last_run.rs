//! Last-run marker: a task whose content starts with the configured marker is
//! rewritten every run to record which host ran the updater and when.

use tracing::debug;

use crate::io::store::{TaskStore, TaskUpdate};
use crate::model::task::Task;
use crate::ops::run::RunContext;

/// Rewrite `task` if it is a marker task
pub fn stamp(ctx: &RunContext, task: &mut Task, store: &mut dyn TaskStore) {
    let marker = ctx.last_run_marker.as_str();
    if marker.is_empty() || !task.content.starts_with(marker) {
        return;
    }
    let content = format!(
        "{}: {} {}",
        marker,
        ctx.hostname,
        ctx.now.format("%Y-%m-%d %H:%M:%S %Z")
    );
    if content == task.content {
        return;
    }
    debug!(%content, "updating last run timestamp");
    store.stage_update(&task.id, TaskUpdate::content(content.clone()));
    task.content = content;
}

/// Name of this machine, or "unknown"
#[cfg(unix)]
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(not(unix))]
pub fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
}
