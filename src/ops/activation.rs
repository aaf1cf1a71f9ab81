//! Activation engine: decides per node whether it is surfaced now (activate),
//! held back as owned-but-inactive (take), or left alone (inert), and what
//! mode to hand its children.
//!
//! The decision is the pure [`evaluate`]; [`Engine`] walks a project
//! depth-first, applies the resulting mutations to the local task copies and
//! stages them on the store.

use serde::Serialize;
use tracing::{debug, debug_span};

use crate::io::store::{DueUpdate, TaskStore, TaskUpdate};
use crate::model::modifier::{Modifier, ModifierKind};
use crate::model::task::{Due, Project, Task, TaskId};
use crate::ops::last_run;
use crate::ops::run::RunContext;
use crate::ops::tree::TreeIndex;
use crate::parse::DueError;

/// Default due expression for activated tasks without a delay token
pub const DEFAULT_DUE: &str = "today";

/// Mode a parent asserts over its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Serial,
    Parallel,
    /// Owned part of a serial/parallel tree that is not actionable yet
    Inactive,
    /// Parent does not specify
    None,
}

impl From<ModifierKind> for ProcessingMode {
    fn from(kind: ModifierKind) -> Self {
        match kind {
            ModifierKind::None => ProcessingMode::None,
            ModifierKind::Parallel => ProcessingMode::Parallel,
            ModifierKind::Serial => ProcessingMode::Serial,
        }
    }
}

impl ProcessingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingMode::Serial => "serial",
            ProcessingMode::Parallel => "parallel",
            ProcessingMode::Inactive => "inactive",
            ProcessingMode::None => "none",
        }
    }
}

/// Disposition of a node (or of a whole subtree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Activate,
    Take,
    Inert,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Activate => "activate",
            Verdict::Take => "take",
            Verdict::Inert => "inert",
        }
    }
}

/// What the engine knows about a node before deciding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFacts {
    pub kind: ModifierKind,
    /// Recurring and due at or before the run's `now`
    pub is_active_recurring: bool,
    /// No children in the walked set
    pub is_considered_leaf: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub tree: Verdict,
    pub item: Verdict,
    pub child_mode: ProcessingMode,
    /// Due recurring task without serial/parallel tagging: its completed
    /// subtree is pulled back in full
    pub fix_recurring_task: bool,
}

/// Decide a node's verdicts from its facts and what the parent asserts.
pub fn evaluate(facts: &NodeFacts, mode: ProcessingMode, is_first: bool) -> Evaluation {
    let fix_recurring_task = facts.is_active_recurring && facts.kind.is_none();

    let tree = if (mode == ProcessingMode::Serial && is_first)
        || mode == ProcessingMode::Parallel
        || facts.is_active_recurring
    {
        Verdict::Activate
    } else if matches!(mode, ProcessingMode::Serial | ProcessingMode::Inactive)
        || !facts.kind.is_none()
    {
        Verdict::Take
    } else {
        Verdict::Inert
    };

    let item = match tree {
        Verdict::Activate if facts.is_considered_leaf || fix_recurring_task => Verdict::Activate,
        Verdict::Activate | Verdict::Take => Verdict::Take,
        Verdict::Inert => Verdict::Inert,
    };

    let child_mode = if fix_recurring_task {
        ProcessingMode::Inactive
    } else if facts.kind.is_none() {
        ProcessingMode::None
    } else if tree == Verdict::Take {
        ProcessingMode::Inactive
    } else {
        ProcessingMode::from(facts.kind)
    };

    Evaluation {
        tree,
        item,
        child_mode,
        fix_recurring_task,
    }
}

/// State handed from a parent to each child during the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inherited {
    pub mode: ProcessingMode,
    /// First active sibling; completed siblings walked alongside never count
    pub is_first: bool,
    /// Inside a recurring reactivation: completed nodes are walked too
    pub sweep: bool,
}

impl Inherited {
    /// What a child of a node evaluated as `eval` receives. Inside a sweep an
    /// untagged node hands down `Inactive` instead of `None`, so completed
    /// descendants at any depth are taken back.
    pub fn for_child(&self, eval: &Evaluation, is_first: bool) -> Inherited {
        let sweep = self.sweep || eval.fix_recurring_task;
        let mode = match eval.child_mode {
            ProcessingMode::None if sweep => ProcessingMode::Inactive,
            mode => mode,
        };
        Inherited {
            mode,
            is_first,
            sweep,
        }
    }
}

/// A node inspected against the current task state
struct Inspected {
    facts: NodeFacts,
    modifier: Modifier,
    children: Walked,
}

fn inspect(
    ctx: &RunContext,
    tasks: &[Task],
    index: &TreeIndex,
    idx: usize,
    sweep: bool,
) -> Result<Inspected, DueError> {
    let task = &tasks[idx];
    let is_active_recurring = ctx.is_active_recurring(task)?;
    let children = walked_children(ctx, tasks, index, Some(&task.id), is_active_recurring || sweep)?;
    let modifier = ctx.parser.parse(&task.content);
    Ok(Inspected {
        facts: NodeFacts {
            kind: modifier.kind,
            is_active_recurring,
            is_considered_leaf: children.order.is_empty(),
        },
        modifier,
        children,
    })
}

/// Children the walk visits, in sibling order
struct Walked {
    order: Vec<usize>,
    /// Only this child can be first under a serial parent
    first_active: Option<usize>,
}

impl Walked {
    fn is_first(&self, idx: usize) -> bool {
        self.first_active == Some(idx)
    }
}

/// Active children, completed ones when `include_completed`, and completed
/// recurring ones that are due again.
fn walked_children(
    ctx: &RunContext,
    tasks: &[Task],
    index: &TreeIndex,
    parent: Option<&TaskId>,
    include_completed: bool,
) -> Result<Walked, DueError> {
    let children = index.children(tasks, parent);
    let first_active = children.active.first().copied();
    if include_completed {
        return Ok(Walked {
            order: children.all,
            first_active,
        });
    }
    let mut due_again = Vec::new();
    for &idx in &children.completed {
        if ctx.is_active_recurring(&tasks[idx])? {
            due_again.push(idx);
        }
    }
    let order = children
        .all
        .into_iter()
        .filter(|idx| !tasks[*idx].completed || due_again.contains(idx))
        .collect();
    Ok(Walked {
        order,
        first_active,
    })
}

/// Applies verdicts to one project's tasks and stages the mutations.
pub struct Engine<'a> {
    ctx: &'a RunContext,
    store: &'a mut dyn TaskStore,
}

impl<'a> Engine<'a> {
    pub fn new(ctx: &'a RunContext, store: &'a mut dyn TaskStore) -> Self {
        Engine { ctx, store }
    }

    /// Walk every top-level task of `project`. `tasks` must be the project's
    /// tasks; they are updated in place as mutations are staged.
    pub fn process_project(&mut self, project: &Project, tasks: &mut [Task]) -> Result<(), DueError> {
        let index = TreeIndex::build(tasks);
        let mode = ProcessingMode::from(self.ctx.parser.kind(&project.name));
        let roots = walked_children(self.ctx, tasks, &index, None, false)?;
        debug!(?mode, top_level = roots.order.len(), "processing project");

        for &idx in &roots.order {
            let inherited = Inherited {
                mode,
                is_first: roots.is_first(idx),
                sweep: false,
            };
            self.walk(tasks, &index, idx, inherited)?;
        }
        Ok(())
    }

    fn walk(
        &mut self,
        tasks: &mut [Task],
        index: &TreeIndex,
        idx: usize,
        inherited: Inherited,
    ) -> Result<(), DueError> {
        let node = inspect(self.ctx, tasks, index, idx, inherited.sweep)?;
        let eval = evaluate(&node.facts, inherited.mode, inherited.is_first);

        let span = debug_span!("task", content = %tasks[idx].content);
        let _enter = span.enter();
        debug!(
            mode = ?inherited.mode,
            is_first = inherited.is_first,
            recurring = node.facts.is_active_recurring,
            kind = ?node.facts.kind,
            children = node.children.order.len(),
            tree = ?eval.tree,
            item = ?eval.item,
            child_mode = ?eval.child_mode,
            "evaluated"
        );

        self.apply(&mut tasks[idx], &node, &eval);
        last_run::stamp(self.ctx, &mut tasks[idx], &mut *self.store);

        for &child in &node.children.order {
            let is_first = node.children.is_first(child);
            self.walk(tasks, index, child, inherited.for_child(&eval, is_first))?;
        }

        // Reactivated subtree is back; close this instance so the store
        // advances it to the next occurrence.
        if eval.fix_recurring_task && !node.facts.is_considered_leaf {
            self.complete(&mut tasks[idx]);
        }
        Ok(())
    }

    fn apply(&mut self, task: &mut Task, node: &Inspected, eval: &Evaluation) {
        match eval.item {
            Verdict::Activate => {
                self.uncomplete(task);
                if !task.has_any_label(&self.ctx.next_labels) {
                    self.set_due(task, node.modifier.delay.as_deref());
                }
                self.remove_blocking_label(task);
            }
            Verdict::Take => {
                self.uncomplete(task);
                if task.due.is_none() {
                    self.add_blocking_label(task);
                }
                if node.facts.is_active_recurring {
                    self.complete(task);
                }
            }
            Verdict::Inert => {}
        }
    }

    /// Un-complete, dropping a due date that would otherwise be stale.
    /// Recurring descriptors stay; the store owns their next occurrence.
    fn uncomplete(&mut self, task: &mut Task) {
        if !task.completed {
            return;
        }
        debug!(task = %task.content, "uncompleting");
        self.store.stage_uncomplete(&task.id);
        task.completed = false;
        if task.due.is_some() && !task.is_recurring() {
            debug!(task = %task.content, "clearing stale due date");
            self.store
                .stage_update(&task.id, TaskUpdate::due(DueUpdate::Clear));
            task.due = None;
        }
    }

    fn complete(&mut self, task: &mut Task) {
        if task.completed {
            return;
        }
        debug!(task = %task.content, "completing");
        self.store.stage_complete(&task.id);
        task.completed = true;
    }

    /// Never overwrites an existing due date
    fn set_due(&mut self, task: &mut Task, delay: Option<&str>) {
        if task.due.is_some() {
            return;
        }
        let expr = delay.unwrap_or(DEFAULT_DUE);
        debug!(task = %task.content, due = expr, "setting due date");
        self.store
            .stage_update(&task.id, TaskUpdate::due(DueUpdate::Set(expr.to_string())));
        task.due = Some(Due::from_string(expr));
    }

    fn add_blocking_label(&mut self, task: &mut Task) {
        let label = &self.ctx.blocking_label;
        if task.has_label(label) {
            return;
        }
        debug!(task = %task.content, %label, "adding blocking label");
        task.labels.push(label.clone());
        self.store
            .stage_update(&task.id, TaskUpdate::labels(task.labels.clone()));
    }

    fn remove_blocking_label(&mut self, task: &mut Task) {
        let label = &self.ctx.blocking_label;
        if !task.has_label(label) {
            return;
        }
        debug!(task = %task.content, %label, "removing blocking label");
        task.labels.retain(|l| l != label);
        self.store
            .stage_update(&task.id, TaskUpdate::labels(task.labels.clone()));
    }
}

// ---------------------------------------------------------------------------
// Plan (decisions only, nothing staged)
// ---------------------------------------------------------------------------

/// One node of a project's verdict tree
#[derive(Debug, Clone, Serialize)]
pub struct PlanNode {
    pub id: TaskId,
    pub content: String,
    pub mode: ProcessingMode,
    pub is_first: bool,
    #[serde(flatten)]
    pub eval: Evaluation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

/// Verdicts the engine would reach for `project`, without mutating anything.
pub fn plan_project(ctx: &RunContext, project: &Project, tasks: &[Task]) -> Result<Vec<PlanNode>, DueError> {
    let index = TreeIndex::build(tasks);
    let mode = ProcessingMode::from(ctx.parser.kind(&project.name));
    let roots = walked_children(ctx, tasks, &index, None, false)?;
    roots
        .order
        .iter()
        .map(|&idx| {
            let inherited = Inherited {
                mode,
                is_first: roots.is_first(idx),
                sweep: false,
            };
            plan_node(ctx, tasks, &index, idx, inherited)
        })
        .collect()
}

fn plan_node(
    ctx: &RunContext,
    tasks: &[Task],
    index: &TreeIndex,
    idx: usize,
    inherited: Inherited,
) -> Result<PlanNode, DueError> {
    let node = inspect(ctx, tasks, index, idx, inherited.sweep)?;
    let eval = evaluate(&node.facts, inherited.mode, inherited.is_first);
    let children = node
        .children
        .order
        .iter()
        .map(|&child| {
            let is_first = node.children.is_first(child);
            plan_node(ctx, tasks, index, child, inherited.for_child(&eval, is_first))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PlanNode {
        id: tasks[idx].id.clone(),
        content: tasks[idx].content.clone(),
        mode: inherited.mode,
        is_first: inherited.is_first,
        eval,
        children,
    })
}
