use serde::Serialize;

use crate::model::task::{Project, Snapshot, Task};
use crate::ops::activation::PlanNode;
use crate::ops::tree::TreeIndex;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PlanJson<'a> {
    pub project: &'a str,
    pub id: &'a str,
    pub nodes: &'a [PlanNode],
}

#[derive(Serialize)]
pub struct DumpJson<'a> {
    pub project_count: usize,
    pub task_count: usize,
    #[serde(flatten)]
    pub snapshot: &'a Snapshot,
}

pub fn plans_to_json(plans: &[(Project, Vec<PlanNode>)]) -> Vec<PlanJson<'_>> {
    plans
        .iter()
        .map(|(project, nodes)| PlanJson {
            project: &project.name,
            id: project.id.as_str(),
            nodes,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Format a project heading
pub fn format_project_header(project: &Project) -> String {
    let archived = if project.is_archived { " [archived]" } else { "" };
    format!("== {} ({}){} ==", project.name.trim_end(), project.id, archived)
}

/// Format a single task as a one-line summary. Label ids are shown by name
/// when the snapshot knows them.
pub fn format_task_line(task: &Task, snapshot: &Snapshot) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let due_str = match &task.due {
        Some(due) => {
            let text = due.string.as_deref().or(due.date.as_deref()).unwrap_or("?");
            let recurring = if due.is_recurring { " ↻" } else { "" };
            format!("  due: {}{}", text, recurring)
        }
        None => String::new(),
    };
    let labels_str = if task.labels.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            task.labels
                .iter()
                .map(|id| {
                    let name = snapshot
                        .labels
                        .iter()
                        .find(|l| &l.id == id)
                        .map(|l| l.name.as_str())
                        .unwrap_or(id.as_str());
                    format!("@{}", name)
                })
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    format!("[{}] {} {}{}{}", check, task.id, task.content, labels_str, due_str)
}

/// Every project with its tasks as an indented tree
pub fn format_dump(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec![format!(
        "Projects: {}, Tasks: {}",
        snapshot.projects.len(),
        snapshot.tasks.len()
    )];
    for project in &snapshot.projects {
        lines.push(String::new());
        lines.push(format_project_header(project));
        let tasks = snapshot.project_tasks(&project.id);
        let index = TreeIndex::build(&tasks);
        let mut stack: Vec<(usize, usize)> = index.roots(&tasks).all.into_iter().rev().map(|i| (i, 0)).collect();
        while let Some((idx, depth)) = stack.pop() {
            let task = &tasks[idx];
            lines.push(format!("{}{}", "  ".repeat(depth), format_task_line(task, snapshot)));
            let children = index.children(&tasks, Some(&task.id));
            stack.extend(children.all.into_iter().rev().map(|i| (i, depth + 1)));
        }
    }
    lines
}

/// Format one plan node with its children, indented
pub fn format_plan_node(node: &PlanNode, indent: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let prefix = "  ".repeat(indent);
    let fix = if node.eval.fix_recurring_task { " reactivate" } else { "" };
    lines.push(format!(
        "{}[{}] {} (tree {}, children {}){}",
        prefix,
        node.eval.item.as_str(),
        node.content.trim_end(),
        node.eval.tree.as_str(),
        node.eval.child_mode.as_str(),
        fix
    ));
    for child in &node.children {
        lines.extend(format_plan_node(child, indent + 1));
    }
    lines
}

pub fn format_plans(plans: &[(Project, Vec<PlanNode>)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, (project, nodes)) in plans.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format_project_header(project));
        for node in nodes {
            lines.extend(format_plan_node(node, 1));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Due, Label, LabelId};
    use crate::ops::activation::plan_project;
    use crate::ops::run::test_context;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn project(name: &str) -> Project {
        Project {
            id: "p".into(),
            name: name.to_string(),
            is_archived: false,
        }
    }

    fn child(id: &str, parent: &str, order: i64, content: &str) -> Task {
        let mut t = Task::new(id, "p", content);
        t.parent_id = Some(parent.into());
        t.child_order = order;
        t
    }

    #[test]
    fn plan_renders_as_tree() {
        let ctx = test_context();
        let home = project("Home (-)");
        let mut a = Task::new("a", "p", "A");
        a.child_order = 1;
        let mut b = Task::new("b", "p", "B (=)");
        b.child_order = 2;
        let tasks = vec![a, b, child("b1", "b", 1, "B1"), child("b2", "b", 2, "B2")];

        let nodes = plan_project(&ctx, &home, &tasks).unwrap();
        let text = format_plans(&[(home, nodes)]).join("\n");
        assert_snapshot!(text, @r"
        == Home (-) (p) ==
          [activate] A (tree activate, children none)
          [take] B (=) (tree take, children inactive)
            [take] B1 (tree take, children none)
            [take] B2 (tree take, children none)
        ");
    }

    #[test]
    fn task_line_shows_labels_by_name_and_due() {
        let snapshot = Snapshot {
            labels: vec![Label {
                id: LabelId::from("42"),
                name: "NoDate".into(),
            }],
            ..Default::default()
        };
        let mut task = Task::new("7", "p", "Call mum");
        task.labels = vec![LabelId::from("42"), LabelId::from("99")];
        task.due = Some(Due::from_string("every day"));
        task.due.as_mut().unwrap().is_recurring = true;
        assert_eq!(
            format_task_line(&task, &snapshot),
            "[ ] 7 Call mum @NoDate @99  due: every day ↻"
        );
    }

    #[test]
    fn dump_lists_counts_and_nested_tasks() {
        let mut parent = Task::new("1", "p", "Parent");
        parent.completed = true;
        let snapshot = Snapshot {
            projects: vec![project("Home")],
            tasks: vec![parent, child("2", "1", 1, "Child")],
            ..Default::default()
        };
        assert_eq!(
            format_dump(&snapshot),
            vec![
                "Projects: 1, Tasks: 2".to_string(),
                String::new(),
                "== Home (p) ==".to_string(),
                "[x] 1 Parent".to_string(),
                "  [ ] 2 Child".to_string(),
            ]
        );
    }
}
