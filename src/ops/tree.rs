use indexmap::IndexMap;

use crate::model::task::{Task, TaskId};

/// Parent → children lookup over one project's flat task list.
///
/// Child lists hold indices into the slice the index was built from, ordered
/// by sibling order key (ties keep store order). Completion is read at query
/// time, so the same index stays valid while the walk un-completes tasks.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    children: IndexMap<Option<TaskId>, Vec<usize>>,
}

/// Direct children of one node, each sequence in sibling order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children {
    pub completed: Vec<usize>,
    pub active: Vec<usize>,
    /// Both sets interleaved in sibling order
    pub all: Vec<usize>,
}

impl Children {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

impl TreeIndex {
    pub fn build(tasks: &[Task]) -> Self {
        let mut children: IndexMap<Option<TaskId>, Vec<usize>> = IndexMap::new();
        for (idx, task) in tasks.iter().enumerate() {
            children
                .entry(task.parent_id.clone())
                .or_default()
                .push(idx);
        }
        for list in children.values_mut() {
            list.sort_by_key(|&idx| tasks[idx].child_order);
        }
        TreeIndex { children }
    }

    /// Children of `parent`; `None` is the virtual project root.
    pub fn children(&self, tasks: &[Task], parent: Option<&TaskId>) -> Children {
        let mut result = Children::default();
        let Some(list) = self.children.get(&parent.cloned()) else {
            return result;
        };
        for &idx in list {
            if tasks[idx].completed {
                result.completed.push(idx);
            } else {
                result.active.push(idx);
            }
            result.all.push(idx);
        }
        result
    }

    pub fn roots(&self, tasks: &[Task]) -> Children {
        self.children(tasks, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(id: &str, parent: Option<&str>, order: i64, completed: bool) -> Task {
        let mut t = Task::new(id, "p", id);
        t.parent_id = parent.map(TaskId::from);
        t.child_order = order;
        t.completed = completed;
        t
    }

    fn ids(tasks: &[Task], idxs: &[usize]) -> Vec<String> {
        idxs.iter().map(|&i| tasks[i].id.to_string()).collect()
    }

    #[test]
    fn roots_are_sorted_by_order_key() {
        let tasks = vec![
            task("c", None, 3, false),
            task("a", None, 1, false),
            task("b", None, 2, false),
        ];
        let index = TreeIndex::build(&tasks);
        let roots = index.roots(&tasks);
        assert_eq!(ids(&tasks, &roots.active), vec!["a", "b", "c"]);
        assert!(roots.completed.is_empty());
    }

    #[test]
    fn children_are_partitioned_by_completion() {
        let tasks = vec![
            task("root", None, 1, false),
            task("x", Some("root"), 2, true),
            task("y", Some("root"), 1, false),
            task("z", Some("root"), 3, false),
        ];
        let index = TreeIndex::build(&tasks);
        let children = index.children(&tasks, Some(&TaskId::from("root")));
        assert_eq!(ids(&tasks, &children.completed), vec!["x"]);
        assert_eq!(ids(&tasks, &children.active), vec!["y", "z"]);
        assert_eq!(ids(&tasks, &children.all), vec!["y", "x", "z"]);
    }

    #[test]
    fn completion_is_read_at_query_time() {
        let mut tasks = vec![task("root", None, 1, false), task("x", Some("root"), 1, true)];
        let index = TreeIndex::build(&tasks);
        tasks[1].completed = false;
        let children = index.children(&tasks, Some(&TaskId::from("root")));
        assert_eq!(ids(&tasks, &children.active), vec!["x"]);
    }

    #[test]
    fn leaf_has_no_children() {
        let tasks = vec![task("a", None, 1, false)];
        let index = TreeIndex::build(&tasks);
        assert!(index.children(&tasks, Some(&TaskId::from("a"))).is_empty());
    }
}
