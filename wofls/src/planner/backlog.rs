//! The ordered queue of planned tasks.

use std::vec;

use crate::task::TaskDescriptor;

/// Planned tasks, consumed one at a time by the dispatcher.
///
/// Order is the planner's: platform order, then ascending key.
#[derive(Debug)]
pub struct Backlog {
    tasks: vec::IntoIter<TaskDescriptor>,
}

impl Backlog {
    pub fn new(tasks: Vec<TaskDescriptor>) -> Self {
        Self {
            tasks: tasks.into_iter(),
        }
    }

    /// A backlog with nothing to do.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.len() == 0
    }
}

impl Iterator for Backlog {
    type Item = TaskDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        self.tasks.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tasks.size_hint()
    }
}

impl ExactSizeIterator for Backlog {}

impl From<Vec<TaskDescriptor>> for Backlog {
    fn from(tasks: Vec<TaskDescriptor>) -> Self {
        Self::new(tasks)
    }
}
