//! HTTP handlers, one module per resource

pub mod admission_plans;
pub mod auth;
pub mod configs;
pub mod logs;
pub mod menus;
pub mod resources;
pub mod roles;
pub mod school_admissions;
pub mod system;
pub mod users;

use backoffice_access_log::PageRequest;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{HashMap, HashSet};

use crate::models::{Menu, Resource};

/// Wall-clock format used for user-facing timestamps and time filters
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn page_request(page: Option<u64>, size: Option<u64>) -> PageRequest {
    PageRequest::new(page.unwrap_or(1), size.unwrap_or(10))
}

/// Treat a blank query value the same as a missing one.
pub(crate) fn filled(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn format_local(at: DateTime<Utc>, zone: &FixedOffset) -> String {
    at.with_timezone(zone).format(DATETIME_FORMAT).to_string()
}

pub(crate) fn total_pages(total: u64, size: u64) -> u64 {
    total.div_ceil(size.max(1))
}

/// A row that can be arranged by `parent_id`
pub(crate) trait TreeNode: Sized {
    fn id(&self) -> i32;
    fn parent_id(&self) -> Option<i32>;
    fn sort_key(&self) -> (i32, i32);
    fn set_children(&mut self, children: Vec<Self>);
}

impl TreeNode for Menu {
    fn id(&self) -> i32 {
        self.id
    }

    fn parent_id(&self) -> Option<i32> {
        self.parent_id
    }

    fn sort_key(&self) -> (i32, i32) {
        (self.sort, self.id)
    }

    fn set_children(&mut self, children: Vec<Self>) {
        self.children = children;
    }
}

impl TreeNode for Resource {
    fn id(&self) -> i32 {
        self.id
    }

    fn parent_id(&self) -> Option<i32> {
        self.parent_id
    }

    fn sort_key(&self) -> (i32, i32) {
        (self.sort, self.id)
    }

    fn set_children(&mut self, children: Vec<Self>) {
        self.children = children;
    }
}

/// Nest rows under their parents, siblings ordered by `sort`.
///
/// Rows whose parent is not in `items` become roots.
pub(crate) fn build_tree<T: TreeNode>(items: Vec<T>) -> Vec<T> {
    let ids: HashSet<i32> = items.iter().map(T::id).collect();
    let mut roots = Vec::new();
    let mut children: HashMap<i32, Vec<T>> = HashMap::new();

    for item in items {
        match item.parent_id() {
            Some(parent) if parent != item.id() && ids.contains(&parent) => {
                children.entry(parent).or_default().push(item)
            }
            _ => roots.push(item),
        }
    }

    attach_children(roots, &mut children)
}

fn attach_children<T: TreeNode>(mut nodes: Vec<T>, children: &mut HashMap<i32, Vec<T>>) -> Vec<T> {
    nodes.sort_by_key(T::sort_key);
    for node in &mut nodes {
        if let Some(kids) = children.remove(&node.id()) {
            node.set_children(attach_children(kids, children));
        }
    }
    nodes
}
