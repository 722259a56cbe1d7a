#![allow(dead_code)]

use tsqlfmt_core::tree::WalkEvent;
use tsqlfmt_core::{
    FormatOptions, FormatOutcome, FormattingManager, IdentityFormatter, NodeId, NodeKind,
    SqlTree, StandardFormatter,
};

pub fn parse(sql: &str) -> SqlTree {
    FormattingManager::<StandardFormatter>::parse(sql)
        .unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e:?}"))
}

pub fn format_outcome(sql: &str, options: FormatOptions) -> FormatOutcome {
    FormattingManager::new(StandardFormatter::new(options))
        .format(sql)
        .unwrap_or_else(|e| panic!("Failed to format: {sql}\nError: {e:?}"))
}

pub fn format_with(sql: &str, options: FormatOptions) -> String {
    format_outcome(sql, options).text
}

pub fn format(sql: &str) -> String {
    format_with(sql, FormatOptions::default())
}

pub fn identity(sql: &str) -> String {
    FormattingManager::new(IdentityFormatter::new().with_error_output_prefix(""))
        .format(sql)
        .unwrap_or_else(|e| panic!("Failed to render: {sql}\nError: {e:?}"))
        .text
}

/// All nodes of `kind`, in document order.
pub fn nodes_of_kind(tree: &SqlTree, kind: NodeKind) -> Vec<NodeId> {
    tree.walk()
        .filter_map(|event| match event {
            WalkEvent::Enter(id) if tree.kind(id) == kind => Some(id),
            _ => None,
        })
        .collect()
}

/// The top-level statement holding `id`.
pub fn top_level_statement(tree: &SqlTree, id: NodeId) -> NodeId {
    let mut current = id;
    while let Some(parent) = tree.parent(current) {
        if parent == tree.root() {
            return current;
        }
        current = parent;
    }
    panic!("node {id:?} is not inside a statement")
}
