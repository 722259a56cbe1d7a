//! Tests for the shape of parsed trees.

mod common;
use common::*;

use tsqlfmt_core::NodeKind;

#[test]
fn trailing_comment_stays_with_its_statement() {
    let tree = parse("SELECT 1 -- trailing\n; SELECT 2");
    let statements = nodes_of_kind(&tree, NodeKind::Statement);
    assert_eq!(statements.len(), 2);

    let comment = nodes_of_kind(&tree, NodeKind::SingleLineComment)[0];
    assert_eq!(top_level_statement(&tree, comment), statements[0]);
}

#[test]
fn leading_comment_moves_to_next_statement() {
    let tree = parse("SELECT 1;\n-- leading\nSELECT 2");
    let statements = nodes_of_kind(&tree, NodeKind::Statement);
    assert_eq!(statements.len(), 2);

    let comment = nodes_of_kind(&tree, NodeKind::SingleLineComment)[0];
    assert_eq!(top_level_statement(&tree, comment), statements[1]);
}

#[test]
fn block_comment_on_own_line_moves_to_next_statement() {
    let tree = parse("select 1\n/* next */\nselect 2");
    let statements = nodes_of_kind(&tree, NodeKind::Statement);
    let comment = nodes_of_kind(&tree, NodeKind::MultiLineComment)[0];
    assert_eq!(top_level_statement(&tree, comment), statements[1]);
}

#[test]
fn comment_before_clause_leaves_previous_clause() {
    let tree = parse("select a\n-- the source\nfrom t");
    let comment = nodes_of_kind(&tree, NodeKind::SingleLineComment)[0];
    let parent = tree.parent(comment).unwrap();
    assert_eq!(tree.kind(parent), NodeKind::Statement);
    assert_eq!(nodes_of_kind(&tree, NodeKind::Clause).len(), 2);
}

#[test]
fn statements_are_children_of_root() {
    let tree = parse("select 1\nupdate t set a = 1\ndelete from t");
    let kinds: Vec<_> = tree
        .content_children(tree.root())
        .map(|id| tree.kind(id))
        .collect();
    assert_eq!(kinds, vec![NodeKind::Statement; 3]);
    assert!(!tree.has_error());
}

#[test]
fn malformed_input_sets_error_flag() {
    for sql in [
        "select 'abc",
        "select (1",
        "select 1)",
        "select 1 end",
        "select 1 else select 2",
        "select 1 /* open",
    ] {
        let tree = parse(sql);
        assert!(tree.has_error(), "expected error flag for: {sql}");
    }
}

#[test]
fn well_formed_input_has_no_error_flag() {
    for sql in [
        "",
        "select a, b from t where a = 1",
        "if @a = 1 begin print 'x' end else print 'y'",
        "with c as (select 1 x) select x from c",
        "create procedure p as\nbegin\n  select 1\nend\ngo\nexec p\n",
    ] {
        let tree = parse(sql);
        assert!(!tree.has_error(), "unexpected error flag for: {sql}");
    }
}

#[test]
fn tree_serializes_to_json() {
    let tree = parse("select 1");
    let json = serde_json::to_value(tree.view(tree.root())).unwrap();
    assert_eq!(json["name"], "root");
    assert_eq!(json["children"][0]["name"], "statement");
}
