//! Tree builder: owns the structural tree and the current-container cursor.
//!
//! Every structural decision the parser makes goes through here. The escape
//! operations move the cursor from a finished descendant container back up to
//! the ancestor where parsing should continue; their call order inside the
//! composite operations is significant for recovery of malformed input and
//! must not be rearranged.

use tracing::{debug, trace};

use super::error::{ParseError, Result};
use crate::lexer::contains_line_break;
use crate::tree::{Attribute, NodeId, NodeKind, SqlTree};

/// Builds a [`SqlTree`] while tracking where new nodes go.
#[derive(Debug)]
pub(crate) struct TreeBuilder {
    tree: SqlTree,
    current: NodeId,
    new_statement_due: bool,
}

impl TreeBuilder {
    /// Creates a builder whose cursor sits in the first clause of an empty
    /// first statement.
    pub(crate) fn new() -> Self {
        let tree = SqlTree::new();
        let root = tree.root();
        let mut builder = Self {
            tree,
            current: root,
            new_statement_due: false,
        };
        builder.start_new_statement_in(root);
        builder
    }

    pub(crate) const fn tree(&self) -> &SqlTree {
        &self.tree
    }

    pub(crate) fn into_tree(self) -> SqlTree {
        self.tree
    }

    pub(crate) const fn current(&self) -> NodeId {
        self.current
    }

    pub(crate) fn current_kind(&self) -> NodeKind {
        self.tree.kind(self.current)
    }

    /// Moves the cursor, refusing nodes that are not part of the document.
    pub(crate) fn set_current(&mut self, id: NodeId) -> Result<()> {
        if !self.tree.is_attached(id) {
            return Err(ParseError::CursorOutsideTree);
        }
        self.current = id;
        Ok(())
    }

    pub(crate) const fn new_statement_due(&self) -> bool {
        self.new_statement_due
    }

    pub(crate) fn set_new_statement_due(&mut self, due: bool) {
        self.new_statement_due = due;
    }

    /// Flags the current container and the whole document as recovered.
    pub(crate) fn set_error(&mut self) {
        if !self.tree.has_error() {
            debug!(
                container = %self.current_kind(),
                "error recovery required, flagging document"
            );
        }
        self.tree.set_attribute(self.current, Attribute::HasError, "1");
        let root = self.tree.root();
        self.tree.set_attribute(root, Attribute::ErrorFound, "1");
    }

    pub(crate) fn set_attribute(&mut self, id: NodeId, key: Attribute, value: impl Into<String>) {
        self.tree.set_attribute(id, key, value);
    }

    /// Appends a node to the current container.
    pub(crate) fn save(&mut self, kind: NodeKind, text: impl Into<String>) -> NodeId {
        self.tree.append(self.current, kind, text)
    }

    /// Appends a node to an explicit container.
    pub(crate) fn save_in(&mut self, parent: NodeId, kind: NodeKind, text: impl Into<String>) -> NodeId {
        self.tree.append(parent, kind, text)
    }

    /// Appends a node to the current container and flags an error.
    pub(crate) fn save_with_error(&mut self, kind: NodeKind, text: impl Into<String>) -> NodeId {
        let id = self.save(kind, text);
        self.set_error();
        id
    }

    /// Inserts a new node as the prior sibling of `sibling`.
    pub(crate) fn save_before(
        &mut self,
        kind: NodeKind,
        text: impl Into<String>,
        sibling: NodeId,
    ) -> Result<NodeId> {
        let id = self.tree.create(kind, text);
        self.tree.insert_before(id, sibling)?;
        Ok(id)
    }

    /// Saves a `kind` container with a `ContainerOpen` holding the given
    /// keyword, then moves the cursor into a new `body` child.
    pub(crate) fn start_new_container(
        &mut self,
        kind: NodeKind,
        keyword: &str,
        body: NodeKind,
    ) -> Result<NodeId> {
        let (container, open) = self.start_new_container_with_open(kind, body)?;
        self.save_in(open, NodeKind::OtherKeyword, keyword);
        Ok(container)
    }

    /// Like [`start_new_container`](Self::start_new_container) but leaves the
    /// `ContainerOpen` empty for the caller to fill.
    pub(crate) fn start_new_container_with_open(
        &mut self,
        kind: NodeKind,
        body: NodeKind,
    ) -> Result<(NodeId, NodeId)> {
        let container = self.save(kind, "");
        let open = self.save_in(container, NodeKind::ContainerOpen, "");
        let body = self.save_in(container, body, "");
        self.set_current(body)?;
        Ok((container, open))
    }

    /// Starts a new statement in the current container.
    pub(crate) fn start_new_statement(&mut self) {
        self.start_new_statement_in(self.current);
    }

    /// Starts a new statement in `target` and moves into its first clause.
    pub(crate) fn start_new_statement_in(&mut self, target: NodeId) {
        self.new_statement_due = false;
        let statement = self.tree.append(target, NodeKind::Statement, "");
        let clause = self.tree.append(statement, NodeKind::Clause, "");
        trace!(container = %self.tree.kind(target), "starting new statement");
        // freshly appended under an attached node
        self.current = clause;
    }

    /// True if the container `levels` up from the cursor has the given kind.
    pub(crate) fn path_is(&self, levels: usize, kind: NodeKind) -> bool {
        self.tree.ancestor_is(self.current, levels, kind)
    }

    /// Moves the cursor `levels` up.
    pub(crate) fn move_up(&mut self, levels: usize) -> Result<()> {
        let target = self
            .tree
            .ancestor(self.current, levels)
            .ok_or(ParseError::NoSuchAncestor {
                levels,
                from: self.current_kind(),
            })?;
        self.set_current(target)
    }

    /// Moves the cursor `levels` up, requiring the landing node's kind.
    pub(crate) fn move_up_to(&mut self, levels: usize, expected: NodeKind) -> Result<()> {
        let target = self.tree.ancestor(self.current, levels);
        let found = target.map(|t| self.tree.kind(t));
        match target {
            Some(target) if found == Some(expected) => self.set_current(target),
            _ => Err(ParseError::AncestorMismatch {
                levels,
                expected,
                found,
            }),
        }
    }

    fn has_content(&self, id: NodeId) -> bool {
        self.tree.has_content(id)
    }

    fn has_meaningful_content(&self, id: NodeId) -> bool {
        self.tree.has_meaningful_content(id)
    }

    /// Closes a finished BETWEEN condition.
    pub(crate) fn escape_any_between_conditions(&mut self) -> Result<()> {
        if self.path_is(0, NodeKind::UpperBound) && self.path_is(1, NodeKind::Between) {
            self.move_up(2)?;
        }
        Ok(())
    }

    /// Closes the action statement of a MERGE ... WHEN ... THEN once it has
    /// content.
    pub(crate) fn escape_merge_action(&mut self) -> Result<()> {
        if self.path_is(0, NodeKind::Clause)
            && self.path_is(1, NodeKind::Statement)
            && self.path_is(2, NodeKind::MergeAction)
            && self.has_meaningful_content(self.current)
        {
            self.move_up(4)?;
        }
        Ok(())
    }

    /// Collapses the transient wrappers of partial DDL, cursor, permission,
    /// CTE and MERGE constructs.
    pub(crate) fn escape_partial_statement_containers(&mut self) -> Result<()> {
        use NodeKind::{
            ContainerContentBody, CteWithClause, CursorForOptions, DdlDeclareBlock,
            DdlOtherBlock, DdlProceduralBlock, DdlWithClause, MergeWhen, PermissionsBlock,
            PermissionsRecipient,
        };

        if self.path_is(0, DdlProceduralBlock)
            || self.path_is(0, DdlOtherBlock)
            || self.path_is(0, DdlDeclareBlock)
        {
            self.move_up(1)
        } else if self.path_is(0, ContainerContentBody) && self.path_is(1, CursorForOptions) {
            self.move_up(3)
        } else if self.path_is(0, ContainerContentBody) && self.path_is(1, PermissionsRecipient) {
            self.move_up(3)
        } else if self.path_is(0, ContainerContentBody)
            && self.path_is(1, DdlWithClause)
            && (self.path_is(2, PermissionsBlock)
                || self.path_is(2, DdlProceduralBlock)
                || self.path_is(2, DdlOtherBlock)
                || self.path_is(2, DdlDeclareBlock))
        {
            self.move_up(3)
        } else if self.path_is(0, MergeWhen) {
            self.move_up(2)
        } else if self.path_is(0, ContainerContentBody)
            && (self.path_is(1, CteWithClause) || self.path_is(1, DdlDeclareBlock))
        {
            self.move_up(2)
        } else {
            Ok(())
        }
    }

    /// Closes a cursor's FOR block once its single SELECT has content.
    fn escape_cursor_for_block(&mut self) -> Result<()> {
        if self.path_is(0, NodeKind::Clause)
            && self.path_is(1, NodeKind::Statement)
            && self.path_is(2, NodeKind::ContainerContentBody)
            && self.path_is(3, NodeKind::CursorForBlock)
            && self.has_meaningful_content(self.current)
        {
            self.move_up(5)?;
        }
        Ok(())
    }

    /// Runs every escape that applies at the end of a statement, including
    /// popping out of completed IF/WHILE/ELSE single-statement bodies.
    pub(crate) fn escape_any_single_or_partial_statement_containers(&mut self) -> Result<()> {
        self.escape_any_between_conditions()?;
        self.escape_any_selection_target()?;
        self.escape_join_condition()?;

        if self.has_meaningful_content(self.current) {
            self.escape_cursor_for_block()?;
            self.escape_merge_action()?;
            self.escape_partial_statement_containers()?;

            while self.path_is(0, NodeKind::Clause)
                && self.path_is(1, NodeKind::Statement)
                && self.path_is(2, NodeKind::ContainerSingleStatementBody)
            {
                let single = self
                    .tree
                    .ancestor(self.current, 2)
                    .ok_or(ParseError::NoSuchAncestor {
                        levels: 2,
                        from: self.current_kind(),
                    })?;
                // single.else.if.clause, or single.(if|while).clause
                let levels = if self.tree.ancestor_is(single, 1, NodeKind::ElseClause) {
                    3
                } else {
                    2
                };
                let target = self
                    .tree
                    .ancestor(single, levels)
                    .ok_or(ParseError::NoSuchAncestor {
                        levels,
                        from: NodeKind::ContainerSingleStatementBody,
                    })?;
                self.set_current(target)?;
            }
        }
        Ok(())
    }

    /// Escapes as far as possible and returns the container in which a new
    /// statement may begin, if any.
    fn escape_and_locate_next_statement_container(
        &mut self,
        escape_empty_container: bool,
    ) -> Result<Option<NodeId>> {
        self.escape_any_single_or_partial_statement_containers()?;

        if self.path_is(0, NodeKind::BooleanExpression)
            && (self.path_is(1, NodeKind::IfStatement) || self.path_is(1, NodeKind::WhileLoop))
        {
            let Some(owner) = self.tree.parent(self.current) else {
                return Ok(None);
            };
            let single = self.save_in(owner, NodeKind::ContainerSingleStatementBody, "");
            Ok(Some(single))
        } else if self.path_is(0, NodeKind::Clause)
            && self.path_is(1, NodeKind::Statement)
            && (escape_empty_container || self.has_meaningful_content(self.current))
        {
            Ok(self.tree.ancestor(self.current, 2))
        } else {
            Ok(None)
        }
    }

    /// Moves trailing own-line comments from the end of `previous` to sit
    /// before the cursor's container.
    fn migrate_applicable_comments_from_container(&mut self, previous: NodeId) -> Result<()> {
        let mut context = previous;
        let mut candidate = self.tree.last_child(previous);
        let mut insert_before = self.current;

        while let Some(node) = candidate {
            let kind = self.tree.kind(node);
            if kind == NodeKind::WhiteSpace {
                candidate = self.tree.previous_sibling(node);
                continue;
            }

            let preceding = self.tree.previous_sibling(node);
            if let Some(preceding) =
                preceding.filter(|&p| kind.is_comment() && self.tree.kind(p).is_non_content())
            {
                if self.tree.kind(preceding) == NodeKind::WhiteSpace
                    && contains_line_break(self.tree.text(preceding))
                {
                    // move everything from the end back to and including the comment
                    while let Some(moving) = self.tree.last_child(context) {
                        self.tree.detach(moving);
                        self.tree.insert_before(moving, insert_before)?;
                        insert_before = moving;
                        if moving == node {
                            break;
                        }
                    }
                    candidate = self.tree.last_child(context);
                } else {
                    candidate = Some(preceding);
                }
            } else if !self.tree.text(node).is_empty() {
                candidate = None;
            } else {
                // the comment may be trapped in a trailing substructure
                context = node;
                candidate = self.tree.last_child(node);
            }
        }
        Ok(())
    }

    /// Starts a new statement if the current one is complete.
    pub(crate) fn consider_starting_new_statement(&mut self) -> Result<()> {
        self.escape_any_between_conditions()?;
        self.escape_any_selection_target()?;
        self.escape_join_condition()?;

        let previous = self.current;
        if let Some(target) = self.escape_and_locate_next_statement_container(false)? {
            let in_between = self.current;
            self.start_new_statement_in(target);
            if in_between != previous {
                self.migrate_applicable_comments_from_container(in_between)?;
            }
            self.migrate_applicable_comments_from_container(previous)?;
        }
        Ok(())
    }

    /// Starts a new clause in the current statement if the current clause
    /// already has content.
    pub(crate) fn consider_starting_new_clause(&mut self) -> Result<()> {
        self.escape_any_selection_target()?;
        self.escape_any_between_conditions()?;
        self.escape_partial_statement_containers()?;
        self.escape_join_condition()?;

        match self.current_kind() {
            NodeKind::Clause if self.has_content(self.current) => {
                let previous = self.current;
                let Some(statement) = self.tree.parent(previous) else {
                    return Ok(());
                };
                let clause = self.save_in(statement, NodeKind::Clause, "");
                self.set_current(clause)?;
                self.migrate_applicable_comments_from_container(previous)?;
            }
            NodeKind::ExpressionParens
            | NodeKind::InParens
            | NodeKind::SelectionTargetParens
            | NodeKind::Statement => {
                let clause = self.save(NodeKind::Clause, "");
                self.set_current(clause)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Closes an open selection target and then an open join target.
    pub(crate) fn escape_any_selection_target(&mut self) -> Result<()> {
        if self.path_is(0, NodeKind::SelectionTarget) {
            self.move_up(1)?;
        }
        if self.path_is(0, NodeKind::JoinTarget) {
            self.move_up(1)?;
        }
        Ok(())
    }

    /// Closes an open JOIN ... ON condition. A FROM body is a selection
    /// target, so the from-clause escape is covered by
    /// [`escape_any_selection_target`](Self::escape_any_selection_target).
    pub(crate) fn escape_join_condition(&mut self) -> Result<()> {
        if self.path_is(0, NodeKind::ContainerContentBody) && self.path_is(1, NodeKind::JoinOn) {
            self.move_up(2)?;
        }
        Ok(())
    }

    /// Escapes as far as possible and reports whether a batch may end here:
    /// at the document root or directly inside a DDL AS block body.
    pub(crate) fn find_valid_batch_end(&mut self) -> Result<bool> {
        let Some(container) = self.escape_and_locate_next_statement_container(true)? else {
            return Ok(false);
        };
        Ok(match self.tree.kind(container) {
            NodeKind::Root => true,
            NodeKind::ContainerContentBody => {
                self.tree.ancestor_is(container, 1, NodeKind::DdlAsBlock)
            }
            _ => false,
        })
    }

    /// Returns the nearest statement enclosing the cursor.
    pub(crate) fn enclosing_statement(&self) -> Option<NodeId> {
        let mut current = Some(self.current);
        while let Some(id) = current {
            if self.tree.kind(id) == NodeKind::Statement {
                return Some(id);
            }
            current = self.tree.parent(id);
        }
        None
    }

    /// Upper-cased text of a keyword node, using the normalized text for
    /// compound keywords.
    pub(crate) fn keyword_text(&self, id: NodeId) -> Option<String> {
        match self.tree.kind(id) {
            NodeKind::OtherKeyword => Some(self.tree.text(id).to_uppercase()),
            NodeKind::CompoundKeyword => self
                .tree
                .attribute(id, Attribute::SimpleText)
                .map(str::to_string),
            _ => None,
        }
    }

    /// Upper-cased first keyword of the statement enclosing the cursor.
    pub(crate) fn statement_first_keyword(&self) -> Option<String> {
        let statement = self.enclosing_statement()?;
        let mut first = self.tree.first_semantic_element(statement)?;
        if self.tree.kind(first) == NodeKind::CteWithClause {
            // the statement proper starts in the clause after the CTE list
            let clause = self
                .tree
                .children_of_kind(statement, NodeKind::Clause)
                .nth(1)?;
            first = self.tree.first_semantic_element(clause)?;
        }
        self.keyword_text(first)
    }

    /// True if any clause of the enclosing statement starts with one of
    /// `keywords`.
    pub(crate) fn statement_has_clause_starting_with(&self, keywords: &[&str]) -> bool {
        let Some(statement) = self.enclosing_statement() else {
            return false;
        };
        self.tree
            .children_of_kind(statement, NodeKind::Clause)
            .filter_map(|clause| self.tree.content_children(clause).next())
            .filter_map(|first| self.keyword_text(first))
            .any(|text| keywords.contains(&text.as_str()))
    }

    /// Last child of the current container that is not whitespace or a
    /// comment.
    pub(crate) fn last_content_child(&self) -> Option<NodeId> {
        self.tree.content_children(self.current).last()
    }

    /// First child of the current container that is not whitespace or a
    /// comment.
    pub(crate) fn first_content_child(&self) -> Option<NodeId> {
        self.tree.content_children(self.current).next()
    }

    pub(crate) fn current_has_content(&self) -> bool {
        self.has_content(self.current)
    }

    pub(crate) fn current_is_empty(&self) -> bool {
        self.tree.children(self.current).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_first_clause() {
        let builder = TreeBuilder::new();
        assert!(builder.path_is(0, NodeKind::Clause));
        assert!(builder.path_is(1, NodeKind::Statement));
        assert!(builder.path_is(2, NodeKind::Root));
    }

    #[test]
    fn test_move_up_to_mismatch_is_error() {
        let mut builder = TreeBuilder::new();
        let err = builder.move_up_to(1, NodeKind::Root).unwrap_err();
        assert_eq!(
            err,
            ParseError::AncestorMismatch {
                levels: 1,
                expected: NodeKind::Root,
                found: Some(NodeKind::Statement),
            }
        );
        assert!(builder.move_up(5).is_err());
    }

    #[test]
    fn test_set_current_rejects_detached_node() {
        let mut builder = TreeBuilder::new();
        let detached = builder.tree.create(NodeKind::Clause, "");
        assert_eq!(
            builder.set_current(detached),
            Err(ParseError::CursorOutsideTree)
        );
    }

    #[test]
    fn test_new_clause_only_after_content() {
        let mut builder = TreeBuilder::new();
        let first = builder.current();
        builder.save(NodeKind::WhiteSpace, " ");
        builder.save(NodeKind::MultiLineComment, "a\nb");
        builder.consider_starting_new_clause().unwrap();
        assert_eq!(builder.current(), first);

        builder.save(NodeKind::OtherKeyword, "SELECT");
        builder.consider_starting_new_clause().unwrap();
        assert_ne!(builder.current(), first);
        assert!(builder.path_is(0, NodeKind::Clause));
    }

    #[test]
    fn test_new_statement_migrates_own_line_comment() {
        let mut builder = TreeBuilder::new();
        let first_clause = builder.current();
        builder.save(NodeKind::OtherKeyword, "SELECT");
        builder.save(NodeKind::WhiteSpace, " ");
        builder.save(NodeKind::Number, "1");
        builder.save(NodeKind::WhiteSpace, "\n");
        let comment = builder.save(NodeKind::SingleLineComment, " leading\n");

        builder.consider_starting_new_statement().unwrap();
        let tree = builder.tree();
        let statements: Vec<_> = tree.children(tree.root()).to_vec();
        assert_eq!(statements.len(), 2);
        assert_eq!(tree.parent(comment), Some(statements[1]));
        assert_eq!(tree.children(first_clause).len(), 4);
    }

    #[test]
    fn test_new_statement_keeps_trailing_comment() {
        let mut builder = TreeBuilder::new();
        let first_clause = builder.current();
        builder.save(NodeKind::OtherKeyword, "SELECT");
        builder.save(NodeKind::WhiteSpace, " ");
        builder.save(NodeKind::Number, "1");
        builder.save(NodeKind::WhiteSpace, " ");
        let comment = builder.save(NodeKind::SingleLineComment, " trailing\n");

        builder.consider_starting_new_statement().unwrap();
        assert_eq!(builder.tree().parent(comment), Some(first_clause));
    }

    #[test]
    fn test_batch_end_at_root() {
        let mut builder = TreeBuilder::new();
        builder.save(NodeKind::OtherKeyword, "SELECT");
        assert!(builder.find_valid_batch_end().unwrap());
    }

    #[test]
    fn test_no_batch_end_inside_parens() {
        let mut builder = TreeBuilder::new();
        builder.save(NodeKind::OtherKeyword, "SELECT");
        let parens = builder.save(NodeKind::ExpressionParens, "");
        builder.set_current(parens).unwrap();
        builder.save(NodeKind::Number, "1");
        assert!(!builder.find_valid_batch_end().unwrap());
    }

    #[test]
    fn test_error_flag_is_sticky() {
        let mut builder = TreeBuilder::new();
        builder.save_with_error(NodeKind::Other, ")");
        assert!(builder.tree().has_error());
        assert_eq!(
            builder.tree().attribute(builder.current(), Attribute::HasError),
            Some("1")
        );
        let root = builder.tree().root();
        builder.start_new_statement_in(root);
        assert!(builder.tree().has_error());
    }
}
