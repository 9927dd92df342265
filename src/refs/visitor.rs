use std::{convert::Infallible, ops::ControlFlow};

use compact_str::CompactString;
use smallvec::SmallVec;
use sqlparser::ast::{
    AlterTableOperation, ColumnDef, Expr, Ident, ObjectName, ObjectNamePart, Query, Select,
    SetExpr, Statement, TableFactor, TableObject, TableWithJoins, UpdateTableFromKind, Visit,
    Visitor
};

use super::{
    scope::{QualifiedTable, ScopeStack},
    types::{ObjectKind, ObjectReference}
};

/// Identifier parts of a dotted name, outermost first
pub type NameParts = SmallVec<[CompactString; 4]>;

/// Collects raw object references while walking statements.
///
/// Scope frames are taken on entry to every statement and every `SELECT`
/// and released back to the recorded mark on exit. Traversal never breaks
/// (`Break = Infallible`), so every entry hook is matched by its exit hook.
///
/// Set operations (`UNION`, `EXCEPT`, `INTERSECT`) are walked by hand so each
/// side gets its own frame; the generic traversal of such a query is then
/// skipped until its exit hook (`skip_depth` counts the nesting).
#[derive(Debug, Default)]
pub struct ReferenceVisitor {
    scopes:        ScopeStack,
    marks:         Vec<usize>,
    table_context: Vec<Option<QualifiedTable>>,
    refs:          Vec<ObjectReference>,
    skip_depth:    usize
}

impl ReferenceVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_references(self) -> Vec<ObjectReference> {
        self.refs
    }

    fn emit(&mut self, name: CompactString, kind: ObjectKind) {
        self.refs.push(ObjectReference::new(name, kind));
    }

    fn emit_object(&mut self, name: &ObjectName, kind: ObjectKind) -> Option<QualifiedTable> {
        let table = qualify(name)?;
        self.emit(table.name(), kind);
        Some(table)
    }

    fn enter_scope(&mut self) {
        let mark = self.scopes.enter();
        self.marks.push(mark);
    }

    fn leave_scope(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.scopes.leave(mark);
        }
    }

    /// Register a `SELECT`'s own `FROM` tables so its select list, which
    /// precedes `FROM` in the tree, can resolve their aliases.
    fn register_select_sources(&mut self, select: &Select) {
        for from in &select.from {
            self.register_joined(from);
        }
    }

    /// Walk a set-operation query, giving every `SELECT` its own frame
    fn walk_set_operation(&mut self, query: &Query) {
        let _ = query.with.visit(self);
        self.walk_set_expr(&query.body);
        let _ = query.order_by.visit(self);
    }

    fn walk_set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => {
                self.enter_scope();
                self.register_select_sources(select);
                let _ = select.visit(self);
                self.leave_scope();
            }
            SetExpr::SetOperation {
                left,
                right,
                ..
            } => {
                self.walk_set_expr(left);
                self.walk_set_expr(right);
            }
            other => {
                let _ = other.visit(self);
            }
        }
    }

    fn register_joined(&mut self, from: &TableWithJoins) {
        self.register_factor(&from.relation);
        for join in &from.joins {
            self.register_factor(&join.relation);
        }
    }

    fn register_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table {
                name,
                alias,
                args: None,
                ..
            } => {
                if let Some(table) = qualify(name) {
                    let alias = alias.as_ref().map(|a| a.name.value.as_str());
                    self.scopes.register(&table, alias);
                }
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.register_joined(table_with_joins),
            _ => {}
        }
    }

    fn enter_table_context(&mut self, name: &ObjectName) {
        let table = self.emit_object(name, ObjectKind::Table);
        self.table_context.push(table);
    }

    fn emit_column_def(&mut self, column: &ColumnDef) {
        if let Some(Some(table)) = self.table_context.last() {
            let name = table.column(&column.name.value);
            self.emit(name, ObjectKind::Column);
        }
    }

    fn resolve_column(&mut self, idents: &[Ident]) {
        match idents {
            [.., schema, table, column] => {
                let name = compact_str::format_compact!(
                    "{}.{}.{}",
                    schema.value,
                    table.value,
                    column.value
                );
                self.emit(name, ObjectKind::Column);
            }
            [qualifier, column] => {
                if let Some(table) = self.scopes.resolve(&qualifier.value) {
                    let name = table.column(&column.value);
                    self.emit(name, ObjectKind::Column);
                }
            }
            _ => {}
        }
    }
}

impl Visitor for ReferenceVisitor {
    type Break = Infallible;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        if self.skip_depth > 0 {
            return ControlFlow::Continue(());
        }
        self.enter_scope();
        match statement {
            Statement::CreateTable(create) => {
                self.enter_table_context(&create.name);
                for column in &create.columns {
                    self.emit_column_def(column);
                }
            }
            Statement::AlterTable(alter) => {
                self.enter_table_context(&alter.name);
                for op in &alter.operations {
                    if let AlterTableOperation::AddColumn {
                        column_def, ..
                    } = op
                    {
                        self.emit_column_def(column_def);
                    }
                }
            }
            Statement::CreateView(view) => {
                self.emit_object(&view.name, ObjectKind::View);
            }
            Statement::AlterView {
                name, ..
            } => {
                self.emit_object(name, ObjectKind::View);
            }
            Statement::CreateProcedure {
                name, ..
            } => {
                self.emit_object(name, ObjectKind::Procedure);
            }
            Statement::CreateFunction(function) => {
                self.emit_object(&function.name, ObjectKind::Function);
            }
            Statement::Update(update) => {
                // Assignments precede `FROM` in the tree
                self.register_joined(&update.table);
                if let Some(
                    UpdateTableFromKind::BeforeSet(from) | UpdateTableFromKind::AfterSet(from)
                ) = &update.from
                {
                    for table in from {
                        self.register_joined(table);
                    }
                }
            }
            Statement::Insert(insert) => {
                if let TableObject::TableName(name) = &insert.table
                    && let Some(table) = self.emit_object(name, ObjectKind::Table)
                {
                    self.scopes.register(&table, None);
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn post_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        if self.skip_depth > 0 {
            return ControlFlow::Continue(());
        }
        if matches!(
            statement,
            Statement::CreateTable(_) | Statement::AlterTable(_)
        ) {
            self.table_context.pop();
        }
        self.leave_scope();
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return ControlFlow::Continue(());
        }
        self.enter_scope();
        match query.body.as_ref() {
            SetExpr::Select(select) => self.register_select_sources(select),
            SetExpr::SetOperation {
                ..
            } => {
                self.walk_set_operation(query);
                // The generic traversal would visit the same nodes again
                self.skip_depth = 1;
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            if self.skip_depth > 0 {
                return ControlFlow::Continue(());
            }
        }
        self.leave_scope();
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if self.skip_depth > 0 {
            return ControlFlow::Continue(());
        }
        match factor {
            TableFactor::Table {
                name,
                args: Some(_),
                ..
            }
            | TableFactor::Function {
                name, ..
            } => {
                self.emit_object(name, ObjectKind::Function);
            }
            TableFactor::Table {
                name,
                alias,
                ..
            } => {
                if let Some(table) = self.emit_object(name, ObjectKind::Table) {
                    let alias = alias.as_ref().map(|a| a.name.value.as_str());
                    self.scopes.register(&table, alias);
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.skip_depth > 0 {
            return ControlFlow::Continue(());
        }
        if let Expr::CompoundIdentifier(idents) = expr {
            self.resolve_column(idents);
        }
        ControlFlow::Continue(())
    }
}

/// Plain identifier parts of an object name; `None` when a part is not a
/// plain identifier.
pub fn name_parts(name: &ObjectName) -> Option<NameParts> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(CompactString::from(ident.value.as_str())),
            #[allow(unreachable_patterns)]
            _ => None
        })
        .collect()
}

/// Resolve an object name to `(schema, object)` using its last two parts.
/// Single-part names have no schema and yield `None`.
pub fn qualify(name: &ObjectName) -> Option<QualifiedTable> {
    let parts = name_parts(name)?;
    match parts.as_slice() {
        [.., schema, table] => Some(QualifiedTable {
            schema: schema.clone(),
            table:  table.clone()
        }),
        _ => None
    }
}
