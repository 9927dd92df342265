use compact_str::CompactString;
use indexmap::IndexMap;

/// A table resolved to its schema-qualified name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTable {
    pub schema: CompactString,
    pub table:  CompactString
}

impl QualifiedTable {
    /// `schema.table`
    pub fn name(&self) -> CompactString {
        compact_str::format_compact!("{}.{}", self.schema, self.table)
    }

    /// `schema.table.column`
    pub fn column(&self, column: &str) -> CompactString {
        compact_str::format_compact!("{}.{}.{}", self.schema, self.table, column)
    }
}

/// Lookup keys visible inside one query body. Keys compare
/// case-insensitively.
#[derive(Debug, Default)]
pub struct ScopeFrame {
    entries: IndexMap<CompactString, QualifiedTable>
}

impl ScopeFrame {
    fn insert(&mut self, key: &str, table: QualifiedTable) {
        self.entries.insert(fold(key), table);
    }

    fn get(&self, key: &str) -> Option<&QualifiedTable> {
        self.entries.get(&fold(key))
    }
}

/// Stack of scope frames, innermost last.
///
/// The stack is seeded with one frame that is never popped, so lookups and
/// registrations always have a frame to work with.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame::default()]
        }
    }

    /// Push a fresh frame and return the mark that releases it
    pub fn enter(&mut self) -> usize {
        let mark = self.frames.len();
        self.frames.push(ScopeFrame::default());
        mark
    }

    /// Release every frame pushed since `mark` was taken. The seed frame
    /// stays.
    pub fn leave(&mut self, mark: usize) {
        self.frames.truncate(mark.max(1));
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Register a table under its bare name, its `schema.table` name and its
    /// alias, all in the innermost frame.
    pub fn register(&mut self, table: &QualifiedTable, alias: Option<&str>) {
        let frame = self.current();
        frame.insert(&table.table, table.clone());
        frame.insert(&table.name(), table.clone());
        if let Some(alias) = alias {
            frame.insert(alias, table.clone());
        }
    }

    /// Search from the innermost frame outwards; the nearest match wins
    pub fn resolve(&self, key: &str) -> Option<&QualifiedTable> {
        self.frames.iter().rev().find_map(|frame| frame.get(key))
    }

    fn current(&mut self) -> &mut ScopeFrame {
        if self.frames.is_empty() {
            self.frames.push(ScopeFrame::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

fn fold(key: &str) -> CompactString {
    CompactString::from(key.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(schema: &str, table: &str) -> QualifiedTable {
        QualifiedTable {
            schema: schema.into(),
            table:  table.into()
        }
    }

    #[test]
    fn test_register_all_keys() {
        let mut scopes = ScopeStack::new();
        scopes.register(&table("om", "om_orders"), Some("o"));
        assert_eq!(scopes.resolve("o"), Some(&table("om", "om_orders")));
        assert_eq!(scopes.resolve("OM_ORDERS"), Some(&table("om", "om_orders")));
        assert_eq!(scopes.resolve("om.om_orders"), Some(&table("om", "om_orders")));
    }

    #[test]
    fn test_inner_frame_shadows_outer() {
        let mut scopes = ScopeStack::new();
        scopes.register(&table("om", "om_outer"), Some("t"));
        let mark = scopes.enter();
        scopes.register(&table("om", "om_inner"), Some("t"));
        assert_eq!(scopes.resolve("t"), Some(&table("om", "om_inner")));
        scopes.leave(mark);
        assert_eq!(scopes.resolve("t"), Some(&table("om", "om_outer")));
    }

    #[test]
    fn test_outer_frame_visible_from_inner() {
        let mut scopes = ScopeStack::new();
        scopes.register(&table("om", "om_outer"), Some("o"));
        let mark = scopes.enter();
        assert_eq!(scopes.resolve("o"), Some(&table("om", "om_outer")));
        scopes.leave(mark);
    }

    #[test]
    fn test_seed_frame_is_never_popped() {
        let mut scopes = ScopeStack::new();
        scopes.leave(0);
        assert_eq!(scopes.depth(), 1);
        scopes.register(&table("om", "om_t"), None);
        assert!(scopes.resolve("om_t").is_some());
    }

    #[test]
    fn test_leave_releases_nested_frames() {
        let mut scopes = ScopeStack::new();
        let outer = scopes.enter();
        scopes.enter();
        scopes.enter();
        assert_eq!(scopes.depth(), 4);
        scopes.leave(outer);
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn test_inner_registrations_do_not_leak() {
        let mut scopes = ScopeStack::new();
        let mark = scopes.enter();
        scopes.register(&table("om", "om_t"), Some("x"));
        scopes.leave(mark);
        assert!(scopes.resolve("x").is_none());
        assert_eq!(scopes.depth(), 1);
    }
}
