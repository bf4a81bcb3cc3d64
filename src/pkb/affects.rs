//! Affects derivation over the control-flow graph.
//!
//! `Affects(a1, a2)` holds when both are assignments, `a1` modifies some `v`,
//! `a2` uses `v`, and a Next path leads from `a1` to `a2` on which no
//! statement strictly between them modifies `v`.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use super::entities::StatementTable;
use super::field::{Field, StatementType, StmtLoc, VarName};
use super::relation::NonTransitiveTable;
use super::tables::{RelationKind, RelationTable};
use super::transitive::TransitiveTable;

/// Builds the direct Affects table. The closure form comes from the table
/// itself.
pub(crate) fn derive_affects(
    statements: &StatementTable,
    next: &TransitiveTable<StmtLoc>,
    modifies: &NonTransitiveTable,
    uses: &NonTransitiveTable,
) -> TransitiveTable<StmtLoc> {
    let mut affects = TransitiveTable::new(RelationKind::Affects);
    for source in statements.of_type(StatementType::Assignment) {
        let owner = Field::concrete(source.clone());
        let targets: Vec<VarName> = modifies
            .values_of(&owner)
            .filter_map(|field| field.as_var().cloned())
            .collect();
        for var in targets {
            for target in reached_uses(statements, next, modifies, uses, source, &var) {
                if let Err(err) = affects.insert(&owner, &Field::concrete(target)) {
                    warn!(error = %err, "pkb.affects.edge_rejected");
                }
            }
        }
    }
    debug!(edges = affects.size(), "pkb.affects.derived");
    affects
}

/// Assignments using `var` that a definition of `var` at `source` reaches.
fn reached_uses(
    statements: &StatementTable,
    next: &TransitiveTable<StmtLoc>,
    modifies: &NonTransitiveTable,
    uses: &NonTransitiveTable,
    source: &StmtLoc,
    var: &VarName,
) -> Vec<StmtLoc> {
    let var_field = Field::concrete(var.clone());
    let graph = next.graph();
    let mut found = Vec::new();
    let mut visited = FxHashSet::default();
    let mut stack: Vec<StmtLoc> = graph
        .traverse_start(source, StatementType::All)
        .into_iter()
        .collect();
    while let Some(stmt) = stack.pop() {
        if !visited.insert(stmt.number) {
            continue;
        }
        // Next nodes may lack attributes; prefer the recorded statement.
        let stmt = statements.get(stmt.number).cloned().unwrap_or(stmt);
        let field = Field::concrete(stmt.clone());
        if stmt.statement_type == StatementType::Assignment && uses.contains(&field, &var_field) {
            found.push(stmt.clone());
        }
        if stmt.statement_type.is_modifying() && modifies.contains(&field, &var_field) {
            continue;
        }
        stack.extend(graph.traverse_start(&stmt, StatementType::All));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkb::tables::ClosureTable;

    struct Program {
        statements: StatementTable,
        next: TransitiveTable<StmtLoc>,
        modifies: NonTransitiveTable,
        uses: NonTransitiveTable,
    }

    impl Program {
        fn new() -> Self {
            Self {
                statements: StatementTable::default(),
                next: TransitiveTable::new(RelationKind::Next),
                modifies: NonTransitiveTable::new(RelationKind::Modifies),
                uses: NonTransitiveTable::new(RelationKind::Uses),
            }
        }

        fn stmt(&mut self, number: u32, kind: StatementType, modifies: &[&str], uses: &[&str]) {
            self.statements.insert(StmtLoc::new(number, kind)).unwrap();
            let owner = Field::stmt(number, kind);
            for var in modifies {
                self.modifies.insert(&owner, &Field::var(*var)).unwrap();
            }
            for var in uses {
                self.uses.insert(&owner, &Field::var(*var)).unwrap();
            }
        }

        fn flow(&mut self, from: u32, to: u32) {
            let from = Field::concrete(self.statements.get(from).unwrap().clone());
            let to = Field::concrete(self.statements.get(to).unwrap().clone());
            self.next.insert(&from, &to).unwrap();
        }

        fn affects(&self) -> TransitiveTable<StmtLoc> {
            derive_affects(&self.statements, &self.next, &self.modifies, &self.uses)
        }
    }

    fn assign(number: u32) -> Field {
        Field::stmt(number, StatementType::Assignment)
    }

    // 1 x = 1; 2 while (i) { 3 x = x + 1; 4 read x; 5 y = x; } 6 z = x;
    fn looped() -> Program {
        let mut program = Program::new();
        program.stmt(1, StatementType::Assignment, &["x"], &[]);
        program.stmt(2, StatementType::While, &["x", "y"], &["i", "x"]);
        program.stmt(3, StatementType::Assignment, &["x"], &["x"]);
        program.stmt(4, StatementType::Read, &["x"], &[]);
        program.stmt(5, StatementType::Assignment, &["y"], &["x"]);
        program.stmt(6, StatementType::Assignment, &["z"], &["x"]);
        for (from, to) in [(1, 2), (2, 3), (3, 4), (4, 5), (5, 2), (2, 6)] {
            program.flow(from, to);
        }
        program
    }

    #[test]
    fn definitions_reach_uses_until_overwritten() {
        let affects = looped().affects();
        assert!(affects.contains(&assign(1), &assign(3)));
        assert!(affects.contains(&assign(1), &assign(6)));
        // read at 4 kills x before 5
        assert!(!affects.contains(&assign(1), &assign(5)));
        assert!(!affects.contains(&assign(3), &assign(5)));
        assert!(!affects.contains(&assign(3), &assign(6)));
        assert_eq!(affects.size(), 2);
    }

    #[test]
    fn loop_carried_self_affect() {
        let mut program = Program::new();
        program.stmt(1, StatementType::While, &["x"], &["x"]);
        program.stmt(2, StatementType::Assignment, &["x"], &["x"]);
        program.flow(1, 2);
        program.flow(2, 1);
        let affects = program.affects();
        assert!(affects.contains(&assign(2), &assign(2)));
    }

    #[test]
    fn closure_chains_through_assignments() {
        let mut program = Program::new();
        program.stmt(1, StatementType::Assignment, &["a"], &[]);
        program.stmt(2, StatementType::Assignment, &["b"], &["a"]);
        program.stmt(3, StatementType::Assignment, &["c"], &["b"]);
        program.flow(1, 2);
        program.flow(2, 3);
        let affects = program.affects();
        assert!(!affects.contains(&assign(1), &assign(3)));
        assert!(affects.contains_t(&assign(1), &assign(3)));
    }
}
