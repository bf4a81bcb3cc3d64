#![forbid(unsafe_code)]

//! Program Knowledge Base.
//!
//! The [`Pkb`] owns every fact extracted from one program: entity tables,
//! relationship tables and the pattern index. Extraction fills it through the
//! `insert_*` methods; afterwards it is only read. Lookups are total: an
//! argument of the wrong shape yields `false` or an empty row set and a log
//! event, never an error.

/// Affects derivation.
mod affects;

/// Statement, variable, procedure and constant tables.
pub mod entities;

/// Insertion errors.
pub mod errors;

/// Expression normalisation used by assignment patterns.
pub mod expr;

/// Field model for facts and query arguments.
pub mod field;

/// Arena graph behind the closure relations.
pub mod graph;

/// Assign/if/while pattern index.
pub mod pattern;

/// Modifies/Uses storage.
pub mod relation;

/// Relation kinds and the shared table interface.
pub mod tables;

/// Graph-backed closure tables.
pub mod transitive;

use std::sync::OnceLock;

use tracing::{debug, warn};

pub use self::entities::{EntityTable, StatementTable};
pub use self::errors::PkbError;
pub use self::expr::{ExprError, ExprMatch, Postfix};
pub use self::field::{
    Const, Content, EntityType, Field, FieldKind, ProcName, StatementType, StmtLoc, VarName,
};
pub use self::pattern::PatternIndex;
pub use self::tables::{ClosureTable, RelationKind, RelationRows, RelationTable};

use self::relation::NonTransitiveTable;
use self::tables::TableRef;
use self::transitive::TransitiveTable;

/// In-memory fact store for one analysed program.
///
/// All insertions are expected to happen before the first query. Affects is
/// derived lazily from Next, Modifies and Uses and recomputed after any
/// insertion that could change it.
#[derive(Debug)]
pub struct Pkb {
    statements: StatementTable,
    variables: EntityTable<VarName>,
    procedures: EntityTable<ProcName>,
    constants: EntityTable<Const>,
    modifies: NonTransitiveTable,
    uses: NonTransitiveTable,
    follows: TransitiveTable<StmtLoc>,
    parent: TransitiveTable<StmtLoc>,
    next: TransitiveTable<StmtLoc>,
    calls: TransitiveTable<ProcName>,
    patterns: PatternIndex,
    affects: OnceLock<TransitiveTable<StmtLoc>>,
}

impl Default for Pkb {
    fn default() -> Self {
        Self::new()
    }
}

impl Pkb {
    /// Creates an empty knowledge base.
    pub fn new() -> Self {
        Self {
            statements: StatementTable::default(),
            variables: EntityTable::default(),
            procedures: EntityTable::default(),
            constants: EntityTable::default(),
            modifies: NonTransitiveTable::new(RelationKind::Modifies),
            uses: NonTransitiveTable::new(RelationKind::Uses),
            follows: TransitiveTable::new(RelationKind::Follows),
            parent: TransitiveTable::new(RelationKind::Parent),
            next: TransitiveTable::new(RelationKind::Next),
            calls: TransitiveTable::new(RelationKind::Calls),
            patterns: PatternIndex::default(),
            affects: OnceLock::new(),
        }
    }

    fn invalidate_derived(&mut self) {
        if self.affects.take().is_some() {
            debug!("pkb.affects.invalidated");
        }
    }

    fn log_rejection(result: Result<bool, PkbError>, fact: &'static str) {
        if let Err(err) = result {
            warn!(fact, code = err.code(), error = %err, "pkb.insert.rejected");
        }
    }

    // ----- insertion -------------------------------------------------------

    /// Records a statement, returning `Ok(false)` when it already existed.
    pub fn try_insert_statement(
        &mut self,
        statement_type: StatementType,
        number: u32,
        attribute: Option<&str>,
    ) -> Result<bool, PkbError> {
        let stmt = match attribute {
            Some(name) => StmtLoc::with_attribute(number, statement_type, name),
            None => StmtLoc::new(number, statement_type),
        };
        let inserted = self.statements.insert(stmt)?;
        if inserted {
            self.invalidate_derived();
        }
        Ok(inserted)
    }

    /// Records a statement; conflicts are logged and dropped.
    pub fn insert_statement(&mut self, statement_type: StatementType, number: u32) {
        let result = self.try_insert_statement(statement_type, number, None);
        Self::log_rejection(result, "statement");
    }

    /// Records a read/print/call statement together with its variable or
    /// callee name.
    pub fn insert_statement_with_attribute(
        &mut self,
        statement_type: StatementType,
        number: u32,
        attribute: &str,
    ) {
        let result = self.try_insert_statement(statement_type, number, Some(attribute));
        Self::log_rejection(result, "statement");
    }

    /// Records a variable name.
    pub fn insert_variable(&mut self, name: impl Into<String>) {
        self.variables.insert(VarName::new(name));
    }

    /// Records a procedure name.
    pub fn insert_procedure(&mut self, name: impl Into<String>) {
        self.procedures.insert(ProcName::new(name));
    }

    /// Records an integer constant.
    pub fn insert_constant(&mut self, value: u32) {
        self.constants.insert(Const(value));
    }

    /// Records `kind(first, second)`.
    pub fn try_insert_relationship(
        &mut self,
        kind: RelationKind,
        first: &Field,
        second: &Field,
    ) -> Result<bool, PkbError> {
        if !kind.is_insertable() {
            return Err(PkbError::DerivedRelation { relation: kind });
        }
        let inserted = match kind {
            RelationKind::Modifies => self.modifies.insert(first, second)?,
            RelationKind::Uses => self.uses.insert(first, second)?,
            RelationKind::Follows => self.follows.insert(first, second)?,
            RelationKind::Parent => self.parent.insert(first, second)?,
            RelationKind::Next => self.next.insert(first, second)?,
            RelationKind::Calls => self.calls.insert(first, second)?,
            _ => return Err(PkbError::DerivedRelation { relation: kind }),
        };
        if inserted && matches!(kind, RelationKind::Modifies | RelationKind::Uses | RelationKind::Next) {
            self.invalidate_derived();
        }
        Ok(inserted)
    }

    /// Records `kind(first, second)`; rejected facts are logged and dropped.
    pub fn insert_relationship(&mut self, kind: RelationKind, first: &Field, second: &Field) {
        let result = self.try_insert_relationship(kind, first, second);
        Self::log_rejection(result, "relationship");
    }

    /// Records the assignment `lhs = rhs` at statement `number`.
    pub fn try_insert_assign_pattern(
        &mut self,
        number: u32,
        lhs: &str,
        rhs: &str,
    ) -> Result<bool, PkbError> {
        let rhs = Postfix::parse(rhs).map_err(|source| PkbError::InvalidExpression {
            stmt: number,
            source,
        })?;
        let stmt = StmtLoc::new(number, StatementType::Assignment);
        Ok(self.patterns.insert_assign(stmt, VarName::new(lhs), rhs))
    }

    /// Records an assignment pattern; malformed expressions are logged and
    /// dropped.
    pub fn insert_assign_pattern(&mut self, number: u32, lhs: &str, rhs: &str) {
        let result = self.try_insert_assign_pattern(number, lhs, rhs);
        Self::log_rejection(result, "pattern");
    }

    /// Records the control variables of the if statement `number`.
    pub fn insert_if_pattern<I, S>(&mut self, number: u32, vars: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stmt = StmtLoc::new(number, StatementType::If);
        self.patterns
            .insert_container(stmt, vars.into_iter().map(VarName::new));
    }

    /// Records the control variables of the while statement `number`.
    pub fn insert_while_pattern<I, S>(&mut self, number: u32, vars: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stmt = StmtLoc::new(number, StatementType::While);
        self.patterns
            .insert_container(stmt, vars.into_iter().map(VarName::new));
    }

    // ----- lookups ---------------------------------------------------------

    fn affects(&self) -> &TransitiveTable<StmtLoc> {
        self.affects.get_or_init(|| {
            affects::derive_affects(&self.statements, &self.next, &self.modifies, &self.uses)
        })
    }

    fn table(&self, kind: RelationKind) -> TableRef<'_> {
        match kind.base() {
            RelationKind::Modifies => TableRef::Flat(&self.modifies),
            RelationKind::Uses => TableRef::Flat(&self.uses),
            RelationKind::Follows => TableRef::Statement(&self.follows),
            RelationKind::Parent => TableRef::Statement(&self.parent),
            RelationKind::Next => TableRef::Statement(&self.next),
            RelationKind::Calls => TableRef::Procedure(&self.calls),
            _ => TableRef::Statement(self.affects()),
        }
    }

    /// True when `kind(first, second)` holds for two concrete fields.
    pub fn is_related(&self, kind: RelationKind, first: &Field, second: &Field) -> bool {
        self.table(kind)
            .contains(first, second, kind.is_transitive())
    }

    /// Pairs satisfying `kind(first, second)` where either side may be a
    /// declaration or a wildcard.
    pub fn get_relationship(
        &self,
        kind: RelationKind,
        first: &Field,
        second: &Field,
    ) -> RelationRows {
        self.table(kind)
            .retrieve(first, second, kind.is_transitive())
    }

    /// Number of direct pairs stored for `kind`'s base relation.
    pub fn relationship_count(&self, kind: RelationKind) -> usize {
        self.table(kind).size()
    }

    /// Statement by number.
    pub fn get_statement(&self, number: u32) -> Option<&StmtLoc> {
        self.statements.get(number)
    }

    /// Statements admitted by `filter` in statement order.
    pub fn get_statements(&self, filter: StatementType) -> impl Iterator<Item = &StmtLoc> + '_ {
        self.statements.of_type(filter)
    }

    /// Every variable, sorted by name.
    pub fn get_variables(&self) -> impl Iterator<Item = &VarName> + '_ {
        self.variables.iter()
    }

    /// Every procedure, sorted by name.
    pub fn get_procedures(&self) -> impl Iterator<Item = &ProcName> + '_ {
        self.procedures.iter()
    }

    /// Every constant, ascending.
    pub fn get_constants(&self) -> impl Iterator<Item = &Const> + '_ {
        self.constants.iter()
    }

    /// Assignments matching the left-side constraint and right-side shape.
    pub fn match_assign_pattern(&self, lhs: &Field, rhs: &ExprMatch) -> RelationRows {
        self.patterns.match_assign(lhs, rhs)
    }

    /// If or while statements whose condition uses a variable admitted by
    /// `lhs`.
    pub fn match_container_pattern(&self, kind: StatementType, lhs: &Field) -> RelationRows {
        self.patterns.match_container(kind, lhs)
    }
}
