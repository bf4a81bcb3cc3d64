//! Structured PQL query consumed by the optimizer and evaluator.
//!
//! A [`Query`] is produced by a front-end (or [`super::QueryBuilder`]) and is
//! read-only afterwards. Clause operands carry the declaration they refer
//! to so the evaluator never has to look synonyms up again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pkb::{EntityType, Field, Pkb, RelationKind, StatementType};

/// Declared category of a synonym.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum DesignEntity {
    Stmt,
    Read,
    Print,
    Call,
    While,
    If,
    Assign,
    Variable,
    Constant,
    Procedure,
}

impl DesignEntity {
    /// Entity type of values bound to this design entity.
    pub fn entity_type(self) -> EntityType {
        match self {
            DesignEntity::Variable => EntityType::Variable,
            DesignEntity::Constant => EntityType::Const,
            DesignEntity::Procedure => EntityType::Procedure,
            _ => EntityType::Statement,
        }
    }

    /// Statement kind for statement entities; `All` for `stmt`.
    pub fn statement_type(self) -> Option<StatementType> {
        let kind = match self {
            DesignEntity::Stmt => StatementType::All,
            DesignEntity::Read => StatementType::Read,
            DesignEntity::Print => StatementType::Print,
            DesignEntity::Call => StatementType::Call,
            DesignEntity::While => StatementType::While,
            DesignEntity::If => StatementType::If,
            DesignEntity::Assign => StatementType::Assignment,
            _ => return None,
        };
        Some(kind)
    }

    /// True for statement design entities.
    pub fn is_statement(self) -> bool {
        self.statement_type().is_some()
    }

    /// Unbound field constrained to this design entity.
    pub fn declaration_field(self) -> Field {
        match self.statement_type() {
            Some(kind) => Field::stmt_declaration(kind),
            None => Field::declaration(self.entity_type()),
        }
    }

    /// True when `attr` may be read from synonyms of this entity.
    pub fn has_attribute(self, attr: AttrName) -> bool {
        match attr {
            AttrName::StmtNo => self.is_statement(),
            AttrName::VarName => matches!(
                self,
                DesignEntity::Variable | DesignEntity::Read | DesignEntity::Print
            ),
            AttrName::ProcName => matches!(self, DesignEntity::Procedure | DesignEntity::Call),
            AttrName::Value => self == DesignEntity::Constant,
        }
    }
}

impl fmt::Display for DesignEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DesignEntity::Stmt => "stmt",
            DesignEntity::Read => "read",
            DesignEntity::Print => "print",
            DesignEntity::Call => "call",
            DesignEntity::While => "while",
            DesignEntity::If => "if",
            DesignEntity::Assign => "assign",
            DesignEntity::Variable => "variable",
            DesignEntity::Constant => "constant",
            DesignEntity::Procedure => "procedure",
        };
        f.write_str(name)
    }
}

/// A synonym together with its declared design entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Declaration {
    /// Synonym name.
    pub synonym: String,
    /// Declared design entity.
    pub entity: DesignEntity,
}

impl Declaration {
    /// Creates a declaration.
    pub fn new(synonym: impl Into<String>, entity: DesignEntity) -> Self {
        Self {
            synonym: synonym.into(),
            entity,
        }
    }
}

/// Statement operand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtRef {
    /// Statement number.
    LineNumber(u32),
    /// `_`
    Wildcard,
    /// Declared synonym.
    Declaration(Declaration),
}

/// Entity operand (variable or procedure).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntRef {
    /// Quoted name.
    Name(String),
    /// `_`
    Wildcard,
    /// Declared synonym.
    Declaration(Declaration),
}

/// One operand of a relationship clause with the entity type its position
/// expects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgRef<'a> {
    /// Statement position.
    Stmt(&'a StmtRef),
    /// Variable or procedure position.
    Ent(&'a EntRef, EntityType),
}

impl<'a> ArgRef<'a> {
    /// Declaration behind the operand, if any.
    pub fn declaration(self) -> Option<&'a Declaration> {
        match self {
            ArgRef::Stmt(StmtRef::Declaration(decl)) | ArgRef::Ent(EntRef::Declaration(decl), _) => {
                Some(decl)
            }
            _ => None,
        }
    }

    /// Synonym named by the operand, if any.
    pub fn synonym(self) -> Option<&'a str> {
        self.declaration().map(|decl| decl.synonym.as_str())
    }

    /// True for `_`.
    pub fn is_wildcard(self) -> bool {
        matches!(
            self,
            ArgRef::Stmt(StmtRef::Wildcard) | ArgRef::Ent(EntRef::Wildcard, _)
        )
    }

    /// Entity type the position expects.
    pub fn expected(self) -> EntityType {
        match self {
            ArgRef::Stmt(_) => EntityType::Statement,
            ArgRef::Ent(_, entity_type) => entity_type,
        }
    }

    /// Translates the operand into a PKB field. Statement numbers take their
    /// kind from the PKB; unknown numbers get a kind that matches nothing.
    pub fn to_field(self, pkb: &Pkb) -> Field {
        match self {
            ArgRef::Stmt(StmtRef::LineNumber(number)) => match pkb.get_statement(*number) {
                Some(stmt) => Field::concrete(stmt.clone()),
                None => Field::stmt(*number, StatementType::None),
            },
            ArgRef::Stmt(StmtRef::Wildcard) => Field::wildcard(EntityType::Statement),
            ArgRef::Ent(EntRef::Name(name), EntityType::Procedure) => Field::proc_name(name.clone()),
            ArgRef::Ent(EntRef::Name(name), _) => Field::var(name.clone()),
            ArgRef::Ent(EntRef::Wildcard, entity_type) => Field::wildcard(entity_type),
            ArgRef::Stmt(StmtRef::Declaration(decl)) | ArgRef::Ent(EntRef::Declaration(decl), _) => {
                decl.entity.declaration_field()
            }
        }
    }
}

/// Such-that clause. `S`/`P` variants of Modifies and Uses take a statement
/// or a procedure as first operand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum RelRef {
    ModifiesS(StmtRef, EntRef),
    ModifiesP(EntRef, EntRef),
    UsesS(StmtRef, EntRef),
    UsesP(EntRef, EntRef),
    Follows(StmtRef, StmtRef),
    FollowsT(StmtRef, StmtRef),
    Parent(StmtRef, StmtRef),
    ParentT(StmtRef, StmtRef),
    Calls(EntRef, EntRef),
    CallsT(EntRef, EntRef),
    Next(StmtRef, StmtRef),
    NextT(StmtRef, StmtRef),
    Affects(StmtRef, StmtRef),
    AffectsT(StmtRef, StmtRef),
}

impl RelRef {
    /// PKB relation queried by this clause.
    pub fn kind(&self) -> RelationKind {
        match self {
            RelRef::ModifiesS(..) | RelRef::ModifiesP(..) => RelationKind::Modifies,
            RelRef::UsesS(..) | RelRef::UsesP(..) => RelationKind::Uses,
            RelRef::Follows(..) => RelationKind::Follows,
            RelRef::FollowsT(..) => RelationKind::FollowsT,
            RelRef::Parent(..) => RelationKind::Parent,
            RelRef::ParentT(..) => RelationKind::ParentT,
            RelRef::Calls(..) => RelationKind::Calls,
            RelRef::CallsT(..) => RelationKind::CallsT,
            RelRef::Next(..) => RelationKind::Next,
            RelRef::NextT(..) => RelationKind::NextT,
            RelRef::Affects(..) => RelationKind::Affects,
            RelRef::AffectsT(..) => RelationKind::AffectsT,
        }
    }

    /// Both operands with their expected entity types.
    pub fn args(&self) -> (ArgRef<'_>, ArgRef<'_>) {
        use EntityType::{Procedure, Variable};
        match self {
            RelRef::ModifiesS(s, e) | RelRef::UsesS(s, e) => {
                (ArgRef::Stmt(s), ArgRef::Ent(e, Variable))
            }
            RelRef::ModifiesP(p, e) | RelRef::UsesP(p, e) => {
                (ArgRef::Ent(p, Procedure), ArgRef::Ent(e, Variable))
            }
            RelRef::Calls(a, b) | RelRef::CallsT(a, b) => {
                (ArgRef::Ent(a, Procedure), ArgRef::Ent(b, Procedure))
            }
            RelRef::Follows(a, b)
            | RelRef::FollowsT(a, b)
            | RelRef::Parent(a, b)
            | RelRef::ParentT(a, b)
            | RelRef::Next(a, b)
            | RelRef::NextT(a, b)
            | RelRef::Affects(a, b)
            | RelRef::AffectsT(a, b) => (ArgRef::Stmt(a), ArgRef::Stmt(b)),
        }
    }

    /// Synonyms referenced by the clause.
    pub fn synonyms(&self) -> Vec<&str> {
        let (first, second) = self.args();
        first.synonym().into_iter().chain(second.synonym()).collect()
    }

    /// Operands translated into PKB fields.
    pub fn fields(&self, pkb: &Pkb) -> (Field, Field) {
        let (first, second) = self.args();
        (first.to_field(pkb), second.to_field(pkb))
    }

    /// True for the direct relations, which are cheaper than closures.
    pub fn is_direct(&self) -> bool {
        !self.kind().is_transitive()
    }
}

/// Right-hand side of a pattern clause.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprSpec {
    /// `_`
    #[default]
    Wildcard,
    /// `"expr"`
    Full(String),
    /// `_"expr"_`
    Partial(String),
}

/// Pattern clause on an assign, if or while synonym.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern synonym.
    pub synonym: Declaration,
    /// Left-hand side (assigned or control variable).
    pub lhs: EntRef,
    /// Right-hand side, assignments only.
    pub rhs: ExprSpec,
}

impl Pattern {
    /// Synonyms referenced by the clause.
    pub fn synonyms(&self) -> Vec<&str> {
        let mut synonyms = vec![self.synonym.synonym.as_str()];
        if let Some(lhs) = self.lhs_arg().synonym() {
            if lhs != self.synonym.synonym {
                synonyms.push(lhs);
            }
        }
        synonyms
    }

    /// Left-hand side as a variable operand.
    pub fn lhs_arg(&self) -> ArgRef<'_> {
        ArgRef::Ent(&self.lhs, EntityType::Variable)
    }
}

/// Attribute of a synonym readable in with clauses and select lists.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttrName {
    /// `stmt#`
    #[serde(rename = "stmt#")]
    StmtNo,
    /// `varName`
    #[serde(rename = "varName")]
    VarName,
    /// `procName`
    #[serde(rename = "procName")]
    ProcName,
    /// `value`
    #[serde(rename = "value")]
    Value,
}

impl AttrName {
    /// True for attributes holding integers.
    pub fn is_numeric(self) -> bool {
        matches!(self, AttrName::StmtNo | AttrName::Value)
    }
}

impl fmt::Display for AttrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrName::StmtNo => "stmt#",
            AttrName::VarName => "varName",
            AttrName::ProcName => "procName",
            AttrName::Value => "value",
        };
        f.write_str(name)
    }
}

/// `synonym.attribute`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrRef {
    /// Synonym the attribute is read from.
    pub declaration: Declaration,
    /// Attribute name.
    pub attr: AttrName,
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaration.synonym, self.attr)
    }
}

/// One side of a with clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrCompareRef {
    /// Integer literal.
    Number(u32),
    /// Quoted name literal.
    String(String),
    /// Attribute of a synonym.
    Attr(AttrRef),
}

impl AttrCompareRef {
    /// True when the side compares as an integer.
    pub fn is_numeric(&self) -> bool {
        match self {
            AttrCompareRef::Number(_) => true,
            AttrCompareRef::String(_) => false,
            AttrCompareRef::Attr(attr) => attr.attr.is_numeric(),
        }
    }

    /// Attribute reference, if any.
    pub fn attr(&self) -> Option<&AttrRef> {
        match self {
            AttrCompareRef::Attr(attr) => Some(attr),
            _ => None,
        }
    }
}

impl fmt::Display for AttrCompareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrCompareRef::Number(value) => write!(f, "{value}"),
            AttrCompareRef::String(value) => write!(f, "\"{value}\""),
            AttrCompareRef::Attr(attr) => attr.fmt(f),
        }
    }
}

/// With clause: `lhs = rhs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrCompare {
    /// Left side.
    pub lhs: AttrCompareRef,
    /// Right side.
    pub rhs: AttrCompareRef,
}

impl AttrCompare {
    /// Synonyms referenced by the clause, without duplicates.
    pub fn synonyms(&self) -> Vec<&str> {
        let mut synonyms: Vec<&str> = [&self.lhs, &self.rhs]
            .into_iter()
            .filter_map(|side| side.attr())
            .map(|attr| attr.declaration.synonym.as_str())
            .collect();
        synonyms.dedup();
        synonyms
    }
}

/// Selected element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Elem {
    /// Synonym value.
    Synonym(Declaration),
    /// Attribute of a synonym.
    Attr(AttrRef),
}

impl Elem {
    /// Declaration behind the element.
    pub fn declaration(&self) -> &Declaration {
        match self {
            Elem::Synonym(decl) => decl,
            Elem::Attr(attr) => &attr.declaration,
        }
    }
}

/// Select clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCl {
    /// `Select BOOLEAN`
    Boolean,
    /// `Select s` or `Select <a, v.varName>`
    Tuple(Vec<Elem>),
}

/// Parsed query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Select clause.
    pub result: ResultCl,
    /// Such-that clauses.
    #[serde(default)]
    pub such_that: Vec<RelRef>,
    /// Pattern clauses.
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    /// With clauses.
    #[serde(default)]
    pub with: Vec<AttrCompare>,
}

impl Query {
    /// Declaration of `synonym`.
    pub fn declaration(&self, synonym: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|decl| decl.synonym == synonym)
    }

    /// Selected elements; empty for BOOLEAN.
    pub fn selected(&self) -> &[Elem] {
        match &self.result {
            ResultCl::Boolean => &[],
            ResultCl::Tuple(elems) => elems,
        }
    }

    /// Total number of clauses.
    pub fn clause_count(&self) -> usize {
        self.such_that.len() + self.patterns.len() + self.with.len()
    }

    /// Reads a query shipped as JSON. The result is not validated.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Serializes the query as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
