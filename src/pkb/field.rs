//! Typed field model shared by stored facts and query arguments.
//!
//! A [`Field`] is either a concrete fact component (a statement, variable,
//! procedure or constant), an unbound declaration constrained by entity type
//! and optional statement kind, or a wildcard.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Kind of statement a [`StmtLoc`] refers to.
///
/// `All` matches every statement kind when used as a filter; `None` marks a
/// statement whose kind is not known yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementType {
    /// `x = expr;`
    Assignment,
    /// `while (cond) { ... }`
    While,
    /// `if (cond) then { ... } else { ... }`
    If,
    /// `read x;`
    Read,
    /// `print x;`
    Print,
    /// `call p;`
    Call,
    /// Matches any statement kind.
    All,
    /// Unknown kind.
    None,
}

impl StatementType {
    /// Returns true when `actual` satisfies this filter.
    pub fn admits(self, actual: StatementType) -> bool {
        matches!(self, StatementType::All | StatementType::None) || self == actual
    }

    /// Container statements may be the first argument of Parent.
    pub fn is_container(self) -> bool {
        matches!(self, StatementType::If | StatementType::While)
    }

    /// Statements that overwrite the variable they name.
    pub fn is_modifying(self) -> bool {
        matches!(
            self,
            StatementType::Assignment | StatementType::Read | StatementType::Call
        )
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementType::Assignment => "assign",
            StatementType::While => "while",
            StatementType::If => "if",
            StatementType::Read => "read",
            StatementType::Print => "print",
            StatementType::Call => "call",
            StatementType::All => "stmt",
            StatementType::None => "unknown",
        };
        f.write_str(name)
    }
}

/// Statement location: line number, kind and the optional attribute name
/// (the variable of a read/print, the callee of a call).
///
/// Equality, ordering and hashing only look at `(number, statement_type)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StmtLoc {
    /// Statement number, starting at 1.
    pub number: u32,
    /// Statement kind.
    pub statement_type: StatementType,
    /// Variable or procedure name attached to read/print/call statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl StmtLoc {
    /// Creates a statement location without an attribute.
    pub fn new(number: u32, statement_type: StatementType) -> Self {
        Self {
            number,
            statement_type,
            attribute: None,
        }
    }

    /// Creates a statement location carrying an attribute name.
    pub fn with_attribute(
        number: u32,
        statement_type: StatementType,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            number,
            statement_type,
            attribute: Some(attribute.into()),
        }
    }
}

impl PartialEq for StmtLoc {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.statement_type == other.statement_type
    }
}

impl Eq for StmtLoc {}

impl Hash for StmtLoc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
        self.statement_type.hash(state);
    }
}

impl PartialOrd for StmtLoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StmtLoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then(self.statement_type.cmp(&other.statement_type))
    }
}

/// Variable name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarName(pub String);

/// Procedure name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcName(pub String);

/// Integer constant appearing in the program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Const(pub u32);

impl VarName {
    /// Creates a variable name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrowed name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ProcName {
    /// Creates a procedure name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrowed name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StmtLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number)
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Program statement.
    Statement,
    /// Variable.
    Variable,
    /// Procedure.
    Procedure,
    /// Integer constant.
    Const,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityType::Statement => "statement",
            EntityType::Variable => "variable",
            EntityType::Procedure => "procedure",
            EntityType::Const => "constant",
        };
        f.write_str(name)
    }
}

/// Whether a field holds a value, an unbound declaration or a wildcard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Carries content.
    Concrete,
    /// Unbound, constrained by entity type and statement kind.
    Declaration,
    /// Matches anything of its entity type.
    Wildcard,
}

/// Concrete payload of a field.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Content {
    /// Statement location.
    Stmt(StmtLoc),
    /// Variable name.
    Var(VarName),
    /// Procedure name.
    Proc(ProcName),
    /// Constant value.
    Const(Const),
}

impl Content {
    /// Entity type implied by the payload.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Content::Stmt(_) => EntityType::Statement,
            Content::Var(_) => EntityType::Variable,
            Content::Proc(_) => EntityType::Procedure,
            Content::Const(_) => EntityType::Const,
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Stmt(stmt) => stmt.fmt(f),
            Content::Var(var) => var.fmt(f),
            Content::Proc(proc_name) => proc_name.fmt(f),
            Content::Const(value) => value.fmt(f),
        }
    }
}

impl From<StmtLoc> for Content {
    fn from(value: StmtLoc) -> Self {
        Content::Stmt(value)
    }
}

impl From<VarName> for Content {
    fn from(value: VarName) -> Self {
        Content::Var(value)
    }
}

impl From<ProcName> for Content {
    fn from(value: ProcName) -> Self {
        Content::Proc(value)
    }
}

impl From<Const> for Content {
    fn from(value: Const) -> Self {
        Content::Const(value)
    }
}

/// One fact component or one query argument.
///
/// Concrete fields carry content whose entity type matches `entity_type`;
/// declarations carry only the entity type and an optional statement kind;
/// wildcards carry neither content nor statement kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Field {
    kind: FieldKind,
    entity_type: EntityType,
    content: Option<Content>,
    statement_type: Option<StatementType>,
}

impl Field {
    /// Concrete field built from its payload.
    pub fn concrete(content: impl Into<Content>) -> Self {
        let content = content.into();
        let statement_type = match &content {
            Content::Stmt(stmt) => Some(stmt.statement_type),
            _ => None,
        };
        Self {
            kind: FieldKind::Concrete,
            entity_type: content.entity_type(),
            content: Some(content),
            statement_type,
        }
    }

    /// Concrete statement field.
    pub fn stmt(number: u32, statement_type: StatementType) -> Self {
        Self::concrete(StmtLoc::new(number, statement_type))
    }

    /// Concrete variable field.
    pub fn var(name: impl Into<String>) -> Self {
        Self::concrete(VarName::new(name))
    }

    /// Concrete procedure field.
    pub fn proc_name(name: impl Into<String>) -> Self {
        Self::concrete(ProcName::new(name))
    }

    /// Concrete constant field.
    pub fn constant(value: u32) -> Self {
        Self::concrete(Const(value))
    }

    /// Declaration of the given entity type. Statement declarations default
    /// to matching every statement kind.
    pub fn declaration(entity_type: EntityType) -> Self {
        let statement_type = (entity_type == EntityType::Statement).then_some(StatementType::All);
        Self {
            kind: FieldKind::Declaration,
            entity_type,
            content: None,
            statement_type,
        }
    }

    /// Statement declaration restricted to one statement kind.
    pub fn stmt_declaration(statement_type: StatementType) -> Self {
        Self {
            kind: FieldKind::Declaration,
            entity_type: EntityType::Statement,
            content: None,
            statement_type: Some(statement_type),
        }
    }

    /// Wildcard of the given entity type.
    pub fn wildcard(entity_type: EntityType) -> Self {
        Self {
            kind: FieldKind::Wildcard,
            entity_type,
            content: None,
            statement_type: None,
        }
    }

    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Entity type.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Statement kind, present for statements and statement declarations.
    pub fn statement_type(&self) -> Option<StatementType> {
        self.statement_type
    }

    /// Payload of a concrete field.
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// True for concrete fields.
    pub fn is_concrete(&self) -> bool {
        self.kind == FieldKind::Concrete
    }

    /// True for declarations.
    pub fn is_declaration(&self) -> bool {
        self.kind == FieldKind::Declaration
    }

    /// True for wildcards.
    pub fn is_wildcard(&self) -> bool {
        self.kind == FieldKind::Wildcard
    }

    /// True when the field is concrete, of `entity_type`, and its payload
    /// agrees with that type.
    pub fn is_valid_concrete(&self, entity_type: EntityType) -> bool {
        self.is_concrete()
            && self.entity_type == entity_type
            && self
                .content
                .as_ref()
                .is_some_and(|content| content.entity_type() == entity_type)
    }

    /// Statement payload, if any.
    pub fn as_stmt(&self) -> Option<&StmtLoc> {
        match &self.content {
            Some(Content::Stmt(stmt)) => Some(stmt),
            _ => None,
        }
    }

    /// Variable payload, if any.
    pub fn as_var(&self) -> Option<&VarName> {
        match &self.content {
            Some(Content::Var(var)) => Some(var),
            _ => None,
        }
    }

    /// Procedure payload, if any.
    pub fn as_proc(&self) -> Option<&ProcName> {
        match &self.content {
            Some(Content::Proc(proc_name)) => Some(proc_name),
            _ => None,
        }
    }

    /// Constant payload, if any.
    pub fn as_const(&self) -> Option<Const> {
        match &self.content {
            Some(Content::Const(value)) => Some(*value),
            _ => None,
        }
    }

    /// Statement kind this field admits when used as a filter.
    pub fn statement_filter(&self) -> StatementType {
        self.statement_type.unwrap_or(StatementType::All)
    }

    /// Rewrites a wildcard into a declaration of the same entity type that
    /// matches every statement kind. Other fields are returned unchanged.
    pub fn normalized(&self) -> Field {
        if self.is_wildcard() {
            Field::declaration(self.entity_type)
        } else {
            self.clone()
        }
    }

    /// True when `candidate` (a concrete field) satisfies this field used as
    /// a constraint: equal when concrete, same entity type and admitted
    /// statement kind otherwise.
    pub fn admits(&self, candidate: &Field) -> bool {
        if self.is_concrete() {
            return self == candidate;
        }
        if self.entity_type != candidate.entity_type {
            return false;
        }
        match candidate.as_stmt() {
            Some(stmt) => self.statement_filter().admits(stmt.statement_type),
            None => true,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.content, self.kind) {
            (Some(content), _) => content.fmt(f),
            (None, FieldKind::Wildcard) => f.write_str("_"),
            (None, _) => match self.statement_type {
                Some(statement_type) => write!(f, "<{statement_type}>"),
                None => write!(f, "<{}>", self.entity_type),
            },
        }
    }
}
