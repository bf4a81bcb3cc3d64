#![allow(dead_code)]

use std::sync::Once;

use pkbql::pkb::{Field, Pkb, RelationKind, StatementType};
use pkbql::query::{Evaluator, Query};
use pkbql::Config;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        pkbql::logging::init_tracing("pkbql=debug");
    });
}

/// Concrete field for statement `number` as recorded in `pkb`.
pub fn stmt(pkb: &Pkb, number: u32) -> Field {
    let loc = pkb
        .get_statement(number)
        .unwrap_or_else(|| panic!("statement {number} not inserted"));
    Field::concrete(loc.clone())
}

pub fn relate(pkb: &mut Pkb, kind: RelationKind, pairs: &[(u32, u32)]) {
    for &(a, b) in pairs {
        let (first, second) = (stmt(pkb, a), stmt(pkb, b));
        pkb.insert_relationship(kind, &first, &second);
    }
}

pub fn stmt_var(pkb: &mut Pkb, kind: RelationKind, pairs: &[(u32, &str)]) {
    for &(number, var) in pairs {
        let first = stmt(pkb, number);
        pkb.insert_relationship(kind, &first, &Field::var(var));
    }
}

pub fn proc_var(pkb: &mut Pkb, kind: RelationKind, pairs: &[(&str, &str)]) {
    for &(proc_name, var) in pairs {
        pkb.insert_relationship(kind, &Field::proc_name(proc_name), &Field::var(var));
    }
}

pub fn evaluate_with(pkb: &Pkb, config: &Config, query: &Query) -> Vec<String> {
    init_tracing();
    Evaluator::new(pkb, config)
        .evaluate(query)
        .expect("valid query")
        .into_strings()
}

pub fn evaluate(pkb: &Pkb, query: &Query) -> Vec<String> {
    evaluate_with(pkb, &Config::default(), query)
}

/// Configurations that must all produce the same answers.
pub fn all_configs() -> Vec<Config> {
    let mut unoptimized = Config::default();
    unoptimized.optimizer.enabled = false;
    let mut unordered = Config::default();
    unordered.optimizer.group_ordering = false;
    vec![Config::default(), Config::debugging(), unoptimized, unordered]
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Hand-built facts: if 1, assigns 2/4/5, while 3, print 6 and three
/// procedures.
pub fn relationship_fixture() -> Pkb {
    let mut pkb = Pkb::new();
    for name in ["proc1", "proc2", "proc3"] {
        pkb.insert_procedure(name);
    }
    pkb.insert_statement(StatementType::Assignment, 5);
    pkb.insert_statement(StatementType::Assignment, 2);
    pkb.insert_statement(StatementType::Assignment, 4);
    pkb.insert_statement(StatementType::If, 1);
    pkb.insert_statement(StatementType::While, 3);
    pkb.insert_statement(StatementType::Print, 6);
    for name in ["variable", "current", "x", "y"] {
        pkb.insert_variable(name);
    }

    stmt_var(
        &mut pkb,
        RelationKind::Modifies,
        &[(2, "variable"), (4, "variable"), (5, "variable"), (1, "variable"), (5, "current")],
    );
    proc_var(
        &mut pkb,
        RelationKind::Modifies,
        &[("proc1", "current"), ("proc1", "variable"), ("proc1", "x"), ("proc2", "variable")],
    );
    stmt_var(&mut pkb, RelationKind::Uses, &[(2, "x"), (6, "y"), (3, "current")]);
    proc_var(
        &mut pkb,
        RelationKind::Uses,
        &[("proc1", "current"), ("proc1", "x"), ("proc2", "variable"), ("proc2", "y")],
    );

    relate(&mut pkb, RelationKind::Follows, &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 6)]);
    relate(&mut pkb, RelationKind::Parent, &[(1, 2), (3, 4), (3, 5), (3, 6)]);
    relate(&mut pkb, RelationKind::Next, &[(1, 2), (2, 3), (3, 4), (4, 5), (1, 6)]);

    pkb.insert_relationship(
        RelationKind::Calls,
        &Field::proc_name("proc1"),
        &Field::proc_name("proc2"),
    );
    pkb.insert_relationship(
        RelationKind::Calls,
        &Field::proc_name("proc2"),
        &Field::proc_name("proc3"),
    );
    pkb
}

/// Entities only, with read/print/call attributes and one constant.
pub fn with_fixture() -> Pkb {
    let mut pkb = Pkb::new();
    for name in ["proc1", "proc2", "proc3"] {
        pkb.insert_procedure(name);
    }
    pkb.insert_statement(StatementType::Assignment, 5);
    pkb.insert_statement(StatementType::Assignment, 2);
    pkb.insert_statement(StatementType::Assignment, 4);
    pkb.insert_statement(StatementType::If, 1);
    pkb.insert_statement(StatementType::While, 3);
    pkb.insert_statement_with_attribute(StatementType::Print, 6, "x");
    pkb.insert_statement_with_attribute(StatementType::Call, 7, "proc2");
    pkb.insert_statement_with_attribute(StatementType::Call, 8, "proc2");
    pkb.insert_statement_with_attribute(StatementType::Print, 9, "y");
    pkb.insert_statement_with_attribute(StatementType::Read, 10, "variable");
    for name in ["variable", "current", "x", "y"] {
        pkb.insert_variable(name);
    }
    pkb.insert_constant(3);
    pkb
}

/// Facts of
///
/// ```text
/// procedure sumDigits {
/// 1   read number;
/// 2   sum = 0;
/// 3   while (number > 0) {
/// 4       digit = number % 10;
/// 5       sum = sum + digit;
/// 6       number = number / 10;
///     }
/// 7   print sum;
/// }
/// ```
pub fn sum_digits() -> Pkb {
    let mut pkb = Pkb::new();
    pkb.insert_procedure("sumDigits");
    for name in ["number", "sum", "digit"] {
        pkb.insert_variable(name);
    }
    pkb.insert_constant(0);
    pkb.insert_constant(10);

    pkb.insert_statement_with_attribute(StatementType::Read, 1, "number");
    pkb.insert_statement(StatementType::Assignment, 2);
    pkb.insert_statement(StatementType::While, 3);
    pkb.insert_statement(StatementType::Assignment, 4);
    pkb.insert_statement(StatementType::Assignment, 5);
    pkb.insert_statement(StatementType::Assignment, 6);
    pkb.insert_statement_with_attribute(StatementType::Print, 7, "sum");

    relate(&mut pkb, RelationKind::Follows, &[(1, 2), (2, 3), (3, 7), (4, 5), (5, 6)]);
    relate(&mut pkb, RelationKind::Parent, &[(3, 4), (3, 5), (3, 6)]);
    relate(
        &mut pkb,
        RelationKind::Next,
        &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 3), (3, 7)],
    );

    stmt_var(
        &mut pkb,
        RelationKind::Modifies,
        &[
            (1, "number"),
            (2, "sum"),
            (3, "digit"),
            (3, "sum"),
            (3, "number"),
            (4, "digit"),
            (5, "sum"),
            (6, "number"),
        ],
    );
    stmt_var(
        &mut pkb,
        RelationKind::Uses,
        &[
            (3, "number"),
            (3, "sum"),
            (3, "digit"),
            (4, "number"),
            (5, "sum"),
            (5, "digit"),
            (6, "number"),
            (7, "sum"),
        ],
    );
    proc_var(
        &mut pkb,
        RelationKind::Modifies,
        &[("sumDigits", "number"), ("sumDigits", "sum"), ("sumDigits", "digit")],
    );
    proc_var(
        &mut pkb,
        RelationKind::Uses,
        &[("sumDigits", "number"), ("sumDigits", "sum"), ("sumDigits", "digit")],
    );

    pkb.insert_assign_pattern(2, "sum", "0");
    pkb.insert_assign_pattern(4, "digit", "number % 10");
    pkb.insert_assign_pattern(5, "sum", "sum + digit");
    pkb.insert_assign_pattern(6, "number", "number / 10");
    pkb.insert_while_pattern(3, ["number"]);
    pkb
}
