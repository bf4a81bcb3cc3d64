mod common;

use common::{all_configs, evaluate, evaluate_with, strings, with_fixture};
use pkbql::query::{AttrName, DesignEntity, QueryBuilder};

const ALL_STATEMENTS: [&str; 10] = ["1", "10", "2", "3", "4", "5", "6", "7", "8", "9"];

fn select(synonym: &str, entity: DesignEntity) -> QueryBuilder {
    QueryBuilder::new().declare(synonym, entity).select(synonym)
}

#[test]
fn literal_comparisons() {
    let pkb = with_fixture();

    let equal = select("s", DesignEntity::Stmt).with(5u32, 5u32).build().unwrap();
    assert_eq!(evaluate(&pkb, &equal), strings(&ALL_STATEMENTS));

    let unequal = select("s", DesignEntity::Stmt).with(5u32, 1u32).build().unwrap();
    assert!(evaluate(&pkb, &unequal).is_empty());

    let names = select("s", DesignEntity::Stmt).with("x", "x").build().unwrap();
    assert_eq!(evaluate(&pkb, &names), strings(&ALL_STATEMENTS));

    let different = select("s", DesignEntity::Stmt)
        .with("x", "world")
        .build()
        .unwrap();
    assert!(evaluate(&pkb, &different).is_empty());
}

#[test]
fn attribute_against_literal() {
    let pkb = with_fixture();

    let calls = select("c", DesignEntity::Call)
        .with(("c", AttrName::ProcName), "proc2")
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &calls), strings(&["7", "8"]));

    let prints = select("pr", DesignEntity::Print)
        .with(("pr", AttrName::VarName), "y")
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &prints), strings(&["9"]));

    let reads = select("r", DesignEntity::Read)
        .with("variable", ("r", AttrName::VarName))
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &reads), strings(&["10"]));

    let procedure = select("p", DesignEntity::Procedure)
        .with(("p", AttrName::ProcName), "proc2")
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &procedure), strings(&["proc2"]));

    let assign = select("a", DesignEntity::Assign)
        .with(("a", AttrName::StmtNo), 4u32)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &assign), strings(&["4"]));

    let loop_stmt = select("w", DesignEntity::While)
        .with(("w", AttrName::StmtNo), 4u32)
        .build()
        .unwrap();
    assert!(evaluate(&pkb, &loop_stmt).is_empty());
}

#[test]
fn attribute_against_attribute() {
    let pkb = with_fixture();

    let calls = select("c", DesignEntity::Call)
        .declare("p", DesignEntity::Procedure)
        .with(("c", AttrName::ProcName), ("p", AttrName::ProcName))
        .build()
        .unwrap();

    let same = select("s", DesignEntity::Stmt)
        .declare("c", DesignEntity::Call)
        .with(("c", AttrName::ProcName), ("c", AttrName::ProcName))
        .build()
        .unwrap();

    let printed = select("v", DesignEntity::Variable)
        .declare("pr", DesignEntity::Print)
        .with(("pr", AttrName::VarName), ("v", AttrName::VarName))
        .build()
        .unwrap();

    let read_and_print = select("r", DesignEntity::Read)
        .declare("pr", DesignEntity::Print)
        .with(("r", AttrName::VarName), ("pr", AttrName::VarName))
        .build()
        .unwrap();

    let numbers = select("c", DesignEntity::Constant)
        .declare("a", DesignEntity::Assign)
        .with(("a", AttrName::StmtNo), ("c", AttrName::Value))
        .build()
        .unwrap();

    for config in all_configs() {
        assert_eq!(evaluate_with(&pkb, &config, &calls), strings(&["7", "8"]));
        assert_eq!(evaluate_with(&pkb, &config, &same), strings(&ALL_STATEMENTS));
        assert_eq!(evaluate_with(&pkb, &config, &printed), strings(&["x", "y"]));
        assert!(evaluate_with(&pkb, &config, &read_and_print).is_empty());
        assert!(evaluate_with(&pkb, &config, &numbers).is_empty());
    }
}

#[test]
fn selected_attributes_render_names() {
    let pkb = with_fixture();
    let query = QueryBuilder::new()
        .declare("c", DesignEntity::Call)
        .select("c")
        .select_attr("c", AttrName::ProcName)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &query), strings(&["7 proc2", "8 proc2"]));

    let reads = QueryBuilder::new()
        .declare("r", DesignEntity::Read)
        .select_attr("r", AttrName::VarName)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &reads), strings(&["variable"]));
}

#[test]
fn mismatched_types_are_rejected() {
    let err = select("s", DesignEntity::Stmt)
        .with(("s", AttrName::StmtNo), "one")
        .build()
        .unwrap_err();
    assert_eq!(err.code(), "WithTypeMismatch");
}
