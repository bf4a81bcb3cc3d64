mod common;

use common::{all_configs, evaluate, evaluate_with, strings, sum_digits};
use pkbql::pkb::RelationKind;
use pkbql::query::{Arg, AttrName, DesignEntity, ExprSpec, QueryBuilder};

fn select(synonym: &str, entity: DesignEntity) -> QueryBuilder {
    QueryBuilder::new().declare(synonym, entity).select(synonym)
}

fn partial(expr: &str) -> ExprSpec {
    ExprSpec::Partial(expr.to_string())
}

#[test]
fn assignment_patterns() {
    let pkb = sum_digits();

    let disjoint = select("s", DesignEntity::Stmt)
        .declare("a", DesignEntity::Assign)
        .pattern("a", Arg::name("sum"), ExprSpec::Wildcard)
        .build()
        .unwrap();
    assert_eq!(
        evaluate(&pkb, &disjoint),
        strings(&["1", "2", "3", "4", "5", "6", "7"])
    );

    let any = select("a", DesignEntity::Assign)
        .pattern("a", "_", ExprSpec::Wildcard)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &any), strings(&["2", "4", "5", "6"]));

    let uses_number = select("a", DesignEntity::Assign)
        .pattern("a", "_", partial("number"))
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &uses_number), strings(&["4", "6"]));

    let none = select("a", DesignEntity::Assign)
        .pattern("a", Arg::name("x"), partial("number"))
        .build()
        .unwrap();
    assert!(evaluate(&pkb, &none).is_empty());

    let variables = select("v", DesignEntity::Variable)
        .declare("a", DesignEntity::Assign)
        .pattern("a", Arg::name("digit"), partial("number"))
        .build()
        .unwrap();
    assert_eq!(
        evaluate(&pkb, &variables),
        strings(&["digit", "number", "sum"])
    );

    let full = select("a", DesignEntity::Assign)
        .pattern("a", "_", ExprSpec::Full("sum + digit".into()))
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &full), strings(&["5"]));

    let bound_lhs = QueryBuilder::new()
        .declare("a", DesignEntity::Assign)
        .declare("v", DesignEntity::Variable)
        .select("a")
        .select("v")
        .pattern("a", "v", partial("10"))
        .build()
        .unwrap();
    assert_eq!(
        evaluate(&pkb, &bound_lhs),
        strings(&["4 digit", "6 number"])
    );
}

#[test]
fn container_patterns() {
    let pkb = sum_digits();
    let loops = select("w", DesignEntity::While)
        .pattern("w", Arg::name("number"), ExprSpec::Wildcard)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &loops), strings(&["3"]));

    let control = select("v", DesignEntity::Variable)
        .declare("w", DesignEntity::While)
        .pattern("w", "v", ExprSpec::Wildcard)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &control), strings(&["number"]));

    let branches = select("i", DesignEntity::If)
        .pattern("i", "_", ExprSpec::Wildcard)
        .build()
        .unwrap();
    assert!(evaluate(&pkb, &branches).is_empty());
}

#[test]
fn such_that_with_pattern() {
    let pkb = sum_digits();

    let disjoint = select("s", DesignEntity::Stmt)
        .declare("a", DesignEntity::Assign)
        .such_that(RelationKind::FollowsT, 1u32, "s")
        .pattern("a", Arg::name("sum"), ExprSpec::Wildcard)
        .build()
        .unwrap();

    let shared = select("s", DesignEntity::Stmt)
        .declare("a", DesignEntity::Assign)
        .such_that(RelationKind::Parent, "s", "a")
        .pattern("a", Arg::name("digit"), ExprSpec::Wildcard)
        .build()
        .unwrap();

    let followed = select("a", DesignEntity::Assign)
        .declare("a1", DesignEntity::Assign)
        .pattern("a", "_", ExprSpec::Wildcard)
        .pattern("a1", Arg::name("number"), ExprSpec::Wildcard)
        .such_that(RelationKind::FollowsT, "a", "a1")
        .build()
        .unwrap();

    let printed = select("a", DesignEntity::Assign)
        .declare("pr", DesignEntity::Print)
        .declare("v", DesignEntity::Variable)
        .pattern("a", "v", ExprSpec::Wildcard)
        .with(("pr", AttrName::VarName), ("v", AttrName::VarName))
        .build()
        .unwrap();

    let reachable = select("s", DesignEntity::Stmt)
        .declare("a", DesignEntity::Assign)
        .pattern("a", "_", ExprSpec::Full("number % 10".into()))
        .pattern("a", Arg::name("digit"), ExprSpec::Wildcard)
        .such_that(RelationKind::NextT, "a", "s")
        .build()
        .unwrap();

    for config in all_configs() {
        assert_eq!(
            evaluate_with(&pkb, &config, &disjoint),
            strings(&["2", "3", "7"])
        );
        assert_eq!(evaluate_with(&pkb, &config, &shared), strings(&["3"]));
        assert_eq!(evaluate_with(&pkb, &config, &followed), strings(&["4", "5"]));
        assert_eq!(evaluate_with(&pkb, &config, &printed), strings(&["2", "5"]));
        assert_eq!(
            evaluate_with(&pkb, &config, &reachable),
            strings(&["3", "4", "5", "6", "7"])
        );
    }
}

#[test]
fn affects_is_derived_from_control_flow() {
    let pkb = sum_digits();

    let into_sum = select("a", DesignEntity::Assign)
        .such_that(RelationKind::Affects, "a", 5u32)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &into_sum), strings(&["2", "4", "5"]));

    let from_number = select("a", DesignEntity::Assign)
        .such_that(RelationKind::AffectsT, 6u32, "a")
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &from_number), strings(&["4", "5", "6"]));

    let self_affecting = select("a", DesignEntity::Assign)
        .such_that(RelationKind::Affects, "a", "a")
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &self_affecting), strings(&["5", "6"]));

    let read_does_not_affect = QueryBuilder::new()
        .such_that(RelationKind::Affects, 1u32, 4u32)
        .build()
        .unwrap();
    assert_eq!(evaluate(&pkb, &read_does_not_affect), strings(&["FALSE"]));
}

#[test]
fn malformed_pattern_expression_is_rejected() {
    let err = select("a", DesignEntity::Assign)
        .pattern("a", "_", partial("x +"))
        .build()
        .unwrap_err();
    assert_eq!(err.code(), "MalformedExpression");
}
