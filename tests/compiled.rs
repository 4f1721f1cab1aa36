use dilemma::{compile, create_optimized_evaluator, evaluate, Context, DilemmaError, Value};

fn ctx() -> Context {
    Context::from_json(
        r#"{
            "user": {"age": 34, "roles": ["admin", "dev"]},
            "items": [{"price": 5}, {"price": 12}],
            "threshold": 30
        }"#,
    )
    .unwrap()
}

const EXPRESSIONS: &[&str] = &[
    "user.age > threshold",
    "user.age + 6 == 40",
    "'admin' in user.roles",
    "/items/1/price - /items/0/price == 7",
    "user.age > threshold and 'dev' in user.roles",
];

#[test]
fn compiled_agrees_with_direct_evaluation() {
    for text in EXPRESSIONS {
        let compiled = compile(text).unwrap();
        assert_eq!(
            compiled.evaluate(&ctx()).unwrap(),
            evaluate(text, &ctx()).unwrap(),
            "diverged on {text}"
        );
    }
}

#[test]
fn optimized_agrees_with_direct_evaluation() {
    for text in EXPRESSIONS {
        let optimized = create_optimized_evaluator(text, Some(&ctx())).unwrap();
        assert_eq!(
            optimized.evaluate(&ctx()).unwrap(),
            evaluate(text, &ctx()).unwrap(),
            "diverged on {text}"
        );
    }
}

#[test]
fn compiled_expression_is_reusable_across_contexts() {
    let compiled = compile("score > 10").unwrap();
    let high = Context::new().set("score", 50i64);
    let low = Context::new().set("score", 3i64);
    assert_eq!(compiled.evaluate(&high).unwrap(), Value::Bool(true));
    assert_eq!(compiled.evaluate(&low).unwrap(), Value::Bool(false));
}

#[test]
fn variable_paths_cover_every_dialect() {
    let compiled = compile("user.age > threshold and /items/0/price < 10").unwrap();
    let paths: Vec<_> = compiled.variable_paths().into_iter().collect();
    assert_eq!(paths, vec!["/items/0/price", "threshold", "user.age"]);
}

#[test]
fn optimizer_without_sample_is_plain_compilation() {
    let a = create_optimized_evaluator("user.age == 34", None).unwrap();
    let b = compile("user.age == 34").unwrap();
    assert_eq!(a.evaluate(&ctx()).unwrap(), b.evaluate(&ctx()).unwrap());
}

#[test]
fn optimizer_tolerates_shape_drift() {
    let optimized = create_optimized_evaluator("user.age", Some(&ctx())).unwrap();

    // Shape change under a compiled getter: list instead of object.
    let drifted = Context::from_json(r#"{"user": [1, 2]}"#).unwrap();
    let err = optimized.evaluate(&drifted).unwrap_err();
    assert!(matches!(err, DilemmaError::Variable { .. }));

    // And an unrelated context still resolves.
    let alt = Context::from_json(r#"{"user": {"age": 1}}"#).unwrap();
    assert_eq!(optimized.evaluate(&alt).unwrap(), Value::Int(1));
}

#[test]
fn compiled_syntax_errors_match_evaluate() {
    let from_compile = compile("1 +").unwrap_err();
    let from_evaluate = evaluate("1 +", &Context::new()).unwrap_err();
    assert_eq!(from_compile.to_string(), from_evaluate.to_string());
}

#[test]
fn evaluation_errors_name_the_source_expression() {
    let compiled = compile("missing / 0").unwrap();
    let err = compiled.evaluate(&Context::new()).unwrap_err();
    assert!(matches!(err, DilemmaError::Variable { .. }));
}
