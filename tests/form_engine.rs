//! Form Engine Tests
//!
//! End-to-end behavior of schemas and forms: requiredness, wildcard
//! expansion, nested forms, extension points and schema documents.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use formgate::path::{lookup, FieldPath};
use formgate::types::{Int, NonEmptyStr, Predicate, Str};
use formgate::{
    ErrorKind, FieldConfig, Form, FormState, FormType, Schema, SchemaDocument, ValidationError,
    ValidationResult,
};
use rstest::rstest;
use serde_json::{json, Value};

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn upper_schema() -> Arc<Schema> {
    let schema = Schema::builder()
        .add(
            FieldConfig::new("n")
                .of_type(NonEmptyStr)
                .hard()
                .adjust(|v| json!(v.as_str().unwrap_or_default().to_uppercase())),
        )
        .unwrap()
        .build();
    Arc::new(schema)
}

fn kinds(errors: &[ValidationError]) -> Vec<ErrorKind> {
    errors.iter().map(|e| e.kind.clone()).collect()
}

/// Every leaf path of a JSON tree, sequences indexed as `*`
fn leaf_paths(value: &Value, prefix: String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let next = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                leaf_paths(child, next, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for item in items {
                leaf_paths(item, format!("{}.*", prefix), out);
            }
        }
        _ => out.push(prefix),
    }
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn test_uppercase_field_accepts_ok() {
    let mut form = Form::new(upper_schema());
    form.bind_input(json!({"n": "ok"}));

    assert_eq!(form.state(), FormState::Succeeded);
    assert_eq!(form.fields(), Some(&json!({"n": "OK"})));
    assert!(form.errors().is_empty());
}

#[rstest]
#[case::empty_string(json!({"n": ""}))]
#[case::absent(json!({}))]
#[case::only_unrelated(json!({"other": 1}))]
fn test_uppercase_field_missing(#[case] input: Value) {
    let mut form = Form::new(upper_schema());
    form.bind_input(input);

    assert_eq!(form.state(), FormState::Failed);
    assert!(form.fields().is_none());
    assert_eq!(form.errors(), &[ValidationError::does_not_exist("n")]);

    let report = serde_json::to_string(form.errors()).unwrap();
    assert!(!report.contains("other"));
}

// =============================================================================
// Exclusivity and rebinding
// =============================================================================

#[rstest]
#[case(json!({"n": "ok"}))]
#[case(json!({"n": ""}))]
#[case(json!({"n": 5}))]
#[case(json!("not a mapping"))]
fn test_fields_and_errors_are_exclusive(#[case] input: Value) {
    let mut form = Form::new(upper_schema());
    form.bind_input(input);

    if form.is_valid() {
        assert!(form.errors().is_empty());
        assert!(form.fields().is_some());
    } else {
        assert!(!form.errors().is_empty());
        assert!(form.fields().is_none());
    }
}

#[rstest]
#[case(json!({"n": "ok"}))]
#[case(json!({"n": null}))]
fn test_rebinding_same_input_is_stable(#[case] input: Value) {
    let mut form = Form::new(upper_schema());

    form.bind_input(input.clone());
    let first = (form.fields().cloned(), form.errors().to_vec());

    form.bind_input(input);
    let second = (form.fields().cloned(), form.errors().to_vec());

    assert_eq!(first, second);
}

#[test]
fn test_rebinding_replaces_previous_result() {
    let mut form = Form::new(upper_schema());
    assert_eq!(form.validate(json!({"n": ""})).map(|e| e.len()), Some(1));
    assert_eq!(form.validate(json!({"n": "ok"})), None);
    assert_eq!(form.fields(), Some(&json!({"n": "OK"})));
}

// =============================================================================
// No unsolicited copy
// =============================================================================

#[test]
fn test_output_holds_only_declared_paths() {
    let schema = Schema::builder()
        .add(FieldConfig::new("a.b"))
        .unwrap()
        .add(FieldConfig::new("list.*.id"))
        .unwrap()
        .add(FieldConfig::new("flat"))
        .unwrap()
        .build();

    let input = json!({
        "a": {"b": 1, "c": 2},
        "list": [{"id": 1, "secret": "x"}, {"id": 2}],
        "flat": "yes",
        "extra": {"deep": true}
    });
    let fields = schema.run(input).fields().cloned().unwrap();
    assert_eq!(
        fields,
        json!({"a": {"b": 1}, "list": [{"id": 1}, {"id": 2}], "flat": "yes"})
    );

    let mut paths = Vec::new();
    leaf_paths(&fields, String::new(), &mut paths);
    let declared = ["a.b", "list.*.id", "flat"];
    assert!(paths.iter().all(|p| declared.contains(&p.as_str())), "{:?}", paths);
}

// =============================================================================
// Requiredness
// =============================================================================

#[test]
fn test_optional_field_omitted() {
    let schema = Schema::builder()
        .add(FieldConfig::new("maybe").of_type(Int))
        .unwrap()
        .build();
    assert_eq!(schema.run(json!({})), ValidationResult::Valid(json!({})));
}

#[rstest]
#[case::zero(json!(0), true)]
#[case::falsy_bool(json!(false), true)]
#[case::empty_list(json!([]), true)]
#[case::empty_string(json!(""), false)]
#[case::null(json!(null), false)]
fn test_hard_requiredness(#[case] value: Value, #[case] accepted: bool) {
    let schema = Schema::builder()
        .add(FieldConfig::new("v").hard())
        .unwrap()
        .build();

    let result = schema.run(json!({"v": value.clone()}));
    if accepted {
        assert_eq!(result, ValidationResult::Valid(json!({"v": value})));
    } else {
        assert_eq!(kinds(result.errors()), vec![ErrorKind::DoesNotExist]);
    }
}

#[test]
fn test_soft_requiredness_accepts_empty_string() {
    let schema = Schema::builder()
        .add(FieldConfig::new("v").soft())
        .unwrap()
        .build();

    assert_eq!(schema.run(json!({"v": ""})), ValidationResult::Valid(json!({"v": ""})));
    assert_eq!(kinds(schema.run(json!({})).errors()), vec![ErrorKind::DoesNotExist]);
}

// =============================================================================
// Wildcards
// =============================================================================

/// `arr.*.k` over `[{k:1}, {j:2}, {k:3}]` keeps `[{k:1}, {k:3}]`, which reads back as `[1, 3]`.
#[test]
fn test_wildcard_drops_elements_without_key() {
    let schema = Schema::builder()
        .add(FieldConfig::new("arr.*.k").of_type(Int))
        .unwrap()
        .build();

    let fields = schema
        .run(json!({"arr": [{"k": 1}, {"j": 2}, {"k": 3}]}))
        .fields()
        .cloned()
        .unwrap();
    assert_eq!(fields, json!({"arr": [{"k": 1}, {"k": 3}]}));

    let path = FieldPath::parse("arr.*.k").unwrap();
    assert_eq!(lookup(&fields, &path), vec![&json!(1), &json!(3)]);
}

#[test]
fn test_wildcard_required_sub_key_reports_each_gap() {
    let schema = Schema::builder()
        .add(FieldConfig::new("arr.*.k").of_type(Int).hard())
        .unwrap()
        .build();

    let errors = schema
        .run(json!({"arr": [{"k": 1}, {"j": 2}, {}]}))
        .into_errors()
        .unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.field.as_deref() == Some("arr.*.k")));
}

#[test]
fn test_wildcard_siblings_stay_aligned() {
    let schema = Schema::builder()
        .add(FieldConfig::new("rows.*.id").of_type(Int))
        .unwrap()
        .add(FieldConfig::new("rows.*.label").of_type(Str))
        .unwrap()
        .build();

    let fields = schema
        .run(json!({"rows": [
            {"id": 1, "label": "one"},
            {"label": "two"},
            {"noise": true},
            {"id": 4}
        ]}))
        .fields()
        .cloned()
        .unwrap();

    assert_eq!(
        fields,
        json!({"rows": [{"id": 1, "label": "one"}, {"label": "two"}, {"id": 4}]})
    );
}

#[test]
fn test_wildcard_over_empty_sequence_keeps_it() {
    let schema = Schema::builder()
        .add(FieldConfig::new("tags.*").of_type(NonEmptyStr))
        .unwrap()
        .build();
    assert_eq!(
        schema.run(json!({"tags": []})),
        ValidationResult::Valid(json!({"tags": []}))
    );
}

#[test]
fn test_wildcard_elements_are_validated_individually() {
    let schema = Schema::builder()
        .add(FieldConfig::new("tags.*").of_type(NonEmptyStr))
        .unwrap()
        .build();

    let errors = schema
        .run(json!({"tags": ["a", 2, "c", ""]}))
        .into_errors()
        .unwrap();
    assert_eq!(kinds(&errors), vec![ErrorKind::DoesNotValidate, ErrorKind::DoesNotValidate]);
}

#[rstest]
#[case::ragged(json!({"m": [[1, 2], "x", [3], []]}), json!({"m": [[1, 2], [3], []]}))]
#[case::all_inner_empty(json!({"m": [[], []]}), json!({"m": [[], []]}))]
#[case::outer_empty(json!({"m": []}), json!({"m": []}))]
fn test_nested_wildcards_compact_each_level(#[case] input: Value, #[case] expected: Value) {
    let schema = Schema::builder()
        .add(FieldConfig::new("m.*.*").of_type(Int))
        .unwrap()
        .build();
    assert_eq!(schema.run(input), ValidationResult::Valid(expected));
}

#[test]
fn test_nested_wildcards_hard_over_scalar_element() {
    let schema = Schema::builder()
        .add(FieldConfig::new("m.*.*").of_type(Int).hard())
        .unwrap()
        .build();

    let errors = schema
        .run(json!({"m": [[1, 2], "x", [3], []]}))
        .into_errors()
        .unwrap();
    assert_eq!(errors, vec![ValidationError::does_not_exist("m.*.*")]);
}

// =============================================================================
// Overlapping fields
// =============================================================================

/// Nested names are integers with coercion, top-level names are untyped
fn overlapping(names: &[&str]) -> Schema {
    names
        .iter()
        .fold(Schema::builder(), |builder, name| {
            let config = if name.contains('.') {
                FieldConfig::new(*name).of_type(Int).coerce_by_type()
            } else {
                FieldConfig::new(*name)
            };
            builder.add(config).unwrap()
        })
        .build()
}

#[rstest]
#[case::ancestor_then_descendant(
    &["a", "a.b"],
    json!({"a": {"b": "5", "c": 2}}),
    json!({"a": {"b": 5, "c": 2}})
)]
#[case::descendant_then_ancestor(
    &["a.b", "a"],
    json!({"a": {"b": "5", "c": 2}}),
    json!({"a": {"b": "5", "c": 2}})
)]
#[case::sequence_then_wildcard(
    &["arr", "arr.*.k"],
    json!({"arr": [{"k": "1", "x": 9}, {"j": 2}]}),
    json!({"arr": [{"k": 1, "x": 9}, {"j": 2}]})
)]
#[case::wildcard_then_sequence(
    &["arr.*.k", "arr"],
    json!({"arr": [{"k": "1", "x": 9}, {"j": 2}]}),
    json!({"arr": [{"k": "1", "x": 9}, {"j": 2}]})
)]
fn test_overlapping_fields_keep_accepted_values(
    #[case] names: &[&str],
    #[case] input: Value,
    #[case] expected: Value,
) {
    assert_eq!(overlapping(names).run(input), ValidationResult::Valid(expected));
}

// =============================================================================
// Nested forms
// =============================================================================

fn nested_schema() -> Schema {
    let inner = Schema::builder()
        .add(FieldConfig::new("x").of_type(Int).hard())
        .unwrap()
        .with_hooks(|h| {
            h.after_validate(|out, errors| {
                if out.get("x").and_then(Value::as_i64) == Some(13) {
                    errors.push(ValidationError::form(ErrorKind::Custom("unlucky".into()), "x is unlucky"));
                }
            })
        })
        .build();

    Schema::builder()
        .add(FieldConfig::new("outer").of_type(FormType::new(Arc::new(inner))).hard())
        .unwrap()
        .build()
}

#[test]
fn test_nested_error_is_rehomed() {
    let errors = nested_schema()
        .run(json!({"outer": {"x": "nope"}}))
        .into_errors()
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field.as_deref(), Some("outer.x"));
    assert_eq!(errors[0].kind, ErrorKind::DoesNotValidate);
}

#[test]
fn test_nested_form_level_error_lands_on_outer_field() {
    let errors = nested_schema()
        .run(json!({"outer": {"x": 13}}))
        .into_errors()
        .unwrap();
    assert_eq!(errors[0].field.as_deref(), Some("outer"));
    assert_eq!(errors[0].message, "x is unlucky");
}

#[test]
fn test_nested_success_replaces_value_with_cleaned_fields() {
    assert_eq!(
        nested_schema().run(json!({"outer": {"x": 1, "junk": 0}})),
        ValidationResult::Valid(json!({"outer": {"x": 1}}))
    );
}

// =============================================================================
// Extension points
// =============================================================================

#[test]
fn test_hook_slots_run_in_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = |name: &'static str| {
        let calls = Arc::clone(&calls);
        move || calls.lock().unwrap().push(name)
    };

    let (reformat, before, mangle, after, cleanup) = (
        log("reformat"),
        log("before_validate"),
        log("before_mangle"),
        log("after_validate"),
        log("cleanup"),
    );

    let schema = Schema::builder()
        .add(FieldConfig::new("a"))
        .unwrap()
        .with_hooks(|h| {
            h.cleanup(move |_, _| cleanup())
                .after_validate(move |_, _| after())
                .before_mangle(move |_, v| {
                    mangle();
                    v
                })
                .before_validate(move |_, _| before())
                .reformat(move |v| {
                    reformat();
                    Ok(v)
                })
        })
        .build();

    assert!(schema.run(json!({"a": 1})).is_valid());
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["reformat", "before_validate", "before_mangle", "after_validate", "cleanup"]
    );
}

#[test]
fn test_reformat_parses_raw_text() {
    let schema = Schema::builder()
        .add(FieldConfig::new("a").hard())
        .unwrap()
        .with_hooks(|h| {
            h.reformat(|raw| match raw {
                Value::String(text) => serde_json::from_str(&text).map_err(|e| e.to_string()),
                other => Ok(other),
            })
        })
        .build();

    assert_eq!(
        schema.run(json!(r#"{"a": 1}"#)),
        ValidationResult::Valid(json!({"a": 1}))
    );
    assert_eq!(
        schema.run(json!("{broken")),
        ValidationResult::Invalid(vec![ValidationError::invalid_format()])
    );
}

#[test]
fn test_after_validate_cross_field_check() {
    let schema = Schema::builder()
        .add(FieldConfig::new("password").of_type(NonEmptyStr).hard())
        .unwrap()
        .add(FieldConfig::new("confirm").of_type(NonEmptyStr).hard())
        .unwrap()
        .with_hooks(|h| {
            h.after_validate(|out, errors| {
                if out.get("password") != out.get("confirm") {
                    errors.add("confirm", "passwords do not match");
                }
            })
        })
        .build();

    let mut form = Form::new(Arc::new(schema));
    form.bind_input(json!({"password": "a", "confirm": "b"}));
    assert_eq!(
        form.errors_by_field().get("confirm"),
        Some(&vec!["passwords do not match".to_string()])
    );
}

#[test]
fn test_predicate_with_custom_message_keeps_cause() {
    let schema = Schema::builder()
        .add(
            FieldConfig::new("even")
                .of_type(Predicate::new("an even number", |v| v.as_i64().is_some_and(|i| i % 2 == 0)))
                .message("pick an even number"),
        )
        .unwrap()
        .build();

    let errors = schema.run(json!({"even": 3})).into_errors().unwrap();
    assert_eq!(errors[0].message, "pick an even number");
    assert!(errors[0].cause.is_some());
}

#[test]
fn test_strict_mode_rejects_extra_keys() {
    let schema = Schema::builder()
        .add(FieldConfig::new("a"))
        .unwrap()
        .strict(true)
        .build();

    assert!(schema.run(json!({"a": 1})).is_valid());
    assert_eq!(
        kinds(schema.run(json!({"a": 1, "b": 2})).errors()),
        vec![ErrorKind::IsntStrict]
    );
}

// =============================================================================
// Schema documents
// =============================================================================

fn signup_form() -> Form {
    let doc = SchemaDocument::load(fixtures_path().join("signup.toml")).unwrap();
    Form::new(Arc::new(doc.to_schema().unwrap()))
}

#[test]
fn test_signup_document_accepts_valid_input() {
    let input: Value = serde_json::from_str(include_str!("fixtures/signup.json")).unwrap();
    let mut form = signup_form();
    form.bind_input(input);

    assert!(form.errors().is_empty(), "{:?}", form.errors());
    assert_eq!(
        form.fields(),
        Some(&json!({
            "user": {"email": "ada@example.org", "age": 36},
            "plan": "free",
            "tags": ["early", "beta"],
            "address": {"city": "Berlin", "zip": "10115"}
        }))
    );
}

#[test]
fn test_signup_document_reports_every_problem() {
    let input: Value = serde_json::from_str(include_str!("fixtures/signup_invalid.json")).unwrap();
    let mut form = signup_form();
    form.bind_input(input);

    let fields: Vec<Option<&str>> = form.errors().iter().map(|e| e.field.as_deref()).collect();
    assert_eq!(
        fields,
        vec![
            None,
            Some("user.email"),
            Some("user.age"),
            Some("plan"),
            Some("address.city"),
            Some("address.zip"),
        ]
    );
    assert_eq!(form.errors()[0].kind, ErrorKind::IsntStrict);
    assert_eq!(form.errors()[1].message, "email address is malformed");
    assert_eq!(form.errors()[4].kind, ErrorKind::DoesNotExist);
}
