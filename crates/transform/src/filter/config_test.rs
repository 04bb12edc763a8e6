//! Tests for filter config

use super::*;
use serde_json::json;

fn function(options: &[(&str, toml::Value)]) -> FunctionInstanceConfig {
    options
        .iter()
        .fold(FunctionInstanceConfig::new("f", "filter"), |c, (k, v)| {
            c.with_option(*k, v.clone())
        })
}

fn event(value: serde_json::Value) -> AnalyticsEvent {
    AnalyticsEvent::try_from(value).unwrap()
}

#[test]
fn test_constructors() {
    let cond = || vec![Condition::new("type", Predicate::Present)];

    let drop = FilterConfig::drop_when(cond());
    assert!(drop.enabled);
    assert_eq!(drop.action, FilterAction::Drop);
    assert_eq!(drop.match_mode, MatchMode::All);

    let keep = FilterConfig::keep_when(cond()).any();
    assert_eq!(keep.action, FilterAction::Keep);
    assert_eq!(keep.match_mode, MatchMode::Any);

    let err = FilterConfig::drop_when(Vec::new()).validate().unwrap_err();
    assert!(err.contains("at least one condition"));
}

#[test]
fn test_equals_is_typed() {
    let number = Condition::new("properties.n", Predicate::Equals(json!(5)));
    assert!(number.matches(&event(json!({"properties": {"n": 5}}))));
    assert!(number.matches(&event(json!({"properties": {"n": 5.0}}))));
    assert!(!number.matches(&event(json!({"properties": {"n": "5"}}))));

    let flag = Condition::new("flag", Predicate::Equals(json!(true)));
    assert!(flag.matches(&event(json!({"flag": true}))));
    assert!(!flag.matches(&event(json!({"flag": "true"}))));

    let ne = Condition::new("type", Predicate::NotEquals(json!("track")));
    assert!(ne.matches(&event(json!({"type": "page"}))));
    assert!(ne.matches(&event(json!({}))));
    assert!(!ne.matches(&event(json!({"type": "track"}))));
}

#[test]
fn test_string_and_numeric_predicates_need_matching_types() {
    let contains = Predicate::Contains("bot".into());
    assert!(contains.test(Some(&json!("Googlebot"))));
    assert!(!contains.test(Some(&json!(42))));
    assert!(!contains.test(None));

    let gte = Predicate::GreaterOrEqual(100.0);
    assert!(gte.test(Some(&json!(100))));
    assert!(gte.test(Some(&json!(150.5))));
    assert!(!gte.test(Some(&json!("150"))));
    assert!(!Predicate::Less(0.0).test(Some(&json!(null))));

    assert!(Predicate::Present.test(Some(&json!(null))));
    assert!(!Predicate::Present.test(None));
}

#[test]
fn test_condition_path() {
    let cond = Condition::new("context.page.path", Predicate::EndsWith("/buy".into()));
    assert_eq!(cond.field(), "context.page.path");
    assert!(cond.matches(&event(json!({"context": {"page": {"path": "/shop/buy"}}}))));
    assert!(!cond.matches(&event(json!({"context": {"page": "/shop/buy"}}))));
}

#[test]
fn test_parse_condition() {
    let eq = Condition::parse("type", None, Some(&"page".into())).unwrap();
    assert!(matches!(eq.predicate, Predicate::Equals(ref v) if v == &json!("page")));

    let gt = Condition::parse("properties.amount", Some("gt"), Some(&toml::Value::Integer(10))).unwrap();
    assert!(matches!(gt.predicate, Predicate::Greater(n) if n == 10.0));

    let re = Condition::parse("userId", Some("regex"), Some(&r"^\d+$".into())).unwrap();
    assert!(matches!(re.predicate, Predicate::Matches(_)));

    let exists = Condition::parse("context.ip", Some("exists"), None).unwrap();
    assert!(matches!(exists.predicate, Predicate::Present));
}

#[test]
fn test_parse_condition_errors() {
    let err = |field, op, value: Option<toml::Value>| {
        Condition::parse(field, op, value.as_ref()).unwrap_err()
    };

    assert!(err("", None, Some("x".into())).contains("invalid field path"));
    assert!(err("a..b", None, Some("x".into())).contains("invalid field path"));
    assert!(err("type", Some("like"), Some("x".into())).contains("unknown operator"));
    assert!(err("type", Some("regex"), None).contains("requires a value"));
    assert!(err("type", Some("regex"), Some("[broken".into())).contains("invalid regex"));
    assert!(err("n", Some("gt"), Some("10".into())).contains("numeric value"));
    assert!(err("s", Some("contains"), Some(toml::Value::Integer(1))).contains("string value"));
    assert!(err("s", Some("eq"), Some(toml::Value::Array(vec![]))).contains("string, number or boolean"));
}

#[test]
fn test_from_function_config_single_condition() {
    let config = FilterConfig::try_from(&function(&[
        ("action", "keep".into()),
        ("match", "any".into()),
        ("field", "properties.amount".into()),
        ("operator", "gte".into()),
        ("value", 100i64.into()),
    ]))
    .unwrap();

    assert_eq!(config.action, FilterAction::Keep);
    assert_eq!(config.match_mode, MatchMode::Any);
    assert_eq!(config.conditions.len(), 1);
    assert!(matches!(config.conditions[0].predicate, Predicate::GreaterOrEqual(n) if n == 100.0));
}

#[test]
fn test_from_function_config_condition_array() {
    let toml = r#"
id = "f"
type = "filter"
match = "any"

[[conditions]]
field = "type"
value = "identify"

[[conditions]]
field = "context.ip"
operator = "exists"
"#;
    let instance: FunctionInstanceConfig = toml::from_str(toml).unwrap();
    let config = FilterConfig::try_from(&instance).unwrap();

    assert_eq!(config.conditions.len(), 2);
    assert!(matches!(config.conditions[0].predicate, Predicate::Equals(_)));
    assert!(matches!(config.conditions[1].predicate, Predicate::Present));
    assert!(config.matches(&event(json!({"type": "page", "context": {"ip": "1.2.3.4"}}))));
}

#[test]
fn test_from_function_config_disabled() {
    let mut instance = function(&[("field", "type".into()), ("value", "page".into())]);
    instance.enabled = false;
    assert!(!FilterConfig::try_from(&instance).unwrap().enabled);
}

#[test]
fn test_from_function_config_errors() {
    let err = FilterConfig::try_from(&function(&[("action", "explode".into())])).unwrap_err();
    assert!(err.contains("unknown action"));

    let err = FilterConfig::try_from(&function(&[
        ("field", "type".into()),
        ("value", "page".into()),
        ("match", "some".into()),
    ]))
    .unwrap_err();
    assert!(err.contains("unknown match mode"));

    let err = FilterConfig::try_from(&function(&[
        ("field", "type".into()),
        ("operator", "like".into()),
    ]))
    .unwrap_err();
    assert!(err.contains("unknown operator"));

    let err = FilterConfig::try_from(&function(&[])).unwrap_err();
    assert!(err.contains("at least one condition"));
}
