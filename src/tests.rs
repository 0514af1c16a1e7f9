use pretty_assertions::assert_eq;

use crate::action::{Action, Valuable};
use crate::codec::{documents_from_yamls, documents_to_yamls};
use crate::condition::{Condition, Logic, Operator};
use crate::config::RuleConfig;
use crate::context::Context;
use crate::error::{AccessError, ConfigError, PathError};
use crate::matcher::Matcher;
use crate::path::{IndexMode, KeyPath, Segment};
use crate::tree::*;
use crate::*;

// ── Shared fixture runners ──────────────────────────────────────────

/// Embed fixture files at compile time.
const KEY_FIXTURES: &str = include_str!("../test-data/fixtures/keys.json");
const CONDITION_FIXTURES: &str = include_str!("../test-data/fixtures/conditions.json");
const ACTION_FIXTURES: &str = include_str!("../test-data/fixtures/actions.json");
const PARSE_ERROR_FIXTURES: &str = include_str!("../test-data/fixtures/parse-errors.json");

const SERVICE: &str = include_str!("../test-data/fixtures/service.yaml");
const SERVICE_RULES: &str = include_str!("../test-data/fixtures/service.rules");
const SERVICE_LEGACY_RULES: &str = include_str!("../test-data/fixtures/service-legacy.rules");
const SERVICE_EXPECTED: &str = include_str!("../test-data/fixtures/service.expected.yaml");
const DEVOPS_SERVICE: &str = include_str!("../test-data/fixtures/service-devops.yaml");
const DEVOPS_RULES: &str = include_str!("../test-data/fixtures/service-devops.rules");
const DEVOPS_EXPECTED: &str = include_str!("../test-data/fixtures/service-devops.expected.yaml");
const RULE_CONFIG: &str = include_str!("../test-data/fixtures/rules.conf");

fn yaml(input: &str) -> Document {
    Document::from_yaml(input).unwrap()
}

fn key(k: &str) -> KeyPath {
    KeyPath::parse(k).unwrap()
}

fn value_of(k: &str, operator: Operator, value: &str) -> Condition {
    Condition::ValueOf {
        key: key(k),
        operator,
        value: value.to_string(),
    }
}

fn keys_of(mapping: &Mapping) -> Vec<&str> {
    mapping.keys().map(String::as_str).collect()
}

#[test]
fn test_fixture_keys() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(KEY_FIXTURES).unwrap();

    for fixture in &fixtures {
        let k = fixture["key"].as_str().unwrap();
        let valid = fixture["valid"].as_bool().unwrap();
        assert_eq!(is_valid_key(k), valid, "Fixture key '{}'", k);
    }
}

#[test]
fn test_fixture_conditions() {
    let fixtures: serde_json::Value = serde_json::from_str(CONDITION_FIXTURES).unwrap();
    let document = yaml(fixtures["document"].as_str().unwrap());

    for case in fixtures["cases"].as_array().unwrap() {
        let text = case["condition"].as_str().unwrap();
        let condition = parse_condition(text)
            .unwrap_or_else(|e| panic!("Fixture '{}': parse failed: {}", text, e));
        let result = condition.evaluate(&document);
        match &case["expected"] {
            serde_json::Value::Bool(expected) => assert_eq!(
                result.as_ref().ok(),
                Some(expected),
                "Fixture '{}': got {:?}",
                text,
                result
            ),
            _ => assert!(result.is_err(), "Fixture '{}': expected an error, got {:?}", text, result),
        }
    }
}

#[test]
fn test_fixture_actions() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(ACTION_FIXTURES).unwrap();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let script = fixture["script"].as_str().unwrap();
        let actions = parse_script(script)
            .unwrap_or_else(|e| panic!("Fixture '{}': parse failed: {}", name, e));

        let applied = apply_to_document(yaml(fixture["input"].as_str().unwrap()), &actions);
        let expected = yaml(fixture["expected"].as_str().unwrap());
        assert_eq!(
            applied.value.root(),
            expected.root(),
            "Fixture '{}': document mismatch",
            name
        );

        let failures = fixture["failures"].as_u64().unwrap() as usize;
        assert_eq!(
            applied.failures.len(),
            failures,
            "Fixture '{}': failures {:?}",
            name,
            applied.failures
        );
    }
}

#[test]
fn test_fixture_parse_errors() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(PARSE_ERROR_FIXTURES).unwrap();

    for fixture in &fixtures {
        let input = fixture["input"].as_str().unwrap();
        assert!(
            parse_script(input).is_err(),
            "Fixture '{}': expected a parse error",
            input
        );
    }
}

// ── End to end ──────────────────────────────────────────────────────

#[test]
fn test_service_cleanup() {
    let cases = [
        (SERVICE, SERVICE_RULES, SERVICE_EXPECTED),
        (SERVICE, SERVICE_LEGACY_RULES, SERVICE_EXPECTED),
        (DEVOPS_SERVICE, DEVOPS_RULES, DEVOPS_EXPECTED),
    ];
    for (input, rules, expected) in cases {
        let actions = parse_script(rules).unwrap();
        assert_eq!(actions.len(), 9);

        let applied = apply_to_document(yaml(input), &actions);
        assert!(applied.failures.is_empty(), "{:?}", applied.failures);

        let expected = yaml(expected);
        assert_eq!(applied.value.root(), expected.root());

        let root = applied.value.root();
        assert_eq!(keys_of(root), vec!["apiVersion", "kind", "metadata", "spec"]);
        let metadata = root["metadata"].as_mapping().unwrap();
        assert_eq!(keys_of(metadata), vec!["annotations", "labels", "name", "namespace"]);
    }
}

#[test]
fn test_service_exec_yaml() {
    let applied = exec_yaml(Context::new(), SERVICE, SERVICE_RULES).unwrap();
    let reparsed = yaml(&applied.value);
    assert_eq!(reparsed.root(), yaml(SERVICE_EXPECTED).root());
    assert!(applied.value.contains("annotations: {}"));
    assert!(!applied.value.contains("status"));
}

#[test]
fn test_devops_service_exec_yaml() {
    let applied = exec_yaml(Context::new(), DEVOPS_SERVICE, DEVOPS_RULES).unwrap();
    assert!(applied.failures.is_empty(), "{:?}", applied.failures);
    let output = yaml(&applied.value);
    assert_eq!(output.root(), yaml(DEVOPS_EXPECTED).root());
    assert_eq!(
        output.get_string("metadata.name").unwrap(),
        "user-auth-core-service"
    );
    assert_eq!(output.get_int("spec.ports[0].port").unwrap(), 80);
}

#[test]
fn test_exec_json() {
    let applied = exec_json(
        Context::new(),
        r#"{"kind":"Pod","status":{"phase":"Running"}}"#,
        "DELETE(status)",
    )
    .unwrap();
    assert_eq!(applied.value, r#"{"kind":"Pod"}"#);
}

#[test]
fn test_exec_reports_parse_errors() {
    let err = exec_yaml(Context::new(), "a: 1\n", "DELETE(a)\nFROB(a)").unwrap_err();
    assert!(matches!(err, error::Error::Parse(ref e) if e.line == Some(2)), "{:?}", err);
}

// ── Path grammar ────────────────────────────────────────────────────

#[test]
fn test_parse_next_segment() {
    let (segment, rest) = parse_next_segment("(a.b.c)[1].b.c").unwrap();
    assert_eq!(
        segment,
        Segment {
            name: "a.b.c".to_string(),
            index: Some(IndexMode::Normal(1)),
        }
    );
    assert_eq!(rest, "b.c");

    let (segment, rest) = parse_next_segment("c[++].key4[0].trouble.size").unwrap();
    assert_eq!(segment.name, "c");
    assert_eq!(segment.index, Some(IndexMode::Append));
    assert_eq!(rest, "key4[0].trouble.size");

    let (segment, rest) = parse_next_segment("a.b").unwrap();
    assert_eq!(segment, Segment { name: "a".to_string(), index: None });
    assert_eq!(rest, "b");

    let (segment, rest) = parse_next_segment("env[name=A=B]").unwrap();
    assert_eq!(
        segment.index,
        Some(IndexMode::Search {
            key: "name".to_string(),
            value: "A=B".to_string(),
        })
    );
    assert_eq!(rest, "");

    let (segment, _) = parse_next_segment("items[*]").unwrap();
    assert_eq!(segment.index, Some(IndexMode::Loop));
    let (segment, _) = parse_next_segment("items[+]").unwrap();
    assert_eq!(segment.index, Some(IndexMode::Last));
}

#[test]
fn test_parse_next_segment_errors() {
    assert!(matches!(
        parse_next_segment("a[x]"),
        Err(PathError::InvalidIndex { .. })
    ));
    assert!(matches!(
        parse_next_segment("[a]"),
        Err(PathError::InvalidName { .. })
    ));
    assert!(matches!(
        parse_next_segment("a[1]."),
        Err(PathError::Malformed { .. })
    ));
}

#[test]
fn test_key_parsing_is_deterministic() {
    let first = KeyPath::parse("spec.template.spec.containers[name=app].env[++].name").unwrap();
    let second = KeyPath::parse("spec.template.spec.containers[name=app].env[++].name").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.segments().len(), 6);
    assert_eq!(first.to_string(), "spec.template.spec.containers[name=app].env[++].name");
}

// ── Documents ───────────────────────────────────────────────────────

#[test]
fn test_set_then_get() {
    let mut doc = Document::new();
    doc.set("spec.template.metadata.labels.(app.kubernetes.io/name)", "web")
        .unwrap();
    doc.set("spec.ports[0].port", 80i64).unwrap();
    doc.set("spec.ports[++].port", 443i64).unwrap();

    assert_eq!(
        doc.get_string("spec.template.metadata.labels.(app.kubernetes.io/name)")
            .unwrap(),
        "web"
    );
    assert_eq!(doc.get_int("spec.ports[0].port").unwrap(), 80);
    assert_eq!(doc.get_int("spec.ports[+].port").unwrap(), 443);
    assert_eq!(doc.get_int("spec.ports[port=443].port").unwrap(), 443);
    assert!(doc.exists("spec.ports[1]"));
    assert!(!doc.exists("spec.ports[2]"));
    assert!(!doc.exists("spec.missing.deeper"));
}

#[test]
fn test_get_edge_cases() {
    let doc = yaml("items: [1, 2]\nempty: []\nscalar: x\n");

    assert_eq!(doc.get("missing.key").unwrap(), None);
    assert_eq!(doc.get("empty[+]").unwrap(), None);
    assert!(matches!(
        doc.get("items[5]"),
        Err(PathError::OutOfRange { index: 5, len: 2, .. })
    ));
    assert!(matches!(
        doc.get("scalar[0]"),
        Err(PathError::NotASequence { .. })
    ));
    assert!(matches!(
        doc.get("items[++]"),
        Err(PathError::UnsupportedIndex { .. })
    ));
    assert!(matches!(
        doc.get("scalar.deeper"),
        Err(PathError::NotAMapping { .. })
    ));

    let all = doc.get("items[*]").unwrap().unwrap();
    assert_eq!(*all, Node::Sequence(vec![Node::Int(1), Node::Int(2)]));
}

#[test]
fn test_get_fans_out_under_loop() {
    let doc = yaml(
        "containers:\n- name: a\n  image: x\n- name: b\n- name: c\n  image: z\n",
    );
    let images = doc.get("containers[*].image").unwrap().unwrap();
    assert_eq!(*images, Node::from(vec![Node::from("x"), Node::from("z")]));
}

#[test]
fn test_fan_out_set_and_delete() {
    let mut doc = yaml(
        "containers:\n- {name: a, image: x}\n- {name: b, image: y}\n- {name: a, image: z}\n",
    );
    doc.set("containers[name=a].imagePullPolicy", "Always").unwrap();
    let objects = doc.get_objects("containers").unwrap();
    assert_eq!(objects[0]["imagePullPolicy"], Node::from("Always"));
    assert!(objects[1].get("imagePullPolicy").is_none());
    assert_eq!(objects[2]["imagePullPolicy"], Node::from("Always"));

    doc.delete("containers[*].image").unwrap();
    assert!(doc
        .get_objects("containers")
        .unwrap()
        .iter()
        .all(|c| !c.contains_key("image")));
}

#[test]
fn test_delete_preserves_order_and_is_idempotent() {
    let mut doc = yaml("b: 1\na: 2\nc: 3\n");
    doc.delete("a").unwrap();
    let once = doc.clone();
    doc.delete("a").unwrap();
    assert_eq!(doc, once);
    assert_eq!(keys_of(doc.root()), vec!["b", "c"]);
    assert_eq!(doc.to_yaml().unwrap(), "b: 1\nc: 3\n");
}

#[test]
fn test_typed_getters() {
    let doc = yaml(
        "i: 3\nf: 2.5\nwhole: 4.0\ns: text\nb: true\nm: {k: v}\nl: [{x: 1}, {x: 2}]\nmixed: [1, {x: 2}]\n",
    );

    assert_eq!(doc.get_int("i").unwrap(), 3);
    assert_eq!(doc.get_int("whole").unwrap(), 4);
    assert_eq!(doc.get_float("i").unwrap(), 3.0);
    assert_eq!(doc.get_float("f").unwrap(), 2.5);
    assert_eq!(doc.get_string("s").unwrap(), "text");
    assert!(doc.get_bool("b").unwrap());
    assert_eq!(doc.get_object("m").unwrap().unwrap()["k"], Node::from("v"));
    assert_eq!(doc.get_object("missing").unwrap(), None);
    assert_eq!(doc.get_array("l").unwrap().unwrap().len(), 2);
    assert_eq!(doc.get_array("missing").unwrap(), None);
    assert_eq!(doc.get_objects("l").unwrap().len(), 2);
    assert!(doc.get_objects("missing").unwrap().is_empty());

    assert_eq!(
        doc.get_string("i"),
        Err(AccessError::TypeMismatch {
            key: "i".to_string(),
            expected: "string",
            found: "int",
        })
    );
    assert!(doc.get_int("f").is_err());
    assert!(doc.get_int("missing").is_err());
    assert!(doc.get_object("s").is_err());
    assert!(doc.get_objects("mixed").is_err());
}

#[test]
fn test_metadata_is_not_serialized() {
    let mut doc = yaml("kind: Pod\n");
    doc.mark_removed(true);
    doc.metadata_mut().set("source", "cluster-a");

    assert!(doc.removed());
    assert_eq!(doc.metadata().get("source"), Some("cluster-a"));
    assert_eq!(doc.to_yaml().unwrap(), "kind: Pod\n");
    assert_eq!(doc.to_json().unwrap(), r#"{"kind":"Pod"}"#);
}

#[test]
fn test_multi_document_codec() {
    let input = "kind: A\n---\nkind: B\nmetadata: {}\n";
    let docs = documents_from_yamls(input).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].get_string("kind").unwrap(), "B");

    let output = documents_to_yamls(&docs).unwrap();
    assert_eq!(output, "kind: A\n---\nkind: B\nmetadata: {}\n");
    assert_eq!(documents_from_yamls(&output).unwrap(), docs);
}

#[test]
fn test_scalar_keys_become_strings() {
    let doc = yaml("1: a\ntrue: x\nname: y\n");
    assert_eq!(keys_of(doc.root()), vec!["1", "true", "name"]);
    assert_eq!(doc.get_string("1").unwrap(), "a");

    let encoded = doc.to_yaml().unwrap();
    assert_eq!(encoded, "'1': a\n'true': x\nname: y\n");
    assert_eq!(yaml(&encoded), doc);
}

#[test]
fn test_top_level_must_be_a_mapping() {
    assert!(Document::from_yaml("- a\n- b\n").is_err());
    assert!(Document::from_json("[1]").is_err());
    assert!(Document::from_yaml("").unwrap().is_empty());
}

// ── Script parsing ──────────────────────────────────────────────────

#[test]
fn test_parse_condition_structure() {
    assert_eq!(
        parse_condition("(VALUE_OF(x.y.z)==3 && VALUE_OF(a.b.c)>=18)").unwrap(),
        Condition::combine(
            value_of("x.y.z", Operator::Eq, "3"),
            Logic::And,
            value_of("a.b.c", Operator::Ge, "18"),
        )
    );

    let nested = Condition::combine(
        value_of("x.y.z", Operator::Eq, "3"),
        Logic::And,
        Condition::combine(
            value_of("a.b.c", Operator::Ge, "18"),
            Logic::Or,
            value_of("a.b.c[0]", Operator::Eq, "shit"),
        ),
    );
    assert_eq!(
        parse_condition("((((VALUE_OF(x.y.z)==3)) && (VALUE_OF(a.b.c)>=18 || VALUE_OF(a.b.c[0]) == shit )))")
            .unwrap(),
        nested
    );

    assert_eq!(
        parse_condition(
            "((((VALUE_OF(x.y.z)==3)) && (VALUE_OF(a.b.c)>=18 || VALUE_OF(a.b.c[0]) == shit ))) || (VALUE_OF(z)<1.2 && (VALUE_OF(xxx) <= shit))"
        )
        .unwrap(),
        Condition::combine(
            nested,
            Logic::Or,
            Condition::combine(
                value_of("z", Operator::Lt, "1.2"),
                Logic::And,
                value_of("xxx", Operator::Le, "shit"),
            ),
        )
    );

    assert!(parse_condition(
        "((((VALUE_OF(x.y.z)==3)) && (VALUE_OF(a.b.c)>=18 || VALUE_OF(a.b.c[0]) == shit ) )))"
    )
    .is_err());
    assert!(parse_condition(r#"(VALUE_OF(a.b.c))=="shit""#).is_err());
}

#[test]
fn test_parse_condition_folds_left() {
    assert_eq!(
        parse_condition("VALUE_OF(a)==1||VALUE_OF(b)==2&&VALUE_OF(c)==3").unwrap(),
        Condition::combine(
            Condition::combine(
                value_of("a", Operator::Eq, "1"),
                Logic::Or,
                value_of("b", Operator::Eq, "2"),
            ),
            Logic::And,
            value_of("c", Operator::Eq, "3"),
        )
    );
}

#[test]
fn test_parse_single_word_conditions() {
    assert_eq!(parse_condition("EXISTS( a.b.c )").unwrap(), Condition::Exists(key("a.b.c")));
    assert_eq!(
        parse_condition("NOT_EXISTS(a.b.c)").unwrap(),
        Condition::Not(Box::new(Condition::Exists(key("a.b.c"))))
    );
    assert_eq!(
        parse_condition(r#"HAS_SUFFIX(metadata.name, "-svc")"#).unwrap(),
        Condition::HasSuffix {
            key: key("metadata.name"),
            suffix: "-svc".to_string(),
        }
    );
    assert_eq!(
        parse_condition("LENGTH_OF(spec.ports) > 1").unwrap(),
        Condition::LengthOf {
            key: key("spec.ports"),
            operator: Operator::Gt,
            length: 1,
        }
    );
    assert_eq!(
        parse_condition(r#"VALUE_OF(a.b.c)=="shit""#).unwrap(),
        value_of("a.b.c", Operator::Eq, "shit")
    );
}

#[test]
fn test_parse_actions() {
    assert_eq!(parse_action("     DELETE(a.b.c)").unwrap(), Action::Delete(key("a.b.c")));
    assert_eq!(
        parse_action("SET(a.b.c,   z.yz)").unwrap(),
        Action::Set {
            key: key("a.b.c"),
            value: Valuable::Literal(Node::from("z.yz")),
        }
    );
    for line in [
        r#"SET(a.b.c, VALUE_OF("z.yz"))"#,
        "SET(a.b.c, VALUE_OF(  z.yz))",
        "SET(a.b.c, VALUE_OF(z.yz))",
    ] {
        assert_eq!(
            parse_action(line).unwrap(),
            Action::Set {
                key: key("a.b.c"),
                value: Valuable::ValueOf(key("z.yz")),
            },
            "{}",
            line
        );
    }
    assert_eq!(
        parse_action("IF   VALUE_OF(a.b.c)==true     THEN     DELETE(a.b.c)").unwrap(),
        Action::Conditional {
            condition: value_of("a.b.c", Operator::Eq, "true"),
            action: Box::new(Action::Delete(key("a.b.c"))),
        }
    );
    assert_eq!(parse_action("REMOVE()").unwrap(), Action::MarkRemoved);
    assert_eq!(
        parse_action(r#"REPLACE_PART(spec.image, "a, b", ";")"#).unwrap(),
        Action::ReplacePart {
            key: key("spec.image"),
            old: "a, b".to_string(),
            new: ";".to_string(),
        }
    );
}

#[test]
fn test_parse_literals() {
    let literal = |line: &str| match parse_action(line).unwrap() {
        Action::Set {
            value: Valuable::Literal(node),
            ..
        } => node,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(literal("SET(a, 1)"), Node::Int(1));
    assert!(matches!(literal("SET(a, 1.0)"), Node::Float(f) if f == 1.0));
    assert_eq!(literal(r#"SET(a, "1.0")"#), Node::from("1.0"));
    assert_eq!(literal("SET(a, true)"), Node::from("true"));
    assert_eq!(literal("SET(a, inf)"), Node::from("inf"));
}

#[test]
fn test_script_lines() {
    let script = "\n# comment\n   \nDELETE(a)\n  # indented comment\nIF EXISTS(b) THEN DELETE(b)\n";
    let actions = parse_script(script).unwrap();
    assert_eq!(actions.len(), 2);

    let err = parse_script("DELETE(a)\n\nFROB(b)").unwrap_err();
    assert_eq!(err.line, Some(3));
    assert_eq!(err.code, "rule-unknown-method");
    assert_eq!(err.source_line.as_deref(), Some("FROB(b)"));
}

#[test]
fn test_display_round_trips() {
    for line in [
        r#"IF (VALUE_OF(kind) == "Service") && (EXISTS(spec.clusterIP)) THEN DELETE(spec.clusterIP)"#,
        r#"IF NOT_EXISTS(a) THEN SET(a, VALUE_OF(b))"#,
        r#"TRIM_PREFIX(metadata.name, "dev-")"#,
        r#"REPLACE_PART(spec.image, "a", "b")"#,
    ] {
        let action = parse_action(line).unwrap();
        assert_eq!(action.to_string(), line);
        assert_eq!(parse_action(&action.to_string()).unwrap(), action);
    }
}

// ── Execution ───────────────────────────────────────────────────────

#[test]
fn test_batch_drops_removed_documents() {
    let docs = documents_from_yamls("kind: Secret\n---\nkind: ConfigMap\n---\nkind: Secret\n").unwrap();
    let actions = parse_script(r#"IF VALUE_OF(kind)=="Secret" THEN REMOVE()"#).unwrap();

    let applied = apply_to_documents(docs, &actions);
    assert_eq!(applied.value.len(), 1);
    assert_eq!(applied.value[0].get_string("kind").unwrap(), "ConfigMap");

    let all_removed = exec_yamls(Context::new(), "kind: A\n---\nkind: B\n", "REMOVE()").unwrap();
    assert_eq!(all_removed.value, "");
}

#[test]
fn test_failure_records() {
    let doc = yaml("metadata: {name: web, namespace: prod}\nspec: {replicas: 1}\n");
    let actions = parse_script("SET(spec.replicas[0], 2)\nDELETE(spec)").unwrap();
    let context = Context::with_log_keys(["metadata.name", "metadata.labels.app", "spec[0]"]);

    let applied = apply_to_document_with(context, doc, &actions);
    assert!(!applied.value.exists("spec"));
    assert_eq!(applied.failures.len(), 1);

    let failure = &applied.failures[0];
    assert_eq!(failure.action, actions[0]);
    assert_eq!(failure.field("metadata.name"), Some(&Node::from("web")));
    assert_eq!(failure.field("metadata.labels.app"), Some(&Node::Null));
    // Projection errors are logged, not recorded.
    assert_eq!(failure.field("spec[0]"), None);
    assert_eq!(failure.error.code(), "path-not-a-sequence");
}

#[test]
fn test_print_records() {
    let docs = documents_from_yamls("metadata: {name: a}\n---\nmetadata: {name: b}\n").unwrap();
    let actions = parse_script("PRINT(metadata.name)\nPRINT(spec)").unwrap();
    let applied = apply_to_documents_with(Context::with_log_keys(["metadata.name"]), docs, &actions);

    let printed: Vec<String> = applied.printed.iter().map(|p| p.to_string()).collect();
    assert_eq!(
        printed,
        vec![
            r#"metadata.name = "a""#,
            "spec = null",
            r#"metadata.name = "b""#,
            "spec = null",
        ]
    );
    assert_eq!(applied.printed[2].fields["metadata.name"], Node::from("b"));
    assert!(applied.failures.is_empty());
}

#[test]
fn test_combination_evaluates_both_sides() {
    let doc = yaml("a: 1\ns: x\n");
    for text in [
        "VALUE_OF(a)==2 && VALUE_OF(s) > 1",
        "VALUE_OF(a)==1 || VALUE_OF(s) > 1",
        "VALUE_OF(s) > 1 || VALUE_OF(a)==1",
    ] {
        let condition = parse_condition(text).unwrap();
        assert!(condition.evaluate(&doc).is_err(), "{}", text);
    }

    // A failing guard skips the action and is recorded once.
    let actions = parse_script("IF VALUE_OF(a)==2 && VALUE_OF(s) > 1 THEN DELETE(a)").unwrap();
    let applied = apply_to_document(doc, &actions);
    assert!(applied.value.exists("a"));
    assert_eq!(applied.failures.len(), 1);
    assert_eq!(applied.failures[0].error.code(), "eval-unsupported-operator");
}

#[test]
fn test_unmatched_set_leaves_no_containers() {
    let input = "kind: ConfigMap\ndata: {a: b}\n";
    let actions = parse_script(
        "SET(spec.ports[port=8080].port, 80)\n\
         SET(spec.items[*].x, 1)\n\
         SET(spec.items[+], 1)\n\
         SET(data.list[name=x].containers[*].image, y)",
    )
    .unwrap();

    let applied = apply_to_document(yaml(input), &actions);
    assert!(applied.failures.is_empty(), "{:?}", applied.failures);
    assert_eq!(applied.value, yaml(input));
    assert_eq!(applied.value.to_yaml().unwrap(), "kind: ConfigMap\ndata:\n  a: b\n");
}

#[test]
fn test_fan_out_set_skips_unmatched_elements() {
    let mut doc = yaml(
        "containers:\n- name: a\n  ports: [{name: http, port: 80}]\n- name: b\n- name: c\n  ports: []\n",
    );
    doc.set("containers[*].ports[name=http].port", 8080i64).unwrap();

    let containers = doc.get_objects("containers").unwrap();
    assert_eq!(doc.get_int("containers[0].ports[0].port").unwrap(), 8080);
    assert!(!containers[1].contains_key("ports"));
    assert_eq!(containers[2]["ports"], Node::Sequence(vec![]));
}

#[test]
fn test_delete_past_the_end_is_a_no_op() {
    let input = "containers:\n- {name: a, image: x}\n";
    let actions = parse_script("DELETE(containers[5].image)\nDELETE(containers[5])").unwrap();
    let applied = apply_to_document(yaml(input), &actions);
    assert!(applied.failures.is_empty(), "{:?}", applied.failures);
    assert_eq!(applied.value, yaml(input));
}

// ── Rule configuration ──────────────────────────────────────────────

#[test]
fn test_rule_config() {
    let config = RuleConfig::parse(RULE_CONFIG).unwrap();
    assert_eq!(config.kubeconfig.as_deref(), Some("${HOME}/.kube/config"));
    assert_eq!(config.actions.len(), 2);
    assert_eq!(
        config.resources.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["service", "deployment"]
    );

    let docs = documents_from_yamls(
        "kind: Service\nmetadata: {namespace: java-dev, name: web}\n\
         ---\nkind: Service\nmetadata: {namespace: prod, name: web}\n\
         ---\nkind: Deployment\nmetadata: {namespace: prod, name: redis}\n\
         ---\nkind: Deployment\nmetadata: {namespace: prod, name: web}\n\
         ---\nkind: ConfigMap\nmetadata: {namespace: java-dev, name: web}\n",
    )
    .unwrap();
    let selected = config.select(docs);
    let names: Vec<String> = selected
        .iter()
        .map(|d| {
            format!(
                "{}/{}",
                d.get_string("kind").unwrap(),
                d.get_string("metadata.namespace").unwrap()
            )
        })
        .collect();
    assert_eq!(names, vec!["Service/java-dev", "Deployment/prod"]);
}

#[test]
fn test_rule_config_errors() {
    assert!(matches!(
        RuleConfig::parse("[bad type]\n*/*\n"),
        Err(ConfigError::ResourceType(_))
    ));
    assert!(matches!(
        RuleConfig::parse("[service]\njava-dev\n"),
        Err(ConfigError::Selector { .. })
    ));
    assert!(matches!(
        RuleConfig::parse("[__kubeconfig__]\n/tmp/kube config\n"),
        Err(ConfigError::KubeconfigPath(_))
    ));
    assert!(matches!(
        RuleConfig::parse("[__scripts__]\nFROB(a)\n"),
        Err(ConfigError::Script(_))
    ));
    assert!(matches!(
        RuleConfig::parse("DELETE(a)\n"),
        Err(ConfigError::Syntax { line: 1, .. })
    ));

    let empty = RuleConfig::parse("# nothing\n").unwrap();
    assert!(empty.actions.is_empty());
    assert!(empty.selects(&yaml("kind: Pod\n")));
}

#[test]
fn test_matchers() {
    let doc = yaml("kind: Pod\nmetadata: {name: web}\n");
    assert!(Matcher::field("metadata.name", "web").matches(&doc));
    assert!(Matcher::field("metadata.name", "*").matches(&doc));
    assert!(!Matcher::field("metadata.namespace", "*").matches(&doc));
    assert!(!Matcher::Any(vec![]).matches(&doc));
    assert!(!Matcher::All(vec![]).matches(&doc));
    assert!(Matcher::Any(vec![Matcher::Never, Matcher::Always]).matches(&doc));
    assert!(!Matcher::All(vec![Matcher::Always, Matcher::Never]).matches(&doc));
}
