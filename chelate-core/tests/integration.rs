//! Integration tests over whole graphs, checked against the wire form.

use chelate_core::{
    Class, Entity, Error, FieldOptions, Fields, MappedValue, MemoryRegistry, Node, Serialized,
    Serializer, SerializerConfig, Symbol, Value, serialize,
};
use serde_json::json;

fn record(entries: Vec<(&str, Value)>) -> Node {
    Node::record(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn to_json(out: &Serialized) -> serde_json::Value {
    serde_json::to_value(out).unwrap()
}

fn index_of(value: Option<&MappedValue>) -> usize {
    value.and_then(MappedValue::as_reference).unwrap().index
}

#[test]
fn primitive_roots_pass_through() {
    let serializer = Serializer::new(MemoryRegistry::new());

    let out = serializer.serialize(&Value::from(42)).unwrap();
    assert_eq!(to_json(&out), json!({"instances": [], "root": 42}));

    let out = serializer.serialize(&Value::from("s")).unwrap();
    assert_eq!(to_json(&out), json!({"instances": [], "root": "s"}));

    let out = serializer.serialize(&Value::Null).unwrap();
    assert_eq!(to_json(&out), json!({"instances": [], "root": null}));
}

#[test]
fn plain_record() {
    let root = record(vec![("a", Value::from(1)), ("b", Value::from(2))]);
    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();

    assert_eq!(
        to_json(&out),
        json!({
            "instances": [{"__type__": "__object__", "__value__": {"a": 1, "b": 2}}],
            "root": {"__index__": 0}
        })
    );
}

#[test]
fn sequence() {
    let root = Node::sequence(vec![Value::from(1), Value::from(2), Value::from(3)]);
    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();

    assert_eq!(
        to_json(&out),
        json!({
            "instances": [{"__type__": "__array__", "__value__": [1, 2, 3]}],
            "root": {"__index__": 0}
        })
    );
}

#[test]
fn shared_node_is_emitted_once() {
    let shared = record(vec![("name", Value::from("shared"))]);
    let root = record(vec![
        ("left", Value::from(&shared)),
        ("right", Value::from(&shared)),
    ]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();

    assert_eq!(out.instances.len(), 2);
    let root_value = &out.root_instance().unwrap().value;
    assert_eq!(index_of(root_value.get("left")), 1);
    assert_eq!(index_of(root_value.get("right")), 1);
}

#[test]
fn structurally_equal_nodes_stay_distinct() {
    let a = record(vec![("x", Value::from(1))]);
    let b = record(vec![("x", Value::from(1))]);
    let root = Node::sequence(vec![Value::from(a), Value::from(b)]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    assert_eq!(out.instances.len(), 3);
}

#[test]
fn two_node_cycle_terminates() {
    let a = record(vec![("name", Value::from("a"))]);
    let b = record(vec![("name", Value::from("b"))]);
    a.set("other", &b);
    b.set("other", &a);

    let out = serialize(MemoryRegistry::new(), &Value::from(&a)).unwrap();

    assert_eq!(
        to_json(&out),
        json!({
            "instances": [
                {"__type__": "__object__", "__value__": {"name": "a", "other": {"__index__": 1}}},
                {"__type__": "__object__", "__value__": {"name": "b", "other": {"__index__": 0}}}
            ],
            "root": {"__index__": 0}
        })
    );
}

#[test]
fn self_reference() {
    let node = record(Vec::new());
    node.set("me", &node);
    let list = Node::sequence(Vec::new());
    list.push(&list);

    let root = Node::sequence(vec![Value::from(&node), Value::from(&list)]);
    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();

    assert_eq!(
        to_json(&out)["instances"],
        json!([
            {"__type__": "__array__", "__value__": [{"__index__": 1}, {"__index__": 2}]},
            {"__type__": "__object__", "__value__": {"me": {"__index__": 1}}},
            {"__type__": "__array__", "__value__": [{"__index__": 2}]}
        ])
    );
}

#[test]
fn instances_follow_preorder_first_encounter() {
    let leaf = record(vec![("leaf", Value::from(true))]);
    let first = Node::sequence(vec![Value::from(&leaf)]);
    let second = record(vec![("again", Value::from(&leaf))]);
    let root = record(vec![("first", Value::from(first)), ("second", Value::from(second))]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    let tags: Vec<_> = out.instances.iter().map(|i| i.type_tag.as_str()).collect();
    // root, first, leaf, second
    assert_eq!(tags, ["__object__", "__array__", "__object__", "__object__"]);
    assert_eq!(index_of(out.instances[3].value.get("again")), 2);
}

#[test]
fn repeated_calls_are_identical() {
    let shared = Node::sequence(vec![Value::from(1)]);
    let root = record(vec![
        ("x", Value::from(&shared)),
        ("y", Value::from(record(vec![("z", Value::from(&shared))]))),
    ]);
    let root = Value::from(root);

    let serializer = Serializer::new(MemoryRegistry::new());
    let first = serializer.serialize(&root).unwrap();
    let second = serializer.serialize(&root).unwrap();
    assert_eq!(first, second);
    // No identity state survives between calls.
    assert_eq!(second.root, MappedValue::Reference(chelate_core::Reference::new(0)));
}

#[test]
fn registered_type_uses_declared_tag_and_exclude() {
    let class = Class::new("app::Account").with_tag("Account");
    let mut registry = MemoryRegistry::new();
    registry.register(&class, Some(FieldOptions::new().exclude(["secret"])));

    let account = Node::instance(
        class,
        [
            ("id".to_string(), Value::from(1)),
            ("secret".to_string(), Value::from("x")),
        ]
        .into_iter()
        .collect(),
    );

    let out = serialize(&registry, &Value::from(account)).unwrap();
    assert_eq!(
        to_json(&out),
        json!({
            "instances": [{"__type__": "Account", "__value__": {"id": 1}}],
            "root": {"__index__": 0}
        })
    );
}

#[test]
fn exclude_then_include() {
    let class = Class::new("Profile").with_tag("Profile");
    let mut registry = MemoryRegistry::new();
    registry.register(
        &class,
        Some(FieldOptions::new().exclude(["email"]).include(["email", "name"])),
    );

    let mut fields = Fields::new();
    fields.insert("id".into(), Value::from(7));
    fields.insert("email".into(), Value::from("a@b.c"));
    fields.insert("name".into(), Value::from("Ada"));
    let profile = Node::instance(class, fields);

    let out = serialize(&registry, &Value::from(profile)).unwrap();
    assert_eq!(to_json(&out)["instances"][0]["__value__"], json!({"name": "Ada"}));
}

#[test]
fn options_do_not_apply_to_records() {
    let mut registry = MemoryRegistry::new();
    registry.set_options("__object__", FieldOptions::new().exclude(["a"]));

    let root = record(vec![("a", Value::from(1))]);
    let out = serialize(&registry, &Value::from(root)).unwrap();
    assert_eq!(to_json(&out)["instances"][0]["__value__"], json!({"a": 1}));
}

#[test]
fn function_field_becomes_null() {
    let root = record(vec![
        ("id", Value::from(1)),
        ("callback", Value::from(Node::function("onClick"))),
    ]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    assert_eq!(
        to_json(&out),
        json!({
            "instances": [{"__type__": "__object__", "__value__": {"id": 1, "callback": null}}],
            "root": {"__index__": 0}
        })
    );
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].path, "$.callback");
}

#[test]
fn unregistered_instance_becomes_null() {
    let stranger = Node::instance(Class::new("Stranger").with_tag("Stranger"), Fields::new());
    let root = Node::sequence(vec![Value::from(&stranger), Value::from(&stranger)]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    assert_eq!(
        to_json(&out)["instances"],
        json!([{"__type__": "__array__", "__value__": [null, null]}])
    );
    assert_eq!(out.diagnostics.len(), 2);
}

#[test]
fn unserializable_root_is_null() {
    let out = serialize(MemoryRegistry::new(), &Value::from(Node::function(""))).unwrap();
    assert!(out.root.is_null());
    assert!(out.instances.is_empty());
    assert_eq!(out.diagnostics[0].path, "$");
    assert_eq!(out.diagnostics[0].description, "anonymous function");
}

#[test]
fn strict_mode_fails_the_call() {
    let root = record(vec![("f", Value::from(Node::function("f")))]);
    let serializer = Serializer::with_config(MemoryRegistry::new(), SerializerConfig::strict());

    let err = serializer.serialize(&Value::from(root)).unwrap_err();
    match err {
        Error::Unserializable(diagnostic) => assert_eq!(diagnostic.path, "$.f"),
        other => panic!("expected Unserializable, got {other:?}"),
    }
}

#[test]
fn depth_limit() {
    let inner = Node::sequence(vec![Value::from(1)]);
    let middle = Node::sequence(vec![Value::from(inner)]);
    let outer = Node::sequence(vec![Value::from(middle)]);
    let root = Value::from(outer);

    let relaxed = SerializerConfig::default().with_max_depth(3);
    assert!(Serializer::with_config(MemoryRegistry::new(), relaxed).serialize(&root).is_ok());

    let tight = SerializerConfig::default().with_max_depth(2);
    let err = Serializer::with_config(MemoryRegistry::new(), tight)
        .serialize(&root)
        .unwrap_err();
    assert!(matches!(err, Error::DepthLimit { limit: 2, ref path } if path == "$[0][0]"));
}

#[test]
fn long_chain_does_not_overflow() {
    const LENGTH: usize = 100_000;

    let nodes: Vec<Node> = (0..LENGTH)
        .map(|i| record(vec![("id", Value::from(i))]))
        .collect();
    for pair in nodes.windows(2) {
        pair[0].set("next", &pair[1]);
    }

    let out = serialize(MemoryRegistry::new(), &Value::from(&nodes[0])).unwrap();

    assert_eq!(out.instances.len(), LENGTH);
    assert_eq!(index_of(Some(&out.root)), 0);
    for (i, instance) in out.instances.iter().enumerate().take(LENGTH - 1) {
        assert_eq!(index_of(instance.value.get("next")), i + 1);
    }
    assert!(out.instances[LENGTH - 1].value.get("next").is_none());
}

#[test]
fn path_resumes_after_nested_objects() {
    let nested = Node::sequence(vec![Value::from(Node::sequence(vec![Value::from(1)]))]);
    let root = record(vec![
        ("a", Value::from(nested)),
        ("b", Value::from(Node::function("cb"))),
    ]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    assert_eq!(out.instances.len(), 3);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].path, "$.b");
}

#[test]
fn hook_substitutes_fields() {
    let class = Class::new("Temperature").with_tag("Temperature");
    let mut registry = MemoryRegistry::new();
    registry.register(&class, Some(FieldOptions::new().exclude(["raw"])));

    let reading = Node::instance(
        class,
        [("kelvin".to_string(), Value::from(300.0))].into_iter().collect(),
    )
    .with_hook(|_: &Node| {
        Value::from(record(vec![
            ("celsius", Value::from(27)),
            ("raw", Value::from(300)),
        ]))
    });

    let out = serialize(&registry, &Value::from(reading)).unwrap();
    assert_eq!(
        to_json(&out),
        json!({
            "instances": [{"__type__": "Temperature", "__value__": {"celsius": 27}}],
            "root": {"__index__": 0}
        })
    );
}

#[test]
fn hook_substitute_children_are_deduplicated() {
    let shared = Node::sequence(vec![Value::from("payload")]);
    let captured = shared.clone();
    let wrapper = record(Vec::new()).with_hook(move |_: &Node| {
        Value::from(Node::sequence(vec![Value::from(&captured), Value::from(&captured)]))
    });
    let root = Node::sequence(vec![Value::from(&wrapper), Value::from(&shared)]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    assert_eq!(
        to_json(&out)["instances"],
        json!([
            {"__type__": "__array__", "__value__": [{"__index__": 1}, {"__index__": 2}]},
            {"__type__": "__object__", "__value__": [{"__index__": 2}, {"__index__": 2}]},
            {"__type__": "__array__", "__value__": ["payload"]}
        ])
    );
}

#[test]
fn hook_returning_primitive() {
    let node = record(vec![("ignored", Value::from(1))]).with_hook(|_: &Node| Value::from("opaque"));
    let out = serialize(MemoryRegistry::new(), &Value::from(node)).unwrap();
    assert_eq!(
        to_json(&out)["instances"],
        json!([{"__type__": "__object__", "__value__": "opaque"}])
    );
}

#[test]
fn hooks_on_sequences_are_ignored() {
    let seq = Node::sequence(vec![Value::from(1)]).with_hook(|_: &Node| Value::Null);
    let out = serialize(MemoryRegistry::new(), &Value::from(seq)).unwrap();
    assert_eq!(to_json(&out)["instances"][0]["__value__"], json!([1]));
}

#[test]
fn undefined_and_symbols() {
    let root = record(vec![
        ("u", Value::Undefined),
        ("s", Value::Symbol(Symbol::new("tag"))),
        (
            "list",
            Value::from(Node::sequence(vec![Value::Undefined, Value::from(false)])),
        ),
    ]);

    let out = serialize(MemoryRegistry::new(), &Value::from(root)).unwrap();
    assert_eq!(out.instances.len(), 2);
    assert_eq!(
        to_json(&out)["instances"],
        json!([
            {"__type__": "__object__", "__value__": {"list": {"__index__": 1}}},
            {"__type__": "__array__", "__value__": [null, false]}
        ])
    );
    assert_eq!(out.instances[0].value.get("u"), Some(&MappedValue::Undefined));
}

#[derive(Entity)]
#[entity(tag = "User")]
struct User {
    id: u32,
    #[entity(rename = "displayName")]
    display_name: String,
    #[entity(skip)]
    #[allow(dead_code)]
    session_token: String,
    friends: Vec<Node>,
    manager: Option<Node>,
}

#[derive(Entity)]
struct Marker;

#[test]
fn derived_entity_fields() {
    let user = User {
        id: 1,
        display_name: "Ada".to_string(),
        session_token: "t".to_string(),
        friends: Vec::new(),
        manager: None,
    };
    let fields = user.fields();
    let keys: Vec<_> = fields.keys().map(String::as_str).collect();
    assert_eq!(keys, ["id", "displayName", "friends", "manager"]);
    assert_eq!(User::TAG, "User");
    assert_eq!(Marker::TAG, "Marker");
    assert!(Marker.fields().is_empty());
}

#[test]
fn derived_entities_in_a_graph() {
    let mut registry = MemoryRegistry::new();
    registry.register_entity::<User>();
    registry.register_entity::<Marker>();

    let boss = Node::entity(&User {
        id: 1,
        display_name: "Boss".to_string(),
        session_token: String::new(),
        friends: Vec::new(),
        manager: None,
    });
    let worker = Node::entity(&User {
        id: 2,
        display_name: "Worker".to_string(),
        session_token: String::new(),
        friends: vec![boss.clone()],
        manager: Some(boss.clone()),
    });
    boss.set("friends", Node::sequence(vec![Value::from(&worker)]));

    let out = serialize(&registry, &Value::from(&worker)).unwrap();
    assert_eq!(
        to_json(&out),
        json!({
            "instances": [
                {"__type__": "User", "__value__": {
                    "id": 2, "displayName": "Worker", "friends": {"__index__": 1}, "manager": {"__index__": 2}
                }},
                {"__type__": "__array__", "__value__": [{"__index__": 2}]},
                {"__type__": "User", "__value__": {
                    "id": 1, "displayName": "Boss", "friends": {"__index__": 3}, "manager": null
                }},
                {"__type__": "__array__", "__value__": [{"__index__": 0}]}
            ],
            "root": {"__index__": 0}
        })
    );
    assert!(out.diagnostics.is_empty());
}

#[test]
fn entity_options_from_registry() {
    let mut registry = MemoryRegistry::new();
    registry.register_entity_with::<User>(FieldOptions::new().include(["id"]));

    let user = Node::entity(&User {
        id: 9,
        display_name: "Hidden".to_string(),
        session_token: String::new(),
        friends: Vec::new(),
        manager: None,
    });
    let out = serialize(&registry, &Value::from(user)).unwrap();
    assert_eq!(to_json(&out)["instances"], json!([{"__type__": "User", "__value__": {"id": 9}}]));
}
