//! Integration tests for the slice store.

use parking_lot::Mutex;
use serde_json::{json, Value};
use slice_bridge::{
    use_slice, use_store_state, use_store_state_with, BindingOptions, Equality, ReceiverConfig,
    SliceDescriptor, SliceEvent, SliceStore, StorePlan,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn test_store() -> Arc<SliceStore> {
    let store = Arc::new(SliceStore::new());
    store.initialize(vec![
        SliceDescriptor::new("session", json!({"user": {"id": 1, "name": "ada"}, "token": null})),
        SliceDescriptor::new("cart", json!({"items": [], "total": 0})),
        SliceDescriptor::new("theme", json!("light")),
    ]);
    store
}

// --- Store Properties ---

#[test]
fn test_set_then_get_round_trips() {
    let store = test_store();
    let values = vec![
        json!(null),
        json!(42),
        json!("text"),
        json!([1, "two", {"three": 3}]),
        json!({"nested": {"deep": [true, false]}}),
    ];

    for value in values {
        store.set("any", value.clone());
        assert_eq!(store.get("any"), Some(value));
    }
}

#[test]
fn test_fan_out_to_every_subscriber() {
    let store = test_store();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let subs: Vec<_> = (0..5)
        .map(|i| {
            let seen = seen.clone();
            store.subscribe("theme", move |value| seen.lock().push((i, value.clone())))
        })
        .collect();

    store.set("theme", json!("dark"));

    let seen = seen.lock();
    assert_eq!(seen.len(), subs.len());
    assert!(seen.iter().all(|(_, v)| *v == json!("dark")));
}

#[test]
fn test_merge_example() {
    let store = SliceStore::new();
    store.initialize(vec![SliceDescriptor::new("s", json!({"a": {"x": 1, "y": 2}}))]);

    store.merge("s", &json!({"a": {"y": 9, "z": 3}})).unwrap();
    assert_eq!(store.get("s"), Some(json!({"a": {"x": 1, "y": 9, "z": 3}})));
}

#[test]
fn test_merge_replaces_scalar() {
    let store = SliceStore::new();
    store.initialize(vec![SliceDescriptor::new("s", json!({"a": 1}))]);

    store.reduce("s", &json!({"a": {"b": 2}})).unwrap();
    assert_eq!(store.get("s"), Some(json!({"a": {"b": 2}})));
}

#[test]
fn test_initialize_resets_to_same_snapshot() {
    let store = SliceStore::new();
    let plan = SliceStore::describe(vec![
        SliceDescriptor::new("a", json!({"n": 1})),
        SliceDescriptor::new("b", json!([])),
    ]);

    store.apply(&plan);
    let first = store.snapshot();

    store.set("a", json!({"n": 99}));
    store.set("extra", json!(true));
    store.apply(&plan);

    assert_eq!(store.snapshot(), first);
    assert!(!store.contains("extra"));
}

#[test]
fn test_absent_read() {
    let store = test_store();
    assert_eq!(store.get("nonexistent"), None);
}

#[test]
fn test_delivery_reads_current_value() {
    let store = test_store();
    let seen = Arc::new(Mutex::new(Vec::new()));

    // The first listener rewrites the slice the first time it sees "dark".
    let writer = store.subscribe("theme", {
        let store = Arc::clone(&store);
        move |value| {
            if *value == json!("dark") {
                store.set("theme", json!("darker"));
            }
        }
    });
    let reader = {
        let seen = seen.clone();
        store.subscribe("theme", move |value| seen.lock().push(value.clone()))
    };

    store.set("theme", json!("dark"));

    // Nested publish delivers "darker" first; the outer delivery then reads
    // the current value instead of the one originally written.
    assert_eq!(*seen.lock(), vec![json!("darker"), json!("darker")]);
    drop(writer);
    drop(reader);
}

// --- Binding Workflows ---

#[test]
fn test_component_and_service_share_state() {
    let store = test_store();

    let header = use_slice(&store, "session");
    let form = use_store_state(&store, "session");

    // A background service updates the token.
    store.merge("session", &json!({"token": "abc"})).unwrap();

    assert_eq!(header.value().unwrap()["token"], "abc");
    assert_eq!(form.value().unwrap()["token"], "abc");
    assert_eq!(form.value().unwrap()["user"]["name"], "ada");

    // The form edits the name through its setter.
    let (_, setter) = form.pair();
    let mut next = form.value().unwrap();
    next["user"]["name"] = json!("grace");
    setter.set(next);

    assert_eq!(header.value().unwrap()["user"]["name"], "grace");
    assert_eq!(store.get("session").unwrap()["user"]["name"], "grace");
}

#[test]
fn test_two_way_loop_settles() {
    let store = test_store();
    let a = use_store_state(&store, "cart");
    let b = use_store_state(&store, "cart");

    a.setter().set(json!({"items": ["apple"], "total": 1}));

    // Both components run their post-render step; write-backs of equal
    // values do not cause further cell updates.
    let before = (a.cell().version(), b.cell().version());
    a.after_render();
    b.after_render();
    a.after_render();
    b.after_render();
    assert_eq!((a.cell().version(), b.cell().version()), before);
    assert_eq!(b.value(), Some(json!({"items": ["apple"], "total": 1})));
}

#[test]
fn test_same_value_twice_updates_once() {
    let store = test_store();
    let renders = Arc::new(AtomicUsize::new(0));
    let renders_clone = renders.clone();
    let state = use_store_state_with(
        &store,
        "theme",
        BindingOptions::default().with_render_hook(move || {
            renders_clone.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let setter = state.setter();
    setter.set(json!("dark"));
    setter.set(json!("dark"));

    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[test]
fn test_content_hash_drops_coerced_update() {
    let store = SliceStore::new();
    store.set("n", json!(1));
    let store = Arc::new(store);
    let state = use_store_state_with(
        &store,
        "n",
        BindingOptions::default().with_equality(Equality::ContentHash),
    );

    // "1" and 1 render to the same string, so the update is dropped.
    store.set("n", json!("1"));
    assert_eq!(state.value(), Some(json!(1)));
    assert_eq!(store.get("n"), Some(json!("1")));

    // Structural equality sees the difference.
    let structural = use_store_state(&store, "n");
    store.set("n", json!(1));
    assert_eq!(structural.value(), Some(json!(1)));
}

#[test]
fn test_custom_equality() {
    let store = Arc::new(SliceStore::new());
    store.set("doc", json!({"rev": 1, "body": "a"}));
    let state = use_store_state_with(
        &store,
        "doc",
        BindingOptions::default().with_equality(Equality::custom(|a, b| a["rev"] == b["rev"])),
    );

    store.set("doc", json!({"rev": 1, "body": "b"}));
    assert_eq!(state.value().unwrap()["body"], "a");

    store.set("doc", json!({"rev": 2, "body": "c"}));
    assert_eq!(state.value().unwrap()["body"], "c");
}

#[test]
fn test_remounting_does_not_accumulate_listeners() {
    let store = test_store();

    for _ in 0..100 {
        let state = use_store_state(&store, "theme");
        let _view = use_slice(&store, "theme");
        state.after_render();
    }

    assert_eq!(store.listener_count("theme"), 0);
    assert_eq!(store.stats().listener_count, 0);
}

// --- Channel Receivers ---

#[test]
fn test_receiver_on_other_thread() {
    let store = test_store();
    let receiver = store.subscribe_channel("cart", ReceiverConfig::default());

    let consumer = thread::spawn(move || {
        let mut totals = Vec::new();
        while totals.len() < 3 {
            match receiver.recv_timeout(Duration::from_secs(1)) {
                Ok(SliceEvent::Updated { value, .. }) => totals.push(value["total"].clone()),
                Ok(SliceEvent::Dropped { .. }) | Err(_) => break,
            }
        }
        totals
    });

    for total in 1..=3 {
        store.merge("cart", &json!({"total": total})).unwrap();
    }

    let totals = consumer.join().unwrap();
    assert_eq!(totals, vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn test_receiver_gets_publish_time_snapshot() {
    let store = test_store();
    let receiver = store.subscribe_channel("theme", ReceiverConfig::default());

    store.set("theme", json!("dark"));
    store.set("theme", json!("contrast"));

    let values: Vec<Value> = receiver
        .receiver()
        .try_iter()
        .filter_map(|event| match event {
            SliceEvent::Updated { value, .. } => Some(value),
            SliceEvent::Dropped { .. } => None,
        })
        .collect();
    assert_eq!(values, vec![json!("dark"), json!("contrast")]);
}

#[test]
fn test_receiver_snapshot_survives_rewriting_listener() {
    let store = test_store();

    // Registered before the receiver, and rewrites the slice on "dark".
    let writer = store.subscribe("theme", {
        let store = Arc::clone(&store);
        move |value| {
            if *value == json!("dark") {
                store.set("theme", json!("darker"));
            }
        }
    });
    let receiver = store.subscribe_channel("theme", ReceiverConfig::default());

    store.set("theme", json!("dark"));

    let values: Vec<Value> = receiver
        .receiver()
        .try_iter()
        .filter_map(|event| match event {
            SliceEvent::Updated { value, .. } => Some(value),
            SliceEvent::Dropped { .. } => None,
        })
        .collect();
    assert_eq!(values, vec![json!("dark"), json!("darker")]);
    assert_eq!(store.get("theme"), Some(json!("darker")));
    drop(writer);
}

#[test]
fn test_wildcard_listener_logs_all_writes() {
    let store = test_store();
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    let _sub = store.subscribe_all(move |name, _| log_clone.lock().push(name.to_string()));

    store.set("theme", json!("dark"));
    store.merge("cart", &json!({"total": 5})).unwrap();

    assert_eq!(*log.lock(), vec!["theme".to_string(), "cart".to_string()]);
}

// --- Setup ---

#[test]
fn test_plan_from_json_config() {
    let plan = StorePlan::from_json(
        r#"[
            {"name": "flags", "initial_value": {"beta": false}},
            {"name": "locale", "initial_value": "en"}
        ]"#,
    )
    .unwrap();

    let store = Arc::new(SliceStore::new());
    let commit = store.setup(plan.slices().to_vec());
    assert!(store.slice_names().is_empty());

    commit();
    assert_eq!(store.slice_names(), vec!["flags".to_string(), "locale".to_string()]);
    assert_eq!(store.get("locale"), Some(json!("en")));
}

#[test]
fn test_global_store_is_usable() {
    let store = slice_bridge::global();
    store.set("integration-global", json!(1));
    assert_eq!(slice_bridge::global().get("integration-global"), Some(json!(1)));
}
