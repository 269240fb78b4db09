use mlua::{Lua, Table};
use modloader::script::{sandbox, DefinitionStore, PrototypeKind, ScriptValue};
use modloader::{Error, ErrorCode};

/// A fresh script state with `storage` bound to `store`.
fn script_state(store: &DefinitionStore) -> Lua {
    let lua = sandbox::new_state().unwrap();
    lua.globals().set("storage", store.push(&lua).unwrap()).unwrap();
    lua
}

fn run(store: &DefinitionStore, code: &str) -> mlua::Result<()> {
    script_state(store).load(code).exec()
}

#[test]
fn nested_definitions_survive_the_copy() {
    let store = DefinitionStore::new().unwrap();
    run(
        &store,
        r#"
        local leaf = { depth = 3, tags = { "x", "y" } }
        storage.add({
            type = "controller",
            name = "deep",
            speed = 1.5,
            enabled = true,
            children = { { depth = 1 }, { depth = 2, child = leaf } },
        })
        "#,
    )
    .unwrap();

    let ok: bool = script_state(&store)
        .load(
            r#"
            local d = storage.get("controller", "deep")
            return d.name == "deep" and d.speed == 1.5 and d.enabled == true
                and #d.children == 2 and d.children[1].depth == 1
                and d.children[2].child.depth == 3
                and d.children[2].child.tags[2] == "y"
            "#,
        )
        .eval()
        .unwrap();
    assert!(ok);

    let copied = store.get("controller", "deep").unwrap().unwrap();
    assert_eq!(copied.field("name").and_then(ScriptValue::as_str), Some("deep"));
    assert_eq!(copied.field("speed"), Some(&ScriptValue::Number(1.5)));
}

#[test]
fn store_does_not_alias_the_script_table() {
    let store = DefinitionStore::new().unwrap();
    let lua = script_state(&store);

    lua.load(
        r#"
        local def = { type = "controller", name = "x", value = 1 }
        storage.add(def)
        def.value = 2
        local fetched = storage.get("controller", "x")
        fetched.value = 3
        "#,
    )
    .exec()
    .unwrap();
    drop(lua);

    let value = store.get("controller", "x").unwrap().unwrap();
    assert_eq!(value.field("value"), Some(&ScriptValue::Integer(1)));
}

#[test]
fn cyclic_definitions_leave_the_bucket_unchanged() {
    let store = DefinitionStore::new().unwrap();
    run(&store, r#"storage.add({ type = "controller", name = "x", value = 1 })"#).unwrap();

    let error = run(
        &store,
        r#"
        local def = { type = "controller", name = "x", value = 2, inner = {} }
        def.inner.back = def
        storage.add(def)
        "#,
    )
    .unwrap_err();
    assert!(error.to_string().contains("recursive data"), "{error}");

    let value = store.get("controller", "x").unwrap().unwrap();
    assert_eq!(value.field("value"), Some(&ScriptValue::Integer(1)));
}

#[test]
fn functions_are_copied_as_bytecode() {
    let store = DefinitionStore::new().unwrap();
    run(
        &store,
        r#"storage.add({ type = "controller", name = "f", scale = function(x) return x * 10 end })"#,
    )
    .unwrap();

    let result: i64 = script_state(&store)
        .load(r#"return storage.get("controller", "f").scale(4)"#)
        .eval()
        .unwrap();
    assert_eq!(result, 40);
}

#[test]
fn invalid_definitions_are_rejected() {
    let store = DefinitionStore::new().unwrap();

    for code in [
        r#"storage.add({ name = "x" })"#,
        r#"storage.add({ type = "controller" })"#,
        r#"storage.add({ type = "controller", name = 5 })"#,
        r#"storage.add({ type = "widget", name = "x" })"#,
        r#"storage.add("controller")"#,
        r#"storage.add({ type = "controller", name = "x", f = print })"#,
        r#"storage.extend("nope")"#,
    ] {
        assert!(run(&store, code).is_err(), "{code}");
    }

    assert!(store.name_list("controller").unwrap().is_empty());
    assert!(store.get("widget", "x").is_err());
}

#[test]
fn extend_and_listing() {
    let store = DefinitionStore::new().unwrap();
    run(
        &store,
        r#"
        storage.extend({
            { type = "controller", name = "b" },
            { type = "controller", name = "a" },
            { type = "prototype", name = "root" },
        })
        "#,
    )
    .unwrap();

    assert_eq!(store.name_list("controller").unwrap(), ["a", "b"]);
    assert_eq!(store.type_list(), ["prototype", "controller"]);

    let ok: bool = script_state(&store)
        .load(
            r#"
            local names = storage.get_name_list("controller")
            local types = storage.get_type_list()
            return #names == 2 and names[1] == "a" and names[2] == "b"
                and #types == 2 and storage.get("controller", "missing") == nil
            "#,
        )
        .eval()
        .unwrap();
    assert!(ok);
}

#[test]
fn history_follows_load_order() {
    let store = DefinitionStore::new().unwrap();

    store.set_current_mod(Some("a"));
    run(&store, r#"storage.add({ type = "controller", name = "x", owner = "a" })"#).unwrap();
    store.set_current_mod(Some("b"));
    run(&store, r#"storage.add({ type = "controller", name = "x", owner = "b" })"#).unwrap();
    store.set_current_mod(None);
    run(&store, r#"storage.add({ type = "controller", name = "y" })"#).unwrap();

    assert_eq!(store.history("controller", "x"), ["a", "b"]);
    assert!(store.history("controller", "y").is_empty());

    let x = store.get("controller", "x").unwrap().unwrap();
    assert_eq!(x.field("owner").and_then(ScriptValue::as_str), Some("b"));
}

#[test]
fn load_materializes_prototypes() {
    let store = DefinitionStore::new().unwrap();
    store.set_current_mod(Some("base"));
    run(
        &store,
        r#"
        storage.add({ type = "controller", name = "x" })
        storage.add({ type = "controller", name = "y" })
        "#,
    )
    .unwrap();

    assert_eq!(store.load().unwrap(), 2);
    assert!(store.is_loaded());

    let x = store.get_prototype(PrototypeKind::Controller, "x").unwrap();
    assert_eq!(x.name(), "x");
    assert_eq!(x.type_name(), "controller");
    assert_eq!(x.history(), ["base"]);
    assert!(store.get_prototype(PrototypeKind::Controller, "z").is_none());

    let flat = store.find_prototypes(PrototypeKind::Prototype, false);
    assert_eq!(flat.len(), 1);
    assert!(flat[&PrototypeKind::Prototype].is_empty());

    let recursive = store.find_prototypes(PrototypeKind::Prototype, true);
    assert_eq!(recursive[&PrototypeKind::Controller].len(), 2);

    let y = store.get_prototype(PrototypeKind::Controller, "y").unwrap();
    assert_ne!(x.id(), y.id());

    assert_eq!(store.load().unwrap_err().code(), ErrorCode::AlreadyLoaded);

    store.clear();
    assert!(!store.is_loaded());
    assert!(store.history("controller", "x").is_empty());
    assert_eq!(store.load().unwrap(), 2);
}

#[test]
fn abstract_definitions_fail_the_whole_load() {
    let store = DefinitionStore::new().unwrap();
    run(
        &store,
        r#"
        storage.add({ type = "controller", name = "fine" })
        storage.add({ type = "prototype", name = "root" })
        "#,
    )
    .unwrap();

    assert!(matches!(store.load(), Err(Error::InvalidPrototype(_))));
    assert!(!store.is_loaded());
    assert!(store
        .get_prototype(PrototypeKind::Controller, "fine")
        .is_none());
}

#[test]
fn prototypes_can_be_pushed_into_scripts() {
    let store = DefinitionStore::new().unwrap();
    store.set_current_mod(Some("core"));
    run(&store, r#"storage.add({ type = "controller", name = "x" })"#).unwrap();
    store.load().unwrap();

    let prototype = store.get_prototype(PrototypeKind::Controller, "x").unwrap();
    let lua = Lua::new();
    let table: Table = prototype.to_lua_table(&lua).unwrap();
    lua.globals().set("x", table).unwrap();

    let ok: bool = lua
        .load(r#"return x.get_name() == "x" and x.get_type_name() == "controller" and x.get_history()[1] == "core""#)
        .eval()
        .unwrap();
    assert!(ok);
    assert!(prototype.dump().contains("history = {0 = core, }"));
}
