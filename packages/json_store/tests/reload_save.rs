use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mapspec::{
    Instance, MethodDescriptor, Spec, SpecError, SpecFactory, SpecType, SpecTypeBuilder, Tag,
    Value,
};
use mapspec_json_store::JsonFile;

struct Server(Instance);

impl Spec for Server {
    fn describe() -> SpecTypeBuilder {
        SpecType::builder("Server")
            .method(MethodDescriptor::getter("get_port").default_value(25565))
            .method(MethodDescriptor::setter("set_port"))
            .method(MethodDescriptor::getter("get_motd").default_value("A server"))
            .method(
                MethodDescriptor::getter("get_network").nested(
                    SpecType::builder("Network")
                        .method(MethodDescriptor::getter("get_host").default_value("0.0.0.0"))
                        .method(MethodDescriptor::getter("get_timeout").default_value(30))
                        .method(MethodDescriptor::action("save").tag(Tag::Save)),
                ),
            )
            .method(MethodDescriptor::action("reload").tag(Tag::Reload))
            .method(MethodDescriptor::action("save").tag(Tag::Save))
            .method(MethodDescriptor::action("reset").tag(Tag::Reset))
    }

    fn wrap(instance: Instance) -> Self {
        Server(instance)
    }

    fn instance(&self) -> &Instance {
        &self.0
    }
}

impl Server {
    fn port(&self) -> mapspec::Result<Option<u16>> {
        self.0.get_as("get_port")
    }

    fn set_port(&self, port: u16) -> mapspec::Result<()> {
        self.0.set("set_port", port)
    }

    fn network(&self) -> Instance {
        self.0
            .get("get_network")
            .unwrap()
            .and_then(|v| v.as_spec().cloned())
            .unwrap()
    }
}

#[test]
fn save_writes_store_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    let factory = SpecFactory::new();

    let server: Server = JsonFile::new(&file).open_spec(&factory).unwrap();
    server.set_port(8080).unwrap();
    server.instance().call("save").unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!({
            "port": 8080,
            "motd": "A server",
            "network": {"host": "0.0.0.0", "timeout": 30}
        })
    );
    let keys: Vec<&String> = written.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["port", "motd", "network"]);
}

#[test]
fn reload_overlays_file_on_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    fs::write(
        &file,
        r#"{"port": 1234, "network": {"timeout": 5}, "legacy": true}"#,
    )
    .unwrap();

    let factory = SpecFactory::new();
    let server: Server = JsonFile::new(&file).open_spec(&factory).unwrap();

    assert_eq!(server.port().unwrap(), Some(1234));
    assert_eq!(
        server.instance().get("get_motd").unwrap(),
        Some(Value::from("A server"))
    );
    assert_eq!(
        server.network().get("get_timeout").unwrap(),
        Some(Value::from(5))
    );
    assert_eq!(
        server.network().get("get_host").unwrap(),
        Some(Value::from("0.0.0.0"))
    );
    assert_eq!(server.store().get("legacy"), Some(Value::from(true)));
}

#[test]
fn reload_picks_up_external_edits() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    let factory = SpecFactory::new();

    let server: Server = JsonFile::new(&file).open_spec(&factory).unwrap();
    server.instance().call("save").unwrap();
    assert_eq!(server.port().unwrap(), Some(25565));

    fs::write(&file, r#"{"port": 7777}"#).unwrap();
    server.instance().call("reload").unwrap();

    assert_eq!(server.port().unwrap(), Some(7777));
    assert_eq!(
        server.network().get("get_timeout").unwrap(),
        Some(Value::from(30))
    );
}

#[test]
fn save_then_open_round_trips_nested_values() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    let factory = SpecFactory::new();

    let first: Server = JsonFile::new(&file).open_spec(&factory).unwrap();
    first
        .network()
        .store()
        .insert("host", Value::from("10.0.0.1"))
        .unwrap();
    first.instance().call("save").unwrap();

    let second: Server = JsonFile::new(&file).open_spec(&factory).unwrap();
    assert_eq!(first.instance(), second.instance());
    assert_eq!(
        second.network().get("get_host").unwrap(),
        Some(Value::from("10.0.0.1"))
    );
}

#[test]
fn nested_section_cannot_save() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    let factory = SpecFactory::new();

    let server: Server = JsonFile::new(&file).open_spec(&factory).unwrap();
    let err = server.network().call("save").unwrap_err();

    assert!(matches!(err, SpecError::NotTopLevel { operation: "save" }));
    assert!(!file.exists());
}

#[test]
fn reset_does_not_touch_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    fs::write(&file, r#"{"port": 1}"#).unwrap();
    let factory = SpecFactory::new();

    let server: Server = JsonFile::new(&file).open_spec(&factory).unwrap();
    server.instance().call("reset").unwrap();

    assert_eq!(server.port().unwrap(), Some(25565));
    assert_eq!(fs::read_to_string(&file).unwrap(), r#"{"port": 1}"#);
}

#[test]
fn reload_clears_memoized_values() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("server.json");
    fs::write(&file, r#"{"port": 1}"#).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let factory = SpecFactory::new();
    let spec = factory
        .build(
            SpecType::builder("Server")
                .method(MethodDescriptor::getter("get_port").default_value(80))
                .method(MethodDescriptor::action("reload").tag(Tag::Reload))
                .method(
                    MethodDescriptor::getter("describe")
                        .tag(Tag::Memoize)
                        .body(move |this, _| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            let port = this.get("get_port")?.unwrap_or_default();
                            Ok(Value::from(format!("port {}", port)))
                        }),
                ),
        )
        .unwrap();

    let server = JsonFile::new(&file).open(&factory, &spec).unwrap();
    assert_eq!(
        server.get("describe").unwrap(),
        Some(Value::from("port 1"))
    );

    fs::write(&file, r#"{"port": 2}"#).unwrap();
    server.call("reload").unwrap();
    assert_eq!(
        server.get("describe").unwrap(),
        Some(Value::from("port 2"))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
