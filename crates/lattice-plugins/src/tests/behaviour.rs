//! Behaviour-driven tests for the plugin lifecycle.

use std::fs;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::builtin::{ECHO_COMMAND_CLASS, EchoCommandPlugin, EchoTransportPlugin};
use crate::descriptor::{PluginDescriptor, PluginFactory};
use crate::error::PluginError;
use crate::lifecycle::PluginState;
use crate::plugin::PluginKind;
use crate::registry::{CommandRegistry, DiscoveryReport, TransportRegistry};

use super::{Calls, Script, Step, scripted};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    commands: CommandRegistry,
    transports: TransportRegistry,
    kind: Option<PluginKind>,
    result: Option<Result<Value, PluginError>>,
    report: Option<DiscoveryReport>,
    root: Option<TempDir>,
    calls: Option<Arc<Calls>>,
}

impl TestWorld {
    fn kind(&self) -> PluginKind {
        self.kind.expect("no registry selected")
    }

    fn register(&self, descriptor: PluginDescriptor) {
        let outcome = match self.kind() {
            PluginKind::Command => self.commands.register(descriptor),
            PluginKind::Transport => self.transports.register(descriptor),
        };
        outcome.expect("register plugin");
    }

    fn status(&self, name: &str) -> Result<PluginState, PluginError> {
        match self.kind() {
            PluginKind::Command => self.commands.status(name),
            PluginKind::Transport => self.transports.status(name),
        }
    }

    fn result(&self) -> &Result<Value, PluginError> {
        self.result.as_ref().expect("no execution captured")
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("an empty command registry")]
fn given_command_registry(world: &mut TestWorld) {
    world.kind = Some(PluginKind::Command);
}

#[given("an empty transport registry")]
fn given_transport_registry(world: &mut TestWorld) {
    world.kind = Some(PluginKind::Transport);
}

#[given("a tracked plugin {name}")]
fn given_tracked_plugin(world: &mut TestWorld, name: String) {
    let (descriptor, calls) = scripted(unquote(&name), world.kind(), Script::default());
    world.register(descriptor);
    world.calls = Some(calls);
}

#[given("a plugin {name} whose execute panics")]
fn given_panicking_plugin(world: &mut TestWorld, name: String) {
    let script = Script {
        execute: Step::Panic,
        ..Script::default()
    };
    let (descriptor, _) = scripted(unquote(&name), world.kind(), script);
    world.register(descriptor);
}

#[given("a discovery root with a valid plugin {name}")]
fn given_valid_candidate(world: &mut TestWorld, name: String) {
    let root = world
        .root
        .get_or_insert_with(|| TempDir::new().expect("temp dir"));
    let dir_name = format!("{}_plugin", unquote(&name));
    let dir = root.path().join(&dir_name);
    fs::create_dir_all(&dir).expect("create plugin dir");
    fs::write(
        dir.join(format!("{dir_name}.yml")),
        format!("classes: [{ECHO_COMMAND_CLASS}]\n"),
    )
    .expect("write main module");
}

#[given("a candidate {name} without a main module")]
fn given_broken_candidate(world: &mut TestWorld, name: String) {
    let root = world
        .root
        .get_or_insert_with(|| TempDir::new().expect("temp dir"));
    fs::create_dir_all(root.path().join(format!("{}_plugin", unquote(&name))))
        .expect("create plugin dir");
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("plugin {name} is registered")]
fn when_registered(world: &mut TestWorld, name: String) {
    let kind = world.kind();
    let factory = match kind {
        PluginKind::Command => PluginFactory::of::<EchoCommandPlugin>(),
        PluginKind::Transport => PluginFactory::of::<EchoTransportPlugin>(),
    };
    world.register(PluginDescriptor::new(unquote(&name), kind, factory));
}

#[when("plugin {name} is executed with {input}")]
fn when_executed(world: &mut TestWorld, name: String, input: String) {
    let name = unquote(&name);
    let input = json!(unquote(&input));
    let result = match world.kind() {
        PluginKind::Command => world.commands.execute(name, &input),
        PluginKind::Transport => world.transports.execute(name, &input),
    };
    world.result = Some(result);
}

#[when("plugin {name} is deregistered")]
fn when_deregistered(world: &mut TestWorld, name: String) {
    let name = unquote(&name);
    let outcome = match world.kind() {
        PluginKind::Command => world.commands.deregister(name),
        PluginKind::Transport => world.transports.deregister(name),
    };
    outcome.expect("deregister plugin");
}

#[when("the registry discovers the root")]
fn when_discovered(world: &mut TestWorld) {
    let root = world.root.as_ref().expect("no discovery root");
    let report = match world.kind() {
        PluginKind::Command => world.commands.discover(root.path()),
        PluginKind::Transport => world.transports.discover(root.path()),
    };
    world.report = Some(report.expect("discovery root is readable"));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("plugin {name} is in state {state}")]
fn then_state(world: &mut TestWorld, name: String, state: String) {
    let actual = world.status(unquote(&name)).expect("plugin is registered");
    assert_eq!(actual.as_str(), unquote(&state));
}

#[then("plugin {name} is not found")]
fn then_not_found(world: &mut TestWorld, name: String) {
    let error = world
        .status(unquote(&name))
        .expect_err("plugin should be gone");
    assert!(
        matches!(error, PluginError::NotFound { .. }),
        "expected NotFound, got: {error}"
    );
}

#[then("the result is {expected}")]
fn then_result(world: &mut TestWorld, expected: String) {
    let output = world
        .result()
        .as_ref()
        .expect("expected success but got error");
    assert_eq!(output, &json!(unquote(&expected)));
}

#[then("the execution fails during {hook}")]
fn then_execution_fails(world: &mut TestWorld, hook: String) {
    let error = world
        .result()
        .as_ref()
        .expect_err("expected error but got success");
    match error {
        PluginError::Execution { hook: failed, .. } => {
            assert_eq!(failed.as_str(), unquote(&hook));
        }
        other => panic!("expected an execution failure, got: {other}"),
    }
}

#[then("{count} plugin(s) are registered")]
fn then_registered_count(world: &mut TestWorld, count: usize) {
    let report = world.report.as_ref().expect("no discovery report");
    assert_eq!(
        report.registered.len(),
        count,
        "registered: {:?}",
        report.registered
    );
}

#[then("{count} discovery failure(s) are reported")]
fn then_failure_count(world: &mut TestWorld, count: usize) {
    let report = world.report.as_ref().expect("no discovery report");
    assert_eq!(report.failures.len(), count);
}

#[then("the plugin shut down once")]
fn then_shut_down_once(world: &mut TestWorld) {
    let calls = world.calls.as_ref().expect("no tracked plugin");
    assert_eq!(Calls::count(&calls.shutdown), 1);
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/plugin_lifecycle.feature", name = "Transport plugins are initialised at registration")]
fn transports_initialise_at_registration(world: TestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/plugin_lifecycle.feature", name = "Command plugins stay registered until first use")]
fn commands_initialise_on_first_use(world: TestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/plugin_lifecycle.feature", name = "A failing plugin does not affect its neighbours")]
fn faults_stay_with_their_plugin(world: TestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/plugin_lifecycle.feature", name = "Discovery registers valid plugins and reports broken ones")]
fn discovery_reports_broken_candidates(world: TestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/plugin_lifecycle.feature", name = "Deregistration shuts an initialised plugin down")]
fn deregistration_shuts_plugin_down(world: TestWorld) {
    let _ = world;
}
