//! Crate-level test support and BDD tests.
//!
//! [`ScriptedPlugin`] is a plugin whose every hook can be told to succeed,
//! fail, or panic. It records how often each hook ran so tests can assert on
//! lifecycle ordering and exactly-once guarantees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use lattice_config::PluginConfig;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::descriptor::{PluginDescriptor, PluginFactory};
use crate::plugin::{BoxError, Plugin, PluginKind};

mod behaviour;

/// Outcome of one scripted hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Step {
    #[default]
    Succeed,
    Fail,
    Panic,
}

impl Step {
    fn run(self, hook: &str) -> Result<(), BoxError> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail => Err(format!("{hook} refused").into()),
            Self::Panic => panic!("{hook} exploded"),
        }
    }
}

/// Behaviour of every hook of a [`ScriptedPlugin`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Script {
    pub(crate) initialize: Step,
    pub(crate) before: Step,
    pub(crate) execute: Step,
    pub(crate) after: Step,
    pub(crate) shutdown: Step,
    pub(crate) initialize_delay: Option<Duration>,
    pub(crate) execute_delay: Option<Duration>,
}

/// Hook invocation counters shared between a factory and its instances.
#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub(crate) instantiate: AtomicUsize,
    pub(crate) initialize: AtomicUsize,
    pub(crate) before: AtomicUsize,
    pub(crate) execute: AtomicUsize,
    pub(crate) after: AtomicUsize,
    pub(crate) shutdown: AtomicUsize,
    config: Mutex<Option<PluginConfig>>,
}

impl Calls {
    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Configuration seen by the most recent `initialize`.
    pub(crate) fn last_config(&self) -> Option<PluginConfig> {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) struct ScriptedPlugin {
    script: Script,
    calls: Arc<Calls>,
}

impl Plugin for ScriptedPlugin {
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
        self.calls.initialize.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .config
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        if let Some(delay) = self.script.initialize_delay {
            thread::sleep(delay);
        }
        self.script.initialize.run("initialize")
    }

    fn before_execute(&mut self, _input: &Value) -> Result<(), BoxError> {
        self.calls.before.fetch_add(1, Ordering::SeqCst);
        self.script.before.run("before_execute")
    }

    fn execute(&mut self, input: &Value, _ctx: &ExecutionContext) -> Result<Value, BoxError> {
        self.calls.execute.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.script.execute_delay {
            thread::sleep(delay);
        }
        self.script.execute.run("execute")?;
        Ok(input.clone())
    }

    fn after_execute(&mut self, _input: &Value, _output: &Value) -> Result<(), BoxError> {
        self.calls.after.fetch_add(1, Ordering::SeqCst);
        self.script.after.run("after_execute")
    }

    fn shutdown(&mut self) -> Result<(), BoxError> {
        self.calls.shutdown.fetch_add(1, Ordering::SeqCst);
        self.script.shutdown.run("shutdown")
    }
}

/// Factory producing [`ScriptedPlugin`]s that share one set of counters.
pub(crate) fn scripted_factory(script: Script) -> (PluginFactory, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let shared = Arc::clone(&calls);
    let factory = PluginFactory::new(move || {
        shared.instantiate.fetch_add(1, Ordering::SeqCst);
        ScriptedPlugin {
            script,
            calls: Arc::clone(&shared),
        }
    });
    (factory, calls)
}

/// Descriptor for a scripted plugin of the given kind.
pub(crate) fn scripted(
    name: &str,
    kind: PluginKind,
    script: Script,
) -> (PluginDescriptor, Arc<Calls>) {
    let (factory, calls) = scripted_factory(script);
    (PluginDescriptor::new(name, kind, factory), calls)
}
