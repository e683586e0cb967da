//! Unit tests for plugin error types.

use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn not_found_error_message_includes_name() {
    let error = PluginError::not_found("table");
    let message = error.to_string();
    assert!(
        message.contains("table"),
        "expected name in message: {message}"
    );
    assert!(
        message.contains("not found"),
        "expected 'not found' in message: {message}"
    );
}

#[test]
fn execution_error_names_the_failing_hook() {
    let error = PluginError::Execution {
        name: "echo".into(),
        hook: LifecycleHook::BeforeExecute,
        message: "socket closed".into(),
        source: None,
    };
    let message = error.to_string();
    assert!(
        message.contains("before_execute"),
        "expected hook in message: {message}"
    );
    assert!(
        message.contains("socket closed"),
        "expected detail in message: {message}"
    );
}

#[test]
fn initialization_error_exposes_source() {
    let cause: SharedError = Arc::new(std::io::Error::other("endpoint refused"));
    let error = PluginError::Initialization {
        name: "subtensor".into(),
        message: "endpoint refused".into(),
        source: Some(cause),
    };
    let source = std::error::Error::source(&error).expect("source should be attached");
    assert!(source.to_string().contains("endpoint refused"));
}

#[rstest]
#[case::duplicate(PluginError::DuplicateName { name: "echo".into() }, Some("echo"))]
#[case::busy(PluginError::busy("echo"), Some("echo"))]
#[case::not_ready(PluginError::NotReady { name: "table".into() }, Some("table"))]
#[case::kind_mismatch(
    PluginError::KindMismatch {
        name: "axon".into(),
        expected: PluginKind::Command,
        found: PluginKind::Transport,
    },
    Some("axon")
)]
#[case::invalid(PluginError::InvalidDescriptor { message: "empty".into() }, None)]
#[case::internal(PluginError::internal("poisoned"), None)]
fn plugin_name_is_reported(#[case] error: PluginError, #[case] expected: Option<&str>) {
    assert_eq!(error.plugin_name(), expected);
}

#[test]
fn discovery_errors_pass_through_transparently() {
    let error = PluginError::from(DiscoveryError::MissingMainModule {
        name: "wallet".into(),
        expected: PathBuf::from("/plugins/wallet_plugin/wallet_plugin.yml"),
    });
    let message = error.to_string();
    assert!(
        message.contains("wallet_plugin.yml"),
        "expected path in message: {message}"
    );
    assert_eq!(error.plugin_name(), Some("wallet"));
}

#[test]
fn root_unreadable_has_no_plugin_name() {
    let error = DiscoveryError::RootUnreadable {
        path: PathBuf::from("/missing"),
        source: Arc::new(std::io::Error::other("gone")),
    };
    assert_eq!(error.plugin_name(), None);
}

#[test]
fn ambiguous_class_lists_candidates() {
    let error = DiscoveryError::AmbiguousClass {
        name: "axon".into(),
        candidates: vec!["AxonTransport".into(), "DendriteTransport".into()],
    };
    let message = error.to_string();
    assert!(
        message.contains("AxonTransport, DendriteTransport"),
        "expected candidates in message: {message}"
    );
}

#[test]
fn plugin_error_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PluginError>();
}
