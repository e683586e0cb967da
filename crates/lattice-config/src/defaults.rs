use std::env;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the host.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory under the plugin root holding command plugins.
pub const COMMAND_PLUGIN_SUBDIR: &str = "commands";

/// Directory under the plugin root holding transport plugins.
pub const TRANSPORT_PLUGIN_SUBDIR: &str = "transports";

/// Default log filter expression used by the host.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the host.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Root directory that holds both plugin trees.
///
/// Resolves to `<data_dir>/lattice/plugins`, falling back to the temporary
/// directory when the platform has no data directory or the path is not
/// valid UTF-8.
#[must_use]
pub fn default_plugin_root() -> Utf8PathBuf {
    let mut base = dirs::data_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.push("lattice");
    base.push("plugins");
    base
}

/// Default directory scanned for command plugins.
#[must_use]
pub fn default_command_plugin_dir() -> Utf8PathBuf {
    default_plugin_root().join(COMMAND_PLUGIN_SUBDIR)
}

/// Default directory scanned for transport plugins.
#[must_use]
pub fn default_transport_plugin_dir() -> Utf8PathBuf {
    default_plugin_root().join(TRANSPORT_PLUGIN_SUBDIR)
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_dirs_share_the_root() {
        let root = default_plugin_root();
        assert_eq!(default_command_plugin_dir(), root.join("commands"));
        assert_eq!(default_transport_plugin_dir(), root.join("transports"));
    }

    #[test]
    fn plugin_root_is_namespaced() {
        let root = default_plugin_root();
        assert!(root.ends_with("lattice/plugins"), "unexpected root: {root}");
    }
}
