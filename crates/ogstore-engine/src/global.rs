use std::sync::OnceLock;

use ogstore_core::GlobalConfig;

static CONFIG: OnceLock<GlobalConfig> = OnceLock::new();

/// The process-wide runtime configuration, lazily created on first access.
#[must_use]
pub fn config() -> &'static GlobalConfig {
    CONFIG.get_or_init(GlobalConfig::new)
}

pub fn config_warns_on_duplicate_unique() -> bool {
    config().warns_on_duplicate_unique()
}

pub fn config_logs_merge_debug() -> bool {
    config().logs_merge_debug()
}
