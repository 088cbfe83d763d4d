//! Environment variables contributed by the capture front end.

use std::collections::BTreeMap;

use crate::util::config::CaptureConfig;

/// Results directory the wrappers write into.
pub const RESULTS_DIR_VAR: &str = "FCP_RESULTS_DIR";

/// Extra front-end arguments, space separated.
pub const FRONTEND_ARGS_VAR: &str = "FCP_FRONTEND_ARGS";

/// Set to `1` when the session runs in debug mode.
pub const DEBUG_MODE_VAR: &str = "FCP_DEBUG_MODE";

/// Produces environment overlay entries from a configuration.
pub trait EnvSupplier {
    fn env_vars(&self, config: &CaptureConfig) -> BTreeMap<String, String>;
}

/// The default supplier used by the `xcapture` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontendEnv;

impl EnvSupplier for FrontendEnv {
    fn env_vars(&self, config: &CaptureConfig) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();

        if let Some(ref dir) = config.results_dir {
            vars.insert(RESULTS_DIR_VAR.to_string(), dir.display().to_string());
        }

        if !config.frontend_args.is_empty() {
            vars.insert(
                FRONTEND_ARGS_VAR.to_string(),
                config.frontend_args.join(" "),
            );
        }

        if config.debug {
            vars.insert(DEBUG_MODE_VAR.to_string(), "1".to_string());
        }

        // Explicit [env] entries come last
        vars.extend(config.env.clone());

        vars
    }
}
