//! Composition of the build command and its environment.
//!
//! Everything here is a pure function of its inputs: the ambient
//! environment is taken as a snapshot and never mutated.

use std::collections::BTreeMap;
use std::path::Path;

use super::WrapperPaths;

/// Variable through which the wrappers find the real compiler.
pub const REAL_COMPILER_VAR: &str = "FCP_APPLE_CLANG";

/// Build setting naming the C compiler.
pub const CC_SETTING: &str = "CC";

/// Build setting naming the C++ compiler.
pub const CXX_SETTING: &str = "CPLUSPLUS";

/// Build setting controlling the ProcessPCH phase.
///
/// Prefix headers precompiled by one clang are rejected by the other, so
/// the phase is turned off for captured builds.
pub const PCH_SETTING: &str = "GCC_PRECOMPILE_PREFIX_HEADER";

/// Names the front end may not set.
const PROTECTED_VARS: [&str; 4] = [REAL_COMPILER_VAR, CC_SETTING, CXX_SETTING, PCH_SETTING];

/// A process environment.
pub type Environment = BTreeMap<String, String>;

/// Snapshot the current process environment.
///
/// Variables whose name or value is not valid UTF-8 are left out of the
/// snapshot; the child still inherits them.
pub fn ambient_environment() -> Environment {
    std::env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::debug!("Skipping non-UTF-8 value of `{}` in snapshot", key);
                None
            }
            _ => None,
        })
        .collect()
}

/// The build command and environment handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedBuild {
    /// Program followed by its arguments, overrides last.
    pub command: Vec<String>,
    /// Full environment for the driver.
    pub env: Environment,
}

impl ComposedBuild {
    /// Value of `name` in the composed environment.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Variables that differ from `ambient`.
    pub fn overlay<'a>(
        &'a self,
        ambient: &'a Environment,
    ) -> impl Iterator<Item = (&'a String, &'a String)> {
        self.env
            .iter()
            .filter(move |(key, value)| ambient.get(*key) != Some(*value))
    }
}

/// Build the command line and environment for a captured build.
///
/// `frontend` entries win over `ambient` ones, except for the protected
/// names, which always carry the values set here.
pub fn compose(
    command: &[String],
    ambient: &Environment,
    compiler: &Path,
    wrappers: &WrapperPaths,
    frontend: &Environment,
) -> ComposedBuild {
    let overrides = [
        format!("{}={}", CC_SETTING, wrappers.c.display()),
        format!("{}={}", CXX_SETTING, wrappers.cxx.display()),
        format!("{}=NO", PCH_SETTING),
    ];

    let mut args = sanitize_command(command, &overrides);
    args.extend(overrides);

    let mut env = ambient.clone();
    env.insert(REAL_COMPILER_VAR.to_string(), compiler.display().to_string());

    for (key, value) in frontend {
        if PROTECTED_VARS.contains(&key.as_str()) {
            tracing::warn!("Ignoring front-end override of `{}`", key);
            continue;
        }
        env.insert(key.clone(), value.clone());
    }

    ComposedBuild { command: args, env }
}

/// Drop the build settings that one of `overrides` replaces.
///
/// The program name at position 0 is never touched.
fn sanitize_command(command: &[String], overrides: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(command.len() + overrides.len());
    let mut iter = command.iter();

    if let Some(program) = iter.next() {
        args.push(program.clone());
    }

    for arg in iter {
        match overriding(arg, overrides) {
            Some(replacement) => {
                tracing::warn!("Replacing build setting `{}` with `{}`", arg, replacement);
            }
            None => args.push(arg.clone()),
        }
    }

    args
}

/// The override that sets the same build setting as `arg`, if any.
fn overriding<'a>(arg: &str, overrides: &'a [String]) -> Option<&'a str> {
    let (key, _) = arg.split_once('=')?;
    overrides
        .iter()
        .map(String::as_str)
        .find(|o| o.split_once('=').map(|(k, _)| k) == Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrappers() -> WrapperPaths {
        WrapperPaths::new("/opt/capture/clang", "/opt/capture/clang++")
    }

    fn cmd(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_xcodebuild_target_scenario() {
        let composed = compose(
            &cmd(&["xcodebuild", "-target", "App"]),
            &env(&[("HOME", "/Users/dev")]),
            Path::new("/usr/bin/clang"),
            &wrappers(),
            &Environment::new(),
        );

        assert_eq!(
            composed.command,
            cmd(&[
                "xcodebuild",
                "-target",
                "App",
                "CC=/opt/capture/clang",
                "CPLUSPLUS=/opt/capture/clang++",
                "GCC_PRECOMPILE_PREFIX_HEADER=NO",
            ])
        );
        assert_eq!(composed.var(REAL_COMPILER_VAR), Some("/usr/bin/clang"));
        assert_eq!(composed.var("HOME"), Some("/Users/dev"));
    }

    #[test]
    fn test_exactly_one_override_of_each_role() {
        let composed = compose(
            &cmd(&[
                "xcodebuild",
                "CC=/usr/local/bin/gcc",
                "-scheme",
                "App",
                "CPLUSPLUS=g++",
                "GCC_PRECOMPILE_PREFIX_HEADER=YES",
            ]),
            &Environment::new(),
            Path::new("/Applications/Xcode.app/usr/bin/clang"),
            &wrappers(),
            &Environment::new(),
        );

        let count = |prefix: &str| {
            composed
                .command
                .iter()
                .filter(|a| a.starts_with(prefix))
                .count()
        };
        assert_eq!(count("CC="), 1);
        assert_eq!(count("CPLUSPLUS="), 1);
        assert_eq!(count("GCC_PRECOMPILE_PREFIX_HEADER="), 1);
        assert!(composed.command.contains(&"CC=/opt/capture/clang".to_string()));
        assert!(composed.command.contains(&"-scheme".to_string()));
    }

    #[test]
    fn test_overriding_names_replacement() {
        let overrides = cmd(&["CC=/opt/capture/clang", "GCC_PRECOMPILE_PREFIX_HEADER=NO"]);

        assert_eq!(
            overriding("CC=/usr/bin/gcc", &overrides),
            Some("CC=/opt/capture/clang")
        );
        assert_eq!(
            overriding("GCC_PRECOMPILE_PREFIX_HEADER=YES", &overrides),
            Some("GCC_PRECOMPILE_PREFIX_HEADER=NO")
        );
        assert_eq!(overriding("CCACHE=1", &overrides), None);
        assert_eq!(overriding("-target", &overrides), None);
    }

    #[test]
    fn test_unrelated_settings_are_kept() {
        let composed = compose(
            &cmd(&["xcodebuild", "CCACHE=1", "OTHER_CFLAGS=-DX=1"]),
            &Environment::new(),
            Path::new("/usr/bin/clang"),
            &wrappers(),
            &Environment::new(),
        );

        assert_eq!(&composed.command[1..3], &cmd(&["CCACHE=1", "OTHER_CFLAGS=-DX=1"])[..]);
    }

    #[test]
    fn test_real_compiler_var_replaces_ambient() {
        let composed = compose(
            &cmd(&["xcodebuild"]),
            &env(&[(REAL_COMPILER_VAR, "/stale/clang")]),
            Path::new("/usr/bin/clang"),
            &wrappers(),
            &Environment::new(),
        );

        assert_eq!(composed.var(REAL_COMPILER_VAR), Some("/usr/bin/clang"));
    }

    #[test]
    fn test_frontend_wins_over_ambient() {
        let composed = compose(
            &cmd(&["xcodebuild"]),
            &env(&[("FCP_RESULTS_DIR", "/ambient"), ("PATH", "/usr/bin")]),
            Path::new("/usr/bin/clang"),
            &wrappers(),
            &env(&[("FCP_RESULTS_DIR", "/frontend")]),
        );

        assert_eq!(composed.var("FCP_RESULTS_DIR"), Some("/frontend"));
        assert_eq!(composed.var("PATH"), Some("/usr/bin"));
    }

    #[test]
    fn test_frontend_cannot_touch_protected_names() {
        let composed = compose(
            &cmd(&["xcodebuild"]),
            &Environment::new(),
            Path::new("/usr/bin/clang"),
            &wrappers(),
            &env(&[
                (REAL_COMPILER_VAR, "/evil/clang"),
                ("CC", "/evil/cc"),
                ("CPLUSPLUS", "/evil/c++"),
                ("GCC_PRECOMPILE_PREFIX_HEADER", "YES"),
            ]),
        );

        assert_eq!(composed.var(REAL_COMPILER_VAR), Some("/usr/bin/clang"));
        assert_eq!(composed.var("CC"), None);
        assert_eq!(composed.var("CPLUSPLUS"), None);
        assert_eq!(composed.var("GCC_PRECOMPILE_PREFIX_HEADER"), None);
        assert!(composed
            .command
            .ends_with(&cmd(&["GCC_PRECOMPILE_PREFIX_HEADER=NO"])));
    }

    #[test]
    fn test_overlay_lists_changed_vars() {
        let ambient = env(&[("HOME", "/Users/dev"), ("FCP_DEBUG_MODE", "0")]);
        let composed = compose(
            &cmd(&["xcodebuild"]),
            &ambient,
            Path::new("/usr/bin/clang"),
            &wrappers(),
            &env(&[("FCP_DEBUG_MODE", "1")]),
        );

        let overlay: Vec<_> = composed.overlay(&ambient).map(|(k, _)| k.as_str()).collect();
        assert_eq!(overlay, vec!["FCP_APPLE_CLANG", "FCP_DEBUG_MODE"]);
    }

    #[test]
    fn test_ambient_snapshot_contains_process_vars() {
        let snapshot = ambient_environment();
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(snapshot.get("PATH"), Some(&path));
        }
    }
}
