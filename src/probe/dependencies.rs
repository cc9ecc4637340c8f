//! Python library checks inside the conda environment
//!
//! Only a short, hand-picked list is checked. Probing every transitive
//! dependency produces false negatives for packages that do not import
//! under their distribution name.

use crate::exec::CommandRunner;
use crate::types::DependencyStatus;
use std::ffi::OsString;
use tracing::debug;

/// A python library demucs needs at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Distribution name shown to the user
    pub name: &'static str,
    /// Module name passed to `import`
    pub module: &'static str,
    pub critical: bool,
}

/// Libraries checked, in report order
pub const DEPENDENCIES: &[Dependency] = &[
    Dependency { name: "torch", module: "torch", critical: true },
    Dependency { name: "torchaudio", module: "torchaudio", critical: true },
    Dependency { name: "julius", module: "julius", critical: true },
    Dependency { name: "einops", module: "einops", critical: true },
    Dependency { name: "soundfile", module: "soundfile", critical: false },
    Dependency { name: "diffq", module: "diffq", critical: false },
    Dependency { name: "hydra-core", module: "hydra", critical: false },
    Dependency { name: "openunmix", module: "openunmix", critical: false },
];

/// Script that prints the module origin, exiting 1 when it cannot be found
pub fn import_probe_script(module: &str) -> String {
    format!(
        "import importlib.util, sys\nspec = importlib.util.find_spec('{module}')\nif spec is None:\n    sys.exit(1)\nprint(spec.origin)"
    )
}

/// Script that prints the module's `__version__`, or "unknown"
pub fn version_probe_script(module: &str) -> String {
    format!("import {module}\nprint(getattr({module}, '__version__', 'unknown'))")
}

/// Check one library; any failure counts as not installed
pub async fn check_dependency<R: CommandRunner>(
    runner: &R,
    env_name: &str,
    dependency: &Dependency,
) -> DependencyStatus {
    let installed = match runner
        .run_in_env(
            env_name,
            "python",
            &[OsString::from("-c"), OsString::from(import_probe_script(dependency.module))],
        )
        .await
    {
        Ok(output) => output.success(),
        Err(e) => {
            debug!("Import probe for {} failed: {}", dependency.name, e);
            false
        }
    };

    let version = if installed {
        match runner
            .run_in_env(
                env_name,
                "python",
                &[OsString::from("-c"), OsString::from(version_probe_script(dependency.module))],
            )
            .await
        {
            Ok(output) if output.success() => {
                let v = output.stdout.trim();
                (!v.is_empty()).then(|| v.to_string())
            }
            _ => None,
        }
    } else {
        None
    };

    DependencyStatus {
        name: dependency.name.to_string(),
        installed,
        version,
        critical: dependency.critical,
    }
}

/// Check every library in [`DEPENDENCIES`], in order
pub async fn check_dependencies<R: CommandRunner>(runner: &R, env_name: &str) -> Vec<DependencyStatus> {
    let mut results = Vec::with_capacity(DEPENDENCIES.len());
    for dependency in DEPENDENCIES {
        results.push(check_dependency(runner, env_name, dependency).await);
    }
    results
}
