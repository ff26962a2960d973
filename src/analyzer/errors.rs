//! Analysis error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::analyzer::state::PodState;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Result type for analysis passes.
pub type Result<T> = std::result::Result<T, TargetError>;

/// Error raised while diffing installation state or building targets.
///
/// Every variant is a deterministic function of the input; nothing is
/// retried.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum TargetError {
    #[error("invalid package name `{name}`")]
    #[diagnostic(
        code(berth::analyze::invalid_name),
        help("Package names are a root name optionally followed by `/`-separated sub-unit names")
    )]
    InvalidName { name: String },

    #[error("`{name}` cannot be {requested}, it is already {existing}")]
    #[diagnostic(code(berth::analyze::conflicting_state))]
    ConflictingState {
        name: String,
        existing: PodState,
        requested: PodState,
    },

    #[error("target `{target}` does not declare a platform")]
    #[diagnostic(
        code(berth::analyze::missing_platform),
        help("Declare a platform on the target or one of its parents")
    )]
    MissingPlatform { target: String },

    #[error("`{pod}` has no library specifications in target `{target}`")]
    #[diagnostic(
        code(berth::analyze::no_library_specs),
        help("Depend on the package itself, not only on its test or app specifications")
    )]
    NoLibrarySpecs { pod: String, target: String },

    #[error("scope suffix `{suffix}` is produced by more than one variant of `{pod}`")]
    #[diagnostic(
        code(berth::analyze::duplicate_scope_suffix),
        help("Rename one of the sub-units so their names stay distinct once separators are collapsed")
    )]
    DuplicateScopeSuffix { pod: String, suffix: String },

    #[error("unable to find a target for `{dependency}` required by `{dependent}` on {platform}")]
    #[diagnostic(code(berth::analyze::unresolved_dependency))]
    UnresolvedDependency {
        dependent: String,
        dependency: String,
        platform: String,
    },

    #[error(
        "the sub-units of `{pod}` are linked to different build configurations for the `{target}` target (whitelisted for {configurations})",
        configurations = .whitelisted.join(", ")
    )]
    #[diagnostic(
        code(berth::analyze::configuration_conflict),
        help("Sub-units of one package must be enabled for the same build configurations")
    )]
    ConfigurationConflict {
        pod: String,
        target: String,
        /// The configuration the disagreement was detected for
        configuration: String,
        /// Configurations named by whitelists for the package
        whitelisted: Vec<String>,
    },
}

impl TargetError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TargetError::InvalidName { name } => Diagnostic::error(format!(
                "invalid package name `{}`",
                name
            ))
            .with_suggestion("Use `Root` or `Root/Sub` without empty segments"),

            TargetError::ConflictingState {
                name,
                existing,
                requested,
            } => Diagnostic::error(format!("conflicting install state for `{}`", name))
                .with_context(format!("already recorded as {}", existing))
                .with_context(format!("then recorded as {}", requested)),

            TargetError::MissingPlatform { target } => {
                Diagnostic::error(format!("target `{}` does not declare a platform", target))
                    .with_suggestion(suggestions::MISSING_PLATFORM)
            }

            TargetError::NoLibrarySpecs { pod, target } => Diagnostic::error(format!(
                "`{}` has no library specifications in target `{}`",
                pod, target
            ))
            .with_suggestion(format!("Add a dependency on `{}` to `{}`", pod, target)),

            TargetError::DuplicateScopeSuffix { pod, suffix } => Diagnostic::error(format!(
                "ambiguous target name for `{}`",
                pod
            ))
            .with_context(format!(
                "more than one variant would be named `{}-{}`",
                pod, suffix
            ))
            .with_suggestion(suggestions::CHECK_INPUT),

            TargetError::UnresolvedDependency {
                dependent,
                dependency,
                platform,
            } => Diagnostic::error(format!(
                "unable to find a target for `{}`",
                dependency
            ))
            .with_context(format!("required by `{}` on {}", dependent, platform))
            .with_suggestion(suggestions::MISSING_DEPENDENCY)
            .with_suggestion(suggestions::CHECK_INPUT),

            TargetError::ConfigurationConflict {
                pod,
                target,
                configuration,
                whitelisted,
            } => {
                Diagnostic::error(format!(
                    "the sub-units of `{}` are linked to different build configurations for the `{}` target (whitelisted for {})",
                    pod,
                    target,
                    whitelisted.join(", ")
                ))
                .with_context(format!("they disagree for `{}`", configuration))
                    .with_suggestion(suggestions::CONFIGURATION_CONFLICT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_conflict_names_whitelisted_configurations() {
        let err = TargetError::ConfigurationConflict {
            pod: "Foo".to_string(),
            target: "App".to_string(),
            configuration: "Debug".to_string(),
            whitelisted: vec!["Release".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("`Foo`"));
        assert!(output.contains("`App` target"));
        assert!(output.starts_with("error: the sub-units of `Foo`"));
        assert!(output.contains("target (whitelisted for Release)"));
        assert!(output.contains("they disagree for `Debug`"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_unresolved_dependency_message() {
        let err = TargetError::UnresolvedDependency {
            dependent: "Foo".to_string(),
            dependency: "Bar".to_string(),
            platform: "iOS 9.0".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "unable to find a target for `Bar` required by `Foo` on iOS 9.0"
        );
        assert!(err.to_diagnostic().format(false).contains("required by `Foo` on iOS 9.0"));
    }
}
