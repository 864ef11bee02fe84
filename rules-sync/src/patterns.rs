//! Glob-style path classification for sync candidates.
//!
//! Two file classes matter to the orchestrator:
//! - **rule files** — IDE/assistant rule configs (`.cursor/rules/**`,
//!   `.cursorrules`, copilot instructions, `.kody/rules/**`, ...);
//! - **manifest files** — dependency descriptors used by the fast-path
//!   fallback when a repository has few or no explicit rule files.
//!
//! Patterns are a set with OR semantics; leading slashes are normalized away
//! on both sides before comparison.

use globset::GlobBuilder;
use tracing::warn;

use crate::types::ConfiguredDirectory;

/// Default glob set identifying rule files across supported IDE formats.
pub fn default_rule_file_patterns() -> Vec<String> {
    [
        ".cursorrules",
        ".cursor/rules/**",
        "**/.cursor/rules/**",
        ".windsurfrules",
        ".clinerules",
        ".clinerules/**",
        ".github/copilot-instructions.md",
        ".kody/rules/**",
        "**/*.mdc",
        "CONTRIBUTING.md",
        "AGENTS.md",
        "CLAUDE.md",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Dependency-manifest file names recognized by the fast-path fallback.
pub const MANIFEST_FILENAMES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "go.mod",
    "go.sum",
    "Cargo.toml",
    "Cargo.lock",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "Gemfile",
    "Gemfile.lock",
    "composer.json",
    "composer.lock",
];

/// True if the path's file name is a known dependency manifest.
pub fn is_manifest_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    MANIFEST_FILENAMES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(name))
}

/// Case-sensitive variant: true iff any pattern matches the path.
pub fn matches_any(path: &str, patterns: &[String]) -> bool {
    matches_impl(path, patterns, true)
}

/// Case-insensitive variant (rule file names vary in casing across repos).
pub fn matches_any_ci(path: &str, patterns: &[String]) -> bool {
    matches_impl(path, patterns, false)
}

fn matches_impl(path: &str, patterns: &[String], case_sensitive: bool) -> bool {
    let path = path.trim_start_matches('/');
    patterns.iter().any(|pattern| {
        let pattern = pattern.trim_start_matches('/');
        match GlobBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .literal_separator(false)
            .build()
        {
            Ok(glob) => glob.compile_matcher().is_match(path),
            Err(e) => {
                warn!(pattern, error = %e, "invalid glob pattern, skipping");
                false
            }
        }
    })
}

/// Expands configured directories into globs owning their sub-trees.
pub fn directory_patterns(dirs: &[ConfiguredDirectory]) -> Vec<String> {
    dirs.iter()
        .map(|d| {
            let base = d.path.trim_start_matches('/').trim_end_matches('/');
            format!("{base}/**")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_semantics_over_pattern_set() {
        let patterns = vec![".cursor/rules/**".to_string(), "**/*.mdc".to_string()];
        assert!(matches_any(".cursor/rules/api.md", &patterns));
        assert!(matches_any("docs/style.mdc", &patterns));
        assert!(!matches_any("src/main.rs", &patterns));
    }

    #[test]
    fn leading_slash_is_normalized() {
        let patterns = vec!["/.cursorrules".to_string()];
        assert!(matches_any("/.cursorrules", &patterns));
        assert!(matches_any(".cursorrules", &patterns));
    }

    #[test]
    fn case_insensitive_variant() {
        let patterns = vec!["CONTRIBUTING.md".to_string()];
        assert!(!matches_any("contributing.MD", &patterns));
        assert!(matches_any_ci("contributing.MD", &patterns));
    }

    #[test]
    fn manifest_detection_by_file_name() {
        assert!(is_manifest_file("package.json"));
        assert!(is_manifest_file("backend/go.mod"));
        assert!(is_manifest_file("apps/web/Package.JSON"));
        assert!(!is_manifest_file("src/lib.rs"));
        assert!(!is_manifest_file("package.json.bak"));
    }

    #[test]
    fn directory_patterns_own_subtrees() {
        let dirs = vec![ConfiguredDirectory {
            id: "d1".into(),
            path: "/apps/app/".into(),
        }];
        let pats = directory_patterns(&dirs);
        assert!(matches_any("apps/app/.cursor/rules/x.md", &pats));
        assert!(!matches_any("libs/app/readme.md", &pats));
    }
}
