//! Directory scoping: map a file path to the most specific configured
//! directory of the repository.
//!
//! A directory owns a file when the normalized file path equals the directory
//! path or continues past it at a `/` boundary (`apps/app` must not own
//! `apps/app1/...`). Among all owners the longest normalized path wins.

use crate::types::ConfiguredDirectory;

/// Normalizes to POSIX form: backslashes to slashes, no leading or trailing
/// slash.
fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches('/')
        .trim_end_matches('/')
        .to_string()
}

/// Resolves the configured directory owning `file_path`, if any.
///
/// Returns `None` when no directories are configured or none match; callers
/// treat that as "repository root scope", never as an error.
pub fn resolve_directory<'a>(
    dirs: &'a [ConfiguredDirectory],
    file_path: &str,
) -> Option<&'a ConfiguredDirectory> {
    let file = normalize(file_path);
    dirs.iter()
        .filter_map(|dir| {
            let dir_path = normalize(&dir.path);
            if dir_path.is_empty() {
                return None;
            }
            let owns = file == dir_path
                || (file.len() > dir_path.len()
                    && file.starts_with(&dir_path)
                    && file.as_bytes()[dir_path.len()] == b'/');
            owns.then_some((dir, dir_path.len()))
        })
        .max_by_key(|(_, len)| *len)
        .map(|(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(paths: &[(&str, &str)]) -> Vec<ConfiguredDirectory> {
        paths
            .iter()
            .map(|(id, path)| ConfiguredDirectory {
                id: id.to_string(),
                path: path.to_string(),
            })
            .collect()
    }

    #[test]
    fn longest_prefix_wins() {
        let dirs = dirs(&[("a", "apps/app"), ("b", "apps/app/sub")]);
        let hit = resolve_directory(&dirs, "apps/app/sub/file.ts").unwrap();
        assert_eq!(hit.id, "b");
    }

    #[test]
    fn segment_boundary_is_enforced() {
        let dirs = dirs(&[("a", "apps/app")]);
        assert!(resolve_directory(&dirs, "apps/app1/file.ts").is_none());
        assert!(resolve_directory(&dirs, "apps/app/file.ts").is_some());
    }

    #[test]
    fn exact_path_match_counts_as_owned() {
        let dirs = dirs(&[("a", "apps/app")]);
        assert!(resolve_directory(&dirs, "apps/app").is_some());
    }

    #[test]
    fn slashes_are_normalized_on_both_sides() {
        let dirs = dirs(&[("a", "/apps/app/")]);
        let hit = resolve_directory(&dirs, "\\apps\\app\\rules.md").unwrap();
        assert_eq!(hit.id, "a");
    }

    #[test]
    fn empty_config_resolves_to_none() {
        assert!(resolve_directory(&[], "apps/app/file.ts").is_none());
    }
}
