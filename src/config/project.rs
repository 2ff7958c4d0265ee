use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "ada.toml";

/// Minimal project configuration from ada.toml.
///
/// ```toml
/// [parser]
/// path = "tools/aplparse"
///
/// [output]
/// prefix = "d"
/// keep_going = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Project {
    pub root_dir: PathBuf,
    /// Parser executable. Paths with a directory part are relative to the
    /// file's directory; bare names are looked up on `PATH`.
    pub parser: Option<PathBuf>,
    /// Prefix of output file names.
    pub prefix: Option<String>,
    /// Keep differentiating sibling dfns after a failure.
    pub keep_going: Option<bool>,
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::Config(format!(
            "'{}' must be true or false, found '{}'",
            key, other
        ))),
    }
}

impl Project {
    /// Load project from an ada.toml file.
    pub fn load(toml_path: &Path) -> Result<Project> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Error::Config(format!("cannot read '{}': {}", toml_path.display(), e))
        })?;
        let root_dir = toml_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let project = Self::parse(&content, root_dir)?;
        log::debug!("loaded {}", toml_path.display());
        Ok(project)
    }

    /// Section-aware minimal TOML parsing.
    pub fn parse(content: &str, root_dir: PathBuf) -> Result<Project> {
        let mut project = Project {
            root_dir,
            ..Project::default()
        };
        let mut current_section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            // Section headers: [parser], [output]
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                current_section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(Error::Config(format!("expected 'key = value', found '{}'", trimmed)));
            };
            let key = key.trim().trim_matches('"');
            let value = value.trim().trim_matches('"');

            match (current_section.as_str(), key) {
                ("parser", "path") => {
                    let path = PathBuf::from(value);
                    project.parser = Some(if path.components().count() > 1 {
                        project.root_dir.join(path)
                    } else {
                        path
                    });
                }
                ("output", "prefix") => project.prefix = Some(value.to_string()),
                ("output", "keep_going") => {
                    project.keep_going = Some(parse_bool("keep_going", value)?)
                }
                _ => log::warn!("ignoring unknown key '{}' in [{}]", key, current_section),
            }
        }

        Ok(project)
    }

    /// Try to find an ada.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// The configuration governing `input`, or defaults when there is none.
    pub fn for_input(input: &Path) -> Result<Project> {
        let start = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        match Self::find(start) {
            Some(path) => Self::load(&path),
            None => Ok(Project::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join(CONFIG_FILE);
        fs::write(
            &toml_path,
            "# ada settings\n[parser]\npath = \"tools/aplparse\"\n\n[output]\nprefix = \"grad_\"\nkeep_going = false\n",
        )
        .unwrap();

        let project = Project::load(&toml_path).unwrap();
        assert_eq!(project.root_dir, dir.path());
        assert_eq!(project.parser, Some(dir.path().join("tools/aplparse")));
        assert_eq!(project.prefix.as_deref(), Some("grad_"));
        assert_eq!(project.keep_going, Some(false));
    }

    #[test]
    fn test_bare_parser_name_is_left_for_path_lookup() {
        let project =
            Project::parse("[parser]\npath = \"aplparse\"\n", PathBuf::from("/proj")).unwrap();
        assert_eq!(project.parser, Some(PathBuf::from("aplparse")));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let project = Project::parse("", PathBuf::from(".")).unwrap();
        assert!(project.parser.is_none());
        assert!(project.prefix.is_none());
        assert!(project.keep_going.is_none());
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let err = Project::parse("[output]\nkeep_going = maybe\n", PathBuf::new()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{}", err);
        let err = Project::parse("[output]\nprefix\n", PathBuf::new()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{}", err);
    }

    #[test]
    fn test_find_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[output]\nprefix = \"d\"\n").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Project::find(&nested), Some(dir.path().join(CONFIG_FILE)));

        let project = Project::for_input(&nested.join("net.apl")).unwrap();
        assert_eq!(project.prefix.as_deref(), Some("d"));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = Project::load(Path::new("/nonexistent/ada.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
