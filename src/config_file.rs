use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_NAME: &str = ".jppbatchrc";
const APP_DIR: &str = "jumanpp-batch";
const RUN_SUBCOMMAND: &str = "run";

/// Configuration file handler for jumanpp-batch
#[derive(Debug, Default)]
pub struct ConfigFile {
    /// Arguments inserted ahead of the user's `run` arguments
    pub defaults: Option<String>,
}

impl ConfigFile {
    /// Find project-level .jppbatchrc by walking up directory tree
    pub fn find_project_config() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;
        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !current.pop() {
                break;
            }
        }
        None
    }

    /// Get list of user config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(windows) {
            if let Ok(appdata) = env::var("APPDATA") {
                paths.push(PathBuf::from(appdata).join(APP_DIR).join("config.ini"));
            }
            if let Ok(userprofile) = env::var("USERPROFILE") {
                paths.push(PathBuf::from(userprofile).join(PROJECT_CONFIG_NAME));
            }
        } else {
            // $XDG_CONFIG_HOME/jumanpp-batch/config.ini, then ~/.jppbatchrc
            let xdg_config = env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    env::var("HOME")
                        .map(|h| PathBuf::from(h).join(".config"))
                        .unwrap_or_else(|_| PathBuf::from(".config"))
                });
            paths.push(xdg_config.join(APP_DIR).join("config.ini"));

            if let Ok(home) = env::var("HOME") {
                paths.push(PathBuf::from(home).join(PROJECT_CONFIG_NAME));
            }
        }

        paths
    }

    /// Load configuration with proper precedence: project > user > defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::get_user_config_paths().into_iter().find(|p| p.exists()) {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        if let Some(project_path) = Self::find_project_config() {
            config = Self::merge_configs(config, Self::load_from_path(&project_path)?);
        }

        Ok(config)
    }

    /// Load configuration with optional custom config file path
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse_ini_content(&content))
    }

    fn parse_ini_content(content: &str) -> Self {
        let mut defaults = None;
        let mut in_root = true;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                in_root = false;
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                // Unknown keys and sections are ignored
                if in_root && key.trim() == "defaults" {
                    defaults = Some(value.trim().to_string());
                }
            }
        }

        Self { defaults }
    }

    /// Merge two configuration objects, with the second taking precedence
    fn merge_configs(base: Self, overlay: Self) -> Self {
        Self {
            defaults: overlay.defaults.or(base.defaults),
        }
    }

    /// Insert the configured defaults right after the `run` subcommand, so
    /// that arguments given on the command line still win.
    pub fn process_args(&self, args: Vec<String>) -> Result<Vec<String>> {
        let Some(defaults) = &self.defaults else {
            return Ok(args);
        };
        let Some(run_pos) = Self::subcommand_position(&args) else {
            return Ok(args);
        };
        if args[run_pos] != RUN_SUBCOMMAND {
            return Ok(args);
        }
        let default_args = shell_words::split(defaults)
            .with_context(|| "Invalid defaults: failed to parse arguments".to_string())?;

        let split_at = run_pos + 1;
        let mut result = args[..split_at].to_vec();
        result.extend(default_args);
        result.extend(args.into_iter().skip(split_at));
        Ok(result)
    }

    /// Index of the first positional argument after the global options
    fn subcommand_position(args: &[String]) -> Option<usize> {
        let mut i = 1;
        while i < args.len() {
            let arg = args[i].as_str();
            if arg == "--config-file" {
                i += 2;
            } else if arg.starts_with('-') {
                i += 1;
            } else {
                return Some(i);
            }
        }
        None
    }

    /// Show configuration information with precedence details
    pub fn show_config() {
        println!("Configuration precedence: CLI > project .jppbatchrc > user config\n");

        let project_config_path = Self::find_project_config();
        let user_config_paths = Self::get_user_config_paths();

        match Self::load() {
            Ok(config) => match &config.defaults {
                Some(defaults) => println!("Active defaults:\n  defaults = {}", defaults),
                None => println!("No defaults configured."),
            },
            Err(e) => eprintln!("Error loading configuration: {:#}", e),
        }

        println!("\nConfiguration search locations (in precedence order):");
        match &project_config_path {
            Some(path) => println!("  1. Project: {} (found)", path.display()),
            None => println!("  1. Project: {} (searched up directory tree, not found)", PROJECT_CONFIG_NAME),
        }
        for (i, path) in user_config_paths.iter().enumerate() {
            let status = if path.exists() { "(found)" } else { "(not found)" };
            println!("  {}. User: {} {}", i + 2, path.display(), status);
        }

        if project_config_path.is_none() && !user_config_paths.iter().any(|p| p.exists()) {
            println!("\nExample configuration file ({}):", PROJECT_CONFIG_NAME);
            println!();
            println!("# Arguments inserted after `run` on every invocation");
            println!("defaults = --command 'jumanpp --beam 5' --check-interval 500ms");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "; comment").unwrap();
        writeln!(file, "defaults = --workers 4 --command 'jumanpp --beam 5'").unwrap();
        writeln!(file, "[other]").unwrap();
        writeln!(file, "defaults = ignored").unwrap();
        file.flush().unwrap();

        let config = ConfigFile::load_from_path(file.path()).unwrap();
        assert_eq!(
            config.defaults.as_deref(),
            Some("--workers 4 --command 'jumanpp --beam 5'")
        );
    }

    #[test]
    fn test_process_args_inserts_defaults_after_subcommand() {
        let config = ConfigFile {
            defaults: Some("--workers 4 --command 'jumanpp --beam 5'".to_string()),
        };
        let result = config
            .process_args(args(&["jumanpp-batch", "run", "--workers", "2", "in.txt"]))
            .unwrap();
        assert_eq!(
            result,
            args(&[
                "jumanpp-batch",
                "run",
                "--workers",
                "4",
                "--command",
                "jumanpp --beam 5",
                "--workers",
                "2",
                "in.txt"
            ])
        );
    }

    #[test]
    fn test_process_args_only_touches_run() {
        let config = ConfigFile {
            defaults: Some("--workers 4".to_string()),
        };
        let result = config.process_args(args(&["jumanpp-batch"])).unwrap();
        assert_eq!(result, args(&["jumanpp-batch"]));

        let parse = args(&["jumanpp-batch", "parse", "0.txt"]);
        assert_eq!(config.process_args(parse.clone()).unwrap(), parse);

        let result = config
            .process_args(args(&["jumanpp-batch", "-v", "run", "in.txt"]))
            .unwrap();
        assert_eq!(
            result,
            args(&["jumanpp-batch", "-v", "run", "--workers", "4", "in.txt"])
        );
    }

    #[test]
    fn test_process_args_skips_global_option_values() {
        let config = ConfigFile {
            defaults: Some("--workers 4".to_string()),
        };

        let config_named_run = args(&["jumanpp-batch", "--config-file", "run", "parse", "0.txt"]);
        assert_eq!(
            config.process_args(config_named_run.clone()).unwrap(),
            config_named_run
        );

        let parse_run_file = args(&["jumanpp-batch", "parse", "run"]);
        assert_eq!(
            config.process_args(parse_run_file.clone()).unwrap(),
            parse_run_file
        );

        let result = config
            .process_args(args(&[
                "jumanpp-batch",
                "-vv",
                "--config-file",
                "c.ini",
                "--ignore-config",
                "run",
                "in.txt",
            ]))
            .unwrap();
        assert_eq!(
            result,
            args(&[
                "jumanpp-batch",
                "-vv",
                "--config-file",
                "c.ini",
                "--ignore-config",
                "run",
                "--workers",
                "4",
                "in.txt"
            ])
        );

        let result = config
            .process_args(args(&["jumanpp-batch", "--config-file=c.ini", "run"]))
            .unwrap();
        assert_eq!(
            result,
            args(&["jumanpp-batch", "--config-file=c.ini", "run", "--workers", "4"])
        );
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = ConfigFile {
            defaults: Some("--workers 1".into()),
        };
        let overlay = ConfigFile {
            defaults: Some("--workers 8".into()),
        };
        let merged = ConfigFile::merge_configs(base, overlay);
        assert_eq!(merged.defaults.as_deref(), Some("--workers 8"));

        let kept = ConfigFile::merge_configs(
            ConfigFile {
                defaults: Some("--workers 1".into()),
            },
            ConfigFile::default(),
        );
        assert_eq!(kept.defaults.as_deref(), Some("--workers 1"));
    }

    #[test]
    fn test_invalid_defaults_quoting() {
        let config = ConfigFile {
            defaults: Some("--command 'unterminated".into()),
        };
        assert!(config.process_args(args(&["x", "run"])).is_err());
    }
}
