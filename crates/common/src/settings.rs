//! Suite settings
//!
//! Settings are read once at startup from layered YAML documents plus
//! `CMDPARITY_*` environment overrides, validated, and then passed by
//! reference to everything that needs them.
//!
//! Layer order (later wins):
//!
//! 1. `conf/*.yaml`, sorted by file name
//! 2. `settings.yaml`
//! 3. `settings.local.yaml`, `.secrets.yaml`, `.secrets_*.yaml`
//! 4. `CMDPARITY_<SECTION>__<KEY>` environment variables
//!
//! All keys are lowercased before merging.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CMDPARITY_";

/// Environment variable naming the settings root directory
pub const ROOT_DIR_ENV: &str = "CMDPARITY_DIR";

const SETTINGS_FILE: &str = "settings.yaml";
const PRELOAD_DIR: &str = "conf";
const INCLUDES: [&str; 2] = ["settings.local.yaml", ".secrets.yaml"];
const SECRETS_GLOB_PREFIX: &str = ".secrets_";

const KNOWN_SECTIONS: [&str; 4] = ["server", "suite", "hammer", "issues"];

/// Effective suite settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server under test
    pub server: ServerSettings,

    /// Runner paths and behaviour
    pub suite: SuiteSettings,

    /// Hammer parity check
    pub hammer: HammerSettings,

    /// Known-issue lookups
    pub issues: IssueSettings,

    #[serde(skip)]
    root_dir: PathBuf,

    #[serde(skip)]
    sections: BTreeSet<String>,
}

/// Connection details for the server under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub hostname: Option<String>,
    pub scheme: String,
    pub port: Option<u16>,
    pub admin_username: String,
    pub admin_password: String,
    pub verify_ca: bool,
    pub ssh_username: String,
    pub ssh_port: u16,
    pub ssh_key_path: Option<PathBuf>,
    pub ssh_connect_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            hostname: None,
            scheme: "https".to_string(),
            port: None,
            admin_username: "admin".to_string(),
            admin_password: String::new(),
            verify_ca: false,
            ssh_username: "root".to_string(),
            ssh_port: 22,
            ssh_key_path: None,
            ssh_connect_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteSettings {
    /// Scratch directory, created on load
    pub tmp_dir: PathBuf,

    /// Static test data (reference trees, key material)
    pub data_dir: PathBuf,

    /// Where `test-results.json` is written
    pub results_dir: PathBuf,

    /// Log validation failures instead of refusing to start
    pub ignore_validation_errors: bool,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from("tmp"),
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("test-results"),
            ignore_validation_errors: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HammerSettings {
    /// Program name on the server, also the root of the command tree
    pub program: String,

    /// Reference command tree (JSON)
    pub reference_file: PathBuf,

    pub walk_strategy: WalkStrategy,
}

impl Default for HammerSettings {
    fn default() -> Self {
        Self {
            program: "hammer".to_string(),
            reference_file: PathBuf::from("data/hammer_commands.json"),
            walk_strategy: WalkStrategy::default(),
        }
    }
}

/// How the live command tree is discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalkStrategy {
    /// One `full-help` round-trip, split into per-command blocks
    #[default]
    FullHelp,
    /// One `--help` round-trip per command, depth first
    Recursive,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueSettings {
    pub backend: IssueBackend,

    /// Issue ids considered open by the static backend, e.g. `BZ:1666687`
    pub open: Vec<String>,

    pub bugzilla_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueBackend {
    #[default]
    Static,
    Bugzilla,
}

/// A single failed validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub key: String,
    pub message: String,
}

/// Outcome of [`Settings::validate`]
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, key: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            key: key.to_string(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "  - {}: {}", error.key, error.message)?;
        }
        Ok(())
    }
}

impl Settings {
    /// Root directory from `CMDPARITY_DIR`, falling back to the current directory
    pub fn root_from_env() -> PathBuf {
        std::env::var_os(ROOT_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load, validate and prepare settings rooted at `root`
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_with_env(root, std::env::vars())
    }

    /// Like [`Settings::load`] with an explicit set of environment variables
    pub fn load_with_env<I>(root: &Path, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if !root.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "settings root {} is not a directory",
                root.display()
            )));
        }

        let mut document = layered_document(root)?;
        apply_env(&mut document, env);

        let sections = match &document {
            Value::Mapping(map) => map
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
            _ => BTreeSet::new(),
        };

        let mut settings: Settings = serde_yaml::from_value(document)?;
        settings.root_dir = root.to_path_buf();
        settings.sections = sections;

        let settings = settings.checked()?;
        std::fs::create_dir_all(settings.tmp_dir())?;
        Ok(settings)
    }

    /// Use `root` to resolve relative paths
    pub fn with_root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = root.into();
        self
    }

    fn checked(self) -> Result<Self> {
        let report = self.validate();
        if report.is_ok() {
            return Ok(self);
        }
        if self.suite.ignore_validation_errors {
            warn!("Settings validation failed with\n{}", report);
            Ok(self)
        } else {
            Err(Error::Validation(report))
        }
    }

    /// Check every rule and collect the failures
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.server.hostname.as_deref().map_or(true, |h| h.trim().is_empty()) {
            report.push("server.hostname", "must be set");
        }
        if !matches!(self.server.scheme.as_str(), "http" | "https") {
            report.push(
                "server.scheme",
                format!("must be http or https, got '{}'", self.server.scheme),
            );
        }
        if self.server.ssh_port == 0 {
            report.push("server.ssh_port", "must be non-zero");
        }
        if self.hammer.program.trim().is_empty() {
            report.push("hammer.program", "must not be empty");
        }
        if self.issues.backend == IssueBackend::Bugzilla && self.issues.bugzilla_url.is_none() {
            report.push("issues.bugzilla_url", "required by the bugzilla backend");
        }

        report
    }

    /// Whether an optional section was provided by any layer
    pub fn setting_is_set(&self, section: &str) -> Result<bool> {
        if !KNOWN_SECTIONS.contains(&section) {
            return Err(Error::SettingNotFound(section.to_string()));
        }
        Ok(self.sections.contains(section))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Resolve a configured path against the settings root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.resolve(&self.suite.tmp_dir)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.suite.data_dir)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.resolve(&self.suite.results_dir)
    }

    pub fn reference_file(&self) -> PathBuf {
        self.resolve(&self.hammer.reference_file)
    }

    /// Copy with secrets replaced, for display
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if !copy.server.admin_password.is_empty() {
            copy.server.admin_password = "********".to_string();
        }
        copy
    }
}

fn layered_document(root: &Path) -> Result<Value> {
    let mut merged = Value::Mapping(Mapping::new());

    for path in layer_files(root) {
        debug!("Loading settings layer {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        let layer: Value = serde_yaml::from_str(&content)?;
        if layer.is_null() {
            continue;
        }
        if !layer.is_mapping() {
            return Err(Error::InvalidConfig(format!(
                "{} must contain a mapping at the top level",
                path.display()
            )));
        }
        merge_values(&mut merged, lowercase_keys(layer));
    }

    Ok(merged)
}

fn layer_files(root: &Path) -> Vec<PathBuf> {
    let mut files = yaml_files_in(&root.join(PRELOAD_DIR), |_| true);

    let main = root.join(SETTINGS_FILE);
    if main.is_file() {
        files.push(main);
    }

    for include in INCLUDES {
        let path = root.join(include);
        if path.is_file() {
            files.push(path);
        }
    }

    files.extend(yaml_files_in(root, |name| name.starts_with(SECRETS_GLOB_PREFIX)));
    files
}

fn yaml_files_in(dir: &Path, accept: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    walkdir::WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.ends_with(".yaml") && accept(&name)
        })
        .map(|e| e.into_path())
        .collect()
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                let nested = value.is_mapping() && base_map.get(&key).map_or(false, Value::is_mapping);
                if !nested {
                    base_map.insert(key, value);
                } else if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env<I>(document: &mut Value, env: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, raw) in env {
        if name == ROOT_DIR_ENV {
            continue;
        }
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let path: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
        if path.iter().any(String::is_empty) {
            warn!("Ignoring malformed settings override {}", name);
            continue;
        }

        // Scalars follow YAML typing; quote a value to force a string.
        let value = serde_yaml::from_str::<Value>(&raw).unwrap_or_else(|_| Value::String(raw.clone()));
        debug!("Settings override from {}", name);
        insert_path(document, &path, value);
    }
}

fn insert_path(document: &mut Value, path: &[String], value: Value) {
    let mut cursor = document;
    for segment in path {
        if !cursor.is_mapping() {
            *cursor = Value::Mapping(Mapping::new());
        }
        let map = match cursor {
            Value::Mapping(map) => map,
            _ => return,
        };
        cursor = map
            .entry(Value::String(segment.clone()))
            .or_insert(Value::Null);
    }
    *cursor = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_defaults_apply_when_keys_missing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "settings.yaml", "server:\n  hostname: sat.example.com\n");

        let settings = Settings::load_with_env(dir.path(), no_env()).unwrap();
        assert_eq!(settings.server.hostname.as_deref(), Some("sat.example.com"));
        assert_eq!(settings.server.scheme, "https");
        assert_eq!(settings.hammer.program, "hammer");
        assert_eq!(settings.hammer.walk_strategy, WalkStrategy::FullHelp);
        assert!(settings.tmp_dir().is_dir());
    }

    #[test]
    fn test_layers_merge_in_order() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "conf/server.yaml",
            "SERVER:\n  hostname: from-conf\n  admin_username: conf-admin\n",
        );
        write(dir.path(), "settings.yaml", "server:\n  hostname: from-settings\n");
        write(dir.path(), "settings.local.yaml", "server:\n  port: 8443\n");
        write(dir.path(), ".secrets_ci.yaml", "server:\n  admin_password: hunter2\n");

        let settings = Settings::load_with_env(dir.path(), no_env()).unwrap();
        assert_eq!(settings.server.hostname.as_deref(), Some("from-settings"));
        assert_eq!(settings.server.admin_username, "conf-admin");
        assert_eq!(settings.server.port, Some(8443));
        assert_eq!(settings.server.admin_password, "hunter2");
    }

    #[test]
    fn test_env_overrides_win() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "settings.yaml", "server:\n  hostname: from-file\n");

        let env = vec![
            ("CMDPARITY_SERVER__HOSTNAME".to_string(), "from-env".to_string()),
            ("CMDPARITY_SERVER__SSH_PORT".to_string(), "2222".to_string()),
            ("CMDPARITY_HAMMER__WALK_STRATEGY".to_string(), "recursive".to_string()),
            ("CMDPARITY_DIR".to_string(), "/elsewhere".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let settings = Settings::load_with_env(dir.path(), env).unwrap();
        assert_eq!(settings.server.hostname.as_deref(), Some("from-env"));
        assert_eq!(settings.server.ssh_port, 2222);
        assert_eq!(settings.hammer.walk_strategy, WalkStrategy::Recursive);
    }

    #[test]
    fn test_validation_failure_is_fatal_by_default() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "settings.yaml", "server:\n  scheme: ftp\n");

        let err = Settings::load_with_env(dir.path(), no_env()).unwrap_err();
        match err {
            Error::Validation(report) => {
                let keys: Vec<_> = report.errors.iter().map(|e| e.key.as_str()).collect();
                assert_eq!(keys, vec!["server.hostname", "server.scheme"]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_validation_failure_can_be_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "settings.yaml", "suite:\n  ignore_validation_errors: true\n");

        let settings = Settings::load_with_env(dir.path(), no_env()).unwrap();
        assert!(settings.server.hostname.is_none());
        assert!(!settings.validate().is_ok());
    }

    #[test]
    fn test_setting_is_set() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "settings.yaml", "server:\n  hostname: h\n");

        let settings = Settings::load_with_env(dir.path(), no_env()).unwrap();
        assert!(settings.setting_is_set("server").unwrap());
        assert!(!settings.setting_is_set("issues").unwrap());
        assert!(matches!(
            settings.setting_is_set("shared_function"),
            Err(Error::SettingNotFound(_))
        ));
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let settings = Settings::default().with_root_dir("/srv/suite");
        assert_eq!(
            settings.reference_file(),
            PathBuf::from("/srv/suite/data/hammer_commands.json")
        );
        assert_eq!(settings.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_masked_hides_password() {
        let mut settings = Settings::default();
        settings.server.admin_password = "secret".to_string();
        assert_eq!(settings.masked().server.admin_password, "********");
    }
}
