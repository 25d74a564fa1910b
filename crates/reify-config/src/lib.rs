//! `reify.toml` loading: class manifests and logging setup.
//!
//! A manifest declares classes the way Java source would (type parameters plus field types as
//! type expressions). [`ReifyConfig::build_registry`] turns it into a validated
//! [`reify_types::ClassRegistry`].

use std::path::{Path, PathBuf};
use std::sync::Once;

use reify_types::{
    parse_declared_type, ClassDecl, ClassId, ClassRegistry, ParseError, RegistryError,
    TypeScope,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

/// Environment variable that overrides config discovery.
pub const REIFY_CONFIG_ENV_VAR: &str = "REIFY_CONFIG_PATH";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReifyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Classes to register, in any order.
    #[serde(default)]
    pub classes: Vec<ClassConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassConfig {
    /// Fully qualified class name, e.g. `com.example.Pair`.
    pub name: String,

    #[serde(default)]
    pub type_params: Vec<String>,

    /// Declared fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,

    /// Java-like type expression, e.g. `Map<String, List<T>>[]`.
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr. When disabled, logs are dropped.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            // Anything else is treated as an `EnvFilter` directive string.
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        })
    }

    /// Create the effective `EnvFilter`, merging `RUST_LOG` (if set) after the configured level.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid type for field `{class}.{field}`: {source}")]
    FieldType {
        class: String,
        field: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message and drop the source snippet `Display` would include.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl ReifyConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Build a registry holding the JDK built-ins plus every manifest class.
    ///
    /// Manifest classes are defined as one batch, so they may mention each other in any order,
    /// including cycles such as `Parent { Child child; }` and `Child { Parent parent; }`.
    pub fn build_registry(&self) -> Result<ClassRegistry, ConfigError> {
        let mut registry = ClassRegistry::with_java_lang();
        let ids = self
            .classes
            .iter()
            .map(|class| registry.intern_class_id(&class.name))
            .collect::<Vec<_>>();

        let decls = self
            .classes
            .iter()
            .zip(ids)
            .map(|(class, id)| parse_class(&registry, class, id))
            .collect::<Result<Vec<_>, _>>()?;
        registry.define_classes(decls)?;

        tracing::debug!(
            target: "reify.config",
            classes = self.classes.len(),
            "built class registry"
        );
        Ok(registry)
    }
}

fn parse_class(
    registry: &ClassRegistry,
    class: &ClassConfig,
    id: ClassId,
) -> Result<ClassDecl, ConfigError> {
    let scope = TypeScope::for_class(&class.name, id, &class.type_params);

    let mut decl = ClassDecl::new(class.name.clone());
    decl.type_params = class.type_params.clone();
    for field in &class.fields {
        let ty = parse_declared_type(registry, &scope, &field.ty).map_err(|source| {
            ConfigError::FieldType {
                class: class.name.clone(),
                field: field.name.clone(),
                source,
            }
        })?;
        decl = decl.field(field.name.clone(), ty);
    }
    Ok(decl)
}

/// Discover the config file for a workspace root.
///
/// Search order:
/// 1) `REIFY_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `reify.toml` in `workspace_root`
/// 3) `.reify.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(REIFY_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["reify.toml", ".reify.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the config for a workspace root.
///
/// If no config is present, returns [`ReifyConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(ReifyConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        tracing::debug!(
            target: "reify.config",
            root = %workspace_root.display(),
            "no reify.toml found; using defaults"
        );
        return Ok((ReifyConfig::default(), None));
    };

    let config = ReifyConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once; only the first call has any effect.
pub fn init_tracing(logging: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = logging.env_filter();
        let make_writer = if logging.stderr {
            // `cargo test` only captures output written through the stdlib print macros.
            if cfg!(debug_assertions) {
                BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
            } else {
                BoxMakeWriter::new(std::io::stderr)
            }
        } else {
            BoxMakeWriter::new(std::io::sink)
        };

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if logging.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::warn!(
                target: "reify.config",
                "a global tracing subscriber was already installed"
            );
        }
    });
}
