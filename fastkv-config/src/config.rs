use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Environment variable not set: {0}")]
    MissingEnv(String),
    #[error("Invalid config value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub trait Configurable {
    fn config(&self) -> &serde_yaml::Value;

    /// Read a yaml config and resolve `$VAR` / `${VAR}` references in every string
    /// scalar from the process environment.
    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<serde_yaml::Value, ConfigError> {
        let content: String = fs::read_to_string(config_file_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&content)?;
        expand_env_values(config, &|name| std::env::var(name).ok())
    }

    /// Extract Value from config using dot notation i.e. "kv.store_id"
    fn get_config_value(&self, key: &str) -> Option<&serde_yaml::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(self.config(), |node, part| match node {
            serde_yaml::Value::Mapping(map) => map.get(part),
            _ => None,
        })
    }
}

/// Replace `$NAME` and `${NAME}` in `input` with the value returned by
/// `lookup`. A `$` not followed by a name is kept as is.
pub fn expand_env(
    input: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    shellexpand::env_with_context(input, |name| lookup(name).map(Some).ok_or(()))
        .map(|expanded| expanded.into_owned())
        .map_err(|e| ConfigError::MissingEnv(e.var_name))
}

/// Walk a yaml tree and run [`expand_env`] over every string scalar.
pub fn expand_env_values(
    value: serde_yaml::Value,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<serde_yaml::Value, ConfigError> {
    use serde_yaml::Value;

    Ok(match value {
        Value::String(s) => Value::String(expand_env(&s, lookup)?),
        Value::Sequence(seq) => Value::Sequence(
            seq.into_iter()
                .map(|v| expand_env_values(v, lookup))
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut expanded = serde_yaml::Mapping::with_capacity(map.len());
            for (k, v) in map {
                expanded.insert(k, expand_env_values(v, lookup)?);
            }
            Value::Mapping(expanded)
        }
        other => other,
    })
}
