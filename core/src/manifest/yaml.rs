use std::{
    env,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{
    database::postgres::query_builder::is_valid_table_name,
    helpers::load_env_from_config_path,
    manifest::core::{Manifest, UpdaterSettingsError},
};

pub const YAML_CONFIG_NAME: &str = "updater.yaml";

static ENV_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env variable pattern is valid"));

static COLUMN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("column pattern is valid"));

#[derive(thiserror::Error, Debug)]
pub enum ValidateManifestError {
    #[error("Table name {0:?} must be a plain identifier, optionally schema qualified")]
    InvalidTableName(String),

    #[error("Column name {0:?} must be a plain identifier")]
    InvalidColumnName(String),

    #[error("key_column and value_column must be different columns, both are {0:?}")]
    KeyAndValueColumnMustDiffer(String),

    #[error("value_template {0:?} must contain {{id}}")]
    ValueTemplateMissingId(String),

    #[error("Database url can not be empty")]
    DatabaseUrlEmpty,

    #[error("{0}")]
    InvalidSettings(#[from] UpdaterSettingsError),
}

fn validate_manifest(manifest: &Manifest) -> Result<(), ValidateManifestError> {
    if manifest.database.url.trim().is_empty() {
        return Err(ValidateManifestError::DatabaseUrlEmpty);
    }

    let target = &manifest.target;
    if !is_valid_table_name(&target.table) {
        return Err(ValidateManifestError::InvalidTableName(target.table.clone()));
    }

    for column in [&target.key_column, &target.value_column] {
        if !COLUMN_NAME.is_match(column) {
            return Err(ValidateManifestError::InvalidColumnName(column.clone()));
        }
    }

    if target.key_column.eq_ignore_ascii_case(&target.value_column) {
        return Err(ValidateManifestError::KeyAndValueColumnMustDiffer(target.key_column.clone()));
    }

    if !target.value_template.contains("{id}") {
        return Err(ValidateManifestError::ValueTemplateMissingId(target.value_template.clone()));
    }

    manifest.updater_settings()?;

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file {0}: {1}")]
    CouldNotOpenFile(PathBuf, std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Environment variable {0} referenced in the manifest is not set")]
    EnvironmentVariableNotFound(String),

    #[error("Could not validate manifest: {0}")]
    CouldNotValidateManifest(#[from] ValidateManifestError),
}

/// Replaces every `${VAR}` with its value from the environment.
///
/// Whole-line `#` comments are copied through untouched, so documentation in the file
/// can mention `${...}` without it having to be set.
fn substitute_env_variables(contents: &str) -> Result<String, ReadManifestError> {
    let mut missing: Option<String> = None;
    let mut result = String::with_capacity(contents.len());

    for line in contents.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let replaced = ENV_VARIABLE.replace_all(line, |caps: &Captures| {
            let var_name = &caps[1];
            match env::var(var_name) {
                Ok(val) => val,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });
        result.push_str(&replaced);
    }

    match missing {
        Some(var_name) => Err(ReadManifestError::EnvironmentVariableNotFound(var_name)),
        None => Ok(result),
    }
}

pub fn parse_manifest(contents: &str) -> Result<Manifest, ReadManifestError> {
    let contents = substitute_env_variables(contents)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

pub fn read_manifest(file_path: &Path) -> Result<Manifest, ReadManifestError> {
    let mut file = File::open(file_path)
        .map_err(|e| ReadManifestError::CouldNotOpenFile(file_path.to_path_buf(), e))?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)
        .map_err(|e| ReadManifestError::CouldNotOpenFile(file_path.to_path_buf(), e))?;

    load_env_from_config_path(file_path);

    parse_manifest(&contents)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const VALID: &str = r#"
database:
  url: postgres://localhost:5432/app
target:
  table: public.events
  key_column: code
  value_column: remarks
batch_size: 250
retry:
  min_backoff_ms: 5
  max_backoff_ms: 15
progress_interval_secs: 30
"#;

    #[test]
    fn test_parse_valid_manifest() {
        let manifest = parse_manifest(VALID).unwrap();

        assert_eq!(manifest.target.table, "public.events");
        assert_eq!(manifest.target.value_template, "updated #{id}");
        assert_eq!(manifest.batch_size, 250);
        assert_eq!(manifest.retry.max_backoff_ms, 15);
        assert_eq!(manifest.progress_interval_secs, 30);
        assert!(manifest.database.credentials().is_none());
    }

    #[test]
    fn test_substitutes_env_variables() {
        env::set_var("BULK_UPDATER_TEST_DB_USER", "writer");
        let yaml = VALID.replace(
            "  url: postgres://localhost:5432/app",
            "  url: postgres://localhost:5432/app\n  username: ${BULK_UPDATER_TEST_DB_USER}",
        );

        let manifest = parse_manifest(&yaml).unwrap();

        assert_eq!(manifest.database.credentials(), Some(("writer", None)));
    }

    #[test]
    fn test_comments_are_not_substituted() {
        let yaml = format!(
            "# set ${{BULK_UPDATER_TEST_ONLY_IN_COMMENT}} before running\n  # ${{ALSO_UNSET}}\n{VALID}"
        );

        let manifest = parse_manifest(&yaml).unwrap();
        assert_eq!(manifest.target.table, "public.events");
    }

    #[test]
    fn test_example_config_parses() {
        env::set_var("DB_USER", "example_user");
        env::set_var("DB_PASSWORD", "example_password");

        let manifest = parse_manifest(include_str!("../../../updater.example.yaml")).unwrap();

        assert_eq!(manifest.target.table, "sm1.events");
        assert_eq!(manifest.target.value_template, "updated #{id}");
        assert_eq!(manifest.batch_size, 1000);
        assert_eq!(
            manifest.database.credentials(),
            Some(("example_user", Some("example_password")))
        );
    }

    #[test]
    fn test_missing_env_variable_is_an_error() {
        let yaml = VALID.replace(
            "postgres://localhost:5432/app",
            "${BULK_UPDATER_TEST_DEFINITELY_UNSET}",
        );

        match parse_manifest(&yaml) {
            Err(ReadManifestError::EnvironmentVariableNotFound(name)) => {
                assert_eq!(name, "BULK_UPDATER_TEST_DEFINITELY_UNSET")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_sql_in_identifiers() {
        let yaml = VALID.replace("key_column: code", "key_column: code; DROP TABLE events");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::InvalidColumnName(_)
            ))
        ));

        let yaml = VALID.replace("table: public.events", "table: a.b.c");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::InvalidTableName(_)
            ))
        ));
    }

    #[test]
    fn test_rejects_same_key_and_value_column() {
        let yaml = VALID.replace("value_column: remarks", "value_column: code");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::KeyAndValueColumnMustDiffer(_)
            ))
        ));
    }

    #[test]
    fn test_rejects_key_and_value_column_differing_only_in_case() {
        let yaml = VALID.replace("value_column: remarks", "value_column: CODE");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::KeyAndValueColumnMustDiffer(_)
            ))
        ));
    }

    #[test]
    fn test_rejects_template_without_id() {
        let yaml =
            VALID.replace("value_column: remarks", "value_column: remarks\n  value_template: done");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::ValueTemplateMissingId(_)
            ))
        ));
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let yaml = VALID.replace("batch_size: 250", "batch_size: 0");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::InvalidSettings(UpdaterSettingsError::BatchSizeMustBePositive)
            ))
        ));

        let yaml = VALID.replace("min_backoff_ms: 5", "min_backoff_ms: 50");
        assert!(matches!(
            parse_manifest(&yaml),
            Err(ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::InvalidSettings(UpdaterSettingsError::InvalidBackoffRange(_))
            ))
        ));
    }

    #[test]
    fn test_read_manifest_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(YAML_CONFIG_NAME);
        let mut file = File::create(&path).unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.target.key_column, "code");

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            read_manifest(&missing),
            Err(ReadManifestError::CouldNotOpenFile(path, _)) if path == missing
        ));
    }

    #[test]
    fn test_read_manifest_loads_env_file_next_to_it() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "BULK_UPDATER_TEST_ENV_FILE_TABLE=audit_log\n")
            .unwrap();
        let path = dir.path().join(YAML_CONFIG_NAME);
        std::fs::write(
            &path,
            VALID.replace("table: public.events", "table: ${BULK_UPDATER_TEST_ENV_FILE_TABLE}"),
        )
        .unwrap();

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.target.table, "audit_log");
    }
}
