use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use toml::map::Entry;
use toml::{Table, Value};

/// Provides a layered builder for deserializing configuration files.
///
/// Tables from later layers are merged into earlier ones key by key, any
/// other value replaces what was there before.
#[must_use]
pub struct Builder {
    table: Result<Table>,
}

impl Builder {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self {
            table: Ok(Table::new()),
        }
    }

    /// Adds a layer of configuration.
    ///
    /// Layers added later take precedence over earlier ones.
    pub fn add_layer<L: Layer>(mut self, source: L) -> Self {
        self.table = self.table.and_then(|mut t| {
            source.extend_table(&mut t)?;
            Ok(t)
        });
        self
    }

    /// Deserializes the configuration from the provided layers.
    pub fn build<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.table.and_then(deserialize_table)
    }
}

/// A configuration layer.
pub trait Layer {
    /// Extends a TOML table by this layer.
    fn extend_table(&self, table: &mut Table) -> Result<()>;
}

/// A TOML file configuration layer.
#[must_use]
pub struct File {
    path: PathBuf,
    required: bool,
}

impl File {
    /// Creates a new layer, loading TOML from the file at the given path.
    ///
    /// The file is required by default.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self {
            path: PathBuf::from(path),
            required: true,
        }
    }

    /// Sets whether the file is required.
    ///
    /// If it is not required and does not exist, this layer is treated as
    /// empty. If it is required and does not exist, an error is raised.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// A TOML text configuration layer.
#[must_use]
pub struct TomlText<'a> {
    text: &'a str,
}

impl<'a> TomlText<'a> {
    /// Creates a new layer, parsing the text as TOML.
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

/// An environment variable configuration layer.
///
/// This loads every environment variable starting with a prefix. The prefix
/// is stripped and the remaining names are lowercased. Nested values can be
/// specified by using `__` (two underscores) as a separator, (i.e. with the
/// prefix `RPS__`, `RPS__DISCORD__TOKEN` will refer to `discord.token`).
///
/// Currently, all values are treated as strings. Values that are not fully
/// valid UTF-8 may be converted to UTF-8 with a lossy conversion.
#[must_use]
pub struct Env<'a> {
    prefix: &'a str,
}

impl<'a> Env<'a> {
    /// Creates a new layer reading variables that start with `prefix`.
    pub fn prefixed(prefix: &'a str) -> Self {
        Self { prefix }
    }
}

impl Layer for File {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let file = match fs::read_to_string(&self.path) {
            Ok(content) => deserialize_str_to_table(&content)
                .with_context(|| format!("failed to load config {:?}", self.path))?,
            Err(why) => {
                // on error, we definitely return and don't merge tables
                if !self.required && why.kind() == io::ErrorKind::NotFound {
                    return Ok(());
                }

                return Err(why).context(format!("cannot read required config {:?}", self.path));
            },
        };

        merge_tables(table, file);
        Ok(())
    }
}

impl Layer for TomlText<'_> {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let toml = deserialize_str_to_table(self.text).context("toml str literal invalid")?;
        merge_tables(table, toml);
        Ok(())
    }
}

impl Layer for Env<'_> {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        for (key, value) in env::vars_os() {
            // non-utf8 keys cannot possibly refer to anything that serde or toml allows as
            // keys so they can just be excluded
            let Ok(key) = key.into_string() else {
                continue;
            };

            let Some(key) = strip_prefix_ignore_case(&key, self.prefix) else {
                continue;
            };

            // excluding values based on them not being utf8 isn't super great for error
            // reporting later, so just use lossy conversion so that at least gets seen.
            let value = value
                .into_string()
                .unwrap_or_else(|o| o.to_string_lossy().into_owned());

            insert_env_var(table, key, value);
        }

        Ok(())
    }
}

fn strip_prefix_ignore_case<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    let head = key.get(..prefix.len())?;
    let rest = &key[prefix.len()..];
    (head.eq_ignore_ascii_case(prefix) && !rest.is_empty()).then_some(rest)
}

fn insert_env_var(table: &mut Table, key: &str, value: String) {
    let key = key.to_ascii_lowercase();
    let segments = key
        .split("__")
        .filter(|s| !s.is_empty())
        .collect::<SmallVec<[&str; 8]>>();

    if !segments.is_empty() {
        insert_at(table, &segments, Value::String(value));
    }
}

fn deserialize_str_to_table(text: &str) -> Result<Table> {
    toml::from_str(text).context("config toml is invalid")
}

fn deserialize_table<T>(table: Table) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(table).context("cannot deserialize config")
}

fn merge_tables(target: &mut Table, consume: Table) {
    for (key, value) in consume {
        match target.entry(key) {
            Entry::Vacant(entry) => _ = entry.insert(value),
            Entry::Occupied(mut entry) => match (entry.get_mut(), value) {
                (Value::Table(a), Value::Table(b)) => merge_tables(a, b),
                (a, b) => *a = b,
            },
        }
    }
}

fn insert_at(table: &mut Table, path: &[&str], value: Value) {
    let [first, path @ ..] = path else {
        panic!("path must have at least one segment");
    };

    match table.entry(first.to_owned()) {
        Entry::Vacant(entry) => _ = entry.insert(nested_value(path, value)),
        Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::Table(table) if !path.is_empty() => insert_at(table, path, value),
            entry => *entry = nested_value(path, value),
        },
    }
}

fn nested_value(path: &[&str], value: Value) -> Value {
    let [path @ .., last] = path else {
        return value;
    };

    let mut table = Table::new();
    let mut cur = &mut table;
    for &segment in path {
        cur = cur
            .entry(segment.to_owned())
            .or_insert(Value::Table(Table::new()))
            .as_table_mut()
            .expect("just inserted as a table");
    }

    cur.insert((*last).to_owned(), value);
    Value::Table(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Sample {
        discord: SampleDiscord,
        #[serde(default)]
        rounds: Option<u64>,
    }

    #[derive(Debug, serde::Deserialize)]
    struct SampleDiscord {
        token: String,
        status: Option<String>,
    }

    #[test]
    fn later_layers_win() {
        let sample: Sample = Builder::new()
            .add_layer(TomlText::new("rounds = 1\n[discord]\ntoken = \"a\"\nstatus = \"hi\""))
            .add_layer(TomlText::new("[discord]\ntoken = \"b\""))
            .build()
            .expect("layers must deserialize");

        assert_eq!(sample.discord.token, "b", "token must be overridden");
        assert_eq!(
            sample.discord.status.as_deref(),
            Some("hi"),
            "untouched keys of merged tables must be kept"
        );
        assert_eq!(sample.rounds, Some(1), "root keys must be kept");
    }

    #[test]
    fn missing_optional_file_is_empty() {
        let sample: Sample = Builder::new()
            .add_layer(TomlText::new("[discord]\ntoken = \"a\""))
            .add_layer(File::new("does_not_exist.rps_app.toml").required(false))
            .build()
            .expect("optional file must be skipped");

        assert_eq!(sample.discord.token, "a", "token must be kept");
    }

    #[test]
    fn missing_required_file_errors() {
        let res = Builder::new()
            .add_layer(File::new("does_not_exist.rps_app.toml"))
            .build::<Sample>();

        assert!(res.is_err(), "required file must be reported");
    }

    #[test]
    fn invalid_toml_errors() {
        let res = Builder::new()
            .add_layer(TomlText::new("[discord"))
            .build::<Sample>();

        assert!(res.is_err(), "invalid toml must be reported");
    }

    #[test]
    fn env_keys_are_nested() {
        let mut table = Table::new();
        insert_env_var(&mut table, "DISCORD__TOKEN", "tok".to_owned());
        insert_env_var(&mut table, "BOT__RPS__ROUND_SECONDS", "30".to_owned());

        let token = table
            .get("discord")
            .and_then(|d| d.get("token"))
            .and_then(Value::as_str);
        assert_eq!(token, Some("tok"), "token must be nested under discord");

        let rounds = table
            .get("bot")
            .and_then(|b| b.get("rps"))
            .and_then(|r| r.get("round_seconds"))
            .and_then(Value::as_str);
        assert_eq!(rounds, Some("30"), "value must be nested two levels deep");
    }

    #[test]
    fn env_value_replaces_scalar() {
        let mut table = deserialize_str_to_table("[discord]\ntoken = \"old\"").expect("valid toml");
        insert_env_var(&mut table, "DISCORD__TOKEN", "new".to_owned());

        let token = table
            .get("discord")
            .and_then(|d| d.get("token"))
            .and_then(Value::as_str);
        assert_eq!(token, Some("new"), "env var must replace the file value");
    }

    #[test]
    fn prefix_is_case_insensitive() {
        assert_eq!(strip_prefix_ignore_case("RPS__DISCORD__TOKEN", "rps__"), Some("DISCORD__TOKEN"));
        assert_eq!(strip_prefix_ignore_case("rps__x", "RPS__"), Some("x"));
        assert_eq!(strip_prefix_ignore_case("RPS__", "RPS__"), None);
        assert_eq!(strip_prefix_ignore_case("PATH", "RPS__"), None);
    }
}
