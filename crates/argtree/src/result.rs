use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::InvokeError;

/// Callback bound to a command and run through [`ParsedResult::invoke`].
pub type Action = Rc<dyn Fn() -> i32>;

static EMPTY_RECORD: ArgumentRecord = ArgumentRecord {
    values: Vec::new(),
    env: None,
    matched: false,
};

/// Values captured for one command or option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgumentRecord {
    values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<String>,
    matched: bool,
}

impl ArgumentRecord {
    /// All argument values, in command-line order (or default order).
    pub fn values(&self) -> &[String] {
        self.values.as_slice()
    }

    /// The value at `index`, if present.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.value(0)
    }

    /// Value of the bound environment variable when it was captured.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    /// Whether the command/option itself appeared in argv.
    ///
    /// Records created only from defaults or environment values report `false`.
    pub fn was_matched(&self) -> bool {
        self.matched
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.env.is_none() && !self.matched
    }
}

/// The output of one parse run, queried by lookup key.
#[derive(Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ParsedResult {
    records: IndexMap<String, ArgumentRecord>,
    #[serde(skip)]
    action: Option<Action>,
}

impl ParsedResult {
    /// The record stored under `name`, or an empty record if it never matched.
    pub fn get(&self, name: &str) -> &ArgumentRecord {
        self.records.get(name).unwrap_or(&EMPTY_RECORD)
    }

    /// The argument at `index` for `name`.
    pub fn get_at(&self, name: &str, index: usize) -> Option<&str> {
        self.get(name).value(index)
    }

    /// The captured environment value for `name`.
    pub fn get_env(&self, name: &str) -> Option<&str> {
        self.get(name).env()
    }

    /// Whether the command/option `name` appeared on the command line.
    pub fn called(&self, name: &str) -> bool {
        self.records.get(name).is_some_and(ArgumentRecord::was_matched)
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Run the action bound to the matched command.
    ///
    /// Missing actions are reported, not fatal; the caller decides.
    pub fn invoke(&self) -> Result<i32, InvokeError> {
        match &self.action {
            Some(action) => Ok(action()),
            None => Err(InvokeError::NoAction),
        }
    }

    pub fn records(&self) -> &IndexMap<String, ArgumentRecord> {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgumentRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl ParsedResult {
    pub(crate) fn record_match(&mut self, key: &str, values: Vec<String>, env: Option<String>) {
        let record = self.records.entry(key.to_string()).or_default();
        record.values.extend(values);
        record.matched = true;
        if env.is_some() {
            record.env = env;
        }
    }

    /// Store defaults/env for an option that did not appear in argv.
    pub(crate) fn record_unmatched(&mut self, key: &str, values: Vec<String>, env: Option<String>) {
        if values.is_empty() && env.is_none() {
            return;
        }
        self.records.insert(
            key.to_string(),
            ArgumentRecord {
                values,
                env,
                matched: false,
            },
        );
    }

    pub(crate) fn set_env(&mut self, key: &str, env: String) {
        if let Some(record) = self.records.get_mut(key) {
            record.env = Some(env);
        }
    }

    pub(crate) fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }
}

impl fmt::Debug for ParsedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedResult")
            .field("records", &self.records)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Dump every record, one block per key.
impl fmt::Display for ParsedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, record) in &self.records {
            writeln!(f, "name: {name}")?;
            write!(f, "args value:")?;
            for value in &record.values {
                write!(f, " {value}")?;
            }
            writeln!(f)?;
            writeln!(f, "env value: {}", record.env.as_deref().unwrap_or(""))?;
            writeln!(f, "called: {}", record.matched)?;
            writeln!(f)?;
        }
        Ok(())
    }
}
