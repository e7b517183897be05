// src/platforms/schema.rs
//! Field readers for option schemas.
//!
//! A schema walks the raw argument map with an [`ArgReader`], narrowing each
//! field to its typed form. Every problem is recorded as a [`FieldIssue`]
//! and reading continues, so one validation pass reports all bad fields.

use chrono::NaiveDate;
use serde_json::Value;

use super::RawPlatformArgs;
use crate::error::{FieldIssue, ValidationError};

pub struct ArgReader<'a> {
    args: &'a RawPlatformArgs,
    issues: Vec<FieldIssue>,
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'a> ArgReader<'a> {
    pub fn new(args: &'a RawPlatformArgs) -> Self {
        Self {
            args,
            issues: Vec::new(),
        }
    }

    /// Present and not `null`.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.args.get(key).filter(|v| !v.is_null())
    }

    pub fn issue(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue::new(path, message));
    }

    pub fn has_issues_for(&self, key: &str) -> bool {
        self.issues.iter().any(|i| i.path == key)
    }

    /// Optional string; empty after trimming counts as absent.
    pub fn string(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            other => {
                let msg = format!("expected string, received {}", kind_of(other));
                self.issue(key, msg);
                None
            }
        }
    }

    /// Optional non-negative integer that fits in `u32`.
    pub fn count(&mut self, key: &str) -> Option<u32> {
        let v = self.get(key)?;
        match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                let msg = match v {
                    Value::Number(_) => "expected a non-negative integer".to_string(),
                    other => format!(
                        "expected a non-negative integer, received {}",
                        kind_of(other)
                    ),
                };
                self.issue(key, msg);
                None
            }
        }
    }

    /// Like [`count`](Self::count), additionally bounded to `min..=max`.
    pub fn count_in(&mut self, key: &str, min: u32, max: u32) -> Option<u32> {
        let n = self.count(key)?;
        if (min..=max).contains(&n) {
            Some(n)
        } else {
            self.issue(key, format!("must be between {min} and {max}"));
            None
        }
    }

    pub fn flag(&mut self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                let msg = format!("expected boolean, received {}", kind_of(other));
                self.issue(key, msg);
                false
            }
        }
    }

    /// List of non-empty strings. Elements are reported by index (`key.N`).
    pub fn string_list(&mut self, key: &str) -> Vec<String> {
        let Some(v) = self.get(key) else {
            return Vec::new();
        };
        let Value::Array(items) = v else {
            let msg = format!("expected array of strings, received {}", kind_of(v));
            self.issue(key, msg);
            return Vec::new();
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                Value::String(_) => self.issue(format!("{key}.{i}"), "must not be empty"),
                other => {
                    let msg = format!("expected string, received {}", kind_of(other));
                    self.issue(format!("{key}.{i}"), msg);
                }
            }
        }
        out
    }

    /// Calendar date in `YYYY-MM-DD` form.
    pub fn date(&mut self, key: &str) -> Option<NaiveDate> {
        let raw = self.string(key)?;
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                self.issue(key, "expected a date in YYYY-MM-DD format");
                None
            }
        }
    }

    pub fn finish(self, platform: &str) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(platform, self.issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> RawPlatformArgs {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn reads_typed_fields() {
        let raw = args(json!({
            "q": "  rust  ",
            "n": 5,
            "on": true,
            "tags": ["a", " b "],
            "d": "2024-02-29",
            "nothing": null
        }));
        let mut r = ArgReader::new(&raw);
        assert_eq!(r.string("q").as_deref(), Some("rust"));
        assert_eq!(r.count("n"), Some(5));
        assert!(r.flag("on"));
        assert_eq!(r.string_list("tags"), vec!["a", "b"]);
        assert_eq!(r.date("d"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(r.string("nothing"), None);
        assert_eq!(r.count("missing"), None);
        assert!(r.finish("p").is_ok());
    }

    #[test]
    fn collects_every_issue() {
        let raw = args(json!({
            "n": "not-a-number",
            "neg": -1,
            "big": 200,
            "on": "yes",
            "tags": ["ok", 3, ""],
            "d": "29/02/2024"
        }));
        let mut r = ArgReader::new(&raw);
        assert_eq!(r.count("n"), None);
        assert_eq!(r.count("neg"), None);
        assert_eq!(r.count_in("big", 1, 100), None);
        assert!(!r.flag("on"));
        assert_eq!(r.string_list("tags"), vec!["ok"]);
        assert_eq!(r.date("d"), None);

        let err = r.finish("p").unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["n", "neg", "big", "on", "tags.1", "tags.2", "d"]);
        assert_eq!(
            err.issues[0].message,
            "expected a non-negative integer, received string"
        );
    }
}
