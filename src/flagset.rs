use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::registry::FlagRegistry;

/// Typed value held by a flag.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
}

impl FlagValue {
    /// Parse `raw` into a value of the same kind as `self`.
    fn parse_like(&self, raw: &str) -> std::result::Result<FlagValue, String> {
        match self {
            FlagValue::Str(_) => Ok(FlagValue::Str(raw.to_string())),
            FlagValue::Int(_) => parse_int(raw).map(FlagValue::Int),
            FlagValue::Uint(_) => parse_uint(raw).map(FlagValue::Uint),
            FlagValue::Float(_) => raw.parse().map(FlagValue::Float).map_err(|e| e.to_string()),
            FlagValue::Bool(_) => parse_bool(raw).map(FlagValue::Bool),
        }
    }

    fn is_bool(&self) -> bool {
        matches!(self, FlagValue::Bool(_))
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Str(s) => write!(f, "{}", s),
            FlagValue::Int(n) => write!(f, "{}", n),
            FlagValue::Uint(n) => write!(f, "{}", n),
            FlagValue::Float(n) => write!(f, "{}", n),
            FlagValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

pub(crate) fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(String::from("invalid syntax")),
    }
}

/// Parse an integer literal: `0x`, `0o`, `0b` and leading-`0` octal
/// prefixes are honoured, and single `_` separators between digits are allowed.
fn parse_magnitude(raw: &str) -> std::result::Result<u64, String> {
    let (radix, digits) = if let Some(rest) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = raw.strip_prefix("0o").or_else(|| raw.strip_prefix("0O")) {
        (8, rest)
    } else if let Some(rest) = raw.strip_prefix("0b").or_else(|| raw.strip_prefix("0B")) {
        (2, rest)
    } else if raw.len() > 1 && raw.starts_with('0') {
        (8, &raw[1..])
    } else {
        (10, raw)
    };

    let digits = digits.strip_prefix('_').filter(|_| radix != 10).unwrap_or(digits);
    if digits.is_empty()
        || digits.starts_with(['_', '+', '-'])
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(String::from("invalid syntax"));
    }

    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    u64::from_str_radix(&cleaned, radix).map_err(|e| e.to_string())
}

fn parse_uint(raw: &str) -> std::result::Result<u64, String> {
    parse_magnitude(raw)
}

fn parse_int(raw: &str) -> std::result::Result<i64, String> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let magnitude = i128::from(parse_magnitude(body)?);
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| String::from("value out of range"))
}

#[derive(Debug, Clone)]
struct Flag {
    usage: String,
    value: FlagValue,
    default: FlagValue,
}

/// A named set of typed command-line flags.
#[derive(Debug, Clone)]
pub struct FlagSet {
    name: String,
    flags: BTreeMap<String, Flag>,
    explicit: HashSet<String>,
    args: Vec<String>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: BTreeMap::new(),
            explicit: HashSet::new(),
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn string(&mut self, name: &str, default: &str, usage: &str) {
        self.define(name, FlagValue::Str(default.to_string()), usage);
    }

    pub fn int(&mut self, name: &str, default: i64, usage: &str) {
        self.define(name, FlagValue::Int(default), usage);
    }

    pub fn uint(&mut self, name: &str, default: u64, usage: &str) {
        self.define(name, FlagValue::Uint(default), usage);
    }

    pub fn float(&mut self, name: &str, default: f64, usage: &str) {
        self.define(name, FlagValue::Float(default), usage);
    }

    pub fn bool(&mut self, name: &str, default: bool, usage: &str) {
        self.define(name, FlagValue::Bool(default), usage);
    }

    /// Register a flag.
    ///
    /// # Panics
    ///
    /// Panics if a flag called `name` is already defined in this set.
    pub fn define(&mut self, name: &str, default: FlagValue, usage: &str) {
        if self.flags.contains_key(name) {
            panic!("{} flag redefined: {}", self.name, name);
        }
        self.flags.insert(
            name.to_string(),
            Flag {
                usage: usage.to_string(),
                value: default.clone(),
                default,
            },
        );
    }

    /// Parse command-line arguments, stopping at `--` or the first non-flag.
    ///
    /// Accepted forms are `-name`, `--name`, `-name=value`, `--name=value` and
    /// `-name value`. Boolean flags never take the following argument.
    pub fn parse<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        self.args.clear();

        while let Some(arg) = args.next() {
            if arg == "--" {
                break;
            }

            let Some(body) = strip_dashes(&arg) else {
                self.args.push(arg);
                break;
            };

            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };

            let is_bool = self
                .flags
                .get(name)
                .ok_or_else(|| Error::UnknownFlag(name.to_string()))?
                .value
                .is_bool();

            let value = match inline {
                Some(value) => value,
                None if is_bool => String::from("true"),
                None => args
                    .next()
                    .ok_or_else(|| Error::MissingValue(name.to_string()))?,
            };

            self.set(name, &value)?;
        }

        self.args.extend(args);
        debug!("Parsed {} flag(s), {} argument(s) remain", self.explicit.len(), self.args.len());
        Ok(())
    }

    /// Set a flag as if it had been given on the command line.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.assign(name, value)?;
        self.explicit.insert(name.to_string());
        Ok(())
    }

    fn assign(&mut self, name: &str, raw: &str) -> Result<()> {
        let flag = self
            .flags
            .get_mut(name)
            .ok_or_else(|| Error::UnknownFlag(name.to_string()))?;

        flag.value = flag
            .value
            .parse_like(raw)
            .map_err(|reason| Error::InvalidValue {
                flag: name.to_string(),
                value: raw.to_string(),
                reason,
            })?;
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name).map(|f| &f.value)
    }

    pub fn default_value(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name).map(|f| &f.default)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            FlagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.value(name)? {
            FlagValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_uint(&self, name: &str) -> Option<u64> {
        match self.value(name)? {
            FlagValue::Uint(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.value(name)? {
            FlagValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.value(name)? {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn usage(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(|f| f.usage.as_str())
    }

    /// Whether the flag was given on the command line (or through [`FlagSet::set`]).
    pub fn is_set(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Arguments left over after flag parsing.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Render one help line per flag, sorted by name.
    pub fn usage_text(&self) -> String {
        let mut out = format!("Usage of {}:\n", self.name);
        for (name, flag) in &self.flags {
            let kind = match flag.default {
                FlagValue::Str(_) => " string",
                FlagValue::Int(_) => " int",
                FlagValue::Uint(_) => " uint",
                FlagValue::Float(_) => " float",
                FlagValue::Bool(_) => "",
            };
            out.push_str(&format!("  -{}{}\n    \t{}", name, kind, flag.usage));

            let is_zero = match &flag.default {
                FlagValue::Str(s) => s.is_empty(),
                FlagValue::Int(n) => *n == 0,
                FlagValue::Uint(n) => *n == 0,
                FlagValue::Float(n) => *n == 0.0,
                FlagValue::Bool(b) => !b,
            };
            if !is_zero {
                match &flag.default {
                    FlagValue::Str(s) => out.push_str(&format!(" (default {:?})", s)),
                    other => out.push_str(&format!(" (default {})", other)),
                }
            }
            out.push('\n');
        }
        out
    }
}

fn strip_dashes(arg: &str) -> Option<&str> {
    let body = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    // A lone "-" is an argument, and "---x" is not a flag
    if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
        return None;
    }
    Some(body)
}

impl FlagRegistry for FlagSet {
    fn flag_names(&self) -> Vec<String> {
        self.flags.keys().cloned().collect()
    }

    fn explicitly_set(&self) -> HashSet<String> {
        self.explicit.clone()
    }

    fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        self.assign(name, value)
    }

    fn append_usage(&mut self, name: &str, suffix: &str) {
        if let Some(flag) = self.flags.get_mut(name) {
            flag.usage.push_str(suffix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlagSet {
        let mut flags = FlagSet::new("myapp");
        flags.string("tlsCert", "", "TLS Certificate");
        flags.int("port", 8080, "Port to listen on");
        flags.uint("workers", 4, "Worker count");
        flags.float("ratio", 0.5, "Sampling ratio");
        flags.bool("verbose", false, "Verbose output");
        flags
    }

    #[test]
    fn test_defaults() {
        let flags = sample();

        assert_eq!(flags.name(), "myapp");
        assert_eq!(flags.get_str("tlsCert"), Some(""));
        assert_eq!(flags.get_int("port"), Some(8080));
        assert_eq!(flags.get_uint("workers"), Some(4));
        assert_eq!(flags.get_float("ratio"), Some(0.5));
        assert_eq!(flags.get_bool("verbose"), Some(false));
        assert!(flags.explicitly_set().is_empty());
    }

    #[test]
    fn test_parse_forms() {
        let mut flags = sample();
        flags
            .parse(["-tlsCert", "a.crt", "--port=9000", "-verbose", "--workers", "8", "rest", "-ratio=1"])
            .unwrap();

        assert_eq!(flags.get_str("tlsCert"), Some("a.crt"));
        assert_eq!(flags.get_int("port"), Some(9000));
        assert_eq!(flags.get_bool("verbose"), Some(true));
        assert_eq!(flags.get_uint("workers"), Some(8));
        assert_eq!(flags.get_float("ratio"), Some(0.5));
        assert_eq!(flags.args(), ["rest", "-ratio=1"]);

        let explicit = flags.explicitly_set();
        assert_eq!(explicit.len(), 4);
        assert!(explicit.contains("tlsCert"));
        assert!(!explicit.contains("ratio"));
    }

    #[test]
    fn test_parse_double_dash_terminates() {
        let mut flags = sample();
        flags.parse(["-verbose=false", "--", "-port", "1"]).unwrap();

        assert_eq!(flags.get_bool("verbose"), Some(false));
        assert!(flags.is_set("verbose"));
        assert_eq!(flags.get_int("port"), Some(8080));
        assert_eq!(flags.args(), ["-port", "1"]);
    }

    #[test]
    fn test_parse_errors() {
        let mut flags = sample();
        assert!(matches!(
            flags.parse(["-missing"]),
            Err(Error::UnknownFlag(name)) if name == "missing"
        ));

        let mut flags = sample();
        assert!(matches!(
            flags.parse(["-port"]),
            Err(Error::MissingValue(name)) if name == "port"
        ));

        let mut flags = sample();
        assert!(matches!(
            flags.parse(["-port", "eighty"]),
            Err(Error::InvalidValue { flag, .. }) if flag == "port"
        ));
    }

    #[test]
    fn test_set_value_does_not_mark_explicit() {
        let mut flags = sample();
        flags.set_value("port", "1234").unwrap();

        assert_eq!(flags.get_int("port"), Some(1234));
        assert!(!flags.is_set("port"));
        assert_eq!(flags.default_value("port"), Some(&FlagValue::Int(8080)));
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut flags = sample();

        assert!(matches!(
            flags.set_value("workers", "-1"),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            flags.set_value("verbose", "yes"),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            flags.set_value("nope", "1"),
            Err(Error::UnknownFlag(_))
        ));
        assert_eq!(flags.get_uint("workers"), Some(4));
    }

    #[test]
    fn test_int_literal_forms() {
        let mut flags = sample();

        for (raw, want) in [
            ("0x1F", 31),
            ("0o17", 15),
            ("017", 15),
            ("0b101", 5),
            ("1_000", 1000),
            ("-42", -42),
            ("+7", 7),
            ("-0x10", -16),
            ("-9223372036854775808", i64::MIN),
        ] {
            flags.set_value("port", raw).unwrap();
            assert_eq!(flags.get_int("port"), Some(want), "{raw}");
        }

        for raw in ["", "-", "0x", "1__0", "_1", "1_", "--1", "9223372036854775808", "08"] {
            assert!(
                matches!(flags.set_value("port", raw), Err(Error::InvalidValue { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_uint_literal_forms() {
        let mut flags = sample();

        flags.set_value("workers", "0xff").unwrap();
        assert_eq!(flags.get_uint("workers"), Some(255));
        flags.set_value("workers", "0").unwrap();
        assert_eq!(flags.get_uint("workers"), Some(0));
        assert!(flags.set_value("workers", "+1").is_err());
    }

    #[test]
    fn test_flag_names_sorted() {
        let flags = sample();
        assert_eq!(
            flags.flag_names(),
            ["port", "ratio", "tlsCert", "verbose", "workers"]
        );
    }

    #[test]
    #[should_panic(expected = "flag redefined: port")]
    fn test_redefine_panics() {
        let mut flags = sample();
        flags.int("port", 1, "again");
    }

    #[test]
    fn test_usage_text() {
        let mut flags = FlagSet::new("myapp");
        flags.string("tlsCert", "", "TLS Certificate");
        flags.int("port", 8080, "Port to listen on");
        flags.append_usage("port", " [MYAPP_PORT]");

        assert_eq!(
            flags.usage_text(),
            "Usage of myapp:\n  -port int\n    \tPort to listen on [MYAPP_PORT] (default 8080)\n  -tlsCert string\n    \tTLS Certificate\n"
        );
    }
}
