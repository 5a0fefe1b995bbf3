//! Structured type names.
//!
//! A [`ClassName`] is the parsed form of the type name stored in a container header
//! (conventionally under `clsName`). It understands two suffix forms:
//!
//! - **Array rank**: trailing `[]` groups, e.g. `System.Int32[][]` has rank 2
//! - **Type arguments**: one top-level bracket pair holding comma-separated names,
//!   e.g. ``Dictionary`2[System.String,List`1[System.Int32]]``
//!
//! Arguments are split at bracket depth zero only, so nested generic arguments keep
//! their own commas.
//!
//! ## Caching
//!
//! Parsing goes through a process-wide cache keyed by the input string. Only strings
//! without whitespace are cached: canonical names never contain whitespace, while
//! hand-written aliases such as `Dictionary`2[System.String, System.Int32]` may, and
//! those are parsed every time. The cache stops accepting entries once it holds
//! [`MAX_CACHED_CLASS_NAMES`] names.
//!
//! Type arguments may nest at most [`MAX_TYPE_ARG_DEPTH`] levels deep.
//!
//! ```rust
//! use dson::ClassName;
//!
//! let name = ClassName::parse("List`1[System.String]").unwrap();
//! assert_eq!(name.name(), "List`1");
//! assert_eq!(name.type_args()[0].name(), "System.String");
//! assert_eq!(name.to_string(), "List`1[System.String]");
//! ```

use crate::error::{Error, Result};
use crate::options::DEFAULT_RECURSION_LIMIT;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;

/// Deepest accepted nesting of type arguments.
pub const MAX_TYPE_ARG_DEPTH: usize = DEFAULT_RECURSION_LIMIT;

/// Upper bound on the number of cached parse results.
pub const MAX_CACHED_CLASS_NAMES: usize = 4096;

static CLASS_NAME_CACHE: Lazy<DashMap<String, ClassName>> = Lazy::new(DashMap::new);

/// Parsed, structural type name.
///
/// Two class names are equal when their base names, their ordered type arguments and
/// their array ranks are equal.
///
/// # Examples
///
/// ```rust
/// use dson::ClassName;
///
/// let matrix = ClassName::parse("System.Int32[][]").unwrap();
/// assert!(matrix.is_array());
/// assert_eq!(matrix.array_rank(), 2);
/// assert_eq!(matrix.element_type().unwrap().to_string(), "System.Int32[]");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassName {
    name: String,
    type_args: Vec<ClassName>,
    array_rank: usize,
}

impl ClassName {
    /// Creates a plain (non-generic, non-array) class name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ClassName {
            name: name.into(),
            type_args: Vec::new(),
            array_rank: 0,
        }
    }

    /// Creates a generic class name.
    #[must_use]
    pub fn with_type_args(name: impl Into<String>, type_args: Vec<ClassName>) -> Self {
        ClassName {
            name: name.into(),
            type_args,
            array_rank: 0,
        }
    }

    /// Parses a class name string, consulting the process-wide cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClassName`] for empty names, empty type arguments,
    /// unbalanced brackets and type arguments nested deeper than
    /// [`MAX_TYPE_ARG_DEPTH`].
    pub fn parse(s: &str) -> Result<Self> {
        let cacheable = !s.chars().any(char::is_whitespace);
        if cacheable {
            if let Some(hit) = CLASS_NAME_CACHE.get(s) {
                return Ok(hit.value().clone());
            }
        }
        let parsed = parse_uncached(s, 0)?;
        if cacheable {
            remember(&CLASS_NAME_CACHE, s, &parsed);
        }
        Ok(parsed)
    }

    /// Base name without type arguments or array suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered type arguments.
    #[must_use]
    pub fn type_args(&self) -> &[ClassName] {
        &self.type_args
    }

    /// Number of trailing `[]` groups.
    #[must_use]
    pub fn array_rank(&self) -> usize {
        self.array_rank
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array_rank > 0
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.type_args.is_empty()
    }

    /// Element type of an array name (rank reduced by one).
    #[must_use]
    pub fn element_type(&self) -> Option<ClassName> {
        if self.array_rank == 0 {
            return None;
        }
        let mut element = self.clone();
        element.array_rank -= 1;
        Some(element)
    }

    /// Array of this type with `rank` additional dimensions.
    #[must_use]
    pub fn array_of(&self, rank: usize) -> ClassName {
        let mut array = self.clone();
        array.array_rank += rank;
        array
    }
}

fn remember(cache: &DashMap<String, ClassName>, key: &str, parsed: &ClassName) {
    if cache.len() < MAX_CACHED_CLASS_NAMES {
        cache.insert(key.to_string(), parsed.clone());
    }
}

fn invalid(s: &str, reason: &str) -> Error {
    Error::InvalidClassName {
        name: s.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_uncached(s: &str, depth: usize) -> Result<ClassName> {
    if depth > MAX_TYPE_ARG_DEPTH {
        return Err(invalid(s, "type arguments nested too deeply"));
    }
    let mut body = s.trim();
    if body.is_empty() {
        return Err(invalid(s, "empty name"));
    }

    let mut array_rank = 0;
    while let Some(rest) = body.strip_suffix("[]") {
        body = rest;
        array_rank += 1;
    }

    let (name, type_args) = match body.strip_suffix(']') {
        Some(without_close) => {
            let open = matching_open(without_close)
                .ok_or_else(|| invalid(s, "unbalanced brackets"))?;
            let args = split_type_args(&without_close[open + 1..])
                .ok_or_else(|| invalid(s, "malformed type arguments"))?
                .into_iter()
                .map(|arg| parse_uncached(arg, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            (without_close[..open].trim_end(), args)
        }
        None => (body, Vec::new()),
    };

    if name.is_empty() {
        return Err(invalid(s, "empty name"));
    }
    if name.contains(['[', ']', ',']) {
        return Err(invalid(s, "unexpected bracket or comma in name"));
    }

    Ok(ClassName {
        name: name.to_string(),
        type_args,
        array_rank,
    })
}

/// Byte index of the `[` matching an already stripped trailing `]`.
fn matching_open(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in s.bytes().enumerate().rev() {
        match b {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_type_args(inner: &str) -> Option<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in inner.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.checked_sub(1)?,
            b',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    args.push(inner[start..].trim());
    if args.iter().any(|arg| arg.is_empty()) {
        return None;
    }
    Some(args)
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_args.is_empty() {
            f.write_str("[")?;
            for (i, arg) in self.type_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str("]")?;
        }
        for _ in 0..self.array_rank {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl FromStr for ClassName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ClassName::parse(s)
    }
}

#[cfg(test)]
pub(crate) fn is_cached(s: &str) -> bool {
    CLASS_NAME_CACHE.contains_key(s)
}
