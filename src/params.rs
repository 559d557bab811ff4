use crate::error::{Error, Result};
use crate::scalar::Scalar;
use std::collections::BTreeMap;

/// String-keyed, string-valued parameter store. Values may hold
/// slash-separated lists, e.g. `blist = "int/double/char"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Params {
        Params {
            entries: BTreeMap::new(),
        }
    }

    /// Inserting an existing key replaces its value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Params {
        self.insert(key, value.to_string());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copies `key` from `source` if it is set there.
    pub fn copy_entry(&mut self, key: &str, source: &Params) {
        if let Some(value) = source.get(key) {
            self.insert(key, value);
        }
    }

    /// Parses a `key:value` entry, the form used on the command line.
    pub fn parse_entry(entry: &str) -> Result<(String, String)> {
        let Some((key, value)) = entry.split_once(':') else {
            return Err(Error::config(entry, "expected key:value"));
        };

        if key.is_empty() || value.is_empty() {
            return Err(Error::config(entry, "expected key:value"));
        }

        Ok((key.to_string(), value.to_string()))
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::missing(key))
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        parse_int(key, self.require(key)?)
    }

    /// A non-negative integer that fits a repetition count.
    pub fn count(&self, key: &str) -> Result<u32> {
        let value = self.int(key)?;
        u32::try_from(value)
            .map_err(|_| Error::config(key, format!("{} is not a valid count", value)))
    }

    pub fn scalar(&self, key: &str) -> Result<Scalar> {
        let tag = self.require(key)?;
        Scalar::from_tag(tag)
            .ok_or_else(|| Error::config(key, format!("unknown scalar type tag \"{}\"", tag)))
    }

    /// A slash-separated list of exactly `n` scalar tags.
    pub fn scalar_list(&self, key: &str, n: usize) -> Result<Vec<Scalar>> {
        let items: Vec<&str> = split_list(self.require(key)?).collect();

        if items.len() != n {
            return Err(Error::config(
                key,
                format!("expected {} slash-separated type tags, found {}", n, items.len()),
            ));
        }

        items
            .into_iter()
            .map(|tag| {
                Scalar::from_tag(tag).ok_or_else(|| {
                    Error::config(key, format!("unknown scalar type tag \"{}\"", tag))
                })
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split('/').filter(|s| !s.is_empty())
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::config(key, format!("unable to convert \"{}\" to an integer", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_values_replace_earlier_ones() {
        let mut p = Params::new();
        p.insert("A", "1");
        p.insert("A", "7");
        assert_eq!(p.int("A").unwrap(), 7);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn typed_getters() {
        let p: Params = [
            ("A", "12"),
            ("b", "MPI_DOUBLE"),
            ("blist", "int/double/char"),
        ]
        .into_iter()
        .collect();

        assert_eq!(p.count("A").unwrap(), 12);
        assert_eq!(p.scalar("b").unwrap(), Scalar::Double);
        assert_eq!(
            p.scalar_list("blist", 3).unwrap(),
            vec![Scalar::Int, Scalar::Double, Scalar::Char]
        );
    }

    #[test]
    fn getter_failures_are_config_errors() {
        let p = Params::new().with("A", "x12").with("C", "-3").with("blist", "int/int");

        assert_eq!(p.int("B").unwrap_err(), Error::missing("B"));
        assert!(p.int("A").unwrap_err().is_config());
        assert!(p.count("C").unwrap_err().is_config());
        assert!(p.scalar_list("blist", 3).unwrap_err().is_config());
    }

    #[test]
    fn parse_key_value_entries() {
        assert_eq!(
            Params::parse_entry("layout:tiled").unwrap(),
            ("layout".to_string(), "tiled".to_string())
        );
        assert!(Params::parse_entry("layout").is_err());
        assert!(Params::parse_entry(":tiled").is_err());
    }

    #[test]
    fn copy_entry_skips_absent_keys() {
        let source = Params::new().with("A", 3);
        let mut dest = Params::new();

        dest.copy_entry("A", &source);
        dest.copy_entry("B", &source);

        assert_eq!(dest.get("A"), Some("3"));
        assert!(!dest.contains("B"));
    }
}
