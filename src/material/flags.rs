use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::{self, Write};
use std::iter::FromIterator;

/// Insertion ordered flag name to value mapping.
///
/// Ordering is kept so records re-encode exactly as they were read, but two
/// maps compare equal whenever they hold the same pairs.
#[derive(Default, Clone, Debug)]
pub struct FlagMap {
    entries: Vec<(String, String)>,
}

impl FlagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, keeping the original position of an existing key.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }
}

impl PartialEq for FlagMap {
    fn eq(&self, other: &FlagMap) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for FlagMap {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut flags = FlagMap::new();
        for (key, value) in iter {
            flags.insert(key, value);
        }
        flags
    }
}

/// Quote a string the way the material tooling prints flag values: single
/// quotes unless the text holds a single quote and no double quote.
fn write_quoted(f: &mut fmt::Formatter, text: &str) -> fmt::Result {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Renders `{'key': 'value', ...}` in current order; this is the sort key of
/// canonical variant ordering.
impl fmt::Display for FlagMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, key)?;
            f.write_str(": ")?;
            write_quoted(f, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for FlagMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct FlagMapVisitor;

impl<'de> Visitor<'de> for FlagMapVisitor {
    type Value = FlagMap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object of string flag values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FlagMap, A::Error> {
        let mut flags = FlagMap::new();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            flags.insert(key, value);
        }
        Ok(flags)
    }
}

impl<'de> Deserialize<'de> for FlagMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<FlagMap, D::Error> {
        deserializer.deserialize_map(FlagMapVisitor)
    }
}
