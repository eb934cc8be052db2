use std::collections::HashMap;
use std::fmt;
use std::hash;

/// A header name. Comparison and hashing ignore ASCII case, the spelling
/// of the most recent insertion is kept for display.
#[derive(Debug, Clone)]
pub struct Header(String);

impl Header {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Header {}

impl hash::Hash for Header {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl From<&str> for Header {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Header {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request headers, last value wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers(HashMap<Header, String>);

impl Headers {
    pub fn new() -> Self {
        Self(HashMap::new())
    }
    pub fn insert(&mut self, name: &str, value: &str) {
        // Drop first so the new spelling of the name replaces the old one.
        let header = Header::new(name);
        self.0.remove(&header);
        self.0.insert(header, value.to_string());
    }
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&Header::new(name)).map(|v| v.as_str())
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&Header::new(name))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&Header, &String)> {
        self.0.iter()
    }
}
