use thiserror::Error;

const CRLF: &[u8] = b"\r\n";

/// Characters allowed in a field name besides ASCII letters and digits.
const TOKEN_SPECIALS: &[u8] = b"!#$%&'*+-.^_`|~";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("header not found: {0}")]
    NotFound(String),
    #[error("header {name} is not an integer: {value:?}")]
    NotAnInteger { name: String, value: String },
}

/// An ordered collection of HTTP header fields.
///
/// Lookups are case-insensitive. Fields parsed off the wire are stored
/// lower-cased; fields added with [`Headers::set`] keep the caller's case so
/// they are written out exactly as supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing the value of any field with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(idx) => self.entries[idx] = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    /// Looks up a field and parses its value as a base-10 integer.
    ///
    /// Used for `content-length`.
    pub fn get_int(&self, name: &str) -> Result<usize, HeaderError> {
        let value = self
            .get(name)
            .ok_or_else(|| HeaderError::NotFound(name.to_string()))?;

        value.parse().map_err(|_| HeaderError::NotAnInteger {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consumes at most one header line from the front of `buf`.
    ///
    /// Returns the number of bytes consumed and whether the line was the
    /// blank line ending the header section. `Ok((0, false))` means no full
    /// line is buffered yet. On error nothing is consumed and the collection
    /// is left untouched.
    ///
    /// A repeated field name has its new value appended to the existing one,
    /// separated by `", "`.
    pub fn parse_one(&mut self, buf: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(idx) = find_crlf(buf) else {
            return Ok((0, false));
        };

        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let raw = &buf[..idx];
        let malformed = |_| HeaderError::MalformedHeader(String::from_utf8_lossy(raw).into_owned());

        let line = std::str::from_utf8(raw).map_err(malformed)?;
        let (name, value) = split_field(line)?;

        let name = name.to_ascii_lowercase();
        match self.position(&name) {
            Some(pos) => {
                let merged = &mut self.entries[pos].1;
                merged.push_str(", ");
                merged.push_str(value);
            }
            None => self.entries.push((name, value.to_string())),
        }

        Ok((idx + CRLF.len(), false))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

/// Splits `Name: value` into its trimmed parts, validating the name.
fn split_field(line: &str) -> Result<(&str, &str), HeaderError> {
    let malformed = || HeaderError::MalformedHeader(line.to_string());

    let trimmed = line.trim_matches(' ');
    let (name, rest) = trimmed.split_once(':').ok_or_else(malformed)?;

    // The separator is ": "; a value glued to the colon is rejected, while a
    // line ending right after the colon carries an empty value.
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(malformed());
    }

    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(malformed());
    }

    Ok((name, rest.trim_matches(' ')))
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || TOKEN_SPECIALS.contains(&b)
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}
