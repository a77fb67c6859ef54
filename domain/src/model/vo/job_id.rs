use std::fmt;
use std::sync::Arc;

/// Identifier assigned by the scheduler on a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Arc<str>);

impl JobId {
    /// Accepts only a non-empty run of ASCII digits.
    pub fn from_numeric(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(Arc::from(s)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::JobId;

    #[test]
    fn numeric_only() {
        assert_eq!(JobId::from_numeric(" 8453\n").unwrap().as_str(), "8453");
        assert!(JobId::from_numeric("").is_none());
        assert!(JobId::from_numeric("error:").is_none());
        assert!(JobId::from_numeric("12a").is_none());
    }
}
