//! Dotted schema-version identifier
//!
//! Container metadata declares the model version it complies with as a
//! dotted numeric string (`0.3`, `0.5.1`). Versions compare component-wise
//! with missing trailing components treated as zero, so `0.5` == `0.5.0`
//! and `0.3` < `0.5.1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ModelVersion {
    components: Vec<u32>,
}

/// Version string was empty or contained a non-numeric component
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a valid model version: '{0}'")]
pub struct VersionParseError(pub String);

impl FromStr for ModelVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError(s.to_string()));
        }
        let components = trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionParseError(s.to_string()))?;
        Ok(Self { components })
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .components
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", text)
    }
}

impl Ord for ModelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ModelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ModelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ModelVersion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ModelVersion {
        s.parse().unwrap()
    }

    #[test]
    fn orders_component_wise() {
        assert!(v("0.3") < v("0.5.1"));
        assert!(v("0.5.1") < v("0.6"));
        assert!(v("0.10") > v("0.9"));
        assert!(v("1.0") > v("0.99.99"));
    }

    #[test]
    fn trailing_zeros_are_equal() {
        assert_eq!(v("0.5"), v("0.5.0"));
        assert!(v("0.5") <= v("0.5.0"));
    }

    #[test]
    fn display_roundtrips() {
        assert_eq!(v("0.5.1").to_string(), "0.5.1");
    }

    #[test]
    fn rejects_malformed() {
        assert!("".parse::<ModelVersion>().is_err());
        assert!("0.x".parse::<ModelVersion>().is_err());
        assert!("1..2".parse::<ModelVersion>().is_err());
    }
}
