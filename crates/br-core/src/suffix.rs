use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Suffix appended to an original data dir when it is moved aside to make
/// room for a restored copy, e.g. `/data/storage/0_old_1700000000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideCopySuffix(String);

impl SideCopySuffix {
    /// Generates a new suffix stamped with the current unix time.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs();
        Self(format!("_old_{secs}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn apply_to(&self, dir: &str) -> String {
        format!("{dir}{}", self.0)
    }
}

impl fmt::Display for SideCopySuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_has_expected_shape() {
        let suffix = SideCopySuffix::generate();
        assert!(suffix.as_str().starts_with("_old_"));
    }

    #[test]
    fn apply_to_appends_suffix() {
        let suffix = SideCopySuffix::generate();
        let applied = suffix.apply_to("/data/storage/0");
        assert!(applied.starts_with("/data/storage/0_old_"));
    }
}
