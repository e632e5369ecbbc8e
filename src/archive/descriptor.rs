use plist::{Dictionary, Value};

/// Candidate keys for the bundle identifier, in priority order.
pub const IDENTIFIER_KEYS: &[&str] = &["CFBundleIdentifier"];

/// Candidate keys for the version string, in priority order.
pub const VERSION_KEYS: &[&str] = &["CFBundleShortVersionString", "CFBundleVersion"];

/// Candidate keys for the human-readable title, in priority order.
pub const TITLE_KEYS: &[&str] = &["CFBundleDisplayName", "CFBundleName"];

/// Version used when no version key is present.
pub const DEFAULT_VERSION: &str = "1.0";

/// Parsed `Info.plist` of an application bundle.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    fields: Dictionary,
}

impl Descriptor {
    pub fn new(fields: Dictionary) -> Self {
        Self { fields }
    }

    /// First key in `keys` holding a non-empty string value.
    pub fn first_string(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.fields.get(key).and_then(Value::as_string))
            .find(|value| !value.is_empty())
    }

    pub fn identifier(&self) -> Option<&str> {
        self.first_string(IDENTIFIER_KEYS)
    }

    /// Resolved version, falling back to [`DEFAULT_VERSION`].
    pub fn version(&self) -> &str {
        self.first_string(VERSION_KEYS).unwrap_or(DEFAULT_VERSION)
    }

    /// Display title. No placeholder: absent when neither key is set.
    pub fn title(&self) -> Option<&str> {
        self.first_string(TITLE_KEYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(pairs: &[(&str, &str)]) -> Descriptor {
        let mut dict = Dictionary::new();
        for (k, v) in pairs {
            dict.insert((*k).to_string(), Value::String((*v).to_string()));
        }
        Descriptor::new(dict)
    }

    #[test]
    fn test_version_prefers_short_version() {
        let d = descriptor(&[
            ("CFBundleShortVersionString", "2.1"),
            ("CFBundleVersion", "210"),
        ]);
        assert_eq!(d.version(), "2.1");
    }

    #[test]
    fn test_version_falls_back_to_bundle_version_then_default() {
        assert_eq!(descriptor(&[("CFBundleVersion", "42")]).version(), "42");
        assert_eq!(descriptor(&[]).version(), "1.0");
    }

    #[test]
    fn test_empty_string_falls_through() {
        let d = descriptor(&[("CFBundleDisplayName", ""), ("CFBundleName", "Acme")]);
        assert_eq!(d.title(), Some("Acme"));
    }

    #[test]
    fn test_title_absent_without_placeholder() {
        assert_eq!(descriptor(&[("CFBundleIdentifier", "com.acme.app")]).title(), None);
    }

    #[test]
    fn test_non_string_value_is_ignored() {
        let mut dict = Dictionary::new();
        dict.insert("CFBundleShortVersionString".to_string(), Value::Integer(3i64.into()));
        dict.insert("CFBundleVersion".to_string(), Value::String("3".to_string()));
        assert_eq!(Descriptor::new(dict).version(), "3");
    }
}
