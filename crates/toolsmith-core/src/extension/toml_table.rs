use std::path::Path;
use toml::value::Table;

/// Extension trait for [`Table`](toml::Table).
pub trait TomlTableExt {
    /// Extracts the boolean value corresponding to the key.
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Extracts the integer value corresponding to the key and
    /// represents it as `usize` if possible.
    fn get_usize(&self, key: &str) -> Option<usize>;

    /// Extracts the string corresponding to the key.
    fn get_str(&self, key: &str) -> Option<&str>;

    /// Extracts the string corresponding to the key as a filesystem path.
    /// Empty strings are treated as absent.
    fn get_path(&self, key: &str) -> Option<&Path>;

    /// Extracts the table corresponding to the key.
    fn get_table(&self, key: &str) -> Option<&Table>;
}

impl TomlTableExt for Table {
    #[inline]
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    #[inline]
    fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key)
            .and_then(|v| v.as_integer())
            .and_then(|i| usize::try_from(i).ok())
    }

    #[inline]
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    #[inline]
    fn get_path(&self, key: &str) -> Option<&Path> {
        self.get_str(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Path::new)
    }

    #[inline]
    fn get_table(&self, key: &str) -> Option<&Table> {
        self.get(key).and_then(|v| v.as_table())
    }
}

#[cfg(test)]
mod tests {
    use super::TomlTableExt;
    use std::path::Path;
    use toml::Table;

    #[test]
    fn it_reads_typed_values() {
        let table: Table = r#"
            enabled = true
            retries = 3
            negative = -1
            dir = "  ./data  "
            blank = ""

            [store]
            kind = "file"
        "#
        .parse()
        .unwrap();

        assert_eq!(table.get_bool("enabled"), Some(true));
        assert_eq!(table.get_usize("retries"), Some(3));
        assert_eq!(table.get_usize("negative"), None);
        assert_eq!(table.get_path("dir"), Some(Path::new("./data")));
        assert_eq!(table.get_path("blank"), None);
        assert_eq!(
            table.get_table("store").and_then(|t| t.get_str("kind")),
            Some("file")
        );
        assert_eq!(table.get_str("missing"), None);
    }
}
