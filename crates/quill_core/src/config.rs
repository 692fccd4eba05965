//! Book configuration.

use std::collections::HashMap;

/// Configuration for creating a book.
#[derive(Debug, Clone)]
pub struct BookConfig {
    /// Whether the book starts out read-only.
    pub read_only: bool,

    /// Zero-pad width for formatted counters without a template.
    pub counter_width: usize,

    /// Per-counter format templates. Each template contains one `{}`
    /// placeholder that receives the zero-padded counter value.
    pub counter_formats: HashMap<String, String>,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            counter_width: 6,
            counter_formats: HashMap::new(),
        }
    }
}

impl BookConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the book starts out read-only.
    #[must_use]
    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Sets the zero-pad width for formatted counters.
    #[must_use]
    pub fn counter_width(mut self, width: usize) -> Self {
        self.counter_width = width;
        self
    }

    /// Sets the format template for a named counter.
    #[must_use]
    pub fn counter_format(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.counter_formats.insert(name.into(), template.into());
        self
    }

    /// Formats `value` for the counter `name`.
    #[must_use]
    pub fn format_counter(&self, name: &str, value: i64) -> String {
        let padded = format!("{value:0width$}", width = self.counter_width);
        match self.counter_formats.get(name) {
            Some(template) if template.contains("{}") => template.replacen("{}", &padded, 1),
            _ => padded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BookConfig::default();
        assert!(!config.read_only);
        assert_eq!(config.counter_width, 6);
        assert!(config.counter_formats.is_empty());
    }

    #[test]
    fn builder_pattern() {
        let config = BookConfig::new()
            .read_only(true)
            .counter_width(3)
            .counter_format("invoice", "INV-{}");

        assert!(config.read_only);
        assert_eq!(config.counter_width, 3);
        assert_eq!(config.format_counter("invoice", 7), "INV-007");
    }

    #[test]
    fn format_without_template_pads() {
        let config = BookConfig::default();
        assert_eq!(config.format_counter("bill", 42), "000042");
    }

    #[test]
    fn template_without_placeholder_is_ignored() {
        let config = BookConfig::new().counter_format("bill", "fixed");
        assert_eq!(config.format_counter("bill", 1), "000001");
    }
}
