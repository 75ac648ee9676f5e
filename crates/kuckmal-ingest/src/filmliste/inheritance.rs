//! Channel/theme inheritance
//!
//! An empty channel or theme token means "same as the record before". The
//! context lives for exactly one run and is threaded through it by value.

/// Last resolved channel and theme of a run
#[derive(Debug, Clone, Default)]
pub struct InheritanceContext {
    last_channel: String,
    last_theme: String,
}

impl InheritanceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a record's channel and theme against the previous record
    ///
    /// The context always advances to the resolved values. Returns `None` if
    /// either value is still empty, which means the record must be dropped.
    pub fn resolve(&mut self, channel: &str, theme: &str) -> Option<(&str, &str)> {
        if !channel.is_empty() {
            self.last_channel.clear();
            self.last_channel.push_str(channel);
        }
        if !theme.is_empty() {
            self.last_theme.clear();
            self.last_theme.push_str(theme);
        }

        if self.last_channel.is_empty() || self.last_theme.is_empty() {
            return None;
        }
        Some((&self.last_channel, &self.last_theme))
    }

    pub fn last_channel(&self) -> &str {
        &self.last_channel
    }

    pub fn last_theme(&self) -> &str {
        &self.last_theme
    }
}
