//! Engine configuration types.

/// Default buffer size for reading.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
pub const DEFAULT_MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Completed outcomes kept for callers that have not collected them.
pub const DEFAULT_MAX_FINISHED_OUTCOMES: usize = 256;

/// IMAP engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Character prepended to every tag.
    pub tag_prefix: char,
    /// Longest response line accepted, literal payloads excluded.
    pub max_line_length: usize,
    /// Largest literal accepted from the server.
    pub max_literal_size: usize,
    /// Send `{n+}` literals when the server advertises LITERAL+.
    pub use_literal_plus: bool,
    /// Bytes requested from the connection per read.
    pub read_buffer_size: usize,
    /// Uncollected outcomes kept before the oldest is discarded.
    pub max_finished_outcomes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tag_prefix: 'A',
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_literal_size: DEFAULT_MAX_LITERAL_SIZE,
            use_literal_plus: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_finished_outcomes: DEFAULT_MAX_FINISHED_OUTCOMES,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the tag prefix character.
    #[must_use]
    pub const fn tag_prefix(mut self, prefix: char) -> Self {
        self.config.tag_prefix = prefix;
        self
    }

    /// Sets the maximum response line length.
    #[must_use]
    pub const fn max_line_length(mut self, len: usize) -> Self {
        self.config.max_line_length = len;
        self
    }

    /// Sets the maximum literal size.
    #[must_use]
    pub const fn max_literal_size(mut self, len: usize) -> Self {
        self.config.max_literal_size = len;
        self
    }

    /// Enables or disables non-synchronizing literals.
    #[must_use]
    pub const fn use_literal_plus(mut self, enabled: bool) -> Self {
        self.config.use_literal_plus = enabled;
        self
    }

    /// Sets the read buffer size. Zero is bumped to one.
    #[must_use]
    pub const fn read_buffer_size(mut self, len: usize) -> Self {
        self.config.read_buffer_size = if len == 0 { 1 } else { len };
        self
    }

    /// Sets how many uncollected outcomes are kept. Zero is bumped to one.
    #[must_use]
    pub const fn max_finished_outcomes(mut self, len: usize) -> Self {
        self.config.max_finished_outcomes = if len == 0 { 1 } else { len };
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
