//! Immutable configuration for the wire-level frame decoder.

use thiserror::Error;

/// Error returned when a decoder configuration fails validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("invalid decoder config: {0}")]
pub struct ConfigError(&'static str);

/// Frame decoder settings, built by [`WebSocketDecoderConfig::builder`].
///
/// The values describe the server defaults: clients must mask frames, and
/// reserved bits are rejected unless an extension negotiated them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WebSocketDecoderConfig {
    max_frame_payload_length: usize,
    allow_extensions: bool,
    allow_mask_mismatch: bool,
    expect_masked_frames: bool,
}

impl WebSocketDecoderConfig {
    /// Default ceiling on a single frame's payload.
    pub const DEFAULT_MAX_FRAME_PAYLOAD_LENGTH: usize = 65_536;

    /// Starts a builder with the server defaults.
    #[must_use]
    pub fn builder() -> WebSocketDecoderConfigBuilder {
        WebSocketDecoderConfigBuilder::default()
    }

    /// Largest payload a single frame may carry.
    #[must_use]
    pub const fn max_frame_payload_length(&self) -> usize {
        self.max_frame_payload_length
    }

    /// `true` when reserved bits negotiated by extensions are tolerated.
    #[must_use]
    pub const fn allow_extensions(&self) -> bool {
        self.allow_extensions
    }

    /// `true` when frames violating the masking expectation are tolerated.
    #[must_use]
    pub const fn allow_mask_mismatch(&self) -> bool {
        self.allow_mask_mismatch
    }

    /// `true` when inbound frames must be masked (the server side of the
    /// protocol).
    #[must_use]
    pub const fn expect_masked_frames(&self) -> bool {
        self.expect_masked_frames
    }
}

impl Default for WebSocketDecoderConfig {
    fn default() -> Self {
        Self {
            max_frame_payload_length: Self::DEFAULT_MAX_FRAME_PAYLOAD_LENGTH,
            allow_extensions: false,
            allow_mask_mismatch: false,
            expect_masked_frames: true,
        }
    }
}

/// Builder for [`WebSocketDecoderConfig`].
#[derive(Clone, Copy, Debug)]
pub struct WebSocketDecoderConfigBuilder {
    max_frame_payload_length: usize,
    allow_extensions: bool,
    allow_mask_mismatch: bool,
    expect_masked_frames: bool,
}

impl Default for WebSocketDecoderConfigBuilder {
    fn default() -> Self {
        let defaults = WebSocketDecoderConfig::default();
        Self {
            max_frame_payload_length: defaults.max_frame_payload_length,
            allow_extensions: defaults.allow_extensions,
            allow_mask_mismatch: defaults.allow_mask_mismatch,
            expect_masked_frames: defaults.expect_masked_frames,
        }
    }
}

impl WebSocketDecoderConfigBuilder {
    /// Sets the per-frame payload ceiling.
    #[must_use]
    pub const fn max_frame_payload_length(mut self, length: usize) -> Self {
        self.max_frame_payload_length = length;
        self
    }

    /// Tolerates reserved bits claimed by negotiated extensions.
    #[must_use]
    pub const fn allow_extensions(mut self, allow: bool) -> Self {
        self.allow_extensions = allow;
        self
    }

    /// Tolerates frames that violate the masking expectation.
    #[must_use]
    pub const fn allow_mask_mismatch(mut self, allow: bool) -> Self {
        self.allow_mask_mismatch = allow;
        self
    }

    /// Requires inbound frames to be masked.
    #[must_use]
    pub const fn expect_masked_frames(mut self, expect: bool) -> Self {
        self.expect_masked_frames = expect;
        self
    }

    /// Validates and produces the immutable configuration.
    pub fn build(self) -> Result<WebSocketDecoderConfig, ConfigError> {
        if self.max_frame_payload_length == 0 {
            return Err(ConfigError("max_frame_payload_length must be positive"));
        }
        Ok(WebSocketDecoderConfig {
            max_frame_payload_length: self.max_frame_payload_length,
            allow_extensions: self.allow_extensions,
            allow_mask_mismatch: self.allow_mask_mismatch,
            expect_masked_frames: self.expect_masked_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_server_role() {
        let config = WebSocketDecoderConfig::default();
        assert_eq!(config.max_frame_payload_length(), 65_536);
        assert!(!config.allow_extensions());
        assert!(!config.allow_mask_mismatch());
        assert!(config.expect_masked_frames());
    }

    #[test]
    fn builder_overrides_and_validates() {
        let config = WebSocketDecoderConfig::builder()
            .max_frame_payload_length(1024)
            .allow_extensions(true)
            .expect_masked_frames(false)
            .build()
            .expect("valid config");
        assert_eq!(config.max_frame_payload_length(), 1024);
        assert!(config.allow_extensions());
        assert!(!config.expect_masked_frames());

        let err = WebSocketDecoderConfig::builder()
            .max_frame_payload_length(0)
            .build()
            .expect_err("zero payload length");
        assert!(err.to_string().contains("must be positive"));
    }
}
