use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, deserializes,
    /// applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, placeholder expansion
    /// fails, TOML parsing fails, an override is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let mut config = Self::parse(&raw)?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from defaults and environment variables only
    ///
    /// # Errors
    ///
    /// Returns an error if an override is malformed or validation fails
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Expand placeholders in raw TOML text and deserialize it
    ///
    /// No overrides are applied and nothing is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if expansion or TOML parsing fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))
    }

    /// Validate that the configuration is internally consistent
    ///
    /// Provider names and credentials are checked later by the synthesizer
    /// factory, which reports them as configuration errors of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if a general TTS setting is unusable
    pub fn validate(&self) -> anyhow::Result<()> {
        let tts = &self.tts;

        if tts.output_dir.as_os_str().is_empty() {
            anyhow::bail!("tts.output_dir must not be empty");
        }

        if tts.max_concurrent_requests == 0 {
            anyhow::bail!("tts.max_concurrent_requests must be greater than 0");
        }

        if tts.timeout.is_zero() {
            anyhow::bail!("tts.timeout must be greater than 0");
        }

        Ok(())
    }
}
