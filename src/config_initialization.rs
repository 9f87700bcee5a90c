//! Configuration hierarchy: CLI > Env > File > Defaults
//!
//! Environment variables arrive through clap's `env` attributes, so the CLI
//! and environment layers are already merged by the time they get here.

use tracing::debug;

use crate::adapters::sink_libav::EncoderSettings;
use crate::adapters::toml_config::FileConfig;
use crate::cli::{Cli, DecimateArgs, RetentionArgs};
use crate::domain::model::RetentionLimit;
use crate::engine::KeyMode;
use crate::error::DecimateResult;
use crate::utils::logging::LoggingConfig;

/// Retention parameters after all layers are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionSettings {
    pub limit: RetentionLimit,
    pub key_mode: KeyMode,
}

/// Everything the `decimate` command needs
#[derive(Debug, Clone, PartialEq)]
pub struct DecimateSettings {
    pub retention: RetentionSettings,
    pub encoder: EncoderSettings,
    pub overwrite: bool,
}

/// Resolve logging from the global flags and the `[logging]` table
pub fn resolve_logging(cli: &Cli, file: &FileConfig) -> LoggingConfig {
    let mut config = file.logging.clone().unwrap_or_default();
    if let Some(level) = cli.log_level {
        config.level = level;
    }
    if let Some(format) = cli.log_format {
        config.format = format;
    }
    config
}

/// Resolve the retention limit and comparison mode.
///
/// A file value for `num_repeats` goes through the same validation as the
/// command line, so `0` or a negative count fails before any frame is read.
pub fn resolve_retention(args: &RetentionArgs, file: &FileConfig) -> DecimateResult<RetentionSettings> {
    let limit = match (args.num_repeats, file.decimate.num_repeats) {
        (Some(n), _) => RetentionLimit::new(n)?,
        (None, Some(n)) => RetentionLimit::from_i64(n)?,
        (None, None) => RetentionLimit::default(),
    };

    let key_mode = match (args.key_mode, file.decimate.key_mode.as_deref()) {
        (Some(mode), _) => mode,
        (None, Some(mode)) => mode.parse()?,
        (None, None) => KeyMode::default(),
    };

    debug!("Retention: keep {} per run, compare by {:?}", limit, key_mode);
    Ok(RetentionSettings { limit, key_mode })
}

/// Resolve all `decimate` settings
pub fn resolve_decimate(args: &DecimateArgs, file: &FileConfig) -> DecimateResult<DecimateSettings> {
    let retention = resolve_retention(&args.retention, file)?;
    let defaults = EncoderSettings::default();

    let encoder = EncoderSettings {
        codec: args
            .codec
            .clone()
            .or_else(|| file.decimate.codec.clone())
            .unwrap_or(defaults.codec),
        bit_rate: args.bit_rate.or(file.decimate.bit_rate),
        crf: args.crf.or(file.decimate.crf),
    };

    Ok(DecimateSettings {
        retention,
        encoder,
        overwrite: args.overwrite || file.decimate.overwrite.unwrap_or(false),
    })
}
