//! Shared AWS config and credentials file handling.

use crate::constants::*;
use ini::Ini;
use log::debug;
use searchgate_core::{Context, Error, Result};

pub(crate) const DEFAULT_PROFILE: &str = "default";
const DEFAULT_CREDENTIALS_FILE: &str = "~/.aws/credentials";
const DEFAULT_CONFIG_FILE: &str = "~/.aws/config";

/// The profile selected by `AWS_PROFILE`, or `fallback`.
pub(crate) fn profile_name(ctx: &Context, fallback: &str) -> String {
    ctx.env_var(AWS_PROFILE)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub(crate) fn credentials_file_path(ctx: &Context, explicit: Option<&str>) -> String {
    explicit
        .map(|v| v.to_string())
        .or_else(|| ctx.env_var(AWS_SHARED_CREDENTIALS_FILE))
        .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string())
}

pub(crate) fn config_file_path(ctx: &Context, explicit: Option<&str>) -> String {
    explicit
        .map(|v| v.to_string())
        .or_else(|| ctx.env_var(AWS_CONFIG_FILE))
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string())
}

/// Section name of `profile` in the shared config file.
///
/// The config file prefixes every profile except `default` with `profile `.
pub(crate) fn config_section_name(profile: &str) -> String {
    match profile {
        DEFAULT_PROFILE => DEFAULT_PROFILE.to_string(),
        x => format!("profile {x}"),
    }
}

/// Load an ini file.
///
/// Returns `Ok(None)` when the file can't be located or read, and an error
/// only when it exists but doesn't parse.
pub(crate) async fn load_ini(ctx: &Context, path: &str) -> Result<Option<Ini>> {
    let Some(expanded) = ctx.expand_home_dir(path) else {
        debug!("failed to expand homedir for path: {path}");
        return Ok(None);
    };

    let content = match ctx.file_read(&expanded).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read {expanded}: {err:?}");
            return Ok(None);
        }
    };

    let conf = Ini::load_from_str(&String::from_utf8_lossy(&content)).map_err(|e| {
        Error::config_invalid(format!("failed to parse {expanded}"))
            .with_source(anyhow::Error::new(e))
    })?;
    Ok(Some(conf))
}
