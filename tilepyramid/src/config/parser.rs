//! Mapping between `Ini` documents and [`MapConfig`].
//!
//! This is the only place INI section and key names appear.

use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::MapConfig;

/// Parse an `Ini` into a `MapConfig`, overlaying values on the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<MapConfig, ConfigFileError> {
    let mut config = MapConfig::default();

    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = non_empty(section, "url_template") {
            config = config.with_url_template(v);
        }
        if let Some(v) = non_empty(section, "default_source") {
            config = config.with_default_source(v);
        }
        if let Some(v) = non_empty(section, "access_token") {
            config = config.with_access_token(v);
        }
    }

    if let Some(section) = ini.section(Some("http")) {
        if let Some(v) = section.get("timeout") {
            let timeout: u64 = parse_number("http", "timeout", v, "expected whole seconds")?;
            if timeout == 0 {
                return Err(invalid("http", "timeout", v, "must be at least 1 second"));
            }
            config = config.with_timeout_secs(timeout);
        }
        if let Some(v) = non_empty(section, "user_agent") {
            config = config.with_user_agent(v);
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("retain_tiles") {
            let count = parse_number("cache", "retain_tiles", v, "expected a tile count")?;
            config = config.with_retain_tiles(count);
        }
    }

    if let Some(section) = ini.section(Some("map")) {
        if let Some(v) = section.get("zoom") {
            let zoom: u8 = parse_number("map", "zoom", v, "expected a zoom level 0-22")?;
            if zoom > crate::coord::MAX_ZOOM {
                return Err(invalid("map", "zoom", v, "expected a zoom level 0-22"));
            }
            config = config.with_zoom(zoom);
        }
    }

    Ok(config)
}

/// Render a `MapConfig` as an `Ini`. Unset optional values are omitted.
pub(super) fn to_ini(config: &MapConfig) -> Ini {
    let mut ini = Ini::new();

    {
        let mut section = ini.with_section(Some("source"));
        if let Some(v) = config.url_template() {
            section.set("url_template", v);
        }
        if let Some(v) = config.default_source() {
            section.set("default_source", v);
        }
        if let Some(v) = config.access_token() {
            section.set("access_token", v);
        }
    }

    ini.with_section(Some("http"))
        .set("timeout", config.timeout_secs().to_string())
        .set("user_agent", config.user_agent());
    ini.with_section(Some("cache"))
        .set("retain_tiles", config.retain_tiles().to_string());
    ini.with_section(Some("map"))
        .set("zoom", config.zoom().to_string());

    ini
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
