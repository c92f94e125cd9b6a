use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracelens_core::error::{Result, TraceError};
use tracelens_core::extract::{Extractor, KeyTable};
use tracelens_core::histogram::{DEFAULT_EDGES_MS, LatencyBand, bands_from_edges};
use tracelens_core::{Analyzer, Classifier, DuplicatePolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub duplicate_spans: DuplicatePolicy,
    pub histogram_edges_ms: Vec<f64>,
    pub key_table: KeyTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duplicate_spans: DuplicatePolicy::default(),
            histogram_edges_ms: DEFAULT_EDGES_MS.to_vec(),
            key_table: KeyTable::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            tracing::debug!(path = %config_path.display(), "loaded config file");
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides();
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn bands(&self) -> Vec<LatencyBand> {
        bands_from_edges(&self.histogram_edges_ms)
    }

    pub fn analyzer(&self) -> Analyzer {
        Analyzer::new(
            self.duplicate_spans,
            Classifier::default(),
            Extractor::new(self.key_table.clone()),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    duplicate_spans: Option<String>,
    histogram_bands: Option<String>,
    llm_input_keys: Option<Vec<String>>,
    llm_output_keys: Option<Vec<String>>,
    tool_input_keys: Option<Vec<String>>,
    tool_output_keys: Option<Vec<String>>,
    agent_input_keys: Option<Vec<String>>,
    agent_output_keys: Option<Vec<String>>,
    generic_input_keys: Option<Vec<String>>,
    generic_output_keys: Option<Vec<String>>,
    tool_name_keys: Option<Vec<String>>,
    model_id_keys: Option<Vec<String>>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("TRACELENS_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("tracelens/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TraceError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TraceError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> ConfigOverrides {
    ConfigOverrides {
        duplicate_spans: env::var("TRACELENS_DUPLICATE_SPANS").ok(),
        histogram_bands: env::var("TRACELENS_HISTOGRAM_BANDS").ok(),
        ..ConfigOverrides::default()
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.duplicate_spans {
        cfg.duplicate_spans = v.parse().map_err(|e| {
            TraceError::Config(format!("bad duplicate_spans in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.histogram_bands {
        cfg.histogram_edges_ms = parse_band_edges(&v).map_err(|e| {
            TraceError::Config(format!("bad histogram_bands in {source}: {e} (value={v})"))
        })?;
    }

    let table = &mut cfg.key_table;
    let lists = [
        (overrides.llm_input_keys, &mut table.llm.input),
        (overrides.llm_output_keys, &mut table.llm.output),
        (overrides.tool_input_keys, &mut table.tool.input),
        (overrides.tool_output_keys, &mut table.tool.output),
        (overrides.agent_input_keys, &mut table.agent.input),
        (overrides.agent_output_keys, &mut table.agent.output),
        (overrides.generic_input_keys, &mut table.generic.input),
        (overrides.generic_output_keys, &mut table.generic.output),
        (overrides.tool_name_keys, &mut table.tool_name),
        (overrides.model_id_keys, &mut table.model_id),
    ];
    for (value, slot) in lists {
        if let Some(keys) = value {
            *slot = keys;
        }
    }
    Ok(())
}

/// Parses comma-separated band edges such as `100ms,500ms,1s` into
/// strictly increasing milliseconds.
pub fn parse_band_edges(raw: &str) -> Result<Vec<f64>> {
    let mut out: Vec<f64> = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let duration = humantime::parse_duration(trimmed)
            .map_err(|e| TraceError::Config(format!("invalid band edge {trimmed}: {e}")))?;
        let ms = duration.as_secs_f64() * 1_000.0;
        if ms <= 0.0 {
            return Err(TraceError::Config(format!("band edge must be positive: {trimmed}")));
        }
        if let Some(&prev) = out.last()
            && ms <= prev
        {
            return Err(TraceError::Config(format!(
                "band edges must increase: {trimmed} after {prev}ms"
            )));
        }
        out.push(ms);
    }
    if out.is_empty() {
        return Err(TraceError::Config("no band edges given".to_string()));
    }
    Ok(out)
}
