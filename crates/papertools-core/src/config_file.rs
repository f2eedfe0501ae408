use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub naming: Option<NamingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub openai_api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub max_pages: Option<usize>,
    pub max_prompt_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingConfig {
    pub max_component_len: Option<usize>,
}

/// Platform config directory path: `<config_dir>/papertools/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("papertools").join("config.toml"))
}

/// Load config by cascading CWD `.papertools.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".papertools.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let api_b = base.api.unwrap_or_default();
    let api_o = overlay.api.unwrap_or_default();
    let ext_b = base.extraction.unwrap_or_default();
    let ext_o = overlay.extraction.unwrap_or_default();
    let nam_b = base.naming.unwrap_or_default();
    let nam_o = overlay.naming.unwrap_or_default();

    ConfigFile {
        api: Some(ApiConfig {
            openai_api_key: api_o.openai_api_key.or(api_b.openai_api_key),
            base_url: api_o.base_url.or(api_b.base_url),
            model: api_o.model.or(api_b.model),
            timeout_secs: api_o.timeout_secs.or(api_b.timeout_secs),
        }),
        extraction: Some(ExtractionConfig {
            max_pages: ext_o.max_pages.or(ext_b.max_pages),
            max_prompt_chars: ext_o.max_prompt_chars.or(ext_b.max_prompt_chars),
        }),
        naming: Some(NamingConfig {
            max_component_len: nam_o.max_component_len.or(nam_b.max_component_len),
        }),
    }
}

/// Save `config` to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

/// Save `config` to `path`, creating parent directories as needed.
pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(())
}

/// Store `key` in the config file at `path`, keeping every other setting.
pub fn store_api_key_at(path: &Path, key: &str) -> Result<(), String> {
    let mut config = load_from_path(path).unwrap_or_default();
    config
        .api
        .get_or_insert_with(ApiConfig::default)
        .openai_api_key = Some(key.to_string());
    save_to_path(&config, path)
}
