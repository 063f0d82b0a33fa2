use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::pipeline::rules::RuleTable;
use crate::textutil::LINE_SEPARATOR;

pub const CONFIG_FILE_NAME: &str = "asozd-parser.toml";
pub const CONFIG_ENV_VAR: &str = "ASOZD_PARSER_CONFIG";
const CONFIG_SEARCH_LEVELS: usize = 4;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub parser: ParserSection,
    /// Rule table in declaration order. Empty means "use the built-in table".
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ParserSection {
    /// Field whose value names the JSON file and the exported images.
    #[serde(default)]
    pub identity_field: Option<String>,
    #[serde(default)]
    pub line_separator: Option<String>,
    /// Image folder inside the destination directory.
    #[serde(default)]
    pub images_dir: Option<String>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: String,
    #[serde(default)]
    pub order_id: u32,
    /// Recognises a paragraph when it matches at the start of the trimmed text.
    #[serde(default)]
    pub start_pattern: Option<String>,
    /// Vetoes a start-pattern match when it also matches at the start.
    #[serde(default)]
    pub exclusion_pattern: Option<String>,
    /// Fields that may be found inside a paragraph assigned to this one.
    #[serde(default)]
    pub also_contains: Vec<String>,
    #[serde(default)]
    pub keep_matched_prefix: bool,
    #[serde(default)]
    pub is_image: bool,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub filter_blank: bool,
    /// Unanchored pattern used when this field is extracted from another field's paragraph.
    #[serde(default)]
    pub search_pattern: Option<String>,
    #[serde(default)]
    pub strip_links: bool,
    #[serde(default)]
    pub leave_in_place: bool,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("parse parser config (toml)")
    }

    pub fn from_toml_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read parser config: {}", path.display()))?;
        let s = String::from_utf8(bytes).context("parser config must be utf-8")?;
        Self::from_toml_str(&s).with_context(|| format!("load {}", path.display()))
    }
}

/// Resolved, immutable configuration shared by every document of a run.
#[derive(Debug)]
pub struct ParserConfig {
    pub config_path: Option<PathBuf>,
    pub rules: RuleTable,
    pub line_separator: String,
    pub images_dir: String,
    pub jobs: Option<usize>,
}

impl ParserConfig {
    pub fn builtin() -> anyhow::Result<Self> {
        let cfg = AppConfig::from_toml_str(DEFAULT_CONFIG_TOML).context("built-in config")?;
        Self::from_app_config(cfg, None)
    }

    /// Explicit path, then `ASOZD_PARSER_CONFIG`, then `asozd-parser.toml` searched upwards from
    /// the working directory; built-in defaults when none is found.
    pub fn load(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty());
        let cfg_path = match explicit.or(env_path) {
            Some(p) => {
                if !p.exists() {
                    return Err(anyhow!("config not found: {}", p.display()));
                }
                Some(p)
            }
            None => {
                let workdir = std::env::current_dir().context("current dir")?;
                find_file_upwards(&workdir, CONFIG_FILE_NAME, CONFIG_SEARCH_LEVELS)
            }
        };

        match cfg_path {
            Some(p) => {
                tracing::info!("using parser config {}", p.display());
                let cfg = AppConfig::from_toml_path(&p)?;
                Self::from_app_config(cfg, Some(p))
            }
            None => {
                tracing::debug!("no {CONFIG_FILE_NAME} found, using built-in rule table");
                Self::builtin()
            }
        }
    }

    pub fn from_app_config(cfg: AppConfig, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let fields = if cfg.fields.is_empty() {
            AppConfig::from_toml_str(DEFAULT_CONFIG_TOML)
                .context("built-in config")?
                .fields
        } else {
            cfg.fields
        };
        let identity_field = cfg
            .parser
            .identity_field
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTITY_FIELD.to_string());
        let rules = RuleTable::from_specs(&fields, &identity_field).context("compile rule table")?;

        let line_separator = cfg
            .parser
            .line_separator
            .unwrap_or_else(|| LINE_SEPARATOR.to_string());
        let images_dir = cfg
            .parser
            .images_dir
            .map(|s| s.trim().trim_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGES_DIR.to_string());
        let jobs = cfg.parser.jobs.filter(|n| *n > 0);

        Ok(Self {
            config_path,
            rules,
            line_separator,
            images_dir,
            jobs,
        })
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILE_NAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

pub const DEFAULT_IDENTITY_FIELD: &str = "fio";
pub const DEFAULT_IMAGES_DIR: &str = "images";

pub const DEFAULT_CONFIG_TOML: &str = r#"[parser]
identity_field = "fio"
images_dir = "images"
# Separator put between paragraphs appended to the same field (platform default when unset).
# line_separator = "\r\n"
# jobs = 4

# Fields are tried in the order they are declared here; order_id is informational.

[[fields]]
id = "fio"
order_id = 1
start_pattern = '^[А-Я][а-яё\-]+\s+[А-Я][а-яё\-]+\s+[А-Я][а-яё\-]+$'
# avoid recognising the first words of a position line as a name
exclusion_pattern = '^(Депутат Государственной Думы|Законотворчество|Депутат|Представитель) '
also_contains = ["photo"]
keep_matched_prefix = true

[[fields]]
id = "photo"
order_id = 2
is_image = true

[[fields]]
id = "position"
order_id = 3
start_pattern = '(^Депутат|^Представитель)'
keep_matched_prefix = true

[[fields]]
id = "fraction"
order_id = 4
start_pattern = '^Фракция'
keep_matched_prefix = true

[[fields]]
id = "bio"
order_id = 5
start_pattern = '^Биография:?\s*'

[[fields]]
id = "relations"
order_id = 6
start_pattern = '^Аффиляция, связи:?\s*'
also_contains = ["family"]

[[fields]]
id = "submitted"
order_id = 7
start_pattern = '^Внесенные законопроекты:?\s*'

# Examples:
#   Депутат женат с 2013 г., имеет дочь.
#   Женат, имеет двух сыновей.
#   <a href="link">Женат, двое детей</a> (9).
[[fields]]
id = "family"
order_id = 8
search_pattern = '(<a[^>]+>)?([А-Яа-яё\s]+)?(Женат|женат|замужем|Замужем)(?:.*?[^г])??(?:\.|$)'
leave_in_place = true
strip_links = true

[[fields]]
id = "conclusion"
order_id = 9
start_pattern = 'Выводы:?\s*'

[[fields]]
id = "lobby"
order_id = 10
start_pattern = '(Групп(а|ы) лоббистов:?\s*|Групп(а|ы) интересов:?\s*)'
is_list = true
filter_blank = true
"#;
