pub mod keys;

use crate::{
    constants::{DEFAULT_PREFIX_KEY, DEFAULT_SIDEBAR_WIDTH},
    paths::{self, expand_tilde},
    tmux::PopupPosition,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

pub use keys::{Command, KeysConfig};

const DEFAULT_CONFIG: &str = r#"# grove configuration
#
# prefix = "C-s"              # tmux key (after the tmux prefix) that opens the sidebar
#
# [sidebar]
# width = "30%"
# position = "left"           # or "right"
#
# [[repos]]
# path = "~/code/api"
# name = "api"                # defaults to the directory name
# default_branch = "main"
# setup = ["npm install"]     # run in every new worktree
#
# [[auto_start]]
# repo = "api"
# worktrees = ["main"]
#
# [[auto_start]]
# workspace = "notes"
# path = "~/notes"
"#;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Key bound (after the tmux prefix) to the sidebar popup.
    #[serde(default = "Config::default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub sidebar: SidebarConfig,

    /// Repositories grove manages worktrees for, in sidebar order.
    /// ```toml
    /// [[repos]]
    /// path = "~/code/api"
    /// setup = ["npm install"]
    /// ```
    #[serde(default)]
    pub repos: Vec<RepoConfig>,

    /// Workspaces `grove start` makes sure exist.
    #[serde(default)]
    pub auto_start: Vec<AutoStartEntry>,

    /// Color theme configuration.
    #[serde(default)]
    pub theme: ThemeConfig,

    /// Key binding configuration.
    /// To unbind an inherited key mapping, assign it to `noop`.
    #[serde(default)]
    pub keys: KeysConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
            sidebar: SidebarConfig::default(),
            repos: Vec::new(),
            auto_start: Vec::new(),
            theme: ThemeConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SidebarPosition {
    #[default]
    Left,
    Right,
}

impl From<SidebarPosition> for PopupPosition {
    fn from(position: SidebarPosition) -> Self {
        match position {
            SidebarPosition::Left => PopupPosition::Left,
            SidebarPosition::Right => PopupPosition::Right,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SidebarConfig {
    #[serde(default = "SidebarConfig::default_width")]
    pub width: String,
    #[serde(default)]
    pub position: SidebarPosition,
}

impl SidebarConfig {
    fn default_width() -> String {
        DEFAULT_SIDEBAR_WIDTH.to_string()
    }
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            position: SidebarPosition::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    #[serde(deserialize_with = "deserialize_path")]
    pub path: PathBuf,
    /// Filled from the directory name when omitted.
    #[serde(default)]
    pub name: String,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub setup: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged, deny_unknown_fields)]
pub enum AutoStartEntry {
    Worktrees {
        repo: String,
        worktrees: Vec<String>,
    },
    Workspace {
        workspace: String,
        #[serde(default, deserialize_with = "deserialize_optional_path")]
        path: Option<PathBuf>,
    },
}

fn deserialize_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_tilde(&s).ok_or_else(|| {
        serde::de::Error::custom(format!("cannot expand '{s}': home directory unknown"))
    })
}

fn deserialize_optional_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_path(deserializer).map(Some)
}

impl Config {
    fn default_prefix() -> String {
        DEFAULT_PREFIX_KEY.to_string()
    }

    pub fn find_repo(&self, name: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.name == name)
    }

    /// Repo names in configured order; this is the sidebar's grouping order.
    pub fn repo_order(&self) -> Vec<String> {
        self.repos.iter().map(|r| r.name.clone()).collect()
    }

    fn fill_repo_names(&mut self) -> Result<()> {
        for repo in &mut self.repos {
            if repo.name.is_empty() {
                repo.name = paths::basename(&repo.path).with_context(|| {
                    format!("cannot derive a name for repo {}", repo.path.display())
                })?;
            }
        }
        let mut seen = HashSet::new();
        for repo in &self.repos {
            if !seen.insert(repo.name.as_str()) {
                bail!("duplicate repo name '{}'", repo.name);
            }
        }
        Ok(())
    }

    /// Check that every configured repo path is an existing directory.
    pub fn validate_paths(&self) -> Result<()> {
        for repo in &self.repos {
            if !repo.path.is_dir() {
                bail!(
                    "repo '{}': {} does not exist or is not a directory",
                    repo.name,
                    repo.path.display()
                );
            }
        }
        Ok(())
    }
}

pub fn load_config_from_str(s: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(s)?;
    config.fill_repo_names()?;
    Ok(config)
}

/// The config file in use: the override when given, the XDG location otherwise.
pub fn config_path(config_override: Option<&Path>) -> Result<PathBuf> {
    match config_override {
        Some(path) => Ok(path.to_path_buf()),
        None => paths::config_file(),
    }
}

/// Write the commented default config if nothing exists at `path` yet.
pub fn ensure_config_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("writing default config {}", path.display()))?;
    log::info!("created default config at {}", path.display());
    Ok(())
}

fn read_config(config_override: Option<&Path>, create_default: bool) -> Result<Config> {
    let path = config_path(config_override)?;
    if !path.exists() {
        if config_override.is_some() {
            bail!("Config file not found at {}", path.display());
        }
        if !create_default {
            return Ok(Config::default());
        }
        ensure_config_file(&path)?;
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    load_config_from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Load and fully validate the config, creating the default file when absent.
pub fn load_config(config_override: Option<&Path>) -> Result<Config> {
    let config = read_config(config_override, true)?;
    config.validate_paths()?;
    Ok(config)
}

/// Load without touching the filesystem beyond reading, and without checking repo paths.
pub fn load_config_fast(config_override: Option<&Path>) -> Result<Config> {
    read_config(config_override, false)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    /// Cursor highlight (default: "green").
    #[serde(
        default = "ThemeConfig::default_accent",
        deserialize_with = "deserialize_color"
    )]
    pub accent: ThemeColor,
    /// Repo headers (default: "cyan").
    #[serde(
        default = "ThemeConfig::default_secondary",
        deserialize_with = "deserialize_color"
    )]
    pub secondary: ThemeColor,
    /// Marker of the current session (default: "green").
    #[serde(
        default = "ThemeConfig::default_success",
        deserialize_with = "deserialize_color"
    )]
    pub success: ThemeColor,
    /// Error color (default: "red").
    #[serde(
        default = "ThemeConfig::default_error",
        deserialize_with = "deserialize_color"
    )]
    pub error: ThemeColor,
    /// Notification badge (default: "yellow").
    #[serde(
        default = "ThemeConfig::default_warning",
        deserialize_with = "deserialize_color"
    )]
    pub warning: ThemeColor,
    /// Muted/dim text color (default: "darkgray").
    #[serde(
        default = "ThemeConfig::default_muted",
        deserialize_with = "deserialize_color"
    )]
    pub muted: ThemeColor,
    /// Border color (default: "darkgray").
    #[serde(
        default = "ThemeConfig::default_border",
        deserialize_with = "deserialize_color"
    )]
    pub border: ThemeColor,
    /// Key hints in the footer (default: "blue").
    #[serde(
        default = "ThemeConfig::default_hint",
        deserialize_with = "deserialize_color"
    )]
    pub hint: ThemeColor,
    /// Foreground of the row under the cursor (default: "black").
    #[serde(
        default = "ThemeConfig::default_highlight_fg",
        deserialize_with = "deserialize_color"
    )]
    pub highlight_fg: ThemeColor,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            accent: Self::default_accent(),
            secondary: Self::default_secondary(),
            success: Self::default_success(),
            error: Self::default_error(),
            warning: Self::default_warning(),
            muted: Self::default_muted(),
            border: Self::default_border(),
            hint: Self::default_hint(),
            highlight_fg: Self::default_highlight_fg(),
        }
    }
}

impl ThemeConfig {
    fn default_accent() -> ThemeColor {
        ThemeColor::Named(NamedColor::Green)
    }
    fn default_secondary() -> ThemeColor {
        ThemeColor::Named(NamedColor::Cyan)
    }
    fn default_success() -> ThemeColor {
        ThemeColor::Named(NamedColor::Green)
    }
    fn default_error() -> ThemeColor {
        ThemeColor::Named(NamedColor::Red)
    }
    fn default_warning() -> ThemeColor {
        ThemeColor::Named(NamedColor::Yellow)
    }
    fn default_muted() -> ThemeColor {
        ThemeColor::Named(NamedColor::DarkGray)
    }
    fn default_border() -> ThemeColor {
        ThemeColor::Named(NamedColor::DarkGray)
    }
    fn default_hint() -> ThemeColor {
        ThemeColor::Named(NamedColor::Blue)
    }
    fn default_highlight_fg() -> ThemeColor {
        ThemeColor::Named(NamedColor::Black)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeColor {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Gray,
    DarkGray,
}

impl NamedColor {
    const ALL: &[(&str, NamedColor)] = &[
        ("black", NamedColor::Black),
        ("blue", NamedColor::Blue),
        ("cyan", NamedColor::Cyan),
        ("darkgray", NamedColor::DarkGray),
        ("gray", NamedColor::Gray),
        ("green", NamedColor::Green),
        ("magenta", NamedColor::Magenta),
        ("red", NamedColor::Red),
        ("white", NamedColor::White),
        ("yellow", NamedColor::Yellow),
    ];

    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, color)| *color == self)
            .map_or("white", |(name, _)| name)
    }
}

impl std::fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(n) => f.write_str(n.as_str()),
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl Serialize for ThemeColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl ThemeColor {
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(hex) = s.strip_prefix('#')
            && hex.len() == 6
        {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Self::Rgb(r, g, b));
        }
        let lower = s.to_lowercase().replace(['_', '-'], "");
        let lookup = match lower.as_str() {
            "grey" => "gray",
            "darkgrey" => "darkgray",
            other => other,
        };
        NamedColor::ALL
            .iter()
            .find(|(name, _)| *name == lookup)
            .map(|(_, color)| Self::Named(*color))
    }
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<ThemeColor, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ThemeColor::parse(&s).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid color '{s}': expected a named color (black, red, green, yellow, blue, magenta, cyan, white, gray, darkgray) or hex (#rrggbb)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.prefix, "C-s");
        assert_eq!(config.sidebar.width, "30%");
        assert_eq!(config.sidebar.position, SidebarPosition::Left);
        assert!(config.repos.is_empty());
        assert!(config.auto_start.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = load_config_from_str(
            r#"
prefix = "g"

[sidebar]
width = "40"
position = "right"

[[repos]]
path = "/code/api"
default_branch = "main"
setup = ["make deps"]

[[repos]]
path = "/code/web-app"
name = "web"

[[auto_start]]
repo = "api"
worktrees = ["main", "feat-x"]

[[auto_start]]
workspace = "notes"
path = "/notes"
"#,
        )
        .unwrap();
        assert_eq!(config.prefix, "g");
        assert_eq!(config.sidebar.position, SidebarPosition::Right);
        assert_eq!(config.repo_order(), vec!["api", "web"]);
        let api = config.find_repo("api").unwrap();
        assert_eq!(api.default_branch.as_deref(), Some("main"));
        assert_eq!(api.setup, vec!["make deps"]);
        assert_eq!(
            config.auto_start[0],
            AutoStartEntry::Worktrees {
                repo: "api".to_string(),
                worktrees: vec!["main".to_string(), "feat-x".to_string()],
            }
        );
        assert_eq!(
            config.auto_start[1],
            AutoStartEntry::Workspace {
                workspace: "notes".to_string(),
                path: Some(PathBuf::from("/notes")),
            }
        );
    }

    #[test]
    fn test_repo_path_tilde_expanded() {
        let config = load_config_from_str(
            r#"
[[repos]]
path = "~/code/api"
"#,
        )
        .unwrap();
        let repo = &config.repos[0];
        assert!(!repo.path.to_string_lossy().starts_with('~'));
        assert!(repo.path.ends_with("code/api"));
        assert_eq!(repo.name, "api");
    }

    #[test]
    fn test_duplicate_repo_names_rejected() {
        let result = load_config_from_str(
            r#"
[[repos]]
path = "/a/api"

[[repos]]
path = "/b/api"
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate repo name"), "Error was: {err}");
    }

    #[test]
    fn test_validate_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "").unwrap();

        let ok = load_config_from_str(&format!(
            "[[repos]]\npath = \"{}\"\n",
            dir.path().display()
        ))
        .unwrap();
        assert!(ok.validate_paths().is_ok());

        let not_dir =
            load_config_from_str(&format!("[[repos]]\npath = \"{}\"\n", file.display())).unwrap();
        assert!(not_dir.validate_paths().is_err());

        let missing =
            load_config_from_str("[[repos]]\npath = \"/definitely/not/here\"\n").unwrap();
        assert!(missing.validate_paths().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(load_config_from_str("unknown_field = true").is_err());
        assert!(load_config_from_str("[sidebar]\nheight = 3").is_err());
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(load_config(Some(&path)).is_err());
        assert!(load_config_fast(Some(&path)).is_err());
    }

    #[test]
    fn test_override_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grove.toml");
        fs::write(&path, "prefix = \"C-g\"\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().prefix, "C-g");
    }

    #[test]
    fn test_default_config_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        ensure_config_file(&path).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(config.repos.is_empty());
        // Existing files are left alone.
        fs::write(&path, "prefix = \"x\"\n").unwrap();
        ensure_config_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "prefix = \"x\"\n");
    }

    #[test]
    fn test_theme_config_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.theme.accent, ThemeColor::Named(NamedColor::Green));
        assert_eq!(config.theme.secondary, ThemeColor::Named(NamedColor::Cyan));
        assert_eq!(config.theme.muted, ThemeColor::Named(NamedColor::DarkGray));
        assert_eq!(
            config.theme.highlight_fg,
            ThemeColor::Named(NamedColor::Black)
        );
    }

    #[test]
    fn test_theme_config_custom() {
        let config = load_config_from_str(
            r##"
[theme]
accent = "blue"
secondary = "#ff00ff"
"##,
        )
        .unwrap();
        assert_eq!(config.theme.accent, ThemeColor::Named(NamedColor::Blue));
        assert_eq!(config.theme.secondary, ThemeColor::Rgb(255, 0, 255));
        assert_eq!(config.theme.success, ThemeColor::Named(NamedColor::Green));
    }

    #[test]
    fn test_theme_invalid_color_rejected() {
        let err = load_config_from_str("[theme]\naccent = \"notacolor\"\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid color"), "Error was: {err}");
    }

    #[test]
    fn test_theme_color_parse() {
        assert_eq!(
            ThemeColor::parse("RED"),
            Some(ThemeColor::Named(NamedColor::Red))
        );
        assert_eq!(
            ThemeColor::parse("#ff0000"),
            Some(ThemeColor::Rgb(255, 0, 0))
        );
        assert_eq!(
            ThemeColor::parse("dark_grey"),
            Some(ThemeColor::Named(NamedColor::DarkGray))
        );
        assert_eq!(ThemeColor::parse("#fff"), None);
        assert_eq!(ThemeColor::parse("#zzzzzz"), None);
        assert_eq!(ThemeColor::Rgb(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn test_keys_section_parsed() {
        let config = load_config_from_str(
            r#"
[keys.browse]
"x" = "delete_workspace"
"#,
        )
        .unwrap();
        assert_eq!(
            config.keys.browse.get(&crate::keyboard::KeyEvent::char('x')),
            Some(&Command::DeleteWorkspace)
        );
    }
}
