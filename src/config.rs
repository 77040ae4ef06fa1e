use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_SYSTEM_PROMPT: &str = "Your name is HAL-PT and you are a programming assistant who can debug, review and teach all programming languages like github or stack overflow";
const DEFAULT_LINT_COMMAND: &str = "npx eslint";
const DEFAULT_LINT_PATTERNS: &str = "**/*.js";
const DEFAULT_MANIFEST_PATH: &str = "package.json";

const CREDENTIALS_FILE_NAME: &str = ".env";
const SUCCESS_LOG_FILE_NAME: &str = "log.json";
const ERROR_LOG_FILE_NAME: &str = "error.txt";

#[derive(Debug, Clone)]
pub struct Config {
    pub home_dir: PathBuf,
    pub api_base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub request_timeout_secs: Option<u64>,
    pub lint_command: Vec<String>,
    pub lint_patterns: Vec<String>,
    pub manifest_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok(), executable_dir())
    }

    pub(crate) fn from_env_with(
        mut get_var: impl FnMut(&str) -> Option<String>,
        default_home: PathBuf,
    ) -> Self {
        let home_dir = parse_path(get_var("HALPT_HOME").as_deref()).unwrap_or(default_home);
        let request_timeout_secs =
            parse_positive_u64(get_var("HALPT_REQUEST_TIMEOUT_SECS").as_deref());
        let lint_command = parse_lint_command(get_var("HALPT_LINT_COMMAND").as_deref());
        let lint_patterns = parse_lint_patterns(get_var("HALPT_LINT_PATTERNS").as_deref());
        let manifest_path = parse_path(get_var("HALPT_MANIFEST_PATH").as_deref())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_PATH));

        Self {
            home_dir,
            api_base_url: non_empty(get_var("HALPT_API_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            model: non_empty(get_var("HALPT_MODEL")).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: non_empty(get_var("HALPT_SYSTEM_PROMPT"))
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            request_timeout_secs,
            lint_command,
            lint_patterns,
            manifest_path,
        }
    }

    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        Self::from_env_with(|_| None, home_dir.into())
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.home_dir.join(CREDENTIALS_FILE_NAME)
    }

    pub fn success_log_path(&self) -> PathBuf {
        self.home_dir.join(SUCCESS_LOG_FILE_NAME)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.home_dir.join(ERROR_LOG_FILE_NAME)
    }
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_path(raw: Option<&str>) -> Option<PathBuf> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_positive_u64(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn parse_lint_command(raw: Option<&str>) -> Vec<String> {
    let words: Vec<String> = raw
        .unwrap_or(DEFAULT_LINT_COMMAND)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if words.is_empty() {
        return parse_lint_command(None);
    }
    words
}

fn parse_lint_patterns(raw: Option<&str>) -> Vec<String> {
    let patterns: Vec<String> = raw
        .unwrap_or(DEFAULT_LINT_PATTERNS)
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect();
    if patterns.is_empty() {
        return vec![DEFAULT_LINT_PATTERNS.to_string()];
    }
    patterns
}
