use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError};

/// 默认配置文件名（位于工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "quiz_tutor.toml";

/// 题目生成 / 反馈所使用的后端
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 通过 HTTP 调用辅导后端（/ai-questions, /quiz-feedback）
    Http,
    /// 直接调用 OpenAI 兼容的 LLM 接口
    Llm,
}

impl FromStr for BackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "llm" => Ok(BackendKind::Llm),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Http => f.write_str("http"),
            BackendKind::Llm => f.write_str("llm"),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 辅导后端地址
    pub api_base_url: String,
    /// 使用哪种后端生成题目
    pub backend: BackendKind,
    /// 每次测验的目标题目数量
    pub question_count: usize,
    /// HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 等待反馈文本的最长时间（秒）
    pub feedback_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// LLM 生成题目的最大尝试次数
    pub llm_max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            backend: BackendKind::Http,
            question_count: 5,
            request_timeout_secs: 60,
            feedback_timeout_secs: 15,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.groq.com/openai/v1".to_string(),
            llm_model_name: "llama-3.3-70b-versatile".to_string(),
            llm_max_retries: 3,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件 → 环境变量
    pub fn load() -> AppResult<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// 按 `lookup` 提供的变量加载配置
    ///
    /// - 设置了 `QUIZ_TUTOR_CONFIG` 时文件必须存在，读不到即报错
    /// - 未设置时读取工作目录下的 `quiz_tutor.toml`，不存在则用默认值
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup("QUIZ_TUTOR_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::from_file_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
        };
        base.with_env_overrides(lookup)
    }

    /// 只读取环境变量（不读取配置文件）
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件加载；文件不存在时返回默认配置
    pub fn from_file_or_default(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// 从 TOML 文件加载，文件缺失同样报错
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 用环境变量覆盖配置项
    ///
    /// `lookup` 按变量名返回变量值，便于测试时注入。
    pub fn with_env_overrides<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("QUIZ_BACKEND") {
            self.backend = parse_env("QUIZ_BACKEND", &v, "http | llm")?;
        }
        if let Some(v) = lookup("QUESTION_COUNT") {
            self.question_count = parse_env("QUESTION_COUNT", &v, "usize")?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", &v, "u64")?;
        }
        if let Some(v) = lookup("FEEDBACK_TIMEOUT_SECS") {
            self.feedback_timeout_secs = parse_env("FEEDBACK_TIMEOUT_SECS", &v, "u64")?;
        }
        if let Some(v) = lookup("VERBOSE_LOGGING") {
            self.verbose_logging = parse_env("VERBOSE_LOGGING", &v, "bool")?;
        }
        if let Some(v) = lookup("LLM_API_KEY") {
            self.llm_api_key = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = lookup("LLM_MAX_RETRIES") {
            self.llm_max_retries = parse_env("LLM_MAX_RETRIES", &v, "u32")?;
        }
        Ok(self)
    }
}

fn parse_env<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
    })
}
