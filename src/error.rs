use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 测验后端 HTTP 调用错误
    Api(ApiError),
    /// LLM 服务错误
    Llm(LlmError),
    /// 配置错误
    Config(ConfigError),
    /// 用户输入不合法，内容直接展示给用户
    InvalidInput(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::Llm(e) => write!(f, "LLM错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::InvalidInput(msg) => write!(f, "输入错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Api(e) => Some(e),
            AppError::Llm(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::InvalidInput(_) => None,
        }
    }
}

/// API 调用错误
#[derive(Debug)]
pub enum ApiError {
    /// 网络请求失败（连接、超时等）
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应，message 为服务端给出的 error / detail 字段
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// API 返回空结果
    EmptyResponse { endpoint: String },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "API请求失败 ({}): {}", endpoint, source)
            }
            ApiError::BadResponse {
                endpoint,
                status,
                message,
            } => {
                write!(
                    f,
                    "API返回错误响应 ({}): status={}, message={:?}",
                    endpoint, status, message
                )
            }
            ApiError::EmptyResponse { endpoint } => {
                write!(f, "API返回空结果: {}", endpoint)
            }
            ApiError::JsonParseFailed { source } => {
                write!(f, "JSON解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. } | ApiError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// LLM 服务错误
#[derive(Debug)]
pub enum LlmError {
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    EmptyContent { model: String },
    /// 多次重试后仍然失败
    RetriesExhausted { attempts: u32 },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ApiCallFailed { model, source } => {
                write!(f, "LLM API调用失败 (模型: {}): {}", model, source)
            }
            LlmError::EmptyContent { model } => {
                write!(f, "LLM返回内容为空 (模型: {})", model)
            }
            LlmError::RetriesExhausted { attempts } => {
                write!(f, "LLM生成题目失败 (已重试 {} 次)", attempts)
            }
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LlmError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    FileReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::FileReadFailed { path, source } => {
                write!(f, "读取配置文件失败 ({}): {}", path, source)
            }
            ConfigError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileReadFailed { source, .. }
            | ConfigError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

/// 服务端未给出错误信息时展示给用户的通用提示
pub const GENERIC_GENERATION_ERROR: &str = "Failed to generate quiz. Please try again.";

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 是否为传输层失败（连接失败、超时等）
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Api(ApiError::RequestFailed { .. }))
    }

    /// 面向用户的错误提示
    ///
    /// 服务端给出的错误信息优先，否则回退到通用提示。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(ApiError::BadResponse {
                message: Some(message),
                ..
            }) if !message.trim().is_empty() => message.clone(),
            AppError::InvalidInput(message) => message.clone(),
            _ => GENERIC_GENERATION_ERROR.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_service_message() {
        let err = AppError::Api(ApiError::BadResponse {
            endpoint: "/ai-questions".to_string(),
            status: 500,
            message: Some("Failed after multiple attempts".to_string()),
        });
        assert_eq!(err.user_message(), "Failed after multiple attempts");
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let err = AppError::Api(ApiError::BadResponse {
            endpoint: "/ai-questions".to_string(),
            status: 500,
            message: Some("   ".to_string()),
        });
        assert_eq!(err.user_message(), GENERIC_GENERATION_ERROR);

        let err = AppError::Api(ApiError::EmptyResponse {
            endpoint: "/ai-questions".to_string(),
        });
        assert_eq!(err.user_message(), GENERIC_GENERATION_ERROR);
        assert!(!err.is_transport());
    }

    #[test]
    fn test_invalid_input_is_shown_as_is() {
        let err = AppError::InvalidInput("Question cannot be empty".to_string());
        assert_eq!(err.user_message(), "Question cannot be empty");
        assert_eq!(err.to_string(), "输入错误: Question cannot be empty");
        assert!(std::error::Error::source(&err).is_none());
    }
}
