//! 与外部服务交互的请求 / 响应结构
//!
//! 字段名与辅导后端的 JSON 保持一致

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::question::RawQuestion;
use crate::models::topic::Difficulty;
use crate::models::user::UserIdentity;

/// 题目生成请求
///
/// 除 topic 外的每个字段都参与区分请求，避免后端返回缓存的题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub num_questions: usize,
    /// 毫秒时间戳
    pub timestamp: i64,
    pub seed: u32,
    pub attempt: u32,
    pub difficulty: Difficulty,
    pub variation_prompt: String,
    /// topic-timestamp-seed 组合标识，即本次请求的指纹
    pub request_id: String,
    /// 要求后端不要复用缓存结果
    pub force_new: bool,
}

impl GenerationRequest {
    pub fn fingerprint(&self) -> &str {
        &self.request_id
    }
}

/// 题目生成响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 服务端报告的错误
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 反馈请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub score: usize,
    pub total: usize,
    pub topic: String,
}

/// 反馈响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    #[serde(default)]
    pub feedback: Option<String>,
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// 辅导对话请求
#[derive(Debug, Clone, Serialize)]
pub struct TutorRequest<'a> {
    pub question: &'a str,
    pub conversation_history: &'a [ChatMessage],
}

/// 辅导对话响应
#[derive(Debug, Clone, Deserialize)]
pub struct TutorResponse {
    pub answer: String,
}

/// 登录请求
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// 注册请求
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// 登录 / 注册响应
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: UserIdentity,
    #[serde(default)]
    pub token: Option<String>,
}

/// 非 2xx 响应体
///
/// 后端可能返回 `error` 或 FastAPI 风格的 `detail`（字符串或校验错误数组）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<JsonValue>,
}

impl ServiceErrorBody {
    /// 提取服务端给出的错误信息，`error` 优先
    pub fn message(&self) -> Option<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.trim().is_empty()) {
            return Some(error.clone());
        }
        match &self.detail {
            Some(JsonValue::String(detail)) if !detail.trim().is_empty() => Some(detail.clone()),
            Some(JsonValue::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}
