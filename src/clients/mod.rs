//! 外部服务客户端
//!
//! `QuizBackend` 是题目生成与反馈两个外部协作方的统一接口，
//! 会话流程只依赖这个 trait，不关心具体走 HTTP 还是直连 LLM。
//! `TutorBackend` 是辅导对话的接口，与 `QuizBackend` 按同一配置选择实现。

pub mod quiz_api_client;

pub use quiz_api_client::QuizApiClient;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::{
    ChatMessage, FeedbackRequest, FeedbackResponse, GenerationRequest, GenerationResponse,
};

/// 空问题的提示
pub const EMPTY_QUESTION_MESSAGE: &str = "Question cannot be empty";

/// 题目生成 + 反馈服务
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// 根据请求生成一批题目
    async fn generate_quiz(&self, request: &GenerationRequest) -> AppResult<GenerationResponse>;

    /// 根据得分生成反馈文本
    async fn quiz_feedback(&self, request: &FeedbackRequest) -> AppResult<FeedbackResponse>;

    /// 生成失败时展示给用户的提示
    fn describe_failure(&self, err: &AppError) -> String {
        err.user_message()
    }
}

/// 辅导对话服务
#[async_trait]
pub trait TutorBackend: Send + Sync {
    /// 带上对话历史向辅导老师提问
    ///
    /// # 参数
    /// - `question`: 用户的问题
    /// - `history`: 之前的对话记录（用于上下文）
    ///
    /// # 返回
    /// 返回辅导老师的回答，空白问题返回 `AppError::InvalidInput`
    async fn ask_tutor(&self, question: &str, history: &[ChatMessage]) -> AppResult<String>;
}

/// 去掉首尾空白，空问题直接拒绝
pub(crate) fn validate_question(question: &str) -> AppResult<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::InvalidInput(EMPTY_QUESTION_MESSAGE.to_string()));
    }
    Ok(question)
}
