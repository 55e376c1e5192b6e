//! 业务能力层（Services）
//!
//! 描述"我能做什么"，不关心会话处于哪个阶段：
//! - `request_builder` - 构建互不重复的生成请求
//! - `scoring` - 评分与反馈兜底
//! - `llm_service` - 直连 LLM 的生成后端

pub mod llm_service;
pub mod request_builder;
pub mod scoring;

pub use llm_service::LlmQuizBackend;
pub use request_builder::QuizRequestBuilder;
pub use scoring::{request_feedback, score, FALLBACK_FEEDBACK};
