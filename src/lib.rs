//! # Quiz Tutor
//!
//! 一个终端里的学习助手：与辅导老师对话选定主题，做一套生成的选择题，
//! 查看成绩与反馈，并可以换一批新题重试。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 主题、题目、答案记录、成绩，以及与外部服务交互的请求 / 响应结构
//!
//! ### ② 业务能力层（Clients / Services）
//! - `clients/` - `QuizBackend` / `TutorBackend` 接口与辅导后端 HTTP 客户端 `QuizApiClient`
//! - `services/` - 请求构建 `QuizRequestBuilder`、评分 `scoring`、直连 LLM 的 `LlmQuizBackend`
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次测验"的完整流程
//! - `QuizSession` - 状态机（Loading → InProgress → Error / Results）
//! - `RetryController` - 尝试次数与重试
//! - `QuizFlow` - 连接会话、请求构建器和后端
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 终端应用，登录、辅导对话、测验循环
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{QuizApiClient, QuizBackend, TutorBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Question, ScoreResult, Topic};
pub use orchestrator::App;
pub use workflow::{QuizFlow, QuizSession, RetryController, SessionPhase};
