//! 测验流程驱动 - 流程层
//!
//! 核心职责：把会话状态机、请求构建器和后端连起来
//!
//! 流程顺序：
//! 1. 构建请求 → 会话进入 Loading
//! 2. 调用生成服务 → 带指纹写回会话（InProgress / Error）
//! 3. 用户逐题作答（由上层调用 `select_answer` / `advance`）
//! 4. 进入 Results 后请求反馈 → 带指纹写回会话
//!
//! 请求与写回是分开的两步，调用方可以在请求进行中重试，过期的结果会被会话丢弃。

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::clients::QuizBackend;
use crate::config::Config;
use crate::models::{GenerationRequest, Topic};
use crate::services::{scoring, QuizRequestBuilder};
use crate::utils::logging::{log_attempt_start, log_quiz_loaded, log_score};
use crate::workflow::retry::RetryController;
use crate::workflow::session::{
    Applied, FeedbackOutcome, GenerationOutcome, QuizSession, SessionPhase, TransitionError,
};

/// 测验流程
///
/// - 编排生成、作答、评分、反馈
/// - 决定何时调用后端、何时写回会话
/// - 不持有会话本身，会话由调用方持有
pub struct QuizFlow {
    backend: Arc<dyn QuizBackend>,
    retry: RetryController,
    feedback_timeout: Duration,
}

impl QuizFlow {
    /// 创建新的测验流程
    pub fn new(backend: Arc<dyn QuizBackend>, config: &Config) -> Self {
        Self::with_builder(
            backend,
            QuizRequestBuilder::new(config.question_count),
            Duration::from_secs(config.feedback_timeout_secs),
        )
    }

    pub fn with_builder(
        backend: Arc<dyn QuizBackend>,
        builder: QuizRequestBuilder,
        feedback_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            retry: RetryController::new(builder),
            feedback_timeout,
        }
    }

    /// 开启会话，不发请求
    pub fn begin(&mut self, topic: Topic) -> (QuizSession, GenerationRequest) {
        let (session, request) = self.retry.start(topic);
        log_attempt_start(session.attempt());
        (session, request)
    }

    /// 开启新一次尝试，不发请求
    pub fn begin_retry(
        &mut self,
        session: &mut QuizSession,
    ) -> Result<GenerationRequest, TransitionError> {
        let request = self.retry.retry(session)?;
        log_attempt_start(session.attempt());
        Ok(request)
    }

    /// 调用生成服务
    ///
    /// 失败转换为面向用户的错误信息，不会向上报错
    pub async fn fetch_questions(&self, request: &GenerationRequest) -> GenerationOutcome {
        let result = match self.backend.generate_quiz(request).await {
            Ok(response) => Ok(response.questions),
            Err(e) => Err(self.backend.describe_failure(&e)),
        };
        GenerationOutcome {
            fingerprint: request.fingerprint().to_string(),
            result,
        }
    }

    /// 请求反馈文本，会话不在 Results 或已有反馈时返回 `None`
    pub async fn fetch_feedback(&self, session: &QuizSession) -> Option<FeedbackOutcome> {
        let score = session.score()?;
        if score.feedback_text.is_some() {
            return None;
        }

        let text = scoring::request_feedback(
            self.backend.as_ref(),
            session.topic(),
            score,
            self.feedback_timeout,
        )
        .await;

        Some(FeedbackOutcome {
            fingerprint: session.attempt().fingerprint.clone(),
            text,
        })
    }

    /// 开启会话并加载题目
    pub async fn start(&mut self, topic: Topic) -> QuizSession {
        let (mut session, request) = self.begin(topic);
        if let Err(e) = self.load(&mut session, &request).await {
            warn!("忽略题目响应: {}", e);
        }
        session
    }

    /// 重试并加载题目
    pub async fn retry(&mut self, session: &mut QuizSession) -> Result<(), TransitionError> {
        let request = self.begin_retry(session)?;
        if let Err(e) = self.load(session, &request).await {
            warn!("忽略题目响应: {}", e);
        }
        Ok(())
    }

    /// 发出生成请求并写回会话
    ///
    /// # 返回
    /// - `Ok(Applied::Stale)`: 指纹不是当前尝试，结果被丢弃
    /// - `Err(NotLoading)`: 指纹匹配但会话已不在 Loading（重复写回）
    pub async fn load(
        &self,
        session: &mut QuizSession,
        request: &GenerationRequest,
    ) -> Result<Applied, TransitionError> {
        let outcome = self.fetch_questions(request).await;
        let applied = session.apply_generation(outcome)?;
        if applied == Applied::Accepted && session.phase() == SessionPhase::InProgress {
            log_quiz_loaded(session.topic().as_str(), session.question_count());
        }
        Ok(applied)
    }

    /// 为 Results 阶段的会话获取并写入反馈
    pub async fn complete_feedback(&self, session: &mut QuizSession) -> Option<Applied> {
        let outcome = self.fetch_feedback(session).await?;
        let applied = session.apply_feedback(outcome).ok()?;
        if let Some(score) = session.score() {
            log_score(session.topic().as_str(), score);
        }
        Some(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AppError, AppResult};
    use crate::models::{FeedbackRequest, FeedbackResponse, GenerationResponse, RawQuestion};
    use async_trait::async_trait;

    struct OneQuestion;

    #[async_trait]
    impl QuizBackend for OneQuestion {
        async fn generate_quiz(&self, request: &GenerationRequest) -> AppResult<GenerationResponse> {
            if request.topic == "offline" {
                return Err(AppError::Api(ApiError::EmptyResponse {
                    endpoint: "/ai-questions".to_string(),
                }));
            }
            Ok(GenerationResponse {
                questions: vec![RawQuestion {
                    question: Some(format!("Attempt {}?", request.attempt)),
                    options: Some(vec!["yes".to_string(), "no".to_string()]),
                    correct_answer: Some("yes".to_string()),
                    ..RawQuestion::default()
                }],
                ..GenerationResponse::default()
            })
        }

        async fn quiz_feedback(&self, request: &FeedbackRequest) -> AppResult<FeedbackResponse> {
            Ok(FeedbackResponse {
                feedback: Some(format!("{}/{} on {}", request.score, request.total, request.topic)),
            })
        }
    }

    fn flow() -> QuizFlow {
        QuizFlow::with_builder(
            Arc::new(OneQuestion),
            QuizRequestBuilder::new(1),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_full_round() {
        let mut flow = flow();
        let mut session = flow.start(Topic::new("Chemistry")).await;
        assert_eq!(session.phase(), SessionPhase::InProgress);

        session.select_answer("yes").unwrap();
        session.advance().unwrap();
        assert_eq!(flow.complete_feedback(&mut session).await, Some(Applied::Accepted));
        assert_eq!(
            session.score().and_then(|s| s.feedback_text.as_deref()),
            Some("1/1 on Chemistry")
        );

        // 已有反馈，不再请求
        assert!(flow.fetch_feedback(&session).await.is_none());

        flow.retry(&mut session).await.unwrap();
        assert_eq!(session.attempt_number(), 2);
        assert_eq!(
            session.current_question().map(|q| q.prompt.as_str()),
            Some("Attempt 2?")
        );
    }

    #[tokio::test]
    async fn test_backend_failure_enters_error() {
        let mut flow = flow();
        let session = flow.start(Topic::new("offline")).await;
        assert_eq!(session.phase(), SessionPhase::Error);
        assert_eq!(
            session.error_message(),
            Some(crate::error::GENERIC_GENERATION_ERROR)
        );
    }

    #[tokio::test]
    async fn test_second_load_of_same_request_is_rejected() {
        let mut flow = flow();
        let (mut session, request) = flow.begin(Topic::new("Chemistry"));

        assert_eq!(flow.load(&mut session, &request).await, Ok(Applied::Accepted));
        session.select_answer("yes").unwrap();

        // 同一请求再次写回，会话保持原状
        assert_eq!(
            flow.load(&mut session, &request).await,
            Err(TransitionError::NotLoading(SessionPhase::InProgress))
        );
        assert_eq!(session.tentative_selection(), Some("yes"));
    }
}
