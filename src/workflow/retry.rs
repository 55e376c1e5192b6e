//! 重试控制 - 流程层
//!
//! 尝试次数只增不减；每次重试都通过请求构建器拿到全新的请求指纹

use tracing::info;

use crate::models::{GenerationRequest, Topic};
use crate::services::QuizRequestBuilder;
use crate::workflow::session::{QuizSession, TransitionError};

/// 重试控制器
///
/// 持有请求构建器，负责开启会话和开启新一次尝试
pub struct RetryController {
    builder: QuizRequestBuilder,
}

impl RetryController {
    pub fn new(builder: QuizRequestBuilder) -> Self {
        Self { builder }
    }

    /// 选定主题后开启会话（第 1 次尝试）
    ///
    /// # 返回
    /// 处于 `Loading` 的会话，以及需要发出的生成请求
    pub fn start(&mut self, topic: Topic) -> (QuizSession, GenerationRequest) {
        let request = self.builder.build(&topic, 1);
        let session = QuizSession::new(topic, request.fingerprint());
        (session, request)
    }

    /// 开启新一次尝试
    ///
    /// 只能在 `Error` 或 `Results` 中调用；被拒绝时会话和构建器都不变
    pub fn retry(&mut self, session: &mut QuizSession) -> Result<GenerationRequest, TransitionError> {
        if !session.can_retry() {
            return Err(TransitionError::RetryNotAllowed(session.phase()));
        }

        let next_attempt = session.attempt_number() + 1;
        let request = self.builder.build(session.topic(), next_attempt);
        session.begin_retry(request.fingerprint())?;

        info!("🔄 重试: 主题「{}」第 {} 次", session.topic(), next_attempt);
        Ok(request)
    }
}
