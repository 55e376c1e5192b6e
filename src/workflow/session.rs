//! 测验会话状态机 - 流程层
//!
//! 状态流转：
//!
//! ```text
//! Loading ──题目合法──▶ InProgress ──最后一题提交──▶ Results
//!    │                                               │
//!    └──失败/空/格式错误──▶ Error ◀──── retry ────────┘
//!                            │
//!                            └──── retry ──▶ Loading
//! ```
//!
//! 本模块不做任何 I/O。外部响应带着请求指纹回来，指纹与当前尝试不符的响应一律丢弃。
//! 任何被拒绝的调用都不会修改状态。

use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::GENERIC_GENERATION_ERROR;
use crate::models::{AnswerRecord, Question, QuizAttempt, RawQuestion, ScoreResult, Topic};
use crate::services::scoring;

/// 状态机拒绝某次调用的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("当前不在答题阶段（{0}）")]
    NotInProgress(SessionPhase),
    #[error("尚未选择答案")]
    NoSelection,
    #[error("选项「{0}」不属于当前题目")]
    UnknownOption(String),
    #[error("当前阶段不能重试（{0}）")]
    RetryNotAllowed(SessionPhase),
    #[error("当前没有等待中的题目请求（{0}）")]
    NotLoading(SessionPhase),
    #[error("当前没有等待反馈的成绩")]
    NotAwaitingFeedback,
}

/// 会话阶段（不带数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    InProgress,
    Error,
    Results,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Loading => "Loading",
            SessionPhase::InProgress => "InProgress",
            SessionPhase::Error => "Error",
            SessionPhase::Results => "Results",
        };
        f.write_str(name)
    }
}

/// 会话状态
///
/// 每个阶段只持有该阶段需要的数据，进入 `Loading` 时旧数据随之丢弃
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    InProgress {
        questions: Vec<Question>,
        current_index: usize,
        answers: AnswerRecord,
        tentative: Option<String>,
    },
    Error {
        message: String,
    },
    Results {
        questions: Vec<Question>,
        answers: AnswerRecord,
        score: ScoreResult,
    },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Loading => SessionPhase::Loading,
            SessionState::InProgress { .. } => SessionPhase::InProgress,
            SessionState::Error { .. } => SessionPhase::Error,
            SessionState::Results { .. } => SessionPhase::Results,
        }
    }
}

/// 一次题目生成请求的结果，带着发起请求时的指纹
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub fingerprint: String,
    /// 成功时为原始题目，失败时为展示给用户的错误信息
    pub result: Result<Vec<RawQuestion>, String>,
}

/// 一次反馈请求的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackOutcome {
    pub fingerprint: String,
    pub text: String,
}

/// 外部响应是否被采纳
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    /// 指纹与当前尝试不符，响应被丢弃
    Stale,
}

/// `advance` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// 进入下一题，携带新的题目下标
    Next(usize),
    /// 最后一题已提交，进入 Results
    Finished(ScoreResult),
}

/// 结果页中的一道题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub index: usize,
    pub prompt: String,
    pub your_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// 测验会话
///
/// 职责：
/// - 持有当前尝试（主题、尝试次数、请求指纹）和当前状态
/// - 校验每一次状态转换
/// - 只接受指纹匹配的外部响应
#[derive(Debug, Clone)]
pub struct QuizSession {
    attempt: QuizAttempt,
    state: SessionState,
}

impl QuizSession {
    /// 为主题创建第 1 次尝试，处于 `Loading`
    ///
    /// # 参数
    /// - `topic`: 测验主题
    /// - `fingerprint`: 第一次生成请求的指纹
    pub fn new(topic: Topic, fingerprint: impl Into<String>) -> Self {
        let attempt = QuizAttempt {
            topic,
            attempt_number: 1,
            fingerprint: fingerprint.into(),
        };
        debug!("{} 新会话 -> Loading", attempt);
        Self {
            attempt,
            state: SessionState::Loading,
        }
    }

    pub fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    pub fn topic(&self) -> &Topic {
        &self.attempt.topic
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt.attempt_number
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn can_retry(&self) -> bool {
        matches!(self.phase(), SessionPhase::Error | SessionPhase::Results)
    }

    /// 开始新一次尝试：尝试次数 +1，换上新指纹，进入 `Loading`
    ///
    /// 只能在 `Error` 或 `Results` 中调用
    pub fn begin_retry(&mut self, fingerprint: impl Into<String>) -> Result<u32, TransitionError> {
        if !self.can_retry() {
            return Err(TransitionError::RetryNotAllowed(self.phase()));
        }

        let from = self.phase();
        self.attempt.attempt_number += 1;
        self.attempt.fingerprint = fingerprint.into();
        self.state = SessionState::Loading;
        debug!("{} {} -> Loading (retry)", self.attempt, from);
        Ok(self.attempt.attempt_number)
    }

    /// 应用题目生成结果
    ///
    /// 指纹不符时丢弃并返回 `Stale`；题目集为空或有任何一题不合法时进入 `Error`
    pub fn apply_generation(
        &mut self,
        outcome: GenerationOutcome,
    ) -> Result<Applied, TransitionError> {
        if outcome.fingerprint != self.attempt.fingerprint {
            warn!(
                "{} 丢弃过期的题目响应 (请求#{})",
                self.attempt, outcome.fingerprint
            );
            return Ok(Applied::Stale);
        }
        if self.phase() != SessionPhase::Loading {
            return Err(TransitionError::NotLoading(self.phase()));
        }

        self.state = match outcome.result {
            Ok(raw) => match Question::validate_batch(raw) {
                Ok(questions) => {
                    let answers = AnswerRecord::with_len(questions.len());
                    SessionState::InProgress {
                        questions,
                        current_index: 0,
                        answers,
                        tentative: None,
                    }
                }
                Err(e) => {
                    error!("{} 题目格式不合法: {}", self.attempt, e);
                    SessionState::Error {
                        message: GENERIC_GENERATION_ERROR.to_string(),
                    }
                }
            },
            Err(message) => {
                error!("{} 题目生成失败: {}", self.attempt, message);
                let message = if message.trim().is_empty() {
                    GENERIC_GENERATION_ERROR.to_string()
                } else {
                    message
                };
                SessionState::Error { message }
            }
        };

        debug!("{} Loading -> {}", self.attempt, self.phase());
        Ok(Applied::Accepted)
    }

    /// 选择（或更换）当前题目的答案，不前进
    pub fn select_answer(&mut self, option: &str) -> Result<(), TransitionError> {
        let phase = self.phase();
        match &mut self.state {
            SessionState::InProgress {
                questions,
                current_index,
                tentative,
                ..
            } => {
                let question = &questions[*current_index];
                if !question.has_option(option) {
                    return Err(TransitionError::UnknownOption(option.to_string()));
                }
                debug!("第 {} 题暂选: {}", *current_index + 1, option);
                *tentative = Some(option.to_string());
                Ok(())
            }
            _ => Err(TransitionError::NotInProgress(phase)),
        }
    }

    /// 提交暂选答案并前进
    ///
    /// 最后一题提交后立即评分并进入 `Results`，反馈稍后通过 [`apply_feedback`](Self::apply_feedback) 写入
    pub fn advance(&mut self) -> Result<Advance, TransitionError> {
        let phase = self.phase();
        let SessionState::InProgress {
            questions,
            current_index,
            answers,
            tentative,
        } = &mut self.state
        else {
            return Err(TransitionError::NotInProgress(phase));
        };

        let selection = tentative.take().ok_or(TransitionError::NoSelection)?;
        answers.record(*current_index, selection);

        if *current_index + 1 < questions.len() {
            *current_index += 1;
            debug!("{} 前进到第 {} 题", self.attempt, *current_index + 1);
            return Ok(Advance::Next(*current_index));
        }

        let questions = std::mem::take(questions);
        let answers = std::mem::take(answers);
        let score = scoring::score(&questions, &answers);
        debug!("{} InProgress -> Results ({})", self.attempt, score);

        self.state = SessionState::Results {
            questions,
            answers,
            score: score.clone(),
        };
        Ok(Advance::Finished(score))
    }

    /// 写入反馈文本，每次尝试只写一次
    pub fn apply_feedback(
        &mut self,
        outcome: FeedbackOutcome,
    ) -> Result<Applied, TransitionError> {
        if outcome.fingerprint != self.attempt.fingerprint {
            warn!(
                "{} 丢弃过期的反馈 (请求#{})",
                self.attempt, outcome.fingerprint
            );
            return Ok(Applied::Stale);
        }

        match &mut self.state {
            SessionState::Results { score, .. } if score.feedback_text.is_none() => {
                score.feedback_text = Some(outcome.text);
                debug!("{} 反馈已写入", self.attempt);
                Ok(Applied::Accepted)
            }
            _ => Err(TransitionError::NotAwaitingFeedback),
        }
    }

    /// 当前题目
    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::InProgress {
                questions,
                current_index,
                ..
            } => questions.get(*current_index),
            _ => None,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        match &self.state {
            SessionState::InProgress { current_index, .. } => Some(*current_index),
            SessionState::Results { questions, .. } => Some(questions.len()),
            _ => None,
        }
    }

    pub fn tentative_selection(&self) -> Option<&str> {
        match &self.state {
            SessionState::InProgress { tentative, .. } => tentative.as_deref(),
            _ => None,
        }
    }

    /// 已提交的答案
    pub fn answers(&self) -> Option<&AnswerRecord> {
        match &self.state {
            SessionState::InProgress { answers, .. } | SessionState::Results { answers, .. } => {
                Some(answers)
            }
            _ => None,
        }
    }

    pub fn question_count(&self) -> usize {
        match &self.state {
            SessionState::InProgress { questions, .. } | SessionState::Results { questions, .. } => {
                questions.len()
            }
            _ => 0,
        }
    }

    /// (第几题, 共几题)，仅答题阶段有值
    pub fn progress(&self) -> Option<(usize, usize)> {
        match &self.state {
            SessionState::InProgress {
                questions,
                current_index,
                ..
            } => Some((current_index + 1, questions.len())),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<&ScoreResult> {
        match &self.state {
            SessionState::Results { score, .. } => Some(score),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// 结果页逐题回顾，非 Results 阶段返回空
    pub fn review(&self) -> Vec<ReviewItem> {
        let SessionState::Results {
            questions, answers, ..
        } = &self.state
        else {
            return Vec::new();
        };

        questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let your_answer = answers.get(index).map(str::to_string);
                ReviewItem {
                    index,
                    prompt: question.prompt.clone(),
                    is_correct: your_answer
                        .as_deref()
                        .map(|a| question.is_correct(a))
                        .unwrap_or(false),
                    your_answer,
                    correct_answer: question.correct_answer.clone(),
                    explanation: question.explanation.clone(),
                }
            })
            .collect()
    }
}
