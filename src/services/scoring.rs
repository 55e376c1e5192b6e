//! 评分 - 业务能力层
//!
//! `score` 是纯函数；反馈文本来自外部服务，失败时用固定的鼓励语代替，
//! 评分结果本身不受反馈服务影响。

use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::QuizBackend;
use crate::models::{AnswerRecord, FeedbackRequest, PerformanceBand, Question, ScoreResult, Topic};

/// 反馈服务失败或没有返回文本时使用的鼓励语
pub const FALLBACK_FEEDBACK: &str = "Great effort! Keep practicing to improve your understanding.";

/// 对比答案并计算得分
///
/// 未作答视为答错。答案按字符串严格比较（区分大小写）。
pub fn score(questions: &[Question], answers: &AnswerRecord) -> ScoreResult {
    let correct_count = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| {
            answers
                .get(*index)
                .map(|answer| question.is_correct(answer))
                .unwrap_or(false)
        })
        .count();

    ScoreResult {
        correct_count,
        question_count: questions.len(),
        percentage: percentage(correct_count, questions.len()),
        feedback_text: None,
    }
}

/// round(correct / total * 100)，0.5 向上取整；total 为 0 时返回 0
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // 整数运算避免浮点误差: floor((200c + t) / 2t)
    ((correct * 200 + total) / (total * 2)) as u32
}

/// 按成绩档位给出的本地反馈
pub fn band_feedback(percentage: u32) -> &'static str {
    match PerformanceBand::from_percentage(percentage) {
        PerformanceBand::Excellent => {
            "Excellent work! You have a strong understanding of this topic."
        }
        PerformanceBand::Good => "Good effort! Review the explanations and try again to improve.",
        PerformanceBand::NeedsPractice => {
            "Keep practicing! Review the material and take your time with each question."
        }
    }
}

/// 向反馈服务请求反馈文本
///
/// 超时、失败或返回空文本时返回 [`FALLBACK_FEEDBACK`]，不会向上报错
pub async fn request_feedback(
    backend: &dyn QuizBackend,
    topic: &Topic,
    result: &ScoreResult,
    timeout: Duration,
) -> String {
    let request = FeedbackRequest {
        score: result.correct_count,
        total: result.question_count,
        topic: topic.as_str().to_string(),
    };

    match tokio::time::timeout(timeout, backend.quiz_feedback(&request)).await {
        Ok(Ok(response)) => match response.feedback {
            Some(text) if !text.trim().is_empty() => {
                debug!("收到反馈文本 ({} 字符)", text.len());
                text.trim().to_string()
            }
            _ => {
                warn!("反馈服务没有返回文本，使用默认鼓励语");
                FALLBACK_FEEDBACK.to_string()
            }
        },
        Ok(Err(e)) => {
            warn!("反馈服务调用失败: {}，使用默认鼓励语", e);
            FALLBACK_FEEDBACK.to_string()
        }
        Err(_) => {
            warn!("反馈服务超时 ({:?})，使用默认鼓励语", timeout);
            FALLBACK_FEEDBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AppError, AppResult};
    use crate::models::{FeedbackResponse, GenerationRequest, GenerationResponse};
    use async_trait::async_trait;

    fn question(answer: &str) -> Question {
        Question {
            prompt: "Pick one".to_string(),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            correct_answer: answer.to_string(),
            explanation: None,
        }
    }

    fn answers(values: &[Option<&str>]) -> AnswerRecord {
        values.iter().map(|v| v.map(|s| s.to_string())).collect()
    }

    #[test]
    fn test_rounding() {
        assert_eq!(percentage(3, 5), 60);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5 向上取整
        assert_eq!(percentage(0, 4), 0);
        assert_eq!(percentage(4, 4), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_score_counts_exact_matches() {
        let questions = vec![question("A"), question("B"), question("C"), question("A"), question("B")];
        let record = answers(&[Some("A"), Some("B"), Some("A"), Some("A"), Some("b")]);
        let result = score(&questions, &record);
        assert_eq!(result.correct_count, 3);
        assert_eq!(result.question_count, 5);
        assert_eq!(result.percentage, 60);
        assert_eq!(result.feedback_text, None);
    }

    #[test]
    fn test_unanswered_counts_as_incorrect() {
        let questions = vec![question("A"), question("B"), question("C")];
        let result = score(&questions, &AnswerRecord::with_len(3));
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.percentage, 0);

        // 记录比题目短也一样
        let result = score(&questions, &answers(&[Some("A")]));
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.percentage, 33);
    }

    #[test]
    fn test_score_is_pure() {
        let questions = vec![question("A"), question("B")];
        let record = answers(&[Some("A"), Some("C")]);
        assert_eq!(score(&questions, &record), score(&questions, &record));
    }

    #[test]
    fn test_band_feedback() {
        assert!(band_feedback(80).starts_with("Excellent"));
        assert!(band_feedback(60).starts_with("Good effort"));
        assert!(band_feedback(59).starts_with("Keep practicing"));
    }

    enum FeedbackMode {
        Hang,
        Text(Option<&'static str>),
        Fail,
    }

    struct FixedFeedback(FeedbackMode);

    #[async_trait]
    impl QuizBackend for FixedFeedback {
        async fn generate_quiz(&self, _: &GenerationRequest) -> AppResult<GenerationResponse> {
            Ok(GenerationResponse::default())
        }

        async fn quiz_feedback(&self, _: &FeedbackRequest) -> AppResult<FeedbackResponse> {
            match &self.0 {
                FeedbackMode::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(FeedbackResponse::default())
                }
                FeedbackMode::Text(text) => Ok(FeedbackResponse {
                    feedback: text.map(|t| t.to_string()),
                }),
                FeedbackMode::Fail => Err(AppError::Api(ApiError::EmptyResponse {
                    endpoint: "/quiz-feedback".to_string(),
                })),
            }
        }
    }

    fn four_of_five() -> ScoreResult {
        ScoreResult {
            correct_count: 4,
            question_count: 5,
            percentage: 80,
            feedback_text: None,
        }
    }

    #[tokio::test]
    async fn test_request_feedback_uses_service_text() {
        let backend = FixedFeedback(FeedbackMode::Text(Some("  Well done!  ")));
        let text = request_feedback(
            &backend,
            &Topic::new("Rust"),
            &four_of_five(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(text, "Well done!");
    }

    #[tokio::test]
    async fn test_request_feedback_falls_back() {
        let topic = Topic::new("Rust");
        let timeout = Duration::from_secs(1);

        let empty = FixedFeedback(FeedbackMode::Text(None));
        assert_eq!(
            request_feedback(&empty, &topic, &four_of_five(), timeout).await,
            FALLBACK_FEEDBACK
        );

        let failing = FixedFeedback(FeedbackMode::Fail);
        assert_eq!(
            request_feedback(&failing, &topic, &four_of_five(), timeout).await,
            FALLBACK_FEEDBACK
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_feedback_times_out() {
        let hanging = FixedFeedback(FeedbackMode::Hang);
        let text = request_feedback(
            &hanging,
            &Topic::new("Rust"),
            &four_of_five(),
            Duration::from_secs(15),
        )
        .await;
        assert_eq!(text, FALLBACK_FEEDBACK);
    }
}
