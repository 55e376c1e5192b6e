use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 一道选择题
///
/// 收到后不再修改；`correct_answer` 必定是 `options` 中的某一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn is_correct(&self, answer: &str) -> bool {
        // 严格相等，不做大小写或空白归一化
        self.correct_answer == answer
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// 生成服务返回的原始题目
///
/// 所有字段都可能缺失，经过 [`Question::validate_batch`] 校验后才能进入会话
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// 题目集合校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionSetError {
    #[error("生成结果中没有任何题目")]
    Empty,
    #[error("第 {index} 题缺少字段 `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("第 {index} 题的选项少于 2 个")]
    TooFewOptions { index: usize },
    #[error("第 {index} 题的正确答案不在选项中")]
    AnswerNotInOptions { index: usize },
}

impl Question {
    /// 校验整批题目
    ///
    /// 任何一题不合法则整批作废，不接受部分题目。顺序保持不变，不补齐也不截断。
    pub fn validate_batch(raw: Vec<RawQuestion>) -> Result<Vec<Question>, QuestionSetError> {
        if raw.is_empty() {
            return Err(QuestionSetError::Empty);
        }

        raw.into_iter()
            .enumerate()
            .map(|(index, q)| Self::validate_one(index, q))
            .collect()
    }

    fn validate_one(index: usize, raw: RawQuestion) -> Result<Question, QuestionSetError> {
        let prompt = raw
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or(QuestionSetError::MissingField {
                index,
                field: "question",
            })?;
        let options = raw.options.ok_or(QuestionSetError::MissingField {
            index,
            field: "options",
        })?;
        let correct_answer = raw
            .correct_answer
            .ok_or(QuestionSetError::MissingField {
                index,
                field: "correct_answer",
            })?;

        if options.len() < 2 {
            return Err(QuestionSetError::TooFewOptions { index });
        }
        if !options.iter().any(|o| *o == correct_answer) {
            return Err(QuestionSetError::AnswerNotInOptions { index });
        }

        Ok(Question {
            prompt,
            options,
            correct_answer,
            explanation: raw.explanation.filter(|e| !e.trim().is_empty()),
        })
    }
}
