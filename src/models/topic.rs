use serde::{Deserialize, Serialize};
use std::fmt;

/// 测验主题
///
/// 会话开始时确定，整个会话期间不变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 用于按主题记录历史题目的键（小写，空格替换为下划线）
    pub fn cache_key(&self) -> String {
        self.0.to_lowercase().replace(' ', "_")
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 难度标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Mixed,
    ];

    /// 请求中使用的小写标签
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次测验尝试
///
/// 会话开始或重试时创建，被下一次尝试替换后即丢弃
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    pub topic: Topic,
    /// 从 1 开始单调递增
    pub attempt_number: u32,
    /// 本次生成请求的唯一标识
    pub fingerprint: String,
}

impl fmt::Display for QuizAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[主题 {} 第{}次 请求#{}]",
            self.topic, self.attempt_number, self.fingerprint
        )
    }
}
