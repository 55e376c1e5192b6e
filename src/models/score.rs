use serde::Serialize;
use std::fmt;

/// 一次测验的得分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub correct_count: usize,
    pub question_count: usize,
    /// round(correct / total * 100)，0.5 向上取整
    pub percentage: u32,
    /// 反馈文本，得分确定后只写入一次
    pub feedback_text: Option<String>,
}

impl ScoreResult {
    pub fn band(&self) -> PerformanceBand {
        PerformanceBand::from_percentage(self.percentage)
    }
}

impl fmt::Display for ScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({}%)",
            self.correct_count, self.question_count, self.percentage
        )
    }
}

/// 成绩档位，用于结果页的提示与兜底反馈
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceBand {
    /// ≥ 80%
    Excellent,
    /// ≥ 60%
    Good,
    NeedsPractice,
}

impl PerformanceBand {
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            PerformanceBand::Excellent
        } else if percentage >= 60 {
            PerformanceBand::Good
        } else {
            PerformanceBand::NeedsPractice
        }
    }
}
