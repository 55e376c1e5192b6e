use serde::Serialize;

/// 已提交的答案记录
///
/// 下标与题目一一对应（从 0 开始），未作答为 `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    answers: Vec<Option<String>>,
}

impl AnswerRecord {
    /// 为 `question_count` 道题创建空记录
    pub fn with_len(question_count: usize) -> Self {
        Self {
            answers: vec![None; question_count],
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(|a| a.as_deref())
    }

    /// 已作答数量
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// 写入第 `index` 题的答案，超出范围时自动扩展
    pub(crate) fn record(&mut self, index: usize, answer: String) {
        if index >= self.answers.len() {
            self.answers.resize(index + 1, None);
        }
        self.answers[index] = Some(answer);
    }
}

impl FromIterator<Option<String>> for AnswerRecord {
    fn from_iter<I: IntoIterator<Item = Option<String>>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}
