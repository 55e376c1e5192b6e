//! 题目生成请求构建 - 业务能力层
//!
//! 同一主题的每次请求都要在可观察的字段上互不相同，
//! 这样带缓存的生成后端就无法合理地返回重复的题目。
//! 时间戳、随机种子、难度、措辞、组合标识每次都独立随机。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::{Difficulty, GenerationRequest, Topic};

/// 随机种子的取值上界（不含）
pub const SEED_RANGE: u32 = 1_000_000;

/// 要求生成器避免重复的措辞池，语义相同、表述不同
pub const VARIATION_PROMPTS: [&str; 5] = [
    "Generate unique and different questions",
    "Create fresh quiz questions with new examples",
    "Design original questions not asked before",
    "Make creative and varied quiz items",
    "Provide diverse questions from different angles",
];

/// 题目生成请求构建器
///
/// 职责：
/// - 为 (topic, attempt) 构建生成请求
/// - 保证连续两次请求的时间戳和种子都不同
/// - 不发送请求，不关心会话状态
pub struct QuizRequestBuilder {
    question_count: usize,
    rng: StdRng,
    last_timestamp: i64,
    last_seed: Option<u32>,
}

impl QuizRequestBuilder {
    /// 创建新的请求构建器
    pub fn new(question_count: usize) -> Self {
        Self::with_rng(question_count, StdRng::from_entropy())
    }

    /// 使用指定随机源创建
    pub fn with_rng(question_count: usize, rng: StdRng) -> Self {
        Self {
            question_count,
            rng,
            last_timestamp: i64::MIN,
            last_seed: None,
        }
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// 构建一次生成请求
    ///
    /// # 参数
    /// - `topic`: 测验主题
    /// - `attempt`: 第几次尝试（从 1 开始）
    pub fn build(&mut self, topic: &Topic, attempt: u32) -> GenerationRequest {
        let timestamp = self.next_timestamp();
        let seed = self.next_seed();
        let difficulty = *Difficulty::ALL
            .choose(&mut self.rng)
            .unwrap_or(&Difficulty::Mixed);
        let variation_prompt = VARIATION_PROMPTS
            .choose(&mut self.rng)
            .unwrap_or(&VARIATION_PROMPTS[0])
            .to_string();
        let request_id = format!("{}-{}-{}", topic, timestamp, seed);

        debug!(
            "构建生成请求: 第{}次, seed={}, difficulty={}, request_id={}",
            attempt, seed, difficulty, request_id
        );

        GenerationRequest {
            topic: topic.as_str().to_string(),
            num_questions: self.question_count,
            timestamp,
            seed,
            attempt,
            difficulty,
            variation_prompt,
            request_id,
            force_new: true,
        }
    }

    /// 毫秒时间戳，同一毫秒内的后续请求向后推一毫秒
    fn next_timestamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let timestamp = if now > self.last_timestamp {
            now
        } else {
            self.last_timestamp + 1
        };
        self.last_timestamp = timestamp;
        timestamp
    }

    /// [0, SEED_RANGE) 内均匀分布，与上一次不同
    fn next_seed(&mut self) -> u32 {
        loop {
            let seed = self.rng.gen_range(0..SEED_RANGE);
            if self.last_seed != Some(seed) {
                self.last_seed = Some(seed);
                return seed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_consecutive_requests_differ() {
        let mut builder = QuizRequestBuilder::new(5);
        let topic = Topic::new("Photosynthesis");

        for attempt in 1..50 {
            let first = builder.build(&topic, attempt);
            let second = builder.build(&topic, attempt);
            assert_ne!(first.timestamp, second.timestamp);
            assert_ne!(first.seed, second.seed);
            assert_ne!(first.request_id, second.request_id);
        }
    }

    #[test]
    fn test_request_fields() {
        let mut builder = QuizRequestBuilder::with_rng(5, StdRng::seed_from_u64(7));
        let topic = Topic::new("Rust Traits");
        let request = builder.build(&topic, 3);

        assert_eq!(request.topic, "Rust Traits");
        assert_eq!(request.num_questions, 5);
        assert_eq!(request.attempt, 3);
        assert!(request.force_new);
        assert!(request.seed < SEED_RANGE);
        assert!(VARIATION_PROMPTS.contains(&request.variation_prompt.as_str()));
        assert_eq!(
            request.request_id,
            format!("Rust Traits-{}-{}", request.timestamp, request.seed)
        );
    }

    #[test]
    fn test_randomized_labels_cover_pools() {
        let mut builder = QuizRequestBuilder::with_rng(5, StdRng::seed_from_u64(99));
        let topic = Topic::new("History");
        let mut difficulties = HashSet::new();
        let mut prompts = HashSet::new();
        for _ in 0..200 {
            let request = builder.build(&topic, 1);
            difficulties.insert(request.difficulty);
            prompts.insert(request.variation_prompt);
        }
        assert_eq!(difficulties.len(), Difficulty::ALL.len());
        assert_eq!(prompts.len(), VARIATION_PROMPTS.len());
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut builder = QuizRequestBuilder::new(5);
        let topic = Topic::new("Math");
        let stamps: Vec<i64> = (0..100).map(|_| builder.build(&topic, 1).timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
