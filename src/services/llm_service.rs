//! LLM 直连后端 - 业务能力层
//!
//! 不经过辅导后端，直接调用 OpenAI 兼容接口生成题目、反馈和辅导回答
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型（Groq、OpenAI、Azure 等兼容服务）
//!
//! ## 避免重复
//! - 题型按尝试次数轮换，难度取请求中的标签
//! - 关注点由 `seed + attempt * 1000` 决定的随机数挑选
//! - 按主题记住最近 20 道题，提示词中列出最近 10 道要求不要重复

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use tracing::{debug, error, info, warn};

use crate::clients::{validate_question, QuizBackend, TutorBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{
    ChatMessage, Difficulty, FeedbackRequest, FeedbackResponse, GenerationRequest, GenerationResponse,
    RawQuestion, Topic,
};
use crate::services::scoring::{band_feedback, percentage};
use crate::utils::logging::truncate_text;

/// 每个主题最多记住的历史题目数
const RECENT_QUESTION_LIMIT: usize = 20;
/// 提示词中列出的历史题目数
const AVOIDANCE_LIST_LEN: usize = 10;
/// 每次挑选的关注点数量
const FOCUS_COUNT: usize = 3;

/// 包住整段输出的 markdown 代码块
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("代码块正则不合法")
});

const TUTOR_SYSTEM_PROMPT: &str = "You are an intelligent, friendly AI tutor. Your job is to:
1. Explain concepts clearly and simply
2. Provide examples when helpful
3. Answer questions accurately
4. Encourage learning
5. Be conversational and supportive

Keep responses concise but informative (2-4 paragraphs usually). Use simple language.";

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionStyle {
    pub style: &'static str,
    pub instruction: &'static str,
    pub approach: &'static str,
}

pub const QUESTION_STYLES: [QuestionStyle; 8] = [
    QuestionStyle {
        style: "Definition & Concept-Based",
        instruction: "Focus on 'What is...', 'Define...', 'Explain the concept of...' type questions",
        approach: "theoretical understanding and definitions",
    },
    QuestionStyle {
        style: "Application & Problem-Solving",
        instruction: "Focus on 'How would you...', 'What happens when...', 'Solve this problem...' type questions",
        approach: "practical application and hands-on scenarios",
    },
    QuestionStyle {
        style: "Comparison & Analysis",
        instruction: "Focus on 'Compare...', 'What is the difference...', 'Which is better...' type questions",
        approach: "comparing alternatives and analyzing trade-offs",
    },
    QuestionStyle {
        style: "Real-World Scenarios",
        instruction: "Focus on 'In a real project...', 'A developer needs to...', scenario-based questions",
        approach: "real-world situations and case studies",
    },
    QuestionStyle {
        style: "Debugging & Troubleshooting",
        instruction: "Focus on 'What's wrong with...', 'How to fix...', 'Why does this fail...' type questions",
        approach: "identifying and fixing errors",
    },
    QuestionStyle {
        style: "Best Practices & Optimization",
        instruction: "Focus on 'What is the best way...', 'How to optimize...', 'Which approach is recommended...'",
        approach: "industry best practices and optimization techniques",
    },
    QuestionStyle {
        style: "Advanced & Edge Cases",
        instruction: "Focus on advanced topics, edge cases, and uncommon scenarios in the topic",
        approach: "challenging and advanced concepts",
    },
    QuestionStyle {
        style: "Beginner-Friendly Fundamentals",
        instruction: "Focus on basic, foundational questions suitable for beginners learning the topic",
        approach: "simple and fundamental concepts",
    },
];

pub const FOCUS_AREAS: [&str; 10] = [
    "syntax and structure",
    "common use cases",
    "error handling",
    "performance considerations",
    "security aspects",
    "design patterns",
    "integration with other technologies",
    "version differences and updates",
    "common mistakes to avoid",
    "industry standards",
];

fn difficulty_instruction(difficulty: Difficulty) -> (&'static str, &'static str) {
    match difficulty {
        Difficulty::Easy => (
            "Easy",
            "Make questions straightforward with clear correct answers. Suitable for beginners.",
        ),
        Difficulty::Medium => (
            "Medium",
            "Make questions moderately challenging, requiring good understanding of the topic.",
        ),
        Difficulty::Hard => (
            "Hard",
            "Make questions challenging and thought-provoking, requiring deep knowledge.",
        ),
        Difficulty::Mixed => ("Mixed", "Include a mix of easy, medium, and hard questions."),
    }
}

/// 一次生成所用的变化方案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPlan {
    pub style: QuestionStyle,
    pub difficulty: Difficulty,
    pub focuses: Vec<&'static str>,
}

impl QuizPlan {
    /// 根据请求的尝试次数、难度和种子确定方案
    pub fn for_request(attempt: u32, difficulty: Difficulty, seed: u32) -> Self {
        let style = QUESTION_STYLES[attempt as usize % QUESTION_STYLES.len()];
        let mut rng = StdRng::seed_from_u64(seed as u64 + attempt as u64 * 1000);
        let focuses = FOCUS_AREAS
            .choose_multiple(&mut rng, FOCUS_COUNT)
            .copied()
            .collect();
        Self {
            style,
            difficulty,
            focuses,
        }
    }
}

/// LLM 直连后端
///
/// 职责：
/// - 生成题目（带重试、输出清洗、格式校验）
/// - 生成反馈（失败时按成绩档位返回本地文本）
/// - 记住每个主题最近出过的题
pub struct LlmQuizBackend {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_retries: u32,
    recent_questions: Mutex<HashMap<String, Vec<String>>>,
}

impl LlmQuizBackend {
    /// 创建新的 LLM 后端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            max_retries: config.llm_max_retries.max(1),
            recent_questions: Mutex::new(HashMap::new()),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `temperature`: 采样温度
    /// - `max_tokens`: 最大输出长度
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> AppResult<String> {
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        // 添加系统消息（如果提供）
        if let Some(sys_msg) = system_message {
            messages.push(system_message_of(sys_msg)?);
        }
        messages.push(user_message_of(user_message)?);

        self.complete(messages, temperature, Some(0.95), max_tokens)
            .await
    }

    /// 发送完整的消息列表
    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        temperature: f32,
        top_p: Option<f32>,
        max_tokens: u32,
    ) -> AppResult<String> {
        debug!(
            "调用 LLM API，模型: {}，消息数: {}",
            self.model_name,
            messages.len()
        );

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model_name)
            .messages(messages)
            .temperature(temperature)
            .max_tokens(max_tokens);
        if let Some(top_p) = top_p {
            args.top_p(top_p);
        }
        let request = args
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyContent {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }

    /// 取出某主题最近出过的题
    fn previous_questions(&self, topic: &Topic) -> Vec<String> {
        let cache = self
            .recent_questions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get(&topic.cache_key()).cloned().unwrap_or_default()
    }

    /// 记住新出的题，只保留最近 RECENT_QUESTION_LIMIT 道
    fn remember_questions(&self, topic: &Topic, questions: &[RawQuestion]) -> usize {
        let mut cache = self
            .recent_questions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = cache.entry(topic.cache_key()).or_default();
        entry.extend(questions.iter().filter_map(|q| q.question.clone()));
        if entry.len() > RECENT_QUESTION_LIMIT {
            let overflow = entry.len() - RECENT_QUESTION_LIMIT;
            entry.drain(..overflow);
        }
        entry.len()
    }
}

#[async_trait]
impl QuizBackend for LlmQuizBackend {
    async fn generate_quiz(&self, request: &GenerationRequest) -> AppResult<GenerationResponse> {
        let topic = Topic::new(request.topic.as_str());
        let previous = self.previous_questions(&topic);
        let mut seed = request.seed;

        info!(
            "🎯 生成题目 - 主题: {} | 第{}次 | seed: {}",
            topic, request.attempt, seed
        );

        for retry in 0..self.max_retries {
            let plan = QuizPlan::for_request(request.attempt, request.difficulty, seed);
            let (user_message, system_message) =
                build_generation_messages(request, &plan, &previous, seed);

            info!(
                "📤 发送请求 (重试 {}/{}) 题型: {} | 难度: {} | 关注点: {}",
                retry + 1,
                self.max_retries,
                plan.style.style,
                plan.difficulty,
                plan.focuses.join(", ")
            );

            let raw_text = match self
                .send_to_llm(&user_message, Some(&system_message), 0.95, 3000)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    error!("❌ 第 {} 次生成失败: {}", retry + 1, e);
                    continue;
                }
            };

            match extract_questions(&raw_text) {
                Ok(questions) => {
                    let remembered = self.remember_questions(&topic, &questions);
                    info!(
                        "✅ 成功生成 {} 道题 (题型: {}, 已记录 {} 道历史题)",
                        questions.len(),
                        plan.style.style,
                        remembered
                    );
                    if let Some(first) = questions.first().and_then(|q| q.question.as_deref()) {
                        debug!("📝 示例题目: {}", truncate_text(first, 80));
                    }

                    let (level, _) = difficulty_instruction(plan.difficulty);
                    return Ok(GenerationResponse {
                        message: Some(format!(
                            "Generated {} unique questions using {} approach",
                            questions.len(),
                            plan.style.style
                        )),
                        questions,
                        topic: Some(topic.to_string()),
                        attempt: Some(request.attempt),
                        style: Some(plan.style.style.to_string()),
                        difficulty: Some(level.to_string()),
                        error: None,
                    });
                }
                Err(ExtractError::Json(e)) => {
                    error!("❌ 第 {} 次生成 - JSON 解析失败: {}", retry + 1, e);
                    // 换一个种子再试
                    seed = rand::thread_rng().gen_range(1..=1_000_000);
                }
                Err(ExtractError::Invalid(reason)) => {
                    error!("❌ 第 {} 次生成 - 格式不合法: {}", retry + 1, reason);
                }
            }
        }

        error!("❌ 所有重试均失败");
        Err(AppError::Llm(LlmError::RetriesExhausted {
            attempts: self.max_retries,
        }))
    }

    async fn quiz_feedback(&self, request: &FeedbackRequest) -> AppResult<FeedbackResponse> {
        let pct = percentage(request.score, request.total);
        let prompt = format!(
            "A student completed a quiz on {topic}.\n\
             Score: {score}/{total} ({pct}%)\n\n\
             Provide brief, encouraging feedback (2-3 sentences) that:\n\
             1. Acknowledges their performance\n\
             2. Highlights what they did well\n\
             3. Suggests improvement if score < 80%\n\n\
             Be supportive and constructive.",
            topic = request.topic,
            score = request.score,
            total = request.total,
            pct = pct
        );

        let feedback = match self.send_to_llm(&prompt, None, 0.7, 200).await {
            Ok(text) => text,
            Err(e) => {
                warn!("❌ 反馈生成失败: {}，使用本地反馈", e);
                band_feedback(pct).to_string()
            }
        };

        Ok(FeedbackResponse {
            feedback: Some(feedback),
        })
    }

    fn describe_failure(&self, err: &AppError) -> String {
        match err {
            AppError::Llm(LlmError::RetriesExhausted { .. }) => {
                "Failed to generate questions after multiple attempts. Please try again."
                    .to_string()
            }
            other => other.user_message(),
        }
    }
}

#[async_trait]
impl TutorBackend for LlmQuizBackend {
    async fn ask_tutor(&self, question: &str, history: &[ChatMessage]) -> AppResult<String> {
        let messages = build_tutor_messages(question, history)?;
        info!("📤 辅导提问，携带 {} 条消息", messages.len());

        let answer = self.complete(messages, 0.7, None, 1000).await?;
        debug!("辅导回答预览: {}", truncate_text(&answer, 100));
        Ok(answer)
    }
}

fn system_message_of(content: &str) -> AppResult<ChatCompletionRequestMessage> {
    let message = ChatCompletionRequestSystemMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AppError::llm_api_failed("-", e))?;
    Ok(ChatCompletionRequestMessage::System(message))
}

fn user_message_of(content: &str) -> AppResult<ChatCompletionRequestMessage> {
    let message = ChatCompletionRequestUserMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AppError::llm_api_failed("-", e))?;
    Ok(ChatCompletionRequestMessage::User(message))
}

fn assistant_message_of(content: &str) -> AppResult<ChatCompletionRequestMessage> {
    let message = ChatCompletionRequestAssistantMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AppError::llm_api_failed("-", e))?;
    Ok(ChatCompletionRequestMessage::Assistant(message))
}

/// 构建辅导对话的消息列表
///
/// 系统提示 → 历史消息（只保留 user / assistant / system）→ 当前问题
fn build_tutor_messages(
    question: &str,
    history: &[ChatMessage],
) -> AppResult<Vec<ChatCompletionRequestMessage>> {
    let question = validate_question(question)?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(system_message_of(TUTOR_SYSTEM_PROMPT)?);

    for message in history {
        match message.role.as_str() {
            "user" => messages.push(user_message_of(&message.content)?),
            "assistant" => messages.push(assistant_message_of(&message.content)?),
            "system" => messages.push(system_message_of(&message.content)?),
            other => debug!("跳过未知角色的历史消息: {}", other),
        }
    }

    messages.push(user_message_of(question)?);
    Ok(messages)
}

/// 构建生成题目的消息
///
/// 返回 (user_message, system_message)
fn build_generation_messages(
    request: &GenerationRequest,
    plan: &QuizPlan,
    previous: &[String],
    seed: u32,
) -> (String, String) {
    let style = &plan.style;
    let (level, level_instruction) = difficulty_instruction(plan.difficulty);

    let mut avoidance_text = String::new();
    if !previous.is_empty() {
        avoidance_text.push_str("\nDO NOT REPEAT OR PARAPHRASE THESE PREVIOUS QUESTIONS:\n");
        let start = previous.len().saturating_sub(AVOIDANCE_LIST_LEN);
        for (idx, prev) in previous[start..].iter().enumerate() {
            avoidance_text.push_str(&format!("{}. {}\n", idx + 1, prev));
        }
        avoidance_text.push_str("YOUR QUESTIONS MUST BE COMPLETELY DIFFERENT FROM THE ABOVE LIST!\n");
    }

    let user_message = format!(
        r#"QUIZ GENERATION REQUEST #{attempt}

**TOPIC:** {topic}

**QUESTION TYPE FOR THIS QUIZ:** {style_name}
{style_instruction}

**DIFFICULTY LEVEL:** {level}
{level_instruction}

**CONTENT FOCUS:** Your questions should cover these aspects:
{focuses}

**VARIATION REQUIREMENTS:**
- This is quiz attempt #{attempt}
- Use approach: {approach}
- Random seed: {seed}
- {variation}
- Make questions UNIQUE and CREATIVE
- Avoid common/generic questions
{avoidance}
**YOUR TASK:**
Generate {count} multiple-choice questions about {topic} that follow the "{style_name}" approach.

**CRITICAL RULES:**
1. Each question MUST be completely different from previous attempts
2. Each question must have EXACTLY 4 options
3. correct_answer must be exactly one of the options
4. Provide a helpful explanation for each question

**OUTPUT FORMAT:**
Return ONLY a valid JSON array (no markdown, no extra text):

[
  {{
    "id": 1,
    "question": "Your question text here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correct_answer": "Option A",
    "explanation": "Brief explanation of why this is correct"
  }}
]"#,
        attempt = request.attempt,
        topic = request.topic,
        style_name = style.style,
        style_instruction = style.instruction,
        level = level,
        level_instruction = level_instruction,
        focuses = plan.focuses.join(", "),
        approach = style.approach,
        seed = seed,
        variation = request.variation_prompt,
        avoidance = avoidance_text,
        count = request.num_questions,
    );

    let system_message = format!(
        "You are a creative quiz generator. Generate UNIQUE questions that are different from previous attempts. Current attempt: #{}. Style: {}",
        request.attempt, style.style
    );

    (user_message, system_message)
}

/// 解析 LLM 输出失败的原因
#[derive(Debug)]
enum ExtractError {
    /// JSON 语法错误，换种子重试
    Json(String),
    /// JSON 合法但内容不符合要求
    Invalid(String),
}

/// 从 LLM 输出中提取题目数组
///
/// 去掉 markdown 代码块，截取第一个 `[` 到最后一个 `]` 之间的内容
fn extract_questions(raw_text: &str) -> Result<Vec<RawQuestion>, ExtractError> {
    let trimmed = raw_text.trim();
    let cleaned = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let (start, end) = match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => {
            return Err(ExtractError::Invalid(
                "No JSON array found in response".to_string(),
            ))
        }
    };

    let questions: Vec<RawQuestion> = serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| ExtractError::Json(e.to_string()))?;

    if questions.is_empty() {
        return Err(ExtractError::Invalid("Invalid question format".to_string()));
    }
    for q in &questions {
        if q.question.is_none() || q.options.is_none() || q.correct_answer.is_none() {
            return Err(ExtractError::Invalid(
                "Missing required fields in question".to_string(),
            ));
        }
        if q.options.as_ref().map(Vec::len) != Some(4) {
            return Err(ExtractError::Invalid(
                "Each question must have exactly 4 options".to_string(),
            ));
        }
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_backend() -> LlmQuizBackend {
        let config = Config {
            llm_api_key: "test-key".to_string(),
            llm_api_base_url: "http://127.0.0.1:1/v1".to_string(),
            llm_max_retries: 2,
            ..Config::default()
        };
        LlmQuizBackend::new(&config)
    }

    fn sample_request() -> GenerationRequest {
        GenerationRequest {
            topic: "Rust Ownership".to_string(),
            num_questions: 5,
            timestamp: 1_700_000_000_000,
            seed: 4242,
            attempt: 2,
            difficulty: Difficulty::Hard,
            variation_prompt: "Design original questions not asked before".to_string(),
            request_id: "Rust Ownership-1700000000000-4242".to_string(),
            force_new: true,
        }
    }

    const VALID_ITEM: &str = r#"{"id": 1, "question": "Q?", "options": ["a", "b", "c", "d"], "correct_answer": "a", "explanation": "because"}"#;

    #[test]
    fn test_extract_plain_array() {
        let text = format!("[{}]", VALID_ITEM);
        let questions = extract_questions(&text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer.as_deref(), Some("a"));
    }

    #[test]
    fn test_extract_fenced_with_chatter() {
        let text = format!("```json\nHere you go:\n[{}]\n```", VALID_ITEM);
        assert_eq!(extract_questions(&text).unwrap().len(), 1);

        let text = format!("Sure! [{}] Good luck.", VALID_ITEM);
        assert_eq!(extract_questions(&text).unwrap().len(), 1);
    }

    #[test]
    fn test_extract_rejects_bad_output() {
        assert!(matches!(
            extract_questions("no questions today"),
            Err(ExtractError::Invalid(_))
        ));
        assert!(matches!(
            extract_questions("[{\"question\": }]"),
            Err(ExtractError::Json(_))
        ));
        assert!(matches!(extract_questions("[]"), Err(ExtractError::Invalid(_))));
        assert!(matches!(
            extract_questions(r#"[{"question": "Q?", "options": ["a", "b"], "correct_answer": "a"}]"#),
            Err(ExtractError::Invalid(_))
        ));
        assert!(matches!(
            extract_questions(r#"[{"question": "Q?", "options": ["a", "b", "c", "d"]}]"#),
            Err(ExtractError::Invalid(_))
        ));
    }

    #[test]
    fn test_code_fence_pattern() {
        let caps = CODE_FENCE.captures("```json\n[1, 2]\n```").unwrap();
        assert_eq!(&caps[1], "[1, 2]");
        assert!(!CODE_FENCE.is_match("[1, 2]"));
    }

    /// 把消息列表转成 (role, content) 便于比较
    fn roles_and_contents(messages: &[ChatCompletionRequestMessage]) -> Vec<(String, String)> {
        messages
            .iter()
            .map(|m| {
                let value = serde_json::to_value(m).unwrap();
                (
                    value["role"].as_str().unwrap().to_string(),
                    value["content"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_tutor_messages_keep_history_order() {
        let history = vec![
            ChatMessage::assistant("Hi! Ask me anything."),
            ChatMessage::user("What is a lifetime?"),
            ChatMessage::assistant("A lifetime names how long a reference is valid."),
            ChatMessage {
                role: "tool".to_string(),
                content: "ignored".to_string(),
            },
        ];

        let messages = build_tutor_messages("  And elision? ", &history).unwrap();

        assert_eq!(
            roles_and_contents(&messages),
            vec![
                ("system".to_string(), TUTOR_SYSTEM_PROMPT.to_string()),
                ("assistant".to_string(), "Hi! Ask me anything.".to_string()),
                ("user".to_string(), "What is a lifetime?".to_string()),
                (
                    "assistant".to_string(),
                    "A lifetime names how long a reference is valid.".to_string()
                ),
                ("user".to_string(), "And elision?".to_string()),
            ]
        );
    }

    #[test]
    fn test_tutor_rejects_blank_question() {
        let err = build_tutor_messages("  ", &[]).unwrap_err();
        assert_eq!(err.user_message(), "Question cannot be empty");
    }

    #[tokio::test]
    async fn test_ask_tutor_blank_question_skips_llm() {
        let backend = create_test_backend();
        let err = backend.ask_tutor("\t", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_plan_rotates_style_by_attempt() {
        let first = QuizPlan::for_request(1, Difficulty::Easy, 10);
        let second = QuizPlan::for_request(2, Difficulty::Easy, 10);
        assert_eq!(first.style, QUESTION_STYLES[1]);
        assert_eq!(second.style, QUESTION_STYLES[2]);
        assert_eq!(QuizPlan::for_request(8, Difficulty::Easy, 10).style, QUESTION_STYLES[0]);
    }

    #[test]
    fn test_plan_focuses_are_seeded() {
        let a = QuizPlan::for_request(3, Difficulty::Mixed, 777);
        let b = QuizPlan::for_request(3, Difficulty::Mixed, 777);
        assert_eq!(a.focuses, b.focuses);
        assert_eq!(a.focuses.len(), FOCUS_COUNT);
        assert!(a.focuses.iter().all(|f| FOCUS_AREAS.contains(f)));
    }

    #[test]
    fn test_prompt_lists_recent_questions() {
        let request = sample_request();
        let plan = QuizPlan::for_request(request.attempt, request.difficulty, request.seed);
        let previous: Vec<String> = (1..=12).map(|i| format!("Old question {}", i)).collect();
        let (user, system) = build_generation_messages(&request, &plan, &previous, request.seed);

        assert!(user.contains("**TOPIC:** Rust Ownership"));
        assert!(user.contains("**DIFFICULTY LEVEL:** Hard"));
        assert!(user.contains("Random seed: 4242"));
        assert!(user.contains("Design original questions not asked before"));
        // 只列出最近 10 道
        assert!(!user.contains("Old question 2\n"));
        assert!(user.contains("Old question 3"));
        assert!(user.contains("Old question 12"));
        assert!(system.contains("Current attempt: #2"));
    }

    #[test]
    fn test_recent_questions_are_capped() {
        let backend = create_test_backend();
        let topic = Topic::new("Rust Ownership");
        let batch: Vec<RawQuestion> = (0..15)
            .map(|i| RawQuestion {
                question: Some(format!("Q{}", i)),
                ..RawQuestion::default()
            })
            .collect();

        assert_eq!(backend.remember_questions(&topic, &batch), 15);
        assert_eq!(backend.remember_questions(&topic, &batch), RECENT_QUESTION_LIMIT);

        let previous = backend.previous_questions(&Topic::new("rust ownership"));
        assert_eq!(previous.len(), RECENT_QUESTION_LIMIT);
        assert_eq!(previous.last().map(String::as_str), Some("Q14"));
    }

    #[test]
    fn test_retries_exhausted_message() {
        let backend = create_test_backend();
        let err = AppError::Llm(LlmError::RetriesExhausted { attempts: 2 });
        assert_eq!(
            backend.describe_failure(&err),
            "Failed to generate questions after multiple attempts. Please try again."
        );
    }

    /// LLM 不可达时，生成报错而反馈退回本地文本
    #[tokio::test]
    #[ignore]
    async fn test_unreachable_llm_falls_back() {
        let backend = create_test_backend();

        let err = backend.generate_quiz(&sample_request()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Llm(LlmError::RetriesExhausted { attempts: 2 })
        ));

        let feedback = backend
            .quiz_feedback(&FeedbackRequest {
                score: 4,
                total: 5,
                topic: "Rust Ownership".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(feedback.feedback.as_deref(), Some(band_feedback(80)));
    }

    /// 真实调用 LLM 生成题目
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_generate_quiz_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_generate_quiz_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().expect("配置加载失败");
        let backend = LlmQuizBackend::new(&config);

        let response = backend
            .generate_quiz(&sample_request())
            .await
            .expect("生成题目失败");

        println!("\n========== 生成结果 ==========");
        for q in &response.questions {
            println!("{:?}", q.question);
        }
        println!("==============================\n");
        assert!(!response.questions.is_empty());
    }
}
