//! 终端应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源管理和交互流程。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：打印启动信息、创建后端客户端、健康检查
//! 2. **登录 / 注册**（可跳过）：只用于问候用户
//! 3. **辅导对话**：与辅导老师聊天选定主题，`/quiz` 开始测验
//! 4. **测验循环**：逐题作答、查看成绩与逐题回顾、重试
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理状态转换细节，全部委托给 `QuizFlow` / `QuizSession`
//! - **资源所有者**：唯一持有后端客户端的模块，题目与辅导后端按同一配置选择
//! - **输入输出可替换**：`run_with` 接受任意输入流和输出，便于脚本化测试

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{info, warn};

use crate::clients::{QuizApiClient, QuizBackend, TutorBackend};
use crate::config::{BackendKind, Config};
use crate::models::{ChatMessage, PerformanceBand, Topic};
use crate::services::LlmQuizBackend;
use crate::utils::logging::log_startup;
use crate::workflow::{Advance, QuizFlow, QuizSession, SessionPhase, TransitionError};

const WELCOME: &str = "Hi! I'm your tutor. Ask me anything, then type /quiz to test yourself on the topic (or /quiz <topic>). Type /quit to exit.";

/// 应用主结构
pub struct App {
    api: QuizApiClient,
    tutor: Arc<dyn TutorBackend>,
    flow: QuizFlow,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let api = QuizApiClient::new(&config)?;

        // 健康检查失败只警告，不阻止启动
        match api.health().await {
            Ok(status) => info!("✓ 后端健康检查通过: {}", status),
            Err(e) => warn!("⚠️ 后端健康检查失败: {}", e),
        }

        let backend: Arc<dyn QuizBackend>;
        let tutor: Arc<dyn TutorBackend>;
        match config.backend {
            BackendKind::Http => {
                let client = Arc::new(QuizApiClient::new(&config)?);
                backend = client.clone();
                tutor = client;
            }
            BackendKind::Llm => {
                if config.llm_api_key.is_empty() {
                    warn!("⚠️ 未设置 LLM_API_KEY，LLM 调用可能失败");
                }
                let llm = Arc::new(LlmQuizBackend::new(&config));
                backend = llm.clone();
                tutor = llm;
            }
        }
        info!("✓ 题目与辅导后端: {}", config.backend);

        Ok(Self::with_backend(&config, api, backend, tutor))
    }

    /// 使用指定后端创建应用
    ///
    /// # 参数
    /// - `api`: 登录、注册使用的 HTTP 客户端
    /// - `backend`: 题目生成与反馈
    /// - `tutor`: 辅导对话
    pub fn with_backend(
        config: &Config,
        api: QuizApiClient,
        backend: Arc<dyn QuizBackend>,
        tutor: Arc<dyn TutorBackend>,
    ) -> Self {
        Self {
            api,
            tutor,
            flow: QuizFlow::new(backend, config),
        }
    }

    /// 运行应用主逻辑（标准输入输出）
    pub async fn run(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with(stdin, std::io::stdout()).await
    }

    /// 使用指定的输入输出运行
    pub async fn run_with<R, W>(&mut self, input: R, output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut console = Console {
            lines: input.lines(),
            out: output,
        };

        self.login(&mut console).await?;
        self.chat(&mut console).await?;

        console.say("Goodbye!")?;
        info!("👋 程序结束");
        Ok(())
    }

    /// 登录或注册（可跳过）
    async fn login<R, W>(&self, console: &mut Console<R, W>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let Some(email) = console
            .ask("Email (press Enter to skip login, /register to sign up): ")
            .await?
        else {
            return Ok(());
        };
        if email.is_empty() {
            return Ok(());
        }

        let result = if email == "/register" {
            let name = console.ask("Name: ").await?.unwrap_or_default();
            let email = console.ask("Email: ").await?.unwrap_or_default();
            let password = console.ask("Password: ").await?.unwrap_or_default();
            self.api.register(&name, &email, &password).await
        } else {
            let password = console.ask("Password: ").await?.unwrap_or_default();
            self.api.login(&email, &password).await
        };

        match result {
            Ok(user) => {
                info!("✓ 用户已登录: {} (id={})", user.email, user.id);
                console.say(&format!("Welcome, {}!", user.display_name()))?;
            }
            Err(e) => {
                warn!("⚠️ 登录失败: {}", e);
                console.say(&format!("Login failed: {}. Continuing as guest.", e.user_message()))?;
            }
        }
        Ok(())
    }

    /// 辅导对话，最后一条用户消息即当前主题
    async fn chat<R, W>(&mut self, console: &mut Console<R, W>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut history = vec![ChatMessage::assistant(WELCOME)];
        console.say(&format!("Tutor: {}", WELCOME))?;

        while let Some(line) = console.ask("You: ").await? {
            if line.is_empty() {
                continue;
            }
            if line == "/quit" {
                break;
            }

            if let Some(rest) = quiz_command(&line) {
                let explicit = rest.trim();
                let topic = if explicit.is_empty() {
                    history
                        .iter()
                        .rev()
                        .find(|m| m.role == "user")
                        .map(|m| Topic::new(m.content.as_str()))
                } else {
                    Some(Topic::new(explicit))
                };

                match topic {
                    Some(topic) => self.quiz(console, topic).await?,
                    None => console.say("Ask the tutor about a topic first, or type /quiz <topic>.")?,
                }
                continue;
            }

            let answer = match self.tutor.ask_tutor(&line, &history).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!("⚠️ 辅导服务调用失败: {}", e);
                    "Sorry, I encountered an error. Please try again.".to_string()
                }
            };
            history.push(ChatMessage::user(line));
            console.say(&format!("Tutor: {}", answer))?;
            history.push(ChatMessage::assistant(answer));
        }
        Ok(())
    }

    /// 一个主题的测验循环（含重试）
    async fn quiz<R, W>(&mut self, console: &mut Console<R, W>, topic: Topic) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        console.say(&format!("\nGenerating quiz on \"{}\"...", topic))?;
        let mut session = self.flow.start(topic).await;

        loop {
            match session.phase() {
                SessionPhase::InProgress => {
                    if !self.answer_questions(console, &mut session).await? {
                        return Ok(());
                    }
                    continue;
                }
                SessionPhase::Results => {
                    self.flow.complete_feedback(&mut session).await;
                    show_results(console, &session)?;
                }
                SessionPhase::Error => {
                    let message = session.error_message().unwrap_or_default();
                    console.say(&format!("Error: {}", message))?;
                }
                SessionPhase::Loading => {
                    warn!("⚠️ 会话仍在加载中，返回对话");
                    return Ok(());
                }
            }

            let again = console.ask("Try again with new questions? (y/n): ").await?;
            if !matches!(again.as_deref(), Some("y") | Some("Y") | Some("yes")) {
                return Ok(());
            }
            console.say(&format!(
                "\nGenerating attempt #{}...",
                session.attempt_number() + 1
            ))?;
            self.flow.retry(&mut session).await?;
        }
    }

    /// 逐题作答直到进入 Results
    ///
    /// 输入选项编号暂选答案，空行提交并进入下一题。输入结束时返回 false。
    async fn answer_questions<R, W>(
        &self,
        console: &mut Console<R, W>,
        session: &mut QuizSession,
    ) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        while let Some(question) = session.current_question().cloned() {
            let (current, total) = session.progress().unwrap_or((0, 0));
            console.say(&format!(
                "\nAttempt #{} - Question {} of {}",
                session.attempt_number(),
                current,
                total
            ))?;
            console.say(&question.prompt)?;
            for (i, option) in question.options.iter().enumerate() {
                console.say(&format!("  {}. {}", i + 1, option))?;
            }

            loop {
                let Some(line) = console
                    .ask("Choose an option number (Enter to confirm): ")
                    .await?
                else {
                    return Ok(false);
                };

                if line.is_empty() {
                    match session.advance() {
                        Ok(Advance::Next(_)) => break,
                        Ok(Advance::Finished(_)) => return Ok(true),
                        Err(TransitionError::NoSelection) => {
                            console.say("Please select an answer first.")?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                    continue;
                }

                let picked = line
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| question.options.get(i));
                let result = match picked {
                    Some(option) => session.select_answer(option),
                    None => session.select_answer(&line),
                };
                match result {
                    Ok(()) => console.say(&format!(
                        "Selected: {}",
                        session.tentative_selection().unwrap_or_default()
                    ))?,
                    Err(TransitionError::UnknownOption(_)) => {
                        console.say("That is not one of the options.")?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(true)
    }
}

/// 解析 `/quiz` 命令，返回命令后的主题部分
///
/// 只有 `/quiz` 本身或 `/quiz <topic>` 才算命令，`/quizzes` 之类按普通提问处理
fn quiz_command(line: &str) -> Option<&str> {
    line.strip_prefix("/quiz")
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// 打印成绩、反馈与逐题回顾
fn show_results<R, W: Write>(console: &mut Console<R, W>, session: &QuizSession) -> Result<()> {
    let Some(score) = session.score() else {
        return Ok(());
    };

    let headline = match score.band() {
        PerformanceBand::Excellent => "Outstanding!",
        PerformanceBand::Good => "Nice job!",
        PerformanceBand::NeedsPractice => "Keep going!",
    };
    console.say(&format!("\n{}", "=".repeat(60)))?;
    console.say(&format!(
        "Quiz complete: {} - attempt #{}",
        session.topic(),
        session.attempt_number()
    ))?;
    console.say(&format!("{} You scored {}", headline, score))?;
    if let Some(feedback) = &score.feedback_text {
        console.say(&format!("Feedback: {}", feedback))?;
    }
    console.say(&"=".repeat(60))?;

    for item in session.review() {
        let mark = if item.is_correct { "✓" } else { "✗" };
        console.say(&format!("\n{} {}. {}", mark, item.index + 1, item.prompt))?;
        console.say(&format!(
            "   Your answer: {}",
            item.your_answer.as_deref().unwrap_or("Not answered")
        ))?;
        if !item.is_correct {
            console.say(&format!("   Correct answer: {}", item.correct_answer))?;
        }
        if let Some(explanation) = &item.explanation {
            console.say(&format!("   Explanation: {}", explanation))?;
        }
    }
    Ok(())
}

/// 终端输入输出
struct Console<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W: Write> Console<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> Console<R, W> {
    /// 打印提示并读取一行（去掉首尾空白），输入结束时返回 `None`
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}
