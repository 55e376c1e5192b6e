/// 辅导后端 API 客户端
///
/// 封装所有与辅导后端（/ai-questions、/quiz-feedback、/ai-tutor、/login、/register）相关的调用逻辑
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::{validate_question, QuizBackend, TutorBackend};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{
    ChatMessage, FeedbackRequest, FeedbackResponse, GenerationRequest, GenerationResponse,
    LoginRequest, LoginResponse, RegisterRequest, ServiceErrorBody, TutorRequest, TutorResponse,
    UserIdentity,
};

/// 辅导后端客户端
pub struct QuizApiClient {
    http: Client,
    base_url: String,
}

impl QuizApiClient {
    /// 创建新的后端客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 登录，返回用于显示的用户信息
    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserIdentity> {
        let request = LoginRequest { email, password };
        let response: LoginResponse = self.post_json("/login", &request).await?;
        if let Some(message) = &response.message {
            debug!("登录响应: {}", message);
        }
        Ok(response.user)
    }

    /// 注册新账号，成功后与登录一样返回用户信息
    ///
    /// 邮箱重复、密码过短等由服务端拒绝，错误信息通过 `user_message` 展示
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<UserIdentity> {
        let email = email.trim().to_lowercase();
        let request = RegisterRequest {
            name: name.trim(),
            email: &email,
            password,
        };
        let response: LoginResponse = self.post_json("/register", &request).await?;
        if let Some(message) = &response.message {
            debug!("注册响应: {}", message);
        }
        Ok(response.user)
    }

    /// 健康检查
    pub async fn health(&self) -> AppResult<serde_json::Value> {
        let endpoint = "/health";
        let response = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;
        Self::decode(endpoint, response).await
    }

    /// 发送 JSON POST 请求并解析响应
    async fn post_json<Req, Resp>(&self, endpoint: &str, body: &Req) -> AppResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("请求 {} 失败: {}", endpoint, e);
                AppError::api_request_failed(endpoint, e)
            })?;

        Self::decode(endpoint, response).await
    }

    /// 检查状态码并解析响应体
    async fn decode<Resp: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> AppResult<Resp> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceErrorBody>(&text)
                .ok()
                .and_then(|body| body.message());
            warn!("{} 返回错误状态 {}: {:?}", endpoint, status, message);
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            }));
        }

        if text.trim().is_empty() {
            return Err(AppError::Api(ApiError::EmptyResponse {
                endpoint: endpoint.to_string(),
            }));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl QuizBackend for QuizApiClient {
    async fn generate_quiz(&self, request: &GenerationRequest) -> AppResult<GenerationResponse> {
        let endpoint = "/ai-questions";
        let response: GenerationResponse = self.post_json(endpoint, request).await?;

        // 200 但带有 error 字段，同样视为服务端报告的错误
        if let Some(error) = response.error.as_ref().filter(|e| !e.trim().is_empty()) {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint: endpoint.to_string(),
                status: 200,
                message: Some(error.clone()),
            }));
        }

        debug!(
            "生成服务返回 {} 道题 (style: {:?}, difficulty: {:?})",
            response.questions.len(),
            response.style,
            response.difficulty
        );
        Ok(response)
    }

    async fn quiz_feedback(&self, request: &FeedbackRequest) -> AppResult<FeedbackResponse> {
        self.post_json("/quiz-feedback", request).await
    }

    fn describe_failure(&self, err: &AppError) -> String {
        if err.is_transport() {
            format!(
                "Connection error. Make sure backend is running on {}",
                self.base_url
            )
        } else {
            err.user_message()
        }
    }
}

#[async_trait]
impl TutorBackend for QuizApiClient {
    async fn ask_tutor(&self, question: &str, history: &[ChatMessage]) -> AppResult<String> {
        let request = TutorRequest {
            question: validate_question(question)?,
            conversation_history: history,
        };
        let response: TutorResponse = self.post_json("/ai-tutor", &request).await?;
        Ok(response.answer)
    }
}
