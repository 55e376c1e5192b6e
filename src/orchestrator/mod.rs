//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责交互调度，是整个系统的"指挥中心"。
//!
//! ### `app` - 终端应用
//! - 管理应用生命周期（初始化、运行）
//! - 持有后端客户端
//! - 登录、辅导对话、测验循环
//!
//! ## 层次关系
//!
//! ```text
//! app (登录 / 对话 / 测验循环)
//!     ↓
//! workflow::QuizFlow (一次测验的完整流程)
//!     ↓
//! workflow::QuizSession (状态机)
//!     ↓
//! services / clients (能力层：请求构建 / 评分 / 后端调用)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有后端客户端
//! 2. **向下依赖**：编排层 → workflow → services / clients → models
//! 3. **无业务逻辑**：只做调度和展示，不做状态判断

pub mod app;

pub use app::App;
