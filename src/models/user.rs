use serde::{Deserialize, Serialize};

/// 登录后得到的用户信息，只用于界面显示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl UserIdentity {
    /// 问候时使用的名字
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.name)
    }
}
