//! JWT Token 处理
//!
//! 登录由外部身份系统完成，这里只负责校验 Bearer Token 并还原管理员身份

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use outreach_shared::config::JwtSettings;
use serde::{Deserialize, Serialize};

use crate::error::AdminError;

/// 管理员角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// 全部权限
    Admin,
    /// 可发布通知，不可变更订阅者
    Editor,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 管理员 ID
    pub sub: String,
    /// 显示名称
    pub name: String,
    /// 角色；无法识别的角色在权限检查时一律拒绝
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// 已验证的管理员身份，由认证中间件注入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub id: String,
    pub name: String,
    pub role: Option<AdminRole>,
}

impl AdminIdentity {
    pub fn has_role(&self, allowed: &[AdminRole]) -> bool {
        self.role.is_some_and(|role| allowed.contains(&role))
    }
}

impl From<Claims> for AdminIdentity {
    fn from(claims: Claims) -> Self {
        let role = match claims.role.to_ascii_lowercase().as_str() {
            "admin" => Some(AdminRole::Admin),
            "editor" => Some(AdminRole::Editor),
            _ => None,
        };

        Self {
            id: claims.sub,
            name: claims.name,
            role,
        }
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    issuer: String,
    expires_in_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            issuer: settings.issuer.clone(),
            expires_in_secs: settings.expires_in_secs,
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
        }
    }

    /// 签发 Token
    ///
    /// 服务本身不提供登录接口，签发主要供运维脚本与测试使用
    pub fn generate_token(
        &self,
        admin_id: &str,
        name: &str,
        role: &str,
    ) -> Result<(String, i64), AdminError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in_secs);

        let claims = Claims {
            sub: admin_id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AdminError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 Token
    pub fn verify_token(&self, token: &str) -> Result<AdminIdentity, AdminError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AdminError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AdminError::Unauthorized("无效的 Token".to_string())
                }
                _ => AdminError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(&JwtSettings::default())
    }

    #[test]
    fn test_generate_and_verify_token() {
        let manager = manager();
        let (token, _exp) = manager.generate_token("7", "Ada Obi", "editor").unwrap();

        let identity = manager.verify_token(&token).unwrap();
        assert_eq!(identity.id, "7");
        assert_eq!(identity.name, "Ada Obi");
        assert_eq!(identity.role, Some(AdminRole::Editor));
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        let manager = manager();
        let (token, _) = manager.generate_token("9", "Guest", "viewer").unwrap();

        let identity = manager.verify_token(&token).unwrap();
        assert_eq!(identity.role, None);
        assert!(!identity.has_role(&[AdminRole::Admin, AdminRole::Editor]));
    }

    #[test]
    fn test_token_from_other_issuer_rejected() {
        let other = JwtManager::new(&JwtSettings {
            issuer: "someone-else".to_string(),
            ..Default::default()
        });
        let (token, _) = other.generate_token("1", "Admin", "admin").unwrap();

        assert!(matches!(
            manager().verify_token(&token),
            Err(AdminError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_invalid_token() {
        assert!(manager().verify_token("invalid.token.here").is_err());
    }
}
