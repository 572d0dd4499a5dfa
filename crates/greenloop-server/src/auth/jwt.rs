//! JWT Token 处理
//!
//! 提供 JWT Token 的生成和验证功能。员工端和管理端共用同一套
//! 签名配置，通过 Claims 中的 scope 字段区分两类身份。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// 员工端 Token 的 scope 取值
pub const SCOPE_EMPLOYEE: &str = "employee";
/// 管理端 Token 的 scope 取值
pub const SCOPE_ADMIN: &str = "admin";

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "greenloop-secret-key-change-in-production".to_string(),
            expires_in_secs: 86400, // 24 小时
            issuer: "greenloop-server".to_string(),
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    /// 用户名
    pub username: String,
    /// 显示名称
    pub display_name: Option<String>,
    /// Token 作用域（employee / admin）
    pub scope: String,
    /// 角色列表（管理端）
    pub roles: Vec<String>,
    /// 权限列表（管理端）
    pub permissions: Vec<String>,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    /// 取出数值形式的用户 ID
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::Internal("无效的用户 ID".to_string()))
    }

    /// 是否为管理端 Token
    pub fn is_admin(&self) -> bool {
        self.scope == SCOPE_ADMIN
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT Token
    ///
    /// # 参数
    /// - `user_id`: 用户 ID
    /// - `username`: 用户名
    /// - `display_name`: 显示名称
    /// - `scope`: Token 作用域（employee / admin）
    /// - `roles`: 角色列表
    /// - `permissions`: 权限列表
    pub fn generate_token(
        &self,
        user_id: i64,
        username: &str,
        display_name: Option<&str>,
        scope: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            display_name: display_name.map(|s| s.to_string()),
            scope: scope.to_string(),
            roles,
            permissions,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    ///
    /// 返回解析后的 Claims，如果 Token 无效或过期则返回错误
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }

    /// 刷新 Token
    ///
    /// 基于现有的 Claims 生成新的 Token（延长过期时间）
    pub fn refresh_token(&self, claims: &Claims) -> Result<(String, i64), ApiError> {
        let user_id = claims.user_id()?;

        self.generate_token(
            user_id,
            &claims.username,
            claims.display_name.as_deref(),
            &claims.scope,
            claims.roles.clone(),
            claims.permissions.clone(),
        )
    }

    /// 获取 Token 过期时间（秒）
    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, _exp) = manager
            .generate_token(
                1,
                "admin",
                Some("管理员"),
                SCOPE_ADMIN,
                vec!["admin".to_string()],
                vec!["system:user:read".to_string()],
            )
            .unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.roles, vec!["admin"]);
        assert!(claims.is_admin());
        assert_eq!(claims.user_id().unwrap(), 1);
    }

    #[test]
    fn test_employee_scope_is_not_admin() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, _) = manager
            .generate_token(7, "zhang.wei", None, SCOPE_EMPLOYEE, vec![], vec![])
            .unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert!(!claims.is_admin());
        assert_eq!(claims.scope, SCOPE_EMPLOYEE);
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::default());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let manager_a = JwtManager::new(JwtConfig::default());
        let manager_b = JwtManager::new(JwtConfig {
            issuer: "other-service".to_string(),
            ..JwtConfig::default()
        });

        let (token, _) = manager_b
            .generate_token(1, "admin", None, SCOPE_ADMIN, vec![], vec![])
            .unwrap();

        assert!(manager_a.verify_token(&token).is_err());
    }
}
