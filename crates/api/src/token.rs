//! # Token 服务
//!
//! 签发与验证无状态 JWT 会话令牌。
//!
//! 验证是纯计算：只检查签名与时间边界，不回查任何存储。
//! 这意味着被删除或降级的账户在令牌自然过期（24 小时内）前仍可通过验证，
//! 属于无状态设计已接受的权衡（见 DESIGN.md）。
//! 签名密钥由配置在进程启动时注入，生命周期与进程等同，启动后只读。

use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;

use crate::types::Claims;
use stockcast_core::store::port::User;

/// Token 有效期 (秒)，固定 24 小时
pub const TOKEN_VALIDITY_SECS: u64 = 86400;

/// Token 验证失败的两种终态，永不重试
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    /// 已过期 (exp <= now)
    #[error("Token expired")]
    Expired,
    /// 签名不匹配或结构非法
    #[error("Invalid token")]
    InvalidSignature,
    /// 签发失败 (仅 issue 路径)
    #[error("Failed to sign token")]
    Signing,
}

/// 为用户签发 JWT。
///
/// iat = 当前时间，exp = iat + 24h，保证 exp 严格晚于 iat。
pub fn issue_jwt(secret: &str, user: &User) -> Result<String, TokenError> {
    let iat = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        name: user.username.clone(),
        role: user.role.to_string(),
        iat,
        exp: iat + TOKEN_VALIDITY_SECS as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|_| TokenError::Signing)
}

/// 验证 JWT 返回强类型 Claims。
///
/// 过期与签名错误严格区分：被篡改的令牌永远返回 `InvalidSignature`，
/// 只有签名合法但已过时限的令牌返回 `Expired`。
pub fn verify_jwt(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::default();
    validation.set_required_spec_claims(&["exp", "sub"]);
    // 过期边界精确：now >= exp 即过期，不留默认的 60s 宽限
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::InvalidSignature,
    })?;

    Ok(token_data.claims)
}
