use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::captcha::CaptchaVerifier;
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Claims, LoginRequest, LoginResponse, SignupRequest, User, UserRole};

/// Authentication service
pub struct AuthService;

impl AuthService {
    /// Register a new user. Accounts start unapproved; an external approval
    /// process flips the flag before the first login can succeed.
    pub async fn signup(
        db: &Database,
        captcha: &CaptchaVerifier,
        req: SignupRequest,
    ) -> Result<()> {
        if req.first_name.trim().is_empty() {
            return Err(AppError::BadRequest("First Name is required".to_string()));
        }
        if req.last_name.trim().is_empty() {
            return Err(AppError::BadRequest("Last Name is required".to_string()));
        }
        if !req.email.contains('@') || req.email.trim().is_empty() {
            return Err(AppError::BadRequest("Invalid email".to_string()));
        }
        if req.date_of_birth.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Date of Birth is required".to_string(),
            ));
        }
        check_password_strength(&req.password)?;

        captcha.verify(req.captcha_token.as_deref()).await?;

        let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&req.email)
            .fetch_optional(db.pool())
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = Self::hash_password(&req.password)?;

        let user_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, date_of_birth, password_hash, role, approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&user_id)
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(req.email.trim())
        .bind(req.date_of_birth.trim())
        .bind(&password_hash)
        .bind(UserRole::User.as_str())
        .bind(&now)
        .execute(db.pool())
        .await?;

        tracing::info!(user_id = %user_id, "User registered");
        Ok(())
    }

    /// Login user. Wrong password and unapproved account are reported
    /// identically so the response leaks nothing about which one failed.
    pub async fn login(
        db: &Database,
        config: &Config,
        captcha: &CaptchaVerifier,
        req: LoginRequest,
    ) -> Result<LoginResponse> {
        captcha.verify(req.captcha_token.as_deref()).await?;

        let user: User = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&req.email)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !Self::verify_password(&req.password, &user.password_hash)? || !user.approved {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = Self::generate_token(&user, config)?;

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: config.jwt.token_expire_minutes * 60,
        })
    }

    /// Generate a signed bearer token
    fn generate_token(user: &User, config: &Config) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(config.jwt.token_expire_minutes as i64);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Validate a bearer token and extract claims
    pub fn validate_token(token: &str, config: &Config) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let keys = std::iter::once(config.jwt.secret.as_str())
            .chain(config.jwt.previous_secrets.iter().map(|s| s.as_str()));

        for secret in keys {
            if let Ok(token_data) = decode::<Claims>(
                token,
                &DecodingKey::from_secret(secret.as_bytes()),
                &validation,
            ) {
                return Ok(token_data.claims);
            }
        }

        Err(AppError::Unauthorized("Invalid token".to_string()))
    }

    /// Hash password using Argon2
    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(password_hash)
    }

    /// Verify password against hash
    fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Password policy: at least 8 characters, one uppercase letter, and one
/// special character.
fn check_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters long".to_string(),
        ));
    }
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| "!@#$%^&*".contains(c));
    if !has_uppercase || !has_special {
        return Err(AppError::BadRequest(
            "Password must contain at least one uppercase letter and one special character"
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy() {
        assert!(check_password_strength("Str0ng!pass").is_ok());
        assert!(check_password_strength("short!A").is_err());
        assert!(check_password_strength("nouppercase!1").is_err());
        assert!(check_password_strength("NoSpecial123").is_err());
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = AuthService::hash_password("Secret!password").unwrap();
        assert!(AuthService::verify_password("Secret!password", &hash).unwrap());
        assert!(!AuthService::verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_roundtrip_and_rotation() {
        let mut config = Config::default();
        config.jwt.secret = "current-secret".to_string();

        let user = User {
            id: "u1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            date_of_birth: "1815-12-10".to_string(),
            password_hash: String::new(),
            role: "admin".to_string(),
            approved: true,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let token = AuthService::generate_token(&user, &config).unwrap();
        let claims = AuthService::validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, "admin");

        // Tokens signed with a retired secret stay valid through the
        // previous_secrets list
        let mut rotated = Config::default();
        rotated.jwt.secret = "new-secret".to_string();
        rotated.jwt.previous_secrets = vec!["current-secret".to_string()];
        assert!(AuthService::validate_token(&token, &rotated).is_ok());

        let mut unrelated = Config::default();
        unrelated.jwt.secret = "other-secret".to_string();
        assert!(AuthService::validate_token(&token, &unrelated).is_err());
    }
}
