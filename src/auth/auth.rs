use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Decodes a bearer access token into the caller's identity.
    pub fn from_bearer(header: Option<&str>, secret: &str) -> Result<Self, AppError> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Missing token"))?;

        let claims = verify_token(token, secret)
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::unauthorized("Access token required"));
        }

        let role =
            Role::from_id(claims.role).ok_or_else(|| AppError::unauthorized("Invalid role"))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), AppError> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(AppError::forbidden("HR/Admin only"))
        }
    }

    /// The caller's employee profile id; 404 when the login has none.
    pub fn require_employee(&self) -> Result<u64, AppError> {
        self.employee_id
            .ok_or_else(|| AppError::not_found("Employee profile not found"))
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already decoded by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(AppError::Internal(anyhow::anyhow!("Config missing"))));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(AuthUser::from_bearer(header, &config.jwt_secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};

    fn subject(role: u8, employee_id: Option<u64>) -> TokenSubject {
        TokenSubject {
            user_id: 1,
            username: "hr".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn bearer_access_token_is_accepted() {
        let token = generate_access_token(&subject(2, None), "k", 60).unwrap();
        let header = format!("Bearer {token}");
        let user = AuthUser::from_bearer(Some(&header), "k").unwrap();
        assert_eq!(user.role, Role::Hr);
        assert!(user.require_hr_or_admin().is_ok());
        assert!(user.require_admin().is_err());
        assert!(matches!(user.require_employee(), Err(AppError::NotFound(_))));
    }

    #[test]
    fn refresh_tokens_cannot_call_the_api() {
        let (token, _) = generate_refresh_token(&subject(1, None), "k", 60).unwrap();
        let header = format!("Bearer {token}");
        assert!(matches!(
            AuthUser::from_bearer(Some(&header), "k"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn missing_or_malformed_header() {
        assert!(AuthUser::from_bearer(None, "k").is_err());
        assert!(AuthUser::from_bearer(Some("Token abc"), "k").is_err());
        assert!(AuthUser::from_bearer(Some("Bearer abc"), "k").is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let token = generate_access_token(&subject(42, Some(3)), "k", 60).unwrap();
        let header = format!("Bearer {token}");
        assert!(AuthUser::from_bearer(Some(&header), "k").is_err());
    }

    #[test]
    fn employee_id_comes_from_claims() {
        let token = generate_access_token(&subject(3, Some(1000)), "k", 60).unwrap();
        let header = format!("Bearer {token}");
        let user = AuthUser::from_bearer(Some(&header), "k").unwrap();
        assert_eq!(user.require_employee().unwrap(), 1000);
    }
}
