use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sha2::{Digest, Sha256};
use sqlx::Row;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app::forms::{FormErrors, ValidSignup, DUPLICATE_EMAIL, DUPLICATE_USERNAME};
use crate::app::users::{user_from_row, USER_COLUMNS};
use crate::domain::user::User;
use crate::infra::db::{is_unique_violation, Db};

const TOKEN_ISSUER: &str = "chirp";
const TOKEN_TYPE: &str = "session";

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum SignupOutcome {
    Created { user: User, session: IssuedSession },
    Rejected(FormErrors),
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    session_key: [u8; 32],
    session_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, session_key: [u8; 32], session_ttl_hours: u64) -> Self {
        Self {
            db,
            session_key,
            session_ttl_hours,
        }
    }

    /// Creates the account and opens a session for it in one transaction.
    pub async fn signup(&self, form: ValidSignup) -> Result<SignupOutcome> {
        let mut errors = FormErrors::default();
        self.report_taken(&form.username, &form.email, &mut errors).await?;
        if !errors.is_empty() {
            return Ok(SignupOutcome::Rejected(errors));
        }

        let password_hash = hash_password(&form.password)?;
        let mut tx = self.db.pool().begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO users (id, username, email, password_hash, age, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&form.username)
        .bind(&form.email)
        .bind(password_hash)
        .bind(form.age)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *tx)
        .await
        .map_err(anyhow::Error::from);

        // A concurrent signup can win the race between the pre-check and the insert.
        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err, "users.username") => {
                errors.add("username", DUPLICATE_USERNAME);
                return Ok(SignupOutcome::Rejected(errors));
            }
            Err(err) if is_unique_violation(&err, "users.email") => {
                errors.add("email", DUPLICATE_EMAIL);
                return Ok(SignupOutcome::Rejected(errors));
            }
            Err(err) => return Err(err),
        };
        let user = user_from_row(&row);

        let session = self.issue_session_with_tx(user.id, &mut tx).await?;
        tx.commit().await?;

        Ok(SignupOutcome::Created { user, session })
    }

    /// Adds duplicate-account errors for fields that have no error yet, so they
    /// are reported alongside any other validation failures.
    pub async fn report_taken(&self, username: &str, email: &str, errors: &mut FormErrors) -> Result<()> {
        let check_username = !username.is_empty() && !errors.has("username");
        let check_email = !email.is_empty() && !errors.has("email");
        if !check_username && !check_email {
            return Ok(());
        }

        let taken = sqlx::query(
            "SELECT \
                EXISTS (SELECT 1 FROM users WHERE username = ?1) AS username_taken, \
                EXISTS (SELECT 1 FROM users WHERE email = ?2) AS email_taken",
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.db.pool())
        .await?;

        if check_username && taken.get::<bool, _>("username_taken") {
            errors.add("username", DUPLICATE_USERNAME);
        }
        if check_email && taken.get::<bool, _>("email_taken") {
            errors.add("email", DUPLICATE_EMAIL);
        }
        Ok(())
    }

    /// Returns `None` for an unknown username and for a wrong password alike.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<(User, IssuedSession)>> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM users WHERE username = ?1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let password_hash: String = row.get("password_hash");
        if password_hash.is_empty() || !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let user = user_from_row(&row);
        let session = self.issue_session(user.id).await?;
        Ok(Some((user, session)))
    }

    pub async fn logout(&self, token: &str) -> Result<bool> {
        let Some(session) = self.authenticate(token).await? else {
            return Ok(false);
        };

        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ?1 \
             WHERE id = ?2 AND user_id = ?3 AND revoked_at IS NULL",
        )
        .bind(OffsetDateTime::now_utc())
        .bind(session.session_id)
        .bind(session.user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, TOKEN_TYPE) {
            return Ok(None);
        }
        let user_id = claim_uuid(&claims, "sub")?;
        let session_id = claim_uuid(&claims, "jti")?;

        let stored_hash: Option<String> = sqlx::query_scalar(
            "SELECT token_hash FROM sessions \
             WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL AND expires_at > ?3",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(self.db.pool())
        .await?;

        let Some(stored_hash) = stored_hash else {
            return Ok(None);
        };
        let presented = hash_token(token);
        if !bool::from(presented.as_bytes().ct_eq(stored_hash.as_bytes())) {
            return Ok(None);
        }

        Ok(Some(AuthSession { user_id, session_id }))
    }

    pub async fn issue_session(&self, user_id: Uuid) -> Result<IssuedSession> {
        let mut tx = self.db.pool().begin().await?;
        let session = self.issue_session_with_tx(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(session)
    }

    async fn issue_session_with_tx(
        &self,
        user_id: Uuid,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ) -> Result<IssuedSession> {
        let session_id = Uuid::new_v4();
        let (claims, expires_at) = self.build_claims(user_id, session_id)?;
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut **tx)
        .await?;

        Ok(IssuedSession { token, expires_at })
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }

    fn build_claims(&self, user_id: Uuid, session_id: Uuid) -> Result<(Claims, OffsetDateTime)> {
        let duration = std::time::Duration::from_secs(self.session_ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(&user_id.to_string())?;
        claims.token_identifier(&session_id.to_string())?;
        claims.add_additional("typ", TOKEN_TYPE)?;
        let expires_at = OffsetDateTime::now_utc() + Duration::hours(self.session_ttl_hours as i64);
        Ok((claims, expires_at))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
