use crate::config::SECURETOKEN_ISSUER_PREFIX;
use crate::error::VerifyError;
use crate::identity::claims::DecodedIdToken;
use crate::identity::keys::KeySource;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Validation, decode, decode_header};
use std::sync::Arc;
use tracing::{debug, warn};

/// Clock skew tolerated on `iat` and `auth_time`, matching the `exp` leeway.
const CLOCK_SKEW_SECS: i64 = 60;

/// Longest uid Firebase will issue.
const MAX_UID_LEN: usize = 128;

/// Verifies an ID token and returns its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken, VerifyError>;
}

/// Auth operations of a Firebase project.
#[derive(Clone)]
pub struct FirebaseAuth {
    project_id: String,
    keys: Arc<dyn KeySource>,
}

impl FirebaseAuth {
    pub fn new(project_id: impl Into<String>, keys: Arc<dyn KeySource>) -> Self {
        Self {
            project_id: project_id.into(),
            keys,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.keys.algorithm());
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{SECURETOKEN_ISSUER_PREFIX}{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
        validation
    }
}

#[async_trait]
impl TokenVerifier for FirebaseAuth {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken, VerifyError> {
        let header = decode_header(token).map_err(VerifyError::MalformedHeader)?;
        if header.alg != self.keys.algorithm() {
            return Err(VerifyError::UnexpectedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;
        let key = self.keys.decoding_key(&kid).await?;

        let data = decode::<DecodedIdToken>(token, &key, &self.validation())?;
        check_timeline_and_subject(&data.claims, Utc::now().timestamp())?;
        debug!(uid = %data.claims.sub, "ID token verified");
        Ok(data.claims)
    }
}

/// Checks `jsonwebtoken` does not cover.
fn check_timeline_and_subject(claims: &DecodedIdToken, now: i64) -> Result<(), VerifyError> {
    if claims.sub.is_empty() || claims.sub.chars().count() > MAX_UID_LEN {
        return Err(VerifyError::InvalidSubject);
    }
    if claims.iat > now + CLOCK_SKEW_SECS {
        return Err(VerifyError::IssuedInFuture);
    }
    if claims.auth_time.is_some_and(|t| t > now + CLOCK_SKEW_SECS) {
        return Err(VerifyError::AuthTimeInFuture);
    }
    Ok(())
}

/// Result of checking a presented token.
///
/// `success()` and `user()` are two views of the same variant, so a success
/// without a user (or a user on failure) cannot be expressed.
#[derive(Debug)]
pub enum VerifyOutcome {
    Verified(DecodedIdToken),
    Rejected(VerifyError),
}

impl VerifyOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    pub fn user(&self) -> Option<&DecodedIdToken> {
        match self {
            Self::Verified(user) => Some(user),
            Self::Rejected(_) => None,
        }
    }
}

/// Verify `token`, folding every failure into `Rejected` and logging its cause.
pub async fn verify_auth_token(verifier: &dyn TokenVerifier, token: &str) -> VerifyOutcome {
    match verifier.verify_id_token(token).await {
        Ok(user) => VerifyOutcome::Verified(user),
        Err(e) => {
            warn!(error = %e, "error verifying auth token");
            VerifyOutcome::Rejected(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::keys::StaticKeySource;
    use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
    use serde_json::{Value, json};

    const SECRET: &[u8] = b"emulator-secret";
    const PROJECT: &str = "demo-project";

    fn auth() -> FirebaseAuth {
        let keys = StaticKeySource::new("k1", Algorithm::HS256, DecodingKey::from_secret(SECRET));
        FirebaseAuth::new(PROJECT, Arc::new(keys))
    }

    fn claims(sub: &str) -> Value {
        let now = Utc::now().timestamp();
        json!({
            "sub": sub,
            "aud": PROJECT,
            "iss": format!("https://securetoken.google.com/{PROJECT}"),
            "iat": now - 10,
            "exp": now + 3600,
            "auth_time": now - 10,
            "email": "ada@example.com",
            "email_verified": true,
        })
    }

    fn mint(alg: Algorithm, kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(alg);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_secret(SECRET)).expect("encode")
    }

    #[tokio::test]
    async fn accepts_well_formed_token() {
        let token = mint(Algorithm::HS256, Some("k1"), &claims("uid-1"));
        let user = auth().verify_id_token(&token).await.expect("verified");
        assert_eq!(user.uid(), "uid-1");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert!(user.email_verified);
    }

    #[tokio::test]
    async fn rejects_other_project() {
        let mut c = claims("uid-1");
        c["aud"] = json!("someone-else");
        let token = mint(Algorithm::HS256, Some("k1"), &c);
        assert!(matches!(
            auth().verify_id_token(&token).await,
            Err(VerifyError::Jwt(_))
        ));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let mut c = claims("uid-1");
        c["exp"] = json!(Utc::now().timestamp() - 3600);
        let token = mint(Algorithm::HS256, Some("k1"), &c);
        let err = auth().verify_id_token(&token).await.unwrap_err();
        match err {
            VerifyError::Jwt(e) => assert!(matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            )),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_missing_kid_and_wrong_alg() {
        let token = mint(Algorithm::HS256, None, &claims("uid-1"));
        assert!(matches!(
            auth().verify_id_token(&token).await,
            Err(VerifyError::MissingKeyId)
        ));

        let token = mint(Algorithm::HS384, Some("k1"), &claims("uid-1"));
        assert!(matches!(
            auth().verify_id_token(&token).await,
            Err(VerifyError::UnexpectedAlgorithm(Algorithm::HS384))
        ));
    }

    #[tokio::test]
    async fn rejects_empty_subject_and_garbage() {
        let token = mint(Algorithm::HS256, Some("k1"), &claims(""));
        assert!(matches!(
            auth().verify_id_token(&token).await,
            Err(VerifyError::InvalidSubject)
        ));
        assert!(matches!(
            auth().verify_id_token("not-a-jwt").await,
            Err(VerifyError::MalformedHeader(_))
        ));
    }

    #[tokio::test]
    async fn verifies_rs256_against_published_key() {
        let private = include_str!("../../tests/fixtures/service_account_key.pem");
        let public = include_str!("../../tests/fixtures/service_account_pub.pem");
        let keys = StaticKeySource::new(
            "rsa-1",
            Algorithm::RS256,
            DecodingKey::from_rsa_pem(public.as_bytes()).expect("public pem"),
        );
        let auth = FirebaseAuth::new(PROJECT, Arc::new(keys));

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some("rsa-1".to_string());
        let signing = EncodingKey::from_rsa_pem(private.as_bytes()).expect("private pem");
        let token = encode(&header, &claims("uid-rsa"), &signing).expect("encode");

        let user = auth.verify_id_token(&token).await.expect("verified");
        assert_eq!(user.uid(), "uid-rsa");

        header.kid = Some("rotated-away".to_string());
        let token = encode(&header, &claims("uid-rsa"), &signing).expect("encode");
        assert!(matches!(
            auth.verify_id_token(&token).await,
            Err(VerifyError::UnknownKeyId(_))
        ));
    }

    #[test]
    fn future_auth_time_is_rejected() {
        let mut c: DecodedIdToken = serde_json::from_value(claims("uid-1")).expect("claims");
        let now = Utc::now().timestamp();
        c.auth_time = Some(now + 600);
        assert!(matches!(
            check_timeline_and_subject(&c, now),
            Err(VerifyError::AuthTimeInFuture)
        ));
    }

    #[tokio::test]
    async fn outcome_success_and_user_agree() {
        let token = mint(Algorithm::HS256, Some("k1"), &claims("uid-1"));
        let ok = verify_auth_token(&auth(), &token).await;
        assert!(ok.success());
        assert_eq!(ok.user().map(|u| u.uid()), Some("uid-1"));

        let bad = verify_auth_token(&auth(), "garbage").await;
        assert!(!bad.success());
        assert!(bad.user().is_none());
    }
}
