//! Login orchestration: challenge issuance, signed login, token checks.

use super::address::Address;
use super::nonce::NonceRegistry;
use super::session::{Claims, SessionIssuer};
use super::verify::verify_signature;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AuthError;
use crate::models::{LoginRequest, LoginResponse, NonceResponse};
use crate::storage::{ChallengeStore, UserStore};
use std::sync::Arc;

/// Text shown to the wallet; the nonce is appended.
pub const LOGIN_MESSAGE_PREFIX: &str = "Sign this message to authenticate with Launchpad.\n\nNonce: ";

/// The exact message a client must sign to log in with `nonce`.
pub fn login_message(nonce: &str) -> String {
    format!("{}{}", LOGIN_MESSAGE_PREFIX, nonce)
}

pub struct AuthService {
    nonces: NonceRegistry,
    sessions: SessionIssuer,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        nonces: NonceRegistry,
        sessions: SessionIssuer,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            nonces,
            sessions,
            users,
            clock,
        }
    }

    /// Wire the service from configuration and the chosen stores.
    pub fn from_config(
        config: &Config,
        challenges: Arc<dyn ChallengeStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            NonceRegistry::new(challenges, clock.clone(), config.nonce_ttl_secs),
            SessionIssuer::new(
                config.jwt_secret.as_bytes(),
                config.session_ttl_secs,
                clock.clone(),
            ),
            users,
            clock,
        )
    }

    pub async fn generate_nonce(&self, address: &str) -> Result<NonceResponse, AuthError> {
        let nonce = self.nonces.issue(address).await?;
        Ok(NonceResponse { nonce })
    }

    /// Authenticate a signed challenge and mint a session token.
    ///
    /// The nonce is consumed before the signature is checked, so a failed
    /// attempt still burns it.
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let result = self.try_login(req).await;
        if let Err(e) = &result {
            tracing::warn!(action = "auth_failed", reason = e.kind(), "Login rejected");
        }
        result
    }

    async fn try_login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError> {
        self.nonces.consume(&req.address, &req.nonce).await?;

        let address: Address = req.address.parse().map_err(|_| AuthError::InvalidAddress)?;

        let message = login_message(&req.nonce);
        if !verify_signature(&req.address, &message, &req.signature) {
            return Err(AuthError::InvalidSignature);
        }

        let (user, created) = self
            .users
            .get_or_create(&address, self.clock.now_secs())
            .await?;
        if created {
            tracing::info!(action = "user_created", address = %user.address, "New user record");
        }

        let token = self.sessions.mint(&address)?;

        tracing::info!(action = "auth_success", address = %address, "User authenticated");

        Ok(LoginResponse {
            token,
            address: address.to_string(),
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.sessions.validate(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::nonce::DEFAULT_NONCE_TTL_SECS;
    use crate::auth::session::DEFAULT_SESSION_TTL_SECS;
    use crate::auth::verify::{address_from_verifying_key, sign_personal_message};
    use crate::clock::ManualClock;
    use crate::models::StoredUser;
    use crate::storage::{MemoryChallengeStore, MemoryUserStore, StoreError};
    use async_trait::async_trait;
    use k256::ecdsa::SigningKey;

    const SECRET: &[u8] = b"service-test-secret-thirty-two-bytes!!";
    const T0: u64 = 1_700_000_000;

    struct FailingUserStore;

    #[async_trait]
    impl UserStore for FailingUserStore {
        async fn get_or_create(
            &self,
            _address: &Address,
            _now: u64,
        ) -> Result<(StoredUser, bool), StoreError> {
            Err(StoreError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))))
        }
    }

    struct Fixture {
        service: Arc<AuthService>,
        clock: Arc<ManualClock>,
        users: Arc<MemoryUserStore>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(T0));
        let users = Arc::new(MemoryUserStore::new());
        let service = build_service(clock.clone(), users.clone());
        Fixture {
            service: Arc::new(service),
            clock,
            users,
        }
    }

    fn build_service(clock: Arc<ManualClock>, users: Arc<dyn UserStore>) -> AuthService {
        AuthService::new(
            NonceRegistry::new(
                Arc::new(MemoryChallengeStore::new()),
                clock.clone(),
                DEFAULT_NONCE_TTL_SECS,
            ),
            SessionIssuer::new(SECRET, DEFAULT_SESSION_TTL_SECS, clock.clone()),
            users,
            clock,
        )
    }

    fn test_wallet() -> (SigningKey, String) {
        loop {
            let mut seed = [0u8; 32];
            rand::fill(&mut seed);
            if let Ok(key) = SigningKey::from_slice(&seed) {
                // Mixed case, as a wallet would report it
                let address = address_from_verifying_key(key.verifying_key()).to_string();
                let mixed = format!("0x{}", address[2..].to_uppercase());
                return (key, mixed);
            }
        }
    }

    fn login_request(key: &SigningKey, address: &str, nonce: &str) -> LoginRequest {
        LoginRequest {
            address: address.to_string(),
            nonce: nonce.to_string(),
            signature: sign_personal_message(key, &login_message(nonce)).unwrap(),
        }
    }

    #[test]
    fn test_login_message_format() {
        assert_eq!(
            login_message("7f3e"),
            "Sign this message to authenticate with Launchpad.\n\nNonce: 7f3e"
        );
    }

    #[tokio::test]
    async fn test_full_login_flow() {
        let f = fixture();
        let (key, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let resp = f
            .service
            .login(&login_request(&key, &address, &nonce))
            .await
            .unwrap();

        assert_eq!(resp.address, address.to_lowercase());

        let claims = f.service.verify_token(&resp.token).unwrap();
        assert_eq!(claims.address, address.to_lowercase());
        assert_eq!(claims.exp, T0 + DEFAULT_SESSION_TTL_SECS);

        let parsed: Address = address.parse().unwrap();
        assert!(f.users.get(&parsed).is_some());
    }

    #[tokio::test]
    async fn test_login_replay_fails() {
        let f = fixture();
        let (key, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let req = login_request(&key, &address, &nonce);

        assert!(f.service.login(&req).await.is_ok());
        assert_eq!(
            f.service.login(&req).await.unwrap_err(),
            AuthError::NonceNotFound
        );
    }

    #[tokio::test]
    async fn test_generate_nonce_invalid_address() {
        let f = fixture();
        assert_eq!(
            f.service.generate_nonce("0xnothex").await.unwrap_err(),
            AuthError::InvalidAddress
        );
    }

    #[tokio::test]
    async fn test_login_expired_nonce() {
        let f = fixture();
        let (key, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        f.clock.advance(5 * 60 + 1);

        assert_eq!(
            f.service
                .login(&login_request(&key, &address, &nonce))
                .await
                .unwrap_err(),
            AuthError::NonceExpired
        );
    }

    #[tokio::test]
    async fn test_login_wrong_signer_burns_nonce() {
        let f = fixture();
        let (_, address) = test_wallet();
        let (impostor, _) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let req = login_request(&impostor, &address, &nonce);

        assert_eq!(
            f.service.login(&req).await.unwrap_err(),
            AuthError::InvalidSignature
        );
        assert_eq!(
            f.service.login(&req).await.unwrap_err(),
            AuthError::NonceNotFound
        );
    }

    #[tokio::test]
    async fn test_login_signature_over_other_nonce() {
        let f = fixture();
        let (key, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let mut req = login_request(&key, &address, "some-other-nonce");
        req.nonce = nonce;

        assert_eq!(
            f.service.login(&req).await.unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn test_login_wrong_nonce() {
        let f = fixture();
        let (key, address) = test_wallet();

        f.service.generate_nonce(&address).await.unwrap();
        let req = login_request(&key, &address, "guess");

        assert_eq!(
            f.service.login(&req).await.unwrap_err(),
            AuthError::NonceMismatch
        );
    }

    #[tokio::test]
    async fn test_login_malformed_signature() {
        let f = fixture();
        let (_, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let req = LoginRequest {
            address: address.clone(),
            nonce,
            signature: "0x1234".to_string(),
        };

        assert_eq!(
            f.service.login(&req).await.unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn test_login_upstream_failure() {
        let clock = Arc::new(ManualClock::new(T0));
        let service = build_service(clock, Arc::new(FailingUserStore));
        let (key, address) = test_wallet();

        let nonce = service.generate_nonce(&address).await.unwrap().nonce;
        let err = service
            .login(&login_request(&key, &address, &nonce))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UpstreamFailure(_)));
    }

    #[tokio::test]
    async fn test_existing_user_reused() {
        let f = fixture();
        let (key, address) = test_wallet();
        let parsed: Address = address.parse().unwrap();

        for _ in 0..2 {
            let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
            f.service
                .login(&login_request(&key, &address, &nonce))
                .await
                .unwrap();
            f.clock.advance(10);
        }

        assert_eq!(f.users.get(&parsed).unwrap().created_at, T0);
    }

    #[tokio::test]
    async fn test_token_expires_after_24h() {
        let f = fixture();
        let (key, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let token = f
            .service
            .login(&login_request(&key, &address, &nonce))
            .await
            .unwrap()
            .token;

        f.clock.advance(24 * 60 * 60);
        assert_eq!(
            f.service.verify_token(&token).unwrap_err(),
            AuthError::Expired
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_logins_single_success() {
        let f = fixture();
        let (key, address) = test_wallet();

        let nonce = f.service.generate_nonce(&address).await.unwrap().nonce;
        let req = login_request(&key, &address, &nonce);

        let a = {
            let service = f.service.clone();
            let req = req.clone();
            tokio::spawn(async move { service.login(&req).await })
        };
        let b = {
            let service = f.service.clone();
            let req = req.clone();
            tokio::spawn(async move { service.login(&req).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(
            failure,
            AuthError::NonceNotFound | AuthError::NonceMismatch
        ));
    }
}
