use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
};
use serde_json::Value;

use crate::{config::AppConfig, models::TokenPayload};

/// TokenSigner
///
/// The keyed-signing seam. Implementations only guarantee integrity: `verify`
/// must reject tampered or foreign tokens, but must not judge expiry or the
/// shape of the claims. Both are decided by `AuthService`.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, payload: &TokenPayload) -> Result<String, Error>;

    /// Returns the untyped claims of a token whose signature checks out.
    fn verify(&self, token: &str) -> Result<Value, Error>;
}

/// JwtSigner
///
/// HMAC JWT signer backed by a process-wide secret.
pub struct JwtSigner {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        // Lifetime is carried by `validUntil` in the payload, not by registered claims.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.jwt_algorithm)
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, payload: &TokenPayload) -> Result<String, Error> {
        encode(&self.header, payload, &self.encoding_key)
    }

    fn verify(&self, token: &str) -> Result<Value, Error> {
        decode::<Value>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}
