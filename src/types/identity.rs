//! Identity representation for entry senders/recipients.
//!
//! A party in the ledger is either a real account — a compressed
//! secp256k1 public key, hex-encoded — or one of the two system
//! sentinels (`"ICO"`, `"INCENTIVE"`) used for entries the node itself
//! originates rather than a signing user. The wire representation is
//! always a plain JSON string; [`Identity`] only exists so the rest of
//! the crate can match on the sentinel cases instead of string-comparing
//! everywhere.

use std::fmt;

use k256::ecdsa::{Signature, SigningKey, VerifyingKey, signature::Signer, signature::Verifier};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const SENTINEL_ICO: &str = "ICO";
pub const SENTINEL_INCENTIVE: &str = "INCENTIVE";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Compressed SEC1 public key, hex-encoded.
    PublicKey(String),
    /// System sentinel for entries crediting the initial coin offering.
    Ico,
    /// System sentinel for delayed mining rewards.
    Incentive,
}

impl Identity {
    pub fn as_str(&self) -> &str {
        match self {
            Identity::PublicKey(hex) => hex,
            Identity::Ico => SENTINEL_ICO,
            Identity::Incentive => SENTINEL_INCENTIVE,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Identity::Ico | Identity::Incentive)
    }

    pub fn public_key_hex(pk: &VerifyingKey) -> String {
        hex::encode(pk.to_encoded_point(true).as_bytes())
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        match s {
            SENTINEL_ICO => Identity::Ico,
            SENTINEL_INCENTIVE => Identity::Incentive,
            other => Identity::PublicKey(other.to_string()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Identity::from(s.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid hex encoding: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("malformed public key")]
    MalformedPublicKey,
    #[error("malformed DER signature")]
    MalformedSignature,
}

/// Parses a hex-encoded compressed SEC1 public key.
pub fn parse_public_key(hex_str: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(hex_str)?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::MalformedPublicKey)
}

/// Signs `message` with `signing_key`, returning a DER-encoded hex signature.
pub fn sign_der_hex(signing_key: &SigningKey, message: &[u8]) -> String {
    let sig: Signature = signing_key.sign(message);
    hex::encode(sig.to_der().as_bytes())
}

/// Verifies a DER-encoded hex signature over `message` against `pubkey_hex`.
pub fn verify_der_hex(pubkey_hex: &str, message: &[u8], signature_hex: &str) -> Result<bool, CryptoError> {
    let verifying_key = parse_public_key(pubkey_hex)?;
    let sig_bytes = hex::decode(signature_hex)?;
    let signature = Signature::from_der(&sig_bytes).map_err(|_| CryptoError::MalformedSignature)?;
    Ok(verifying_key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand_core::OsRng;

    #[test]
    fn sentinel_round_trips_through_json() {
        let ico = Identity::Ico;
        let json = serde_json::to_string(&ico).unwrap();
        assert_eq!(json, "\"ICO\"");
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Identity::Ico);
    }

    #[test]
    fn public_key_identity_is_not_confused_with_sentinel() {
        let id = Identity::from("02abcdef");
        assert!(matches!(id, Identity::PublicKey(_)));
        assert!(!id.is_sentinel());
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let sk = SigningKey::random(&mut OsRng);
        let vk = VerifyingKey::from(&sk);
        let pubkey_hex = Identity::public_key_hex(&vk);

        let msg = b"some canonical message bytes";
        let sig_hex = sign_der_hex(&sk, msg);

        assert!(verify_der_hex(&pubkey_hex, msg, &sig_hex).unwrap());
        assert!(!verify_der_hex(&pubkey_hex, b"tampered", &sig_hex).unwrap());
    }

    #[test]
    fn verify_rejects_signature_from_wrong_key() {
        let sk1 = SigningKey::random(&mut OsRng);
        let sk2 = SigningKey::random(&mut OsRng);
        let vk2 = VerifyingKey::from(&sk2);
        let pubkey2_hex = Identity::public_key_hex(&vk2);

        let msg = b"payload";
        let sig_from_1 = sign_der_hex(&sk1, msg);

        assert!(!verify_der_hex(&pubkey2_hex, msg, &sig_from_1).unwrap());
    }
}
