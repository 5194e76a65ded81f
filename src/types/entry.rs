//! Entry: a signed message queued for inclusion in a block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::sha256_hex;
use super::identity::{CryptoError, Identity, verify_der_hex};

/// The six fields that make up an entry's hash preimage, in the fixed
/// order the wire format requires (`from, to, amount, type,
/// initiationTimestamp, data`). Declaration order is serialization
/// order: `serde_json` does not reorder struct fields, so this struct
/// *is* the canonical encoding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnsignedEntryFields {
    pub from: Identity,
    pub to: Identity,
    pub amount: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "initiationTimestamp")]
    pub initiation_timestamp: u64,
    pub data: serde_json::Value,
}

/// The seven fields signed over: the six unsigned fields plus `hash`,
/// in that order.
#[derive(Clone, Debug, Serialize)]
struct SignedEntryFields {
    from: Identity,
    to: Identity,
    amount: u64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "initiationTimestamp")]
    initiation_timestamp: u64,
    data: serde_json::Value,
    hash: String,
}

/// A signed message intended for inclusion in a block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "entryId")]
    pub entry_id: String,
    pub from: Identity,
    pub to: Identity,
    pub amount: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "initiationTimestamp")]
    pub initiation_timestamp: u64,
    pub data: serde_json::Value,
    pub hash: String,
    pub signature: Option<String>,
}

#[derive(Debug, Error)]
pub enum EntryValidationError {
    #[error("entry hash does not match its recomputed hash")]
    HashMismatch,
    #[error("non-sentinel entry is missing a signature")]
    SignatureMissing,
    #[error("entry signature does not verify against its sender's public key")]
    SignatureInvalid,
    #[error("entry timestamp is outside the ±60s acceptance window")]
    StaleTimestamp,
    #[error("entry has a malformed sender key or signature: {0}")]
    Crypto(#[from] CryptoError),
}

/// Acceptance window for `initiationTimestamp`, in milliseconds.
pub const TIMESTAMP_TOLERANCE_MS: i64 = 60_000;

impl Entry {
    pub fn unsigned_fields(&self) -> UnsignedEntryFields {
        UnsignedEntryFields {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount,
            kind: self.kind.clone(),
            initiation_timestamp: self.initiation_timestamp,
            data: self.data.clone(),
        }
    }

    /// Recomputes the SHA-256 hex hash of the six unsigned fields.
    pub fn compute_hash(&self) -> String {
        let preimage = serde_json::to_vec(&self.unsigned_fields())
            .expect("UnsignedEntryFields always serializes");
        sha256_hex(&preimage)
    }

    fn signed_message_bytes(&self) -> Vec<u8> {
        let signed = SignedEntryFields {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount,
            kind: self.kind.clone(),
            initiation_timestamp: self.initiation_timestamp,
            data: self.data.clone(),
            hash: self.hash.clone(),
        };
        serde_json::to_vec(&signed).expect("SignedEntryFields always serializes")
    }

    /// Full validation: hash recompute, signature (for non-sentinel
    /// senders), and timestamp window against `now_ms`.
    pub fn validate(&self, now_ms: i64) -> Result<(), EntryValidationError> {
        if self.compute_hash() != self.hash {
            return Err(EntryValidationError::HashMismatch);
        }

        if !self.from.is_sentinel() {
            let sig = self
                .signature
                .as_deref()
                .ok_or(EntryValidationError::SignatureMissing)?;
            let ok = verify_der_hex(self.from.as_str(), &self.signed_message_bytes(), sig)?;
            if !ok {
                return Err(EntryValidationError::SignatureInvalid);
            }
        }

        let drift = now_ms - self.initiation_timestamp as i64;
        if drift.abs() >= TIMESTAMP_TOLERANCE_MS {
            return Err(EntryValidationError::StaleTimestamp);
        }

        Ok(())
    }

    /// Builds and hashes an unsigned system entry (ICO / INCENTIVE sender),
    /// leaving `signature` as `None`.
    pub fn new_system(
        entry_id: String,
        from: Identity,
        to: Identity,
        amount: u64,
        kind: String,
        initiation_timestamp: u64,
        data: serde_json::Value,
    ) -> Self {
        let mut entry = Entry {
            entry_id,
            from,
            to,
            amount,
            kind,
            initiation_timestamp,
            data,
            hash: String::new(),
            signature: None,
        };
        entry.hash = entry.compute_hash();
        entry
    }

    /// Builds, hashes, and signs a user entry with `signing_key`.
    pub fn new_signed(
        entry_id: String,
        from: Identity,
        to: Identity,
        amount: u64,
        kind: String,
        initiation_timestamp: u64,
        data: serde_json::Value,
        signing_key: &k256::ecdsa::SigningKey,
    ) -> Self {
        let mut entry = Entry {
            entry_id,
            from,
            to,
            amount,
            kind,
            initiation_timestamp,
            data,
            hash: String::new(),
            signature: None,
        };
        entry.hash = entry.compute_hash();
        let message = entry.signed_message_bytes();
        entry.signature = Some(super::identity::sign_der_hex(signing_key, &message));
        entry
    }
}

/// Where an entry currently lives, as seen by a query.
///
/// Per the Design Notes, query results never mutate the stored `Entry`
/// (the source's pattern of tacking `blockIndex`/`isValid` onto the
/// entry object at query time is replaced by this explicit view type).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryLocation {
    Pending,
    Confirmed(u64),
}

#[derive(Clone, Debug)]
pub struct EntryView {
    pub entry: Entry,
    pub location: EntryLocation,
    /// `None` when validity was not (re-)checked for this view.
    pub validity: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{SigningKey, VerifyingKey};
    use rand_core::OsRng;

    fn now_ms() -> i64 {
        1_700_000_000_000
    }

    #[test]
    fn system_entry_hash_is_self_consistent_and_signature_exempt() {
        let entry = Entry::new_system(
            "e1".into(),
            Identity::Incentive,
            Identity::PublicKey("02aa".into()),
            50,
            "reward".into(),
            now_ms() as u64,
            serde_json::json!({}),
        );
        assert_eq!(entry.compute_hash(), entry.hash);
        assert!(entry.validate(now_ms()).is_ok());
    }

    #[test]
    fn signed_entry_round_trips_validation() {
        let sk = SigningKey::random(&mut OsRng);
        let vk = VerifyingKey::from(&sk);
        let from = Identity::PublicKey(Identity::public_key_hex(&vk));

        let entry = Entry::new_signed(
            "e2".into(),
            from,
            Identity::PublicKey("02bb".into()),
            10,
            "crypto".into(),
            now_ms() as u64,
            serde_json::json!("payload"),
            &sk,
        );

        assert!(entry.validate(now_ms()).is_ok());
    }

    #[test]
    fn tampered_hash_is_rejected() {
        let mut entry = Entry::new_system(
            "e3".into(),
            Identity::Ico,
            Identity::PublicKey("02cc".into()),
            100,
            "crypto".into(),
            now_ms() as u64,
            serde_json::json!(null),
        );
        entry.amount = 200; // tamper after hashing
        assert!(matches!(
            entry.validate(now_ms()),
            Err(EntryValidationError::HashMismatch)
        ));
    }

    #[test]
    fn signature_from_wrong_key_is_rejected() {
        let sk1 = SigningKey::random(&mut OsRng);
        let sk2 = SigningKey::random(&mut OsRng);
        let vk1 = VerifyingKey::from(&sk1);
        let from = Identity::PublicKey(Identity::public_key_hex(&vk1));

        let mut entry = Entry::new_signed(
            "e4".into(),
            from,
            Identity::PublicKey("02dd".into()),
            1,
            "crypto".into(),
            now_ms() as u64,
            serde_json::json!({}),
            &sk1,
        );
        // Re-sign with the wrong key, simulating a forged signature.
        let msg = entry.signed_message_bytes();
        entry.signature = Some(super::super::identity::sign_der_hex(&sk2, &msg));

        assert!(matches!(
            entry.validate(now_ms()),
            Err(EntryValidationError::SignatureInvalid)
        ));
    }

    #[test]
    fn timestamp_boundary_60s_rejected_59_999ms_accepted() {
        let base = now_ms();
        let mut entry = Entry::new_system(
            "e5".into(),
            Identity::Ico,
            Identity::PublicKey("02ee".into()),
            1,
            "crypto".into(),
            (base - 60_000) as u64,
            serde_json::json!({}),
        );
        assert!(matches!(
            entry.validate(base),
            Err(EntryValidationError::StaleTimestamp)
        ));

        entry.initiation_timestamp = (base - 59_999) as u64;
        entry.hash = entry.compute_hash();
        assert!(entry.validate(base).is_ok());
    }

    #[test]
    fn missing_signature_on_user_entry_is_rejected() {
        let entry = Entry::new_system(
            "e6".into(),
            Identity::PublicKey("02ff".into()),
            Identity::PublicKey("0200".into()),
            1,
            "crypto".into(),
            now_ms() as u64,
            serde_json::json!({}),
        );
        assert!(matches!(
            entry.validate(now_ms()),
            Err(EntryValidationError::SignatureMissing)
        ));
    }
}
