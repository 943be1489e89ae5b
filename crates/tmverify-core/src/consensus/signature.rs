use crate::encoding::sha256_hash;
use crate::types::PublicKey;

/// Domain separation tag for BLS12-381 vote signatures (min-pk, proof of possession scheme).
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// BLS messages longer than this are signed as their SHA256 digest.
pub const BLS_MAX_MESSAGE_LEN: usize = 32;

/// Checks one signature against one public key.
///
/// Implementations are pure and hold no mutable state. Malformed keys or signatures,
/// and keys of an algorithm the verifier does not handle, are reported as `false`:
/// callers only ever see "signature invalid", never a separate decoding error.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 vote signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let PublicKey::Ed25519(key_bytes) = public_key else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(key_bytes) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &sig).is_ok()
    }
}

/// BLS12-381 vote signatures (public keys in G1, signatures in G2).
#[derive(Clone, Copy, Debug, Default)]
pub struct Bls12381Verifier;

impl SignatureVerifier for Bls12381Verifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        use blst::min_pk::{PublicKey as BlsPublicKey, Signature};
        use blst::BLST_ERROR;

        let PublicKey::Bls12381(key_bytes) = public_key else {
            return false;
        };
        let Ok(key) = BlsPublicKey::from_bytes(key_bytes) else {
            return false;
        };
        let Ok(sig) = Signature::from_bytes(signature) else {
            return false;
        };

        let digest;
        let message = if message.len() > BLS_MAX_MESSAGE_LEN {
            digest = sha256_hash(message);
            &digest[..]
        } else {
            message
        };

        // Group-check both the signature and the key: neither comes from a trusted source.
        sig.verify(true, message, BLS_DST, &[], &key, true) == BLST_ERROR::BLST_SUCCESS
    }
}

/// secp256k1 vote signatures: 64-byte compact ECDSA over SHA256(message).
///
/// High-S signatures are rejected, so each vote has exactly one valid encoding.
#[derive(Clone, Debug)]
pub struct Secp256k1Verifier {
    context: secp256k1::Secp256k1<secp256k1::VerifyOnly>,
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self {
            context: secp256k1::Secp256k1::verification_only(),
        }
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        use secp256k1::{ecdsa::Signature, Message, PublicKey as SecpPublicKey};

        let PublicKey::Secp256k1(key_bytes) = public_key else {
            return false;
        };
        let Ok(key) = SecpPublicKey::from_slice(key_bytes) else {
            return false;
        };
        let Ok(sig) = Signature::from_compact(signature) else {
            return false;
        };
        let Ok(digest) = Message::from_digest_slice(&sha256_hash(message)) else {
            return false;
        };
        self.context.verify_ecdsa(&digest, &sig, &key).is_ok()
    }
}

/// Dispatches on the key's algorithm tag to the matching verifier.
#[derive(Clone, Debug, Default)]
pub struct StandardVerifier {
    ed25519: Ed25519Verifier,
    secp256k1: Secp256k1Verifier,
    bls12_381: Bls12381Verifier,
}

impl SignatureVerifier for StandardVerifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        match public_key {
            PublicKey::Ed25519(_) => self.ed25519.verify(public_key, message, signature),
            PublicKey::Secp256k1(_) => self.secp256k1.verify(public_key, message, signature),
            PublicKey::Bls12381(_) => self.bls12_381.verify(public_key, message, signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn ed25519_keypair(seed: u8) -> (SigningKey, PublicKey) {
        let signing = SigningKey::from_bytes(&[seed; 32]);
        let public = PublicKey::Ed25519(signing.verifying_key().to_bytes());
        (signing, public)
    }

    fn bls_keypair(seed: u8) -> (blst::min_pk::SecretKey, PublicKey) {
        let secret = blst::min_pk::SecretKey::key_gen(&[seed; 32], &[]).unwrap();
        let public = PublicKey::Bls12381(secret.sk_to_pk().to_bytes());
        (secret, public)
    }

    fn secp256k1_keypair(seed: u8) -> (secp256k1::SecretKey, PublicKey) {
        let secret = secp256k1::SecretKey::from_slice(&[seed; 32]).unwrap();
        let public = secret.public_key(&secp256k1::Secp256k1::signing_only());
        (secret, PublicKey::Secp256k1(public.serialize()))
    }

    fn secp256k1_sign(secret: &secp256k1::SecretKey, message: &[u8]) -> [u8; 64] {
        let digest = secp256k1::Message::from_digest_slice(&sha256_hash(message)).unwrap();
        secp256k1::Secp256k1::signing_only()
            .sign_ecdsa(&digest, secret)
            .serialize_compact()
    }

    #[test]
    fn test_ed25519_valid_and_tampered() {
        let (signing, public) = ed25519_keypair(1);
        let message = b"precommit";
        let sig = signing.sign(message).to_bytes();

        assert!(Ed25519Verifier.verify(&public, message, &sig));
        assert!(!Ed25519Verifier.verify(&public, b"precommjt", &sig));

        let mut flipped = sig;
        flipped[10] ^= 0x01;
        assert!(!Ed25519Verifier.verify(&public, message, &flipped));
    }

    #[test]
    fn test_malformed_inputs_are_false_not_errors() {
        let (signing, public) = ed25519_keypair(2);
        let sig = signing.sign(b"m").to_bytes();

        assert!(!Ed25519Verifier.verify(&public, b"m", &sig[..63]));
        assert!(!Ed25519Verifier.verify(&public, b"m", &[]));
        assert!(!Bls12381Verifier.verify(&PublicKey::Bls12381([0u8; 48]), b"m", &[0u8; 96]));
    }

    #[test]
    fn test_algorithm_mismatch_is_false() {
        let (signing, public) = ed25519_keypair(3);
        let sig = signing.sign(b"m").to_bytes();
        assert!(!Bls12381Verifier.verify(&public, b"m", &sig));
    }

    #[test]
    fn test_secp256k1_valid_tampered_and_high_s() {
        let (secret, public) = secp256k1_keypair(7);
        let message = b"precommit";
        let sig = secp256k1_sign(&secret, message);
        let verifier = Secp256k1Verifier::default();

        assert!(verifier.verify(&public, message, &sig));
        assert!(!verifier.verify(&public, b"precommjt", &sig));
        assert!(!verifier.verify(&public, message, &sig[..63]));

        // n - s verifies mathematically but is the non-canonical high-S form.
        let n = hex_literal::hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");
        let mut flipped = sig;
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = n[i] as i16 - sig[32 + i] as i16 - borrow;
            borrow = if diff < 0 { 1 } else { 0 };
            flipped[32 + i] = (diff & 0xff) as u8;
        }
        assert!(!verifier.verify(&public, message, &flipped));
    }

    #[test]
    fn test_bls_short_and_long_messages() {
        let (secret, public) = bls_keypair(4);

        let short = b"short vote";
        let sig = secret.sign(short, BLS_DST, &[]).to_bytes();
        assert!(Bls12381Verifier.verify(&public, short, &sig));

        let long = [0x42u8; 120];
        let sig = secret.sign(&sha256_hash(&long), BLS_DST, &[]).to_bytes();
        assert!(Bls12381Verifier.verify(&public, &long, &sig));
        assert!(!Bls12381Verifier.verify(&public, &long[..119], &sig));
    }

    #[test]
    fn test_standard_verifier_dispatches() {
        let (ed_signing, ed_public) = ed25519_keypair(5);
        let (bls_secret, bls_public) = bls_keypair(6);
        let message = b"vote";

        let ed_sig = ed_signing.sign(message).to_bytes();
        let bls_sig = bls_secret.sign(message, BLS_DST, &[]).to_bytes();

        let (secp_secret, secp_public) = secp256k1_keypair(8);
        let secp_sig = secp256k1_sign(&secp_secret, message);

        let verifier = StandardVerifier::default();
        assert!(verifier.verify(&ed_public, message, &ed_sig));
        assert!(verifier.verify(&secp_public, message, &secp_sig));
        assert!(!verifier.verify(&secp_public, message, &ed_sig));
        assert!(verifier.verify(&bls_public, message, &bls_sig));
        assert!(!verifier.verify(&bls_public, message, &ed_sig));
    }
}
