use crate::constants::{MAX_PREFIXED_FIELD_SIZE, POINT_SIZE, PROOF_SIZE, SCALAR_SIZE};
use crate::errors::{Error, Result};
use crate::utils::{compress, decompress, scalar_from_bytes, scalar_from_repr};
use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand_core::OsRng;
use sha3::{Digest, Sha3_256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

// byte offsets within the serialized proof: [VLen][V][rLen][r]
const V_LEN_OFFSET: usize = 0;
const V_OFFSET: usize = 1;
const R_LEN_OFFSET: usize = V_OFFSET + POINT_SIZE;
const R_OFFSET: usize = R_LEN_OFFSET + 1;

/// Hash one length-prefixed field into the challenge
fn update_prefixed(hasher: &mut Sha3_256, field: &[u8]) -> Result<()> {
    if field.len() > MAX_PREFIXED_FIELD_SIZE {
        return Err(Error::InvalidArgument(
            "Invalid field, a length-prefixed field must be at most 255 bytes long",
        ));
    }
    hasher.update([field.len() as u8]);
    hasher.update(field);
    Ok(())
}

/// Compute the Fiat-Shamir challenge `c = H(gx ‖ V ‖ userId ‖ otherInfo) mod n`
///
/// Every field is prefixed with its one-byte length, in this exact order,
/// so that no two distinct inputs concatenate to the same hash preimage.
pub(crate) fn challenge(
    user_id: &str,
    gx: &ProjectivePoint,
    v: &ProjectivePoint,
    other_info: &[String],
) -> Result<Scalar> {
    let mut hasher = Sha3_256::new();
    update_prefixed(&mut hasher, &compress(gx)?)?;
    update_prefixed(&mut hasher, &compress(v)?)?;
    update_prefixed(&mut hasher, user_id.as_bytes())?;
    for info in other_info {
        update_prefixed(&mut hasher, info.as_bytes())?;
    }
    scalar_from_bytes(&hasher.finalize())
}

/// Prove knowledge of `x` such that `gx = g·x`, without revealing `x`.
///
/// `g` is an arbitrary generator, not necessarily the curve base point: the
/// engine proves against composite generators in round 2. The prover
/// identity and any session context are bound into the challenge.
///
/// # Arguments:
/// - `user_id` - the prover's identity
/// - `x` - the secret discrete logarithm
/// - `gx` - the public point `g·x`
/// - `g` - the generator the proof is taken against
/// - `other_info` - session context bound into the challenge, may be empty
///
/// # Return:
/// The 67-byte serialized proof `[33][V][32][r]`, already self-verified
pub fn prove(
    user_id: &str,
    x: &Scalar,
    gx: &ProjectivePoint,
    g: &ProjectivePoint,
    other_info: &[String],
) -> Result<[u8; PROOF_SIZE]> {
    let mut v = *NonZeroScalar::random(&mut OsRng);
    let big_v = *g * v;
    let c = challenge(user_id, gx, &big_v, other_info)?;
    let r = v - *x * c;
    v.zeroize();

    let mut proof = [0u8; PROOF_SIZE];
    proof[V_LEN_OFFSET] = POINT_SIZE as u8;
    proof[V_OFFSET..R_LEN_OFFSET].copy_from_slice(&compress(&big_v)?);
    proof[R_LEN_OFFSET] = SCALAR_SIZE as u8;
    proof[R_OFFSET..].copy_from_slice(&r.to_bytes());

    // catch a faulty curve backend before the proof ever reaches the peer
    match verify(user_id, gx, &proof, g, other_info) {
        Ok(true) => Ok(proof),
        _ => Err(Error::Internal(
            "Freshly generated proof failed self-verification",
        )),
    }
}

/// Verify a serialized proof of knowledge of the discrete logarithm of `gx`.
///
/// Structurally malformed proofs raise [`Error::Verification`]. A `V` that
/// decodes to no curve point returns `Ok(false)` instead, so callers surface
/// a uniform "ZKP verification failed" for every algebraically bad proof.
///
/// # Arguments:
/// - `peer_user_id` - the identity the proof must be bound to
/// - `gx` - the public point the proof is about
/// - `proof` - the received proof bytes
/// - `g` - the generator the proof was taken against
/// - `other_info` - session context bound into the challenge, may be empty
///
/// # Return:
/// `Ok(true)` iff `V == g·r + gx·c` in affine coordinates
pub fn verify(
    peer_user_id: &str,
    gx: &ProjectivePoint,
    proof: &[u8],
    g: &ProjectivePoint,
    other_info: &[String],
) -> Result<bool> {
    if proof.len() != PROOF_SIZE {
        return Err(Error::Verification(
            "Invalid proof, must be 33 + 32 + 2 bytes long",
        ));
    }
    if proof[V_LEN_OFFSET] != POINT_SIZE as u8 || proof[R_LEN_OFFSET] != SCALAR_SIZE as u8 {
        return Err(Error::Verification(
            "Invalid proof, V must be 33 bytes and r must be 32 bytes",
        ));
    }

    let big_v = match decompress(&proof[V_OFFSET..R_LEN_OFFSET]) {
        Some(point) => point,
        None => return Ok(false),
    };
    let mut r_bytes = [0u8; SCALAR_SIZE];
    r_bytes.copy_from_slice(&proof[R_OFFSET..]);
    let r = match scalar_from_repr(&r_bytes) {
        Some(scalar) => scalar,
        None => return Ok(false),
    };

    let c = challenge(peer_user_id, gx, &big_v, other_info)?;
    let expected = *g * r + *gx * c;

    // compare affine coordinates, projective representations are not unique
    Ok(bool::from(expected.to_affine().ct_eq(&big_v.to_affine())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GENERATOR;

    fn random_scalar() -> Scalar {
        *NonZeroScalar::random(&mut OsRng)
    }

    fn context(tag: &str) -> Vec<String> {
        vec![tag.to_owned()]
    }

    #[test]
    fn a_fresh_proof_verifies() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let info = context("2024-01-01T00:00:00Z");
        let proof = prove("Alice", &x, &gx, &GENERATOR, &info).unwrap();
        assert!(verify("Alice", &gx, &proof, &GENERATOR, &info).unwrap());
    }

    #[test]
    fn proofs_work_against_composite_generators() {
        let g = GENERATOR * random_scalar() + GENERATOR * random_scalar();
        let x = random_scalar();
        let gx = g * x;
        let proof = prove("Alice", &x, &gx, &g, &[]).unwrap();
        assert!(verify("Alice", &gx, &proof, &g, &[]).unwrap());
        assert!(!verify("Alice", &gx, &proof, &GENERATOR, &[]).unwrap());
    }

    #[test]
    fn a_proof_is_bound_to_its_prover() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let proof = prove("Alice", &x, &gx, &GENERATOR, &[]).unwrap();
        assert!(!verify("Bob", &gx, &proof, &GENERATOR, &[]).unwrap());
    }

    #[test]
    fn a_proof_is_bound_to_its_context() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let proof = prove("Alice", &x, &gx, &GENERATOR, &context("t1")).unwrap();
        assert!(!verify("Alice", &gx, &proof, &GENERATOR, &context("t2")).unwrap());
        assert!(!verify("Alice", &gx, &proof, &GENERATOR, &[]).unwrap());
    }

    #[test]
    fn flipping_any_bit_never_yields_a_valid_proof() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let proof = prove("Alice", &x, &gx, &GENERATOR, &[]).unwrap();

        for byte in 0..PROOF_SIZE {
            for bit in 0..8 {
                let mut tampered = proof;
                tampered[byte] ^= 1 << bit;
                let outcome = verify("Alice", &gx, &tampered, &GENERATOR, &[]);
                assert_ne!(outcome, Ok(true), "byte {byte} bit {bit} verified");
            }
        }
    }

    #[test]
    fn truncated_and_padded_proofs_are_rejected() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let proof = prove("Alice", &x, &gx, &GENERATOR, &[]).unwrap();

        let expected = Err(Error::Verification(
            "Invalid proof, must be 33 + 32 + 2 bytes long",
        ));
        assert_eq!(
            verify("Alice", &gx, &proof[..PROOF_SIZE - 1], &GENERATOR, &[]),
            expected
        );
        let mut padded = proof.to_vec();
        padded.push(0);
        assert_eq!(verify("Alice", &gx, &padded, &GENERATOR, &[]), expected);
        assert_eq!(verify("Alice", &gx, &[], &GENERATOR, &[]), expected);
    }

    #[test]
    fn corrupt_length_prefixes_are_rejected() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let mut proof = prove("Alice", &x, &gx, &GENERATOR, &[]).unwrap();
        proof[0] = 32;
        assert_eq!(
            verify("Alice", &gx, &proof, &GENERATOR, &[]),
            Err(Error::Verification(
                "Invalid proof, V must be 33 bytes and r must be 32 bytes"
            ))
        );
    }

    #[test]
    fn an_off_curve_commitment_reports_false_not_an_error() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let mut proof = prove("Alice", &x, &gx, &GENERATOR, &[]).unwrap();
        // x-coordinate far beyond the field prime cannot name a point
        for byte in proof[V_OFFSET + 1..R_LEN_OFFSET].iter_mut() {
            *byte = 0xFF;
        }
        assert_eq!(verify("Alice", &gx, &proof, &GENERATOR, &[]), Ok(false));
    }

    #[test]
    fn oversized_identities_cannot_be_bound() {
        let x = random_scalar();
        let gx = GENERATOR * x;
        let long_id = "a".repeat(MAX_PREFIXED_FIELD_SIZE + 1);
        assert!(matches!(
            prove(&long_id, &x, &gx, &GENERATOR, &[]),
            Err(Error::InvalidArgument(_))
        ));

        let proof = prove("Alice", &x, &gx, &GENERATOR, &[]).unwrap();
        assert!(matches!(
            verify(&long_id, &gx, &proof, &GENERATOR, &[]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
