use crate::constants::{MAX_SCALAR_INPUT_SIZE, ORDER_WIDE, POINT_SIZE, SCALAR_SIZE};
use crate::errors::{Error, Result};
use k256::elliptic_curve::bigint::{Encoding, NonZero, U512};
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::PrimeField;
use k256::{EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use sha3::{Digest, Sha3_256};

/// Deterministically map a shared password onto the password scalar `s`.
///
/// Computes `SHA3-256(password) mod n`. Should the reduction land on zero,
/// the ASCII literal `"retried"` is appended to the hash input and the
/// computation repeats until the result is nonzero, guaranteeing
/// `s ∈ [1, n)`. A single hash invocation is deliberate: key-stretching a
/// weak password is the caller's job, upstream of this function.
///
/// # Arguments:
/// - `password` - the shared password, must be nonempty
///
/// # Return:
/// `s` as 32 big-endian bytes, suitable for [`round2`](crate::Jpake::round2)
pub fn derive_s(password: &str) -> Result<[u8; SCALAR_SIZE]> {
    if password.is_empty() {
        return Err(Error::InvalidArgument("Missing password"));
    }

    let mut preimage = password.as_bytes().to_vec();
    loop {
        let digest = Sha3_256::digest(&preimage);
        let s = scalar_from_bytes(&digest)?;
        if !bool::from(s.is_zero()) {
            return Ok(s.to_bytes().into());
        }
        // hitting zero is negligibly rare, the retry only guarantees s != 0
        preimage.extend_from_slice(b"retried");
    }
}

/// Interpret up to 64 big-endian bytes as an unsigned integer and reduce it
/// modulo the group order `n`.
pub(crate) fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    if bytes.is_empty() || bytes.len() > MAX_SCALAR_INPUT_SIZE {
        return Err(Error::InvalidArgument(
            "Invalid scalar encoding, must be between 1 and 64 bytes long",
        ));
    }

    let mut wide = [0u8; MAX_SCALAR_INPUT_SIZE];
    wide[MAX_SCALAR_INPUT_SIZE - bytes.len()..].copy_from_slice(bytes);

    let order = Option::from(NonZero::new(ORDER_WIDE)).expect("the group order is nonzero");
    let reduced = U512::from_be_slice(&wide).rem(&order);

    let mut repr = FieldBytes::default();
    repr.copy_from_slice(&reduced.to_be_bytes()[SCALAR_SIZE..]);
    Option::from(Scalar::from_repr(repr))
        .ok_or(Error::Internal("Reduction produced a non-canonical scalar"))
}

/// Decode a canonical 32-byte big-endian scalar, `None` when out of range
pub(crate) fn scalar_from_repr(bytes: &[u8; SCALAR_SIZE]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(FieldBytes::from(*bytes)))
}

/// Compressed SEC1 encoding of a point
pub(crate) fn compress(point: &ProjectivePoint) -> Result<[u8; POINT_SIZE]> {
    let encoded = point.to_affine().to_encoded_point(true);
    // the identity encodes as a single zero byte
    if encoded.len() != POINT_SIZE {
        return Err(Error::InvalidArgument(
            "Invalid point: the point at infinity has no compressed encoding",
        ));
    }
    let mut bytes = [0u8; POINT_SIZE];
    bytes.copy_from_slice(encoded.as_bytes());
    Ok(bytes)
}

/// Decode a compressed SEC1 point, `None` when the bytes name no curve point
pub(crate) fn decompress(bytes: &[u8]) -> Option<ProjectivePoint> {
    if bytes.len() != POINT_SIZE {
        return None;
    }
    let encoded = EncodedPoint::from_bytes(bytes).ok()?;
    Option::from(ProjectivePoint::from_encoded_point(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GENERATOR, ORDER};
    use k256::U256;

    #[test]
    fn derive_s_is_deterministic_and_in_range() {
        let first = derive_s("secretPassword123").unwrap();
        let second = derive_s("secretPassword123").unwrap();
        assert_eq!(first, second);

        let value = U256::from_be_slice(&first);
        assert!(value < ORDER);
        assert_ne!(first, [0u8; SCALAR_SIZE]);
    }

    #[test]
    fn derive_s_rejects_an_empty_password() {
        assert_eq!(derive_s(""), Err(Error::InvalidArgument("Missing password")));
    }

    #[test]
    fn distinct_passwords_produce_distinct_scalars() {
        assert_ne!(
            derive_s("secretPassword123").unwrap(),
            derive_s("wrongPassword").unwrap()
        );
    }

    #[test]
    fn wide_scalars_are_reduced() {
        // 2n + 1 encoded as 64 bytes must reduce to 1
        let over = ORDER_WIDE.shl_vartime(1).wrapping_add(&U512::ONE);
        let scalar = scalar_from_bytes(&over.to_be_bytes()).unwrap();
        assert_eq!(scalar, Scalar::ONE);
    }

    #[test]
    fn short_scalars_keep_their_value() {
        assert_eq!(scalar_from_bytes(&[7u8]).unwrap(), Scalar::from(7u64));
    }

    #[test]
    fn out_of_range_scalar_encodings_are_rejected() {
        assert!(scalar_from_bytes(&[]).is_err());
        assert!(scalar_from_bytes(&[0u8; MAX_SCALAR_INPUT_SIZE + 1]).is_err());
    }

    #[test]
    fn points_survive_a_compression_round_trip() {
        let point = GENERATOR * Scalar::from(42u64);
        let bytes = compress(&point).unwrap();
        assert_eq!(decompress(&bytes).unwrap(), point);
    }

    #[test]
    fn the_identity_cannot_be_compressed() {
        assert!(compress(&ProjectivePoint::IDENTITY).is_err());
    }

    #[test]
    fn garbage_never_decodes_as_a_point() {
        assert!(decompress(&[0u8; POINT_SIZE]).is_none());
        assert!(decompress(&[0xFFu8; POINT_SIZE]).is_none());
        assert!(decompress(&[0x02u8; 5]).is_none());
    }
}
