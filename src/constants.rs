//! Fixed protocol parameters.
//!
//! The curve is secp256k1 and is not configurable: the base point `G` and
//! the group order `n` below are the domain for every scalar and point in
//! the protocol.

use k256::elliptic_curve::bigint::U512;
use k256::elliptic_curve::Curve;
use k256::{ProjectivePoint, Secp256k1, U256};

/// The fixed secp256k1 base point `G`, the generator for both round 1 commitments
pub const GENERATOR: ProjectivePoint = ProjectivePoint::GENERATOR;

/// The prime order `n` of the subgroup generated by [`GENERATOR`]
pub const ORDER: U256 = <Secp256k1 as Curve>::ORDER;

/// [`ORDER`] widened to 512 bits, so that wire scalars of up to
/// [`MAX_SCALAR_INPUT_SIZE`] bytes can be reduced in one step
pub(crate) const ORDER_WIDE: U512 = U512::from_be_hex(
    "0000000000000000000000000000000000000000000000000000000000000000\
     FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
);

/// Size of a compressed SEC1 secp256k1 point in bytes: parity byte + x-coordinate
pub const POINT_SIZE: usize = 33;

/// Size of a secp256k1 scalar in bytes
pub const SCALAR_SIZE: usize = 32;

/// Size of a serialized Schnorr proof: two one-byte length prefixes + `V` + `r`
pub const PROOF_SIZE: usize = 2 + POINT_SIZE + SCALAR_SIZE;

/// Size of a serialized round 1 message: `G1 ‖ G2 ‖ ZKP{x1} ‖ ZKP{x2}`
pub const ROUND1_SIZE: usize = 2 * POINT_SIZE + 2 * PROOF_SIZE;

/// Size of a serialized round 2 message: `A ‖ ZKP{x2·s}`
pub const ROUND2_SIZE: usize = POINT_SIZE + PROOF_SIZE;

/// Size of a serialized pass 2 bundle: round 1 message ‖ round 2 message
pub const PASS2_SIZE: usize = ROUND1_SIZE + ROUND2_SIZE;

/// Size of the derived session key in bytes
pub const SESSION_KEY_SIZE: usize = 32;

/// Longest accepted wire encoding of a scalar, reduced modulo [`ORDER`] on input
pub const MAX_SCALAR_INPUT_SIZE: usize = 64;

/// Longest field that can be bound into a proof challenge, the field length
/// must fit in its one-byte prefix
pub const MAX_PREFIXED_FIELD_SIZE: usize = 255;
