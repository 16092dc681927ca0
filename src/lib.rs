#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

//! # Usage
//! Add `jpake` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! jpake = "0.1"
//! ```
//!
//! Next read the documentation for the [`Jpake`] engine (the symmetric
//! two-round schedule) and the [`JpakeThreePass`] adapter (the same
//! exchange reshaped for strictly alternating transports).
//!
//! # Protocol description
//! Here we briefly describe the J-PAKE protocol. For additional information
//! refer to RFC 8236 (the PAKE) and RFC 8235 (the Schnorr proofs). All
//! arithmetic is on secp256k1 with base point `G` of prime order `n`; the
//! two parties share the password scalar `s = H(password) mod n`.
//!
//! |       Alice                     |   Data transfer      |       Bob                       |
//! |---------------------------------|----------------------|---------------------------------|
//! |                                 | Round 1              |                                 |
//! | `x1, x2 = ${1..n}`              |                      | `x3, x4 = ${1..n}`              |
//! | `G1 = G·x1`, `G2 = G·x2`        | `G1,G2,ZKPs` ->      | `G3 = G·x3`, `G4 = G·x4`        |
//! |                                 | <- `G3,G4,ZKPs`      |                                 |
//! | verify both ZKPs                |                      | verify both ZKPs                |
//! |                                 | Round 2              |                                 |
//! | `A = (G1+G3+G4)·x2·s`           | `A,ZKP{x2·s}` ->     | `B = (G1+G2+G3)·x4·s`           |
//! |                                 | <- `B,ZKP{x4·s}`     |                                 |
//! | verify ZKP                      |                      | verify ZKP                      |
//! |                                 | Key derivation       |                                 |
//! | `Ka = (B − G4·x2·s)·x2`         |                      | `Kb = (A − G2·x4·s)·x4`         |
//! | `K = H(Ka)`                     |                      | `K = H(Kb)`                     |
//!
//! Variables and notations have the following meaning:
//!
//! - `G` — the secp256k1 base point
//! - `n` — the prime order of the subgroup generated by `G`
//! - `H` — SHA3-256
//! - `${a..b}` — draw uniformly at random between `a` and `b`
//! - `·` — curve point multiplication by a scalar
//! - `s` — the password scalar, see [`derive_s`]
//! - `x1..x4` — ephemeral secret scalars, two per party
//! - `ZKP{x}` — a Schnorr proof of knowledge of `x`, see [`zkp`]
//!
//! Every ZKP binds the sender's identity (and optional session context), so
//! a message replayed or re-signed under another identity fails
//! verification. Both `Ka` and `Kb` equal `(x1 + x3)·x2·x4·s·G`, which
//! neither an eavesdropper nor an active attacker without `s` can compute.

pub mod constants;
mod errors;
mod session;
mod three_pass;
mod utils;

/// Module containing the non-interactive Schnorr proof of knowledge used in
/// both protocol rounds
pub mod zkp;

pub use self::{
    errors::{Error, Result},
    session::{Jpake, Round1Result, Round2Result, State},
    three_pass::{JpakeThreePass, Pass2Result},
    utils::derive_s,
};
