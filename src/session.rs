use crate::constants::{POINT_SIZE, PROOF_SIZE, ROUND1_SIZE, ROUND2_SIZE, SESSION_KEY_SIZE};
use crate::errors::{Error, Result};
use crate::utils::{compress, decompress, scalar_from_bytes};
use crate::zkp;
use core::mem;
use k256::elliptic_curve::Group;
use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand_core::OsRng;
use sha3::{Digest, Sha3_256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public view of the session state machine
///
/// Each public operation is legal in exactly one source state. A session
/// never moves backwards; [`State::KeyDerived`] and [`State::Failed`] are
/// terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Freshly created, no messages exchanged yet
    Initial,
    /// Round 1 commitments generated and ready to send
    Round1Done,
    /// Peer's round 1 verified, own round 2 generated
    Round2Done,
    /// Peer's round 2 received, ready for key derivation
    Round2Received,
    /// The shared key was derived, the session is spent
    KeyDerived,
    /// An operation failed, the session must be discarded
    Failed,
}

/// The first message of the exchange: both commitments and their proofs
#[cfg_attr(
    feature = "serde",
    derive(our_serde::Serialize, our_serde::Deserialize)
)]
#[cfg_attr(feature = "serde", serde(crate = "our_serde"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round1Result {
    /// `G1 = G·x1`, compressed
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    pub g1: [u8; POINT_SIZE],
    /// `G2 = G·x2`, compressed
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    pub g2: [u8; POINT_SIZE],
    /// Proof of knowledge of `x1` against the base point
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    pub zkp_x1: [u8; PROOF_SIZE],
    /// Proof of knowledge of `x2` against the base point
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    pub zkp_x2: [u8; PROOF_SIZE],
}

impl Round1Result {
    /// Serialize as the fixed concatenation `G1 ‖ G2 ‖ ZKP{x1} ‖ ZKP{x2}`
    pub fn to_bytes(&self) -> [u8; ROUND1_SIZE] {
        let mut bytes = [0u8; ROUND1_SIZE];
        let (g1, rest) = bytes.split_at_mut(POINT_SIZE);
        let (g2, rest) = rest.split_at_mut(POINT_SIZE);
        let (zkp_x1, zkp_x2) = rest.split_at_mut(PROOF_SIZE);
        g1.copy_from_slice(&self.g1);
        g2.copy_from_slice(&self.g2);
        zkp_x1.copy_from_slice(&self.zkp_x1);
        zkp_x2.copy_from_slice(&self.zkp_x2);
        bytes
    }

    /// Parse the fixed 200-byte concatenation emitted by [`Round1Result::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ROUND1_SIZE {
            return Err(Error::InvalidArgument(
                "Invalid round 1 message, must be 200 bytes long",
            ));
        }
        let (g1, rest) = bytes.split_at(POINT_SIZE);
        let (g2, rest) = rest.split_at(POINT_SIZE);
        let (zkp_x1, zkp_x2) = rest.split_at(PROOF_SIZE);
        Ok(Self {
            g1: g1.try_into().expect("array length invariant broken"),
            g2: g2.try_into().expect("array length invariant broken"),
            zkp_x1: zkp_x1.try_into().expect("array length invariant broken"),
            zkp_x2: zkp_x2.try_into().expect("array length invariant broken"),
        })
    }
}

/// The second message of the exchange
#[cfg_attr(
    feature = "serde",
    derive(our_serde::Serialize, our_serde::Deserialize)
)]
#[cfg_attr(feature = "serde", serde(crate = "our_serde"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round2Result {
    /// `A = (G1 + G3 + G4)·x2·s`, compressed
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    pub a: [u8; POINT_SIZE],
    /// Proof of knowledge of `x2·s` against the composite generator
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    pub zkp_x2s: [u8; PROOF_SIZE],
}

impl Round2Result {
    /// Serialize as the fixed concatenation `A ‖ ZKP{x2·s}`
    pub fn to_bytes(&self) -> [u8; ROUND2_SIZE] {
        let mut bytes = [0u8; ROUND2_SIZE];
        bytes[..POINT_SIZE].copy_from_slice(&self.a);
        bytes[POINT_SIZE..].copy_from_slice(&self.zkp_x2s);
        bytes
    }

    /// Parse the fixed 100-byte concatenation emitted by [`Round2Result::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ROUND2_SIZE {
            return Err(Error::InvalidArgument(
                "Invalid round 2 message, must be 100 bytes long",
            ));
        }
        let (a, zkp_x2s) = bytes.split_at(POINT_SIZE);
        Ok(Self {
            a: a.try_into().expect("array length invariant broken"),
            zkp_x2s: zkp_x2s.try_into().expect("array length invariant broken"),
        })
    }
}

/// Secrets and commitments held between round 1 and round 2
#[derive(Zeroize, ZeroizeOnDrop)]
struct Round1State {
    x1: Scalar,
    x2: Scalar,
    #[zeroize(skip)]
    g1: ProjectivePoint,
    #[zeroize(skip)]
    g2: ProjectivePoint,
}

/// Secrets and commitments held once our round 2 message is out
#[derive(Zeroize, ZeroizeOnDrop)]
struct Round2State {
    x2: Scalar,
    x2s: Scalar,
    #[zeroize(skip)]
    g1: ProjectivePoint,
    #[zeroize(skip)]
    g2: ProjectivePoint,
    #[zeroize(skip)]
    g3: ProjectivePoint,
    #[zeroize(skip)]
    g4: ProjectivePoint,
    #[zeroize(skip)]
    peer_id: String,
}

/// Everything needed for key derivation once the peer's round 2 arrived
#[derive(Zeroize, ZeroizeOnDrop)]
struct ReceivedState {
    round2: Round2State,
    #[zeroize(skip)]
    b: ProjectivePoint,
    peer_proof: [u8; PROOF_SIZE],
}

/// Tagged session state, each variant owns exactly the fields its state needs
enum Stage {
    Initial,
    Round1Done(Round1State),
    Round2Done(Round2State),
    Round2Received(ReceivedState),
    KeyDerived,
    Failed,
}

/// One party's view of a J-PAKE exchange.
///
/// The protocol is symmetric: both parties run the same four operations in
/// the same order, and the local party is always "Alice". Messages are
/// plain data, transporting them between the parties is the caller's job.
///
/// Dropping or replacing a session zeroizes the ephemeral secrets it holds.
///
/// ```
/// use jpake::{derive_s, Jpake};
///
/// let s = derive_s("hunter2")?;
/// let mut alice = Jpake::new("Alice")?;
/// let mut bob = Jpake::new("Bob")?;
///
/// let alice_r1 = alice.round1()?;
/// let bob_r1 = bob.round1()?;
/// let alice_r2 = alice.round2(&bob_r1, &s, "Bob")?;
/// let bob_r2 = bob.round2(&alice_r1, &s, "Alice")?;
/// alice.set_round2_from_peer(&bob_r2)?;
/// bob.set_round2_from_peer(&alice_r2)?;
///
/// assert_eq!(alice.derive_shared_key()?, bob.derive_shared_key()?);
/// # Ok::<(), jpake::Error>(())
/// ```
pub struct Jpake {
    user_id: String,
    other_info: Vec<String>,
    stage: Stage,
}

impl Jpake {
    /// Create a session bound to `user_id` with no additional context
    pub fn new(user_id: impl Into<String>) -> Result<Self> {
        Self::with_context(user_id, core::iter::empty::<String>())
    }

    /// Create a session that additionally binds `other_info` into every
    /// proof it emits, in order. Both parties must agree on the context or
    /// all proof verification fails.
    ///
    /// # Arguments:
    /// - `user_id` - this party's identity, must be nonempty and distinct
    ///   from the peer's
    /// - `other_info` - session context such as a timestamp or channel tag
    pub fn with_context<I, S>(user_id: impl Into<String>, other_info: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(Error::InvalidArgument("Missing userId"));
        }
        Ok(Self {
            user_id,
            other_info: other_info.into_iter().map(Into::into).collect(),
            stage: Stage::Initial,
        })
    }

    /// The identity bound into every proof this session emits
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Where the session currently is in its lifecycle
    pub fn state(&self) -> State {
        match self.stage {
            Stage::Initial => State::Initial,
            Stage::Round1Done(_) => State::Round1Done,
            Stage::Round2Done(_) => State::Round2Done,
            Stage::Round2Received(_) => State::Round2Received,
            Stage::KeyDerived => State::KeyDerived,
            Stage::Failed => State::Failed,
        }
    }

    /// Generate the round 1 commitments `G1 = G·x1`, `G2 = G·x2` and their
    /// proofs of knowledge.
    ///
    /// Only valid in [`State::Initial`]; leaves the session in
    /// [`State::Round1Done`].
    pub fn round1(&mut self) -> Result<Round1Result> {
        if !matches!(self.stage, Stage::Initial) {
            return Err(Error::InvalidState("round1 is only valid in the Initial state"));
        }
        self.stage = Stage::Failed;

        let x1 = *NonZeroScalar::random(&mut OsRng);
        let x2 = *NonZeroScalar::random(&mut OsRng);
        let g1 = ProjectivePoint::GENERATOR * x1;
        let g2 = ProjectivePoint::GENERATOR * x2;

        let base = ProjectivePoint::GENERATOR;
        let zkp_x1 = zkp::prove(&self.user_id, &x1, &g1, &base, &self.other_info)?;
        let zkp_x2 = zkp::prove(&self.user_id, &x2, &g2, &base, &self.other_info)?;

        let result = Round1Result {
            g1: compress(&g1)?,
            g2: compress(&g2)?,
            zkp_x1,
            zkp_x2,
        };
        self.stage = Stage::Round1Done(Round1State { x1, x2, g1, g2 });
        Ok(result)
    }

    /// Verify the peer's round 1 message and produce our round 2 message
    /// `A = (G1 + G3 + G4)·x2·s` with its proof against the composite
    /// generator.
    ///
    /// Only valid in [`State::Round1Done`]; leaves the session in
    /// [`State::Round2Done`].
    ///
    /// # Arguments:
    /// - `peer_round1` - the peer's round 1 message
    /// - `s` - the password scalar from [`derive_s`](crate::derive_s),
    ///   1 to 64 big-endian bytes, reduced modulo the group order
    /// - `peer_user_id` - the peer's claimed identity
    pub fn round2(
        &mut self,
        peer_round1: &Round1Result,
        s: &[u8],
        peer_user_id: &str,
    ) -> Result<Round2Result> {
        if !matches!(self.stage, Stage::Round1Done(_)) {
            return Err(Error::InvalidState("round2 is only valid in the Round1Done state"));
        }
        let Stage::Round1Done(state) = mem::replace(&mut self.stage, Stage::Failed) else {
            return Err(Error::Internal("Session stage desynchronised from its state"));
        };

        let (next, result) = Self::round2_inner(
            &self.user_id,
            &self.other_info,
            state,
            peer_round1,
            s,
            peer_user_id,
        )?;
        self.stage = Stage::Round2Done(next);
        Ok(result)
    }

    fn round2_inner(
        user_id: &str,
        other_info: &[String],
        state: Round1State,
        peer_round1: &Round1Result,
        s: &[u8],
        peer_user_id: &str,
    ) -> Result<(Round2State, Round2Result)> {
        if s.is_empty() || peer_user_id.is_empty() {
            return Err(Error::InvalidArgument("Missing required arguments for round 2"));
        }
        let (g3, g4) = match (decompress(&peer_round1.g1), decompress(&peer_round1.g2)) {
            (Some(g3), Some(g4)) => (g3, g4),
            _ => {
                return Err(Error::InvalidArgument(
                    "Invalid points received: G1 or G2 is not a valid ProjectivePoint",
                ))
            }
        };
        let s = scalar_from_bytes(s)?;
        if bool::from(s.is_zero()) {
            return Err(Error::InvalidArgument("Invalid s: s MUST not be equal to 0 mod n"));
        }
        if peer_user_id == user_id {
            return Err(Error::Verification("Proof verification failed, userIds are equal."));
        }

        let base = ProjectivePoint::GENERATOR;
        let x1_valid = zkp::verify(peer_user_id, &g3, &peer_round1.zkp_x1, &base, other_info)?;
        let x2_valid = zkp::verify(peer_user_id, &g4, &peer_round1.zkp_x2, &base, other_info)?;
        if !(x1_valid && x2_valid) {
            return Err(Error::Verification("ZKP verification failed"));
        }

        let x2s = state.x2 * s;
        // the composite generator folds both parties' round 1 commitments
        let generator = state.g1 + g3 + g4;
        if bool::from(generator.is_identity()) {
            return Err(Error::Verification(
                "Invalid point: The new generator is the point at infinity",
            ));
        }
        let a = generator * x2s;
        let zkp_x2s = zkp::prove(user_id, &x2s, &a, &generator, other_info)?;

        let result = Round2Result {
            a: compress(&a)?,
            zkp_x2s,
        };
        let next = Round2State {
            x2: state.x2,
            x2s,
            g1: state.g1,
            g2: state.g2,
            g3,
            g4,
            peer_id: peer_user_id.to_owned(),
        };
        Ok((next, result))
    }

    /// Store the peer's round 2 message for key derivation.
    ///
    /// Only valid in [`State::Round2Done`]; leaves the session in
    /// [`State::Round2Received`]. The peer's proof is checked during
    /// [`derive_shared_key`](Self::derive_shared_key), not here.
    pub fn set_round2_from_peer(&mut self, peer_round2: &Round2Result) -> Result<()> {
        if !matches!(self.stage, Stage::Round2Done(_)) {
            return Err(Error::InvalidState(
                "setRound2FromPeer is only valid in the Round2Done state",
            ));
        }
        let Stage::Round2Done(state) = mem::replace(&mut self.stage, Stage::Failed) else {
            return Err(Error::Internal("Session stage desynchronised from its state"));
        };

        let Some(b) = decompress(&peer_round2.a) else {
            return Err(Error::InvalidArgument(
                "Invalid point received: A is not a valid ProjectivePoint",
            ));
        };
        self.stage = Stage::Round2Received(ReceivedState {
            round2: state,
            b,
            peer_proof: peer_round2.zkp_x2s,
        });
        Ok(())
    }

    /// Verify the peer's round 2 proof and derive the shared session key
    /// `SHA3-256(Ka)` where `Ka = (B − G4·x2·s)·x2`.
    ///
    /// Only valid in [`State::Round2Received`]; leaves the session in the
    /// terminal [`State::KeyDerived`].
    ///
    /// # Return:
    /// The 32-byte session key. With both parties honest and sharing the
    /// same password both sides compute `(x1 + x3)·x2·x4·s·G` and the keys
    /// are equal; under a password mismatch the keys differ.
    pub fn derive_shared_key(&mut self) -> Result<[u8; SESSION_KEY_SIZE]> {
        if !matches!(self.stage, Stage::Round2Received(_)) {
            return Err(Error::InvalidState(
                "deriveSharedKey is only valid in the Round2Received state",
            ));
        }
        let Stage::Round2Received(state) = mem::replace(&mut self.stage, Stage::Failed) else {
            return Err(Error::Internal("Session stage desynchronised from its state"));
        };

        let key = Self::derive_inner(&self.other_info, &state)?;
        self.stage = Stage::KeyDerived;
        Ok(key)
    }

    fn derive_inner(other_info: &[String], state: &ReceivedState) -> Result<[u8; SESSION_KEY_SIZE]> {
        let r2 = &state.round2;
        if bool::from(state.b.is_identity()) {
            return Err(Error::Verification("Invalid point: B is the point at infinity"));
        }

        // from the peer's perspective this was their G1 + G3 + G4
        let peer_generator = r2.g1 + r2.g3 + r2.g2;
        if !zkp::verify(&r2.peer_id, &state.b, &state.peer_proof, &peer_generator, other_info)? {
            return Err(Error::Verification("ZKP verification failed"));
        }

        // Ka = (B − G4·x2s)·x2; the subtraction cancels the peer's view of
        // our own secret chain, leaving (x1 + x3)·x2·x4·s·G
        let ka = (state.b - r2.g4 * r2.x2s) * r2.x2;
        if bool::from(ka.is_identity()) {
            return Err(Error::Verification("Invalid point: Ka is the point at infinity"));
        }
        Ok(Sha3_256::digest(compress(&ka)?).into())
    }
}
