use crate::constants::{PASS2_SIZE, ROUND1_SIZE, SESSION_KEY_SIZE};
use crate::errors::{Error, Result};
use crate::session::{Jpake, Round1Result, Round2Result, State};

/// The responder's single message: its round 1 and round 2 results bundled
#[cfg_attr(
    feature = "serde",
    derive(our_serde::Serialize, our_serde::Deserialize)
)]
#[cfg_attr(feature = "serde", serde(crate = "our_serde"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pass2Result {
    /// The responder's round 1 commitments and proofs
    pub round1: Round1Result,
    /// The responder's round 2 message
    pub round2: Round2Result,
}

impl Pass2Result {
    /// Serialize as the fixed concatenation round 1 ‖ round 2
    pub fn to_bytes(&self) -> [u8; PASS2_SIZE] {
        let mut bytes = [0u8; PASS2_SIZE];
        bytes[..ROUND1_SIZE].copy_from_slice(&self.round1.to_bytes());
        bytes[ROUND1_SIZE..].copy_from_slice(&self.round2.to_bytes());
        bytes
    }

    /// Parse the fixed 300-byte concatenation emitted by [`Pass2Result::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PASS2_SIZE {
            return Err(Error::InvalidArgument(
                "Invalid pass 2 message, must be 300 bytes long",
            ));
        }
        let (round1, round2) = bytes.split_at(ROUND1_SIZE);
        Ok(Self {
            round1: Round1Result::from_bytes(round1)?,
            round2: Round2Result::from_bytes(round2)?,
        })
    }
}

/// The two-round protocol reshaped into a strict back-and-forth.
///
/// The two-round schedule has both parties send in parallel; transports
/// built on request/response need an alternating order instead. This
/// adapter serialises the same messages into three passes:
///
/// ```text
/// initiator                                   responder
///     │ ──────── pass 1: round 1 ────────────────▶ │
///     │ ◀─────── pass 2: round 1 + round 2 ─────── │
///     │ ──────── pass 3: round 2 ────────────────▶ │
/// ```
///
/// after which both sides derive the key. No cryptographic material is
/// added or removed; each side still runs the plain [`Jpake`] engine
/// underneath, which also rejects out-of-order or wrong-role calls.
pub struct JpakeThreePass {
    session: Jpake,
}

impl JpakeThreePass {
    /// Create an adapter bound to `user_id` with no additional context
    pub fn new(user_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            session: Jpake::new(user_id)?,
        })
    }

    /// Create an adapter that binds `other_info` into every emitted proof
    pub fn with_context<I, S>(user_id: impl Into<String>, other_info: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            session: Jpake::with_context(user_id, other_info)?,
        })
    }

    /// The identity bound into every proof this party emits
    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }

    /// Where the underlying session currently is in its lifecycle
    pub fn state(&self) -> State {
        self.session.state()
    }

    /// Initiator: open the exchange with our round 1 message
    pub fn pass1(&mut self) -> Result<Round1Result> {
        self.session.round1()
    }

    /// Responder: consume the initiator's pass 1 and answer with our
    /// round 1 and round 2 in one bundle
    ///
    /// # Arguments:
    /// - `peer_pass1` - the initiator's round 1 message
    /// - `s` - the password scalar from [`derive_s`](crate::derive_s)
    /// - `peer_user_id` - the initiator's claimed identity
    pub fn pass2(
        &mut self,
        peer_pass1: &Round1Result,
        s: &[u8],
        peer_user_id: &str,
    ) -> Result<Pass2Result> {
        let round1 = self.session.round1()?;
        let round2 = self.session.round2(peer_pass1, s, peer_user_id)?;
        Ok(Pass2Result { round1, round2 })
    }

    /// Initiator: consume the responder's pass 2 and answer with our
    /// round 2 message
    pub fn pass3(
        &mut self,
        peer_pass2: &Pass2Result,
        s: &[u8],
        peer_user_id: &str,
    ) -> Result<Round2Result> {
        let round2 = self.session.round2(&peer_pass2.round1, s, peer_user_id)?;
        self.session.set_round2_from_peer(&peer_pass2.round2)?;
        Ok(round2)
    }

    /// Responder: consume the initiator's pass 3
    pub fn receive_pass3(&mut self, peer_pass3: &Round2Result) -> Result<()> {
        self.session.set_round2_from_peer(peer_pass3)
    }

    /// Derive the 32-byte shared session key, in either role
    pub fn derive_shared_key(&mut self) -> Result<[u8; SESSION_KEY_SIZE]> {
        self.session.derive_shared_key()
    }
}
