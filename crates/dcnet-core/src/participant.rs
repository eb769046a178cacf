//! A DC-net member and its two-phase round engine.

use crate::error::{Error, Result};
use crate::keystream::Keystream;
use crate::network::RoundShared;
use crate::sharing::{MessagePart, SplitCombine};
use crate::types::{NetworkState, ParticipantId};
use dashmap::DashMap;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, instrument, trace};

/// The per-round reassembly sink. Invoked once per round, on the owning
/// worker, with the reconstructed (possibly all-zero) message fragment.
pub type MessageSink = Box<dyn Fn(&[u8]) + Send + Sync>;

/// One member of a DC-net.
///
/// A participant owns its outgoing byte queue, one keystream generator per
/// partner, and one receive accumulator per partner (self included). Its
/// identity, keystreams and sharing-partner set are fixed for its lifetime;
/// the mutable round state (`inbox`, `last_block`) is reset every round.
pub struct Participant {
    number: ParticipantId,
    scheme: Arc<dyn SplitCombine>,
    bytes_per_round: usize,

    /// Bytes awaiting transmission. Appended by the enqueueing caller,
    /// drained only by this participant's worker.
    outgoing: Mutex<VecDeque<u8>>,

    /// Per-partner keystream generators, drawn from only by the owning
    /// worker. Each is seeded to reproduce the partner's stream exactly.
    keystreams: DashMap<ParticipantId, Keystream>,

    /// Per-sender receive accumulators (self included). XOR-accumulated by
    /// senders' workers during Phase 1, read and zeroed by the owning worker
    /// during Phase 2; the barrier between the two is the only mutual
    /// exclusion needed.
    inbox: DashMap<ParticipantId, Vec<u8>>,

    /// Identities whose round outputs are combined to recover one message
    /// stream. Always contains this participant; frozen at network start.
    sharing_partners: RwLock<BTreeSet<ParticipantId>>,

    /// The most recently unmasked round block, read cross-participant during
    /// reassembly.
    last_block: RwLock<Vec<u8>>,

    sink: RwLock<MessageSink>,
}

impl Participant {
    /// Create a participant with the given identity and sharing scheme.
    ///
    /// Identities within one network must be exactly `1..=n`; this is
    /// enforced when the network starts.
    pub fn new(
        number: ParticipantId,
        scheme: Arc<dyn SplitCombine>,
        bytes_per_round: usize,
    ) -> Self {
        let inbox = DashMap::new();
        inbox.insert(number, vec![0u8; bytes_per_round]);

        let mut sharing_partners = BTreeSet::new();
        sharing_partners.insert(number);

        Self {
            number,
            scheme,
            bytes_per_round,
            outgoing: Mutex::new(VecDeque::new()),
            keystreams: DashMap::new(),
            inbox,
            sharing_partners: RwLock::new(sharing_partners),
            last_block: RwLock::new(vec![0u8; bytes_per_round]),
            sink: RwLock::new(Box::new(|_| {})),
        }
    }

    /// This participant's identity.
    pub fn number(&self) -> ParticipantId {
        self.number
    }

    /// The fixed round block width.
    pub fn bytes_per_round(&self) -> usize {
        self.bytes_per_round
    }

    /// Queue message bytes to send. Always succeeds; transmission begins
    /// opportunistically once previously enqueued bytes have been drained.
    pub fn enqueue(&self, bytes: &[u8]) {
        let mut outgoing = self.outgoing.lock().expect("outgoing queue poisoned");
        outgoing.extend(bytes.iter().copied());
        debug!(
            participant = self.number,
            len = bytes.len(),
            "queued message bytes"
        );
    }

    /// True while the outgoing queue is non-empty. Once this turns false the
    /// final bytes have been drained into the round pipeline but may still
    /// need a round or two to finish reassembly everywhere.
    pub fn pending_to_send(&self) -> bool {
        !self.outgoing.lock().expect("outgoing queue poisoned").is_empty()
    }

    /// Register the per-round reassembly sink, replacing the previous one.
    pub fn on_message_received<F>(&self, sink: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        *self.sink.write().expect("sink lock poisoned") = Box::new(sink);
    }

    /// Store the keystream agreed with `partner` and allocate the partner's
    /// receive accumulator.
    pub(crate) fn add_keystream(&self, partner: ParticipantId, keystream: Keystream) {
        self.keystreams.insert(partner, keystream);
        self.inbox.insert(partner, vec![0u8; self.bytes_per_round]);
    }

    /// Add `partner` to the set whose round outputs reconstruct a message.
    pub(crate) fn add_sharing_partner(&self, partner: ParticipantId) -> Result<()> {
        let mut partners = self
            .sharing_partners
            .write()
            .expect("sharing partners poisoned");
        if !partners.insert(partner) {
            return Err(Error::DuplicateSharingPartner(partner));
        }
        Ok(())
    }

    /// Number of shares this participant's scheme produces per split.
    pub(crate) fn scheme_parts(&self) -> usize {
        self.scheme.n()
    }

    /// Snapshot of the sharing-partner set, in identity order.
    pub(crate) fn sharing_partners(&self) -> Vec<ParticipantId> {
        self.sharing_partners
            .read()
            .expect("sharing partners poisoned")
            .iter()
            .copied()
            .collect()
    }

    /// XOR-accumulate a masked share into the accumulator slot of `sender`.
    ///
    /// Accumulation rather than overwrite: contributions landing in the same
    /// slot must combine additively under XOR.
    pub(crate) fn deposit(&self, sender: ParticipantId, share: &[u8]) -> Result<()> {
        let mut slot = self
            .inbox
            .get_mut(&sender)
            .ok_or(Error::MissingKeystream(sender))?;
        xor_into(&mut slot, share);
        Ok(())
    }

    /// This participant's current round output as a labeled part.
    pub(crate) fn current_part(&self) -> MessagePart {
        let last = self.last_block.read().expect("last block poisoned");
        MessagePart::new(self.number, last.clone())
    }

    /// The worker loop: two protocol phases per round, then the termination
    /// check, until the network flips to `Terminated`.
    ///
    /// Any error is protocol-fatal for this worker. A DC-net round has no
    /// partial-success state, so the caller logs the error and lets the task
    /// die; the remaining workers then block at the next rendezvous until the
    /// caller tears the network down.
    #[instrument(skip_all, fields(participant = self.number))]
    pub(crate) async fn run_protocol(&self, shared: &RoundShared) -> Result<()> {
        debug!("worker started");
        loop {
            self.mask_and_send(shared).await?;
            self.unmask_and_reassemble(shared).await?;

            // Termination check. The gate permit is held across the third
            // rendezvous so the network can only flip the flag while no
            // worker is between reading it and committing to another round.
            let permit = shared
                .gate
                .acquire()
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;
            let state = *shared.state.read().expect("state lock poisoned");
            if state == NetworkState::Terminated {
                drop(permit);
                debug!("worker observed termination");
                return Ok(());
            }
            shared.barrier.wait().await;
            drop(permit);
        }
    }

    /// Phase 1: drain a plaintext block, split it, mask every outgoing share
    /// with every pairwise keystream block, and deliver.
    ///
    /// Applying each keystream block to all shares this participant sends is
    /// what makes the masks cancel globally: the partner applies the
    /// identical block to its own outgoing shares, so XOR-folding all round
    /// outputs cancels every mask exactly twice.
    async fn mask_and_send(&self, shared: &RoundShared) -> Result<()> {
        let block = self.drain_block();
        let parts = self.scheme.split(&block);

        // One share per destination this participant is responsible for:
        // itself plus every keystream partner.
        let mut shares: Vec<(ParticipantId, Vec<u8>)> =
            Vec::with_capacity(self.keystreams.len() + 1);
        shares.push((self.number, parts[self.number - 1].content().to_vec()));
        for entry in self.keystreams.iter() {
            let dest = *entry.key();
            shares.push((dest, parts[dest - 1].content().to_vec()));
        }

        let mut masks = Vec::with_capacity(self.keystreams.len());
        for mut entry in self.keystreams.iter_mut() {
            masks.push(entry.value_mut().next_block(self.bytes_per_round));
        }

        for mask in &masks {
            for (_, share) in shares.iter_mut() {
                xor_into(share, mask);
            }
        }

        for (dest, share) in &shares {
            trace!(
                to = dest,
                share = %hex::encode(share),
                "delivering masked share"
            );
            shared.roster[dest - 1].deposit(self.number, share)?;
        }

        shared.barrier.wait().await;
        Ok(())
    }

    /// Phase 2: fold the receive accumulators into `last_block`, rendezvous
    /// so every participant holds a consistent block, then reassemble and
    /// hand the result to the sink.
    async fn unmask_and_reassemble(&self, shared: &RoundShared) -> Result<()> {
        if !shared.delay.is_zero() {
            tokio::time::sleep(shared.delay).await;
        }

        {
            let mut last = self.last_block.write().expect("last block poisoned");
            last.fill(0);
            for mut entry in self.inbox.iter_mut() {
                xor_into(&mut last, entry.value());
                entry.value_mut().fill(0);
            }
            trace!(block = %hex::encode(&*last), "unmasked round block");
        }

        shared.barrier.wait().await;

        let round_parts: Vec<MessagePart> = {
            let partners = self
                .sharing_partners
                .read()
                .expect("sharing partners poisoned");
            partners
                .iter()
                .map(|&id| shared.roster[id - 1].current_part())
                .collect()
        };
        let message = self.scheme.combine(&round_parts)?;
        let sink = self.sink.read().expect("sink lock poisoned");
        (*sink)(&message);
        Ok(())
    }

    /// Take up to one block's worth of bytes off the outgoing queue,
    /// zero-padding the remainder.
    fn drain_block(&self) -> Vec<u8> {
        let mut block = vec![0u8; self.bytes_per_round];
        let mut outgoing = self.outgoing.lock().expect("outgoing queue poisoned");
        for slot in block.iter_mut() {
            match outgoing.pop_front() {
                Some(byte) => *slot = byte,
                None => break,
            }
        }
        block
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
