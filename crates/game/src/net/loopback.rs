use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::authority::{ActionRequest, ParticipantId};

use super::protocol::{
    sequence_greater_than, Packet, PacketError, PacketHeader, PacketType, StateDiff,
};
use super::stats::LinkStats;

#[derive(Debug)]
struct InFlight {
    release_time: f64,
    order: u64,
    bytes: Vec<u8>,
}

impl PartialEq for InFlight {
    fn eq(&self, other: &Self) -> bool {
        self.release_time == other.release_time && self.order == other.order
    }
}

impl Eq for InFlight {}

impl PartialOrd for InFlight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InFlight {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the earliest release first.
        other
            .release_time
            .total_cmp(&self.release_time)
            .then(other.order.cmp(&self.order))
    }
}

#[derive(Debug, Default)]
struct Channel {
    queue: BinaryHeap<InFlight>,
    next_order: u64,
    next_sequence: u32,
    last_received: Option<u32>,
    stats: LinkStats,
}

impl Channel {
    fn push(&mut self, bytes: Vec<u8>, release_time: f64) {
        self.stats.record_sent(bytes.len());
        self.queue.push(InFlight {
            release_time,
            order: self.next_order,
            bytes,
        });
        self.next_order += 1;
    }

    fn pop_ready(&mut self, now: f64) -> Option<Vec<u8>> {
        if self.queue.peek()?.release_time > now {
            return None;
        }
        let packet = self.queue.pop()?;
        self.stats.record_received(packet.bytes.len());
        Some(packet.bytes)
    }

    fn next_header(&mut self) -> PacketHeader {
        let header = PacketHeader::new(self.next_sequence);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        header
    }

    /// Decodes the next ready packet. Undecodable, foreign and stale
    /// packets are counted as rejected and skipped.
    fn next_packet(&mut self, now: f64) -> Option<Packet> {
        while let Some(bytes) = self.pop_ready(now) {
            let packet = match Packet::deserialize(&bytes) {
                Ok(packet) => packet,
                Err(err) => {
                    self.stats.record_rejected();
                    log::warn!("dropped packet: {}", err);
                    continue;
                }
            };
            let sequence = packet.header.sequence;
            if let Some(last) = self.last_received {
                if !sequence_greater_than(sequence, last) {
                    self.stats.record_rejected();
                    log::debug!("dropped stale packet {} (last {})", sequence, last);
                    continue;
                }
            }
            self.last_received = Some(sequence);
            return Some(packet);
        }
        None
    }
}

/// In-process connection between the host and one observer. Both
/// directions carry serialized packets and deliver them after a fixed
/// latency, in send order.
#[derive(Debug)]
pub struct LoopbackLink {
    participant: ParticipantId,
    latency: f64,
    to_observer: Channel,
    to_host: Channel,
}

impl LoopbackLink {
    pub fn new(participant: ParticipantId, latency: f64) -> Self {
        Self {
            participant,
            latency: latency.max(0.0),
            to_observer: Channel::default(),
            to_host: Channel::default(),
        }
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn send_diff(&mut self, diff: StateDiff, now: f64) -> Result<(), PacketError> {
        let header = self.to_observer.next_header();
        let bytes = Packet::new(header, PacketType::StateDiff(diff)).serialize()?;
        self.to_observer.push(bytes, now + self.latency);
        Ok(())
    }

    pub fn send_request(&mut self, request: ActionRequest, now: f64) -> Result<(), PacketError> {
        let header = self.to_host.next_header();
        let payload = PacketType::ActionRequest {
            participant: self.participant.0,
            request,
        };
        let bytes = Packet::new(header, payload).serialize()?;
        self.to_host.push(bytes, now + self.latency);
        Ok(())
    }

    /// Diffs that have arrived at the observer by `now`, oldest first.
    pub fn recv_diffs(&mut self, now: f64) -> Vec<StateDiff> {
        let mut diffs = Vec::new();
        while let Some(packet) = self.to_observer.next_packet(now) {
            match packet.payload {
                PacketType::StateDiff(diff) => diffs.push(diff),
                PacketType::ActionRequest { .. } => {
                    self.to_observer.stats.record_rejected();
                    log::warn!("observer received a request packet");
                }
            }
        }
        diffs
    }

    /// Requests that have arrived at the host by `now`, oldest first.
    pub fn recv_requests(&mut self, now: f64) -> Vec<(ParticipantId, ActionRequest)> {
        let mut requests = Vec::new();
        while let Some(packet) = self.to_host.next_packet(now) {
            match packet.payload {
                PacketType::ActionRequest {
                    participant,
                    request,
                } => requests.push((ParticipantId(participant), request)),
                PacketType::StateDiff(_) => {
                    self.to_host.stats.record_rejected();
                    log::warn!("host received a state diff");
                }
            }
        }
        requests
    }

    pub fn downstream_stats(&self) -> &LinkStats {
        &self.to_observer.stats
    }

    pub fn upstream_stats(&self) -> &LinkStats {
        &self.to_host.stats
    }
}
