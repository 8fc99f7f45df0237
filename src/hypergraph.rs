//! The hypergraph store.
//!
//! Vertices and nets share one incidence array: the pin list of every net
//! comes first, followed by the net list of every vertex. Both sides address
//! it through `(begin, len)` spans, so contraction can disable a pin by
//! swapping it behind the active range and shrinking the span, and can move
//! a vertex's net list to the end of the array when it grows. Each
//! contraction returns a [`Memento`]; replaying mementos in reverse order
//! restores the exact pre-contraction state.
//!
//! Partition state (block ids, block weights, per-net pin counts per block
//! and net connectivity) is maintained incrementally by
//! [`Hypergraph::set_block`] and [`Hypergraph::change_block`] and survives
//! contraction and uncontraction, which is what v-cycles rely on.

use bitvec::prelude::*;

use crate::datastructure::FastResetBitset;
use crate::error::{Error, Result};

pub type VertexId = u32;
pub type NetId = u32;
pub type BlockId = u32;
pub type VertexWeight = i64;
pub type NetWeight = i64;
pub type Gain = i64;

pub const INVALID_BLOCK: BlockId = BlockId::MAX;

/// Free vertices carry `FREE` in the fixed-block table.
const FREE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    begin: u32,
    len: u32,
}

impl Span {
    fn range(self) -> std::ops::Range<usize> {
        self.begin as usize..(self.begin + self.len) as usize
    }
}

/// Record of one contraction; applying it in reverse order of creation
/// undoes the contraction exactly.
#[derive(Debug, Clone, Copy)]
pub struct Memento {
    pub u: VertexId,
    pub v: VertexId,
    u_begin: u32,
    u_len: u32,
}

#[derive(Debug, Clone)]
pub struct Hypergraph {
    verts: Vec<Span>,
    nets: Vec<Span>,
    incidence: Vec<u32>,
    enabled: BitVec,
    num_disabled: usize,

    vertex_weight: Vec<VertexWeight>,
    net_weight: Vec<NetWeight>,
    total_weight: VertexWeight,

    k: usize,
    block_of: Vec<BlockId>,
    block_weight: Vec<VertexWeight>,
    /// `m * k` counts, net-major.
    pins_in_block: Vec<i32>,
    /// Number of blocks with at least one pin, per net.
    connectivity: Vec<u32>,

    community: Vec<u32>,
    fixed: Vec<i64>,

    /// Scratch for `uncontract`.
    net_mark: FastResetBitset,
}

impl Hypergraph {
    /// Builds the store from per-vertex weights, per-net weights and pin
    /// lists. Pin ids must be in range and distinct within a net, every net
    /// needs at least one pin and all weights must be positive.
    pub fn new(
        k: usize,
        vertex_weights: Vec<VertexWeight>,
        net_weights: Vec<NetWeight>,
        pin_lists: &[Vec<VertexId>],
    ) -> Result<Self> {
        let n = vertex_weights.len();
        let m = net_weights.len();
        if pin_lists.len() != m {
            return Err(Error::InvalidInput(format!(
                "{} net weights for {} pin lists",
                m,
                pin_lists.len()
            )));
        }
        if let Some(w) = vertex_weights.iter().find(|&&w| w <= 0) {
            return Err(Error::InvalidInput(format!("non-positive vertex weight {}", w)));
        }
        if let Some(w) = net_weights.iter().find(|&&w| w <= 0) {
            return Err(Error::InvalidInput(format!("non-positive net weight {}", w)));
        }

        let num_pins: usize = pin_lists.iter().map(Vec::len).sum();
        let mut incidence = Vec::with_capacity(2 * num_pins);
        let mut nets = Vec::with_capacity(m);
        let mut degree = vec![0u32; n];
        let mut seen = FastResetBitset::new(n);
        for (e, pins) in pin_lists.iter().enumerate() {
            if pins.is_empty() {
                return Err(Error::InvalidInput(format!("net {} has no pins", e)));
            }
            nets.push(Span {
                begin: incidence.len() as u32,
                len: pins.len() as u32,
            });
            for &p in pins {
                if p as usize >= n {
                    return Err(Error::InvalidInput(format!(
                        "net {} references vertex {} but there are only {} vertices",
                        e, p, n
                    )));
                }
                if seen.contains(p as usize) {
                    return Err(Error::InvalidInput(format!(
                        "net {} contains vertex {} twice",
                        e, p
                    )));
                }
                seen.set(p as usize);
                degree[p as usize] += 1;
                incidence.push(p);
            }
            seen.reset();
        }

        // vertex net lists, by counting sort over the pin lists
        let mut verts = Vec::with_capacity(n);
        let mut cursor = incidence.len() as u32;
        for v in 0..n {
            verts.push(Span {
                begin: cursor,
                len: degree[v],
            });
            cursor += degree[v];
        }
        incidence.resize(cursor as usize, 0);
        let mut fill = vec![0u32; n];
        for (e, pins) in pin_lists.iter().enumerate() {
            for &p in pins {
                let at = verts[p as usize].begin + fill[p as usize];
                incidence[at as usize] = e as u32;
                fill[p as usize] += 1;
            }
        }

        let total_weight = vertex_weights.iter().sum();
        Ok(Hypergraph {
            verts,
            nets,
            incidence,
            enabled: bitvec![1; n],
            num_disabled: 0,
            vertex_weight: vertex_weights,
            net_weight: net_weights,
            total_weight,
            k,
            block_of: vec![INVALID_BLOCK; n],
            block_weight: vec![0; k],
            pins_in_block: vec![0; m * k],
            connectivity: vec![0; m],
            community: vec![0; n],
            fixed: vec![FREE; n],
            net_mark: FastResetBitset::new(m),
        })
    }

    /// Unit vertex and net weights.
    pub fn unweighted(k: usize, n: usize, pin_lists: &[Vec<VertexId>]) -> Result<Self> {
        Hypergraph::new(k, vec![1; n], vec![1; pin_lists.len()], pin_lists)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn initial_num_vertices(&self) -> usize {
        self.verts.len()
    }

    pub fn num_active_vertices(&self) -> usize {
        self.verts.len() - self.num_disabled
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    pub fn total_weight(&self) -> VertexWeight {
        self.total_weight
    }

    pub fn is_enabled(&self, v: VertexId) -> bool {
        self.enabled[v as usize]
    }

    pub fn vertex_weight(&self, v: VertexId) -> VertexWeight {
        self.vertex_weight[v as usize]
    }

    pub fn net_weight(&self, e: NetId) -> NetWeight {
        self.net_weight[e as usize]
    }

    /// Number of active pins of `e`.
    pub fn net_size(&self, e: NetId) -> usize {
        self.nets[e as usize].len as usize
    }

    /// Active pins of `e`, each exactly once.
    pub fn pins(&self, e: NetId) -> &[VertexId] {
        &self.incidence[self.nets[e as usize].range()]
    }

    /// Nets in which `v` is an active pin, each exactly once.
    pub fn incident_nets(&self, v: VertexId) -> &[NetId] {
        &self.incidence[self.verts[v as usize].range()]
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.verts[v as usize].len as usize
    }

    pub fn active_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.verts.len() as u32).filter(|&v| self.enabled[v as usize])
    }

    pub fn nets_iter(&self) -> impl Iterator<Item = NetId> {
        0..self.nets.len() as u32
    }

    /// Active neighbours of `v` through all incident nets; a vertex may
    /// appear once per shared net.
    pub fn neighbors<'a>(&'a self, v: VertexId) -> impl Iterator<Item = VertexId> + 'a {
        self.incident_nets(v)
            .iter()
            .flat_map(move |&e| self.pins(e).iter().copied())
            .filter(move |&u| u != v)
    }

    // ------------------------------------------------------------------
    // communities and fixed vertices

    pub fn assign_communities(&mut self, communities: Vec<u32>) {
        debug_assert_eq!(communities.len(), self.verts.len());
        self.community = communities;
    }

    pub fn community(&self, v: VertexId) -> u32 {
        self.community[v as usize]
    }

    pub fn fix_vertex(&mut self, v: VertexId, block: BlockId) {
        debug_assert!((block as usize) < self.k);
        self.fixed[v as usize] = block as i64;
    }

    pub fn is_fixed(&self, v: VertexId) -> bool {
        self.fixed[v as usize] != FREE
    }

    pub fn fixed_block(&self, v: VertexId) -> Option<BlockId> {
        if self.fixed[v as usize] == FREE {
            None
        } else {
            Some(self.fixed[v as usize] as BlockId)
        }
    }

    pub fn num_fixed_vertices(&self) -> usize {
        self.fixed.iter().filter(|&&f| f != FREE).count()
    }

    // ------------------------------------------------------------------
    // partition state

    pub fn block(&self, v: VertexId) -> BlockId {
        self.block_of[v as usize]
    }

    pub fn has_block(&self, v: VertexId) -> bool {
        self.block_of[v as usize] != INVALID_BLOCK
    }

    pub fn block_weight(&self, b: BlockId) -> VertexWeight {
        self.block_weight[b as usize]
    }

    pub fn pins_in_block(&self, e: NetId, b: BlockId) -> i32 {
        self.pins_in_block[e as usize * self.k + b as usize]
    }

    /// Number of distinct blocks containing a pin of `e` (λ).
    pub fn connectivity(&self, e: NetId) -> u32 {
        self.connectivity[e as usize]
    }

    /// Blocks touched by `e`, ascending.
    pub fn connectivity_set(&self, e: NetId) -> impl Iterator<Item = BlockId> + '_ {
        let base = e as usize * self.k;
        (0..self.k as u32).filter(move |&b| self.pins_in_block[base + b as usize] > 0)
    }

    /// Whether `v` touches a net with pins in another block.
    pub fn is_border(&self, v: VertexId) -> bool {
        self.incident_nets(v).iter().any(|&e| self.connectivity[e as usize] > 1)
    }

    /// First-time assignment of `v` to block `b`.
    pub fn set_block(&mut self, v: VertexId, b: BlockId) {
        debug_assert!(self.enabled[v as usize]);
        debug_assert_eq!(self.block_of[v as usize], INVALID_BLOCK);
        debug_assert!((b as usize) < self.k);
        self.block_of[v as usize] = b;
        self.block_weight[b as usize] += self.vertex_weight[v as usize];
        let span = self.verts[v as usize];
        for i in span.range() {
            let e = self.incidence[i] as usize;
            let count = &mut self.pins_in_block[e * self.k + b as usize];
            *count += 1;
            if *count == 1 {
                self.connectivity[e] += 1;
            }
        }
    }

    /// Moves `v` from block `from` to block `to`, updating block weights,
    /// pin counts and connectivity. Panics if `v` is fixed.
    pub fn change_block(&mut self, v: VertexId, from: BlockId, to: BlockId) {
        assert!(
            self.fixed[v as usize] == FREE,
            "attempt to move fixed vertex {} out of its block",
            v
        );
        debug_assert!(self.enabled[v as usize]);
        debug_assert_ne!(from, to);
        debug_assert_eq!(self.block_of[v as usize], from);
        self.block_of[v as usize] = to;
        let w = self.vertex_weight[v as usize];
        self.block_weight[from as usize] -= w;
        self.block_weight[to as usize] += w;
        let span = self.verts[v as usize];
        for i in span.range() {
            let e = self.incidence[i] as usize;
            let from_count = &mut self.pins_in_block[e * self.k + from as usize];
            debug_assert!(*from_count > 0);
            *from_count -= 1;
            if *from_count == 0 {
                self.connectivity[e] -= 1;
            }
            let to_count = &mut self.pins_in_block[e * self.k + to as usize];
            *to_count += 1;
            if *to_count == 1 {
                self.connectivity[e] += 1;
            }
        }
    }

    /// Drops every block assignment. Fixed-vertex declarations survive; the
    /// caller re-applies them before the next assignment round.
    pub fn reset_partition(&mut self) {
        self.block_of.fill(INVALID_BLOCK);
        self.block_weight.fill(0);
        self.pins_in_block.fill(0);
        self.connectivity.fill(0);
    }

    /// Reads the current assignment as a plain vector (disabled vertices
    /// report the block of whatever representative absorbed them only after
    /// uncoarsening; callers use this on fully uncoarsened hypergraphs).
    pub fn partition(&self) -> Vec<BlockId> {
        self.block_of.clone()
    }

    /// Applies a full assignment in one go.
    pub fn apply_partition(&mut self, partition: &[BlockId]) {
        debug_assert_eq!(partition.len(), self.verts.len());
        self.reset_partition();
        for v in 0..self.verts.len() {
            if self.enabled[v] {
                self.set_block(v as VertexId, partition[v]);
            }
        }
    }

    // ------------------------------------------------------------------
    // contraction

    /// Contracts `v` into `u`: `u` absorbs the weight of `v`, takes over
    /// `v`'s pin slot in nets where only `v` was a pin and drops the slot in
    /// nets where both were pins. `v` is deactivated. Partition state stays
    /// consistent; when both vertices are assigned they must share a block.
    pub fn contract(&mut self, u: VertexId, v: VertexId) -> Memento {
        debug_assert_ne!(u, v);
        debug_assert!(self.enabled[u as usize] && self.enabled[v as usize]);
        debug_assert!(
            self.block_of[u as usize] == INVALID_BLOCK
                || self.block_of[u as usize] == self.block_of[v as usize]
        );
        debug_assert!(
            self.fixed[v as usize] == FREE || self.fixed[v as usize] == self.fixed[u as usize]
        );

        let memento = Memento {
            u,
            v,
            u_begin: self.verts[u as usize].begin,
            u_len: self.verts[u as usize].len,
        };
        self.vertex_weight[u as usize] += self.vertex_weight[v as usize];
        let v_block = self.block_of[v as usize];

        let mut relocated = false;
        let v_span = self.verts[v as usize];
        for slot in v_span.range() {
            let e = self.incidence[slot];
            let span = self.nets[e as usize];
            let last = (span.begin + span.len - 1) as usize;
            // swap v's pin to the back of the active range, noting whether
            // u is also a pin of e
            let mut u_is_pin = false;
            for i in span.begin as usize..=last {
                if self.incidence[i] == v {
                    self.incidence.swap(i, last);
                }
                if self.incidence[i] == u {
                    u_is_pin = true;
                }
            }
            if u_is_pin {
                // shared net: drop v's slot
                self.nets[e as usize].len -= 1;
                if v_block != INVALID_BLOCK {
                    let count = &mut self.pins_in_block[e as usize * self.k + v_block as usize];
                    debug_assert!(*count > 1);
                    *count -= 1;
                }
            } else {
                // v-only net: relabel the slot and append e to u's net list,
                // moving that list to the end of the array the first time it
                // grows
                self.incidence[last] = u;
                if !relocated {
                    let u_span = self.verts[u as usize];
                    for i in u_span.range() {
                        let net = self.incidence[i];
                        self.incidence.push(net);
                    }
                    self.verts[u as usize].begin =
                        self.incidence.len() as u32 - self.verts[u as usize].len;
                    relocated = true;
                }
                self.incidence.push(e);
                self.verts[u as usize].len += 1;
            }
        }

        self.enabled.set(v as usize, false);
        self.num_disabled += 1;
        memento
    }

    /// Reverses the matching [`contract`](Hypergraph::contract). Mementos
    /// must be applied in reverse order of creation. The re-enabled vertex
    /// inherits the representative's block.
    pub fn uncontract(&mut self, memento: Memento) {
        let Memento { u, v, u_begin, u_len } = memento;
        debug_assert!(!self.enabled[v as usize]);
        self.enabled.set(v as usize, true);
        self.num_disabled -= 1;

        // nets u acquired from v = nets of v minus u's original net list
        self.net_mark.reset();
        let v_span = self.verts[v as usize];
        for i in v_span.range() {
            let e = self.incidence[i];
            self.net_mark.set(e as usize);
        }
        for i in u_begin..u_begin + u_len {
            let e = self.incidence[i as usize];
            self.net_mark.unset(e as usize);
        }

        if self.verts[u as usize].len > u_len {
            // relabel u back to v in the acquired nets
            let u_span = self.verts[u as usize];
            for i in u_span.range() {
                let e = self.incidence[i];
                if self.net_mark.contains(e as usize) {
                    let span = self.nets[e as usize];
                    for p in span.range() {
                        if self.incidence[p] == u {
                            self.incidence[p] = v;
                            break;
                        }
                    }
                }
            }
        }

        self.verts[u as usize] = Span {
            begin: u_begin,
            len: u_len,
        };
        self.vertex_weight[u as usize] -= self.vertex_weight[v as usize];

        let block = self.block_of[u as usize];
        if block != INVALID_BLOCK {
            self.block_of[v as usize] = block;
        }
        // shared nets: re-expose v's slot parked right behind the active range
        let v_span = self.verts[v as usize];
        for i in v_span.range() {
            let e = self.incidence[i];
            if !self.net_mark.contains(e as usize) {
                debug_assert_eq!(
                    self.incidence[(self.nets[e as usize].begin + self.nets[e as usize].len) as usize],
                    v
                );
                self.nets[e as usize].len += 1;
                if block != INVALID_BLOCK {
                    self.pins_in_block[e as usize * self.k + block as usize] += 1;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // sub-hypergraph extraction (recursive bisection)

    /// Extracts the active vertices of block `b` into a fresh hypergraph
    /// with `new_k` blocks. Nets keep only their pins inside the block and
    /// are dropped if fewer than two remain. Returns the new hypergraph and
    /// the map from new vertex ids to ids in `self`.
    pub fn extract_block(&self, b: BlockId, new_k: usize) -> Result<(Hypergraph, Vec<VertexId>)> {
        let mut to_old = Vec::new();
        let mut to_new = vec![u32::MAX; self.verts.len()];
        for v in self.active_vertices() {
            if self.block_of[v as usize] == b {
                to_new[v as usize] = to_old.len() as u32;
                to_old.push(v);
            }
        }

        let mut pin_lists = Vec::new();
        let mut net_weights = Vec::new();
        for e in self.nets_iter() {
            let pins: Vec<VertexId> = self
                .pins(e)
                .iter()
                .filter(|&&p| to_new[p as usize] != u32::MAX)
                .map(|&p| to_new[p as usize])
                .collect();
            if pins.len() >= 2 {
                pin_lists.push(pins);
                net_weights.push(self.net_weight[e as usize]);
            }
        }

        let vertex_weights = to_old.iter().map(|&v| self.vertex_weight[v as usize]).collect();
        let mut sub = Hypergraph::new(new_k, vertex_weights, net_weights, &pin_lists)?;
        for (new, &old) in to_old.iter().enumerate() {
            sub.community[new] = self.community[old as usize];
        }
        Ok((sub, to_old))
    }

    // ------------------------------------------------------------------
    // verification helpers, used by debug assertions and tests

    /// Recomputes `pins_in_block(e, b)` from scratch and compares.
    pub fn check_pin_counts(&self) -> bool {
        for e in self.nets_iter() {
            let mut fresh = vec![0i32; self.k];
            for &p in self.pins(e) {
                if self.block_of[p as usize] != INVALID_BLOCK {
                    fresh[self.block_of[p as usize] as usize] += 1;
                }
            }
            for b in 0..self.k {
                if fresh[b] != self.pins_in_block(e, b as BlockId) {
                    return false;
                }
            }
            let lambda = fresh.iter().filter(|&&c| c > 0).count() as u32;
            if lambda != self.connectivity[e as usize] {
                return false;
            }
        }
        true
    }

    /// Recomputes block weights from scratch and compares; also checks that
    /// they sum to the total weight once every active vertex is assigned.
    pub fn check_block_weights(&self) -> bool {
        let mut fresh = vec![0; self.k];
        let mut all_assigned = true;
        for v in self.active_vertices() {
            match self.block_of[v as usize] {
                INVALID_BLOCK => all_assigned = false,
                b => fresh[b as usize] += self.vertex_weight[v as usize],
            }
        }
        if fresh != self.block_weight {
            return false;
        }
        !all_assigned || fresh.iter().sum::<VertexWeight>() == self.total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two nets {0,1,2,3} and {1,4,5}, six unit vertices.
    fn two_net_hypergraph(k: usize) -> Hypergraph {
        Hypergraph::unweighted(k, 6, &[vec![0, 1, 2, 3], vec![1, 4, 5]]).unwrap()
    }

    #[test]
    fn construction_builds_both_incidence_sides() {
        let hg = two_net_hypergraph(2);
        assert_eq!(hg.pins(0), &[0, 1, 2, 3]);
        assert_eq!(hg.pins(1), &[1, 4, 5]);
        assert_eq!(hg.incident_nets(0), &[0]);
        assert_eq!(hg.incident_nets(1), &[0, 1]);
        assert_eq!(hg.incident_nets(4), &[1]);
        assert_eq!(hg.total_weight(), 6);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Hypergraph::unweighted(2, 3, &[vec![0, 3]]).is_err());
        assert!(Hypergraph::unweighted(2, 3, &[vec![]]).is_err());
        assert!(Hypergraph::unweighted(2, 3, &[vec![1, 1]]).is_err());
        assert!(Hypergraph::new(2, vec![1, 0], vec![1], &[vec![0, 1]]).is_err());
    }

    #[test]
    fn contract_merges_and_uncontract_restores() {
        let original = two_net_hypergraph(2);
        let mut hg = original.clone();

        let m1 = hg.contract(0, 1);
        // 1 was a pin of both nets: net 0 shrinks, net 1 relabels to 0
        assert_eq!(hg.net_size(0), 3);
        assert_eq!(hg.net_size(1), 3);
        assert!(hg.pins(1).contains(&0));
        assert_eq!(hg.vertex_weight(0), 2);
        assert!(!hg.is_enabled(1));
        assert_eq!(hg.num_active_vertices(), 5);
        assert_eq!(hg.incident_nets(0), &[0, 1]);

        let m2 = hg.contract(0, 2);
        assert_eq!(hg.net_size(0), 2);
        assert_eq!(hg.vertex_weight(0), 3);

        hg.uncontract(m2);
        hg.uncontract(m1);
        assert_eq!(hg.vertex_weight(0), 1);
        assert_eq!(hg.num_active_vertices(), 6);
        assert_eq!(hg.net_size(0), 4);
        assert_eq!(hg.net_size(1), 3);
        // pin sets are restored (order inside a net may differ)
        let mut pins0 = hg.pins(0).to_vec();
        pins0.sort_unstable();
        assert_eq!(pins0, vec![0, 1, 2, 3]);
        let mut pins1 = hg.pins(1).to_vec();
        pins1.sort_unstable();
        assert_eq!(pins1, vec![1, 4, 5]);
        assert_eq!(hg.incident_nets(0), &[0]);
        let mut nets1 = hg.incident_nets(1).to_vec();
        nets1.sort_unstable();
        assert_eq!(nets1, vec![0, 1]);
    }

    #[test]
    fn deep_contraction_chain_restores_exactly() {
        let pins = vec![vec![0, 2], vec![0, 1, 3, 4], vec![3, 4, 6], vec![2, 5, 6]];
        let original = Hypergraph::unweighted(2, 7, &pins).unwrap();
        let mut hg = original.clone();
        let mut mementos = Vec::new();
        mementos.push(hg.contract(0, 2));
        mementos.push(hg.contract(3, 4));
        mementos.push(hg.contract(0, 1));
        mementos.push(hg.contract(5, 6));
        mementos.push(hg.contract(0, 3));
        assert_eq!(hg.num_active_vertices(), 2);
        for m in mementos.into_iter().rev() {
            hg.uncontract(m);
        }
        for v in 0..7 {
            assert!(hg.is_enabled(v));
            assert_eq!(hg.vertex_weight(v), 1);
        }
        for e in 0..4u32 {
            let mut pins_now = hg.pins(e).to_vec();
            pins_now.sort_unstable();
            assert_eq!(pins_now, pins[e as usize]);
        }
    }

    #[test]
    fn pin_counts_follow_moves() {
        let mut hg = two_net_hypergraph(2);
        for v in [0u32, 1, 2] {
            hg.set_block(v, 0);
        }
        for v in [3u32, 4, 5] {
            hg.set_block(v, 1);
        }
        assert_eq!(hg.pins_in_block(0, 0), 3);
        assert_eq!(hg.pins_in_block(0, 1), 1);
        assert_eq!(hg.connectivity(0), 2);
        assert_eq!(hg.block_weight(0), 3);

        hg.change_block(3, 1, 0);
        assert_eq!(hg.pins_in_block(0, 0), 4);
        assert_eq!(hg.pins_in_block(0, 1), 0);
        assert_eq!(hg.connectivity(0), 1);
        assert_eq!(hg.block_weight(0), 4);
        assert_eq!(hg.block_weight(1), 2);
        assert!(hg.check_pin_counts());
        assert!(hg.check_block_weights());
    }

    #[test]
    fn pin_count_total_matches_net_size() {
        let mut hg = two_net_hypergraph(3);
        let blocks = [0u32, 1, 2, 0, 1, 2];
        for (v, &b) in blocks.iter().enumerate() {
            hg.set_block(v as VertexId, b);
        }
        for e in hg.nets_iter() {
            let total: i32 = (0..3).map(|b| hg.pins_in_block(e, b)).sum();
            assert_eq!(total as usize, hg.net_size(e));
        }
    }

    #[test]
    fn contract_and_uncontract_preserve_partition_state() {
        let mut hg = two_net_hypergraph(2);
        for v in [0u32, 1, 2] {
            hg.set_block(v, 0);
        }
        for v in [3u32, 4, 5] {
            hg.set_block(v, 1);
        }
        let m = hg.contract(0, 1);
        assert!(hg.check_pin_counts());
        assert!(hg.check_block_weights());
        assert_eq!(hg.pins_in_block(0, 0), 2);

        hg.uncontract(m);
        assert!(hg.check_pin_counts());
        assert!(hg.check_block_weights());
        assert_eq!(hg.pins_in_block(0, 0), 3);
        assert_eq!(hg.block(1), 0);
    }

    #[test]
    #[should_panic(expected = "fixed vertex")]
    fn moving_a_fixed_vertex_panics() {
        let mut hg = two_net_hypergraph(2);
        hg.fix_vertex(0, 0);
        for v in 0..6 {
            hg.set_block(v, if v < 3 { 0 } else { 1 });
        }
        hg.change_block(0, 0, 1);
    }

    #[test]
    fn border_vertices_touch_cut_nets() {
        let mut hg = two_net_hypergraph(2);
        for v in [0u32, 1, 2, 3] {
            hg.set_block(v, 0);
        }
        for v in [4u32, 5] {
            hg.set_block(v, 1);
        }
        // net 0 is internal, net 1 = {1,4,5} is cut
        assert!(hg.is_border(1));
        assert!(hg.is_border(4));
        assert!(!hg.is_border(0));
        assert!(!hg.is_border(2));
    }

    #[test]
    fn extract_block_keeps_internal_nets() {
        let mut hg = two_net_hypergraph(2);
        for v in [0u32, 1, 2, 3] {
            hg.set_block(v, 0);
        }
        for v in [4u32, 5] {
            hg.set_block(v, 1);
        }
        let (sub, to_old) = hg.extract_block(0, 2).unwrap();
        assert_eq!(sub.initial_num_vertices(), 4);
        assert_eq!(to_old, vec![0, 1, 2, 3]);
        // net 0 survives whole; net 1 keeps only pin 1 and is dropped
        assert_eq!(sub.num_nets(), 1);
        assert_eq!(sub.net_size(0), 4);
    }
}
