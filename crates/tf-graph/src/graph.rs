//! Network graph: aggregate root, staged construction, and flow derivations.
//!
//! # Construction order
//!
//! Later stages depend on derived sets from earlier ones, so [`GraphBuilder`]
//! enforces a strict order:
//!
//! ```text
//! nodes → links → O-D demand → phases (+ signal nodes, green split)
//!       → paths (+ exogenous entry demand) → build (turn proportions)
//! ```
//!
//! Calling a stage before its prerequisite fails with
//! [`GraphError::NotYetLoaded`] rather than producing a partially built
//! graph.  [`Graph::from_records`] drives the stages in order.
//!
//! # Concurrency
//!
//! The whole model is single-threaded and batch: nodes, links, and moves are
//! shared via `Rc`, and move accumulators are `Cell`s.  Derived views are
//! materialized at most once per graph (`OnceCell`).  Recomputing turn
//! proportions takes `&mut self`, so the borrow checker serializes it against
//! reads.

use std::cell::OnceCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use tf_core::{LinkId, NodeId, PathId, Point3};

use crate::error::{GraphError, GraphResult};
use crate::link::{Link, LinkKind};
use crate::loader::{LinkRecord, NetworkRecords, NodeRecord, OdRecord, PathRecord, PhaseRecord};
use crate::movement::Move;
use crate::node::{Node, NodeKind};
use crate::path::Path;
use crate::phase::Phase;

/// O-D pair key: (origin zone, destination zone).
pub type OdPair = (NodeId, NodeId);

/// Movement key: (inbound link, outbound link).
pub type MoveKey = (LinkId, LinkId);

// ── Search budget ─────────────────────────────────────────────────────────────

/// Optional caps for [`Graph::all_paths_bounded`].
///
/// The enumeration is exhaustive by design and exponential in path count on
/// dense networks; these caps let callers bound it defensively.  The default
/// is unbounded.
#[derive(Copy, Clone, Debug, Default)]
pub struct SearchBudget {
    /// Maximum number of links per candidate path.  Candidates at the cap are
    /// no longer extended.
    pub max_depth: Option<usize>,
    /// Stop after this many complete paths have been found.
    pub max_paths: Option<usize>,
}

impl SearchBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_paths(mut self, paths: usize) -> Self {
        self.max_paths = Some(paths);
        self
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

/// A signalized road network with derived flow quantities.
///
/// Read-only after construction except for
/// [`derive_turn_proportions`](Graph::derive_turn_proportions), which rebuilds
/// the move accumulators and the proportion table under a new demand scaler.
pub struct Graph {
    name: String,

    nodes: FxHashMap<NodeId, Rc<Node>>,
    zones: FxHashMap<NodeId, Rc<Node>>,

    links:               FxHashMap<LinkId, Rc<Link>>,
    centroid_connectors: FxHashMap<LinkId, Rc<Link>>,
    entry_links:         FxHashMap<LinkId, Rc<Link>>,
    exit_links:          FxHashMap<LinkId, Rc<Link>>,
    internal_links:      FxHashMap<LinkId, Rc<Link>>,

    origins:      FxHashMap<NodeId, Rc<Node>>,
    destinations: FxHashMap<NodeId, Rc<Node>>,

    /// Forward adjacency: links whose tail is the keyed node.
    out_links: FxHashMap<NodeId, Vec<Rc<Link>>>,
    /// Reverse adjacency: links whose head is the keyed node.
    in_links: FxHashMap<NodeId, Vec<Rc<Link>>>,

    demand: FxHashMap<OdPair, f64>,

    /// Per node, phases keyed by sequence number.  BTreeMap keeps phase
    /// iteration deterministic, which makes "first occurrence wins" in move
    /// deduplication reproducible.
    phases: FxHashMap<NodeId, BTreeMap<u32, Phase>>,
    /// Interned movements: exactly one instance per (in, out) pair, shared by
    /// every phase that references the pair.
    moves: FxHashMap<MoveKey, Rc<Move>>,
    signal_nodes: FxHashMap<NodeId, Rc<Node>>,

    paths:            FxHashMap<OdPair, Vec<Rc<Path>>>,
    exogenous_demand: FxHashMap<LinkId, f64>,
    turn_proportions: FxHashMap<MoveKey, f64>,

    // Lazily materialized views, computed at most once.
    link_by_endpoints: OnceCell<FxHashMap<(NodeId, NodeId), Rc<Link>>>,
    all_moves: OnceCell<Vec<Rc<Move>>>,
}

impl Graph {
    /// Build a graph from pre-parsed records, running every construction
    /// stage in order and deriving turn proportions with a demand scaler
    /// of 1.
    pub fn from_records(records: NetworkRecords, name: impl Into<String>) -> GraphResult<Graph> {
        GraphBuilder::new(name)
            .load_nodes(records.nodes)?
            .load_links(records.links)?
            .load_demand(records.od)?
            .load_phases(records.phases)?
            .load_paths(records.paths)?
            .build()
    }

    // ── Entity lookup ─────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, id: NodeId) -> GraphResult<&Rc<Node>> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn link(&self, id: LinkId) -> GraphResult<&Rc<Link>> {
        self.links.get(&id).ok_or(GraphError::LinkNotFound(id))
    }

    /// The link from `tail` to `head`, if one exists.
    ///
    /// The endpoint index is materialized on first call and cached.
    pub fn link_between(&self, tail: NodeId, head: NodeId) -> GraphResult<&Rc<Link>> {
        let index = self.link_by_endpoints.get_or_init(|| {
            self.links
                .values()
                .map(|l| ((l.tail.id, l.head.id), Rc::clone(l)))
                .collect()
        });
        index
            .get(&(tail, head))
            .ok_or(GraphError::NoLinkBetween { tail, head })
    }

    // ── Collections ───────────────────────────────────────────────────────

    pub fn nodes(&self) -> &FxHashMap<NodeId, Rc<Node>> {
        &self.nodes
    }

    pub fn zones(&self) -> &FxHashMap<NodeId, Rc<Node>> {
        &self.zones
    }

    pub fn links(&self) -> &FxHashMap<LinkId, Rc<Link>> {
        &self.links
    }

    pub fn centroid_connectors(&self) -> &FxHashMap<LinkId, Rc<Link>> {
        &self.centroid_connectors
    }

    /// Links whose tail is a zone: flow enters the network here.
    pub fn entry_links(&self) -> &FxHashMap<LinkId, Rc<Link>> {
        &self.entry_links
    }

    /// Links whose head is a zone: flow leaves the network here.
    pub fn exit_links(&self) -> &FxHashMap<LinkId, Rc<Link>> {
        &self.exit_links
    }

    /// Links fully inside the physical network (neither entry nor exit).
    pub fn internal_links(&self) -> &FxHashMap<LinkId, Rc<Link>> {
        &self.internal_links
    }

    pub fn origins(&self) -> &FxHashMap<NodeId, Rc<Node>> {
        &self.origins
    }

    pub fn destinations(&self) -> &FxHashMap<NodeId, Rc<Node>> {
        &self.destinations
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    // ── Demand and paths ──────────────────────────────────────────────────

    /// O-D demand in flow/hour, additively merged per (origin, destination).
    pub fn demand(&self) -> &FxHashMap<OdPair, f64> {
        &self.demand
    }

    /// All (origin, destination) pairs with a demand record.
    pub fn od_pairs(&self) -> impl Iterator<Item = OdPair> + '_ {
        self.demand.keys().copied()
    }

    pub fn paths(&self) -> &FxHashMap<OdPair, Vec<Rc<Path>>> {
        &self.paths
    }

    /// Assigned paths for one O-D pair (empty if none).
    pub fn paths_between(&self, origin: NodeId, destination: NodeId) -> &[Rc<Path>] {
        self.paths
            .get(&(origin, destination))
            .map_or(&[], Vec::as_slice)
    }

    /// Absolute flow injected at each entry link, derived from O-D demand and
    /// path assignment.
    pub fn exogenous_demand(&self) -> &FxHashMap<LinkId, f64> {
        &self.exogenous_demand
    }

    // ── Signals and movements ─────────────────────────────────────────────

    /// Nodes under real signal control (some phase has nonzero red AND
    /// nonzero yellow).
    pub fn signal_nodes(&self) -> &FxHashMap<NodeId, Rc<Node>> {
        &self.signal_nodes
    }

    pub fn is_signal_node(&self, node: NodeId) -> bool {
        self.signal_nodes.contains_key(&node)
    }

    /// Phases at `node` in sequence order (empty for unphased nodes).
    pub fn phases_at(&self, node: NodeId) -> impl Iterator<Item = &Phase> {
        self.phases.get(&node).into_iter().flat_map(|m| m.values())
    }

    /// Movements allowed at `node`: the union of its phases' move sets in
    /// sequence order, each movement yielded once (first occurrence wins).
    pub fn allowed_moves(&self, node: NodeId) -> Vec<Rc<Move>> {
        let mut seen: FxHashSet<MoveKey> = FxHashSet::default();
        let mut out = Vec::new();
        for phase in self.phases_at(node) {
            for mv in &phase.moves {
                if seen.insert((mv.in_link.id, mv.out_link.id)) {
                    out.push(Rc::clone(mv));
                }
            }
        }
        out
    }

    /// The interned movement for (in, out), if any phase references it.
    pub fn move_at(&self, in_link: LinkId, out_link: LinkId) -> Option<&Rc<Move>> {
        self.moves.get(&(in_link, out_link))
    }

    /// All movements allowed at any signal node, in ascending node order.
    ///
    /// Materialized on first call and cached.
    pub fn all_moves(&self) -> &[Rc<Move>] {
        self.all_moves.get_or_init(|| {
            let mut ids: Vec<NodeId> = self.signal_nodes.keys().copied().collect();
            ids.sort_unstable();
            ids.iter().flat_map(|n| self.allowed_moves(*n)).collect()
        })
    }

    /// Turn proportion for each signal-node movement, keyed by
    /// (in link, out link).
    pub fn turn_proportions(&self) -> &FxHashMap<MoveKey, f64> {
        &self.turn_proportions
    }

    pub fn turn_proportion(&self, in_link: LinkId, out_link: LinkId) -> Option<f64> {
        self.turn_proportions.get(&(in_link, out_link)).copied()
    }

    // ── Adjacency queries ─────────────────────────────────────────────────

    /// Links whose tail is `node`.
    ///
    /// Zone centroids return nothing unless `force` is set: a centroid
    /// connector has a single terminal meaning and is not traversed through
    /// its zone end.
    pub fn forward_star(&self, node: NodeId, force: bool) -> &[Rc<Link>] {
        if !force && self.zones.contains_key(&node) {
            return &[];
        }
        self.out_links.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Links whose head is `node`.  Same centroid gating as
    /// [`forward_star`](Graph::forward_star).
    pub fn reverse_star(&self, node: NodeId, force: bool) -> &[Rc<Link>] {
        if !force && self.zones.contains_key(&node) {
            return &[];
        }
        self.in_links.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Links leaving `link`'s head.
    pub fn outgoing_links(&self, link: &Link) -> &[Rc<Link>] {
        self.forward_star(link.head.id, false)
    }

    /// Links arriving at `link`'s tail.
    pub fn incoming_links(&self, link: &Link) -> &[Rc<Link>] {
        self.reverse_star(link.tail.id, false)
    }

    // ── All-paths enumeration ─────────────────────────────────────────────

    /// Every loop-free link sequence from `source` to `destination`,
    /// breadth-first and unbounded.
    ///
    /// Centroid connectors may appear only as the first (or only) hop, a
    /// candidate never revisits a head node, and immediate U-turns (the
    /// reversal of the previous link) are rejected.  This is an enumeration,
    /// not a shortest-path search; use [`all_paths_bounded`](Self::all_paths_bounded)
    /// on dense networks.
    pub fn all_paths(&self, source: &Rc<Link>, destination: &Rc<Link>) -> Vec<Vec<Rc<Link>>> {
        self.all_paths_bounded(source, destination, SearchBudget::unbounded())
    }

    /// [`all_paths`](Self::all_paths) with a traversal budget.
    pub fn all_paths_bounded(
        &self,
        source: &Rc<Link>,
        destination: &Rc<Link>,
        budget: SearchBudget,
    ) -> Vec<Vec<Rc<Link>>> {
        let mut found: Vec<Vec<Rc<Link>>> = Vec::new();
        let mut queue: VecDeque<Vec<Rc<Link>>> = VecDeque::new();
        queue.push_back(vec![Rc::clone(source)]);

        while let Some(current) = queue.pop_front() {
            let last = Rc::clone(&current[current.len() - 1]);

            if last.as_ref() == destination.as_ref() {
                found.push(current);
                if budget.max_paths.is_some_and(|m| found.len() >= m) {
                    break;
                }
                continue;
            }
            // Connectors are boundary entry/exit, never through-travel.
            if last.is_connector() && current.len() > 1 {
                continue;
            }
            if budget.max_depth.is_some_and(|d| current.len() >= d) {
                continue;
            }

            let visited: FxHashSet<NodeId> = current.iter().map(|l| l.head.id).collect();
            for next in self.outgoing_links(&last) {
                if next.is_reverse_of(&last) || visited.contains(&next.head.id) {
                    continue;
                }
                let mut extended = current.clone();
                extended.push(Rc::clone(next));
                queue.push_back(extended);
            }
        }

        found
    }

    // ── Turn-proportion derivation ────────────────────────────────────────

    /// Derive the turn proportion of every movement at every signal node from
    /// the assigned path flows, under `demand_scaler`.
    ///
    /// For each movement, every path traversing its in-link contributes
    /// `flow × demand_scaler` to the denominator, and additionally to the
    /// numerator when the path continues onto the out-link.  The proportion
    /// is numerator/denominator (0 when no flow arrives).
    ///
    /// Rerunnable: accumulators are zeroed first, so two calls with the same
    /// scaler produce identical results, and the proportions themselves are
    /// scaler-invariant (both accumulators scale equally).
    ///
    /// # Panics
    ///
    /// If a movement ends up with numerator > denominator.  That breaks flow
    /// conservation and indicates a bug in the upstream path assignment, not
    /// a recoverable condition.
    pub fn derive_turn_proportions(&mut self, demand_scaler: f64) -> &FxHashMap<MoveKey, f64> {
        for mv in self.moves.values() {
            mv.reset_accumulators();
        }

        let all_paths: Vec<Rc<Path>> = self.paths.values().flatten().cloned().collect();
        let mut proportions: FxHashMap<MoveKey, f64> = FxHashMap::default();

        let mut signal_ids: Vec<NodeId> = self.signal_nodes.keys().copied().collect();
        signal_ids.sort_unstable();

        for node in signal_ids {
            for mv in self.allowed_moves(node) {
                for path in &all_paths {
                    let Some(i) = path.position_of(&mv.in_link) else {
                        continue;
                    };
                    mv.add_denominator(path.flow() * demand_scaler);
                    if path.get(i + 1).is_some_and(|next| next.as_ref() == mv.out_link.as_ref()) {
                        mv.add_numerator(path.flow() * demand_scaler);
                    }
                }

                assert!(
                    mv.numerator() <= mv.denominator(),
                    "flow conservation violated at {mv}: numerator {} > denominator {}",
                    mv.numerator(),
                    mv.denominator(),
                );

                let proportion = if mv.denominator() > 0.0 {
                    mv.numerator() / mv.denominator()
                } else {
                    0.0
                };
                proportions.insert((mv.in_link.id, mv.out_link.id), proportion);
            }
        }

        self.turn_proportions = proportions;
        &self.turn_proportions
    }
}

impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Graph of {}>", self.name)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("signal_nodes", &self.signal_nodes.len())
            .finish_non_exhaustive()
    }
}

// ── GraphBuilder ──────────────────────────────────────────────────────────────

/// Staged, order-enforcing constructor for [`Graph`].
///
/// Each stage consumes the builder and returns it on success, so the happy
/// path chains with `?`.  Stages called out of order fail with
/// [`GraphError::NotYetLoaded`].  See the module docs for the stage order.
pub struct GraphBuilder {
    name: String,

    nodes: Option<FxHashMap<NodeId, Rc<Node>>>,
    zones: FxHashMap<NodeId, Rc<Node>>,

    links:               Option<FxHashMap<LinkId, Rc<Link>>>,
    centroid_connectors: FxHashMap<LinkId, Rc<Link>>,
    entry_links:         FxHashMap<LinkId, Rc<Link>>,
    exit_links:          FxHashMap<LinkId, Rc<Link>>,
    internal_links:      FxHashMap<LinkId, Rc<Link>>,
    origins:             FxHashMap<NodeId, Rc<Node>>,
    destinations:        FxHashMap<NodeId, Rc<Node>>,
    out_links:           FxHashMap<NodeId, Vec<Rc<Link>>>,
    in_links:            FxHashMap<NodeId, Vec<Rc<Link>>>,

    demand: Option<FxHashMap<OdPair, f64>>,

    phases:       Option<FxHashMap<NodeId, BTreeMap<u32, Phase>>>,
    moves:        FxHashMap<MoveKey, Rc<Move>>,
    signal_nodes: FxHashMap<NodeId, Rc<Node>>,

    paths:            Option<FxHashMap<OdPair, Vec<Rc<Path>>>>,
    exogenous_demand: FxHashMap<LinkId, f64>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: None,
            zones: FxHashMap::default(),
            links: None,
            centroid_connectors: FxHashMap::default(),
            entry_links: FxHashMap::default(),
            exit_links: FxHashMap::default(),
            internal_links: FxHashMap::default(),
            origins: FxHashMap::default(),
            destinations: FxHashMap::default(),
            out_links: FxHashMap::default(),
            in_links: FxHashMap::default(),
            demand: None,
            phases: None,
            moves: FxHashMap::default(),
            signal_nodes: FxHashMap::default(),
            paths: None,
            exogenous_demand: FxHashMap::default(),
        }
    }

    fn require<'a, T>(
        slot: &'a Option<T>,
        stage: &'static str,
        requires: &'static str,
    ) -> GraphResult<&'a T> {
        slot.as_ref()
            .ok_or(GraphError::NotYetLoaded { stage, requires })
    }

    /// Stage 1: nodes and the derived zone set.
    pub fn load_nodes(mut self, records: Vec<NodeRecord>) -> GraphResult<Self> {
        let mut nodes: FxHashMap<NodeId, Rc<Node>> = FxHashMap::default();
        for rec in records {
            let id = NodeId(rec.id);
            let node = Rc::new(Node::new(
                id,
                NodeKind::from_code(rec.kind),
                Point3::new(rec.x, rec.y, rec.z),
            ));
            if node.is_zone() {
                self.zones.insert(id, Rc::clone(&node));
            }
            nodes.insert(id, node);
        }
        self.nodes = Some(nodes);
        Ok(self)
    }

    /// Stage 2: links, the entry/exit/internal partition, origin/destination
    /// sets, and the adjacency indices.
    pub fn load_links(mut self, records: Vec<LinkRecord>) -> GraphResult<Self> {
        let nodes = Self::require(&self.nodes, "links", "nodes")?;

        let mut links: FxHashMap<LinkId, Rc<Link>> = FxHashMap::default();
        for rec in records {
            // Endpoint ids are resolved preferentially against the zone set,
            // falling back to ordinary nodes.
            let resolve = |id: u32| -> GraphResult<Rc<Node>> {
                let id = NodeId(id);
                self.zones
                    .get(&id)
                    .or_else(|| nodes.get(&id))
                    .cloned()
                    .ok_or(GraphError::NodeNotFound(id))
            };
            let id = LinkId(rec.id);
            let link = Rc::new(Link::new(
                id,
                LinkKind::from_code(rec.kind),
                resolve(rec.tail)?,
                resolve(rec.head)?,
                rec.length_ft,
                rec.ffspd_mph,
                rec.wave_mph,
                rec.capacity,
                rec.lanes,
            ));

            if link.is_connector() {
                self.centroid_connectors.insert(id, Rc::clone(&link));
            }
            self.out_links
                .entry(link.tail.id)
                .or_default()
                .push(Rc::clone(&link));
            self.in_links
                .entry(link.head.id)
                .or_default()
                .push(Rc::clone(&link));
            links.insert(id, link);
        }

        // Partition: entry (tail is a zone), exit (head is a zone), internal
        // (the rest).  A zone-to-zone connector is both entry and exit.
        for (id, link) in &links {
            let entry = link.tail.is_zone();
            let exit = link.head.is_zone();
            if entry {
                self.entry_links.insert(*id, Rc::clone(link));
                self.origins.insert(link.tail.id, Rc::clone(&link.tail));
            }
            if exit {
                self.exit_links.insert(*id, Rc::clone(link));
                self.destinations.insert(link.head.id, Rc::clone(&link.head));
            }
            if !entry && !exit {
                self.internal_links.insert(*id, Rc::clone(link));
            }
        }

        self.links = Some(links);
        Ok(self)
    }

    /// Stage 3: O-D demand, additively merged per zone pair.
    pub fn load_demand(mut self, records: Vec<OdRecord>) -> GraphResult<Self> {
        Self::require(&self.links, "demand", "links")?;

        let mut demand: FxHashMap<OdPair, f64> = FxHashMap::default();
        for rec in records {
            let r = NodeId(rec.origin);
            let s = NodeId(rec.destination);
            for zone in [r, s] {
                if !self.zones.contains_key(&zone) {
                    return Err(GraphError::ZoneNotFound(zone));
                }
            }
            *demand.entry((r, s)).or_insert(0.0) += rec.demand;
        }
        self.demand = Some(demand);
        Ok(self)
    }

    /// Stage 4: phases (with movement interning), signal-node classification,
    /// and the default green-time split.
    pub fn load_phases(mut self, records: Vec<PhaseRecord>) -> GraphResult<Self> {
        Self::require(&self.demand, "phases", "demand")?;

        let mut phases: FxHashMap<NodeId, BTreeMap<u32, Phase>> = FxHashMap::default();
        for rec in records {
            if rec.in_links.len() != rec.out_links.len()
                || rec.in_links.len() != rec.num_moves
            {
                return Err(GraphError::Parse(format!(
                    "phase {} at node {} declares {} moves but lists {} in / {} out links",
                    rec.seq,
                    rec.node,
                    rec.num_moves,
                    rec.in_links.len(),
                    rec.out_links.len(),
                )));
            }

            let mut moves: Vec<Rc<Move>> = Vec::with_capacity(rec.num_moves);
            let mut seen: FxHashSet<MoveKey> = FxHashSet::default();
            for (&i, &j) in rec.in_links.iter().zip(&rec.out_links) {
                let mv = self.intern_move(LinkId(i), LinkId(j))?;
                if seen.insert((mv.in_link.id, mv.out_link.id)) {
                    moves.push(mv);
                }
            }

            let node = NodeId(rec.node);
            phases.entry(node).or_default().insert(
                rec.seq,
                Phase {
                    node,
                    kind: rec.kind,
                    seq: rec.seq,
                    red: rec.red,
                    yellow: rec.yellow,
                    green: rec.green,
                    moves,
                },
            );
        }
        self.phases = Some(phases);

        self.classify_signal_nodes()?;
        self.apply_default_green_split()?;
        Ok(self)
    }

    /// Look up or create the single shared movement for (in, out).
    fn intern_move(&mut self, in_link: LinkId, out_link: LinkId) -> GraphResult<Rc<Move>> {
        if let Some(mv) = self.moves.get(&(in_link, out_link)) {
            return Ok(Rc::clone(mv));
        }
        let links = Self::require(&self.links, "phases", "links")?;
        let i = links
            .get(&in_link)
            .ok_or(GraphError::LinkNotFound(in_link))?;
        let j = links
            .get(&out_link)
            .ok_or(GraphError::LinkNotFound(out_link))?;
        let mv = Rc::new(Move::new(Rc::clone(i), Rc::clone(j))?);
        self.moves.insert((in_link, out_link), Rc::clone(&mv));
        Ok(mv)
    }

    /// A node is a signal node iff any of its phases has nonzero red AND
    /// nonzero yellow.
    fn classify_signal_nodes(&mut self) -> GraphResult<()> {
        let phases =
            Self::require(&self.phases, "signal-node classification", "phases")?;
        let nodes =
            Self::require(&self.nodes, "signal-node classification", "nodes")?;

        for (&node_id, node_phases) in phases {
            if node_phases.values().any(Phase::is_signalized) {
                let node = nodes
                    .get(&node_id)
                    .ok_or(GraphError::NodeNotFound(node_id))?;
                self.signal_nodes.insert(node_id, Rc::clone(node));
            }
        }
        Ok(())
    }

    /// Assign each movement its default green fraction: the sum over phases
    /// containing it of `green / cycle_length`, for every phased node (not
    /// only signal nodes).
    fn apply_default_green_split(&mut self) -> GraphResult<()> {
        let phases = Self::require(&self.phases, "default green split", "phases")?;

        for (&node_id, node_phases) in phases {
            let cycle: u32 = node_phases.values().map(Phase::total_time).sum();
            if cycle == 0 {
                return Err(GraphError::ZeroCycleLength(node_id));
            }
            let cycle = f64::from(cycle);

            let mut green_frac: FxHashMap<MoveKey, f64> = FxHashMap::default();
            for phase in node_phases.values() {
                for mv in &phase.moves {
                    *green_frac
                        .entry((mv.in_link.id, mv.out_link.id))
                        .or_insert(0.0) += f64::from(phase.green) / cycle;
                }
            }
            for (key, frac) in green_frac {
                if let Some(mv) = self.moves.get(&key) {
                    mv.set_active_green(frac);
                }
            }
        }
        Ok(())
    }

    /// Stage 5: assigned paths (flow = proportion × O-D demand) and the
    /// derived exogenous entry-link demand.
    pub fn load_paths(mut self, records: Vec<PathRecord>) -> GraphResult<Self> {
        Self::require(&self.phases, "paths", "phases")?;
        let links = Self::require(&self.links, "paths", "links")?;
        let demand = Self::require(&self.demand, "paths", "demand")?;

        let mut paths: FxHashMap<OdPair, Vec<Rc<Path>>> = FxHashMap::default();
        for rec in records {
            let path_links = rec
                .links
                .iter()
                .map(|&id| {
                    links
                        .get(&LinkId(id))
                        .cloned()
                        .ok_or(GraphError::LinkNotFound(LinkId(id)))
                })
                .collect::<GraphResult<Vec<Rc<Link>>>>()?;

            let mut path =
                Path::new(PathId(rec.id), path_links, rec.proportion, rec.num_links)?;

            let od = (path.origin().id, path.destination().id);
            let od_demand = demand.get(&od).copied().ok_or_else(|| {
                GraphError::Parse(format!(
                    "path {} references O-D pair ({}, {}) with no demand record",
                    rec.id, od.0, od.1,
                ))
            })?;
            path.set_flow(path.proportion * od_demand);

            paths.entry(od).or_default().push(Rc::new(path));
        }

        // Exogenous demand: per entry link, the demand-weighted proportion of
        // paths that start on it.  Entry links with no match stay at zero.
        for entry in self.entry_links.values() {
            let exo = self.exogenous_demand.entry(entry.id).or_insert(0.0);
            for (&(r, s), &od_demand) in demand.iter() {
                if od_demand == 0.0 || r != entry.tail.id {
                    continue;
                }
                let first_link_proportion: f64 = paths
                    .get(&(r, s))
                    .map(|ps| {
                        ps.iter()
                            .filter(|p| p.links()[0].as_ref() == entry.as_ref())
                            .map(|p| p.proportion)
                            .sum()
                    })
                    .unwrap_or(0.0);
                *exo += first_link_proportion * od_demand;
            }
        }

        self.paths = Some(paths);
        Ok(self)
    }

    /// Final stage: verify every stage ran, assemble the graph, and derive
    /// turn proportions with a demand scaler of 1.
    pub fn build(self) -> GraphResult<Graph> {
        let nodes = self
            .nodes
            .ok_or(GraphError::NotYetLoaded { stage: "build", requires: "nodes" })?;
        let links = self
            .links
            .ok_or(GraphError::NotYetLoaded { stage: "build", requires: "links" })?;
        let demand = self
            .demand
            .ok_or(GraphError::NotYetLoaded { stage: "build", requires: "demand" })?;
        let phases = self
            .phases
            .ok_or(GraphError::NotYetLoaded { stage: "build", requires: "phases" })?;
        let paths = self
            .paths
            .ok_or(GraphError::NotYetLoaded { stage: "build", requires: "paths" })?;

        let mut graph = Graph {
            name: self.name,
            nodes,
            zones: self.zones,
            links,
            centroid_connectors: self.centroid_connectors,
            entry_links: self.entry_links,
            exit_links: self.exit_links,
            internal_links: self.internal_links,
            origins: self.origins,
            destinations: self.destinations,
            out_links: self.out_links,
            in_links: self.in_links,
            demand,
            phases,
            moves: self.moves,
            signal_nodes: self.signal_nodes,
            paths,
            exogenous_demand: self.exogenous_demand,
            turn_proportions: FxHashMap::default(),
            link_by_endpoints: OnceCell::new(),
            all_moves: OnceCell::new(),
        };
        graph.derive_turn_proportions(1.0);
        Ok(graph)
    }
}
