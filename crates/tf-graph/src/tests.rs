//! Unit tests for tf-graph.
//!
//! All tests use hand-built record fixtures so they run without any input
//! files; the ingestion tests feed the readers from in-memory `Cursor`s.

#[cfg(test)]
mod helpers {
    use std::rc::Rc;

    use tf_core::{LinkId, NodeId, Point3};

    use crate::graph::Graph;
    use crate::link::{Link, LinkKind};
    use crate::loader::{
        LinkRecord, NetworkRecords, NodeRecord, OdRecord, PathRecord, PhaseRecord,
    };
    use crate::node::{Node, NodeKind};

    pub fn node(id: u32, kind: u32, x: f64, y: f64) -> NodeRecord {
        NodeRecord { id, kind, x, y, z: 0.0 }
    }

    pub fn link(id: u32, kind: u32, tail: u32, head: u32) -> LinkRecord {
        LinkRecord {
            id,
            kind,
            tail,
            head,
            length_ft: 500.0,
            ffspd_mph: 30.0,
            wave_mph: 12.0,
            capacity: 1800.0,
            lanes: 2,
        }
    }

    pub fn od(origin: u32, destination: u32, demand: f64) -> OdRecord {
        OdRecord { origin, destination, demand }
    }

    pub fn phase(
        node: u32,
        seq: u32,
        red: u32,
        yellow: u32,
        green: u32,
        in_links: Vec<u32>,
        out_links: Vec<u32>,
    ) -> PhaseRecord {
        PhaseRecord {
            node,
            kind: 1,
            seq,
            red,
            yellow,
            green,
            num_moves: in_links.len(),
            in_links,
            out_links,
        }
    }

    pub fn path(id: u32, proportion: f64, links: Vec<u32>) -> PathRecord {
        PathRecord { id, num_links: links.len(), proportion, links }
    }

    /// Diamond network between two zones:
    ///
    /// ```text
    ///                 B(12)
    ///   Z1(1) ─101→ A(11)   D(14) ─102→ Z2(2)
    ///                 C(13)
    /// ```
    ///
    /// Links: 101 Z1→A, 111 A→B, 112 A→C, 113 B→D, 114 C→D, 102 D→Z2,
    /// plus 115 B→A (reverse of 111, for U-turn tests) and a second origin
    /// zone Z3(3) with connector 103 Z3→A that carries no demand.
    ///
    /// Signals: A and D (two phases each, red/yellow nonzero, cycle 120 s).
    /// B has a single free-flow phase (red = yellow = 0) so it is phased but
    /// NOT a signal node.
    ///
    /// Demand: (Z1, Z2) = 60 + 40 = 100 veh/h, split 0.6 over A→B→D and
    /// 0.4 over A→C→D.
    pub fn diamond_records() -> NetworkRecords {
        NetworkRecords {
            nodes: vec![
                node(1, 1000, 0.0, 0.0),
                node(2, 1000, 10.0, 0.0),
                node(3, 1000, 0.0, 5.0),
                node(11, 100, 2.0, 0.0),
                node(12, 100, 4.0, 1.0),
                node(13, 100, 4.0, -1.0),
                node(14, 100, 6.0, 0.0),
            ],
            links: vec![
                link(101, 1000, 1, 11),
                link(102, 1000, 14, 2),
                link(103, 1000, 3, 11),
                link(111, 100, 11, 12),
                link(112, 100, 11, 13),
                link(113, 100, 12, 14),
                link(114, 100, 13, 14),
                link(115, 100, 12, 11),
            ],
            od: vec![od(1, 2, 60.0), od(1, 2, 40.0)],
            phases: vec![
                phase(11, 1, 20, 4, 36, vec![101], vec![111]),
                phase(11, 2, 20, 4, 36, vec![101], vec![112]),
                phase(14, 1, 30, 5, 25, vec![113], vec![102]),
                phase(14, 2, 30, 5, 25, vec![114], vec![102]),
                phase(12, 1, 0, 0, 30, vec![111], vec![113]),
            ],
            paths: vec![
                path(1, 0.6, vec![101, 111, 113, 102]),
                path(2, 0.4, vec![101, 112, 114, 102]),
            ],
        }
    }

    pub fn diamond() -> Graph {
        Graph::from_records(diamond_records(), "diamond").expect("diamond fixture must load")
    }

    // Bare entities for unit tests that don't need a graph.

    pub fn raw_node(id: u32, x: f64, y: f64) -> Rc<Node> {
        Rc::new(Node::new(NodeId(id), NodeKind::Intersection, Point3::new(x, y, 0.0)))
    }

    pub fn raw_link(id: u32, tail: &Rc<Node>, head: &Rc<Node>) -> Rc<Link> {
        Rc::new(Link::new(
            LinkId(id),
            LinkKind::Road,
            Rc::clone(tail),
            Rc::clone(head),
            500.0,
            30.0,
            12.0,
            1800.0,
            2,
        ))
    }
}

// ── Entity semantics ──────────────────────────────────────────────────────────

#[cfg(test)]
mod entities {
    use std::collections::HashSet;
    use std::rc::Rc;

    use tf_core::PathId;

    use super::helpers::{raw_link, raw_node};
    use crate::error::GraphError;
    use crate::movement::Move;
    use crate::path::Path;

    #[test]
    fn link_identity_is_geometric_not_nominal() {
        let a = raw_node(1, 0.0, 0.0);
        let b = raw_node(2, 1.0, 0.0);
        // Two records, different ids, same endpoints → the same link.
        let l1 = raw_link(10, &a, &b);
        let l2 = raw_link(99, &a, &b);
        assert_eq!(l1.as_ref(), l2.as_ref());

        let mut set = HashSet::new();
        set.insert(Rc::clone(&l1));
        set.insert(Rc::clone(&l2));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn node_equality_ties_break_on_id() {
        let a = raw_node(1, 0.0, 0.0);
        let b = raw_node(2, 0.0, 0.0); // same spot, different id
        assert_ne!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn reverse_link_detection() {
        let a = raw_node(1, 0.0, 0.0);
        let b = raw_node(2, 1.0, 0.0);
        let ab = raw_link(10, &a, &b);
        let ba = raw_link(11, &b, &a);
        assert!(ab.is_reverse_of(&ba));
        assert!(!ab.is_reverse_of(&ab));
    }

    #[test]
    fn move_requires_contiguous_links() {
        let a = raw_node(1, 0.0, 0.0);
        let b = raw_node(2, 1.0, 0.0);
        let c = raw_node(3, 2.0, 0.0);
        let ab = raw_link(10, &a, &b);
        let bc = raw_link(11, &b, &c);

        let mv = Move::new(Rc::clone(&ab), Rc::clone(&bc)).expect("contiguous");
        assert_eq!(mv.node().as_ref(), b.as_ref());

        // bc → ab does not meet at a common node.
        let err = Move::new(bc, ab).unwrap_err();
        assert!(matches!(err, GraphError::DisconnectedMove { .. }));
    }

    #[test]
    fn path_declared_length_must_match() {
        let a = raw_node(1, 0.0, 0.0);
        let b = raw_node(2, 1.0, 0.0);
        let c = raw_node(3, 2.0, 0.0);
        let ab = raw_link(10, &a, &b);
        let bc = raw_link(11, &b, &c);

        let err = Path::new(PathId(1), vec![ab, bc], 1.0, 3).unwrap_err();
        assert!(matches!(
            err,
            GraphError::PathLengthMismatch { declared: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn path_endpoints_and_positions() {
        let a = raw_node(1, 0.0, 0.0);
        let b = raw_node(2, 1.0, 0.0);
        let c = raw_node(3, 2.0, 0.0);
        let ab = raw_link(10, &a, &b);
        let bc = raw_link(11, &b, &c);

        let p = Path::new(PathId(7), vec![Rc::clone(&ab), Rc::clone(&bc)], 0.5, 2).unwrap();
        assert_eq!(p.origin().as_ref(), a.as_ref());
        assert_eq!(p.destination().as_ref(), c.as_ref());
        assert_eq!(p.position_of(&ab), Some(0));
        assert_eq!(p.position_of(&bc), Some(1));
        assert_eq!(p.hops().count(), 1);

        let d = raw_node(4, 3.0, 0.0);
        let cd = raw_link(12, &c, &d);
        assert_eq!(p.position_of(&cd), None);
    }
}

// ── Graph construction ────────────────────────────────────────────────────────

#[cfg(test)]
mod construction {
    use std::collections::HashSet;
    use std::rc::Rc;

    use tf_core::{LinkId, NodeId};

    use super::helpers::{self, diamond, diamond_records, od, path, phase};
    use crate::error::GraphError;
    use crate::graph::{Graph, GraphBuilder};

    #[test]
    fn link_partition_laws() {
        let g = diamond();

        let all: HashSet<LinkId> = g.links().keys().copied().collect();
        let entry: HashSet<LinkId> = g.entry_links().keys().copied().collect();
        let exit: HashSet<LinkId> = g.exit_links().keys().copied().collect();
        let internal: HashSet<LinkId> = g.internal_links().keys().copied().collect();

        assert!(entry.is_disjoint(&internal));
        assert!(exit.is_disjoint(&internal));
        let expected: HashSet<LinkId> =
            all.difference(&entry).copied().collect::<HashSet<_>>()
                .difference(&exit).copied().collect();
        assert_eq!(internal, expected);

        assert_eq!(entry, [LinkId(101), LinkId(103)].into_iter().collect());
        assert_eq!(exit, [LinkId(102)].into_iter().collect());
        assert_eq!(internal.len(), 5);
    }

    #[test]
    fn zones_origins_destinations() {
        let g = diamond();
        let zones: HashSet<NodeId> = g.zones().keys().copied().collect();
        assert_eq!(zones, [NodeId(1), NodeId(2), NodeId(3)].into_iter().collect());

        let origins: HashSet<NodeId> = g.origins().keys().copied().collect();
        assert_eq!(origins, [NodeId(1), NodeId(3)].into_iter().collect());

        let dests: HashSet<NodeId> = g.destinations().keys().copied().collect();
        assert_eq!(dests, [NodeId(2)].into_iter().collect());

        assert_eq!(g.centroid_connectors().len(), 3);
    }

    #[test]
    fn od_demand_merges_additively() {
        let g = diamond();
        assert_eq!(g.demand()[&(NodeId(1), NodeId(2))], 100.0);
        assert_eq!(g.od_pairs().count(), 1);
    }

    #[test]
    fn signal_classification_needs_nonzero_red_and_yellow() {
        let g = diamond();
        assert!(g.is_signal_node(NodeId(11)));
        assert!(g.is_signal_node(NodeId(14)));
        // B is phased but free-flow (red = yellow = 0).
        assert!(!g.is_signal_node(NodeId(12)));
        assert_eq!(g.signal_nodes().len(), 2);
    }

    #[test]
    fn default_green_split() {
        let g = diamond();
        let tol = 1e-12;

        // Node 11: cycle 120, each move green 36 in exactly one phase.
        for key in [(101, 111), (101, 112)] {
            let mv = g.move_at(LinkId(key.0), LinkId(key.1)).expect("move interned");
            assert!((mv.active_green() - 36.0 / 120.0).abs() < tol);
        }
        // Node 14: cycle 120, green 25.
        for key in [(113, 102), (114, 102)] {
            let mv = g.move_at(LinkId(key.0), LinkId(key.1)).expect("move interned");
            assert!((mv.active_green() - 25.0 / 120.0).abs() < tol);
        }
        // Node 12: one phase, cycle 30, green 30 → full green even though
        // it is not a signal node.
        let mv = g.move_at(LinkId(111), LinkId(113)).expect("move interned");
        assert!((mv.active_green() - 1.0).abs() < tol);
    }

    #[test]
    fn moves_are_interned_across_phases() {
        // The same movement in two phases must be one shared instance whose
        // green fractions accumulate.
        let mut records = diamond_records();
        records.phases = vec![
            phase(11, 1, 20, 4, 36, vec![101], vec![111]),
            phase(11, 2, 20, 4, 36, vec![101, 101], vec![111, 112]),
        ];
        let g = Graph::from_records(records, "interned").unwrap();

        let phases: Vec<_> = g.phases_at(NodeId(11)).collect();
        assert_eq!(phases.len(), 2);
        let first = &phases[0].moves[0];
        let again = &phases[1].moves[0];
        assert!(Rc::ptr_eq(first, again), "same (in, out) pair must intern to one Move");

        // (101, 111) sits in both phases: 36/120 + 36/120.
        let mv = g.move_at(LinkId(101), LinkId(111)).unwrap();
        assert!((mv.active_green() - 0.6).abs() < 1e-12);
        // First occurrence wins, duplicates suppressed.
        assert_eq!(g.allowed_moves(NodeId(11)).len(), 2);
    }

    #[test]
    fn path_flow_is_proportion_times_demand() {
        let g = diamond();
        let paths = g.paths_between(NodeId(1), NodeId(2));
        assert_eq!(paths.len(), 2);
        for p in paths {
            assert_eq!(p.origin().id, NodeId(1));
            assert_eq!(p.destination().id, NodeId(2));
            assert!((p.flow() - p.proportion * 100.0).abs() < 1e-12);
        }
    }

    #[test]
    fn display_renders_name() {
        let g = diamond();
        assert_eq!(g.to_string(), "<Graph of diamond>");
    }

    // ── Load-time failures ────────────────────────────────────────────────

    #[test]
    fn path_arity_mismatch_fails_construction() {
        let mut records = diamond_records();
        records.paths.push(crate::loader::PathRecord {
            id:         9,
            num_links:  3,
            proportion: 1.0,
            links:      vec![101, 111],
        });
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(
            err,
            GraphError::PathLengthMismatch { declared: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn disconnected_phase_move_fails() {
        let mut records = diamond_records();
        // 111 heads at node 12; 114 tails at node 13.
        records.phases.push(phase(12, 2, 10, 3, 20, vec![111], vec![114]));
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::DisconnectedMove { .. }));
    }

    #[test]
    fn unknown_phase_link_fails() {
        let mut records = diamond_records();
        records.phases.push(phase(12, 2, 10, 3, 20, vec![999], vec![113]));
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::LinkNotFound(LinkId(999))));
    }

    #[test]
    fn unknown_link_endpoint_fails() {
        let mut records = diamond_records();
        records.links.push(helpers::link(199, 100, 11, 999));
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound(NodeId(999))));
    }

    #[test]
    fn demand_between_non_zones_fails() {
        let mut records = diamond_records();
        records.od.push(od(11, 2, 5.0));
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::ZoneNotFound(NodeId(11))));
    }

    #[test]
    fn phase_move_count_mismatch_fails() {
        let mut records = diamond_records();
        records.phases.push(crate::loader::PhaseRecord {
            node:      12,
            kind:      1,
            seq:       2,
            red:       10,
            yellow:    3,
            green:     20,
            num_moves: 2,
            in_links:  vec![111],
            out_links: vec![113],
        });
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::Parse(_)));
    }

    #[test]
    fn zero_cycle_length_fails() {
        let mut records = diamond_records();
        records.phases = vec![phase(12, 1, 0, 0, 0, vec![111], vec![113])];
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::ZeroCycleLength(NodeId(12))));
    }

    #[test]
    fn path_without_demand_record_fails() {
        let mut records = diamond_records();
        // A route from Z3: entry 103 exists, but no (3, 2) demand.
        records.paths.push(path(9, 1.0, vec![103, 111, 113, 102]));
        let err = Graph::from_records(records, "bad").unwrap_err();
        assert!(matches!(err, GraphError::Parse(_)));
    }

    #[test]
    fn builder_stages_enforce_order() {
        let records = diamond_records();

        let err = GraphBuilder::new("x").load_links(records.links.clone()).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NotYetLoaded { stage: "links", requires: "nodes" }
        ));

        let err = GraphBuilder::new("x")
            .load_nodes(records.nodes.clone())
            .unwrap()
            .load_phases(records.phases.clone())
            .unwrap_err();
        assert!(matches!(err, GraphError::NotYetLoaded { stage: "phases", .. }));

        let err = GraphBuilder::new("x").build().unwrap_err();
        assert!(matches!(err, GraphError::NotYetLoaded { stage: "build", .. }));
    }
}

// ── Adjacency queries ─────────────────────────────────────────────────────────

#[cfg(test)]
mod adjacency {
    use std::collections::HashSet;

    use tf_core::{LinkId, NodeId};

    use super::helpers::diamond;
    use crate::error::GraphError;

    #[test]
    fn forward_star_of_intersection() {
        let g = diamond();
        let out: HashSet<LinkId> =
            g.forward_star(NodeId(11), false).iter().map(|l| l.id).collect();
        assert_eq!(out, [LinkId(111), LinkId(112)].into_iter().collect());
    }

    #[test]
    fn stars_gate_centroids_unless_forced() {
        let g = diamond();
        assert!(g.forward_star(NodeId(1), false).is_empty());
        assert_eq!(g.forward_star(NodeId(1), true).len(), 1);

        assert!(g.reverse_star(NodeId(2), false).is_empty());
        assert_eq!(g.reverse_star(NodeId(2), true).len(), 1);
    }

    #[test]
    fn link_composition() {
        let g = diamond();
        let l111 = g.link(LinkId(111)).unwrap();

        let out: HashSet<LinkId> = g.outgoing_links(l111).iter().map(|l| l.id).collect();
        assert_eq!(out, [LinkId(113), LinkId(115)].into_iter().collect());

        let inc: HashSet<LinkId> = g.incoming_links(l111).iter().map(|l| l.id).collect();
        // Into node 11: connectors 101, 103 and the reverse link 115.
        assert_eq!(inc, [LinkId(101), LinkId(103), LinkId(115)].into_iter().collect());
    }

    #[test]
    fn link_between_hits_and_misses() {
        let g = diamond();
        assert_eq!(g.link_between(NodeId(11), NodeId(12)).unwrap().id, LinkId(111));

        let err = g.link_between(NodeId(12), NodeId(13)).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NoLinkBetween { tail: NodeId(12), head: NodeId(13) }
        ));
    }

    #[test]
    fn unknown_ids_are_typed_errors() {
        let g = diamond();
        assert!(matches!(g.node(NodeId(999)), Err(GraphError::NodeNotFound(_))));
        assert!(matches!(g.link(LinkId(999)), Err(GraphError::LinkNotFound(_))));
    }
}

// ── Flow derivations ──────────────────────────────────────────────────────────

#[cfg(test)]
mod flows {
    use tf_core::{LinkId, NodeId};

    use super::helpers::diamond;

    const TOL: f64 = 1e-12;

    #[test]
    fn exogenous_demand_per_entry_link() {
        let g = diamond();
        // All 100 veh/h of (Z1, Z2) demand enters on connector 101.
        assert!((g.exogenous_demand()[&LinkId(101)] - 100.0).abs() < TOL);
        // Entry 103 has no matching O-D pair → exactly zero, but present.
        assert_eq!(g.exogenous_demand()[&LinkId(103)], 0.0);
    }

    #[test]
    fn turn_proportions_follow_path_flows() {
        let g = diamond();
        assert!((g.turn_proportion(LinkId(101), LinkId(111)).unwrap() - 0.6).abs() < TOL);
        assert!((g.turn_proportion(LinkId(101), LinkId(112)).unwrap() - 0.4).abs() < TOL);
        assert!((g.turn_proportion(LinkId(113), LinkId(102)).unwrap() - 1.0).abs() < TOL);
        assert!((g.turn_proportion(LinkId(114), LinkId(102)).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn proportions_cover_signal_moves_only() {
        let g = diamond();
        // Node 12 is phased but unsignalized: its move gets no proportion.
        assert_eq!(g.turn_proportion(LinkId(111), LinkId(113)), None);
        assert_eq!(g.turn_proportions().len(), 4);
    }

    #[test]
    fn proportions_are_within_unit_interval() {
        let g = diamond();
        for (&key, &p) in g.turn_proportions() {
            assert!((0.0..=1.0).contains(&p), "proportion {p} out of range for {key:?}");
        }
        for mv in g.all_moves() {
            assert!(mv.numerator() >= 0.0);
            assert!(mv.numerator() <= mv.denominator());
        }
    }

    #[test]
    fn derivation_is_idempotent() {
        let mut g = diamond();
        let first = g.derive_turn_proportions(1.0).clone();
        let second = g.derive_turn_proportions(1.0).clone();
        assert_eq!(first, second);
    }

    #[test]
    fn proportions_are_scaler_invariant_but_accumulators_scale() {
        let mut g = diamond();
        let base = g.derive_turn_proportions(1.0).clone();
        let scaled = g.derive_turn_proportions(2.0).clone();
        for (key, p) in &base {
            assert!((scaled[key] - p).abs() < TOL);
        }
        // Absolute accumulators scale by k: both paths cross 101 → 2 × 100.
        let mv = g.move_at(LinkId(101), LinkId(111)).unwrap();
        assert!((mv.denominator() - 200.0).abs() < TOL);
        assert!((mv.numerator() - 120.0).abs() < TOL);
    }

    #[test]
    fn all_moves_covers_signal_nodes_in_node_order() {
        let g = diamond();
        let moves = g.all_moves();
        assert_eq!(moves.len(), 4);
        // Ascending node order: node 11 movements before node 14's.
        assert_eq!(moves[0].node().id, NodeId(11));
        assert_eq!(moves[3].node().id, NodeId(14));
    }

    #[test]
    fn allowed_moves_of_unphased_node_is_empty() {
        let g = diamond();
        assert!(g.allowed_moves(NodeId(13)).is_empty());
    }
}

// ── All-paths enumeration ─────────────────────────────────────────────────────

#[cfg(test)]
mod search {
    use std::rc::Rc;

    use tf_core::LinkId;

    use super::helpers::diamond;
    use crate::graph::SearchBudget;
    use crate::link::Link;

    fn ids(path: &[Rc<Link>]) -> Vec<u32> {
        path.iter().map(|l| l.id.0).collect()
    }

    #[test]
    fn unreachable_destination_yields_nothing() {
        let g = diamond();
        // From A→B there is no way to reach C→D.
        let from = g.link(LinkId(111)).unwrap().clone();
        let to = g.link(LinkId(114)).unwrap().clone();
        assert!(g.all_paths(&from, &to).is_empty());
    }

    #[test]
    fn single_hop_route_is_found_exactly_once() {
        let g = diamond();
        let from = g.link(LinkId(111)).unwrap().clone();
        let to = g.link(LinkId(113)).unwrap().clone();
        let found = g.all_paths(&from, &to);
        assert_eq!(found.len(), 1);
        assert_eq!(ids(&found[0]), vec![111, 113]);
    }

    #[test]
    fn source_equal_to_destination_is_the_trivial_path() {
        let g = diamond();
        let l = g.link(LinkId(111)).unwrap().clone();
        let found = g.all_paths(&l, &l);
        assert_eq!(found.len(), 1);
        assert_eq!(ids(&found[0]), vec![111]);
    }

    #[test]
    fn enumerates_every_route_between_connectors() {
        let g = diamond();
        let from = g.link(LinkId(101)).unwrap().clone();
        let to = g.link(LinkId(102)).unwrap().clone();
        let mut found: Vec<Vec<u32>> = g.all_paths(&from, &to).iter().map(|p| ids(p)).collect();
        found.sort();
        assert_eq!(
            found,
            vec![vec![101, 111, 113, 102], vec![101, 112, 114, 102]]
        );
    }

    #[test]
    fn immediate_u_turns_are_rejected() {
        let g = diamond();
        // 115 is the reversal of 111; without the U-turn rule the route
        // 111 → 115 → 112 would reach 112.
        let from = g.link(LinkId(111)).unwrap().clone();
        let to = g.link(LinkId(112)).unwrap().clone();
        assert!(g.all_paths(&from, &to).is_empty());
    }

    #[test]
    fn connectors_are_terminal_beyond_the_first_hop() {
        let g = diamond();
        // Any candidate ending on exit connector 102 must stop there: no
        // route from A→B out of the far zone exists.
        let from = g.link(LinkId(113)).unwrap().clone();
        let to = g.link(LinkId(103)).unwrap().clone();
        assert!(g.all_paths(&from, &to).is_empty());
    }

    #[test]
    fn budget_caps_paths_and_depth() {
        let g = diamond();
        let from = g.link(LinkId(101)).unwrap().clone();
        let to = g.link(LinkId(102)).unwrap().clone();

        let capped = g.all_paths_bounded(&from, &to, SearchBudget::default().max_paths(1));
        assert_eq!(capped.len(), 1);

        // Routes need 4 links; a depth cap of 3 starves the search.
        let starved = g.all_paths_bounded(&from, &to, SearchBudget::default().max_depth(3));
        assert!(starved.is_empty());

        let exact = g.all_paths_bounded(&from, &to, SearchBudget::default().max_depth(4));
        assert_eq!(exact.len(), 2);
    }
}

// ── Ingestion ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ingestion {
    use std::io::Cursor;

    use tf_core::LinkId;

    use crate::error::GraphError;
    use crate::graph::Graph;
    use crate::loader::{
        read_link_records, read_node_records, read_od_records, read_path_records,
        read_phase_records, NetworkRecords,
    };

    #[test]
    fn node_records_skip_header_and_extra_spaces() {
        let text = "id type x y z\n1 1000 0.0 0.0 0.0\n11  100  2.0 0.0  0.5\n";
        let recs = read_node_records(Cursor::new(text)).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].kind, 1000);
        assert_eq!(recs[1].id, 11);
        assert_eq!(recs[1].z, 0.5);
    }

    #[test]
    fn link_records_parse_all_fields() {
        let text = "id type from to length ffspd w cap lanes\n\
                    111 100 11 12 528.0 35.0 12.5 1800.0 2\n";
        let recs = read_link_records(Cursor::new(text)).unwrap();
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!((r.id, r.tail, r.head, r.lanes), (111, 11, 12, 2));
        assert_eq!(r.length_ft, 528.0);
        assert_eq!(r.ffspd_mph, 35.0);
    }

    #[test]
    fn od_records_use_trailing_three_fields() {
        let text = "rec kind origin destination demand\n7 x 1 2 50.0\n1 2 25.0\n";
        let recs = read_od_records(Cursor::new(text)).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!((recs[0].origin, recs[0].destination), (1, 2));
        assert_eq!(recs[0].demand, 50.0);
        assert_eq!(recs[1].demand, 25.0);
    }

    #[test]
    fn phase_records_pair_brace_sets_positionally() {
        let text = "node type seq red yellow green n from to\n\
                    11 1 1 20 4 36 2 {101,115} {111,112}\n";
        let recs = read_phase_records(Cursor::new(text)).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].in_links, vec![101, 115]);
        assert_eq!(recs[0].out_links, vec![111, 112]);
        assert_eq!(recs[0].num_moves, 2);
    }

    #[test]
    fn path_records_keep_trailing_link_ids() {
        let text = "id n prop links\n1 4 0.6 101 111 113 102\n";
        let recs = read_path_records(Cursor::new(text)).unwrap();
        assert_eq!(recs[0].num_links, 4);
        assert_eq!(recs[0].links, vec![101, 111, 113, 102]);
    }

    #[test]
    fn malformed_fields_are_parse_errors() {
        let bad_node = "h\n1 1000 0.0 zero 0.0\n";
        assert!(matches!(
            read_node_records(Cursor::new(bad_node)),
            Err(GraphError::Parse(_))
        ));

        let bad_set = "h\n11 1 1 20 4 36 1 101 {111}\n";
        assert!(matches!(
            read_phase_records(Cursor::new(bad_set)),
            Err(GraphError::Parse(_))
        ));

        let short_link = "h\n111 100 11 12\n";
        assert!(matches!(
            read_link_records(Cursor::new(short_link)),
            Err(GraphError::Parse(_))
        ));
    }

    /// End-to-end: one entry link, one O-D pair of demand 100, one assigned
    /// path of proportion 1.0 → exogenous demand exactly 100 and a turn
    /// proportion of 1.0 at the single signal movement.
    #[test]
    fn single_corridor_from_text() {
        let nodes = "id type x y z\n\
                     1 1000 0.0 0.0 0.0\n\
                     2 1000 6.0 0.0 0.0\n\
                     11 100 2.0 0.0 0.0\n\
                     12 100 4.0 0.0 0.0\n";
        let links = "id type from to length ffspd w cap lanes\n\
                     101 1000 1 11 300.0 30.0 12.0 1800.0 1\n\
                     111 100 11 12 500.0 30.0 12.0 1800.0 2\n\
                     102 1000 12 2 300.0 30.0 12.0 1800.0 1\n";
        let od = "rec kind origin destination demand\n1 1 1 2 100.0\n";
        let phases = "node type seq red yellow green n from to\n\
                      12 1 1 10 3 20 1 {111} {102}\n";
        let paths = "id n prop links\n1 3 1.0 101 111 102\n";

        let records = NetworkRecords {
            nodes:  read_node_records(Cursor::new(nodes)).unwrap(),
            links:  read_link_records(Cursor::new(links)).unwrap(),
            od:     read_od_records(Cursor::new(od)).unwrap(),
            phases: read_phase_records(Cursor::new(phases)).unwrap(),
            paths:  read_path_records(Cursor::new(paths)).unwrap(),
        };
        let g = Graph::from_records(records, "corridor").unwrap();

        assert_eq!(g.exogenous_demand()[&LinkId(101)], 100.0);
        assert_eq!(g.turn_proportion(LinkId(111), LinkId(102)), Some(1.0));
    }
}
