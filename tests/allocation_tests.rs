use shardgate::{
    AllocationDecider, AllocationDeciders, AllocationSettings, Decision, IndexMetaData,
    NoopDecider, RebalanceOnlyWhenActiveDecider, ReplicaAfterPrimaryActiveDecider, RoutingNodes,
    SameShardDecider, ShardRouting, ThrottlingDecider,
};
use std::sync::Arc;

fn routing(nodes: &[&str], index: &str, shards: u32, replicas: u32) -> RoutingNodes {
    let mut routing = RoutingNodes::new();
    for node in nodes {
        routing.add_node(*node).unwrap();
    }
    routing
        .add_index(&IndexMetaData::new(index, shards, replicas))
        .unwrap();
    routing
}

fn unassigned(routing: &RoutingNodes, id: u32, primary: bool) -> ShardRouting {
    routing
        .unassigned()
        .iter()
        .find(|s| s.shard_id.id == id && s.primary == primary)
        .cloned()
        .unwrap()
}

/// Assigns and starts the primary of shard `id` on `node`.
fn start_primary(routing: &mut RoutingNodes, id: u32, node: &str) -> ShardRouting {
    let primary = unassigned(routing, id, true);
    routing.assign(primary.copy_id, node).unwrap();
    routing.start(primary.copy_id).unwrap();
    routing.find_copy(primary.copy_id).cloned().unwrap()
}

#[test]
fn same_shard_denies_second_copy_on_node() {
    let mut routing = routing(&["node-a", "node-b"], "test", 1, 1);
    start_primary(&mut routing, 0, "node-a");
    let replica = unassigned(&routing, 0, false);

    let decider = SameShardDecider;
    let node_a = routing.node("node-a").unwrap();
    let node_b = routing.node("node-b").unwrap();
    assert_eq!(decider.can_allocate(&replica, node_a, &routing), Decision::No);
    assert_eq!(decider.can_allocate(&replica, node_b, &routing), Decision::Yes);
}

#[test]
fn same_shard_counts_initializing_copies() {
    let mut routing = routing(&["node-a"], "test", 1, 1);
    let primary = unassigned(&routing, 0, true);
    routing.assign(primary.copy_id, "node-a").unwrap();
    let replica = unassigned(&routing, 0, false);

    let node_a = routing.node("node-a").unwrap();
    assert_eq!(SameShardDecider.can_allocate(&replica, node_a, &routing), Decision::No);
}

#[test]
fn same_shard_allows_copy_to_stay_where_it_is() {
    let mut routing = routing(&["node-a"], "test", 1, 0);
    let primary = start_primary(&mut routing, 0, "node-a");
    let node_a = routing.node("node-a").unwrap();
    assert_eq!(SameShardDecider.can_allocate(&primary, node_a, &routing), Decision::Yes);
}

#[test]
fn replica_waits_for_started_primary_on_any_node() {
    let mut routing = routing(&["node-a", "node-b", "node-c"], "test", 1, 1);
    let primary = unassigned(&routing, 0, true);
    routing.assign(primary.copy_id, "node-a").unwrap();
    let replica = unassigned(&routing, 0, false);

    let decider = ReplicaAfterPrimaryActiveDecider;
    for node in routing.nodes() {
        assert_eq!(decider.can_allocate(&replica, node, &routing), Decision::No);
    }

    routing.start(primary.copy_id).unwrap();
    let node_b = routing.node("node-b").unwrap();
    assert_eq!(decider.can_allocate(&replica, node_b, &routing), Decision::Yes);
}

#[test]
fn replica_ordering_never_blocks_primaries() {
    let routing = routing(&["node-a"], "test", 1, 1);
    let primary = unassigned(&routing, 0, true);
    let node_a = routing.node("node-a").unwrap();
    assert_eq!(
        ReplicaAfterPrimaryActiveDecider.can_allocate(&primary, node_a, &routing),
        Decision::Yes
    );
}

#[test]
fn rebalance_gate_waits_for_whole_index_to_settle() {
    let mut routing = routing(&["node-a", "node-b"], "test", 2, 0);
    let first = start_primary(&mut routing, 0, "node-a");
    let second = unassigned(&routing, 1, true);
    routing.assign(second.copy_id, "node-b").unwrap();

    let gate = RebalanceOnlyWhenActiveDecider;
    assert!(!gate.can_rebalance(&first, &routing));

    routing.start(second.copy_id).unwrap();
    assert!(gate.can_rebalance(&first, &routing));

    routing.relocate(first.copy_id, "node-b").unwrap();
    let settled = routing.find_copy(second.copy_id).cloned().unwrap();
    assert!(!gate.can_rebalance(&settled, &routing));
}

#[test]
fn rebalance_gate_ignores_other_indices() {
    let mut routing = routing(&["node-a", "node-b"], "test", 1, 0);
    routing.add_index(&IndexMetaData::new("other", 1, 0)).unwrap();
    let settled = start_primary(&mut routing, 0, "node-a");
    let other = routing.unassigned()[0].clone();
    routing.assign(other.copy_id, "node-b").unwrap();

    assert!(RebalanceOnlyWhenActiveDecider.can_rebalance(&settled, &routing));
}

#[test]
fn noop_decider_permits_everything() {
    let mut routing = routing(&["node-a"], "test", 1, 1);
    let replica = unassigned(&routing, 0, false);
    let node = routing.node("node-a").unwrap().clone();

    let chain = AllocationDeciders::new().with(Box::new(NoopDecider));
    assert_eq!(chain.can_allocate(&replica, &node, &routing), Decision::Yes);
    assert!(chain.can_rebalance(&replica, &routing));
    assert!(!chain.allocate_unassigned(&mut routing));
    assert_eq!(routing.unassigned().len(), 2);
}

#[test]
fn default_chain_has_fixed_order() {
    let chain = AllocationDeciders::with_default_deciders(&AllocationSettings::default());
    assert_eq!(
        chain.names(),
        vec![
            "same_shard",
            "replica_after_primary_active",
            "throttling",
            "rebalance_only_when_active"
        ]
    );
}

struct Fixed(Decision);

impl AllocationDecider for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn can_allocate(
        &self,
        _shard: &ShardRouting,
        _node: &shardgate::RoutingNode,
        _routing: &RoutingNodes,
    ) -> Decision {
        self.0
    }

    fn can_rebalance(&self, _shard: &ShardRouting, _routing: &RoutingNodes) -> bool {
        self.0 == Decision::Yes
    }
}

#[test]
fn composite_combines_verdicts() {
    let routing = routing(&["node-a"], "test", 1, 0);
    let shard = unassigned(&routing, 0, true);
    let node = routing.node("node-a").unwrap();

    let chain = |decisions: &[Decision]| {
        let mut chain = AllocationDeciders::new();
        for decision in decisions {
            chain.register(Box::new(Fixed(*decision)));
        }
        chain
    };

    use Decision::*;
    assert_eq!(chain(&[Yes, Throttle, No]).can_allocate(&shard, node, &routing), No);
    assert_eq!(chain(&[No, Yes]).can_allocate(&shard, node, &routing), No);
    assert_eq!(chain(&[Yes, Throttle]).can_allocate(&shard, node, &routing), Throttle);
    assert_eq!(chain(&[Yes, Yes]).can_allocate(&shard, node, &routing), Yes);

    assert!(!chain(&[Yes, Throttle]).can_rebalance(&shard, &routing));
    assert!(chain(&[Yes, Yes]).can_rebalance(&shard, &routing));
}

#[test]
fn two_node_replica_placement() {
    let mut routing = routing(&["node-a", "node-b"], "x", 1, 1);
    start_primary(&mut routing, 0, "node-a");
    let replica = unassigned(&routing, 0, false);

    let chain = AllocationDeciders::default();
    let node_a = routing.node("node-a").unwrap();
    let node_b = routing.node("node-b").unwrap();
    assert_eq!(chain.can_allocate(&replica, node_a, &routing), Decision::No);
    assert_eq!(chain.can_allocate(&replica, node_b, &routing), Decision::Yes);
}

#[test]
fn composite_throttles_busy_node() {
    let settings = AllocationSettings::default().node_concurrent_recoveries(1);
    let mut routing = routing(&["node-a", "node-b"], "test", 2, 0);
    let first = unassigned(&routing, 0, true);
    routing.assign(first.copy_id, "node-a").unwrap();
    let second = unassigned(&routing, 1, true);

    let chain = AllocationDeciders::with_default_deciders(&settings);
    let node_a = routing.node("node-a").unwrap();
    let node_b = routing.node("node-b").unwrap();
    assert_eq!(chain.can_allocate(&second, node_a, &routing), Decision::Throttle);
    assert_eq!(chain.can_allocate(&second, node_b, &routing), Decision::Yes);
}

#[test]
fn throttle_handle_sees_started_notifications_once() {
    let throttle = Arc::new(ThrottlingDecider::new(&AllocationSettings::default()));
    let chain = AllocationDeciders::new().with(Box::new(Arc::clone(&throttle)));

    let mut routing = routing(&["node-a"], "test", 2, 0);
    let ids: Vec<u64> = routing.unassigned().iter().map(|s| s.copy_id).collect();
    for id in &ids {
        routing.assign(*id, "node-a").unwrap();
    }
    chain.allocate_unassigned(&mut routing);
    assert_eq!(throttle.in_flight_recoveries("node-a"), 2);

    routing.start(ids[0]).unwrap();
    let started = vec![routing.find_copy(ids[0]).cloned().unwrap()];
    chain.apply_started_shards(&started, &mut routing);
    chain.apply_started_shards(&started, &mut routing);

    assert_eq!(throttle.in_flight_recoveries("node-a"), 1);
    assert_eq!(throttle.cluster_in_flight_recoveries(), 1);
}

#[test]
fn throttle_rebuild_matches_routing_after_restart() {
    let mut routing = routing(&["node-a", "node-b"], "test", 3, 0);
    let ids: Vec<u64> = routing.unassigned().iter().map(|s| s.copy_id).collect();
    routing.assign(ids[0], "node-a").unwrap();
    routing.assign(ids[1], "node-b").unwrap();
    routing.assign(ids[2], "node-b").unwrap();
    routing.start(ids[2]).unwrap();

    let throttle = ThrottlingDecider::new(&AllocationSettings::default());
    throttle.rebuild(&routing);
    assert_eq!(throttle.in_flight_recoveries("node-a"), 1);
    assert_eq!(throttle.in_flight_recoveries("node-b"), 1);
    assert_eq!(throttle.cluster_in_flight_recoveries(), 2);
}
