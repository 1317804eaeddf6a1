use crate::allocation::{AllocationDecider, AllocationDeciders, Decision};
use crate::config::AllocationSettings;
use crate::routing::{RoutingNode, RoutingNodes, ShardRouting};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use tracing::{Level, event};

/// Caps concurrent recoveries per node and across the cluster.
///
/// In-flight recoveries are tracked by copy id, so a duplicate started or
/// failed notification for the same copy releases nothing the second time.
/// The ledger is transient. It is reconciled against the routing state when
/// the decider is consulted after a routing mutation; consults against an
/// unchanged routing reuse the last scan. [`rebuild`](Self::rebuild) rescans
/// from scratch after a restart.
pub struct ThrottlingDecider {
    node_concurrent_recoveries: usize,
    cluster_concurrent_recoveries: usize,
    recoveries: Mutex<RecoveryLedger>,
}

#[derive(Debug, Default)]
struct RecoveryLedger {
    by_node: HashMap<String, BTreeSet<u64>>,
    /// Routing generation of the last full scan.
    synced: Option<u64>,
}

impl RecoveryLedger {
    fn contains(&self, copy_id: u64) -> bool {
        self.by_node.values().any(|copies| copies.contains(&copy_id))
    }

    fn node_count(&self, node_id: &str) -> usize {
        self.by_node.get(node_id).map_or(0, BTreeSet::len)
    }

    fn total(&self) -> usize {
        self.by_node.values().map(BTreeSet::len).sum()
    }

    fn release(&mut self, copy_id: u64) -> bool {
        let mut released = false;
        for copies in self.by_node.values_mut() {
            released |= copies.remove(&copy_id);
        }
        self.by_node.retain(|_, copies| !copies.is_empty());
        released
    }

    /// Tracks every initializing copy in `routing` and drops tracked copies
    /// that are no longer initializing where the ledger recorded them.
    fn sync(&mut self, routing: &RoutingNodes) {
        if self.synced == Some(routing.generation()) {
            return;
        }
        self.synced = Some(routing.generation());

        let live: HashMap<u64, &str> = routing
            .assigned_copies()
            .filter(|shard| shard.initializing())
            .filter_map(|shard| {
                shard
                    .current_node_id
                    .as_deref()
                    .map(|node| (shard.copy_id, node))
            })
            .collect();

        for (node_id, copies) in self.by_node.iter_mut() {
            copies.retain(|copy_id| {
                let keep = live.get(copy_id) == Some(&node_id.as_str());
                if !keep {
                    event!(
                        Level::DEBUG,
                        node = %node_id,
                        copy_id = *copy_id,
                        "dropping stale recovery bookkeeping"
                    );
                }
                keep
            });
        }
        self.by_node.retain(|_, copies| !copies.is_empty());

        for (copy_id, node_id) in live {
            self.by_node
                .entry(node_id.to_string())
                .or_default()
                .insert(copy_id);
        }
    }
}

impl ThrottlingDecider {
    pub fn new(settings: &AllocationSettings) -> Self {
        let node_limit = clamp_limit(settings.node_concurrent_recoveries, "node_concurrent_recoveries");
        let cluster_limit =
            clamp_limit(settings.cluster_concurrent_recoveries, "cluster_concurrent_recoveries");
        Self {
            node_concurrent_recoveries: node_limit,
            cluster_concurrent_recoveries: cluster_limit,
            recoveries: Mutex::new(RecoveryLedger::default()),
        }
    }

    /// Discards all bookkeeping and rescans `routing` for initializing copies.
    pub fn rebuild(&self, routing: &RoutingNodes) {
        let mut ledger = self.recoveries.lock();
        ledger.by_node.clear();
        ledger.synced = None;
        ledger.sync(routing);
        event!(
            Level::DEBUG,
            in_flight = ledger.total(),
            "rebuilt recovery bookkeeping"
        );
    }

    /// Recoveries currently accounted against `node_id`.
    pub fn in_flight_recoveries(&self, node_id: &str) -> usize {
        self.recoveries.lock().node_count(node_id)
    }

    pub fn cluster_in_flight_recoveries(&self) -> usize {
        self.recoveries.lock().total()
    }

    fn release_all(&self, copies: &[ShardRouting], reason: &'static str) {
        let mut ledger = self.recoveries.lock();
        for copy in copies {
            if !ledger.release(copy.copy_id) {
                event!(
                    Level::DEBUG,
                    shard = %copy,
                    reason,
                    "no in-flight recovery to release"
                );
            }
        }
    }
}

fn clamp_limit(limit: usize, name: &'static str) -> usize {
    debug_assert!(limit > 0, "{} must be >= 1", name);
    if limit == 0 {
        event!(Level::WARN, setting = name, "recovery limit of 0 clamped to 1");
        return 1;
    }
    limit
}

impl AllocationDecider for ThrottlingDecider {
    fn name(&self) -> &'static str {
        "throttling"
    }

    fn can_allocate(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        routing: &RoutingNodes,
    ) -> Decision {
        let mut ledger = self.recoveries.lock();
        ledger.sync(routing);

        // Already admitted; keeping it where it is costs no new recovery.
        if ledger.contains(shard.copy_id) {
            return Decision::Yes;
        }
        if ledger.node_count(node.node_id()) >= self.node_concurrent_recoveries {
            return Decision::Throttle;
        }
        if ledger.total() >= self.cluster_concurrent_recoveries {
            return Decision::Throttle;
        }
        Decision::Yes
    }

    fn allocate_unassigned(
        &self,
        _deciders: &AllocationDeciders,
        routing: &mut RoutingNodes,
    ) -> bool {
        self.recoveries.lock().sync(routing);
        false
    }

    fn apply_started_shards(
        &self,
        _deciders: &AllocationDeciders,
        started: &[ShardRouting],
        _routing: &mut RoutingNodes,
    ) {
        self.release_all(started, "started");
    }

    fn apply_failed_shards(
        &self,
        _deciders: &AllocationDeciders,
        failed: &[ShardRouting],
        _routing: &mut RoutingNodes,
    ) {
        self.release_all(failed, "failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::IndexMetaData;

    fn routing_with_initializing(copies: u32) -> RoutingNodes {
        let mut routing = RoutingNodes::new();
        routing.add_node("node-a").unwrap();
        routing
            .add_index(&IndexMetaData::new("test", copies, 0))
            .unwrap();
        let ids: Vec<u64> = routing.unassigned().iter().map(|s| s.copy_id).collect();
        for id in ids {
            routing.assign(id, "node-a").unwrap();
        }
        routing
    }

    #[test]
    fn test_throttles_at_node_limit() {
        let settings = AllocationSettings::default().node_concurrent_recoveries(2);
        let throttle = ThrottlingDecider::new(&settings);
        let mut routing = routing_with_initializing(2);
        routing.add_index(&IndexMetaData::new("other", 1, 0)).unwrap();

        let pending = routing.unassigned()[0].clone();
        let node = routing.node("node-a").unwrap();
        assert_eq!(throttle.can_allocate(&pending, node, &routing), Decision::Throttle);
        assert_eq!(throttle.in_flight_recoveries("node-a"), 2);
    }

    #[test]
    fn test_throttles_at_cluster_limit() {
        let settings = AllocationSettings::default()
            .node_concurrent_recoveries(10)
            .cluster_concurrent_recoveries(1);
        let throttle = ThrottlingDecider::new(&settings);
        let mut routing = routing_with_initializing(1);
        routing.add_node("node-b").unwrap();
        routing.add_index(&IndexMetaData::new("other", 1, 0)).unwrap();

        let pending = routing.unassigned()[0].clone();
        let node = routing.node("node-b").unwrap();
        assert_eq!(throttle.can_allocate(&pending, node, &routing), Decision::Throttle);
    }

    #[test]
    fn test_duplicate_started_notification_is_noop() {
        let throttle = ThrottlingDecider::new(&AllocationSettings::default());
        let deciders = AllocationDeciders::new();
        let mut routing = routing_with_initializing(2);
        throttle.rebuild(&routing);
        assert_eq!(throttle.in_flight_recoveries("node-a"), 2);

        let first = routing.node("node-a").unwrap().shards()[0].clone();
        routing.start(first.copy_id).unwrap();
        throttle.apply_started_shards(&deciders, std::slice::from_ref(&first), &mut routing);
        throttle.apply_started_shards(&deciders, std::slice::from_ref(&first), &mut routing);

        assert_eq!(throttle.in_flight_recoveries("node-a"), 1);
        assert_eq!(throttle.cluster_in_flight_recoveries(), 1);
    }

    #[test]
    fn test_failed_copy_releases_slot() {
        let throttle = ThrottlingDecider::new(&AllocationSettings::default());
        let deciders = AllocationDeciders::new();
        let mut routing = routing_with_initializing(1);
        throttle.rebuild(&routing);

        let copy = routing.node("node-a").unwrap().shards()[0].clone();
        routing.fail(copy.copy_id).unwrap();
        throttle.apply_failed_shards(&deciders, std::slice::from_ref(&copy), &mut routing);
        throttle.apply_failed_shards(&deciders, std::slice::from_ref(&copy), &mut routing);
        assert_eq!(throttle.in_flight_recoveries("node-a"), 0);
    }

    #[test]
    fn test_consult_after_assignment_sees_new_recovery() {
        let settings = AllocationSettings::default().node_concurrent_recoveries(1);
        let throttle = ThrottlingDecider::new(&settings);
        let mut routing = RoutingNodes::new();
        routing.add_node("node-a").unwrap();
        routing.add_index(&IndexMetaData::new("test", 2, 0)).unwrap();
        let ids: Vec<u64> = routing.unassigned().iter().map(|s| s.copy_id).collect();

        let second = routing.find_copy(ids[1]).cloned().unwrap();
        let node = routing.node("node-a").unwrap();
        assert_eq!(throttle.can_allocate(&second, node, &routing), Decision::Yes);
        assert_eq!(throttle.can_allocate(&second, node, &routing), Decision::Yes);

        routing.assign(ids[0], "node-a").unwrap();
        let node = routing.node("node-a").unwrap();
        assert_eq!(throttle.can_allocate(&second, node, &routing), Decision::Throttle);
        assert_eq!(throttle.in_flight_recoveries("node-a"), 1);
    }

    #[test]
    fn test_admitted_copy_is_not_throttled() {
        let settings = AllocationSettings::default().node_concurrent_recoveries(1);
        let throttle = ThrottlingDecider::new(&settings);
        let routing = routing_with_initializing(1);
        let copy = routing.node("node-a").unwrap().shards()[0].clone();
        let node = routing.node("node-a").unwrap();
        assert_eq!(throttle.can_allocate(&copy, node, &routing), Decision::Yes);
    }
}
