use crate::interner::{AttrStores, InternKey};
use crate::models::{Afi, AttrSet, Safi};
use crate::session::PeerId;
use chrono::{DateTime, Utc};
use ipnet::IpNet;
use std::net::IpAddr;

/// One route learned from a peer: who sent it, under which family, and the
/// shared attribute set it carries.
///
/// The peer field is a lookup key, not an owning reference; the attribute
/// key holds one reference that is released when the entry is removed.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub peer: PeerId,
    pub afi: Afi,
    pub safi: Safi,
    pub attr: InternKey<AttrSet>,
    pub uptime: DateTime<Utc>,
}

/// Handle to a node inside one [RibTable]. Only meaningful for the table
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug)]
struct RibNode {
    prefix: IpNet,
    parent: Option<usize>,
    children: [Option<usize>; 2],
    /// Children present + routes attached + outstanding `node_get` locks.
    refcount: u32,
    routes: Vec<RouteInfo>,
}

/// Binary prefix trie for one (AFI, SAFI) pair.
///
/// Nodes live in an index arena, so parent/child links are indices rather
/// than owning pointers. Interior "glue" nodes carry no routes and exist
/// only to join divergent subtrees. A node whose refcount drops to zero has
/// no children, routes, or locks and is pruned toward the root.
pub struct RibTable {
    afi: Afi,
    safi: Safi,
    slots: Vec<Option<RibNode>>,
    free: Vec<usize>,
    root: Option<usize>,
}

impl RibTable {
    pub fn new(afi: Afi, safi: Safi) -> Self {
        RibTable {
            afi,
            safi,
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
        }
    }

    pub fn afi(&self) -> Afi {
        self.afi
    }

    pub fn safi(&self) -> Safi {
        self.safi
    }

    /// Find or create the node at `prefix`, creating any glue ancestors the
    /// trie needs. The returned node holds one lock that the caller must
    /// give back with [RibTable::unlock_node].
    pub fn node_get(&mut self, prefix: IpNet) -> NodeId {
        let prefix = prefix.trunc();
        let mut parent: Option<usize> = None;
        let mut cursor = self.root;

        while let Some(index) = cursor {
            let node_prefix = self.node(index).prefix;
            if node_prefix.prefix_len() <= prefix.prefix_len() && node_prefix.contains(&prefix) {
                if node_prefix.prefix_len() == prefix.prefix_len() {
                    self.node_mut(index).refcount += 1;
                    return NodeId(index);
                }
                parent = Some(index);
                cursor = self.node(index).children[bit_at(&prefix.addr(), node_prefix.prefix_len())];
            } else {
                break;
            }
        }

        let index = match cursor {
            // walked off the trie: hang a fresh leaf under the deepest cover
            None => {
                let node = self.alloc(prefix);
                self.attach(parent, node);
                node
            }
            Some(existing) => {
                let existing_prefix = self.node(existing).prefix;
                let common = common_prefix(&prefix, &existing_prefix);
                self.detach(parent, existing);
                if common.prefix_len() == prefix.prefix_len() {
                    // the requested prefix covers the node we collided with
                    let node = self.alloc(prefix);
                    self.attach(parent, node);
                    self.attach_child(node, existing);
                    node
                } else {
                    let glue = self.alloc(common);
                    self.attach(parent, glue);
                    self.attach_child(glue, existing);
                    let node = self.alloc(prefix);
                    self.attach_child(glue, node);
                    node
                }
            }
        };
        self.node_mut(index).refcount += 1;
        NodeId(index)
    }

    /// Longest-prefix match: the deepest node on the path to `addr` that
    /// carries at least one route. Takes no lock.
    pub fn node_match(&self, addr: &IpAddr) -> Option<NodeId> {
        let mut cursor = self.root;
        let mut best = None;
        while let Some(index) = cursor {
            let node = self.node(index);
            if !node.prefix.contains(addr) {
                break;
            }
            if !node.routes.is_empty() {
                best = Some(NodeId(index));
            }
            if node.prefix.prefix_len() >= self.afi.max_prefix_len() {
                break;
            }
            cursor = node.children[bit_at(addr, node.prefix.prefix_len())];
        }
        best
    }

    /// Prepend `info` to the node's route list.
    pub fn info_add(&mut self, node: NodeId, info: RouteInfo) {
        let node = self.node_mut(node.0);
        node.routes.insert(0, info);
        node.refcount += 1;
    }

    /// Remove the route at `pos`, releasing the attribute set it held.
    pub fn info_delete(&mut self, node: NodeId, pos: usize, stores: &mut AttrStores) {
        let info = self.node_mut(node.0).routes.remove(pos);
        stores.unintern_attrs(info.attr);
        self.unref(node.0);
    }

    /// Give back a lock taken by [RibTable::node_get]; prunes the node (and
    /// any emptied ancestors) when nothing references it anymore.
    pub fn unlock_node(&mut self, node: NodeId) {
        self.unref(node.0);
    }

    /// Position of the route matching (peer, afi, safi) in the node's list.
    pub fn route_position(
        &self,
        node: NodeId,
        peer: PeerId,
        afi: Afi,
        safi: Safi,
    ) -> Option<usize> {
        self.node(node.0)
            .routes
            .iter()
            .position(|ri| ri.peer == peer && ri.afi == afi && ri.safi == safi)
    }

    pub fn prefix(&self, node: NodeId) -> IpNet {
        self.node(node.0).prefix
    }

    pub fn routes(&self, node: NodeId) -> &[RouteInfo] {
        &self.node(node.0).routes
    }

    pub fn route_mut(&mut self, node: NodeId, pos: usize) -> &mut RouteInfo {
        &mut self.node_mut(node.0).routes[pos]
    }

    /// Drop every route and node, releasing all interned attribute sets.
    /// The table is ready for reuse afterwards.
    pub fn clear(&mut self, stores: &mut AttrStores) {
        for slot in self.slots.iter_mut() {
            if let Some(node) = slot.as_mut() {
                for info in node.routes.drain(..) {
                    stores.unintern_attrs(info.attr);
                }
            }
        }
        self.slots.clear();
        self.free.clear();
        self.root = None;
    }

    /// Number of live trie nodes, glue included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Number of routes across all nodes.
    pub fn route_count(&self) -> usize {
        self.slots.iter().flatten().map(|n| n.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Check that every node's refcount equals its children plus routes.
    /// Only holds when no `node_get` lock is outstanding.
    pub fn refcounts_balanced(&self) -> bool {
        self.slots.iter().flatten().all(|node| {
            let children = node.children.iter().flatten().count();
            node.refcount as usize == children + node.routes.len()
        })
    }

    fn alloc(&mut self, prefix: IpNet) -> usize {
        let node = RibNode {
            prefix,
            parent: None,
            children: [None, None],
            refcount: 0,
            routes: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                index
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn attach(&mut self, parent: Option<usize>, child: usize) {
        match parent {
            None => {
                self.node_mut(child).parent = None;
                self.root = Some(child);
            }
            Some(parent) => self.attach_child(parent, child),
        }
    }

    fn attach_child(&mut self, parent: usize, child: usize) {
        let bit = bit_at(
            &self.node(child).prefix.addr(),
            self.node(parent).prefix.prefix_len(),
        );
        let parent_node = self.node_mut(parent);
        debug_assert!(parent_node.children[bit].is_none());
        parent_node.children[bit] = Some(child);
        parent_node.refcount += 1;
        self.node_mut(child).parent = Some(parent);
    }

    fn detach(&mut self, parent: Option<usize>, child: usize) {
        if let Some(parent) = parent {
            let parent_node = self.node_mut(parent);
            for slot in parent_node.children.iter_mut() {
                if *slot == Some(child) {
                    *slot = None;
                }
            }
            parent_node.refcount -= 1;
        }
        self.node_mut(child).parent = None;
    }

    fn unref(&mut self, index: usize) {
        let node = self.node_mut(index);
        debug_assert!(node.refcount > 0);
        node.refcount -= 1;
        if node.refcount == 0 {
            self.prune(index);
        }
    }

    /// Free a dead node and walk up, freeing ancestors that emptied out.
    fn prune(&mut self, index: usize) {
        let mut index = index;
        loop {
            let node = self.slots[index].take().expect("live rib node");
            debug_assert!(node.routes.is_empty());
            debug_assert!(node.children.iter().all(Option::is_none));
            self.free.push(index);

            match node.parent {
                None => {
                    self.root = None;
                    break;
                }
                Some(parent) => {
                    let parent_node = self.node_mut(parent);
                    for slot in parent_node.children.iter_mut() {
                        if *slot == Some(index) {
                            *slot = None;
                        }
                    }
                    parent_node.refcount -= 1;
                    if parent_node.refcount == 0 {
                        index = parent;
                        continue;
                    }
                    break;
                }
            }
        }
    }

    fn node(&self, index: usize) -> &RibNode {
        self.slots[index].as_ref().expect("live rib node")
    }

    fn node_mut(&mut self, index: usize) -> &mut RibNode {
        self.slots[index].as_mut().expect("live rib node")
    }
}

/// The `index`-th bit of `addr`, counted from the most significant bit.
fn bit_at(addr: &IpAddr, index: u8) -> usize {
    let octet = (index / 8) as usize;
    let bit = 7 - (index % 8);
    let byte = match addr {
        IpAddr::V4(a) => a.octets()[octet],
        IpAddr::V6(a) => a.octets()[octet],
    };
    ((byte >> bit) & 1) as usize
}

/// The longest prefix covering both `a` and `b`.
fn common_prefix(a: &IpNet, b: &IpNet) -> IpNet {
    let max = a.prefix_len().min(b.prefix_len());
    let mut len = 0;
    while len < max && bit_at(&a.addr(), len) == bit_at(&b.addr(), len) {
        len += 1;
    }
    IpNet::new(a.addr(), len)
        .expect("common prefix length within family bounds")
        .trunc()
}
