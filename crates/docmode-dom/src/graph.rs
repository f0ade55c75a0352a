//! Interface Graph
//!
//! Mode-specific view over the static interface tables.

use crate::interfaces::{
    descriptor, InterfaceDescriptor, MemberDescriptor, NamedConstructor, INTERFACES,
    NAMED_CONSTRUCTORS,
};
use crate::mode::DocumentMode;
use std::collections::HashMap;

/// Index of an interface within a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(u16);

impl InterfaceId {
    /// `Object`, always the first table entry
    pub const OBJECT: Self = Self(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One available interface
#[derive(Debug)]
pub struct GraphNode {
    pub id: InterfaceId,
    pub desc: &'static InterfaceDescriptor,
    pub parent: Option<InterfaceId>,
    /// Members available in this mode, including those folded in from
    /// unavailable ancestors
    pub members: Vec<&'static MemberDescriptor>,
}

impl GraphNode {
    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    pub fn own_member(&self, name: &str) -> Option<&'static MemberDescriptor> {
        self.members.iter().copied().find(|m| m.name == name)
    }
}

/// Interfaces and members visible in one document mode
#[derive(Debug)]
pub struct Graph {
    mode: DocumentMode,
    nodes: Vec<GraphNode>,
    by_name: HashMap<&'static str, InterfaceId>,
}

/// Build the interface graph for `mode`
pub fn build_graph(mode: DocumentMode) -> Graph {
    let v = mode.version();
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut by_name = HashMap::new();

    for desc in INTERFACES.iter().filter(|d| d.available(v)) {
        let mut members: Vec<&'static MemberDescriptor> =
            desc.members.iter().filter(|m| m.available(v)).collect();

        // Walk up until an available ancestor; skipped ancestors donate members
        let mut parent = None;
        let mut next = desc.parent;
        while let Some(name) = next {
            if let Some(&id) = by_name.get(name) {
                parent = Some(id);
                break;
            }
            let Some(skipped) = descriptor(name) else {
                break;
            };
            members.extend(skipped.members.iter().filter(|m| m.available(v)));
            next = skipped.parent;
        }

        let id = InterfaceId(nodes.len() as u16);
        by_name.insert(desc.name, id);
        nodes.push(GraphNode {
            id,
            desc,
            parent,
            members,
        });
    }

    tracing::trace!(mode = v, interfaces = nodes.len(), "interface graph built");
    Graph {
        mode,
        nodes,
        by_name,
    }
}

impl Graph {
    pub fn mode(&self) -> DocumentMode {
        self.mode
    }

    pub fn node(&self, id: InterfaceId) -> &GraphNode {
        &self.nodes[id.index()]
    }

    pub fn name(&self, id: InterfaceId) -> &'static str {
        self.node(id).desc.name
    }

    pub fn by_name(&self, name: &str) -> Option<InterfaceId> {
        self.by_name.get(name).copied()
    }

    pub fn interface_by_name(&self, name: &str) -> Option<&GraphNode> {
        self.by_name(name).map(|id| self.node(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// `id` followed by its ancestors, nearest first
    pub fn ancestors(&self, id: InterfaceId) -> impl Iterator<Item = InterfaceId> + '_ {
        std::iter::successors(Some(id), move |cur| self.node(*cur).parent)
    }

    pub fn implements(&self, class: InterfaceId, iface: InterfaceId) -> bool {
        self.ancestors(class).any(|a| a == iface)
    }

    pub fn implements_name(&self, class: InterfaceId, iface: &str) -> bool {
        self.by_name(iface)
            .is_some_and(|target| self.implements(class, target))
    }

    /// Nearest declaration of `name` on `class` or an ancestor
    pub fn find_member(
        &self,
        class: InterfaceId,
        name: &str,
    ) -> Option<(InterfaceId, &'static MemberDescriptor)> {
        self.ancestors(class)
            .find_map(|id| self.node(id).own_member(name).map(|m| (id, m)))
    }

    /// All members of `class` and its ancestors, nearest declaration wins
    pub fn flattened_members(
        &self,
        class: InterfaceId,
    ) -> Vec<(InterfaceId, &'static MemberDescriptor)> {
        let mut out: Vec<(InterfaceId, &'static MemberDescriptor)> = Vec::new();
        for id in self.ancestors(class) {
            for m in &self.node(id).members {
                if !out.iter().any(|(_, seen)| seen.name == m.name) {
                    out.push((id, m));
                }
            }
        }
        out
    }

    /// Interfaces reachable as `window.<Name>`
    pub fn globals(&self) -> impl Iterator<Item = &GraphNode> {
        let v = self.mode.version();
        self.nodes.iter().filter(move |n| n.desc.global_from <= v)
    }

    pub fn global(&self, name: &str) -> Option<InterfaceId> {
        self.interface_by_name(name)
            .filter(|n| n.desc.global_from <= self.mode.version())
            .map(|n| n.id)
    }

    /// Named constructors whose interface exists in this mode
    pub fn named_constructors(&self) -> impl Iterator<Item = &'static NamedConstructor> + '_ {
        NAMED_CONSTRUCTORS
            .iter()
            .filter(move |c| self.by_name(c.interface).is_some())
    }
}
