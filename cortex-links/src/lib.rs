//! # cortex-links
//!
//! The directed link graph over memories. Links live in `cortex-storage`'s
//! `memory_links` table; this crate adds bounded breadth-first traversal on
//! top, grounded on the reference implementation's `get_graph` — a plain SQL
//! walk is enough at this scale, so there's no graph-algorithms dependency
//! here.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use cortex_core::constants::{GRAPH_NODE_CONTENT_TRUNCATE, MAX_GRAPH_DEPTH};
use cortex_core::errors::CortexResult;
use cortex_core::memory::{Direction, LinkRelation, LinkedMemory};
use cortex_storage::{LinkOutcome, Store};

/// A node in a traversal result: enough of the memory to display without
/// forcing the caller back to the store for every node.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: i64,
    pub content: String,
    pub memory_type: String,
    pub importance: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source_id: i64,
    pub target_id: i64,
    pub relation: LinkRelation,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

pub struct LinkGraph {
    store: Arc<Store>,
}

impl LinkGraph {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn link(
        &self,
        source_id: i64,
        target_id: i64,
        relation: LinkRelation,
        metadata: serde_json::Value,
    ) -> CortexResult<LinkOutcome> {
        if source_id == target_id {
            return Err(cortex_core::CortexError::InvalidInput("a memory cannot link to itself".into()));
        }
        self.store.create_link(source_id, target_id, relation, &metadata)
    }

    /// Remove one edge by id. Idempotent: calling this twice on the same id
    /// returns `false` the second time.
    pub fn unlink(&self, link_id: i64) -> CortexResult<bool> {
        self.store.remove_link_by_id(link_id)
    }

    /// Edges adjacent to `memory_id` in `direction`, optionally narrowed to
    /// one `relation`, each carrying the linked memory's content. Ordered
    /// `created_at DESC`.
    pub fn links(&self, memory_id: i64, direction: Direction, relation: Option<LinkRelation>) -> CortexResult<Vec<LinkedMemory>> {
        self.store.links_for(memory_id, direction, relation)
    }

    /// Breadth-first walk starting at `root_id`, out to `depth` hops in
    /// either direction, clamped to `MAX_GRAPH_DEPTH`. Edges are deduped by
    /// `(source, target, relation)` and visited nodes are tracked so cycles
    /// terminate the walk rather than looping forever. Node content is
    /// truncated to `GRAPH_NODE_CONTENT_TRUNCATE` characters.
    pub fn graph(&self, root_id: i64, depth: usize) -> CortexResult<GraphResult> {
        let depth = depth.min(MAX_GRAPH_DEPTH);

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut visited: HashSet<i64> = HashSet::new();
        let mut seen_edges: HashSet<(i64, i64, LinkRelation)> = HashSet::new();
        let mut queue: VecDeque<(i64, usize)> = VecDeque::new();

        let Some(root) = self.store.peek(root_id)? else {
            return Ok(GraphResult { nodes, edges });
        };
        nodes.push(to_node(&root));
        visited.insert(root_id);
        queue.push_back((root_id, 0));

        while let Some((current_id, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }
            for link in self.store.neighbors(current_id)? {
                let edge_key = (link.source_id, link.target_id, link.relation);
                if seen_edges.contains(&edge_key) {
                    continue;
                }
                seen_edges.insert(edge_key);
                edges.push(GraphEdge {
                    source_id: link.source_id,
                    target_id: link.target_id,
                    relation: link.relation,
                });

                let next_id = if link.source_id == current_id { link.target_id } else { link.source_id };
                if visited.contains(&next_id) {
                    continue;
                }
                let Some(next_memory) = self.store.peek(next_id)? else {
                    continue;
                };
                visited.insert(next_id);
                nodes.push(to_node(&next_memory));
                queue.push_back((next_id, current_depth + 1));
            }
        }

        Ok(GraphResult { nodes, edges })
    }
}

fn to_node(memory: &cortex_core::memory::Memory) -> GraphNode {
    let mut content = memory.content.clone();
    if content.len() > GRAPH_NODE_CONTENT_TRUNCATE {
        content.truncate(GRAPH_NODE_CONTENT_TRUNCATE);
    }
    GraphNode {
        id: memory.id,
        content,
        memory_type: memory.memory_type.as_str().to_string(),
        importance: memory.importance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::memory::MemoryType;

    fn setup() -> (Arc<Store>, LinkGraph) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let graph = LinkGraph::new(Arc::clone(&store));
        (store, graph)
    }

    #[test]
    fn links_and_traverses_a_chain() {
        let (store, graph) = setup();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let b = store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let c = store.store("c", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        graph.link(a.id, b.id, LinkRelation::Related, serde_json::json!({})).unwrap();
        graph.link(b.id, c.id, LinkRelation::CausedBy, serde_json::json!({})).unwrap();

        let result = graph.graph(a.id, 5).unwrap();
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn cycles_terminate_the_walk() {
        let (store, graph) = setup();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let b = store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        graph.link(a.id, b.id, LinkRelation::Related, serde_json::json!({})).unwrap();
        graph.link(b.id, a.id, LinkRelation::Related, serde_json::json!({})).unwrap();

        let result = graph.graph(a.id, 5).unwrap();
        assert_eq!(result.nodes.len(), 2);
    }

    #[test]
    fn depth_is_clamped_to_max() {
        let (store, graph) = setup();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let result = graph.graph(a.id, 999).unwrap();
        assert_eq!(result.nodes.len(), 1);
    }

    #[test]
    fn self_link_is_rejected() {
        let (store, graph) = setup();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        assert!(graph.link(a.id, a.id, LinkRelation::Related, serde_json::json!({})).is_err());
    }

    #[test]
    fn unlink_by_id_is_idempotent() {
        let (store, graph) = setup();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let b = store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let link = graph.link(a.id, b.id, LinkRelation::CausedBy, serde_json::json!({})).unwrap();
        let again = graph.link(a.id, b.id, LinkRelation::CausedBy, serde_json::json!({})).unwrap();
        assert_eq!(link.id, again.id);
        assert!(!link.duplicate);
        assert!(again.duplicate);

        assert!(graph.unlink(link.id).unwrap());
        assert!(!graph.unlink(link.id).unwrap());
    }

    #[test]
    fn links_returns_linked_content_filtered_by_direction_and_relation() {
        let (store, graph) = setup();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let b = store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        graph.link(a.id, b.id, LinkRelation::Related, serde_json::json!({})).unwrap();
        graph.link(b.id, a.id, LinkRelation::CausedBy, serde_json::json!({})).unwrap();

        let outgoing = graph.links(a.id, Direction::Outgoing, None).unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].content, "b");

        let incoming_caused_by = graph.links(a.id, Direction::Incoming, Some(LinkRelation::CausedBy)).unwrap();
        assert_eq!(incoming_caused_by.len(), 1);

        let both = graph.links(a.id, Direction::Both, None).unwrap();
        assert_eq!(both.len(), 2);
    }
}
