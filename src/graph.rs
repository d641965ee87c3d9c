//! Constraint graph for the CHM construction.
//!
//! Vertices are hash buckets, each key contributes one undirected edge whose
//! associated value is the key's desired index. Vertex-value assignment
//! succeeds exactly when the graph is acyclic.

/// Sentinel parent for traversal roots.
const NO_PARENT: usize = usize::MAX;

/// Undirected multigraph over `n` vertices with per-edge values.
///
/// Single-use: build the edges for one construction attempt, call
/// [`assign_vertex_values`](Graph::assign_vertex_values) once, then drop it.
#[derive(Debug)]
pub struct Graph {
    n: usize,
    /// Per vertex: `(neighbor, edge_value)` pairs.
    adjacent: Vec<Vec<(usize, usize)>>,
}

impl Graph {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            adjacent: vec![Vec::new(); n],
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Connect `vertex1` and `vertex2` with an edge carrying `edge_value`.
    /// Self-loops and parallel edges are representable; they make the graph
    /// cyclic and are reported by the assignment pass, not here.
    pub fn connect(&mut self, vertex1: usize, vertex2: usize, edge_value: usize) {
        self.adjacent[vertex1].push((vertex2, edge_value));
        self.adjacent[vertex2].push((vertex1, edge_value));
    }

    /// Try to assign every vertex a value in `[0, n)` such that each edge's
    /// endpoint values sum (mod `n`) to its edge value. Returns `None` when
    /// the graph contains a cycle, in which case no partial result is usable.
    ///
    /// Iterative traversal, every unvisited vertex becomes the root of its
    /// component with value 0. The adjacency entry pointing back at the
    /// vertex we just arrived from is skipped exactly once; any other
    /// already-visited neighbor is a cycle. Vertices with no edges keep 0,
    /// which satisfies no constraint and violates none.
    pub fn assign_vertex_values(&self) -> Option<Vec<usize>> {
        let mut values = vec![0usize; self.n];
        let mut visited = VisitedSet::new(self.n);
        // (parent, vertex) pairs still to expand.
        let mut tovisit: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.n {
            if visited.contains(root) {
                continue;
            }
            values[root] = 0;
            tovisit.push((NO_PARENT, root));

            while let Some((parent, vertex)) = tovisit.pop() {
                visited.insert(vertex);
                let mut skip = true;
                for &(neighbor, edge_value) in &self.adjacent[vertex] {
                    if skip && neighbor == parent {
                        // The edge we arrived by, not a back-edge.
                        skip = false;
                        continue;
                    }
                    if visited.contains(neighbor) {
                        return None;
                    }
                    tovisit.push((vertex, neighbor));
                    // Normalized so the subtraction stays in [0, n).
                    values[neighbor] =
                        (edge_value % self.n + self.n - values[vertex]) % self.n;
                }
            }
        }

        Some(values)
    }
}

/// Word-packed visited flags, one bit per vertex.
#[derive(Debug)]
struct VisitedSet {
    words: Vec<u64>,
}

impl VisitedSet {
    fn new(n: usize) -> Self {
        Self {
            words: vec![0; n.div_ceil(64)],
        }
    }

    #[inline]
    fn contains(&self, vertex: usize) -> bool {
        (self.words[vertex / 64] >> (vertex % 64)) & 1 == 1
    }

    #[inline]
    fn insert(&mut self, vertex: usize) {
        self.words[vertex / 64] |= 1u64 << (vertex % 64);
    }
}
