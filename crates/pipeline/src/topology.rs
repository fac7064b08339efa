//! # Topology - Inspecting a Combinator Tree
//!
//! A pipeline is a value, so its structure can be examined before it runs.
//! [`Topology::of`] walks any tree of combinators and lays it out as a
//! `petgraph` directed graph:
//!
//! | Combinator                   | Vertices                           |
//! |------------------------------|------------------------------------|
//! | stage, source                | one vertex                         |
//! | pipe                         | none, just a `then` edge           |
//! | fork, unzip, `*_into`        | a split vertex and a join/collect vertex |
//! | for_each                     | a split vertex and a collect vertex |
//! | `*_async`                    | a split vertex and a handles vertex |
//!
//! Every combinator describes itself as a single-entry, single-exit
//! subgraph, so the whole tree has exactly one entry and one exit vertex.
//! [`Topology::validate`] checks that, and that the graph is acyclic.
//! Ownership already rules out cycles in a tree built from combinators; the
//! check matters for graphs reached through [`Topology::graph`] and edited
//! by other tools.
//!
//! [`Describe`] is purely structural. [`Topology::of`] lays out a tree even
//! if its stages could never be wired together at run time. Use
//! [`Topology::checked`] to also require that the tree is invocable with a
//! given argument bundle:
//!
//! ```compile_fail
//! use compositional_pipeline::stage::Spread;
//! use compositional_pipeline::{stage, Topology};
//!
//! fn pair(x: i32) -> (i32, i32) { (x, x) }
//!
//! // A pair cannot be fed to a stage taking one `String`.
//! let p = stage::<_, Spread>(pair) | stage::<_, Spread>(|s: String| s.len());
//! let _ = Topology::checked::<(i32,), _>(&p);
//! ```
//!
//! ```rust
//! use compositional_pipeline::stage::Spread;
//! use compositional_pipeline::{source, stage, Topology};
//!
//! let inc = stage::<_, Spread>(|x: i32| x + 1).named("inc");
//! let dbl = stage::<_, Spread>(|x: i32| x * 2).named("dbl");
//! let p = source(3) | (inc & dbl);
//! let topo = Topology::of(&p);
//!
//! assert_eq!(topo.node_count(), 5);
//! assert_eq!(topo.labels(), vec!["source", "fork", "join", "inc", "dbl"]);
//! topo.validate().unwrap();
//! ```

use std::fmt;

use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use crate::error::PipelineError;
use crate::for_each::{ForEach, ForEachAsync};
use crate::fork::{Fork, ForkAsync, ForkInto};
use crate::node::Node;
use crate::pipe::Pipe;
use crate::stage::{Source, Stage};
use crate::trace::Traced;
use crate::unzip::{Unzip, UnzipAsync, UnzipInto};

/// What a vertex stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Stage,
    Source,
    Fork,
    Unzip,
    ForEach,
    /// Merge point of a fork or unzip.
    Join,
    /// Ordered collection point of a homogeneous fan-out.
    Collect,
    /// Handles passed downstream without waiting.
    Handles,
}

/// A vertex of the topology graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub kind: VertexKind,
    pub label: String,
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// How two vertices are related.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Sequential composition.
    Then,
    /// A split vertex scheduling a branch.
    Spawn,
    /// A branch delivering its result to a join point.
    Join,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Then => write!(f, "then"),
            Flow::Spawn => write!(f, "spawn"),
            Flow::Join => write!(f, "join"),
        }
    }
}

/// Entry and exit vertex of a described subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub entry: NodeIndex,
    pub exit: NodeIndex,
}

/// A combinator tree that can lay itself out as a graph.
pub trait Describe {
    /// Add this subtree to `graph` and return where it starts and ends.
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span;
}

fn vertex(graph: &mut DiGraph<Vertex, Flow>, kind: VertexKind, label: impl Into<String>) -> NodeIndex {
    graph.add_node(Vertex {
        kind,
        label: label.into(),
    })
}

/// Static graph view of a combinator tree.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: DiGraph<Vertex, Flow>,
    span: Span,
}

impl Topology {
    /// Lay out `node` as a graph.
    pub fn of<N: Describe>(node: &N) -> Self {
        let mut graph = DiGraph::new();
        let span = node.describe(&mut graph);
        tracing::trace!(
            vertices = graph.node_count(),
            edges = graph.edge_count(),
            "topology built"
        );
        Self { graph, span }
    }

    /// Like [`of`](Self::of), but only for trees invocable with `Args`.
    pub fn checked<Args, N>(node: &N) -> Self
    where
        N: Node<Args> + Describe,
    {
        Self::of(node)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertex labels in insertion order.
    pub fn labels(&self) -> Vec<&str> {
        self.graph
            .node_weights()
            .map(|v| v.label.as_str())
            .collect()
    }

    /// Number of vertices of the given kind.
    pub fn count(&self, kind: VertexKind) -> usize {
        self.graph.node_weights().filter(|v| v.kind == kind).count()
    }

    /// The vertex where the pipeline starts.
    pub fn entry(&self) -> &Vertex {
        &self.graph[self.span.entry]
    }

    /// The vertex whose result the pipeline returns.
    pub fn exit(&self) -> &Vertex {
        &self.graph[self.span.exit]
    }

    /// The underlying graph.
    pub fn graph(&self) -> &DiGraph<Vertex, Flow> {
        &self.graph
    }

    /// Check the structural invariants of the tree.
    ///
    /// - the graph is acyclic,
    /// - the entry vertex has no incoming edges and the exit vertex no
    ///   outgoing ones,
    /// - every vertex is reachable from the entry.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Err(cycle) = toposort(&self.graph, None) {
            return Err(PipelineError::Topology {
                reason: format!(
                    "cycle through vertex '{}'",
                    self.graph[cycle.node_id()].label
                ),
            });
        }

        if self
            .graph
            .edges_directed(self.span.entry, Direction::Incoming)
            .next()
            .is_some()
        {
            return Err(PipelineError::Topology {
                reason: format!("entry vertex '{}' has incoming edges", self.entry().label),
            });
        }

        if let Some(edge) = self
            .graph
            .edges_directed(self.span.exit, Direction::Outgoing)
            .next()
        {
            return Err(PipelineError::Topology {
                reason: format!(
                    "exit vertex '{}' flows into '{}'",
                    self.exit().label,
                    self.graph[edge.target()].label
                ),
            });
        }

        let mut reached = 0;
        let mut dfs = Dfs::new(&self.graph, self.span.entry);
        while dfs.next(&self.graph).is_some() {
            reached += 1;
        }
        if reached != self.graph.node_count() {
            return Err(PipelineError::Topology {
                reason: format!(
                    "{} of {} vertices unreachable from the entry",
                    self.graph.node_count() - reached,
                    self.graph.node_count()
                ),
            });
        }

        Ok(())
    }

    /// Graphviz rendering.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topology({} vertices, {} edges, {} -> {})",
            self.node_count(),
            self.edge_count(),
            self.entry(),
            self.exit()
        )
    }
}

// ============================================================================
// Leaves
// ============================================================================

impl<C, B, M> Describe for Stage<C, B, M> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        let v = vertex(graph, VertexKind::Stage, self.label());
        Span { entry: v, exit: v }
    }
}

impl<T> Describe for Source<T> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        let v = vertex(graph, VertexKind::Source, "source");
        Span { entry: v, exit: v }
    }
}

// ============================================================================
// Sequential and wrappers
// ============================================================================

impl<A: Describe, B: Describe> Describe for Pipe<A, B> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        let first = self.first().describe(graph);
        let second = self.second().describe(graph);
        graph.add_edge(first.exit, second.entry, Flow::Then);
        Span {
            entry: first.entry,
            exit: second.exit,
        }
    }
}

impl<N: Describe, const ENABLED: bool> Describe for Traced<N, ENABLED> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        self.inner().describe(graph)
    }
}

// ============================================================================
// Split / join combinators
// ============================================================================

fn split_join<'a, I>(
    graph: &mut DiGraph<Vertex, Flow>,
    split: (VertexKind, &'static str),
    join: (VertexKind, &'static str),
    branches: I,
) -> Span
where
    I: IntoIterator<Item = &'a dyn Describe>,
{
    let entry = vertex(graph, split.0, split.1);
    let exit = vertex(graph, join.0, join.1);
    for branch in branches {
        let inner = branch.describe(graph);
        graph.add_edge(entry, inner.entry, Flow::Spawn);
        graph.add_edge(inner.exit, exit, Flow::Join);
    }
    Span { entry, exit }
}

macro_rules! impl_describe_tuple {
    ($ty:ident . $field:ident, $split:expr, $join:expr; $($s:ident $idx:tt),+) => {
        impl<$($s: Describe,)+> Describe for $ty<($($s,)+)> {
            fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
                let branches: Vec<&dyn Describe> = vec![$(&*self.$field.$idx as &dyn Describe,)+];
                split_join(graph, $split, $join, branches)
            }
        }
    };
}

macro_rules! impl_describe_all_arities {
    ($ty:ident . $field:ident, $split:expr, $join:expr) => {
        impl_describe_tuple!($ty.$field, $split, $join; S0 0);
        impl_describe_tuple!($ty.$field, $split, $join; S0 0, S1 1);
        impl_describe_tuple!($ty.$field, $split, $join; S0 0, S1 1, S2 2);
        impl_describe_tuple!($ty.$field, $split, $join; S0 0, S1 1, S2 2, S3 3);
        impl_describe_tuple!($ty.$field, $split, $join; S0 0, S1 1, S2 2, S3 3, S4 4);
        impl_describe_tuple!($ty.$field, $split, $join; S0 0, S1 1, S2 2, S3 3, S4 4, S5 5);
        impl_describe_tuple!(
            $ty.$field, $split, $join; S0 0, S1 1, S2 2, S3 3, S4 4, S5 5, S6 6
        );
        impl_describe_tuple!(
            $ty.$field, $split, $join; S0 0, S1 1, S2 2, S3 3, S4 4, S5 5, S6 6, S7 7
        );
    };
}

impl_describe_all_arities!(
    Fork.branches,
    (VertexKind::Fork, "fork"),
    (VertexKind::Join, "join")
);
impl_describe_all_arities!(
    ForkAsync.branches,
    (VertexKind::Fork, "fork_async"),
    (VertexKind::Handles, "handles")
);
impl_describe_all_arities!(
    Unzip.stages,
    (VertexKind::Unzip, "unzip"),
    (VertexKind::Join, "join")
);
impl_describe_all_arities!(
    UnzipAsync.stages,
    (VertexKind::Unzip, "unzip_async"),
    (VertexKind::Handles, "handles")
);

impl<N: Describe> Describe for ForkInto<N> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        let branches = self.branches.iter().map(|b| &**b as &dyn Describe);
        split_join(
            graph,
            (VertexKind::Fork, "fork_into"),
            (VertexKind::Collect, "collect"),
            branches,
        )
    }
}

impl<N: Describe> Describe for UnzipInto<N> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        let stages = self.stages.iter().map(|s| &**s as &dyn Describe);
        split_join(
            graph,
            (VertexKind::Unzip, "unzip_into"),
            (VertexKind::Collect, "collect"),
            stages,
        )
    }
}

impl<F: Describe> Describe for ForEach<F> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        split_join(
            graph,
            (VertexKind::ForEach, "for_each"),
            (VertexKind::Collect, "collect"),
            [&*self.stage as &dyn Describe],
        )
    }
}

impl<F: Describe> Describe for ForEachAsync<F> {
    fn describe(&self, graph: &mut DiGraph<Vertex, Flow>) -> Span {
        split_join(
            graph,
            (VertexKind::ForEach, "for_each_async"),
            (VertexKind::Handles, "handles"),
            [&*self.stage as &dyn Describe],
        )
    }
}
