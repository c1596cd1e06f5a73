//! Graphviz rendering
//!
//! Every diagram is written as DOT text through a [`DotWriter`]. The load
//! balancer diagram is built from [`Render`] implementations on the entity
//! views; the network and reference diagrams are simple enough to walk
//! directly.
//!
//! # Module Structure
//!
//! - [`elb`] - load balancer topology: listeners, rules, target groups, hosts, DNS
//! - [`network`] - VPC and subnet nesting of instances
//! - [`refs`] - raw identifier references found in the dump

pub mod elb;
pub mod network;
pub mod refs;

use crate::bind::Topology;

/// Incremental DOT text builder with cluster nesting
pub struct DotWriter {
    out: String,
    depth: usize,
    edge_op: &'static str,
}

impl DotWriter {
    /// Directed graph
    pub fn digraph() -> Self {
        Self::open("digraph", "->")
    }

    /// Undirected graph
    pub fn graph() -> Self {
        Self::open("graph", "--")
    }

    fn open(kind: &str, edge_op: &'static str) -> Self {
        Self {
            out: format!("{} G {{\n", kind),
            depth: 1,
            edge_op,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// A raw statement such as `rankdir=LR`
    pub fn statement(&mut self, text: &str) {
        self.line(text);
    }

    pub fn node(&mut self, key: &str, attrs: &[(&str, &str)]) {
        if attrs.is_empty() {
            self.line(&quote(key));
            return;
        }
        let attrs: Vec<String> = attrs
            .iter()
            .map(|(name, value)| format!("{}={}", name, quote(value)))
            .collect();
        self.line(&format!("{} [ {} ]", quote(key), attrs.join(" ")));
    }

    pub fn edge(&mut self, from: &str, to: &str) {
        let text = format!("{} {} {}", quote(from), self.edge_op, quote(to));
        self.line(&text);
    }

    pub fn open_cluster(&mut self, key: &str, label: &str) {
        self.line(&format!("subgraph {} {{", quote(&format!("cluster_{}", key))));
        self.depth += 1;
        self.line(&format!("label={}", quote(label)));
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1).max(1);
        self.line("}");
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

/// Quote a DOT identifier or label
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Shared state for one diagram
pub struct RenderContext<'t, 'a> {
    pub topology: &'t Topology<'a>,
    pub show_all_hosts: bool,
}

/// Diagram participation of an entity
pub trait Render {
    /// Node statements, including any cluster this entity owns
    fn render_node(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter);

    /// Edges leaving this entity
    fn render_edges(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter);
}
