use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::WorkflowError;

/// Graph structure for traversal and analysis.
///
/// Node iteration is sorted by id so scheduling and error messages are
/// deterministic. Duplicate edges are collapsed.
#[derive(Debug, Clone, Default)]
pub struct Graph {
  nodes: BTreeSet<String>,
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from nodes and edges. Every edge endpoint must be a node.
  pub fn new<I, S>(nodes: I, edges: &[(String, String)]) -> Result<Self, WorkflowError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut graph = Self::default();
    for node in nodes {
      graph.add_node(node);
    }
    for (from, to) in edges {
      graph.add_edge(from, to)?;
    }
    Ok(graph)
  }

  pub fn add_node(&mut self, node_id: impl Into<String>) {
    let node_id = node_id.into();
    self.adjacency.entry(node_id.clone()).or_default();
    self.reverse_adjacency.entry(node_id.clone()).or_default();
    self.nodes.insert(node_id);
  }

  /// Add a must-run-before edge. Returns `false` if it already existed.
  pub fn add_edge(&mut self, from: &str, to: &str) -> Result<bool, WorkflowError> {
    if !self.contains(from) || !self.contains(to) {
      return Err(WorkflowError::InvalidEdge {
        from: from.to_string(),
        to: to.to_string(),
      });
    }

    let downstream = self.adjacency.entry(from.to_string()).or_default();
    if downstream.iter().any(|d| d == to) {
      return Ok(false);
    }
    downstream.push(to.to_string());
    self
      .reverse_adjacency
      .entry(to.to_string())
      .or_default()
      .push(from.to_string());
    Ok(true)
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.nodes.contains(node_id)
  }

  /// All node ids, sorted.
  pub fn nodes(&self) -> impl Iterator<Item = &str> {
    self.nodes.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn in_degree(&self, node_id: &str) -> usize {
    self.upstream(node_id).len()
  }

  /// Nodes with no incoming edges.
  pub fn entry_points(&self) -> Vec<String> {
    self
      .nodes
      .iter()
      .filter(|id| self.upstream(id).is_empty())
      .cloned()
      .collect()
  }

  /// Nodes with no outgoing edges.
  pub fn terminal_nodes(&self) -> Vec<String> {
    self
      .nodes
      .iter()
      .filter(|id| self.downstream(id).is_empty())
      .cloned()
      .collect()
  }

  /// Kahn's algorithm. Fails with the offending cycle if the graph is cyclic.
  pub fn topological_order(&self) -> Result<Vec<String>, WorkflowError> {
    let mut in_degree: HashMap<&str, usize> = self
      .nodes
      .iter()
      .map(|id| (id.as_str(), self.in_degree(id)))
      .collect();

    let mut queue: VecDeque<&str> = self
      .nodes
      .iter()
      .map(String::as_str)
      .filter(|id| in_degree[id] == 0)
      .collect();

    let mut order = Vec::with_capacity(self.nodes.len());
    while let Some(node_id) = queue.pop_front() {
      order.push(node_id.to_string());
      for next in self.downstream(node_id) {
        if let Some(degree) = in_degree.get_mut(next.as_str()) {
          *degree -= 1;
          if *degree == 0 {
            queue.push_back(next.as_str());
          }
        }
      }
    }

    if order.len() == self.nodes.len() {
      return Ok(order);
    }

    let done: HashSet<&str> = order.iter().map(String::as_str).collect();
    let path = self.find_cycle(&done).unwrap_or_else(|| {
      self
        .nodes
        .iter()
        .filter(|id| !done.contains(id.as_str()))
        .cloned()
        .collect()
    });
    Err(WorkflowError::CycleDetected { path })
  }

  /// Fail if the graph contains any cycle, self-loops included.
  pub fn check_acyclic(&self) -> Result<(), WorkflowError> {
    self.topological_order().map(|_| ())
  }

  /// Walk the nodes Kahn's algorithm could not order and return one cycle,
  /// closed (first node repeated at the end).
  fn find_cycle(&self, done: &HashSet<&str>) -> Option<Vec<String>> {
    let mut visited: HashSet<&str> = HashSet::new();

    for start in self.nodes.iter().map(String::as_str) {
      if done.contains(start) || visited.contains(start) {
        continue;
      }

      let mut stack: Vec<&str> = Vec::new();
      let mut on_stack: HashSet<&str> = HashSet::new();
      if let Some(cycle) = self.dfs(start, done, &mut visited, &mut stack, &mut on_stack) {
        return Some(cycle);
      }
    }
    None
  }

  fn dfs<'a>(
    &'a self,
    node_id: &'a str,
    done: &HashSet<&str>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
    on_stack: &mut HashSet<&'a str>,
  ) -> Option<Vec<String>> {
    visited.insert(node_id);
    stack.push(node_id);
    on_stack.insert(node_id);

    for next in self.downstream(node_id) {
      let next = next.as_str();
      if done.contains(next) {
        continue;
      }
      if on_stack.contains(next) {
        let start = stack.iter().position(|id| *id == next).unwrap_or(0);
        let mut cycle: Vec<String> = stack[start..].iter().map(|id| id.to_string()).collect();
        cycle.push(next.to_string());
        return Some(cycle);
      }
      if !visited.contains(next) {
        if let Some(cycle) = self.dfs(next, done, visited, stack, on_stack) {
          return Some(cycle);
        }
      }
    }

    stack.pop();
    on_stack.remove(node_id);
    None
  }
}
