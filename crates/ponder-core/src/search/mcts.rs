//! Monte Carlo Tree Search over text continuations.
//!
//! Each iteration runs the four classic phases:
//! 1. **Selection**: descend from the root by UCB1 while the node has
//!    children
//! 2. **Expansion**: below `max_depth`, sample `expansion_width`
//!    continuations and descend into the first child
//! 3. **Simulation**: one rollout generation from the node's context;
//!    reward is `exp(mean(cumulative + rollout logprobs))`
//! 4. **Backpropagation**: bump visits and value on every node up to and
//!    including the root
//!
//! The final answer is the root child with the highest visit count (the
//! robust child), not the highest value — a single noisy rollout can
//! inflate a value, but not a visit count.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use super::algorithm::{Algorithm, AlgorithmResult};
use crate::backend::{GenerateParams, GenerationBackend};
use crate::error::{BackendError, Result};
use crate::scoring::logprob_score;

/// Configuration for MCTS.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Number of select/expand/simulate/backpropagate iterations.
    pub num_iterations: usize,
    /// Children created per expansion.
    pub expansion_width: usize,
    /// Exploration constant for UCB1.
    pub exploration_constant: f64,
    /// Maximum tree depth; at this depth nodes are simulated, not expanded.
    pub max_depth: usize,
    /// Tokens generated per expansion child.
    pub step_tokens: u32,
    /// Tokens generated per rollout.
    pub rollout_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_iterations: 10,
            expansion_width: 3,
            exploration_constant: std::f64::consts::SQRT_2,
            max_depth: 5,
            step_tokens: 50,
            rollout_tokens: 200,
            temperature: 0.8,
        }
    }
}

/// A node in the search tree arena.
#[derive(Debug)]
struct Node {
    /// This node's own generated increment.
    fragment: String,
    /// Cumulative log-probabilities from the root: the parent's, followed
    /// by this fragment's own.
    logprobs: Vec<f64>,
    /// Parent index, absent for the root.
    parent: Option<usize>,
    /// Child indices, in creation order.
    children: Vec<usize>,
    /// Edges to the root.
    depth: usize,
    /// Times this node was on a backpropagation path.
    visits: u32,
    /// Sum of rewards backpropagated through this node.
    total_value: f64,
}

impl Node {
    fn value(&self) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        self.total_value / self.visits as f64
    }
}

/// Index-addressed tree arena.
///
/// Nodes store a parent index and child indices instead of pointers, so
/// backpropagation is a walk-by-index loop and the tree size is just the
/// arena length. Nodes are never removed within a run; the whole arena
/// drops with the algorithm result.
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                fragment: String::new(),
                logprobs: Vec::new(),
                parent: None,
                children: Vec::new(),
                depth: 0,
                visits: 0,
                total_value: 0.0,
            }],
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    /// UCB1 of a node: `value + c * sqrt(ln(parent visits) / visits)`.
    /// An unvisited node scores +infinity so siblings are tried first.
    fn ucb1(&self, idx: usize, c: f64) -> f64 {
        let node = &self.nodes[idx];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let parent_visits = match node.parent {
            Some(parent) => self.nodes[parent].visits,
            None => node.visits,
        };
        let exploration = c * ((parent_visits as f64).ln() / node.visits as f64).sqrt();
        node.value() + exploration
    }

    /// Descend from the root by UCB1 while the current node has children.
    fn select(&self, c: f64) -> usize {
        let mut current = 0;
        while !self.nodes[current].children.is_empty() {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_child = self.nodes[current].children[0];
            for &child in &self.nodes[current].children {
                let score = self.ucb1(child, c);
                if score > best_score {
                    best_score = score;
                    best_child = child;
                }
            }
            current = best_child;
        }
        current
    }

    /// Append a child of `parent` owning `fragment` and its logprobs.
    fn add_child(&mut self, parent: usize, fragment: String, fragment_logprobs: &[f64]) -> usize {
        let mut logprobs = self.nodes[parent].logprobs.clone();
        logprobs.extend_from_slice(fragment_logprobs);
        let child = Node {
            fragment,
            logprobs,
            parent: Some(parent),
            children: Vec::new(),
            depth: self.nodes[parent].depth + 1,
            visits: 0,
            total_value: 0.0,
        };
        let idx = self.nodes.len();
        self.nodes.push(child);
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Cumulative text from the root down to `idx`.
    fn text_of(&self, idx: usize) -> String {
        let mut fragments = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            fragments.push(self.nodes[i].fragment.as_str());
            current = self.nodes[i].parent;
        }
        fragments.into_iter().rev().collect()
    }

    /// Bump visits and value on every node from `idx` up to the root.
    fn backpropagate(&mut self, idx: usize, reward: f64) {
        let mut current = Some(idx);
        while let Some(i) = current {
            self.nodes[i].visits += 1;
            self.nodes[i].total_value += reward;
            current = self.nodes[i].parent;
        }
    }

    /// Root child with the most visits; first-encountered wins ties.
    fn best_root_child(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for &child in &self.nodes[0].children {
            if best.map_or(true, |b| self.nodes[child].visits > self.nodes[b].visits) {
                best = Some(child);
            }
        }
        best
    }
}

/// Monte Carlo Tree Search implementation.
pub struct Mcts {
    backend: Arc<dyn GenerationBackend>,
    config: MctsConfig,
}

impl Mcts {
    /// Create an MCTS over `backend`.
    pub fn new(backend: Arc<dyn GenerationBackend>, config: MctsConfig) -> Self {
        Self { backend, config }
    }

    /// One rollout from `node`'s context; returns (reward, rollout tokens).
    fn simulate(&self, prompt: &str, tree: &Tree, node: usize) -> Result<(f64, usize)> {
        let params = GenerateParams {
            n: 1,
            temperature: self.config.temperature,
            max_tokens: self.config.rollout_tokens,
            logprobs: true,
            ..GenerateParams::default()
        };
        let gen = self
            .backend
            .generate(&format!("{prompt}{}", tree.text_of(node)), &params)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Protocol("empty rollout batch".to_string()))?;

        let mut all = tree.nodes[node].logprobs.clone();
        all.extend_from_slice(&gen.logprobs);
        Ok((logprob_score(&all), gen.logprobs.len()))
    }

    /// Full single-shot generation used when the root never grew children.
    fn fallback(&self, prompt: &str, total_tokens: usize) -> Result<AlgorithmResult> {
        let params = GenerateParams {
            n: 1,
            temperature: self.config.temperature,
            max_tokens: 512,
            logprobs: true,
            ..GenerateParams::default()
        };
        let gen = self
            .backend
            .generate(prompt, &params)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Protocol("empty generation batch".to_string()))?;

        let mut result = AlgorithmResult::new(self.name(), gen.text);
        result.total_tokens = total_tokens + gen.logprobs.len();
        result.record_logprobs(&gen.logprobs);
        Ok(result)
    }
}

impl Algorithm for Mcts {
    fn name(&self) -> &str {
        "MCTS"
    }

    fn run(&self, prompt: &str) -> Result<AlgorithmResult> {
        let mut tree = Tree::new();
        let mut total_tokens = 0usize;

        let expand_params = GenerateParams {
            n: self.config.expansion_width,
            temperature: self.config.temperature,
            max_tokens: self.config.step_tokens,
            logprobs: true,
            ..GenerateParams::default()
        };

        for iteration in 0..self.config.num_iterations {
            let mut node = tree.select(self.config.exploration_constant);

            if tree.nodes[node].depth < self.config.max_depth {
                let context = format!("{prompt}{}", tree.text_of(node));
                let mut first_child = None;
                for gen in self.backend.generate(&context, &expand_params)? {
                    total_tokens += gen.logprobs.len();
                    let child = tree.add_child(node, gen.text, &gen.logprobs);
                    first_child.get_or_insert(child);
                }
                if let Some(child) = first_child {
                    node = child;
                }
            }

            let (reward, rollout_tokens) = self.simulate(prompt, &tree, node)?;
            total_tokens += rollout_tokens;
            tree.backpropagate(node, reward);
            debug!(iteration, reward, nodes = tree.len(), "mcts iteration complete");
        }

        let best = match tree.best_root_child() {
            Some(best) => best,
            None => {
                debug!("root has no children, falling back to single generation");
                return self.fallback(prompt, total_tokens);
            }
        };

        let mut result = AlgorithmResult::new(self.name(), tree.text_of(best));
        result.score = tree.nodes[best].value();
        result.total_tokens = total_tokens;
        result
            .metadata
            .insert("iterations".to_string(), json!(self.config.num_iterations));
        result.metadata.insert("tree_size".to_string(), json!(tree.len()));
        result
            .metadata
            .insert("best_visits".to_string(), json!(tree.nodes[best].visits));
        result
            .metadata
            .insert("best_value".to_string(), json!(tree.nodes[best].value()));
        result.record_logprobs(&tree.nodes[best].logprobs);
        Ok(result)
    }
}
