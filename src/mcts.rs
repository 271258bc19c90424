//! Model-guided Monte Carlo Tree Search.
//!
//! One simulation selects a path with PUCT, evaluates the reached leaf
//! through the model (or reads off the terminal outcome), and backs the
//! value up with a sign flip at every ply. After `power` simulations the
//! root visit counts become the improved policy.
//!
//! With a model advertising `ntasks > 1` the search keeps that many
//! traversals in flight, guarded by virtual losses, and evaluates their
//! leaves in one batched model call. Batched search trades the
//! determinism of the single-task loop for throughput: the final tree
//! depends on which traversals shared a batch.

use std::time::Instant;

use crate::config::SearchConfig;
use crate::game::Game;
use crate::model::{Evaluation, Model};
use crate::stats::SearchStatistics;
use crate::tree::{Tree, ROOT};
use crate::{utils, Error, Result};

/// Convenience entry point: the improved policy for one position.
///
/// Decided positions fail with [`Error::GameOver`]; a position with a
/// single legal action returns its one-hot immediately without running
/// any simulations.
pub fn search_policy<G: Game>(
    game: &G,
    model: &dyn Model<G>,
    config: &SearchConfig,
) -> Result<Vec<f32>> {
    if game.status().is_over() {
        return Err(Error::GameOver);
    }
    let legal = game.legal_actions();
    if legal.len() == 1 {
        let mut policy = vec![0.0; G::POLICY_LENGTH];
        policy[legal[0]] = 1.0;
        return Ok(policy);
    }
    let mut search = Search::new(game.clone(), model, config.clone())?;
    search.run()?;
    Ok(search.improved_policy())
}

/// One search: a tree, a borrowed model, and the simulation loop.
pub struct Search<'a, G: Game> {
    tree: Tree<G>,
    model: &'a dyn Model<G>,
    config: SearchConfig,
    statistics: SearchStatistics,
}

impl<'a, G: Game> Search<'a, G> {
    pub fn new(root: G, model: &'a dyn Model<G>, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Search {
            tree: Tree::new(root)?,
            model,
            config,
            statistics: SearchStatistics::new(),
        })
    }

    /// Runs simulations until `power` is exhausted or the deadline hits.
    ///
    /// The root is expanded once up front; every counted simulation then
    /// descends at least one ply. A model failure aborts the search and
    /// surfaces unrecovered.
    pub fn run(&mut self) -> Result<()> {
        let started = Instant::now();
        if !self.tree.root().expanded {
            let evaluation = self.model.apply(&self.tree.root().game)?;
            self.install_prior(ROOT, evaluation);
        }
        let tasks = self.model.ntasks().max(1);
        let mut done = 0;
        while done < self.config.power {
            if let Some(limit) = self.config.max_time {
                if started.elapsed() >= limit {
                    self.statistics.stopped_early = true;
                    break;
                }
            }
            done += if tasks == 1 {
                self.simulate()?;
                1
            } else {
                let want = tasks.min(self.config.power - done);
                self.simulate_concurrent(want)?
            };
        }
        self.statistics.simulations = done;
        self.statistics.tree_size = self.tree.len();
        self.statistics.total_time = started.elapsed();
        log::debug!("{}", self.statistics.summary());
        Ok(())
    }

    /// Visit-count distribution over the root actions, cooled by the
    /// configured temperature. Full policy length, zero on illegal
    /// actions.
    pub fn improved_policy(&self) -> Vec<f32> {
        let root = self.tree.root();
        let mut policy = vec![0.0; G::POLICY_LENGTH];
        if root.visit_total() == 0 {
            // Nothing simulated yet; fall back to the legal uniform.
            let weight = 1.0 / root.edges.len().max(1) as f32;
            for edge in &root.edges {
                policy[edge.action] = weight;
            }
            if root.edges.is_empty() {
                return utils::uniform_over(G::POLICY_LENGTH, &root.game.legal_actions());
            }
            return policy;
        }
        for edge in &root.edges {
            policy[edge.action] = edge.visits as f32;
        }
        utils::apply_temperature(&mut policy, self.config.temperature);
        policy
    }

    /// Root action with the highest visit count (ties: lowest index).
    pub fn best_action(&self) -> Result<usize> {
        let root = self.tree.root();
        if root.edges.is_empty() {
            return Err(Error::GameOver);
        }
        let mut best = &root.edges[0];
        for edge in &root.edges[1..] {
            if edge.visits > best.visits {
                best = edge;
            }
        }
        Ok(best.action)
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.statistics
    }

    pub fn tree(&self) -> &Tree<G> {
        &self.tree
    }

    /// One synchronous simulation: select, evaluate, back up.
    fn simulate(&mut self) -> Result<()> {
        let (path, leaf) = self.select(false)?;
        let value = {
            let node = self.tree.node(leaf);
            if node.is_terminal() {
                let value = node.status.value_for(node.to_move);
                self.tree.node_mut(leaf).expanded = true;
                value
            } else {
                let evaluation = self.model.apply(&node.game)?;
                let value = evaluation.value;
                self.install_prior(leaf, evaluation);
                value
            }
        };
        self.backup(&path, value, false);
        Ok(())
    }

    /// Up to `want` traversals carrying virtual losses, evaluated through
    /// one batched model call. Returns the number of completed
    /// simulations.
    fn simulate_concurrent(&mut self, want: usize) -> Result<usize> {
        let mut pending: Vec<(Vec<(usize, usize)>, usize)> = Vec::new();
        let mut finished = 0;
        for _ in 0..want {
            let (path, leaf) = self.select(true)?;
            let node = self.tree.node(leaf);
            if node.is_terminal() {
                // Terminal leaves need no evaluation.
                let value = node.status.value_for(node.to_move);
                self.tree.node_mut(leaf).expanded = true;
                self.backup(&path, value, true);
                finished += 1;
            } else {
                pending.push((path, leaf));
            }
        }
        if pending.is_empty() {
            return Ok(finished);
        }

        let games: Vec<G> = pending
            .iter()
            .map(|(_, leaf)| self.tree.node(*leaf).game.clone())
            .collect();
        let evaluations = match self.model.apply_batch(&games) {
            Ok(evaluations) => evaluations,
            Err(error) => {
                // Leave the tree consistent before surfacing the failure.
                for (path, _) in &pending {
                    self.revert_virtual(path);
                }
                return Err(error);
            }
        };

        for ((path, leaf), evaluation) in pending.into_iter().zip(evaluations) {
            let value = evaluation.value;
            if !self.tree.node(leaf).expanded {
                self.install_prior(leaf, evaluation);
            }
            // Traversals that piled onto the same leaf despite the
            // virtual loss back up their own evaluation of it.
            self.backup(&path, value, true);
            finished += 1;
        }
        Ok(finished)
    }

    /// Descends from the root until reaching a node that is unexpanded or
    /// terminal. Returns the traversed `(node, edge)` path and the leaf.
    fn select(&mut self, virtual_loss: bool) -> Result<(Vec<(usize, usize)>, usize)> {
        let mut path = Vec::new();
        let mut current = ROOT;
        loop {
            let node = self.tree.node(current);
            if !node.expanded || node.is_terminal() {
                break;
            }
            let edge_index = self.pick_edge(current);
            if virtual_loss {
                self.tree.node_mut(current).edges[edge_index].virtual_visits += 1;
            }
            path.push((current, edge_index));
            current = self.tree.descend(current, edge_index)?;
        }
        self.statistics.max_depth = self.statistics.max_depth.max(path.len());
        Ok((path, current))
    }

    /// PUCT: `Q + c * P * sqrt(total) / (1 + N)`. The strict comparison
    /// keeps the lowest action index on ties.
    fn pick_edge(&self, id: usize) -> usize {
        let node = self.tree.node(id);
        let sqrt_total = (node.visit_total() as f32).sqrt();
        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (index, edge) in node.edges.iter().enumerate() {
            let count = edge.visits + edge.virtual_visits;
            let score = edge.q(self.config.virtual_loss)
                + self.config.exploration * edge.prior * sqrt_total / (1.0 + count as f32);
            if score > best_score {
                best_score = score;
                best = index;
            }
        }
        best
    }

    /// Masks the evaluated policy to the legal actions, renormalizes, and
    /// installs it as the node's prior. The root prior is additionally
    /// diluted toward uniform.
    fn install_prior(&mut self, id: usize, evaluation: Evaluation) {
        let legal = self.tree.node(id).game.legal_actions();
        let mut prior = utils::masked_policy(&evaluation.policy, &legal);
        if id == ROOT && self.config.dilution > 0.0 {
            let dilution = self.config.dilution;
            let uniform = 1.0 / legal.len() as f32;
            for &action in &legal {
                prior[action] = (1.0 - dilution) * prior[action] + dilution * uniform;
            }
        }
        self.tree.expand(id, legal, &prior);
    }

    /// Walks the path leaf-to-root, flipping the value's sign at every ply
    /// so each edge accumulates it from its parent's perspective.
    fn backup(&mut self, path: &[(usize, usize)], mut value: f32, revert_virtual: bool) {
        for &(node, edge_index) in path.iter().rev() {
            value = -value;
            let edge = &mut self.tree.node_mut(node).edges[edge_index];
            if revert_virtual {
                edge.virtual_visits -= 1;
            }
            edge.visits += 1;
            edge.value_sum += value;
        }
    }

    fn revert_virtual(&mut self, path: &[(usize, usize)]) {
        for &(node, edge_index) in path {
            self.tree.node_mut(node).edges[edge_index].virtual_visits -= 1;
        }
    }
}
