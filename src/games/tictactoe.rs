//! The 3x3 reference game.
//!
//! Small enough to solve by search alone, yet it exercises every part of
//! the engine: a tensor representation from the side-to-move perspective
//! and the full dihedral symmetry group for training-data amplification.

use std::fmt;

use crate::game::{Game, Player, Status};
use crate::{Error, Result};

/// The eight winning lines.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Source-index permutations for the eight symmetries of the square,
/// identity first: `transformed[i] = original[SYMMETRIES[s][i]]`.
const SYMMETRIES: [[usize; 9]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8], // identity
    [6, 3, 0, 7, 4, 1, 8, 5, 2], // quarter turn
    [8, 7, 6, 5, 4, 3, 2, 1, 0], // half turn
    [2, 5, 8, 1, 4, 7, 0, 3, 6], // three-quarter turn
    [2, 1, 0, 5, 4, 3, 8, 7, 6], // mirror columns
    [6, 7, 8, 3, 4, 5, 0, 1, 2], // mirror rows
    [0, 3, 6, 1, 4, 7, 2, 5, 8], // main diagonal
    [8, 5, 2, 7, 4, 1, 6, 3, 0], // anti diagonal
];

/// A Tic-Tac-Toe position.
///
/// Cells hold `+1` for [`Player::One`], `-1` for [`Player::Two`] and `0`
/// when empty; actions are cell indices in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicTacToe {
    cells: [i8; 9],
    to_move: Player,
}

impl TicTacToe {
    /// An empty board with [`Player::One`] to move.
    pub fn new() -> Self {
        TicTacToe {
            cells: [0; 9],
            to_move: Player::One,
        }
    }

    fn winner(&self) -> Option<Player> {
        for line in &LINES {
            let total: i8 = line.iter().map(|&i| self.cells[i]).sum();
            match total {
                3 => return Some(Player::One),
                -3 => return Some(Player::Two),
                _ => {}
            }
        }
        None
    }

    fn permuted(&self, map: &[usize; 9]) -> Self {
        let mut cells = [0; 9];
        for (target, &source) in map.iter().enumerate() {
            cells[target] = self.cells[source];
        }
        TicTacToe {
            cells,
            to_move: self.to_move,
        }
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for TicTacToe {
    const NAME: &'static str = "tictactoe";
    const SHAPE: (usize, usize, usize) = (3, 3, 1);
    const POLICY_LENGTH: usize = 9;

    fn status(&self) -> Status {
        if let Some(winner) = self.winner() {
            Status::Won(winner)
        } else if self.cells.iter().all(|&cell| cell != 0) {
            Status::Draw
        } else {
            Status::Undecided
        }
    }

    fn current_player(&self) -> Player {
        self.to_move
    }

    fn legal_actions(&self) -> Vec<usize> {
        if self.status().is_over() {
            return Vec::new();
        }
        (0..9).filter(|&i| self.cells[i] == 0).collect()
    }

    fn is_action_legal(&self, action: usize) -> bool {
        action < 9 && self.cells[action] == 0 && !self.status().is_over()
    }

    fn apply_action(&self, action: usize) -> Result<Self> {
        if self.status().is_over() {
            return Err(Error::GameOver);
        }
        if action >= 9 || self.cells[action] != 0 {
            return Err(Error::IllegalAction(action));
        }
        let mut next = self.clone();
        next.cells[action] = match self.to_move {
            Player::One => 1,
            Player::Two => -1,
        };
        next.to_move = self.to_move.opponent();
        Ok(next)
    }

    fn representation(&self) -> Vec<f32> {
        let sign = self.to_move.sign();
        self.cells.iter().map(|&cell| cell as f32 * sign).collect()
    }

    fn augment(&self, policy: &[f32]) -> Vec<(Self, Vec<f32>)> {
        SYMMETRIES
            .iter()
            .map(|map| {
                let game = self.permuted(map);
                let mut mirrored = vec![0.0; 9];
                for (target, &source) in map.iter().enumerate() {
                    mirrored[target] = policy[source];
                }
                (game, mirrored)
            })
            .collect()
    }
}

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  0 1 2")?;
        for row in 0..3 {
            write!(f, "{} ", row)?;
            for col in 0..3 {
                let symbol = match self.cells[row * 3 + col] {
                    1 => "X",
                    -1 => "O",
                    _ => ".",
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
