//! Puzzle state: bottles plus the gimmick locks derived from them, pour
//! legality, and move application with the hidden-slot reveal rule.

use crate::types::{Bottle, Color, GimmickKind, Move, Params, Slot};
use serde::{Deserialize, Serialize};

/// Dynamic locks derived from gimmicks and current contents. A locked bottle
/// can be used neither as a pour source nor as a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locks {
    /// Bush bottles with no mono-full neighbor.
    pub bush_locked: Vec<bool>,
    /// Cloth bottles whose target color is not yet completed elsewhere.
    pub cloth_locked: Vec<bool>,
}

/// Full puzzle position. Mutated only through [`State::apply`], which keeps
/// the lock arrays in sync with the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub params: Params,
    pub bottles: Vec<Bottle>,
    pub locks: Locks,
}

impl State {
    /// Solved arrangement: the first `num_colors` bottles mono-full of colors
    /// `1..=N`, the rest empty.
    pub fn goal(params: Params) -> Self {
        let mut bottles: Vec<Bottle> = (0..params.num_bottles)
            .map(|_| Bottle::empty(params.capacity))
            .collect();
        for color in 1..=params.num_colors.min(params.num_bottles) {
            bottles[color - 1].slots = vec![Slot::visible(color as Color); params.capacity];
        }
        let mut state = Self {
            params,
            bottles,
            locks: Locks::default(),
        };
        state.refresh_locks();
        state
    }

    /// Recompute both lock arrays from scratch.
    ///
    /// A Cloth lock clears only once its target color is mono-full in some
    /// *other* bottle; a Bush lock clears while either direct neighbor is
    /// mono-full (missing neighbors count as not).
    pub fn refresh_locks(&mut self) {
        let n = self.bottles.len();
        self.locks.bush_locked = vec![false; n];
        self.locks.cloth_locked = vec![false; n];

        for i in 0..n {
            match self.bottles[i].gimmick.kind {
                GimmickKind::Cloth => {
                    let target = self.bottles[i].gimmick.cloth_target;
                    let completed = self.bottles.iter().enumerate().any(|(j, b)| {
                        j != i && b.is_mono_full() && b.slots[0].color == target
                    });
                    self.locks.cloth_locked[i] = !completed;
                }
                GimmickKind::Bush => {
                    let left = i > 0 && self.bottles[i - 1].is_mono_full();
                    let right = i + 1 < n && self.bottles[i + 1].is_mono_full();
                    self.locks.bush_locked[i] = !(left || right);
                }
                _ => {}
            }
        }
    }

    fn usable(&self, i: usize) -> bool {
        match self.bottles[i].gimmick.kind {
            GimmickKind::Cloth => !self.locks.cloth_locked[i],
            GimmickKind::Bush => !self.locks.bush_locked[i],
            _ => true,
        }
    }

    /// Movable chunk size for a pour, or `None` when the pour is illegal.
    pub fn can_pour(&self, from: usize, to: usize) -> Option<usize> {
        self.pour_amount(from, to, true)
    }

    /// Generation-only relaxed legality: identical to [`State::can_pour`]
    /// except the destination color match is dropped.
    pub(crate) fn can_pour_relaxed(&self, from: usize, to: usize) -> Option<usize> {
        self.pour_amount(from, to, false)
    }

    fn pour_amount(&self, from: usize, to: usize, match_color: bool) -> Option<usize> {
        if from == to || from >= self.bottles.len() || to >= self.bottles.len() {
            return None;
        }
        let src = &self.bottles[from];
        let dst = &self.bottles[to];

        // Vine can never be a source.
        if src.gimmick.kind == GimmickKind::Vine {
            return None;
        }
        if !self.usable(from) || !self.usable(to) {
            return None;
        }
        if src.is_empty() || dst.is_full() {
            return None;
        }
        let color = src.top_color();
        if color == 0 {
            return None;
        }
        if match_color && !dst.is_empty() && dst.top_color() != color {
            return None;
        }
        let amount = src.top_chunk().min(dst.free_space());
        (amount >= 1).then_some(amount)
    }

    /// Transfer `amount` top slots from `from` onto `to`, reveal the new tops
    /// of both bottles, and refresh locks. Illegal input is a silent no-op; a
    /// zero amount recomputes the movable chunk first.
    pub fn apply(&mut self, m: Move) {
        if m.from == m.to || m.from >= self.bottles.len() || m.to >= self.bottles.len() {
            return;
        }
        let amount = if m.amount == 0 {
            match self.can_pour(m.from, m.to) {
                Some(a) => a,
                None => return,
            }
        } else {
            m.amount
        };
        if amount > self.bottles[m.from].size() || amount > self.bottles[m.to].free_space() {
            return;
        }
        for _ in 0..amount {
            if let Some(mut slot) = self.bottles[m.from].slots.pop() {
                slot.hidden = false;
                self.bottles[m.to].slots.push(slot);
            }
        }
        // Reveal rule: whatever now sits at a top has been seen.
        if let Some(top) = self.bottles[m.from].slots.last_mut() {
            top.hidden = false;
        }
        if let Some(top) = self.bottles[m.to].slots.last_mut() {
            top.hidden = false;
        }
        self.refresh_locks();
    }

    /// Every non-empty bottle is mono-full.
    pub fn is_solved(&self) -> bool {
        self.bottles.iter().all(|b| b.is_empty() || b.is_mono_full())
    }

    /// All legal pours in `(from, to)` index order.
    pub fn legal_moves(&self) -> Vec<Move> {
        let n = self.bottles.len();
        let mut moves = Vec::new();
        for from in 0..n {
            for to in 0..n {
                if let Some(amount) = self.can_pour(from, to) {
                    moves.push(Move { from, to, amount });
                }
            }
        }
        moves
    }

    pub fn has_any_move(&self) -> bool {
        let n = self.bottles.len();
        (0..n).any(|from| (0..n).any(|to| self.can_pour(from, to).is_some()))
    }

    pub fn empty_bottle_count(&self) -> usize {
        self.bottles.iter().filter(|b| b.is_empty()).count()
    }

    pub fn mono_full_count(&self) -> usize {
        self.bottles.iter().filter(|b| b.is_mono_full()).count()
    }

    /// Clear every hidden flag. The solver searches on revealed contents.
    pub(crate) fn reveal_all(&mut self) {
        for bottle in &mut self.bottles {
            for slot in &mut bottle.slots {
                slot.hidden = false;
            }
        }
    }

    /// Per-color slot counts, indexed by color. Index 0 is unused. Legal
    /// play never changes this multiset.
    pub fn color_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; crate::types::MAX_STORED_COLORS + 1];
        for bottle in &self.bottles {
            for slot in &bottle.slots {
                counts[slot.color as usize] += 1;
            }
        }
        counts
    }

    /// Stable 64-bit content hash over capacities, slots (color, hidden) and
    /// gimmicks. Transposition key; collisions are tolerated by the search.
    pub fn content_hash(&self) -> u64 {
        const OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
        const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
        fn mix(h: u64, v: u64) -> u64 {
            h ^ v
                .wrapping_add(GAMMA)
                .wrapping_add(h << 6)
                .wrapping_add(h >> 2)
        }
        let mut h = OFFSET;
        for bottle in &self.bottles {
            h = mix(h, bottle.capacity as u64);
            for slot in &bottle.slots {
                let tag = if slot.hidden { 0xDEAD_BEEF } else { 0x1234_5678 };
                h = mix(h, ((slot.color as u64) << 1) ^ tag);
            }
            h ^= bottle.gimmick.kind.code() as u64;
            h ^= (bottle.gimmick.cloth_target as u64) << 32;
        }
        h
    }
}
