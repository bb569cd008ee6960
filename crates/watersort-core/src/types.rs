//! Shared puzzle data model: colors, slots, bottles, gimmicks and moves.

use serde::{Deserialize, Serialize};

/// Palette index. `0` means empty/none; real colors are `1..=MAX_STORED_COLORS`.
pub type Color = u8;

/// Storage bound for palette indices.
pub const MAX_STORED_COLORS: usize = 20;

/// Largest palette the generator accepts; storage allows a little headroom.
pub const MAX_POLICY_COLORS: usize = 18;

/// One unit of liquid. A hidden slot carries a real color internally but
/// renders as unknown until it surfaces at the top of its bottle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub color: Color,
    pub hidden: bool,
}

impl Slot {
    pub fn visible(color: Color) -> Self {
        Self {
            color,
            hidden: false,
        }
    }
}

/// Per-bottle constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GimmickKind {
    #[default]
    None,
    /// Unusable until the target color has been completed in another bottle.
    Cloth,
    /// Never a pour source.
    Vine,
    /// Unusable unless an adjacent bottle is mono-full.
    Bush,
}

impl GimmickKind {
    /// Stable wire code used by the row boundary.
    pub fn code(self) -> u8 {
        match self {
            GimmickKind::None => 0,
            GimmickKind::Cloth => 1,
            GimmickKind::Vine => 2,
            GimmickKind::Bush => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GimmickKind::None),
            1 => Some(GimmickKind::Cloth),
            2 => Some(GimmickKind::Vine),
            3 => Some(GimmickKind::Bush),
            _ => None,
        }
    }
}

/// Bottle-level constraint. `cloth_target` is meaningful only for
/// [`GimmickKind::Cloth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gimmick {
    pub kind: GimmickKind,
    pub cloth_target: Color,
}

impl Gimmick {
    pub fn cloth(target: Color) -> Self {
        Self {
            kind: GimmickKind::Cloth,
            cloth_target: target,
        }
    }

    pub fn vine() -> Self {
        Self {
            kind: GimmickKind::Vine,
            cloth_target: 0,
        }
    }

    pub fn bush() -> Self {
        Self {
            kind: GimmickKind::Bush,
            cloth_target: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == GimmickKind::None
    }
}

/// An ordered stack of slots from bottom (index 0) to top, with a fixed
/// capacity and an optional gimmick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bottle {
    pub slots: Vec<Slot>,
    pub capacity: usize,
    pub gimmick: Gimmick,
}

impl Bottle {
    pub fn empty(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            gimmick: Gimmick::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn free_space(&self) -> usize {
        self.capacity.saturating_sub(self.slots.len())
    }

    /// Color of the top slot; `0` when the bottle is empty or the top is
    /// still hidden.
    pub fn top_color(&self) -> Color {
        match self.slots.last() {
            Some(slot) if !slot.hidden => slot.color,
            _ => 0,
        }
    }

    pub fn top_hidden(&self) -> bool {
        self.slots.last().is_some_and(|s| s.hidden)
    }

    /// Length of the contiguous same-color, non-hidden run at the top;
    /// `0` when empty or the top is hidden.
    pub fn top_chunk(&self) -> usize {
        let top = match self.slots.last() {
            Some(slot) if !slot.hidden && slot.color != 0 => slot.color,
            _ => return 0,
        };
        self.slots
            .iter()
            .rev()
            .take_while(|s| !s.hidden && s.color == top)
            .count()
    }

    /// Full to capacity with a single non-zero color.
    pub fn is_mono_full(&self) -> bool {
        if self.slots.len() != self.capacity || self.slots.is_empty() {
            return false;
        }
        let first = self.slots[0].color;
        first != 0 && self.slots.iter().all(|s| s.color == first)
    }

    /// Number of adjacent same-color groups, bottom to top.
    pub fn color_groups(&self) -> usize {
        let mut groups = 0;
        let mut prev = 0;
        for slot in &self.slots {
            if slot.color != prev {
                groups += 1;
                prev = slot.color;
            }
        }
        groups
    }

    /// Length of the run of `color` at the top, ignoring hidden flags.
    /// Used by the dealer's run-length constraint.
    pub(crate) fn top_run_of(&self, color: Color) -> usize {
        self.slots
            .iter()
            .rev()
            .take_while(|s| s.color == color)
            .count()
    }
}

/// Puzzle dimensions. The palette must fit the bottles: `num_colors` bottles'
/// worth of liquid plus at least one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub num_colors: usize,
    pub num_bottles: usize,
    pub capacity: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_colors: 6,
            num_bottles: 8,
            capacity: 4,
        }
    }
}

impl Params {
    pub fn new(num_colors: usize, num_bottles: usize, capacity: usize) -> Self {
        Self {
            num_colors,
            num_bottles,
            capacity,
        }
    }

    /// Total liquid units: `capacity` copies of each color.
    pub fn token_count(&self) -> usize {
        self.num_colors * self.capacity
    }

    pub fn is_valid(&self) -> bool {
        self.num_colors >= 1
            && self.num_colors <= MAX_POLICY_COLORS
            && self.num_colors <= self.num_bottles
            && self.num_bottles <= 30
            && (3..=50).contains(&self.capacity)
    }
}

/// One pour: `amount` slots off the top of `from` onto `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: usize,
    pub to: usize,
    pub amount: usize,
}

/// Qualitative difficulty band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifficultyLabel {
    VeryEasy,
    Easy,
    Normal,
    Hard,
    VeryHard,
}

impl DifficultyLabel {
    /// Band mapping: `[0,10)` Very Easy, `[10,25)` Easy, `[25,60)` Normal,
    /// `[60,72)` Hard, `[72,..]` Very Hard.
    pub fn for_score(score: f64) -> Self {
        if score < 10.0 {
            DifficultyLabel::VeryEasy
        } else if score < 25.0 {
            DifficultyLabel::Easy
        } else if score < 60.0 {
            DifficultyLabel::Normal
        } else if score < 72.0 {
            DifficultyLabel::Hard
        } else {
            DifficultyLabel::VeryHard
        }
    }
}

impl std::fmt::Display for DifficultyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifficultyLabel::VeryEasy => write!(f, "Very Easy"),
            DifficultyLabel::Easy => write!(f, "Easy"),
            DifficultyLabel::Normal => write!(f, "Normal"),
            DifficultyLabel::Hard => write!(f, "Hard"),
            DifficultyLabel::VeryHard => write!(f, "Very Hard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bottle(colors: &[Color], capacity: usize) -> Bottle {
        Bottle {
            slots: colors.iter().map(|&c| Slot::visible(c)).collect(),
            capacity,
            gimmick: Gimmick::default(),
        }
    }

    #[test]
    fn top_chunk_counts_contiguous_run() {
        let b = bottle(&[2, 1, 1, 1], 4);
        assert_eq!(b.top_color(), 1);
        assert_eq!(b.top_chunk(), 3);
    }

    #[test]
    fn top_chunk_zero_when_top_hidden() {
        let mut b = bottle(&[2, 1, 1], 4);
        b.slots.last_mut().unwrap().hidden = true;
        assert_eq!(b.top_color(), 0);
        assert_eq!(b.top_chunk(), 0);
    }

    #[test]
    fn hidden_slot_below_top_stops_the_chunk() {
        let mut b = bottle(&[1, 1, 1], 4);
        b.slots[1].hidden = true;
        assert_eq!(b.top_chunk(), 1);
    }

    #[test]
    fn mono_full_requires_full_capacity() {
        assert!(bottle(&[3, 3, 3], 3).is_mono_full());
        assert!(!bottle(&[3, 3], 3).is_mono_full());
        assert!(!bottle(&[3, 3, 2], 3).is_mono_full());
        assert!(!bottle(&[], 3).is_mono_full());
    }

    #[test]
    fn color_groups_counts_transitions() {
        assert_eq!(bottle(&[], 4).color_groups(), 0);
        assert_eq!(bottle(&[1, 1, 1], 4).color_groups(), 1);
        assert_eq!(bottle(&[1, 2, 2, 3], 4).color_groups(), 3);
    }

    #[test]
    fn label_band_boundaries() {
        assert_eq!(DifficultyLabel::for_score(0.0), DifficultyLabel::VeryEasy);
        assert_eq!(DifficultyLabel::for_score(9.99), DifficultyLabel::VeryEasy);
        assert_eq!(DifficultyLabel::for_score(10.0), DifficultyLabel::Easy);
        assert_eq!(DifficultyLabel::for_score(24.9), DifficultyLabel::Easy);
        assert_eq!(DifficultyLabel::for_score(25.0), DifficultyLabel::Normal);
        assert_eq!(DifficultyLabel::for_score(59.9), DifficultyLabel::Normal);
        assert_eq!(DifficultyLabel::for_score(60.0), DifficultyLabel::Hard);
        assert_eq!(DifficultyLabel::for_score(71.9), DifficultyLabel::Hard);
        assert_eq!(DifficultyLabel::for_score(72.0), DifficultyLabel::VeryHard);
        assert_eq!(DifficultyLabel::for_score(100.0), DifficultyLabel::VeryHard);
    }

    #[test]
    fn label_display_text() {
        assert_eq!(DifficultyLabel::VeryEasy.to_string(), "Very Easy");
        assert_eq!(DifficultyLabel::Normal.to_string(), "Normal");
        assert_eq!(DifficultyLabel::VeryHard.to_string(), "Very Hard");
    }

    #[test]
    fn gimmick_codes_round_trip() {
        for kind in [
            GimmickKind::None,
            GimmickKind::Cloth,
            GimmickKind::Vine,
            GimmickKind::Bush,
        ] {
            assert_eq!(GimmickKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(GimmickKind::from_code(4), None);
    }

    #[test]
    fn params_validity_bounds() {
        assert!(Params::default().is_valid());
        assert!(!Params::new(9, 8, 4).is_valid()); // more colors than bottles
        assert!(!Params::new(6, 8, 2).is_valid()); // capacity under 3
        assert!(!Params::new(19, 30, 4).is_valid()); // beyond palette policy
    }
}
