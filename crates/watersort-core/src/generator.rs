//! Map generation: templates, constrained mixed deals, reverse scrambles,
//! and solver-validated output records.

use crate::rng::Rng;
use crate::score::{estimate_difficulty, DifficultyBreakdown};
use crate::solver::Solver;
use crate::state::{Locks, State};
use crate::types::{Bottle, Color, DifficultyLabel, Gimmick, GimmickKind, Move, Params, Slot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attempts at re-dealing before the pre-solved-stack perturbation kicks in.
const MAX_DEAL_ATTEMPTS: usize = 64;

/// Random probes before a placement or swap search falls back to a sweep.
const PLACE_TRIES: usize = 64;

/// Knobs for one [`Generator`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenOptions {
    /// Inclusive range for the reverse-scramble length (`start_mixed = false` only).
    pub mix_min: usize,
    pub mix_max: usize,
    /// RNG seed; zero falls back to a fixed nonzero constant.
    pub seed: u64,
    /// Attempt budget for one `make_one` call.
    pub gimmick_placement_tries: usize,
    /// Per-attempt solver wall-clock budget in milliseconds.
    pub solve_time_ms: u64,
    /// Deal a mixed start honoring template heights instead of scrambling
    /// down from a goal arrangement.
    pub start_mixed: bool,
    /// Bottles left empty when no template dictates heights.
    pub reserved_empty: usize,
    /// Longest same-color run allowed while dealing (0 = unlimited).
    pub max_run_per_bottle: usize,
    /// Draw template heights randomly instead of filling left to right.
    pub randomize_heights: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            mix_min: 60,
            mix_max: 180,
            seed: 0xA17C_3B5E_CAFE_BEEF,
            gimmick_placement_tries: 30,
            solve_time_ms: 2500,
            start_mixed: true,
            reserved_empty: 2,
            max_run_per_bottle: 2,
            randomize_heights: false,
        }
    }
}

/// A validated, scored puzzle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generated {
    /// The start position handed to the player.
    pub state: State,
    /// Pre-scramble arrangement when a reverse scramble produced the start.
    pub scramble_start: Option<State>,
    pub mix_count: usize,
    pub min_moves: u32,
    pub diff_score: f64,
    pub diff_label: DifficultyLabel,
    pub scramble_moves: Vec<Move>,
    pub solution_moves: Vec<Move>,
    pub difficulty: DifficultyBreakdown,
}

/// Explicit bottom-to-top bottle contents overriding the built start.
/// Heights are taken as given; empty cells are simply absent.
pub type InitialDistribution = Vec<Vec<Color>>;

/// Template construction failures. `Display` is the operator-facing reason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("requested {requested} gimmicks but only {available} fillable bottles")]
    GimmickOverflow { requested: usize, available: usize },
    #[error("requested {requested} hidden slots but only {available} non-top slots allow them")]
    HiddenOverflow { requested: usize, available: usize },
}

/// A slot reserved before dealing so a gimmick can eventually unlock.
#[derive(Debug, Clone, Copy)]
struct SupportSeed {
    bottle: usize,
    color: Color,
}

/// Produces solvable, scored maps. Owns its RNG and is not safe for
/// concurrent use; parallel generation wants one instance per worker with
/// distinct seeds.
pub struct Generator {
    params: Params,
    opt: GenOptions,
    rng: Rng,
    base: Option<State>,
}

impl Generator {
    pub fn new(params: Params, opt: GenOptions) -> Self {
        let rng = Rng::seeded(opt.seed);
        Self {
            params,
            opt,
            rng,
            base: None,
        }
    }

    /// Attach a template whose heights, gimmicks and hidden slots future
    /// starts will honor. Read-only from here on.
    pub fn set_base(&mut self, base: State) {
        self.base = Some(base);
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn options(&self) -> &GenOptions {
        &self.opt
    }

    /// Construct a template: heights, a placeholder color deal, randomly
    /// placed gimmicks and hidden slots. The colors are placeholders; a start
    /// built from the template re-deals them.
    pub fn build_random_template(
        &mut self,
        cloth: usize,
        vine: usize,
        bush: usize,
        question_count: usize,
        question_max_per_bottle: Option<usize>,
    ) -> Result<State, TemplateError> {
        let heights = if self.opt.randomize_heights {
            self.random_heights()
        } else {
            self.default_heights()
        };

        let fillable: Vec<usize> = heights
            .iter()
            .enumerate()
            .filter(|(_, &h)| h > 0)
            .map(|(i, _)| i)
            .collect();
        let gimmick_count = cloth + vine + bush;
        if gimmick_count > fillable.len() {
            return Err(TemplateError::GimmickOverflow {
                requested: gimmick_count,
                available: fillable.len(),
            });
        }

        // Hidden slots may sit anywhere except a bottle's top slot.
        let allow_per_bottle = |height: usize| {
            let non_top = height.saturating_sub(1);
            match question_max_per_bottle {
                Some(cap) => non_top.min(cap),
                None => non_top,
            }
        };
        let allowed: usize = heights.iter().map(|&h| allow_per_bottle(h)).sum();
        if question_count > allowed {
            return Err(TemplateError::HiddenOverflow {
                requested: question_count,
                available: allowed,
            });
        }

        // Placeholder deal into the chosen heights.
        let mut state = self.blank_state();
        let mut bag = self.color_bag();
        self.rng.shuffle(&mut bag);
        let mut tokens = bag.into_iter();
        for (i, &height) in heights.iter().enumerate() {
            for _ in 0..height {
                if let Some(color) = tokens.next() {
                    state.bottles[i].slots.push(Slot::visible(color));
                }
            }
        }

        // Gimmicks on distinct non-empty bottles.
        let mut pool = fillable;
        self.rng.shuffle(&mut pool);
        let chosen = &pool[..gimmick_count];
        let (cloth_bottles, rest) = chosen.split_at(cloth);
        let (vine_bottles, bush_bottles) = rest.split_at(vine);
        for &i in cloth_bottles {
            let target = self.rng.irange(1, self.params.num_colors) as Color;
            state.bottles[i].gimmick = Gimmick::cloth(target);
        }
        for &i in vine_bottles {
            state.bottles[i].gimmick = Gimmick::vine();
            // A vine bottle never pours out, so its contents must be mono.
            let fixed = state.bottles[i].slots[0].color;
            for slot in &mut state.bottles[i].slots {
                slot.color = fixed;
            }
        }
        for &i in bush_bottles {
            state.bottles[i].gimmick = Gimmick::bush();
        }

        // Hidden slots: uniform over non-top positions, honoring the cap.
        let mut positions: Vec<(usize, usize)> = Vec::new();
        for (i, &height) in heights.iter().enumerate() {
            for k in 0..height.saturating_sub(1) {
                positions.push((i, k));
            }
        }
        self.rng.shuffle(&mut positions);
        let mut taken = vec![0usize; self.params.num_bottles];
        let mut placed = 0usize;
        for (i, k) in positions {
            if placed == question_count {
                break;
            }
            if let Some(cap) = question_max_per_bottle {
                if taken[i] >= cap {
                    continue;
                }
            }
            state.bottles[i].slots[k].hidden = true;
            taken[i] += 1;
            placed += 1;
        }

        state.refresh_locks();
        Ok(state)
    }

    /// One generation attempt loop: build a start, scramble when configured,
    /// validate through the solver, score, and emit. `None` once the try
    /// budget is exhausted.
    pub fn make_one(&mut self, initial: Option<&InitialDistribution>) -> Option<Generated> {
        for _ in 0..self.opt.gimmick_placement_tries.max(1) {
            let mut state = self.create_start_from_initial(initial);
            let mut scramble_start = None;
            let mut scramble_moves = Vec::new();
            let mix_count;
            if self.opt.start_mixed {
                // Nominal mix strength for dealt starts.
                mix_count = self.params.token_count();
            } else {
                scramble_start = Some(state.clone());
                scramble_moves = self.scramble(&mut state);
                mix_count = scramble_moves.len();
            }

            if !state.has_any_move() {
                continue;
            }

            let solver = Solver::new(self.opt.solve_time_ms);
            let mut result = solver.solve(&state);
            if !result.solved {
                continue;
            }
            let score = estimate_difficulty(&state, &mut result);
            return Some(Generated {
                state,
                scramble_start,
                mix_count,
                min_moves: result.min_moves,
                diff_score: score,
                diff_label: DifficultyLabel::for_score(score),
                scramble_moves,
                solution_moves: result.solution_moves,
                difficulty: result.difficulty,
            });
        }
        None
    }

    // ==================== start construction ====================

    fn create_start_from_initial(&mut self, initial: Option<&InitialDistribution>) -> State {
        if let Some(dist) = initial {
            let mut state = match &self.base {
                Some(base) => base.clone(),
                None => State::goal(self.params),
            };
            for (i, contents) in dist.iter().enumerate() {
                if i >= state.bottles.len() {
                    break;
                }
                state.bottles[i].capacity = self.params.capacity;
                state.bottles[i].slots = contents.iter().map(|&c| Slot::visible(c)).collect();
            }
            state.refresh_locks();
            return state;
        }

        if self.opt.start_mixed {
            return match self.base.clone() {
                Some(template) => self.create_random_mixed_from_template(&template),
                None => {
                    let heights = if self.opt.randomize_heights {
                        self.random_heights()
                    } else {
                        self.default_heights()
                    };
                    let gimmicks = vec![Gimmick::default(); self.params.num_bottles];
                    self.create_random_mixed_with_heights(&heights, &gimmicks, None)
                }
            };
        }

        match &self.base {
            Some(template) => {
                // Goal colors with the template's gimmicks and hidden flags.
                let mut state = State::goal(self.params);
                for (i, tb) in template.bottles.iter().enumerate() {
                    if i >= state.bottles.len() {
                        break;
                    }
                    state.bottles[i].gimmick = tb.gimmick;
                    for (k, ts) in tb.slots.iter().enumerate() {
                        if let Some(slot) = state.bottles[i].slots.get_mut(k) {
                            slot.hidden = ts.hidden;
                        }
                    }
                }
                state.refresh_locks();
                state
            }
            None => State::goal(self.params),
        }
    }

    fn blank_state(&self) -> State {
        State {
            params: self.params,
            bottles: (0..self.params.num_bottles)
                .map(|_| Bottle::empty(self.params.capacity))
                .collect(),
            locks: Locks::default(),
        }
    }

    fn color_bag(&self) -> Vec<Color> {
        let mut bag = Vec::with_capacity(self.params.token_count());
        for color in 1..=self.params.num_colors {
            for _ in 0..self.params.capacity {
                bag.push(color as Color);
            }
        }
        bag
    }

    /// Deterministic heights: fill left to right, a capacity at a time.
    fn default_heights(&self) -> Vec<usize> {
        let mut need = self.params.token_count();
        (0..self.params.num_bottles)
            .map(|_| {
                let take = need.min(self.params.capacity);
                need -= take;
                take
            })
            .collect()
    }

    /// Random heights over `num_bottles - reserved_empty` bottles, summing to
    /// the token count.
    fn random_heights(&mut self) -> Vec<usize> {
        let n = self.params.num_bottles;
        let fillable = n
            .saturating_sub(self.opt.reserved_empty)
            .max(self.params.num_colors)
            .clamp(1, n);
        let mut indices: Vec<usize> = (0..n).collect();
        self.rng.shuffle(&mut indices);
        indices.truncate(fillable);

        let mut heights = vec![0usize; n];
        let mut need = self.params.token_count();
        while need > 0 {
            let i = indices[self.rng.irange(0, indices.len() - 1)];
            if heights[i] < self.params.capacity {
                heights[i] += 1;
                need -= 1;
            }
        }
        heights
    }

    fn heights_from_template(&self, template: &State) -> Vec<usize> {
        let mut heights = vec![0usize; self.params.num_bottles];
        for (i, bottle) in template.bottles.iter().enumerate() {
            if i >= heights.len() {
                break;
            }
            heights[i] = bottle.size().min(self.params.capacity);
        }
        if heights.iter().sum::<usize>() != self.params.token_count() {
            // Mismatched template sums fall back to the safe default.
            return self.default_heights();
        }
        heights
    }

    fn create_random_mixed_from_template(&mut self, template: &State) -> State {
        let heights = self.heights_from_template(template);
        let mut gimmicks = vec![Gimmick::default(); self.params.num_bottles];
        for (i, bottle) in template.bottles.iter().enumerate() {
            if i < gimmicks.len() {
                gimmicks[i] = bottle.gimmick;
            }
        }
        self.create_random_mixed_with_heights(&heights, &gimmicks, Some(template))
    }

    /// Deal a mixed start into the given heights, re-dealing while the result
    /// contains a pre-solved stack and perturbing as a last resort.
    fn create_random_mixed_with_heights(
        &mut self,
        heights: &[usize],
        gimmicks: &[Gimmick],
        template: Option<&State>,
    ) -> State {
        let mut state = self.deal_candidate(heights, gimmicks, template);
        let mut attempts = 1;
        while Self::has_pre_solved_stack(&state) && attempts < MAX_DEAL_ATTEMPTS {
            state = self.deal_candidate(heights, gimmicks, template);
            attempts += 1;
        }
        if Self::has_pre_solved_stack(&state) {
            for _ in 0..3 {
                self.break_pre_solved_stacks(&mut state);
                if !Self::has_pre_solved_stack(&state) {
                    break;
                }
            }
        }
        state.refresh_locks();
        state
    }

    fn has_pre_solved_stack(state: &State) -> bool {
        // Vine bottles are mono by construction and stay put; only other
        // mono-full stacks count as pre-solved.
        state
            .bottles
            .iter()
            .any(|b| b.is_mono_full() && b.gimmick.kind != GimmickKind::Vine)
    }

    fn deal_candidate(
        &mut self,
        heights: &[usize],
        gimmicks: &[Gimmick],
        template: Option<&State>,
    ) -> State {
        let mut state = self.blank_state();
        for (i, gimmick) in gimmicks.iter().enumerate() {
            if i < state.bottles.len() {
                state.bottles[i].gimmick = *gimmick;
            }
        }

        let mut bag = self.color_bag();

        // Support plan first: seed slots that keep gimmicks unlockable.
        let seeds = self.build_support_plan(heights, gimmicks);
        for seed in &seeds {
            if let Some(pos) = bag.iter().position(|&c| c == seed.color) {
                bag.swap_remove(pos);
                state.bottles[seed.bottle].slots.push(Slot::visible(seed.color));
            }
        }
        self.rng.shuffle(&mut bag);

        for color in bag {
            self.place_token(&mut state, heights, color);
        }

        // Seeds land at the bottom deterministically; shuffle them inward.
        for seed in &seeds {
            let bottle = &mut state.bottles[seed.bottle];
            if bottle.size() > 1 {
                let j = self.rng.irange(0, bottle.size() - 1);
                bottle.slots.swap(0, j);
            }
        }

        self.fix_cloth_start(&mut state);

        if let Some(template) = template {
            Self::overlay_hidden(&mut state, template);
        }
        state.refresh_locks();
        state
    }

    fn place_token(&mut self, state: &mut State, heights: &[usize], color: Color) {
        let n = state.bottles.len();
        for _ in 0..PLACE_TRIES {
            let i = self.rng.irange(0, n - 1);
            if self.placement_ok(state, heights, i, color, true) {
                state.bottles[i].slots.push(Slot::visible(color));
                return;
            }
        }
        // Relax the run-length constraint but keep gimmick legality.
        for i in 0..n {
            if self.placement_ok(state, heights, i, color, false) {
                state.bottles[i].slots.push(Slot::visible(color));
                return;
            }
        }
        // Last resort: any bottle with room below its target height.
        for i in 0..n {
            if state.bottles[i].size() < heights[i] {
                state.bottles[i].slots.push(Slot::visible(color));
                return;
            }
        }
    }

    fn placement_ok(
        &self,
        state: &State,
        heights: &[usize],
        i: usize,
        color: Color,
        enforce_run: bool,
    ) -> bool {
        let bottle = &state.bottles[i];
        if bottle.size() >= heights[i] {
            return false;
        }
        match bottle.gimmick.kind {
            // A cloth bottle must not start with its own target inside.
            GimmickKind::Cloth if bottle.gimmick.cloth_target == color => return false,
            GimmickKind::Vine => {
                // A vine only ever accepts its fixed color; mixed contents
                // poison it for further placement.
                if let Some(first) = bottle.slots.first() {
                    let fixed = first.color;
                    if bottle.slots.iter().any(|s| s.color != fixed) || color != fixed {
                        return false;
                    }
                }
            }
            _ => {}
        }
        if enforce_run
            && self.opt.max_run_per_bottle > 0
            && bottle.top_run_of(color) >= self.opt.max_run_per_bottle
        {
            return false;
        }
        true
    }

    /// Reservations that keep Cloth and Bush unlockable: each Cloth wants its
    /// target color hosted in a full-height bottle elsewhere, each Bush wants
    /// a full-height neighbor that can go mono.
    fn build_support_plan(&mut self, heights: &[usize], gimmicks: &[Gimmick]) -> Vec<SupportSeed> {
        let capacity = self.params.capacity;
        let n = heights.len();
        let full_height: Vec<usize> = (0..n).filter(|&i| heights[i] == capacity).collect();

        let mut seeds: Vec<SupportSeed> = Vec::new();
        let mut reserved: Vec<usize> = Vec::new();
        let mut used_colors: Vec<Color> = Vec::new();

        let host_ok = |i: usize, color: Color, reserved: &[usize]| {
            i < n && heights[i] == capacity
                && !reserved.contains(&i)
                && !(gimmicks[i].kind == GimmickKind::Cloth && gimmicks[i].cloth_target == color)
        };

        for (i, gimmick) in gimmicks.iter().enumerate() {
            match gimmick.kind {
                GimmickKind::Cloth => {
                    let target = gimmick.cloth_target;
                    let mut candidates = vec![i];
                    if target >= 1 {
                        candidates.push(target as usize - 1);
                    }
                    candidates.extend(full_height.iter().copied());
                    if let Some(host) = candidates
                        .into_iter()
                        .find(|&b| host_ok(b, target, &reserved))
                    {
                        reserved.push(host);
                        used_colors.push(target);
                        seeds.push(SupportSeed {
                            bottle: host,
                            color: target,
                        });
                    }
                }
                GimmickKind::Bush => {
                    let left = i.checked_sub(1);
                    let right = (i + 1 < n).then_some(i + 1);
                    let neighbor = [left, right]
                        .into_iter()
                        .flatten()
                        .find(|&b| heights[b] == capacity && !reserved.contains(&b));
                    let Some(host) = neighbor else { continue };

                    let mut palette: Vec<Color> =
                        (1..=self.params.num_colors as Color).collect();
                    self.rng.shuffle(&mut palette);
                    let color = palette.into_iter().find(|c| {
                        !used_colors.contains(c)
                            && !(gimmicks[host].kind == GimmickKind::Cloth
                                && gimmicks[host].cloth_target == *c)
                    });
                    if let Some(color) = color {
                        reserved.push(host);
                        used_colors.push(color);
                        seeds.push(SupportSeed {
                            bottle: host,
                            color,
                        });
                    }
                }
                _ => {}
            }
        }
        seeds
    }

    /// Safety pass: no cloth bottle may start with its target color inside.
    /// Each offending slot is swapped once with a non-target slot elsewhere.
    fn fix_cloth_start(&mut self, state: &mut State) {
        for i in 0..state.bottles.len() {
            if state.bottles[i].gimmick.kind != GimmickKind::Cloth {
                continue;
            }
            let target = state.bottles[i].gimmick.cloth_target;
            for k in 0..state.bottles[i].size() {
                if state.bottles[i].slots[k].color != target {
                    continue;
                }
                if let Some((j, l)) = self.find_swap_partner(state, i, target) {
                    let other = state.bottles[j].slots[l].color;
                    state.bottles[i].slots[k].color = other;
                    state.bottles[j].slots[l].color = target;
                }
            }
        }
    }

    /// A slot in another bottle that can absorb `target` without breaking
    /// that bottle's own constraints.
    fn find_swap_partner(
        &mut self,
        state: &State,
        cloth: usize,
        target: Color,
    ) -> Option<(usize, usize)> {
        let n = state.bottles.len();
        let acceptable = |j: usize, l: usize| {
            let bottle = &state.bottles[j];
            j != cloth
                && bottle.gimmick.kind != GimmickKind::Vine
                && !(bottle.gimmick.kind == GimmickKind::Cloth
                    && bottle.gimmick.cloth_target == target)
                && bottle.slots[l].color != target
        };
        for _ in 0..PLACE_TRIES {
            let j = self.rng.irange(0, n - 1);
            if j == cloth || state.bottles[j].is_empty() {
                continue;
            }
            let l = self.rng.irange(0, state.bottles[j].size() - 1);
            if acceptable(j, l) {
                return Some((j, l));
            }
        }
        for j in 0..n {
            for l in 0..state.bottles[j].size() {
                if acceptable(j, l) {
                    return Some((j, l));
                }
            }
        }
        None
    }

    fn overlay_hidden(state: &mut State, template: &State) {
        for (bottle, tb) in state.bottles.iter_mut().zip(&template.bottles) {
            for (slot, ts) in bottle.slots.iter_mut().zip(&tb.slots) {
                slot.hidden = ts.hidden;
            }
        }
    }

    /// Perturb away mono-full stacks a re-deal could not avoid: swap one slot
    /// with a differently-colored slot elsewhere without creating a new
    /// mono-full on either side; swap tops as a last resort.
    fn break_pre_solved_stacks(&mut self, state: &mut State) {
        let n = state.bottles.len();
        for i in 0..n {
            if !state.bottles[i].is_mono_full()
                || state.bottles[i].gimmick.kind == GimmickKind::Vine
            {
                continue;
            }
            let color = state.bottles[i].slots[0].color;

            let mut swapped = false;
            for _ in 0..PLACE_TRIES {
                let j = self.rng.irange(0, n - 1);
                if j == i
                    || state.bottles[j].is_empty()
                    || state.bottles[j].gimmick.kind == GimmickKind::Vine
                {
                    continue;
                }
                let l = self.rng.irange(0, state.bottles[j].size() - 1);
                let other = state.bottles[j].slots[l].color;
                if other == color || !self.swap_respects_cloth(state, i, j, color, other) {
                    continue;
                }
                let k = self.rng.irange(0, state.bottles[i].size() - 1);
                state.bottles[i].slots[k].color = other;
                state.bottles[j].slots[l].color = color;
                if state.bottles[j].is_mono_full() {
                    // Undo: the swap only moved the problem.
                    state.bottles[i].slots[k].color = color;
                    state.bottles[j].slots[l].color = other;
                    continue;
                }
                swapped = true;
                break;
            }

            if !swapped {
                // Fall back to swapping tops with any differently-topped bottle.
                for j in 0..n {
                    if j == i
                        || state.bottles[j].is_empty()
                        || state.bottles[j].gimmick.kind == GimmickKind::Vine
                    {
                        continue;
                    }
                    let jl = state.bottles[j].size() - 1;
                    let other = state.bottles[j].slots[jl].color;
                    if other == color || !self.swap_respects_cloth(state, i, j, color, other) {
                        continue;
                    }
                    let il = state.bottles[i].size() - 1;
                    state.bottles[i].slots[il].color = other;
                    state.bottles[j].slots[jl].color = color;
                    break;
                }
            }
        }
        state.refresh_locks();
    }

    /// The incoming colors must not violate either side's cloth rule.
    fn swap_respects_cloth(
        &self,
        state: &State,
        i: usize,
        j: usize,
        color_to_j: Color,
        color_to_i: Color,
    ) -> bool {
        let gi = state.bottles[i].gimmick;
        let gj = state.bottles[j].gimmick;
        !(gi.kind == GimmickKind::Cloth && gi.cloth_target == color_to_i)
            && !(gj.kind == GimmickKind::Cloth && gj.cloth_target == color_to_j)
    }

    // ==================== scramble ====================

    /// Reverse-move scramble under the relaxed rule (destination color match
    /// dropped). The immediate undo of the previous move is excluded by
    /// `(from, to)` alone.
    fn scramble(&mut self, state: &mut State) -> Vec<Move> {
        let target = self.rng.irange(self.opt.mix_min, self.opt.mix_max);
        let n = state.bottles.len();
        let mut trail = Vec::new();
        let mut last: Option<Move> = None;

        for _ in 0..target {
            let mut candidates = Vec::new();
            for from in 0..n {
                for to in 0..n {
                    let Some(amount) = state.can_pour_relaxed(from, to) else {
                        continue;
                    };
                    if last.is_some_and(|prev| prev.from == to && prev.to == from) {
                        continue;
                    }
                    candidates.push(Move { from, to, amount });
                }
            }
            if candidates.is_empty() {
                break;
            }
            let m = candidates[self.rng.irange(0, candidates.len() - 1)];
            state.apply(m);
            trail.push(m);
            last = Some(m);
        }
        trail
    }
}
