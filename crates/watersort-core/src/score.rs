//! Composite difficulty model over a start state and its solve statistics.
//!
//! Every component is bounded on its own and the total is clamped to
//! `[0, 100]`; the constants are hand-tuned calibration targets.

use crate::solver::{heuristic, SolveResult};
use crate::state::State;
use crate::types::GimmickKind;
use serde::{Deserialize, Serialize};

/// Per-component contributions; `total_score` is the clamped sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBreakdown {
    pub move_component: f64,
    pub heuristic_component: f64,
    pub fragmentation_component: f64,
    pub hidden_component: f64,
    pub empty_bottle_component: f64,
    pub solved_bottle_component: f64,
    pub gimmick_component: f64,
    pub hidden_gimmick_interaction: f64,
    pub color_component: f64,
    pub solution_component: f64,
    pub total_score: f64,
}

/// Score a puzzle from its start state and solve statistics. Fills
/// `result.difficulty` and returns the composite score in `[0, 100]`.
pub fn estimate_difficulty(state: &State, result: &mut SolveResult) -> f64 {
    let colors = state.params.num_colors as f64;
    let capacity = state.params.capacity as f64;
    let empties = state.empty_bottle_count();
    let mono_full = state.mono_full_count();

    // Optimal length relative to a nominal expectation for these dimensions.
    let expected = colors * capacity * 1.1;
    let move_component = ((result.min_moves as f64 / expected).max(0.0).powf(1.35) * 40.0)
        .clamp(0.0, 45.0);

    let h0 = heuristic(state) as f64;
    let heuristic_component = (h0.max(0.0).powf(1.12) * 1.15).min(18.0);

    let frag_groups: usize = state
        .bottles
        .iter()
        .map(|b| b.color_groups().saturating_sub(1))
        .sum();
    let fragmentation_component = (frag_groups as f64 * 0.9).min(10.0);

    let hidden_component = hidden_component(state);

    let empty_bottle_component = match empties {
        0 => 0.0,
        1 => -5.0,
        2 => -12.0,
        _ => -22.0,
    };

    let solved_bottle_component = -(mono_full as f64 * 1.5).min(8.0);

    let gimmick_component = gimmick_component(state, empties);

    let hidden_gimmick_interaction = -0.45 * hidden_component.min(gimmick_component);

    let color_component = ((colors - 5.0).max(0.0) * 1.2).min(7.0);

    let solution_component = solution_component(result);

    let mut total = move_component
        + heuristic_component
        + fragmentation_component
        + hidden_component
        + empty_bottle_component
        + solved_bottle_component
        + gimmick_component
        + hidden_gimmick_interaction
        + color_component
        + solution_component;
    total = total.clamp(0.0, 100.0);
    // Hard ceiling when spare bottles make everything forgiving.
    if empties >= 3 && total >= 25.0 {
        total = 24.9;
    }

    result.difficulty = DifficultyBreakdown {
        move_component,
        heuristic_component,
        fragmentation_component,
        hidden_component,
        empty_bottle_component,
        solved_bottle_component,
        gimmick_component,
        hidden_gimmick_interaction,
        color_component,
        solution_component,
        total_score: total,
    };
    total
}

/// Effective hidden groups mapped onto `[0, 8]`, plus an exponential bonus
/// once several bottles carry hidden slots; capped at 14 overall.
fn hidden_component(state: &State) -> f64 {
    const FREE: f64 = 1.5;
    const CAP: f64 = 6.5;

    let mut effective = 0.0;
    let mut bottles_with_hidden = 0usize;
    for bottle in &state.bottles {
        if bottle.is_empty() {
            continue;
        }
        let hidden = bottle.slots.iter().filter(|s| s.hidden).count();
        if hidden == 0 {
            continue;
        }
        bottles_with_hidden += 1;
        let mut known = bottle.slots.iter().filter(|s| !s.hidden).map(|s| s.color);
        let known_mono = match known.next() {
            Some(first) => known.all(|c| c == first),
            None => true,
        };
        let extra_weight = if known_mono { 0.35 } else { 0.6 };
        effective += 1.0 + (hidden - 1) as f64 * extra_weight;
    }

    let mut component = ((effective - FREE) / (CAP - FREE)).clamp(0.0, 1.0) * 8.0;
    if bottles_with_hidden >= 2 {
        component += (((bottles_with_hidden - 1) as f64 * 0.5).exp() - 1.0) * 1.9;
    }
    component.min(14.0)
}

/// Normalized gimmick pressure through a saturating curve, plus step bonuses
/// per gimmick count, minus a small rebate for spare bottles.
fn gimmick_component(state: &State, empties: usize) -> f64 {
    let mut pressure = 0.0;
    let mut count = 0usize;
    for bottle in &state.bottles {
        let weight = match bottle.gimmick.kind {
            GimmickKind::None => continue,
            GimmickKind::Cloth => 0.70,
            GimmickKind::Vine => 1.00,
            GimmickKind::Bush => 0.85,
        };
        count += 1;
        let fill = (bottle.size() as f64 / bottle.capacity as f64).min(1.0);
        pressure += weight * (0.5 + fill * 0.5);
    }
    if count == 0 {
        return 0.0;
    }

    let x = (pressure / state.params.num_bottles as f64).powf(1.12);
    let mut component = (1.0 - (-x * 3.4).exp()) * 22.0;
    component += 4.0;
    if count >= 2 {
        component += 3.0;
    }
    if count >= 3 {
        component += 2.0;
    }
    component -= (empties as f64 * 0.5).min(1.5);
    component.clamp(0.0, 30.0)
}

/// Reward unique solutions, penalize many; bounded to `[-4, +6]`.
fn solution_component(result: &SolveResult) -> f64 {
    if result.solution_count_exhaustive {
        return match result.distinct_solutions {
            0 => 0.0,
            1 => 6.0,
            2 => 2.5,
            _ => -4.0,
        };
    }
    if !result.timed_out && !result.solution_count_limited && result.distinct_solutions == 1 {
        // Likely unique, just not proven.
        return 3.0;
    }
    if result.solution_count_limited || result.distinct_solutions >= 3 {
        return -3.0;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Locks;
    use crate::types::{Bottle, Color, DifficultyLabel, Gimmick, Params, Slot};

    fn state_from(bottles: Vec<Vec<Color>>, params: Params) -> State {
        let mut state = State {
            params,
            bottles: bottles
                .into_iter()
                .map(|colors| Bottle {
                    slots: colors.into_iter().map(Slot::visible).collect(),
                    capacity: params.capacity,
                    gimmick: Gimmick::default(),
                })
                .collect(),
            locks: Locks::default(),
        };
        state.refresh_locks();
        state
    }

    fn solved_result(min_moves: u32) -> SolveResult {
        SolveResult {
            solved: true,
            min_moves,
            distinct_solutions: 1,
            solution_count_exhaustive: true,
            ..SolveResult::default()
        }
    }

    fn mixed_state() -> State {
        let params = Params::new(3, 5, 3);
        state_from(
            vec![
                vec![1, 2, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![],
                vec![],
            ],
            params,
        )
    }

    #[test]
    fn score_is_bounded_and_recorded() {
        let state = mixed_state();
        let mut res = solved_result(9);
        let score = estimate_difficulty(&state, &mut res);
        assert!((0.0..=100.0).contains(&score));
        assert_eq!(res.difficulty.total_score, score);
        assert!(res.difficulty.move_component >= 0.0);
        assert!(res.difficulty.empty_bottle_component <= 0.0);
    }

    #[test]
    fn more_moves_never_score_lower() {
        let state = mixed_state();
        let mut prev = 0.0;
        for m in [2u32, 6, 10, 20, 40, 80] {
            let mut res = solved_result(m);
            let score = estimate_difficulty(&state, &mut res);
            assert!(score >= prev, "m={m}: {score} < {prev}");
            prev = score;
        }
    }

    #[test]
    fn move_component_saturates_at_its_cap() {
        let state = mixed_state();
        let mut res = solved_result(10_000);
        estimate_difficulty(&state, &mut res);
        assert!(res.difficulty.move_component <= 45.0);
    }

    #[test]
    fn unique_solution_beats_many_solutions() {
        let state = mixed_state();
        let mut unique = solved_result(9);
        let mut many = solved_result(9);
        many.distinct_solutions = 4;
        many.solution_count_limited = true;
        many.solution_count_exhaustive = false;
        let s_unique = estimate_difficulty(&state, &mut unique);
        let s_many = estimate_difficulty(&state, &mut many);
        assert!(s_unique > s_many);
        assert_eq!(unique.difficulty.solution_component, 6.0);
        assert_eq!(many.difficulty.solution_component, -3.0);
    }

    #[test]
    fn hidden_slots_raise_the_score() {
        let plain = mixed_state();
        let mut masked = plain.clone();
        masked.bottles[0].slots[0].hidden = true;
        masked.bottles[0].slots[1].hidden = true;
        masked.bottles[1].slots[0].hidden = true;
        masked.bottles[2].slots[1].hidden = true;

        let mut res_a = solved_result(9);
        let mut res_b = solved_result(9);
        let plain_score = estimate_difficulty(&plain, &mut res_a);
        let masked_score = estimate_difficulty(&masked, &mut res_b);
        assert_eq!(res_a.difficulty.hidden_component, 0.0);
        assert!(res_b.difficulty.hidden_component > 0.0);
        assert!(res_b.difficulty.hidden_component <= 14.0);
        assert!(masked_score >= plain_score);
    }

    #[test]
    fn gimmicks_raise_the_score_within_cap() {
        let plain = mixed_state();
        let mut gimmicked = plain.clone();
        gimmicked.bottles[0].gimmick = Gimmick::vine();
        gimmicked.bottles[1].gimmick = Gimmick::bush();
        gimmicked.bottles[2].gimmick = Gimmick::cloth(1);
        gimmicked.refresh_locks();

        let mut res_a = solved_result(9);
        let mut res_b = solved_result(9);
        let plain_score = estimate_difficulty(&plain, &mut res_a);
        let gimmick_score = estimate_difficulty(&gimmicked, &mut res_b);
        assert_eq!(res_a.difficulty.gimmick_component, 0.0);
        assert!(res_b.difficulty.gimmick_component > 0.0);
        assert!(res_b.difficulty.gimmick_component <= 30.0);
        assert!(gimmick_score > plain_score);
        // Anti-double-count term only kicks in when both features exist.
        assert_eq!(res_b.difficulty.hidden_gimmick_interaction, 0.0);
    }

    #[test]
    fn three_spare_bottles_cap_the_total() {
        let params = Params::new(3, 7, 3);
        let mut state = state_from(
            vec![
                vec![1, 2, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![],
                vec![],
                vec![],
                vec![],
            ],
            params,
        );
        state.bottles[0].gimmick = Gimmick::vine();
        state.bottles[1].gimmick = Gimmick::bush();
        state.refresh_locks();
        let mut res = solved_result(60);
        let score = estimate_difficulty(&state, &mut res);
        assert!(score <= 24.9, "spare-bottle ceiling not applied: {score}");
        assert_eq!(DifficultyLabel::for_score(score), DifficultyLabel::Easy);
    }

    #[test]
    fn solution_component_branches() {
        let mut exhaustive_two = solved_result(5);
        exhaustive_two.distinct_solutions = 2;
        assert_eq!(solution_component(&exhaustive_two), 2.5);

        let mut exhaustive_many = solved_result(5);
        exhaustive_many.distinct_solutions = 3;
        assert_eq!(solution_component(&exhaustive_many), -4.0);

        let mut likely_unique = solved_result(5);
        likely_unique.solution_count_exhaustive = false;
        assert_eq!(solution_component(&likely_unique), 3.0);

        let mut timed_out = solved_result(5);
        timed_out.solution_count_exhaustive = false;
        timed_out.timed_out = true;
        assert_eq!(solution_component(&timed_out), 0.0);
    }
}
