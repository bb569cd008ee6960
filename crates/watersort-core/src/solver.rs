//! Bounded-budget optimal search: iterative-deepening A* with transposition
//! pruning, plus counting of distinct optimal solutions up to a cap.

use crate::score::DifficultyBreakdown;
use crate::state::State;
use crate::types::Move;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Counting stops once this many distinct optimal solutions are seen.
const MAX_SOLUTION_COUNT: u32 = 4;

/// Outcome of a solve call. Never an error: budget expiry and exhaustion both
/// surface as `timed_out` with the last completed lower bound in `min_moves`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveResult {
    pub solved: bool,
    pub timed_out: bool,
    /// Exact optimal move count when `solved`; the last lower bound otherwise.
    pub min_moves: u32,
    /// Distinct optimal solutions found, up to the counting cap.
    pub distinct_solutions: u32,
    /// The count covered the whole optimal-depth search space.
    pub solution_count_exhaustive: bool,
    /// Counting stopped at the cap.
    pub solution_count_limited: bool,
    /// One optimal path; empty when unsolved.
    pub solution_moves: Vec<Move>,
    /// Filled in by [`crate::estimate_difficulty`].
    pub difficulty: DifficultyBreakdown,
}

/// Single-shot optimal solver with a wall-clock budget.
pub struct Solver {
    budget: Duration,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(2000)
    }
}

impl Solver {
    pub fn new(budget_ms: u64) -> Self {
        Self {
            budget: Duration::from_millis(budget_ms),
        }
    }

    /// Solve `start` optimally within the budget.
    ///
    /// Hidden flags are a presentation concern and are ignored here; the
    /// returned path is valid on the revealed state.
    pub fn solve(&self, start: &State) -> SolveResult {
        let deadline = Instant::now() + self.budget;
        let mut start = start.clone();
        start.reveal_all();
        start.refresh_locks();

        let mut res = SolveResult::default();
        if start.is_solved() {
            res.solved = true;
            res.distinct_solutions = 1;
            res.solution_count_exhaustive = true;
            return res;
        }

        let mut bound = heuristic(&start);
        let mut search = SearchCtx {
            deadline,
            visited: HashSet::new(),
            path: Vec::new(),
        };
        loop {
            search.visited.clear();
            search.path.clear();
            match dfs(&start, 0, bound, &mut search) {
                Step::Solved => {
                    res.solved = true;
                    res.min_moves = search.path.len() as u32;
                    res.solution_moves = search.path.clone();
                    break;
                }
                Step::Over(next) => bound = next,
                Step::Dead | Step::Timeout => {
                    res.timed_out = true;
                    res.min_moves = bound;
                    return res;
                }
            }
        }

        self.count_optimal(&start, &mut res, deadline);
        res
    }

    /// Estimate difficulty for a state and its solve statistics; fills
    /// `result.difficulty` and returns the composite score.
    pub fn estimate_difficulty(&self, state: &State, result: &mut SolveResult) -> f64 {
        crate::score::estimate_difficulty(state, result)
    }

    /// Count distinct optimal solutions by DFS to depth exactly `min_moves`,
    /// folding any state re-reached at an equal or greater depth. Solved end
    /// states fold too, so commuting move orders count once.
    fn count_optimal(&self, start: &State, res: &mut SolveResult, deadline: Instant) {
        let mut ctx = CountCtx {
            deadline,
            min_moves: res.min_moves,
            best_depth: HashMap::new(),
            count: 0,
            limited: false,
            timed_out: false,
        };
        count_dfs(start, 0, &mut ctx);

        if ctx.timed_out {
            res.timed_out = true;
        }
        res.solution_count_limited = ctx.limited;
        res.solution_count_exhaustive = !ctx.limited && !ctx.timed_out;
        res.distinct_solutions = if res.solution_count_exhaustive {
            ctx.count
        } else {
            ctx.count.max(1)
        };
    }
}

/// Admissible lower bound on remaining moves: every non-mono-full bottle
/// needs at least one pour, fragmented bottles need one per extra group, and
/// up to two empty bottles may absorb work for free.
pub(crate) fn heuristic(s: &State) -> u32 {
    let mut h: i64 = 0;
    let mut empties: i64 = 0;
    for bottle in &s.bottles {
        if bottle.is_empty() {
            empties += 1;
            continue;
        }
        if !bottle.is_mono_full() {
            h += (bottle.color_groups() as i64 - 1).max(1);
        }
    }
    (h - empties.min(2)).max(0) as u32
}

/// Legal pours, merges onto matching non-empty tops first (stable order).
fn ordered_moves(s: &State) -> Vec<Move> {
    let mut moves = s.legal_moves();
    moves.sort_by_key(|m| {
        let merge = !s.bottles[m.to].is_empty()
            && s.bottles[m.to].top_color() == s.bottles[m.from].top_color();
        !merge
    });
    moves
}

enum Step {
    Solved,
    /// Minimum f-value that exceeded the bound in this subtree.
    Over(u32),
    /// Subtree fully pruned; no next bound to propose.
    Dead,
    Timeout,
}

struct SearchCtx {
    deadline: Instant,
    visited: HashSet<u64>,
    path: Vec<Move>,
}

fn dfs(s: &State, g: u32, bound: u32, ctx: &mut SearchCtx) -> Step {
    let f = g + heuristic(s);
    if f > bound {
        return Step::Over(f);
    }
    if s.is_solved() {
        return Step::Solved;
    }
    if Instant::now() >= ctx.deadline {
        return Step::Timeout;
    }
    if !ctx.visited.insert(s.content_hash()) {
        return Step::Dead;
    }

    let mut next_bound: Option<u32> = None;
    for m in ordered_moves(s) {
        let mut child = s.clone();
        child.apply(m);
        ctx.path.push(m);
        match dfs(&child, g + 1, bound, ctx) {
            Step::Solved => return Step::Solved,
            Step::Over(f2) => next_bound = Some(next_bound.map_or(f2, |b| b.min(f2))),
            Step::Dead => {}
            Step::Timeout => {
                ctx.path.pop();
                return Step::Timeout;
            }
        }
        ctx.path.pop();
    }
    match next_bound {
        Some(b) => Step::Over(b),
        None => Step::Dead,
    }
}

struct CountCtx {
    deadline: Instant,
    min_moves: u32,
    best_depth: HashMap<u64, u32>,
    count: u32,
    limited: bool,
    timed_out: bool,
}

fn count_dfs(s: &State, g: u32, ctx: &mut CountCtx) {
    if ctx.limited || ctx.timed_out {
        return;
    }
    if Instant::now() >= ctx.deadline {
        ctx.timed_out = true;
        return;
    }
    // Dominance fold before anything else, the solved end states included:
    // sibling orderings that reconverge on one state at one depth count once.
    let key = s.content_hash();
    if ctx.best_depth.get(&key).is_some_and(|&d| d <= g) {
        return;
    }
    ctx.best_depth.insert(key, g);

    if s.is_solved() {
        if g == ctx.min_moves {
            ctx.count += 1;
            if ctx.count >= MAX_SOLUTION_COUNT {
                ctx.limited = true;
            }
        }
        return;
    }
    if g >= ctx.min_moves {
        return;
    }

    for m in ordered_moves(s) {
        let mut child = s.clone();
        child.apply(m);
        count_dfs(&child, g + 1, ctx);
        if ctx.limited || ctx.timed_out {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Locks;
    use crate::types::{Bottle, Color, Gimmick, Params, Slot};

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

    /// Replays a result's path through `can_pour`/`apply` and asserts every
    /// step is legal and the end state solved.
    fn assert_path_solves(start: &State, res: &SolveResult) {
        let mut s = start.clone();
        s.reveal_all();
        s.refresh_locks();
        for m in &res.solution_moves {
            let amount = s.can_pour(m.from, m.to).expect("illegal move in path");
            assert!(amount >= m.amount);
            s.apply(*m);
        }
        assert!(s.is_solved());
        assert_eq!(res.solution_moves.len() as u32, res.min_moves);
    }

    #[test]
    fn already_solved_goal() {
        let res = Solver::new(1000).solve(&State::goal(Params::new(2, 4, 3)));
        assert!(res.solved);
        assert!(!res.timed_out);
        assert_eq!(res.min_moves, 0);
        assert_eq!(res.distinct_solutions, 1);
        assert!(res.solution_count_exhaustive);
        assert!(res.solution_moves.is_empty());
    }

    #[test]
    fn minimal_pour_puzzle() {
        let params = Params::new(2, 4, 3);
        let start = state_from(vec![vec![1, 1, 2], vec![2, 2], vec![1], vec![]], params);
        let res = Solver::new(2000).solve(&start);
        assert!(res.solved);
        assert!(res.min_moves >= 1 && res.min_moves <= 3);
        assert_path_solves(&start, &res);
    }

    #[test]
    fn heuristic_is_a_lower_bound_here() {
        let params = Params::new(3, 5, 3);
        let start = state_from(
            vec![
                vec![1, 2, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![],
                vec![],
            ],
            params,
        );
        let h0 = heuristic(&start);
        let res = Solver::new(5000).solve(&start);
        assert!(res.solved);
        assert!(res.min_moves >= h0);
        assert_path_solves(&start, &res);
    }

    #[test]
    fn two_symmetric_optimal_solutions() {
        let params = Params::new(1, 3, 2);
        let start = state_from(vec![vec![1], vec![1], vec![]], params);
        let res = Solver::new(2000).solve(&start);
        assert!(res.solved);
        assert_eq!(res.min_moves, 1);
        // Pouring 0->1 or 1->0 are distinct one-move solutions.
        assert_eq!(res.distinct_solutions, 2);
        assert!(res.solution_count_exhaustive);
        assert!(!res.solution_count_limited);
    }

    #[test]
    fn commuting_merge_orders_fold_to_one_solution() {
        // Two independent forced merges: the vine bottles only receive, so
        // 0->1 and 2->3 are the only legal moves and they commute. Both
        // orderings reconverge on the identical final board, which must
        // count as a single optimal solution.
        let params = Params::new(2, 4, 3);
        let mut start = state_from(vec![vec![1], vec![1, 1], vec![2], vec![2, 2]], params);
        start.bottles[1].gimmick = Gimmick::vine();
        start.bottles[3].gimmick = Gimmick::vine();
        start.refresh_locks();

        let res = Solver::new(2000).solve(&start);
        assert!(res.solved);
        assert_eq!(res.min_moves, 2);
        assert_eq!(res.distinct_solutions, 1);
        assert!(res.solution_count_exhaustive);
        assert!(!res.solution_count_limited);
        assert_path_solves(&start, &res);
    }

    #[test]
    fn unique_solution_is_reported_exhaustively() {
        let params = Params::new(2, 3, 2);
        let start = state_from(vec![vec![1, 2], vec![2, 1], vec![]], params);
        let res = Solver::new(2000).solve(&start);
        assert!(res.solved);
        assert_path_solves(&start, &res);
        if res.solution_count_exhaustive {
            assert!(res.distinct_solutions >= 1);
        }
    }

    #[test]
    fn zero_budget_times_out() {
        let params = Params::new(3, 5, 3);
        let start = state_from(
            vec![
                vec![1, 2, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![],
                vec![],
            ],
            params,
        );
        let res = Solver::new(0).solve(&start);
        assert!(!res.solved);
        assert!(res.timed_out);
        assert!(res.solution_moves.is_empty());
        // Last known bound is still reported.
        assert!(res.min_moves >= heuristic(&start));
    }

    #[test]
    fn hidden_slots_do_not_change_the_answer() {
        let params = Params::new(2, 4, 3);
        let plain = state_from(vec![vec![1, 1, 2], vec![2, 2, 1], vec![], vec![]], params);
        let mut masked = plain.clone();
        masked.bottles[0].slots[0].hidden = true;
        masked.bottles[1].slots[1].hidden = true;

        let res_plain = Solver::new(2000).solve(&plain);
        let res_masked = Solver::new(2000).solve(&masked);
        assert!(res_plain.solved && res_masked.solved);
        assert_eq!(res_plain.min_moves, res_masked.min_moves);
        assert_path_solves(&masked, &res_masked);
    }

    #[test]
    fn vine_source_restriction_reaches_the_solver() {
        // The vine bottle is already complete; everything else needs one pour.
        let params = Params::new(2, 4, 3);
        let mut start = state_from(vec![vec![1, 1, 1], vec![2, 2], vec![2], vec![]], params);
        start.bottles[0].gimmick = Gimmick::vine();
        start.refresh_locks();
        let res = Solver::new(2000).solve(&start);
        assert!(res.solved);
        assert_eq!(res.min_moves, 1);
        assert_path_solves(&start, &res);
        // The path never pours out of the vine bottle.
        assert!(res.solution_moves.iter().all(|m| m.from != 0));
    }
}
