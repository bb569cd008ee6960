//! Background batch generation.
//!
//! A `Generator` is not safe for concurrent use, so each worker thread owns a
//! private one seeded from the base seed. Results flow through a locked
//! hand-off queue; completion counters let the caller report progress and
//! failures. With a single worker the output order matches sequential
//! generation exactly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use watersort_core::{GenOptions, Generated, Generator, Params};

/// Odd stride keeps per-worker seed streams disjoint; worker 0 keeps the
/// base seed so one-worker runs stay reproducible.
const SEED_STRIDE: u64 = 0x9E37_79B9;

/// Auto-template shape rebuilt per map by each worker.
#[derive(Debug, Clone, Copy)]
pub struct TemplateRequest {
    pub cloth: usize,
    pub vine: usize,
    pub bush: usize,
    pub questions: usize,
    pub questions_per_bottle: Option<usize>,
}

impl TemplateRequest {
    pub fn is_empty(&self) -> bool {
        self.cloth + self.vine + self.bush + self.questions == 0
    }
}

pub struct BatchReport {
    pub produced: Vec<Generated>,
    pub completed: usize,
    pub failed: usize,
}

/// Generate `count` maps across up to `workers` threads.
pub fn generate_batch(
    params: Params,
    opt: &GenOptions,
    template: Option<TemplateRequest>,
    count: usize,
    workers: usize,
) -> BatchReport {
    let workers = workers.clamp(1, count.max(1));
    let queue = Arc::new(Mutex::new(Vec::with_capacity(count)));
    let completed = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    thread::scope(|scope| {
        for w in 0..workers {
            let share = count / workers + usize::from(w < count % workers);
            if share == 0 {
                continue;
            }
            let queue = Arc::clone(&queue);
            let completed = Arc::clone(&completed);
            let failed = Arc::clone(&failed);
            let mut worker_opt = opt.clone();
            worker_opt.seed = opt.seed.wrapping_add(w as u64 * SEED_STRIDE);

            scope.spawn(move || {
                let mut gen = Generator::new(params, worker_opt);
                for _ in 0..share {
                    let result = match template {
                        Some(req) if !req.is_empty() => {
                            match gen.build_random_template(
                                req.cloth,
                                req.vine,
                                req.bush,
                                req.questions,
                                req.questions_per_bottle,
                            ) {
                                Ok(tpl) => {
                                    gen.set_base(tpl);
                                    gen.make_one(None)
                                }
                                Err(_) => None,
                            }
                        }
                        _ => gen.make_one(None),
                    };
                    match result {
                        Some(g) => {
                            completed.fetch_add(1, Ordering::Relaxed);
                            if let Ok(mut q) = queue.lock() {
                                q.push(g);
                            }
                        }
                        None => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    let produced = match Arc::try_unwrap(queue) {
        Ok(mutex) => mutex.into_inner().unwrap_or_default(),
        Err(_) => Vec::new(),
    };
    BatchReport {
        produced,
        completed: completed.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
    }
}
