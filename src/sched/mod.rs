//! Task graph with data dependencies inferred from declared memory footprints.
//!
//! Every task declares the memory ranges it reads and writes. Two tasks conflict when their
//! ranges overlap and at least one of them writes; a task always runs after every conflicting
//! task that was submitted before it. Tasks that do not conflict may run concurrently.
//!
//! Tasks belong to a [`Sequence`]. Before running, a task checks its sequence, and skips its body
//! if the sequence already failed.

use crate::{utils::thread::parallelism_degree, Parallelism};
use core::ops::Range;
#[cfg(feature = "rayon")]
use core::sync::atomic::{AtomicUsize, Ordering};
#[cfg(feature = "rayon")]
use std::sync::Mutex;

mod sequence;

pub use sequence::{Failure, Request, Sequence};

/// How a task accesses a memory region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    #[inline]
    fn writes(self) -> bool {
        !matches!(self, Access::Read)
    }
}

/// Half-open range of byte addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Region covering the elements `range` of the array starting at `base`.
    #[inline]
    pub fn of<E>(base: *const E, range: Range<usize>) -> Self {
        let size = core::mem::size_of::<E>();
        let base = base as usize;
        Self {
            start: base + range.start * size,
            end: base + range.end * size,
        }
    }

    /// Region covering `slice`.
    #[inline]
    pub fn of_slice<E>(slice: &[E]) -> Self {
        Self::of(slice.as_ptr(), 0..slice.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// Memory access declared by a task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dep {
    pub region: Region,
    pub access: Access,
}

impl Dep {
    #[inline]
    pub fn read(region: Region) -> Self {
        Self {
            region,
            access: Access::Read,
        }
    }

    #[inline]
    pub fn write(region: Region) -> Self {
        Self {
            region,
            access: Access::Write,
        }
    }

    #[inline]
    pub fn read_write(region: Region) -> Self {
        Self {
            region,
            access: Access::ReadWrite,
        }
    }

    #[inline]
    fn conflicts(&self, other: &Dep) -> bool {
        (self.access.writes() || other.access.writes()) && self.region.overlaps(&other.region)
    }
}

type Body<'a> = Box<dyn FnOnce() + Send + 'a>;

struct Node<'a> {
    sequence: &'a Sequence,
    deps: Vec<Dep>,
    body: Body<'a>,
    predecessors: usize,
    successors: Vec<usize>,
}

/// Directed acyclic graph of tasks, built in submission order and executed by [`TaskGraph::run`].
#[derive(Default)]
pub struct TaskGraph<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> TaskGraph<'a> {
    #[inline]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of submitted tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of dependency edges of the graph.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.successors.len()).sum()
    }

    /// Submits a task that runs `body` once every conflicting task submitted before it has
    /// finished. Returns the index of the task.
    ///
    /// The body is skipped if `sequence` has failed by the time the task is ready to run.
    pub fn submit(
        &mut self,
        sequence: &'a Sequence,
        deps: Vec<Dep>,
        body: impl FnOnce() + Send + 'a,
    ) -> usize {
        let idx = self.nodes.len();
        let mut predecessors = 0;
        for (prev_idx, prev) in self.nodes.iter_mut().enumerate() {
            let conflict = deps
                .iter()
                .any(|dep| prev.deps.iter().any(|prev_dep| prev_dep.conflicts(dep)));
            if conflict {
                prev.successors.push(idx);
                predecessors += 1;
                log::trace!(target: "tessel", "task {idx} depends on task {prev_idx}");
            }
        }
        self.nodes.push(Node {
            sequence,
            deps,
            body: Box::new(body),
            predecessors,
            successors: Vec::new(),
        });
        idx
    }

    /// Runs every task of the graph and returns once all of them finished.
    ///
    /// With [`Parallelism::None`], or a single thread, tasks run on the calling thread in
    /// submission order. Otherwise ready tasks are spawned on a rayon thread pool: the global
    /// one for `Parallelism::Rayon(0)`, and a pool of exactly `n` threads for
    /// `Parallelism::Rayon(n)`.
    pub fn run(self, parallelism: Parallelism) {
        if self.nodes.is_empty() {
            return;
        }
        log::debug!(
            target: "tessel",
            "running {} tasks with {} dependencies",
            self.nodes.len(),
            self.edge_count(),
        );

        if parallelism_degree(parallelism) <= 1 {
            for node in self.nodes {
                run_node(node.sequence, node.body);
            }
            return;
        }

        #[cfg(feature = "rayon")]
        {
            let mut roots = Vec::new();
            let mut state = RunState {
                sequences: Vec::with_capacity(self.nodes.len()),
                bodies: Vec::with_capacity(self.nodes.len()),
                pending: Vec::with_capacity(self.nodes.len()),
                successors: Vec::with_capacity(self.nodes.len()),
            };
            for (idx, node) in self.nodes.into_iter().enumerate() {
                if node.predecessors == 0 {
                    roots.push(idx);
                }
                state.sequences.push(node.sequence);
                state.bodies.push(Mutex::new(Some(node.body)));
                state.pending.push(AtomicUsize::new(node.predecessors));
                state.successors.push(node.successors);
            }

            let state = &state;
            let spawn_roots = move || {
                rayon::scope(|scope| {
                    for idx in roots {
                        scope.spawn(move |scope| execute(scope, state, idx));
                    }
                })
            };
            match thread_pool(parallelism) {
                Some(pool) => pool.install(spawn_roots),
                None => spawn_roots(),
            }
        }
    }
}

// dedicated pool for `Rayon(n)` when the current one does not have `n` threads
#[cfg(feature = "rayon")]
fn thread_pool(parallelism: Parallelism) -> Option<rayon::ThreadPool> {
    let Parallelism::Rayon(n_threads) = parallelism else {
        return None;
    };
    if n_threads == 0 || n_threads == rayon::current_num_threads() {
        return None;
    }
    match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
        Ok(pool) => Some(pool),
        Err(err) => {
            log::warn!(
                target: "tessel",
                "could not build a pool of {n_threads} threads, using the current one: {err}",
            );
            None
        }
    }
}

#[inline]
fn run_node(sequence: &Sequence, body: Body<'_>) {
    if sequence.is_ok() {
        body();
    } else {
        log::debug!(target: "tessel", "skipping task of failed sequence");
    }
}

#[cfg(feature = "rayon")]
struct RunState<'a> {
    sequences: Vec<&'a Sequence>,
    bodies: Vec<Mutex<Option<Body<'a>>>>,
    pending: Vec<AtomicUsize>,
    successors: Vec<Vec<usize>>,
}

#[cfg(feature = "rayon")]
fn execute<'s, 'a: 's>(scope: &rayon::Scope<'s>, state: &'s RunState<'a>, idx: usize) {
    let body = match state.bodies[idx].lock() {
        Ok(mut body) => body.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(body) = body {
        run_node(state.sequences[idx], body);
    }

    for &succ in &state.successors[idx] {
        // the last predecessor to finish spawns the successor
        if state.pending[succ].fetch_sub(1, Ordering::AcqRel) == 1 {
            scope.spawn(move |scope| execute(scope, state, succ));
        }
    }
}
