//! Backtracking assignment of demand units to (slot, teacher) pairs.
//!
//! # Algorithm
//!
//! 1. Pick the requirement with the least slack: its open slots (an empty
//!    class slot with a qualified teacher free and not ruled out there)
//!    minus the periods it still needs. Ties go to the requirement that
//!    comes first in placement order. Negative slack anywhere is a dead end.
//! 2. Enumerate candidates for its next occurrence: every empty slot of the
//!    class paired with every qualified teacher free at that (day, period).
//! 3. Rank candidates by
//!    - same-subject lessons already on that day (fewer first),
//!    - adjacency to the same subject (non-adjacent first, optional),
//!    - teacher continuity for the class/subject pair (optional),
//!    - teacher load (lighter first),
//!    - a tie-break (slot/teacher order, or a seeded random key).
//! 4. Place the best candidate. On a dead end, undo the most recent
//!    placement and move it to its next candidate. The failed
//!    `(slot, teacher)` is ruled out for every occurrence of that
//!    requirement until the choice point that tried it is itself undone,
//!    since occurrences of one requirement are interchangeable.
//! 5. Every undo spends one unit of budget. When the budget (or the whole
//!    search tree) is exhausted, restore the deepest assignment reached.
//!    Each remaining unit takes its best candidate, or else a chain
//!    exchange (below).
//!
//! The teacher-conflict constraint is enforced by candidate generation and
//! never relaxed.
//!
//! # Chain exchange
//!
//! A class with an empty slot `a` and a qualified teacher free at slot `b`
//! can always be brought together. Starting at the teacher, follow its
//! lesson at `a` to a class, that class's lesson at `b` to the next teacher,
//! and so on. Swapping `a` and `b` on every lesson of this chain keeps all
//! classes and teachers single-booked, never touches the starting class,
//! and leaves the teacher free at `a`. So a unit stays unplaced only when
//! its class grid is full or every qualified teacher is fully booked.
//!
//! # Complexity
//! O(r · s · t) per step for requirement selection plus
//! O(s · t · log(s · t)) for ranking, where r = requirements,
//! s = slots per class, t = qualified teachers per subject.
//!
//! # Reference
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach",
//!   4th ed., Ch. 6.3: Backtracking Search for CSPs
//! - König (1916), alternating paths in bipartite edge colouring

use log::{debug, trace};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::demand::{DemandUnit, Problem, Requirement};
use super::progress::{CancelFlag, Progress, ProgressSink};
use crate::error::EngineError;
use crate::models::GenerationOptions;

/// A chosen `(slot, teacher)` for a unit. Slot index is `day * periods + period`.
pub(crate) type Placement = (usize, usize);

/// Search result: a placement (or none) per unit, in unit order.
#[derive(Debug, Clone)]
pub(crate) struct SearchResult {
    pub placements: Vec<Option<Placement>>,
    pub backtracks: usize,
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    unit: usize,
    subject: usize,
    teacher: usize,
}

/// Mutable assignment state.
#[derive(Debug, Clone)]
pub(crate) struct Board {
    classes: usize,
    slots: usize,
    periods: usize,
    days: usize,
    subjects: usize,
    teachers: usize,
    /// `class * slots + slot` → lesson
    cells: Vec<Option<Cell>>,
    /// `teacher * slots + slot` → class taught
    teaching: Vec<Option<usize>>,
    /// Assigned periods per teacher.
    load: Vec<u32>,
    /// `(class * subjects + subject) * days + day` → lessons that day
    day_count: Vec<u32>,
    /// `(class * subjects + subject) * teachers + teacher` → lessons taught
    pair_teacher: Vec<u32>,
    /// `((class * subjects + subject) * slots + slot) * teachers + teacher` → ruled out
    banned: Vec<bool>,
}

impl Board {
    pub fn new(problem: &Problem<'_>) -> Self {
        let classes = problem.request.classes.len();
        let slots = problem.slots();
        let subjects = problem.subjects.len();
        let teachers = problem.teachers();
        Self {
            classes,
            slots,
            periods: problem.periods,
            days: problem.days,
            subjects,
            teachers,
            cells: vec![None; classes * slots],
            teaching: vec![None; teachers * slots],
            load: vec![0; teachers],
            day_count: vec![0; classes * subjects * problem.days],
            pair_teacher: vec![0; classes * subjects * teachers],
            banned: vec![false; classes * subjects * slots * teachers],
        }
    }

    #[inline]
    fn pair(&self, class: usize, subject: usize) -> usize {
        class * self.subjects + subject
    }

    pub fn place(&mut self, index: usize, unit: &DemandUnit, (slot, teacher): Placement) {
        let pair = self.pair(unit.class, unit.subject);
        let day = slot / self.periods;
        self.cells[unit.class * self.slots + slot] = Some(Cell {
            unit: index,
            subject: unit.subject,
            teacher,
        });
        self.teaching[teacher * self.slots + slot] = Some(unit.class);
        self.load[teacher] += 1;
        self.day_count[pair * self.days + day] += 1;
        self.pair_teacher[pair * self.teachers + teacher] += 1;
    }

    pub fn remove(&mut self, unit: &DemandUnit, (slot, teacher): Placement) {
        let pair = self.pair(unit.class, unit.subject);
        let day = slot / self.periods;
        self.cells[unit.class * self.slots + slot] = None;
        self.teaching[teacher * self.slots + slot] = None;
        self.load[teacher] -= 1;
        self.day_count[pair * self.days + day] -= 1;
        self.pair_teacher[pair * self.teachers + teacher] -= 1;
    }

    #[inline]
    fn is_free(&self, class: usize, slot: usize) -> bool {
        self.cells[class * self.slots + slot].is_none()
    }

    #[inline]
    fn is_busy(&self, teacher: usize, slot: usize) -> bool {
        self.teaching[teacher * self.slots + slot].is_some()
    }

    #[inline]
    fn ban_index(&self, pair: usize, slot: usize, teacher: usize) -> usize {
        (pair * self.slots + slot) * self.teachers + teacher
    }

    #[inline]
    fn is_banned(&self, pair: usize, slot: usize, teacher: usize) -> bool {
        self.banned[self.ban_index(pair, slot, teacher)]
    }

    /// Rules a placement out for every occurrence of the unit's requirement.
    fn ban(&mut self, unit: &DemandUnit, (slot, teacher): Placement) -> usize {
        let index = self.ban_index(self.pair(unit.class, unit.subject), slot, teacher);
        self.banned[index] = true;
        index
    }

    fn lift(&mut self, bans: &[usize]) {
        for &index in bans {
            self.banned[index] = false;
        }
    }

    /// Slots still usable by a requirement.
    fn open_slots(&self, req: &Requirement, qualified: &[usize]) -> usize {
        let pair = self.pair(req.class, req.subject);
        (0..self.slots)
            .filter(|&slot| {
                self.is_free(req.class, slot)
                    && qualified
                        .iter()
                        .any(|&t| !self.is_busy(t, slot) && !self.is_banned(pair, slot, t))
            })
            .count()
    }

    /// Whether a neighbouring period on the same day holds the subject.
    fn adjacent_same(&self, unit: &DemandUnit, slot: usize) -> bool {
        let period = slot % self.periods;
        let base = unit.class * self.slots;
        let holds = |cell: usize| self.cells[cell].is_some_and(|c| c.subject == unit.subject);
        let before = period > 0 && holds(base + slot - 1);
        let after = period + 1 < self.periods && holds(base + slot + 1);
        before || after
    }

    /// Units on the alternating `a`/`b` chain that starts at the teacher's
    /// lesson in slot `a`.
    fn chain(&self, teacher: usize, a: usize, b: usize) -> Vec<usize> {
        let mut units = Vec::new();
        let mut teacher = teacher;
        // Each step visits a new class.
        for _ in 0..self.classes {
            let Some(class) = self.teaching[teacher * self.slots + a] else {
                break;
            };
            let Some(first) = self.cells[class * self.slots + a] else {
                break;
            };
            units.push(first.unit);
            let Some(second) = self.cells[class * self.slots + b] else {
                break;
            };
            units.push(second.unit);
            teacher = second.teacher;
        }
        units
    }
}

/// Places a unit that has no free `(slot, teacher)` pair by swapping two
/// slots along an alternating chain of lessons.
///
/// Returns the unit's placement, or `None` when its class grid is full or
/// no qualified teacher has a free period.
fn exchange(
    problem: &Problem<'_>,
    board: &mut Board,
    placements: &mut [Option<Placement>],
    index: usize,
) -> Option<Placement> {
    let units = &problem.units;
    let unit = &units[index];
    let a = (0..board.slots).find(|&slot| board.is_free(unit.class, slot))?;

    let mut teachers = problem.qualified[unit.subject].clone();
    teachers.sort_by_key(|&t| board.load[t]);
    for teacher in teachers {
        let Some(b) = (0..board.slots).find(|&slot| !board.is_busy(teacher, slot)) else {
            continue;
        };

        let chain = board.chain(teacher, a, b);
        for &moved in &chain {
            if let Some(placement) = placements[moved] {
                board.remove(&units[moved], placement);
            }
        }
        for &moved in &chain {
            if let Some((slot, t)) = placements[moved] {
                let swapped = (if slot == a { b } else { a }, t);
                board.place(moved, &units[moved], swapped);
                placements[moved] = Some(swapped);
            }
        }

        if board.is_free(unit.class, a) && !board.is_busy(teacher, a) {
            trace!(
                "Exchange: class {} subject {} via {} moved lessons",
                unit.class,
                unit.subject,
                chain.len()
            );
            board.place(index, unit, (a, teacher));
            placements[index] = Some((a, teacher));
            return Some((a, teacher));
        }
    }
    None
}

/// Candidate ranking key; smaller is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    same_day: u32,
    adjacent: bool,
    new_teacher: bool,
    load: u32,
    tie: u64,
}

/// Choice point for one occurrence of a requirement.
struct Frame {
    unit: usize,
    candidates: Vec<Placement>,
    next: usize,
    /// Placements this choice point has ruled out for its requirement.
    bans: Vec<usize>,
}

impl Frame {
    fn advance(&mut self) -> Option<Placement> {
        let placement = self.candidates.get(self.next).copied()?;
        self.next += 1;
        Some(placement)
    }

    fn current(&self) -> Placement {
        self.candidates[self.next - 1]
    }
}

/// One backtracking run over a problem.
pub(crate) struct Search<'p, 'a> {
    problem: &'p Problem<'a>,
    options: &'p GenerationOptions,
    budget: usize,
    rng: Option<ChaCha8Rng>,
    cancel: &'p CancelFlag,
    sink: &'p dyn ProgressSink,
    reported_decile: usize,
}

impl<'p, 'a> Search<'p, 'a> {
    pub fn new(
        problem: &'p Problem<'a>,
        options: &'p GenerationOptions,
        budget: usize,
        rng: Option<ChaCha8Rng>,
        cancel: &'p CancelFlag,
        sink: &'p dyn ProgressSink,
    ) -> Self {
        Self {
            problem,
            options,
            budget,
            rng,
            cancel,
            sink,
            reported_decile: 0,
        }
    }

    /// Runs the search.
    ///
    /// # Errors
    /// `EngineError::Cancelled` if the cancel flag is raised between placements.
    pub fn run(mut self) -> Result<SearchResult, EngineError> {
        let problem = self.problem;
        let units = &problem.units;
        let n = units.len();
        let mut board = Board::new(problem);
        let mut placed = vec![0u32; problem.requirements.len()];
        let mut stack: Vec<Frame> = Vec::with_capacity(n);
        let mut deepest: Vec<(usize, Placement)> = Vec::new();
        let mut undo_left = self.budget;
        let mut backtracks = 0;
        let mut exhausted = false;

        'search: while stack.len() < n {
            if self.cancel.is_cancelled() {
                debug!("Search cancelled at depth {}/{}", stack.len(), n);
                return Err(EngineError::Cancelled);
            }

            let mut pending = self.open(&board, &placed);

            loop {
                if let Some(mut frame) = pending.take() {
                    if let Some(placement) = frame.advance() {
                        let unit = &units[frame.unit];
                        board.place(frame.unit, unit, placement);
                        placed[unit.requirement] += 1;
                        stack.push(frame);

                        if stack.len() > deepest.len() {
                            deepest = stack.iter().map(|f| (f.unit, f.current())).collect();
                            self.report_depth(deepest.len(), n);
                        }
                        continue 'search;
                    }
                    board.lift(&frame.bans);
                }

                // Dead end: undo the most recent placement and retry it.
                if undo_left == 0 {
                    exhausted = true;
                    break 'search;
                }
                let Some(mut previous) = stack.pop() else {
                    exhausted = true;
                    break 'search;
                };
                undo_left -= 1;
                backtracks += 1;

                let unit = &units[previous.unit];
                trace!(
                    "Backtrack: class {} subject {} occurrence {}",
                    unit.class,
                    unit.subject,
                    unit.occurrence
                );
                let failed = previous.current();
                board.remove(unit, failed);
                placed[unit.requirement] -= 1;
                previous.bans.push(board.ban(unit, failed));
                pending = Some(previous);
            }
        }

        if !exhausted {
            let mut placements = vec![None; n];
            for frame in &stack {
                placements[frame.unit] = Some(frame.current());
            }
            return Ok(SearchResult {
                placements,
                backtracks,
                exhausted: false,
            });
        }

        debug!(
            "Search exhausted after {} backtracks; deepest {}/{} units",
            backtracks,
            deepest.len(),
            n
        );
        Ok(SearchResult {
            placements: self.complete(&deepest)?,
            backtracks,
            exhausted: true,
        })
    }

    /// Opens a choice point for the requirement with the least slack, or
    /// `None` when some requirement can no longer be met.
    fn open(&mut self, board: &Board, placed: &[u32]) -> Option<Frame> {
        let problem = self.problem;
        let mut best: Option<(i64, usize, usize)> = None;

        for (ri, req) in problem.requirements.iter().enumerate() {
            let remaining = req.periods_per_week - placed[ri];
            if remaining == 0 {
                continue;
            }
            let usable = board.open_slots(req, &problem.qualified[req.subject]);
            let slack = usable as i64 - i64::from(remaining);
            if slack < 0 {
                return None;
            }
            let key = (slack, req.first_unit, ri);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }

        let (_, first_unit, requirement) = best?;
        let unit = first_unit + placed[requirement] as usize;
        Some(Frame {
            unit,
            candidates: self.candidates(&problem.units[unit], board),
            next: 0,
            bans: Vec::new(),
        })
    }

    /// Rebuilds the deepest assignment and places the remaining units by
    /// best candidate or chain exchange, skipping those that fit neither.
    fn complete(
        &mut self,
        deepest: &[(usize, Placement)],
    ) -> Result<Vec<Option<Placement>>, EngineError> {
        let problem = self.problem;
        let units = &problem.units;
        let mut board = Board::new(problem);
        let mut placements = vec![None; units.len()];

        for &(index, placement) in deepest {
            board.place(index, &units[index], placement);
            placements[index] = Some(placement);
        }

        let mut exchanged = 0;
        for index in 0..units.len() {
            if placements[index].is_some() {
                continue;
            }
            if self.cancel.is_cancelled() {
                debug!("Search cancelled while completing unit {index}");
                return Err(EngineError::Cancelled);
            }
            let unit = &units[index];
            let best = self.candidates(unit, &board).first().copied();
            if let Some(placement) = best {
                board.place(index, unit, placement);
                placements[index] = Some(placement);
            } else if exchange(problem, &mut board, &mut placements, index).is_some() {
                exchanged += 1;
            }
        }

        debug!(
            "Completed {}/{} units ({} by chain exchange)",
            placements.iter().filter(|p| p.is_some()).count(),
            units.len(),
            exchanged
        );
        Ok(placements)
    }

    /// Ranked `(slot, teacher)` candidates for a unit.
    fn candidates(&mut self, unit: &DemandUnit, board: &Board) -> Vec<Placement> {
        let problem = self.problem;
        let qualified = &problem.qualified[unit.subject];
        let pair = board.pair(unit.class, unit.subject);
        let has_teacher = self.options.prefer_same_teacher
            && qualified
                .iter()
                .any(|&t| board.pair_teacher[pair * board.teachers + t] > 0);

        let mut ranked: Vec<(RankKey, Placement)> = Vec::new();
        for slot in 0..board.slots {
            if !board.is_free(unit.class, slot) {
                continue;
            }
            let day = slot / board.periods;
            let same_day = board.day_count[pair * board.days + day];
            let adjacent = self.options.avoid_consecutive_same_subject
                && board.adjacent_same(unit, slot);

            for &teacher in qualified {
                if board.is_busy(teacher, slot) || board.is_banned(pair, slot, teacher) {
                    continue;
                }
                let new_teacher =
                    has_teacher && board.pair_teacher[pair * board.teachers + teacher] == 0;
                let tie = match self.rng.as_mut() {
                    Some(rng) => rng.random::<u64>(),
                    None => (slot * board.teachers + teacher) as u64,
                };
                ranked.push((
                    RankKey {
                        same_day,
                        adjacent,
                        new_teacher,
                        load: board.load[teacher],
                        tie,
                    },
                    (slot, teacher),
                ));
            }
        }

        ranked.sort_unstable_by_key(|(key, _)| *key);
        ranked.into_iter().map(|(_, placement)| placement).collect()
    }

    /// Emits progress each time the deepest placement crosses a 10% step
    /// of the 10..90 placement band.
    fn report_depth(&mut self, depth: usize, total: usize) {
        let decile = depth * 8 / total.max(1);
        if decile > self.reported_decile {
            self.reported_decile = decile;
            let percent = 10 + (decile * 10) as u8;
            self.sink.report(Progress::new(
                percent,
                format!("Placed {depth} of {total} lessons"),
            ));
        }
    }
}
