/*****************************************************************************************[core.rs]
Copyright (c) 2003-2006, Niklas Een, Niklas Sorensson (MiniSat)
Copyright (c) 2007-2010, Niklas Sorensson (MiniSat)

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or
substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
**************************************************************************************************/

use {
    crate::callbacks::{Callbacks, ProgressStatus},
    crate::clause::{
        self, lbool, CRef, ClauseAllocator, ClauseRef, DeletePred, LSet, Lit, OccLists,
        OccListsData, VMap, VSet, Var,
    },
    crate::er::{ErOpts, ExtDefMap},
    crate::interface::SolverInterface,
    crate::intmap::{AsIndex, Comparator, Heap, HeapData},
    crate::vmtf::VmtfQueue,
    fnv::FnvHashMap,
    std::{
        cmp, f64, fmt, i32, io, mem,
        sync::atomic::{AtomicBool, Ordering},
    },
};

/// Variable branching discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchMode {
    /// Exponentially decayed activity bumps (the MiniSat scheme).
    Vsids,
    /// Learning-rate branching: reward on unassign via an exponential
    /// moving average, with anti-exploration decay of stale variables.
    Lrb,
    /// Move-to-front queue ordered by bump timestamps.
    Vmtf,
}

/// When boolean constraint propagation performs the enqueued assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcpMode {
    /// Propagate in trail order (default).
    Immediate,
    /// Stash implied literals in a priority queue; assign on pop.
    Delayed,
}

/// Ordering of the delayed propagation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcpPriority {
    /// Highest variable activity first.
    Activity,
    /// Variables occurring most often in the smallest clauses first.
    MaxOccMin,
}

/// How `reduce_db` ranks learnt clauses for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducePolicy {
    /// Clauses of size > 2 with lower activity go first; binary clauses are
    /// never deleted.
    Activity,
    /// Higher literal-block-distance goes first; glue clauses (LBD <= 2)
    /// and binary clauses are kept.
    Lbd,
}

/// The main solver structure
///
/// A `Solver` object contains the whole state of the SAT solver, including
/// a clause allocator, literals, clauses, and statistics.
///
/// It is parametrized by `Callbacks`
pub struct Solver<Cb: Callbacks> {
    // Extra results: (read-only member variable)
    /// If problem is satisfiable, this vector contains the model (if any).
    model: Vec<lbool>,
    /// If problem is unsatisfiable under assumptions, this set holds the
    /// subset of assumptions responsible (the unsat core).
    conflict: LSet,

    cb: Cb, // the callbacks
    asynch_interrupt: AtomicBool,

    /// List of problem clauses.
    clauses: Vec<CRef>,
    /// List of learnt clauses.
    learnts: Vec<CRef>,

    v: SolverV,
    tmp_c_add_cl: Vec<Lit>, // used when adding extension definitions
}

/// The current assignments, and the per-variable branching state.
struct VarState {
    /// A heuristic measurement of the activity of a variable.
    activity: VMap<f64>,
    /// Current assignment for each variable.
    ass: VMap<lbool>,
    /// Stores reason and level for each variable.
    vardata: VMap<VarData>,
    /// Amount to bump next variable with.
    var_inc: f64,
    var_decay: f64,

    branch_mode: BranchMode,

    // Learning-rate branching (LRB) state.
    step_size: f64,
    step_size_dec: f64,
    min_step_size: f64,
    /// Conflict counter value when the variable was assigned.
    assigned_at: VMap<u64>,
    /// Conflicts the variable participated in since assignment.
    participated: VMap<u32>,
    /// Near-miss counter: variable occurred in a reason clause on the
    /// conflict side without entering the learnt clause.
    almost_conflicted: VMap<u32>,
    /// Conflict counter value when the variable was last unassigned.
    canceled: VMap<u64>,

    /// Total number of conflicts so far.
    conflicts: u64,

    /// Assignment stack; stores all assigments made in the order they were made.
    trail: Vec<Lit>,
    /// Separator indices for different decision levels in `trail`.
    trail_lim: Vec<i32>,
}

/// The propagation queue.
///
/// In immediate mode this is nothing more than the `qhead` cursor owned by
/// the solver; in delayed mode implied literals are parked here, softly
/// assigned, and only truly assigned when popped.
struct PropQueue {
    mode: BcpMode,
    priority: BcpPriority,
    heap_data: HeapData<Lit>,
    /// Soft (queued but not yet performed) assignment per variable.
    soft: VMap<lbool>,
    /// Reason recorded at enqueue time, installed on pop.
    reason: VMap<CRef>,
    /// Per-variable minimum clause size and occurrence count at that size.
    occ: VMap<OccCount>,
}

struct SolverV {
    vars: VarState,

    learntsize_adjust_start_confl: i32,
    learntsize_adjust_inc: f64,
    max_learnts: f64,
    learntsize_adjust_confl: f64,
    learntsize_adjust_cnt: i32,

    remove_satisfied: bool,

    // Statistics: (read-only member variable)
    solves: u64,
    starts: u64,
    decisions: u64,
    rnd_decisions: u64,
    propagations: u64,
    dec_vars: u64,
    max_literals: u64,
    tot_literals: u64,

    num_clauses: u64,
    num_learnts: u64,
    clauses_literals: u64,
    learnts_literals: u64,

    ext_created: u64,
    ext_deleted: u64,
    ext_substituted: u64,

    // Mode of operation:
    clause_decay: f64,
    random_var_freq: f64,
    random_seed: f64,
    luby_restart: bool,
    /// Controls conflict clause minimization (0=none, 1=basic, 2=deep).
    ccmin_mode: i32,
    /// Controls the level of phase saving (0=none, 1=limited, 2=full).
    phase_saving: i32,
    /// Use random polarities for branching heuristics.
    rnd_pol: bool,
    /// Initialize variable activities with a small random value.
    rnd_init_act: bool,
    /// The fraction of wasted memory allowed before a garbage collection is triggered.
    garbage_frac: f64,
    /// Minimum number to set the learnts limit to.
    min_learnts_lim: i32,
    /// Learnt clause deletion ranking.
    reduce_policy: ReducePolicy,
    /// Propagation count (absolute) after which LRB hands over to VSIDS.
    vsids_props_limit: u64,
    /// Shuffle the VMTF queue at restart points.
    shuffle_queue: bool,
    /// Number of shuffles performed; xors into the seed for each shuffle.
    shuffles: u64,

    /// The initial restart limit. (default 100)
    restart_first: i32,
    /// The factor with which the restart limit is multiplied in each restart. (default 2.0)
    restart_inc: f64,
    /// The intitial limit for learnt clauses is a factor of the original clauses. (default 1 / 3)
    learntsize_factor: f64,
    /// The limit for learnt clauses is multiplied with this factor each restart. (default 1.1)
    learntsize_inc: f64,

    /// The preferred polarity of each variable.
    polarity: VMap<bool>,
    /// The users preferred polarity of each variable.
    user_pol: VMap<lbool>,
    /// Declares if a variable is eligible for selection in the decision heuristic.
    decision: VMap<bool>,
    /// `watches[lit]` is a list of constraints watching 'lit' (will go there if literal becomes true).
    watches_data: OccListsData<Lit, Watcher>,
    /// Binary clauses get their own watch lists, traversed first.
    watches_bin_data: OccListsData<Lit, Watcher>,
    /// A priority queue of variables ordered with respect to the variable activity.
    order_heap_data: HeapData<Var>,
    /// Move-to-front variable order, used when `branch_mode` is `Vmtf`.
    vmtf: VmtfQueue,
    /// The propagation queue (delayed-mode state).
    bcp: PropQueue,
    /// If `false`, the constraints are already unsatisfiable. No part of the solver state may be used!
    ok: bool,
    /// Amount to bump next clause with.
    cla_inc: f64,
    /// Head of queue (as index into the trail).
    qhead: i32,
    /// Number of top-level assignments since last execution of 'simplify()'.
    simp_db_assigns: i32,
    /// Remaining number of propagations that must be made before next execution of 'simplify()'.
    simp_db_props: i64,
    /// Set by `search()`.
    progress_estimate: f64,

    /// Next variable to be created.
    next_var: Var,
    ca: ClauseAllocator,

    /// Current set of assumptions provided to solve by the user.
    assumptions: Vec<Lit>,

    // Extended resolution.
    er_opts: ErOpts,
    ext_defs: ExtDefMap,
    /// Definition clauses per extension variable (by index).
    ext_def_clauses: FnvHashMap<u32, Vec<CRef>>,

    // Temporaries (to reduce allocation overhead). Each variable is prefixed by the method in
    // which it is used, except `seen` wich is used in several places.
    seen: VMap<Seen>,
    minimize_stack: Vec<Lit>,
    analyze_toclear: Vec<Lit>,
    analyze_vmtf: Vec<Var>,

    /// Level stamps for LBD computation.
    lbd_stamp: Vec<u64>,
    lbd_counter: u64,

    // Resource contraints:
    conflict_budget: i64,
    propagation_budget: i64,
}

/// Print the model as DIMACS
pub struct SolverPrintDimacs<'a, Cb: Callbacks + 'a> {
    s: &'a Solver<Cb>,
}

impl<'a, Cb: Callbacks> fmt::Display for SolverPrintDimacs<'a, Cb> {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        write!(out, "v ")?;
        for (i, &val) in self.s.model.iter().enumerate() {
            if val == lbool::TRUE {
                write!(out, "{} ", i + 1)?
            } else if val == lbool::FALSE {
                write!(out, "-{} ", i + 1)?
            }
        }
        writeln!(out, "0")
    }
}

// public API
impl<Cb: Callbacks> SolverInterface for Solver<Cb> {
    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        self.v.new_var(upol, dvar)
    }

    fn new_var_default(&mut self) -> Var {
        self.new_var(lbool::UNDEF, true)
    }

    fn var_of_int(&mut self, v_idx: u32) -> Var {
        while v_idx >= self.num_vars() {
            self.new_var_default();
        }
        let var = Var::from_idx(v_idx);
        debug_assert_eq!(var.idx(), v_idx);
        var
    }

    // in the API, we can only add clauses at level 0
    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool {
        debug!("add toplevel clause {:?}", clause);
        debug_assert_eq!(
            self.v.decision_level(),
            0,
            "add clause at non-zero decision level"
        );
        match self.add_clause_core(clause) {
            Added::Unsat => false,
            _ => true,
        }
    }

    fn simplify(&mut self) -> bool {
        self.simplify_internal()
    }

    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool {
        self.asynch_interrupt.store(false, Ordering::SeqCst);
        self.v.assumptions.clear();
        self.v.assumptions.extend_from_slice(assumps);
        self.solve_internal()
    }

    fn value_var(&self, v: Var) -> lbool {
        self.model
            .get(v.idx() as usize)
            .map_or(lbool::UNDEF, |&v| v)
    }
    fn value_lit(&self, v: Lit) -> lbool {
        self.value_var(v.var()) ^ !v.sign()
    }
    fn get_model(&self) -> &[lbool] {
        &self.model
    }
    fn is_ok(&self) -> bool {
        self.v.ok
    }

    fn num_vars(&self) -> u32 {
        self.v.num_vars()
    }
    fn num_clauses(&self) -> u64 {
        self.v.num_clauses()
    }
    fn num_conflicts(&self) -> u64 {
        self.v.num_conflicts()
    }
    fn num_propagations(&self) -> u64 {
        self.v.num_props()
    }
    fn num_decisions(&self) -> u64 {
        self.v.decisions
    }
    fn num_restarts(&self) -> u64 {
        self.v.starts
    }

    fn value_lvl_0(&self, lit: Lit) -> lbool {
        let mut res = self.v.value_lit(lit);
        if self.v.level(lit.var()) != 0 {
            res = lbool::UNDEF;
        }
        res
    }

    fn print_stats(&self) {
        println!("c restarts              : {}", self.v.starts);
        println!("c conflicts             : {:<12}", self.v.num_conflicts());
        println!(
            "c decisions             : {:<12}   ({:4.2} % random)",
            self.v.decisions,
            self.v.rnd_decisions as f32 * 100.0 / self.v.decisions as f32
        );
        println!("c propagations          : {:<12}", self.v.propagations);
        println!(
            "c conflict literals     : {:<12}   ({:4.2} % deleted)",
            self.v.tot_literals,
            (self.v.max_literals - self.v.tot_literals) as f64 * 100.0 / self.v.max_literals as f64
        );
        if self.v.er_opts.enabled {
            println!(
                "c extension vars        : {:<12}   (deleted: {}, substituted: {})",
                self.v.ext_created, self.v.ext_deleted, self.v.ext_substituted
            );
        }
    }

    fn unsat_core(&self) -> &[Lit] {
        self.conflict.as_slice()
    }

    fn unsat_core_contains_lit(&self, lit: Lit) -> bool {
        self.conflict.has(lit)
    }

    fn unsat_core_contains_var(&self, v: Var) -> bool {
        let lit = Lit::new(v, true);
        self.unsat_core_contains_lit(lit) || self.unsat_core_contains_lit(!lit)
    }

    fn proved_at_lvl_0(&self) -> &[Lit] {
        self.v.vars.proved_at_lvl_0()
    }
}

impl<Cb: Callbacks + Default> Default for Solver<Cb> {
    fn default() -> Self {
        Solver::new(SolverOpts::default(), Default::default())
    }
}

// main algorithm
impl<Cb: Callbacks> Solver<Cb> {
    /// Create a new solver with the given options and callbacks.
    pub fn new(opts: SolverOpts, cb: Cb) -> Self {
        assert!(opts.check());
        Self {
            model: vec![],
            conflict: LSet::new(),
            cb,
            clauses: vec![],
            learnts: vec![],
            asynch_interrupt: AtomicBool::new(false),
            v: SolverV::new(&opts),
            tmp_c_add_cl: vec![],
        }
    }

    /// Begins a new decision level.
    fn new_decision_level(&mut self) {
        trace!("new decision level {}", 1 + self.v.decision_level());
        self.v.vars.new_decision_level();
    }

    fn simplify_internal(&mut self) -> bool {
        debug_assert_eq!(self.v.decision_level(), 0);

        if !self.v.ok || self.v.propagate().is_some() {
            self.v.ok = false;
            return false;
        }

        if self.v.num_assigns() as i32 == self.v.simp_db_assigns || self.v.simp_db_props > 0 {
            return true;
        }

        self.remove_satisfied(ClauseSetSelect::Learnt); // Remove satisfied learnt clauses
        if self.v.remove_satisfied {
            self.remove_satisfied(ClauseSetSelect::Original); // remove satisfied normal clauses
        }
        self.check_garbage();
        self.v.rebuild_order_heap();
        self.cb.on_simplify();

        self.v.simp_db_assigns = self.v.num_assigns() as i32;
        // (shouldn't depend on stats really, but it will do for now)
        self.v.simp_db_props = (self.v.clauses_literals + self.v.learnts_literals) as i64;

        true
    }

    /// Search for a model the specified number of conflicts.
    ///
    /// Use negative value for `nof_conflicts` indicate infinity.
    ///
    /// # Output:
    ///
    /// - `lbool::TRUE` if a partial assigment that is consistent with respect to the clauseset is found. If
    ///    all variables are decision variables, this means that the clause set is satisfiable.
    /// - `lbool::FALSE` if the clause set is unsatisfiable.
    /// - `lbool::UNDEF` if the bound on number of conflicts is reached.
    fn search(&mut self, nof_conflicts: i32, tmp_learnt: &mut Vec<Lit>) -> lbool {
        debug_assert!(self.v.ok);
        let mut conflict_c = 0;
        self.v.starts += 1;

        loop {
            // boolean propagation
            let confl = self.v.propagate();

            if let Some(confl) = confl {
                // conflict analysis
                self.v.vars.conflicts += 1;
                conflict_c += 1;
                if self.v.decision_level() == 0 {
                    return lbool::FALSE;
                }

                let (backtrack_lvl, lbd) = self.v.analyze(confl, &self.learnts, tmp_learnt);
                self.add_learnt_and_backtrack(tmp_learnt, backtrack_lvl, lbd);

                match self.v.vars.branch_mode {
                    BranchMode::Vsids => self.v.vars.var_decay_activity(),
                    BranchMode::Lrb => self.v.vars.step_size_decay(),
                    BranchMode::Vmtf => (),
                }
                self.v.cla_decay_activity();

                // learning-rate branching hands over to VSIDS after a while
                if self.v.vars.branch_mode == BranchMode::Lrb
                    && self.v.propagations >= self.v.vsids_props_limit
                {
                    info!("branching.switch-to-vsids at {} props", self.v.propagations);
                    self.v.vars.branch_mode = BranchMode::Vsids;
                    self.v.rebuild_order_heap();
                }

                self.v.learntsize_adjust_cnt -= 1;
                if self.v.learntsize_adjust_cnt == 0 {
                    self.v.learntsize_adjust_confl *= self.v.learntsize_adjust_inc;
                    self.v.learntsize_adjust_cnt = self.v.learntsize_adjust_confl as i32;
                    self.v.max_learnts *= self.v.learntsize_inc;

                    let trail_lim_head = self
                        .v
                        .vars
                        .trail_lim
                        .first()
                        .cloned()
                        .unwrap_or(self.v.vars.trail.len() as i32);
                    let v = &self.v;
                    self.cb.on_progress(|| ProgressStatus {
                        conflicts: v.num_conflicts() as i32,
                        dec_vars: v.dec_vars as i32 - trail_lim_head,
                        n_clauses: v.num_clauses(),
                        n_clause_lits: v.clauses_literals as i32,
                        max_learnt: v.max_learnts as i32,
                        n_learnt: v.num_learnts(),
                        n_learnt_lits: v.learnts_literals as f64 / v.num_learnts as f64,
                        progress_estimate: v.progress_estimate() * 100.0,
                    });
                }
            } else {
                // no conflict
                if (nof_conflicts >= 0 && conflict_c >= nof_conflicts) || !self.within_budget() {
                    // Reached bound on number of conflicts:
                    self.v.progress_estimate = self.v.progress_estimate();
                    self.cancel_until(0);
                    return lbool::UNDEF;
                }

                // Simplify the set of problem clauses:
                if self.v.decision_level() == 0 && !self.simplify_internal() {
                    return lbool::FALSE;
                }

                if self.learnts.len() as f64 - self.v.num_assigns() as f64 >= self.v.max_learnts {
                    // Reduce the set of learnt clauses:
                    self.reduce_db();
                }

                // select the next decision (using assumptions, or the branching heuristic)
                let mut next = Lit::UNDEF;
                while (self.v.decision_level() as usize) < self.v.assumptions.len() {
                    // Perform user provided assumption:
                    let p = self.v.assumptions[self.v.decision_level() as usize];
                    if self.v.value_lit(p) == lbool::TRUE {
                        // Dummy decision level, since `p` is true already:
                        self.new_decision_level();
                    } else if self.v.value_lit(p) == lbool::FALSE {
                        // `p` is impossible under the earlier assumptions, unsat
                        let mut conflict = mem::replace(&mut self.conflict, LSet::new());
                        self.v.analyze_final(p, &mut conflict);
                        self.conflict = conflict;
                        return lbool::FALSE;
                    } else {
                        next = p;
                        break;
                    }
                }

                if next == Lit::UNDEF {
                    // new variable decision:
                    next = self.v.pick_branch_lit();

                    if next == Lit::UNDEF {
                        // Model found:
                        return lbool::TRUE;
                    }
                    self.v.decisions += 1;
                }

                debug_assert_ne!(next, Lit::UNDEF);

                // Increase decision level and enqueue `next`
                // with no justification since it's a decision
                self.new_decision_level();
                debug!("pick-next {:?}", next);
                self.v.vars.unchecked_enqueue(next, CRef::UNDEF);
            }
        }
    }

    /// Add a learnt clause and backtrack/propagate as necessary
    fn add_learnt_and_backtrack(&mut self, learnt: &[Lit], backtrack_lvl: i32, lbd: u32) {
        self.cb.on_new_clause(learnt, clause::Kind::Learnt);
        self.cancel_until(backtrack_lvl as u32);

        // propagate the only lit of `learnt` that isn't false
        if learnt.len() == 1 {
            // directly propagate the unit clause at level 0
            self.v.vars.unchecked_enqueue(learnt[0], CRef::UNDEF);
        } else if learnt.len() == 0 {
            self.v.ok = false;
        } else {
            // propagate the lit, justified by `cr`
            let cr = self.v.ca.alloc_with_learnt(learnt, true);
            self.v.ca.get_mut(cr).set_lbd(lbd);
            self.learnts.push(cr);
            self.v.attach_clause(cr);
            self.v.cla_bump_activity(&self.learnts, cr);
            self.v.vars.unchecked_enqueue(learnt[0], cr);
        }
    }

    /// Main solve method (assumptions given in `self.assumptions`).
    fn solve_internal(&mut self) -> lbool {
        assert!(self.v.decision_level() == 0);
        self.model.clear();
        self.conflict.clear();
        if !self.v.ok {
            return lbool::FALSE;
        }

        self.v.solves += 1;
        let mut tmp_learnt: Vec<Lit> = vec![];

        self.v.max_learnts = self.num_clauses() as f64 * self.v.learntsize_factor;
        if self.v.max_learnts < self.v.min_learnts_lim as f64 {
            self.v.max_learnts = self.v.min_learnts_lim as f64;
        }

        self.v.learntsize_adjust_confl = self.v.learntsize_adjust_start_confl as f64;
        self.v.learntsize_adjust_cnt = self.v.learntsize_adjust_confl as i32;
        let mut status;

        info!("search.start");
        self.cb.on_start();

        // Search:
        let mut curr_restarts: i32 = 0;
        loop {
            let rest_base = if self.v.luby_restart {
                utils::luby(self.v.restart_inc, curr_restarts)
            } else {
                f64::powi(self.v.restart_inc, curr_restarts)
            };
            let nof_clauses = (rest_base * self.v.restart_first as f64) as i32;
            status = self.search(nof_clauses, &mut tmp_learnt);
            if !self.within_budget() {
                break;
            }

            if status != lbool::UNDEF {
                break;
            }

            info!("search.restart({})", curr_restarts);
            curr_restarts += 1;
            self.cb.on_restart();

            // Restart-point maintenance: extension variables and queue shuffling.
            if self.v.er_opts.enabled {
                if curr_restarts as u32 % self.v.er_opts.delete_interval == 0 {
                    self.er_delete_extension_vars();
                }
                self.er_introduce_extension_vars();
                if !self.v.ok {
                    status = lbool::FALSE;
                    break;
                }
            }
            if self.v.vars.branch_mode == BranchMode::Vmtf && self.v.shuffle_queue {
                self.v.shuffle_vmtf();
            }
        }

        self.cb.on_result(status);

        if status == lbool::TRUE {
            // Extend & copy model:
            let num_vars = self.num_vars();
            self.model.resize(num_vars as usize, lbool::UNDEF);
            for i in 0..num_vars {
                self.model[i as usize] = self.v.value(Var::from_idx(i));
            }
        } else if status == lbool::FALSE && self.conflict.len() == 0 {
            // NOTE: we may return `false` without an empty conflict in case we had assumptions. In
            // this case `self.conflict` contains the unsat-core but adding new clauses might
            // succeed in the absence of these assumptions.
            self.v.ok = false;
        }

        self.cancel_until(0);
        debug!("res: {:?}", status);
        status
    }

    /// Remove half of the learnt clauses, minus the clauses locked by the current assignment. Locked
    /// clauses are clauses that are reason to some assignment. Binary clauses are never removed.
    fn reduce_db(&mut self) {
        debug!("reduce_db.start");

        match self.v.reduce_policy {
            ReducePolicy::Activity => {
                // Remove any clause below this activity
                let extra_lim = self.v.cla_inc / self.learnts.len() as f64;
                {
                    let ca = &self.v.ca;
                    self.learnts.sort_unstable_by(|&x, &y| {
                        let x = ca.get_ref(x);
                        let y = ca.get_ref(y);
                        debug_assert!(x.learnt());
                        debug_assert!(y.learnt());
                        Ord::cmp(&(x.size() <= 2), &(y.size() <= 2)).then(
                            PartialOrd::partial_cmp(&x.activity(), &y.activity())
                                .expect("NaN activity"),
                        )
                    });
                }
                // Don't delete binary or locked clauses. From the rest, delete clauses from the
                // first half and clauses with activity smaller than `extra_lim`:
                let mut j = 0;
                for i in 0..self.learnts.len() {
                    let cr = self.learnts[i];
                    let cond = {
                        let c = self.v.ca.get_ref(cr);
                        c.size() > 2
                            && !self.v.locked(c)
                            && (i < self.learnts.len() / 2 || (c.activity() as f64) < extra_lim)
                    };
                    if cond {
                        self.cb.on_delete_clause(self.v.ca.get_ref(cr).lits());
                        self.v.remove_clause(cr);
                    } else {
                        self.learnts[j] = cr;
                        j += 1;
                    }
                }
                let _deleted = self.learnts.len() - j;
                self.learnts.truncate(j);
                debug!("reduce_db.done (deleted {})", _deleted);
            }
            ReducePolicy::Lbd => {
                {
                    let ca = &self.v.ca;
                    self.learnts.sort_unstable_by(|&x, &y| {
                        let x = ca.get_ref(x);
                        let y = ca.get_ref(y);
                        // higher LBD is worse and sorts first
                        Ord::cmp(&y.lbd(), &x.lbd()).then(
                            PartialOrd::partial_cmp(&x.activity(), &y.activity())
                                .expect("NaN activity"),
                        )
                    });
                }
                let half = self.learnts.len() / 2;
                let mut j = 0;
                for i in 0..self.learnts.len() {
                    let cr = self.learnts[i];
                    let cond = {
                        let c = self.v.ca.get_ref(cr);
                        c.size() > 2 && c.lbd() > 2 && !self.v.locked(c) && i < half
                    };
                    if cond {
                        self.cb.on_delete_clause(self.v.ca.get_ref(cr).lits());
                        self.v.remove_clause(cr);
                    } else {
                        self.learnts[j] = cr;
                        j += 1;
                    }
                }
                let _deleted = self.learnts.len() - j;
                self.learnts.truncate(j);
                debug!("reduce_db.done (deleted {})", _deleted);
            }
        }

        self.check_garbage();
    }

    /// Shrink the given set to contain only non-satisfied clauses.
    fn remove_satisfied(&mut self, which: ClauseSetSelect) {
        debug_assert_eq!(self.v.decision_level(), 0);
        let cs: &mut Vec<CRef> = match which {
            ClauseSetSelect::Learnt => &mut self.learnts,
            ClauseSetSelect::Original => &mut self.clauses,
        };
        let self_v = &mut self.v;
        cs.retain(|&cr| {
            let satisfied = self_v.satisfied(self_v.ca.get_ref(cr));
            if satisfied {
                self_v.remove_clause(cr);
                debug!("remove satisfied clause {:?}", self_v.ca.get_ref(cr).lits());
            } else {
                let amount_shaved = {
                    let mut c = self_v.ca.get_mut(cr);
                    // Trim clause (but keep the 2 first lits as they are watching):
                    debug_assert_eq!(self_v.vars.value_lit(c[0]), lbool::UNDEF);
                    debug_assert_eq!(self_v.vars.value_lit(c[1]), lbool::UNDEF);
                    let mut k = 2;
                    let orig_size = c.size();
                    let mut end = c.size();
                    while k < end {
                        if self_v.vars.value_lit(c[k]) == lbool::FALSE {
                            // this lit is false at level 0, remove it from `c`
                            debug_assert!(self_v.vars.level(c[k].var()) == 0);
                            end -= 1;
                            let last = c[end];
                            c[k] = last;
                        } else {
                            k += 1;
                        }
                    }
                    if end < 3 {
                        // shrinking below 3 would move the clause into the
                        // binary size class while its watchers stay in the
                        // long lists; keep the false tail instead
                        0
                    } else {
                        c.shrink(end);
                        (orig_size - end) as usize
                    }
                };
                self_v.ca.free_amount(amount_shaved);
            }
            !satisfied
        });
    }

    /// Revert to the state at given level (keeping all assignment at `level` but not beyond).
    fn cancel_until(&mut self, level: u32) {
        if self.v.decision_level() > level {
            trace!("solver.cancel-until {}", level);
            self.v.cancel_until(level);
        }
    }

    /// Garbage collect the clause allocator by moving alive clauses into
    /// another allocator.
    fn garbage_collect(&mut self) {
        // Initialize the next region to a size corresponding to the estimated utilization degree. This
        // is not precise but should avoid some unnecessary reallocations for the new region:
        let mut to = ClauseAllocator::with_start_cap(self.v.ca.len() - self.v.ca.wasted());

        self.v
            .reloc_all(&mut self.learnts, &mut self.clauses, &mut to);

        self.cb.on_gc(
            self.v.ca.len() * ClauseAllocator::UNIT_SIZE as usize,
            to.len() * ClauseAllocator::UNIT_SIZE as usize,
        );
        self.v.ca = to;
    }

    /// Check whether the space wasted by dead clauses in the clause allocator exceeds
    /// the threshold
    fn check_garbage(&mut self) {
        if self.v.ca.wasted() as f64 > self.v.ca.len() as f64 * self.v.garbage_frac {
            self.garbage_collect();
        }
    }

    /// Temporary access to the callbacks
    pub fn cb_mut(&mut self) -> &mut Cb {
        &mut self.cb
    }

    /// Temporary access to the callbacks
    pub fn cb(&self) -> &Cb {
        &self.cb
    }

    /// Printer for the model in DIMACS `v` line format.
    pub fn dimacs_model(&self) -> SolverPrintDimacs<Cb> {
        SolverPrintDimacs { s: self }
    }

    /// Write the current clause set in DIMACS, under the given assumptions.
    ///
    /// Satisfied clauses are skipped and false literals elided; the
    /// remaining variables are densely renumbered from 1. Each assumption
    /// contributes one unit clause.
    pub fn to_dimacs<W: io::Write>(&self, out: &mut W, assumps: &[Lit]) -> io::Result<()> {
        if !self.v.ok {
            return write!(out, "p cnf 1 2\n1 0\n-1 0\n");
        }

        let mut map: VMap<i32> = VMap::new();
        let mut max = 0i32;
        let mut cnt = 0usize;

        for &cr in &self.clauses {
            let c = self.v.ca.get_ref(cr);
            if self.v.satisfied(c) {
                continue;
            }
            cnt += 1;
            for &lit in c.iter() {
                if self.v.value_lit(lit) != lbool::FALSE {
                    map_var(&mut map, &mut max, lit.var());
                }
            }
        }
        cnt += assumps.len();
        for &a in assumps {
            map_var(&mut map, &mut max, a.var());
        }

        writeln!(out, "p cnf {} {}", max, cnt)?;
        for &a in assumps {
            debug_assert!(self.v.value_lit(a) != lbool::FALSE);
            writeln!(
                out,
                "{}{} 0",
                if a.sign() { "" } else { "-" },
                map_var(&mut map, &mut max, a.var()) + 1
            )?;
        }
        for &cr in &self.clauses {
            let c = self.v.ca.get_ref(cr);
            if self.v.satisfied(c) {
                continue;
            }
            for &lit in c.iter() {
                if self.v.value_lit(lit) != lbool::FALSE {
                    write!(
                        out,
                        "{}{} ",
                        if lit.sign() { "" } else { "-" },
                        map_var(&mut map, &mut max, lit.var()) + 1
                    )?;
                }
            }
            writeln!(out, "0")?;
        }
        Ok(())
    }

    /// Interrupt search asynchronously
    pub fn interrupt_async(&self) {
        self.asynch_interrupt.store(true, Ordering::Relaxed);
    }

    fn has_been_interrupted(&self) -> bool {
        self.asynch_interrupt.load(Ordering::Relaxed)
    }

    /// Set the maximum number of conflicts allowed before `solve_limited`
    /// gives up (negative: no limit).
    pub fn set_conflict_budget(&mut self, x: i64) {
        self.v.conflict_budget = x;
    }

    /// Set the maximum number of propagations allowed before `solve_limited`
    /// gives up (negative: no limit).
    pub fn set_propagation_budget(&mut self, x: i64) {
        self.v.propagation_budget = x;
    }

    /// Remove all budgets.
    pub fn budget_off(&mut self) {
        self.v.conflict_budget = -1;
        self.v.propagation_budget = -1;
    }

    fn within_budget(&self) -> bool {
        !self.has_been_interrupted()
            && (self.v.conflict_budget < 0
                || self.v.vars.conflicts < self.v.conflict_budget as u64)
            && (self.v.propagation_budget < 0
                || self.v.propagations < self.v.propagation_budget as u64)
            && !self.cb.stop()
    }

    /// Add a clause at level 0; normalizes it first.
    fn add_clause_core(&mut self, clause: &mut Vec<Lit>) -> Added {
        debug_assert_eq!(self.v.decision_level(), 0);
        if !self.v.ok {
            return Added::Unsat;
        }
        clause.sort_unstable();

        let mut last_lit = Lit::UNDEF;
        let mut j = 0;
        // remove duplicates, true literals, etc.
        for i in 0..clause.len() {
            let lit_i = clause[i];
            let value = self.v.value_lit(lit_i);
            let lvl = self.v.level_lit(lit_i);
            if (value == lbool::TRUE && lvl == 0) || lit_i == !last_lit {
                return Added::Absorbed; // tauto or satisfied already at level 0
            } else if !(value == lbool::FALSE && lvl == 0) && lit_i != last_lit {
                // not a duplicate
                last_lit = lit_i;
                clause[j] = lit_i;
                j += 1;
            }
        }

        clause.truncate(j);
        if clause.len() == 0 {
            self.v.ok = false;
            Added::Unsat
        } else if clause.len() == 1 {
            self.v.vars.unchecked_enqueue(clause[0], CRef::UNDEF);
            Added::Unit(clause[0])
        } else {
            let cr = self.v.ca.alloc_with_learnt(&clause, false);
            self.clauses.push(cr);
            self.v.attach_clause(cr);
            Added::Stored(cr)
        }
    }

    //////////////////////
    // Extended resolution

    /// Introduce fresh extension variables defined over literal pairs taken
    /// from the most active learnt clauses. Must be called at level 0.
    fn er_introduce_extension_vars(&mut self) {
        debug_assert_eq!(self.v.decision_level(), 0);
        let opts = self.v.er_opts;
        if self.learnts.is_empty() {
            return;
        }

        let mut cands: Vec<CRef> = {
            let ca = &self.v.ca;
            self.learnts
                .iter()
                .cloned()
                .filter(|&cr| {
                    let c = ca.get_ref(cr);
                    c.mark() == 0 && c.size() >= 3
                })
                .collect()
        };
        {
            let ca = &self.v.ca;
            cands.sort_unstable_by(|&x, &y| {
                PartialOrd::partial_cmp(&ca.get_ref(y).activity(), &ca.get_ref(x).activity())
                    .expect("NaN activity")
                    .then(Ord::cmp(&x.as_index(), &y.as_index()))
            });
        }
        cands.truncate(opts.candidate_clauses as usize);

        let mut added = 0u32;
        let mut fresh: Vec<Var> = vec![];
        for cr in cands {
            if added >= opts.max_new_vars || !self.v.ok {
                break;
            }
            // define over the two watched literals of the candidate
            let (a, b) = {
                let c = self.v.ca.get_ref(cr);
                (c[0], c[1])
            };
            if a.var() == b.var() || self.v.ext_defs.get(a, b).is_some() {
                continue;
            }
            if let Some(x) = self.er_add_definition(a, b) {
                fresh.push(x.var());
                added += 1;
            }
        }

        if !fresh.is_empty() {
            debug!("er.add {} extension vars", fresh.len());
            self.v.ext_created += fresh.len() as u64;
            self.er_prioritize(&fresh);
        }
    }

    /// Allocate `x` with `x ≡ a ∨ b` and emit its three definition clauses.
    fn er_add_definition(&mut self, a: Lit, b: Lit) -> Option<Lit> {
        let v = self.v.new_var(lbool::UNDEF, true);
        let x = Lit::new(v, true);
        debug_assert!(x.var() > a.var() && x.var() > b.var());

        let mut defs: Vec<CRef> = Vec::with_capacity(3);
        let mut tmp = mem::replace(&mut self.tmp_c_add_cl, vec![]);
        for def in &[[!x, a, b].as_ref(), [x, !a].as_ref(), [x, !b].as_ref()] {
            tmp.clear();
            tmp.extend_from_slice(def);
            self.cb.on_new_clause(&tmp, clause::Kind::Extension);
            match self.add_clause_core(&mut tmp) {
                Added::Stored(cr) => defs.push(cr),
                Added::Unsat => break,
                Added::Unit(_) | Added::Absorbed => (),
            }
        }
        self.tmp_c_add_cl = tmp;

        if !self.v.ok {
            return None;
        }
        self.v.ext_def_clauses.insert(v.idx(), defs);
        self.v.ext_defs.insert(x, a, b);
        Some(x)
    }

    /// Give freshly introduced extension variables top branching priority.
    fn er_prioritize(&mut self, fresh: &[Var]) {
        let v = &mut self.v;
        match v.vars.branch_mode {
            BranchMode::Vmtf => {
                for &x in fresh {
                    let unassigned = v.vars.value(x) == lbool::UNDEF;
                    v.vmtf.bump(x, unassigned);
                }
            }
            _ => {
                let target = if !v.order_heap_data.is_empty() {
                    let top = v.order_heap_data[0];
                    v.vars.activity[top] * 1.5
                } else {
                    v.vars.var_inc
                };
                for &x in fresh {
                    v.vars.activity[x] = target;
                    if v.vars.branch_mode == BranchMode::Lrb {
                        v.vars.canceled[x] = v.vars.conflicts;
                    }
                    if v.order_heap().in_heap(x) {
                        v.order_heap().decrease(x);
                    }
                }
            }
        }
    }

    /// Drop stale extension variables: delete learnt clauses mentioning
    /// them and their definition clauses, unless locked. Variables with a
    /// locked definition are retained and retried on a later round.
    fn er_delete_extension_vars(&mut self) {
        debug_assert_eq!(self.v.decision_level(), 0);
        if self.v.ext_def_clauses.is_empty() {
            return;
        }
        let threshold = self.v.max_activity() * self.v.er_opts.delete_activity_frac;

        let mut candidates: VSet = VSet::new();
        let mut cand_list: Vec<Var> = self
            .v
            .ext_def_clauses
            .keys()
            .map(|&i| Var::from_idx(i))
            .collect();
        cand_list.sort_unstable();
        for x in cand_list {
            if self.v.value(x) == lbool::UNDEF && self.v.vars.activity[x] < threshold {
                candidates.insert(x);
            }
        }
        if candidates.len() == 0 {
            return;
        }

        // locked learnt clauses pin their extension variables
        let mut pinned: VSet = VSet::new();
        for &cr in &self.learnts {
            let c = self.v.ca.get_ref(cr);
            if c.mark() != 0 || !self.v.locked(c) {
                continue;
            }
            for &l in c.iter() {
                if candidates.has(l.var()) {
                    pinned.insert(l.var());
                }
            }
        }

        // delete unlocked learnt clauses mentioning a deletable variable
        let mut removed_any = false;
        let mut j = 0;
        for i in 0..self.learnts.len() {
            let cr = self.learnts[i];
            let deletable = {
                let c = self.v.ca.get_ref(cr);
                !self.v.locked(c)
                    && c.iter()
                        .any(|&l| candidates.has(l.var()) && !pinned.has(l.var()))
            };
            if deletable {
                self.cb.on_delete_clause(self.v.ca.get_ref(cr).lits());
                self.v.remove_clause(cr);
                removed_any = true;
            } else {
                self.learnts[j] = cr;
                j += 1;
            }
        }
        self.learnts.truncate(j);

        // drop definitions whose clauses are all unlocked
        let mut deleted = 0u64;
        for k in 0..candidates.len() {
            let x = candidates[k];
            if pinned.has(x) {
                continue;
            }
            let defs = match self.v.ext_def_clauses.get(&x.idx()) {
                Some(d) => d.clone(),
                None => continue,
            };
            let any_locked = defs.iter().any(|&cr| {
                let c = self.v.ca.get_ref(cr);
                c.mark() == 0 && self.v.locked(c)
            });
            if any_locked {
                continue;
            }
            for &cr in &defs {
                if self.v.ca.get_ref(cr).mark() == 0 {
                    self.cb.on_delete_clause(self.v.ca.get_ref(cr).lits());
                    self.v.remove_clause(cr);
                    removed_any = true;
                }
            }
            self.v.ext_def_clauses.remove(&x.idx());
            self.v.ext_defs.remove_def(Lit::new(x, true));
            self.v.set_decision_var(x, false);
            deleted += 1;
        }

        if deleted > 0 {
            // definition clauses live in the problem clause list
            let ca = &self.v.ca;
            self.clauses.retain(|&cr| ca.get_ref(cr).mark() == 0);
            self.v.ext_deleted += deleted;
            debug!("er.delete {} extension vars", deleted);
        }
        if removed_any {
            self.check_garbage();
        }
    }
}

fn map_var(map: &mut VMap<i32>, max: &mut i32, x: Var) -> i32 {
    map.reserve(x, -1);
    if map[x] == -1 {
        map[x] = *max;
        *max += 1;
    }
    map[x]
}

/// Outcome of clause normalization in `add_clause_core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Added {
    /// The clause emptied out; the solver is now unsat.
    Unsat,
    /// Tautology or already satisfied at level 0; nothing stored.
    Absorbed,
    /// Shrunk to one literal, asserted at level 0.
    Unit(Lit),
    /// Stored in the allocator and attached.
    Stored(CRef),
}

impl SolverV {
    #[inline(always)]
    pub fn num_assigns(&self) -> u32 {
        self.vars.num_assigns()
    }

    #[inline(always)]
    fn num_vars(&self) -> u32 {
        self.next_var.idx()
    }
    fn num_clauses(&self) -> u64 {
        self.num_clauses
    }
    fn num_conflicts(&self) -> u64 {
        self.vars.conflicts
    }
    fn num_props(&self) -> u64 {
        self.propagations
    }
    fn num_learnts(&self) -> u64 {
        self.num_learnts
    }

    #[inline(always)]
    pub fn level(&self, x: Var) -> i32 {
        self.vars.level(x)
    }

    #[inline(always)]
    pub fn level_lit(&self, x: Lit) -> i32 {
        self.level(x.var())
    }

    #[inline(always)]
    pub fn value(&self, x: Var) -> lbool {
        self.vars.value(x)
    }

    #[inline(always)]
    pub fn value_lit(&self, x: Lit) -> lbool {
        self.vars.value_lit(x)
    }

    fn order_heap(&mut self) -> Heap<Var, VarOrder> {
        self.order_heap_data.promote(VarOrder {
            activity: &self.vars.activity,
        })
    }

    fn set_decision_var(&mut self, v: Var, b: bool) {
        if b && !self.decision[v] {
            self.dec_vars += 1;
        } else if !b && self.decision[v] {
            self.dec_vars -= 1;
        }
        self.decision[v] = b;
        self.insert_var_order(v);
    }

    fn insert_var_order(&mut self, x: Var) {
        if self.vars.branch_mode == BranchMode::Vmtf {
            // queue membership is permanent; eligibility is checked at pick time
            return;
        }
        if !self.order_heap().in_heap(x) && self.decision[x] {
            self.order_heap().insert(x);
        }
    }

    fn max_activity(&self) -> f64 {
        if self.order_heap_data.is_empty() {
            self.vars.var_inc
        } else {
            self.vars.activity[self.order_heap_data[0]]
        }
    }

    fn cla_decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.clause_decay;
    }

    fn cla_bump_activity(&mut self, learnts: &[CRef], cr: CRef) {
        let new_activity = {
            let mut c = self.ca.get_mut(cr);
            let r = c.activity() + self.cla_inc as f32;
            c.set_activity(r);
            r
        };
        if new_activity > 1e20 {
            // Rescale:
            for &learnt in learnts.iter() {
                let mut c = self.ca.get_mut(learnt);
                let r = c.activity() * 1e-20;
                c.set_activity(r);
            }
            self.cla_inc *= 1e-20;
        }
    }

    /// Pick a literal to make a decision with
    fn pick_branch_lit(&mut self) -> Lit {
        let mut next = Var::UNDEF;

        if self.vars.branch_mode == BranchMode::Vmtf {
            let vars = &self.vars;
            let decision = &self.decision;
            next = self
                .vmtf
                .pick(|v| decision[v] && vars.value(v) == lbool::UNDEF)
                .unwrap_or(Var::UNDEF);
        } else {
            // Random decision:
            if utils::drand(&mut self.random_seed) < self.random_var_freq
                && !self.order_heap_data.is_empty()
            {
                let idx_tmp =
                    utils::irand(&mut self.random_seed, self.order_heap_data.len() as i32) as usize;
                next = self.order_heap_data[idx_tmp];
                if self.value(next) == lbool::UNDEF && self.decision[next] {
                    self.rnd_decisions += 1;
                }
            }

            // Activity based decision:
            while next == Var::UNDEF || self.value(next) != lbool::UNDEF || !self.decision[next] {
                if self.order_heap_data.is_empty() {
                    next = Var::UNDEF;
                    break;
                }
                if self.vars.branch_mode == BranchMode::Lrb {
                    // Anti-exploration: demote variables untouched for many
                    // conflicts before trusting their stale activity.
                    loop {
                        let top = self.order_heap_data[0];
                        let age = self.vars.conflicts - self.vars.canceled[top];
                        if age == 0 || self.value(top) != lbool::UNDEF {
                            break;
                        }
                        let decay = f64::powi(0.95, age.min(i32::MAX as u64) as i32);
                        self.vars.activity[top] *= decay;
                        if self.order_heap().in_heap(top) {
                            self.order_heap().increase(top);
                        }
                        self.vars.canceled[top] = self.vars.conflicts;
                    }
                }
                next = self.order_heap().remove_min();
            }
        }

        // Choose polarity based on different polarity modes (global or per-variable):
        if next == Var::UNDEF {
            Lit::UNDEF
        } else if self.user_pol[next] != lbool::UNDEF {
            Lit::new(next, self.user_pol[next] == lbool::TRUE)
        } else if self.rnd_pol {
            Lit::new(next, utils::drand(&mut self.random_seed) < 0.5)
        } else {
            Lit::new(next, self.polarity[next])
        }
    }

    fn watches(&mut self) -> OccLists<Lit, Watcher, WatcherDeleted> {
        self.watches_data.promote(WatcherDeleted { ca: &self.ca })
    }

    fn watches_bin(&mut self) -> OccLists<Lit, Watcher, WatcherDeleted> {
        self.watches_bin_data
            .promote(WatcherDeleted { ca: &self.ca })
    }

    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        let v = self.next_var;
        self.next_var = Var::from_idx(self.next_var.idx() + 1);

        self.watches().init(Lit::new(v, false));
        self.watches().init(Lit::new(v, true));
        self.watches_bin().init(Lit::new(v, false));
        self.watches_bin().init(Lit::new(v, true));
        self.vars.ass.insert_default(v, lbool::UNDEF);
        self.vars
            .vardata
            .insert_default(v, VarData::new(CRef::UNDEF, 0));
        if self.rnd_init_act {
            self.vars
                .activity
                .insert_default(v, utils::drand(&mut self.random_seed) * 0.00001);
        } else {
            self.vars.activity.insert_default(v, 0.0);
        }
        self.vars.assigned_at.insert_default(v, 0);
        self.vars.participated.insert_default(v, 0);
        self.vars.almost_conflicted.insert_default(v, 0);
        self.vars.canceled.insert_default(v, 0);
        self.bcp.soft.insert_default(v, lbool::UNDEF);
        self.bcp.reason.insert_default(v, CRef::UNDEF);
        self.bcp.occ.insert_default(v, OccCount::default());
        self.seen.insert_default(v, Seen::UNDEF);
        self.polarity.insert_default(v, false);
        self.user_pol.insert_default(v, upol);
        self.decision.reserve_default(v);
        self.lbd_stamp.push(0);
        self.vmtf.init_var(v);
        let len = self.vars.trail.len();
        if v.idx() as usize > len {
            self.vars.trail.reserve(v.idx() as usize + 1 - len);
        }
        self.set_decision_var(v, dvar);
        v
    }

    /// Analyze conflict and produce a learnt clause.
    ///
    /// # Pre-conditions:
    ///
    /// - current decision level must be greater than root level.
    /// - `orig` is falsified by the current trail.
    ///
    /// # Post-conditions:
    ///
    /// - the backjump level and the LBD of the learnt clause are returned.
    /// - `out_learnt[0]` is the asserting literal at the backjump level.
    /// - if `out_learnt.len() > 1` then `out_learnt[1]` has the greatest decision level of the
    ///   rest of literals. There may be others from the same level though.
    fn analyze(&mut self, orig: CRef, learnts: &[CRef], out_learnt: &mut Vec<Lit>) -> (i32, u32) {
        debug!("analyze.start {:?}", orig);
        out_learnt.clear();
        out_learnt.push(Lit::UNDEF); // leave room for the asserting literal
        self.analyze_vmtf.clear();

        let conflict_level = self.decision_level() as i32;
        let mut path_c = 0i32;
        let mut p = Lit::UNDEF;
        let mut index = self.vars.trail.len();
        let mut confl = orig;

        loop {
            debug_assert_ne!(confl, CRef::UNDEF, "reached a decision during resolution");

            if self.ca.get_ref(confl).learnt() {
                self.cla_bump_activity(learnts, confl);
                self.refresh_lbd(confl);
            }

            let start = if p == Lit::UNDEF { 0 } else { 1 };
            let csize = self.ca.get_ref(confl).size();
            for k in start..csize {
                let q = self.ca.get_ref(confl)[k];
                let v = q.var();
                let lvl = self.vars.level(v);
                debug_assert!(lvl <= conflict_level);
                if !self.seen[v].is_seen() && lvl > 0 {
                    self.on_conflict_touch(v);
                    self.seen[v] = Seen::SOURCE;
                    if lvl >= conflict_level {
                        // at conflict level: eliminate this lit by resolution
                        path_c += 1;
                    } else {
                        out_learnt.push(q); // part of the learnt clause
                    }
                }
            }

            // Select next literal in the trail to look at:
            while !self.seen[self.vars.trail[index - 1].var()].is_seen() {
                index -= 1;
            }
            p = self.vars.trail[index - 1];
            index -= 1;
            confl = self.vars.reason(p.var());
            if confl != CRef::UNDEF {
                self.fix_binary_reason(p.var(), confl);
            }
            self.seen[p.var()] = Seen::UNDEF;
            path_c -= 1;

            if path_c <= 0 {
                break;
            }
        }

        debug_assert!(self.value_lit(p) == lbool::TRUE);
        out_learnt[0] = !p;
        trace!("analyze-learnt: {:?} (before minimization)", &out_learnt);
        self.max_literals += out_learnt.len() as u64;

        self.minimize_conflict(out_learnt);

        // Substitute a defined literal pair by its extension variable, when
        // the clause falls in the configured windows. The substituted
        // literal must itself be false below the conflict level so the
        // clause stays asserting.
        if self.er_opts.enabled && !self.ext_defs.is_empty() {
            let w = out_learnt.len() as u32;
            if w >= self.er_opts.sub_min_width && w <= self.er_opts.sub_max_width {
                let lbd0 = self.compute_lbd(out_learnt);
                if lbd0 >= self.er_opts.sub_min_lbd && lbd0 <= self.er_opts.sub_max_lbd {
                    let vars = &self.vars;
                    if let Some(x) = self.ext_defs.substitute_with(out_learnt, |l| {
                        vars.value_lit(l) == lbool::FALSE
                            && vars.level(l.var()) < conflict_level
                    }) {
                        debug_assert_eq!(self.vars.value_lit(x), lbool::FALSE);
                        trace!("er.substitute {:?} into learnt clause", x);
                        self.ext_substituted += 1;
                    }
                }
            }
        }

        // Find correct backtrack level:
        let btlevel = if out_learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            let mut max_level = self.level(out_learnt[max_i].var());
            // Find the first literal assigned at the next-highest level:
            for i in 2..out_learnt.len() {
                let level = self.level(out_learnt[i].var());
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }
            // Swap-in this literal at index 1:
            out_learnt.swap(max_i, 1);
            self.level_lit(out_learnt[1])
        };

        let lbd = self.compute_lbd(out_learnt);

        if self.vars.branch_mode == BranchMode::Lrb {
            self.almost_conflict_pass(out_learnt);
        }
        if self.vars.branch_mode == BranchMode::Vmtf {
            // bump in increasing timestamp order to keep relative recency
            let mut bump = mem::replace(&mut self.analyze_vmtf, vec![]);
            let vmtf = &self.vmtf;
            bump.sort_unstable_by_key(|&v| vmtf.bumped(v));
            for &v in &bump {
                let unassigned = self.vars.value(v) == lbool::UNDEF;
                self.vmtf.bump(v, unassigned);
            }
            self.analyze_vmtf = bump;
        }

        for i in 0..self.analyze_toclear.len() {
            let lit = self.analyze_toclear[i];
            self.seen[lit.var()] = Seen::UNDEF; // (`seen[]` is now cleared)
        }
        debug_assert!(out_learnt
            .iter()
            .all(|&l| self.value_lit(l) == lbool::FALSE));
        (btlevel, lbd)
    }

    /// Binary clauses are never reordered by the propagation fast path, so
    /// a binary reason may hold its propagated literal at position 1. Swap
    /// it into position 0, where resolution and minimization expect it.
    fn fix_binary_reason(&mut self, x: Var, cr: CRef) {
        let mut c = self.ca.get_mut(cr);
        if c.size() == 2 && c[0].var() != x {
            let (a, b) = (c[0], c[1]);
            c[0] = b;
            c[1] = a;
        }
    }

    /// Per-variable bookkeeping when a variable shows up on the conflict side.
    fn on_conflict_touch(&mut self, v: Var) {
        match self.vars.branch_mode {
            BranchMode::Vsids => self
                .vars
                .var_bump_activity(&mut self.order_heap_data, v),
            BranchMode::Lrb => self.vars.participated[v] += 1,
            BranchMode::Vmtf => self.analyze_vmtf.push(v),
        }
    }

    /// Number of distinct decision levels among `lits`.
    fn compute_lbd(&mut self, lits: &[Lit]) -> u32 {
        self.lbd_counter += 1;
        let cnt = self.lbd_counter;
        let mut n = 0u32;
        for &l in lits {
            let lvl = self.vars.level(l.var());
            if lvl >= 0 {
                let s = &mut self.lbd_stamp[lvl as usize];
                if *s != cnt {
                    *s = cnt;
                    n += 1;
                }
            }
        }
        n
    }

    /// Recompute the LBD of a stored clause and keep the smaller value.
    fn refresh_lbd(&mut self, cr: CRef) {
        self.lbd_counter += 1;
        let cnt = self.lbd_counter;
        let mut n = 0u32;
        let size = self.ca.get_ref(cr).size();
        for k in 0..size {
            let l = self.ca.get_ref(cr)[k];
            let lvl = self.vars.level(l.var());
            if lvl >= 0 && self.lbd_stamp[lvl as usize] != cnt {
                self.lbd_stamp[lvl as usize] = cnt;
                n += 1;
            }
        }
        let mut c = self.ca.get_mut(cr);
        if n < c.lbd() {
            c.set_lbd(n);
        }
    }

    /// Credit variables that sat in reason clauses right next to the
    /// conflict without making it into the learnt clause. Feeds the LRB
    /// reward through `almost_conflicted`.
    fn almost_conflict_pass(&mut self, out_learnt: &[Lit]) {
        debug_assert_eq!(self.vars.branch_mode, BranchMode::Lrb);
        // the asserting literal was unmarked during resolution; re-mark it
        // so it does not collect a near-miss credit for itself
        self.seen[out_learnt[0].var()] = Seen::SOURCE;
        for i in (0..out_learnt.len()).rev() {
            let v = out_learnt[i].var();
            let rea = self.vars.reason(v);
            if rea == CRef::UNDEF {
                continue;
            }
            self.fix_binary_reason(v, rea);
            let size = self.ca.get_ref(rea).size();
            for j in 0..size {
                let l = self.ca.get_ref(rea)[j];
                if self.seen[l.var()].is_seen() {
                    continue;
                }
                self.vars.almost_conflicted[l.var()] += 1;
                self.seen[l.var()] = Seen::SOURCE;
                self.analyze_toclear.push(l);
            }
        }
    }

    /// An abstraction of the level of a variable
    #[inline]
    fn abstract_level(&self, v: Var) -> u32 {
        1 << (self.level(v) & 31)
    }

    fn minimize_conflict(&mut self, out_learnt: &mut Vec<Lit>) {
        // Simplify conflict clause:
        self.analyze_toclear.clear();
        self.analyze_toclear.extend_from_slice(&out_learnt);
        let new_size = if self.ccmin_mode == 2 {
            let mut abstract_levels = 0;
            for a in out_learnt[1..].iter() {
                abstract_levels |= self.abstract_level(a.var())
            }

            let mut j = 1;
            for i in 1..out_learnt.len() {
                let lit = out_learnt[i];
                // can eliminate `lit` only if it's redundant *and* not a decision
                if self.reason(lit.var()) == CRef::UNDEF
                    || !self.lit_redundant(lit, abstract_levels)
                {
                    out_learnt[j] = lit;
                    j += 1;
                }
            }
            j
        } else if self.ccmin_mode == 1 {
            let mut j = 1;
            for i in 1..out_learnt.len() {
                let lit = out_learnt[i];
                let x = lit.var();
                let reason = self.reason(x);

                let mut retain = true;
                if reason == CRef::UNDEF {
                    debug_assert!(self.level(x) > 0);
                } else {
                    self.fix_binary_reason(x, reason);
                    retain = false;
                    let c = self.ca.get_ref(reason);
                    for k in 1..c.size() {
                        let v = c[k].var();
                        if !self.seen[v].is_seen() && self.level(v) > 0 {
                            retain = true;
                            break;
                        }
                    }
                }
                if retain {
                    out_learnt[j] = lit;
                    j += 1;
                }
            }
            j
        } else {
            out_learnt.len()
        };

        self.tot_literals += new_size as u64;
        debug_assert!(new_size <= out_learnt.len());
        out_learnt.truncate(new_size);
    }

    /// Specialized analysis procedure to express the final conflict in terms of assumptions.
    /// Calculates the (possibly empty) set of assumptions that led to the falsification of `p`,
    /// and stores the result in `out_conflict`. `p` is the failing assumption itself.
    fn analyze_final(&mut self, p: Lit, out_conflict: &mut LSet) {
        out_conflict.clear();
        out_conflict.insert(p);
        debug!("analyze_final lit={:?}", p);

        if self.decision_level() == 0 {
            return; // no assumptions
        }

        self.seen[p.var()] = Seen::SOURCE;

        let start = self.vars.trail_lim[0] as usize;
        for i in (start..self.vars.trail.len()).rev() {
            let lit = self.vars.trail[i];
            let x = lit.var();
            if self.seen[x].is_seen() {
                let reason = self.reason(x);
                if reason == CRef::UNDEF {
                    // `lit` is an assumption that contributed
                    debug_assert!(self.level(x) > 0);
                    out_conflict.insert(lit);
                } else {
                    self.fix_binary_reason(x, reason);
                    let size = self.ca.get_ref(reason).size();
                    for j in 1..size {
                        let l = self.ca.get_ref(reason)[j];
                        if self.vars.level(l.var()) > 0 {
                            self.seen[l.var()] = Seen::SOURCE;
                        }
                    }
                }
                self.seen[x] = Seen::UNDEF;
            }
        }

        self.seen[p.var()] = Seen::UNDEF;
        debug_assert!(self.seen.iter().all(|(_, &s)| s == Seen::UNDEF));
    }

    /// Check if `p` can be removed from a conflict clause `C`.
    ///
    /// It can be removed from `C` if it is propagation-implied
    /// by literals of level 0 exclusively or if `C x p.reason` subsumes `C`.
    fn lit_redundant(&mut self, p: Lit, abstract_levels: u32) -> bool {
        self.minimize_stack.clear();
        self.minimize_stack.push(p);

        let top = self.analyze_toclear.len();

        while self.minimize_stack.len() > 0 {
            let q = *self.minimize_stack.last().unwrap();
            let cr = self.reason(q.var());
            debug_assert_ne!(cr, CRef::UNDEF);
            self.minimize_stack.pop();
            self.fix_binary_reason(q.var(), cr);

            let csize = self.ca.get_ref(cr).size();
            // `q` comes from some propagation with `cr`, check if these lits can
            // also be eliminated or are already in the learnt clause
            for k in 1..csize {
                let l = self.ca.get_ref(cr)[k];
                // Variable at level 0 or previously removable: just skip
                if self.vars.level(l.var()) == 0 || self.seen[l.var()] == Seen::SOURCE {
                    continue;
                }

                if self.reason(l.var()) != CRef::UNDEF
                    && (self.abstract_level(l.var()) & abstract_levels) != 0
                {
                    // keep this literal.
                    // NOTE: if the level of `l` isn't in `abstract_levels`, it
                    // means it comes from propagations at a decision level
                    // unrelated to the learnt clause, and therefore is
                    // somehow implied by an unrelated decision, so there's no
                    // chance to eliminate `l` via resolutions from the learnt clause.
                    self.seen[l.var()] = Seen::SOURCE;
                    self.minimize_stack.push(l);
                    self.analyze_toclear.push(l);
                } else {
                    // cannot remove `l`, cancel
                    for i in top..self.analyze_toclear.len() {
                        let a = self.analyze_toclear[i];
                        self.seen[a.var()] = Seen::UNDEF;
                    }
                    self.analyze_toclear.truncate(top);
                    return false;
                }
            }
        }

        true
    }

    /// Next literal to propagate, if any.
    ///
    /// In immediate mode this walks the trail; in delayed mode, once the
    /// trail is exhausted, the highest-priority parked literal is actually
    /// assigned and returned.
    fn next_prop_lit(&mut self) -> Option<Lit> {
        if (self.qhead as usize) < self.vars.trail.len() {
            let p = self.vars.trail[self.qhead as usize];
            self.qhead += 1;
            return Some(p);
        }
        if self.bcp.mode == BcpMode::Delayed && !self.bcp.heap_data.is_empty() {
            let p = self.bcp.heap(&self.vars.activity).remove_min();
            self.bcp.soft[p.var()] = lbool::UNDEF;
            let from = self.bcp.reason[p.var()];
            debug_assert_eq!(self.vars.value_lit(p), lbool::UNDEF);
            self.vars.unchecked_enqueue(p, from);
            self.qhead += 1;
            return Some(p);
        }
        None
    }

    /// Propagates all enqueued facts.
    ///
    /// If a conflict arises, the conflicting clause is returned,
    /// otherwise `None`.
    ///
    /// # Post-conditions:
    ///
    /// - the propagation queue is empty, even if there was a conflict.
    fn propagate(&mut self) -> Option<CRef> {
        let mut confl = None;
        let mut num_props: u32 = 0;

        while confl.is_none() {
            let p = match self.next_prop_lit() {
                Some(p) => p,
                None => break,
            };
            num_props += 1;

            // Binary clauses first: no watch moving, just conflict/enqueue.
            let n_bin = self
                .watches_bin_data
                .lookup_mut_pred(p, &WatcherDeleted { ca: &self.ca })
                .len();
            let mut k = 0;
            while k < n_bin {
                let w = self.watches_bin_data[p][k];
                k += 1;
                let v_imp = self.vars.value_lit(w.blocker);
                if v_imp == lbool::FALSE {
                    confl = Some(w.cref);
                    break;
                } else if v_imp == lbool::UNDEF {
                    if !enqueue_bcp(&mut self.vars, &mut self.bcp, w.blocker, w.cref) {
                        confl = Some(w.cref);
                        break;
                    }
                }
            }
            if confl.is_some() {
                break;
            }

            let watches_data_ptr: *mut OccListsData<_, _> = &mut self.watches_data;
            let ws = self
                .watches_data
                .lookup_mut_pred(p, &WatcherDeleted { ca: &self.ca });
            let mut i: usize = 0;
            let mut j: usize = 0;
            let end: usize = ws.len();
            'clauses: while i < end {
                // Try to avoid inspecting the clause:
                let blocker = ws[i].blocker;
                if self.vars.value_lit(blocker) == lbool::TRUE {
                    ws[j] = ws[i];
                    j += 1;
                    i += 1;
                    continue;
                }

                // Make sure the false literal is data[1]:
                let cr = ws[i].cref;
                let mut c = self.ca.get_mut(cr);
                let false_lit = !p;
                if c[0] == false_lit {
                    c[0] = c[1];
                    c[1] = false_lit;
                }
                debug_assert_eq!(c[1], false_lit);
                i += 1;

                // If 0th watch is true, then clause is already satisfied.
                let first = c[0];
                let w = Watcher::new(cr, first);
                if first != blocker && self.vars.value_lit(first) == lbool::TRUE {
                    ws[j] = w;
                    j += 1;
                    continue;
                }

                // Look for new watch:
                for k in 2..c.size() {
                    if self.vars.value_lit(c[k]) != lbool::FALSE {
                        let ck = c[k];
                        c[1] = ck;
                        c[k] = false_lit;

                        // safe because `!c[1] != p`, so watches are not aliased
                        debug_assert_ne!(!c[1], p);
                        unsafe { &mut (&mut *watches_data_ptr)[!c[1]] }.push(w);
                        continue 'clauses;
                    }
                }

                // Did not find watch -- clause is unit under assignment:
                ws[j] = w;
                j += 1;
                if self.vars.value_lit(first) == lbool::FALSE {
                    confl = Some(cr);
                    // Copy the remaining watches:
                    while i < end {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                } else if !enqueue_bcp(&mut self.vars, &mut self.bcp, first, cr) {
                    confl = Some(cr);
                    // Copy the remaining watches:
                    while i < end {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                }
            }
            let dummy = Watcher::DUMMY;
            ws.resize(j, dummy);
        }

        if confl.is_some() {
            // parked propagations are stale now; drop them and fast-forward
            self.bcp.clear();
            self.qhead = self.vars.trail.len() as i32;
        }
        self.propagations += num_props as u64;
        self.simp_db_props -= num_props as i64;

        confl
    }

    fn rebuild_order_heap(&mut self) {
        if self.vars.branch_mode == BranchMode::Vmtf {
            return;
        }
        let mut vs = vec![];
        for v in (0..self.num_vars()).map(Var::from_idx) {
            if self.decision[v] && self.value(v) == lbool::UNDEF {
                vs.push(v);
            }
        }
        self.order_heap().build(&vs);
    }

    /// Shuffle the VMTF queue with a seed derived from the restart count.
    fn shuffle_vmtf(&mut self) {
        self.shuffles += 1;
        let mut seed = ((self.random_seed as u64) ^ self.shuffles) as f64;
        if seed <= 0.0 {
            seed = 91648253.0;
        }
        self.vmtf.shuffle(&mut seed);
        info!("vmtf.shuffle({})", self.shuffles);
    }

    /// Move to the given clause allocator, where clause indices might differ
    fn reloc_all(
        &mut self,
        learnts: &mut Vec<CRef>,
        clauses: &mut Vec<CRef>,
        to: &mut ClauseAllocator,
    ) {
        macro_rules! is_removed {
            ($ca:expr, $cr:expr) => {
                $ca.get_ref($cr).mark() == 1
            };
        }
        // All watchers:
        self.watches().clean_all();
        self.watches_bin().clean_all();
        for v in (0..self.num_vars()).map(Var::from_idx) {
            for s in 0..2 {
                let p = Lit::new(v, s != 0);
                for watch in &mut self.watches_data[p] {
                    self.ca.reloc(&mut watch.cref, to);
                }
                for watch in &mut self.watches_bin_data[p] {
                    self.ca.reloc(&mut watch.cref, to);
                }
            }
        }

        // All reasons:
        for &lit in &self.vars.trail {
            let v = lit.var();

            // Note: it is not safe to call `locked()` on a relocated clause. This is why we keep
            // `dangling` reasons here. It is safe and does not hurt.
            let reason = self.vars.reason(v);
            if reason != CRef::UNDEF {
                let cond = {
                    let c = self.ca.get_ref(reason);
                    c.reloced() || self.locked(c)
                };
                if cond {
                    debug_assert!(!is_removed!(self.ca, reason));
                    self.ca.reloc(&mut self.vars.vardata[v].reason, to);
                }
            }
        }

        // Extension definition tables:
        {
            let mut defs_tbl = mem::replace(&mut self.ext_def_clauses, FnvHashMap::default());
            for (_, defs) in defs_tbl.iter_mut() {
                for cr in defs.iter_mut() {
                    if !is_removed!(self.ca, *cr) {
                        self.ca.reloc(cr, to);
                    }
                }
            }
            self.ext_def_clauses = defs_tbl;
        }

        // All learnt:
        {
            let mut j = 0;
            for i in 0..learnts.len() {
                let mut cr = learnts[i];
                if !is_removed!(self.ca, cr) {
                    self.ca.reloc(&mut cr, to);
                    learnts[j] = cr;
                    j += 1;
                }
            }
            learnts.truncate(j);
        }

        // All original:
        {
            let mut j = 0;
            for i in 0..clauses.len() {
                let mut cr = clauses[i];
                if !is_removed!(self.ca, cr) {
                    self.ca.reloc(&mut cr, to);
                    clauses[j] = cr;
                    j += 1;
                }
            }
            clauses.truncate(j);
        }
    }

    /// Attach a clause to watcher lists
    fn attach_clause(&mut self, cr: CRef) {
        let (c0, c1, learnt, size) = {
            let c = self.ca.get_ref(cr);
            debug_assert!(c.size() > 1);
            (c[0], c[1], c.learnt(), c.size())
        };
        if size == 2 {
            self.watches_bin()[!c0].push(Watcher::new(cr, c1));
            self.watches_bin()[!c1].push(Watcher::new(cr, c0));
        } else {
            self.watches()[!c0].push(Watcher::new(cr, c1));
            self.watches()[!c1].push(Watcher::new(cr, c0));
        }
        if learnt {
            self.num_learnts += 1;
            self.learnts_literals += size as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += size as u64;
        }
        if self.bcp.mode == BcpMode::Delayed && self.bcp.priority == BcpPriority::MaxOccMin {
            let lits = self.ca.get_ref(cr).lits();
            self.bcp.note_clause(lits, &self.vars.activity);
        }
    }

    /// Revert to the state at given level (keeping all assignment at `level` but not beyond).
    fn cancel_until(&mut self, level: u32) {
        debug_assert!(self.decision_level() > level);
        self.bcp.clear();
        let trail_lim_last = *self.vars.trail_lim.last().expect("trail_lim is empty") as usize;
        let trail_lim_level = self.vars.trail_lim[level as usize] as usize;
        for c in (trail_lim_level..self.vars.trail.len()).rev() {
            let x = self.vars.trail[c].var();

            if self.vars.branch_mode == BranchMode::Lrb {
                // learning-rate reward: EMA toward the conflict participation
                // rate over the assignment interval
                let interval = self.vars.conflicts - self.vars.assigned_at[x];
                if interval > 0 {
                    let reward = (self.vars.participated[x] + self.vars.almost_conflicted[x])
                        as f64
                        / interval as f64;
                    let step = self.vars.step_size;
                    self.vars.activity[x] = (1.0 - step) * self.vars.activity[x] + step * reward;
                }
            }

            self.vars.ass[x] = lbool::UNDEF;
            self.vars.canceled[x] = self.vars.conflicts;
            if self.phase_saving > 1 || (self.phase_saving == 1 && c > trail_lim_last) {
                self.polarity[x] = self.vars.trail[c].sign();
            }
            match self.vars.branch_mode {
                BranchMode::Vmtf => self.vmtf.on_unassign(x),
                _ => {
                    if self.order_heap().in_heap(x) {
                        self.order_heap().update(x);
                    } else if self.decision[x] {
                        self.order_heap().insert(x);
                    }
                }
            }
        }
        self.qhead = trail_lim_level as i32;
        self.vars.trail.truncate(trail_lim_level);
        self.vars.trail_lim.truncate(level as usize);
    }

    /// Detach a clause from watcher lists.
    ///
    /// param `strict` means we remove the clause from watchers eagerly, instead
    /// of just marking the watchlist as "dirty"
    fn detach_clause(&mut self, cr: CRef, strict: bool) {
        let (c0, c1, csize, clearnt) = {
            let c = self.ca.get_ref(cr);
            (c[0], c[1], c.size(), c.learnt())
        };
        debug_assert!(csize > 1);

        {
            let mut watches = if csize == 2 {
                self.watches_bin_data
                    .promote(WatcherDeleted { ca: &self.ca })
            } else {
                self.watches_data.promote(WatcherDeleted { ca: &self.ca })
            };

            // Strict or lazy detaching:
            if strict {
                let pos = watches[!c0]
                    .iter()
                    .position(|x| x == &Watcher::new(cr, c1))
                    .expect("Watcher not found");
                watches[!c0].remove(pos);
                let pos = watches[!c1]
                    .iter()
                    .position(|x| x == &Watcher::new(cr, c0))
                    .expect("Watcher not found");
                watches[!c1].remove(pos);
            } else {
                watches.smudge(!c0);
                watches.smudge(!c1);
            }
        }

        if clearnt {
            self.num_learnts -= 1;
            self.learnts_literals -= csize as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= csize as u64;
        }
    }

    /// Detach and free a clause.
    fn remove_clause(&mut self, cr: CRef) {
        self.detach_clause(cr, false);
        {
            let c = self.ca.get_ref(cr);
            // Don't leave pointers to free'd memory!
            if self.locked(c) {
                let l = if c.size() == 2 && self.value_lit(c[0]) != lbool::TRUE {
                    c[1]
                } else {
                    c[0]
                };
                self.vars.vardata[l.var()].reason = CRef::UNDEF;
            }
        }
        self.ca.get_mut(cr).set_mark(1); // used in reloc
        self.ca.free(cr);
    }

    pub fn satisfied(&self, c: ClauseRef) -> bool {
        c.iter().any(|&lit| self.value_lit(lit) == lbool::TRUE)
    }

    #[inline(always)]
    pub fn decision_level(&self) -> u32 {
        self.vars.decision_level()
    }

    #[inline(always)]
    fn reason(&self, x: Var) -> CRef {
        self.vars.reason(x)
    }

    /// Returns `true` if a clause is a reason for some implication in the current state.
    ///
    /// Binary clauses keep their stored literal order, so the propagated
    /// literal may sit at either position.
    fn locked(&self, c: ClauseRef) -> bool {
        let lit = if c.size() == 2 && self.value_lit(c[0]) != lbool::TRUE {
            c[1]
        } else {
            c[0]
        };
        if self.value_lit(lit) != lbool::TRUE {
            return false;
        }
        let reason = self.reason(lit.var());
        reason != CRef::UNDEF && self.ca.get_ref(reason) == c
    }

    fn progress_estimate(&self) -> f64 {
        let mut progress = 0.0;
        let f = 1.0 / self.num_vars() as f64;

        for i in 0..self.decision_level() + 1 {
            let beg: i32 = if i == 0 {
                0
            } else {
                self.vars.trail_lim[i as usize - 1]
            };
            let end: i32 = if i == self.decision_level() {
                self.vars.trail.len() as i32
            } else {
                self.vars.trail_lim[i as usize]
            };
            progress += f64::powi(f, i as i32) * (end - beg) as f64;
        }

        progress / self.num_vars() as f64
    }

    fn new(opts: &SolverOpts) -> Self {
        Self {
            vars: VarState::new(opts),
            num_clauses: 0,
            num_learnts: 0,
            clauses_literals: 0,
            learnts_literals: 0,

            ext_created: 0,
            ext_deleted: 0,
            ext_substituted: 0,

            clause_decay: opts.clause_decay,
            random_var_freq: opts.random_var_freq,
            random_seed: opts.random_seed,
            luby_restart: opts.luby_restart,
            ccmin_mode: opts.ccmin_mode,
            phase_saving: opts.phase_saving,
            rnd_pol: opts.rnd_pol,
            rnd_init_act: opts.rnd_init_act,
            garbage_frac: opts.garbage_frac,
            min_learnts_lim: opts.min_learnts_lim,
            reduce_policy: opts.reduce_policy,
            vsids_props_limit: opts.vsids_props_limit.saturating_mul(1_000_000),
            shuffle_queue: opts.shuffle_queue,
            shuffles: 0,
            restart_first: opts.restart_first,
            restart_inc: opts.restart_inc,

            // Parameters (experimental):
            learntsize_adjust_start_confl: 100,
            learntsize_adjust_inc: 1.5,

            // Statistics: (formerly in 'SolverStats')
            solves: 0,
            starts: 0,
            decisions: 0,
            rnd_decisions: 0,
            propagations: 0,
            dec_vars: 0,
            max_literals: 0,
            tot_literals: 0,

            // Parameters (the rest):
            learntsize_factor: 1.0 / 3.0,
            learntsize_inc: 1.1,

            polarity: VMap::new(),
            user_pol: VMap::new(),
            decision: VMap::new(),
            watches_data: OccListsData::new(),
            watches_bin_data: OccListsData::new(),
            order_heap_data: HeapData::new(),
            vmtf: VmtfQueue::new(),
            bcp: PropQueue::new(opts.bcp_mode, opts.bcp_priority),
            ok: true,
            cla_inc: 1.0,
            qhead: 0,
            simp_db_assigns: -1,
            simp_db_props: 0,
            progress_estimate: 0.0,
            remove_satisfied: false,
            next_var: Var::from_idx(0),

            ca: ClauseAllocator::new(),
            assumptions: vec![],

            er_opts: opts.er,
            ext_defs: ExtDefMap::new(),
            ext_def_clauses: FnvHashMap::default(),

            seen: VMap::new(),
            minimize_stack: vec![],
            analyze_toclear: vec![],
            analyze_vmtf: vec![],
            lbd_stamp: vec![0],
            lbd_counter: 0,
            max_learnts: 0.0,
            learntsize_adjust_confl: 0.0,
            learntsize_adjust_cnt: 0,

            // Resource constraints:
            conflict_budget: -1,
            propagation_budget: -1,
        }
    }
}

/// Route an implied literal through the propagation queue.
///
/// Returns `false` when the enqueue itself uncovers a conflict (only
/// possible in delayed mode, against a soft assignment); the caller then
/// reports `from` as the conflict clause. The contradicting earlier literal
/// is made real first so the conflict is visible on the trail.
fn enqueue_bcp(vars: &mut VarState, bcp: &mut PropQueue, p: Lit, from: CRef) -> bool {
    debug_assert_eq!(vars.value_lit(p), lbool::UNDEF);
    match bcp.mode {
        BcpMode::Immediate => {
            vars.unchecked_enqueue(p, from);
            true
        }
        BcpMode::Delayed => {
            let soft = bcp.soft[p.var()] ^ !p.sign();
            if soft == lbool::FALSE {
                let r = bcp.reason[p.var()];
                vars.unchecked_enqueue(!p, r);
                false
            } else if soft == lbool::UNDEF {
                bcp.soft[p.var()] = lbool::new(p.sign());
                bcp.reason[p.var()] = from;
                bcp.heap(&vars.activity).insert(p);
                true
            } else {
                // already queued with the same polarity
                true
            }
        }
    }
}

impl PropQueue {
    fn new(mode: BcpMode, priority: BcpPriority) -> Self {
        Self {
            mode,
            priority,
            heap_data: HeapData::new(),
            soft: VMap::new(),
            reason: VMap::new(),
            occ: VMap::new(),
        }
    }

    fn heap<'a>(&'a mut self, activity: &'a VMap<f64>) -> Heap<'a, Lit, BcpOrder<'a>> {
        let priority = self.priority;
        let occ = &self.occ;
        self.heap_data.promote(BcpOrder {
            priority,
            activity,
            occ,
        })
    }

    /// Forget every parked literal.
    fn clear(&mut self) {
        if self.mode == BcpMode::Immediate {
            return;
        }
        for k in 0..self.heap_data.len() {
            let l = self.heap_data[k];
            self.soft[l.var()] = lbool::UNDEF;
        }
        self.heap_data.clear();
    }

    /// Track min-clause-size occurrence counts for the MaxOccMin ordering.
    fn note_clause(&mut self, lits: &[Lit], activity: &VMap<f64>) {
        let size = lits.len() as u32;
        for &l in lits {
            let v = l.var();
            let min_size = self.occ[v].min_size;
            if size < min_size {
                self.occ[v] = OccCount {
                    min_size: size,
                    count: 1,
                };
            } else if size == min_size {
                self.occ[v].count += 1;
            } else {
                continue;
            }
            if self.heap_data.in_heap(l) {
                self.heap(activity).decrease(l);
            }
            if self.heap_data.in_heap(!l) {
                self.heap(activity).decrease(!l);
            }
        }
    }
}

#[derive(Debug)]
enum ClauseSetSelect {
    Original,
    Learnt,
}

#[derive(Debug, Clone, Copy)]
struct VarData {
    reason: CRef,
    level: i32,
}

#[derive(Debug, Clone, Copy)]
struct Watcher {
    cref: CRef,
    blocker: Lit,
}

/// Per-variable occurrence record: the smallest clause size the variable
/// appears in, and how many clauses of that size mention it.
#[derive(Debug, Clone, Copy)]
struct OccCount {
    min_size: u32,
    count: u32,
}

impl Default for OccCount {
    fn default() -> Self {
        Self {
            min_size: u32::max_value(),
            count: 0,
        }
    }
}

struct VarOrder<'a> {
    activity: &'a VMap<f64>,
}

/// Ordering of the delayed BCP queue over pending literals.
struct BcpOrder<'a> {
    priority: BcpPriority,
    activity: &'a VMap<f64>,
    occ: &'a VMap<OccCount>,
}

/// Predicate to test whether a clause has been removed from some lit's watchlist
struct WatcherDeleted<'a> {
    ca: &'a ClauseAllocator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum Seen {
    UNDEF,
    SOURCE,
}

mod utils {
    /// Finite subsequences of the Luby-sequence:
    ///
    /// > 0: 1
    /// > 1: 1 1 2
    /// > 2: 1 1 2 1 1 2 4
    /// > 3: 1 1 2 1 1 2 4 1 1 2 1 1 2 4 8
    /// ...
    pub(super) fn luby(y: f64, mut x: i32) -> f64 {
        // Find the finite subsequence that contains index 'x', and the
        // size of that subsequence:
        let mut size = 1;
        let mut seq = 0;
        while size < x + 1 {
            seq += 1;
            size = 2 * size + 1;
        }

        while size - 1 != x {
            size = (size - 1) >> 1;
            seq -= 1;
            x = x % size;
        }

        f64::powi(y, seq)
    }

    /// Generate a random double:
    pub(super) fn drand(seed: &mut f64) -> f64 {
        *seed *= 1389796.0;
        let q = (*seed / 2147483647.0) as i32;
        *seed -= q as f64 * 2147483647.0;
        *seed / 2147483647.0
    }

    /// Generate a random integer:
    pub(super) fn irand(seed: &mut f64, size: i32) -> i32 {
        (drand(seed) * size as f64) as i32
    }
}

impl VarState {
    fn new(opts: &SolverOpts) -> Self {
        Self {
            ass: VMap::new(),
            vardata: VMap::new(),
            activity: VMap::new(),
            var_inc: 1.0,
            var_decay: opts.var_decay,
            branch_mode: opts.branch_mode,
            step_size: opts.step_size,
            step_size_dec: opts.step_size_dec,
            min_step_size: opts.min_step_size,
            assigned_at: VMap::new(),
            participated: VMap::new(),
            almost_conflicted: VMap::new(),
            canceled: VMap::new(),
            conflicts: 0,
            trail: vec![],
            trail_lim: vec![],
        }
    }

    #[inline(always)]
    pub fn num_assigns(&self) -> u32 {
        self.trail.len() as u32
    }

    /// Begins a new decision level.
    fn new_decision_level(&mut self) {
        let lvl = self.trail.len() as i32;
        self.trail_lim.push(lvl);
    }

    fn proved_at_lvl_0(&self) -> &[Lit] {
        // find where the end of the level-0 part of the trail is
        let end = self
            .trail_lim
            .get(0)
            .map_or(self.trail.len(), |&x| x as usize);
        &self.trail[..end]
    }

    #[inline(always)]
    pub fn value(&self, x: Var) -> lbool {
        self.ass[x]
    }

    #[inline(always)]
    fn value_lit(&self, x: Lit) -> lbool {
        self.ass[x.var()] ^ !x.sign()
    }

    #[inline(always)]
    fn level(&self, x: Var) -> i32 {
        self.vardata[x].level
    }

    #[inline(always)]
    fn reason(&self, x: Var) -> CRef {
        self.vardata[x].reason
    }

    fn var_decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.var_decay;
    }

    /// Decay the LRB step size toward its floor, once per conflict.
    fn step_size_decay(&mut self) {
        if self.step_size > self.min_step_size {
            self.step_size = (self.step_size - self.step_size_dec).max(self.min_step_size);
        }
    }

    #[inline(always)]
    pub fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    fn unchecked_enqueue(&mut self, p: Lit, from: CRef) {
        debug_assert_eq!(
            self.value_lit(p),
            lbool::UNDEF,
            "lit {:?} should be undef",
            p
        );
        self.ass[p.var()] = lbool::new(p.sign());
        self.vardata[p.var()] = VarData::new(from, self.decision_level() as i32);
        if self.branch_mode == BranchMode::Lrb {
            self.assigned_at[p.var()] = self.conflicts;
            self.participated[p.var()] = 0;
            self.almost_conflicted[p.var()] = 0;
        }
        self.trail.push(p);
    }

    /// Increase a variable with the current 'bump' value.
    fn var_bump_activity(&mut self, order_heap_data: &mut HeapData<Var>, v: Var) {
        self.activity[v] += self.var_inc;
        if self.activity[v] > 1e100 {
            // Rescale:
            for (_, x) in self.activity.iter_mut() {
                *x *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }

        // Update order_heap with respect to new activity:
        let mut order_heap = order_heap_data.promote(VarOrder {
            activity: &self.activity,
        });
        if order_heap.in_heap(v) {
            order_heap.decrease(v);
        }
    }
}

impl Default for VarData {
    fn default() -> Self {
        Self {
            reason: CRef::UNDEF,
            level: 0,
        }
    }
}

impl VarData {
    #[inline(always)]
    pub(super) fn new(reason: CRef, level: i32) -> Self {
        Self { reason, level }
    }
}

impl PartialEq for Watcher {
    #[inline(always)]
    fn eq(&self, rhs: &Self) -> bool {
        self.cref == rhs.cref
    }
}
impl Eq for Watcher {}

impl<'a> Comparator<Var> for VarOrder<'a> {
    fn cmp(&self, lhs: &Var, rhs: &Var) -> cmp::Ordering {
        PartialOrd::partial_cmp(&self.activity[*rhs], &self.activity[*lhs]).expect("NaN activity")
    }
}

impl<'a> Comparator<Lit> for BcpOrder<'a> {
    fn cmp(&self, lhs: &Lit, rhs: &Lit) -> cmp::Ordering {
        match self.priority {
            BcpPriority::Activity => {
                PartialOrd::partial_cmp(&self.activity[rhs.var()], &self.activity[lhs.var()])
                    .expect("NaN activity")
                    .then(Ord::cmp(&lhs.idx(), &rhs.idx()))
            }
            BcpPriority::MaxOccMin => {
                let a = &self.occ[lhs.var()];
                let b = &self.occ[rhs.var()];
                // lower min-size wins, then higher count wins
                Ord::cmp(&a.min_size, &b.min_size)
                    .then(Ord::cmp(&b.count, &a.count))
                    .then(Ord::cmp(&lhs.idx(), &rhs.idx()))
            }
        }
    }
}

impl<'a> DeletePred<Watcher> for WatcherDeleted<'a> {
    #[inline]
    fn deleted(&self, w: &Watcher) -> bool {
        self.ca.get_ref(w.cref).mark() == 1
    }
}

impl Default for Seen {
    #[inline]
    fn default() -> Self {
        Seen::UNDEF
    }
}

impl Seen {
    #[inline(always)]
    fn is_seen(&self) -> bool {
        *self != Seen::UNDEF
    }
}

impl Watcher {
    const DUMMY: Watcher = Watcher {
        cref: CRef::UNDEF,
        blocker: Lit::UNDEF,
    };
    fn new(cref: CRef, blocker: Lit) -> Self {
        Self { cref, blocker }
    }
}

/// Options to configure a `Solver` at construction time.
pub struct SolverOpts {
    pub var_decay: f64,
    pub clause_decay: f64,
    pub random_var_freq: f64,
    pub random_seed: f64,
    pub ccmin_mode: i32,
    pub phase_saving: i32,
    pub rnd_pol: bool,
    pub rnd_init_act: bool,
    pub luby_restart: bool,
    pub restart_first: i32,
    pub restart_inc: f64,
    pub garbage_frac: f64,
    pub min_learnts_lim: i32,
    pub branch_mode: BranchMode,
    /// LRB parameters.
    pub step_size: f64,
    pub step_size_dec: f64,
    pub min_step_size: f64,
    /// Propagation count (in millions) after which LRB switches to VSIDS.
    pub vsids_props_limit: u64,
    pub bcp_mode: BcpMode,
    pub bcp_priority: BcpPriority,
    pub reduce_policy: ReducePolicy,
    /// Shuffle the VMTF queue at restart points.
    pub shuffle_queue: bool,
    pub er: ErOpts,
}

impl Default for SolverOpts {
    fn default() -> SolverOpts {
        Self {
            var_decay: 0.95,
            clause_decay: 0.999,
            random_var_freq: 0.0,
            random_seed: 91648253.0,
            ccmin_mode: 2,
            phase_saving: 2,
            rnd_pol: false,
            rnd_init_act: false,
            luby_restart: true,
            restart_first: 100,
            restart_inc: 2.0,
            garbage_frac: 0.20,
            min_learnts_lim: 0,
            branch_mode: BranchMode::Vsids,
            step_size: 0.40,
            step_size_dec: 0.000001,
            min_step_size: 0.06,
            vsids_props_limit: 30,
            bcp_mode: BcpMode::Immediate,
            bcp_priority: BcpPriority::Activity,
            reduce_policy: ReducePolicy::Activity,
            shuffle_queue: false,
            er: ErOpts::default(),
        }
    }
}

impl SolverOpts {
    /// Check that options are valid.
    pub fn check(&self) -> bool {
        (0.0 < self.var_decay && self.var_decay < 1.0)
            && (0.0 < self.clause_decay && self.clause_decay < 1.0)
            && (0.0 <= self.random_var_freq && self.random_var_freq <= 1.0)
            && (0.0 < self.random_seed && self.random_seed < f64::INFINITY)
            && (0 <= self.ccmin_mode && self.ccmin_mode <= 2)
            && (0 <= self.phase_saving && self.phase_saving <= 2)
            && 1 <= self.restart_first
            && (1.0 < self.restart_inc && self.restart_inc < f64::INFINITY)
            && (0.0 < self.garbage_frac && self.garbage_frac < f64::INFINITY)
            && 0 <= self.min_learnts_lim
            && (0.0 < self.step_size && self.step_size < 1.0)
            && (0.0 < self.step_size_dec && self.step_size_dec < 1.0)
            && (0.0 < self.min_step_size && self.min_step_size <= self.step_size)
            && self.vsids_props_limit >= 1
            && self.er.check()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callbacks::Basic;
    use std::collections::{HashMap, HashSet};

    fn mk(opts: SolverOpts) -> Solver<Basic> {
        Solver::new(opts, Basic::new())
    }

    fn lit(s: &mut Solver<Basic>, x: i32) -> Lit {
        assert_ne!(x, 0);
        let v = s.var_of_int((x.abs() - 1) as u32);
        Lit::new(v, x > 0)
    }

    fn add(s: &mut Solver<Basic>, c: &[i32]) -> bool {
        let mut lits: Vec<Lit> = c.iter().map(|&x| lit(s, x)).collect();
        s.add_clause_reuse(&mut lits)
    }

    /// 3 pigeons, 2 holes: 9 clauses, unsatisfiable.
    fn pigeonhole3(s: &mut Solver<Basic>) {
        // p(i, j) = 1 + 2*i + j, i in 0..3, j in 0..2
        for i in 0..3 {
            add(s, &[1 + 2 * i, 2 + 2 * i]);
        }
        for j in 1..=2 {
            for i in 0..3 {
                for k in (i + 1)..3 {
                    add(s, &[-(j + 2 * i), -(j + 2 * k)]);
                }
            }
        }
    }

    fn check_watch_invariants(s: &mut Solver<Basic>) {
        s.v.watches().clean_all();
        s.v.watches_bin().clean_all();
        let mut occur: HashMap<usize, Vec<Lit>> = HashMap::new();
        let mut bin_occur: HashMap<usize, Vec<Lit>> = HashMap::new();
        for vi in 0..s.v.num_vars() {
            for sign in 0..2 {
                let p = Lit::new(Var::from_idx(vi), sign == 0);
                for w in s.v.watches_data[p].iter() {
                    occur.entry(w.cref.as_index()).or_insert(vec![]).push(p);
                }
                for w in s.v.watches_bin_data[p].iter() {
                    bin_occur.entry(w.cref.as_index()).or_insert(vec![]).push(p);
                }
            }
        }
        let crefs: Vec<CRef> = s
            .clauses
            .iter()
            .chain(s.learnts.iter())
            .cloned()
            .collect();
        for cr in crefs {
            let (size, c0, c1, mark) = {
                let c = s.v.ca.get_ref(cr);
                (c.size(), c[0], c[1], c.mark())
            };
            if mark != 0 {
                continue;
            }
            let map = if size == 2 { &bin_occur } else { &occur };
            let other = if size == 2 { &occur } else { &bin_occur };
            let ws = map.get(&cr.as_index()).cloned().unwrap_or(vec![]);
            assert_eq!(ws.len(), 2, "clause watched exactly twice: {:?}", ws);
            assert!(ws.contains(&!c0), "watched at !c[0]");
            assert!(ws.contains(&!c1), "watched at !c[1]");
            assert!(
                other.get(&cr.as_index()).is_none(),
                "clause must not appear in the other watch family"
            );
        }
    }

    fn check_trail_invariants(s: &Solver<Basic>) {
        let mut vars_seen: HashSet<u32> = HashSet::new();
        let mut last_level = 0;
        for &l in s.v.vars.trail.iter() {
            assert!(
                vars_seen.insert(l.var().idx()),
                "no two trail entries share a variable"
            );
            assert_eq!(s.v.value_lit(l), lbool::TRUE);
            let lvl = s.v.level(l.var());
            assert!(lvl >= last_level, "trail levels are non-decreasing");
            last_level = lvl;

            let reason = s.v.reason(l.var());
            if reason != CRef::UNDEF {
                let c = s.v.ca.get_ref(reason);
                // binary reasons are normalized lazily, accept both orders
                assert!(c.lits().contains(&l));
                for &q in c.iter() {
                    if q == l {
                        continue;
                    }
                    assert_eq!(s.v.value_lit(q), lbool::FALSE);
                    assert!(s.v.level(q.var()) <= lvl);
                }
            }
        }
    }

    #[test]
    fn test_propagation_reaches_fixpoint() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, -2, -3]);
        add(&mut s, &[2, -3]);
        add(&mut s, &[3]);
        assert!(s.v.propagate().is_none());
        // 3 forces 2 forces 1
        assert_eq!(s.v.num_assigns(), 3);
        check_trail_invariants(&s);
        check_watch_invariants(&mut s);
    }

    #[test]
    fn test_propagation_detects_conflict() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, 2, 3]);
        add(&mut s, &[-4, -1]);
        add(&mut s, &[-4, -2]);
        add(&mut s, &[-4, -3]);
        assert!(s.v.propagate().is_none());
        let d = lit(&mut s, 4);
        s.new_decision_level();
        s.v.vars.unchecked_enqueue(d, CRef::UNDEF);
        let confl = s.v.propagate();
        assert!(confl.is_some());
        let c = s.v.ca.get_ref(confl.unwrap());
        assert!(c.iter().all(|&l| s.v.value_lit(l) == lbool::FALSE));
    }

    #[test]
    fn test_watches_after_search() {
        let mut s = mk(SolverOpts::default());
        pigeonhole3(&mut s);
        add(&mut s, &[7, 8, 9]);
        let _ = s.solve_limited(&[]);
        check_watch_invariants(&mut s);
    }

    #[test]
    fn test_cancel_until_refills_order_heap() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, 2, 3]);
        add(&mut s, &[-1, 2, 4]);
        assert!(s.v.propagate().is_none());
        let d = lit(&mut s, 1);
        s.new_decision_level();
        s.v.vars.unchecked_enqueue(d, CRef::UNDEF);
        assert!(s.v.propagate().is_none());
        let assigned: Vec<Var> = s.v.vars.trail.iter().map(|l| l.var()).collect();
        s.cancel_until(0);
        assert_eq!(s.v.qhead as usize, s.v.vars.trail.len());
        for v in assigned {
            if s.v.decision[v] {
                assert!(s.v.order_heap_data.in_heap(v));
            }
        }
    }

    #[test]
    fn test_gc_preserves_clause_content() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, 2, 3]);
        add(&mut s, &[-1, 2, 4]);
        add(&mut s, &[-2, -3, -4]);
        add(&mut s, &[1, -4, 5]);
        let before: Vec<Vec<Lit>> = s.clauses[1..]
            .iter()
            .map(|&cr| s.v.ca.get_ref(cr).lits().to_vec())
            .collect();
        let dead = s.clauses.remove(0);
        s.v.remove_clause(dead);
        s.garbage_collect();
        let after: Vec<Vec<Lit>> = s
            .clauses
            .iter()
            .map(|&cr| s.v.ca.get_ref(cr).lits().to_vec())
            .collect();
        assert_eq!(before, after);
        check_watch_invariants(&mut s);
    }

    #[test]
    fn test_luby_prefix() {
        let expect = [1., 1., 2., 1., 1., 2., 4.];
        for (i, &e) in expect.iter().enumerate() {
            assert_eq!(utils::luby(2.0, i as i32), e, "luby({})", i);
        }
    }

    #[test]
    fn test_drand_deterministic() {
        let mut s1 = 91648253.0;
        let mut s2 = 91648253.0;
        for _ in 0..100 {
            assert_eq!(utils::drand(&mut s1), utils::drand(&mut s2));
        }
    }

    fn all_mode_opts() -> Vec<SolverOpts> {
        let mut out = vec![];
        out.push(SolverOpts::default());
        let mut o = SolverOpts::default();
        o.branch_mode = BranchMode::Lrb;
        out.push(o);
        let mut o = SolverOpts::default();
        o.branch_mode = BranchMode::Vmtf;
        o.shuffle_queue = true;
        out.push(o);
        let mut o = SolverOpts::default();
        o.bcp_mode = BcpMode::Delayed;
        out.push(o);
        let mut o = SolverOpts::default();
        o.bcp_mode = BcpMode::Delayed;
        o.bcp_priority = BcpPriority::MaxOccMin;
        out.push(o);
        let mut o = SolverOpts::default();
        o.reduce_policy = ReducePolicy::Lbd;
        out.push(o);
        out
    }

    #[test]
    fn test_all_modes_agree_on_unsat() {
        for opts in all_mode_opts() {
            let mut s = mk(opts);
            pigeonhole3(&mut s);
            assert_eq!(s.solve_limited(&[]), lbool::FALSE);
        }
    }

    #[test]
    fn test_all_modes_agree_on_sat() {
        for opts in all_mode_opts() {
            let mut s = mk(opts);
            add(&mut s, &[1, 2]);
            add(&mut s, &[-1, 2]);
            add(&mut s, &[1, -2]);
            add(&mut s, &[3, 4, 5]);
            add(&mut s, &[-3, -4]);
            assert_eq!(s.solve_limited(&[]), lbool::TRUE);
            let l2 = lit(&mut s, 2);
            assert_eq!(s.value_lit(l2), lbool::TRUE);
        }
    }

    #[test]
    fn test_extension_definition_propagates() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, 2, 3]);
        let a = lit(&mut s, 1);
        let b = lit(&mut s, 2);
        let x = s.er_add_definition(a, b).expect("definition added");
        assert_eq!(s.v.ext_defs.get(a, b), Some(x));
        assert_eq!(s.v.ext_defs.get(b, a), Some(x));

        // a true forces x true through (x | !a)
        s.v.vars.unchecked_enqueue(a, CRef::UNDEF);
        assert!(s.v.propagate().is_none());
        assert_eq!(s.v.value_lit(x), lbool::TRUE);
    }

    #[test]
    fn test_extension_definition_backward_propagates() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, 2, 3]);
        let a = lit(&mut s, 1);
        let b = lit(&mut s, 2);
        let x = s.er_add_definition(a, b).expect("definition added");

        // !a and !b force x false through (!x | a | b)
        s.v.vars.unchecked_enqueue(!a, CRef::UNDEF);
        s.v.vars.unchecked_enqueue(!b, CRef::UNDEF);
        assert!(s.v.propagate().is_none());
        assert_eq!(s.v.value_lit(x), lbool::FALSE);
    }

    #[test]
    fn test_er_layer_keeps_verdicts() {
        let mut er_on = SolverOpts::default();
        er_on.er.enabled = true;
        er_on.er.delete_interval = 2;
        er_on.er.max_new_vars = 4;
        er_on.restart_first = 2; // restart often so the ER hooks actually run
        assert!(er_on.check());

        let mut s = mk(er_on);
        pigeonhole3(&mut s);
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);

        let mut er_on = SolverOpts::default();
        er_on.er.enabled = true;
        er_on.restart_first = 2;
        let mut s = mk(er_on);
        let clauses: Vec<Vec<i32>> = vec![
            vec![1, 2, 3],
            vec![-1, -2],
            vec![-1, -3],
            vec![-2, -3],
            vec![4, 5],
            vec![-4, 6],
        ];
        for c in &clauses {
            add(&mut s, c);
        }
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        for c in &clauses {
            let sat = c.iter().any(|&x| {
                let l = lit(&mut s, x);
                s.value_lit(l) == lbool::TRUE
            });
            assert!(sat, "model must satisfy {:?}", c);
        }
    }

    #[test]
    fn test_locked_clause_is_reason() {
        let mut s = mk(SolverOpts::default());
        add(&mut s, &[1, 2, 3]);
        add(&mut s, &[-1, -2]);
        assert!(s.v.propagate().is_none());
        s.new_decision_level();
        let d = lit(&mut s, 1);
        s.v.vars.unchecked_enqueue(d, CRef::UNDEF);
        assert!(s.v.propagate().is_none());
        // (-1 | -2) propagated -2, so it must be locked
        let cr = s.clauses[1];
        let c = s.v.ca.get_ref(cr);
        assert!(s.v.locked(c));
    }

    #[test]
    fn test_opts_check_rejects_bad_values() {
        let mut o = SolverOpts::default();
        o.var_decay = 1.5;
        assert!(!o.check());
        let mut o = SolverOpts::default();
        o.min_step_size = 0.9; // above step_size
        assert!(!o.check());
        let mut o = SolverOpts::default();
        o.er.sub_min_width = 10;
        o.er.sub_max_width = 3;
        assert!(!o.check());
    }
}
