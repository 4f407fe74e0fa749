extern crate exsat;

use exsat::{lbool, BasicSolver, Lit, SolverInterface, SolverOpts};

fn mk() -> BasicSolver {
    BasicSolver::new(SolverOpts::default(), Default::default())
}

fn lit(s: &mut BasicSolver, x: i32) -> Lit {
    assert_ne!(x, 0);
    let v = s.var_of_int((x.abs() - 1) as u32);
    Lit::new(v, x > 0)
}

fn add(s: &mut BasicSolver, c: &[i32]) -> bool {
    let mut lits: Vec<Lit> = c.iter().map(|&x| lit(s, x)).collect();
    s.add_clause_reuse(&mut lits)
}

fn model_satisfies(s: &mut BasicSolver, clauses: &[Vec<i32>]) -> bool {
    clauses.iter().all(|c| {
        c.iter().any(|&x| {
            let l = lit(s, x);
            s.value_lit(l) == lbool::TRUE
        })
    })
}

/// Deterministic pseudo-random 3-SAT generator (plain LCG, fixed seed).
fn random_3sat(n_vars: i32, n_clauses: usize, seed: u64) -> Vec<Vec<i32>> {
    let mut state = seed;
    let mut next = |bound: i32| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) % bound as u64) as i32
    };
    let mut out = vec![];
    for _ in 0..n_clauses {
        let mut c = vec![];
        while c.len() < 3 {
            let v = 1 + next(n_vars);
            if c.iter().any(|&x: &i32| x.abs() == v) {
                continue;
            }
            c.push(if next(2) == 0 { v } else { -v });
        }
        out.push(c);
    }
    out
}

#[test]
fn test_simple_sat_forces_x2() {
    // S1: {(x1 | x2), (!x1 | x2), (x1 | !x2)} is SAT with x2 = true
    let mut s = mk();
    add(&mut s, &[1, 2]);
    add(&mut s, &[-1, 2]);
    add(&mut s, &[1, -2]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    let l2 = lit(&mut s, 2);
    assert_eq!(s.value_lit(l2), lbool::TRUE);
    let l1 = lit(&mut s, 1);
    assert_eq!(s.value_lit(l1), lbool::TRUE);
}

#[test]
fn test_contradictory_units_unsat_at_level_0() {
    // S2: {(x1), (!x1)} is UNSAT before any decision
    let mut s = mk();
    add(&mut s, &[1]);
    let ok = add(&mut s, &[-1]);
    assert!(!ok);
    assert!(!s.is_ok());
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    assert_eq!(s.num_decisions(), 0);
}

#[test]
fn test_pigeonhole_unsat() {
    // S3: 3 pigeons in 2 holes, 9 clauses
    let mut s = mk();
    let mut n = 0;
    for i in 0..3 {
        add(&mut s, &[1 + 2 * i, 2 + 2 * i]);
        n += 1;
    }
    for j in 1..=2 {
        for i in 0..3i32 {
            for k in (i + 1)..3 {
                add(&mut s, &[-(j + 2 * i), -(j + 2 * k)]);
                n += 1;
            }
        }
    }
    assert_eq!(n, 9);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    assert!(s.num_conflicts() > 0);
}

#[test]
fn test_random_3sat_deterministic() {
    // S4 / S8: same formula, seed and options give bitwise identical runs
    let clauses = random_3sat(20, 85, 42);
    let run = || {
        let mut s = mk();
        for c in &clauses {
            add(&mut s, c);
        }
        let st = s.solve_limited(&[]);
        let model: Vec<u8> = s.get_model().iter().map(|v| v.to_u8()).collect();
        (st, s.num_conflicts(), s.num_decisions(), model)
    };
    let a = run();
    let b = run();
    assert_eq!(a, b);
}

#[test]
fn test_random_3sat_models_satisfy_formula() {
    // property 6 on a batch of deterministic instances
    for seed in 0..8u64 {
        let clauses = random_3sat(15, 50, seed);
        let mut s = mk();
        for c in &clauses {
            add(&mut s, c);
        }
        if s.solve_limited(&[]) == lbool::TRUE {
            assert!(model_satisfies(&mut s, &clauses), "seed {}", seed);
        }
    }
}

#[test]
fn test_assumption_core() {
    // S5: !x1 is a unit of F; solving under {x1, x2} fails with core {x1}
    let mut s = mk();
    add(&mut s, &[-1]);
    add(&mut s, &[2, 3]);
    let a1 = lit(&mut s, 1);
    let a2 = lit(&mut s, 2);
    assert_eq!(s.solve_limited(&[a1, a2]), lbool::FALSE);
    assert_eq!(s.unsat_core(), &[a1][..]);
    assert!(s.unsat_core_contains_lit(a1));
    assert!(!s.unsat_core_contains_lit(a2));

    // the solver is still usable without the assumptions
    assert!(s.is_ok());
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}

#[test]
fn test_core_is_subset_and_unsat() {
    // property 7: the reported core, taken alone as assumptions, still fails
    let mut s = mk();
    add(&mut s, &[-1, -2]);
    add(&mut s, &[3, 4]);
    let a1 = lit(&mut s, 1);
    let a2 = lit(&mut s, 2);
    let a3 = lit(&mut s, 3);
    let assumps = [a1, a2, a3];
    assert_eq!(s.solve_limited(&assumps), lbool::FALSE);
    let core: Vec<Lit> = s.unsat_core().to_vec();
    assert!(!core.is_empty());
    assert!(core.iter().all(|l| assumps.contains(l)));
    assert_eq!(s.solve_limited(&core), lbool::FALSE);
}

#[test]
fn test_learnt_unit_persists_after_restart() {
    // S6: a learnt unit stays asserted at level 0 for the rest of the solve
    let mut s = mk();
    add(&mut s, &[1, 2]);
    add(&mut s, &[1, -2]);
    add(&mut s, &[3, 4, 5]);
    add(&mut s, &[-3, 4, -5]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    // both (1|2) and (1|-2) force 1; once learnt it is a level-0 fact
    let one = lit(&mut s, 1);
    assert_eq!(s.value_lvl_0(one), lbool::TRUE);
    assert!(s.proved_at_lvl_0().contains(&one));
    // solving again keeps the fact without re-adding anything
    let n = s.num_clauses();
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    assert_eq!(s.num_clauses(), n);
}

#[test]
fn test_empty_clause_is_unsat() {
    let mut s = mk();
    let mut empty: Vec<Lit> = vec![];
    assert!(!s.add_clause_reuse(&mut empty));
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn test_empty_formula_is_sat() {
    let mut s = mk();
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    assert_eq!(s.get_model().len(), 0);
}

#[test]
fn test_tautology_is_dropped() {
    let mut s = mk();
    assert!(add(&mut s, &[1, -1, 2]));
    assert_eq!(s.num_clauses(), 0);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}

#[test]
fn test_duplicate_literals_are_merged() {
    let mut s = mk();
    assert!(add(&mut s, &[1, 1, 2]));
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}

#[test]
fn test_conflict_budget_indeterminate() {
    // 4 pigeons in 3 holes takes more than one conflict
    let mut s = mk();
    let p = |i: i32, j: i32| 1 + 3 * i + j;
    for i in 0..4 {
        add(&mut s, &[p(i, 0), p(i, 1), p(i, 2)]);
    }
    for j in 0..3 {
        for i in 0..4i32 {
            for k in (i + 1)..4 {
                add(&mut s, &[-p(i, j), -p(k, j)]);
            }
        }
    }
    s.set_conflict_budget(1);
    assert_eq!(s.solve_limited(&[]), lbool::UNDEF);

    // lifting the budget finishes the proof, state stayed valid
    s.budget_off();
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn test_solver_reusable_across_calls() {
    let mut s = mk();
    add(&mut s, &[1, 2]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    add(&mut s, &[-1]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    let l2 = lit(&mut s, 2);
    assert_eq!(s.value_lit(l2), lbool::TRUE);
    add(&mut s, &[-2]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn test_to_dimacs_output() {
    let mut s = mk();
    add(&mut s, &[1, 2, 3]);
    add(&mut s, &[-2, 4]);
    let a = lit(&mut s, 4);
    let mut out: Vec<u8> = vec![];
    s.to_dimacs(&mut out, &[a]).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("p cnf "));
    // header clause count: 2 problem clauses + 1 assumption unit
    assert_eq!(header, "p cnf 4 3");
    // every line after the header ends with the 0 terminator
    assert!(lines.all(|l| l.ends_with(" 0") || l.ends_with("0")));
}

#[test]
fn test_dimacs_model_line() {
    let mut s = mk();
    add(&mut s, &[1]);
    add(&mut s, &[-2]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    let line = format!("{}", s.dimacs_model());
    assert_eq!(line, "v 1 -2 0\n");
}
