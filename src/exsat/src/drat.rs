//! DRAT proofs
//!
//! An append-only stream of clause additions and deletions, printable in
//! the textual DRAT format. Extension-variable definition clauses are
//! recorded as additions like any other derived clause.

use {
    crate::{clause::ClauseIterable, Lit},
    std::fmt,
};

/// A serialized DRAT proof.
#[derive(Debug, Clone)]
pub struct Proof(Vec<i32>);

mod proof {
    use {super::*, std::fmt::Write};

    impl fmt::Display for Proof {
        fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
            for &i in &self.0 {
                if i == i32::max_value() {
                    out.write_char('d')?
                } else if i == 0 {
                    out.write_str(" 0\n")?
                } else {
                    write!(out, " {}", i)?
                }
            }
            write!(out, "0")?; // final 0
            Ok(())
        }
    }

    impl Default for Proof {
        fn default() -> Self {
            Proof::new()
        }
    }

    impl Proof {
        /// New proof recording structure.
        pub fn new() -> Self {
            Proof(Vec::new())
        }

        fn push_lit(&mut self, lit: Lit) {
            let i: i32 = (if lit.sign() { 1 } else { -1 }) * ((lit.var().idx() + 1) as i32);
            self.0.push(i)
        }

        /// Register clause creation.
        pub fn create_clause<C>(&mut self, c: &C)
        where
            C: ClauseIterable,
        {
            for lit in c.items() {
                self.push_lit((*lit).into());
            }
            self.0.push(0);
        }

        /// Register clause deletion.
        pub fn delete_clause<C>(&mut self, c: &C)
        where
            C: ClauseIterable,
        {
            self.0.push(i32::max_value());
            for lit in c.items() {
                self.push_lit((*lit).into());
            }
            self.0.push(0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clause::Var;

    #[test]
    fn test_proof_format() {
        let mut p = Proof::new();
        let a = Lit::new(Var::from_idx(0), true);
        let b = Lit::new(Var::from_idx(1), false);
        p.create_clause(&vec![a, b]);
        p.delete_clause(&vec![a]);
        let s = format!("{}", p);
        assert_eq!(s, " 1 -2 0\nd 1 0\n0");
    }
}
