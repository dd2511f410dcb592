//! A naive, stratum-by-stratum fixpoint evaluator over an in-memory fact
//! store. Not meant for production use - no indexing, no semi-naive
//! delta tracking - but a faithful, easy-to-audit implementation of the
//! [`Backend`] contract, used by the test suite and as the engine's
//! default when no other backend is configured.

use super::{Backend, FactSet};
use crate::error::{GraphViewError, Result};
use crate::execution::Deadline;
use crate::ir::{Atom, BodyElement, IrTerm, Predicate, Rule, RuleProgram};
use crate::schema::SchemaRegistry;
use crate::skolem::SkolemRegistry;
use crate::value::PropertyValue;
use std::collections::{HashMap, HashSet};

type Tuple = Vec<String>;
type FactStore = HashMap<String, HashSet<Tuple>>;
type Binding = HashMap<String, String>;

#[derive(Debug, Default)]
pub struct ReferenceBackend {
    facts: FactStore,
    skolems: SkolemRegistry,
}

impl ReferenceBackend {
    #[must_use]
    pub fn new() -> Self {
        ReferenceBackend::default()
    }

    fn run(&self, program: &RuleProgram, deadline: &Deadline) -> Result<FactStore> {
        let mut facts = self.facts.clone();

        let mut strata: Vec<(usize, Vec<&Rule>)> = Vec::new();
        for (rule, &stratum) in program.rules.iter().zip(program.strata.iter()) {
            match strata.last_mut() {
                Some((s, rules)) if *s == stratum => rules.push(rule),
                _ => strata.push((stratum, vec![rule])),
            }
        }

        for (_stratum, rules) in &strata {
            loop {
                deadline.check()?;
                let mut added = false;
                for rule in rules {
                    for binding in evaluate_body(&rule.body, &facts, &self.skolems)? {
                        if let Some(tuple) = instantiate(&rule.head, &binding) {
                            let entry = facts.entry(rule.head.predicate.name()).or_default();
                            if entry.insert(tuple) {
                                added = true;
                            }
                        }
                    }
                }
                if !added {
                    break;
                }
            }
        }

        Ok(facts)
    }
}

impl Backend for ReferenceBackend {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.facts.clear();
        Ok(())
    }

    fn apply_schema(&mut self, _graph: &str, _schema: &SchemaRegistry) -> Result<()> {
        Ok(())
    }

    fn insert_facts(&mut self, _graph: &str, facts: FactSet) -> Result<()> {
        for atom in facts {
            let tuple: Tuple = atom
                .args
                .iter()
                .map(|t| match t {
                    IrTerm::Const(c) => c.clone(),
                    IrTerm::Var(v) => v.clone(),
                })
                .collect();
            self.facts.entry(atom.predicate.name()).or_default().insert(tuple);
        }
        Ok(())
    }

    fn materialize(
        &mut self,
        program: &RuleProgram,
        target_predicate: &str,
        deadline: &Deadline,
    ) -> Result<FactSet> {
        self.evaluate(program, target_predicate, deadline)
    }

    fn evaluate(
        &mut self,
        program: &RuleProgram,
        target_predicate: &str,
        deadline: &Deadline,
    ) -> Result<FactSet> {
        let facts = self.run(program, deadline)?;
        let tuples = facts.get(target_predicate).cloned().unwrap_or_default();
        Ok(tuples
            .into_iter()
            .map(|tuple| {
                Atom::new(
                    Predicate::Answer { name: target_predicate.to_string() },
                    tuple.into_iter().map(IrTerm::Const).collect(),
                )
            })
            .collect())
    }
}

fn evaluate_body(
    body: &[BodyElement],
    facts: &FactStore,
    skolems: &SkolemRegistry,
) -> Result<Vec<Binding>> {
    let mut bindings: Vec<Binding> = vec![HashMap::new()];
    for el in body {
        bindings = match el {
            BodyElement::Atom(atom) => {
                let mut next = Vec::new();
                for binding in &bindings {
                    next.extend(extend_with_atom(atom, binding, facts, skolems)?);
                }
                next
            }
            BodyElement::Neg(atom) => bindings
                .into_iter()
                .filter(|b| !atom_is_satisfied(atom, b, facts))
                .collect(),
            BodyElement::Compare(op, lhs, rhs) => bindings
                .into_iter()
                .filter(|b| compare_holds(*op, lhs, rhs, b))
                .collect(),
        };
        if bindings.is_empty() {
            break;
        }
    }
    Ok(bindings)
}

fn extend_with_atom(
    atom: &Atom,
    binding: &Binding,
    facts: &FactStore,
    skolems: &SkolemRegistry,
) -> Result<Vec<Binding>> {
    if let Predicate::Skolem { fn_name } = &atom.predicate {
        let Some((out_term, in_terms)) = atom.args.split_first() else {
            return Ok(Vec::new());
        };
        let input_vals: Option<Vec<String>> =
            in_terms.iter().map(|t| resolve(t, binding)).collect();
        let Some(input_vals) = input_vals else { return Ok(Vec::new()) };
        let id = skolems.intern(fn_name, &input_vals).map_err(|e| {
            GraphViewError::SkolemArityMismatch {
                name: e.name,
                first_arity: e.first,
                second_arity: e.second,
            }
        })?;
        let mut next = binding.clone();
        match out_term {
            IrTerm::Var(v) => {
                next.insert(v.clone(), id.to_string());
            }
            IrTerm::Const(c) => {
                if *c != id.to_string() {
                    return Ok(Vec::new());
                }
            }
        }
        return Ok(vec![next]);
    }

    let Some(tuples) = facts.get(&atom.predicate.name()) else { return Ok(Vec::new()) };
    let mut out = Vec::new();
    for tuple in tuples {
        if tuple.len() != atom.args.len() {
            continue;
        }
        let mut candidate = binding.clone();
        let mut ok = true;
        for (term, value) in atom.args.iter().zip(tuple.iter()) {
            match term {
                IrTerm::Const(c) => {
                    if c != value {
                        ok = false;
                        break;
                    }
                }
                IrTerm::Var(v) => match candidate.get(v) {
                    Some(existing) if existing != value => {
                        ok = false;
                        break;
                    }
                    Some(_) => {}
                    None => {
                        candidate.insert(v.clone(), value.clone());
                    }
                },
            }
        }
        if ok {
            out.push(candidate);
        }
    }
    Ok(out)
}

fn atom_is_satisfied(atom: &Atom, binding: &Binding, facts: &FactStore) -> bool {
    let Some(tuples) = facts.get(&atom.predicate.name()) else { return false };
    let Some(resolved): Option<Tuple> =
        atom.args.iter().map(|t| resolve(t, binding)).collect()
    else {
        return false;
    };
    tuples.contains(&resolved)
}

fn compare_holds(op: crate::ast::CompareOp, lhs: &IrTerm, rhs: &IrTerm, binding: &Binding) -> bool {
    use crate::ast::CompareOp::{Eq, Ge, Gt, Le, Lt, Ne};
    let (Some(l), Some(r)) = (resolve(lhs, binding), resolve(rhs, binding)) else {
        return false;
    };
    let (lv, rv) = (PropertyValue::new(l), PropertyValue::new(r));
    match op {
        Eq => lv == rv,
        Ne => lv != rv,
        Lt => lv.compare(&rv) == std::cmp::Ordering::Less,
        Le => lv.compare(&rv) != std::cmp::Ordering::Greater,
        Gt => lv.compare(&rv) == std::cmp::Ordering::Greater,
        Ge => lv.compare(&rv) != std::cmp::Ordering::Less,
        crate::ast::CompareOp::And | crate::ast::CompareOp::Or => true,
    }
}

fn resolve(term: &IrTerm, binding: &Binding) -> Option<String> {
    match term {
        IrTerm::Const(c) => Some(c.clone()),
        IrTerm::Var(v) => binding.get(v).cloned(),
    }
}

fn instantiate(head: &Atom, binding: &Binding) -> Option<Tuple> {
    head.args.iter().map(|t| resolve(t, binding)).collect()
}
