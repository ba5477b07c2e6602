// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Combination rules for criteria.
//!
//! Combining into an existing compound of the same kind appends instead of
//! nesting. Nothing here collapses a one-child compound; that happens when
//! the request is formatted.

use super::{Criteria, RangeSpecification};

impl Criteria {
    /// AND-combine, flattening nested `And` nodes and merging ranges on the same field.
    ///
    /// Returns `None` when there is nothing to combine and the criteria itself
    /// when only one is given.
    pub fn and_all(criteria: impl IntoIterator<Item = Criteria>) -> Option<Criteria> {
        let mut flat = Vec::new();
        for c in criteria {
            match c {
                Criteria::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }

        let mut merged = merge_ranges(flat);
        match merged.len() {
            0 => None,
            1 => merged.pop(),
            _ => Some(Criteria::And(merged)),
        }
    }

    /// OR-combine, flattening nested `Or` nodes.
    pub fn or_all(criteria: impl IntoIterator<Item = Criteria>) -> Option<Criteria> {
        let mut flat = Vec::new();
        for c in criteria {
            match c {
                Criteria::Or(children) => flat.extend(children),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Criteria::Or(flat)),
        }
    }

    /// `Combine(none, x) = x`, otherwise AND the new criteria onto the existing root.
    pub fn and_into(current: Option<Criteria>, new: Criteria) -> Criteria {
        match current {
            None => new,
            Some(root) => match Criteria::and_all([root, new]) {
                Some(combined) => combined,
                None => Criteria::And(Vec::new()),
            },
        }
    }

    /// Add a clause to the `must` list of a bool query, creating one if needed.
    pub fn bool_must(current: Option<Criteria>, new: Criteria) -> Criteria {
        match current {
            None => Criteria::Bool {
                must: vec![new],
                must_not: Vec::new(),
                should: Vec::new(),
            },
            Some(Criteria::Bool {
                mut must,
                must_not,
                should,
            }) => {
                must.push(new);
                Criteria::Bool {
                    must,
                    must_not,
                    should,
                }
            }
            Some(root) => Criteria::Bool {
                must: vec![root, new],
                must_not: Vec::new(),
                should: Vec::new(),
            },
        }
    }

    /// Add a clause to the `should` list of a bool query, creating one if needed.
    pub fn bool_should(current: Option<Criteria>, new: Criteria) -> Criteria {
        match current {
            None => Criteria::Bool {
                must: Vec::new(),
                must_not: Vec::new(),
                should: vec![new],
            },
            Some(Criteria::Bool {
                must,
                must_not,
                mut should,
            }) => {
                should.push(new);
                Criteria::Bool {
                    must,
                    must_not,
                    should,
                }
            }
            Some(root) => Criteria::Bool {
                must: Vec::new(),
                must_not: Vec::new(),
                should: vec![root, new],
            },
        }
    }

    /// Wrap in `Not` unconditionally.
    pub fn negate(inner: Criteria) -> Criteria {
        Criteria::Not(Box::new(inner))
    }
}

/// Fold a `Range` into an earlier `Range` on the same field when the two
/// bound different sides. Ranges whose bounds clash stay separate.
fn merge_ranges(criteria: Vec<Criteria>) -> Vec<Criteria> {
    let mut out: Vec<Criteria> = Vec::with_capacity(criteria.len());
    for c in criteria {
        if let Criteria::Range {
            field,
            member,
            specifications,
        } = c
        {
            let existing = out.iter_mut().find_map(|o| match o {
                Criteria::Range {
                    field: f,
                    specifications: s,
                    ..
                } if *f == field && can_combine(s.as_slice(), &specifications) => Some(s),
                _ => None,
            });
            match existing {
                Some(specs) => extend_specifications(specs, specifications),
                None => out.push(Criteria::Range {
                    field,
                    member,
                    specifications,
                }),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// At most one lower and one upper bound once combined, ignoring exact duplicates.
fn can_combine(target: &[RangeSpecification], more: &[RangeSpecification]) -> bool {
    let mut lower = 0;
    let mut upper = 0;
    let added = more.iter().filter(|spec| !target.contains(spec));
    for spec in target.iter().chain(added) {
        if spec.comparison.is_lower_bound() {
            lower += 1;
        } else {
            upper += 1;
        }
    }
    lower <= 1 && upper <= 1
}

fn extend_specifications(target: &mut Vec<RangeSpecification>, more: Vec<RangeSpecification>) {
    for spec in more {
        if !target.contains(&spec) {
            target.push(spec);
        }
    }
}
