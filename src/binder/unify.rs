// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Column unification: merging several tables' column lists into one.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use super::cache::GlobalBindingCache;
use crate::catalog::{ColumnRef, ColumnSymbol, TableRef, TableSymbol, Type};
use crate::types::ScalarKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnifyStrategy {
    /// One column per name; conflicting types widen, or collapse to dynamic.
    ByName,
    /// One column per distinct (name, type); conflicts split into
    /// `name_type` columns.
    ByNameAndType,
    /// Only columns present in every input, first table's declaration wins.
    CommonColumns,
}

/// Unify `tables` under `strategy`.
///
/// When `cacheable` is set (every input is a catalog table of the current
/// database, so identities are stable) the result is memoized in the global
/// cache keyed by the ordered table list.
pub(super) fn unify(
    strategy: UnifyStrategy,
    tables: &[TableRef],
    cache: &GlobalBindingCache,
    cacheable: bool,
) -> TableRef {
    if tables.len() == 1 {
        return tables[0].clone();
    }
    let key = (
        strategy,
        tables
            .iter()
            .map(|t| Arc::as_ptr(t) as usize)
            .collect::<Vec<_>>(),
    );
    if cacheable {
        if let Some(found) = cache.unification(&key) {
            return found;
        }
    }
    let is_open = tables.iter().any(|t| t.is_open());
    let columns = match strategy {
        UnifyStrategy::ByName => unify_by_name(tables),
        UnifyStrategy::ByNameAndType => unify_by_name_and_type(tables),
        UnifyStrategy::CommonColumns => common_columns(tables),
    };
    let result = TableSymbol::from_columns("", columns, is_open);
    if cacheable {
        cache.record_unification(key, result.clone());
    }
    result
}

/// Group columns by case-insensitive name, preserving first-appearance
/// order. Returns (order, name -> columns).
fn group_by_name(tables: &[TableRef]) -> (Vec<String>, HashMap<String, Vec<ColumnRef>>) {
    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<ColumnRef>> = HashMap::new();
    for table in tables {
        for column in table.columns() {
            let key = column.name().to_ascii_lowercase();
            match groups.get_mut(&key) {
                Some(list) => list.push(column.clone()),
                None => {
                    order.push(key.clone());
                    groups.insert(key, vec![column.clone()]);
                }
            }
        }
    }
    (order, groups)
}

fn unify_by_name(tables: &[TableRef]) -> Vec<ColumnRef> {
    let (order, groups) = group_by_name(tables);
    order
        .into_iter()
        .map(|key| {
            let columns = &groups[&key];
            let first = &columns[0];
            if columns.iter().all(|c| c.ty() == first.ty()) {
                return first.clone();
            }
            // widen if every conflicting type is numeric, else dynamic
            let widest = columns
                .iter()
                .try_fold(None::<ScalarKind>, |acc, c| match c.ty().scalar_kind() {
                    Some(kind) if kind.is_numeric() => Ok(match acc {
                        None => Some(kind),
                        Some(cur) => Some(cur.widest(kind).unwrap_or(ScalarKind::Real)),
                    }),
                    _ => Err(()),
                })
                .ok()
                .flatten();
            let ty = widest.map(Type::Scalar).unwrap_or(super::Type::DYNAMIC);
            first.retyped(ty)
        })
        .collect()
}

fn unify_by_name_and_type(tables: &[TableRef]) -> Vec<ColumnRef> {
    let (order, groups) = group_by_name(tables);
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    // reserve every plain name first so suffixed splits cannot collide
    for key in &order {
        taken.insert(key.clone(), 1);
    }
    for key in &order {
        let columns = &groups[key];
        let mut distinct: SmallVec<[&ColumnRef; 4]> = SmallVec::new();
        for column in columns {
            if !distinct.iter().any(|c| c.ty() == column.ty()) {
                distinct.push(column);
            }
        }
        if distinct.len() == 1 {
            out.push(distinct[0].clone());
            continue;
        }
        for column in distinct {
            let base = format!("{}_{}", column.name(), column.ty());
            let name = unique_name(&base, &mut taken);
            out.push(column.renamed(name));
        }
    }
    out
}

fn common_columns(tables: &[TableRef]) -> Vec<ColumnRef> {
    let (first, rest) = tables.split_first().expect("caller checked arity");
    first
        .columns()
        .iter()
        .filter(|column| {
            rest.iter()
                .all(|t| t.column_by_name(column.name()).is_some())
        })
        .cloned()
        .collect()
}

fn unique_name(base: &str, taken: &mut HashMap<String, usize>) -> String {
    let key = base.to_ascii_lowercase();
    match taken.get_mut(&key) {
        None => {
            taken.insert(key, 1);
            base.to_string()
        }
        Some(count) => {
            *count += 1;
            let name = format!("{}_{}", base, *count - 1);
            taken.insert(name.to_ascii_lowercase(), 1);
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind::*;

    fn table(name: &str, cols: &[(&str, ScalarKind)]) -> TableRef {
        let mut t = TableSymbol::new(name);
        for (n, k) in cols {
            t = t.column(*n, *k);
        }
        t.into_ref()
    }

    fn run(strategy: UnifyStrategy, tables: &[TableRef]) -> Vec<(std::string::String, super::Type)> {
        let cache = GlobalBindingCache::new();
        unify(strategy, tables, &cache, false)
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.ty().clone()))
            .collect()
    }

    #[test]
    fn by_name_keeps_matching_columns() {
        let a = table("a", &[("x", Long), ("y", String)]);
        let b = table("b", &[("y", String), ("x", Long)]);
        let cols = run(UnifyStrategy::ByName, &[a, b]);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0], ("x".into(), super::Type::LONG));
        assert_eq!(cols[1], ("y".into(), super::Type::STRING));
    }

    #[test]
    fn by_name_widens_numerics_and_falls_back_to_dynamic() {
        let a = table("a", &[("x", Int), ("s", String)]);
        let b = table("b", &[("x", Long), ("s", Bool)]);
        let cols = run(UnifyStrategy::ByName, &[a, b]);
        assert_eq!(cols[0], ("x".into(), super::Type::LONG));
        assert_eq!(cols[1], ("s".into(), super::Type::DYNAMIC));
    }

    #[test]
    fn by_name_and_type_splits_conflicts() {
        let a = table("a", &[("x", Long)]);
        let b = table("b", &[("x", String)]);
        let cols = run(UnifyStrategy::ByNameAndType, &[a, b]);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0], ("x_long".into(), super::Type::LONG));
        assert_eq!(cols[1], ("x_string".into(), super::Type::STRING));
    }

    #[test]
    fn common_columns_intersects() {
        let a = table("a", &[("x", Long), ("y", String), ("z", Real)]);
        let b = table("b", &[("z", Real), ("x", Long)]);
        let cols = run(UnifyStrategy::CommonColumns, &[a, b]);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].0, "x");
        assert_eq!(cols[1].0, "z");
    }

    #[test]
    fn unify_is_idempotent() {
        let cache = GlobalBindingCache::new();
        let a = table("a", &[("x", Int)]);
        let b = table("b", &[("x", Long), ("y", String)]);
        let once = unify(UnifyStrategy::ByName, &[a, b], &cache, false);
        let twice = unify(UnifyStrategy::ByName, &[once.clone()], &cache, false);
        assert_eq!(once.columns().len(), twice.columns().len());
        for (c1, c2) in once.columns().iter().zip(twice.columns()) {
            assert_eq!(c1.name(), c2.name());
            assert_eq!(c1.ty(), c2.ty());
        }
    }

    #[test]
    fn cacheable_results_are_shared() {
        let cache = GlobalBindingCache::new();
        let a = table("a", &[("x", Long)]);
        let b = table("b", &[("x", Long)]);
        let first = unify(UnifyStrategy::ByName, &[a.clone(), b.clone()], &cache, true);
        let second = unify(UnifyStrategy::ByName, &[a, b], &cache, true);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
