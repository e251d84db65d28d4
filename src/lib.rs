// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Lucent is a semantic binder for a Kusto-style tabular query language.
//!
//! Given a parsed query block, the binder resolves names against a catalog
//! snapshot, checks types, selects overloads of built-in operators and
//! functions, infers schemas through piped query operators, and expands
//! user-defined function bodies to compute variable return types. The result
//! is a [`SemanticModel`](binder::SemanticModel): a side table mapping every
//! expression node to its referenced symbol, result type, constant-ness and
//! diagnostics.
//!
//! ```
//! use std::sync::Arc;
//! use lucent::binder::Binder;
//! use lucent::catalog::{Catalog, TableSymbol};
//! use lucent::parser::parse_query;
//! use lucent::types::ScalarKind;
//!
//! let catalog = Catalog::builder()
//!     .table(TableSymbol::new("T").column("c", ScalarKind::Int))
//!     .build();
//! let block = parse_query("T | where c * c >= 2").unwrap();
//! let model = Binder::bind(&block, Arc::new(catalog));
//! assert!(model.diagnostics().is_empty());
//! ```

#![deny(unused_must_use)]

pub mod binder;
pub mod catalog;
pub mod parser;
pub mod types;

pub use self::binder::{Binder, SemanticInfo, SemanticModel};
pub use self::catalog::Catalog;
pub use self::parser::parse_query;
