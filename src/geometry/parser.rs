// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Pest-backed parsing of region expressions and card fragments
//!
//! All entry points return `Err(String)` with a bare reason; callers attach
//! the owning cell or surface when they build the final error.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "geometry/region.pest"]
struct RegionParser;

/// Syntax tree of a region expression before cell complements are resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Halfspace(i32),
    CellComplement(u32),
    Complement(Box<Expr>),
    Intersection(Vec<Expr>),
    Union(Vec<Expr>),
}

impl Expr {
    /// Whether any `#cell` complement appears anywhere in the tree.
    pub(crate) fn references_cells(&self) -> bool {
        match self {
            Expr::Halfspace(_) => false,
            Expr::CellComplement(_) => true,
            Expr::Complement(inner) => inner.references_cells(),
            Expr::Intersection(children) | Expr::Union(children) => {
                children.iter().any(Expr::references_cells)
            }
        }
    }

    /// Cell ids referenced by `#cell` complements, in expression order.
    pub(crate) fn referenced_cells(&self) -> Vec<u32> {
        let mut cells = Vec::new();
        self.collect_cells(&mut cells);
        cells
    }

    fn collect_cells(&self, cells: &mut Vec<u32>) {
        match self {
            Expr::Halfspace(_) => {}
            Expr::CellComplement(cell) => cells.push(*cell),
            Expr::Complement(inner) => inner.collect_cells(cells),
            Expr::Intersection(children) | Expr::Union(children) => {
                for child in children {
                    child.collect_cells(cells);
                }
            }
        }
    }
}

/// Parse a rewritten region expression (`~` complements, `|` unions).
pub(crate) fn parse_region(text: &str) -> Result<Expr, String> {
    let mut pairs = RegionParser::parse(Rule::region, text).map_err(|error| error.to_string())?;
    let expression = pairs
        .next()
        .and_then(|region| region.into_inner().next())
        .ok_or_else(|| "empty region expression".to_string())?;
    build_expression(expression)
}

fn build_expression(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut terms = pair
        .into_inner()
        .map(build_term)
        .collect::<Result<Vec<_>, _>>()?;
    if terms.len() == 1 {
        Ok(terms.remove(0))
    } else {
        Ok(Expr::Union(terms))
    }
}

fn build_term(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut factors = pair
        .into_inner()
        .map(build_factor)
        .collect::<Result<Vec<_>, _>>()?;
    if factors.len() == 1 {
        Ok(factors.remove(0))
    } else {
        Ok(Expr::Intersection(factors))
    }
}

fn build_factor(pair: Pair<Rule>) -> Result<Expr, String> {
    match pair.as_rule() {
        Rule::halfspace => {
            let text = pair.as_str();
            let signed: i32 = text
                .parse()
                .map_err(|_| format!("invalid surface id `{text}`"))?;
            Ok(Expr::Halfspace(signed))
        }
        Rule::group => build_expression(pair.into_inner().next().unwrap()),
        Rule::complement => {
            let inner = pair.into_inner().next().unwrap();
            match inner.as_rule() {
                Rule::group => Ok(Expr::Complement(Box::new(build_expression(
                    inner.into_inner().next().unwrap(),
                )?))),
                Rule::reference => {
                    let text = inner.as_str();
                    let cell: u32 = text
                        .parse()
                        .map_err(|_| format!("invalid cell id `{text}`"))?;
                    Ok(Expr::CellComplement(cell))
                }
                rule => Err(format!("unexpected token in complement: {rule:?}")),
            }
        }
        rule => Err(format!("unexpected token in region: {rule:?}")),
    }
}

/// Parse a `fill=` entry into the universe id and the raw transform
/// constants, when a parenthesized group follows.
pub(crate) fn parse_fill(text: &str) -> Result<(u32, Option<Vec<f64>>), String> {
    let pairs = RegionParser::parse(Rule::fill_spec, text).map_err(|error| error.to_string())?;
    let mut universe = None;
    let mut constants = None;
    for pair in pairs.flatten() {
        match pair.as_rule() {
            Rule::integer => {
                let id = pair
                    .as_str()
                    .parse()
                    .map_err(|_| format!("invalid universe id `{}`", pair.as_str()))?;
                universe = Some(id);
            }
            Rule::fill_transform => {
                constants = Some(parse_numbers(pair)?);
            }
            _ => {}
        }
    }
    let universe = universe.ok_or_else(|| "missing universe id".to_string())?;
    Ok((universe, constants))
}

/// Parse a parenthesized `trcl=` group into its constants.
pub(crate) fn parse_trcl_numbers(text: &str) -> Result<Vec<f64>, String> {
    let mut pairs = RegionParser::parse(Rule::trcl_spec, text).map_err(|error| error.to_string())?;
    parse_numbers(pairs.next().unwrap())
}

fn parse_numbers(pair: Pair<Rule>) -> Result<Vec<f64>, String> {
    pair.into_inner()
        .filter(|inner| inner.as_rule() == Rule::number)
        .map(|inner| {
            inner
                .as_str()
                .parse()
                .map_err(|_| format!("invalid constant `{}`", inner.as_str()))
        })
        .collect()
}

/// A lattice `fill=` entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LatticeFill {
    /// One universe id for every element.
    Infinite(u32),
    /// Explicit index window and one id per element, x fastest.
    Window {
        index0: [i32; 3],
        index1: [i32; 3],
        ids: Vec<u32>,
    },
}

/// Parse a lattice `fill=` entry, either a lone id or an index window.
pub(crate) fn parse_lattice_fill(text: &str) -> Result<LatticeFill, String> {
    let mut pairs =
        RegionParser::parse(Rule::lattice_fill, text).map_err(|error| error.to_string())?;
    let body = pairs.next().unwrap().into_inner().next().unwrap();
    match body.as_rule() {
        Rule::universe_id => Ok(LatticeFill::Infinite(parse_universe_id(&body)?)),
        Rule::window => {
            let mut index0 = [0i32; 3];
            let mut index1 = [0i32; 3];
            let mut ranges = 0;
            let mut ids = Vec::new();
            for part in body.into_inner() {
                match part.as_rule() {
                    Rule::range => {
                        let mut bounds = part.into_inner();
                        index0[ranges] = parse_index(&bounds.next().unwrap())?;
                        index1[ranges] = parse_index(&bounds.next().unwrap())?;
                        ranges += 1;
                    }
                    Rule::universe_id => ids.push(parse_universe_id(&part)?),
                    _ => {}
                }
            }
            Ok(LatticeFill::Window {
                index0,
                index1,
                ids,
            })
        }
        rule => Err(format!("unexpected token in lattice fill: {rule:?}")),
    }
}

fn parse_universe_id(pair: &Pair<Rule>) -> Result<u32, String> {
    pair.as_str()
        .parse()
        .map_err(|_| format!("invalid universe id `{}`", pair.as_str()))
}

fn parse_index(pair: &Pair<Rule>) -> Result<i32, String> {
    pair.as_str()
        .parse()
        .map_err(|_| format!("invalid lattice index `{}`", pair.as_str()))
}
