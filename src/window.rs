//! Rolling and exponentially decayed aggregation over an entity's causal
//! history.
//!
//! A series is built once from the per-game values of one timeline and can
//! then be evaluated at any position `0..=len`. Position `len` is the "next
//! game" that has not been played yet. Evaluation at position `i` under a
//! [`WindowSpec`] reads positions `[i - shift - width + 1, i - shift]` only.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::StatLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowMethod {
    Sum,
    Mean,
    #[serde(alias = "ewm")]
    DecayedMean,
}

impl WindowMethod {
    pub fn tag(&self) -> &'static str {
        match self {
            WindowMethod::Sum => "sum",
            WindowMethod::Mean => "mean",
            WindowMethod::DecayedMean => "ewm",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sum" => Some(WindowMethod::Sum),
            "mean" | "avg" => Some(WindowMethod::Mean),
            "decayed-mean" | "decayed_mean" | "ewm" => Some(WindowMethod::DecayedMean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Games in the window, or the half-life in games for `DecayedMean`.
    pub width: usize,
    pub shift: usize,
    pub method: WindowMethod,
}

impl WindowSpec {
    pub fn new(width: usize, shift: usize, method: WindowMethod) -> Self {
        Self {
            width,
            shift,
            method,
        }
    }

    /// `shift = 0` lets a game's own statistics into its features.
    pub fn is_causal(&self) -> bool {
        self.shift >= 1
    }

    pub fn label(&self) -> String {
        let base = format!("{}_{}", self.method.tag(), self.width);
        if self.shift == 1 {
            base
        } else {
            format!("{base}_s{}", self.shift)
        }
    }

    /// Last position (inclusive) visible from `position` in a series of
    /// `len` records.
    fn window_end(&self, position: usize, len: usize) -> Option<usize> {
        if len == 0 || position < self.shift {
            return None;
        }
        Some((position - self.shift).min(len - 1))
    }

    fn decay_factor(&self) -> f64 {
        0.5_f64.powf(1.0 / self.width.max(1) as f64)
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Sum of present values over a window plus the weight they carry
/// (a plain count, or the decayed weight total).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSum {
    pub total: f64,
    pub weight: f64,
}

impl WindowSum {
    pub fn is_empty(&self) -> bool {
        self.weight <= 0.0
    }

    pub fn value(&self, method: WindowMethod) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        match method {
            WindowMethod::Sum => Some(self.total),
            WindowMethod::Mean | WindowMethod::DecayedMean => Some(self.total / self.weight),
        }
    }
}

/// Sorted stat names shared by every entity of one kind, so that all
/// entities produce the same columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCatalog {
    names: Vec<String>,
}

impl StatCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = names.into_iter().map(Into::into).collect::<BTreeSet<String>>();
        Self {
            names: set.into_iter().collect(),
        }
    }

    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a StatLine>,
    {
        Self::new(lines.into_iter().flat_map(|line| line.keys().cloned()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }

    /// Values of `line` in catalog order.
    pub fn project(&self, line: &StatLine) -> Vec<Option<f64>> {
        self.names.iter().map(|n| line.get(n).copied()).collect()
    }
}

#[derive(Debug, Clone)]
struct DecayedStates {
    half_life: usize,
    // Per stat: state after each position.
    states: Vec<Vec<WindowSum>>,
}

#[derive(Debug, Clone)]
pub struct AggregateSeries {
    len: usize,
    // Per stat, `len + 1` running totals starting at zero.
    prefix: Vec<Vec<WindowSum>>,
    decayed: Vec<DecayedStates>,
}

impl AggregateSeries {
    /// `rows[i]` holds the catalog-ordered values of position `i`.
    pub fn new(stat_count: usize, rows: &[Vec<Option<f64>>], specs: &[WindowSpec]) -> Self {
        let len = rows.len();
        let prefix = (0..stat_count)
            .map(|stat| {
                let mut acc = WindowSum::default();
                let mut out = Vec::with_capacity(len + 1);
                out.push(acc);
                for row in rows {
                    if let Some(v) = row.get(stat).copied().flatten()
                        && v.is_finite()
                    {
                        acc.total += v;
                        acc.weight += 1.0;
                    }
                    out.push(acc);
                }
                out
            })
            .collect();

        let mut half_lives = specs
            .iter()
            .filter(|s| s.method == WindowMethod::DecayedMean)
            .map(|s| s.width)
            .collect::<Vec<_>>();
        half_lives.sort_unstable();
        half_lives.dedup();

        let decayed = half_lives
            .into_iter()
            .map(|half_life| {
                let spec = WindowSpec::new(half_life, 0, WindowMethod::DecayedMean);
                let d = spec.decay_factor();
                let states = (0..stat_count)
                    .map(|stat| {
                        rows.iter()
                            .scan(WindowSum::default(), |state, row| {
                                state.total *= d;
                                state.weight *= d;
                                if let Some(v) = row.get(stat).copied().flatten()
                                    && v.is_finite()
                                {
                                    state.total += v;
                                    state.weight += 1.0;
                                }
                                Some(*state)
                            })
                            .collect()
                    })
                    .collect();
                DecayedStates { half_life, states }
            })
            .collect();

        Self {
            len,
            prefix,
            decayed,
        }
    }

    pub fn from_lines(catalog: &StatCatalog, lines: &[&StatLine], specs: &[WindowSpec]) -> Self {
        let rows = lines.iter().map(|l| catalog.project(l)).collect::<Vec<_>>();
        Self::new(catalog.len(), &rows, specs)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stat_count(&self) -> usize {
        self.prefix.len()
    }

    /// Per-stat window sums at `position`, or `None` when no prior game is
    /// visible (`position < shift` or an empty series).
    pub fn window_sums(&self, position: usize, spec: &WindowSpec) -> Option<Vec<WindowSum>> {
        let end = spec.window_end(position, self.len)?;
        match spec.method {
            WindowMethod::Sum | WindowMethod::Mean => {
                let start = (end + 1).saturating_sub(spec.width);
                Some(
                    self.prefix
                        .iter()
                        .map(|p| WindowSum {
                            total: p[end + 1].total - p[start].total,
                            weight: p[end + 1].weight - p[start].weight,
                        })
                        .collect(),
                )
            }
            WindowMethod::DecayedMean => {
                let decayed = self.decayed.iter().find(|d| d.half_life == spec.width)?;
                Some(decayed.states.iter().map(|s| s[end]).collect())
            }
        }
    }

    /// Aggregated value of every stat at `position`.
    pub fn values(&self, position: usize, spec: &WindowSpec) -> Vec<Option<f64>> {
        match self.window_sums(position, spec) {
            Some(sums) => sums.iter().map(|s| s.value(spec.method)).collect(),
            None => vec![None; self.stat_count()],
        }
    }
}
