//! Rate statistics rebuilt from windowed component sums.
//!
//! Every rate is `scale * sum(numerator terms) / sum(denominator terms)` over
//! the same window, never an average of per-game rates.

use crate::error::{FeatureError, Result};
use crate::records::StatDomain;
use crate::window::{StatCatalog, WindowSpec, WindowSum};

#[derive(Debug, Clone, Copy)]
pub enum RatioKind {
    Ratio {
        numerator: &'static [&'static str],
        denominator: &'static [&'static str],
        scale: f64,
    },
    /// Sum of ratios defined earlier in the same set.
    Combined(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct RatioFormula {
    pub name: &'static str,
    pub kind: RatioKind,
}

const fn ratio(
    name: &'static str,
    numerator: &'static [&'static str],
    denominator: &'static [&'static str],
) -> RatioFormula {
    RatioFormula {
        name,
        kind: RatioKind::Ratio {
            numerator,
            denominator,
            scale: 1.0,
        },
    }
}

const fn per_nine(
    name: &'static str,
    numerator: &'static [&'static str],
    denominator: &'static [&'static str],
) -> RatioFormula {
    RatioFormula {
        name,
        kind: RatioKind::Ratio {
            numerator,
            denominator,
            scale: 9.0,
        },
    }
}

const fn combined(name: &'static str, parts: &'static [&'static str]) -> RatioFormula {
    RatioFormula {
        name,
        kind: RatioKind::Combined(parts),
    }
}

pub const TEAM_RATIOS: &[RatioFormula] = &[
    ratio("batting_avg", &["batting_hits"], &["batting_atbats"]),
    ratio(
        "batting_obp",
        &["batting_hits", "batting_baseonballs", "batting_hitbypitch"],
        &[
            "batting_atbats",
            "batting_baseonballs",
            "batting_hitbypitch",
            "batting_sacflies",
        ],
    ),
    ratio("batting_slg", &["batting_totalbases"], &["batting_atbats"]),
    combined("batting_ops", &["batting_obp", "batting_slg"]),
    ratio(
        "batting_stolenbasepercentage",
        &["batting_stolenbases"],
        &["batting_stolenbases", "batting_caughtstealing"],
    ),
    ratio("batting_atbatsperhomerun", &["batting_atbats"], &["batting_homeruns"]),
    ratio(
        "fielding_caughtstealingpercentage",
        &["fielding_caughtstealing"],
        &["fielding_caughtstealing", "fielding_stolenbases"],
    ),
    ratio(
        "pitching_obp",
        &["pitching_hits", "pitching_baseonballs", "pitching_hitbypitch"],
        &[
            "pitching_atbats",
            "pitching_baseonballs",
            "pitching_hitbypitch",
            "pitching_sacflies",
        ],
    ),
    ratio(
        "pitching_stolenbasepercentage",
        &["pitching_stolenbases"],
        &["pitching_stolenbases", "pitching_caughtstealing"],
    ),
    per_nine("pitching_era", &["pitching_earnedruns"], &["pitching_inningspitched"]),
    ratio(
        "pitching_whip",
        &["pitching_hits", "pitching_baseonballs"],
        &["pitching_inningspitched"],
    ),
    ratio(
        "pitching_groundoutstoairouts",
        &["pitching_groundouts"],
        &["pitching_airouts"],
    ),
    ratio(
        "pitching_strikepercentage",
        &["pitching_strikes"],
        &["pitching_pitchesthrown"],
    ),
];

pub const BATTING_RATIOS: &[RatioFormula] = &[
    ratio("avg", &["hits"], &["atbats"]),
    ratio(
        "obp",
        &["hits", "baseonballs", "hitbypitch"],
        &["atbats", "baseonballs", "hitbypitch", "sacflies"],
    ),
    ratio("slg", &["totalbases"], &["atbats"]),
    combined("ops", &["obp", "slg"]),
    ratio(
        "stolenbasepercentage",
        &["stolenbases"],
        &["stolenbases", "caughtstealing"],
    ),
    ratio("atbatsperhomerun", &["atbats"], &["homeruns"]),
];

pub const PITCHING_RATIOS: &[RatioFormula] = &[
    per_nine("era", &["earnedruns"], &["inningspitched"]),
    ratio("whip", &["hits", "baseonballs"], &["inningspitched"]),
    per_nine("homerunsper9", &["homeruns"], &["inningspitched"]),
    ratio("strikepercentage", &["strikes"], &["pitchesthrown"]),
    ratio(
        "caughtstealingpercentage",
        &["caughtstealing"],
        &["stolenbases", "caughtstealing"],
    ),
];

pub const FIELDING_RATIOS: &[RatioFormula] = &[
    ratio(
        "caughtstealingpercentage",
        &["caughtstealing"],
        &["caughtstealing", "stolenbases"],
    ),
    ratio(
        "fieldingpercentage",
        &["putouts", "assists"],
        &["putouts", "assists", "errors"],
    ),
];

pub fn player_ratios(domain: StatDomain) -> &'static [RatioFormula] {
    match domain {
        StatDomain::Batting => BATTING_RATIOS,
        StatDomain::Pitching => PITCHING_RATIOS,
        StatDomain::Fielding => FIELDING_RATIOS,
    }
}

/// Converts outs-encoded innings (`6.2` = six innings and two outs) to true
/// fractional innings.
pub fn convert_innings_pitched(raw: f64) -> f64 {
    if !raw.is_finite() {
        return raw;
    }
    let whole = raw.trunc();
    let outs = ((raw - whole) * 10.0).round();
    whole + outs / 3.0
}

/// `scale * numerator / denominator`, undefined when the denominator sum is
/// zero.
pub fn reconstruct(name: &str, numerator: f64, denominator: f64, scale: f64) -> Result<f64> {
    if denominator == 0.0 {
        return Err(FeatureError::UndefinedRatio {
            ratio: name.to_string(),
        });
    }
    let value = scale * numerator / denominator;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FeatureError::UndefinedRatio {
            ratio: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RatioSet {
    formulas: &'static [RatioFormula],
}

impl RatioSet {
    pub fn new(formulas: &'static [RatioFormula]) -> Self {
        Self { formulas }
    }

    pub fn formulas(&self) -> &'static [RatioFormula] {
        self.formulas
    }

    pub fn columns(&self, spec: &WindowSpec) -> Vec<String> {
        let label = spec.label();
        self.formulas
            .iter()
            .map(|f| format!("{}_{label}", f.name))
            .collect()
    }

    /// One value per formula; `None` for an empty window, a stat the catalog
    /// never saw, or an undefined ratio.
    pub fn evaluate(&self, catalog: &StatCatalog, sums: Option<&[WindowSum]>) -> Vec<Option<f64>> {
        let Some(sums) = sums else {
            return vec![None; self.formulas.len()];
        };
        let component = |stat: &str| -> Option<f64> {
            let sum = sums.get(catalog.index_of(stat)?)?;
            Some(sum.total)
        };

        let mut out: Vec<Option<f64>> = Vec::with_capacity(self.formulas.len());
        for formula in self.formulas {
            let value = match formula.kind {
                RatioKind::Ratio {
                    numerator,
                    denominator,
                    scale,
                } => {
                    let num = numerator.iter().map(|s| component(s)).sum::<Option<f64>>();
                    let den = denominator.iter().map(|s| component(s)).sum::<Option<f64>>();
                    match (num, den) {
                        (Some(num), Some(den)) => reconstruct(formula.name, num, den, scale).ok(),
                        _ => None,
                    }
                }
                RatioKind::Combined(parts) => parts
                    .iter()
                    .map(|part| {
                        let idx = self.formulas.iter().position(|f| f.name == *part)?;
                        out.get(idx).copied().flatten()
                    })
                    .sum::<Option<f64>>(),
            };
            out.push(value);
        }
        out
    }
}
