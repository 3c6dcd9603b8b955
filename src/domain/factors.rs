//! Derived factor tables per metal.
//!
//! Each table combines one or two metric series (and optionally the futures
//! price) aligned on the metal's axis, adding the derived columns from
//! [`crate::domain::derived`].

use crate::domain::derived::{change, free_vs_pledged, net_flow, ratio, split_share, structure_share};
use crate::domain::error::InvquantError;
use crate::domain::instrument::Metal;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorKind {
    /// Cancelled warrants over closing stock.
    CancelledRatio,
    /// Delivered in minus delivered out.
    DeliveryFlows,
    /// Registered share of registered + eligible.
    Structure,
    /// Holdings level and change against price.
    HoldingsFlows,
    /// Registered stock not pledged as margin.
    FreeVsPledged,
    /// Split of stock between two venues.
    VenueSplit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorSpec {
    pub name: &'static str,
    pub kind: FactorKind,
    /// (source, metric) inputs in the order `compute` expects them.
    pub inputs: &'static [(&'static str, &'static str)],
    pub with_price: bool,
}

const COPPER_FACTORS: &[FactorSpec] = &[
    FactorSpec {
        name: "lme_cancelled_ratio",
        kind: FactorKind::CancelledRatio,
        inputs: &[("LME", "lme_cancelled_mt"), ("LME", "lme_closing_mt")],
        with_price: true,
    },
    FactorSpec {
        name: "lme_flows",
        kind: FactorKind::DeliveryFlows,
        inputs: &[("LME", "lme_delivered_in_mt"), ("LME", "lme_delivered_out_mt")],
        with_price: false,
    },
    FactorSpec {
        name: "comex_structure",
        kind: FactorKind::Structure,
        inputs: &[("COMEX", "comex_registered_mt"), ("COMEX", "comex_eligible_mt")],
        with_price: false,
    },
];

const GOLD_FACTORS: &[FactorSpec] = &[
    FactorSpec {
        name: "gld_flows",
        kind: FactorKind::HoldingsFlows,
        inputs: &[("GLD", "gld_holdings_oz")],
        with_price: true,
    },
    FactorSpec {
        name: "comex_free_vs_pledged",
        kind: FactorKind::FreeVsPledged,
        inputs: &[("COMEX", "comex_registered_oz"), ("COMEX", "comex_pledged_oz")],
        with_price: false,
    },
    FactorSpec {
        name: "lbma_vs_comex",
        kind: FactorKind::VenueSplit,
        inputs: &[("LBMA", "lbma_holdings_oz"), ("COMEX", "comex_total_oz")],
        with_price: false,
    },
];

const SILVER_FACTORS: &[FactorSpec] = &[
    FactorSpec {
        name: "comex_structure",
        kind: FactorKind::Structure,
        inputs: &[("COMEX", "comex_registered_oz"), ("COMEX", "comex_eligible_oz")],
        with_price: false,
    },
    FactorSpec {
        name: "lbma_flows",
        kind: FactorKind::HoldingsFlows,
        inputs: &[("LBMA", "lbma_holdings_oz")],
        with_price: true,
    },
];

pub fn catalogue(metal: Metal) -> &'static [FactorSpec] {
    match metal {
        Metal::Copper => COPPER_FACTORS,
        Metal::Gold => GOLD_FACTORS,
        Metal::Silver => SILVER_FACTORS,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorRow {
    pub date: NaiveDate,
    /// Values in the same order as `FactorTable::columns`.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<FactorRow>,
}

impl FactorTable {
    pub fn display_from(&self, start: NaiveDate) -> FactorTable {
        FactorTable {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| r.date >= start).cloned().collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values[i]).collect())
    }
}

impl FactorSpec {
    /// Builds the table from `inputs` (one aligned vector per spec input)
    /// and, when the factor needs it, the aligned price.
    pub fn compute(
        &self,
        axis: &[NaiveDate],
        inputs: &[Vec<f64>],
        price: Option<&[f64]>,
    ) -> Result<FactorTable, InvquantError> {
        if inputs.len() != self.inputs.len() {
            return Err(InvquantError::malformed(
                self.name,
                format!("expected {} inputs, got {}", self.inputs.len(), inputs.len()),
            ));
        }
        if let Some(bad) = inputs.iter().find(|v| v.len() != axis.len()) {
            return Err(InvquantError::malformed(
                self.name,
                format!("input length {} does not match axis length {}", bad.len(), axis.len()),
            ));
        }
        let price = match (self.with_price, price) {
            (true, Some(p)) if p.len() == axis.len() => Some(p.to_vec()),
            (true, _) => {
                return Err(InvquantError::malformed(
                    self.name,
                    "aligned price series is required",
                ));
            }
            (false, _) => None,
        };

        let columns = match self.kind {
            FactorKind::CancelledRatio => {
                let (cancelled, closing) = (&inputs[0], &inputs[1]);
                vec![
                    col("cancelled", cancelled.clone()),
                    col("closing", closing.clone()),
                    col("ratio", ratio(cancelled, closing, 0.0)),
                ]
            }
            FactorKind::DeliveryFlows => {
                let (delivered_in, delivered_out) = (&inputs[0], &inputs[1]);
                vec![
                    col("delivered_in", delivered_in.clone()),
                    col("delivered_out", delivered_out.clone()),
                    col("net_flow", net_flow(delivered_in, delivered_out)),
                ]
            }
            FactorKind::Structure => {
                let (registered, eligible) = (&inputs[0], &inputs[1]);
                let total = registered.iter().zip(eligible).map(|(r, e)| r + e).collect();
                vec![
                    col("registered", registered.clone()),
                    col("eligible", eligible.clone()),
                    col("total", total),
                    col("reg_ratio", structure_share(registered, eligible)),
                ]
            }
            FactorKind::HoldingsFlows => {
                let holdings = &inputs[0];
                vec![
                    col("holdings", holdings.clone()),
                    col("holdings_change", change(holdings)),
                ]
            }
            FactorKind::FreeVsPledged => {
                let (registered, pledged) = (&inputs[0], &inputs[1]);
                let stock = free_vs_pledged(registered, pledged);
                vec![
                    col("registered", registered.clone()),
                    col("pledged", pledged.clone()),
                    col("free", stock.free),
                    col("free_ratio", stock.free_ratio),
                ]
            }
            FactorKind::VenueSplit => {
                let (a, b) = (&inputs[0], &inputs[1]);
                let (a_name, b_name) = (
                    self.inputs[0].0.to_lowercase(),
                    self.inputs[1].0.to_lowercase(),
                );
                let (a_share, b_share) = split_share(a, b);
                vec![
                    (a_name.clone(), a.clone()),
                    (b_name.clone(), b.clone()),
                    (format!("{a_name}_pct"), a_share),
                    (format!("{b_name}_pct"), b_share),
                ]
            }
        };

        let mut table = build(self.name, axis, columns);
        if let Some(price) = price {
            table.columns.push("price".to_string());
            for (row, p) in table.rows.iter_mut().zip(price) {
                row.values.push(p);
            }
        }
        Ok(table)
    }
}

fn col(name: &str, values: Vec<f64>) -> (String, Vec<f64>) {
    (name.to_string(), values)
}

fn build(name: &str, axis: &[NaiveDate], columns: Vec<(String, Vec<f64>)>) -> FactorTable {
    let rows = axis
        .iter()
        .enumerate()
        .map(|(i, &date)| FactorRow {
            date,
            values: columns.iter().map(|(_, v)| v[i]).collect(),
        })
        .collect();
    FactorTable {
        name: name.to_string(),
        columns: columns.into_iter().map(|(c, _)| c).collect(),
        rows,
    }
}
