use std::fmt::{self, Display};

use chrono::{DateTime, Local};
use serde::Serialize;

use super::cycle::Cycle;
use super::graph::RateGraph;
use super::token::Token;

/// Width of the separator line closing each rendered opportunity
const SEPARATOR_WIDTH: usize = 50;

/// One trade of an arbitrage cycle and the rate it was priced at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeHop {
    /// Token sold
    pub from: Token,
    /// Token bought
    pub to: Token,
    /// Units of `to` received per unit of `from`
    pub rate: f64,
}

/// A profitable cycle priced against the snapshot it was found in.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    /// The cycle, first token repeated at the end
    pub path: Cycle,
    /// Each trade of the cycle with its original rate
    pub exchange_rates: Vec<ExchangeHop>,
    /// Amount of the start token held after trading 1 unit around the cycle
    pub final_value: f64,
    /// `(final_value - 1) * 100`
    pub profit_percentage: f64,
    /// When the opportunity was priced
    pub detected_at: DateTime<Local>,
}

impl ArbitrageOpportunity {
    /// Prices `cycle` against `graph`, trading 1 unit of the start token around it.
    ///
    /// Returns `None` if a hop is missing from the graph, or if the cycle does not
    /// actually end with more than it started with. The latter can happen for cycles
    /// found on the floating point boundary of the log transform.
    #[must_use]
    pub fn price(cycle: Cycle, graph: &RateGraph) -> Option<Self> {
        let rates = cycle.rates(graph)?;
        let exchange_rates: Vec<ExchangeHop> = cycle
            .hops()
            .zip(rates)
            .map(|((from, to), rate)| ExchangeHop {
                from: from.clone(),
                to: to.clone(),
                rate,
            })
            .collect();

        let initial_value = 1.0;
        let final_value = exchange_rates
            .iter()
            .fold(initial_value, |value, hop| value * hop.rate);
        if final_value <= initial_value {
            return None;
        }

        Some(Self {
            path: cycle,
            exchange_rates,
            final_value,
            profit_percentage: (final_value - initial_value) / initial_value * 100.0,
            detected_at: Local::now(),
        })
    }

    /// One-line summary for log output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} ({:.2}%)", self.path, self.profit_percentage)
    }
}

/// Human readable report, as written to the opportunity log and notifications.
impl Display for ArbitrageOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} - Arbitrage Opportunity Found!",
            self.detected_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "Path: {}", self.path)?;
        writeln!(f, "Exchange Rates:")?;
        for hop in &self.exchange_rates {
            writeln!(f, "    {} → {}: {:.6}", hop.from, hop.to, hop.rate)?;
        }
        writeln!(f, "Profit: {:.2}%", self.profit_percentage)?;
        write!(f, "{}", "-".repeat(SEPARATOR_WIDTH))
    }
}
