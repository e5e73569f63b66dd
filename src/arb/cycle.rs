/// Cycle is a closed sequence of tokens `[t0, t1, ..., tk]` with `t0 == tk`.
/// Two cycles are the same only if their sequences are identical: a rotation of a cycle
/// (the same loop entered at another token) is a different cycle.
use std::fmt::{self, Debug, Display};

use eyre::{bail, Result};
use serde::Serialize;

use super::graph::RateGraph;
use super::token::Token;

/// A sequence of trades that starts and ends at the same token
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycle {
    /// Tokens in trade order, the first one repeated at the end
    path: Vec<Token>,
}

impl Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cycle({self})")
    }
}

impl Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.path.iter().map(Token::symbol).collect();
        write!(f, "{}", symbols.join(" → "))
    }
}

impl Cycle {
    /// Creates a cycle from a closed token path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has fewer than 2 hops, does not end where it
    /// starts, or trades a token into itself.
    pub fn new(path: Vec<Token>) -> Result<Self> {
        let cycle = Self { path };
        cycle.validate_path()?;
        Ok(cycle)
    }

    fn validate_path(&self) -> Result<()> {
        if self.path.len() < 3 {
            bail!("Cycle must have at least 2 hops");
        }

        if self.path.first() != self.path.last() {
            bail!(
                "Cycle must end where it starts ({:?} != {:?})",
                self.path.first(),
                self.path.last()
            );
        }

        for (i, hop) in self.path.windows(2).enumerate() {
            if hop[0] == hop[1] {
                bail!("Hop {} trades {} into itself", i, hop[0]);
            }
        }
        Ok(())
    }

    /// Tokens in trade order, starting token included at both ends.
    #[must_use]
    pub fn path(&self) -> &[Token] {
        &self.path
    }

    /// Consecutive `(from, to)` pairs, one per trade.
    pub fn hops(&self) -> impl Iterator<Item = (&Token, &Token)> {
        self.path.windows(2).map(|hop| (&hop[0], &hop[1]))
    }

    /// Number of trades in the cycle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len() - 1
    }

    /// Always false, a valid cycle has at least 2 hops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The rates of each hop as found in `graph`, or `None` if any hop is not an edge of it.
    #[must_use]
    pub fn rates(&self, graph: &RateGraph) -> Option<Vec<f64>> {
        self.hops().map(|(from, to)| graph.rate(from, to)).collect()
    }
}
