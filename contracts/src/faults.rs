//! Failure injection for the devnet.
//!
//! Tests arm a fault for the next `n` calls of one kind; each call that
//! trips it fails as if the RPC had dropped the request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which operation a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    Deploy,
    Transfer,
    Sign,
    Disable,
    /// The disable is mined but the caller never sees the receipt.
    DisableReceiptLost,
    Redeem,
    BalanceQuery,
}

/// Remaining trips per fault kind.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    armed: HashMap<Fault, u32>,
}

impl FaultPlan {
    /// Fails the next `times` calls of `fault`. Replaces any earlier count.
    pub fn arm(&mut self, fault: Fault, times: u32) {
        if times == 0 {
            self.armed.remove(&fault);
        } else {
            self.armed.insert(fault, times);
        }
    }

    /// Consumes one trip if `fault` is armed.
    pub fn trip(&mut self, fault: Fault) -> bool {
        match self.armed.get_mut(&fault) {
            Some(left) if *left > 0 => {
                *left -= 1;
                if *left == 0 {
                    self.armed.remove(&fault);
                }
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, fault: Fault) -> u32 {
        self.armed.get(&fault).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.armed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_exactly_n_times() {
        let mut plan = FaultPlan::default();
        plan.arm(Fault::Disable, 2);
        assert!(plan.trip(Fault::Disable));
        assert!(!plan.trip(Fault::Deploy));
        assert!(plan.trip(Fault::Disable));
        assert!(!plan.trip(Fault::Disable));
        assert_eq!(plan.remaining(Fault::Disable), 0);
    }

    #[test]
    fn arm_zero_disarms() {
        let mut plan = FaultPlan::default();
        plan.arm(Fault::Redeem, 5);
        plan.arm(Fault::Redeem, 0);
        assert!(!plan.trip(Fault::Redeem));
    }
}
