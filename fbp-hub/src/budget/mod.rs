// Keeper (KAP) and prospect (PAD) budget calculators plus the draft-tax
// bracket table they share.

pub mod kap;
pub mod pad;
pub mod tax;

use crate::league::contract::Tier;

/// Rejections raised while editing or submitting a budget selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    #[error("player {upid} is not on this roster")]
    UnknownPlayer { upid: String },

    #[error("maximum {max} keepers")]
    TooManyKeepers { count: usize, max: usize },

    #[error("player {upid} is not selected as a keeper")]
    NotAKeeper { upid: String },

    #[error("player {upid} is not eligible: {reason}")]
    NotEligible { upid: String, reason: String },

    #[error("{tier} IL tag already applied")]
    IlTagTaken { tier: Tier },

    #[error("insufficient balance (${needed} required, ${remaining} remaining)")]
    InsufficientBalance { needed: u32, remaining: i64 },

    #[error("no buy-in for round {round}")]
    InvalidRound { round: u32 },

    #[error("maximum {max} {kind} slots")]
    SlotLimit { kind: &'static str, max: u32 },

    #[error("taxable spend (${spend}) exceeds maximum ${max}")]
    TaxableOverLimit { spend: u32, max: u32 },

    #[error("total spend (${total}) exceeds available budget (${available})")]
    OverBudget { total: u32, available: u32 },
}
