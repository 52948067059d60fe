// Keeper contract codes, tiers and the static salary tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract tier. Each tier has its own IL-tag discount and allows one IL
/// tag per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Tender,
    Vested,
    Franchise,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Tender, Tier::Vested, Tier::Franchise];

    /// Salary reduction when a keeper in this tier carries the IL tag.
    pub fn il_discount(&self) -> u32 {
        match self {
            Tier::Tender => 10,
            Tier::Vested => 15,
            Tier::Franchise => 35,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Tier::Tender => "TC",
            Tier::Vested => "VC",
            Tier::Franchise => "FC",
        }
    }

    /// Tier of an arbitrary contract string by prefix. Rookie codes (`R-n`)
    /// are tender contracts and bare `F` codes are franchise contracts.
    /// Anything unrecognised is treated as TC.
    pub fn of_contract(contract: &str) -> Tier {
        let upper = contract.trim().to_uppercase();
        if upper.starts_with("VC") {
            Tier::Vested
        } else if upper.starts_with('F') {
            Tier::Franchise
        } else {
            Tier::Tender
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Canonical keeper contract codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractCode {
    #[serde(rename = "TC-R")]
    TenderRookie,
    #[serde(rename = "TC-BC-1")]
    TenderBlueChip1,
    #[serde(rename = "TC-BC-2")]
    TenderBlueChip2,
    #[serde(rename = "TC-1")]
    Tender1,
    #[serde(rename = "TC-2")]
    Tender2,
    #[serde(rename = "VC-1")]
    Vested1,
    #[serde(rename = "VC-2")]
    Vested2,
    #[serde(rename = "FC-1")]
    Franchise1,
    #[serde(rename = "FC-2")]
    Franchise2,
    #[serde(rename = "FC-2+")]
    Franchise2Plus,
}

impl ContractCode {
    pub const ALL: [ContractCode; 10] = [
        ContractCode::TenderRookie,
        ContractCode::TenderBlueChip1,
        ContractCode::TenderBlueChip2,
        ContractCode::Tender1,
        ContractCode::Tender2,
        ContractCode::Vested1,
        ContractCode::Vested2,
        ContractCode::Franchise1,
        ContractCode::Franchise2,
        ContractCode::Franchise2Plus,
    ];

    /// Parse a contract string into a canonical code.
    ///
    /// Accepts the canonical codes plus the older spellings still present in
    /// roster exports: `TC(R)`, `R-4`..`R-1`, `TC(1)`, `(0)`..`(3)`, `TC(2)`,
    /// `VC(1)`, `VC(2)`, `FC(1)`, `F1`, `FC(2)`, `FC(2+)`, `F2`, `F3`, `F3+`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s.trim().to_uppercase().split_whitespace().collect();
        match normalized.as_str() {
            "TC-R" | "TC(R)" | "R-4" | "R-3" | "R-2" | "R-1" => Some(ContractCode::TenderRookie),
            "TC-BC-1" => Some(ContractCode::TenderBlueChip1),
            "TC-BC-2" => Some(ContractCode::TenderBlueChip2),
            "TC-1" | "TC(1)" | "(3)" | "(2)" | "(1)" | "(0)" => Some(ContractCode::Tender1),
            "TC-2" | "TC(2)" => Some(ContractCode::Tender2),
            "VC-1" | "VC(1)" => Some(ContractCode::Vested1),
            "VC-2" | "VC(2)" => Some(ContractCode::Vested2),
            "FC-1" | "FC(1)" | "F1" => Some(ContractCode::Franchise1),
            "FC-2" | "FC(2)" => Some(ContractCode::Franchise2),
            "FC-2+" | "FC(2+)" | "F2" | "F3" | "F3+" => Some(ContractCode::Franchise2Plus),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            ContractCode::TenderRookie => "TC-R",
            ContractCode::TenderBlueChip1 => "TC-BC-1",
            ContractCode::TenderBlueChip2 => "TC-BC-2",
            ContractCode::Tender1 => "TC-1",
            ContractCode::Tender2 => "TC-2",
            ContractCode::Vested1 => "VC-1",
            ContractCode::Vested2 => "VC-2",
            ContractCode::Franchise1 => "FC-1",
            ContractCode::Franchise2 => "FC-2",
            ContractCode::Franchise2Plus => "FC-2+",
        }
    }

    /// Keeper salary in WizBucks.
    pub fn salary(&self) -> u32 {
        match self {
            ContractCode::TenderRookie
            | ContractCode::TenderBlueChip1
            | ContractCode::TenderBlueChip2 => 5,
            ContractCode::Tender1 => 15,
            ContractCode::Tender2 => 25,
            ContractCode::Vested1 => 35,
            ContractCode::Vested2 => 55,
            ContractCode::Franchise1 => 85,
            ContractCode::Franchise2 | ContractCode::Franchise2Plus => 125,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            ContractCode::TenderRookie
            | ContractCode::TenderBlueChip1
            | ContractCode::TenderBlueChip2
            | ContractCode::Tender1
            | ContractCode::Tender2 => Tier::Tender,
            ContractCode::Vested1 | ContractCode::Vested2 => Tier::Vested,
            ContractCode::Franchise1 | ContractCode::Franchise2 | ContractCode::Franchise2Plus => {
                Tier::Franchise
            }
        }
    }

    /// Contract the player moves to when kept for another season.
    pub fn advance(&self) -> ContractCode {
        match self {
            ContractCode::TenderRookie => ContractCode::Tender1,
            ContractCode::TenderBlueChip1 => ContractCode::TenderBlueChip2,
            ContractCode::TenderBlueChip2 => ContractCode::Tender1,
            ContractCode::Tender1 | ContractCode::Tender2 => ContractCode::Tender2,
            ContractCode::Vested1 | ContractCode::Vested2 => ContractCode::Vested2,
            ContractCode::Franchise1 => ContractCode::Franchise2,
            ContractCode::Franchise2 | ContractCode::Franchise2Plus => {
                ContractCode::Franchise2Plus
            }
        }
    }

    /// Reduce-a-Tier target. Only vested and franchise contracts (other than
    /// VC-1) can be reduced.
    pub fn reduce_tier(&self) -> Option<ContractCode> {
        match self {
            ContractCode::Franchise1 | ContractCode::Franchise2 | ContractCode::Franchise2Plus => {
                Some(ContractCode::Vested2)
            }
            ContractCode::Vested2 => Some(ContractCode::Vested1),
            _ => None,
        }
    }

    /// Rookie and blue-chip tender contracts cannot carry an IL tag.
    pub fn il_eligible(&self) -> bool {
        !matches!(
            self,
            ContractCode::TenderRookie
                | ContractCode::TenderBlueChip1
                | ContractCode::TenderBlueChip2
        )
    }

    /// Salary after the optional IL discount.
    pub fn effective_salary(&self, il_tagged: bool) -> u32 {
        if il_tagged && self.il_eligible() {
            self.salary().saturating_sub(self.tier().il_discount())
        } else {
            self.salary()
        }
    }
}

impl fmt::Display for ContractCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Short badge label for any contract string, keyed on its prefix.
pub fn contract_badge(contract: &str) -> &'static str {
    let upper = contract.trim().to_uppercase();
    if upper.starts_with("FC") {
        "Farm"
    } else if upper.starts_with("PC") {
        "Purchased"
    } else if upper.starts_with("DC") {
        "Development"
    } else if upper.starts_with("TC") {
        "Tender"
    } else if upper.starts_with("VC") {
        "Vested"
    } else if upper.starts_with('R') {
        "Rookie"
    } else {
        "Contract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discounted_salary_never_negative() {
        for code in ContractCode::ALL.iter().filter(|c| c.il_eligible()) {
            assert!(
                code.salary() >= code.tier().il_discount(),
                "{code} salary below its tier discount"
            );
        }
    }

    #[test]
    fn salary_table() {
        assert_eq!(ContractCode::TenderRookie.salary(), 5);
        assert_eq!(ContractCode::Tender1.salary(), 15);
        assert_eq!(ContractCode::Tender2.salary(), 25);
        assert_eq!(ContractCode::Vested1.salary(), 35);
        assert_eq!(ContractCode::Vested2.salary(), 55);
        assert_eq!(ContractCode::Franchise1.salary(), 85);
        assert_eq!(ContractCode::Franchise2Plus.salary(), 125);
    }

    #[test]
    fn parses_canonical_and_legacy_spellings() {
        for code in ContractCode::ALL {
            assert_eq!(ContractCode::parse(code.display_str()), Some(code));
        }
        assert_eq!(ContractCode::parse("tc(r)"), Some(ContractCode::TenderRookie));
        assert_eq!(ContractCode::parse("R-3"), Some(ContractCode::TenderRookie));
        assert_eq!(ContractCode::parse("(2)"), Some(ContractCode::Tender1));
        assert_eq!(ContractCode::parse("TC(2)"), Some(ContractCode::Tender2));
        assert_eq!(ContractCode::parse(" F1 "), Some(ContractCode::Franchise1));
        assert_eq!(ContractCode::parse("F3+"), Some(ContractCode::Franchise2Plus));
        assert_eq!(ContractCode::parse("FC (2+)"), Some(ContractCode::Franchise2Plus));
        assert_eq!(ContractCode::parse("Purchased Contract"), None);
    }

    #[test]
    fn advancement_chain() {
        assert_eq!(ContractCode::TenderRookie.advance(), ContractCode::Tender1);
        assert_eq!(ContractCode::TenderBlueChip1.advance(), ContractCode::TenderBlueChip2);
        assert_eq!(ContractCode::TenderBlueChip2.advance(), ContractCode::Tender1);
        assert_eq!(ContractCode::Tender2.advance(), ContractCode::Tender2);
        assert_eq!(ContractCode::Vested1.advance(), ContractCode::Vested2);
        assert_eq!(ContractCode::Franchise2.advance(), ContractCode::Franchise2Plus);
    }

    #[test]
    fn reduce_a_tier_targets() {
        assert_eq!(ContractCode::Franchise2Plus.reduce_tier(), Some(ContractCode::Vested2));
        assert_eq!(ContractCode::Franchise1.reduce_tier(), Some(ContractCode::Vested2));
        assert_eq!(ContractCode::Vested2.reduce_tier(), Some(ContractCode::Vested1));
        assert_eq!(ContractCode::Vested1.reduce_tier(), None);
        assert_eq!(ContractCode::Tender2.reduce_tier(), None);
    }

    #[test]
    fn il_discount_applies_only_to_eligible_codes() {
        assert_eq!(ContractCode::Franchise1.effective_salary(true), 50);
        assert_eq!(ContractCode::Vested2.effective_salary(true), 40);
        assert_eq!(ContractCode::Tender1.effective_salary(true), 5);
        assert_eq!(ContractCode::TenderRookie.effective_salary(true), 5);
        assert_eq!(ContractCode::Franchise1.effective_salary(false), 85);
    }

    #[test]
    fn tier_of_contract_prefixes() {
        assert_eq!(Tier::of_contract("VC-2"), Tier::Vested);
        assert_eq!(Tier::of_contract("FC-2+"), Tier::Franchise);
        assert_eq!(Tier::of_contract("F3"), Tier::Franchise);
        assert_eq!(Tier::of_contract("R-2"), Tier::Tender);
        assert_eq!(Tier::of_contract(""), Tier::Tender);
    }

    #[test]
    fn badge_labels() {
        assert_eq!(contract_badge("PC"), "Purchased");
        assert_eq!(contract_badge("dc"), "Development");
        assert_eq!(contract_badge("VC-1"), "Vested");
        assert_eq!(contract_badge("R-4"), "Rookie");
        assert_eq!(contract_badge("FC-2"), "Farm");
    }
}
