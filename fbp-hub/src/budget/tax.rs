// Draft tax: taxable keeper spend mapped to the draft rounds a team forfeits.

/// Highest taxable spend a KAP submission may carry.
pub const MAX_TAXABLE_SPEND: u32 = 435;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxBracket {
    pub min: u32,
    pub max: u32,
    pub lost_rounds: &'static [u32],
}

/// Ordered from the highest spend down. Ranges are contiguous and together
/// cover every `u32`.
pub const BRACKETS: [TaxBracket; 6] = [
    TaxBracket { min: 421, max: u32::MAX, lost_rounds: &[4, 5, 6, 7, 8] },
    TaxBracket { min: 401, max: 420, lost_rounds: &[5, 6, 7] },
    TaxBracket { min: 376, max: 400, lost_rounds: &[6, 7, 8] },
    TaxBracket { min: 351, max: 375, lost_rounds: &[7, 8, 9] },
    TaxBracket { min: 326, max: 350, lost_rounds: &[8, 9, 10] },
    TaxBracket { min: 0, max: 325, lost_rounds: &[] },
];

const LOWEST: TaxBracket = BRACKETS[BRACKETS.len() - 1];

impl TaxBracket {
    pub fn contains(&self, spend: u32) -> bool {
        (self.min..=self.max).contains(&spend)
    }

    pub fn is_taxed(&self) -> bool {
        !self.lost_rounds.is_empty()
    }

    /// "Rounds 6, 7, 8" or "None".
    pub fn label(&self) -> String {
        if self.lost_rounds.is_empty() {
            return "None".to_string();
        }
        let rounds: Vec<String> = self.lost_rounds.iter().map(u32::to_string).collect();
        format!("Rounds {}", rounds.join(", "))
    }
}

pub fn bracket_for(spend: u32) -> TaxBracket {
    BRACKETS
        .iter()
        .copied()
        .find(|b| b.contains(spend))
        .unwrap_or(LOWEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_are_contiguous_and_cover_everything() {
        let mut expected_max = u32::MAX;
        for bracket in BRACKETS {
            assert_eq!(bracket.max, expected_max);
            assert!(bracket.min <= bracket.max);
            expected_max = bracket.min.wrapping_sub(1);
        }
        assert_eq!(BRACKETS[BRACKETS.len() - 1].min, 0);
    }

    #[test]
    fn every_spend_hits_exactly_one_bracket() {
        for spend in (0..=500).chain([MAX_TAXABLE_SPEND, u32::MAX]) {
            let hits = BRACKETS.iter().filter(|b| b.contains(spend)).count();
            assert_eq!(hits, 1, "spend {spend} matched {hits} brackets");
        }
    }

    #[test]
    fn boundaries() {
        assert!(!bracket_for(325).is_taxed());
        assert_eq!(bracket_for(326).lost_rounds, &[8, 9, 10]);
        assert_eq!(bracket_for(375).lost_rounds, &[7, 8, 9]);
        assert_eq!(bracket_for(376).lost_rounds, &[6, 7, 8]);
        assert_eq!(bracket_for(420).lost_rounds, &[5, 6, 7]);
        assert_eq!(bracket_for(435).lost_rounds, &[4, 5, 6, 7, 8]);
    }

    #[test]
    fn labels() {
        assert_eq!(bracket_for(0).label(), "None");
        assert_eq!(bracket_for(360).label(), "Rounds 7, 8, 9");
    }
}
