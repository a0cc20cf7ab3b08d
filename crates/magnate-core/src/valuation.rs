use contracts::{GrowthCurve, InvestmentEntry};

/// Per-minute income of an investment at `level`, for a player at
/// `player_level`. Total over all non-negative levels; `multiplier^0 == 1`,
/// so every multiplicative curve values at `base_income` for level 0.
pub fn income_per_minute(entry: &InvestmentEntry, level: u32, player_level: u32) -> f64 {
    let base = entry.base_income;
    let m = entry.multiplier;

    match entry.curve {
        GrowthCurve::Linear => base * m.powf(f64::from(level)),
        GrowthCurve::Parabolic => {
            let bonus = base * entry.bonus_percent * f64::from(player_level);
            base * m.powf(f64::from(level)) + bonus
        }
        GrowthCurve::Exponential => base * m.powf(f64::from(level) * f64::from(player_level)),
        GrowthCurve::InverseParabolic => {
            let decay = 1.0 / (1.0 + f64::from(player_level) / 10.0);
            base * m.powf(f64::from(level)) * decay
        }
        GrowthCurve::Flat => base,
    }
}

/// Price of buying an investment at `level`. Levels at or below the catalog
/// floor cost the base price; above it the cost climbs by the entry's
/// multiplier per level, rounded to whole coins.
pub fn upgrade_cost(entry: &InvestmentEntry, level: u32) -> f64 {
    let diff = i64::from(level) - i64::from(entry.base_level);
    if diff <= 0 {
        return entry.base_cost;
    }

    (entry.base_cost * entry.multiplier.powf(diff as f64)).round()
}
