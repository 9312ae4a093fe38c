//! Economy Rules
//!
//! Pure functions: upgrade price curve and per-click reward.
//! No state of their own.

/// Highest level any upgrade slot can reach.
pub const MAX_UPGRADE_LEVEL: u32 = 36;

/// One segment of the upgrade price curve.
///
/// Levels up to `max_level` cost `offset + multiplier * (level % modulus)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CostBand {
    /// Inclusive upper level of this band.
    pub max_level: u32,
    /// Flat part of the price.
    pub offset: u64,
    /// Price per level inside the band.
    pub multiplier: u64,
    /// Window the level is reduced by.
    pub modulus: u32,
}

/// Price bands, ascending. Levels above the last band use [`TOP_BAND`].
///
/// The first band's modulus is larger than its range, so it reduces to
/// `10 * level`.
pub static COST_BANDS: [CostBand; 4] = [
    CostBand { max_level: 10, offset: 0, multiplier: 10, modulus: 11 },
    CostBand { max_level: 18, offset: 100, multiplier: 50, modulus: 10 },
    CostBand { max_level: 23, offset: 500, multiplier: 100, modulus: 18 },
    CostBand { max_level: 31, offset: 1000, multiplier: 500, modulus: 23 },
];

/// Band for every level past 31.
pub static TOP_BAND: CostBand = CostBand {
    max_level: u32::MAX,
    offset: 5000,
    multiplier: 1000,
    modulus: 31,
};

/// Price of buying `level` (the level owned *after* the purchase, 1-based).
pub fn upgrade_cost(level: u32) -> u64 {
    let band = COST_BANDS
        .iter()
        .find(|band| level <= band.max_level)
        .unwrap_or(&TOP_BAND);

    band.offset + band.multiplier * u64::from(level % band.modulus)
}

/// Gold earned by one click.
///
/// `1 + primary upgrade level + click milestones + upgrade milestones`.
pub fn click_reward(primary_level: u32, click_milestones: u32, upgrade_milestones: u32) -> u64 {
    1 + u64::from(primary_level) + u64::from(click_milestones) + u64::from(upgrade_milestones)
}
