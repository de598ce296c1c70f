use crate::config::Breakpoint;

/// Tier matching `container_width`: the widest whose `min_width` fits
pub fn tier_for(breakpoints: &[Breakpoint], container_width: f64) -> Option<Breakpoint> {
    breakpoints
        .iter()
        .filter(|bp| container_width >= bp.min_width)
        .max_by(|a, b| a.min_width.total_cmp(&b.min_width))
        .copied()
        .or_else(|| {
            // Narrower than every tier: fall back to the smallest one
            breakpoints
                .iter()
                .min_by(|a, b| a.min_width.total_cmp(&b.min_width))
                .copied()
        })
}

/// Distance of one manual step: a card width plus the gap after it
pub fn step_unit(breakpoints: &[Breakpoint], container_width: f64) -> f64 {
    tier_for(breakpoints, container_width)
        .map(|bp| bp.item_width + bp.gap)
        .unwrap_or(container_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CarouselConfig;

    #[test]
    fn test_default_tiers() {
        let bps = CarouselConfig::default().breakpoints;
        assert_eq!(step_unit(&bps, 1440.0), 344.0);
        assert_eq!(step_unit(&bps, 1024.0), 344.0);
        assert_eq!(step_unit(&bps, 800.0), 296.0);
        assert_eq!(step_unit(&bps, 375.0), 252.0);
    }

    #[test]
    fn test_unordered_table_and_fallbacks() {
        let bps = [
            Breakpoint { min_width: 500.0, item_width: 200.0, gap: 10.0 },
            Breakpoint { min_width: 900.0, item_width: 300.0, gap: 20.0 },
        ];
        assert_eq!(step_unit(&bps, 1000.0), 320.0);
        assert_eq!(step_unit(&bps, 600.0), 210.0);
        // Below every tier
        assert_eq!(step_unit(&bps, 300.0), 210.0);
        // No table at all: one viewport per step
        assert_eq!(step_unit(&[], 420.0), 420.0);
    }
}
