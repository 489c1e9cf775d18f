//! Channel-width presets.
//!
//! Every preset is the full U2-Net table with all channel widths scaled by
//! `k / 8`, which gives pruning ratios from 12.5% (`k = 7`) to 87.5% (`k = 1`).
//! The three channels of the input image are never scaled.

use std::{fmt, str::FromStr};

use burn::prelude::*;

use super::core::{StageRow, U2NetConfig};
use crate::{
    error::{U2NetError, U2NetResult},
    models::U2Net,
};

/// Number of width steps in the preset family.
const WIDTH_STEPS: usize = 8;

// height, in_ch, mid_ch, out_ch, RSU4F, side
const FULL_ENCODE: [StageRow; 6] = [
    (7, 3, 32, 64, false, false),     // En1
    (6, 64, 32, 128, false, false),   // En2
    (5, 128, 64, 256, false, false),  // En3
    (4, 256, 128, 512, false, false), // En4
    (4, 512, 256, 512, true, false),  // En5
    (4, 512, 256, 512, true, true),   // En6
];

// height, in_ch, mid_ch, out_ch, RSU4F, side
const FULL_DECODE: [StageRow; 5] = [
    (4, 1024, 256, 512, true, true),  // De5
    (4, 1024, 128, 256, false, true), // De4
    (5, 512, 64, 128, false, true),   // De3
    (6, 256, 32, 64, false, true),    // De2
    (7, 128, 16, 64, false, true),    // De1
];

impl U2NetConfig {
    /// The full-width U2-Net configuration.
    pub fn full(out_channels: usize) -> Self {
        Self::scaled(WIDTH_STEPS, out_channels)
    }

    /// Keeps `eighths / 8` of every channel width of the full model.
    ///
    /// The named presets use `eighths` from 1 to 8. Widths that round down to
    /// zero are rejected later by [`U2NetConfig::validate`].
    pub fn scaled(eighths: usize, out_channels: usize) -> Self {
        let scale = |channels: usize| channels * eighths / WIDTH_STEPS;
        let scale_row = |(height, in_ch, mid_ch, out_ch, rsu4f, side): StageRow| {
            (height, scale(in_ch), scale(mid_ch), scale(out_ch), rsu4f, side)
        };

        let mut encode = FULL_ENCODE.map(scale_row);
        encode[0].1 = FULL_ENCODE[0].1;
        let decode = FULL_DECODE.map(scale_row);

        Self::from_rows(&encode, &decode, out_channels)
    }

    /// 12.5% pruning ratio.
    pub fn prune_s(out_channels: usize) -> Self {
        Self::scaled(7, out_channels)
    }

    /// 25% pruning ratio.
    pub fn prune_mm_s(out_channels: usize) -> Self {
        Self::scaled(6, out_channels)
    }

    /// 37.5% pruning ratio.
    pub fn prune_mm(out_channels: usize) -> Self {
        Self::scaled(5, out_channels)
    }

    /// 50% pruning ratio.
    pub fn prune_m_s(out_channels: usize) -> Self {
        Self::scaled(4, out_channels)
    }

    /// 62.5% pruning ratio.
    pub fn prune_m(out_channels: usize) -> Self {
        Self::scaled(3, out_channels)
    }

    /// 75% pruning ratio.
    pub fn prune_l_s(out_channels: usize) -> Self {
        Self::scaled(2, out_channels)
    }

    /// 87.5% pruning ratio.
    pub fn prune_l(out_channels: usize) -> Self {
        Self::scaled(1, out_channels)
    }
}

/// The named members of the preset family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum U2NetVariant {
    Full,
    PruneS,
    PruneMmS,
    PruneMm,
    PruneMS,
    PruneM,
    PruneLS,
    PruneL,
}

impl U2NetVariant {
    /// Every variant, from the widest to the narrowest.
    pub const ALL: [Self; 8] = [
        Self::Full,
        Self::PruneS,
        Self::PruneMmS,
        Self::PruneMm,
        Self::PruneMS,
        Self::PruneM,
        Self::PruneLS,
        Self::PruneL,
    ];

    /// Eighths of the full channel width this variant keeps.
    const fn width_eighths(self) -> usize {
        match self {
            Self::Full => 8,
            Self::PruneS => 7,
            Self::PruneMmS => 6,
            Self::PruneMm => 5,
            Self::PruneMS => 4,
            Self::PruneM => 3,
            Self::PruneLS => 2,
            Self::PruneL => 1,
        }
    }

    /// Fraction of the full channel width removed by this variant.
    pub fn pruning_ratio(self) -> f64 {
        (WIDTH_STEPS - self.width_eighths()) as f64 / WIDTH_STEPS as f64
    }

    /// Canonical name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::PruneS => "prune-s",
            Self::PruneMmS => "prune-mm-s",
            Self::PruneMm => "prune-mm",
            Self::PruneMS => "prune-m-s",
            Self::PruneM => "prune-m",
            Self::PruneLS => "prune-l-s",
            Self::PruneL => "prune-l",
        }
    }

    /// The configuration of this variant.
    pub fn config(self, out_channels: usize) -> U2NetConfig {
        U2NetConfig::scaled(self.width_eighths(), out_channels)
    }

    /// Builds the model of this variant.
    pub fn init<B: Backend>(
        self,
        out_channels: usize,
        device: &B::Device,
    ) -> U2NetResult<U2Net<B>> {
        self.config(out_channels).init(device)
    }
}

impl fmt::Display for U2NetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for U2NetVariant {
    type Err = U2NetError;

    /// Accepts the canonical names as well as the `u2net_prune_*` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = normalized.strip_prefix("u2net-").unwrap_or(&normalized);

        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == normalized)
            .ok_or_else(|| U2NetError::UnknownVariant {
                name: s.to_string(),
            })
    }
}

/// Builds the full-width U2-Net.
pub fn u2net_full<B: Backend>(out_channels: usize, device: &B::Device) -> U2NetResult<U2Net<B>> {
    U2NetVariant::Full.init(out_channels, device)
}

/// Builds U2-Net with 12.5% of its channel width pruned.
pub fn u2net_prune_s<B: Backend>(out_channels: usize, device: &B::Device) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneS.init(out_channels, device)
}

/// Builds U2-Net with 25% of its channel width pruned.
pub fn u2net_prune_mm_s<B: Backend>(
    out_channels: usize,
    device: &B::Device,
) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneMmS.init(out_channels, device)
}

/// Builds U2-Net with 37.5% of its channel width pruned.
pub fn u2net_prune_mm<B: Backend>(
    out_channels: usize,
    device: &B::Device,
) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneMm.init(out_channels, device)
}

/// Builds U2-Net with 50% of its channel width pruned.
pub fn u2net_prune_m_s<B: Backend>(
    out_channels: usize,
    device: &B::Device,
) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneMS.init(out_channels, device)
}

/// Builds U2-Net with 62.5% of its channel width pruned.
pub fn u2net_prune_m<B: Backend>(out_channels: usize, device: &B::Device) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneM.init(out_channels, device)
}

/// Builds U2-Net with 75% of its channel width pruned.
pub fn u2net_prune_l_s<B: Backend>(
    out_channels: usize,
    device: &B::Device,
) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneLS.init(out_channels, device)
}

/// Builds U2-Net with 87.5% of its channel width pruned.
pub fn u2net_prune_l<B: Backend>(out_channels: usize, device: &B::Device) -> U2NetResult<U2Net<B>> {
    U2NetVariant::PruneL.init(out_channels, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;

    fn stage(row: StageRow) -> StageConfig {
        row.into()
    }

    #[test]
    fn full_table_matches_reference_widths() {
        let config = U2NetConfig::full(1);

        assert_eq!(config.encode.len(), 6);
        assert_eq!(config.decode.len(), 5);
        assert_eq!(config.encode[0], stage((7, 3, 32, 64, false, false)));
        assert_eq!(config.encode[5], stage((4, 512, 256, 512, true, true)));
        assert_eq!(config.decode[0], stage((4, 1024, 256, 512, true, true)));
        assert_eq!(config.decode[4], stage((7, 128, 16, 64, false, true)));
        assert_eq!(config.side_count(), 6);
    }

    #[test]
    fn pruned_tables_match_reference_widths() {
        let l = U2NetConfig::prune_l(1);
        assert_eq!(l.encode[0], stage((7, 3, 4, 8, false, false)));
        assert_eq!(l.encode[4], stage((4, 64, 32, 64, true, false)));
        assert_eq!(l.decode[0], stage((4, 128, 32, 64, true, true)));
        assert_eq!(l.decode[4], stage((7, 16, 2, 8, false, true)));

        let m = U2NetConfig::prune_m(1);
        assert_eq!(m.encode[1], stage((6, 24, 12, 48, false, false)));
        assert_eq!(m.decode[4], stage((7, 48, 6, 24, false, true)));

        let mm = U2NetConfig::prune_mm(1);
        assert_eq!(mm.encode[3], stage((4, 160, 80, 320, false, false)));
        assert_eq!(mm.decode[4], stage((7, 80, 10, 40, false, true)));

        let s = U2NetConfig::prune_s(1);
        assert_eq!(s.encode[0], stage((7, 3, 28, 56, false, false)));
        assert_eq!(s.decode[0], stage((4, 896, 224, 448, true, true)));
        assert_eq!(s.decode[4], stage((7, 112, 14, 56, false, true)));
    }

    #[test]
    fn every_preset_is_valid() {
        for variant in U2NetVariant::ALL {
            let config = variant.config(1);
            assert!(config.validate().is_ok(), "{variant} should be valid");
            assert_eq!(config.in_channels(), 3);
        }
    }

    #[test]
    fn zero_width_is_rejected() {
        match U2NetConfig::scaled(0, 1).validate() {
            Err(U2NetError::InvalidConfiguration { reason }) => assert!(reason.contains("En1")),
            other => panic!("Expected InvalidConfiguration error, got {other:?}"),
        }
    }

    #[test]
    fn pruning_ratios_cover_the_family() {
        let ratios: Vec<f64> = U2NetVariant::ALL.iter().map(|v| v.pruning_ratio()).collect();
        assert_eq!(ratios, vec![0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875]);
    }

    #[test]
    fn variant_names_round_trip() {
        for variant in U2NetVariant::ALL {
            assert_eq!(variant.to_string().parse::<U2NetVariant>().unwrap(), variant);
        }
        assert_eq!(
            "u2net_prune_mm_s".parse::<U2NetVariant>().unwrap(),
            U2NetVariant::PruneMmS
        );
        assert_eq!("FULL".parse::<U2NetVariant>().unwrap(), U2NetVariant::Full);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        match "prune-xl".parse::<U2NetVariant>() {
            Err(U2NetError::UnknownVariant { name }) => assert_eq!(name, "prune-xl"),
            other => panic!("Expected UnknownVariant error, got {other:?}"),
        }
    }
}
