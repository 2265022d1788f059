use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Ethereum hard forks in chronological order.
///
/// Each hard fork may introduce new opcodes or change gas costs.
/// Opcodes are only valid if activated at or before the configured hard fork.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum HardFork {
    /// Initial Ethereum release (July 2015)
    Frontier = 0,
    /// First planned hard fork (March 2016)
    Homestead = 1,
    /// DAO fork response (July 2016) - no opcode changes
    DaoFork = 2,
    /// Gas repricing of IO-heavy opcodes (October 2016)
    TangerineWhistle = 3,
    /// State clearing and code size limit (November 2016)
    SpuriousDragon = 4,
    /// First of Metropolis series (October 2017)
    Byzantium = 5,
    /// Second of Metropolis series (February 2019)
    Constantinople = 6,
    /// Constantinople bug fix (February 2019)
    Petersburg = 7,
    /// October 2019 fork
    Istanbul = 8,
    /// January 2020 fork - no opcode changes
    MuirGlacier = 9,
    /// April 2021 fork - access lists
    Berlin = 10,
    /// August 2021 fork
    London = 11,
    /// December 2021 fork - no opcode changes
    ArrowGlacier = 12,
    /// June 2022 fork - no opcode changes
    GrayGlacier = 13,
    /// The Merge (September 2022) - no opcode changes
    Paris = 14,
    /// April 2023 fork
    Shanghai = 15,
    /// March 2024 fork
    Cancun = 16,
    /// Latest hard fork (default)
    #[default]
    Latest = 255,
}

impl HardFork {
    /// Every concrete fork, oldest first.
    pub const ALL: [HardFork; 17] = [
        Self::Frontier,
        Self::Homestead,
        Self::DaoFork,
        Self::TangerineWhistle,
        Self::SpuriousDragon,
        Self::Byzantium,
        Self::Constantinople,
        Self::Petersburg,
        Self::Istanbul,
        Self::MuirGlacier,
        Self::Berlin,
        Self::London,
        Self::ArrowGlacier,
        Self::GrayGlacier,
        Self::Paris,
        Self::Shanghai,
        Self::Cancun,
    ];

    /// Returns the effective hard fork, resolving `Latest` to the actual latest fork.
    ///
    /// ```
    /// use meridian_vm::core::hardfork::HardFork;
    ///
    /// assert_eq!(HardFork::Latest.effective(), HardFork::Cancun);
    /// assert_eq!(HardFork::Berlin.effective(), HardFork::Berlin);
    /// ```
    #[inline]
    pub const fn effective(self) -> Self {
        match self {
            Self::Latest => Self::Cancun,
            other => other,
        }
    }

    /// Returns true if `self` is at or after `other`.
    ///
    /// ```
    /// use meridian_vm::core::hardfork::HardFork;
    ///
    /// assert!(HardFork::London.is_active(HardFork::Berlin));
    /// assert!(!HardFork::Homestead.is_active(HardFork::SpuriousDragon));
    /// assert!(HardFork::Latest.is_active(HardFork::Cancun));
    /// ```
    #[inline]
    pub const fn is_active(self, other: Self) -> bool {
        self.effective() as u8 >= other.effective() as u8
    }

    /// The kebab-case name of the fork.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frontier => "frontier",
            Self::Homestead => "homestead",
            Self::DaoFork => "dao-fork",
            Self::TangerineWhistle => "tangerine-whistle",
            Self::SpuriousDragon => "spurious-dragon",
            Self::Byzantium => "byzantium",
            Self::Constantinople => "constantinople",
            Self::Petersburg => "petersburg",
            Self::Istanbul => "istanbul",
            Self::MuirGlacier => "muir-glacier",
            Self::Berlin => "berlin",
            Self::London => "london",
            Self::ArrowGlacier => "arrow-glacier",
            Self::GrayGlacier => "gray-glacier",
            Self::Paris => "paris",
            Self::Shanghai => "shanghai",
            Self::Cancun => "cancun",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for HardFork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HardFork {
    type Err = String;

    /// Parses a fork name. Case, dashes and underscores are ignored, so `SpuriousDragon`,
    /// `spurious-dragon` and `spurious_dragon` are all accepted. `merge` is an alias of `paris`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            s.chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_lowercase();

        if normalized == "latest" {
            return Ok(Self::Latest);
        }
        if normalized == "merge" {
            return Ok(Self::Paris);
        }

        Self::ALL
            .into_iter()
            .find(|fork| fork.name().replace('-', "") == normalized)
            .ok_or_else(|| format!("unknown hardfork: {s}"))
    }
}
