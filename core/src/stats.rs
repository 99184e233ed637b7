//! Static stat tables for every enemy and tower kind.
//!
//! Each kind is a small, closed enum whose behaviour is described entirely by
//! data returned from the lookups below. Systems and the world branch on the
//! returned records rather than on the kind itself wherever possible.

use serde::{Deserialize, Serialize};

use crate::{CellRectSize, GamePhase};

/// Highest level a tower can reach.
pub const MAX_TOWER_LEVEL: u8 = 3;

/// Share of the invested currency refunded when selling after setup.
pub const SELL_REFUND_PERCENT: u32 = 60;

const UPGRADE_TICKS_PER_LEVEL: u32 = 60;
const BOSS_REWARD_MULTIPLIER: u32 = 10;
const BOSS_HEALTH_MULTIPLIER: u32 = 10;
const BOSS_LEAK_DAMAGE: u32 = 5;
const BOSS_SPEED_FACTOR: f32 = 0.8;
const BOSS_ARMOR: u32 = 6;
const BROOD_CHILDREN: u32 = 3;

/// Damage remaining after armor, never less than one.
#[must_use]
pub const fn apply_armor(raw: u32, armor: u32) -> u32 {
    let reduced = raw.saturating_sub(armor);
    if reduced == 0 {
        1
    } else {
        reduced
    }
}

/// Currency returned when selling a tower with the provided investment.
///
/// Setup-phase sales refund in full so players can reposition freely before
/// the first wave.
#[must_use]
pub fn refund_for(invested: u32, phase: GamePhase) -> u32 {
    match phase {
        GamePhase::Setup => invested,
        _ => {
            let scaled = u64::from(invested) * u64::from(SELL_REFUND_PERCENT) / 100;
            u32::try_from(scaled).unwrap_or(u32::MAX)
        }
    }
}

/// Currency and score granted when an enemy is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reward {
    /// Currency credited to the ledger.
    pub currency: u32,
    /// Score credited to the ledger.
    pub score: u32,
}

/// Behavioural flags carried by an enemy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyTraits {
    /// Flies straight from entry to goal, ignoring the grid.
    pub flying: bool,
    /// Ignores slow effects.
    pub slow_immune: bool,
    /// Number of Broodlings spawned on death.
    pub children: u32,
}

/// Complete stat record for an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyProfile {
    /// Starting and maximum health.
    pub max_health: u32,
    /// Base speed in cells per tick.
    pub speed: f32,
    /// Flat damage reduction.
    pub armor: u32,
    /// Reward granted on kill.
    pub reward: Reward,
    /// Base health lost when the enemy leaks.
    pub leak_damage: u32,
    /// Behavioural flags.
    pub traits: EnemyTraits,
}

/// Types of enemies that can traverse the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Baseline walker.
    Grunt,
    /// Fast, fragile walker.
    Runner,
    /// Weak walker sent in dense packs.
    Swarmling,
    /// Slow walker with armor.
    Armored,
    /// Flies straight across the grid.
    Flyer,
    /// Slow-immune heavy walker.
    Juggernaut,
    /// Splits into Broodlings on death.
    Brood,
    /// Child spawned by a dying Brood.
    Broodling,
}

impl EnemyKind {
    /// Base stat record for the kind.
    #[must_use]
    pub const fn profile(self) -> EnemyProfile {
        let (max_health, speed, armor, currency, score, leak_damage) = match self {
            Self::Grunt => (50, 0.025, 0, 5, 10, 1),
            Self::Runner => (30, 0.045, 0, 4, 8, 1),
            Self::Swarmling => (15, 0.035, 0, 1, 3, 1),
            Self::Armored => (90, 0.020, 4, 8, 15, 2),
            Self::Flyer => (40, 0.030, 0, 6, 12, 1),
            Self::Juggernaut => (120, 0.018, 2, 10, 20, 2),
            Self::Brood => (70, 0.022, 0, 8, 15, 2),
            Self::Broodling => (12, 0.040, 0, 1, 2, 1),
        };
        let traits = EnemyTraits {
            flying: matches!(self, Self::Flyer),
            slow_immune: matches!(self, Self::Juggernaut),
            children: if matches!(self, Self::Brood) {
                BROOD_CHILDREN
            } else {
                0
            },
        };
        EnemyProfile {
            max_health,
            speed,
            armor,
            reward: Reward { currency, score },
            leak_damage,
            traits,
        }
    }

    /// Profile of this kind promoted to a boss for the provided wave.
    #[must_use]
    pub fn boss_profile(self, wave: u32, boss_trait: BossTrait) -> EnemyProfile {
        let mut profile = self.profile();
        let tier = (wave / 10).max(1);
        profile.max_health = profile
            .max_health
            .saturating_mul(BOSS_HEALTH_MULTIPLIER)
            .saturating_mul(tier);
        profile.speed *= BOSS_SPEED_FACTOR;
        profile.reward.currency = profile.reward.currency.saturating_mul(BOSS_REWARD_MULTIPLIER);
        profile.reward.score = profile.reward.score.saturating_mul(BOSS_REWARD_MULTIPLIER);
        profile.leak_damage = BOSS_LEAK_DAMAGE;
        match boss_trait {
            BossTrait::Armored => profile.armor = BOSS_ARMOR,
            BossTrait::SlowImmune => profile.traits.slow_immune = true,
            BossTrait::Spawner => profile.traits.children = BROOD_CHILDREN,
            BossTrait::Flying => profile.traits.flying = true,
        }
        profile
    }
}

/// Extra trait rolled for a boss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossTrait {
    /// Heavy armor.
    Armored,
    /// Immune to slows.
    SlowImmune,
    /// Splits into Broodlings on death.
    Spawner,
    /// Flies over the maze.
    Flying,
}

impl BossTrait {
    /// Every trait a boss can roll.
    pub const ALL: [BossTrait; 4] = [
        BossTrait::Armored,
        BossTrait::SlowImmune,
        BossTrait::Spawner,
        BossTrait::Flying,
    ];
}

/// Which enemies a tower is able to engage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetFilter {
    /// Engages ground and flying enemies.
    Any,
    /// Engages ground enemies only.
    GroundOnly,
    /// Engages flying enemies only.
    FlyingOnly,
}

impl TargetFilter {
    /// Reports whether an enemy with the provided flying flag is eligible.
    #[must_use]
    pub const fn admits(self, flying: bool) -> bool {
        match self {
            Self::Any => true,
            Self::GroundOnly => !flying,
            Self::FlyingOnly => flying,
        }
    }
}

/// Firing behaviour selected by a tower kind and level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FireMode {
    /// One projectile at the nearest enemy.
    Single,
    /// One projectile at each of up to `max_targets` nearest enemies.
    Multi {
        /// Maximum number of targets per volley.
        max_targets: usize,
    },
    /// One projectile that splashes half damage around its target on impact.
    Splash {
        /// Splash radius in cells.
        radius: f32,
    },
    /// One projectile that slows its target on impact.
    Slow {
        /// Fraction of speed removed while slowed.
        factor: f32,
        /// Duration of the slow in ticks.
        duration: u32,
    },
    /// Instant damage to every enemy in range with a chance to stun.
    Melee {
        /// Probability in `0..=1` that a hit stuns.
        stun_chance: f64,
        /// Stun duration in ticks.
        stun_ticks: u32,
    },
}

impl FireMode {
    /// Projectile payload carried by shots in this mode, or `None` for melee.
    #[must_use]
    pub const fn payload(self) -> Option<ProjectilePayload> {
        match self {
            Self::Single | Self::Multi { .. } => Some(ProjectilePayload::Plain),
            Self::Splash { radius } => Some(ProjectilePayload::Splash { radius }),
            Self::Slow { factor, duration } => Some(ProjectilePayload::Slow { factor, duration }),
            Self::Melee { .. } => None,
        }
    }
}

/// Effect delivered by a projectile on impact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectilePayload {
    /// Primary damage only.
    Plain,
    /// Primary damage plus halved damage to neighbours.
    Splash {
        /// Splash radius in cells.
        radius: f32,
    },
    /// Primary damage plus a slow effect.
    Slow {
        /// Fraction of speed removed while slowed.
        factor: f32,
        /// Duration of the slow in ticks.
        duration: u32,
    },
}

/// Types of towers that can be constructed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Single-target tower engaging anything.
    Arrow,
    /// Multi-target tower.
    Volley,
    /// Splash tower engaging ground enemies.
    Cannon,
    /// Slowing tower.
    Frost,
    /// Melee area tower with a stun chance.
    Spike,
    /// Anti-air tower engaging flying enemies only.
    Flak,
}

impl TowerKind {
    /// Every constructible tower kind.
    pub const ALL: [TowerKind; 6] = [
        TowerKind::Arrow,
        TowerKind::Volley,
        TowerKind::Cannon,
        TowerKind::Frost,
        TowerKind::Spike,
        TowerKind::Flak,
    ];

    /// Footprint occupied by the tower.
    #[must_use]
    pub const fn footprint(self) -> CellRectSize {
        CellRectSize::new(2, 2)
    }

    /// Currency required to build the tower.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Arrow => 50,
            Self::Volley => 80,
            Self::Cannon => 100,
            Self::Frost => 70,
            Self::Spike => 90,
            Self::Flak => 75,
        }
    }

    /// Currency required to upgrade from `level` to the next level.
    ///
    /// Returns `None` once the tower is at [`MAX_TOWER_LEVEL`].
    #[must_use]
    pub const fn upgrade_cost(self, level: u8) -> Option<u32> {
        let costs = match self {
            Self::Arrow => [50, 50],
            Self::Volley => [60, 90],
            Self::Cannon => [80, 120],
            Self::Frost => [50, 80],
            Self::Spike => [70, 100],
            Self::Flak => [60, 90],
        };
        match level {
            1 => Some(costs[0]),
            2 => Some(costs[1]),
            _ => None,
        }
    }

    /// Ticks an upgrade toward `target_level` takes to complete.
    #[must_use]
    pub const fn upgrade_ticks(self, target_level: u8) -> u32 {
        UPGRADE_TICKS_PER_LEVEL * target_level as u32
    }

    /// Raw damage per hit at the provided level.
    #[must_use]
    pub const fn damage(self, level: u8) -> u32 {
        let table = match self {
            Self::Arrow => [10, 20, 30],
            Self::Volley => [6, 9, 12],
            Self::Cannon => [20, 32, 45],
            Self::Frost => [3, 5, 7],
            Self::Spike => [12, 18, 26],
            Self::Flak => [18, 28, 40],
        };
        table[level_index(level)]
    }

    /// Engagement radius in cells at the provided level.
    #[must_use]
    pub const fn range(self, level: u8) -> f32 {
        let table = match self {
            Self::Arrow => [2.5, 3.0, 3.5],
            Self::Volley => [2.5, 2.75, 3.0],
            Self::Cannon => [3.0, 3.25, 3.5],
            Self::Frost => [2.5, 2.75, 3.0],
            Self::Spike => [1.5, 1.75, 2.0],
            Self::Flak => [3.5, 4.0, 4.5],
        };
        table[level_index(level)]
    }

    /// Ticks between shots at the provided level.
    #[must_use]
    pub const fn fire_interval(self, level: u8) -> u32 {
        let table = match self {
            Self::Arrow => [60, 60, 60],
            Self::Volley => [50, 45, 40],
            Self::Cannon => [90, 85, 80],
            Self::Frost => [45, 45, 45],
            Self::Spike => [40, 36, 32],
            Self::Flak => [40, 36, 32],
        };
        table[level_index(level)]
    }

    /// Firing behaviour at the provided level.
    #[must_use]
    pub const fn fire_mode(self, level: u8) -> FireMode {
        let index = level_index(level);
        match self {
            Self::Arrow | Self::Flak => FireMode::Single,
            Self::Volley => FireMode::Multi { max_targets: 3 },
            Self::Cannon => FireMode::Splash { radius: 1.25 },
            Self::Frost => FireMode::Slow {
                factor: [0.4, 0.45, 0.5][index],
                duration: [120, 150, 180][index],
            },
            Self::Spike => FireMode::Melee {
                stun_chance: 0.15,
                stun_ticks: 30,
            },
        }
    }

    /// Enemies this tower can engage.
    #[must_use]
    pub const fn target_filter(self) -> TargetFilter {
        match self {
            Self::Cannon | Self::Spike => TargetFilter::GroundOnly,
            Self::Flak => TargetFilter::FlyingOnly,
            Self::Arrow | Self::Volley | Self::Frost => TargetFilter::Any,
        }
    }

    /// Projectile speed in cells per tick; melee towers fire no projectiles.
    #[must_use]
    pub const fn projectile_speed(self) -> f32 {
        match self {
            Self::Arrow | Self::Volley => 0.30,
            Self::Cannon => 0.15,
            Self::Frost => 0.20,
            Self::Flak => 0.40,
            Self::Spike => 0.0,
        }
    }
}

const fn level_index(level: u8) -> usize {
    match level {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    }
}
