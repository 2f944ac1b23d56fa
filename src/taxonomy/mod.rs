//! Query intent and content category taxonomy.
//!
//! Two closed enumerations and the static table between them:
//! - [`Intent`]: what kind of question is being asked (~30 values)
//! - [`Category`]: what kind of content a document holds (~10 values)
//!
//! The intent→category table drives cheap pre-filtering in the retrieval
//! engine: documents whose categories do not intersect the intent's targets
//! are dropped before any scoring happens. The table is static data with an
//! init-only lifecycle; nothing mutates it after process start.

use serde::{Deserialize, Serialize};

/// Content category for corpus documents.
///
/// A document carries zero or more categories. An empty set means the
/// document inherits the categories of its nearest categorized ancestor
/// (see [`crate::Corpus::effective_categories`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Spell descriptions, spell lists, casting mechanics.
    Spellcasting,
    /// Attack, damage, initiative, and action economy rules.
    Combat,
    /// Ability scores, checks, saves, and skills.
    Abilities,
    /// Class descriptions and class features.
    Classes,
    /// Ancestry/race descriptions and traits.
    Races,
    /// Mundane gear, weapons, armor, and currency.
    Equipment,
    /// Magic item descriptions and attunement rules.
    MagicItems,
    /// Exploration, travel, resting, and environment rules.
    Adventuring,
    /// Leveling, feats, and multiclassing rules.
    Advancement,
    /// Setting lore, NPCs, factions, and session material.
    Lore,
}

impl Category {
    /// All categories, in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Spellcasting,
            Self::Combat,
            Self::Abilities,
            Self::Classes,
            Self::Races,
            Self::Equipment,
            Self::MagicItems,
            Self::Adventuring,
            Self::Advancement,
            Self::Lore,
        ]
    }

    /// Parses a category string.
    ///
    /// Case-insensitive matching with support for common aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "spellcasting" | "spells" | "magic" => Some(Self::Spellcasting),
            "combat" | "fighting" => Some(Self::Combat),
            "abilities" | "skills" => Some(Self::Abilities),
            "classes" | "class" => Some(Self::Classes),
            "races" | "race" | "ancestries" => Some(Self::Races),
            "equipment" | "gear" | "items" => Some(Self::Equipment),
            "magic_items" | "magic-items" | "magicitems" => Some(Self::MagicItems),
            "adventuring" | "exploration" => Some(Self::Adventuring),
            "advancement" | "leveling" => Some(Self::Advancement),
            "lore" | "setting" | "story" => Some(Self::Lore),
            _ => None,
        }
    }

    /// Returns the string representation used in serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spellcasting => "spellcasting",
            Self::Combat => "combat",
            Self::Abilities => "abilities",
            Self::Classes => "classes",
            Self::Races => "races",
            Self::Equipment => "equipment",
            Self::MagicItems => "magic_items",
            Self::Adventuring => "adventuring",
            Self::Advancement => "advancement",
            Self::Lore => "lore",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Query intent detected by the router decision call.
///
/// Closed set: the router prompt enumerates exactly these values, and
/// anything else in a decision payload is treated as a malformed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// What a specific spell does.
    SpellDetails,
    /// Remaining or maximum spell slots.
    SpellSlots,
    /// How casting works (components, concentration, rituals).
    SpellcastingRules,
    /// Current ability scores and modifiers.
    AbilityScores,
    /// How to make an ability check.
    AbilityCheck,
    /// How to make a saving throw.
    SavingThrow,
    /// How to make a skill check.
    SkillCheck,
    /// Attack roll mechanics and bonuses.
    AttackRoll,
    /// Damage roll mechanics.
    DamageRoll,
    /// Armor class calculation.
    ArmorClass,
    /// Hit points, healing, and dying.
    HitPoints,
    /// Actions available in combat.
    CombatAction,
    /// Movement and speed rules.
    Movement,
    /// Status conditions and their effects.
    Conditions,
    /// Short and long rest rules.
    Resting,
    /// Class feature details.
    ClassFeatures,
    /// Racial/ancestry trait details.
    RacialTraits,
    /// Feat details.
    Feats,
    /// Proficiency bonuses and proficiencies.
    Proficiencies,
    /// Leveling up procedure.
    LevelUp,
    /// Multiclassing rules.
    Multiclassing,
    /// Mundane equipment details.
    Equipment,
    /// What the character is carrying.
    Inventory,
    /// Money and trade.
    Currency,
    /// Magic item details and attunement.
    MagicItems,
    /// Character background and personality.
    Background,
    /// What happened in previous sessions.
    SessionRecap,
    /// Named NPCs and factions.
    NpcLore,
    /// Open quests and objectives.
    QuestStatus,
    /// Anything that does not fit a narrower intent.
    #[default]
    General,
}

impl Intent {
    /// All intents, in declaration order.
    ///
    /// Used to enumerate valid values in the router prompt and in tests.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::SpellDetails,
            Self::SpellSlots,
            Self::SpellcastingRules,
            Self::AbilityScores,
            Self::AbilityCheck,
            Self::SavingThrow,
            Self::SkillCheck,
            Self::AttackRoll,
            Self::DamageRoll,
            Self::ArmorClass,
            Self::HitPoints,
            Self::CombatAction,
            Self::Movement,
            Self::Conditions,
            Self::Resting,
            Self::ClassFeatures,
            Self::RacialTraits,
            Self::Feats,
            Self::Proficiencies,
            Self::LevelUp,
            Self::Multiclassing,
            Self::Equipment,
            Self::Inventory,
            Self::Currency,
            Self::MagicItems,
            Self::Background,
            Self::SessionRecap,
            Self::NpcLore,
            Self::QuestStatus,
            Self::General,
        ]
    }

    /// Returns the target categories for this intent.
    ///
    /// This is the static many-to-many intent→category table. An empty slice
    /// means the intent has no mapping and the retrieval engine searches the
    /// full corpus (no pruning).
    #[must_use]
    pub const fn categories(self) -> &'static [Category] {
        match self {
            Self::SpellDetails | Self::SpellSlots | Self::SpellcastingRules => {
                &[Category::Spellcasting]
            },
            Self::AbilityScores | Self::AbilityCheck | Self::SkillCheck => &[Category::Abilities],
            Self::SavingThrow => &[Category::Abilities, Category::Combat],
            Self::AttackRoll | Self::DamageRoll | Self::CombatAction => &[Category::Combat],
            Self::ArmorClass => &[Category::Combat, Category::Equipment],
            Self::HitPoints => &[Category::Combat, Category::Classes],
            Self::Movement => &[Category::Combat, Category::Adventuring],
            Self::Conditions => &[Category::Combat, Category::Adventuring],
            Self::Resting => &[Category::Adventuring],
            Self::ClassFeatures => &[Category::Classes],
            Self::RacialTraits => &[Category::Races],
            Self::Feats => &[Category::Advancement],
            Self::Proficiencies => &[Category::Abilities, Category::Classes],
            Self::LevelUp | Self::Multiclassing => &[Category::Advancement, Category::Classes],
            Self::Equipment | Self::Currency => &[Category::Equipment],
            Self::Inventory => &[Category::Equipment, Category::MagicItems],
            Self::MagicItems => &[Category::MagicItems],
            Self::Background => &[Category::Lore, Category::Races],
            Self::SessionRecap | Self::NpcLore | Self::QuestStatus => &[Category::Lore],
            Self::General => &[],
        }
    }

    /// Parses an intent string.
    ///
    /// Case-insensitive; accepts the snake_case serialized form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|intent| intent.as_str() == normalized)
    }

    /// Returns the string representation used in serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpellDetails => "spell_details",
            Self::SpellSlots => "spell_slots",
            Self::SpellcastingRules => "spellcasting_rules",
            Self::AbilityScores => "ability_scores",
            Self::AbilityCheck => "ability_check",
            Self::SavingThrow => "saving_throw",
            Self::SkillCheck => "skill_check",
            Self::AttackRoll => "attack_roll",
            Self::DamageRoll => "damage_roll",
            Self::ArmorClass => "armor_class",
            Self::HitPoints => "hit_points",
            Self::CombatAction => "combat_action",
            Self::Movement => "movement",
            Self::Conditions => "conditions",
            Self::Resting => "resting",
            Self::ClassFeatures => "class_features",
            Self::RacialTraits => "racial_traits",
            Self::Feats => "feats",
            Self::Proficiencies => "proficiencies",
            Self::LevelUp => "level_up",
            Self::Multiclassing => "multiclassing",
            Self::Equipment => "equipment",
            Self::Inventory => "inventory",
            Self::Currency => "currency",
            Self::MagicItems => "magic_items",
            Self::Background => "background",
            Self::SessionRecap => "session_recap",
            Self::NpcLore => "npc_lore",
            Self::QuestStatus => "quest_status",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
