use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use regex::Regex;
use std::{collections::HashSet, sync::LazyLock};

const ANIMALS: &[&str] = &[
    "albatross", "alpaca", "badger", "beaver", "bison", "bobcat", "capybara", "caribou",
    "cheetah", "condor", "coyote", "crane", "dingo", "dolphin", "eagle", "egret", "falcon",
    "ferret", "gazelle", "gecko", "gibbon", "heron", "hyena", "ibis", "iguana", "jackal",
    "jaguar", "kestrel", "koala", "lemur", "leopard", "lynx", "magpie", "marmot", "meerkat",
    "moose", "narwhal", "newt", "ocelot", "osprey", "otter", "panda", "pelican", "puffin",
    "quail", "raven", "salmon", "stoat", "tapir", "toucan", "viper", "walrus", "weasel",
    "wombat", "yak", "zebra",
];

/// Pick an unused name from the pool in an order drawn from `rng`.
///
/// When every animal is taken, the first `<animal><n>` (n = 2, 3, ...) not in
/// `used` is returned, walking the pool in its fixed order.
pub fn pick_unused<R: rand::Rng + ?Sized>(used: &HashSet<&str>, rng: &mut R) -> String {
    let mut order: Vec<&str> = ANIMALS.to_vec();
    order.shuffle(rng);
    if let Some(name) = order.iter().find(|name| !used.contains(**name)) {
        return (*name).to_string();
    }
    (2u32..)
        .flat_map(|n| ANIMALS.iter().map(move |animal| format!("{animal}{n}")))
        .find(|candidate| !used.contains(candidate.as_str()))
        .unwrap_or_default()
}

/// Owns the randomness behind generated names so tests can fix the seed.
pub struct NameGenerator {
    rng: StdRng,
}

impl NameGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self, used: &HashSet<&str>) -> String {
        pick_unused(used, &mut self.rng)
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("name pattern is valid")
});

/// Check a branch or workspace name. Returns a human-readable reason on failure.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if !NAME_RE.is_match(name) {
        return Err(format!(
            "invalid name '{name}': use letters, digits, '.', '_', '-' or '/', starting with a letter or digit"
        ));
    }
    if name.contains("..") || name.ends_with('/') || name.ends_with('.') || name.contains("//") {
        return Err(format!("invalid name '{name}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_name() {
        let used = HashSet::new();
        let a = NameGenerator::seeded(7).generate(&used);
        let b = NameGenerator::seeded(7).generate(&used);
        assert_eq!(a, b);
        assert!(ANIMALS.contains(&a.as_str()));
    }

    #[test]
    fn skips_used_names() {
        let mut used: HashSet<&str> = ANIMALS.iter().copied().collect();
        used.remove("otter");
        let mut names = NameGenerator::seeded(1);
        assert_eq!(names.generate(&used), "otter");
    }

    #[test]
    fn falls_back_to_numbered_names() {
        let mut used: HashSet<&str> = ANIMALS.iter().copied().collect();
        let mut names = NameGenerator::seeded(3);
        assert_eq!(names.generate(&used), "albatross2");
        used.insert("albatross2");
        assert_eq!(names.generate(&used), "alpaca2");
    }

    #[test]
    fn generated_name_is_valid() {
        let mut names = NameGenerator::seeded(42);
        let name = names.generate(&HashSet::new());
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn validate_name_rules() {
        assert!(validate_name("feat/login-v2").is_ok());
        assert!(validate_name("fix_1.2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("-dash").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("a:b").is_err());
        assert!(validate_name("a..b").is_err());
        assert!(validate_name("trailing/").is_err());
        assert!(validate_name("trailing.").is_err());
    }
}
