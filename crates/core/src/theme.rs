// SPDX-License-Identifier: MIT

//! Themed identifier pools for session names.
//!
//! Each project maps deterministically (FNV-1a of its name) to one theme; a
//! theme is a fixed, insertion-ordered list of 20 identifiers. Allocation
//! walks the list and returns the first identifier not currently in use, so
//! freed names are re-issued in theme order.

use std::collections::HashSet;

/// A named, fixed-order pool of session identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub names: [&'static str; 20],
}

impl Theme {
    /// First identifier in theme order not present in `in_use`.
    pub fn allocate(&self, in_use: &HashSet<String>) -> Option<&'static str> {
        self.names.iter().copied().find(|n| !in_use.contains(*n))
    }
}

pub const THEMES: [Theme; 8] = [
    Theme {
        name: "rivers",
        names: [
            "amazon", "nile", "danube", "mekong", "volga", "rhine", "ganges", "yukon", "tiber",
            "loire", "ebro", "indus", "congo", "murray", "fraser", "severn", "shannon", "oder",
            "elbe", "douro",
        ],
    },
    Theme {
        name: "peaks",
        names: [
            "everest", "denali", "rainier", "fuji", "olympus", "matterhorn", "kilimanjaro",
            "aconcagua", "elbrus", "whitney", "shasta", "hood", "teide", "etna", "eiger", "jungfrau",
            "makalu", "lhotse", "annapurna", "kenya",
        ],
    },
    Theme {
        name: "birds",
        names: [
            "wren", "heron", "osprey", "kestrel", "plover", "sparrow", "finch", "swift", "tern",
            "lark", "robin", "magpie", "crane", "ibis", "puffin", "gannet", "shrike", "siskin",
            "dunlin", "avocet",
        ],
    },
    Theme {
        name: "minerals",
        names: [
            "quartz", "feldspar", "mica", "olivine", "garnet", "pyrite", "calcite", "gypsum",
            "halite", "topaz", "beryl", "zircon", "spinel", "apatite", "fluorite", "barite",
            "galena", "cinnabar", "talc", "corundum",
        ],
    },
    Theme {
        name: "trees",
        names: [
            "oak", "maple", "birch", "cedar", "alder", "aspen", "rowan", "willow", "linden",
            "spruce", "larch", "hazel", "holly", "yew", "elm", "beech", "poplar", "juniper",
            "sequoia", "cypress",
        ],
    },
    Theme {
        name: "islands",
        names: [
            "skye", "corsica", "malta", "crete", "iona", "gotland", "bornholm", "madeira",
            "tenerife", "azores", "faroe", "orkney", "shetland", "capri", "elba", "rhodes",
            "naxos", "paros", "mull", "islay",
        ],
    },
    Theme {
        name: "storms",
        names: [
            "mistral", "sirocco", "bora", "chinook", "monsoon", "squall", "zephyr", "gale",
            "tempest", "cyclone", "derecho", "haboob", "levante", "foehn", "pampero", "brickfielder",
            "harmattan", "nor-easter", "williwaw", "typhoon",
        ],
    },
    Theme {
        name: "constellations",
        names: [
            "lyra", "orion", "vega", "cygnus", "draco", "perseus", "auriga", "carina", "cassiopeia",
            "cepheus", "corvus", "crux", "gemini", "hydra", "lepus", "pavo", "phoenix", "pictor",
            "volans", "tucana",
        ],
    },
];

/// FNV-1a 32-bit hash, used for stable project → theme assignment.
pub fn fnv1a32(input: &str) -> u32 {
    const OFFSET_BASIS: u32 = 2_166_136_261;
    const PRIME: u32 = 16_777_619;

    let mut hash = OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Theme for a project name, stable across invocations.
pub fn theme_for_project(project: &str) -> &'static Theme {
    let idx = fnv1a32(project) as usize % THEMES.len();
    &THEMES[idx]
}

#[cfg(test)]
#[path = "theme_tests.rs"]
mod tests;
