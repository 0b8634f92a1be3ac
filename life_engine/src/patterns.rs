// patterns.rs - Canonical patterns as relative (x, y) offsets from an anchor

use crate::grid::Grid;

#[derive(Debug)]
pub struct Pattern {
    pub name: &'static str,
    pub cells: &'static [(i64, i64)],
}

impl Pattern {
    /// Sets every pattern cell alive relative to (x, y); cells off the grid are clipped.
    pub fn stamp(&self, grid: &mut Grid, x: i64, y: i64) {
        for &(dx, dy) in self.cells {
            grid.set(x.saturating_add(dx), y.saturating_add(dy), true);
        }
    }

    /// Width and height of the pattern's bounding box.
    pub fn extent(&self) -> (i64, i64) {
        let max_x = self.cells.iter().map(|&(x, _)| x).max().unwrap_or(-1);
        let max_y = self.cells.iter().map(|&(_, y)| y).max().unwrap_or(-1);
        (max_x + 1, max_y + 1)
    }
}

pub const GLIDER: Pattern = Pattern {
    name: "Glider",
    cells: &[(1, 2), (3, 1), (3, 2), (3, 3), (2, 3)],
};

pub const GOSPER_GLIDER_GUN: Pattern = Pattern {
    name: "Gosper Glider Gun",
    cells: &[
        // left base
        (2, 6), (3, 6), (2, 7), (3, 7),
        // left structure
        (14, 4), (15, 4), (13, 5), (12, 6), (12, 7), (12, 8), (13, 9), (14, 10), (15, 10),
        (17, 5), (18, 6), (18, 7), (18, 8), (19, 7), (17, 9), (16, 7),
        // right structure
        (26, 2), (26, 3), (26, 7), (26, 8),
        (24, 3), (23, 4), (23, 5), (23, 6), (22, 4), (22, 5), (22, 6), (24, 7),
        // right base
        (36, 4), (37, 4), (37, 5), (36, 5),
    ],
};

pub const BLOCK: Pattern = Pattern {
    name: "Block",
    cells: &[(0, 0), (1, 0), (0, 1), (1, 1)],
};

pub const BLINKER: Pattern = Pattern {
    name: "Blinker",
    cells: &[(0, 0), (1, 0), (2, 0)],
};

pub const TOAD: Pattern = Pattern {
    name: "Toad",
    cells: &[(1, 0), (2, 0), (3, 0), (0, 1), (1, 1), (2, 1)],
};

pub const BEACON: Pattern = Pattern {
    name: "Beacon",
    cells: &[(0, 0), (1, 0), (0, 1), (1, 1), (2, 2), (3, 2), (2, 3), (3, 3)],
};

pub const PULSAR: Pattern = Pattern {
    name: "Pulsar",
    cells: &[
        // top section
        (2, 0), (3, 0), (4, 0), (8, 0), (9, 0), (10, 0),
        (0, 2), (5, 2), (7, 2), (12, 2),
        (0, 3), (5, 3), (7, 3), (12, 3),
        (0, 4), (5, 4), (7, 4), (12, 4),
        (2, 5), (3, 5), (4, 5), (8, 5), (9, 5), (10, 5),
        // bottom section (mirrored)
        (2, 7), (3, 7), (4, 7), (8, 7), (9, 7), (10, 7),
        (0, 8), (5, 8), (7, 8), (12, 8),
        (0, 9), (5, 9), (7, 9), (12, 9),
        (0, 10), (5, 10), (7, 10), (12, 10),
        (2, 12), (3, 12), (4, 12), (8, 12), (9, 12), (10, 12),
    ],
};

pub const R_PENTOMINO: Pattern = Pattern {
    name: "R-pentomino",
    cells: &[(1, 1), (2, 1), (2, 0), (1, 2), (0, 2)],
};

pub const PATTERNS: &[Pattern] = &[
    GLIDER,
    GOSPER_GLIDER_GUN,
    BLOCK,
    BLINKER,
    TOAD,
    BEACON,
    PULSAR,
    R_PENTOMINO,
];

/// Looks a pattern up by name, ignoring case, spaces and dashes. "gun" is short for the Gosper gun.
pub fn find(name: &str) -> Option<&'static Pattern> {
    let wanted = normalize(name);
    PATTERNS.iter().find(|pattern| {
        let candidate = normalize(pattern.name);
        candidate == wanted || (wanted == "gun" && candidate == "gosperglidergun")
    })
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
