//! Graph cell masks
//!
//! Every displayed commit carries one [`GraphColumn`] per shown branch. Each column has
//! two masks: `branch` describes the branch line itself (commit, tip, line, ...) and
//! `connect` the connectors drawn between columns (merges, branch-outs, pass-throughs).

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Glyph: u16 {
        const COMMIT = 1;
        const LINE = 1 << 1;
        const PASS = 1 << 2;
        const TIP = 1 << 3;
        const BOTTOM = 1 << 4;
        const MERGE_LEFT = 1 << 5;
        const MERGE_RIGHT = 1 << 6;
        const BRANCH_LEFT = 1 << 7;
        const BRANCH_RIGHT = 1 << 8;
        const MLINE = 1 << 9;
        const ACTIVE_TIP = 1 << 10;
    }
}

bitflags! {
    /// Reasons why a commit links to history that is not shown
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct More: u8 {
        const MERGE_IN = 1;
        const BRANCH_OUT = 1 << 1;
    }
}

const GLYPH_CHARS: [(Glyph, char); 11] = [
    (Glyph::ACTIVE_TIP, '┣'),
    (Glyph::TIP, '┏'),
    (Glyph::BOTTOM, '┗'),
    (Glyph::COMMIT, '┣'),
    (Glyph::MERGE_LEFT, '╭'),
    (Glyph::MERGE_RIGHT, '╮'),
    (Glyph::BRANCH_LEFT, '╰'),
    (Glyph::BRANCH_RIGHT, '╯'),
    (Glyph::PASS, '╂'),
    (Glyph::LINE, '┃'),
    (Glyph::MLINE, '│'),
];

impl Glyph {
    /// Character for the most significant flag in the mask, space when empty
    pub fn to_char(self) -> char {
        GLYPH_CHARS
            .iter()
            .find(|(glyph, _)| self.contains(*glyph))
            .map(|(_, c)| *c)
            .unwrap_or(' ')
    }

    pub fn is_connector(self) -> bool {
        self.intersects(
            Glyph::MERGE_LEFT | Glyph::MERGE_RIGHT | Glyph::BRANCH_LEFT | Glyph::BRANCH_RIGHT,
        )
    }
}

impl fmt::Debug for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Glyph(EMPTY)");
        }
        let names = self.iter_names().map(|(name, _)| name).collect::<Vec<_>>();
        write!(f, "Glyph({})", names.join(" | "))
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl fmt::Debug for More {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.iter_names().map(|(name, _)| name).collect::<Vec<_>>();
        write!(f, "More({})", names.join(" | "))
    }
}

impl Serialize for Glyph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

impl<'de> Deserialize<'de> for Glyph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Glyph::from_bits_truncate)
    }
}

impl Serialize for More {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for More {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(More::from_bits_truncate)
    }
}

/// The two masks of one column in one row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphColumn {
    pub branch: Glyph,
    pub connect: Glyph,
}

impl GraphColumn {
    pub fn is_empty(&self) -> bool {
        self.branch.is_empty() && self.connect.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Glyph::TIP | Glyph::ACTIVE_TIP, '┣')]
    #[case(Glyph::TIP, '┏')]
    #[case(Glyph::BOTTOM | Glyph::PASS, '┗')]
    #[case(Glyph::LINE, '┃')]
    #[case(Glyph::MLINE, '│')]
    #[case(Glyph::empty(), ' ')]
    fn picks_the_most_significant_char(#[case] glyph: Glyph, #[case] expected: char) {
        assert_eq!(glyph.to_char(), expected);
    }

    #[test]
    fn debug_lists_flag_names() {
        let glyph = Glyph::COMMIT | Glyph::MERGE_RIGHT;
        assert_eq!(format!("{glyph:?}"), "Glyph(COMMIT | MERGE_RIGHT)");
    }

    #[test]
    fn serializes_as_plain_bits() {
        let column = GraphColumn {
            branch: Glyph::TIP | Glyph::ACTIVE_TIP,
            connect: Glyph::empty(),
        };
        assert_eq!(
            serde_json::to_string(&column).unwrap(),
            r#"{"branch":1032,"connect":0}"#
        );
    }
}
