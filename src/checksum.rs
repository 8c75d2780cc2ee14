//! Name checksums and the sorted lookup index
//!
//! The firmware finds a parameter by the CRC-16 of its variable name with a
//! binary search over a table sorted by checksum, and answers `0xFFFF` when
//! nothing matches. Two consequences are checked here rather than on the
//! target: checksums must be unique, and no name may hash to `0xFFFF`.

use std::fmt;

/// Search result meaning "no parameter with this checksum"
pub const NOT_FOUND: u16 = 0xFFFF;

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

/// CRC-16 (poly 0x1021, init 0xFFFF, MSB first, no reflection, no final
/// XOR) over the UTF-8 bytes of `name`
pub fn checksum16(name: &str) -> u16 {
    let mut crc = INITIAL;
    for byte in name.bytes() {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// One row of the firmware search table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub checksum: u16,
    /// Position of the parameter in the metadata array
    pub index: u16,
}

/// Names sharing one checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub checksum: u16,
    /// (position, name) of every colliding parameter
    pub members: Vec<(usize, String)>,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .members
            .iter()
            .map(|(pos, name)| format!("'{}' (#{})", name, pos))
            .collect();
        write!(f, "checksum 0x{:04X} shared by {}", self.checksum, names.join(", "))
    }
}

/// Problems found while building an index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    pub collisions: Vec<Collision>,
    /// (position, name) of names whose checksum equals [`NOT_FOUND`]
    pub reserved: Vec<(usize, String)>,
    /// (position, name) of parameters past the last position a `u16` index
    /// can hold; they are left out of the search table
    pub overflow: Vec<(usize, String)>,
}

impl CollisionReport {
    pub fn is_clean(&self) -> bool {
        self.collisions.is_empty() && self.reserved.is_empty() && self.overflow.is_empty()
    }
}

/// Checksum-sorted search table plus the position → checksum reverse table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumIndex {
    sorted: Vec<ChecksumEntry>,
    by_position: Vec<u16>,
}

impl ChecksumIndex {
    /// Checksum every name, keeping its position, and sort by checksum
    pub fn build<S: AsRef<str>>(names: &[S]) -> (Self, CollisionReport) {
        let by_position: Vec<u16> = names.iter().map(|n| checksum16(n.as_ref())).collect();

        let mut report = CollisionReport::default();
        let mut sorted = Vec::with_capacity(by_position.len());
        for (pos, &checksum) in by_position.iter().enumerate() {
            // 0xFFFF is the "not found" answer, so it cannot be a position either
            match u16::try_from(pos).ok().filter(|&index| index != NOT_FOUND) {
                Some(index) => sorted.push(ChecksumEntry { checksum, index }),
                None => report.overflow.push((pos, names[pos].as_ref().to_string())),
            }
        }
        // stable: colliding names stay in table order
        sorted.sort_by_key(|e| e.checksum);

        for group in sorted.chunk_by(|a, b| a.checksum == b.checksum) {
            let members: Vec<(usize, String)> = group
                .iter()
                .map(|e| {
                    let pos = usize::from(e.index);
                    (pos, names[pos].as_ref().to_string())
                })
                .collect();
            if group[0].checksum == NOT_FOUND {
                report.reserved.extend(members.iter().cloned());
            }
            if members.len() > 1 {
                report.collisions.push(Collision {
                    checksum: group[0].checksum,
                    members,
                });
            }
        }

        (Self { sorted, by_position }, report)
    }

    /// Binary search by checksum; position or [`NOT_FOUND`]
    pub fn find(&self, checksum: u16) -> u16 {
        self.sorted
            .binary_search_by_key(&checksum, |e| e.checksum)
            .map(|i| self.sorted[i].index)
            .unwrap_or(NOT_FOUND)
    }

    /// Position of a parameter by name
    pub fn find_name(&self, name: &str) -> u16 {
        self.find(checksum16(name))
    }

    /// Checksum of the parameter at `position`; 0 when out of range
    pub fn checksum_at(&self, position: usize) -> u16 {
        self.by_position.get(position).copied().unwrap_or(0)
    }

    /// Entries in ascending checksum order
    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.sorted
    }

    /// Checksums in parameter order
    pub fn checksums(&self) -> &[u16] {
        &self.by_position
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_keeps_initial_value() {
        assert_eq!(checksum16(""), 0xFFFF);
    }

    #[test]
    fn test_known_vector() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(checksum16("123456789"), 0x29B1);
        assert_eq!(checksum16("MotorSpeed"), checksum16("MotorSpeed"));
    }

    #[test]
    fn test_binary_search_finds_every_name() {
        let names: Vec<String> = (0..50).map(|i| format!("param_{}", i)).collect();
        let (index, report) = ChecksumIndex::build(&names);
        assert!(report.collisions.is_empty());

        for (pos, name) in names.iter().enumerate() {
            assert_eq!(usize::from(index.find_name(name)), pos, "{}", name);
            assert_eq!(index.checksum_at(pos), checksum16(name));
        }
        assert_eq!(index.find_name("not_a_parameter"), NOT_FOUND);
        assert_eq!(index.checksum_at(names.len()), 0);

        let sorted = index.entries();
        assert!(sorted.windows(2).all(|w| w[0].checksum <= w[1].checksum));
    }

    #[test]
    fn test_collision_reports_all_members() {
        let names = ["Alpha", "Beta", "Alpha"];
        let (_, report) = ChecksumIndex::build(&names);
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(
            report.collisions[0].members,
            vec![(0, "Alpha".to_string()), (2, "Alpha".to_string())]
        );
    }

    #[test]
    fn test_reserved_checksum_flagged() {
        let (_, report) = ChecksumIndex::build(&["", "Speed"]);
        assert_eq!(report.reserved, vec![(0, String::new())]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_positions_past_u16_are_reported() {
        let names: Vec<String> = (0..=usize::from(NOT_FOUND)).map(|i| format!("p{}", i)).collect();
        let (index, report) = ChecksumIndex::build(&names);

        assert_eq!(report.overflow, vec![(65535, "p65535".to_string())]);
        assert!(!report.is_clean());
        assert_eq!(index.len(), 65535);
        assert!(index.entries().iter().all(|e| e.index != NOT_FOUND));
        assert_eq!(index.checksums().len(), names.len());
    }

    #[test]
    fn test_empty_index() {
        let names: [&str; 0] = [];
        let (index, report) = ChecksumIndex::build(&names);
        assert!(index.is_empty());
        assert!(report.is_clean());
        assert_eq!(index.find(0x1234), NOT_FOUND);
    }
}
