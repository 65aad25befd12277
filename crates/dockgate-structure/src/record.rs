//! Fixed-width PDB atom records: strict parsing, token-based repair parsing,
//! and canonical serialisation.
//!
//! Canonical column layout (1-indexed, inclusive): record name 1-6, serial
//! 7-11, atom name 13-16, alt-loc 17, residue name 18-20, chain 22, residue
//! seq 23-26, insertion code 27, x 31-38, y 39-46, z 47-54, occupancy 55-60,
//! temperature factor 61-66, element 77-78, charge 79-80. The downstream
//! docking engine requires exactly this layout; in particular the chain
//! identifier must sit in column 22.

use serde::{Deserialize, Serialize};

/// Record type of an atom entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Atom,
    Hetatm,
}

impl RecordKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::Atom => "ATOM",
            RecordKind::Hetatm => "HETATM",
        }
    }
}

/// One atom entry of a structural file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub kind: RecordKind,
    pub serial: u32,
    pub name: String,
    pub alt_loc: Option<char>,
    pub res_name: String,
    pub chain_id: char,
    pub res_seq: i32,
    pub insertion_code: Option<char>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub occupancy: f64,
    pub temp_factor: f64,
    pub element: String,
    pub charge: String,
}

/// True when a line claims to be an atom entry, however mangled the rest is.
pub fn is_atom_line(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

fn char_at(line: &str, idx: usize) -> Option<char> {
    line.as_bytes()
        .get(idx)
        .map(|&b| b as char)
        .filter(|c| *c != ' ')
}

impl AtomRecord {
    /// Parse a line at the canonical fixed column positions.
    ///
    /// Returns `None` when any field is off its column. Columns are byte
    /// positions; a line with multi-byte characters in the record region is
    /// not fixed-width and fails here too.
    pub fn parse_strict(line: &str) -> Option<Self> {
        // Coordinates end at column 54; shorter lines cannot be complete.
        if line.len() < 54 || !line.is_ascii() {
            return None;
        }
        let bytes = line.as_bytes();

        let kind = match line.get(0..6)?.trim_end() {
            "ATOM" => RecordKind::Atom,
            "HETATM" => RecordKind::Hetatm,
            _ => return None,
        };

        let serial = line.get(6..11)?.trim().parse::<u32>().ok()?;
        if bytes[11] != b' ' {
            return None;
        }

        let name = line.get(12..16)?.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let alt_loc = char_at(line, 16);

        let res_name = line.get(17..20)?.trim().to_string();
        if res_name.is_empty() {
            return None;
        }

        // Column 21 is a mandatory gap; column 22 is the chain identifier.
        if bytes[20] != b' ' || bytes[21] == b' ' {
            return None;
        }
        let chain_id = bytes[21] as char;

        let res_seq = line.get(22..26)?.trim().parse::<i32>().ok()?;
        let insertion_code = char_at(line, 26);

        // Columns 28-30 are a gap before the coordinate block.
        if !line.get(27..30)?.trim().is_empty() {
            return None;
        }

        let x = line.get(30..38)?.trim().parse::<f64>().ok()?;
        let y = line.get(38..46)?.trim().parse::<f64>().ok()?;
        let z = line.get(46..54)?.trim().parse::<f64>().ok()?;

        let occupancy = match line.get(54..60) {
            Some(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok()?,
            _ => 1.00,
        };
        let temp_factor = match line.get(60..66) {
            Some(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok()?,
            _ => 0.00,
        };

        let element = line.get(76..78).map(|s| s.trim().to_string()).unwrap_or_default();
        let charge = line.get(78..80).map(|s| s.trim().to_string()).unwrap_or_default();

        Some(Self {
            kind,
            serial,
            name,
            alt_loc,
            res_name,
            chain_id,
            res_seq,
            insertion_code,
            x,
            y,
            z,
            occupancy,
            temp_factor,
            element,
            charge,
        })
    }

    /// Best-effort parse from whitespace-separated tokens, for lines whose
    /// columns have drifted.
    ///
    /// Expected token order: tag, serial, atom name, residue name, chain,
    /// residue seq, x, y, z, then optionally occupancy, temperature factor
    /// and element. A chain token fused to the residue number ("A123") is
    /// split. Reconstruction is heuristic; callers must re-validate whatever
    /// they build from it.
    pub fn parse_tokens(line: &str) -> Option<Self> {
        if !is_atom_line(line) {
            return None;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 9 {
            return None;
        }

        let kind = match tokens[0] {
            "ATOM" => RecordKind::Atom,
            "HETATM" => RecordKind::Hetatm,
            _ => return None,
        };
        let serial = tokens[1].parse::<u32>().ok()?;
        let name = tokens[2].to_string();

        // Two observed drift shapes: "name resname chain seq" (canonical
        // order, columns drifted) and "name chain resname seq" (the chain
        // printed ahead of the residue name, landing near column 18).
        let (res_name, chain_id, res_seq, coord_start) = if let Some((chain, seq, start)) =
            split_chain_and_seq(&tokens)
        {
            (tokens[3].to_string(), chain, seq, start)
        } else if tokens[3].len() == 1
            && tokens[4].len() >= 2
            && tokens[4].chars().all(|c| c.is_ascii_alphabetic())
        {
            let chain = tokens[3].chars().next()?;
            let seq = tokens.get(5)?.parse::<i32>().ok()?;
            (tokens[4].to_string(), chain, seq, 6)
        } else {
            return None;
        };

        let x = tokens.get(coord_start)?.parse::<f64>().ok()?;
        let y = tokens.get(coord_start + 1)?.parse::<f64>().ok()?;
        let z = tokens.get(coord_start + 2)?.parse::<f64>().ok()?;

        let occupancy = tokens
            .get(coord_start + 3)
            .and_then(|t| t.parse::<f64>().ok())
            .unwrap_or(1.00);
        let temp_factor = tokens
            .get(coord_start + 4)
            .and_then(|t| t.parse::<f64>().ok())
            .unwrap_or(0.00);
        let element = tokens
            .get(coord_start + 5)
            .filter(|t| t.chars().all(|c| c.is_ascii_alphabetic()))
            .map(|t| t.to_string())
            .unwrap_or_default();

        Some(Self {
            kind,
            serial,
            name,
            alt_loc: None,
            res_name,
            chain_id,
            res_seq,
            insertion_code: None,
            x,
            y,
            z,
            occupancy,
            temp_factor,
            element,
            charge: String::new(),
        })
    }

    /// Serialise into the canonical 80-column layout, trailing blanks
    /// trimmed. Re-parsing the result with [`AtomRecord::parse_strict`] and
    /// serialising again is byte-stable.
    pub fn to_pdb_line(&self) -> String {
        // Short atom names start in column 14 by convention, so the element
        // part lines up across records.
        let name = if self.name.len() < 4 {
            format!(" {:<3}", self.name)
        } else {
            self.name.clone()
        };

        let line = format!(
            "{:<6}{:>5} {:<4}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}{:>2}",
            self.kind.tag(),
            self.serial,
            name,
            self.alt_loc.unwrap_or(' '),
            self.res_name,
            self.chain_id,
            self.res_seq,
            self.insertion_code.unwrap_or(' '),
            self.x,
            self.y,
            self.z,
            self.occupancy,
            self.temp_factor,
            self.element,
            self.charge,
        );
        line.trim_end().to_string()
    }
}

/// Locate the chain identifier and residue number among the tokens following
/// the residue name, handling the fused "A123" form.
fn split_chain_and_seq(tokens: &[&str]) -> Option<(char, i32, usize)> {
    let t = tokens[4];
    if t.len() == 1 && t.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        let res_seq = tokens.get(5)?.parse::<i32>().ok()?;
        return Some((t.chars().next()?, res_seq, 6));
    }
    // Fused chain + residue number, e.g. "A123".
    let mut chars = t.chars();
    let first = chars.next()?;
    let rest: String = chars.collect();
    if first.is_ascii_alphabetic() {
        if let Ok(res_seq) = rest.parse::<i32>() {
            return Some((first, res_seq, 5));
        }
    }
    // No chain token at all: the residue number follows directly. There is
    // nothing trustworthy to recover a chain from.
    None
}
