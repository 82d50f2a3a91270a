use std::collections::{HashMap, HashSet};

use crate::periodic_table::ElementType;

use super::{
    graph::{BondOrder, GraphAtom},
    SmilesError,
};

/// Largest hydrogen count a bracket atom may carry
pub(super) const MAX_BRACKET_HYDROGENS: u32 = 9;
/// Largest magnitude of a bracket atom charge
pub(super) const MAX_BRACKET_CHARGE: u32 = 15;

/// Atom annotations and connections of a SMILES string, in order of appearance.
/// `bonds` only records which atoms are connected, their orders are read later.
#[derive(Debug, Default)]
pub(super) struct Scan {
    pub(super) atoms: Vec<GraphAtom>,
    /// whether each atom was written in the organic subset (without brackets)
    pub(super) organic: Vec<bool>,
    pub(super) bonds: Vec<(usize, usize)>,
}

/// A bond symbol waiting for the atom or ring closure it connects to
#[derive(Copy, Clone, Debug)]
struct PendingBond {
    order: BondOrder,
    offset: usize,
}

struct OpenRing {
    atom: usize,
    bond: Option<BondOrder>,
    offset: usize,
}

/// Single pass over a SMILES string that validates its syntax and reads every
/// atom, including the bracket hydrogen counts and charges.
pub(super) struct Scanner<'a> {
    input: &'a str,
    position: usize,
    scan: Scan,
    connected: HashSet<(usize, usize)>,
    previous: Option<usize>,
    branches: Vec<(Option<usize>, usize)>,
    pending: Option<PendingBond>,
    rings: HashMap<u32, OpenRing>,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            scan: Scan::default(),
            connected: HashSet::new(),
            previous: None,
            branches: Vec::new(),
            pending: None,
            rings: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_at(&self, skip: usize) -> Option<char> {
        self.input[self.position..].chars().nth(skip)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn unexpected(&self, character: char) -> SmilesError {
        SmilesError::UnexpectedCharacter {
            character,
            offset: self.position,
        }
    }

    pub(super) fn run(mut self) -> Result<Scan, SmilesError> {
        while let Some(c) = self.peek() {
            let offset = self.position;
            match c {
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.add_atom(atom, false);
                }
                'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' | 'b' | 'c' | 'n' | 'o' | 'p'
                | 's' => {
                    let atom = self.organic_atom()?;
                    self.add_atom(atom, true);
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.pending.is_some() || self.previous.is_none() {
                        return Err(self.unexpected(c));
                    }
                    self.bump();
                    let order = match c {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        '$' => BondOrder::Quadruple,
                        ':' => BondOrder::Aromatic,
                        // directional bonds only carry stereo information
                        _ => BondOrder::Single,
                    };
                    self.pending = Some(PendingBond { order, offset });
                }
                '(' => {
                    if self.previous.is_none() || self.pending.is_some() {
                        return Err(self.unexpected(c));
                    }
                    self.bump();
                    self.branches.push((self.previous, offset));
                }
                ')' => {
                    if let Some(pending) = self.pending {
                        return Err(SmilesError::DanglingBond {
                            offset: pending.offset,
                        });
                    }
                    let (previous, _) = self
                        .branches
                        .pop()
                        .ok_or(SmilesError::UnbalancedBranch { offset })?;
                    // an empty branch "()" leaves the previous atom unchanged as well
                    self.bump();
                    self.previous = previous;
                }
                '.' => {
                    if let Some(pending) = self.pending {
                        return Err(SmilesError::DanglingBond {
                            offset: pending.offset,
                        });
                    }
                    if self.previous.is_none() {
                        return Err(self.unexpected(c));
                    }
                    self.bump();
                    self.previous = None;
                }
                '0'..='9' | '%' => {
                    let ring = self.ring_number()?;
                    self.ring_closure(ring, offset)?;
                }
                _ => return Err(self.unexpected(c)),
            }
        }
        self.finish()
    }

    fn finish(self) -> Result<Scan, SmilesError> {
        if let Some(pending) = self.pending {
            return Err(SmilesError::DanglingBond {
                offset: pending.offset,
            });
        }
        if let Some(&(_, offset)) = self.branches.last() {
            return Err(SmilesError::UnbalancedBranch { offset });
        }
        if let Some((&ring, open)) = self.rings.iter().min_by_key(|(_, open)| open.offset) {
            return Err(SmilesError::UnclosedRing {
                ring,
                offset: open.offset,
            });
        }
        Ok(self.scan)
    }

    fn connect(&mut self, a: usize, b: usize) -> bool {
        let pair = (a.min(b), a.max(b));
        if a == b || !self.connected.insert(pair) {
            return false;
        }
        self.scan.bonds.push(pair);
        true
    }

    fn add_atom(&mut self, atom: GraphAtom, organic: bool) {
        let index = self.scan.atoms.len();
        self.scan.atoms.push(atom);
        self.scan.organic.push(organic);

        self.pending = None;
        if let Some(previous) = self.previous {
            self.connect(previous, index);
        }
        self.previous = Some(index);
    }

    fn organic_atom(&mut self) -> Result<GraphAtom, SmilesError> {
        let offset = self.position;
        let (element, aromatic, length) = match (self.peek(), self.peek_at(1)) {
            (Some('C'), Some('l')) => (ElementType::Cl, false, 2),
            (Some('B'), Some('r')) => (ElementType::Br, false, 2),
            (Some('B'), _) => (ElementType::B, false, 1),
            (Some('C'), _) => (ElementType::C, false, 1),
            (Some('N'), _) => (ElementType::N, false, 1),
            (Some('O'), _) => (ElementType::O, false, 1),
            (Some('P'), _) => (ElementType::P, false, 1),
            (Some('S'), _) => (ElementType::S, false, 1),
            (Some('F'), _) => (ElementType::F, false, 1),
            (Some('I'), _) => (ElementType::I, false, 1),
            (Some('b'), _) => (ElementType::B, true, 1),
            (Some('c'), _) => (ElementType::C, true, 1),
            (Some('n'), _) => (ElementType::N, true, 1),
            (Some('o'), _) => (ElementType::O, true, 1),
            (Some('p'), _) => (ElementType::P, true, 1),
            (Some('s'), _) => (ElementType::S, true, 1),
            (Some(c), _) => return Err(self.unexpected(c)),
            (None, _) => return Err(SmilesError::DanglingBond { offset }),
        };
        self.position += length;

        Ok(GraphAtom {
            element,
            aromatic,
            charge: 0,
            isotope: None,
            hydrogens: 0,
            offset,
        })
    }

    /// `[` isotope? symbol chirality? hcount? charge? class? `]`
    fn bracket_atom(&mut self) -> Result<GraphAtom, SmilesError> {
        let offset = self.position;
        self.bump();

        let isotope = self.number();

        let (element, aromatic) = self.bracket_symbol(offset)?;

        // chirality is read and discarded: @, @@, @TH1, @SP2, @OH12, ...
        while self.peek() == Some('@') {
            self.bump();
        }
        if matches!(self.peek(), Some('T' | 'A' | 'S' | 'O'))
            && matches!(self.peek_at(1), Some('H' | 'L' | 'P' | 'B'))
            && self.input[offset..self.position].contains('@')
        {
            self.position += 2;
            self.number();
        }

        let mut hydrogens = 0;
        if self.peek() == Some('H') {
            self.bump();
            hydrogens = self.number().unwrap_or(1);
            if hydrogens > MAX_BRACKET_HYDROGENS {
                return Err(SmilesError::HydrogenCountOutOfRange { offset });
            }
        }

        let mut charge = 0i32;
        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.bump();
            let magnitude = match self.number() {
                Some(magnitude) => magnitude,
                None => {
                    // "++" and "--" are accepted as +2 and -2
                    let mut count = 1;
                    while self.peek() == Some(sign) {
                        self.bump();
                        count += 1;
                    }
                    count
                }
            };
            if magnitude > MAX_BRACKET_CHARGE {
                return Err(SmilesError::ChargeOutOfRange { offset });
            }
            charge = if sign == '+' {
                magnitude as i32
            } else {
                -(magnitude as i32)
            };
        }

        if self.peek() == Some(':') {
            self.bump();
            if self.number().is_none() {
                return Err(match self.peek() {
                    Some(c) => self.unexpected(c),
                    None => SmilesError::UnclosedBracket { offset },
                });
            }
        }

        match self.bump() {
            Some(']') => {}
            Some(c) => {
                self.position -= c.len_utf8();
                return Err(self.unexpected(c));
            }
            None => return Err(SmilesError::UnclosedBracket { offset }),
        }

        Ok(GraphAtom {
            element,
            aromatic,
            charge,
            isotope,
            hydrogens,
            offset,
        })
    }

    fn bracket_symbol(&mut self, bracket: usize) -> Result<(ElementType, bool), SmilesError> {
        let start = self.position;
        let first = match self.peek() {
            Some(c) => c,
            None => return Err(SmilesError::UnclosedBracket { offset: bracket }),
        };

        if first.is_ascii_lowercase() {
            // aromatic symbols, two letter ones first
            for (symbol, element) in [("se", ElementType::Se), ("as", ElementType::As)] {
                if self.input[start..].starts_with(symbol) {
                    self.position += 2;
                    return Ok((element, true));
                }
            }
            let element = match first {
                'b' => ElementType::B,
                'c' => ElementType::C,
                'n' => ElementType::N,
                'o' => ElementType::O,
                'p' => ElementType::P,
                's' => ElementType::S,
                _ => {
                    return Err(SmilesError::UnknownElement {
                        symbol: first.to_string(),
                        offset: start,
                    })
                }
            };
            self.position += 1;
            return Ok((element, true));
        }

        if !first.is_ascii_uppercase() {
            return Err(self.unexpected(first));
        }

        if let Some(second) = self.peek_at(1).filter(char::is_ascii_lowercase) {
            let symbol = format!("{first}{second}");
            if let Ok(element) = symbol.parse::<ElementType>() {
                self.position += 2;
                return Ok((element, false));
            }
        }

        let symbol = first.to_string();
        match symbol.parse::<ElementType>() {
            Ok(element) => {
                self.position += 1;
                Ok((element, false))
            }
            Err(_) => {
                let end = self.input[start..]
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .map_or(self.input.len(), |length| start + length);
                Err(SmilesError::UnknownElement {
                    symbol: self.input[start..end].to_owned(),
                    offset: start,
                })
            }
        }
    }

    /// Reads a run of digits. Values that do not fit in a `u32` saturate, so that
    /// the range checks of the caller reject them.
    fn number(&mut self) -> Option<u32> {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
        }
        let digits = &self.input[start..self.position];
        (!digits.is_empty()).then(|| digits.parse().unwrap_or(u32::MAX))
    }

    fn ring_number(&mut self) -> Result<u32, SmilesError> {
        let offset = self.position;
        match self.bump() {
            Some('%') => {
                let digits = &self.input[self.position..];
                match (digits.chars().next(), digits.chars().nth(1)) {
                    (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
                        self.position += 2;
                        Ok(a.to_digit(10).unwrap_or(0) * 10 + b.to_digit(10).unwrap_or(0))
                    }
                    _ => Err(SmilesError::UnexpectedCharacter {
                        character: '%',
                        offset,
                    }),
                }
            }
            Some(c) => c
                .to_digit(10)
                .ok_or(SmilesError::UnexpectedCharacter { character: c, offset }),
            None => Err(SmilesError::DanglingBond { offset }),
        }
    }

    fn ring_closure(&mut self, ring: u32, offset: usize) -> Result<(), SmilesError> {
        let atom = self
            .previous
            .ok_or(SmilesError::InvalidRingClosure { ring, offset })?;
        let bond = self.pending.take().map(|pending| pending.order);

        let Some(open) = self.rings.remove(&ring) else {
            self.rings.insert(ring, OpenRing { atom, bond, offset });
            return Ok(());
        };

        if matches!((open.bond, bond), (Some(a), Some(b)) if a != b) {
            return Err(SmilesError::InvalidRingClosure { ring, offset });
        }
        // a ring bond to the atom itself or between atoms that are already bonded
        if !self.connect(open.atom, atom) {
            return Err(SmilesError::InvalidRingClosure { ring, offset });
        }
        Ok(())
    }
}
