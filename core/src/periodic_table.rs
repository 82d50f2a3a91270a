use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or unsupported element: '{0}'")]
pub struct ParseElementError(String);

/// Chemical elements known to the workspace. The discriminant is the atomic number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum ElementType {
    H = 1,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Sc,
    Ti,
    V,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    I = 53,
}

const ALL: [ElementType; 37] = {
    use ElementType::*;
    [
        H, He, Li, Be, B, C, N, O, F, Ne, Na, Mg, Al, Si, P, S, Cl, Ar, K, Ca, Sc, Ti, V, Cr, Mn,
        Fe, Co, Ni, Cu, Zn, Ga, Ge, As, Se, Br, Kr, I,
    ]
};

impl ElementType {
    pub fn atomic_number(self) -> u32 {
        self as u32
    }

    pub fn from_atomic_number(number: u32) -> Option<Self> {
        ALL.iter().copied().find(|element| element.atomic_number() == number)
    }

    pub fn symbol(self) -> &'static str {
        use ElementType::*;
        match self {
            H => "H",
            He => "He",
            Li => "Li",
            Be => "Be",
            B => "B",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Ne => "Ne",
            Na => "Na",
            Mg => "Mg",
            Al => "Al",
            Si => "Si",
            P => "P",
            S => "S",
            Cl => "Cl",
            Ar => "Ar",
            K => "K",
            Ca => "Ca",
            Sc => "Sc",
            Ti => "Ti",
            V => "V",
            Cr => "Cr",
            Mn => "Mn",
            Fe => "Fe",
            Co => "Co",
            Ni => "Ni",
            Cu => "Cu",
            Zn => "Zn",
            Ga => "Ga",
            Ge => "Ge",
            As => "As",
            Se => "Se",
            Br => "Br",
            Kr => "Kr",
            I => "I",
        }
    }

    /// Single-bond covalent radius in Ångström (Cordero et al., 2008).
    pub fn covalent_radius(self) -> f64 {
        use ElementType::*;
        match self {
            H => 0.31,
            He => 0.28,
            Li => 1.28,
            Be => 0.96,
            B => 0.84,
            C => 0.76,
            N => 0.71,
            O => 0.66,
            F => 0.57,
            Ne => 0.58,
            Na => 1.66,
            Mg => 1.41,
            Al => 1.21,
            Si => 1.11,
            P => 1.07,
            S => 1.05,
            Cl => 1.02,
            Ar => 1.06,
            K => 2.03,
            Ca => 1.76,
            Sc => 1.70,
            Ti => 1.60,
            V => 1.53,
            Cr => 1.39,
            Mn => 1.39,
            Fe => 1.32,
            Co => 1.26,
            Ni => 1.24,
            Cu => 1.32,
            Zn => 1.22,
            Ga => 1.22,
            Ge => 1.20,
            As => 1.19,
            Se => 1.20,
            Br => 1.20,
            Kr => 1.16,
            I => 1.39,
        }
    }

    /// Allowed valences used to derive implicit hydrogen counts, lowest first.
    /// Empty for elements outside the SMILES organic subset.
    pub fn default_valences(self) -> &'static [u32] {
        use ElementType::*;
        match self {
            B => &[3],
            C => &[4],
            N | P => &[3, 5],
            O => &[2],
            S => &[2, 4, 6],
            F | Cl | Br | I => &[1],
            _ => &[],
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ElementType {
    type Err = ParseElementError;

    /// Accepts either an element symbol (case sensitive) or an atomic number.
    /// Basis Set Exchange files key their elements by atomic number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(number) = s.parse::<u32>() {
            return Self::from_atomic_number(number).ok_or_else(|| ParseElementError(s.into()));
        }

        ALL.iter()
            .copied()
            .find(|element| element.symbol() == s)
            .ok_or_else(|| ParseElementError(s.into()))
    }
}

impl TryFrom<String> for ElementType {
    type Error = ParseElementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ElementType> for String {
    fn from(value: ElementType) -> Self {
        value.symbol().to_owned()
    }
}
