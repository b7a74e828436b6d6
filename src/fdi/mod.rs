//! FDI (ISO 3950) tooth notation
//!
//! A tooth is identified by two digits: the quadrant (1-4 permanent, 5-8
//! deciduous, clockwise from the patient's upper right) and the position
//! counted from the midline (1-8 permanent, 1-5 deciduous).
//!
//! This module validates tooth numbers, classifies them, and answers the
//! arch-order questions needed for bridges: adjacency across the midline and
//! contiguous spans between two teeth.

pub mod chart;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use chart::{render_svg, ChartLayout, ChartMark, DentitionMode, ToothGeometry};

/// Errors raised by tooth-number validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FdiError {
    #[error("invalid FDI tooth number '{0}': expected two digits like 11 or 46")]
    Malformed(String),

    #[error("invalid quadrant {0}: FDI quadrants are 1-4 (permanent) and 5-8 (deciduous)")]
    InvalidQuadrant(u8),

    #[error("invalid position {position} for quadrant {quadrant} (allowed 1-{max})")]
    InvalidPosition { quadrant: u8, position: u8, max: u8 },

    #[error("teeth {0} and {1} are in different arches")]
    DifferentArch(ToothNumber, ToothNumber),

    #[error("teeth {0} and {1} belong to different dentitions")]
    DifferentDentition(ToothNumber, ToothNumber),

    #[error("invalid tooth range '{0}'")]
    InvalidRange(String),
}

/// Permanent or primary (deciduous) teeth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dentition {
    Permanent,
    Deciduous,
}

/// Upper (maxillary) or lower (mandibular) arch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Upper,
    Lower,
}

/// The patient's side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Right,
    Left,
}

/// Morphological tooth class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToothKind {
    Incisor,
    Canine,
    Premolar,
    Molar,
}

impl fmt::Display for Dentition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dentition::Permanent => write!(f, "permanent"),
            Dentition::Deciduous => write!(f, "deciduous"),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Upper => write!(f, "upper"),
            Arch::Lower => write!(f, "lower"),
        }
    }
}

impl fmt::Display for ToothKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToothKind::Incisor => write!(f, "incisor"),
            ToothKind::Canine => write!(f, "canine"),
            ToothKind::Premolar => write!(f, "premolar"),
            ToothKind::Molar => write!(f, "molar"),
        }
    }
}

/// A validated FDI tooth number
///
/// Serialized as the plain two-digit integer (e.g. `46`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ToothNumber {
    quadrant: u8,
    position: u8,
}

impl ToothNumber {
    pub fn new(quadrant: u8, position: u8) -> Result<Self, FdiError> {
        let max = match quadrant {
            1..=4 => 8,
            5..=8 => 5,
            _ => return Err(FdiError::InvalidQuadrant(quadrant)),
        };
        if position == 0 || position > max {
            return Err(FdiError::InvalidPosition {
                quadrant,
                position,
                max,
            });
        }
        Ok(Self { quadrant, position })
    }

    pub fn quadrant(&self) -> u8 {
        self.quadrant
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    /// The two-digit code, e.g. 46
    pub fn code(&self) -> u8 {
        self.quadrant * 10 + self.position
    }

    pub fn dentition(&self) -> Dentition {
        if self.quadrant <= 4 {
            Dentition::Permanent
        } else {
            Dentition::Deciduous
        }
    }

    pub fn arch(&self) -> Arch {
        match self.quadrant {
            1 | 2 | 5 | 6 => Arch::Upper,
            _ => Arch::Lower,
        }
    }

    pub fn side(&self) -> Side {
        match self.quadrant {
            1 | 4 | 5 | 8 => Side::Right,
            _ => Side::Left,
        }
    }

    pub fn kind(&self) -> ToothKind {
        match (self.dentition(), self.position) {
            (_, 1 | 2) => ToothKind::Incisor,
            (_, 3) => ToothKind::Canine,
            (Dentition::Permanent, 4 | 5) => ToothKind::Premolar,
            _ => ToothKind::Molar,
        }
    }

    /// Third molars (18, 28, 38, 48)
    pub fn is_wisdom(&self) -> bool {
        self.dentition() == Dentition::Permanent && self.position == 8
    }

    /// Universal (ADA) numbering: 1-32 for permanent teeth, A-T for deciduous
    pub fn to_universal(&self) -> String {
        let p = self.position;
        match self.quadrant {
            1 => (9 - p).to_string(),
            2 => (8 + p).to_string(),
            3 => (25 - p).to_string(),
            4 => (24 + p).to_string(),
            5 => char::from(b'A' + (5 - p)).to_string(),
            6 => char::from(b'E' + p).to_string(),
            7 => char::from(b'P' - p).to_string(),
            _ => char::from(b'O' + p).to_string(),
        }
    }

    /// Index of this tooth in its arch's chart order (viewer's left to right)
    pub fn arch_index(&self) -> usize {
        let per_side = self.max_position() as usize;
        let p = self.position as usize;
        match self.quadrant {
            // drawn on the viewer's left, distal first
            1 | 4 | 5 | 8 => per_side - p,
            _ => per_side + p - 1,
        }
    }

    fn max_position(&self) -> u8 {
        match self.dentition() {
            Dentition::Permanent => 8,
            Dentition::Deciduous => 5,
        }
    }

    /// Every valid tooth of a dentition, in quadrant order
    pub fn all(dentition: Dentition) -> Vec<ToothNumber> {
        let (quadrants, max) = match dentition {
            Dentition::Permanent => (1..=4, 8),
            Dentition::Deciduous => (5..=8, 5),
        };
        quadrants
            .flat_map(|q| (1..=max).map(move |p| ToothNumber { quadrant: q, position: p }))
            .collect()
    }
}

impl fmt::Display for ToothNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quadrant, self.position)
    }
}

impl FromStr for ToothNumber {
    type Err = FdiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits: Vec<u8> = trimmed
            .chars()
            .filter(|c| *c != '.')
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| FdiError::Malformed(s.to_string()))?;

        match digits.as_slice() {
            [q, p] => ToothNumber::new(*q, *p),
            _ => Err(FdiError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<u8> for ToothNumber {
    type Error = FdiError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if !(10..=99).contains(&code) {
            return Err(FdiError::Malformed(code.to_string()));
        }
        ToothNumber::new(code / 10, code % 10)
    }
}

impl From<ToothNumber> for u8 {
    fn from(tooth: ToothNumber) -> u8 {
        tooth.code()
    }
}

impl PartialOrd for ToothNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Chart order: permanent before deciduous, upper before lower, then left to right
impl Ord for ToothNumber {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let key = |t: &ToothNumber| {
            (
                t.dentition() == Dentition::Deciduous,
                t.arch() == Arch::Lower,
                t.arch_index(),
            )
        };
        key(self).cmp(&key(other))
    }
}

/// Teeth of one arch and dentition in chart order (viewer's left to right)
///
/// Upper permanent: 18..11 21..28. Lower permanent: 48..41 31..38.
pub fn arch_sequence(arch: Arch, dentition: Dentition) -> Vec<ToothNumber> {
    let (left_q, right_q, max) = match (arch, dentition) {
        (Arch::Upper, Dentition::Permanent) => (1, 2, 8),
        (Arch::Lower, Dentition::Permanent) => (4, 3, 8),
        (Arch::Upper, Dentition::Deciduous) => (5, 6, 5),
        (Arch::Lower, Dentition::Deciduous) => (8, 7, 5),
    };
    (1..=max)
        .rev()
        .map(|p| ToothNumber { quadrant: left_q, position: p })
        .chain((1..=max).map(|p| ToothNumber { quadrant: right_q, position: p }))
        .collect()
}

/// True when two teeth are direct neighbours in the same arch (11 and 21 are neighbours)
pub fn are_adjacent(a: ToothNumber, b: ToothNumber) -> bool {
    a.arch() == b.arch()
        && a.dentition() == b.dentition()
        && a.arch_index().abs_diff(b.arch_index()) == 1
}

/// Contiguous run of teeth between `a` and `b` inclusive, in chart order
///
/// The order of the arguments does not matter.
pub fn span(a: ToothNumber, b: ToothNumber) -> Result<Vec<ToothNumber>, FdiError> {
    if a.dentition() != b.dentition() {
        return Err(FdiError::DifferentDentition(a, b));
    }
    if a.arch() != b.arch() {
        return Err(FdiError::DifferentArch(a, b));
    }
    let (lo, hi) = if a.arch_index() <= b.arch_index() {
        (a.arch_index(), b.arch_index())
    } else {
        (b.arch_index(), a.arch_index())
    };
    Ok(arch_sequence(a.arch(), a.dentition())[lo..=hi].to_vec())
}

/// Parse a selection like `"11,13-23, 46"` into distinct teeth in chart order
///
/// Ranges expand through [`span`], so `13-23` crosses the midline.
pub fn parse_selection(input: &str) -> Result<Vec<ToothNumber>, FdiError> {
    let mut teeth = Vec::new();
    for part in input.split([',', ' ']).map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((from, to)) = part.split_once('-') {
            if from.is_empty() || to.is_empty() {
                return Err(FdiError::InvalidRange(part.to_string()));
            }
            teeth.extend(span(from.parse()?, to.parse()?)?);
        } else {
            teeth.push(part.parse()?);
        }
    }
    teeth.sort();
    teeth.dedup();
    Ok(teeth)
}

/// True when the teeth form one unbroken run in a single arch
pub fn is_contiguous(teeth: &[ToothNumber]) -> bool {
    let mut sorted = teeth.to_vec();
    sorted.sort();
    sorted.dedup();
    !sorted.is_empty() && sorted.windows(2).all(|w| are_adjacent(w[0], w[1]))
}
