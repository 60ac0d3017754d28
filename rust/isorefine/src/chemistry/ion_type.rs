use crate::chemistry::formula::{
    MolecularFormula,
    parse_charge_suffix,
};
use crate::errors::FormulaError;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// Common abbreviations accepted inside ion type notation.
const ALIASES: &[(&str, &str)] = &[
    ("FA", "CH2O2"),
    ("ACN", "C2H3N"),
    ("MeOH", "CH4O"),
    ("HAc", "C2H4O2"),
    ("DMSO", "C2H6OS"),
    ("TFA", "C2HF3O2"),
    ("IsoProp", "C3H8O"),
];

/// Ion type (adduct) in bracket notation, for instance `[M+H]+`,
/// `[M-H2O+H]+`, `[2M+Na]+` or `[M+FA-H]-`.
///
/// ```
/// use isorefine::chemistry::{IonType, MolecularFormula};
///
/// let ion_type: IonType = "[M+Na]+".parse().unwrap();
/// let neutral: MolecularFormula = "C6H12O6".parse().unwrap();
/// let ionized = ion_type.ionize(&neutral).unwrap();
/// assert_eq!(ionized.to_string(), "[C6H12NaO6]+");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IonType {
    name: String,
    molecules: u32,
    /// Atoms added (positive) or removed (negative) per ion, uncharged.
    delta: MolecularFormula,
    charge: i32,
}

impl IonType {
    pub fn parse(input: &str) -> Result<Self, FormulaError> {
        let syntax = |position: usize, reason: &'static str| FormulaError::Syntax {
            input: input.to_string(),
            position,
            reason,
        };
        let s = input.trim();
        let rest = s
            .strip_prefix('[')
            .ok_or_else(|| syntax(0, "ion types start with `[`"))?;
        let close = rest
            .rfind(']')
            .ok_or_else(|| syntax(s.len(), "missing closing bracket"))?;
        let inner = &rest[..close];
        let charge = parse_charge_suffix(&rest[close + 1..])
            .ok_or_else(|| syntax(close + 2, "invalid charge after the closing bracket"))?;

        let digits: String = inner.chars().take_while(|c| c.is_ascii_digit()).collect();
        let molecules = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| syntax(1, "invalid molecule count"))?
        };
        let after_count = &inner[digits.len()..];
        let terms = after_count
            .strip_prefix('M')
            .ok_or_else(|| syntax(digits.len() + 1, "expected `M`"))?;
        if molecules == 0 {
            return Err(syntax(1, "molecule count must be positive"));
        }

        let mut delta = MolecularFormula::default();
        let mut offset = digits.len() + 2;
        let mut remaining = terms;
        while !remaining.is_empty() {
            let sign = match remaining.as_bytes()[0] {
                b'+' => 1,
                b'-' => -1,
                _ => return Err(syntax(offset, "expected `+` or `-`")),
            };
            let body_end = remaining[1..]
                .find(['+', '-'])
                .map(|x| x + 1)
                .unwrap_or(remaining.len());
            let term = &remaining[1..body_end];
            let term_digits: String = term.chars().take_while(|c| c.is_ascii_digit()).collect();
            let times: i32 = if term_digits.is_empty() {
                1
            } else {
                term_digits
                    .parse()
                    .map_err(|_| syntax(offset + 1, "invalid multiplier"))?
            };
            let group = &term[term_digits.len()..];
            if group.is_empty() {
                return Err(syntax(offset + 1, "empty adduct term"));
            }
            let formula = match ALIASES.iter().find(|(alias, _)| *alias == group) {
                Some((_, expansion)) => MolecularFormula::parse(expansion)?,
                None => MolecularFormula::parse(group)?,
            };
            delta = delta.add_scaled(&formula.with_charge(0), sign * times)?;
            offset += body_end;
            remaining = &remaining[body_end..];
        }

        Ok(Self {
            name: s.to_string(),
            molecules,
            delta,
            charge,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn molecules(&self) -> u32 {
        self.molecules
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn abs_charge(&self) -> u32 {
        self.charge.unsigned_abs()
    }

    pub fn polarity(&self) -> Polarity {
        match self.charge {
            0 => Polarity::Neutral,
            z if z > 0 => Polarity::Positive,
            _ => Polarity::Negative,
        }
    }

    /// `molecules * M + delta`, carrying the ion charge.
    pub fn ionize(&self, neutral: &MolecularFormula) -> Result<MolecularFormula, FormulaError> {
        let overflow = || FormulaError::CountOverflow(format!("{} {}", self.name, neutral));
        let molecules = i32::try_from(self.molecules).map_err(|_| overflow())?;
        let charge = neutral
            .charge()
            .checked_mul(molecules)
            .and_then(|x| x.checked_add(self.charge))
            .ok_or_else(overflow)?;
        let ionized = MolecularFormula::default()
            .add_scaled(neutral, molecules)?
            .add_scaled(&self.delta, 1)?
            .with_charge(charge);
        if let Some(element) = ionized.first_negative() {
            return Err(FormulaError::NegativeCount {
                formula: neutral.to_string(),
                ion_type: self.name.clone(),
                element: element.symbol(),
            });
        }
        if ionized.is_empty() {
            return Err(FormulaError::Empty);
        }
        Ok(ionized)
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for IonType {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IonType {
    type Error = FormulaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IonType> for String {
    fn from(value: IonType) -> Self {
        value.name
    }
}
