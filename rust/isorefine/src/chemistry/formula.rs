use crate::chemistry::elements::{
    ELECTRON_MASS,
    Element,
};
use crate::errors::FormulaError;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Elemental composition plus net charge.
///
/// Two formulas are equal (and hash equal) when they have the same element
/// counts and the same charge, so an ionized formula can be used directly
/// as a cache key. Counts may be negative while a formula is used as the
/// delta of an ion type, see [`crate::chemistry::IonType`].
///
/// ```
/// use isorefine::chemistry::MolecularFormula;
///
/// let glucose: MolecularFormula = "C6H12O6".parse().unwrap();
/// assert!((glucose.monoisotopic_mass() - 180.06339).abs() < 1e-4);
///
/// let ion: MolecularFormula = "[C6H13O6]+".parse().unwrap();
/// assert_eq!(ion.charge(), 1);
/// assert_eq!(ion.to_string(), "[C6H13O6]+");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MolecularFormula {
    elements: BTreeMap<Element, i32>,
    charge: i32,
}

impl MolecularFormula {
    pub fn parse(input: &str) -> Result<Self, FormulaError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FormulaError::Empty);
        }
        let (body, charge) = split_charge(trimmed, input)?;
        let mut parser = Parser {
            input,
            chars: body.char_indices().peekable(),
        };
        let elements = parser.parse_group(0)?;
        let out = Self { elements, charge }.normalized();
        if out.elements.is_empty() {
            return Err(FormulaError::Empty);
        }
        Ok(out)
    }

    fn normalized(mut self) -> Self {
        self.elements.retain(|_, count| *count != 0);
        self
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = charge;
        self
    }

    pub fn count(&self, element: Element) -> i32 {
        self.elements.get(&element).copied().unwrap_or(0)
    }

    pub fn elements(&self) -> impl Iterator<Item = (Element, i32)> + '_ {
        self.elements.iter().map(|(e, c)| (*e, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First element with a negative count, if any.
    pub fn first_negative(&self) -> Option<Element> {
        self.elements
            .iter()
            .find(|(_, count)| **count < 0)
            .map(|(e, _)| *e)
    }

    /// `self + times * other`, charges included.
    ///
    /// Fails with [`FormulaError::CountOverflow`] instead of wrapping when a
    /// count or the charge leaves the `i32` range.
    pub fn add_scaled(
        &self,
        other: &MolecularFormula,
        times: i32,
    ) -> Result<MolecularFormula, FormulaError> {
        let overflow = || FormulaError::CountOverflow(other.to_string());
        let mut out = self.clone();
        for (element, count) in other.elements.iter() {
            let entry = out.elements.entry(*element).or_insert(0);
            *entry = count
                .checked_mul(times)
                .and_then(|x| entry.checked_add(x))
                .ok_or_else(overflow)?;
        }
        out.charge = other
            .charge
            .checked_mul(times)
            .and_then(|x| out.charge.checked_add(x))
            .ok_or_else(overflow)?;
        Ok(out.normalized())
    }

    /// Neutral monoisotopic mass, corrected for the electrons lost or
    /// gained by the charge.
    pub fn monoisotopic_mass(&self) -> f64 {
        let neutral: f64 = self
            .elements
            .iter()
            .map(|(e, c)| e.monoisotopic_mass() * *c as f64)
            .sum();
        neutral - self.charge as f64 * ELECTRON_MASS
    }

    /// Monoisotopic m/z, `None` for uncharged formulas.
    pub fn monoisotopic_mz(&self) -> Option<f64> {
        if self.charge == 0 {
            return None;
        }
        Some(self.monoisotopic_mass() / self.charge.unsigned_abs() as f64)
    }

    /// Elements in Hill order: C, H, then alphabetical. Without carbon
    /// everything is alphabetical.
    fn hill_order(&self) -> Vec<(Element, i32)> {
        let mut out: Vec<(Element, i32)> = self.elements().collect();
        let has_carbon = self.count(Element::C) != 0;
        out.sort_by_key(|(e, _)| {
            let rank = match (has_carbon, e) {
                (true, Element::C) => 0,
                (true, Element::H) => 1,
                _ => 2,
            };
            (rank, e.symbol())
        });
        out
    }
}

impl fmt::Display for MolecularFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        for (element, count) in self.hill_order() {
            body.push_str(element.symbol());
            if count != 1 {
                body.push_str(&count.to_string());
            }
        }
        match self.charge {
            0 => write!(f, "{body}"),
            1 => write!(f, "[{body}]+"),
            -1 => write!(f, "[{body}]-"),
            z if z > 0 => write!(f, "[{body}]{z}+"),
            z => write!(f, "[{body}]{}-", -z),
        }
    }
}

impl FromStr for MolecularFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MolecularFormula {
    type Error = FormulaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MolecularFormula> for String {
    fn from(value: MolecularFormula) -> Self {
        value.to_string()
    }
}

/// Splits `[body]2+`, `body+`, `body--` into the body and the signed charge.
fn split_charge<'a>(s: &'a str, input: &str) -> Result<(&'a str, i32), FormulaError> {
    if let Some(rest) = s.strip_prefix('[') {
        let Some(close) = rest.rfind(']') else {
            return Err(FormulaError::Syntax {
                input: input.to_string(),
                position: s.len(),
                reason: "missing closing bracket",
            });
        };
        let body = &rest[..close];
        let suffix = &rest[close + 1..];
        let charge = parse_charge_suffix(suffix).ok_or_else(|| FormulaError::Syntax {
            input: input.to_string(),
            position: close + 2,
            reason: "invalid charge after the closing bracket",
        })?;
        return Ok((body, charge));
    }

    let body = s.trim_end_matches(['+', '-']);
    let suffix = &s[body.len()..];
    if suffix.is_empty() {
        return Ok((body, 0));
    }
    let sign = if suffix.starts_with('+') { 1 } else { -1 };
    let consistent = suffix.chars().all(|c| c == suffix.chars().next().unwrap_or('+'));
    if !consistent {
        return Err(FormulaError::Syntax {
            input: input.to_string(),
            position: body.len(),
            reason: "mixed charge signs",
        });
    }
    Ok((body, sign * suffix.len() as i32))
}

/// `""` -> 0, `"+"` -> 1, `"2-"` -> -2, `"+2"` -> 2, `"++"` -> 2.
pub(crate) fn parse_charge_suffix(suffix: &str) -> Option<i32> {
    if suffix.is_empty() {
        return Some(0);
    }
    let digits_first: String = suffix.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &suffix[digits_first.len()..];
    let (magnitude, signs) = if !digits_first.is_empty() {
        (digits_first.parse::<i32>().ok()?, rest)
    } else {
        let signs = suffix.trim_end_matches(|c: char| c.is_ascii_digit());
        let trailing = &suffix[signs.len()..];
        if !trailing.is_empty() {
            if signs.len() != 1 {
                return None;
            }
            (trailing.parse::<i32>().ok()?, signs)
        } else {
            (signs.len() as i32, signs)
        }
    };
    let first = signs.chars().next()?;
    if !signs.chars().all(|c| c == first) {
        return None;
    }
    if !digits_first.is_empty() && signs.len() != 1 {
        return None;
    }
    match first {
        '+' => Some(magnitude),
        '-' => Some(-magnitude),
        _ => None,
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn syntax(&self, position: usize, reason: &'static str) -> FormulaError {
        FormulaError::Syntax {
            input: self.input.to_string(),
            position,
            reason,
        }
    }

    fn overflow(&self) -> FormulaError {
        FormulaError::CountOverflow(self.input.to_string())
    }

    /// Digits following an element or a group, `None` when there are none.
    fn parse_count(&mut self) -> Result<Option<i32>, FormulaError> {
        let start = self.chars.peek().map(|(pos, _)| *pos);
        let mut digits = String::new();
        while let Some((_, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match start {
            Some(pos) if !digits.is_empty() => digits
                .parse()
                .map(Some)
                .map_err(|_| self.syntax(pos, "count too large")),
            _ => Ok(None),
        }
    }

    fn parse_group(&mut self, depth: usize) -> Result<BTreeMap<Element, i32>, FormulaError> {
        let mut out: BTreeMap<Element, i32> = BTreeMap::new();
        while let Some((pos, c)) = self.chars.peek().copied() {
            match c {
                '(' => {
                    self.chars.next();
                    let inner = self.parse_group(depth + 1)?;
                    match self.chars.next() {
                        Some((_, ')')) => {}
                        _ => return Err(self.syntax(pos, "unclosed parenthesis")),
                    }
                    let times = self.parse_count()?.unwrap_or(1);
                    for (element, count) in inner {
                        let entry = out.entry(element).or_insert(0);
                        *entry = count
                            .checked_mul(times)
                            .and_then(|x| entry.checked_add(x))
                            .ok_or_else(|| self.overflow())?;
                    }
                }
                ')' if depth > 0 => return Ok(out),
                c if c.is_ascii_uppercase() => {
                    self.chars.next();
                    let mut symbol = c.to_string();
                    while let Some((_, next)) = self.chars.peek() {
                        if next.is_ascii_lowercase() {
                            symbol.push(*next);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    let element =
                        Element::from_symbol(&symbol).ok_or_else(|| FormulaError::UnknownElement {
                            symbol: symbol.clone(),
                            input: self.input.to_string(),
                        })?;
                    let count = self.parse_count()?.unwrap_or(1);
                    let entry = out.entry(element).or_insert(0);
                    *entry = entry.checked_add(count).ok_or_else(|| self.overflow())?;
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                _ => return Err(self.syntax(pos, "unexpected character")),
            }
        }
        if depth > 0 {
            return Err(self.syntax(self.input.len(), "unclosed parenthesis"));
        }
        Ok(out)
    }
}
