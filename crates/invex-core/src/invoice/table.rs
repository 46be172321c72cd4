//! Line-item table reconstruction.
//!
//! Recovers invoice line items from text whose column alignment was lost
//! during extraction. The table starts after a header line naming enough
//! column kinds and ends at the first totals/summary line.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::ExtractionError;
use crate::models::config::TableConfig;
use crate::models::invoice::{renumber, LineItem};

use super::rules::amounts::to_decimal;
use super::rules::patterns::{
    CODE_TOKEN, HEADER_CODE, HEADER_DESCRIPTION, HEADER_QUANTITY, HEADER_RATE, HEADER_SERIAL,
    HEADER_VALUE, NUMERIC_TOKEN, PAGE_FURNITURE, TABLE_TERMINATOR, UNIT_TOKEN,
};

/// Longest description kept on an item.
const MAX_DESCRIPTION_LEN: usize = 255;

/// Default row ceiling.
const DEFAULT_MAX_ITEMS: usize = 500;

#[derive(Debug, Clone, Copy)]
enum Token<'s> {
    Number { value: Decimal, raw: &'s str },
    Text(&'s str),
}

impl Token<'_> {
    fn number(&self) -> Option<Decimal> {
        match self {
            Token::Number { value, .. } => Some(*value),
            Token::Text(_) => None,
        }
    }
}

/// A number found in an item row.
#[derive(Debug, Clone, Copy)]
struct Figure {
    value: Decimal,
    /// Written with grouping commas, so a money amount and never a quantity.
    monetary: bool,
}

/// Rebuilds line items from flattened table text.
pub struct TableReconstructor<'a> {
    config: &'a TableConfig,
    max_items: usize,
}

impl<'a> TableReconstructor<'a> {
    pub fn new(config: &'a TableConfig) -> Self {
        Self {
            config,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    /// Fail once more than `max_items` rows are recovered.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Index of the first line that looks like a table header.
    pub fn find_header(&self, lines: &[&str]) -> Option<usize> {
        lines
            .iter()
            .position(|line| header_markers(line) >= self.config.min_header_markers)
    }

    /// Recover items in row order, numbered from 1.
    ///
    /// Text without a recognizable header yields no items.
    pub fn reconstruct(&self, text: &str) -> Result<Vec<LineItem>, ExtractionError> {
        let lines: Vec<&str> = text.lines().collect();
        let Some(header_idx) = self.find_header(&lines) else {
            debug!("No item table header found");
            return Ok(Vec::new());
        };

        let mut items: Vec<LineItem> = Vec::new();

        for (idx, raw) in lines.iter().enumerate().skip(header_idx + 1) {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if idx > header_idx + 1 && TABLE_TERMINATOR.is_match(line) {
                trace!("Item table ends at line {}: '{}'", idx, line);
                break;
            }

            if PAGE_FURNITURE.is_match(line) {
                trace!("Skipping page furniture at line {}: '{}'", idx, line);
                continue;
            }

            let tokens = tokenize(line);
            let has_number = tokens.iter().any(|t| t.number().is_some());
            let has_text = tokens.iter().any(|t| matches!(t, Token::Text(_)));

            // Header repeated at the top of a following page
            if !has_number && header_markers(line) >= self.config.min_header_markers {
                trace!("Skipping repeated table header at line {}", idx);
                continue;
            }

            match (has_number, has_text) {
                (false, true) => self.continue_description(&mut items, &tokens),
                (true, false) => self.continue_figures(&mut items, &tokens),
                (true, true) => {
                    if let Some(item) = self.parse_row(line, &tokens) {
                        if items.len() >= self.max_items {
                            return Err(ExtractionError::TooManyItems {
                                found: items.len() + 1,
                                limit: self.max_items,
                            });
                        }
                        items.push(item);
                    }
                }
                (false, false) => {}
            }
        }

        renumber(&mut items);
        debug!("Reconstructed {} line items", items.len());
        Ok(items)
    }

    /// A text-only line extends the previous item's description.
    fn continue_description(&self, items: &mut [LineItem], tokens: &[Token<'_>]) {
        let Some(last) = items.last_mut() else {
            return;
        };

        let text = join_text(tokens.iter());
        if text.chars().count() < self.config.min_description_len {
            return;
        }

        let description = match last.description.take() {
            Some(existing) => format!("{} {}", existing, text),
            None => text,
        };
        last.description = Some(truncate(&description));
    }

    /// A numbers-only line fills gaps on the previous item.
    fn continue_figures(&self, items: &mut [LineItem], tokens: &[Token<'_>]) {
        let Some(last) = items.last_mut() else {
            return;
        };

        let figures: Vec<Figure> = tokens.iter().filter_map(figure).collect();
        let [single] = figures.as_slice() else {
            let largest = figures.iter().map(|f| f.value).max();
            if last.value.is_none() {
                last.value = largest;
            }
            if last.quantity.is_none() {
                last.quantity = figures
                    .iter()
                    .filter(|f| self.plausible_quantity(f) && Some(f.value) != largest)
                    .map(|f| f.value)
                    .min();
            }
            return;
        };

        if self.plausible_quantity(single) {
            if last.quantity.is_none() {
                last.quantity = Some(single.value);
            }
        } else if last.value.is_none() {
            last.value = Some(single.value);
        }
    }

    /// Turn a line holding both numbers and text into a new item.
    fn parse_row(&self, line: &str, tokens: &[Token<'_>]) -> Option<LineItem> {
        if line.chars().count() < self.config.min_row_len {
            trace!("Discarding short row '{}'", line);
            return None;
        }

        let mut rest: &[Token<'_>] = tokens;

        // Leading small integer: serial number
        if let Some((Token::Number { value, raw }, tail)) = rest.split_first() {
            if is_plain_integer(raw) && *value < Decimal::from(self.config.serial_max) {
                rest = tail;
            }
        }

        let mut item = LineItem::default();

        // A first text token carrying digits is the item code
        if let Some((Token::Text(first), tail)) = rest.split_first() {
            if first.chars().any(|c| c.is_ascii_digit()) && CODE_TOKEN.is_match(first) {
                item.code = Some(first.to_string());
                rest = tail;
            }
        }

        let mut figures: Vec<Figure> = Vec::new();
        let mut words: Vec<Token<'_>> = Vec::new();
        let mut after_number = false;

        for token in rest {
            match token {
                Token::Number { .. } => {
                    if let Some(f) = figure(token) {
                        figures.push(f);
                    }
                    after_number = true;
                }
                Token::Text(word) => {
                    if after_number && item.unit.is_none() && UNIT_TOKEN.is_match(word) {
                        item.unit = Some(word.trim_end_matches('.').to_string());
                    } else {
                        words.push(*token);
                    }
                    after_number = false;
                }
            }
        }

        let description = join_text(words.iter());
        if description.chars().count() < self.config.min_description_len {
            trace!("Discarding row without a usable description: '{}'", line);
            return None;
        }
        item.description = Some(truncate(&description));

        self.assign_figures(&mut item, &figures);
        Some(item)
    }

    /// Largest number is the value; quantity and rate come from a pair whose
    /// product is the value, else the second-largest number may be the quantity.
    fn assign_figures(&self, item: &mut LineItem, figures: &[Figure]) {
        let Some((value_idx, value)) = figures
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.value.cmp(&b.1.value))
            .map(|(i, f)| (i, f.value))
        else {
            return;
        };
        item.value = Some(value);

        let others: Vec<&Figure> = figures
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != value_idx)
            .map(|(_, f)| f)
            .collect();

        for (qi, qty) in others.iter().enumerate() {
            if !self.plausible_quantity(qty) {
                continue;
            }
            let rate = others.iter().enumerate().find(|(ri, rate)| {
                *ri != qi && qty.value.checked_mul(rate.value) == Some(value)
            });
            if let Some((_, rate)) = rate {
                item.quantity = Some(qty.value);
                item.rate = Some(rate.value);
                return;
            }
        }

        let second = others.iter().max_by(|a, b| a.value.cmp(&b.value));
        if let Some(second) = second.filter(|f| self.plausible_quantity(f)) {
            item.quantity = Some(second.value);
        }
    }

    fn plausible_quantity(&self, figure: &Figure) -> bool {
        !figure.monetary && self.config.is_quantity(figure.value)
    }
}

/// Number of distinct column kinds named on a line.
fn header_markers(line: &str) -> usize {
    [
        &*HEADER_SERIAL,
        &*HEADER_CODE,
        &*HEADER_DESCRIPTION,
        &*HEADER_QUANTITY,
        &*HEADER_RATE,
        &*HEADER_VALUE,
    ]
    .iter()
    .filter(|re| re.is_match(line))
    .count()
}

fn tokenize(line: &str) -> Vec<Token<'_>> {
    line.split(|c: char| c.is_whitespace() || c == '|')
        .map(|t| t.trim_end_matches("/="))
        .filter(|t| !t.is_empty() && !is_currency(t))
        .map(|t| {
            let value = NUMERIC_TOKEN.is_match(t).then(|| to_decimal(t)).flatten();
            match value {
                Some(value) => Token::Number { value, raw: t },
                None => Token::Text(t),
            }
        })
        .collect()
}

fn figure(token: &Token<'_>) -> Option<Figure> {
    match token {
        Token::Number { value, raw } => Some(Figure {
            value: *value,
            monetary: raw.contains(','),
        }),
        Token::Text(_) => None,
    }
}

fn is_currency(token: &str) -> bool {
    matches!(token.to_ascii_lowercase().as_str(), "tsh" | "tzs" | "tshs" | "=" | "/=")
}

fn is_plain_integer(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}

fn join_text<'t, 's: 't>(tokens: impl Iterator<Item = &'t Token<'s>>) -> String {
    tokens
        .filter_map(|t| match t {
            Token::Text(word) => Some(*word),
            Token::Number { .. } => None,
        })
        .collect::<Vec<&str>>()
        .join(" ")
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_DESCRIPTION_LEN).collect()
}
