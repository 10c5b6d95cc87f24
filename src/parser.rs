use miette::SourceSpan;

use crate::{
    air::{Air, AirStmt, Instr},
    catalog::{self, CatalogEntry, Mnemonic},
    error::AsmError,
    span::{Idx, Span},
    symbol::{Operand, OperandKind, Register},
};

/// Starts a comment that runs to the end of the line.
pub const COMMENT_MARKER: char = '#';

/// Maximum number of operands any instruction takes.
pub const MAX_OPERANDS: usize = 3;

/// Test if a character separates tokens. Commas are accepted between operands.
pub(crate) fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | ',')
}

/// A single operand as written in the source.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OperandToken {
    pub text: String,
    pub span: Span,
}

/// One non-blank source line split into mnemonic and raw operand tokens. Nothing has been
/// checked against the instruction catalog yet.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParsedInstr {
    pub mnemonic: String,
    pub mnemonic_span: Span,
    pub operands: Vec<OperandToken>,
    /// 1-based line number inside the source file
    pub line: usize,
    /// Full text of the line, kept for diagnostics
    pub src: String,
}

impl ParsedInstr {
    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Span covering the whole instruction, without the trailing comment.
    fn span(&self) -> SourceSpan {
        let start = self.mnemonic_span.as_range().start;
        let end = self
            .operands
            .last()
            .map(|op| op.span.as_range().end)
            .unwrap_or(self.mnemonic_span.as_range().end);
        (start..end).into()
    }

    /// Check the instruction against the catalog and type its operands.
    pub fn resolve(&self) -> Result<AirStmt, AsmError> {
        let entry = catalog::lookup(&self.mnemonic).ok_or_else(|| AsmError::UnknownMnemonic {
            line: self.line,
            mnemonic: self.mnemonic.clone(),
            src: self.src.clone(),
            span: self.mnemonic_span.into(),
        })?;

        if self.operand_count() != entry.arity() {
            return Err(self.count_mismatch(entry));
        }

        let operands = self
            .operands
            .iter()
            .zip(entry.signature)
            .map(|(token, expected)| self.resolve_operand(token, *expected))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AirStmt {
            instr: Instr::new_unchecked(entry.mnemonic, operands),
            line: self.line,
        })
    }

    fn count_mismatch(&self, entry: &CatalogEntry) -> AsmError {
        AsmError::OperandCountMismatch {
            line: self.line,
            mnemonic: entry.name.to_string(),
            expected: entry.arity(),
            found: self.operand_count(),
            src: self.src.clone(),
            span: self.span(),
        }
    }

    fn resolve_operand(
        &self,
        token: &OperandToken,
        expected: OperandKind,
    ) -> Result<Operand, AsmError> {
        let operand = match parse_operand(&token.text) {
            Ok(operand) => operand,
            Err(OperandError::Invalid) => {
                return Err(AsmError::InvalidOperand {
                    line: self.line,
                    token: token.text.clone(),
                    src: self.src.clone(),
                    span: token.span.into(),
                })
            }
            Err(OperandError::RegisterRange) => {
                return Err(AsmError::RegisterIndexOutOfRange {
                    line: self.line,
                    token: token.text.clone(),
                    src: self.src.clone(),
                    span: token.span.into(),
                })
            }
            Err(OperandError::ImmediateRange) => {
                return Err(AsmError::ImmediateOutOfRange {
                    line: self.line,
                    token: token.text.clone(),
                    src: self.src.clone(),
                    span: token.span.into(),
                })
            }
        };
        if operand.kind() != expected {
            return Err(AsmError::OperandTypeMismatch {
                line: self.line,
                expected,
                found: operand.kind(),
                src: self.src.clone(),
                span: token.span.into(),
            });
        }
        Ok(operand)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum OperandError {
    Invalid,
    RegisterRange,
    ImmediateRange,
}

/// Accepts `S3`/`SR3`, `V3`/`VR3` and signed decimal immediates.
fn parse_operand(token: &str) -> Result<Operand, OperandError> {
    let upper = token.to_ascii_uppercase();
    let register = |rest: &str| -> Option<Result<Register, OperandError>> {
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(rest.parse().map_err(|_| OperandError::RegisterRange))
    };

    for (prefixes, make) in [
        (["SR", "S"], Operand::Scalar as fn(Register) -> Operand),
        (["VR", "V"], Operand::Vector as fn(Register) -> Operand),
    ] {
        for prefix in prefixes {
            if let Some(reg) = upper.strip_prefix(prefix).and_then(register) {
                return reg.map(make);
            }
        }
    }

    let digits = token.strip_prefix(&['-', '+'][..]).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OperandError::Invalid);
    }
    // Anything that is numeric but does not fit is a range problem, however long it is
    token
        .parse::<i64>()
        .ok()
        .and_then(|val| i16::try_from(val).ok())
        .map(Operand::Imm)
        .ok_or(OperandError::ImmediateRange)
}

/// Split one line of source. Returns `None` for blank and comment-only lines.
pub fn parse_line(line: usize, text: &str) -> Result<Option<ParsedInstr>, AsmError> {
    let code = match text.find(COMMENT_MARKER) {
        Some(idx) => &text[..idx],
        None => text,
    };
    if code.trim().is_empty() {
        return Ok(None);
    }

    let mut tokens = Vec::new();
    let mut start = None;
    for (idx, c) in code.char_indices().chain(std::iter::once((code.len(), ' '))) {
        match (start, is_separator(c) || c.is_whitespace()) {
            (None, false) => start = Some(idx),
            (Some(begin), true) => {
                let span = Span::new(Idx(begin as u32), (idx - begin) as u32);
                tokens.push((&code[begin..idx], span));
                start = None;
            }
            _ => (),
        }
    }

    let mut tokens = tokens.into_iter();
    let Some((mnemonic, mnemonic_span)) = tokens.next() else {
        return Err(AsmError::MalformedInstruction {
            line,
            src: text.to_string(),
            span: (0..code.len()).into(),
        });
    };
    let parsed = ParsedInstr {
        mnemonic: mnemonic.to_string(),
        mnemonic_span,
        operands: tokens
            .map(|(text, span)| OperandToken {
                text: text.to_string(),
                span,
            })
            .collect(),
        line,
        src: text.to_string(),
    };

    if parsed.operand_count() > MAX_OPERANDS {
        let expected = catalog::lookup(&parsed.mnemonic)
            .map(CatalogEntry::arity)
            .unwrap_or(MAX_OPERANDS);
        return Err(AsmError::OperandCountMismatch {
            line,
            mnemonic: parsed.mnemonic.clone(),
            expected,
            found: parsed.operand_count(),
            src: parsed.src.clone(),
            span: parsed.span(),
        });
    }
    Ok(Some(parsed))
}

/// Transforms assembly source into AIR.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser { src }
    }

    /// Parse and validate every line. Fails on the first problem found.
    pub fn parse(self) -> Result<Air, AsmError> {
        let mut air = Air::new();
        for (idx, text) in self.src.lines().enumerate() {
            if let Some(parsed) = parse_line(idx + 1, text)? {
                let stmt = parsed.resolve()?;
                log::trace!("line {}: {}", stmt.line, stmt.instr);
                air.add_stmt(stmt);
            }
        }
        if !air.iter().any(|stmt| stmt.instr.mnemonic() == Mnemonic::HALT) {
            return Err(AsmError::MissingHalt);
        }
        Ok(air)
    }
}
