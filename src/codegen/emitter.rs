use std::fmt::Display;

use crate::machine::Opcode;

use super::CodegenError;

const BUG_IN_EMIT: &str = "BUG in emitBackup";

/// Instruction emission buffer with support for backpatching.
///
/// `loc` is where the next instruction lands; `high` is the highest
/// location ever reached and never decreases. Skipped locations are holes
/// that a later `backup`/emit/`restore` sequence fills in; the listing
/// therefore stores backpatched lines out of order, keyed by their
/// location prefix.
pub struct Emitter {
    lines: Vec<String>,
    loc: usize,
    high: usize,
    trace: bool,
}

impl Emitter {
    pub fn new(trace: bool) -> Self {
        Self {
            lines: vec![],
            loc: 0,
            high: 0,
            trace,
        }
    }

    pub fn high(&self) -> usize {
        self.high
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn update_high(&mut self) {
        if self.high < self.loc {
            self.high = self.loc;
        }
    }

    pub fn comment(&mut self, comment: &str) {
        if self.trace {
            self.lines.push(format!("* {comment}"));
        }
    }

    /// Emit a register-only instruction.
    pub fn ro(&mut self, op: Opcode, r: i64, s: i64, t: i64, comment: &str) {
        if self.trace {
            self.lines
                .push(format!("{}:  {op}  {r},{s},{t}\t{comment}", self.loc));
        } else {
            self.lines.push(format!("{}:  {op}  {r},{s},{t}", self.loc));
        }
        self.loc += 1;
        self.update_high();
    }

    /// Emit a register-to-memory (or register-address) instruction.
    pub fn rm(&mut self, op: Opcode, r: i64, d: impl Display, s: i64, comment: &str) {
        if self.trace {
            self.lines
                .push(format!("{}:  {op}  {r},{d}({s})\t{comment}", self.loc));
        } else {
            self.lines.push(format!("{}:  {op}  {r},{d}({s})", self.loc));
        }
        self.loc += 1;
        self.update_high();
    }

    /// Emit with an absolute code address converted to PC-relative form.
    pub fn rm_abs(&mut self, op: Opcode, r: i64, absolute: usize, pc: i64, comment: &str) {
        let displacement = absolute as i64 - (self.loc as i64 + 1);
        self.rm(op, r, displacement, pc, comment);
    }

    /// Reserve `count` locations for later backpatching and return the
    /// position of the first one.
    pub fn skip(&mut self, count: usize) -> usize {
        let current = self.loc;
        self.loc += count;
        self.update_high();
        current
    }

    /// Move the emission position back to a previously skipped location.
    pub fn backup(&mut self, loc: usize) -> Result<(), CodegenError> {
        if loc > self.high {
            return Err(CodegenError(BUG_IN_EMIT.to_owned()));
        }
        self.loc = loc;
        Ok(())
    }

    /// Return to the highest position reached so far.
    pub fn restore(&mut self) {
        self.loc = self.high;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_formats() {
        let mut emitter = Emitter::new(true);
        emitter.comment("Standard prelude:");
        emitter.rm(Opcode::Ld, 6, 0, 0, "load maxaddress from location 0");
        emitter.ro(Opcode::Halt, 0, 0, 0, "");

        assert_eq!(
            emitter.into_lines(),
            vec![
                "* Standard prelude:",
                "0:  LD  6,0(0)\tload maxaddress from location 0",
                "1:  HALT  0,0,0\t",
            ]
        );
    }

    #[test]
    fn test_trace_disabled_drops_comments() {
        let mut emitter = Emitter::new(false);
        emitter.comment("invisible");
        emitter.ro(Opcode::Halt, 0, 0, 0, "ignored");

        assert_eq!(emitter.into_lines(), vec!["0:  HALT  0,0,0"]);
    }

    #[test]
    fn test_skip_backup_restore() {
        let mut emitter = Emitter::new(false);
        emitter.ro(Opcode::In, 0, 0, 0, "");
        let hole = emitter.skip(1);
        emitter.ro(Opcode::Out, 0, 0, 0, "");

        assert_eq!(hole, 1);
        emitter.backup(hole).expect("hole is below the high mark");
        emitter.rm_abs(Opcode::Jeq, 0, 3, 7, "");
        emitter.restore();
        emitter.ro(Opcode::Halt, 0, 0, 0, "");

        // The backpatched line lands at location 1 even though it is
        // appended after location 2.
        assert_eq!(
            emitter.into_lines(),
            vec![
                "0:  IN  0,0,0",
                "2:  OUT  0,0,0",
                "1:  JEQ  0,1(7)",
                "3:  HALT  0,0,0",
            ]
        );
    }

    #[test]
    fn test_high_watermark_is_monotonic() {
        let mut emitter = Emitter::new(false);
        emitter.skip(5);
        assert_eq!(emitter.high(), 5);
        emitter.backup(2).expect("2 is below the high mark");
        assert_eq!(emitter.high(), 5);
        emitter.restore();
        assert_eq!(emitter.high(), 5);
    }

    #[test]
    fn test_backup_past_high_is_a_bug() {
        let mut emitter = Emitter::new(false);
        emitter.skip(2);

        assert!(emitter.backup(3).is_err());
    }
}
