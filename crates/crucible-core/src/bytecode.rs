//! Bytecode encoding for `eval`/`exec` string literals (spec §4.7/§4.8
//! "Comptime eval embedding", §8 invariant 1: encode then decode is the
//! identity). The format is self-describing: a fixed header, an
//! instruction stream, and a trailing constants pool so the embedded
//! runtime VM never has to consult the compiler's own data structures.

use crate::ast::{BinOp, CompareOp, Expr, ExprKind, Literal, Stmt, StmtKind};
use crate::error::{CompileError, ErrorKind};
use serde::{Deserialize, Serialize};

const MAGIC: u32 = 0xC6B1_0001;
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    LoadConst,
    LoadName,
    StoreName,
    BinaryAdd,
    BinarySub,
    BinaryMul,
    BinaryDiv,
    CompareEq,
    CallFunction,
    ReturnValue,
    Pop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: OpCode,
    /// Meaning depends on `op`: constants-pool index for `LoadConst`,
    /// `LoadName`, and `StoreName` (a name is stored as a `Str`
    /// constant), argument count for `CallFunction`, unused (0)
    /// otherwise.
    pub arg: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeProgram {
    pub version: u16,
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Constant>,
}

impl BytecodeProgram {
    pub fn new(instructions: Vec<Instruction>, constants: Vec<Constant>) -> Self {
        Self {
            version: FORMAT_VERSION,
            instructions,
            constants,
        }
    }

    /// Header (magic + version + section lengths) followed by the
    /// instruction stream and the constants pool, in that order — the
    /// layout `decode` expects byte-for-byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&(self.instructions.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.constants.len() as u32).to_le_bytes());
        for inst in &self.instructions {
            buf.push(opcode_tag(inst.op));
            buf.extend_from_slice(&inst.arg.to_le_bytes());
        }
        for constant in &self.constants {
            encode_constant(constant, &mut buf);
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CompileError> {
        let mut cursor = Cursor::new(bytes);
        let magic = cursor.read_u32()?;
        if magic != MAGIC {
            return Err(CompileError::new(ErrorKind::InternalError(
                "bytecode blob has an unrecognized magic number".to_string(),
            )));
        }
        let version = cursor.read_u16()?;
        let instruction_count = cursor.read_u32()?;
        let constant_count = cursor.read_u32()?;

        let mut instructions = Vec::with_capacity(instruction_count as usize);
        for _ in 0..instruction_count {
            let tag = cursor.read_u8()?;
            let op = opcode_from_tag(tag)?;
            let arg = cursor.read_u32()?;
            instructions.push(Instruction { op, arg });
        }

        let mut constants = Vec::with_capacity(constant_count as usize);
        for _ in 0..constant_count {
            constants.push(decode_constant(&mut cursor)?);
        }

        Ok(Self {
            version,
            instructions,
            constants,
        })
    }

    /// Compiles a single `eval`/`exec` string-literal argument to the
    /// small embedded bytecode blob spec §4.7 ("Comptime eval
    /// embedding") calls for: a self-contained program the runtime
    /// executes in place of calling back into this compiler. Returns
    /// `None` for anything outside this minimal VM's opcode set
    /// (calls, control flow, comprehensions, ...) — the caller falls
    /// back to an ordinary runtime `eval`/`exec` call in that case.
    pub fn compile_literal(source: &str, is_exec: bool) -> Option<Self> {
        let module = crate::parser::Parser::parse(source).ok()?;
        let mut compiler = LiteralCompiler::default();
        for stmt in &module.body {
            compiler.compile_stmt(stmt, is_exec)?;
        }
        if !is_exec {
            compiler.emit(OpCode::ReturnValue, 0);
        }
        Some(Self::new(compiler.instructions, compiler.constants))
    }
}

#[derive(Default)]
struct LiteralCompiler {
    instructions: Vec<Instruction>,
    constants: Vec<Constant>,
}

impl LiteralCompiler {
    fn emit(&mut self, op: OpCode, arg: u32) {
        self.instructions.push(Instruction { op, arg });
    }

    fn const_index(&mut self, constant: Constant) -> u32 {
        if let Some(pos) = self.constants.iter().position(|c| *c == constant) {
            return pos as u32;
        }
        self.constants.push(constant);
        (self.constants.len() - 1) as u32
    }

    fn compile_stmt(&mut self, stmt: &Stmt, is_exec: bool) -> Option<()> {
        match &stmt.kind {
            StmtKind::ExprStmt(expr) => {
                self.compile_expr(expr)?;
                if is_exec {
                    self.emit(OpCode::Pop, 0);
                }
                Some(())
            }
            StmtKind::Assign { targets, value } if is_exec => {
                self.compile_expr(value)?;
                for target in targets {
                    let ExprKind::Name(name) = &target.kind else {
                        return None;
                    };
                    let idx = self.const_index(Constant::Str(name.clone()));
                    self.emit(OpCode::StoreName, idx);
                }
                Some(())
            }
            _ => None,
        }
    }

    fn compile_expr(&mut self, expr: &Expr) -> Option<()> {
        match &expr.kind {
            ExprKind::Constant(lit) => {
                let constant = match lit {
                    Literal::Int(n) => Constant::Int(*n),
                    Literal::Float(n) => Constant::Float(*n),
                    Literal::Str(s) | Literal::FString(s) => Constant::Str(s.clone()),
                    Literal::Bool(b) => Constant::Bool(*b),
                    Literal::None => Constant::None,
                };
                let idx = self.const_index(constant);
                self.emit(OpCode::LoadConst, idx);
                Some(())
            }
            ExprKind::Name(name) => {
                let idx = self.const_index(Constant::Str(name.clone()));
                self.emit(OpCode::LoadName, idx);
                Some(())
            }
            ExprKind::BinOp { left, op, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                let opcode = match op {
                    BinOp::Add => OpCode::BinaryAdd,
                    BinOp::Sub => OpCode::BinarySub,
                    BinOp::Mul => OpCode::BinaryMul,
                    BinOp::Div => OpCode::BinaryDiv,
                    _ => return None,
                };
                self.emit(opcode, 0);
                Some(())
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } if ops.len() == 1 && ops[0] == CompareOp::Eq => {
                self.compile_expr(left)?;
                self.compile_expr(&comparators[0])?;
                self.emit(OpCode::CompareEq, 0);
                Some(())
            }
            _ => None,
        }
    }
}

fn opcode_tag(op: OpCode) -> u8 {
    match op {
        OpCode::LoadConst => 0,
        OpCode::LoadName => 1,
        OpCode::StoreName => 2,
        OpCode::BinaryAdd => 3,
        OpCode::BinarySub => 4,
        OpCode::BinaryMul => 5,
        OpCode::BinaryDiv => 6,
        OpCode::CompareEq => 7,
        OpCode::CallFunction => 8,
        OpCode::ReturnValue => 9,
        OpCode::Pop => 10,
    }
}

fn opcode_from_tag(tag: u8) -> Result<OpCode, CompileError> {
    Ok(match tag {
        0 => OpCode::LoadConst,
        1 => OpCode::LoadName,
        2 => OpCode::StoreName,
        3 => OpCode::BinaryAdd,
        4 => OpCode::BinarySub,
        5 => OpCode::BinaryMul,
        6 => OpCode::BinaryDiv,
        7 => OpCode::CompareEq,
        8 => OpCode::CallFunction,
        9 => OpCode::ReturnValue,
        10 => OpCode::Pop,
        other => {
            return Err(CompileError::new(ErrorKind::InternalError(format!(
                "unknown opcode tag {other}"
            ))))
        }
    })
}

fn encode_constant(constant: &Constant, buf: &mut Vec<u8>) {
    match constant {
        Constant::Int(n) => {
            buf.push(0);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Constant::Float(n) => {
            buf.push(1);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Constant::Str(s) => {
            buf.push(2);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Constant::Bool(b) => {
            buf.push(3);
            buf.push(u8::from(*b));
        }
        Constant::None => buf.push(4),
    }
}

fn decode_constant(cursor: &mut Cursor) -> Result<Constant, CompileError> {
    let tag = cursor.read_u8()?;
    Ok(match tag {
        0 => Constant::Int(cursor.read_i64()?),
        1 => Constant::Float(cursor.read_f64()?),
        2 => {
            let len = cursor.read_u32()? as usize;
            Constant::Str(cursor.read_string(len)?)
        }
        3 => Constant::Bool(cursor.read_u8()? != 0),
        4 => Constant::None,
        other => {
            return Err(CompileError::new(ErrorKind::InternalError(format!(
                "unknown constant tag {other}"
            ))))
        }
    })
}

/// Minimal cursor over an immutable byte slice; every read bounds-checks
/// and reports an `InternalError` instead of panicking on truncated
/// input, since a bytecode blob is untrusted once it leaves the
/// compiler's own encoder.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CompileError> {
        if self.pos + n > self.bytes.len() {
            return Err(CompileError::new(ErrorKind::InternalError(
                "truncated bytecode blob".to_string(),
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CompileError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, CompileError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn read_u32(&mut self) -> Result<u32, CompileError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64, CompileError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> Result<f64, CompileError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_string(&mut self, len: usize) -> Result<String, CompileError> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            CompileError::new(ErrorKind::InternalError(
                "bytecode string constant is not valid UTF-8".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_program() {
        let program = BytecodeProgram::new(
            vec![
                Instruction {
                    op: OpCode::LoadConst,
                    arg: 0,
                },
                Instruction {
                    op: OpCode::LoadConst,
                    arg: 1,
                },
                Instruction {
                    op: OpCode::BinaryAdd,
                    arg: 0,
                },
                Instruction {
                    op: OpCode::ReturnValue,
                    arg: 0,
                },
            ],
            vec![Constant::Int(2), Constant::Int(3)],
        );
        let bytes = program.encode();
        let decoded = BytecodeProgram::decode(&bytes).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn round_trips_every_constant_kind() {
        let program = BytecodeProgram::new(
            vec![],
            vec![
                Constant::Int(-7),
                Constant::Float(3.25),
                Constant::Str("hello".to_string()),
                Constant::Bool(true),
                Constant::None,
            ],
        );
        let decoded = BytecodeProgram::decode(&program.encode()).unwrap();
        assert_eq!(decoded.constants, program.constants);
    }

    #[test]
    fn rejects_truncated_input() {
        let program = BytecodeProgram::new(
            vec![Instruction {
                op: OpCode::Pop,
                arg: 0,
            }],
            vec![],
        );
        let mut bytes = program.encode();
        bytes.truncate(bytes.len() - 2);
        assert!(BytecodeProgram::decode(&bytes).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 16];
        let err = BytecodeProgram::decode(&bytes).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InternalError(_)));
    }

    #[test]
    fn compiles_an_eval_literal_to_a_constant_folding_program() {
        let program = BytecodeProgram::compile_literal("2 + 3 * 4", false).unwrap();
        assert_eq!(program.constants, vec![Constant::Int(2), Constant::Int(3), Constant::Int(4)]);
        assert_eq!(program.instructions.last().unwrap().op, OpCode::ReturnValue);
        let decoded = BytecodeProgram::decode(&program.encode()).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn compiles_an_exec_literal_with_an_assignment() {
        let program = BytecodeProgram::compile_literal("x = 1 + 1", true).unwrap();
        assert!(program
            .instructions
            .iter()
            .any(|i| i.op == OpCode::StoreName));
        assert_eq!(program.constants.last(), Some(&Constant::Str("x".to_string())));
    }

    #[test]
    fn refuses_to_compile_a_call_expression() {
        assert!(BytecodeProgram::compile_literal("foo()", false).is_none());
    }
}
